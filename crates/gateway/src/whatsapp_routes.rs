//! Session status + control endpoints.
//!
//! The persisted session row is the only channel the dashboard has into
//! connection state; it polls the status endpoint.

use axum::{
    Json,
    extract::{Path, State},
};

use {tracing::info, zapcrm_sessions::SessionSnapshot};

use crate::{error::ApiError, state::AppState};

/// `GET /api/whatsapp/{tenant}/status` — current session snapshot,
/// provisioning a default `disconnected` row on first query.
pub async fn status(
    State(state): State<AppState>,
    Path(tenant_id): Path<String>,
) -> Result<Json<SessionSnapshot>, ApiError> {
    Ok(Json(state.sessions.current_state(&tenant_id).await?))
}

/// `POST /api/whatsapp/{tenant}/disconnect` — externally triggered logout.
/// Clears credential material and does not auto-reconnect.
pub async fn disconnect(
    State(state): State<AppState>,
    Path(tenant_id): Path<String>,
) -> Result<Json<serde_json::Value>, ApiError> {
    info!(tenant_id, "dashboard requested disconnect");
    state.sessions.force_disconnect(&tenant_id).await?;
    if let Err(e) = state.supervisor.stop_session(&tenant_id).await {
        // Session row is already disconnected; a dead plugin only means
        // there was no live connection to tear down.
        tracing::warn!(tenant_id, error = %e, "transport stop failed during disconnect");
    }
    Ok(Json(serde_json::json!({ "success": true })))
}
