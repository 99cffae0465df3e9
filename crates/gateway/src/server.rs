use axum::{
    Json, Router,
    routing::{get, post, put},
};

use {
    tower_http::cors::{Any, CorsLayer},
    tracing::info,
};

use crate::{crm_routes, state::AppState, whatsapp_routes};

/// Build the gateway router (shared between production startup and tests).
pub fn build_gateway_app(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health", get(health_handler))
        .route("/api/whatsapp/{tenant}/status", get(whatsapp_routes::status))
        .route(
            "/api/whatsapp/{tenant}/disconnect",
            post(whatsapp_routes::disconnect),
        )
        .route(
            "/api/agents/{tenant}",
            get(crm_routes::list_agents).post(crm_routes::create_agent),
        )
        .route(
            "/api/agents/{tenant}/{id}",
            put(crm_routes::update_agent).delete(crm_routes::delete_agent),
        )
        .route(
            "/api/leads/{tenant}",
            get(crm_routes::list_leads).post(crm_routes::create_lead),
        )
        .route(
            "/api/leads/{tenant}/{id}",
            axum::routing::delete(crm_routes::delete_lead),
        )
        .route(
            "/api/leads/{tenant}/{id}/status",
            put(crm_routes::update_lead_status),
        )
        .route(
            "/api/leads/{tenant}/{id}/activities",
            get(crm_routes::list_activities),
        )
        .with_state(state)
        .layer(cors)
}

async fn health_handler() -> Json<serde_json::Value> {
    Json(serde_json::json!({ "status": "ok" }))
}

/// Bind and serve until the process exits.
pub async fn serve(state: AppState, bind: &str, port: u16) -> anyhow::Result<()> {
    let app = build_gateway_app(state);
    let addr = format!("{bind}:{port}");
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!(%addr, "gateway listening");
    axum::serve(listener, app).await?;
    Ok(())
}
