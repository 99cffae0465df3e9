//! Lead and agent CRUD endpoints for the dashboard.

use axum::{
    Json,
    extract::{Path, State},
};

use {
    serde::{Deserialize, Serialize},
    zapcrm_agents::{Agent, NewAgent, UpdateAgent},
    zapcrm_leads::{Activity, Lead, NewLead},
};

use crate::{error::ApiError, state::AppState};

/// Agent projection for API responses: the credential never leaves the
/// server, only the fact that one is configured.
#[derive(Serialize)]
pub struct AgentView {
    pub id: String,
    pub tenant_id: String,
    pub name: String,
    pub personality: String,
    pub provider: String,
    pub model: Option<String>,
    pub has_api_key: bool,
    pub is_active: bool,
    pub created_at: i64,
    pub updated_at: i64,
}

impl From<Agent> for AgentView {
    fn from(a: Agent) -> Self {
        let has_api_key = a.has_api_key();
        Self {
            id: a.id,
            tenant_id: a.tenant_id,
            name: a.name,
            personality: a.personality,
            provider: a.provider,
            model: a.model,
            has_api_key,
            is_active: a.is_active,
            created_at: a.created_at,
            updated_at: a.updated_at,
        }
    }
}

// ── Agents ──────────────────────────────────────────────────────────────────

pub async fn list_agents(
    State(state): State<AppState>,
    Path(tenant_id): Path<String>,
) -> Result<Json<Vec<AgentView>>, ApiError> {
    let agents = state.agents.list(&tenant_id).await?;
    Ok(Json(agents.into_iter().map(Into::into).collect()))
}

pub async fn create_agent(
    State(state): State<AppState>,
    Path(tenant_id): Path<String>,
    Json(body): Json<NewAgent>,
) -> Result<Json<AgentView>, ApiError> {
    Ok(Json(state.agents.create(&tenant_id, body).await?.into()))
}

pub async fn update_agent(
    State(state): State<AppState>,
    Path((tenant_id, id)): Path<(String, String)>,
    Json(body): Json<UpdateAgent>,
) -> Result<Json<AgentView>, ApiError> {
    state
        .agents
        .update(&tenant_id, &id, body)
        .await?
        .map(|a| Json(a.into()))
        .ok_or_else(|| ApiError::not_found("agent not found"))
}

pub async fn delete_agent(
    State(state): State<AppState>,
    Path((tenant_id, id)): Path<(String, String)>,
) -> Result<Json<serde_json::Value>, ApiError> {
    if !state.agents.delete(&tenant_id, &id).await? {
        return Err(ApiError::not_found("agent not found"));
    }
    Ok(Json(serde_json::json!({ "success": true })))
}

// ── Leads ───────────────────────────────────────────────────────────────────

pub async fn list_leads(
    State(state): State<AppState>,
    Path(tenant_id): Path<String>,
) -> Result<Json<Vec<Lead>>, ApiError> {
    Ok(Json(state.leads.list(&tenant_id).await?))
}

pub async fn create_lead(
    State(state): State<AppState>,
    Path(tenant_id): Path<String>,
    Json(body): Json<NewLead>,
) -> Result<Json<Lead>, ApiError> {
    Ok(Json(state.leads.create(&tenant_id, body).await?))
}

#[derive(Deserialize)]
pub struct StatusChange {
    pub status: String,
}

/// Kanban stage move; records a `status_changed` activity alongside.
pub async fn update_lead_status(
    State(state): State<AppState>,
    Path((tenant_id, id)): Path<(String, String)>,
    Json(body): Json<StatusChange>,
) -> Result<Json<Lead>, ApiError> {
    state
        .leads
        .update_status(&tenant_id, &id, &body.status)
        .await?
        .map(Json)
        .ok_or_else(|| ApiError::not_found("lead not found"))
}

pub async fn delete_lead(
    State(state): State<AppState>,
    Path((tenant_id, id)): Path<(String, String)>,
) -> Result<Json<serde_json::Value>, ApiError> {
    if !state.leads.soft_delete(&tenant_id, &id).await? {
        return Err(ApiError::not_found("lead not found"));
    }
    Ok(Json(serde_json::json!({ "success": true })))
}

pub async fn list_activities(
    State(state): State<AppState>,
    Path((tenant_id, id)): Path<(String, String)>,
) -> Result<Json<Vec<Activity>>, ApiError> {
    Ok(Json(state.activities.list_for_lead(&tenant_id, &id).await?))
}
