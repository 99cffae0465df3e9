//! Agent records and their SQLite store.

use {
    anyhow::Result,
    secrecy::{ExposeSecret, Secret},
    serde::Deserialize,
    sqlx::SqlitePool,
    zapcrm_common::now_ms,
};

/// A configured automated-reply profile belonging to a tenant.
#[derive(Debug, Clone)]
pub struct Agent {
    pub id: String,
    pub tenant_id: String,
    pub name: String,
    /// Free-text behavior directive injected into the classifier prompt.
    pub personality: String,
    /// Provider identifier: "openai", "groq", "gemini".
    pub provider: String,
    pub model: Option<String>,
    pub api_key: Option<Secret<String>>,
    pub is_active: bool,
    pub created_at: i64,
    pub updated_at: i64,
}

impl Agent {
    /// Whether a usable credential is configured.
    #[must_use]
    pub fn has_api_key(&self) -> bool {
        self.api_key
            .as_ref()
            .is_some_and(|k| !k.expose_secret().is_empty())
    }
}

/// Payload for creating an agent.
#[derive(Debug, Clone, Deserialize)]
pub struct NewAgent {
    pub name: String,
    pub personality: String,
    pub provider: String,
    pub model: Option<String>,
    pub api_key: Option<String>,
    #[serde(default = "default_active")]
    pub is_active: bool,
}

fn default_active() -> bool {
    true
}

/// Partial update; `None` fields are left untouched. `api_key` uses a
/// nested Option so the caller can distinguish "keep" from "clear".
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateAgent {
    pub name: Option<String>,
    pub personality: Option<String>,
    pub provider: Option<String>,
    pub model: Option<Option<String>>,
    pub api_key: Option<Option<String>>,
    pub is_active: Option<bool>,
}

#[derive(sqlx::FromRow)]
struct AgentRow {
    id: String,
    tenant_id: String,
    name: String,
    personality: String,
    provider: String,
    model: Option<String>,
    api_key: Option<String>,
    is_active: bool,
    created_at: i64,
    updated_at: i64,
}

impl From<AgentRow> for Agent {
    fn from(r: AgentRow) -> Self {
        Self {
            id: r.id,
            tenant_id: r.tenant_id,
            name: r.name,
            personality: r.personality,
            provider: r.provider,
            model: r.model,
            api_key: r.api_key.map(Secret::new),
            is_active: r.is_active,
            created_at: r.created_at,
            updated_at: r.updated_at,
        }
    }
}

const AGENT_COLUMNS: &str = "id, tenant_id, name, personality, provider, model, api_key, \
                             is_active, created_at, updated_at";

/// SQLite-backed agent store.
pub struct SqliteAgentStore {
    pool: SqlitePool,
}

impl SqliteAgentStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Initialize the agents table schema.
    pub async fn init(pool: &SqlitePool) -> Result<()> {
        sqlx::query(
            "CREATE TABLE IF NOT EXISTS agents (
                id          TEXT    PRIMARY KEY,
                tenant_id   TEXT    NOT NULL,
                name        TEXT    NOT NULL,
                personality TEXT    NOT NULL,
                provider    TEXT    NOT NULL,
                model       TEXT,
                api_key     TEXT,
                is_active   INTEGER NOT NULL DEFAULT 1,
                created_at  INTEGER NOT NULL,
                updated_at  INTEGER NOT NULL
            )",
        )
        .execute(pool)
        .await?;

        sqlx::query(
            "CREATE INDEX IF NOT EXISTS idx_agents_tenant_active ON agents (tenant_id, is_active)",
        )
        .execute(pool)
        .await?;

        Ok(())
    }

    pub async fn create(&self, tenant_id: &str, agent: NewAgent) -> Result<Agent> {
        let id = uuid::Uuid::new_v4().to_string();
        let now = now_ms();

        sqlx::query(
            "INSERT INTO agents
             (id, tenant_id, name, personality, provider, model, api_key,
              is_active, created_at, updated_at)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(&id)
        .bind(tenant_id)
        .bind(&agent.name)
        .bind(&agent.personality)
        .bind(&agent.provider)
        .bind(&agent.model)
        .bind(&agent.api_key)
        .bind(agent.is_active)
        .bind(now)
        .bind(now)
        .execute(&self.pool)
        .await?;

        Ok(Agent {
            id,
            tenant_id: tenant_id.to_string(),
            name: agent.name,
            personality: agent.personality,
            provider: agent.provider,
            model: agent.model,
            api_key: agent.api_key.map(Secret::new),
            is_active: agent.is_active,
            created_at: now,
            updated_at: now,
        })
    }

    pub async fn get(&self, tenant_id: &str, id: &str) -> Result<Option<Agent>> {
        let row = sqlx::query_as::<_, AgentRow>(&format!(
            "SELECT {AGENT_COLUMNS} FROM agents WHERE tenant_id = ? AND id = ?"
        ))
        .bind(tenant_id)
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(Into::into))
    }

    /// All agents for a tenant, newest first.
    pub async fn list(&self, tenant_id: &str) -> Result<Vec<Agent>> {
        let rows = sqlx::query_as::<_, AgentRow>(&format!(
            "SELECT {AGENT_COLUMNS} FROM agents WHERE tenant_id = ? ORDER BY created_at DESC"
        ))
        .bind(tenant_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(Into::into).collect())
    }

    /// The responder the pipeline uses for a tenant.
    ///
    /// Multiple agents may be flagged active; the tie-break is deterministic:
    /// the most recently updated one wins.
    pub async fn active_agent(&self, tenant_id: &str) -> Result<Option<Agent>> {
        let row = sqlx::query_as::<_, AgentRow>(&format!(
            "SELECT {AGENT_COLUMNS} FROM agents
             WHERE tenant_id = ? AND is_active = 1
             ORDER BY updated_at DESC, id DESC
             LIMIT 1"
        ))
        .bind(tenant_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(Into::into))
    }

    /// Apply a partial update. Returns the updated agent, or `None` if it
    /// does not exist.
    pub async fn update(
        &self,
        tenant_id: &str,
        id: &str,
        update: UpdateAgent,
    ) -> Result<Option<Agent>> {
        let Some(current) = self.get(tenant_id, id).await? else {
            return Ok(None);
        };

        let name = update.name.unwrap_or(current.name);
        let personality = update.personality.unwrap_or(current.personality);
        let provider = update.provider.unwrap_or(current.provider);
        let model = update.model.unwrap_or(current.model);
        let api_key = match update.api_key {
            Some(key) => key,
            None => current.api_key.map(|k| k.expose_secret().clone()),
        };
        let is_active = update.is_active.unwrap_or(current.is_active);
        let now = now_ms();

        sqlx::query(
            "UPDATE agents
             SET name = ?, personality = ?, provider = ?, model = ?, api_key = ?,
                 is_active = ?, updated_at = ?
             WHERE tenant_id = ? AND id = ?",
        )
        .bind(&name)
        .bind(&personality)
        .bind(&provider)
        .bind(&model)
        .bind(&api_key)
        .bind(is_active)
        .bind(now)
        .bind(tenant_id)
        .bind(id)
        .execute(&self.pool)
        .await?;

        Ok(Some(Agent {
            id: id.to_string(),
            tenant_id: tenant_id.to_string(),
            name,
            personality,
            provider,
            model,
            api_key: api_key.map(Secret::new),
            is_active,
            created_at: current.created_at,
            updated_at: now,
        }))
    }

    pub async fn delete(&self, tenant_id: &str, id: &str) -> Result<bool> {
        let result = sqlx::query("DELETE FROM agents WHERE tenant_id = ? AND id = ?")
            .bind(tenant_id)
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}
