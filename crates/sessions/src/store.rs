//! Persisted session rows.
//!
//! Exactly one row per tenant; every write is an upsert keyed by tenant id.
//! The row is the only channel through which the dashboard observes
//! connection status, so reads must always see a complete row — either the
//! pre-update or the post-update one.

use {
    anyhow::Result,
    serde::Serialize,
    sqlx::SqlitePool,
    zapcrm_common::now_ms,
};

use crate::state::SessionState;

/// Dashboard-facing projection of a session row.
#[derive(Debug, Clone, Serialize)]
pub struct SessionSnapshot {
    pub tenant_id: String,
    pub state: SessionState,
    /// Rendered pairing challenge (PNG data URI), present only while
    /// awaiting a scan.
    pub qr_code: Option<String>,
    pub updated_at: i64,
}

#[derive(sqlx::FromRow)]
struct SessionRow {
    tenant_id: String,
    state: String,
    qr_code: Option<String>,
    updated_at: i64,
}

impl From<SessionRow> for SessionSnapshot {
    fn from(r: SessionRow) -> Self {
        Self {
            tenant_id: r.tenant_id,
            state: SessionState::coerce(&r.state),
            qr_code: r.qr_code,
            updated_at: r.updated_at,
        }
    }
}

/// SQLite-backed session store.
pub struct SqliteSessionStore {
    pool: SqlitePool,
}

impl SqliteSessionStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Initialize the sessions table schema.
    pub async fn init(pool: &SqlitePool) -> Result<()> {
        sqlx::query(
            "CREATE TABLE IF NOT EXISTS sessions (
                tenant_id    TEXT    PRIMARY KEY,
                state        TEXT    NOT NULL DEFAULT 'disconnected',
                qr_code      TEXT,
                session_data TEXT,
                updated_at   INTEGER NOT NULL
            )",
        )
        .execute(pool)
        .await?;
        Ok(())
    }

    pub async fn get(&self, tenant_id: &str) -> Result<Option<SessionSnapshot>> {
        let row = sqlx::query_as::<_, SessionRow>(
            "SELECT tenant_id, state, qr_code, updated_at FROM sessions WHERE tenant_id = ?",
        )
        .bind(tenant_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(Into::into))
    }

    /// First-query provisioning: insert a `disconnected` row if none exists,
    /// then return the row. Concurrent calls race harmlessly — the insert is
    /// conflict-ignoring, so exactly one row ever exists per tenant.
    pub async fn ensure(&self, tenant_id: &str) -> Result<SessionSnapshot> {
        sqlx::query(
            "INSERT INTO sessions (tenant_id, state, updated_at) VALUES (?, 'disconnected', ?)
             ON CONFLICT(tenant_id) DO NOTHING",
        )
        .bind(tenant_id)
        .bind(now_ms())
        .execute(&self.pool)
        .await?;

        let row = self.get(tenant_id).await?;
        row.ok_or_else(|| anyhow::anyhow!("session row vanished for tenant {tenant_id}"))
    }

    /// Transition the session state, replacing the stored challenge.
    /// Credential material (`session_data`) is preserved.
    pub async fn set_state(
        &self,
        tenant_id: &str,
        state: SessionState,
        qr_code: Option<&str>,
    ) -> Result<()> {
        sqlx::query(
            "INSERT INTO sessions (tenant_id, state, qr_code, updated_at) VALUES (?, ?, ?, ?)
             ON CONFLICT(tenant_id) DO UPDATE SET
               state      = excluded.state,
               qr_code    = excluded.qr_code,
               updated_at = excluded.updated_at",
        )
        .bind(tenant_id)
        .bind(state.as_str())
        .bind(qr_code)
        .bind(now_ms())
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// Store (or clear) opaque credential material for reconnects.
    pub async fn set_session_data(&self, tenant_id: &str, data: Option<&str>) -> Result<()> {
        sqlx::query(
            "INSERT INTO sessions (tenant_id, state, session_data, updated_at)
             VALUES (?, 'disconnected', ?, ?)
             ON CONFLICT(tenant_id) DO UPDATE SET
               session_data = excluded.session_data,
               updated_at   = excluded.updated_at",
        )
        .bind(tenant_id)
        .bind(data)
        .bind(now_ms())
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// Terminal logout: disconnected, challenge gone, credentials wiped.
    pub async fn logout(&self, tenant_id: &str) -> Result<()> {
        sqlx::query(
            "INSERT INTO sessions (tenant_id, state, updated_at) VALUES (?, 'disconnected', ?)
             ON CONFLICT(tenant_id) DO UPDATE SET
               state        = 'disconnected',
               qr_code      = NULL,
               session_data = NULL,
               updated_at   = excluded.updated_at",
        )
        .bind(tenant_id)
        .bind(now_ms())
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// Read back stored credential material (plugin-opaque).
    pub async fn session_data(&self, tenant_id: &str) -> Result<Option<String>> {
        let data = sqlx::query_scalar::<_, Option<String>>(
            "SELECT session_data FROM sessions WHERE tenant_id = ?",
        )
        .bind(tenant_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(data.flatten())
    }
}
