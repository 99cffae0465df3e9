//! Append-only activity log.
//!
//! Rows are inserted once and never updated or deleted; there is no mutation
//! surface on this store by construction.

use {
    anyhow::Result,
    serde::Serialize,
    sqlx::SqlitePool,
    zapcrm_common::now_ms,
};

/// Well-known activity type tags.
pub mod activity_type {
    pub const TEMPERATURE_CHANGED: &str = "temperature_changed";
    pub const MESSAGE_EXCHANGED: &str = "message_exchanged";
    pub const STATUS_CHANGED: &str = "status_changed";
}

/// One immutable audit-log entry tied to a lead.
#[derive(Debug, Clone, Serialize)]
pub struct Activity {
    pub id: String,
    pub tenant_id: String,
    pub lead_id: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub content: String,
    /// Structured before/after payload (e.g. `{"from":"cold","to":"warm"}`).
    pub metadata: serde_json::Value,
    pub created_at: i64,
}

/// Payload for a new activity row.
#[derive(Debug, Clone)]
pub struct NewActivity {
    pub tenant_id: String,
    pub lead_id: String,
    pub kind: String,
    pub content: String,
    pub metadata: serde_json::Value,
}

impl NewActivity {
    pub fn new(
        tenant_id: impl Into<String>,
        lead_id: impl Into<String>,
        kind: impl Into<String>,
        content: impl Into<String>,
        metadata: serde_json::Value,
    ) -> Self {
        Self {
            tenant_id: tenant_id.into(),
            lead_id: lead_id.into(),
            kind: kind.into(),
            content: content.into(),
            metadata,
        }
    }
}

#[derive(sqlx::FromRow)]
struct ActivityRow {
    id: String,
    tenant_id: String,
    lead_id: String,
    #[sqlx(rename = "type")]
    kind: String,
    content: String,
    metadata: String,
    created_at: i64,
}

impl From<ActivityRow> for Activity {
    fn from(r: ActivityRow) -> Self {
        Self {
            id: r.id,
            tenant_id: r.tenant_id,
            lead_id: r.lead_id,
            kind: r.kind,
            content: r.content,
            metadata: serde_json::from_str(&r.metadata).unwrap_or(serde_json::Value::Null),
            created_at: r.created_at,
        }
    }
}

/// Shared insert used by [`SqliteActivityLog::record`] and the lead store's
/// transactional exchange commit. The single SQL site keeps the append-only
/// contract in one place.
pub(crate) async fn insert_row(
    conn: &mut sqlx::SqliteConnection,
    activity: &NewActivity,
    id: &str,
    created_at: i64,
) -> sqlx::Result<()> {
    sqlx::query(
        "INSERT INTO activities (id, tenant_id, lead_id, type, content, metadata, created_at)
         VALUES (?, ?, ?, ?, ?, ?, ?)",
    )
    .bind(id)
    .bind(&activity.tenant_id)
    .bind(&activity.lead_id)
    .bind(&activity.kind)
    .bind(&activity.content)
    .bind(activity.metadata.to_string())
    .bind(created_at)
    .execute(conn)
    .await?;
    Ok(())
}

/// SQLite-backed append-only activity log.
pub struct SqliteActivityLog {
    pool: SqlitePool,
}

impl SqliteActivityLog {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Initialize the activities table schema.
    pub async fn init(pool: &SqlitePool) -> Result<()> {
        sqlx::query(
            "CREATE TABLE IF NOT EXISTS activities (
                id         TEXT    PRIMARY KEY,
                tenant_id  TEXT    NOT NULL,
                lead_id    TEXT    NOT NULL,
                type       TEXT    NOT NULL,
                content    TEXT    NOT NULL,
                metadata   TEXT    NOT NULL DEFAULT 'null',
                created_at INTEGER NOT NULL
            )",
        )
        .execute(pool)
        .await?;

        sqlx::query(
            "CREATE INDEX IF NOT EXISTS idx_activities_lead_created
             ON activities (lead_id, created_at)",
        )
        .execute(pool)
        .await?;

        Ok(())
    }

    /// Append one activity row. Insert-only; there is no update or delete.
    pub async fn record(&self, activity: NewActivity) -> Result<Activity> {
        let id = uuid::Uuid::new_v4().to_string();
        let created_at = now_ms();

        let mut conn = self.pool.acquire().await?;
        insert_row(&mut conn, &activity, &id, created_at).await?;

        Ok(Activity {
            id,
            tenant_id: activity.tenant_id,
            lead_id: activity.lead_id,
            kind: activity.kind,
            content: activity.content,
            metadata: activity.metadata,
            created_at,
        })
    }

    /// All activities for one lead, oldest first (creation order).
    pub async fn list_for_lead(&self, tenant_id: &str, lead_id: &str) -> Result<Vec<Activity>> {
        let rows = sqlx::query_as::<_, ActivityRow>(
            "SELECT id, tenant_id, lead_id, type, content, metadata, created_at
             FROM activities
             WHERE tenant_id = ? AND lead_id = ?
             ORDER BY created_at, rowid",
        )
        .bind(tenant_id)
        .bind(lead_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(Into::into).collect())
    }

    /// Recent activities across a tenant, newest first.
    pub async fn list_for_tenant(&self, tenant_id: &str, limit: u32) -> Result<Vec<Activity>> {
        let rows = sqlx::query_as::<_, ActivityRow>(
            "SELECT id, tenant_id, lead_id, type, content, metadata, created_at
             FROM activities
             WHERE tenant_id = ?
             ORDER BY created_at DESC, rowid DESC
             LIMIT ?",
        )
        .bind(tenant_id)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(Into::into).collect())
    }
}
