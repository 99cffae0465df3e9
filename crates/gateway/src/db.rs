//! Schema initialization for every store in one place.

use {
    anyhow::Result,
    sqlx::SqlitePool,
    zapcrm_agents::SqliteAgentStore,
    zapcrm_leads::{SqliteActivityLog, SqliteLeadStore},
    zapcrm_sessions::SqliteSessionStore,
};

/// Create all tables and indexes. Idempotent; safe to run at every boot.
pub async fn init_schema(pool: &SqlitePool) -> Result<()> {
    SqliteSessionStore::init(pool).await?;
    SqliteAgentStore::init(pool).await?;
    SqliteLeadStore::init(pool).await?;
    SqliteActivityLog::init(pool).await?;
    Ok(())
}
