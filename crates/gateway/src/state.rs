//! Shared app state.

use std::sync::Arc;

use {
    sqlx::SqlitePool,
    zapcrm_agents::SqliteAgentStore,
    zapcrm_auto_reply::MessagePipeline,
    zapcrm_leads::{SqliteActivityLog, SqliteLeadStore},
    zapcrm_sessions::{SessionManager, SqliteSessionStore},
};

use crate::supervisor::TransportSupervisor;

#[derive(Clone)]
pub struct AppState {
    pub sessions: Arc<SessionManager>,
    pub agents: Arc<SqliteAgentStore>,
    pub leads: Arc<SqliteLeadStore>,
    pub activities: Arc<SqliteActivityLog>,
    pub supervisor: TransportSupervisor,
}

impl AppState {
    /// Wire stores, pipeline, and supervisor from one pool and the
    /// classifier resolver. The caller has already run schema init.
    pub fn build(
        pool: SqlitePool,
        resolver: Arc<dyn zapcrm_agents::ClassifierResolver>,
        reconnect_delay: std::time::Duration,
    ) -> Self {
        let sessions = Arc::new(SessionManager::new(
            SqliteSessionStore::new(pool.clone()),
            reconnect_delay,
        ));
        let pipeline = Arc::new(MessagePipeline::new(
            SqliteAgentStore::new(pool.clone()),
            SqliteLeadStore::new(pool.clone()),
            resolver,
        ));
        let supervisor = TransportSupervisor::new(Arc::clone(&sessions), pipeline);

        Self {
            sessions,
            agents: Arc::new(SqliteAgentStore::new(pool.clone())),
            leads: Arc::new(SqliteLeadStore::new(pool.clone())),
            activities: Arc::new(SqliteActivityLog::new(pool)),
            supervisor,
        }
    }
}
