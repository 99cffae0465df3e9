//! Session lifecycle state machine.
//!
//! Consumes transport lifecycle events and maps them onto the persisted
//! session row. Every transition writes through the store before returning;
//! a transition that fails to persist is reported as an error and has not
//! happened. Events for one tenant are serialized; tenants never block each
//! other.

use std::time::Duration;

use tracing::{info, warn};

use zapcrm_common::KeyedLocks;

use crate::{
    qr,
    state::{CloseReason, ReconnectPolicy, SessionState},
    store::{SessionSnapshot, SqliteSessionStore},
};

pub struct SessionManager {
    store: SqliteSessionStore,
    locks: KeyedLocks,
    reconnect_delay: Duration,
}

impl SessionManager {
    pub fn new(store: SqliteSessionStore, reconnect_delay: Duration) -> Self {
        Self {
            store,
            locks: KeyedLocks::new(),
            reconnect_delay,
        }
    }

    /// A fresh pairing challenge arrived: render it and move to
    /// `awaiting_scan`, replacing any stale challenge.
    ///
    /// Rendering failure is not allowed to lose the transition — the state
    /// still moves, with a null payload, and the failure is logged.
    pub async fn report_challenge(&self, tenant_id: &str, raw: &str) -> anyhow::Result<()> {
        let lock = self.locks.get(tenant_id);
        let _guard = lock.lock().await;

        let rendered = match qr::render_data_uri(raw) {
            Ok(uri) => Some(uri),
            Err(e) => {
                warn!(tenant_id, error = %e, "challenge rendering failed; storing null payload");
                None
            },
        };

        self.store
            .set_state(tenant_id, SessionState::AwaitingScan, rendered.as_deref())
            .await?;
        info!(tenant_id, "session awaiting scan");
        Ok(())
    }

    /// The transport finished its handshake.
    pub async fn report_opened(&self, tenant_id: &str) -> anyhow::Result<()> {
        let lock = self.locks.get(tenant_id);
        let _guard = lock.lock().await;

        self.store
            .set_state(tenant_id, SessionState::Connected, None)
            .await?;
        info!(tenant_id, "session connected");
        Ok(())
    }

    /// The transport closed. Returns whether the host should reconnect:
    /// explicit logout is terminal, anything else retries after a fixed
    /// short delay.
    pub async fn report_closed(
        &self,
        tenant_id: &str,
        reason: &CloseReason,
    ) -> anyhow::Result<ReconnectPolicy> {
        let lock = self.locks.get(tenant_id);
        let _guard = lock.lock().await;

        self.store
            .set_state(tenant_id, SessionState::Disconnected, None)
            .await?;

        if reason.is_terminal() {
            info!(tenant_id, %reason, "session logged out; not reconnecting");
            Ok(ReconnectPolicy::Terminal)
        } else {
            info!(
                tenant_id,
                %reason,
                delay_secs = self.reconnect_delay.as_secs(),
                "session dropped; reconnect scheduled"
            );
            Ok(ReconnectPolicy::Retry {
                delay: self.reconnect_delay,
            })
        }
    }

    /// Read-only projection for the dashboard; provisions a `disconnected`
    /// row on first query.
    pub async fn current_state(&self, tenant_id: &str) -> anyhow::Result<SessionSnapshot> {
        self.store.ensure(tenant_id).await
    }

    /// Externally triggered logout: disconnected, challenge and credential
    /// material wiped, no auto-reconnect.
    pub async fn force_disconnect(&self, tenant_id: &str) -> anyhow::Result<()> {
        let lock = self.locks.get(tenant_id);
        let _guard = lock.lock().await;

        self.store.logout(tenant_id).await?;
        info!(tenant_id, "session force-disconnected");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use sqlx::SqlitePool;

    use super::*;

    async fn manager() -> SessionManager {
        let pool = SqlitePool::connect("sqlite::memory:").await.unwrap();
        SqliteSessionStore::init(&pool).await.unwrap();
        SessionManager::new(SqliteSessionStore::new(pool), Duration::from_secs(3))
    }

    #[tokio::test]
    async fn challenge_then_open_reaches_connected() {
        let m = manager().await;

        m.report_challenge("t1", "1@challenge,data").await.unwrap();
        let s = m.current_state("t1").await.unwrap();
        assert_eq!(s.state, SessionState::AwaitingScan);
        assert!(s.qr_code.as_deref().unwrap_or("").starts_with("data:image/png;base64,"));

        m.report_opened("t1").await.unwrap();
        let s = m.current_state("t1").await.unwrap();
        assert_eq!(s.state, SessionState::Connected);
        assert!(s.qr_code.is_none());
    }

    #[tokio::test]
    async fn render_failure_still_transitions() {
        let m = manager().await;

        // Payload too large for any QR version — rendering fails, state moves.
        m.report_challenge("t1", &"x".repeat(8 * 1024)).await.unwrap();
        let s = m.current_state("t1").await.unwrap();
        assert_eq!(s.state, SessionState::AwaitingScan);
        assert!(s.qr_code.is_none());
    }

    #[tokio::test]
    async fn fresh_challenge_replaces_stale_one() {
        let m = manager().await;

        m.report_challenge("t1", "first").await.unwrap();
        let first = m.current_state("t1").await.unwrap().qr_code;
        m.report_challenge("t1", "second-challenge").await.unwrap();
        let second = m.current_state("t1").await.unwrap().qr_code;
        assert_ne!(first, second);
    }

    #[tokio::test]
    async fn close_reason_drives_reconnect_policy() {
        let m = manager().await;
        m.report_opened("t1").await.unwrap();

        let policy = m
            .report_closed("t1", &CloseReason::parse("NAVIGATION"))
            .await
            .unwrap();
        assert_eq!(
            policy,
            ReconnectPolicy::Retry {
                delay: Duration::from_secs(3)
            }
        );
        assert_eq!(
            m.current_state("t1").await.unwrap().state,
            SessionState::Disconnected
        );

        let policy = m
            .report_closed("t1", &CloseReason::parse("logout"))
            .await
            .unwrap();
        assert_eq!(policy, ReconnectPolicy::Terminal);
    }

    #[tokio::test]
    async fn current_state_provisions_once() {
        let m = manager().await;

        let s = m.current_state("fresh").await.unwrap();
        assert_eq!(s.state, SessionState::Disconnected);
        let first_ts = s.updated_at;

        let s = m.current_state("fresh").await.unwrap();
        assert_eq!(s.updated_at, first_ts);
    }

    #[tokio::test]
    async fn force_disconnect_is_terminal_cleanup() {
        let pool = SqlitePool::connect("sqlite::memory:").await.unwrap();
        SqliteSessionStore::init(&pool).await.unwrap();
        let store = SqliteSessionStore::new(pool.clone());
        store.set_session_data("t1", Some("creds")).await.unwrap();

        let m = SessionManager::new(SqliteSessionStore::new(pool), Duration::from_secs(3));
        m.report_challenge("t1", "qr").await.unwrap();
        m.force_disconnect("t1").await.unwrap();

        let s = m.current_state("t1").await.unwrap();
        assert_eq!(s.state, SessionState::Disconnected);
        assert!(s.qr_code.is_none());
        assert!(store.session_data("t1").await.unwrap().is_none());
    }
}
