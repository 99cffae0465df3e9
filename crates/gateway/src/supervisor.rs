//! Transport supervision.
//!
//! The supervisor is the event sink every transport plugin pushes into. It
//! routes lifecycle events to the session state machine, inbound messages to
//! the auto-reply pipeline, and schedules reconnects when a session drops
//! for a retryable reason. Reconnect sleeps run in spawned tasks so one
//! tenant's backoff never stalls another's events.

use std::{
    collections::HashMap,
    sync::{Arc, Weak},
    time::Duration,
};

use {
    async_trait::async_trait,
    tokio::sync::{RwLock, mpsc},
    tracing::{debug, error, info, warn},
};

use {
    zapcrm_auto_reply::MessagePipeline,
    zapcrm_channels::{
        TransportEventSink, TransportPlugin, TransportRegistry, contact_number, is_pseudo_contact,
    },
    zapcrm_common::MsgContext,
    zapcrm_sessions::{CloseReason, ReconnectPolicy, SessionManager},
};

/// Which plugin a tenant's session runs on, and the plugin-opaque config
/// needed to re-establish it.
#[derive(Clone)]
struct SessionBinding {
    plugin_id: String,
    config: serde_json::Value,
}

enum Control {
    Restart { tenant_id: String, delay: Duration },
}

struct SupervisorInner {
    registry: RwLock<TransportRegistry>,
    bindings: RwLock<HashMap<String, SessionBinding>>,
    sessions: Arc<SessionManager>,
    pipeline: Arc<MessagePipeline>,
    control: mpsc::Sender<Control>,
}

#[derive(Clone)]
pub struct TransportSupervisor {
    inner: Arc<SupervisorInner>,
}

impl TransportSupervisor {
    pub fn new(sessions: Arc<SessionManager>, pipeline: Arc<MessagePipeline>) -> Self {
        let (tx, rx) = mpsc::channel(64);
        let inner = Arc::new(SupervisorInner {
            registry: RwLock::new(TransportRegistry::new()),
            bindings: RwLock::new(HashMap::new()),
            sessions,
            pipeline,
            control: tx,
        });

        tokio::spawn(control_loop(rx, Arc::downgrade(&inner)));

        Self { inner }
    }

    pub async fn register_plugin(&self, plugin: Arc<dyn TransportPlugin>) {
        info!(plugin = plugin.id(), "transport plugin registered");
        self.inner.registry.write().await.register(plugin);
    }

    /// Start a tenant's transport session and remember the binding for
    /// later restarts. Tenant id is always an explicit input.
    pub async fn start_session(
        &self,
        plugin_id: &str,
        tenant_id: &str,
        config: serde_json::Value,
    ) -> anyhow::Result<()> {
        let plugin = self
            .inner
            .registry
            .read()
            .await
            .get(plugin_id)
            .ok_or_else(|| anyhow::anyhow!("unknown transport plugin: {plugin_id}"))?;

        self.inner.bindings.write().await.insert(
            tenant_id.to_string(),
            SessionBinding {
                plugin_id: plugin_id.to_string(),
                config: config.clone(),
            },
        );

        plugin.start_session(tenant_id, config).await
    }

    /// Stop a tenant's live session and drop its restart binding.
    pub async fn stop_session(&self, tenant_id: &str) -> anyhow::Result<()> {
        let Some(binding) = self.inner.bindings.write().await.remove(tenant_id) else {
            debug!(tenant_id, "no live transport session to stop");
            return Ok(());
        };

        let plugin = self
            .inner
            .registry
            .read()
            .await
            .get(&binding.plugin_id)
            .ok_or_else(|| anyhow::anyhow!("unknown transport plugin: {}", binding.plugin_id))?;
        plugin.stop_session(tenant_id).await
    }
}

async fn control_loop(mut rx: mpsc::Receiver<Control>, inner: Weak<SupervisorInner>) {
    while let Some(msg) = rx.recv().await {
        match msg {
            Control::Restart { tenant_id, delay } => {
                let inner = inner.clone();
                tokio::spawn(async move {
                    tokio::time::sleep(delay).await;
                    let Some(inner) = inner.upgrade() else { return };
                    restart_session(&inner, &tenant_id).await;
                });
            },
        }
    }
}

async fn restart_session(inner: &SupervisorInner, tenant_id: &str) {
    let Some(binding) = inner.bindings.read().await.get(tenant_id).cloned() else {
        // Force-disconnected (or never started) while the restart was
        // pending; nothing to re-establish.
        debug!(tenant_id, "restart skipped: no transport binding");
        return;
    };

    let plugin = inner.registry.read().await.get(&binding.plugin_id);
    match plugin {
        Some(plugin) => {
            info!(tenant_id, plugin = %binding.plugin_id, "re-establishing transport session");
            if let Err(e) = plugin.start_session(tenant_id, binding.config.clone()).await {
                error!(tenant_id, error = %e, "transport session restart failed");
            }
        },
        None => error!(
            tenant_id,
            plugin = %binding.plugin_id,
            "restart failed: plugin not registered"
        ),
    }
}

#[async_trait]
impl TransportEventSink for TransportSupervisor {
    async fn challenge(&self, tenant_id: &str, raw: &str) {
        if let Err(e) = self.inner.sessions.report_challenge(tenant_id, raw).await {
            error!(tenant_id, error = %e, "failed to persist challenge");
        }
    }

    async fn opened(&self, tenant_id: &str) {
        if let Err(e) = self.inner.sessions.report_opened(tenant_id).await {
            error!(tenant_id, error = %e, "failed to persist session open");
        }
    }

    async fn closed(&self, tenant_id: &str, reason: &str) {
        let reason = CloseReason::parse(reason);
        match self.inner.sessions.report_closed(tenant_id, &reason).await {
            Ok(ReconnectPolicy::Retry { delay }) => {
                let sent = self
                    .inner
                    .control
                    .send(Control::Restart {
                        tenant_id: tenant_id.to_string(),
                        delay,
                    })
                    .await;
                if sent.is_err() {
                    error!(tenant_id, "control loop gone; reconnect not scheduled");
                }
            },
            Ok(ReconnectPolicy::Terminal) => {
                // Terminal logout also invalidates the restart binding.
                self.inner.bindings.write().await.remove(tenant_id);
            },
            Err(e) => error!(tenant_id, error = %e, "failed to persist session close"),
        }
    }

    async fn message(&self, tenant_id: &str, from: &str, body: Option<&str>) {
        if is_pseudo_contact(from) {
            debug!(tenant_id, from, "pseudo-contact message ignored");
            return;
        }
        let Some(body) = body else {
            debug!(tenant_id, from, "non-text message ignored");
            return;
        };

        let msg = MsgContext::new(tenant_id, contact_number(from), from, body);
        let reply = match self.inner.pipeline.handle_inbound(&msg).await {
            Ok(Some(reply)) => reply,
            Ok(None) => return,
            Err(e) => {
                error!(tenant_id, from, error = %e, "inbound processing failed; no reply sent");
                return;
            },
        };

        let binding = self.inner.bindings.read().await.get(tenant_id).cloned();
        let Some(binding) = binding else {
            warn!(tenant_id, "reply ready but no transport binding; dropping");
            return;
        };

        let registry = self.inner.registry.read().await;
        let Some(plugin) = registry.get(&binding.plugin_id) else {
            warn!(tenant_id, plugin = %binding.plugin_id, "reply ready but plugin missing");
            return;
        };
        match plugin.outbound() {
            Some(outbound) => {
                if let Err(e) = outbound.send_text(tenant_id, from, &reply).await {
                    error!(tenant_id, to = from, error = %e, "outbound reply failed");
                }
            },
            None => warn!(plugin = %binding.plugin_id, "transport has no outbound adapter"),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use {
        sqlx::SqlitePool,
        zapcrm_agents::{
            Agent, ClassifierResolver, NewAgent, SqliteAgentStore,
            model::{Classification, LeadClassifier},
        },
        zapcrm_common::Temperature,
        zapcrm_leads::SqliteLeadStore,
        zapcrm_sessions::{SessionState, SqliteSessionStore},
    };

    use super::*;

    #[derive(Default)]
    struct FakeTransport {
        starts: Mutex<Vec<String>>,
        sent: Mutex<Vec<(String, String, String)>>,
    }

    #[async_trait]
    impl TransportPlugin for FakeTransport {
        fn id(&self) -> &str {
            "fake"
        }

        fn name(&self) -> &str {
            "Fake transport"
        }

        async fn start_session(
            &self,
            tenant_id: &str,
            _config: serde_json::Value,
        ) -> anyhow::Result<()> {
            self.starts
                .lock()
                .unwrap_or_else(|e| e.into_inner())
                .push(tenant_id.to_string());
            Ok(())
        }

        async fn stop_session(&self, _tenant_id: &str) -> anyhow::Result<()> {
            Ok(())
        }

        fn outbound(&self) -> Option<&dyn zapcrm_channels::TransportOutbound> {
            Some(self)
        }
    }

    #[async_trait]
    impl zapcrm_channels::TransportOutbound for FakeTransport {
        async fn send_text(&self, tenant_id: &str, to: &str, text: &str) -> anyhow::Result<()> {
            self.sent.lock().unwrap_or_else(|e| e.into_inner()).push((
                tenant_id.to_string(),
                to.to_string(),
                text.to_string(),
            ));
            Ok(())
        }
    }

    struct WarmResolver;

    struct WarmClassifier;

    #[async_trait]
    impl LeadClassifier for WarmClassifier {
        fn provider(&self) -> &str {
            "warm"
        }

        async fn classify(&self, _d: &str, _m: &str) -> anyhow::Result<Classification> {
            Ok(Classification {
                reply: "Custa R$99".into(),
                temperature: Temperature::Warm,
            })
        }
    }

    impl ClassifierResolver for WarmResolver {
        fn resolve(&self, _agent: &Agent) -> anyhow::Result<Box<dyn LeadClassifier>> {
            Ok(Box::new(WarmClassifier))
        }
    }

    struct Fixture {
        pool: SqlitePool,
        supervisor: TransportSupervisor,
        transport: Arc<FakeTransport>,
        sessions: Arc<SessionManager>,
    }

    async fn fixture() -> Fixture {
        let pool = SqlitePool::connect("sqlite::memory:").await.unwrap();
        crate::db::init_schema(&pool).await.unwrap();

        let sessions = Arc::new(SessionManager::new(
            SqliteSessionStore::new(pool.clone()),
            Duration::from_millis(10),
        ));
        let pipeline = Arc::new(MessagePipeline::new(
            SqliteAgentStore::new(pool.clone()),
            SqliteLeadStore::new(pool.clone()),
            Arc::new(WarmResolver),
        ));

        let supervisor = TransportSupervisor::new(Arc::clone(&sessions), pipeline);
        let transport = Arc::new(FakeTransport::default());
        supervisor
            .register_plugin(Arc::clone(&transport) as Arc<dyn TransportPlugin>)
            .await;

        Fixture {
            pool,
            supervisor,
            transport,
            sessions,
        }
    }

    async fn seed_agent(pool: &SqlitePool) {
        SqliteAgentStore::new(pool.clone())
            .create(
                "t1",
                NewAgent {
                    name: "Ana".into(),
                    personality: "friendly seller".into(),
                    provider: "openai".into(),
                    model: None,
                    api_key: Some("sk-x".into()),
                    is_active: true,
                },
            )
            .await
            .unwrap();
    }

    fn starts(f: &Fixture) -> usize {
        f.transport
            .starts
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .len()
    }

    #[tokio::test]
    async fn retryable_close_schedules_restart() {
        let f = fixture().await;
        f.supervisor
            .start_session("fake", "t1", serde_json::Value::Null)
            .await
            .unwrap();
        assert_eq!(starts(&f), 1);

        f.supervisor.closed("t1", "NAVIGATION").await;
        assert_eq!(
            f.sessions.current_state("t1").await.unwrap().state,
            SessionState::Disconnected
        );

        tokio::time::sleep(Duration::from_millis(200)).await;
        assert_eq!(starts(&f), 2);
    }

    #[tokio::test]
    async fn logout_close_is_terminal() {
        let f = fixture().await;
        f.supervisor
            .start_session("fake", "t1", serde_json::Value::Null)
            .await
            .unwrap();

        f.supervisor.closed("t1", "LOGOUT").await;
        tokio::time::sleep(Duration::from_millis(200)).await;
        assert_eq!(starts(&f), 1);
        assert_eq!(
            f.sessions.current_state("t1").await.unwrap().state,
            SessionState::Disconnected
        );
    }

    #[tokio::test]
    async fn challenge_and_open_round_trip() {
        let f = fixture().await;

        f.supervisor.challenge("t1", "1@raw-challenge").await;
        let s = f.sessions.current_state("t1").await.unwrap();
        assert_eq!(s.state, SessionState::AwaitingScan);
        assert!(s.qr_code.is_some());

        f.supervisor.opened("t1").await;
        let s = f.sessions.current_state("t1").await.unwrap();
        assert_eq!(s.state, SessionState::Connected);
        assert!(s.qr_code.is_none());
    }

    #[tokio::test]
    async fn inbound_message_produces_outbound_reply() {
        let f = fixture().await;
        seed_agent(&f.pool).await;
        f.supervisor
            .start_session("fake", "t1", serde_json::Value::Null)
            .await
            .unwrap();

        f.supervisor
            .message("t1", "551199990000@c.us", Some("quanto custa?"))
            .await;

        let sent = f.transport.sent.lock().unwrap_or_else(|e| e.into_inner());
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].1, "551199990000@c.us");
        assert_eq!(sent[0].2, "Custa R$99");
        drop(sent);

        let lead = SqliteLeadStore::new(f.pool.clone())
            .find_by_phone("t1", "551199990000")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(lead.temperature, Temperature::Warm);
    }

    #[tokio::test]
    async fn pseudo_contacts_and_non_text_are_filtered() {
        let f = fixture().await;
        seed_agent(&f.pool).await;
        f.supervisor
            .start_session("fake", "t1", serde_json::Value::Null)
            .await
            .unwrap();

        f.supervisor
            .message("t1", "status@broadcast", Some("ignored"))
            .await;
        f.supervisor.message("t1", "551199990000@c.us", None).await;

        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM leads")
            .fetch_one(&f.pool)
            .await
            .unwrap();
        assert_eq!(count, 0);
        assert!(
            f.transport
                .sent
                .lock()
                .unwrap_or_else(|e| e.into_inner())
                .is_empty()
        );
    }
}
