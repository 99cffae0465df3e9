use std::sync::Arc;

use tracing::{debug, info, warn};

use {
    zapcrm_agents::{Agent, ClassifierResolver, SqliteAgentStore, model::Classification},
    zapcrm_common::{KeyedLocks, MsgContext},
    zapcrm_leads::{NewActivity, NewLead, SqliteLeadStore, activity_type},
};

/// The inbound message pipeline.
///
/// One instance per process; safe to share. Side effects for a given
/// (tenant, contact) pair are serialized, so re-deliveries and concurrent
/// messages from one contact cannot race lead creation or produce
/// out-of-order temperature transitions.
pub struct MessagePipeline {
    agents: SqliteAgentStore,
    leads: SqliteLeadStore,
    resolver: Arc<dyn ClassifierResolver>,
    locks: KeyedLocks,
}

impl MessagePipeline {
    pub fn new(
        agents: SqliteAgentStore,
        leads: SqliteLeadStore,
        resolver: Arc<dyn ClassifierResolver>,
    ) -> Self {
        Self {
            agents,
            leads,
            resolver,
            locks: KeyedLocks::new(),
        }
    }

    /// Process one inbound message and produce the reply to send back.
    ///
    /// `Ok(None)` means "stay silent": the tenant has no usable responder
    /// configured, or the classification capability failed — both absorbed
    /// here by design. `Err` is reserved for persistence failures, where the
    /// reply must NOT be sent because the audit trail could not be written.
    pub async fn handle_inbound(&self, msg: &MsgContext) -> anyhow::Result<Option<String>> {
        info!(
            tenant_id = %msg.tenant_id,
            contact = %msg.contact,
            "incoming message: {}",
            msg.body,
        );

        let Some(agent) = self.agents.active_agent(&msg.tenant_id).await? else {
            debug!(tenant_id = %msg.tenant_id, "no active agent; staying silent");
            return Ok(None);
        };
        if !agent.has_api_key() {
            debug!(
                tenant_id = %msg.tenant_id,
                agent_id = %agent.id,
                "active agent has no api key; staying silent"
            );
            return Ok(None);
        }

        // Everything from lead resolution to the activity commit runs inside
        // the per-(tenant, contact) critical section.
        let lock = self.locks.get(&format!("{}:{}", msg.tenant_id, msg.contact));
        let _guard = lock.lock().await;

        let lead = match self.leads.find_by_phone(&msg.tenant_id, &msg.contact).await? {
            Some(lead) => lead,
            None => {
                self.leads
                    .create(&msg.tenant_id, NewLead::from_contact(&msg.contact))
                    .await?
            },
        };

        let classification = match self.classify(&agent, &msg.body).await {
            Ok(c) => c,
            Err(e) => {
                warn!(
                    tenant_id = %msg.tenant_id,
                    agent_id = %agent.id,
                    lead_id = %lead.id,
                    error = %e,
                    "classification failed; message dropped without reply"
                );
                return Ok(None);
            },
        };

        let mut activities = Vec::new();
        if classification.temperature != lead.temperature {
            activities.push(NewActivity::new(
                &msg.tenant_id,
                &lead.id,
                activity_type::TEMPERATURE_CHANGED,
                format!(
                    "AI reclassified temperature from {} to {}",
                    lead.temperature, classification.temperature
                ),
                serde_json::json!({
                    "from": lead.temperature,
                    "to": classification.temperature,
                }),
            ));
        }
        activities.push(NewActivity::new(
            &msg.tenant_id,
            &lead.id,
            activity_type::MESSAGE_EXCHANGED,
            format!("Contact: {}\nAI: {}", msg.body, classification.reply),
            serde_json::json!({ "direction": "inbound_auto_replied" }),
        ));

        self.leads
            .commit_exchange(&lead, classification.temperature, activities)
            .await?;

        info!(
            tenant_id = %msg.tenant_id,
            lead_id = %lead.id,
            temperature = %classification.temperature,
            "reply ready"
        );
        Ok(Some(classification.reply))
    }

    async fn classify(&self, agent: &Agent, body: &str) -> anyhow::Result<Classification> {
        let classifier = self.resolver.resolve(agent)?;
        classifier.classify(&agent.personality, body).await
    }
}

#[cfg(test)]
mod tests {
    use {
        async_trait::async_trait,
        sqlx::SqlitePool,
        zapcrm_agents::{NewAgent, model::LeadClassifier},
        zapcrm_common::Temperature,
        zapcrm_leads::SqliteActivityLog,
    };

    use super::*;

    #[derive(Clone)]
    enum Script {
        Reply(&'static str, Temperature),
        Fail,
    }

    struct ScriptedClassifier(Script);

    #[async_trait]
    impl LeadClassifier for ScriptedClassifier {
        fn provider(&self) -> &str {
            "scripted"
        }

        async fn classify(&self, _d: &str, _m: &str) -> anyhow::Result<Classification> {
            match &self.0 {
                Script::Reply(reply, temperature) => Ok(Classification {
                    reply: (*reply).to_string(),
                    temperature: *temperature,
                }),
                Script::Fail => anyhow::bail!("simulated provider timeout"),
            }
        }
    }

    struct ScriptedResolver(Script);

    impl ClassifierResolver for ScriptedResolver {
        fn resolve(&self, _agent: &Agent) -> anyhow::Result<Box<dyn LeadClassifier>> {
            Ok(Box::new(ScriptedClassifier(self.0.clone())))
        }
    }

    struct Fixture {
        pool: SqlitePool,
        pipeline: Arc<MessagePipeline>,
    }

    async fn fixture(script: Script) -> Fixture {
        let pool = SqlitePool::connect("sqlite::memory:").await.unwrap();
        SqliteAgentStore::init(&pool).await.unwrap();
        SqliteLeadStore::init(&pool).await.unwrap();
        SqliteActivityLog::init(&pool).await.unwrap();

        let pipeline = Arc::new(MessagePipeline::new(
            SqliteAgentStore::new(pool.clone()),
            SqliteLeadStore::new(pool.clone()),
            Arc::new(ScriptedResolver(script)),
        ));
        Fixture { pool, pipeline }
    }

    async fn seed_agent(pool: &SqlitePool, api_key: Option<&str>) {
        SqliteAgentStore::new(pool.clone())
            .create(
                "t1",
                NewAgent {
                    name: "Ana".into(),
                    personality: "friendly seller".into(),
                    provider: "openai".into(),
                    model: None,
                    api_key: api_key.map(Into::into),
                    is_active: true,
                },
            )
            .await
            .unwrap();
    }

    fn msg(body: &str) -> MsgContext {
        MsgContext::new("t1", "551199990000", "551199990000@c.us", body)
    }

    async fn count(pool: &SqlitePool, sql: &str) -> i64 {
        sqlx::query_scalar(sql).fetch_one(pool).await.unwrap()
    }

    #[tokio::test]
    async fn unconfigured_tenant_is_a_silent_noop() {
        let f = fixture(Script::Reply("hi", Temperature::Cold)).await;

        let reply = f.pipeline.handle_inbound(&msg("hello?")).await.unwrap();
        assert!(reply.is_none());
        assert_eq!(count(&f.pool, "SELECT COUNT(*) FROM leads").await, 0);
        assert_eq!(count(&f.pool, "SELECT COUNT(*) FROM activities").await, 0);
    }

    #[tokio::test]
    async fn agent_without_credential_is_a_silent_noop() {
        let f = fixture(Script::Reply("hi", Temperature::Cold)).await;
        seed_agent(&f.pool, None).await;

        let reply = f.pipeline.handle_inbound(&msg("hello?")).await.unwrap();
        assert!(reply.is_none());
        assert_eq!(count(&f.pool, "SELECT COUNT(*) FROM leads").await, 0);
    }

    #[tokio::test]
    async fn first_contact_creates_placeholder_cold_lead() {
        let f = fixture(Script::Reply("welcome!", Temperature::Cold)).await;
        seed_agent(&f.pool, Some("sk-x")).await;

        let reply = f.pipeline.handle_inbound(&msg("oi")).await.unwrap();
        assert_eq!(reply.as_deref(), Some("welcome!"));

        let lead = SqliteLeadStore::new(f.pool.clone())
            .find_by_phone("t1", "551199990000")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(lead.name, "551199990000");
        assert_eq!(lead.status, "new");
        assert_eq!(lead.temperature, Temperature::Cold);

        // Same temperature — only the message exchange is recorded.
        let activities = SqliteActivityLog::new(f.pool.clone())
            .list_for_lead("t1", &lead.id)
            .await
            .unwrap();
        assert_eq!(activities.len(), 1);
        assert_eq!(activities[0].kind, activity_type::MESSAGE_EXCHANGED);
    }

    #[tokio::test]
    async fn warm_classification_moves_temperature_and_audits_both() {
        let f = fixture(Script::Reply("Custa R$99", Temperature::Warm)).await;
        seed_agent(&f.pool, Some("sk-x")).await;

        let reply = f
            .pipeline
            .handle_inbound(&msg("quanto custa?"))
            .await
            .unwrap();
        assert_eq!(reply.as_deref(), Some("Custa R$99"));

        let lead = SqliteLeadStore::new(f.pool.clone())
            .find_by_phone("t1", "551199990000")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(lead.temperature, Temperature::Warm);

        let activities = SqliteActivityLog::new(f.pool.clone())
            .list_for_lead("t1", &lead.id)
            .await
            .unwrap();
        assert_eq!(activities.len(), 2);
        assert_eq!(activities[0].kind, activity_type::TEMPERATURE_CHANGED);
        assert_eq!(activities[0].metadata["from"], "cold");
        assert_eq!(activities[0].metadata["to"], "warm");
        assert_eq!(activities[1].kind, activity_type::MESSAGE_EXCHANGED);
        assert!(activities[1].content.contains("quanto custa?"));
        assert!(activities[1].content.contains("Custa R$99"));
    }

    #[tokio::test]
    async fn capability_failure_drops_message_after_lead_creation() {
        let f = fixture(Script::Fail).await;
        seed_agent(&f.pool, Some("sk-x")).await;

        let reply = f.pipeline.handle_inbound(&msg("hello?")).await.unwrap();
        assert!(reply.is_none());

        // Creation-if-new happened, nothing else did.
        assert_eq!(count(&f.pool, "SELECT COUNT(*) FROM leads").await, 1);
        assert_eq!(count(&f.pool, "SELECT COUNT(*) FROM activities").await, 0);
    }

    #[tokio::test]
    async fn n_messages_append_n_exchange_activities() {
        let f = fixture(Script::Reply("ok", Temperature::Cold)).await;
        seed_agent(&f.pool, Some("sk-x")).await;

        for i in 0..3 {
            f.pipeline
                .handle_inbound(&msg(&format!("msg {i}")))
                .await
                .unwrap();
        }

        assert_eq!(count(&f.pool, "SELECT COUNT(*) FROM leads").await, 1);
        assert_eq!(
            count(
                &f.pool,
                "SELECT COUNT(*) FROM activities WHERE type = 'message_exchanged'"
            )
            .await,
            3
        );
        assert_eq!(
            count(
                &f.pool,
                "SELECT COUNT(*) FROM activities WHERE type = 'temperature_changed'"
            )
            .await,
            0
        );
    }

    #[tokio::test]
    async fn concurrent_messages_from_one_contact_create_one_lead() {
        let f = fixture(Script::Reply("ok", Temperature::Cold)).await;
        seed_agent(&f.pool, Some("sk-x")).await;

        let a = {
            let p = Arc::clone(&f.pipeline);
            tokio::spawn(async move { p.handle_inbound(&msg("first")).await })
        };
        let b = {
            let p = Arc::clone(&f.pipeline);
            tokio::spawn(async move { p.handle_inbound(&msg("second")).await })
        };
        a.await.unwrap().unwrap();
        b.await.unwrap().unwrap();

        assert_eq!(count(&f.pool, "SELECT COUNT(*) FROM leads").await, 1);
        assert_eq!(count(&f.pool, "SELECT COUNT(*) FROM activities").await, 2);
    }

    #[tokio::test]
    async fn persistence_failure_propagates_and_suppresses_reply() {
        let f = fixture(Script::Reply("ok", Temperature::Warm)).await;
        seed_agent(&f.pool, Some("sk-x")).await;

        // Break the audit table: the exchange cannot be committed, so the
        // pipeline must fault instead of answering.
        sqlx::query("DROP TABLE activities")
            .execute(&f.pool)
            .await
            .unwrap();

        assert!(f.pipeline.handle_inbound(&msg("hello?")).await.is_err());
    }
}
