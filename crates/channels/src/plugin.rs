use {anyhow::Result, async_trait::async_trait};

/// Core transport plugin trait. One implementation per messaging platform.
///
/// A plugin owns the live connections; each connection is bound to exactly
/// one tenant, named explicitly at start time.
#[async_trait]
pub trait TransportPlugin: Send + Sync {
    /// Transport identifier (e.g. "whatsapp").
    fn id(&self) -> &str;

    /// Human-readable transport name.
    fn name(&self) -> &str;

    /// Establish (or re-establish) the session for a tenant. `config` is
    /// plugin-opaque; persisted credentials let a restart skip the scan.
    async fn start_session(&self, tenant_id: &str, config: serde_json::Value) -> Result<()>;

    /// Tear down the live session for a tenant. Does not touch persisted
    /// session state — that is the session manager's job.
    async fn stop_session(&self, tenant_id: &str) -> Result<()>;

    /// Outbound adapter for sending messages, if the transport supports it.
    fn outbound(&self) -> Option<&dyn TransportOutbound>;
}

/// Send messages out through a transport.
#[async_trait]
pub trait TransportOutbound: Send + Sync {
    async fn send_text(&self, tenant_id: &str, to: &str, text: &str) -> Result<()>;
}

/// Transport lifecycle + message events, pushed by plugins into the host.
///
/// Handlers are infallible from the plugin's point of view: the host absorbs
/// or logs downstream failures, and a plugin never retries event delivery.
#[async_trait]
pub trait TransportEventSink: Send + Sync {
    /// A fresh pairing challenge was issued (raw payload, not yet rendered).
    async fn challenge(&self, tenant_id: &str, raw: &str);

    /// The session finished the handshake and is ready for traffic.
    async fn opened(&self, tenant_id: &str);

    /// The session closed. `reason` is the transport's close reason code;
    /// the host decides whether to schedule a reconnect.
    async fn closed(&self, tenant_id: &str, reason: &str);

    /// An inbound message. `body` is `None` for non-text payloads, which
    /// the host drops. `from` is the full transport address of the sender;
    /// broadcast pseudo-contacts must be filtered by the host.
    async fn message(&self, tenant_id: &str, from: &str, body: Option<&str>);
}
