//! Config schema (gateway, database, session, classifier, transport).

use serde::{Deserialize, Serialize};

/// Top-level zapcrm configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ZapcrmConfig {
    pub gateway: GatewayConfig,
    pub database: DatabaseConfig,
    pub session: SessionConfig,
    pub classifier: ClassifierConfig,
    /// Transport sessions to start at boot, one per tenant. Tenant binding
    /// is always explicit — nothing is inferred from store contents.
    pub transport: TransportConfig,
}

/// HTTP gateway bind address.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GatewayConfig {
    pub bind: String,
    pub port: u16,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            bind: "127.0.0.1".into(),
            port: 4870,
        }
    }
}

/// SQLite database location.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    pub path: String,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: "zapcrm.db".into(),
        }
    }
}

/// Session lifecycle tuning.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Fixed delay before re-establishing a dropped (non-logout) session.
    pub reconnect_delay_secs: u64,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            reconnect_delay_secs: 3,
        }
    }
}

/// Classifier call tuning.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ClassifierConfig {
    /// Hard timeout on a single classification round trip. Expiry is
    /// treated as capability failure (message dropped, no reply).
    pub timeout_secs: u64,
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self { timeout_secs: 60 }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct TransportConfig {
    pub sessions: Vec<TransportSessionConfig>,
}

/// One transport session binding: which tenant, which plugin, and the
/// plugin-opaque connection config.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransportSessionConfig {
    pub tenant_id: String,
    #[serde(default = "default_plugin")]
    pub plugin: String,
    #[serde(default)]
    pub config: serde_json::Value,
}

fn default_plugin() -> String {
    "whatsapp".into()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_sane() {
        let cfg = ZapcrmConfig::default();
        assert_eq!(cfg.gateway.port, 4870);
        assert_eq!(cfg.session.reconnect_delay_secs, 3);
        assert_eq!(cfg.classifier.timeout_secs, 60);
        assert!(cfg.transport.sessions.is_empty());
    }

    #[test]
    fn partial_toml_fills_defaults() {
        let cfg: ZapcrmConfig = toml::from_str(
            r#"
            [gateway]
            port = 9000

            [[transport.sessions]]
            tenant_id = "acme"
            "#,
        )
        .unwrap();
        assert_eq!(cfg.gateway.port, 9000);
        assert_eq!(cfg.gateway.bind, "127.0.0.1");
        assert_eq!(cfg.transport.sessions.len(), 1);
        assert_eq!(cfg.transport.sessions[0].plugin, "whatsapp");
        assert!(cfg.transport.sessions[0].config.is_null());
    }
}
