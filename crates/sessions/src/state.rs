//! Session state machine vocabulary.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Connection status of a tenant's transport session.
///
/// `disconnected → awaiting_scan → connected`, with `disconnected` reachable
/// from anywhere on close and `awaiting_scan` re-enterable on a fresh
/// challenge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionState {
    Disconnected,
    AwaitingScan,
    Connected,
}

impl SessionState {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Disconnected => "disconnected",
            Self::AwaitingScan => "awaiting_scan",
            Self::Connected => "connected",
        }
    }

    /// Parse a stored state string; anything unrecognized reads as
    /// `Disconnected` (the safe resting state).
    #[must_use]
    pub fn coerce(s: &str) -> Self {
        match s {
            "awaiting_scan" => Self::AwaitingScan,
            "connected" => Self::Connected,
            _ => Self::Disconnected,
        }
    }
}

impl std::fmt::Display for SessionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Why the transport closed the session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CloseReason {
    /// Explicit logout / unauthorized — terminal, requires a fresh scan.
    Logout,
    /// Anything else (navigation, network drop, crash): retryable.
    Other(String),
}

impl CloseReason {
    #[must_use]
    pub fn parse(code: &str) -> Self {
        match code.trim().to_ascii_lowercase().as_str() {
            "logout" | "unauthorized" => Self::Logout,
            _ => Self::Other(code.to_string()),
        }
    }

    #[must_use]
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Logout)
    }
}

impl std::fmt::Display for CloseReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Logout => f.write_str("logout"),
            Self::Other(code) => f.write_str(code),
        }
    }
}

/// What the host should do after a session closed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReconnectPolicy {
    /// Re-establish from persisted credentials after the delay.
    Retry { delay: Duration },
    /// Do not reconnect; re-authentication is required.
    Terminal,
}
