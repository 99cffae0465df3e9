//! Core domain types shared between the session, lead, and pipeline crates.

use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};

/// Unix timestamp in milliseconds.
pub fn now_ms() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as i64
}

/// Lead interest classification assigned by the AI classifier.
///
/// Stored as lowercase text; labels outside the three-valued set are
/// coerced to `Cold` at the parsing boundary, never stored raw.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Temperature {
    Cold,
    Warm,
    Hot,
}

impl Temperature {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Cold => "cold",
            Self::Warm => "warm",
            Self::Hot => "hot",
        }
    }

    /// Strict parse of a stored or returned label.
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "cold" => Some(Self::Cold),
            "warm" => Some(Self::Warm),
            "hot" => Some(Self::Hot),
            _ => None,
        }
    }

    /// Lenient parse for classifier output: trims, lowercases, and falls
    /// back to `Cold` for any label outside the valid set.
    #[must_use]
    pub fn coerce(s: &str) -> Self {
        Self::parse(s.trim().to_ascii_lowercase().as_str()).unwrap_or(Self::Cold)
    }
}

impl std::fmt::Display for Temperature {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Normalized inbound message context handed to the pipeline.
///
/// `contact` is the bare phone number (transport address suffix already
/// stripped); `reply_to` is the full transport address to answer to.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MsgContext {
    pub tenant_id: String,
    pub contact: String,
    pub reply_to: String,
    pub body: String,
}

impl MsgContext {
    pub fn new(
        tenant_id: impl Into<String>,
        contact: impl Into<String>,
        reply_to: impl Into<String>,
        body: impl Into<String>,
    ) -> Self {
        Self {
            tenant_id: tenant_id.into(),
            contact: contact.into(),
            reply_to: reply_to.into(),
            body: body.into(),
        }
    }
}
