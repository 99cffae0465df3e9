//! Classifier contract.
//!
//! The classification capability is a black box from the pipeline's point of
//! view: personality directive + inbound message in, reply + temperature out.
//! Providers must fail explicitly — a classifier never invents a reply on a
//! transport or parse error.

use async_trait::async_trait;

use zapcrm_common::Temperature;

use crate::agent::Agent;

/// Classifier output: what to answer, and how interested the contact is.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Classification {
    pub reply: String,
    pub temperature: Temperature,
}

/// One classification round trip against an LLM provider.
#[async_trait]
pub trait LeadClassifier: Send + Sync {
    /// Provider identifier, for logging.
    fn provider(&self) -> &str;

    async fn classify(&self, directive: &str, message: &str) -> anyhow::Result<Classification>;
}

/// Maps an agent row (provider id, model, credential) to a live classifier.
///
/// A resolver error means the agent is misconfigured for classification;
/// the pipeline treats it like any other capability failure.
pub trait ClassifierResolver: Send + Sync {
    fn resolve(&self, agent: &Agent) -> anyhow::Result<Box<dyn LeadClassifier>>;
}
