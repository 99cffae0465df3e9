//! Automated responder profiles ("agents") and the lead classifier they
//! drive.
//!
//! An agent belongs to a tenant and bundles a personality directive with an
//! LLM provider credential. The classifier turns (personality, inbound
//! message) into a reply plus a cold/warm/hot temperature label.

pub mod agent;
pub mod model;
pub mod prompt;
pub mod providers;

pub use {
    agent::{Agent, NewAgent, SqliteAgentStore, UpdateAgent},
    model::{Classification, ClassifierResolver, LeadClassifier},
    providers::ProviderResolver,
};
