//! Inbound message processing pipeline — the glue between the transport and
//! the CRM.
//!
//! Flow: inbound message → resolve active agent → find-or-create lead →
//! classify (reply + temperature) → commit mutation + audit trail → return
//! reply for the transport to deliver.

pub mod reply;

pub use reply::MessagePipeline;
