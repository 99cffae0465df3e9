//! Lead records and their append-only activity trail.
//!
//! Leads are keyed logically by (tenant, phone) and move through a free-form
//! pipeline stage plus a cold/warm/hot temperature. Every state-changing
//! event is recorded as an immutable activity row.

pub mod activity;
pub mod lead;

pub use {
    activity::{Activity, NewActivity, SqliteActivityLog, activity_type},
    lead::{Lead, NewLead, SqliteLeadStore},
};
