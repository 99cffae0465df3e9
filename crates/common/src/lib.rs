//! Shared types and utilities used across all zapcrm crates.

pub mod lock;
pub mod types;

pub use {
    lock::KeyedLocks,
    types::{MsgContext, Temperature, now_ms},
};
