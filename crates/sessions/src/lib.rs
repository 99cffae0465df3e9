//! Per-tenant messaging session lifecycle.
//!
//! The transport owns the live connection; this crate owns the persisted
//! view of it — a single row per tenant that the dashboard polls — and the
//! state machine that maps transport lifecycle events onto that row.

pub mod manager;
pub mod qr;
pub mod state;
pub mod store;

pub use {
    manager::SessionManager,
    state::{CloseReason, ReconnectPolicy, SessionState},
    store::{SessionSnapshot, SqliteSessionStore},
};
