//! HTTP gateway and transport supervision.
//!
//! Hosts the dashboard-facing API (session status polling, lead and agent
//! CRUD) and the [`supervisor::TransportSupervisor`] that wires transport
//! events into the session state machine and the auto-reply pipeline.

pub mod crm_routes;
pub mod db;
pub mod error;
pub mod server;
pub mod state;
pub mod supervisor;
pub mod whatsapp_routes;

pub use {
    server::{build_gateway_app, serve},
    state::AppState,
    supervisor::TransportSupervisor,
};
