//! Transport plugin system.
//!
//! The messaging transport (WhatsApp web bridge, or a test fake) implements
//! the [`TransportPlugin`] trait and pushes lifecycle + message events into a
//! [`TransportEventSink`] provided by the host. The host wires events to the
//! session state machine and the auto-reply pipeline; outbound replies go
//! back through [`TransportOutbound`].

pub mod address;
pub mod plugin;
pub mod registry;

pub use {
    address::{contact_number, is_pseudo_contact},
    plugin::{TransportEventSink, TransportOutbound, TransportPlugin},
    registry::TransportRegistry,
};
