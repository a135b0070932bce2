//! Observability events: types and broadcast bus.
//!
//! ## Contents
//! - [`EventKind`], [`Event`] event classification and payload metadata
//! - [`Bus`] thin wrapper over `tokio::sync::broadcast`
//!
//! ## Quick reference
//! - **Publishers**: session actors, `Registry`, `Coordinator`, `SubscriberSet` workers.
//! - **Consumers**: the coordinator's observer listener (fans out to `SubscriberSet`),
//!   the registry listener, and any receiver from `Coordinator::events()`.

mod bus;
mod event;

pub use bus::Bus;
pub use event::{Event, EventKind};
