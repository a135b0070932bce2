//! Runtime core: sessions, their actors and the coordinator.
//!
//! The public API from this module is [`Coordinator`] (built with [`CoordinatorBuilder`]),
//! the per-session [`SessionHandle`] and [`Subscription`], and the [`Config`] they share.
//!
//! Internal modules:
//! - [`actor`]: drives one session: feeds inputs to the state machine, runs its commands;
//! - [`session`]: the (protocol, topic) binding: live handle, adapter, subscribers;
//! - [`registry`]: live sessions by topic, cleaned up from the bus;
//! - [`coordinator`]: opens sessions, fans out diagnostics, graceful shutdown.

mod actor;
mod builder;
mod config;
mod coordinator;
mod handle;
mod registry;
mod session;

pub use builder::CoordinatorBuilder;
pub use config::{Config, SendPolicy};
pub use coordinator::Coordinator;
pub use handle::SessionHandle;
pub use session::Subscription;
