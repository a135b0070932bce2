//! # Observers of coordinator events.
//!
//! This module provides the [`Subscribe`] trait, the [`SubscriberSet`] fan-out and the
//! built-in [`LogWriter`].
//!
//! ```text
//! SessionActor ── publish(Event) ──► Bus ──► observer listener ──► SubscriberSet
//!                                                                  ┌────┴────┬────────┐
//!                                                                  ▼         ▼        ▼
//!                                                              LogWriter  Metrics  Custom
//! ```

mod log;
mod set;
mod subscribe;

pub use log::LogWriter;
pub use set::SubscriberSet;
pub use subscribe::Subscribe;
