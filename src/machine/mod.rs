//! Connection lifecycle state machine.
//!
//! ## Contents
//! - [`ConnectionState`], [`LifecycleState`] state vocabulary
//! - [`StateMachine`] pure transition table: `(state, input) → (state, commands)`
//! - [`Input`], [`Command`], [`Transition`], [`Outcome`] its inputs and outputs
//!
//! The session actor (`core::actor`) is the only caller; it executes the returned
//! commands and reports unexpected inputs through the event bus.

mod state;
mod table;

pub use state::{ConnectionState, LifecycleState};
pub use table::{Command, Input, Outcome, StateMachine, Transition};
