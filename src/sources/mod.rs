//! Input sources feeding a session inbox.
//!
//! - [`LifecycleEventSource`] / [`LifecycleController`]: the caller's desire to be connected.
//! - [`TimerEventSource`]: the retry timer, driven by a [`BackoffStrategy`](crate::BackoffStrategy).
//!
//! The third source, the protocol event forwarder, lives with the session actor because
//! it is created per connection attempt.

mod lifecycle;
mod timer;

pub use lifecycle::{LifecycleController, LifecycleEventSource};
pub use timer::{TimerEventSource, TimerFired};
