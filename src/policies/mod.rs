//! Retry pacing.
//!
//! This module groups the knobs that control **how long** a session waits between
//! reconnect attempts.
//!
//! ## Contents
//! - [`BackoffStrategy`] the seam the retry timer consults (attempt → delay)
//! - [`BackoffPolicy`] shipped strategy (first / curve / max / floor + jitter)
//! - [`JitterPolicy`] randomization to avoid reconnect stampedes
//!
//! ## Quick wiring
//! ```text
//! Config { backoff: BackoffPolicy, .. }  or  CoordinatorBuilder::with_backoff_strategy(..)
//!      └─► sources::TimerEventSource::start(attempt)
//!           - delay = strategy.delay_for(attempt)
//!           - sleep(delay) → TimerFired { attempt } into the session inbox
//! ```
//!
//! ## Defaults
//! - `BackoffPolicy::default()` → first=1s, exponential ×2, max=30s, floor=100ms, jitter=None.

mod backoff;
mod jitter;

pub use backoff::{BackoffCurve, BackoffPolicy, BackoffStrategy};
pub use jitter::JitterPolicy;
