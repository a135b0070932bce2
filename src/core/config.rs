//! # Global runtime configuration.
//!
//! Provides [`Config`], centralized settings for the coordinator and its sessions.
//!
//! ## Sentinel values
//! - `grace = 0s` → shutdown does not wait; unfinished sessions are reported as stuck
//! - every capacity is clamped to a minimum of 1 by its accessor

use std::time::Duration;

use crate::policies::BackoffPolicy;

/// What `send` does while the session is not `Connected`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum SendPolicy {
    /// Fail immediately with `SendError::NotConnected`.
    #[default]
    Reject,
    /// Buffer up to `capacity` messages; they are flushed in order once the connection
    /// opens and discarded if the session is destroyed.
    QueueUntilConnected {
        /// Maximum number of buffered messages.
        capacity: usize,
    },
}

/// Global configuration for the coordinator runtime.
///
/// ## Field semantics
/// - `grace`: maximum wait for sessions to tear down on [`shutdown`](crate::Coordinator::shutdown)
/// - `bus_capacity`: observability bus ring buffer size (min 1)
/// - `inbox_capacity`: per-session input queue size (min 1)
/// - `subscriber_capacity`: per-subscriber typed event queue size (min 1)
/// - `send_policy`: behaviour of `send` while disconnected
/// - `backoff`: retry delays (replaceable by any strategy via the builder)
///
/// ## Notes
/// All fields are public for flexibility. Prefer the clamped accessors over reading
/// capacities directly.
#[derive(Clone, Debug)]
pub struct Config {
    /// Maximum time to wait for sessions to tear down during shutdown.
    pub grace: Duration,

    /// Capacity of the observability bus.
    ///
    /// Slow receivers that lag behind more than `bus_capacity` events receive `Lagged`
    /// and skip older items.
    pub bus_capacity: usize,

    /// Capacity of each session inbox (lifecycle, protocol, timer and handle requests).
    ///
    /// Sources wait for space; they never drop inputs.
    pub inbox_capacity: usize,

    /// Capacity of each subscriber queue.
    ///
    /// When full, the event is dropped for that subscriber only and a
    /// `SubscriberOverflow` event is published.
    pub subscriber_capacity: usize,

    /// Behaviour of `send` while the session is not connected.
    pub send_policy: SendPolicy,

    /// Default retry backoff.
    pub backoff: BackoffPolicy,
}

impl Config {
    /// Returns a bus capacity clamped to a minimum of 1.
    #[inline]
    pub fn bus_capacity_clamped(&self) -> usize {
        self.bus_capacity.max(1)
    }

    /// Returns an inbox capacity clamped to a minimum of 1.
    #[inline]
    pub fn inbox_capacity_clamped(&self) -> usize {
        self.inbox_capacity.max(1)
    }

    /// Returns a subscriber queue capacity clamped to a minimum of 1.
    #[inline]
    pub fn subscriber_capacity_clamped(&self) -> usize {
        self.subscriber_capacity.max(1)
    }
}

impl Default for Config {
    /// Default configuration:
    ///
    /// - `grace = 10s`
    /// - `bus_capacity = 1024`
    /// - `inbox_capacity = 256`
    /// - `subscriber_capacity = 256`
    /// - `send_policy = SendPolicy::Reject`
    /// - `backoff = BackoffPolicy::default()` (exponential, 1s → 30s)
    fn default() -> Self {
        Self {
            grace: Duration::from_secs(10),
            bus_capacity: 1024,
            inbox_capacity: 256,
            subscriber_capacity: 256,
            send_policy: SendPolicy::default(),
            backoff: BackoffPolicy::default(),
        }
    }
}
