//! # Observability events emitted by the coordinator and session actors.
//!
//! [`EventKind`] classifies events into:
//! - **Session events**: registration and teardown of a session
//! - **Connection events**: state changes, attempts, retries, transport outcomes
//! - **Anomalies**: unexpected transitions, rejected sends
//! - **Subscriber events**: observer overflow/panic
//! - **Shutdown events**: coordinator-wide teardown
//!
//! These are diagnostics, separate from the typed events delivered to session
//! subscribers. Each [`Event`] carries a global sequence number (`seq`) that
//! increases monotonically; use it to restore order across receivers.
//!
//! ## Example
//! ```rust
//! use std::time::Duration;
//! use tether::{Event, EventKind};
//!
//! let ev = Event::new(EventKind::RetryScheduled)
//!     .with_topic("main")
//!     .with_attempt(3)
//!     .with_delay(Duration::from_secs(4));
//!
//! assert_eq!(ev.kind, EventKind::RetryScheduled);
//! assert_eq!(ev.topic.as_deref(), Some("main"));
//! assert_eq!(ev.delay_ms, Some(4_000));
//! ```

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering as AtomicOrdering};
use std::time::{Duration, SystemTime};

use crate::machine::ConnectionState;

/// Global sequence counter for event ordering.
static EVENT_SEQ: AtomicU64 = AtomicU64::new(0);

/// Classification of observability events.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    // === Session events ===
    /// A session was registered and its actor spawned.
    ///
    /// Sets: `topic`, `session`
    SessionOpened,

    /// A session reached `Destroyed` and its actor exited.
    ///
    /// Sets: `topic`, `session`
    SessionDestroyed,

    // === Connection events ===
    /// The connection state changed.
    ///
    /// Sets: `topic`, `session`, `from`, `to`
    StateChanged,

    /// A connection attempt was dispatched to the protocol.
    ///
    /// Sets: `topic`, `session`, `attempt` (failures since last success)
    ConnectionOpening,

    /// The protocol reported the connection open.
    ///
    /// Sets: `topic`, `session`
    ConnectionOpened,

    /// The peer started closing.
    ///
    /// Sets: `topic`, `session`
    ConnectionClosing,

    /// The connection was released.
    ///
    /// Sets: `topic`, `session`
    ConnectionClosed,

    /// The connection attempt or connection failed.
    ///
    /// Sets: `topic`, `session`, `reason`
    ConnectionFailed,

    /// A retry timer was started.
    ///
    /// Sets: `topic`, `session`, `attempt`, `delay_ms`
    RetryScheduled,

    /// A pending retry timer was cancelled.
    ///
    /// Sets: `topic`, `session`
    RetryCancelled,

    // === Anomalies ===
    /// An input arrived that the current state does not accept; state unchanged.
    ///
    /// Sets: `topic`, `session`, `from` (current state), `reason` (input)
    UnexpectedTransition,

    /// An outbound message was rejected or queued.
    ///
    /// Sets: `topic`, `session`, `reason`
    SendRejected,

    // === Subscriber events ===
    /// Observer panicked during event processing.
    ///
    /// Sets: `topic` (observer name), `reason` (panic message)
    SubscriberPanicked,

    /// An event was dropped for an observer or a session subscriber (queue full or closed).
    ///
    /// Sets: `topic` (observer name or session topic), `reason`
    SubscriberOverflow,

    // === Shutdown events ===
    /// Coordinator shutdown requested.
    ShutdownRequested,

    /// Every session tore down within the grace period.
    AllStoppedWithin,

    /// Grace period exceeded; some sessions did not tear down in time.
    GraceExceeded,
}

/// Observability event with optional metadata.
///
/// - `seq`: monotonic global sequence for ordering
/// - `at`: wall-clock timestamp (for logs)
/// - other optional fields are set depending on the [`EventKind`]
#[derive(Clone, Debug)]
pub struct Event {
    /// Globally unique, monotonically increasing sequence number.
    pub seq: u64,
    /// Wall-clock timestamp.
    pub at: SystemTime,
    /// Event classification.
    pub kind: EventKind,

    /// Topic of the session (or observer name for subscriber events).
    pub topic: Option<Arc<str>>,
    /// Session instance id (distinguishes re-opened sessions on the same topic).
    pub session: Option<u64>,
    /// State before a change (or current state for anomalies).
    pub from: Option<ConnectionState>,
    /// State after a change.
    pub to: Option<ConnectionState>,
    /// Attempt number.
    pub attempt: Option<u32>,
    /// Retry delay in milliseconds (compact).
    pub delay_ms: Option<u32>,
    /// Human-readable reason (errors, rejected input, overflow details).
    pub reason: Option<Arc<str>>,
}

impl Event {
    /// Creates a new event of the given kind with current timestamp and next sequence number.
    pub fn new(kind: EventKind) -> Self {
        Self {
            seq: EVENT_SEQ.fetch_add(1, AtomicOrdering::Relaxed),
            at: SystemTime::now(),
            kind,
            topic: None,
            session: None,
            from: None,
            to: None,
            attempt: None,
            delay_ms: None,
            reason: None,
        }
    }

    /// Attaches a topic.
    #[inline]
    pub fn with_topic(mut self, topic: impl Into<Arc<str>>) -> Self {
        self.topic = Some(topic.into());
        self
    }

    /// Attaches a session id.
    #[inline]
    pub fn with_session(mut self, session: u64) -> Self {
        self.session = Some(session);
        self
    }

    /// Attaches a state change.
    #[inline]
    pub fn with_states(mut self, from: ConnectionState, to: ConnectionState) -> Self {
        self.from = Some(from);
        self.to = Some(to);
        self
    }

    /// Attaches the current state (anomalies).
    #[inline]
    pub fn with_state(mut self, state: ConnectionState) -> Self {
        self.from = Some(state);
        self
    }

    /// Attaches an attempt number.
    #[inline]
    pub fn with_attempt(mut self, n: u32) -> Self {
        self.attempt = Some(n);
        self
    }

    /// Attaches a retry delay (stored as milliseconds).
    #[inline]
    pub fn with_delay(mut self, d: Duration) -> Self {
        let ms = d.as_millis().min(u128::from(u32::MAX)) as u32;
        self.delay_ms = Some(ms);
        self
    }

    /// Attaches a human-readable reason.
    #[inline]
    pub fn with_reason(mut self, reason: impl Into<Arc<str>>) -> Self {
        self.reason = Some(reason.into());
        self
    }

    /// Creates a subscriber overflow event.
    #[inline]
    pub fn subscriber_overflow(subscriber: impl Into<Arc<str>>, reason: &'static str) -> Self {
        let subscriber = subscriber.into();
        Event::new(EventKind::SubscriberOverflow)
            .with_reason(format!("subscriber={subscriber} reason={reason}"))
            .with_topic(subscriber)
    }

    /// Creates a subscriber panic event.
    #[inline]
    pub fn subscriber_panicked(subscriber: &'static str, info: String) -> Self {
        Event::new(EventKind::SubscriberPanicked)
            .with_topic(subscriber)
            .with_reason(info)
    }

    /// Retry delay as a [`Duration`].
    pub fn delay(&self) -> Option<Duration> {
        self.delay_ms.map(|ms| Duration::from_millis(u64::from(ms)))
    }
}
