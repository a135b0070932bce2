//! # LogWriter: renders bus events through `tracing`.
//!
//! ## Example output (fmt subscriber)
//! ```text
//! INFO  tether::log: state changed topic="main" from=connecting to=connected
//! WARN  tether::log: connection failed topic="main" reason="connect failed: refused"
//! INFO  tether::log: retry scheduled topic="main" attempt=1 delay_ms=1000
//! WARN  tether::log: unexpected input topic="main" state=connecting input="Protocol(Closing)"
//! ```

use async_trait::async_trait;
use tracing::{debug, info, warn};

use crate::events::{Event, EventKind};
use crate::subscribers::Subscribe;

/// Observer that logs every event.
#[derive(Default)]
pub struct LogWriter;

impl LogWriter {
    /// Construct a new [`LogWriter`].
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Subscribe for LogWriter {
    async fn on_event(&self, e: &Event) {
        let topic = e.topic.as_deref().unwrap_or("-");
        let reason = e.reason.as_deref().unwrap_or("");
        let state = |s: Option<crate::ConnectionState>| s.map_or("-", |s| s.as_str());

        match e.kind {
            EventKind::SessionOpened => info!(
                target: "tether::log",
                topic,
                session = ?e.session,
                "session opened",
            ),
            EventKind::SessionDestroyed => info!(
                target: "tether::log",
                topic,
                session = ?e.session,
                "session destroyed",
            ),
            EventKind::StateChanged => info!(
                target: "tether::log",
                topic,
                from = state(e.from),
                to = state(e.to),
                "state changed"
            ),
            EventKind::ConnectionOpening => debug!(
                target: "tether::log",
                topic,
                attempt = ?e.attempt,
                "connection opening",
            ),
            EventKind::ConnectionOpened => info!(target: "tether::log", topic, "connection opened"),
            EventKind::ConnectionClosing => debug!(
                target: "tether::log",
                topic,
                "connection closing",
            ),
            EventKind::ConnectionClosed => info!(target: "tether::log", topic, "connection closed"),
            EventKind::ConnectionFailed => warn!(
                target: "tether::log",
                topic,
                reason,
                "connection failed",
            ),
            EventKind::RetryScheduled => info!(
                target: "tether::log",
                topic,
                attempt = ?e.attempt,
                delay_ms = ?e.delay_ms,
                "retry scheduled"
            ),
            EventKind::RetryCancelled => debug!(target: "tether::log", topic, "retry cancelled"),
            EventKind::UnexpectedTransition => warn!(
                target: "tether::log",
                topic,
                state = state(e.from),
                input = reason,
                "unexpected input"
            ),
            EventKind::SendRejected => debug!(
                target: "tether::log",
                topic,
                reason,
                "send rejected",
            ),
            EventKind::SubscriberOverflow => warn!(
                target: "tether::log",
                subscriber = topic,
                reason,
                "subscriber overflow",
            ),
            EventKind::SubscriberPanicked => warn!(
                target: "tether::log",
                subscriber = topic,
                reason,
                "subscriber panicked",
            ),
            EventKind::ShutdownRequested => info!(target: "tether::log", "shutdown requested"),
            EventKind::AllStoppedWithin => info!(
                target: "tether::log",
                "all sessions stopped within grace",
            ),
            EventKind::GraceExceeded => warn!(target: "tether::log", "grace exceeded"),
        }
    }

    fn name(&self) -> &'static str {
        "log_writer"
    }
}
