//! Error types used by the coordinator runtime, transports and adapters.
//!
//! - [`RuntimeError`]: errors raised by the coordinator itself (session setup, shutdown).
//! - [`ProtocolError`]: transport failures. These never reach callers as `Err`; they are
//!   folded into the retry path and surface only as translated failure events.
//! - [`SendError`]: rejection of an outbound message.
//! - [`AdapterError`]: an event adapter could not be resolved for a requested target type.
//!
//! Every type provides `as_label` (stable snake_case, for logs/metrics); the two
//! caller-facing ones also provide `as_message`.

use std::time::Duration;

use thiserror::Error;

use crate::machine::ConnectionState;
use crate::topic::Topic;

/// # Errors produced by the coordinator runtime.
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum RuntimeError {
    /// A live session already exists for this topic.
    #[error("session for topic '{topic}' already exists")]
    SessionExists {
        /// Topic of the existing session.
        topic: Topic,
    },

    /// The session was destroyed; it accepts no further requests.
    #[error("session for topic '{topic}' is destroyed")]
    SessionDestroyed {
        /// Topic of the destroyed session.
        topic: Topic,
    },

    /// The requested typed event could not be served by any registered adapter.
    #[error(transparent)]
    Adapter(#[from] AdapterError),

    /// The coordinator is shutting down and accepts no new sessions.
    #[error("coordinator is shutting down")]
    ShuttingDown,

    /// Shutdown grace period was exceeded; some sessions did not tear down in time.
    #[error("shutdown timeout {grace:?} exceeded; stuck: {stuck:?}")]
    GraceExceeded {
        /// The configured grace duration.
        grace: Duration,
        /// Topics whose actors were still running.
        stuck: Vec<Topic>,
    },
}

impl RuntimeError {
    /// Returns a short stable label (snake_case) for use in logs/metrics.
    ///
    /// # Example
    /// ```
    /// use tether::RuntimeError;
    ///
    /// assert_eq!(RuntimeError::ShuttingDown.as_label(), "runtime_shutting_down");
    /// ```
    pub fn as_label(&self) -> &'static str {
        match self {
            RuntimeError::SessionExists { .. } => "runtime_session_exists",
            RuntimeError::SessionDestroyed { .. } => "runtime_session_destroyed",
            RuntimeError::Adapter(_) => "runtime_adapter",
            RuntimeError::ShuttingDown => "runtime_shutting_down",
            RuntimeError::GraceExceeded { .. } => "runtime_grace_exceeded",
        }
    }

    /// Returns a human-readable message with details about the error.
    pub fn as_message(&self) -> String {
        match self {
            RuntimeError::SessionExists { topic } => format!("session exists: topic={topic}"),
            RuntimeError::SessionDestroyed { topic } => format!("session destroyed: topic={topic}"),
            RuntimeError::Adapter(e) => format!("adapter resolution failed: {e}"),
            RuntimeError::ShuttingDown => "coordinator shutting down".to_string(),
            RuntimeError::GraceExceeded { grace, stuck } => {
                format!("grace exceeded after {grace:?}; stuck topics={stuck:?}")
            }
        }
    }
}

/// # Transport failures reported by a [`Protocol`](crate::Protocol).
///
/// Cloneable so a single failure can be delivered to every subscriber.
#[non_exhaustive]
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProtocolError {
    /// The connection could not be established (DNS, TCP, handshake).
    #[error("connect failed: {reason}")]
    Connect {
        /// Transport-specific description.
        reason: String,
    },

    /// An established connection broke while reading or writing.
    #[error("transport error: {reason}")]
    Transport {
        /// Transport-specific description.
        reason: String,
    },

    /// A backing resource (socket, executor, timer) was unavailable.
    #[error("resource unavailable: {reason}")]
    Unavailable {
        /// Transport-specific description.
        reason: String,
    },

    /// The event stream ended without a close or failure notification.
    #[error("event stream ended unexpectedly")]
    StreamEnded,

    /// The attempt reported `Closed` before it ever opened.
    #[error("connection closed before it opened")]
    ClosedBeforeOpen,
}

impl ProtocolError {
    /// Returns a short stable label (snake_case) for use in logs/metrics.
    pub fn as_label(&self) -> &'static str {
        match self {
            ProtocolError::Connect { .. } => "protocol_connect",
            ProtocolError::Transport { .. } => "protocol_transport",
            ProtocolError::Unavailable { .. } => "protocol_unavailable",
            ProtocolError::StreamEnded => "protocol_stream_ended",
            ProtocolError::ClosedBeforeOpen => "protocol_closed_before_open",
        }
    }

    /// Shorthand for [`ProtocolError::Connect`].
    pub fn connect(reason: impl Into<String>) -> Self {
        ProtocolError::Connect {
            reason: reason.into(),
        }
    }

    /// Shorthand for [`ProtocolError::Transport`].
    pub fn transport(reason: impl Into<String>) -> Self {
        ProtocolError::Transport {
            reason: reason.into(),
        }
    }
}

/// # Rejection of an outbound message.
#[non_exhaustive]
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SendError {
    /// The session is not connected and the send policy rejects immediately.
    #[error("not connected (state: {state:?})")]
    NotConnected {
        /// State at the time of the send.
        state: ConnectionState,
    },

    /// The session is not connected and the pending-message queue is full.
    #[error("pending queue full (capacity {capacity})")]
    QueueFull {
        /// Configured queue capacity.
        capacity: usize,
    },

    /// The connection refused the message.
    #[error(transparent)]
    Transport(#[from] ProtocolError),

    /// The session has been destroyed.
    #[error("session destroyed")]
    Destroyed,
}

impl SendError {
    /// Returns a short stable label (snake_case) for use in logs/metrics.
    pub fn as_label(&self) -> &'static str {
        match self {
            SendError::NotConnected { .. } => "send_not_connected",
            SendError::QueueFull { .. } => "send_queue_full",
            SendError::Transport(_) => "send_transport",
            SendError::Destroyed => "send_destroyed",
        }
    }

    /// Returns a human-readable message with details about the error.
    pub fn as_message(&self) -> String {
        match self {
            SendError::NotConnected { state } => format!("send rejected: state={state}"),
            SendError::QueueFull { capacity } => {
                format!("send rejected: queue full capacity={capacity}")
            }
            SendError::Transport(e) => format!("send failed: {e}"),
            SendError::Destroyed => "send rejected: session destroyed".to_string(),
        }
    }
}

/// # Adapter resolution failures.
///
/// Raised once, when a session is opened, never per event.
#[non_exhaustive]
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AdapterError {
    /// No registered factory recognises the target type.
    #[error("no event adapter registered for '{target}'")]
    Unsupported {
        /// Type name of the requested target.
        target: &'static str,
    },

    /// A factory claimed the target but produced an adapter of another type.
    #[error("factory '{factory}' returned an adapter that does not produce '{target}'")]
    Mismatch {
        /// Name of the misbehaving factory.
        factory: &'static str,
        /// Type name of the requested target.
        target: &'static str,
    },
}

impl AdapterError {
    /// Returns a short stable label (snake_case) for use in logs/metrics.
    pub fn as_label(&self) -> &'static str {
        match self {
            AdapterError::Unsupported { .. } => "adapter_unsupported",
            AdapterError::Mismatch { .. } => "adapter_mismatch",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn labels_are_stable() {
        assert_eq!(
            RuntimeError::SessionExists {
                topic: Topic::main()
            }
            .as_label(),
            "runtime_session_exists"
        );
        assert_eq!(ProtocolError::StreamEnded.as_label(), "protocol_stream_ended");
        assert_eq!(
            ProtocolError::ClosedBeforeOpen.as_label(),
            "protocol_closed_before_open"
        );
        assert_eq!(SendError::Destroyed.as_label(), "send_destroyed");
        assert_eq!(
            AdapterError::Unsupported { target: "x" }.as_label(),
            "adapter_unsupported"
        );
    }

    #[test]
    fn adapter_error_converts_into_runtime_error() {
        let err: RuntimeError = AdapterError::Unsupported { target: "Foo" }.into();
        assert_eq!(err.as_label(), "runtime_adapter");
        assert_eq!(err.to_string(), "no event adapter registered for 'Foo'");
    }

    #[test]
    fn send_error_wraps_protocol_error() {
        let err: SendError = ProtocolError::transport("broken pipe").into();
        assert_eq!(err.to_string(), "transport error: broken pipe");
    }
}
