//! # Generic protocol events.
//!
//! [`ProtocolEvent`] is the closed vocabulary every transport speaks. The coordinator
//! classifies each event into a payload-free [`ProtocolSignal`] for the state machine and
//! hands the full event to the session's adapter for republishing.
//!
//! ```text
//! transport ──► ProtocolEvent<P> ──► signal() ──► StateMachine
//!                      │
//!                      └──────────► EventAdapter::from_event ──► subscribers
//! ```

use std::fmt;

use crate::error::ProtocolError;
use crate::protocol::Protocol;

/// Message payload carried by a connection.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum Message {
    /// UTF-8 text frame.
    Text(String),
    /// Binary frame.
    Bytes(Vec<u8>),
}

impl Message {
    /// Payload length in bytes.
    pub fn len(&self) -> usize {
        match self {
            Message::Text(s) => s.len(),
            Message::Bytes(b) => b.len(),
        }
    }

    /// True if the payload is empty.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl From<String> for Message {
    fn from(text: String) -> Self {
        Message::Text(text)
    }
}

impl From<&str> for Message {
    fn from(text: &str) -> Self {
        Message::Text(text.to_owned())
    }
}

impl From<Vec<u8>> for Message {
    fn from(bytes: Vec<u8>) -> Self {
        Message::Bytes(bytes)
    }
}

/// Payload-free classification of a [`ProtocolEvent`], consumed by the state machine.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ProtocolSignal {
    /// The connection is open.
    Opened,
    /// A message arrived.
    MessageReceived,
    /// The peer started closing.
    Closing,
    /// The connection is released.
    Closed,
    /// The connection attempt or the connection failed.
    Failed,
}

impl ProtocolSignal {
    /// Short snake_case name for logs.
    pub fn as_str(&self) -> &'static str {
        match self {
            ProtocolSignal::Opened => "opened",
            ProtocolSignal::MessageReceived => "message_received",
            ProtocolSignal::Closing => "closing",
            ProtocolSignal::Closed => "closed",
            ProtocolSignal::Failed => "failed",
        }
    }
}

/// Event emitted by a [`Protocol`] connection.
///
/// Ordering contract: `Opened` precedes any `MessageReceived` of the same attempt, and at
/// most one of `Closed` / `Failed` terminates an attempt.
pub enum ProtocolEvent<P: Protocol + ?Sized> {
    /// The connection was accepted by the peer.
    Opened(P::OpenResponse),
    /// A message arrived.
    MessageReceived(Message),
    /// The peer indicated no more incoming messages.
    Closing(P::CloseRequest),
    /// Both sides finished closing; no further events follow.
    Closed(P::CloseResponse),
    /// The attempt or the connection failed; no further events follow.
    Failed(ProtocolError),
}

impl<P: Protocol + ?Sized> ProtocolEvent<P> {
    /// Classification used by the state machine.
    pub fn signal(&self) -> ProtocolSignal {
        match self {
            ProtocolEvent::Opened(_) => ProtocolSignal::Opened,
            ProtocolEvent::MessageReceived(_) => ProtocolSignal::MessageReceived,
            ProtocolEvent::Closing(_) => ProtocolSignal::Closing,
            ProtocolEvent::Closed(_) => ProtocolSignal::Closed,
            ProtocolEvent::Failed(_) => ProtocolSignal::Failed,
        }
    }

    /// True for `Closed` and `Failed`.
    pub fn is_terminal(&self) -> bool {
        matches!(self, ProtocolEvent::Closed(_) | ProtocolEvent::Failed(_))
    }
}

impl<P: Protocol + ?Sized> Clone for ProtocolEvent<P> {
    fn clone(&self) -> Self {
        match self {
            ProtocolEvent::Opened(r) => ProtocolEvent::Opened(r.clone()),
            ProtocolEvent::MessageReceived(m) => ProtocolEvent::MessageReceived(m.clone()),
            ProtocolEvent::Closing(r) => ProtocolEvent::Closing(r.clone()),
            ProtocolEvent::Closed(r) => ProtocolEvent::Closed(r.clone()),
            ProtocolEvent::Failed(e) => ProtocolEvent::Failed(e.clone()),
        }
    }
}

impl<P: Protocol + ?Sized> fmt::Debug for ProtocolEvent<P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProtocolEvent::Opened(r) => f.debug_tuple("Opened").field(r).finish(),
            ProtocolEvent::MessageReceived(m) => f.debug_tuple("MessageReceived").field(m).finish(),
            ProtocolEvent::Closing(r) => f.debug_tuple("Closing").field(r).finish(),
            ProtocolEvent::Closed(r) => f.debug_tuple("Closed").field(r).finish(),
            ProtocolEvent::Failed(e) => f.debug_tuple("Failed").field(e).finish(),
        }
    }
}

impl<P> PartialEq for ProtocolEvent<P>
where
    P: Protocol + ?Sized,
    P::OpenResponse: PartialEq,
    P::CloseRequest: PartialEq,
    P::CloseResponse: PartialEq,
{
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (ProtocolEvent::Opened(a), ProtocolEvent::Opened(b)) => a == b,
            (ProtocolEvent::MessageReceived(a), ProtocolEvent::MessageReceived(b)) => a == b,
            (ProtocolEvent::Closing(a), ProtocolEvent::Closing(b)) => a == b,
            (ProtocolEvent::Closed(a), ProtocolEvent::Closed(b)) => a == b,
            (ProtocolEvent::Failed(a), ProtocolEvent::Failed(b)) => a == b,
            _ => false,
        }
    }
}
