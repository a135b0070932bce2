//! # WebSocket event instance.
//!
//! Typed events for any protocol whose close request and close response are a
//! [`ShutdownReason`] (close code + reason text). The opened-response type stays generic so
//! each transport can report its own handshake data.
//!
//! ```text
//! ProtocolEvent<P>                    WebSocketEvent<P::OpenResponse>
//!   Opened(resp)          ──────────►   ConnectionOpened(resp)
//!   MessageReceived(msg)  ──────────►   MessageReceived(msg)
//!   Closing(reason)       ──────────►   ConnectionClosing(reason)
//!   Closed(reason)        ──────────►   ConnectionClosed(reason)
//!   Failed(err)           ──────────►   ConnectionFailed(err)
//! ```
//!
//! The mapping is total and reversible, so [`WebSocketEventAdapter::to_event`] always
//! returns `Some`.
//!
//! With the `tungstenite` feature, [`TungsteniteProtocol`] provides a ready transport.

#[cfg(feature = "tungstenite")]
mod tungstenite;

use std::any::TypeId;
use std::borrow::Cow;
use std::fmt;
use std::marker::PhantomData;

use crate::adapters::{ErasedAdapter, EventAdapter, EventAdapterFactory};
use crate::error::ProtocolError;
use crate::protocol::{Message, Protocol, ProtocolEvent};

#[cfg(feature = "tungstenite")]
pub use tungstenite::{Handshake, TungsteniteProtocol, WebSocketRequest};

/// Close code and reason exchanged when a WebSocket shuts down.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct ShutdownReason {
    /// RFC 6455 close code.
    pub code: u16,
    /// Reason text.
    pub reason: Cow<'static, str>,
}

impl ShutdownReason {
    /// Normal closure (1000).
    pub const GRACEFUL: ShutdownReason = ShutdownReason {
        code: 1000,
        reason: Cow::Borrowed("Normal closure"),
    };

    /// Creates a reason with a custom code and text.
    pub fn new(code: u16, reason: impl Into<Cow<'static, str>>) -> Self {
        Self {
            code,
            reason: reason.into(),
        }
    }

    /// True for code 1000.
    pub fn is_graceful(&self) -> bool {
        self.code == Self::GRACEFUL.code
    }
}

impl Default for ShutdownReason {
    fn default() -> Self {
        Self::GRACEFUL
    }
}

impl fmt::Display for ShutdownReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.code, self.reason)
    }
}

/// Caller-facing WebSocket event.
#[derive(Clone, Debug, PartialEq)]
pub enum WebSocketEvent<R> {
    /// The handshake completed.
    ConnectionOpened(R),
    /// A frame arrived.
    MessageReceived(Message),
    /// The peer sent a close frame.
    ConnectionClosing(ShutdownReason),
    /// The connection is closed.
    ConnectionClosed(ShutdownReason),
    /// The connection attempt or the connection failed.
    ConnectionFailed(ProtocolError),
}

impl<R> WebSocketEvent<R> {
    /// True for `ConnectionClosed` and `ConnectionFailed`.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            WebSocketEvent::ConnectionClosed(_) | WebSocketEvent::ConnectionFailed(_)
        )
    }
}

/// Adapter between [`ProtocolEvent`] and [`WebSocketEvent`].
pub struct WebSocketEventAdapter<P>(PhantomData<fn() -> P>);

impl<P> WebSocketEventAdapter<P> {
    /// Creates the adapter.
    pub fn new() -> Self {
        Self(PhantomData)
    }
}

impl<P> Default for WebSocketEventAdapter<P> {
    fn default() -> Self {
        Self::new()
    }
}

impl<P> EventAdapter<P> for WebSocketEventAdapter<P>
where
    P: Protocol<CloseRequest = ShutdownReason, CloseResponse = ShutdownReason>,
{
    type Target = WebSocketEvent<P::OpenResponse>;

    fn from_event(&self, event: ProtocolEvent<P>) -> Self::Target {
        match event {
            ProtocolEvent::Opened(resp) => WebSocketEvent::ConnectionOpened(resp),
            ProtocolEvent::MessageReceived(msg) => WebSocketEvent::MessageReceived(msg),
            ProtocolEvent::Closing(reason) => WebSocketEvent::ConnectionClosing(reason),
            ProtocolEvent::Closed(reason) => WebSocketEvent::ConnectionClosed(reason),
            ProtocolEvent::Failed(err) => WebSocketEvent::ConnectionFailed(err),
        }
    }

    fn to_event(&self, target: &Self::Target) -> Option<ProtocolEvent<P>> {
        Some(match target.clone() {
            WebSocketEvent::ConnectionOpened(resp) => ProtocolEvent::Opened(resp),
            WebSocketEvent::MessageReceived(msg) => ProtocolEvent::MessageReceived(msg),
            WebSocketEvent::ConnectionClosing(reason) => ProtocolEvent::Closing(reason),
            WebSocketEvent::ConnectionClosed(reason) => ProtocolEvent::Closed(reason),
            WebSocketEvent::ConnectionFailed(err) => ProtocolEvent::Failed(err),
        })
    }
}

/// Serves `WebSocketEvent<P::OpenResponse>`.
///
/// WebSocket transports return it from [`Protocol::builtin_adapters`].
pub struct WebSocketEventAdapterFactory<P>(PhantomData<fn() -> P>);

impl<P> WebSocketEventAdapterFactory<P> {
    /// Creates the factory.
    pub fn new() -> Self {
        Self(PhantomData)
    }
}

impl<P> Default for WebSocketEventAdapterFactory<P> {
    fn default() -> Self {
        Self::new()
    }
}

impl<P> EventAdapterFactory<P> for WebSocketEventAdapterFactory<P>
where
    P: Protocol<CloseRequest = ShutdownReason, CloseResponse = ShutdownReason>,
{
    fn name(&self) -> &'static str {
        "websocket"
    }

    fn create(&self, target: TypeId) -> Option<ErasedAdapter> {
        (target == TypeId::of::<WebSocketEvent<P::OpenResponse>>())
            .then(|| ErasedAdapter::new::<P, _>(WebSocketEventAdapter::<P>::new()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::scripted::ScriptedProtocol;

    fn adapter() -> WebSocketEventAdapter<ScriptedProtocol> {
        WebSocketEventAdapter::new()
    }

    #[test]
    fn translates_every_variant_and_back() {
        let a = adapter();
        let events: Vec<ProtocolEvent<ScriptedProtocol>> = vec![
            ProtocolEvent::Opened("101 Switching Protocols".into()),
            ProtocolEvent::MessageReceived(Message::Bytes(vec![1, 2, 3])),
            ProtocolEvent::Closing(ShutdownReason::new(1001, "going away")),
            ProtocolEvent::Closed(ShutdownReason::GRACEFUL),
            ProtocolEvent::Failed(ProtocolError::connect("refused")),
        ];

        for ev in events {
            let typed = a.from_event(ev.clone());
            assert_eq!(a.to_event(&typed), Some(ev));
        }
    }

    #[test]
    fn payloads_survive_translation() {
        let a = adapter();
        let typed = a.from_event(ProtocolEvent::Closing(ShutdownReason::new(4000, "bye")));
        assert_eq!(
            typed,
            WebSocketEvent::ConnectionClosing(ShutdownReason::new(4000, "bye"))
        );
        assert!(!typed.is_terminal());

        let typed = a.from_event(ProtocolEvent::Failed(ProtocolError::StreamEnded));
        assert!(typed.is_terminal());
    }

    #[test]
    fn factory_matches_open_response_type() {
        let f = WebSocketEventAdapterFactory::<ScriptedProtocol>::new();
        assert!(f.create(TypeId::of::<WebSocketEvent<String>>()).is_some());
        assert!(f.create(TypeId::of::<WebSocketEvent<u32>>()).is_none());
    }

    #[test]
    fn graceful_reason() {
        assert!(ShutdownReason::default().is_graceful());
        assert!(!ShutdownReason::new(1011, "internal error").is_graceful());
        assert_eq!(ShutdownReason::GRACEFUL.to_string(), "1000 Normal closure");
    }
}
