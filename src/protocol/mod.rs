//! # Transport abstraction.
//!
//! A [`Protocol`] turns an open request into a live [`Connection`]: a handle that accepts
//! outbound messages and close requests, plus a stream of [`ProtocolEvent`]s. Both halves
//! are non-blocking; connecting, closing and failing are all reported through the stream.
//!
//! ```text
//! Coordinator ──open(&request)──► Protocol ──► Connection { handle, events }
//!      ▲                                                   │
//!      └──────────── forwarder (tagged by generation) ◄────┘
//! ```
//!
//! Transports must honour two rules:
//! - `Opened` precedes any `MessageReceived` of the same attempt;
//! - an attempt ends with at most one `Closed` or `Failed` (a stream that ends without
//!   either is reported by the coordinator as [`ProtocolError::StreamEnded`]).

mod event;

#[cfg(test)]
pub(crate) mod scripted;

use std::fmt;
use std::sync::Arc;

use futures::stream::{self, BoxStream, Stream, StreamExt};
use tokio::sync::mpsc;

use crate::adapters::EventAdapterFactory;
use crate::error::ProtocolError;

pub use event::{Message, ProtocolEvent, ProtocolSignal};

/// Bounds shared by every protocol payload type.
pub trait Payload: Clone + fmt::Debug + Send + Sync + 'static {}

impl<T> Payload for T where T: Clone + fmt::Debug + Send + Sync + 'static {}

/// Concrete transport (WebSocket, SSE, raw TCP framing, ...).
pub trait Protocol: Send + Sync + 'static {
    /// Everything needed to open a connection (URL, headers, ...).
    type OpenRequest: Payload;
    /// Data reported when the connection opens (handshake response, ...).
    type OpenResponse: Payload;
    /// Reason sent to, or received from, the peer when closing.
    type CloseRequest: Payload;
    /// Data reported once the connection is released.
    type CloseResponse: Payload;

    /// Human-readable transport name (for logs).
    fn name(&self) -> &'static str;

    /// Starts a connection attempt.
    ///
    /// Must return without waiting for the network. An `Err` means the attempt could not
    /// even be started (resource exhaustion); the coordinator treats it like a `Failed`
    /// event.
    fn open(&self, request: &Self::OpenRequest) -> Result<Connection<Self>, ProtocolError>;

    /// Close request used when the caller supplied none.
    fn default_close_request(&self) -> Self::CloseRequest;

    /// Adapter factories shipped with this transport.
    ///
    /// Consulted after caller factories and the identity adapter.
    fn builtin_adapters(&self) -> Vec<Arc<dyn EventAdapterFactory<Self>>>
    where
        Self: Sized,
    {
        Vec::new()
    }
}

/// Outbound half of a live connection.
pub trait ConnectionHandle<P: Protocol + ?Sized>: Send + Sync {
    /// Enqueues a message for delivery. Must not block.
    fn send(&self, message: Message) -> Result<(), ProtocolError>;

    /// Requests a graceful close. Must not block; completion is reported as `Closed`
    /// (or `Failed`) on the event stream. Calling it twice is harmless.
    fn close(&self, request: P::CloseRequest);
}

/// A started connection attempt.
pub struct Connection<P: Protocol + ?Sized> {
    /// Outbound half.
    pub handle: Arc<dyn ConnectionHandle<P>>,
    /// Inbound events of this attempt.
    pub events: BoxStream<'static, ProtocolEvent<P>>,
}

impl<P: Protocol + ?Sized> Connection<P> {
    /// Builds a connection from a handle and any event stream.
    pub fn new<S>(handle: Arc<dyn ConnectionHandle<P>>, events: S) -> Self
    where
        S: Stream<Item = ProtocolEvent<P>> + Send + 'static,
    {
        Self {
            handle,
            events: events.boxed(),
        }
    }

    /// Builds a connection whose events are fed through an unbounded channel.
    ///
    /// The stream ends when every sender is dropped.
    pub fn from_channel(
        handle: Arc<dyn ConnectionHandle<P>>,
        rx: mpsc::UnboundedReceiver<ProtocolEvent<P>>,
    ) -> Self {
        let events = stream::unfold(rx, |mut rx| async move {
            let ev = rx.recv().await?;
            Some((ev, rx))
        });
        Self::new(handle, events)
    }
}

impl<P: Protocol + ?Sized> fmt::Debug for Connection<P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Connection").finish_non_exhaustive()
    }
}
