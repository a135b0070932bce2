//! WebSocket transport over `tokio-tungstenite`.
//!
//! Each `open` spawns one connection task that owns the socket. The handle talks to it
//! through an unbounded command channel; the task reports back through the event channel.
//!
//! ```text
//! TungsteniteHandle ──Outbound──► connection task ──► socket
//!                                       │
//! Connection::events ◄──ProtocolEvent───┘
//! ```

use std::sync::Arc;

use futures::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::Message as Frame;
use tokio_tungstenite::tungstenite::protocol::CloseFrame;
use tokio_tungstenite::tungstenite::protocol::frame::coding::CloseCode;
use tracing::{debug, trace};

use crate::adapters::EventAdapterFactory;
use crate::error::ProtocolError;
use crate::protocol::{Connection, ConnectionHandle, Message, Protocol, ProtocolEvent};
use crate::websocket::{ShutdownReason, WebSocketEventAdapterFactory};

type Events = mpsc::UnboundedSender<ProtocolEvent<TungsteniteProtocol>>;

/// Where to connect.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct WebSocketRequest {
    /// `ws://` or `wss://` URL.
    pub url: String,
}

impl WebSocketRequest {
    /// Request for the given URL.
    pub fn new(url: impl Into<String>) -> Self {
        Self { url: url.into() }
    }
}

/// Handshake data reported with `Opened`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Handshake {
    /// HTTP status of the upgrade response (101 on success).
    pub status: u16,
    /// Negotiated sub-protocol, if any.
    pub protocol: Option<String>,
}

/// WebSocket client transport.
#[derive(Clone, Copy, Debug, Default)]
pub struct TungsteniteProtocol;

impl TungsteniteProtocol {
    /// Creates the transport.
    pub fn new() -> Self {
        Self
    }
}

enum Outbound {
    Frame(Frame),
    Close(ShutdownReason),
}

struct TungsteniteHandle {
    tx: mpsc::UnboundedSender<Outbound>,
}

impl ConnectionHandle<TungsteniteProtocol> for TungsteniteHandle {
    fn send(&self, message: Message) -> Result<(), ProtocolError> {
        let frame = match message {
            Message::Text(text) => Frame::Text(text.into()),
            Message::Bytes(bytes) => Frame::Binary(bytes.into()),
        };
        self.tx
            .send(Outbound::Frame(frame))
            .map_err(|_| ProtocolError::transport("connection task ended"))
    }

    fn close(&self, request: ShutdownReason) {
        let _ = self.tx.send(Outbound::Close(request));
    }
}

impl Protocol for TungsteniteProtocol {
    type OpenRequest = WebSocketRequest;
    type OpenResponse = Handshake;
    type CloseRequest = ShutdownReason;
    type CloseResponse = ShutdownReason;

    fn name(&self) -> &'static str {
        "websocket"
    }

    fn open(&self, request: &WebSocketRequest) -> Result<Connection<Self>, ProtocolError> {
        let runtime =
            tokio::runtime::Handle::try_current().map_err(|e| ProtocolError::Unavailable {
                reason: e.to_string(),
            })?;
        let (out_tx, out_rx) = mpsc::unbounded_channel();
        let (ev_tx, ev_rx) = mpsc::unbounded_channel();

        runtime.spawn(drive(request.url.clone(), out_rx, ev_tx));
        Ok(Connection::from_channel(
            Arc::new(TungsteniteHandle { tx: out_tx }),
            ev_rx,
        ))
    }

    fn default_close_request(&self) -> ShutdownReason {
        ShutdownReason::GRACEFUL
    }

    fn builtin_adapters(&self) -> Vec<Arc<dyn EventAdapterFactory<Self>>> {
        vec![Arc::new(WebSocketEventAdapterFactory::new())]
    }
}

async fn drive(url: String, mut out_rx: mpsc::UnboundedReceiver<Outbound>, events: Events) {
    let connect = connect_async(url.as_str());
    tokio::pin!(connect);

    let (socket, response) = loop {
        tokio::select! {
            res = &mut connect => match res {
                Ok(pair) => break pair,
                Err(e) => {
                    let err = ProtocolError::connect(e.to_string());
                    let _ = events.send(ProtocolEvent::Failed(err));
                    return;
                }
            },
            cmd = out_rx.recv() => match cmd {
                Some(Outbound::Close(reason)) => {
                    debug!(%url, "closed before handshake");
                    let _ = events.send(ProtocolEvent::Closed(reason));
                    return;
                }
                Some(Outbound::Frame(_)) => trace!(%url, "frame dropped before handshake"),
                None => return,
            },
        }
    };

    let handshake = Handshake {
        status: response.status().as_u16(),
        protocol: response
            .headers()
            .get("sec-websocket-protocol")
            .and_then(|v| v.to_str().ok())
            .map(str::to_owned),
    };
    let _ = events.send(ProtocolEvent::Opened(handshake));

    let (mut sink, mut stream) = socket.split();
    let mut close_sent = false;
    let mut peer_close: Option<ShutdownReason> = None;

    loop {
        tokio::select! {
            cmd = out_rx.recv() => match cmd {
                Some(Outbound::Frame(frame)) => {
                    if let Err(e) = sink.send(frame).await {
                        let err = ProtocolError::transport(e.to_string());
                        let _ = events.send(ProtocolEvent::Failed(err));
                        return;
                    }
                }
                Some(Outbound::Close(reason)) => {
                    if close_sent {
                        continue;
                    }
                    close_sent = true;
                    let frame = CloseFrame {
                        code: CloseCode::from(reason.code),
                        reason: reason.reason.clone().into_owned().into(),
                    };
                    if let Err(e) = sink.send(Frame::Close(Some(frame))).await {
                        let err = ProtocolError::transport(e.to_string());
                        let _ = events.send(ProtocolEvent::Failed(err));
                        return;
                    }
                    peer_close.get_or_insert(reason);
                }
                None => {
                    let _ = sink.close().await;
                    return;
                }
            },
            frame = stream.next() => match frame {
                Some(Ok(Frame::Text(text))) => {
                    let message = Message::Text(text.as_str().to_owned());
                    let _ = events.send(ProtocolEvent::MessageReceived(message));
                }
                Some(Ok(Frame::Binary(bytes))) => {
                    let message = Message::Bytes(bytes.to_vec());
                    let _ = events.send(ProtocolEvent::MessageReceived(message));
                }
                Some(Ok(Frame::Close(frame))) => {
                    let reason = frame
                        .map(|f| {
                            ShutdownReason::new(u16::from(f.code), f.reason.as_str().to_owned())
                        })
                        .unwrap_or(ShutdownReason::GRACEFUL);
                    if !close_sent {
                        let _ = events.send(ProtocolEvent::Closing(reason.clone()));
                    }
                    peer_close = Some(reason);
                }
                Some(Ok(_)) => {}
                Some(Err(e)) => {
                    let ev = match peer_close.take() {
                        Some(reason) => ProtocolEvent::Closed(reason),
                        None => ProtocolEvent::Failed(ProtocolError::transport(e.to_string())),
                    };
                    let _ = events.send(ev);
                    return;
                }
                None => {
                    let reason = peer_close.take().unwrap_or(ShutdownReason::GRACEFUL);
                    let _ = events.send(ProtocolEvent::Closed(reason));
                    return;
                }
            },
        }
    }
}
