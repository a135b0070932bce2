//! # tether
//!
//! **Tether** keeps persistent, message-oriented client connections alive.
//!
//! A caller opens a *session* per topic over a transport (a [`Protocol`]) and states a
//! desire through a lifecycle signal: connected or not. The coordinator opens, closes and
//! reconnects on its own, paces retries with a [`BackoffStrategy`], and republishes the
//! transport's generic events as the typed events the caller asked for.
//!
//! ## Architecture
//! ### Overview
//! ```text
//!  LifecycleEventSource (watch)            Protocol (WebSocket, scripted, ...)
//!          │                                    ▲            │
//!          │ Started / Stopped                  │ open/close │ ProtocolEvent<P>
//!          ▼                                    │ send       ▼
//! ┌──────────────────────────────────────────────────────────────────────┐
//! │  Coordinator                                                         │
//! │  - AdapterRegistry (caller factories, identity, protocol built-ins)  │
//! │  - Registry (one live session per topic)                             │
//! │  - Bus + SubscriberSet (diagnostics fan-out)                         │
//! └──────┬──────────────────────────┬──────────────────────────┬─────────┘
//!        ▼                          ▼                          ▼
//!  ┌───────────────┐          ┌───────────────┐          ┌───────────────┐
//!  │ SessionActor  │          │ SessionActor  │          │ SessionActor  │
//!  │ topic "main"  │          │ topic "quotes"│          │ topic "..."   │
//!  │ inbox → state │          │ inbox → state │          │ inbox → state │
//!  │ machine → cmd │          │ machine → cmd │          │ machine → cmd │
//!  └──────┬────────┘          └──────┬────────┘          └──────┬────────┘
//!         │ EventAdapter::from_event │                          │
//!         ▼                          ▼                          ▼
//!   Subscription<T>            Subscription<T>            Subscription<T>
//! ```
//!
//! ### Session lifecycle
//! ```text
//!                 Started                    Opened
//!  Disconnected ──────────► Connecting ────────────► Connected ◄── MessageReceived
//!       ▲                    │      ▲                 │   │          Closing
//!       │ Stopped            │      │ timer fired     │   │
//!       │                    │ Failed               Failed │ Stopped
//!       │                    ▼      │                 │   ▼
//!       └──────────── WaitingToRetry ◄────────────────┘  Disconnecting ── Closed/Failed ──► Disconnected
//!
//!  any live state ── Destroy ──► Destroyed (timer cancelled, live connection closed once)
//! ```
//!
//! ## Features
//! | Area              | Description                                                      | Key types / traits                                 |
//! |-------------------|------------------------------------------------------------------|----------------------------------------------------|
//! | **Coordination**  | Open, observe and destroy sessions; graceful shutdown.           | [`Coordinator`], [`SessionHandle`]                 |
//! | **State machine** | Pure transition table driving every session.                     | [`StateMachine`], [`ConnectionState`]              |
//! | **Transports**    | Plug any connection type.                                        | [`Protocol`], [`Connection`], [`ConnectionHandle`] |
//! | **Adapters**      | Generic events to typed events, resolved once per session.       | [`EventAdapter`], [`EventAdapterFactory`]          |
//! | **Policies**      | Retry pacing with jitter.                                        | [`BackoffStrategy`], [`BackoffPolicy`]             |
//! | **Observers**     | Hook into diagnostics (logging, metrics).                        | [`Subscribe`], [`LogWriter`]                       |
//! | **Configuration** | Centralize runtime settings.                                     | [`Config`], [`SendPolicy`]                         |
//!
//! ## Optional features
//! - `tungstenite`: a WebSocket [`Protocol`] backed by `tokio-tungstenite`.
//!
//! ## Example
//! ```rust
//! use std::sync::Arc;
//! use tokio::sync::mpsc;
//! use tether::{
//!     Connection, ConnectionHandle, Coordinator, Message, Protocol, ProtocolError,
//!     ProtocolEvent, ShutdownReason, WebSocketEvent, WebSocketEventAdapterFactory,
//! };
//!
//! /// Loopback transport: opens at once and echoes every message.
//! struct Echo;
//!
//! struct EchoHandle(mpsc::UnboundedSender<ProtocolEvent<Echo>>);
//!
//! impl ConnectionHandle<Echo> for EchoHandle {
//!     fn send(&self, message: Message) -> Result<(), ProtocolError> {
//!         self.0
//!             .send(ProtocolEvent::MessageReceived(message))
//!             .map_err(|_| ProtocolError::transport("closed"))
//!     }
//!
//!     fn close(&self, request: ShutdownReason) {
//!         let _ = self.0.send(ProtocolEvent::Closed(request));
//!     }
//! }
//!
//! impl Protocol for Echo {
//!     type OpenRequest = ();
//!     type OpenResponse = ();
//!     type CloseRequest = ShutdownReason;
//!     type CloseResponse = ShutdownReason;
//!
//!     fn name(&self) -> &'static str {
//!         "echo"
//!     }
//!
//!     fn open(&self, _: &()) -> Result<Connection<Self>, ProtocolError> {
//!         let (tx, rx) = mpsc::unbounded_channel();
//!         let _ = tx.send(ProtocolEvent::Opened(()));
//!         Ok(Connection::from_channel(Arc::new(EchoHandle(tx)), rx))
//!     }
//!
//!     fn default_close_request(&self) -> ShutdownReason {
//!         ShutdownReason::GRACEFUL
//!     }
//! }
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let coordinator = Coordinator::builder(Echo)
//!         .with_adapter_factory(WebSocketEventAdapterFactory::new())
//!         .build();
//!
//!     let session = coordinator.open_session::<WebSocketEvent<()>>(()).await?;
//!     let mut events = session.subscribe().await?;
//!     assert_eq!(events.recv().await, Some(WebSocketEvent::ConnectionOpened(())));
//!
//!     session.send("ping").await?;
//!     assert_eq!(
//!         events.recv().await,
//!         Some(WebSocketEvent::MessageReceived(Message::from("ping")))
//!     );
//!
//!     coordinator.shutdown().await?;
//!     Ok(())
//! }
//! ```
mod adapters;
mod core;
mod error;
mod events;
mod machine;
mod policies;
mod protocol;
mod sources;
mod subscribers;
mod topic;
mod websocket;

// ---- Public re-exports ----

pub use adapters::{
    AdapterRef, AdapterRegistry, ErasedAdapter, EventAdapter, EventAdapterFactory,
    ProtocolEventAdapter, ProtocolEventAdapterFactory,
};
pub use crate::core::{
    Config, Coordinator, CoordinatorBuilder, SendPolicy, SessionHandle, Subscription,
};
pub use error::{AdapterError, ProtocolError, RuntimeError, SendError};
pub use events::{Bus, Event, EventKind};
pub use machine::{
    Command, ConnectionState, Input, LifecycleState, Outcome, StateMachine, Transition,
};
pub use policies::{BackoffCurve, BackoffPolicy, BackoffStrategy, JitterPolicy};
pub use protocol::{
    Connection, ConnectionHandle, Message, Payload, Protocol, ProtocolEvent, ProtocolSignal,
};
pub use sources::{LifecycleController, LifecycleEventSource, TimerEventSource, TimerFired};
pub use subscribers::{LogWriter, Subscribe, SubscriberSet};
pub use topic::Topic;
pub use websocket::{
    ShutdownReason, WebSocketEvent, WebSocketEventAdapter, WebSocketEventAdapterFactory,
};

// Optional: a WebSocket transport over tokio-tungstenite.
// Enable with: `--features tungstenite`
#[cfg(feature = "tungstenite")]
pub use websocket::{Handshake, TungsteniteProtocol, WebSocketRequest};
