//! In-memory protocol driven by tests.
//!
//! Every `open` hands a [`Remote`] to the test through a channel; the test plays the
//! peer by pushing events and inspects what the coordinator sent or closed.

use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::{Arc, Mutex};

use tokio::sync::mpsc;

use crate::adapters::EventAdapterFactory;
use crate::error::ProtocolError;
use crate::protocol::{Connection, ConnectionHandle, Message, Protocol, ProtocolEvent};
use crate::websocket::{ShutdownReason, WebSocketEventAdapterFactory};

pub(crate) struct ScriptedProtocol {
    opened: mpsc::UnboundedSender<Arc<Remote>>,
    refuse_opens: AtomicU32,
}

impl ScriptedProtocol {
    pub(crate) fn new() -> (Self, mpsc::UnboundedReceiver<Arc<Remote>>) {
        let (opened, rx) = mpsc::unbounded_channel();
        let protocol = Self {
            opened,
            refuse_opens: AtomicU32::new(0),
        };
        (protocol, rx)
    }

    /// Makes the next `n` calls to `open` fail synchronously.
    pub(crate) fn refuse_next_opens(&self, n: u32) {
        self.refuse_opens.store(n, Ordering::SeqCst);
    }
}

impl Protocol for ScriptedProtocol {
    type OpenRequest = String;
    type OpenResponse = String;
    type CloseRequest = ShutdownReason;
    type CloseResponse = ShutdownReason;

    fn name(&self) -> &'static str {
        "scripted"
    }

    fn open(&self, request: &String) -> Result<Connection<Self>, ProtocolError> {
        let refused = self
            .refuse_opens
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if refused {
            return Err(ProtocolError::Unavailable {
                reason: "scripted refusal".into(),
            });
        }

        let (tx, rx) = mpsc::unbounded_channel();
        let remote = Arc::new(Remote {
            request: request.clone(),
            tx: Mutex::new(Some(tx)),
            closes: Mutex::new(Vec::new()),
            sent: Mutex::new(Vec::new()),
            auto_close: AtomicBool::new(true),
        });
        let _ = self.opened.send(Arc::clone(&remote));
        Ok(Connection::from_channel(Arc::new(RemoteHandle(remote)), rx))
    }

    fn default_close_request(&self) -> ShutdownReason {
        ShutdownReason::GRACEFUL
    }

    fn builtin_adapters(&self) -> Vec<Arc<dyn EventAdapterFactory<Self>>> {
        vec![Arc::new(WebSocketEventAdapterFactory::new())]
    }
}

/// Peer side of one scripted connection attempt.
pub(crate) struct Remote {
    pub(crate) request: String,
    tx: Mutex<Option<mpsc::UnboundedSender<ProtocolEvent<ScriptedProtocol>>>>,
    closes: Mutex<Vec<ShutdownReason>>,
    sent: Mutex<Vec<Message>>,
    auto_close: AtomicBool,
}

impl Remote {
    fn emit(&self, ev: ProtocolEvent<ScriptedProtocol>) {
        let terminal = ev.is_terminal();
        let mut tx = self.tx.lock().unwrap();
        if let Some(sender) = tx.as_ref() {
            let _ = sender.send(ev);
        }
        if terminal {
            tx.take();
        }
    }

    pub(crate) fn open(&self, response: &str) {
        self.emit(ProtocolEvent::Opened(response.to_owned()));
    }

    pub(crate) fn message(&self, message: impl Into<Message>) {
        self.emit(ProtocolEvent::MessageReceived(message.into()));
    }

    pub(crate) fn closing(&self, reason: ShutdownReason) {
        self.emit(ProtocolEvent::Closing(reason));
    }

    pub(crate) fn closed(&self, reason: ShutdownReason) {
        self.emit(ProtocolEvent::Closed(reason));
    }

    pub(crate) fn fail(&self, reason: &str) {
        self.emit(ProtocolEvent::Failed(ProtocolError::connect(reason)));
    }

    /// Ends the event stream without a terminal event.
    pub(crate) fn vanish(&self) {
        self.tx.lock().unwrap().take();
    }

    /// When disabled, `close` is recorded but no `Closed` event follows.
    pub(crate) fn set_auto_close(&self, on: bool) {
        self.auto_close.store(on, Ordering::SeqCst);
    }

    pub(crate) fn closes(&self) -> Vec<ShutdownReason> {
        self.closes.lock().unwrap().clone()
    }

    pub(crate) fn sent(&self) -> Vec<Message> {
        self.sent.lock().unwrap().clone()
    }
}

struct RemoteHandle(Arc<Remote>);

impl ConnectionHandle<ScriptedProtocol> for RemoteHandle {
    fn send(&self, message: Message) -> Result<(), ProtocolError> {
        if self.0.tx.lock().unwrap().is_none() {
            return Err(ProtocolError::transport("connection released"));
        }
        self.0.sent.lock().unwrap().push(message);
        Ok(())
    }

    fn close(&self, request: ShutdownReason) {
        self.0.closes.lock().unwrap().push(request.clone());
        if self.0.auto_close.load(Ordering::SeqCst) {
            self.0.closed(request);
        }
    }
}
