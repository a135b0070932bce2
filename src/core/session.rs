//! # Session: one (protocol, topic) binding.
//!
//! [`Session`] owns everything the actor mutates besides the state machine:
//! - the live [`ConnectionHandle`] (present from `OpenConnection` until the attempt ends),
//! - the resolved adapter,
//! - the attached subscribers and the last translated `Opened` event.
//!
//! [`Inbound`] is the single input type of a session inbox; every source (lifecycle
//! forwarder, retry timer, protocol forwarder, session handles) pushes into it.

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, PoisonError};

use tokio::sync::{mpsc, oneshot};
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace};

use crate::adapters::AdapterRef;
use crate::error::{ProtocolError, SendError};
use crate::events::{Bus, Event};
use crate::machine::{ConnectionState, LifecycleState};
use crate::protocol::{Connection, ConnectionHandle, Message, Protocol, ProtocolEvent};
use crate::sources::TimerFired;
use crate::topic::Topic;

/// Input of a session actor.
pub(crate) enum Inbound<P: Protocol, T> {
    /// Lifecycle forwarder.
    Lifecycle(LifecycleState),
    /// Protocol forwarder, tagged with the connection generation.
    Protocol {
        generation: u64,
        event: ProtocolEvent<P>,
    },
    /// Retry timer.
    TimerFired(TimerFired),
    /// Attach a subscriber.
    Attach {
        reply: oneshot::Sender<Subscription<T>>,
    },
    /// Detach a subscriber.
    Detach { id: u64 },
    /// Outbound message.
    Send {
        message: Message,
        reply: oneshot::Sender<Result<(), SendError>>,
    },
}

/// State shared between a session actor and its handles.
pub(crate) struct Control<P: Protocol> {
    pub(crate) token: CancellationToken,
    close_request: Mutex<Option<P::CloseRequest>>,
}

impl<P: Protocol> Control<P> {
    pub(crate) fn new(token: CancellationToken) -> Self {
        Self {
            token,
            close_request: Mutex::new(None),
        }
    }

    /// Records the close request for the destroy path; the first one wins.
    pub(crate) fn request_close(&self, request: P::CloseRequest) {
        let mut slot = self.close_request.lock().unwrap_or_else(PoisonError::into_inner);
        slot.get_or_insert(request);
    }

    pub(crate) fn take_close_request(&self) -> Option<P::CloseRequest> {
        self.close_request
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
    }
}

/// Typed event stream of one subscriber.
///
/// Dropping it (or calling [`unsubscribe`](Self::unsubscribe)) detaches the subscriber.
/// The stream ends (`recv` returns `None`) when the session is destroyed.
pub struct Subscription<T> {
    id: u64,
    state: ConnectionState,
    rx: mpsc::Receiver<T>,
    detach: Option<Box<dyn FnOnce(u64) + Send + Sync>>,
}

impl<T> Subscription<T> {
    /// Subscriber id, unique within the session.
    pub fn id(&self) -> u64 {
        self.id
    }

    /// Connection state at the moment of attaching.
    pub fn state(&self) -> ConnectionState {
        self.state
    }

    /// Next event; `None` once the session is destroyed.
    pub async fn recv(&mut self) -> Option<T> {
        self.rx.recv().await
    }

    /// Next event if one is queued.
    pub fn try_recv(&mut self) -> Option<T> {
        self.rx.try_recv().ok()
    }

    /// Detaches from the session.
    pub fn unsubscribe(self) {
        drop(self);
    }
}

impl<T> Drop for Subscription<T> {
    fn drop(&mut self) {
        if let Some(detach) = self.detach.take() {
            detach(self.id);
        }
    }
}

impl<T> std::fmt::Debug for Subscription<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription")
            .field("id", &self.id)
            .field("state", &self.state)
            .finish_non_exhaustive()
    }
}

/// Binds a topic to its connection and subscribers. Mutated only by the session actor.
pub(crate) struct Session<P: Protocol, T> {
    pub(crate) id: u64,
    pub(crate) topic: Topic,
    protocol: Arc<P>,
    request: P::OpenRequest,
    adapter: AdapterRef<P, T>,
    handle: Option<Arc<dyn ConnectionHandle<P>>>,
    subscribers: BTreeMap<u64, mpsc::Sender<T>>,
    next_subscriber: u64,
    last_opened: Option<T>,
    bus: Bus,
}

impl<P, T> Session<P, T>
where
    P: Protocol,
    T: Clone + Send + Sync + 'static,
{
    pub(crate) fn new(
        id: u64,
        topic: Topic,
        protocol: Arc<P>,
        request: P::OpenRequest,
        adapter: AdapterRef<P, T>,
        bus: Bus,
    ) -> Self {
        Self {
            id,
            topic,
            protocol,
            request,
            adapter,
            handle: None,
            subscribers: BTreeMap::new(),
            next_subscriber: 0,
            last_opened: None,
            bus,
        }
    }

    pub(crate) fn protocol(&self) -> &P {
        &self.protocol
    }

    /// Starts a connection attempt and keeps its handle. Returns the event stream.
    pub(crate) fn open(&mut self) -> Result<Connection<P>, ProtocolError> {
        let connection = self.protocol.open(&self.request)?;
        self.handle = Some(Arc::clone(&connection.handle));
        Ok(connection)
    }

    /// Asks the live connection to close. No handle means nothing to do.
    pub(crate) fn close(&mut self, request: P::CloseRequest) -> bool {
        match &self.handle {
            Some(handle) => {
                handle.close(request);
                true
            }
            None => false,
        }
    }

    /// Drops the connection handle. Returns whether one was held.
    pub(crate) fn release(&mut self) -> bool {
        self.last_opened = None;
        self.handle.take().is_some()
    }

    pub(crate) fn send(&self, message: Message) -> Result<(), ProtocolError> {
        match &self.handle {
            Some(handle) => handle.send(message),
            None => Err(ProtocolError::transport("no live connection")),
        }
    }

    /// Attaches a subscriber; a late subscriber of a connected session first receives the
    /// last `Opened` event.
    pub(crate) fn attach(
        &mut self,
        capacity: usize,
        state: ConnectionState,
        detach: Box<dyn FnOnce(u64) + Send + Sync>,
    ) -> Subscription<T> {
        let id = self.next_subscriber;
        self.next_subscriber += 1;

        let (tx, rx) = mpsc::channel(capacity.max(1));
        if state == ConnectionState::Connected {
            if let Some(opened) = &self.last_opened {
                let _ = tx.try_send(opened.clone());
            }
        }
        self.subscribers.insert(id, tx);
        debug!(topic = %self.topic, subscriber = id, %state, "subscriber attached");

        Subscription {
            id,
            state,
            rx,
            detach: Some(detach),
        }
    }

    pub(crate) fn detach(&mut self, id: u64) {
        if self.subscribers.remove(&id).is_some() {
            debug!(topic = %self.topic, subscriber = id, "subscriber detached");
        }
    }

    /// Translates the event and delivers it to every attached subscriber.
    pub(crate) fn publish(&mut self, event: ProtocolEvent<P>) {
        let opened = matches!(event, ProtocolEvent::Opened(_));
        let typed = self.adapter.from_event(event);
        if opened {
            self.last_opened = Some(typed.clone());
        }

        let mut gone = Vec::new();
        for (id, tx) in &self.subscribers {
            match tx.try_send(typed.clone()) {
                Ok(()) => {}
                Err(mpsc::error::TrySendError::Full(_)) => {
                    trace!(topic = %self.topic, subscriber = id, "subscriber queue full");
                    self.bus.publish(
                        Event::subscriber_overflow(format!("{}#{id}", self.topic), "full")
                            .with_session(self.id),
                    );
                }
                Err(mpsc::error::TrySendError::Closed(_)) => gone.push(*id),
            }
        }
        for id in gone {
            self.detach(id);
        }
    }

    pub(crate) fn subscriber_count(&self) -> usize {
        self.subscribers.len()
    }

    /// Drops every subscriber; their streams end.
    pub(crate) fn clear_subscribers(&mut self) {
        self.subscribers.clear();
    }
}
