//! # Typed client surface of one session.
//!
//! [`SessionHandle`] is cheap to clone. Every request goes through the session inbox, so it
//! is ordered with lifecycle, timer and protocol inputs. Destroying is the exception: it
//! cancels the session token, which the actor observes before any queued input.

use std::sync::Arc;

use tokio::sync::{mpsc, oneshot, watch};

use crate::core::session::{Control, Inbound, Subscription};
use crate::error::{RuntimeError, SendError};
use crate::machine::ConnectionState;
use crate::protocol::{Message, Protocol};
use crate::topic::Topic;

/// Handle to a live session delivering events of type `T`.
pub struct SessionHandle<P: Protocol, T> {
    id: u64,
    topic: Topic,
    inbox: mpsc::Sender<Inbound<P, T>>,
    state: watch::Receiver<ConnectionState>,
    control: Arc<Control<P>>,
}

impl<P: Protocol, T> Clone for SessionHandle<P, T> {
    fn clone(&self) -> Self {
        Self {
            id: self.id,
            topic: self.topic.clone(),
            inbox: self.inbox.clone(),
            state: self.state.clone(),
            control: Arc::clone(&self.control),
        }
    }
}

impl<P, T> SessionHandle<P, T>
where
    P: Protocol,
    T: Clone + Send + Sync + 'static,
{
    pub(crate) fn new(
        id: u64,
        topic: Topic,
        inbox: mpsc::Sender<Inbound<P, T>>,
        state: watch::Receiver<ConnectionState>,
        control: Arc<Control<P>>,
    ) -> Self {
        Self {
            id,
            topic,
            inbox,
            state,
            control,
        }
    }

    /// Topic this session serves.
    pub fn topic(&self) -> &Topic {
        &self.topic
    }

    /// Session instance id (distinguishes sessions re-opened on the same topic).
    pub fn id(&self) -> u64 {
        self.id
    }

    /// Current connection state.
    pub fn state(&self) -> ConnectionState {
        *self.state.borrow()
    }

    /// Receiver notified on every state change.
    pub fn state_changes(&self) -> watch::Receiver<ConnectionState> {
        self.state.clone()
    }

    /// Waits until the state satisfies `pred`; returns the matching state.
    ///
    /// Returns `Destroyed` if the session ends first.
    pub async fn wait_for(&self, mut pred: impl FnMut(ConnectionState) -> bool) -> ConnectionState {
        let mut rx = self.state.clone();
        match rx.wait_for(|s| pred(*s) || s.is_terminal()).await {
            Ok(state) => *state,
            Err(_) => ConnectionState::Destroyed,
        }
    }

    /// True once the session has been torn down.
    pub fn is_destroyed(&self) -> bool {
        self.state().is_terminal()
    }

    /// Attaches a subscriber.
    ///
    /// If the session is `Connected`, the last `Opened` event is delivered first.
    pub async fn subscribe(&self) -> Result<Subscription<T>, RuntimeError> {
        let (reply, rx) = oneshot::channel();
        self.inbox
            .send(Inbound::Attach { reply })
            .await
            .map_err(|_| self.destroyed())?;
        rx.await.map_err(|_| self.destroyed())
    }

    /// Sends a message over the live connection (or queues it, per the send policy).
    pub async fn send(&self, message: impl Into<Message>) -> Result<(), SendError> {
        if self.control.token.is_cancelled() {
            return Err(SendError::Destroyed);
        }
        let (reply, rx) = oneshot::channel();
        self.inbox
            .send(Inbound::Send {
                message: message.into(),
                reply,
            })
            .await
            .map_err(|_| SendError::Destroyed)?;
        rx.await.unwrap_or(Err(SendError::Destroyed))
    }

    /// Destroys the session with the protocol's default close request and waits for teardown.
    pub async fn destroy(&self) {
        self.control.token.cancel();
        self.wait_for(|s| s.is_terminal()).await;
    }

    /// Destroys the session, closing a live connection with `request`, and waits for teardown.
    pub async fn destroy_with(&self, request: P::CloseRequest) {
        self.control.request_close(request);
        self.destroy().await;
    }

    #[cfg(test)]
    pub(crate) fn inbox(&self) -> &mpsc::Sender<Inbound<P, T>> {
        &self.inbox
    }

    fn destroyed(&self) -> RuntimeError {
        RuntimeError::SessionDestroyed {
            topic: self.topic.clone(),
        }
    }
}

impl<P: Protocol, T> std::fmt::Debug for SessionHandle<P, T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionHandle")
            .field("id", &self.id)
            .field("topic", &self.topic)
            .field("state", &*self.state.borrow())
            .finish_non_exhaustive()
    }
}
