//! # Lifecycle feed: the caller's desire to be connected.
//!
//! [`LifecycleEventSource`] wraps a `watch` receiver. Each session attaches its own
//! forwarder, which pushes the *current* value first and then every change into the
//! session inbox.
//!
//! ```text
//! LifecycleController ──watch──► LifecycleEventSource ──attach()──► forwarder ──► inbox
//!   start()/stop()                 current()                            (per session)
//! ```

use std::sync::Arc;

use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::trace;

use crate::machine::LifecycleState;

/// Push-based source of [`LifecycleState`] values; the current value is always queryable.
#[derive(Clone, Debug)]
pub struct LifecycleEventSource {
    rx: watch::Receiver<LifecycleState>,
}

impl LifecycleEventSource {
    /// Wraps an existing watch receiver.
    pub fn from_watch(rx: watch::Receiver<LifecycleState>) -> Self {
        Self { rx }
    }

    /// Source that is `Started` forever.
    pub fn always_on() -> Self {
        Self::fixed(LifecycleState::Started)
    }

    /// Source that is `Stopped` forever.
    pub fn always_off() -> Self {
        Self::fixed(LifecycleState::Stopped)
    }

    /// Source driven by the returned controller.
    pub fn manual(initial: LifecycleState) -> (LifecycleController, Self) {
        let (tx, rx) = watch::channel(initial);
        (LifecycleController { tx: Arc::new(tx) }, Self { rx })
    }

    fn fixed(state: LifecycleState) -> Self {
        let (_tx, rx) = watch::channel(state);
        Self { rx }
    }

    /// Current desire.
    pub fn current(&self) -> LifecycleState {
        *self.rx.borrow()
    }

    /// Spawns a forwarder delivering the current value, then each change, into `inbox`.
    ///
    /// Ends when the token is cancelled, the inbox closes, or the controller is dropped.
    pub fn attach<M>(
        &self,
        inbox: mpsc::Sender<M>,
        token: CancellationToken,
        wrap: fn(LifecycleState) -> M,
    ) -> JoinHandle<()>
    where
        M: Send + 'static,
    {
        let mut rx = self.rx.clone();
        tokio::spawn(async move {
            loop {
                let state = *rx.borrow_and_update();
                trace!(?state, "lifecycle forwarded");
                if inbox.send(wrap(state)).await.is_err() {
                    return;
                }
                tokio::select! {
                    _ = token.cancelled() => return,
                    changed = rx.changed() => {
                        if changed.is_err() {
                            return;
                        }
                    }
                }
            }
        })
    }
}

/// Drives a manual [`LifecycleEventSource`].
#[derive(Clone, Debug)]
pub struct LifecycleController {
    tx: Arc<watch::Sender<LifecycleState>>,
}

impl LifecycleController {
    /// Desire a connection.
    pub fn start(&self) {
        self.set(LifecycleState::Started);
    }

    /// Desire no connection.
    pub fn stop(&self) {
        self.set(LifecycleState::Stopped);
    }

    /// Sets the desire; repeating the current value notifies nobody.
    pub fn set(&self, state: LifecycleState) {
        self.tx.send_if_modified(|current| {
            let changed = *current != state;
            *current = state;
            changed
        });
    }

    /// Flips the desire and returns the new value.
    pub fn toggle(&self) -> LifecycleState {
        let next = match self.current() {
            LifecycleState::Started => LifecycleState::Stopped,
            LifecycleState::Stopped => LifecycleState::Started,
        };
        self.set(next);
        next
    }

    /// Current desire.
    pub fn current(&self) -> LifecycleState {
        *self.tx.borrow()
    }

    /// Another source fed by this controller.
    pub fn source(&self) -> LifecycleEventSource {
        LifecycleEventSource {
            rx: self.tx.subscribe(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::machine::LifecycleState::{Started, Stopped};

    #[tokio::test]
    async fn fixed_sources_deliver_once() {
        let (tx, mut rx) = mpsc::channel(4);
        let handle = LifecycleEventSource::always_on().attach(tx, CancellationToken::new(), |s| s);

        assert_eq!(rx.recv().await, Some(Started));
        handle.await.unwrap();
        assert_eq!(rx.recv().await, None);
        assert_eq!(LifecycleEventSource::always_off().current(), Stopped);
    }

    #[tokio::test]
    async fn manual_source_forwards_current_then_changes() {
        let (ctl, source) = LifecycleEventSource::manual(Stopped);
        let (tx, mut rx) = mpsc::channel(4);
        let token = CancellationToken::new();
        let handle = source.attach(tx, token.clone(), |s| s);

        assert_eq!(rx.recv().await, Some(Stopped));
        ctl.start();
        assert_eq!(rx.recv().await, Some(Started));
        assert_eq!(ctl.toggle(), Stopped);
        assert_eq!(rx.recv().await, Some(Stopped));
        assert_eq!(source.current(), Stopped);

        token.cancel();
        handle.await.unwrap();
    }

    #[tokio::test]
    async fn repeated_value_is_not_forwarded() {
        let (ctl, source) = LifecycleEventSource::manual(Started);
        let (tx, mut rx) = mpsc::channel(4);
        let _handle = source.attach(tx, CancellationToken::new(), |s| s);

        assert_eq!(rx.recv().await, Some(Started));
        ctl.start();
        ctl.stop();
        assert_eq!(rx.recv().await, Some(Stopped));
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn controller_sources_share_state() {
        let (ctl, _source) = LifecycleEventSource::manual(Stopped);
        let other = ctl.source();
        ctl.start();
        assert_eq!(other.current(), Started);
        assert_eq!(ctl.current(), Started);
    }
}
