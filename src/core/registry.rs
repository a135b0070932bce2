//! # Session registry: live sessions by topic.
//!
//! Registry owns the actor handles (JoinHandle + CancellationToken) and cleans up after
//! itself by listening to the bus:
//!
//! ```text
//! Coordinator::open_session ──► Registry::register(topic, id, token, spawn)
//! Coordinator::destroy      ──► Registry::remove(topic) → cancel → join
//! Bus ──► Registry listener
//!          └─► SessionDestroyed(topic, id) → cleanup(topic, id)
//! ```
//!
//! ## Rules
//! - At most one live session per topic.
//! - Cleanup matches on the session id, so a stale `SessionDestroyed` never removes a newer
//!   session opened on the same topic.
//! - `SessionOpened` is published once the session is registered.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::RwLock;
use tokio::sync::broadcast::error::RecvError;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::error::RuntimeError;
use crate::events::{Bus, Event, EventKind};
use crate::topic::Topic;

/// Handle to a running session actor.
pub(crate) struct Handle {
    /// Session instance id.
    pub(crate) id: u64,
    /// Join handle of the actor task.
    pub(crate) join: JoinHandle<()>,
    /// Session token (child of the coordinator token).
    pub(crate) cancel: CancellationToken,
}

/// Event-driven registry of live sessions.
pub(crate) struct Registry {
    sessions: RwLock<HashMap<Topic, Handle>>,
    bus: Bus,
    runtime_token: CancellationToken,
}

impl Registry {
    /// Creates a new registry.
    pub(crate) fn new(bus: Bus, runtime_token: CancellationToken) -> Arc<Self> {
        Arc::new(Self {
            sessions: RwLock::new(HashMap::new()),
            bus,
            runtime_token,
        })
    }

    /// Spawns the listener that removes destroyed sessions.
    ///
    /// Call once during coordinator init.
    pub(crate) fn spawn_listener(self: Arc<Self>) {
        let mut rx = self.bus.subscribe();
        let rt = self.runtime_token.clone();
        let me = self;

        tokio::spawn(async move {
            loop {
                tokio::select! {
                    _ = rt.cancelled() => break,
                    msg = rx.recv() => match msg {
                        Ok(ev) => me.handle_event(&ev).await,
                        Err(RecvError::Closed) => break,
                        Err(RecvError::Lagged(n)) => {
                            warn!(skipped = n, "registry listener lagged");
                            me.sweep().await;
                        }
                    }
                }
            }
        });
    }

    async fn handle_event(&self, event: &Event) {
        if event.kind != EventKind::SessionDestroyed {
            return;
        }
        if let (Some(topic), Some(id)) = (&event.topic, event.session) {
            self.cleanup(&Topic::new(Arc::clone(topic)), id).await;
        }
    }

    /// Registers a session, spawning its actor only if the topic is free.
    pub(crate) async fn register(
        &self,
        topic: Topic,
        id: u64,
        cancel: CancellationToken,
        spawn: impl FnOnce() -> JoinHandle<()>,
    ) -> Result<(), RuntimeError> {
        let mut sessions = self.sessions.write().await;
        if self.runtime_token.is_cancelled() {
            return Err(RuntimeError::ShuttingDown);
        }
        let live = sessions
            .get(&topic)
            .map(|h| !h.cancel.is_cancelled() && !h.join.is_finished());
        match live {
            Some(true) => return Err(RuntimeError::SessionExists { topic }),
            Some(false) => {
                if let Some(previous) = sessions.remove(&topic) {
                    Self::join(&topic, previous.join).await;
                }
            }
            None => {}
        }
        let join = spawn();
        sessions.insert(topic.clone(), Handle { id, join, cancel });
        drop(sessions);

        debug!(%topic, session = id, "session registered");
        self.bus.publish(
            Event::new(EventKind::SessionOpened)
                .with_topic(topic.as_arc())
                .with_session(id),
        );
        Ok(())
    }

    /// Returns sorted list of live topics.
    pub(crate) async fn list(&self) -> Vec<Topic> {
        let sessions = self.sessions.read().await;
        let mut topics: Vec<Topic> = sessions.keys().cloned().collect();
        topics.sort_unstable();
        topics
    }

    /// Cancels and joins the session on `topic`. Returns false if there was none.
    pub(crate) async fn remove(&self, topic: &Topic) -> bool {
        let Some(handle) = self.sessions.write().await.remove(topic) else {
            return false;
        };
        handle.cancel.cancel();
        Self::join(topic, handle.join).await;
        true
    }

    /// Takes every handle out of the registry (shutdown path).
    pub(crate) async fn drain(&self) -> Vec<(Topic, Handle)> {
        self.sessions.write().await.drain().collect()
    }

    /// Removes the session if it is still the one with `id`.
    async fn cleanup(&self, topic: &Topic, id: u64) {
        let handle = {
            let mut sessions = self.sessions.write().await;
            if sessions.get(topic).is_some_and(|h| h.id == id) {
                sessions.remove(topic)
            } else {
                None
            }
        };
        if let Some(handle) = handle {
            Self::join(topic, handle.join).await;
        }
    }

    /// Removes every entry whose actor already finished (after a lagged listener).
    async fn sweep(&self) {
        let mut sessions = self.sessions.write().await;
        sessions.retain(|_, h| !h.join.is_finished());
    }

    async fn join(topic: &Topic, join: JoinHandle<()>) {
        if let Err(e) = join.await {
            if e.is_panic() {
                warn!(%topic, "session actor panicked");
            }
        }
    }
}
