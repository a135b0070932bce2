//! # Non-blocking event fan-out to observers.
//!
//! ```text
//! emit(event)
//!     │
//!     ├──► [queue 1] ──► worker 1 ──► observer1.on_event()
//!     │    (bounded)         └──────► panic → SubscriberPanicked
//!     ├──► [queue 2] ──► worker 2 ──► observer2.on_event()
//!     └──► [queue N] ──► worker N ──► observerN.on_event()
//! ```
//!
//! ## Rules
//! - **Non-blocking**: `emit()` uses `try_send` and returns immediately.
//! - **Overflow**: the event is dropped for that observer only; `SubscriberOverflow` is published.
//! - **Per-observer FIFO**, no ordering across observers.
//!
//! **Warning**: `AssertUnwindSafe` is used, which can leave shared state inconsistent
//! if an observer panics while holding a lock.

use std::sync::Arc;

use futures::FutureExt;
use tokio::{sync::mpsc, task::JoinHandle};

use crate::events::{Bus, Event, EventKind};
use crate::subscribers::Subscribe;

struct Channel {
    name: &'static str,
    sender: mpsc::Sender<Arc<Event>>,
}

/// Fan-out of bus events to observers, each with its own queue and worker.
pub struct SubscriberSet {
    channels: Vec<Channel>,
    workers: Vec<JoinHandle<()>>,
    bus: Bus,
}

impl SubscriberSet {
    /// Creates the set and spawns one worker per observer.
    #[must_use]
    pub fn new(subs: Vec<Arc<dyn Subscribe>>, bus: Bus) -> Self {
        let mut channels = Vec::with_capacity(subs.len());
        let mut workers = Vec::with_capacity(subs.len());

        for sub in subs {
            let name = sub.name();
            let (tx, mut rx) = mpsc::channel::<Arc<Event>>(sub.queue_capacity().max(1));
            let worker_bus = bus.clone();

            workers.push(tokio::spawn(async move {
                while let Some(ev) = rx.recv().await {
                    let fut = sub.on_event(ev.as_ref());
                    if let Err(panic) = std::panic::AssertUnwindSafe(fut).catch_unwind().await {
                        let info = if let Some(msg) = panic.downcast_ref::<&'static str>() {
                            (*msg).to_string()
                        } else if let Some(msg) = panic.downcast_ref::<String>() {
                            msg.clone()
                        } else {
                            "unknown panic".to_string()
                        };
                        worker_bus.publish(Event::subscriber_panicked(sub.name(), info));
                    }
                }
            }));
            channels.push(Channel { name, sender: tx });
        }
        Self {
            channels,
            workers,
            bus,
        }
    }

    /// Number of observers.
    pub fn len(&self) -> usize {
        self.channels.len()
    }

    /// True if there are no observers.
    pub fn is_empty(&self) -> bool {
        self.channels.is_empty()
    }

    /// Emits an event to every observer.
    ///
    /// Overflow of an overflow event is not re-published, which prevents feedback loops.
    pub fn emit(&self, event: Arc<Event>) {
        let is_overflow = matches!(event.kind, EventKind::SubscriberOverflow);

        for channel in &self.channels {
            let reason = match channel.sender.try_send(Arc::clone(&event)) {
                Ok(()) => continue,
                Err(mpsc::error::TrySendError::Full(_)) => "full",
                Err(mpsc::error::TrySendError::Closed(_)) => "closed",
            };
            if !is_overflow {
                self.bus.publish(Event::subscriber_overflow(channel.name, reason));
            }
        }
    }

    /// Closes every queue and waits for the workers to drain.
    pub async fn shutdown(self) {
        drop(self.channels);
        for worker in self.workers {
            let _ = worker.await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::Mutex;

    #[derive(Default)]
    struct Recorder(Mutex<Vec<EventKind>>);

    #[async_trait]
    impl Subscribe for Recorder {
        async fn on_event(&self, ev: &Event) {
            self.0.lock().unwrap().push(ev.kind);
        }

        fn name(&self) -> &'static str {
            "recorder"
        }
    }

    struct Panicker;

    #[async_trait]
    impl Subscribe for Panicker {
        async fn on_event(&self, _ev: &Event) {
            panic!("boom");
        }

        fn name(&self) -> &'static str {
            "panicker"
        }
    }

    #[tokio::test]
    async fn delivers_in_order_and_drains_on_shutdown() {
        let rec = Arc::new(Recorder::default());
        let set = SubscriberSet::new(vec![rec.clone()], Bus::new(8));
        assert_eq!(set.len(), 1);

        set.emit(Arc::new(Event::new(EventKind::SessionOpened)));
        set.emit(Arc::new(Event::new(EventKind::SessionDestroyed)));
        set.shutdown().await;

        assert_eq!(
            *rec.0.lock().unwrap(),
            vec![EventKind::SessionOpened, EventKind::SessionDestroyed]
        );
    }

    #[tokio::test]
    async fn panic_is_reported_on_the_bus() {
        let bus = Bus::new(8);
        let mut rx = bus.subscribe();
        let set = SubscriberSet::new(vec![Arc::new(Panicker)], bus);

        set.emit(Arc::new(Event::new(EventKind::StateChanged)));
        let ev = rx.recv().await.unwrap();
        assert_eq!(ev.kind, EventKind::SubscriberPanicked);
        assert_eq!(ev.topic.as_deref(), Some("panicker"));
        assert_eq!(ev.reason.as_deref(), Some("boom"));
    }
}
