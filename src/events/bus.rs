//! # Event bus for broadcasting observability events.
//!
//! [`Bus`] is a thin wrapper around [`tokio::sync::broadcast`] that lets session actors,
//! the registry and the coordinator publish without blocking.
//!
//! ## Architecture
//! ```text
//! Publishers (many):                    Consumers:
//!   SessionActor 1 ──┐
//!   SessionActor 2 ──┼──► Bus ──┬──► observer_listener ──► SubscriberSet
//!   Registry       ──┤          ├──► Registry listener (SessionDestroyed cleanup)
//!   Coordinator    ──┘          └──► Coordinator::events() receivers
//! ```
//!
//! ## Rules
//! - **Non-blocking publish**: `publish()` calls `broadcast::Sender::send` and returns.
//! - **Bounded capacity**: one ring buffer shared by all receivers.
//! - **Lag handling**: slow receivers get `RecvError::Lagged(n)` and skip `n` oldest items.
//! - **No persistence**: events sent while nobody listens are lost.

use tokio::sync::broadcast;

use super::event::Event;

/// Broadcast channel for observability events.
///
/// Cheap to clone (holds an `Arc`-backed sender).
#[derive(Clone, Debug)]
pub struct Bus {
    tx: broadcast::Sender<Event>,
}

impl Bus {
    /// Creates a new bus with the given channel capacity (minimum 1).
    pub fn new(capacity: usize) -> Self {
        let (tx, _rx) = broadcast::channel::<Event>(capacity.max(1));
        Self { tx }
    }

    /// Publishes an event to all active receivers. Dropped if there are none.
    pub fn publish(&self, ev: Event) {
        let _ = self.tx.send(ev);
    }

    /// Creates a receiver that observes events sent after this call.
    pub fn subscribe(&self) -> broadcast::Receiver<Event> {
        self.tx.subscribe()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::EventKind;

    #[tokio::test]
    async fn delivers_to_every_receiver() {
        let bus = Bus::new(8);
        let mut a = bus.subscribe();
        let mut b = bus.subscribe();

        bus.publish(Event::new(EventKind::ShutdownRequested));

        assert_eq!(a.recv().await.unwrap().kind, EventKind::ShutdownRequested);
        assert_eq!(b.recv().await.unwrap().kind, EventKind::ShutdownRequested);
    }

    #[test]
    fn publish_without_receivers_is_harmless() {
        let bus = Bus::new(0);
        bus.publish(Event::new(EventKind::AllStoppedWithin));
    }
}
