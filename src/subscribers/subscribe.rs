//! # Observer trait for bus events.
//!
//! Provides [`Subscribe`], an extension point for plugging custom handlers of
//! observability [`Event`]s into the coordinator.
//!
//! Each observer gets:
//! - **Dedicated worker task** (runs independently)
//! - **Bounded queue** (capacity via [`Subscribe::queue_capacity`])
//! - **Panic isolation** (panics are reported as `EventKind::SubscriberPanicked`)
//!
//! ```text
//! SubscriberSet ──► [bounded queue] ──► worker task ──► observer.on_event()
//!                                    └─► panic caught → EventKind::SubscriberPanicked
//! ```
//!
//! Observers see diagnostics (state changes, retries, overflow). Typed connection events
//! go to session subscribers instead, through `SessionHandle::subscribe`.
//!
//! ## Example
//! ```rust
//! use async_trait::async_trait;
//! use tether::{Event, EventKind, Subscribe};
//!
//! struct Reconnects;
//!
//! #[async_trait]
//! impl Subscribe for Reconnects {
//!     async fn on_event(&self, ev: &Event) {
//!         if matches!(ev.kind, EventKind::RetryScheduled) {
//!             // bump a counter, etc.
//!         }
//!     }
//!
//!     fn name(&self) -> &'static str { "reconnects" }
//!     fn queue_capacity(&self) -> usize { 2048 }
//! }
//! ```

use async_trait::async_trait;

use crate::events::Event;

/// Observer of coordinator events.
///
/// ### Implementation requirements
/// - Use async I/O; avoid blocking the executor.
/// - Handle errors internally; do not panic.
/// - Slow processing affects only this observer's queue.
#[async_trait]
pub trait Subscribe: Send + Sync + 'static {
    /// Processes a single event, in FIFO order, from a dedicated worker task.
    async fn on_event(&self, event: &Event);

    /// Name used in logs and overflow/panic events.
    ///
    /// The default uses `type_name::<Self>()`, which can be verbose; override it when possible.
    fn name(&self) -> &'static str {
        std::any::type_name::<Self>()
    }

    /// Preferred queue capacity (clamped to a minimum of 1).
    ///
    /// Default: 1024.
    fn queue_capacity(&self) -> usize {
        1024
    }
}
