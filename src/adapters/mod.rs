//! # Event adapters: generic protocol events → caller-facing typed events.
//!
//! A session is opened for a target type `T`. The [`AdapterRegistry`] walks its factories
//! in order, asks each one whether it recognises `TypeId::of::<T>()`, and keeps the first
//! adapter produced. Resolution happens once, when the session is opened; translation
//! afterwards is a plain function call per event.
//!
//! ```text
//! open_session::<T>() ──► AdapterRegistry::resolve::<T>()
//!                              │
//!                              ├─► caller factory 1 ── create(TypeId) ── None
//!                              ├─► caller factory 2 ── create(TypeId) ── None
//!                              ├─► ProtocolEventAdapterFactory (identity)
//!                              └─► Protocol::builtin_adapters() (e.g. WebSocket)
//!                                        │
//!                                        ▼
//!                              AdapterRef<P, T>  (first match wins)
//! ```
//!
//! ## Rules
//! - Caller factories take precedence over built-ins.
//! - No factory recognises `T` ⇒ [`AdapterError::Unsupported`].
//! - A factory recognises `T` but builds an adapter for another type ⇒
//!   [`AdapterError::Mismatch`] (resolution stops there).

mod identity;
mod registry;

use std::any::Any;
use std::sync::Arc;

use crate::protocol::{Protocol, ProtocolEvent};

pub use identity::{ProtocolEventAdapter, ProtocolEventAdapterFactory};
pub use registry::AdapterRegistry;

/// Pure, stateless translation between a protocol's generic events and a typed event.
pub trait EventAdapter<P: Protocol>: Send + Sync + 'static {
    /// Caller-facing event type.
    type Target: Clone + Send + Sync + 'static;

    /// Translates one generic event.
    #[allow(clippy::wrong_self_convention)]
    fn from_event(&self, event: ProtocolEvent<P>) -> Self::Target;

    /// Reverse translation, for targets that carry enough data to rebuild the event.
    fn to_event(&self, _target: &Self::Target) -> Option<ProtocolEvent<P>> {
        None
    }
}

/// Shared adapter producing `T`.
pub type AdapterRef<P, T> = Arc<dyn EventAdapter<P, Target = T>>;

/// Adapter with its target type erased, as returned by factories.
pub struct ErasedAdapter(Box<dyn Any + Send + Sync>);

impl ErasedAdapter {
    /// Erases a concrete adapter.
    pub fn new<P, A>(adapter: A) -> Self
    where
        P: Protocol,
        A: EventAdapter<P>,
    {
        let shared: AdapterRef<P, A::Target> = Arc::new(adapter);
        Self(Box::new(shared))
    }

    /// Recovers the adapter if it produces `T`.
    pub(crate) fn downcast<P, T>(self) -> Option<AdapterRef<P, T>>
    where
        P: Protocol,
        T: Clone + Send + Sync + 'static,
    {
        self.0.downcast::<AdapterRef<P, T>>().ok().map(|boxed| *boxed)
    }
}

impl std::fmt::Debug for ErasedAdapter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ErasedAdapter").finish_non_exhaustive()
    }
}

/// Recognises target types and builds adapters for them.
///
/// `create` must return `None` for every type it does not serve.
pub trait EventAdapterFactory<P: Protocol>: Send + Sync + 'static {
    /// Factory name (for logs and [`AdapterError::Mismatch`](crate::AdapterError::Mismatch)).
    fn name(&self) -> &'static str {
        std::any::type_name::<Self>()
    }

    /// Builds an adapter for `target`, if this factory serves it.
    fn create(&self, target: std::any::TypeId) -> Option<ErasedAdapter>;
}
