//! Identity adapter: subscribers receive [`ProtocolEvent`]s unchanged.

use std::any::TypeId;
use std::marker::PhantomData;

use crate::adapters::{ErasedAdapter, EventAdapter, EventAdapterFactory};
use crate::protocol::{Protocol, ProtocolEvent};

/// Passes events through untouched.
pub struct ProtocolEventAdapter<P>(PhantomData<fn() -> P>);

impl<P> ProtocolEventAdapter<P> {
    /// Creates the adapter.
    pub fn new() -> Self {
        Self(PhantomData)
    }
}

impl<P> Default for ProtocolEventAdapter<P> {
    fn default() -> Self {
        Self::new()
    }
}

impl<P: Protocol> EventAdapter<P> for ProtocolEventAdapter<P> {
    type Target = ProtocolEvent<P>;

    fn from_event(&self, event: ProtocolEvent<P>) -> ProtocolEvent<P> {
        event
    }

    fn to_event(&self, target: &ProtocolEvent<P>) -> Option<ProtocolEvent<P>> {
        Some(target.clone())
    }
}

/// Serves `ProtocolEvent<P>` for any protocol.
pub struct ProtocolEventAdapterFactory<P>(PhantomData<fn() -> P>);

impl<P> ProtocolEventAdapterFactory<P> {
    /// Creates the factory.
    pub fn new() -> Self {
        Self(PhantomData)
    }
}

impl<P> Default for ProtocolEventAdapterFactory<P> {
    fn default() -> Self {
        Self::new()
    }
}

impl<P: Protocol> EventAdapterFactory<P> for ProtocolEventAdapterFactory<P> {
    fn name(&self) -> &'static str {
        "protocol_event"
    }

    fn create(&self, target: TypeId) -> Option<ErasedAdapter> {
        (target == TypeId::of::<ProtocolEvent<P>>())
            .then(|| ErasedAdapter::new::<P, _>(ProtocolEventAdapter::<P>::new()))
    }
}
