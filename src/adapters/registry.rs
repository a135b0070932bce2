//! Ordered adapter factory list.

use std::any::{TypeId, type_name};
use std::sync::Arc;

use tracing::debug;

use crate::adapters::{AdapterRef, EventAdapterFactory, ProtocolEventAdapterFactory};
use crate::error::AdapterError;
use crate::protocol::Protocol;

/// Factories consulted in order when a session is opened; first match wins.
pub struct AdapterRegistry<P: Protocol> {
    factories: Vec<Arc<dyn EventAdapterFactory<P>>>,
}

impl<P: Protocol> AdapterRegistry<P> {
    /// Empty registry (no built-ins).
    pub fn empty() -> Self {
        Self {
            factories: Vec::new(),
        }
    }

    /// Caller factories first, then the identity adapter, then the protocol's own built-ins.
    pub fn new(protocol: &P, caller: Vec<Arc<dyn EventAdapterFactory<P>>>) -> Self {
        let mut registry = Self { factories: caller };
        registry.push(Arc::new(ProtocolEventAdapterFactory::<P>::new()));
        for factory in protocol.builtin_adapters() {
            registry.push(factory);
        }
        registry
    }

    /// Appends a factory (lowest precedence so far).
    pub fn push(&mut self, factory: Arc<dyn EventAdapterFactory<P>>) {
        self.factories.push(factory);
    }

    /// Number of registered factories.
    pub fn len(&self) -> usize {
        self.factories.len()
    }

    /// True if no factory is registered.
    pub fn is_empty(&self) -> bool {
        self.factories.is_empty()
    }

    /// Finds an adapter producing `T`.
    pub fn resolve<T>(&self) -> Result<AdapterRef<P, T>, AdapterError>
    where
        T: Clone + Send + Sync + 'static,
    {
        let target = TypeId::of::<T>();
        for factory in &self.factories {
            let Some(erased) = factory.create(target) else {
                continue;
            };
            return match erased.downcast::<P, T>() {
                Some(adapter) => {
                    debug!(factory = factory.name(), target = type_name::<T>(), "adapter resolved");
                    Ok(adapter)
                }
                None => Err(AdapterError::Mismatch {
                    factory: factory.name(),
                    target: type_name::<T>(),
                }),
            };
        }
        Err(AdapterError::Unsupported {
            target: type_name::<T>(),
        })
    }
}
