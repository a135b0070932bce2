use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use super::{config::Config, coordinator::Coordinator, registry::Registry};
use crate::{
    adapters::{AdapterRegistry, EventAdapterFactory},
    events::Bus,
    policies::BackoffStrategy,
    protocol::Protocol,
    sources::LifecycleEventSource,
    subscribers::{Subscribe, SubscriberSet},
};

/// Builder for constructing a [`Coordinator`] with optional features.
pub struct CoordinatorBuilder<P: Protocol> {
    protocol: P,
    cfg: Config,
    lifecycle: Option<LifecycleEventSource>,
    backoff: Option<Arc<dyn BackoffStrategy>>,
    subscribers: Vec<Arc<dyn Subscribe>>,
    factories: Vec<Arc<dyn EventAdapterFactory<P>>>,
}

impl<P: Protocol> CoordinatorBuilder<P> {
    /// Creates a new builder with the default configuration.
    pub fn new(protocol: P) -> Self {
        Self {
            protocol,
            cfg: Config::default(),
            lifecycle: None,
            backoff: None,
            subscribers: Vec::new(),
            factories: Vec::new(),
        }
    }

    /// Replaces the configuration.
    pub fn with_config(mut self, cfg: Config) -> Self {
        self.cfg = cfg;
        self
    }

    /// Sets the lifecycle source shared by every session.
    ///
    /// Default: [`LifecycleEventSource::always_on`].
    pub fn with_lifecycle(mut self, lifecycle: LifecycleEventSource) -> Self {
        self.lifecycle = Some(lifecycle);
        self
    }

    /// Replaces [`Config::backoff`] with any strategy.
    pub fn with_backoff_strategy(mut self, strategy: impl BackoffStrategy) -> Self {
        self.backoff = Some(Arc::new(strategy));
        self
    }

    /// Sets observers of coordinator events.
    ///
    /// Observers receive diagnostics (state changes, retries, overflow, shutdown)
    /// through dedicated workers with bounded queues.
    pub fn with_subscribers(mut self, subscribers: Vec<Arc<dyn Subscribe>>) -> Self {
        self.subscribers = subscribers;
        self
    }

    /// Registers an adapter factory.
    ///
    /// Caller factories are consulted in registration order, before the built-ins.
    pub fn with_adapter_factory(mut self, factory: impl EventAdapterFactory<P>) -> Self {
        self.factories.push(Arc::new(factory));
        self
    }

    /// Builds and returns the Coordinator instance.
    ///
    /// This consumes the builder and initializes all runtime components:
    /// - Event bus for broadcasting
    /// - Registry of live sessions and its cleanup listener
    /// - Observer workers
    ///
    /// Must be called from within a tokio runtime.
    pub fn build(self) -> Coordinator<P> {
        let bus = Bus::new(self.cfg.bus_capacity_clamped());
        let subs = Arc::new(SubscriberSet::new(self.subscribers, bus.clone()));
        let runtime_token = CancellationToken::new();

        let registry = Registry::new(bus.clone(), runtime_token.clone());
        Arc::clone(&registry).spawn_listener();

        let adapters = AdapterRegistry::new(&self.protocol, self.factories);
        let backoff: Arc<dyn BackoffStrategy> = match self.backoff {
            Some(strategy) => strategy,
            None => Arc::new(self.cfg.backoff),
        };
        let lifecycle = self
            .lifecycle
            .unwrap_or_else(LifecycleEventSource::always_on);

        let coordinator = Coordinator::new_internal(
            Arc::new(self.protocol),
            lifecycle,
            self.cfg,
            backoff,
            adapters,
            bus,
            subs,
            registry,
            runtime_token,
        );
        coordinator.subscriber_listener();
        coordinator
    }
}
