//! # Coordinator: opens sessions, fans out diagnostics, shuts everything down.
//!
//! The [`Coordinator`] owns the protocol, the shared lifecycle source, the adapter
//! registry, the event bus and the [`SubscriberSet`]. Every session it opens runs as an
//! independent actor task with its own inbox and a child of the coordinator token.
//!
//! ## High-level architecture
//! ```text
//! open_session::<T>(request)
//!     ├─► AdapterRegistry::resolve::<T>()          (AdapterError → RuntimeError::Adapter)
//!     ├─► inbox (mpsc), state (watch), Control(child token)
//!     ├─► TimerEventSource(backoff, inbox)
//!     ├─► SessionActor::new(Session, ...)
//!     └─► Registry::register(topic, id, token, spawn)  (SessionExists if taken)
//!                    └──► tokio::spawn(actor.run())
//!
//! Event flow:
//!   SessionActor ── publish(Event) ──► Bus ──► observer listener ──► SubscriberSet::emit
//!                                         └──► Registry listener (SessionDestroyed → cleanup)
//!
//! Shutdown path:
//!   shutdown()
//!     └─► Bus.publish(ShutdownRequested)
//!     └─► token.cancel()        → every session token
//!     └─► wait up to cfg.grace:
//!            ├─ all joined      → Bus.publish(AllStoppedWithin)
//!            └─ deadline passed → Bus.publish(GraceExceeded), abort stuck actors
//! ```
//!
//! ## Example
//! ```rust,no_run
//! # #[cfg(feature = "tungstenite")]
//! # async fn demo() -> Result<(), tether::RuntimeError> {
//! use tether::{Coordinator, TungsteniteProtocol, WebSocketEvent, WebSocketRequest, Handshake};
//!
//! let coordinator = Coordinator::builder(TungsteniteProtocol).build();
//! let session = coordinator
//!     .open_session::<WebSocketEvent<Handshake>>(WebSocketRequest::new("wss://example.com/feed"))
//!     .await?;
//!
//! let mut events = session.subscribe().await?;
//! while let Some(event) = events.recv().await {
//!     println!("{event:?}");
//! }
//! coordinator.shutdown().await
//! # }
//! ```

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use tokio::sync::broadcast::error::RecvError;
use tokio::sync::{broadcast, mpsc, watch};
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::adapters::AdapterRegistry;
use crate::core::actor::{SessionActor, SessionParams};
use crate::core::builder::CoordinatorBuilder;
use crate::core::config::Config;
use crate::core::handle::SessionHandle;
use crate::core::registry::Registry;
use crate::core::session::{Control, Inbound, Session};
use crate::error::RuntimeError;
use crate::events::{Bus, Event, EventKind};
use crate::machine::ConnectionState;
use crate::policies::BackoffStrategy;
use crate::protocol::Protocol;
use crate::sources::{LifecycleEventSource, TimerEventSource};
use crate::subscribers::SubscriberSet;
use crate::topic::Topic;

/// Runtime driver of every session opened over one protocol.
pub struct Coordinator<P: Protocol> {
    protocol: Arc<P>,
    lifecycle: LifecycleEventSource,
    cfg: Config,
    backoff: Arc<dyn BackoffStrategy>,
    adapters: AdapterRegistry<P>,
    bus: Bus,
    subs: Arc<SubscriberSet>,
    registry: Arc<Registry>,
    token: CancellationToken,
    next_id: AtomicU64,
    shutting_down: AtomicBool,
}

impl<P: Protocol> Coordinator<P> {
    /// Starts building a coordinator for `protocol`.
    pub fn builder(protocol: P) -> CoordinatorBuilder<P> {
        CoordinatorBuilder::new(protocol)
    }

    #[allow(clippy::too_many_arguments)]
    pub(crate) fn new_internal(
        protocol: Arc<P>,
        lifecycle: LifecycleEventSource,
        cfg: Config,
        backoff: Arc<dyn BackoffStrategy>,
        adapters: AdapterRegistry<P>,
        bus: Bus,
        subs: Arc<SubscriberSet>,
        registry: Arc<Registry>,
        token: CancellationToken,
    ) -> Self {
        Self {
            protocol,
            lifecycle,
            cfg,
            backoff,
            adapters,
            bus,
            subs,
            registry,
            token,
            next_id: AtomicU64::new(1),
            shutting_down: AtomicBool::new(false),
        }
    }

    /// Subscribes to the bus and forwards events to the subscriber set (fire-and-forget).
    pub(crate) fn subscriber_listener(&self) {
        if self.subs.is_empty() {
            return;
        }
        let mut rx = self.bus.subscribe();
        let set = Arc::clone(&self.subs);
        tokio::spawn(async move {
            loop {
                match rx.recv().await {
                    Ok(ev) => set.emit(Arc::new(ev)),
                    Err(RecvError::Lagged(n)) => warn!(skipped = n, "subscriber listener lagged"),
                    Err(RecvError::Closed) => break,
                }
            }
        });
    }

    /// Opens a session on [`Topic::main`] delivering events of type `T`.
    pub async fn open_session<T>(
        &self,
        request: P::OpenRequest,
    ) -> Result<SessionHandle<P, T>, RuntimeError>
    where
        T: Clone + Send + Sync + 'static,
    {
        self.open_session_on(Topic::main(), request).await
    }

    /// Opens a session on `topic` delivering events of type `T`.
    ///
    /// The adapter for `T` is resolved once, here. The session starts `Disconnected` and
    /// follows the coordinator's lifecycle source from then on.
    pub async fn open_session_on<T>(
        &self,
        topic: impl Into<Topic>,
        request: P::OpenRequest,
    ) -> Result<SessionHandle<P, T>, RuntimeError>
    where
        T: Clone + Send + Sync + 'static,
    {
        if self.shutting_down.load(Ordering::Acquire) {
            return Err(RuntimeError::ShuttingDown);
        }
        let topic = topic.into();
        let adapter = self.adapters.resolve::<T>()?;
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);

        let (inbox_tx, inbox) = mpsc::channel(self.cfg.inbox_capacity_clamped());
        let (state_tx, state_rx) = watch::channel(ConnectionState::Disconnected);
        let session_token = self.token.child_token();
        let control = Arc::new(Control::new(session_token.clone()));
        let timer = TimerEventSource::new(
            Arc::clone(&self.backoff),
            inbox_tx.clone(),
            Inbound::TimerFired,
        );

        let session = Session::new(
            id,
            topic.clone(),
            Arc::clone(&self.protocol),
            request,
            adapter,
            self.bus.clone(),
        );
        let actor = SessionActor::new(
            session,
            SessionParams {
                send_policy: self.cfg.send_policy,
                subscriber_capacity: self.cfg.subscriber_capacity_clamped(),
            },
            self.lifecycle.clone(),
            timer,
            inbox,
            inbox_tx.clone(),
            state_tx,
            Arc::clone(&control),
            self.bus.clone(),
        );
        let handle = SessionHandle::new(id, topic.clone(), inbox_tx, state_rx, control);

        self.registry
            .register(topic.clone(), id, session_token, move || {
                tokio::spawn(actor.run())
            })
            .await?;
        debug!(%topic, session = id, protocol = self.protocol.name(), "session opened");
        Ok(handle)
    }

    /// Destroys the session on `topic` and waits for its teardown.
    ///
    /// Returns false if no session was registered there.
    pub async fn destroy(&self, topic: &Topic) -> bool {
        self.registry.remove(topic).await
    }

    /// Sorted list of topics with a registered session.
    pub async fn topics(&self) -> Vec<Topic> {
        self.registry.list().await
    }

    /// Receiver of every observability event published from now on.
    pub fn events(&self) -> broadcast::Receiver<Event> {
        self.bus.subscribe()
    }

    /// Lifecycle source shared by every session.
    pub fn lifecycle(&self) -> &LifecycleEventSource {
        &self.lifecycle
    }

    /// The transport.
    pub fn protocol(&self) -> &Arc<P> {
        &self.protocol
    }

    /// Effective configuration.
    pub fn config(&self) -> &Config {
        &self.cfg
    }

    /// Destroys every session and waits up to [`Config::grace`] for their teardown.
    ///
    /// New sessions are refused from the first call on. Publishes
    /// [`EventKind::AllStoppedWithin`] on success, or [`EventKind::GraceExceeded`] and
    /// returns [`RuntimeError::GraceExceeded`] with the stuck topics.
    pub async fn shutdown(&self) -> Result<(), RuntimeError> {
        self.shutting_down.store(true, Ordering::Release);
        self.bus.publish(Event::new(EventKind::ShutdownRequested));
        self.token.cancel();

        let grace = self.cfg.grace;
        let deadline = tokio::time::Instant::now() + grace;
        let mut stuck = Vec::new();

        for (topic, handle) in self.registry.drain().await {
            let mut join = handle.join;
            match tokio::time::timeout_at(deadline, &mut join).await {
                Ok(Ok(())) => {}
                Ok(Err(e)) => {
                    if e.is_panic() {
                        warn!(%topic, "session actor panicked");
                    }
                }
                Err(_) => {
                    join.abort();
                    stuck.push(topic);
                }
            }
        }

        if stuck.is_empty() {
            self.bus.publish(Event::new(EventKind::AllStoppedWithin));
            return Ok(());
        }
        stuck.sort_unstable();
        warn!(?grace, stuck = stuck.len(), "shutdown grace exceeded");
        self.bus.publish(
            Event::new(EventKind::GraceExceeded).with_reason(format!("stuck={}", stuck.len())),
        );
        Err(RuntimeError::GraceExceeded { grace, stuck })
    }
}

impl<P: Protocol> std::fmt::Debug for Coordinator<P> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Coordinator")
            .field("protocol", &self.protocol.name())
            .field("adapters", &self.adapters.len())
            .field("observers", &self.subs.len())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use tokio::sync::mpsc::UnboundedReceiver;
    use tokio::time::Instant;

    use super::*;
    use crate::core::config::SendPolicy;
    use crate::error::{AdapterError, ProtocolError, SendError};
    use crate::machine::LifecycleState;
    use crate::policies::BackoffPolicy;
    use crate::protocol::scripted::{Remote, ScriptedProtocol};
    use crate::protocol::{Message, ProtocolEvent};
    use crate::sources::LifecycleController;
    use crate::websocket::{ShutdownReason, WebSocketEvent};

    type Ws = WebSocketEvent<String>;

    struct Harness {
        coordinator: Coordinator<ScriptedProtocol>,
        lifecycle: LifecycleController,
        opened: UnboundedReceiver<Arc<Remote>>,
    }

    fn harness(cfg: Config) -> Harness {
        let (protocol, opened) = ScriptedProtocol::new();
        let (lifecycle, source) = LifecycleEventSource::manual(LifecycleState::Stopped);
        let coordinator = Coordinator::builder(protocol)
            .with_config(cfg)
            .with_lifecycle(source)
            .with_backoff_strategy(BackoffPolicy::constant(Duration::from_secs(2)))
            .build();
        Harness {
            coordinator,
            lifecycle,
            opened,
        }
    }

    async fn next_of(rx: &mut broadcast::Receiver<Event>, kind: EventKind) -> Event {
        loop {
            let ev = rx.recv().await.unwrap();
            if ev.kind == kind {
                return ev;
            }
        }
    }

    async fn connected(h: &mut Harness) -> (SessionHandle<ScriptedProtocol, Ws>, Arc<Remote>) {
        let session = h
            .coordinator
            .open_session::<Ws>("wss://a".to_string())
            .await
            .unwrap();
        h.lifecycle.start();
        let remote = h.opened.recv().await.unwrap();
        remote.open("hello");
        session.wait_for(|s| s == ConnectionState::Connected).await;
        (session, remote)
    }

    #[tokio::test(start_paused = true)]
    async fn connects_delivers_and_disconnects() {
        let mut h = harness(Config::default());
        let session = h
            .coordinator
            .open_session::<Ws>("wss://a".to_string())
            .await
            .unwrap();
        let mut sub = session.subscribe().await.unwrap();
        assert_eq!(sub.state(), ConnectionState::Disconnected);

        h.lifecycle.start();
        let remote = h.opened.recv().await.unwrap();
        assert_eq!(remote.request, "wss://a");

        remote.open("101");
        assert_eq!(sub.recv().await, Some(Ws::ConnectionOpened("101".into())));
        assert_eq!(session.state(), ConnectionState::Connected);

        remote.message("hi");
        assert_eq!(sub.recv().await, Some(Ws::MessageReceived(Message::from("hi"))));

        session.send("out").await.unwrap();
        assert_eq!(remote.sent(), vec![Message::from("out")]);

        h.lifecycle.stop();
        assert_eq!(
            sub.recv().await,
            Some(Ws::ConnectionClosed(ShutdownReason::GRACEFUL))
        );
        session.wait_for(|s| s == ConnectionState::Disconnected).await;
        assert_eq!(remote.closes(), vec![ShutdownReason::GRACEFUL]);
        assert!(h.opened.try_recv().is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn failure_retries_after_backoff_and_success_resets_attempts() {
        let mut h = harness(Config::default());
        let mut events = h.coordinator.events();
        let session = h
            .coordinator
            .open_session::<Ws>("wss://a".to_string())
            .await
            .unwrap();
        let mut sub = session.subscribe().await.unwrap();

        h.lifecycle.start();
        let first = h.opened.recv().await.unwrap();
        first.fail("refused");
        assert_eq!(
            sub.recv().await,
            Some(Ws::ConnectionFailed(ProtocolError::connect("refused")))
        );
        let scheduled = next_of(&mut events, EventKind::RetryScheduled).await;
        assert_eq!(scheduled.attempt, Some(1));
        assert_eq!(scheduled.delay(), Some(Duration::from_secs(2)));
        assert_eq!(session.state(), ConnectionState::WaitingToRetry);

        let started = Instant::now();
        let second = h.opened.recv().await.unwrap();
        assert!(started.elapsed() >= Duration::from_secs(2));

        second.open("ok");
        session.wait_for(|s| s == ConnectionState::Connected).await;

        second.fail("reset");
        let scheduled = next_of(&mut events, EventKind::RetryScheduled).await;
        assert_eq!(scheduled.attempt, Some(1));
    }

    #[tokio::test(start_paused = true)]
    async fn consecutive_failures_raise_the_attempt() {
        let mut h = harness(Config::default());
        let mut events = h.coordinator.events();
        let _session = h
            .coordinator
            .open_session::<Ws>("wss://a".to_string())
            .await
            .unwrap();

        h.lifecycle.start();
        for expected in 1..=3 {
            let remote = h.opened.recv().await.unwrap();
            remote.fail("refused");
            let scheduled = next_of(&mut events, EventKind::RetryScheduled).await;
            assert_eq!(scheduled.attempt, Some(expected));
        }
    }

    #[tokio::test(start_paused = true)]
    async fn stop_while_connecting_closes_without_retry() {
        let mut h = harness(Config::default());
        let session = h
            .coordinator
            .open_session::<Ws>("wss://a".to_string())
            .await
            .unwrap();

        h.lifecycle.start();
        let remote = h.opened.recv().await.unwrap();
        assert_eq!(session.state(), ConnectionState::Connecting);

        h.lifecycle.stop();
        session.wait_for(|s| s == ConnectionState::Disconnected).await;
        assert_eq!(remote.closes(), vec![ShutdownReason::GRACEFUL]);

        tokio::time::sleep(Duration::from_secs(60)).await;
        assert!(h.opened.try_recv().is_err());
        assert_eq!(session.state(), ConnectionState::Disconnected);
    }

    #[tokio::test(start_paused = true)]
    async fn stop_while_waiting_cancels_the_timer() {
        let mut h = harness(Config::default());
        let mut events = h.coordinator.events();
        let session = h
            .coordinator
            .open_session::<Ws>("wss://a".to_string())
            .await
            .unwrap();

        h.lifecycle.start();
        h.opened.recv().await.unwrap().fail("refused");
        session.wait_for(|s| s == ConnectionState::WaitingToRetry).await;

        h.lifecycle.stop();
        next_of(&mut events, EventKind::RetryCancelled).await;
        session.wait_for(|s| s == ConnectionState::Disconnected).await;

        tokio::time::sleep(Duration::from_secs(60)).await;
        assert!(h.opened.try_recv().is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn start_during_disconnecting_reconnects_once_closed() {
        let mut h = harness(Config::default());
        let (session, remote) = connected(&mut h).await;
        remote.set_auto_close(false);

        h.lifecycle.stop();
        session.wait_for(|s| s == ConnectionState::Disconnecting).await;
        h.lifecycle.start();

        tokio::task::yield_now().await;
        assert_eq!(session.state(), ConnectionState::Disconnecting);

        remote.closed(ShutdownReason::GRACEFUL);
        let again = h.opened.recv().await.unwrap();
        assert_eq!(again.request, "wss://a");
        assert_eq!(session.state(), ConnectionState::Connecting);
    }

    #[tokio::test(start_paused = true)]
    async fn peer_close_while_started_enters_retry() {
        let mut h = harness(Config::default());
        let (session, remote) = connected(&mut h).await;

        remote.closing(ShutdownReason::new(1001, "going away"));
        remote.closed(ShutdownReason::new(1001, "going away"));
        session.wait_for(|s| s == ConnectionState::WaitingToRetry).await;

        let again = h.opened.recv().await.unwrap();
        again.open("back");
        session.wait_for(|s| s == ConnectionState::Connected).await;
    }

    #[tokio::test(start_paused = true)]
    async fn destroy_closes_once_and_ends_subscriptions() {
        let mut h = harness(Config::default());
        let (session, remote) = connected(&mut h).await;
        let mut sub = session.subscribe().await.unwrap();
        assert_eq!(sub.recv().await, Some(Ws::ConnectionOpened("hello".into())));

        session.destroy_with(ShutdownReason::new(4000, "bye")).await;
        session.destroy().await;

        assert_eq!(remote.closes(), vec![ShutdownReason::new(4000, "bye")]);
        assert_eq!(sub.recv().await, None);
        assert!(session.is_destroyed());
        assert_eq!(session.send("late").await, Err(SendError::Destroyed));
        assert!(matches!(
            session.subscribe().await,
            Err(RuntimeError::SessionDestroyed { .. })
        ));

        h.lifecycle.stop();
        h.lifecycle.start();
        tokio::time::sleep(Duration::from_secs(10)).await;
        assert!(h.opened.try_recv().is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn destroy_while_waiting_does_not_reconnect() {
        let mut h = harness(Config::default());
        let session = h
            .coordinator
            .open_session::<Ws>("wss://a".to_string())
            .await
            .unwrap();

        h.lifecycle.start();
        let remote = h.opened.recv().await.unwrap();
        remote.fail("refused");
        session.wait_for(|s| s == ConnectionState::WaitingToRetry).await;

        assert!(h.coordinator.destroy(&Topic::main()).await);
        assert!(session.is_destroyed());
        assert!(remote.closes().is_empty());

        tokio::time::sleep(Duration::from_secs(60)).await;
        assert!(h.opened.try_recv().is_err());
        assert!(h.coordinator.topics().await.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn late_subscriber_gets_the_opened_event_first() {
        let mut h = harness(Config::default());
        let (session, remote) = connected(&mut h).await;

        let mut late = session.subscribe().await.unwrap();
        assert_eq!(late.state(), ConnectionState::Connected);
        assert_eq!(late.recv().await, Some(Ws::ConnectionOpened("hello".into())));

        remote.message("next");
        assert_eq!(late.recv().await, Some(Ws::MessageReceived(Message::from("next"))));
    }

    #[tokio::test(start_paused = true)]
    async fn unsubscribed_receiver_gets_nothing_more() {
        let mut h = harness(Config::default());
        let (session, remote) = connected(&mut h).await;

        let mut kept = session.subscribe().await.unwrap();
        let dropped = session.subscribe().await.unwrap();
        dropped.unsubscribe();

        remote.message("one");
        assert_eq!(kept.recv().await, Some(Ws::ConnectionOpened("hello".into())));
        assert_eq!(kept.recv().await, Some(Ws::MessageReceived(Message::from("one"))));
    }

    #[tokio::test(start_paused = true)]
    async fn stale_generation_events_are_dropped() {
        let mut h = harness(Config::default());
        let (session, _remote) = connected(&mut h).await;
        let mut sub = session.subscribe().await.unwrap();
        assert_eq!(sub.recv().await, Some(Ws::ConnectionOpened("hello".into())));

        session
            .inbox()
            .send(Inbound::Protocol {
                generation: 0,
                event: ProtocolEvent::Failed(ProtocolError::connect("old attempt")),
            })
            .await
            .unwrap();

        tokio::time::sleep(Duration::from_millis(10)).await;
        assert_eq!(session.state(), ConnectionState::Connected);
        assert!(sub.try_recv().is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn synchronous_open_error_takes_the_retry_path() {
        let (protocol, mut opened) = ScriptedProtocol::new();
        protocol.refuse_next_opens(1);
        let (lifecycle, source) = LifecycleEventSource::manual(LifecycleState::Stopped);
        let coordinator = Coordinator::builder(protocol)
            .with_lifecycle(source)
            .with_backoff_strategy(BackoffPolicy::constant(Duration::from_secs(1)))
            .build();
        let session = coordinator
            .open_session::<Ws>("wss://a".to_string())
            .await
            .unwrap();
        let mut sub = session.subscribe().await.unwrap();

        lifecycle.start();
        assert!(matches!(
            sub.recv().await,
            Some(Ws::ConnectionFailed(ProtocolError::Unavailable { .. }))
        ));
        assert_eq!(session.state(), ConnectionState::WaitingToRetry);

        let remote = opened.recv().await.unwrap();
        remote.open("ok");
        session.wait_for(|s| s == ConnectionState::Connected).await;
    }

    #[tokio::test(start_paused = true)]
    async fn vanished_stream_is_reported_as_failure() {
        let mut h = harness(Config::default());
        let (session, remote) = connected(&mut h).await;
        let mut sub = session.subscribe().await.unwrap();
        assert_eq!(sub.recv().await, Some(Ws::ConnectionOpened("hello".into())));

        remote.vanish();
        assert_eq!(
            sub.recv().await,
            Some(Ws::ConnectionFailed(ProtocolError::StreamEnded))
        );
        session.wait_for(|s| s == ConnectionState::WaitingToRetry).await;
    }

    #[tokio::test(start_paused = true)]
    async fn close_before_open_takes_the_retry_path() {
        let mut h = harness(Config::default());
        let mut events = h.coordinator.events();
        let session = h
            .coordinator
            .open_session::<Ws>("wss://a".to_string())
            .await
            .unwrap();
        let mut sub = session.subscribe().await.unwrap();

        h.lifecycle.start();
        let first = h.opened.recv().await.unwrap();
        first.closed(ShutdownReason::new(1008, "policy violation"));
        assert_eq!(
            sub.recv().await,
            Some(Ws::ConnectionFailed(ProtocolError::ClosedBeforeOpen))
        );
        let scheduled = next_of(&mut events, EventKind::RetryScheduled).await;
        assert_eq!(scheduled.attempt, Some(1));
        session.wait_for(|s| s == ConnectionState::WaitingToRetry).await;

        let second = h.opened.recv().await.unwrap();
        second.open("ok");
        session.wait_for(|s| s == ConnectionState::Connected).await;

        h.lifecycle.stop();
        session.wait_for(|s| s == ConnectionState::Disconnected).await;
        assert!(first.closes().is_empty());
        assert_eq!(second.closes(), vec![ShutdownReason::GRACEFUL]);
    }

    #[tokio::test(start_paused = true)]
    async fn reject_policy_refuses_sends_while_disconnected() {
        let h = harness(Config::default());
        let mut events = h.coordinator.events();
        let session = h
            .coordinator
            .open_session::<Ws>("wss://a".to_string())
            .await
            .unwrap();

        assert_eq!(
            session.send("early").await,
            Err(SendError::NotConnected {
                state: ConnectionState::Disconnected
            })
        );
        next_of(&mut events, EventKind::SendRejected).await;
    }

    #[tokio::test(start_paused = true)]
    async fn queue_policy_flushes_on_open() {
        let mut h = harness(Config {
            send_policy: SendPolicy::QueueUntilConnected { capacity: 1 },
            ..Config::default()
        });
        let session = h
            .coordinator
            .open_session::<Ws>("wss://a".to_string())
            .await
            .unwrap();

        session.send("first").await.unwrap();
        assert_eq!(
            session.send("second").await,
            Err(SendError::QueueFull { capacity: 1 })
        );

        h.lifecycle.start();
        let remote = h.opened.recv().await.unwrap();
        assert!(remote.sent().is_empty());
        remote.open("ok");
        session.wait_for(|s| s == ConnectionState::Connected).await;
        assert_eq!(remote.sent(), vec![Message::from("first")]);
    }

    #[tokio::test(start_paused = true)]
    async fn one_live_session_per_topic() {
        let h = harness(Config::default());
        let _first = h
            .coordinator
            .open_session::<Ws>("wss://a".to_string())
            .await
            .unwrap();
        let second = h
            .coordinator
            .open_session::<Ws>("wss://b".to_string())
            .await;
        assert!(matches!(second, Err(RuntimeError::SessionExists { .. })));

        let other = h
            .coordinator
            .open_session_on::<Ws>("other", "wss://b".to_string())
            .await
            .unwrap();
        assert_eq!(other.topic().as_str(), "other");
        assert_eq!(
            h.coordinator.topics().await,
            vec![Topic::main(), Topic::new("other")]
        );

        assert!(h.coordinator.destroy(&Topic::main()).await);
        assert!(!h.coordinator.destroy(&Topic::main()).await);
        h.coordinator
            .open_session::<Ws>("wss://c".to_string())
            .await
            .unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn adapters_are_resolved_when_opening() {
        let h = harness(Config::default());
        let unsupported = h.coordinator.open_session::<u32>("wss://a".to_string()).await;
        assert!(matches!(
            unsupported,
            Err(RuntimeError::Adapter(AdapterError::Unsupported { .. }))
        ));

        let raw = h
            .coordinator
            .open_session_on::<ProtocolEvent<ScriptedProtocol>>("raw", "wss://a".to_string())
            .await;
        assert!(raw.is_ok());
    }

    #[tokio::test(start_paused = true)]
    async fn shutdown_stops_every_session_and_refuses_new_ones() {
        let (protocol, mut opened) = ScriptedProtocol::new();
        let coordinator = Coordinator::builder(protocol).build();
        let mut events = coordinator.events();

        let a = coordinator
            .open_session_on::<Ws>("a", "wss://a".to_string())
            .await
            .unwrap();
        let b = coordinator
            .open_session_on::<Ws>("b", "wss://b".to_string())
            .await
            .unwrap();
        let ra = opened.recv().await.unwrap();
        let rb = opened.recv().await.unwrap();
        ra.open("a");
        rb.open("b");
        a.wait_for(|s| s == ConnectionState::Connected).await;
        b.wait_for(|s| s == ConnectionState::Connected).await;

        coordinator.shutdown().await.unwrap();
        assert!(a.is_destroyed());
        assert!(b.is_destroyed());
        assert_eq!(ra.closes().len(), 1);
        assert_eq!(rb.closes().len(), 1);
        next_of(&mut events, EventKind::AllStoppedWithin).await;

        let refused = coordinator
            .open_session_on::<Ws>("c", "wss://c".to_string())
            .await;
        assert!(matches!(refused, Err(RuntimeError::ShuttingDown)));
    }
}
