//! # SessionActor: the serialized driver of one session.
//!
//! Feeds every input to the [`StateMachine`] one at a time and executes the commands it
//! returns. No command blocks: opening, closing and sending are non-blocking handle calls
//! whose completions come back through the inbox.
//!
//! ## Architecture
//! ```text
//!   LifecycleEventSource ──forwarder──┐
//!   TimerEventSource     ──sleep──────┤
//!   Connection events    ──forwarder──┼──► inbox (bounded mpsc) ──► SessionActor::run()
//!   SessionHandle        ──requests───┘                                  │
//!                                                                        ▼
//!                                              StateMachine::apply(input) → commands
//!                                                                        │
//!             ┌──────────────┬──────────────────┬────────────────┬───────┴────────┐
//!             ▼              ▼                  ▼                ▼                ▼
//!      OpenConnection  CloseConnection   StartRetryTimer  CancelRetryTimer   PublishEvent
//!      protocol.open   handle.close      timer.start      timer.cancel       adapter → subs
//! ```
//!
//! ## Rules
//! - The session token is polled before the inbox (`biased`), so destroy preempts queued input.
//! - Each `OpenConnection` bumps the generation; events tagged with an older one are dropped.
//! - A synchronous `open` error is handled as a `Failed` event of the same attempt.
//! - A stream that ends without `Closed`/`Failed` yields `Failed(StreamEnded)`.
//! - `Closed` before `Opened` ends the attempt: it is followed by `Failed(ClosedBeforeOpen)`.
//! - After a transition that rests in `Disconnected` while the desire is `Started`, the actor
//!   feeds `Lifecycle(Started)` again.

use std::collections::VecDeque;
use std::sync::Arc;

use futures::StreamExt;
use futures::stream::BoxStream;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tracing::{debug, trace, warn};

use crate::core::config::SendPolicy;
use crate::core::session::{Control, Inbound, Session};
use crate::error::{ProtocolError, SendError};
use crate::events::{Bus, Event, EventKind};
use crate::machine::{
    Command, ConnectionState, Input, LifecycleState, Outcome, StateMachine, Transition,
};
use crate::protocol::{Message, Protocol, ProtocolEvent, ProtocolSignal};
use crate::sources::{LifecycleEventSource, TimerEventSource};

/// Per-session knobs copied from [`Config`](crate::Config).
#[derive(Clone, Copy, Debug)]
pub(crate) struct SessionParams {
    pub(crate) send_policy: SendPolicy,
    pub(crate) subscriber_capacity: usize,
}

type Pending<P> = VecDeque<(Input, Option<ProtocolEvent<P>>)>;

/// Drives one session until it is destroyed.
pub(crate) struct SessionActor<P: Protocol, T> {
    session: Session<P, T>,
    machine: StateMachine,
    params: SessionParams,
    lifecycle: LifecycleEventSource,
    timer: TimerEventSource<Inbound<P, T>>,
    inbox: mpsc::Receiver<Inbound<P, T>>,
    inbox_tx: mpsc::Sender<Inbound<P, T>>,
    state_tx: watch::Sender<ConnectionState>,
    control: Arc<Control<P>>,
    bus: Bus,
    generation: u64,
    forwarder: Option<JoinHandle<()>>,
    close_override: Option<P::CloseRequest>,
    queued: VecDeque<Message>,
}

impl<P, T> SessionActor<P, T>
where
    P: Protocol,
    T: Clone + Send + Sync + 'static,
{
    #[allow(clippy::too_many_arguments)]
    pub(crate) fn new(
        session: Session<P, T>,
        params: SessionParams,
        lifecycle: LifecycleEventSource,
        timer: TimerEventSource<Inbound<P, T>>,
        inbox: mpsc::Receiver<Inbound<P, T>>,
        inbox_tx: mpsc::Sender<Inbound<P, T>>,
        state_tx: watch::Sender<ConnectionState>,
        control: Arc<Control<P>>,
        bus: Bus,
    ) -> Self {
        Self {
            session,
            machine: StateMachine::new(),
            params,
            lifecycle,
            timer,
            inbox,
            inbox_tx,
            state_tx,
            control,
            bus,
            generation: 0,
            forwarder: None,
            close_override: None,
            queued: VecDeque::new(),
        }
    }

    /// Runs until the session token is cancelled or every inbox sender is gone.
    pub(crate) async fn run(mut self) {
        let token = self.control.token.clone();
        let lifecycle = self
            .lifecycle
            .attach(self.inbox_tx.clone(), token.clone(), Inbound::Lifecycle);

        loop {
            tokio::select! {
                biased;

                _ = token.cancelled() => break,
                msg = self.inbox.recv() => match msg {
                    Some(msg) => self.handle(msg),
                    None => break,
                },
            }
        }

        self.close_override = self.control.take_close_request();
        self.feed(Input::Destroy, None);
        lifecycle.abort();
        self.teardown();
    }

    fn handle(&mut self, msg: Inbound<P, T>) {
        match msg {
            Inbound::Lifecycle(state) => self.feed(Input::Lifecycle(state), None),
            Inbound::Protocol { generation, event } => {
                if generation != self.generation {
                    trace!(
                        topic = %self.session.topic,
                        generation,
                        current = self.generation,
                        signal = event.signal().as_str(),
                        "stale connection event dropped"
                    );
                    return;
                }
                self.feed(Input::Protocol(event.signal()), Some(event));
            }
            Inbound::TimerFired(fired) => {
                if !self.timer.is_current(fired.generation) {
                    trace!(
                        topic = %self.session.topic,
                        attempt = fired.attempt,
                        "stale retry timer dropped"
                    );
                    return;
                }
                self.feed(
                    Input::RetryTimerFired {
                        attempt: fired.attempt,
                    },
                    None,
                );
            }
            Inbound::Attach { reply } => {
                let inbox = self.inbox_tx.clone();
                let detach = Box::new(move |id| {
                    let _ = inbox.try_send(Inbound::Detach { id });
                });
                let sub = self.session.attach(
                    self.params.subscriber_capacity,
                    self.machine.state(),
                    detach,
                );
                let _ = reply.send(sub);
            }
            Inbound::Detach { id } => self.session.detach(id),
            Inbound::Send { message, reply } => {
                let result = self.send(message);
                if let Err(e) = &result {
                    debug!(topic = %self.session.topic, error = e.as_label(), "send rejected");
                    self.publish(EventKind::SendRejected, |ev| ev.with_reason(e.as_message()));
                }
                let _ = reply.send(result);
            }
        }
    }

    /// Feeds one input plus any follow-up inputs it produces.
    fn feed(&mut self, input: Input, event: Option<ProtocolEvent<P>>) {
        let mut pending: Pending<P> = VecDeque::from([(input, event)]);
        while let Some((input, event)) = pending.pop_front() {
            self.step(input, event, &mut pending);
        }
    }

    fn step(
        &mut self,
        input: Input,
        mut event: Option<ProtocolEvent<P>>,
        pending: &mut Pending<P>,
    ) {
        let transition = match self.machine.apply(input) {
            Outcome::Transitioned(t) => t,
            Outcome::Ignored => {
                trace!(topic = %self.session.topic, ?input, "input after destroy ignored");
                return;
            }
            Outcome::Unexpected { state, input } => {
                warn!(topic = %self.session.topic, %state, ?input, "unexpected input");
                self.publish(EventKind::UnexpectedTransition, |ev| {
                    ev.with_state(state).with_reason(format!("{input:?}"))
                });
                // The forwarder stops after a terminal event, so the attempt is over.
                if input == Input::Protocol(ProtocolSignal::Closed) && state.holds_connection() {
                    pending.push_back((
                        Input::Protocol(ProtocolSignal::Failed),
                        Some(ProtocolEvent::Failed(ProtocolError::ClosedBeforeOpen)),
                    ));
                }
                return;
            }
        };

        let Transition { from, to, commands } = transition;
        for command in commands {
            match command {
                Command::OpenConnection => {
                    if let Err(err) = self.open_connection() {
                        warn!(
                            topic = %self.session.topic,
                            error = err.as_label(),
                            "open failed synchronously"
                        );
                        pending.push_back((
                            Input::Protocol(ProtocolSignal::Failed),
                            Some(ProtocolEvent::Failed(err)),
                        ));
                    }
                }
                Command::CloseConnection => self.close_connection(),
                Command::StartRetryTimer { attempt } => {
                    let delay = self.timer.start(attempt);
                    debug!(topic = %self.session.topic, attempt, ?delay, "retry scheduled");
                    self.publish(EventKind::RetryScheduled, |ev| {
                        ev.with_attempt(attempt).with_delay(delay)
                    });
                }
                Command::CancelRetryTimer => {
                    if self.timer.cancel() {
                        self.publish(EventKind::RetryCancelled, |ev| ev);
                    }
                }
                Command::PublishEvent => {
                    if let Some(ev) = event.take() {
                        self.report(&ev);
                        self.session.publish(ev);
                    }
                }
                Command::ResetRetryCount => {
                    trace!(topic = %self.session.topic, "retry count reset");
                }
            }
        }

        if !to.holds_connection() {
            self.release_connection();
        }
        if from != to {
            debug!(topic = %self.session.topic, %from, %to, "state changed");
            self.publish(EventKind::StateChanged, |ev| ev.with_states(from, to));
            // `Destroyed` is announced by teardown, once subscribers are gone.
            if !to.is_terminal() {
                self.state_tx.send_replace(to);
            }
        }
        if from == ConnectionState::Connecting && to == ConnectionState::Connected {
            self.flush_queued();
        }
        if self.machine.should_reconnect() {
            trace!(topic = %self.session.topic, "desire still started, reconnecting");
            pending.push_back((Input::Lifecycle(LifecycleState::Started), None));
        }
    }

    fn open_connection(&mut self) -> Result<(), ProtocolError> {
        self.release_connection();
        self.generation = self.generation.wrapping_add(1);

        let attempt = self.machine.retry_count() + 1;
        debug!(
            topic = %self.session.topic,
            protocol = self.session.protocol().name(),
            attempt,
            generation = self.generation,
            "opening connection"
        );
        self.publish(EventKind::ConnectionOpening, |ev| ev.with_attempt(attempt));

        let connection = self.session.open()?;
        self.forwarder = Some(spawn_forwarder(
            connection.events,
            self.generation,
            self.inbox_tx.clone(),
        ));
        Ok(())
    }

    fn close_connection(&mut self) {
        let request = self
            .close_override
            .take()
            .unwrap_or_else(|| self.session.protocol().default_close_request());
        if self.session.close(request) {
            debug!(topic = %self.session.topic, "close requested");
        }
    }

    /// Drops the handle and the forwarder; later events of this attempt become stale.
    fn release_connection(&mut self) {
        if let Some(forwarder) = self.forwarder.take() {
            forwarder.abort();
        }
        if self.session.release() {
            self.generation = self.generation.wrapping_add(1);
            trace!(topic = %self.session.topic, "connection released");
        }
    }

    fn send(&mut self, message: Message) -> Result<(), SendError> {
        match self.machine.state() {
            ConnectionState::Connected => self.session.send(message).map_err(SendError::from),
            ConnectionState::Destroyed => Err(SendError::Destroyed),
            state => match self.params.send_policy {
                SendPolicy::Reject => Err(SendError::NotConnected { state }),
                SendPolicy::QueueUntilConnected { capacity } => {
                    if self.queued.len() >= capacity {
                        return Err(SendError::QueueFull { capacity });
                    }
                    self.queued.push_back(message);
                    Ok(())
                }
            },
        }
    }

    fn flush_queued(&mut self) {
        while let Some(message) = self.queued.pop_front() {
            if let Err(e) = self.session.send(message) {
                warn!(
                    topic = %self.session.topic,
                    error = %e,
                    dropped = self.queued.len() + 1,
                    "flush of queued messages failed"
                );
                self.queued.clear();
                return;
            }
        }
    }

    fn report(&self, event: &ProtocolEvent<P>) {
        match event {
            ProtocolEvent::Opened(_) => self.publish(EventKind::ConnectionOpened, |ev| ev),
            ProtocolEvent::Closing(_) => self.publish(EventKind::ConnectionClosing, |ev| ev),
            ProtocolEvent::Closed(_) => self.publish(EventKind::ConnectionClosed, |ev| ev),
            ProtocolEvent::Failed(err) => {
                debug!(topic = %self.session.topic, error = %err, "connection failed");
                self.publish(EventKind::ConnectionFailed, |ev| ev.with_reason(err.to_string()));
            }
            ProtocolEvent::MessageReceived(_) => {}
        }
    }

    fn publish(&self, kind: EventKind, build: impl FnOnce(Event) -> Event) {
        let ev = Event::new(kind)
            .with_topic(self.session.topic.as_arc())
            .with_session(self.session.id);
        self.bus.publish(build(ev));
    }

    fn teardown(&mut self) {
        self.timer.cancel();
        self.release_connection();
        let subscribers = self.session.subscriber_count();
        self.session.clear_subscribers();

        if !self.queued.is_empty() {
            debug!(
                topic = %self.session.topic,
                dropped = self.queued.len(),
                "queued messages discarded"
            );
            self.queued.clear();
        }

        self.inbox.close();
        while let Ok(msg) = self.inbox.try_recv() {
            if let Inbound::Send { reply, .. } = msg {
                let _ = reply.send(Err(SendError::Destroyed));
            }
        }

        self.state_tx.send_replace(ConnectionState::Destroyed);
        debug!(
            topic = %self.session.topic,
            session = self.session.id,
            subscribers,
            "session destroyed"
        );
        self.publish(EventKind::SessionDestroyed, |ev| ev);
    }
}

fn spawn_forwarder<P, T>(
    mut events: BoxStream<'static, ProtocolEvent<P>>,
    generation: u64,
    inbox: mpsc::Sender<Inbound<P, T>>,
) -> JoinHandle<()>
where
    P: Protocol,
    T: Send + 'static,
{
    tokio::spawn(async move {
        while let Some(event) = events.next().await {
            let terminal = event.is_terminal();
            let sent = inbox.send(Inbound::Protocol { generation, event }).await;
            if sent.is_err() || terminal {
                return;
            }
        }
        let _ = inbox
            .send(Inbound::Protocol {
                generation,
                event: ProtocolEvent::Failed(ProtocolError::StreamEnded),
            })
            .await;
    })
}
