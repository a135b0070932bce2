//! # Retry timer: at most one pending firing per session.
//!
//! [`TimerEventSource::start`] asks the [`BackoffStrategy`] for the delay, aborts any
//! pending timer, and spawns a sleep that pushes a [`TimerFired`] into the session inbox.
//! Every start and every cancel bumps the generation, so a firing that was already queued
//! when its timer got superseded is recognised as stale by [`TimerEventSource::is_current`].

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::policies::BackoffStrategy;

/// Payload pushed into the inbox when a retry timer elapses.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TimerFired {
    /// Timer generation; compare with [`TimerEventSource::is_current`].
    pub generation: u64,
    /// Attempt number the timer was started for.
    pub attempt: u32,
}

/// Cancellable retry timer for one session.
pub struct TimerEventSource<M> {
    strategy: Arc<dyn BackoffStrategy>,
    inbox: mpsc::Sender<M>,
    wrap: fn(TimerFired) -> M,
    generation: u64,
    pending: Option<JoinHandle<()>>,
}

impl<M: Send + 'static> TimerEventSource<M> {
    /// Timer delivering into `inbox`, wrapping each firing with `wrap`.
    pub fn new(
        strategy: Arc<dyn BackoffStrategy>,
        inbox: mpsc::Sender<M>,
        wrap: fn(TimerFired) -> M,
    ) -> Self {
        Self {
            strategy,
            inbox,
            wrap,
            generation: 0,
            pending: None,
        }
    }

    /// Starts a timer for `attempt`, replacing any pending one. Returns the delay.
    pub fn start(&mut self, attempt: u32) -> Duration {
        self.cancel();

        let delay = self.strategy.delay_for(attempt);
        let fired = TimerFired {
            generation: self.generation,
            attempt,
        };
        let inbox = self.inbox.clone();
        let wrap = self.wrap;

        self.pending = Some(tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            let _ = inbox.send(wrap(fired)).await;
        }));
        delay
    }

    /// Cancels the pending timer. Returns whether one was still sleeping.
    pub fn cancel(&mut self) -> bool {
        self.generation = self.generation.wrapping_add(1);
        match self.pending.take() {
            Some(handle) => {
                let sleeping = !handle.is_finished();
                handle.abort();
                sleeping
            }
            None => false,
        }
    }

    /// True if a firing with this generation belongs to the latest, uncancelled timer.
    pub fn is_current(&self, generation: u64) -> bool {
        self.pending.is_some() && generation == self.generation
    }

    /// True while a timer is sleeping.
    pub fn is_pending(&self) -> bool {
        self.pending.as_ref().is_some_and(|h| !h.is_finished())
    }
}

impl<M> Drop for TimerEventSource<M> {
    fn drop(&mut self) {
        if let Some(handle) = self.pending.take() {
            handle.abort();
        }
    }
}
