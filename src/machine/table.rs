//! # Pure transition table.
//!
//! [`StateMachine::apply`] maps `(state, input)` to the next state and the commands the
//! coordinator must execute. It performs no I/O and holds no handles; the coordinator
//! owns every side effect.
//!
//! ```text
//! Disconnected ──Started──► Connecting ──Opened──► Connected
//!   ▲     ▲                   │    ▲                │      │
//!   │     │ Stopped     Failed│    │Fired   Failed, │      │ Stopped
//!   │     │                   ▼    │  Closed (want) │      ▼
//!   │     └─────────────── WaitingToRetry ◄─────────┘  Disconnecting
//!   │                                                      │
//!   └──────────────────────── Closed/Failed ───────────────┘
//! ```
//!
//! ## Rules
//! - Unlisted pairs return [`Outcome::Unexpected`]: state unchanged, no commands.
//! - `Destroyed` is terminal: every input returns [`Outcome::Ignored`].
//! - Lifecycle inputs always update the recorded desire, even when unexpected.
//! - The attempt counter grows by one per failure and resets on `Opened`.

use crate::machine::state::{ConnectionState, LifecycleState};
use crate::protocol::ProtocolSignal;

/// Input fed to the state machine.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Input {
    /// Desired connectivity changed (or was re-announced).
    Lifecycle(LifecycleState),
    /// The transport reported an event.
    Protocol(ProtocolSignal),
    /// The pending retry timer elapsed.
    RetryTimerFired {
        /// Attempt number the timer was started for.
        attempt: u32,
    },
    /// Tear the session down for good.
    Destroy,
}

/// Side effect requested by a transition.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Command {
    /// Start a new connection attempt.
    OpenConnection,
    /// Close the current connection or attempt (idempotent).
    CloseConnection,
    /// Schedule a retry after `delay_for(attempt)`.
    StartRetryTimer {
        /// 1-based attempt number since the last successful open.
        attempt: u32,
    },
    /// Cancel the pending retry timer, if any.
    CancelRetryTimer,
    /// Translate the triggering protocol event and deliver it to subscribers.
    PublishEvent,
    /// The attempt counter went back to zero.
    ResetRetryCount,
}

/// Accepted transition.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Transition {
    /// State before the input.
    pub from: ConnectionState,
    /// State after the input (may equal `from`).
    pub to: ConnectionState,
    /// Commands to execute, in order.
    pub commands: Vec<Command>,
}

/// Result of feeding one input.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Outcome {
    /// The input is defined for the current state.
    Transitioned(Transition),
    /// The input is not defined for the current state; nothing changed.
    Unexpected {
        /// Current (unchanged) state.
        state: ConnectionState,
        /// The rejected input.
        input: Input,
    },
    /// The machine is destroyed; the input was dropped.
    Ignored,
}

/// Connection lifecycle state machine for one session.
#[derive(Clone, Debug)]
pub struct StateMachine {
    state: ConnectionState,
    desire: LifecycleState,
    attempts: u32,
}

impl Default for StateMachine {
    fn default() -> Self {
        Self {
            state: ConnectionState::Disconnected,
            desire: LifecycleState::Stopped,
            attempts: 0,
        }
    }
}

impl StateMachine {
    /// New machine in `Disconnected` with a `Stopped` desire.
    pub fn new() -> Self {
        Self::default()
    }

    /// Current state.
    pub fn state(&self) -> ConnectionState {
        self.state
    }

    /// Last lifecycle desire observed.
    pub fn desire(&self) -> LifecycleState {
        self.desire
    }

    /// Failures since the last successful open.
    pub fn retry_count(&self) -> u32 {
        self.attempts
    }

    /// True when the machine rests in `Disconnected` although the desire is `Started`.
    ///
    /// Happens when `Started` arrives during `Disconnecting`; the caller should feed
    /// `Lifecycle(Started)` again.
    pub fn should_reconnect(&self) -> bool {
        self.state == ConnectionState::Disconnected && self.desire.is_started()
    }

    /// Feeds one input.
    pub fn apply(&mut self, input: Input) -> Outcome {
        use Command::*;
        use ConnectionState::*;
        use LifecycleState::{Started, Stopped};
        use ProtocolSignal::*;

        let from = self.state;
        if from.is_terminal() {
            return Outcome::Ignored;
        }
        if let Input::Lifecycle(desire) = input {
            self.desire = desire;
        }

        let (to, commands) = match (from, input) {
            (_, Input::Destroy) => {
                let mut commands = vec![CancelRetryTimer];
                if matches!(from, Connecting | Connected) {
                    commands.push(CloseConnection);
                }
                (Destroyed, commands)
            }

            (Disconnected, Input::Lifecycle(Started)) => (Connecting, vec![OpenConnection]),
            (Disconnected, Input::Lifecycle(Stopped)) => (Disconnected, Vec::new()),

            (Connecting, Input::Protocol(Opened)) => {
                self.attempts = 0;
                (Connected, vec![PublishEvent, ResetRetryCount])
            }
            (Connecting | Connected, Input::Protocol(Failed)) => {
                (WaitingToRetry, vec![PublishEvent, self.next_retry()])
            }
            (Connecting | Connected, Input::Lifecycle(Stopped)) => {
                (Disconnecting, vec![CloseConnection])
            }

            (Connected, Input::Protocol(MessageReceived | Closing)) => {
                (Connected, vec![PublishEvent])
            }
            (Connected, Input::Protocol(Closed)) => {
                if self.desire.is_started() {
                    (WaitingToRetry, vec![PublishEvent, self.next_retry()])
                } else {
                    (Disconnected, vec![PublishEvent])
                }
            }

            (Disconnecting, Input::Protocol(Closed | Failed)) => (Disconnected, vec![PublishEvent]),

            (WaitingToRetry, Input::RetryTimerFired { .. }) => (Connecting, vec![OpenConnection]),
            (WaitingToRetry, Input::Lifecycle(Stopped)) => (Disconnected, vec![CancelRetryTimer]),

            (state, input) => return Outcome::Unexpected { state, input },
        };

        self.state = to;
        Outcome::Transitioned(Transition { from, to, commands })
    }

    fn next_retry(&mut self) -> Command {
        self.attempts = self.attempts.saturating_add(1);
        Command::StartRetryTimer {
            attempt: self.attempts,
        }
    }

    #[cfg(test)]
    pub(crate) fn from_parts(
        state: ConnectionState,
        desire: LifecycleState,
        attempts: u32,
    ) -> Self {
        Self {
            state,
            desire,
            attempts,
        }
    }
}
