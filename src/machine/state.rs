//! Connection and lifecycle states.

use std::fmt;

/// Authoritative state of one session's connection.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum ConnectionState {
    /// No connection and none wanted yet (initial).
    #[default]
    Disconnected,
    /// An open attempt is in flight.
    Connecting,
    /// The connection is open.
    Connected,
    /// A close was requested; waiting for the transport to confirm.
    Disconnecting,
    /// The last attempt failed; a retry timer is pending.
    WaitingToRetry,
    /// Terminal. The session no longer accepts inputs.
    Destroyed,
}

impl ConnectionState {
    /// Every state, in declaration order.
    pub const ALL: [ConnectionState; 6] = [
        ConnectionState::Disconnected,
        ConnectionState::Connecting,
        ConnectionState::Connected,
        ConnectionState::Disconnecting,
        ConnectionState::WaitingToRetry,
        ConnectionState::Destroyed,
    ];

    /// Short snake_case name for logs.
    pub fn as_str(&self) -> &'static str {
        match self {
            ConnectionState::Disconnected => "disconnected",
            ConnectionState::Connecting => "connecting",
            ConnectionState::Connected => "connected",
            ConnectionState::Disconnecting => "disconnecting",
            ConnectionState::WaitingToRetry => "waiting_to_retry",
            ConnectionState::Destroyed => "destroyed",
        }
    }

    /// True only for [`ConnectionState::Destroyed`].
    pub fn is_terminal(&self) -> bool {
        matches!(self, ConnectionState::Destroyed)
    }

    /// True while a connection handle may be live (an attempt or an open connection).
    pub fn holds_connection(&self) -> bool {
        matches!(
            self,
            ConnectionState::Connecting
                | ConnectionState::Connected
                | ConnectionState::Disconnecting
        )
    }
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Caller's desired connectivity.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum LifecycleState {
    /// The session should be connected.
    Started,
    /// The session should be disconnected.
    Stopped,
}

impl LifecycleState {
    /// True for [`LifecycleState::Started`].
    pub fn is_started(&self) -> bool {
        matches!(self, LifecycleState::Started)
    }
}

impl From<bool> for LifecycleState {
    fn from(started: bool) -> Self {
        if started {
            LifecycleState::Started
        } else {
            LifecycleState::Stopped
        }
    }
}
