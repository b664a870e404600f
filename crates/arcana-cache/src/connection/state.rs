//! Connection state machine.

use std::fmt;
use std::time::Duration;

/// Connection state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum ConnectionState {
    /// No connection has been requested yet.
    Uninitialized = 0,
    /// A connection attempt is in flight.
    Connecting = 1,
    /// The connection accepts commands.
    Ready = 2,
    /// The connection was lost or errored after being ready.
    Degraded = 3,
    /// The client was shut down or never managed to connect.
    Closed = 4,
}

impl ConnectionState {
    /// Returns the state name used in logs and metric labels.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Uninitialized => "uninitialized",
            Self::Connecting => "connecting",
            Self::Ready => "ready",
            Self::Degraded => "degraded",
            Self::Closed => "closed",
        }
    }

    /// Returns the state reached by applying `event`.
    ///
    /// `Closed` is left only by a new connection attempt. Events other than
    /// `Connecting` are ignored before the first attempt.
    #[must_use]
    pub fn next(self, event: &ConnectionEvent) -> Self {
        use ConnectionEvent as E;

        match (self, event) {
            (Self::Uninitialized | Self::Closed, E::Connecting) => Self::Connecting,
            (_, E::Ended) => Self::Closed,
            (Self::Closed, _) => Self::Closed,
            (Self::Uninitialized, _) => Self::Uninitialized,
            (_, E::Ready) => Self::Ready,
            (Self::Ready, E::Error(_) | E::Disconnected | E::Reconnecting { .. }) => Self::Degraded,
            (state, _) => state,
        }
    }
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Lifecycle event reported by a transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConnectionEvent {
    /// A connection attempt started.
    Connecting,
    /// The socket is established.
    Connected,
    /// The server answered the readiness check.
    Ready,
    /// The transport reported an error.
    Error(String),
    /// The connection was closed by the peer or dropped.
    Disconnected,
    /// A reconnect attempt is scheduled after `delay`.
    Reconnecting { attempt: u32, delay: Duration },
    /// The connection was closed for good.
    Ended,
}

impl ConnectionEvent {
    /// Returns the event name used in logs.
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Connecting => "connecting",
            Self::Connected => "connect",
            Self::Ready => "ready",
            Self::Error(_) => "error",
            Self::Disconnected => "close",
            Self::Reconnecting { .. } => "reconnecting",
            Self::Ended => "end",
        }
    }
}
