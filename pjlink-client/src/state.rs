use std::time::Duration;

use pjlink_rs_protocol::DEFAULT_PORT;

/// Session state of a [`Projector`](crate::Projector).
///
/// Transitions: `Closed` → `Ready` (no-auth greeting) or `AwaitingAuth`
/// (password greeting) → `Closed`. Any transport fault drops back to `Closed`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SessionState {
    /// No socket. Initial state, and the state after `close()` or a transport fault.
    Closed,
    /// TCP connected but the projector demanded a password. No commands may be sent.
    AwaitingAuth,
    /// Handshake completed; commands may be exchanged.
    Ready,
}

impl SessionState {
    /// Returns the state name as a static string.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Closed => "Closed",
            Self::AwaitingAuth => "AwaitingAuth",
            Self::Ready => "Ready",
        }
    }
}

/// Configuration for [`Projector`](crate::Projector) connections.
#[derive(Clone, Debug)]
pub struct ClientConfig {
    /// PJLink TCP port. Default: 4352.
    pub port: u16,
    /// Timeout for the initial TCP connection. Default: 30 seconds.
    pub connect_timeout: Duration,
    /// Bound on each individual wait for a greeting or reply. Default: 30 seconds.
    pub read_timeout: Duration,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            port: DEFAULT_PORT,
            connect_timeout: Duration::from_secs(30),
            read_timeout: Duration::from_secs(30),
        }
    }
}
