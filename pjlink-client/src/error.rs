use std::time::Duration;

use pjlink_rs_protocol::{ErrorCode, PjlinkError, StandardError};

/// Errors that can occur during PJLink client operations.
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    /// TCP connect was refused or failed.
    #[error("connect to {addr} failed: {source}")]
    ConnectFailed {
        addr: String,
        #[source]
        source: std::io::Error,
    },

    /// TCP connect did not complete in time.
    #[error("connect to {addr} timed out after {timeout:?}")]
    ConnectTimeout { addr: String, timeout: Duration },

    /// The stream accepted fewer bytes than the command line.
    #[error("short write: {written} of {expected} bytes")]
    ShortWrite { written: usize, expected: usize },

    /// Socket I/O failed, typically because the projector dropped the session.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Projector closed the connection (read returned 0 bytes).
    #[error("disconnected")]
    Disconnected,

    /// Greeting announced PJLink authentication, which this client does not perform.
    #[error("projector requires a password")]
    PasswordRequired,

    /// Nothing arrived within the wait window.
    #[error("no answer after {0:?}")]
    NoAnswer(Duration),

    /// Data arrived but the expected line never did.
    #[error("no {expected:?} line after {timeout:?}, received {received:?}")]
    UnparsableAnswer {
        expected: String,
        received: String,
        timeout: Duration,
    },

    /// Projector answered with one of the standard error tokens.
    #[error("projector reported {}", .0.token())]
    Projector(StandardError),

    /// Method called while the session is not usable for commands.
    #[error("invalid state: expected Ready, actual {0}")]
    NotReady(&'static str),

    /// Local encoding or payload parsing error.
    #[error("protocol error: {0}")]
    Protocol(#[from] PjlinkError),
}

impl ClientError {
    /// The [`ErrorCode`] this error is reported as.
    pub fn code(&self) -> ErrorCode {
        match self {
            Self::ConnectFailed { .. } | Self::ConnectTimeout { .. } => ErrorCode::ConnectFailed,
            Self::ShortWrite { .. } => ErrorCode::ShortWrite,
            Self::Io(_) | Self::Disconnected => ErrorCode::ConnectionAborted,
            Self::PasswordRequired => ErrorCode::PasswordRequired,
            Self::NoAnswer(_) => ErrorCode::NoAnswer,
            Self::UnparsableAnswer { .. } => ErrorCode::UnparsableAnswer,
            Self::Projector(err) => err.code(),
            Self::NotReady(_) => ErrorCode::Error,
            Self::Protocol(PjlinkError::UnparsableReply { .. }) => ErrorCode::UnparsableAnswer,
            Self::Protocol(_) => ErrorCode::Error,
        }
    }
}

/// Convenience alias for `Result<T, ClientError>`.
pub type Result<T> = std::result::Result<T, ClientError>;
