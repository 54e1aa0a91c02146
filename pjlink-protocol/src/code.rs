use std::fmt;

/// Outcome of the most recent operation on a projector connection.
///
/// A closed set: transport faults, protocol faults and the four standard
/// device error tokens. The numeric values are stable and match the codes
/// reported by existing PJLink tooling.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum ErrorCode {
    /// Unexpected protocol state (bad greeting, command on a session that is not ready).
    Error,
    /// The stream accepted fewer bytes than the encoded command.
    ShortWrite,
    /// TCP connect failed or timed out.
    ConnectFailed,
    /// The projector dropped the session (it does so after ~30 s of silence).
    ConnectionAborted,
    /// The projector requires PJLink authentication.
    PasswordRequired,
    /// Nothing arrived within the wait window.
    NoAnswer,
    /// `ERR1`: undefined command.
    UndefinedCommand,
    /// `ERR2`: parameter out of range.
    OutOfParameter,
    /// `ERR3`: unavailable at this time.
    UnavailableTime,
    /// `ERR4`: projector/display failure.
    ProjectorFailure,
    /// Data arrived but never matched the expected reply, or the payload did not parse.
    UnparsableAnswer,
}

impl ErrorCode {
    pub fn code(self) -> i32 {
        match self {
            Self::Error => -1,
            Self::ShortWrite => 0x01,
            Self::ConnectFailed => 0x02,
            Self::ConnectionAborted => 0x03,
            Self::PasswordRequired => 0x04,
            Self::NoAnswer => 0x10,
            Self::UndefinedCommand => 0x11,
            Self::OutOfParameter => 0x12,
            Self::UnavailableTime => 0x13,
            Self::ProjectorFailure => 0x14,
            Self::UnparsableAnswer => 0x15,
        }
    }

    pub fn from_code(code: i32) -> Option<Self> {
        match code {
            -1 => Some(Self::Error),
            0x01 => Some(Self::ShortWrite),
            0x02 => Some(Self::ConnectFailed),
            0x03 => Some(Self::ConnectionAborted),
            0x04 => Some(Self::PasswordRequired),
            0x10 => Some(Self::NoAnswer),
            0x11 => Some(Self::UndefinedCommand),
            0x12 => Some(Self::OutOfParameter),
            0x13 => Some(Self::UnavailableTime),
            0x14 => Some(Self::ProjectorFailure),
            0x15 => Some(Self::UnparsableAnswer),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Error => "ERROR",
            Self::ShortWrite => "TCP_PROBLEM",
            Self::ConnectFailed => "TCP_NOCONN",
            Self::ConnectionAborted => "TCP_CONNABORTED",
            Self::PasswordRequired => "PJ_WRONGPASS",
            Self::NoAnswer => "PJ_NOANSWER",
            Self::UndefinedCommand => "PJ_ERR1",
            Self::OutOfParameter => "PJ_ERR2",
            Self::UnavailableTime => "PJ_ERR3",
            Self::ProjectorFailure => "PJ_ERR4",
            Self::UnparsableAnswer => "PJ_UNKANSWER",
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.code() {
            code if code < 0 => write!(f, "{} ({code})", self.as_str()),
            code => write!(f, "{} (0x{code:02x})", self.as_str()),
        }
    }
}
