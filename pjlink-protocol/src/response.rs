use crate::code::ErrorCode;
use crate::command::{CLASS, CommandName, HEADER};
use crate::error::{PjlinkError, Result};

/// Literal that precedes the authentication digit in the projector greeting.
pub const GREETING_MARKER: &str = "PJLINK ";

/// Line terminator for every PJLink line, in both directions.
pub const TERMINATOR: char = '\r';

/// Locate a complete line introduced by `marker` inside `buffer`.
///
/// Returns the text between the end of `marker` and the next carriage
/// return, or `None` while either the marker or its terminator has not
/// arrived yet. Bytes before the marker are ignored.
pub fn find_line<'a>(buffer: &'a str, marker: &str) -> Option<&'a str> {
    let start = buffer.find(marker)? + marker.len();
    let rest = &buffer[start..];
    let end = rest.find(TERMINATOR)?;
    Some(&rest[..end])
}

/// The four error tokens a projector may put in a reply body.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum StandardError {
    /// `ERR1`
    UndefinedCommand,
    /// `ERR2`
    OutOfParameter,
    /// `ERR3`
    UnavailableTime,
    /// `ERR4`
    ProjectorFailure,
}

impl StandardError {
    /// Scan order; the first token found wins.
    pub const ALL: [Self; 4] = [
        Self::UndefinedCommand,
        Self::OutOfParameter,
        Self::UnavailableTime,
        Self::ProjectorFailure,
    ];

    pub fn token(self) -> &'static str {
        match self {
            Self::UndefinedCommand => "ERR1",
            Self::OutOfParameter => "ERR2",
            Self::UnavailableTime => "ERR3",
            Self::ProjectorFailure => "ERR4",
        }
    }

    pub fn code(self) -> ErrorCode {
        match self {
            Self::UndefinedCommand => ErrorCode::UndefinedCommand,
            Self::OutOfParameter => ErrorCode::OutOfParameter,
            Self::UnavailableTime => ErrorCode::UnavailableTime,
            Self::ProjectorFailure => ErrorCode::ProjectorFailure,
        }
    }
}

/// A reply body after classification.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Response {
    StandardError(StandardError),
    Payload(String),
}

impl Response {
    /// Classify a reply body: any standard error token anywhere in the body
    /// makes it an error, checked in `ERR1`..`ERR4` order.
    pub fn classify(body: &str) -> Self {
        StandardError::ALL
            .into_iter()
            .find(|err| body.contains(err.token()))
            .map(Self::StandardError)
            .unwrap_or_else(|| Self::Payload(body.to_owned()))
    }

    pub fn into_payload(self) -> std::result::Result<String, StandardError> {
        match self {
            Self::Payload(body) => Ok(body),
            Self::StandardError(err) => Err(err),
        }
    }

    /// Serialize as the projector would send it: `%1NAME=BODY\r`.
    pub fn to_bytes(&self, name: CommandName) -> Vec<u8> {
        let body = match self {
            Self::StandardError(err) => err.token(),
            Self::Payload(body) => body.as_str(),
        };
        format!("{HEADER}{CLASS}{}={body}{TERMINATOR}", name.as_str()).into_bytes()
    }
}

/// Authentication mode announced by the greeting.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Greeting {
    NoAuth,
    PasswordRequired,
}

impl Greeting {
    /// Parse the text following [`GREETING_MARKER`]. Only the first
    /// character matters; a password greeting carries a random seed after it.
    pub fn parse(rest: &str) -> Result<Self> {
        match rest.chars().next() {
            Some('0') => Ok(Self::NoAuth),
            Some('1') => Ok(Self::PasswordRequired),
            _ => Err(PjlinkError::InvalidGreeting(rest.to_owned())),
        }
    }

    pub fn to_bytes(self) -> Vec<u8> {
        match self {
            Self::NoAuth => format!("{GREETING_MARKER}0{TERMINATOR}").into_bytes(),
            Self::PasswordRequired => {
                format!("{GREETING_MARKER}1 498e4a67{TERMINATOR}").into_bytes()
            }
        }
    }
}
