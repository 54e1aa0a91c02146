#[derive(Debug, thiserror::Error)]
pub enum PjlinkError {
    #[error("invalid command name: {0:?}")]
    InvalidCommandName(String),

    #[error("invalid command: {0}")]
    InvalidCommand(String),

    #[error("illegal {command} key: {key}")]
    InvalidKey { command: &'static str, key: u8 },

    #[error("invalid greeting: {0:?}")]
    InvalidGreeting(String),

    #[error("unparsable {command} reply: {body:?}")]
    UnparsableReply { command: &'static str, body: String },
}

impl PjlinkError {
    pub(crate) fn unparsable(command: &'static str, body: &str) -> Self {
        Self::UnparsableReply {
            command,
            body: body.to_owned(),
        }
    }
}

pub type Result<T> = std::result::Result<T, PjlinkError>;
