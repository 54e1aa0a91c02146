use std::fmt;

use crate::catalog::{InputKey, PowerKey, ShutterKey};
use crate::error::{PjlinkError, Result};

/// Start-of-command marker.
pub const HEADER: char = '%';

/// PJLink class 1 is the only class this crate speaks.
pub const CLASS: char = '1';

/// Argument body of every getter.
pub const QUERY: &str = "?";

/// A 4-character PJLink command name, stored space-padded.
#[derive(Copy, Clone, PartialEq, Eq, Hash)]
pub struct CommandName([u8; 4]);

impl CommandName {
    pub const POWER: Self = Self(*b"POWR");
    /// Audio/video mute, used here for the shutter.
    pub const AV_MUTE: Self = Self(*b"AVMT");
    pub const INPUT: Self = Self(*b"INPT");
    pub const INPUT_LIST: Self = Self(*b"INST");
    pub const LAMP: Self = Self(*b"LAMP");
    pub const ERROR_STATUS: Self = Self(*b"ERST");
    pub const CLASS: Self = Self(*b"CLSS");
    pub const NAME: Self = Self(*b"NAME");
    pub const MANUFACTURER: Self = Self(*b"INF1");
    pub const PRODUCT_NAME: Self = Self(*b"INF2");
    pub const OTHER_INFO: Self = Self(*b"INF0");

    /// Build a name from up to 4 ASCII alphanumerics. Shorter names are
    /// right-aligned and padded with spaces; letters are upper-cased.
    pub fn new(name: &str) -> Result<Self> {
        if name.is_empty() || name.len() > 4 || !name.bytes().all(|b| b.is_ascii_alphanumeric())
        {
            return Err(PjlinkError::InvalidCommandName(name.to_owned()));
        }
        let mut buf = [b' '; 4];
        buf[4 - name.len()..].copy_from_slice(name.as_bytes());
        buf.make_ascii_uppercase();
        Ok(Self(buf))
    }

    pub fn as_str(&self) -> &str {
        // Only ASCII ever enters the buffer.
        std::str::from_utf8(&self.0).unwrap_or_default()
    }

    /// Header the projector must echo before the reply body: `%1NAME=`.
    pub fn reply_prefix(&self) -> String {
        format!("{HEADER}{CLASS}{}=", self.as_str())
    }
}

impl fmt::Display for CommandName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl fmt::Debug for CommandName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "CommandName({:?})", self.as_str())
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Argument {
    Query,
    Value(String),
}

impl Argument {
    pub fn as_str(&self) -> &str {
        match self {
            Self::Query => QUERY,
            Self::Value(value) => value,
        }
    }
}

/// One command line sent to the projector.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Command {
    name: CommandName,
    argument: Argument,
}

impl Command {
    pub fn query(name: CommandName) -> Self {
        Self {
            name,
            argument: Argument::Query,
        }
    }

    /// A setter with a raw argument body. The body must not contain a
    /// carriage return, since that terminates the line on the wire.
    pub fn set(name: CommandName, value: impl Into<String>) -> Result<Self> {
        let value = value.into();
        if value.is_empty() || value.contains(['\r', '\n']) {
            return Err(PjlinkError::InvalidCommand(format!(
                "{name}: invalid argument {value:?}"
            )));
        }
        Ok(Self {
            name,
            argument: Argument::Value(value),
        })
    }

    pub fn power(key: PowerKey) -> Self {
        Self {
            name: CommandName::POWER,
            argument: Argument::Value(key.wire().to_owned()),
        }
    }

    pub fn shutter(key: ShutterKey) -> Self {
        Self {
            name: CommandName::AV_MUTE,
            argument: Argument::Value(key.wire().to_owned()),
        }
    }

    pub fn input(key: InputKey) -> Self {
        Self {
            name: CommandName::INPUT,
            argument: Argument::Value(key.wire()),
        }
    }

    pub fn name(&self) -> CommandName {
        self.name
    }

    pub fn argument(&self) -> &Argument {
        &self.argument
    }

    pub fn is_query(&self) -> bool {
        self.argument == Argument::Query
    }

    /// Serialize to the wire line: `%1NAME ARG\r`.
    pub fn to_bytes(&self) -> Vec<u8> {
        format!(
            "{HEADER}{CLASS}{} {}\r",
            self.name.as_str(),
            self.argument.as_str()
        )
        .into_bytes()
    }

    /// Parse a wire line back into a command. A trailing `\r` is optional.
    pub fn parse(line: &str) -> Result<Self> {
        let line = line.trim_end_matches('\n').trim_end_matches('\r');
        let rest = line
            .strip_prefix(HEADER)
            .and_then(|rest| rest.strip_prefix(CLASS))
            .ok_or_else(|| PjlinkError::InvalidCommand(format!("missing %1 header: {line:?}")))?;

        if rest.len() < 5 || !rest.is_char_boundary(4) || rest.as_bytes()[4] != b' ' {
            return Err(PjlinkError::InvalidCommand(format!(
                "malformed command line: {line:?}"
            )));
        }
        let name = CommandName::new(rest[..4].trim_start())?;
        let body = &rest[5..];

        if body == QUERY {
            Ok(Self::query(name))
        } else {
            Self::set(name, body)
        }
    }
}
