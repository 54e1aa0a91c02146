//! Per-command key tables and reply-payload parsers.
//!
//! Setters map a caller-supplied logical key to the wire argument; getters
//! turn the body of a classified reply into a typed value. Every parser
//! tolerates a trailing carriage return on the body.

use std::fmt;

use crate::error::{PjlinkError, Result};

/// Upper bound on lamps a single `LAMP` reply may describe.
pub const MAX_LAMPS: usize = 8;

/// Subsystems reported by `ERST`, in wire order.
pub const ERROR_STATUS_FIELDS: [&str; 6] =
    ["fan", "lamp", "temperature", "cover", "filter", "other"];

fn strip_terminator(body: &str) -> &str {
    body.trim_end_matches(['\r', '\n'])
}

fn digit_at(command: &'static str, body: &str, index: usize) -> Result<u8> {
    body.as_bytes()
        .get(index)
        .filter(|b| b.is_ascii_digit())
        .map(|b| b - b'0')
        .ok_or_else(|| PjlinkError::unparsable(command, body))
}

// -- Setter keys --

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum PowerKey {
    Off,
    On,
}

impl PowerKey {
    /// 0 = off, 1 = on.
    pub fn from_key(key: u8) -> Result<Self> {
        match key {
            0 => Ok(Self::Off),
            1 => Ok(Self::On),
            _ => Err(PjlinkError::InvalidKey {
                command: "POWR",
                key,
            }),
        }
    }

    pub fn key(self) -> u8 {
        match self {
            Self::Off => 0,
            Self::On => 1,
        }
    }

    pub fn wire(self) -> &'static str {
        match self {
            Self::Off => "0",
            Self::On => "1",
        }
    }

    pub fn from_wire(s: &str) -> Option<Self> {
        match s {
            "0" => Some(Self::Off),
            "1" => Some(Self::On),
            _ => None,
        }
    }
}

/// Shutter control through video mute (`AVMT 3x`).
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum ShutterKey {
    Open,
    Close,
}

impl ShutterKey {
    /// 0 = open, 1 = close.
    pub fn from_key(key: u8) -> Result<Self> {
        match key {
            0 => Ok(Self::Open),
            1 => Ok(Self::Close),
            _ => Err(PjlinkError::InvalidKey {
                command: "AVMT",
                key,
            }),
        }
    }

    pub fn key(self) -> u8 {
        match self {
            Self::Open => 0,
            Self::Close => 1,
        }
    }

    pub fn wire(self) -> &'static str {
        match self {
            Self::Open => "30",
            Self::Close => "31",
        }
    }

    pub fn from_wire(s: &str) -> Option<Self> {
        match s {
            "30" => Some(Self::Open),
            "31" => Some(Self::Close),
            _ => None,
        }
    }
}

/// Input source class, the first digit of an input code.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum InputSource {
    Rgb,
    Video,
    Digital,
    Storage,
    Network,
}

impl InputSource {
    pub fn from_digit(digit: u8) -> Option<Self> {
        match digit {
            1 => Some(Self::Rgb),
            2 => Some(Self::Video),
            3 => Some(Self::Digital),
            4 => Some(Self::Storage),
            5 => Some(Self::Network),
            _ => None,
        }
    }

    pub fn digit(self) -> u8 {
        match self {
            Self::Rgb => 1,
            Self::Video => 2,
            Self::Digital => 3,
            Self::Storage => 4,
            Self::Network => 5,
        }
    }
}

/// A two-digit input code: source class 1-5 followed by input number 1-9.
///
/// Whether the projector actually has that input is not checked here; an
/// absent input comes back from the device as `ERR2`.
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct InputKey(u8);

impl InputKey {
    pub fn new(key: u8) -> Result<Self> {
        if (11..=59).contains(&key) && key % 10 != 0 {
            Ok(Self(key))
        } else {
            Err(PjlinkError::InvalidKey {
                command: "INPT",
                key,
            })
        }
    }

    pub fn from_parts(source: InputSource, number: u8) -> Result<Self> {
        Self::new(source.digit() * 10 + number.min(10))
    }

    /// Same as [`new`](Self::new); keeps the setter-key vocabulary uniform.
    pub fn from_key(key: u8) -> Result<Self> {
        Self::new(key)
    }

    pub fn key(self) -> u8 {
        self.0
    }

    pub fn source(self) -> InputSource {
        // new() guarantees the tens digit is 1..=5
        InputSource::from_digit(self.0 / 10).unwrap_or(InputSource::Rgb)
    }

    pub fn number(self) -> u8 {
        self.0 % 10
    }

    pub fn wire(self) -> String {
        self.0.to_string()
    }

    pub fn from_wire(s: &str) -> Option<Self> {
        if s.len() != 2 {
            return None;
        }
        s.parse().ok().and_then(|key| Self::new(key).ok())
    }

    /// `INPT ?` reply: the first two characters are the input code.
    pub fn parse(body: &str) -> Result<Self> {
        strip_terminator(body)
            .get(..2)
            .and_then(Self::from_wire)
            .ok_or_else(|| PjlinkError::unparsable("INPT", body))
    }
}

impl fmt::Display for InputKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// -- Getter results --

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum PowerState {
    Off,
    On,
    Cooling,
    WarmingUp,
}

impl PowerState {
    pub fn from_code(code: u8) -> Option<Self> {
        match code {
            0 => Some(Self::Off),
            1 => Some(Self::On),
            2 => Some(Self::Cooling),
            3 => Some(Self::WarmingUp),
            _ => None,
        }
    }

    pub fn code(self) -> u8 {
        match self {
            Self::Off => 0,
            Self::On => 1,
            Self::Cooling => 2,
            Self::WarmingUp => 3,
        }
    }

    /// `POWR ?` reply: the first character is the state.
    pub fn parse(body: &str) -> Result<Self> {
        let code = digit_at("POWR", body, 0)?;
        Self::from_code(code).ok_or_else(|| PjlinkError::unparsable("POWR", body))
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum ShutterState {
    Open,
    Closed,
}

impl ShutterState {
    /// `AVMT ?` reply: the mute target is the first digit, the on/off state
    /// the second.
    pub fn parse(body: &str) -> Result<Self> {
        match digit_at("AVMT", body, 1)? {
            0 => Ok(Self::Open),
            1 => Ok(Self::Closed),
            _ => Err(PjlinkError::unparsable("AVMT", body)),
        }
    }

    pub fn code(self) -> u8 {
        match self {
            Self::Open => 0,
            Self::Closed => 1,
        }
    }
}

/// `INST ?` reply: space-separated input codes in device order.
pub fn parse_inputs(body: &str) -> Result<Vec<InputKey>> {
    strip_terminator(body)
        .split_whitespace()
        .map(|token| {
            InputKey::from_wire(token).ok_or_else(|| PjlinkError::unparsable("INST", body))
        })
        .collect()
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct LampInfo {
    /// Cumulative lighting time in hours.
    pub hours: u32,
    pub on: bool,
}

/// `LAMP ?` reply: `hours state` pairs, one per lamp, flattened.
pub fn parse_lamps(body: &str) -> Result<Vec<LampInfo>> {
    let unparsable = || PjlinkError::unparsable("LAMP", body);

    let values = strip_terminator(body)
        .split_whitespace()
        .map(|token| token.parse::<u32>().map_err(|_| unparsable()))
        .collect::<Result<Vec<_>>>()?;

    if values.len() % 2 != 0 || values.len() > MAX_LAMPS * 2 {
        return Err(unparsable());
    }

    values
        .chunks_exact(2)
        .map(|pair| match pair[1] {
            0 | 1 => Ok(LampInfo {
                hours: pair[0],
                on: pair[1] == 1,
            }),
            _ => Err(unparsable()),
        })
        .collect()
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum StatusLevel {
    Ok,
    Warning,
    Error,
}

impl StatusLevel {
    pub fn from_code(code: u8) -> Option<Self> {
        match code {
            0 => Some(Self::Ok),
            1 => Some(Self::Warning),
            2 => Some(Self::Error),
            _ => None,
        }
    }

    pub fn code(self) -> u8 {
        match self {
            Self::Ok => 0,
            Self::Warning => 1,
            Self::Error => 2,
        }
    }
}

/// Health of each subsystem as reported by `ERST`.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct ErrorStatus {
    pub fan: StatusLevel,
    pub lamp: StatusLevel,
    pub temperature: StatusLevel,
    pub cover: StatusLevel,
    pub filter: StatusLevel,
    pub other: StatusLevel,
}

impl ErrorStatus {
    /// `ERST ?` reply: exactly six digits, one per subsystem.
    pub fn parse(body: &str) -> Result<Self> {
        let digits = strip_terminator(body);
        if digits.len() != ERROR_STATUS_FIELDS.len() {
            return Err(PjlinkError::unparsable("ERST", body));
        }

        let mut levels = [StatusLevel::Ok; 6];
        for (i, level) in levels.iter_mut().enumerate() {
            *level = StatusLevel::from_code(digit_at("ERST", digits, i)?)
                .ok_or_else(|| PjlinkError::unparsable("ERST", body))?;
        }

        let [fan, lamp, temperature, cover, filter, other] = levels;
        Ok(Self {
            fan,
            lamp,
            temperature,
            cover,
            filter,
            other,
        })
    }

    pub fn levels(&self) -> [StatusLevel; 6] {
        [
            self.fan,
            self.lamp,
            self.temperature,
            self.cover,
            self.filter,
            self.other,
        ]
    }

    pub fn codes(&self) -> [u8; 6] {
        self.levels().map(StatusLevel::code)
    }

    pub fn is_healthy(&self) -> bool {
        self.levels().iter().all(|level| *level == StatusLevel::Ok)
    }
}

/// `CLSS ?` reply: the first character is the PJLink class.
pub fn parse_class(body: &str) -> Result<u8> {
    digit_at("CLSS", body, 0)
}

/// `NAME`/`INF0`/`INF1`/`INF2` replies are free text.
pub fn parse_text(body: &str) -> String {
    strip_terminator(body).to_owned()
}
