//! PJLink class 1 protocol types, command encoding, and reply parsing.
//!
//! This crate is I/O-free: it turns commands into wire lines and reply
//! bodies into typed values. The client crate owns the socket.

pub mod catalog;
pub mod code;
pub mod command;
pub mod error;
pub mod response;

pub use catalog::{
    ErrorStatus, InputKey, InputSource, LampInfo, PowerKey, PowerState, ShutterKey, ShutterState,
    StatusLevel,
};
pub use code::ErrorCode;
pub use command::{Argument, Command, CommandName};
pub use error::{PjlinkError, Result};
pub use response::{Greeting, Response, StandardError};

/// Well-known PJLink TCP port.
pub const DEFAULT_PORT: u16 = 4352;
