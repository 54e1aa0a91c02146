//! Async PJLink client for networked projectors.
//!
//! Open a session, then query or control power, shutter, input, lamps
//! and error status. One [`Projector`] per device; sessions are independent.

mod client;
mod connection;
pub mod error;
#[cfg(test)]
mod mock;
mod state;

pub use client::Projector;
pub use error::{ClientError, Result};
pub use state::{ClientConfig, SessionState};

pub use pjlink_rs_protocol::{
    Command, CommandName, ErrorCode, ErrorStatus, InputKey, InputSource, LampInfo, PowerKey,
    PowerState, ShutterKey, ShutterState, StandardError, StatusLevel,
};
