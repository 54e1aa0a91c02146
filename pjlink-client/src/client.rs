use pjlink_rs_protocol::catalog::{self, ErrorStatus, InputKey, LampInfo, PowerState, ShutterState};
use pjlink_rs_protocol::response::GREETING_MARKER;
use pjlink_rs_protocol::{Command, CommandName, ErrorCode, Greeting, PowerKey, Response, ShutterKey};
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::net::TcpStream;
use tracing::{debug, info, warn};

use crate::connection::Connection;
use crate::error::{ClientError, Result};
use crate::state::{ClientConfig, SessionState};

/// Queried in this order by [`Projector::identification`].
const IDENTIFICATION: [CommandName; 4] = [
    CommandName::NAME,
    CommandName::MANUFACTURER,
    CommandName::PRODUCT_NAME,
    CommandName::OTHER_INFO,
];

/// Async PJLink client for one projector.
///
/// One command is in flight at a time: every operation takes `&mut self`
/// and completes its exchange before returning. Failures are never retried.
/// Transport faults close the socket; device errors (`ERR1`..`ERR4`) and
/// malformed payloads leave the session usable.
///
/// # Example
///
/// ```no_run
/// # async fn example() -> pjlink_rs_client::Result<()> {
/// use pjlink_rs_client::{Projector, ShutterKey};
///
/// let mut projector = Projector::new("192.168.0.8");
/// projector.open().await?;
/// projector.set_shutter(ShutterKey::Close).await?;
///
/// for (i, lamp) in projector.lamps().await?.iter().enumerate() {
///     println!("lamp {}: {} h, on={}", i + 1, lamp.hours, lamp.on);
/// }
/// projector.close().await;
/// # Ok(())
/// # }
/// ```
pub struct Projector<S = TcpStream> {
    host: String,
    config: ClientConfig,
    connection: Option<Connection<S>>,
    state: SessionState,
    last_error: Option<ErrorCode>,
}

impl Projector<TcpStream> {
    /// A projector at `host` on the default PJLink port. No connection is made yet.
    pub fn new(host: impl Into<String>) -> Self {
        Self::from_parts(host, ClientConfig::default())
    }

    pub fn with_config(host: impl Into<String>, config: ClientConfig) -> Self {
        Self::from_parts(host, config)
    }

    /// Connect over TCP and perform the no-auth handshake.
    ///
    /// On success the projector is [`SessionState::Ready`]. An already open
    /// session is closed first.
    pub async fn open(&mut self) -> Result<()> {
        self.close().await;
        info!(host = %self.host, port = self.config.port, "connecting");
        let result = match Connection::connect(
            &self.host,
            self.config.port,
            self.config.connect_timeout,
            self.config.read_timeout,
        )
        .await
        {
            Ok(connection) => self.handshake(connection).await,
            Err(e) => Err(e),
        };
        self.record(result)
    }
}

impl<S: AsyncRead + AsyncWrite + Unpin> Projector<S> {
    /// A closed projector for any stream type; pair with [`open_stream`](Self::open_stream).
    pub fn from_parts(host: impl Into<String>, config: ClientConfig) -> Self {
        Self {
            host: host.into(),
            config,
            connection: None,
            state: SessionState::Closed,
            last_error: None,
        }
    }

    /// Perform the handshake over an already connected stream.
    pub async fn open_stream(&mut self, stream: S) -> Result<()> {
        self.close().await;
        let connection = Connection::new(stream, self.config.read_timeout);
        let result = self.handshake(connection).await;
        self.record(result)
    }

    /// Release the socket. Safe to call in any state, including never opened.
    pub async fn close(&mut self) {
        if let Some(mut connection) = self.connection.take() {
            info!(host = %self.host, "closing");
            connection.close().await;
        }
        self.state = SessionState::Closed;
    }

    // -- Accessors --

    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Outcome of the immediately preceding operation: `None` if it
    /// succeeded. Every operation overwrites it.
    pub fn last_error(&self) -> Option<ErrorCode> {
        self.last_error
    }

    // -- Setters --

    pub async fn set_power(&mut self, key: PowerKey) -> Result<()> {
        let result = self.exchange(&Command::power(key)).await.map(drop);
        self.record(result)
    }

    pub async fn set_shutter(&mut self, key: ShutterKey) -> Result<()> {
        let result = self.exchange(&Command::shutter(key)).await.map(drop);
        self.record(result)
    }

    /// Switch input. An input the projector lacks is reported as
    /// [`ErrorCode::OutOfParameter`].
    pub async fn set_input(&mut self, key: InputKey) -> Result<()> {
        let result = self.exchange(&Command::input(key)).await.map(drop);
        self.record(result)
    }

    // -- Getters --

    pub async fn power_state(&mut self) -> Result<PowerState> {
        let result = self.query(CommandName::POWER, PowerState::parse).await;
        self.record(result)
    }

    pub async fn shutter_state(&mut self) -> Result<ShutterState> {
        let result = self.query(CommandName::AV_MUTE, ShutterState::parse).await;
        self.record(result)
    }

    pub async fn input(&mut self) -> Result<InputKey> {
        let result = self.query(CommandName::INPUT, InputKey::parse).await;
        self.record(result)
    }

    /// Inputs the projector offers, in the order it reports them.
    pub async fn available_inputs(&mut self) -> Result<Vec<InputKey>> {
        let result = self.query(CommandName::INPUT_LIST, catalog::parse_inputs).await;
        self.record(result)
    }

    /// Lighting hours and on/off state for each lamp (up to 8).
    pub async fn lamps(&mut self) -> Result<Vec<LampInfo>> {
        let result = self.query(CommandName::LAMP, catalog::parse_lamps).await;
        self.record(result)
    }

    pub async fn error_status(&mut self) -> Result<ErrorStatus> {
        let result = self.query(CommandName::ERROR_STATUS, ErrorStatus::parse).await;
        self.record(result)
    }

    /// PJLink class supported by the projector.
    pub async fn class(&mut self) -> Result<u8> {
        let result = self.query(CommandName::CLASS, catalog::parse_class).await;
        self.record(result)
    }

    pub async fn name(&mut self) -> Result<String> {
        self.text(CommandName::NAME).await
    }

    pub async fn manufacturer(&mut self) -> Result<String> {
        self.text(CommandName::MANUFACTURER).await
    }

    pub async fn product_name(&mut self) -> Result<String> {
        self.text(CommandName::PRODUCT_NAME).await
    }

    pub async fn other_info(&mut self) -> Result<String> {
        self.text(CommandName::OTHER_INFO).await
    }

    /// Name, manufacturer, product name and other info joined by spaces.
    ///
    /// Each query runs independently; a failed one is logged and skipped.
    /// A transport fault ends the sequence, since the session is gone.
    /// Fails only when nothing was collected, with the last failure.
    pub async fn identification(&mut self) -> Result<String> {
        let mut parts = Vec::with_capacity(IDENTIFICATION.len());
        let mut last_failure = None;

        for name in IDENTIFICATION {
            match self.query(name, |body| Ok(catalog::parse_text(body))).await {
                Ok(text) if text.is_empty() => {}
                Ok(text) => parts.push(text),
                Err(e) => {
                    warn!(command = %name, code = %e.code(), error = %e, "identification query failed");
                    last_failure = Some(e);
                }
            }
            if self.state != SessionState::Ready {
                break;
            }
        }

        let result = match last_failure {
            Some(e) if parts.is_empty() => Err(e),
            _ => Ok(parts.join(" ")),
        };
        self.record(result)
    }

    /// Run an arbitrary command and return the classified reply body.
    pub async fn execute(&mut self, command: &Command) -> Result<String> {
        let result = self.exchange(command).await;
        self.record(result)
    }

    // -- Private helpers --

    async fn handshake(&mut self, mut connection: Connection<S>) -> Result<()> {
        let rest = connection.receive_line(GREETING_MARKER).await?;
        match Greeting::parse(&rest)? {
            Greeting::NoAuth => {
                info!(host = %self.host, "connected");
                self.connection = Some(connection);
                self.state = SessionState::Ready;
                Ok(())
            }
            Greeting::PasswordRequired => {
                warn!(host = %self.host, "projector requires a password");
                self.connection = Some(connection);
                self.state = SessionState::AwaitingAuth;
                Err(ClientError::PasswordRequired)
            }
        }
    }

    async fn text(&mut self, name: CommandName) -> Result<String> {
        let result = self.query(name, |body| Ok(catalog::parse_text(body))).await;
        self.record(result)
    }

    async fn query<T>(
        &mut self,
        name: CommandName,
        parse: impl FnOnce(&str) -> pjlink_rs_protocol::Result<T>,
    ) -> Result<T> {
        let body = self.exchange(&Command::query(name)).await?;
        Ok(parse(&body)?)
    }

    /// Send one command and wait for its reply. Transport faults drop the
    /// session to `Closed`.
    async fn exchange(&mut self, command: &Command) -> Result<String> {
        if self.state != SessionState::Ready {
            return Err(ClientError::NotReady(self.state.as_str()));
        }
        let connection = self
            .connection
            .as_mut()
            .ok_or(ClientError::NotReady(SessionState::Closed.as_str()))?;

        debug!(command = %command.name(), argument = command.argument().as_str(), "exchange");
        let result = Self::round_trip(connection, command).await;

        if !connection.is_open() {
            self.connection = None;
            self.state = SessionState::Closed;
        }

        Response::classify(&result?)
            .into_payload()
            .map_err(ClientError::Projector)
    }

    async fn round_trip(connection: &mut Connection<S>, command: &Command) -> Result<String> {
        connection.send(&command.to_bytes()).await?;
        connection
            .receive_line(&command.name().reply_prefix())
            .await
    }

    fn record<T>(&mut self, result: Result<T>) -> Result<T> {
        self.last_error = result.as_ref().err().map(ClientError::code);
        if let Err(e) = &result {
            debug!(code = %e.code(), error = %e, "operation failed");
        }
        result
    }
}
