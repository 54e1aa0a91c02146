use std::collections::HashMap;
use std::io;
use std::net::SocketAddr;
use std::pin::Pin;
use std::sync::{Arc, Mutex};
use std::task::{Context, Poll};
use std::time::Duration;

use pjlink_rs_protocol::{Command, CommandName, Greeting, Response, StandardError};
use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncWrite, AsyncWriteExt, BufReader, ReadBuf};
use tokio::net::TcpListener;

/// What the mock projector does when it receives a given command line.
#[derive(Clone, Debug)]
pub enum MockReply {
    /// Framed as `%1NAME=body\r`.
    Body(String),
    /// Sent verbatim.
    Raw(Vec<u8>),
    /// A framed body sent in two segments with a pause in between.
    Split(String),
    /// Never answer.
    Silent,
    /// Drop the connection.
    Close,
}

pub struct MockConfig {
    /// `None` keeps the projector silent after accept.
    pub greeting: Option<Vec<u8>>,
    /// Keyed by command line without the trailing `\r`, e.g. `"%1POWR ?"`.
    pub replies: HashMap<String, MockReply>,
}

impl MockConfig {
    pub fn no_auth() -> Self {
        Self {
            greeting: Some(Greeting::NoAuth.to_bytes()),
            replies: HashMap::new(),
        }
    }

    pub fn with_greeting(greeting: &[u8]) -> Self {
        Self {
            greeting: Some(greeting.to_vec()),
            replies: HashMap::new(),
        }
    }

    pub fn reply(mut self, line: &str, reply: MockReply) -> Self {
        self.replies.insert(line.to_owned(), reply);
        self
    }

    pub fn body(self, line: &str, body: &str) -> Self {
        self.reply(line, MockReply::Body(body.to_owned()))
    }
}

pub struct MockServer {
    addr: SocketAddr,
    received: Arc<Mutex<Vec<String>>>,
}

impl MockServer {
    pub async fn start(config: MockConfig) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let received = Arc::new(Mutex::new(Vec::new()));

        let log = received.clone();
        tokio::spawn(async move {
            Self::handle_connections(listener, config, log).await;
        });

        Self { addr, received }
    }

    pub fn port(&self) -> u16 {
        self.addr.port()
    }

    /// Command lines received so far, without the trailing `\r`.
    pub fn received(&self) -> Vec<String> {
        self.received.lock().unwrap().clone()
    }

    async fn handle_connections(
        listener: TcpListener,
        config: MockConfig,
        received: Arc<Mutex<Vec<String>>>,
    ) {
        loop {
            let Ok((stream, _)) = listener.accept().await else {
                return;
            };

            let (read_half, mut write_half) = stream.into_split();
            let mut reader = BufReader::new(read_half);

            if let Some(greeting) = &config.greeting {
                if write_half.write_all(greeting).await.is_err() {
                    continue;
                }
            }

            let mut line = Vec::new();
            loop {
                line.clear();
                let n = match reader.read_until(b'\r', &mut line).await {
                    Ok(n) => n,
                    Err(_) => break,
                };
                if n == 0 {
                    break;
                }

                let text = String::from_utf8_lossy(&line)
                    .trim_end_matches('\r')
                    .to_owned();
                received.lock().unwrap().push(text.clone());

                let Ok(cmd) = Command::parse(&text) else {
                    continue;
                };
                let reply = config
                    .replies
                    .get(&text)
                    .cloned()
                    .unwrap_or(MockReply::Raw(
                        Response::StandardError(StandardError::UndefinedCommand)
                            .to_bytes(cmd.name()),
                    ));

                let written = match reply {
                    MockReply::Body(body) => {
                        write_half
                            .write_all(&Response::Payload(body).to_bytes(cmd.name()))
                            .await
                    }
                    MockReply::Raw(bytes) => write_half.write_all(&bytes).await,
                    MockReply::Split(body) => {
                        Self::write_split(&mut write_half, cmd.name(), body).await
                    }
                    MockReply::Silent => Ok(()),
                    MockReply::Close => break,
                };
                if written.is_err() {
                    break;
                }
            }
        }
    }

    async fn write_split<W: AsyncWrite + Unpin>(
        writer: &mut W,
        name: CommandName,
        body: String,
    ) -> io::Result<()> {
        let bytes = Response::Payload(body).to_bytes(name);
        let (head, tail) = bytes.split_at(bytes.len() / 2);
        writer.write_all(head).await?;
        writer.flush().await?;
        tokio::time::sleep(Duration::from_millis(20)).await;
        writer.write_all(tail).await?;
        writer.flush().await
    }
}

/// In-memory stream with scripted inbound bytes and a faulty write side.
pub struct ScriptedStream {
    inbound: Vec<u8>,
    /// Max bytes accepted by a single write; `None` accepts everything.
    pub write_limit: Option<usize>,
    /// Fail every write with this kind.
    pub write_error: Option<io::ErrorKind>,
    pub written: Vec<u8>,
}

impl ScriptedStream {
    pub fn new(inbound: &[u8]) -> Self {
        Self {
            inbound: inbound.to_vec(),
            write_limit: None,
            write_error: None,
            written: Vec::new(),
        }
    }
}

impl AsyncRead for ScriptedStream {
    fn poll_read(
        mut self: Pin<&mut Self>,
        _cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        if self.inbound.is_empty() {
            // Nothing scripted: behave like a silent peer.
            return Poll::Pending;
        }
        let n = self.inbound.len().min(buf.remaining());
        let chunk: Vec<u8> = self.inbound.drain(..n).collect();
        buf.put_slice(&chunk);
        Poll::Ready(Ok(()))
    }
}

impl AsyncWrite for ScriptedStream {
    fn poll_write(
        mut self: Pin<&mut Self>,
        _cx: &mut Context<'_>,
        buf: &[u8],
    ) -> Poll<io::Result<usize>> {
        if let Some(kind) = self.write_error {
            return Poll::Ready(Err(io::Error::from(kind)));
        }
        let n = self.write_limit.map_or(buf.len(), |limit| limit.min(buf.len()));
        self.written.extend_from_slice(&buf[..n]);
        Poll::Ready(Ok(n))
    }

    fn poll_flush(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Poll::Ready(Ok(()))
    }

    fn poll_shutdown(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Poll::Ready(Ok(()))
    }
}
