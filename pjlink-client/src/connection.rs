use std::time::Duration;

use pjlink_rs_protocol::response::find_line;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::time::Instant;
use tracing::{debug, trace, warn};

use crate::error::{ClientError, Result};

const READ_CHUNK: usize = 1024;

/// Longest reply line accepted, marker included. Class 1 bodies stay far below this.
pub const MAX_LINE: usize = 4096;

enum Scan {
    Line(String),
    Pending,
    Overflow,
}

/// Look for a complete `marker ... \r` line in `pending`, discarding bytes
/// that can no longer be part of it.
fn scan(pending: &mut Vec<u8>, marker: &str) -> Scan {
    let needle = marker.as_bytes();
    let start = if needle.is_empty() {
        Some(0)
    } else {
        pending.windows(needle.len()).position(|w| w == needle)
    };

    let Some(start) = start else {
        let keep = needle.len().saturating_sub(1);
        let cut = pending.len().saturating_sub(keep);
        pending.drain(..cut);
        return Scan::Pending;
    };

    pending.drain(..start);
    match pending[needle.len()..].iter().position(|&b| b == b'\r') {
        Some(end) => {
            let text = String::from_utf8_lossy(&pending[..needle.len() + end + 1]);
            Scan::Line(find_line(&text, marker).unwrap_or_default().to_owned())
        }
        None if pending.len() > MAX_LINE => Scan::Overflow,
        None => Scan::Pending,
    }
}

/// One PJLink socket with a bounded wait on every read.
///
/// Any transport fault drops the stream; after that every call fails with
/// [`ClientError::NotReady`] until a new connection is made.
pub struct Connection<S = TcpStream> {
    stream: Option<S>,
    read_timeout: Duration,
}

impl Connection<TcpStream> {
    pub async fn connect(
        host: &str,
        port: u16,
        connect_timeout: Duration,
        read_timeout: Duration,
    ) -> Result<Self> {
        debug!(host, port, "TCP connecting");
        let addr = format!("{host}:{port}");
        let stream = tokio::time::timeout(connect_timeout, TcpStream::connect((host, port)))
            .await
            .map_err(|_| ClientError::ConnectTimeout {
                addr: addr.clone(),
                timeout: connect_timeout,
            })?
            .map_err(|source| ClientError::ConnectFailed { addr, source })?;

        stream.set_nodelay(true).ok();
        Ok(Self::new(stream, read_timeout))
    }
}

impl<S: AsyncRead + AsyncWrite + Unpin> Connection<S> {
    pub fn new(stream: S, read_timeout: Duration) -> Self {
        Self {
            stream: Some(stream),
            read_timeout,
        }
    }

    pub fn is_open(&self) -> bool {
        self.stream.is_some()
    }

    /// Write one command line in a single write call.
    ///
    /// A write that accepts fewer bytes than `data` closes the connection:
    /// the projector has no way to resynchronise on a partial line.
    pub async fn send(&mut self, data: &[u8]) -> Result<()> {
        let stream = self.stream.as_mut().ok_or(ClientError::NotReady("Closed"))?;
        trace!(line = ?String::from_utf8_lossy(data), "sending");

        let written = match stream.write(data).await {
            Ok(n) => n,
            Err(e) => return Err(self.abort(e)),
        };
        if written < data.len() {
            warn!(written, expected = data.len(), "short write, closing connection");
            self.stream = None;
            return Err(ClientError::ShortWrite {
                written,
                expected: data.len(),
            });
        }

        if let Err(e) = stream.flush().await {
            return Err(self.abort(e));
        }
        Ok(())
    }

    /// Read until a complete line introduced by `marker` has arrived and
    /// return the text between `marker` and its carriage return.
    ///
    /// The wait is bounded by the read timeout, measured from the start of
    /// this call. On expiry the connection is closed and the error tells
    /// silence ([`ClientError::NoAnswer`]) apart from unmatched data
    /// ([`ClientError::UnparsableAnswer`]). Bytes are not kept between calls.
    ///
    /// Only the tail that could still start `marker` is buffered while
    /// searching. A matched line longer than [`MAX_LINE`] fails at once.
    pub async fn receive_line(&mut self, marker: &str) -> Result<String> {
        let deadline = Instant::now() + self.read_timeout;
        let mut pending = Vec::new();
        let mut seen = 0usize;
        let mut chunk = [0u8; READ_CHUNK];

        loop {
            match scan(&mut pending, marker) {
                Scan::Line(line) => {
                    trace!(line = ?line, "received");
                    return Ok(line);
                }
                Scan::Overflow => {
                    warn!(marker, bytes = pending.len(), "reply line too long, closing connection");
                    self.stream = None;
                    return Err(self.unparsable(marker, &pending));
                }
                Scan::Pending => {}
            }

            let stream = self.stream.as_mut().ok_or(ClientError::NotReady("Closed"))?;
            let read = tokio::time::timeout_at(deadline, stream.read(&mut chunk)).await;

            match read {
                Ok(Ok(0)) => {
                    warn!("projector closed the connection");
                    self.stream = None;
                    return Err(ClientError::Disconnected);
                }
                Ok(Ok(n)) => {
                    seen += n;
                    pending.extend_from_slice(&chunk[..n]);
                }
                Ok(Err(e)) => return Err(self.abort(e)),
                Err(_) => {
                    warn!(timeout = ?self.read_timeout, marker, bytes = seen, "read timeout");
                    self.stream = None;
                    return Err(if seen == 0 {
                        ClientError::NoAnswer(self.read_timeout)
                    } else {
                        self.unparsable(marker, &pending)
                    });
                }
            }
        }
    }

    /// Release the socket. Safe to call repeatedly.
    pub async fn close(&mut self) {
        if let Some(mut stream) = self.stream.take() {
            stream.shutdown().await.ok();
        }
    }

    fn unparsable(&self, marker: &str, pending: &[u8]) -> ClientError {
        ClientError::UnparsableAnswer {
            expected: marker.to_owned(),
            received: String::from_utf8_lossy(pending).into_owned(),
            timeout: self.read_timeout,
        }
    }

    fn abort(&mut self, e: std::io::Error) -> ClientError {
        warn!(error = %e, "projector may have aborted the connection");
        self.stream = None;
        ClientError::Io(e)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::ScriptedStream;
    use pjlink_rs_protocol::ErrorCode;
    use tokio::net::TcpListener;
    use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};

    async fn setup_pair(read_timeout: Duration) -> (Connection, OwnedWriteHalf, OwnedReadHalf) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        let (client_stream, server_accept) =
            tokio::join!(async { TcpStream::connect(addr).await.unwrap() }, async {
                listener.accept().await.unwrap()
            });

        let (server_read, server_write) = server_accept.0.into_split();
        (
            Connection::new(client_stream, read_timeout),
            server_write,
            server_read,
        )
    }

    #[tokio::test]
    async fn send_command_line() {
        let (mut conn, _server_write, mut server_read) = setup_pair(Duration::from_secs(5)).await;

        conn.send(b"%1POWR ?\r").await.unwrap();

        let mut buf = vec![0u8; 64];
        let n = server_read.read(&mut buf).await.unwrap();
        assert_eq!(&buf[..n], b"%1POWR ?\r");
    }

    #[tokio::test]
    async fn receive_line_after_noise() {
        let (mut conn, mut server_write, _server_read) = setup_pair(Duration::from_secs(5)).await;

        server_write.write_all(b"junk%1POWR=1\r").await.unwrap();

        let body = conn.receive_line("%1POWR=").await.unwrap();
        assert_eq!(body, "1");
        assert!(conn.is_open());
    }

    #[tokio::test]
    async fn receive_line_across_segments() {
        let (mut conn, mut server_write, _server_read) = setup_pair(Duration::from_secs(5)).await;

        let server_task = tokio::spawn(async move {
            server_write.write_all(b"%1LA").await.unwrap();
            server_write.flush().await.unwrap();
            tokio::time::sleep(Duration::from_millis(10)).await;
            server_write.write_all(b"MP=1000 1").await.unwrap();
            server_write.flush().await.unwrap();
            tokio::time::sleep(Duration::from_millis(10)).await;
            server_write.write_all(b"\r").await.unwrap();
            server_write
        });

        let body = conn.receive_line("%1LAMP=").await.unwrap();
        assert_eq!(body, "1000 1");

        server_task.await.unwrap();
    }

    #[tokio::test]
    async fn silence_is_no_answer() {
        let (mut conn, _server_write, _server_read) =
            setup_pair(Duration::from_millis(50)).await;

        let err = conn.receive_line("%1POWR=").await.unwrap_err();
        assert!(matches!(err, ClientError::NoAnswer(_)));
        assert_eq!(err.code(), ErrorCode::NoAnswer);
        assert!(!conn.is_open());
    }

    #[tokio::test]
    async fn unmatched_data_is_unparsable() {
        let (mut conn, mut server_write, _server_read) =
            setup_pair(Duration::from_millis(50)).await;

        server_write.write_all(b"%1INPT=11\r").await.unwrap();

        let err = conn.receive_line("%1POWR=").await.unwrap_err();
        assert_eq!(err.code(), ErrorCode::UnparsableAnswer);
        match err {
            ClientError::UnparsableAnswer { received, .. } => {
                assert!(!received.is_empty());
                assert!("%1INPT=11\r".ends_with(&received));
            }
            other => panic!("unexpected error: {other:?}"),
        }
        assert!(!conn.is_open());
    }

    #[tokio::test]
    async fn reply_found_after_long_noise() {
        let (mut conn, mut server_write, _server_read) = setup_pair(Duration::from_secs(5)).await;

        let server_task = tokio::spawn(async move {
            let noise = vec![b'x'; 64 * 1024];
            server_write.write_all(&noise).await.unwrap();
            server_write.write_all(b"%1PO").await.unwrap();
            server_write.flush().await.unwrap();
            tokio::time::sleep(Duration::from_millis(10)).await;
            server_write.write_all(b"WR=1\r").await.unwrap();
            server_write
        });

        assert_eq!(conn.receive_line("%1POWR=").await.unwrap(), "1");
        server_task.await.unwrap();
    }

    #[test]
    fn scan_keeps_only_marker_tail() {
        let mut pending = b"noise noise %1PO".to_vec();
        assert!(matches!(scan(&mut pending, "%1POWR="), Scan::Pending));
        assert_eq!(pending, b"e %1PO");

        pending.extend_from_slice(b"WR=3\r%1INPT=11\r");
        match scan(&mut pending, "%1POWR=") {
            Scan::Line(line) => assert_eq!(line, "3"),
            _ => panic!("expected a line"),
        }
    }

    #[tokio::test]
    async fn oversized_line_fails_without_waiting() {
        let (mut conn, mut server_write, _server_read) = setup_pair(Duration::from_secs(30)).await;

        let mut line = b"%1NAME=".to_vec();
        line.extend(std::iter::repeat_n(b'A', MAX_LINE));
        server_write.write_all(&line).await.unwrap();

        let started = std::time::Instant::now();
        let err = conn.receive_line("%1NAME=").await.unwrap_err();
        assert_eq!(err.code(), ErrorCode::UnparsableAnswer);
        assert!(started.elapsed() < Duration::from_secs(5));
        assert!(!conn.is_open());
    }

    #[tokio::test]
    async fn prefix_without_terminator_is_unparsable() {
        let (mut conn, mut server_write, _server_read) =
            setup_pair(Duration::from_millis(50)).await;

        server_write.write_all(b"%1POWR=1").await.unwrap();

        let err = conn.receive_line("%1POWR=").await.unwrap_err();
        assert_eq!(err.code(), ErrorCode::UnparsableAnswer);
    }

    #[tokio::test]
    async fn peer_close_is_disconnected() {
        let (mut conn, server_write, server_read) = setup_pair(Duration::from_secs(5)).await;
        drop(server_write);
        drop(server_read);

        let err = conn.receive_line("%1POWR=").await.unwrap_err();
        assert!(matches!(err, ClientError::Disconnected));
        assert_eq!(err.code(), ErrorCode::ConnectionAborted);
        assert!(!conn.is_open());
    }

    #[tokio::test]
    async fn short_write_closes() {
        let mut stream = ScriptedStream::new(b"");
        stream.write_limit = Some(4);
        let mut conn = Connection::new(stream, Duration::from_secs(5));

        let err = conn.send(b"%1POWR 1\r").await.unwrap_err();
        assert!(matches!(
            err,
            ClientError::ShortWrite {
                written: 4,
                expected: 9
            }
        ));
        assert_eq!(err.code(), ErrorCode::ShortWrite);
        assert!(!conn.is_open());

        let err = conn.send(b"%1POWR 1\r").await.unwrap_err();
        assert!(matches!(err, ClientError::NotReady(_)));
    }

    #[tokio::test]
    async fn aborted_write_closes() {
        let mut stream = ScriptedStream::new(b"");
        stream.write_error = Some(std::io::ErrorKind::ConnectionAborted);
        let mut conn = Connection::new(stream, Duration::from_secs(5));

        let err = conn.send(b"%1POWR ?\r").await.unwrap_err();
        assert_eq!(err.code(), ErrorCode::ConnectionAborted);
        assert!(!conn.is_open());
    }

    #[tokio::test]
    async fn each_wait_gets_its_own_window() {
        let (mut conn, mut server_write, _server_read) =
            setup_pair(Duration::from_millis(150)).await;

        let server_task = tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(100)).await;
            server_write.write_all(b"%1POWR=1\r").await.unwrap();
            tokio::time::sleep(Duration::from_millis(100)).await;
            server_write.write_all(b"%1AVMT=31\r").await.unwrap();
            server_write
        });

        assert_eq!(conn.receive_line("%1POWR=").await.unwrap(), "1");
        assert_eq!(conn.receive_line("%1AVMT=").await.unwrap(), "31");

        server_task.await.unwrap();
    }

    #[tokio::test]
    async fn close_is_idempotent() {
        let (mut conn, _server_write, _server_read) = setup_pair(Duration::from_secs(5)).await;
        conn.close().await;
        assert!(!conn.is_open());
        conn.close().await;
        assert!(!conn.is_open());
    }

    #[tokio::test]
    async fn connect_refused() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        drop(listener);

        let result = Connection::connect(
            "127.0.0.1",
            port,
            Duration::from_secs(5),
            Duration::from_secs(5),
        )
        .await;
        let err = result.err().unwrap();
        assert_eq!(err.code(), ErrorCode::ConnectFailed);
    }
}
