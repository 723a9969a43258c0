//! Bus transport for a Redis-compatible server, speaking RESP2 over TCP.
//!
//! Architecture:
//! - [`RedisTransport`] holds the [`BusConfig`] and opens sockets on demand.
//! - [`RedisConnection`] owns one socket in request/reply mode (`PUBLISH`).
//! - [`RedisSubscription`] owns the same socket after `SUBSCRIBE` and turns
//!   server pushes into [`Envelope`]s.
//!
//! Inbound bytes accumulate in a receive buffer and are decoded frame by frame,
//! because a single `read` may return half a push or several pushes at once.

use std::time::Duration;

use async_trait::async_trait;
use rover_core::protocol::messages::{Envelope, DATA_KIND};
use tokio::{
    io::{AsyncReadExt, AsyncWriteExt},
    net::TcpStream,
    time,
};
use tracing::{debug, info, warn};

use super::resp::{decode_value, encode_command, RespValue};
use super::{BusConnection, BusSubscription, BusTransport, ConnectivityError};
use crate::config::BusConfig;

/// Size of the temporary buffer for each socket read.
const READ_CHUNK: usize = 4096;

/// Opens connections to a Redis-compatible server.
#[derive(Debug, Clone)]
pub struct RedisTransport {
    config: BusConfig,
}

impl RedisTransport {
    pub fn new(config: BusConfig) -> Self {
        Self { config }
    }
}

#[async_trait]
impl BusTransport for RedisTransport {
    type Connection = RedisConnection;

    async fn connect(&self) -> Result<RedisConnection, ConnectivityError> {
        let addr = self.config.address();
        let timeout = self.config.connect_timeout();

        let stream = match time::timeout(timeout, TcpStream::connect(&addr)).await {
            Err(_) => return Err(ConnectivityError::Timeout(timeout)),
            Ok(Err(source)) => return Err(ConnectivityError::Unreachable { addr, source }),
            Ok(Ok(stream)) => stream,
        };
        stream.set_nodelay(true)?;

        let mut socket = RespSocket::new(stream, timeout);
        if let Some(password) = &self.config.password {
            let reply = match &self.config.username {
                Some(user) => {
                    socket
                        .request(&[b"AUTH", user.as_bytes(), password.as_bytes()])
                        .await?
                }
                None => socket.request(&[b"AUTH", password.as_bytes()]).await?,
            };
            if let RespValue::Error(msg) = reply {
                return Err(ConnectivityError::Rejected(msg));
            }
        }

        info!("connected to bus at {addr}");
        Ok(RedisConnection { socket })
    }
}

/// A request/reply connection used for publishing.
#[derive(Debug)]
pub struct RedisConnection {
    socket: RespSocket,
}

#[async_trait]
impl BusConnection for RedisConnection {
    type Subscription = RedisSubscription;

    async fn publish(&mut self, channel: &str, payload: &str) -> Result<(), ConnectivityError> {
        let reply = self
            .socket
            .request(&[b"PUBLISH", channel.as_bytes(), payload.as_bytes()])
            .await?;
        match reply {
            RespValue::Integer(receivers) => {
                debug!("published on {channel} to {receivers} subscriber(s)");
                Ok(())
            }
            RespValue::Error(msg) => Err(ConnectivityError::Rejected(msg)),
            other => Err(ConnectivityError::Protocol(format!(
                "unexpected PUBLISH reply: {other:?}"
            ))),
        }
    }

    async fn subscribe(mut self, channel: &str) -> Result<RedisSubscription, ConnectivityError> {
        self.socket
            .send(&[b"SUBSCRIBE", channel.as_bytes()])
            .await?;
        info!("subscribed to channel {channel}");
        Ok(RedisSubscription {
            socket: self.socket,
        })
    }
}

/// A connection in subscriber mode.
#[derive(Debug)]
pub struct RedisSubscription {
    socket: RespSocket,
}

#[async_trait]
impl BusSubscription for RedisSubscription {
    async fn receive(&mut self) -> Result<Envelope, ConnectivityError> {
        // Pushes arrive whenever the publisher sends, so there is no timeout here.
        let value = self.socket.read_value(None).await?;
        push_to_envelope(value)
    }
}

/// Converts a subscriber-mode push into an [`Envelope`].
///
/// `["message", channel, payload]` and `["pmessage", pattern, channel, payload]`
/// become data envelopes; any other array becomes a control envelope whose
/// kind is the first element.
fn push_to_envelope(value: RespValue) -> Result<Envelope, ConnectivityError> {
    let items = match value {
        RespValue::Array(Some(items)) if !items.is_empty() => items,
        RespValue::Error(msg) => return Err(ConnectivityError::Rejected(msg)),
        other => {
            return Err(ConnectivityError::Protocol(format!(
                "unexpected push in subscriber mode: {other:?}"
            )))
        }
    };

    let kind = text(&items[0]);
    let (channel, payload) = match (kind.as_str(), items.len()) {
        (DATA_KIND, 3) => (text(&items[1]), Some(text(&items[2]))),
        ("pmessage", 4) => (text(&items[2]), Some(text(&items[3]))),
        _ => (items.get(1).map(text).unwrap_or_default(), None),
    };

    Ok(match payload {
        Some(payload) => Envelope::data(channel, payload),
        None => Envelope::control(kind, channel),
    })
}

fn text(value: &RespValue) -> String {
    match value {
        RespValue::Integer(n) => n.to_string(),
        other => other
            .as_bytes()
            .map(|b| String::from_utf8_lossy(b).into_owned())
            .unwrap_or_default(),
    }
}

// ── Socket framing ────────────────────────────────────────────────────────────

/// A TCP stream plus the receive buffer used to reassemble RESP frames.
#[derive(Debug)]
struct RespSocket {
    stream: TcpStream,
    recv_buf: Vec<u8>,
    timeout: Duration,
}

impl RespSocket {
    fn new(stream: TcpStream, timeout: Duration) -> Self {
        Self {
            stream,
            recv_buf: Vec::with_capacity(READ_CHUNK),
            timeout,
        }
    }

    async fn send(&mut self, args: &[&[u8]]) -> Result<(), ConnectivityError> {
        let bytes = encode_command(args);
        match time::timeout(self.timeout, self.stream.write_all(&bytes)).await {
            Err(_) => Err(ConnectivityError::Timeout(self.timeout)),
            Ok(result) => result.map_err(write_error),
        }
    }

    /// Sends a command and waits (bounded by the timeout) for its reply.
    async fn request(&mut self, args: &[&[u8]]) -> Result<RespValue, ConnectivityError> {
        self.send(args).await?;
        let timeout = self.timeout;
        self.read_value(Some(timeout)).await
    }

    async fn read_value(
        &mut self,
        timeout: Option<Duration>,
    ) -> Result<RespValue, ConnectivityError> {
        loop {
            match decode_value(&self.recv_buf) {
                Ok(Some((value, used))) => {
                    self.recv_buf.drain(..used);
                    return Ok(value);
                }
                Ok(None) => {}
                Err(e) => {
                    warn!("discarding undecodable bus data: {e}");
                    self.recv_buf.clear();
                    return Err(ConnectivityError::Protocol(e.to_string()));
                }
            }

            let mut tmp = [0u8; READ_CHUNK];
            let read = self.stream.read(&mut tmp);
            let n = match timeout {
                Some(limit) => time::timeout(limit, read)
                    .await
                    .map_err(|_| ConnectivityError::Timeout(limit))?,
                None => read.await,
            }
            .map_err(read_error)?;

            if n == 0 {
                return Err(ConnectivityError::Disconnected);
            }
            self.recv_buf.extend_from_slice(&tmp[..n]);
        }
    }
}

fn read_error(e: std::io::Error) -> ConnectivityError {
    match e.kind() {
        std::io::ErrorKind::UnexpectedEof | std::io::ErrorKind::ConnectionReset => {
            ConnectivityError::Disconnected
        }
        _ => ConnectivityError::Io(e),
    }
}

fn write_error(e: std::io::Error) -> ConnectivityError {
    match e.kind() {
        std::io::ErrorKind::BrokenPipe | std::io::ErrorKind::ConnectionReset => {
            ConnectivityError::Disconnected
        }
        _ => ConnectivityError::Io(e),
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::net::TcpListener;

    fn bulk(s: &str) -> RespValue {
        RespValue::Bulk(Some(s.as_bytes().to_vec()))
    }

    /// Binds a one-shot fake server on an ephemeral port.
    async fn fake_server() -> (TcpListener, BusConfig) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        let config = BusConfig {
            port,
            connect_timeout_ms: 500,
            ..Default::default()
        };
        (listener, config)
    }

    /// Reads from `stream` until `expected` bytes have arrived.
    async fn read_exact_len(stream: &mut TcpStream, expected: usize) -> Vec<u8> {
        let mut buf = vec![0u8; expected];
        stream.read_exact(&mut buf).await.unwrap();
        buf
    }

    #[test]
    fn test_message_push_becomes_data_envelope() {
        let push = RespValue::Array(Some(vec![
            bulk("message"),
            bulk("remotecommands"),
            bulk("{\"stop\":true}"),
        ]));
        let env = push_to_envelope(push).unwrap();
        assert_eq!(env, Envelope::data("remotecommands", "{\"stop\":true}"));
    }

    #[test]
    fn test_pmessage_push_uses_real_channel() {
        let push = RespValue::Array(Some(vec![
            bulk("pmessage"),
            bulk("remote*"),
            bulk("remotecommands"),
            bulk("{}"),
        ]));
        let env = push_to_envelope(push).unwrap();
        assert_eq!(env.channel, "remotecommands");
        assert_eq!(env.data.as_deref(), Some("{}"));
    }

    #[test]
    fn test_subscribe_confirmation_becomes_control_envelope() {
        let push = RespValue::Array(Some(vec![
            bulk("subscribe"),
            bulk("remotecommands"),
            RespValue::Integer(1),
        ]));
        let env = push_to_envelope(push).unwrap();
        assert_eq!(env, Envelope::control("subscribe", "remotecommands"));
        assert!(!env.is_data());
    }

    #[test]
    fn test_error_push_is_rejected() {
        let err = push_to_envelope(RespValue::Error("ERR nope".into())).unwrap_err();
        assert!(matches!(err, ConnectivityError::Rejected(m) if m == "ERR nope"));
    }

    #[tokio::test]
    async fn test_connect_to_closed_port_is_unreachable() {
        // Arrange – bind then drop to obtain a port nobody listens on
        let (listener, config) = fake_server().await;
        drop(listener);

        // Act
        let result = RedisTransport::new(config).connect().await;

        // Assert
        assert!(matches!(
            result,
            Err(ConnectivityError::Unreachable { .. })
        ));
    }

    #[tokio::test]
    async fn test_publish_sends_command_and_accepts_integer_reply() {
        // Arrange
        let (listener, config) = fake_server().await;
        let expected = encode_command(&[b"PUBLISH", b"remotecommands", b"{}"]);
        let expected_len = expected.len();
        let server = tokio::spawn(async move {
            let (mut stream, _) = listener.accept().await.unwrap();
            let received = read_exact_len(&mut stream, expected_len).await;
            stream.write_all(b":1\r\n").await.unwrap();
            received
        });

        // Act
        let mut conn = RedisTransport::new(config).connect().await.unwrap();
        conn.publish("remotecommands", "{}").await.unwrap();

        // Assert
        assert_eq!(server.await.unwrap(), expected);
    }

    #[tokio::test]
    async fn test_auth_error_reply_is_rejected() {
        // Arrange
        let (listener, mut config) = fake_server().await;
        config.password = Some("wrong".into());
        let auth_len = encode_command(&[b"AUTH", b"wrong"]).len();
        tokio::spawn(async move {
            let (mut stream, _) = listener.accept().await.unwrap();
            read_exact_len(&mut stream, auth_len).await;
            stream
                .write_all(b"-WRONGPASS invalid username-password pair\r\n")
                .await
                .unwrap();
        });

        // Act
        let result = RedisTransport::new(config).connect().await;

        // Assert
        assert!(matches!(result, Err(ConnectivityError::Rejected(_))));
    }

    #[tokio::test]
    async fn test_publish_without_reply_times_out() {
        // Arrange – server accepts but never answers
        let (listener, config) = fake_server().await;
        let server = tokio::spawn(async move {
            let (stream, _) = listener.accept().await.unwrap();
            time::sleep(Duration::from_secs(2)).await;
            drop(stream);
        });

        // Act
        let mut conn = RedisTransport::new(config).connect().await.unwrap();
        let result = conn.publish("remotecommands", "{}").await;

        // Assert
        assert!(matches!(result, Err(ConnectivityError::Timeout(_))));
        server.abort();
    }

    #[tokio::test]
    async fn test_subscription_yields_split_pushes_in_order() {
        // Arrange – deliver the confirmation and a message in awkward chunks
        let (listener, config) = fake_server().await;
        let sub_len = encode_command(&[b"SUBSCRIBE", b"remotecommands"]).len();
        tokio::spawn(async move {
            let (mut stream, _) = listener.accept().await.unwrap();
            read_exact_len(&mut stream, sub_len).await;
            let bytes: &[u8] = b"*3\r\n$9\r\nsubscribe\r\n$14\r\nremotecommands\r\n:1\r\n\
*3\r\n$7\r\nmessage\r\n$14\r\nremotecommands\r\n$13\r\n{\"stop\":true}\r\n";
            for chunk in bytes.chunks(7) {
                stream.write_all(chunk).await.unwrap();
                stream.flush().await.unwrap();
            }
        });

        // Act
        let conn = RedisTransport::new(config).connect().await.unwrap();
        let mut sub = conn.subscribe("remotecommands").await.unwrap();
        let first = sub.receive().await.unwrap();
        let second = sub.receive().await.unwrap();
        let third = sub.receive().await;

        // Assert
        assert_eq!(first, Envelope::control("subscribe", "remotecommands"));
        assert_eq!(second, Envelope::data("remotecommands", "{\"stop\":true}"));
        assert!(matches!(third, Err(ConnectivityError::Disconnected)));
    }
}
