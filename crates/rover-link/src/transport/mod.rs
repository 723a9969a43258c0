//! Publish/subscribe bus transport.
//!
//! # Shape of the abstraction
//!
//! ```text
//! BusTransport::connect()        -> BusConnection   (one TCP socket)
//! BusConnection::publish(ch, p)  -> ()              (fire-and-forget)
//! BusConnection::subscribe(ch)   -> BusSubscription (consumes the connection)
//! BusSubscription::receive()     -> Envelope        (blocks until the next push)
//! ```
//!
//! `subscribe` takes the connection by value because a subscribed connection
//! can no longer publish; the controller and the agent each open one
//! connection for publishing and a second one for listening.
//!
//! Two implementations are provided:
//!
//! - **`redis`** – RESP2 over TCP, for a real Redis-compatible server.
//! - **`memory`** – an in-process bus with the same semantics and fault
//!   injection, used by tests and local demos.

use std::time::Duration;

use async_trait::async_trait;
use rover_core::protocol::messages::Envelope;
use thiserror::Error;

pub mod memory;
pub mod redis;
pub mod resp;

pub use memory::MemoryBus;
pub use redis::RedisTransport;

/// The transport is unreachable or the connection dropped.
#[derive(Debug, Error)]
pub enum ConnectivityError {
    /// The TCP connection to the bus could not be established.
    #[error("failed to connect to bus at {addr}: {source}")]
    Unreachable {
        addr: String,
        #[source]
        source: std::io::Error,
    },
    /// A connect or publish round-trip exceeded the configured timeout.
    #[error("bus did not answer within {0:?}")]
    Timeout(Duration),
    /// The connection was closed while in use.
    #[error("connection to the bus was lost")]
    Disconnected,
    /// The server answered with an error reply (bad credentials, etc.).
    #[error("bus rejected the request: {0}")]
    Rejected(String),
    /// The server sent bytes that do not form a valid reply.
    #[error("bus protocol error: {0}")]
    Protocol(String),
    /// An I/O error occurred on an established connection.
    #[error("bus I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Factory for bus connections.
///
/// Holds the endpoint and credentials so that a dropped connection can be
/// replaced with an identical one.
#[async_trait]
pub trait BusTransport: Send + Sync + 'static {
    type Connection: BusConnection;

    /// Opens (and authenticates) a fresh connection.
    async fn connect(&self) -> Result<Self::Connection, ConnectivityError>;
}

/// An open, non-subscribed connection.
#[async_trait]
pub trait BusConnection: Send + 'static {
    type Subscription: BusSubscription;

    /// Publishes `payload` on `channel`.
    ///
    /// Succeeds even if nobody is listening; the message is simply lost.
    async fn publish(&mut self, channel: &str, payload: &str) -> Result<(), ConnectivityError>;

    /// Switches this connection into subscriber mode for `channel`.
    async fn subscribe(self, channel: &str) -> Result<Self::Subscription, ConnectivityError>;
}

/// A live subscription.  Its owner is the only reader.
#[async_trait]
pub trait BusSubscription: Send + 'static {
    /// Waits for the next envelope (data or control notification).
    async fn receive(&mut self) -> Result<Envelope, ConnectivityError>;
}

/// Connects and subscribes in one step.
///
/// # Errors
///
/// Returns [`ConnectivityError`] if either step fails.
pub async fn open_subscription<T: BusTransport>(
    transport: &T,
    channel: &str,
) -> Result<<T::Connection as BusConnection>::Subscription, ConnectivityError> {
    let connection = transport.connect().await?;
    connection.subscribe(channel).await
}
