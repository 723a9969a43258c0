//! In-process bus with the same observable behaviour as the Redis transport.
//!
//! Every [`MemoryBus`] clone shares one broadcast channel.  Connections and
//! subscriptions behave like sockets to a single server:
//!
//! - [`MemoryBus::sever`] simulates the server going away.  Every existing
//!   connection and subscription fails with [`ConnectivityError::Disconnected`]
//!   and new connects fail with [`ConnectivityError::Unreachable`].
//! - [`MemoryBus::restore`] brings the server back.  Old connections stay dead;
//!   callers must reconnect, just as with a real socket.
//! - [`MemoryBus::inject`] delivers an arbitrary envelope (for example a
//!   control notification or a malformed payload) to every subscriber.

use std::sync::{
    atomic::{AtomicBool, AtomicU64, Ordering},
    Arc,
};

use async_trait::async_trait;
use rover_core::protocol::messages::Envelope;
use tokio::sync::broadcast;
use tracing::warn;

use super::{BusConnection, BusSubscription, BusTransport, ConnectivityError};

/// Number of frames a slow subscriber may fall behind before it lags.
const BUS_CAPACITY: usize = 1024;

#[derive(Debug, Clone)]
enum BusFrame {
    Envelope(Envelope),
    Severed,
}

#[derive(Debug)]
struct BusInner {
    tx: broadcast::Sender<BusFrame>,
    online: AtomicBool,
    generation: AtomicU64,
    published: AtomicU64,
}

/// A shared in-memory publish/subscribe bus.
#[derive(Debug, Clone)]
pub struct MemoryBus {
    inner: Arc<BusInner>,
}

impl Default for MemoryBus {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryBus {
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(BUS_CAPACITY);
        Self {
            inner: Arc::new(BusInner {
                tx,
                online: AtomicBool::new(true),
                generation: AtomicU64::new(0),
                published: AtomicU64::new(0),
            }),
        }
    }

    /// Drops every live connection and refuses new ones until [`restore`](Self::restore).
    pub fn sever(&self) {
        self.inner.online.store(false, Ordering::SeqCst);
        self.inner.generation.fetch_add(1, Ordering::SeqCst);
        let _ = self.inner.tx.send(BusFrame::Severed);
    }

    /// Accepts new connections again.
    pub fn restore(&self) {
        self.inner.online.store(true, Ordering::SeqCst);
    }

    pub fn is_online(&self) -> bool {
        self.inner.online.load(Ordering::SeqCst)
    }

    /// Delivers `envelope` to every current subscriber.
    pub fn inject(&self, envelope: Envelope) {
        let _ = self.inner.tx.send(BusFrame::Envelope(envelope));
    }

    /// Total number of successful publishes since creation.
    pub fn published_count(&self) -> u64 {
        self.inner.published.load(Ordering::SeqCst)
    }

    fn generation(&self) -> u64 {
        self.inner.generation.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl BusTransport for MemoryBus {
    type Connection = MemoryConnection;

    async fn connect(&self) -> Result<MemoryConnection, ConnectivityError> {
        if !self.is_online() {
            return Err(ConnectivityError::Unreachable {
                addr: "memory".to_string(),
                source: std::io::Error::new(
                    std::io::ErrorKind::ConnectionRefused,
                    "in-memory bus is severed",
                ),
            });
        }
        Ok(MemoryConnection {
            bus: self.clone(),
            generation: self.generation(),
        })
    }
}

/// A connection to a [`MemoryBus`].
#[derive(Debug)]
pub struct MemoryConnection {
    bus: MemoryBus,
    generation: u64,
}

impl MemoryConnection {
    fn ensure_alive(&self) -> Result<(), ConnectivityError> {
        if !self.bus.is_online() || self.bus.generation() != self.generation {
            return Err(ConnectivityError::Disconnected);
        }
        Ok(())
    }
}

#[async_trait]
impl BusConnection for MemoryConnection {
    type Subscription = MemorySubscription;

    async fn publish(&mut self, channel: &str, payload: &str) -> Result<(), ConnectivityError> {
        self.ensure_alive()?;
        // No receivers is not an error; the message is simply lost.
        let _ = self
            .bus
            .inner
            .tx
            .send(BusFrame::Envelope(Envelope::data(channel, payload)));
        self.bus.inner.published.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn subscribe(self, channel: &str) -> Result<MemorySubscription, ConnectivityError> {
        self.ensure_alive()?;
        Ok(MemorySubscription {
            rx: self.bus.inner.tx.subscribe(),
            channel: channel.to_string(),
            confirmation: Some(Envelope::control("subscribe", channel)),
        })
    }
}

/// A subscription to one channel of a [`MemoryBus`].
#[derive(Debug)]
pub struct MemorySubscription {
    rx: broadcast::Receiver<BusFrame>,
    channel: String,
    confirmation: Option<Envelope>,
}

#[async_trait]
impl BusSubscription for MemorySubscription {
    async fn receive(&mut self) -> Result<Envelope, ConnectivityError> {
        if let Some(confirmation) = self.confirmation.take() {
            return Ok(confirmation);
        }
        loop {
            match self.rx.recv().await {
                Ok(BusFrame::Envelope(env)) if env.channel == self.channel => return Ok(env),
                Ok(BusFrame::Envelope(_)) => continue,
                Ok(BusFrame::Severed) => return Err(ConnectivityError::Disconnected),
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    warn!("subscriber on {} lagged; {skipped} frame(s) lost", self.channel);
                }
                Err(broadcast::error::RecvError::Closed) => {
                    return Err(ConnectivityError::Disconnected)
                }
            }
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
