//! Outbound queue and the periodic publisher that drains it.
//!
//! # How outbound messages flow (for beginners)
//!
//! Producers (operator input, the telemetry sampler) never talk to the bus
//! directly.  They push [`CommandMessage`]s into an [`OutboundQueue`]:
//!
//! - [`OutboundQueue::enqueue`] appends to the back.
//! - [`OutboundQueue::force`] throws away everything pending and leaves a
//!   single priority message.  An emergency stop uses this so it is not stuck
//!   behind a backlog of steering updates.
//!
//! An [`OutboundPublisher`] wakes on a fixed period, pops at most one message,
//! and publishes it.  If the bus is unreachable the message is **dropped**,
//! not retried: by the time the link is back, a stale steering command is
//! worse than a missing one.  The broken connection is discarded and the
//! next tick with something to send opens a fresh one.
//!
//! The queue mutex is a `std::sync::Mutex` and is never held across an
//! `.await`, so producers on plain threads can use it too.

use std::collections::VecDeque;
use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc, Mutex, MutexGuard, PoisonError,
};
use std::time::Duration;

use rover_core::{encode_command, CommandMessage};
use tokio::time::{self, MissedTickBehavior};
use tracing::{debug, info, warn};

use crate::transport::{BusConnection, BusTransport};

/// Default period between two publish attempts.
pub const DEFAULT_PUBLISH_INTERVAL: Duration = Duration::from_millis(10);

// ── Queue ─────────────────────────────────────────────────────────────────────

/// FIFO of messages waiting to be published, with a priority override.
#[derive(Debug, Default)]
pub struct OutboundQueue {
    pending: Mutex<VecDeque<CommandMessage>>,
}

impl OutboundQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends `message` to the back of the queue.
    pub fn enqueue(&self, message: CommandMessage) {
        self.lock().push_back(message);
    }

    /// Atomically discards every pending message and queues `message` alone.
    ///
    /// Returns the number of messages that were discarded.
    pub fn force(&self, message: CommandMessage) -> usize {
        let mut pending = self.lock();
        let discarded = pending.len();
        pending.clear();
        pending.push_back(message);
        discarded
    }

    /// Removes and returns the head of the queue.
    pub fn pop(&self) -> Option<CommandMessage> {
        self.lock().pop_front()
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    // A panic while holding the lock cannot leave the VecDeque half-updated.
    fn lock(&self) -> MutexGuard<'_, VecDeque<CommandMessage>> {
        self.pending.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

// ── Publisher ─────────────────────────────────────────────────────────────────

/// What a single [`OutboundPublisher::tick`] did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    /// The queue was empty.
    Idle,
    /// The head message was published.
    Published,
    /// The head message was lost to a connectivity failure.
    Dropped,
}

/// Drains an [`OutboundQueue`] onto the bus.
pub struct OutboundPublisher<T: BusTransport> {
    transport: T,
    connection: Option<T::Connection>,
    queue: Arc<OutboundQueue>,
    channel: String,
}

impl<T: BusTransport> OutboundPublisher<T> {
    /// Creates a publisher.  No connection is opened until the first tick.
    pub fn new(transport: T, queue: Arc<OutboundQueue>, channel: impl Into<String>) -> Self {
        Self {
            transport,
            connection: None,
            queue,
            channel: channel.into(),
        }
    }

    pub fn is_connected(&self) -> bool {
        self.connection.is_some()
    }

    /// Opens the publishing connection up front so that start-up failures
    /// surface before the tick loop begins.
    ///
    /// # Errors
    ///
    /// Returns the transport's [`ConnectivityError`](crate::ConnectivityError).
    pub async fn connect(&mut self) -> Result<(), crate::ConnectivityError> {
        self.connection = Some(self.transport.connect().await?);
        Ok(())
    }

    /// Pops at most one message and publishes it.
    ///
    /// On a connectivity failure the message is dropped and the broken
    /// connection is discarded.  The next tick that has something to send
    /// opens a fresh connection.
    pub async fn tick(&mut self) -> TickOutcome {
        let Some(message) = self.queue.pop() else {
            return TickOutcome::Idle;
        };
        let payload = encode_command(&message);

        if self.connection.is_none() {
            if let Err(e) = self.connect().await {
                warn!("bus unreachable, dropping outbound message: {e}");
                return TickOutcome::Dropped;
            }
        }
        let Some(connection) = self.connection.as_mut() else {
            return TickOutcome::Dropped;
        };

        match connection.publish(&self.channel, &payload).await {
            Ok(()) => {
                debug!("published {payload}");
                TickOutcome::Published
            }
            Err(e) => {
                warn!("publish failed, dropping message; reconnecting on next tick: {e}");
                self.connection = None;
                TickOutcome::Dropped
            }
        }
    }

    /// Ticks every `period` until `running` is cleared.
    pub async fn run(&mut self, period: Duration, running: Arc<AtomicBool>) {
        let mut interval = time::interval(period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        info!("outbound publisher started on channel {}", self.channel);

        while running.load(Ordering::Relaxed) {
            interval.tick().await;
            self.tick().await;
        }
        info!("outbound publisher stopped");
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
