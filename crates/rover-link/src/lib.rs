//! # rover-link
//!
//! Everything between a [`CommandMessage`](rover_core::CommandMessage) and the
//! network, shared by the controller and the agent:
//!
//! - **`transport`** – the publish/subscribe bus abstraction, with a RESP2
//!   implementation for Redis-compatible servers and an in-memory bus.
//! - **`outbound`** – the outbound queue (`enqueue` / `force`) and the
//!   periodic publisher that drains it.
//! - **`dispatch`** – the inbound listen loop that decodes envelopes and fans
//!   them out to registered handlers.
//! - **`config`** – the `[bus]` configuration table.

pub mod config;
pub mod dispatch;
pub mod outbound;
pub mod transport;

pub use config::BusConfig;
pub use dispatch::{DispatchOutcome, HandlerError, InboundDispatcher, MessageHandler};
pub use outbound::{OutboundPublisher, OutboundQueue, TickOutcome, DEFAULT_PUBLISH_INTERVAL};
pub use transport::{
    open_subscription, BusConnection, BusSubscription, BusTransport, ConnectivityError, MemoryBus,
    RedisTransport,
};
