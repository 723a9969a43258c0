//! Application layer use cases for the agent (the program running on the rover).
//!
//! - **`drive`** – Inbound handler that turns command messages into motor
//!   speeds, keeping the persistent speed bias between messages.  Defines the
//!   [`Actuator`](drive::Actuator) trait the hardware adapters implement.
//!
//! - **`telemetry`** – The sampling loop that reads the distance sensor,
//!   drives the proximity indicator, and queues throttled telemetry reports.

pub mod drive;
pub mod telemetry;
