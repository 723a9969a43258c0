//! Application layer use cases for the controller.
//!
//! # Sub-modules
//!
//! - **`operator_input`** – Turns operator actions (steer, speed change,
//!   emergency stop) into queued [`CommandMessage`](rover_core::CommandMessage)s.
//!   Steering and speed are appended; a stop overrides everything pending.
//!
//! - **`telemetry_view`** – Inbound handler that tracks the latest distance
//!   reported by the rover and publishes it to whoever displays it.
//!
//! Neither module performs I/O; both talk to `rover-link` types only.

pub mod operator_input;
pub mod telemetry_view;
