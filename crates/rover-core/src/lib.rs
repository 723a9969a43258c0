//! # rover-core
//!
//! Shared library for the rover relay containing the command protocol, its
//! JSON codec, and the drive/telemetry domain logic.
//!
//! This crate is used by both the controller and the agent.  It has zero
//! dependencies on sockets, threads, or hardware.
//!
//! # Architecture overview (for beginners)
//!
//! An operator drives a small robot remotely.  The *controller* turns joystick,
//! slider and stop-button input into [`CommandMessage`]s and publishes them on
//! a publish/subscribe bus.  The *agent* on the robot subscribes to the same
//! channel, turns each command into left/right motor speeds, and publishes
//! distance telemetry back the other way.
//!
//! This crate (`rover-core`) is the shared foundation.  It defines:
//!
//! - **`protocol`** – The [`CommandMessage`] payload, the bus [`Envelope`]
//!   around it, and the JSON codec that converts between them and strings.
//!
//! - **`domain`** – Pure logic with no I/O: the 45° differential-drive
//!   transform, the persistent speed bias, and distance classification.

pub mod domain;
pub mod protocol;

pub use domain::kinematics::{
    apply_bias_and_sign, joy_to_diff_drive, plan_drive, DriveCommand, SpeedBias, WheelSpeeds,
};
pub use domain::proximity::{IndicatorColor, Proximity, TelemetryThrottle};
pub use protocol::codec::{decode_command, decode_envelope, encode_command, DecodeError};
pub use protocol::messages::{CommandMessage, Direction, Envelope};
