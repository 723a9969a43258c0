//! Domain logic for the rover relay.
//!
//! This module contains pure business rules with no infrastructure
//! dependencies: no sockets, no threads, no hardware.  Both the controller and
//! the agent link against it, and every function here can be tested on any
//! machine without a bus server or a robot attached.
//!
//! - **`kinematics`** – turns a joystick sample plus the current speed bias
//!   into left/right wheel speeds for a differential-drive base.
//! - **`proximity`** – classifies distance readings and throttles how often
//!   they are reported back to the operator.

pub mod kinematics;
pub mod proximity;
