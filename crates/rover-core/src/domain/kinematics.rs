//! Differential-drive kinematics and the persistent speed bias.
//!
//! # How the joystick maps to wheels (for beginners)
//!
//! A differential-drive robot has two independently driven wheels.  Driving
//! both forward at the same speed goes straight; driving them at different
//! speeds turns.  The joystick, on the other hand, reports a point `(x, y)`
//! where `y` is "forward" and `x` is "sideways".
//!
//! Rotating the joystick plane by 45° lines the two joystick axes up with the
//! two wheels:
//!
//! ```text
//! left  =  x·sin45 + y·sin45
//! right = -x·sin45 + y·sin45
//! ```
//!
//! Pushing straight forward `(0, 1)` gives equal wheel speeds; pushing right
//! `(1, 0)` spins the left wheel forward and the right wheel backward.
//!
//! # Speed bias
//!
//! The operator's speed slider sets a bias that is *added* to both wheels on
//! every later steering update.  It is stored once and read many times; see
//! [`SpeedBias`].
//!
//! # Reversing
//!
//! When the joystick is pulled back (`y < 0`) the sign of `x` and of the bias
//! are flipped before the transform, so that "back and to the right" swings
//! the tail of the robot the way a driver reversing a car expects, and the
//! bias pushes the robot harder *backwards* rather than fighting the input.

use std::f64::consts::FRAC_1_SQRT_2;

use crate::protocol::messages::Direction;

/// `sin 45° == cos 45° == √2/2`.
pub const SIN_45: f64 = FRAC_1_SQRT_2;

/// Magnitude limit applied to every wheel command before it reaches a motor.
pub const MAX_WHEEL_SPEED: f64 = 1.0;

/// A pair of wheel speed commands in `[-1.0, 1.0]` after clamping.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WheelSpeeds {
    pub left: f64,
    pub right: f64,
}

impl WheelSpeeds {
    pub const STOPPED: WheelSpeeds = WheelSpeeds {
        left: 0.0,
        right: 0.0,
    };

    pub fn new(left: f64, right: f64) -> Self {
        Self { left, right }
    }

    /// Limits both wheels to `[-MAX_WHEEL_SPEED, MAX_WHEEL_SPEED]`.
    pub fn clamped(self) -> Self {
        Self {
            left: self.left.clamp(-MAX_WHEEL_SPEED, MAX_WHEEL_SPEED),
            right: self.right.clamp(-MAX_WHEEL_SPEED, MAX_WHEEL_SPEED),
        }
    }
}

/// What the motors should do in response to one steering sample.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum DriveCommand {
    /// Cut power to both motors.
    Stop,
    /// Drive the wheels at the given speeds.
    Drive(WheelSpeeds),
}

/// Rotates a joystick vector by 45° onto the two wheel axes.
///
/// This is a fixed linear transform; identical inputs always produce
/// bit-identical outputs.
pub fn joy_to_diff_drive(x: f64, y: f64) -> WheelSpeeds {
    WheelSpeeds {
        left: x * SIN_45 + y * SIN_45,
        right: -x * SIN_45 + y * SIN_45,
    }
}

/// Applies reverse-sign handling, the kinematics transform, and the bias.
///
/// The result is not clamped; see [`plan_drive`] for the motor-ready value.
pub fn apply_bias_and_sign(direction: Direction, bias: f64) -> WheelSpeeds {
    let (x, bias) = if direction.y < 0.0 {
        (-direction.x, -bias)
    } else {
        (direction.x, bias)
    };

    let wheels = joy_to_diff_drive(x, direction.y);
    WheelSpeeds {
        left: wheels.left + bias,
        right: wheels.right + bias,
    }
}

/// Decides the motor command for a steering sample under the current bias.
///
/// A centred joystick is an explicit all-stop: kinematics are skipped entirely
/// so that a stale bias can never keep the robot creeping forward.
pub fn plan_drive(direction: Direction, bias: f64) -> DriveCommand {
    if direction.is_centered() {
        return DriveCommand::Stop;
    }
    DriveCommand::Drive(apply_bias_and_sign(direction, bias).clamped())
}

// ── Speed bias ────────────────────────────────────────────────────────────────

/// The persistent speed bias.
///
/// Starts at `0.0`, changes only when a message carries a `speed` that differs
/// from the stored value, and is never cleared by a stop.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct SpeedBias {
    value: f64,
}

impl SpeedBias {
    pub fn new(value: f64) -> Self {
        Self { value }
    }

    pub fn value(&self) -> f64 {
        self.value
    }

    /// Applies an optional speed field.
    ///
    /// Returns `true` if the stored bias changed.
    pub fn update(&mut self, speed: Option<f64>) -> bool {
        match speed {
            Some(speed) if speed != self.value => {
                self.value = speed;
                true
            }
            _ => false,
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
