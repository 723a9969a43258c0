//! Operator input use case.
//!
//! The controller's UI (here, the line console) never builds messages itself.
//! It calls [`OperatorInput`], which validates the values and decides how each
//! action reaches the outbound queue:
//!
//! | Action          | Message                  | Queue operation        |
//! |-----------------|--------------------------|------------------------|
//! | steer `(x, y)`  | `{direction: [x, y]}`    | `enqueue`              |
//! | speed `v`       | `{speed: v}`             | `enqueue`, if changed  |
//! | emergency stop  | `{stop: true}`           | `force`                |
//!
//! Speed changes are de-duplicated: the slider is sampled periodically and
//! only a value different from the last one sent produces a message.

use std::sync::Arc;

use rover_core::CommandMessage;
use rover_link::OutboundQueue;
use thiserror::Error;
use tracing::{debug, info};

/// Rejected operator input.
#[derive(Debug, Error, PartialEq)]
pub enum InputError {
    #[error("{axis} must be within [-1.0, 1.0], got {value}")]
    AxisOutOfRange { axis: &'static str, value: f64 },

    #[error("speed must be within [0.0, 1.0], got {0}")]
    SpeedOutOfRange(f64),
}

/// Converts operator actions into queued commands.
#[derive(Debug)]
pub struct OperatorInput {
    queue: Arc<OutboundQueue>,
    last_speed: Option<f64>,
}

impl OperatorInput {
    pub fn new(queue: Arc<OutboundQueue>) -> Self {
        Self {
            queue,
            last_speed: None,
        }
    }

    /// Queues a joystick sample.  `(0.0, 0.0)` tells the rover to stop.
    ///
    /// # Errors
    ///
    /// Returns [`InputError::AxisOutOfRange`] if either axis is outside `[-1, 1]`.
    pub fn steer(&self, x: f64, y: f64) -> Result<(), InputError> {
        check_axis("x", x)?;
        check_axis("y", y)?;
        debug!("steer ({x:.3}, {y:.3})");
        self.queue.enqueue(CommandMessage::steer(x, y));
        Ok(())
    }

    /// Queues a speed-bias change if `speed` differs from the last one sent.
    ///
    /// Returns `true` when a message was queued.
    ///
    /// # Errors
    ///
    /// Returns [`InputError::SpeedOutOfRange`] if `speed` is outside `[0, 1]`.
    pub fn set_speed(&mut self, speed: f64) -> Result<bool, InputError> {
        if !(0.0..=1.0).contains(&speed) {
            return Err(InputError::SpeedOutOfRange(speed));
        }
        if self.last_speed == Some(speed) {
            return Ok(false);
        }
        self.last_speed = Some(speed);
        debug!("speed bias -> {speed:.3}");
        self.queue.enqueue(CommandMessage::speed_bias(speed));
        Ok(true)
    }

    /// Discards every pending command and queues an emergency stop.
    pub fn emergency_stop(&self) {
        let discarded = self.queue.force(CommandMessage::emergency_stop());
        info!("emergency stop queued ({discarded} pending command(s) discarded)");
    }

    pub fn last_speed(&self) -> Option<f64> {
        self.last_speed
    }
}

fn check_axis(axis: &'static str, value: f64) -> Result<(), InputError> {
    if (-1.0..=1.0).contains(&value) {
        Ok(())
    } else {
        Err(InputError::AxisOutOfRange { axis, value })
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
