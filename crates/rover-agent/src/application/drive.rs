//! DriveController: translates received command messages into motor output.
//!
//! This use case sits at the application layer and delegates to an
//! [`Actuator`] trait object for the actual hardware calls.  The hardware
//! adapters live in the infrastructure layer.
//!
//! # Decision order for one message
//!
//! ```text
//! speed present & new     -> bias := speed
//! stop == true            -> actuator.stop(), direction is ignored
//! direction == (0, 0)     -> actuator.stop()
//! direction == (x, y)     -> plan_drive(direction, bias) -> left / right
//! no direction            -> motors untouched
//! ```
//!
//! Telemetry reports echoed back on the shared channel carry none of these
//! fields and are therefore ignored.

use std::sync::Arc;

use rover_core::{plan_drive, CommandMessage, DriveCommand, IndicatorColor, SpeedBias};
use rover_link::{HandlerError, MessageHandler};
use thiserror::Error;
use tracing::{debug, info};

/// Error type for hardware operations.
#[derive(Debug, Error)]
pub enum ActuatorError {
    #[error("motor driver error: {0}")]
    Motor(String),
    #[error("distance sensor error: {0}")]
    Sensor(String),
    #[error("indicator error: {0}")]
    Indicator(String),
}

impl From<ActuatorError> for HandlerError {
    fn from(e: ActuatorError) -> Self {
        HandlerError::Actuator(e.to_string())
    }
}

/// The robot's motors, distance sensor and alert indicator.
///
/// Speeds are in `[-1.0, 1.0]`; negative values run a wheel backwards.
/// Implementations must be callable from both the listen task and the
/// sampler thread.
pub trait Actuator: Send + Sync {
    fn set_left_speed(&self, speed: f64) -> Result<(), ActuatorError>;

    fn set_right_speed(&self, speed: f64) -> Result<(), ActuatorError>;

    /// Cuts power to both motors.
    fn stop(&self) -> Result<(), ActuatorError>;

    fn set_indicator(&self, color: IndicatorColor) -> Result<(), ActuatorError>;

    /// Reads the forward distance sensor, in centimetres.
    fn read_distance(&self) -> Result<f64, ActuatorError>;
}

/// The drive use case.  Registered as an inbound [`MessageHandler`].
pub struct DriveController {
    actuator: Arc<dyn Actuator>,
    bias: SpeedBias,
}

impl DriveController {
    /// Creates a controller with a zero speed bias.
    pub fn new(actuator: Arc<dyn Actuator>) -> Self {
        Self {
            actuator,
            bias: SpeedBias::default(),
        }
    }

    /// The bias that will be applied to the next steering sample.
    pub fn bias(&self) -> f64 {
        self.bias.value()
    }

    /// Applies one command message to the motors.
    ///
    /// # Errors
    ///
    /// Returns [`ActuatorError`] if the hardware refuses a command.
    pub fn apply(&mut self, message: &CommandMessage) -> Result<(), ActuatorError> {
        if self.bias.update(message.speed) {
            debug!("speed bias set to {:.3}", self.bias.value());
        }

        if message.stop {
            info!("emergency stop");
            return self.actuator.stop();
        }

        let Some(direction) = message.direction else {
            return Ok(());
        };
        match plan_drive(direction, self.bias.value()) {
            DriveCommand::Stop => {
                debug!("joystick centred, stopping");
                self.actuator.stop()
            }
            DriveCommand::Drive(wheels) => {
                debug!("drive left={:.6} right={:.6}", wheels.left, wheels.right);
                self.actuator.set_left_speed(wheels.left)?;
                self.actuator.set_right_speed(wheels.right)
            }
        }
    }
}

impl MessageHandler for DriveController {
    fn handle(&mut self, message: &CommandMessage) -> Result<(), HandlerError> {
        self.apply(message).map_err(HandlerError::from)
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
