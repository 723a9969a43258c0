//! Mock actuator for unit testing.
//!
//! Replaces the motor driver, sensor and indicator with in-memory recording.
//! Each call is pushed into a `Mutex<Vec<...>>` so that test assertions can
//! inspect exactly what was commanded and in what order.
//!
//! # Usage in tests
//!
//! ```ignore
//! let actuator = Arc::new(MockActuator::with_distances([12.0, 80.0]));
//! let mut drive = DriveController::new(Arc::clone(&actuator) as Arc<dyn Actuator>);
//!
//! drive.apply(&CommandMessage::emergency_stop()).unwrap();
//!
//! assert_eq!(actuator.motor_calls(), vec![MotorCall::Stop]);
//! ```
//!
//! # `should_fail` flag
//!
//! Set `should_fail = true` to make every method return an error, which lets
//! callers' error paths be tested without broken hardware.

use std::collections::VecDeque;
use std::sync::{Mutex, PoisonError};

use rover_core::IndicatorColor;

use crate::application::drive::{Actuator, ActuatorError};

/// One recorded motor command.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum MotorCall {
    Left(f64),
    Right(f64),
    Stop,
}

/// An actuator that records all calls without touching hardware.
#[derive(Debug, Default)]
pub struct MockActuator {
    /// Every motor command, in call order.
    pub motors: Mutex<Vec<MotorCall>>,
    /// Every indicator change, in call order.
    pub indicators: Mutex<Vec<IndicatorColor>>,
    /// Readings returned by `read_distance`, front first.  Empty means the
    /// sensor fails.
    pub distances: Mutex<VecDeque<f64>>,
    /// When `true`, every method returns an error.
    pub should_fail: bool,
}

impl MockActuator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a mock whose sensor returns `readings` in order.
    pub fn with_distances(readings: impl IntoIterator<Item = f64>) -> Self {
        Self {
            distances: Mutex::new(readings.into_iter().collect()),
            ..Self::default()
        }
    }

    pub fn motor_calls(&self) -> Vec<MotorCall> {
        self.motors.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }

    pub fn indicator_calls(&self) -> Vec<IndicatorColor> {
        self.indicators.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }

    fn record_motor(&self, call: MotorCall) -> Result<(), ActuatorError> {
        if self.should_fail {
            return Err(ActuatorError::Motor("mock failure".into()));
        }
        self.motors.lock().unwrap_or_else(PoisonError::into_inner).push(call);
        Ok(())
    }
}

impl Actuator for MockActuator {
    fn set_left_speed(&self, speed: f64) -> Result<(), ActuatorError> {
        self.record_motor(MotorCall::Left(speed))
    }

    fn set_right_speed(&self, speed: f64) -> Result<(), ActuatorError> {
        self.record_motor(MotorCall::Right(speed))
    }

    fn stop(&self) -> Result<(), ActuatorError> {
        self.record_motor(MotorCall::Stop)
    }

    fn set_indicator(&self, color: IndicatorColor) -> Result<(), ActuatorError> {
        if self.should_fail {
            return Err(ActuatorError::Indicator("mock failure".into()));
        }
        self.indicators.lock().unwrap_or_else(PoisonError::into_inner).push(color);
        Ok(())
    }

    fn read_distance(&self) -> Result<f64, ActuatorError> {
        if self.should_fail {
            return Err(ActuatorError::Sensor("mock failure".into()));
        }
        self.distances
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .pop_front()
            .ok_or_else(|| ActuatorError::Sensor("no scripted reading".into()))
    }
}
