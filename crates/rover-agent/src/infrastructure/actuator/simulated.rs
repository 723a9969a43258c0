//! Simulated rover for running the agent without hardware.
//!
//! Motor commands are logged and integrated into a one-dimensional model: the
//! rover faces a wall, driving forward closes the distance and reversing opens
//! it.  This is enough to watch the indicator and telemetry react end to end.

use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Instant;

use rover_core::IndicatorColor;
use tracing::info;

use crate::application::drive::{Actuator, ActuatorError};

/// Closest reading the sensor reports, in centimetres.
const MIN_DISTANCE_CM: f64 = 2.0;
/// Farthest reading the sensor reports, in centimetres.
const MAX_DISTANCE_CM: f64 = 400.0;
/// Ground speed at full wheel speed, in centimetres per second.
const FULL_SPEED_CM_PER_S: f64 = 50.0;

#[derive(Debug)]
struct SimState {
    left: f64,
    right: f64,
    distance_cm: f64,
    last_update: Instant,
    indicator: IndicatorColor,
}

/// An [`Actuator`] backed by a simple kinematic model.
#[derive(Debug)]
pub struct SimulatedActuator {
    state: Mutex<SimState>,
}

impl SimulatedActuator {
    /// Creates a rover standing still `distance_cm` from the wall.
    pub fn new(distance_cm: f64) -> Self {
        Self {
            state: Mutex::new(SimState {
                left: 0.0,
                right: 0.0,
                distance_cm: distance_cm.clamp(MIN_DISTANCE_CM, MAX_DISTANCE_CM),
                last_update: Instant::now(),
                indicator: IndicatorColor::Off,
            }),
        }
    }

    pub fn indicator(&self) -> IndicatorColor {
        self.lock().indicator
    }

    fn lock(&self) -> MutexGuard<'_, SimState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Advances the model to `now` and returns the locked state.
    fn advance(&self, now: Instant) -> MutexGuard<'_, SimState> {
        let mut state = self.lock();
        let dt = now.saturating_duration_since(state.last_update).as_secs_f64();
        let forward = (state.left + state.right) / 2.0;
        state.distance_cm = (state.distance_cm - forward * FULL_SPEED_CM_PER_S * dt)
            .clamp(MIN_DISTANCE_CM, MAX_DISTANCE_CM);
        state.last_update = now;
        state
    }
}

impl Actuator for SimulatedActuator {
    fn set_left_speed(&self, speed: f64) -> Result<(), ActuatorError> {
        let mut state = self.advance(Instant::now());
        state.left = speed;
        info!("left motor {speed:+.3}");
        Ok(())
    }

    fn set_right_speed(&self, speed: f64) -> Result<(), ActuatorError> {
        let mut state = self.advance(Instant::now());
        state.right = speed;
        info!("right motor {speed:+.3}");
        Ok(())
    }

    fn stop(&self) -> Result<(), ActuatorError> {
        let mut state = self.advance(Instant::now());
        state.left = 0.0;
        state.right = 0.0;
        info!("motors stopped");
        Ok(())
    }

    fn set_indicator(&self, color: IndicatorColor) -> Result<(), ActuatorError> {
        self.lock().indicator = color;
        info!("indicator {color:?}");
        Ok(())
    }

    fn read_distance(&self) -> Result<f64, ActuatorError> {
        Ok(self.advance(Instant::now()).distance_cm)
    }
}
