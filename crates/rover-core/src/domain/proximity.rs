//! Distance classification and telemetry throttling.
//!
//! The robot samples its distance sensor far more often than the operator
//! needs to hear about it.  Classification (near / far) reacts on every
//! sample, while publishing is throttled to a fixed interval by
//! [`TelemetryThrottle`].

use std::time::{Duration, Instant};

/// Readings at or below this distance (centimetres) count as "near".
pub const DEFAULT_NEAR_THRESHOLD_CM: f64 = 30.0;

/// Minimum time between two telemetry publishes.
pub const DEFAULT_TELEMETRY_INTERVAL: Duration = Duration::from_millis(2500);

/// Safety classification of a distance reading.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Proximity {
    /// An obstacle is within the threshold.
    Near,
    /// Nothing within the threshold.
    Far,
}

/// Colour of the robot's alert indicator (its underlighting).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IndicatorColor {
    Red,
    Off,
}

impl Proximity {
    /// Classifies `distance_cm` against `threshold_cm` (inclusive).
    pub fn classify(distance_cm: f64, threshold_cm: f64) -> Self {
        if distance_cm <= threshold_cm {
            Proximity::Near
        } else {
            Proximity::Far
        }
    }

    /// The indicator colour that represents this classification.
    pub fn indicator(self) -> IndicatorColor {
        match self {
            Proximity::Near => IndicatorColor::Red,
            Proximity::Far => IndicatorColor::Off,
        }
    }
}

/// Rate limiter for telemetry publishes.
///
/// The first call to [`should_publish`](Self::should_publish) always succeeds;
/// afterwards at most one call per `interval` does.
#[derive(Debug, Clone)]
pub struct TelemetryThrottle {
    interval: Duration,
    last_publish: Option<Instant>,
}

impl TelemetryThrottle {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            last_publish: None,
        }
    }

    /// Returns `true` and records `now` if a publish is due.
    pub fn should_publish(&mut self, now: Instant) -> bool {
        let due = match self.last_publish {
            None => true,
            Some(last) => now.saturating_duration_since(last) >= self.interval,
        };
        if due {
            self.last_publish = Some(now);
        }
        due
    }
}

impl Default for TelemetryThrottle {
    fn default() -> Self {
        Self::new(DEFAULT_TELEMETRY_INTERVAL)
    }
}
