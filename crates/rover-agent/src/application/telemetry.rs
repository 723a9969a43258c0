//! Distance sampling, proximity indicator, and throttled telemetry.
//!
//! The sampler runs on its own blocking thread because sensor reads are
//! synchronous.  On every sample it:
//!
//! 1. Reads the distance (a failed read is logged and the sample skipped).
//! 2. Classifies it as near or far and, only when the classification changes,
//!    switches the indicator (red when near, off when far).
//! 3. Queues a telemetry report if the publish interval has elapsed since the
//!    last one.
//!
//! The sampler never touches the bus; the agent's `OutboundPublisher` sends
//! whatever it queues.

use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};
use std::time::{Duration, Instant};

use rover_core::domain::proximity::{DEFAULT_NEAR_THRESHOLD_CM, DEFAULT_TELEMETRY_INTERVAL};
use rover_core::{CommandMessage, IndicatorColor, Proximity, TelemetryThrottle};
use rover_link::OutboundQueue;
use tracing::{debug, info, warn};

use super::drive::Actuator;

/// Default time between two sensor reads.
pub const DEFAULT_SAMPLE_INTERVAL: Duration = Duration::from_millis(100);

/// Sampler tuning.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SamplerSettings {
    pub sample_interval: Duration,
    pub telemetry_interval: Duration,
    pub near_threshold_cm: f64,
}

impl Default for SamplerSettings {
    fn default() -> Self {
        Self {
            sample_interval: DEFAULT_SAMPLE_INTERVAL,
            telemetry_interval: DEFAULT_TELEMETRY_INTERVAL,
            near_threshold_cm: DEFAULT_NEAR_THRESHOLD_CM,
        }
    }
}

/// What one sample did.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct SampleReport {
    /// The indicator colour that was applied, if the classification changed.
    pub indicator: Option<IndicatorColor>,
    /// Whether a telemetry report was queued.
    pub queued: bool,
}

/// The telemetry sampling use case.
pub struct TelemetrySampler {
    actuator: Arc<dyn Actuator>,
    queue: Arc<OutboundQueue>,
    settings: SamplerSettings,
    throttle: TelemetryThrottle,
    proximity: Option<Proximity>,
}

impl TelemetrySampler {
    pub fn new(
        actuator: Arc<dyn Actuator>,
        queue: Arc<OutboundQueue>,
        settings: SamplerSettings,
    ) -> Self {
        Self {
            actuator,
            queue,
            throttle: TelemetryThrottle::new(settings.telemetry_interval),
            settings,
            proximity: None,
        }
    }

    /// Processes one distance reading taken at `now`.
    pub fn on_sample(&mut self, distance_cm: f64, now: Instant) -> SampleReport {
        let mut report = SampleReport::default();

        let proximity = Proximity::classify(distance_cm, self.settings.near_threshold_cm);
        if self.proximity != Some(proximity) {
            let color = proximity.indicator();
            match self.actuator.set_indicator(color) {
                Ok(()) => {
                    info!("obstacle {proximity:?} at {distance_cm:.1} cm, indicator {color:?}");
                    self.proximity = Some(proximity);
                    report.indicator = Some(color);
                }
                // Left unrecorded so the next sample retries.
                Err(e) => warn!("could not set indicator: {e}"),
            }
        }

        if self.throttle.should_publish(now) {
            debug!("queueing distance {distance_cm:.1} cm");
            self.queue.enqueue(CommandMessage::telemetry(distance_cm));
            report.queued = true;
        }
        report
    }

    /// Reads the sensor once and processes the result.
    ///
    /// Returns `None` if the read failed.
    pub fn step(&mut self, now: Instant) -> Option<SampleReport> {
        match self.actuator.read_distance() {
            Ok(distance) if distance.is_finite() => Some(self.on_sample(distance, now)),
            Ok(distance) => {
                warn!("ignoring non-finite distance reading {distance}");
                None
            }
            Err(e) => {
                warn!("distance read failed: {e}");
                None
            }
        }
    }

    /// Samples every `sample_interval` until `running` is cleared.
    ///
    /// Blocks the calling thread; run it with `tokio::task::spawn_blocking`.
    pub fn run_blocking(&mut self, running: Arc<AtomicBool>) {
        info!(
            "telemetry sampler started (every {:?}, near <= {} cm)",
            self.settings.sample_interval, self.settings.near_threshold_cm
        );
        while running.load(Ordering::Relaxed) {
            self.step(Instant::now());
            std::thread::sleep(self.settings.sample_interval);
        }
        info!("telemetry sampler stopped");
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::actuator::mock::MockActuator;

    fn setup(actuator: MockActuator) -> (Arc<MockActuator>, Arc<OutboundQueue>, TelemetrySampler) {
        let actuator = Arc::new(actuator);
        let queue = Arc::new(OutboundQueue::new());
        let sampler = TelemetrySampler::new(
            Arc::clone(&actuator) as Arc<dyn Actuator>,
            Arc::clone(&queue),
            SamplerSettings::default(),
        );
        (actuator, queue, sampler)
    }

    #[test]
    fn test_first_sample_sets_indicator_and_queues_report() {
        // Arrange
        let (actuator, queue, mut sampler) = setup(MockActuator::new());

        // Act
        let report = sampler.on_sample(25.0, Instant::now());

        // Assert
        assert_eq!(report.indicator, Some(IndicatorColor::Red));
        assert!(report.queued);
        assert_eq!(actuator.indicator_calls(), vec![IndicatorColor::Red]);
        assert_eq!(queue.pop(), Some(CommandMessage::telemetry(25.0)));
    }

    #[test]
    fn test_threshold_is_inclusive() {
        let (_, _, mut sampler) = setup(MockActuator::new());
        let report = sampler.on_sample(30.0, Instant::now());
        assert_eq!(report.indicator, Some(IndicatorColor::Red));
    }

    #[test]
    fn test_indicator_only_changes_on_transition() {
        // Arrange
        let (actuator, _, mut sampler) = setup(MockActuator::new());
        let t0 = Instant::now();

        // Act
        for (i, d) in [100.0, 90.0, 20.0, 10.0, 40.0].into_iter().enumerate() {
            sampler.on_sample(d, t0 + Duration::from_millis(100 * i as u64));
        }

        // Assert
        assert_eq!(
            actuator.indicator_calls(),
            vec![IndicatorColor::Off, IndicatorColor::Red, IndicatorColor::Off]
        );
    }

    #[test]
    fn test_reports_are_throttled_to_publish_interval() {
        // Arrange
        let (_, queue, mut sampler) = setup(MockActuator::new());
        let t0 = Instant::now();

        // Act – 3 seconds of samples every 100 ms
        for i in 0..30u64 {
            sampler.on_sample(50.0, t0 + Duration::from_millis(100 * i));
        }

        // Assert – at t=0 and t=2.5 s
        assert_eq!(queue.len(), 2);
    }

    #[test]
    fn test_failed_read_is_skipped() {
        let (actuator, queue, mut sampler) = setup(MockActuator::new());

        assert_eq!(sampler.step(Instant::now()), None);
        assert!(queue.is_empty());
        assert!(actuator.indicator_calls().is_empty());
    }

    #[test]
    fn test_step_uses_scripted_readings() {
        let (actuator, queue, mut sampler) = setup(MockActuator::with_distances([12.0, 80.0]));
        let t0 = Instant::now();

        sampler.step(t0);
        sampler.step(t0 + Duration::from_millis(100));

        assert_eq!(
            actuator.indicator_calls(),
            vec![IndicatorColor::Red, IndicatorColor::Off]
        );
        assert_eq!(queue.len(), 1);
    }

    #[test]
    fn test_indicator_failure_is_retried_on_next_sample() {
        // Arrange
        let (_, _, mut failing) = setup(MockActuator {
            should_fail: true,
            ..MockActuator::new()
        });

        // Act
        let report = failing.on_sample(10.0, Instant::now());

        // Assert – report still queued, but no indicator recorded
        assert_eq!(report.indicator, None);
        assert!(report.queued);
        assert_eq!(failing.proximity, None);
    }

    #[test]
    fn test_run_blocking_exits_when_flag_clears() {
        let (_, _, mut sampler) = setup(MockActuator::with_distances([50.0; 100]));
        let running = Arc::new(AtomicBool::new(true));
        let flag = Arc::clone(&running);

        let handle = std::thread::spawn(move || sampler.run_blocking(flag));
        std::thread::sleep(Duration::from_millis(250));
        running.store(false, Ordering::Relaxed);

        handle.join().unwrap();
    }
}
