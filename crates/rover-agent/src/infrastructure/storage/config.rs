//! TOML configuration for the agent.
//!
//! Same file format as the controller; the agent reads `[bus]` and `[agent]`
//! and ignores any other table.
//!
//! ```toml
//! [bus]
//! host = "192.168.1.20"
//! password = "secret"
//!
//! [agent]
//! sample_interval_ms = 100
//! telemetry_interval_ms = 2500
//! near_threshold_cm = 30.0
//! simulated_distance_cm = 120.0
//! ```

use std::path::{Path, PathBuf};
use std::time::Duration;

use rover_core::domain::proximity::{DEFAULT_NEAR_THRESHOLD_CM, DEFAULT_TELEMETRY_INTERVAL};
use rover_link::{BusConfig, DEFAULT_PUBLISH_INTERVAL};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::application::telemetry::{SamplerSettings, DEFAULT_SAMPLE_INTERVAL};

/// Error type for configuration file operations.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A file system I/O error occurred.
    #[error("I/O error accessing config at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The TOML content could not be parsed.
    #[error("failed to parse config TOML: {0}")]
    Parse(#[from] toml::de::Error),

    /// A value parsed but cannot be used.
    #[error("invalid config value: {0}")]
    Invalid(String),
}

// ── Config schema types ───────────────────────────────────────────────────────

/// Top-level agent configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct AgentConfig {
    #[serde(default)]
    pub bus: BusConfig,
    #[serde(default)]
    pub agent: AgentSettings,
}

/// Agent timing and threshold settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AgentSettings {
    /// Period of the outbound publish tick, in milliseconds.
    #[serde(default = "default_publish_interval_ms")]
    pub publish_interval_ms: u64,
    /// Period between distance sensor reads, in milliseconds.
    #[serde(default = "default_sample_interval_ms")]
    pub sample_interval_ms: u64,
    /// Minimum time between telemetry reports, in milliseconds.
    #[serde(default = "default_telemetry_interval_ms")]
    pub telemetry_interval_ms: u64,
    /// Readings at or below this distance switch the indicator to red.
    #[serde(default = "default_near_threshold_cm")]
    pub near_threshold_cm: f64,
    /// Starting wall distance of the simulated rover.
    #[serde(default = "default_simulated_distance_cm")]
    pub simulated_distance_cm: f64,
}

fn default_publish_interval_ms() -> u64 {
    DEFAULT_PUBLISH_INTERVAL.as_millis() as u64
}
fn default_sample_interval_ms() -> u64 {
    DEFAULT_SAMPLE_INTERVAL.as_millis() as u64
}
fn default_telemetry_interval_ms() -> u64 {
    DEFAULT_TELEMETRY_INTERVAL.as_millis() as u64
}
fn default_near_threshold_cm() -> f64 {
    DEFAULT_NEAR_THRESHOLD_CM
}
fn default_simulated_distance_cm() -> f64 {
    100.0
}

impl Default for AgentSettings {
    fn default() -> Self {
        Self {
            publish_interval_ms: default_publish_interval_ms(),
            sample_interval_ms: default_sample_interval_ms(),
            telemetry_interval_ms: default_telemetry_interval_ms(),
            near_threshold_cm: default_near_threshold_cm(),
            simulated_distance_cm: default_simulated_distance_cm(),
        }
    }
}

impl AgentSettings {
    pub fn publish_interval(&self) -> Duration {
        Duration::from_millis(self.publish_interval_ms)
    }

    pub fn sampler(&self) -> SamplerSettings {
        SamplerSettings {
            sample_interval: Duration::from_millis(self.sample_interval_ms),
            telemetry_interval: Duration::from_millis(self.telemetry_interval_ms),
            near_threshold_cm: self.near_threshold_cm,
        }
    }
}

// ── Loading ───────────────────────────────────────────────────────────────────

/// Parses and validates a configuration document.
///
/// # Errors
///
/// Returns [`ConfigError::Parse`] for malformed TOML and
/// [`ConfigError::Invalid`] for zero periods, a zero connect timeout or a
/// non-finite threshold.
pub fn parse_config(content: &str) -> Result<AgentConfig, ConfigError> {
    let cfg: AgentConfig = toml::from_str(content)?;
    let agent = &cfg.agent;
    if agent.publish_interval_ms == 0 || agent.sample_interval_ms == 0 {
        return Err(ConfigError::Invalid(
            "agent publish and sample intervals must be greater than zero".into(),
        ));
    }
    if !agent.near_threshold_cm.is_finite() || agent.near_threshold_cm < 0.0 {
        return Err(ConfigError::Invalid(format!(
            "agent.near_threshold_cm must be a non-negative number, got {}",
            agent.near_threshold_cm
        )));
    }
    cfg.bus.validate().map_err(ConfigError::Invalid)?;
    Ok(cfg)
}

/// Loads the configuration at `path`, returning defaults if the file does not
/// exist.
///
/// # Errors
///
/// Returns [`ConfigError::Io`] for file-system errors other than "not found",
/// and [`ConfigError::Parse`] / [`ConfigError::Invalid`] for bad content.
pub fn load_config(path: &Path) -> Result<AgentConfig, ConfigError> {
    match std::fs::read_to_string(path) {
        Ok(content) => parse_config(&content),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(AgentConfig::default()),
        Err(source) => Err(ConfigError::Io {
            path: path.to_path_buf(),
            source,
        }),
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
