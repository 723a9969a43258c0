//! TOML configuration for the controller.
//!
//! The file path is chosen on the command line (`--config`, or the
//! `ROVER_CONFIG` environment variable).  A missing file is not an error: the
//! controller then talks to a bus on `127.0.0.1:6379` with no password.
//!
//! ```toml
//! [bus]
//! host = "192.168.1.20"
//! password = "secret"
//!
//! [controller]
//! publish_interval_ms = 10
//! ```
//!
//! # Serde default values
//!
//! Every table and field falls back to its default when absent, so a partial
//! file only needs to name what differs.

use std::path::{Path, PathBuf};
use std::time::Duration;

use rover_link::{BusConfig, DEFAULT_PUBLISH_INTERVAL};
use serde::{Deserialize, Serialize};
use thiserror::Error;

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

/// Top-level controller configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ControllerConfig {
    #[serde(default)]
    pub bus: BusConfig,
    #[serde(default)]
    pub controller: ControllerSettings,
}

/// Controller behaviour settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ControllerSettings {
    /// Period of the outbound publish tick, in milliseconds.
    #[serde(default = "default_publish_interval_ms")]
    pub publish_interval_ms: u64,
}

fn default_publish_interval_ms() -> u64 {
    DEFAULT_PUBLISH_INTERVAL.as_millis() as u64
}

impl Default for ControllerSettings {
    fn default() -> Self {
        Self {
            publish_interval_ms: default_publish_interval_ms(),
        }
    }
}

impl ControllerSettings {
    pub fn publish_interval(&self) -> Duration {
        Duration::from_millis(self.publish_interval_ms)
    }
}

// ── Loading ───────────────────────────────────────────────────────────────────

/// Parses and validates a configuration document.
///
/// # Errors
///
/// Returns [`ConfigError::Parse`] for malformed TOML and
/// [`ConfigError::Invalid`] for values the controller cannot run with.
pub fn parse_config(content: &str) -> Result<ControllerConfig, ConfigError> {
    let cfg: ControllerConfig = toml::from_str(content)?;
    if cfg.controller.publish_interval_ms == 0 {
        return Err(ConfigError::Invalid(
            "controller.publish_interval_ms must be greater than zero".into(),
        ));
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
pub fn load_config(path: &Path) -> Result<ControllerConfig, ConfigError> {
    match std::fs::read_to_string(path) {
        Ok(content) => parse_config(&content),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(ControllerConfig::default()),
        Err(source) => Err(ConfigError::Io {
            path: path.to_path_buf(),
            source,
        }),
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_publish_interval_is_ten_milliseconds() {
        let cfg = ControllerConfig::default();
        assert_eq!(cfg.controller.publish_interval(), Duration::from_millis(10));
        assert_eq!(cfg.bus.port, 6379);
    }

    #[test]
    fn test_empty_document_uses_defaults() {
        let cfg = parse_config("").unwrap();
        assert_eq!(cfg, ControllerConfig::default());
    }

    #[test]
    fn test_partial_bus_table_overrides_only_named_fields() {
        // Arrange
        let toml_str = r#"
[bus]
host = "10.0.0.7"
password = "secret"
"#;

        // Act
        let cfg = parse_config(toml_str).unwrap();

        // Assert
        assert_eq!(cfg.bus.address(), "10.0.0.7:6379");
        assert_eq!(cfg.bus.password.as_deref(), Some("secret"));
        assert_eq!(cfg.bus.channel, "remotecommands");
    }

    #[test]
    fn test_zero_publish_interval_is_invalid() {
        let result = parse_config("[controller]\npublish_interval_ms = 0\n");
        assert!(matches!(result, Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn test_zero_connect_timeout_is_invalid() {
        let result = parse_config("[bus]\nconnect_timeout_ms = 0\n");
        assert!(
            matches!(result, Err(ConfigError::Invalid(msg)) if msg.contains("connect_timeout_ms"))
        );
    }

    #[test]
    fn test_malformed_toml_is_a_parse_error() {
        let result = parse_config("[[[ not valid toml");
        assert!(matches!(result, Err(ConfigError::Parse(_))));
    }

    #[test]
    fn test_load_config_returns_default_when_file_absent() {
        let path = PathBuf::from("/nonexistent/path/that/cannot/exist/rover.toml");
        assert_eq!(load_config(&path).unwrap(), ControllerConfig::default());
    }

    #[test]
    fn test_load_config_reads_file_from_disk() {
        // Arrange
        let dir = std::env::temp_dir().join(format!("rover_controller_cfg_{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("rover.toml");
        std::fs::write(&path, "[bus]\nport = 6380\n[controller]\npublish_interval_ms = 25\n").unwrap();

        // Act
        let cfg = load_config(&path).unwrap();

        // Assert
        assert_eq!(cfg.bus.port, 6380);
        assert_eq!(cfg.controller.publish_interval_ms, 25);

        // Cleanup
        std::fs::remove_dir_all(&dir).ok();
    }
}
