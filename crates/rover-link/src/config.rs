//! Bus connection settings shared by the controller and the agent.
//!
//! Both binaries embed a `[bus]` table in their TOML configuration file.  The
//! values are read once at startup and reused verbatim on every reconnect; there
//! is no credential rotation.
//!
//! ```toml
//! [bus]
//! host = "192.168.1.20"
//! port = 6379
//! password = "hunter2"
//! channel = "remotecommands"
//! ```
//!
//! Every field has a serde default so that a missing or partial table still
//! produces a usable configuration.

use std::time::Duration;

use rover_core::protocol::messages::DEFAULT_CHANNEL;
use serde::{Deserialize, Serialize};

/// Settings for reaching the publish/subscribe bus.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct BusConfig {
    /// Hostname or IP address of the bus server.
    #[serde(default = "default_host")]
    pub host: String,
    /// TCP port of the bus server.
    #[serde(default = "default_port")]
    pub port: u16,
    /// Optional ACL username sent with `AUTH`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    /// Password sent with `AUTH`; no authentication when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
    /// Channel carrying both commands and telemetry.
    #[serde(default = "default_channel")]
    pub channel: String,
    /// Upper bound for a connect or publish round-trip, in milliseconds.
    #[serde(default = "default_connect_timeout_ms")]
    pub connect_timeout_ms: u64,
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}
fn default_port() -> u16 {
    6379
}
fn default_channel() -> String {
    DEFAULT_CHANNEL.to_string()
}
fn default_connect_timeout_ms() -> u64 {
    2000
}

impl Default for BusConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            username: None,
            password: None,
            channel: default_channel(),
            connect_timeout_ms: default_connect_timeout_ms(),
        }
    }
}

impl BusConfig {
    /// `host:port` string suitable for `TcpStream::connect`.
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_ms)
    }

    /// Checks the values that would make the bus unusable.
    ///
    /// # Errors
    ///
    /// Returns a description of the first offending field.
    pub fn validate(&self) -> Result<(), String> {
        if self.channel.is_empty() {
            return Err("bus.channel must not be empty".into());
        }
        if self.connect_timeout_ms == 0 {
            return Err("bus.connect_timeout_ms must be greater than zero".into());
        }
        Ok(())
    }
}
