//! # Node Configuration
//!
//! YAML configuration for the statehub process.
//!
//! ```yaml
//! broker:
//!   uri: tcp://localhost:1883
//!   top_level_topic: home/statehub
//! state:
//!   waiter_capacity: 16
//!   metrics_interval: 1000      # milliseconds
//! service_check:                # optional
//!   network: tcp
//!   address: 192.168.1.20:8080
//!   timeout: 60                 # seconds
//! ```
//!
//! `SH_BROKER_URI` and `SH_TOP_LEVEL_TOPIC` override the file.

use serde::{Deserialize, Serialize};
use serde_with::{serde_as, DurationMilliSeconds, DurationSeconds};
use service_check::Network;
use smarthome_bus::{load_config, BrokerConfig};
use state_store::DEFAULT_WAITER_CAPACITY;
use statehub_telemetry::TelemetryConfig;
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error(transparent)]
    Load(#[from] smarthome_bus::ConfigError),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Complete node configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct NodeConfig {
    /// Broker connection settings.
    pub broker: BrokerConfig,
    /// State store settings.
    pub state: StateConfig,
    /// Service to wait for before starting.
    pub service_check: Option<ServiceCheckConfig>,
    /// Telemetry settings; taken from the environment when absent.
    pub telemetry: Option<TelemetryConfig>,
}

/// State store configuration.
#[serde_as]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StateConfig {
    /// Values buffered per waiter before the oldest is dropped.
    pub waiter_capacity: usize,
    /// Interval between metric samples of the store.
    #[serde_as(as = "DurationMilliSeconds<u64>")]
    pub metrics_interval: Duration,
}

impl Default for StateConfig {
    fn default() -> Self {
        Self {
            waiter_capacity: DEFAULT_WAITER_CAPACITY,
            metrics_interval: Duration::from_secs(1),
        }
    }
}

/// A service that must answer before the node starts.
#[serde_as]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceCheckConfig {
    pub network: Network,
    pub address: String,
    #[serde_as(as = "DurationSeconds<u64>")]
    #[serde(default = "default_service_timeout")]
    pub timeout: Duration,
}

fn default_service_timeout() -> Duration {
    Duration::from_secs(60)
}

impl NodeConfig {
    /// Load `path`, or fall back to defaults if it does not exist.
    pub fn load_or_default(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let config: Self = load_config(path)?;
        config.validate()?;
        Ok(config)
    }

    /// Apply `SH_` environment overrides.
    #[must_use]
    pub fn with_env_overrides(self) -> Self {
        self.with_overrides(|key| std::env::var(key).ok())
    }

    /// Apply overrides from an arbitrary variable source.
    #[must_use]
    pub fn with_overrides(mut self, lookup: impl Fn(&str) -> Option<String>) -> Self {
        if let Some(uri) = lookup("SH_BROKER_URI") {
            self.broker.uri = uri;
        }
        if let Some(topic) = lookup("SH_TOP_LEVEL_TOPIC") {
            self.broker.top_level_topic = topic;
        }
        self
    }

    /// Reject settings the runtime cannot work with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.state.waiter_capacity == 0 {
            return Err(ConfigError::Invalid(
                "state.waiter_capacity must be at least 1".to_string(),
            ));
        }
        if self.state.metrics_interval.is_zero() {
            return Err(ConfigError::Invalid(
                "state.metrics_interval must be positive".to_string(),
            ));
        }
        if self.broker.top_level_topic.trim_matches('/').is_empty() {
            return Err(ConfigError::Invalid(
                "broker.top_level_topic must not be empty".to_string(),
            ));
        }
        Ok(())
    }
}
