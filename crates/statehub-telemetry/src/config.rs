//! Telemetry configuration from environment variables.

use serde::{Deserialize, Serialize};
use std::env;

/// Configuration for logging and metrics.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TelemetryConfig {
    /// Service name attached to log lines
    pub service_name: String,

    /// Log level filter (trace, debug, info, warn, error) or full directive
    pub log_level: String,

    /// Whether to write logs to the console
    pub console_output: bool,

    /// Whether to format logs as JSON
    pub json_logs: bool,

    /// Prometheus metrics port
    pub metrics_port: u16,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            service_name: "statehub".to_string(),
            log_level: "info".to_string(),
            console_output: true,
            json_logs: false,
            metrics_port: 9100,
        }
    }
}

impl TelemetryConfig {
    /// Create configuration from environment variables.
    ///
    /// # Environment Variables
    ///
    /// - `SH_SERVICE_NAME`: Service name (default: statehub)
    /// - `SH_LOG_LEVEL` or `RUST_LOG`: Log level (default: info)
    /// - `SH_CONSOLE_OUTPUT`: Enable console output (default: true)
    /// - `SH_JSON_LOGS`: Enable JSON logs (default: false, true in containers)
    /// - `SH_METRICS_PORT`: Prometheus metrics port (default: 9100)
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build from an arbitrary variable source.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();
        let is_container =
            lookup("KUBERNETES_SERVICE_HOST").is_some() || lookup("DOCKER_CONTAINER").is_some();

        Self {
            service_name: lookup("SH_SERVICE_NAME").unwrap_or(defaults.service_name),

            log_level: lookup("SH_LOG_LEVEL")
                .or_else(|| lookup("RUST_LOG"))
                .unwrap_or(defaults.log_level),

            console_output: lookup("SH_CONSOLE_OUTPUT")
                .map(|v| v.to_lowercase() != "false" && v != "0")
                .unwrap_or(defaults.console_output),

            json_logs: lookup("SH_JSON_LOGS")
                .map(|v| v.to_lowercase() == "true" || v == "1")
                .unwrap_or(is_container),

            metrics_port: lookup("SH_METRICS_PORT")
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.metrics_port),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| vars.get(key).cloned()
    }

    #[test]
    fn test_default_config() {
        let config = TelemetryConfig::from_lookup(lookup(&[]));
        assert_eq!(config, TelemetryConfig::default());
        assert_eq!(config.service_name, "statehub");
        assert_eq!(config.metrics_port, 9100);
    }

    #[test]
    fn test_overrides() {
        let config = TelemetryConfig::from_lookup(lookup(&[
            ("SH_SERVICE_NAME", "kodi-bridge"),
            ("SH_LOG_LEVEL", "debug"),
            ("RUST_LOG", "trace"),
            ("SH_CONSOLE_OUTPUT", "0"),
            ("SH_JSON_LOGS", "TRUE"),
            ("SH_METRICS_PORT", "9200"),
        ]));

        assert_eq!(config.service_name, "kodi-bridge");
        assert_eq!(config.log_level, "debug");
        assert!(!config.console_output);
        assert!(config.json_logs);
        assert_eq!(config.metrics_port, 9200);
    }

    #[test]
    fn test_rust_log_fallback_and_bad_port() {
        let config = TelemetryConfig::from_lookup(lookup(&[
            ("RUST_LOG", "state_store=debug"),
            ("SH_METRICS_PORT", "not-a-port"),
        ]));
        assert_eq!(config.log_level, "state_store=debug");
        assert_eq!(config.metrics_port, 9100);
    }

    #[test]
    fn test_json_logs_in_container() {
        let config = TelemetryConfig::from_lookup(lookup(&[("DOCKER_CONTAINER", "1")]));
        assert!(config.json_logs);
    }
}
