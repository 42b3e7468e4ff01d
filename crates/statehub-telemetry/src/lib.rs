//! # Statehub Telemetry
//!
//! Structured logging and Prometheus metrics for statehub processes.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use statehub_telemetry::{init_telemetry, TelemetryConfig};
//!
//! fn main() {
//!     let _guard = init_telemetry(TelemetryConfig::from_env()).expect("telemetry");
//!     // Logs and metrics are now being collected
//! }
//! ```
//!
//! ## Environment Variables
//!
//! | Variable | Default | Description |
//! |----------|---------|-------------|
//! | `SH_SERVICE_NAME` | `statehub` | Service name in logs |
//! | `SH_LOG_LEVEL` | `info` | Log level filter (`RUST_LOG` also honoured) |
//! | `SH_JSON_LOGS` | `false` | JSON log lines |
//! | `SH_CONSOLE_OUTPUT` | `true` | Write logs to the console |
//! | `SH_METRICS_PORT` | `9100` | Prometheus metrics port |

mod config;
mod logging;
pub mod metrics;

pub use config::TelemetryConfig;
pub use logging::{env_filter, init_logging};
pub use metrics::{
    encode_metrics, register_metrics, HistogramTimer, BUS_HANDLER_DURATION,
    BUS_MESSAGES_PUBLISHED, BUS_MESSAGES_RECEIVED, STATE_ACTIVE_WAITERS, STATE_CHANGES,
    STATE_DISPLACED_DELIVERIES, STATE_STORES, STATE_TRACKED_NAMES, STATE_WAITS,
};

use thiserror::Error;

/// Telemetry initialization errors
#[derive(Error, Debug)]
pub enum TelemetryError {
    #[error("Failed to initialize logging: {0}")]
    LoggingInit(String),

    #[error("Failed to initialize Prometheus metrics: {0}")]
    MetricsInit(String),

    #[error("Invalid configuration: {0}")]
    Config(String),
}

/// Register metrics and install the log subscriber.
///
/// Returns a guard that should be held for the lifetime of the application.
pub fn init_telemetry(config: TelemetryConfig) -> Result<TelemetryGuard, TelemetryError> {
    register_metrics()?;
    init_logging(&config)?;

    Ok(TelemetryGuard {
        service_name: config.service_name,
    })
}

/// Guard that keeps telemetry active.
pub struct TelemetryGuard {
    service_name: String,
}

impl TelemetryGuard {
    pub fn service_name(&self) -> &str {
        &self.service_name
    }
}

impl Drop for TelemetryGuard {
    fn drop(&mut self) {
        tracing::info!(service = %self.service_name, "Shutting down telemetry...");
    }
}

/// Convenience macro for recording a metric increment.
#[macro_export]
macro_rules! metric_inc {
    ($metric:expr) => {
        $metric.inc()
    };
    ($metric:expr, $labels:expr) => {
        $metric.with_label_values($labels).inc()
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metric_inc_macro() {
        let before = BUS_MESSAGES_PUBLISHED.with_label_values(&["status"]).get();
        metric_inc!(BUS_MESSAGES_PUBLISHED, &["status"]);
        assert!(BUS_MESSAGES_PUBLISHED.with_label_values(&["status"]).get() > before);
    }
}
