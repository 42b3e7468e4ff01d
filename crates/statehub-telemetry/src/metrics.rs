//! Prometheus metrics for statehub.
//!
//! All metrics follow the naming convention: `sh_<area>_<metric>_<unit>`
//!
//! ## Metric Types
//!
//! - **Counter**: Monotonically increasing value (e.g., state_stores_total)
//! - **Gauge**: Value that can go up or down (e.g., active waiters)
//! - **Histogram**: Distribution of values (e.g., handler duration)

use lazy_static::lazy_static;
use prometheus::{
    exponential_buckets, Counter, CounterVec, Encoder, Gauge, Histogram, Opts, Registry,
    TextEncoder,
};

use crate::TelemetryError;

lazy_static! {
    /// Global metrics registry
    pub static ref REGISTRY: Registry = Registry::new();

    // =========================================================================
    // BUS METRICS
    // =========================================================================

    /// Messages received from the transport
    pub static ref BUS_MESSAGES_RECEIVED: CounterVec = CounterVec::new(
        Opts::new("sh_bus_messages_received_total", "Messages received from the transport"),
        &["kind"]  // kind: action/status/connection
    ).expect("metric creation failed");

    /// Messages published to the transport
    pub static ref BUS_MESSAGES_PUBLISHED: CounterVec = CounterVec::new(
        Opts::new("sh_bus_messages_published_total", "Messages published to the transport"),
        &["kind"]
    ).expect("metric creation failed");

    /// Time spent handling one received message
    pub static ref BUS_HANDLER_DURATION: Histogram = Histogram::with_opts(
        prometheus::HistogramOpts::new(
            "sh_bus_handler_duration_seconds",
            "Time spent handling a received message"
        ).buckets(exponential_buckets(0.00001, 2.0, 15).expect("valid buckets"))
    ).expect("metric creation failed");

    // =========================================================================
    // STATE METRICS
    // =========================================================================

    /// Store operations
    pub static ref STATE_STORES: Counter = Counter::new(
        "sh_state_stores_total",
        "Total store operations"
    ).expect("metric creation failed");

    /// Store operations that replaced a different value
    pub static ref STATE_CHANGES: Counter = Counter::new(
        "sh_state_changes_total",
        "Store operations that changed an existing value"
    ).expect("metric creation failed");

    /// Names with a stored value
    pub static ref STATE_TRACKED_NAMES: Gauge = Gauge::new(
        "sh_state_tracked_names",
        "Number of names with a stored value"
    ).expect("metric creation failed");

    /// Waiters currently registered
    pub static ref STATE_ACTIVE_WAITERS: Gauge = Gauge::new(
        "sh_state_active_waiters",
        "Number of registered waiters across all names"
    ).expect("metric creation failed");

    /// Deliveries that displaced an undelivered value
    pub static ref STATE_DISPLACED_DELIVERIES: Counter = Counter::new(
        "sh_state_displaced_deliveries_total",
        "Deliveries that dropped the oldest queued value of a full waiter"
    ).expect("metric creation failed");

    /// Finished waits by outcome
    pub static ref STATE_WAITS: CounterVec = CounterVec::new(
        Opts::new("sh_state_waits_total", "Finished waits"),
        &["outcome"]  // outcome: matched/timed_out
    ).expect("metric creation failed");
}

/// Register all metrics with the global registry.
///
/// Safe to call more than once.
pub fn register_metrics() -> Result<(), TelemetryError> {
    let metrics: Vec<Box<dyn prometheus::core::Collector>> = vec![
        // Bus
        Box::new(BUS_MESSAGES_RECEIVED.clone()),
        Box::new(BUS_MESSAGES_PUBLISHED.clone()),
        Box::new(BUS_HANDLER_DURATION.clone()),
        // State
        Box::new(STATE_STORES.clone()),
        Box::new(STATE_CHANGES.clone()),
        Box::new(STATE_TRACKED_NAMES.clone()),
        Box::new(STATE_ACTIVE_WAITERS.clone()),
        Box::new(STATE_DISPLACED_DELIVERIES.clone()),
        Box::new(STATE_WAITS.clone()),
    ];

    for metric in metrics {
        match REGISTRY.register(metric) {
            Ok(()) | Err(prometheus::Error::AlreadyReg) => {}
            Err(e) => return Err(TelemetryError::MetricsInit(e.to_string())),
        }
    }
    Ok(())
}

/// Encode all metrics as Prometheus text format.
pub fn encode_metrics() -> Result<String, TelemetryError> {
    let encoder = TextEncoder::new();
    let metric_families = REGISTRY.gather();
    let mut buffer = Vec::new();
    encoder
        .encode(&metric_families, &mut buffer)
        .map_err(|e| TelemetryError::MetricsInit(e.to_string()))?;
    String::from_utf8(buffer).map_err(|e| TelemetryError::MetricsInit(e.to_string()))
}

/// Timer guard for automatic histogram observation.
pub struct HistogramTimer {
    histogram: Histogram,
    start: std::time::Instant,
}

impl HistogramTimer {
    /// Start a new timer for the given histogram.
    pub fn new(histogram: &Histogram) -> Self {
        Self {
            histogram: histogram.clone(),
            start: std::time::Instant::now(),
        }
    }
}

impl Drop for HistogramTimer {
    fn drop(&mut self) {
        let duration = self.start.elapsed().as_secs_f64();
        self.histogram.observe(duration);
    }
}

/// Start timing for a histogram. Observation happens on drop.
#[macro_export]
macro_rules! time_histogram {
    ($histogram:expr) => {
        $crate::metrics::HistogramTimer::new(&$histogram)
    };
}
