//! Telemetry module
//!
//! Structured logging and Prometheus metrics

mod logging;
mod metrics;

pub use logging::{init_logging, LogFormat};
pub use self::metrics::{
    init_metrics, record_counter, record_latency, set_gauge, CounterMetric, GaugeMetric,
    LatencyMetric,
};

use crate::config::TelemetryConfig;

/// Initialize all telemetry subsystems
///
/// A `metrics_port` of 0 leaves metrics unexported.
pub fn init_telemetry(config: &TelemetryConfig) -> anyhow::Result<()> {
    init_logging(&config.log_level, config.log_format)?;

    if config.metrics_port != 0 {
        init_metrics(config.metrics_port)?;
    }

    Ok(())
}
