//! Prometheus metrics

use std::net::{Ipv4Addr, SocketAddr};
use std::time::Duration;

use metrics_exporter_prometheus::PrometheusBuilder;

/// Counter metric types
#[derive(Debug, Clone, Copy)]
pub enum CounterMetric {
    /// Spot samples accepted by the aggregator
    SpotSamples,
    /// Market quotes handled by the bot
    Quotes,
    /// Opportunities emitted by the strategy
    Opportunities,
    /// Trades opened
    TradesOpened,
    /// Trades closed
    TradesClosed,
    /// Rejected or failed order submissions
    ExecutionFailures,
    /// Reference price lookups that found nothing
    ReferenceMisses,
}

impl CounterMetric {
    fn name(self) -> &'static str {
        match self {
            CounterMetric::SpotSamples => "polylag_spot_samples_total",
            CounterMetric::Quotes => "polylag_quotes_total",
            CounterMetric::Opportunities => "polylag_opportunities_total",
            CounterMetric::TradesOpened => "polylag_trades_opened_total",
            CounterMetric::TradesClosed => "polylag_trades_closed_total",
            CounterMetric::ExecutionFailures => "polylag_execution_failures_total",
            CounterMetric::ReferenceMisses => "polylag_reference_misses_total",
        }
    }
}

/// Latency metric types
#[derive(Debug, Clone, Copy)]
pub enum LatencyMetric {
    /// Historical candle lookup for a reference price
    ReferenceResolution,
    /// Order submission round trip
    OrderSubmission,
}

/// Gauge metric types
#[derive(Debug, Clone, Copy)]
pub enum GaugeMetric {
    /// Cash plus marked open positions
    Equity,
    /// Uncommitted cash
    Cash,
    /// Realized P&L
    RealizedPnl,
    /// Open position count
    OpenPositions,
}

/// Increment a counter by one
pub fn record_counter(metric: CounterMetric) {
    ::metrics::counter!(metric.name()).increment(1);
}

/// Record a latency measurement
pub fn record_latency(metric: LatencyMetric, duration: Duration) {
    let metric_name = match metric {
        LatencyMetric::ReferenceResolution => "polylag_reference_resolution_latency_ms",
        LatencyMetric::OrderSubmission => "polylag_order_submission_latency_ms",
    };

    ::metrics::histogram!(metric_name).record(duration.as_secs_f64() * 1000.0);
}

/// Set a gauge value
pub fn set_gauge(metric: GaugeMetric, value: f64) {
    let metric_name = match metric {
        GaugeMetric::Equity => "polylag_equity_usd",
        GaugeMetric::Cash => "polylag_cash_usd",
        GaugeMetric::RealizedPnl => "polylag_realized_pnl_usd",
        GaugeMetric::OpenPositions => "polylag_open_positions",
    };

    ::metrics::gauge!(metric_name).set(value);
}

/// Install the Prometheus recorder with an HTTP scrape endpoint
pub fn init_metrics(port: u16) -> anyhow::Result<()> {
    let addr = SocketAddr::from((Ipv4Addr::UNSPECIFIED, port));
    PrometheusBuilder::new()
        .with_http_listener(addr)
        .install()
        .map_err(|e| anyhow::anyhow!("Failed to install Prometheus exporter: {}", e))?;

    tracing::info!(%addr, "Prometheus metrics endpoint listening");
    Ok(())
}
