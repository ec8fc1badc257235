//! Configuration types for poly-lag

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

use crate::feed::Asset;
use crate::market::{GammaConfig, GAMMA_API_URL};
use crate::telemetry::LogFormat;

/// Bundled default configuration
pub const BUNDLED_CONFIG: &str = include_str!("../config.toml.example");

/// Configuration loading errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("invalid config: {0}")]
    Invalid(String),
}

/// Root configuration structure
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub feed: FeedConfig,
    #[serde(default)]
    pub market: MarketConfig,
    #[serde(default)]
    pub aggregator: AggregatorConfig,
    #[serde(default)]
    pub reference: ReferenceConfig,
    #[serde(default)]
    pub lag: LagConfig,
    #[serde(default)]
    pub engine: EngineConfig,
    #[serde(default)]
    pub store: StoreConfig,
    #[serde(default)]
    pub telemetry: TelemetryConfig,
}

/// Spot price feed configuration
#[derive(Debug, Clone, Deserialize)]
pub struct FeedConfig {
    /// Exchange connectors to start ("binance", "coinbase")
    #[serde(default = "default_sources")]
    pub sources: Vec<String>,

    /// Assets to stream and aggregate
    #[serde(default = "default_assets")]
    pub assets: Vec<Asset>,
}

fn default_sources() -> Vec<String> {
    vec!["binance".to_string(), "coinbase".to_string()]
}
fn default_assets() -> Vec<Asset> {
    Asset::ALL.to_vec()
}

impl Default for FeedConfig {
    fn default() -> Self {
        Self {
            sources: default_sources(),
            assets: default_assets(),
        }
    }
}

/// Market quote polling configuration
#[derive(Debug, Clone, Deserialize)]
pub struct MarketConfig {
    /// Gamma API base URL
    #[serde(default = "default_gamma_url")]
    pub gamma_url: String,

    /// Poll interval (milliseconds)
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,

    /// HTTP request timeout (seconds)
    #[serde(default = "default_market_timeout_secs")]
    pub request_timeout_secs: u64,

    /// Gamma event tag to poll
    #[serde(default = "default_tag_slug")]
    pub tag_slug: String,

    /// Events fetched per poll
    #[serde(default = "default_event_limit")]
    pub event_limit: u32,
}

fn default_gamma_url() -> String {
    GAMMA_API_URL.to_string()
}
fn default_poll_interval_ms() -> u64 {
    1000
}
fn default_market_timeout_secs() -> u64 {
    10
}
fn default_tag_slug() -> String {
    "up-or-down".to_string()
}
fn default_event_limit() -> u32 {
    50
}

impl Default for MarketConfig {
    fn default() -> Self {
        Self {
            gamma_url: default_gamma_url(),
            poll_interval_ms: default_poll_interval_ms(),
            request_timeout_secs: default_market_timeout_secs(),
            tag_slug: default_tag_slug(),
            event_limit: default_event_limit(),
        }
    }
}

impl MarketConfig {
    /// Gamma feed settings for this section
    pub fn gamma(&self) -> GammaConfig {
        GammaConfig {
            base_url: self.gamma_url.clone(),
            timeout: Duration::from_secs(self.request_timeout_secs),
            poll_interval: Duration::from_millis(self.poll_interval_ms),
            tag_slug: self.tag_slug.clone(),
            limit: self.event_limit,
        }
    }
}

/// Spot aggregation configuration
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AggregatorConfig {
    /// Exclude sources silent for longer than this (seconds); unset keeps them forever
    #[serde(default)]
    pub staleness_ttl_secs: Option<u64>,
}

impl AggregatorConfig {
    pub fn staleness_ttl(&self) -> Option<Duration> {
        self.staleness_ttl_secs.map(Duration::from_secs)
    }
}

/// Reference (window open) price resolution configuration
#[derive(Debug, Clone, Deserialize)]
pub struct ReferenceConfig {
    /// Refuse anchors further than this in the future (seconds)
    #[serde(default = "default_lookahead_secs")]
    pub lookahead_secs: u64,

    /// Minimum spacing between attempts for one market (seconds)
    #[serde(default = "default_debounce_secs")]
    pub debounce_secs: u64,

    /// Candle request timeout (seconds)
    #[serde(default = "default_reference_timeout_secs")]
    pub request_timeout_secs: u64,

    /// Primary candle source base URL
    #[serde(default = "default_binance_rest_url")]
    pub binance_url: String,

    /// Fallback candle source base URL
    #[serde(default = "default_coinbase_rest_url")]
    pub coinbase_url: String,
}

fn default_lookahead_secs() -> u64 {
    60
}
fn default_debounce_secs() -> u64 {
    5
}
fn default_reference_timeout_secs() -> u64 {
    3
}
fn default_binance_rest_url() -> String {
    "https://api.binance.com".to_string()
}
fn default_coinbase_rest_url() -> String {
    "https://api.exchange.coinbase.com".to_string()
}

impl Default for ReferenceConfig {
    fn default() -> Self {
        Self {
            lookahead_secs: default_lookahead_secs(),
            debounce_secs: default_debounce_secs(),
            request_timeout_secs: default_reference_timeout_secs(),
            binance_url: default_binance_rest_url(),
            coinbase_url: default_coinbase_rest_url(),
        }
    }
}

/// Lag strategy configuration
#[derive(Debug, Clone, Deserialize)]
pub struct LagConfig {
    /// Minimum |spot vs. open| move in percent (0.05 = 0.05%)
    #[serde(default = "default_momentum_threshold_pct")]
    pub momentum_threshold_pct: Decimal,

    /// Don't signal up if YES is already at or above this
    #[serde(default = "default_max_yes_for_up")]
    pub max_yes_for_up: Decimal,

    /// Don't signal down if YES is already at or below this
    #[serde(default = "default_min_yes_for_down")]
    pub min_yes_for_down: Decimal,

    /// Implied probability attached to up signals
    #[serde(default = "default_up_implied_probability")]
    pub up_implied_probability: Decimal,

    /// Implied probability attached to down signals
    #[serde(default = "default_down_implied_probability")]
    pub down_implied_probability: Decimal,

    /// Recent opportunities kept for inspection
    #[serde(default = "default_history_size")]
    pub history_size: usize,
}

fn default_momentum_threshold_pct() -> Decimal {
    Decimal::new(5, 2) // 0.05%
}
fn default_max_yes_for_up() -> Decimal {
    Decimal::new(75, 2) // 0.75
}
fn default_min_yes_for_down() -> Decimal {
    Decimal::new(25, 2) // 0.25
}
fn default_up_implied_probability() -> Decimal {
    Decimal::new(95, 2) // 0.95
}
fn default_down_implied_probability() -> Decimal {
    Decimal::new(5, 2) // 0.05
}
fn default_history_size() -> usize {
    50
}

impl Default for LagConfig {
    fn default() -> Self {
        Self {
            momentum_threshold_pct: default_momentum_threshold_pct(),
            max_yes_for_up: default_max_yes_for_up(),
            min_yes_for_down: default_min_yes_for_down(),
            up_implied_probability: default_up_implied_probability(),
            down_implied_probability: default_down_implied_probability(),
            history_size: default_history_size(),
        }
    }
}

/// Trading mode, fixed for the life of the process
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum TradingMode {
    /// Paper trades against a local ledger
    #[default]
    Simulation,
    /// Track and alert, never open
    #[serde(alias = "monitor")]
    #[value(name = "monitor", alias = "monitor-only")]
    MonitorOnly,
    /// Real orders through the order executor
    #[serde(alias = "live")]
    #[value(name = "live", alias = "live-trading")]
    LiveTrading,
}

impl std::fmt::Display for TradingMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            TradingMode::Simulation => "SIMULATION",
            TradingMode::MonitorOnly => "MONITOR_ONLY",
            TradingMode::LiveTrading => "LIVE_TRADING",
        };
        f.write_str(s)
    }
}

/// Position engine configuration
#[derive(Debug, Clone, Deserialize)]
pub struct EngineConfig {
    #[serde(default)]
    pub mode: TradingMode,

    /// Requested stake per entry (USD)
    #[serde(default = "default_bet_size")]
    pub bet_size: Decimal,

    /// Hard cap on stake per entry (USD)
    #[serde(default = "default_max_trade_size")]
    pub max_trade_size: Decimal,

    /// Starting cash for the ledger (USD)
    #[serde(default = "default_initial_balance")]
    pub initial_balance: Decimal,

    /// Close when unrealized P&L exceeds this fraction of cost basis
    #[serde(default = "default_exit_ratio")]
    pub take_profit_ratio: Decimal,

    /// Close when unrealized loss exceeds this fraction of cost basis
    #[serde(default = "default_exit_ratio")]
    pub stop_loss_ratio: Decimal,

    /// Buy YES when implied probability is above this
    #[serde(default = "default_buy_yes_above")]
    pub buy_yes_above: Decimal,

    /// Buy NO when implied probability is below this
    #[serde(default = "default_buy_no_below")]
    pub buy_no_below: Decimal,

    /// Reject entries priced at or below this
    #[serde(default = "default_min_entry_price")]
    pub min_entry_price: Decimal,
}

fn default_bet_size() -> Decimal {
    Decimal::new(10, 0)
}
fn default_max_trade_size() -> Decimal {
    Decimal::new(10, 0)
}
fn default_initial_balance() -> Decimal {
    Decimal::new(1000, 0)
}
fn default_exit_ratio() -> Decimal {
    Decimal::new(5, 1) // 0.5
}
fn default_buy_yes_above() -> Decimal {
    Decimal::new(8, 1) // 0.8
}
fn default_buy_no_below() -> Decimal {
    Decimal::new(2, 1) // 0.2
}
fn default_min_entry_price() -> Decimal {
    Decimal::new(1, 2) // 0.01
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            mode: TradingMode::default(),
            bet_size: default_bet_size(),
            max_trade_size: default_max_trade_size(),
            initial_balance: default_initial_balance(),
            take_profit_ratio: default_exit_ratio(),
            stop_loss_ratio: default_exit_ratio(),
            buy_yes_above: default_buy_yes_above(),
            buy_no_below: default_buy_no_below(),
            min_entry_price: default_min_entry_price(),
        }
    }
}

/// Trade ledger configuration
#[derive(Debug, Clone, Deserialize)]
pub struct StoreConfig {
    #[serde(default = "default_store_path")]
    pub path: PathBuf,
}

fn default_store_path() -> PathBuf {
    PathBuf::from("trades.json")
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            path: default_store_path(),
        }
    }
}

/// Telemetry configuration
#[derive(Debug, Clone, Deserialize)]
pub struct TelemetryConfig {
    /// Prometheus listener port (0 disables)
    #[serde(default)]
    pub metrics_port: u16,

    #[serde(default = "default_log_level")]
    pub log_level: String,

    #[serde(default)]
    pub log_format: LogFormat,

    /// Seconds between stats log lines
    #[serde(default = "default_stats_interval_secs")]
    pub stats_interval_secs: u64,
}

fn default_log_level() -> String {
    "info".to_string()
}
fn default_stats_interval_secs() -> u64 {
    60
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            metrics_port: 0,
            log_level: default_log_level(),
            log_format: LogFormat::default(),
            stats_interval_secs: default_stats_interval_secs(),
        }
    }
}

impl Config {
    /// Load configuration from a TOML file
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::parse(&content)
    }

    /// The configuration shipped with the binary
    pub fn bundled() -> Result<Self, ConfigError> {
        Self::parse(BUNDLED_CONFIG)
    }

    /// Parse and validate a TOML document
    pub fn parse(content: &str) -> Result<Self, ConfigError> {
        let config: Config = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Reject settings the engine cannot run with
    pub fn validate(&self) -> Result<(), ConfigError> {
        let invalid = |msg: &str| Err(ConfigError::Invalid(msg.to_string()));

        if self.feed.assets.is_empty() {
            return invalid("feed.assets must not be empty");
        }
        if self.market.poll_interval_ms == 0 {
            return invalid("market.poll_interval_ms must be positive");
        }
        if self.lag.history_size == 0 {
            return invalid("lag.history_size must be positive");
        }
        if self.lag.momentum_threshold_pct < Decimal::ZERO {
            return invalid("lag.momentum_threshold_pct must not be negative");
        }
        let engine = &self.engine;
        if engine.bet_size <= Decimal::ZERO || engine.max_trade_size <= Decimal::ZERO {
            return invalid("engine.bet_size and engine.max_trade_size must be positive");
        }
        if engine.take_profit_ratio <= Decimal::ZERO || engine.stop_loss_ratio <= Decimal::ZERO {
            return invalid("engine exit ratios must be positive");
        }
        if engine.buy_no_below >= engine.buy_yes_above {
            return invalid("engine.buy_no_below must be below engine.buy_yes_above");
        }
        if engine.min_entry_price < Decimal::ZERO || engine.min_entry_price >= Decimal::ONE {
            return invalid("engine.min_entry_price must be in [0, 1)");
        }
        if self.telemetry.stats_interval_secs == 0 {
            return invalid("telemetry.stats_interval_secs must be positive");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_config_deserialize() {
        let toml = r#"
            [feed]
            sources = ["binance"]
            assets = ["BTC", "ETH"]

            [market]
            poll_interval_ms = 500

            [aggregator]
            staleness_ttl_secs = 30

            [lag]
            momentum_threshold_pct = 0.10
            history_size = 20

            [engine]
            mode = "live"
            bet_size = 25
            max_trade_size = 10

            [store]
            path = "/tmp/ledger.json"

            [telemetry]
            metrics_port = 9090
            log_level = "debug"
            log_format = "json"
        "#;

        let config = Config::parse(toml).unwrap();
        assert_eq!(config.feed.sources, vec!["binance"]);
        assert_eq!(config.feed.assets, vec![Asset::Btc, Asset::Eth]);
        assert_eq!(config.market.poll_interval_ms, 500);
        assert_eq!(config.aggregator.staleness_ttl(), Some(Duration::from_secs(30)));
        assert_eq!(config.lag.momentum_threshold_pct, dec!(0.10));
        assert_eq!(config.lag.max_yes_for_up, dec!(0.75));
        assert_eq!(config.engine.mode, TradingMode::LiveTrading);
        assert_eq!(config.engine.bet_size, dec!(25));
        assert_eq!(config.store.path, PathBuf::from("/tmp/ledger.json"));
        assert_eq!(config.telemetry.log_format, LogFormat::Json);
    }

    #[test]
    fn test_empty_config_uses_defaults() {
        let config = Config::parse("").unwrap();
        assert_eq!(config.feed.sources, vec!["binance", "coinbase"]);
        assert_eq!(config.feed.assets.len(), 3);
        assert_eq!(config.market.gamma_url, GAMMA_API_URL);
        assert!(config.aggregator.staleness_ttl().is_none());
        assert_eq!(config.reference.lookahead_secs, 60);
        assert_eq!(config.reference.debounce_secs, 5);
        assert_eq!(config.reference.request_timeout_secs, 3);
        assert_eq!(config.engine.mode, TradingMode::Simulation);
        assert_eq!(config.engine.initial_balance, dec!(1000));
        assert_eq!(config.engine.take_profit_ratio, dec!(0.5));
        assert_eq!(config.telemetry.metrics_port, 0);
    }

    #[test]
    fn test_lag_config_defaults() {
        let config = LagConfig::default();
        assert_eq!(config.momentum_threshold_pct, dec!(0.05));
        assert_eq!(config.max_yes_for_up, dec!(0.75));
        assert_eq!(config.min_yes_for_down, dec!(0.25));
        assert_eq!(config.up_implied_probability, dec!(0.95));
        assert_eq!(config.down_implied_probability, dec!(0.05));
        assert_eq!(config.history_size, 50);
    }

    #[test]
    fn test_engine_config_defaults() {
        let config = EngineConfig::default();
        assert_eq!(config.bet_size, dec!(10));
        assert_eq!(config.max_trade_size, dec!(10));
        assert_eq!(config.buy_yes_above, dec!(0.8));
        assert_eq!(config.buy_no_below, dec!(0.2));
        assert_eq!(config.min_entry_price, dec!(0.01));
    }

    #[test]
    fn test_trading_mode_aliases() {
        #[derive(Deserialize)]
        struct Wrapper {
            mode: TradingMode,
        }

        let parse = |s: &str| toml::from_str::<Wrapper>(&format!("mode = \"{s}\"")).unwrap().mode;
        assert_eq!(parse("simulation"), TradingMode::Simulation);
        assert_eq!(parse("monitor_only"), TradingMode::MonitorOnly);
        assert_eq!(parse("monitor"), TradingMode::MonitorOnly);
        assert_eq!(parse("live_trading"), TradingMode::LiveTrading);
        assert_eq!(TradingMode::MonitorOnly.to_string(), "MONITOR_ONLY");
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let err = Config::parse("[engine]\nbet_size = 0").unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));

        let err = Config::parse("[engine]\nbuy_yes_above = 0.1").unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));

        let err = Config::parse("[feed]\nassets = []").unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
    }

    #[test]
    fn test_parse_error() {
        let err = Config::parse("[engine\nmode = ").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn test_config_load_nonexistent() {
        let result = Config::load("/nonexistent/path/config.toml");
        assert!(matches!(result, Err(ConfigError::Io(_))));
    }

    #[test]
    fn test_bundled_config_is_valid() {
        let config = Config::bundled().unwrap();
        assert_eq!(config.engine.mode, TradingMode::Simulation);
        assert!(!config.feed.sources.is_empty());
    }
}
