//! CLI interface for poly-lag
//!
//! Provides subcommands for:
//! - `run`: Stream prices, detect lag and trade
//! - `report`: Print the 24h trading report
//! - `status`: Show the ledger and open positions
//! - `config`: Show the effective configuration

mod report;
mod run;
mod status;

pub use report::ReportArgs;
pub use run::RunArgs;
pub use status::StatusArgs;

use crate::config::Config;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "poly-lag")]
#[command(about = "Trades Polymarket crypto up/down markets when odds lag the spot move")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Path to configuration file
    #[arg(short, long, default_value = "config.toml")]
    pub config: String,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Stream prices and trade
    Run(RunArgs),
    /// Print the 24h trading report
    Report(ReportArgs),
    /// Show ledger and open positions
    Status(StatusArgs),
    /// Show configuration
    Config,
}

/// Trade store path from a `--store` override or the config
fn store_path(config: &Config, overridden: Option<&PathBuf>) -> PathBuf {
    overridden
        .cloned()
        .unwrap_or_else(|| config.store.path.clone())
}

/// Human-readable configuration summary
pub fn describe_config(config: &Config) -> String {
    let assets: Vec<String> = config.feed.assets.iter().map(|a| a.to_string()).collect();
    let mut lines = vec![
        "Current configuration:".to_string(),
        format!(
            "  Feeds: {} [{}]",
            config.feed.sources.join(", "),
            assets.join(", ")
        ),
        format!(
            "  Markets: {} every {}ms (tag {})",
            config.market.gamma_url, config.market.poll_interval_ms, config.market.tag_slug
        ),
        format!(
            "  Lag: threshold {}%, YES gates {}/{}",
            config.lag.momentum_threshold_pct, config.lag.max_yes_for_up, config.lag.min_yes_for_down
        ),
        format!(
            "  Engine: {} bet ${} (max ${}), TP {} / SL {}",
            config.engine.mode,
            config.engine.bet_size,
            config.engine.max_trade_size,
            config.engine.take_profit_ratio,
            config.engine.stop_loss_ratio
        ),
        format!("  Store: {}", config.store.path.display()),
    ];
    if let Some(ttl) = config.aggregator.staleness_ttl_secs {
        lines.push(format!("  Spot staleness TTL: {}s", ttl));
    }
    lines.join("\n")
}
