//! Run command implementation

use crate::app::{merge_feeds, Bot};
use crate::config::{Config, TradingMode};
use crate::execution::{OrderExecutor, PaperExecutor};
use crate::feed::build_feeds;
use crate::market::{GammaQuoteFeed, QuoteFeed};
use crate::store::JsonTradeStore;
use anyhow::Context;
use clap::Args;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

#[derive(Args, Debug)]
pub struct RunArgs {
    /// Trading mode (overrides config)
    #[arg(short, long, value_enum)]
    pub mode: Option<TradingMode>,

    /// Trade store path (overrides config)
    #[arg(short, long)]
    pub store: Option<PathBuf>,

    /// Route live orders to the in-process paper executor
    #[arg(long)]
    pub paper_executor: bool,
}

impl RunArgs {
    pub async fn execute(&self, mut config: Config) -> anyhow::Result<()> {
        if let Some(mode) = self.mode {
            config.engine.mode = mode;
        }
        config.store.path = super::store_path(&config, self.store.as_ref());
        config.validate()?;

        let executor: Option<Arc<dyn OrderExecutor>> = match config.engine.mode {
            TradingMode::LiveTrading if self.paper_executor => {
                tracing::warn!("Live mode routed to the paper executor");
                Some(Arc::new(PaperExecutor::new()))
            }
            TradingMode::LiveTrading => {
                anyhow::bail!("live trading needs an order executor; pass --paper-executor to rehearse")
            }
            _ => None,
        };

        let store = JsonTradeStore::open(&config.store.path)
            .with_context(|| format!("opening trade store {}", config.store.path.display()))?;
        let mut bot = Bot::from_config(&config, Box::new(store), executor)?;

        let feeds = build_feeds(&config.feed.sources, &config.feed.assets);
        if feeds.is_empty() {
            anyhow::bail!("no usable spot feeds in feed.sources");
        }
        let mut receivers = Vec::with_capacity(feeds.len());
        for feed in &feeds {
            receivers.push(feed.subscribe().await?);
            tracing::info!(feed = feed.name(), "Spot feed started");
        }
        let spot_rx = merge_feeds(receivers);

        let quote_feed = GammaQuoteFeed::new(config.market.gamma(), config.feed.assets.clone())?;
        let quote_rx = quote_feed.subscribe().await?;

        tracing::info!(
            mode = %config.engine.mode,
            store = %config.store.path.display(),
            "Starting lag trader"
        );

        bot.run(
            spot_rx,
            quote_rx,
            Duration::from_secs(config.telemetry.stats_interval_secs),
        )
        .await
    }
}
