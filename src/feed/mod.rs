//! Spot price feed module
//!
//! Streams trade/ticker prices for BTC, ETH and SOL from Binance and Coinbase

mod binance;
mod coinbase;
pub mod connection;
mod types;

pub use binance::BinanceFeed;
pub use coinbase::CoinbaseFeed;
pub use connection::FeedError;
pub use types::{Asset, SpotPriceSample};

use async_trait::async_trait;
use tokio::sync::mpsc;

/// Trait for spot price feed implementations
#[async_trait]
pub trait PriceFeed: Send + Sync {
    /// Source label used on emitted samples
    fn name(&self) -> &'static str;

    /// Subscribe to price updates
    async fn subscribe(&self) -> anyhow::Result<mpsc::Receiver<SpotPriceSample>>;
}

/// Build the connectors named in the feed config
///
/// Unknown source names are skipped with a warning.
pub fn build_feeds(sources: &[String], assets: &[Asset]) -> Vec<Box<dyn PriceFeed>> {
    let mut feeds: Vec<Box<dyn PriceFeed>> = Vec::new();
    for source in sources {
        match source.to_lowercase().as_str() {
            binance::SOURCE => feeds.push(Box::new(BinanceFeed::new(assets.to_vec()))),
            coinbase::SOURCE => feeds.push(Box::new(CoinbaseFeed::new(assets.to_vec()))),
            other => tracing::warn!(source = other, "Unknown spot source, skipping"),
        }
    }
    feeds
}
