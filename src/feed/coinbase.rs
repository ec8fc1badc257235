//! Coinbase Exchange ticker channel

use super::connection::{run_stream, StreamConfig};
use super::{Asset, PriceFeed, SpotPriceSample};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Deserialize;
use std::str::FromStr;
use tokio::sync::mpsc;

/// Coinbase Exchange WebSocket feed URL
pub const COINBASE_WS_URL: &str = "wss://ws-feed.exchange.coinbase.com";

/// Source label attached to every sample
pub const SOURCE: &str = "coinbase";

#[derive(Debug, Deserialize)]
struct CoinbaseTicker {
    #[serde(rename = "type")]
    message_type: String,
    product_id: Option<String>,
    price: Option<String>,
    time: Option<String>,
}

/// Coinbase ticker feed
pub struct CoinbaseFeed {
    url: String,
    assets: Vec<Asset>,
}

impl CoinbaseFeed {
    pub fn new(assets: Vec<Asset>) -> Self {
        Self::with_url(COINBASE_WS_URL, assets)
    }

    pub fn with_url(url: impl Into<String>, assets: Vec<Asset>) -> Self {
        Self {
            url: url.into(),
            assets,
        }
    }

    fn subscribe_message(&self) -> String {
        let product_ids: Vec<String> = self.assets.iter().map(Asset::coinbase_product).collect();
        serde_json::json!({
            "type": "subscribe",
            "product_ids": product_ids,
            "channels": ["ticker"],
        })
        .to_string()
    }

    /// Parse a ticker message; subscriptions acks and heartbeats yield `None`
    fn parse_message(msg: &str) -> Option<SpotPriceSample> {
        let ticker: CoinbaseTicker = serde_json::from_str(msg).ok()?;

        if ticker.message_type != "ticker" {
            return None;
        }

        let asset = Asset::from_coinbase_product(ticker.product_id.as_deref()?)?;
        let price = Decimal::from_str(ticker.price.as_deref()?).ok()?;
        let timestamp = ticker
            .time
            .as_deref()
            .and_then(|t| DateTime::parse_from_rfc3339(t).ok())
            .map(|dt| dt.with_timezone(&Utc))
            .unwrap_or_else(Utc::now);

        Some(SpotPriceSample::new(SOURCE, asset, price, timestamp))
    }
}

#[async_trait]
impl PriceFeed for CoinbaseFeed {
    fn name(&self) -> &'static str {
        SOURCE
    }

    async fn subscribe(&self) -> anyhow::Result<mpsc::Receiver<SpotPriceSample>> {
        if self.assets.is_empty() {
            anyhow::bail!("Coinbase feed has no assets configured");
        }

        let (tx, rx) = mpsc::channel(1024);
        let config = StreamConfig::new(SOURCE, self.url.clone()).subscribe_with(self.subscribe_message());

        tracing::info!(assets = ?self.assets, "Subscribing to Coinbase feed");
        tokio::spawn(run_stream(config, Self::parse_message, tx));

        Ok(rx)
    }
}
