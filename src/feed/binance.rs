//! Binance WebSocket trade stream

use super::connection::{run_stream, StreamConfig};
use super::{Asset, PriceFeed, SpotPriceSample};
use async_trait::async_trait;
use chrono::{TimeZone, Utc};
use rust_decimal::Decimal;
use serde::Deserialize;
use std::str::FromStr;
use tokio::sync::mpsc;

/// Binance WebSocket base URL
pub const BINANCE_WS_URL: &str = "wss://stream.binance.com:9443/ws";

/// Source label attached to every sample
pub const SOURCE: &str = "binance";

/// Binance trade message structure
#[derive(Debug, Deserialize)]
struct BinanceTradeMessage {
    /// Event type
    #[serde(rename = "e")]
    event_type: String,
    /// Symbol
    #[serde(rename = "s")]
    symbol: String,
    /// Price
    #[serde(rename = "p")]
    price: String,
    /// Trade time (milliseconds)
    #[serde(rename = "T")]
    trade_time: i64,
}

/// Binance trade feed for one or more assets over a single socket
pub struct BinanceFeed {
    base_url: String,
    assets: Vec<Asset>,
}

impl BinanceFeed {
    /// Create a feed for the given assets
    pub fn new(assets: Vec<Asset>) -> Self {
        Self::with_base_url(BINANCE_WS_URL, assets)
    }

    /// Create a feed against a custom base URL
    pub fn with_base_url(base_url: impl Into<String>, assets: Vec<Asset>) -> Self {
        Self {
            base_url: base_url.into(),
            assets,
        }
    }

    /// Raw stream URL carrying every asset's `@trade` stream
    fn build_ws_url(&self) -> String {
        let streams: Vec<String> = self
            .assets
            .iter()
            .map(|a| format!("{}@trade", a.binance_symbol().to_lowercase()))
            .collect();
        format!("{}/{}", self.base_url.trim_end_matches('/'), streams.join("/"))
    }

    /// Parse a Binance trade message into a sample
    fn parse_message(msg: &str) -> Option<SpotPriceSample> {
        let trade: BinanceTradeMessage = serde_json::from_str(msg).ok()?;

        if trade.event_type != "trade" {
            return None;
        }

        let asset = Asset::from_binance_symbol(&trade.symbol)?;
        let price = Decimal::from_str(&trade.price).ok()?;
        let timestamp = Utc.timestamp_millis_opt(trade.trade_time).single()?;

        Some(SpotPriceSample::new(SOURCE, asset, price, timestamp))
    }
}

#[async_trait]
impl PriceFeed for BinanceFeed {
    fn name(&self) -> &'static str {
        SOURCE
    }

    async fn subscribe(&self) -> anyhow::Result<mpsc::Receiver<SpotPriceSample>> {
        if self.assets.is_empty() {
            anyhow::bail!("Binance feed has no assets configured");
        }

        let (tx, rx) = mpsc::channel(1024);
        let config = StreamConfig::new(SOURCE, self.build_ws_url());

        tracing::info!(assets = ?self.assets, "Subscribing to Binance feed");
        tokio::spawn(run_stream(config, Self::parse_message, tx));

        Ok(rx)
    }
}
