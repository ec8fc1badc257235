//! Coinbase Exchange candle lookup

use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, TimeDelta, Utc};
use reqwest::Client;
use rust_decimal::Decimal;
use std::time::Duration;

use super::{decimal_from_value, floor_to_minute, CandleError, CandleSource};
use crate::feed::Asset;

/// Coinbase Exchange REST base URL
pub const COINBASE_REST_URL: &str = "https://api.exchange.coinbase.com";

/// Candle width requested from Coinbase (seconds)
const GRANULARITY_SECS: i64 = 60;

/// Fallback candle source: Coinbase Exchange candles
pub struct CoinbaseCandles {
    base_url: String,
    client: Client,
}

impl CoinbaseCandles {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self, CandleError> {
        // Coinbase rejects requests without a User-Agent
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(concat!("poly-lag/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self {
            base_url: base_url.into(),
            client,
        })
    }
}

#[async_trait]
impl CandleSource for CoinbaseCandles {
    fn name(&self) -> &'static str {
        "coinbase"
    }

    async fn open_price(&self, asset: Asset, at: DateTime<Utc>) -> Result<Option<Decimal>, CandleError> {
        let start = floor_to_minute(at);
        let end = start + TimeDelta::seconds(GRANULARITY_SECS);
        let url = format!(
            "{}/products/{}/candles",
            self.base_url.trim_end_matches('/'),
            asset.coinbase_product()
        );

        let response = self
            .client
            .get(&url)
            .query(&[
                ("start", start.to_rfc3339_opts(SecondsFormat::Secs, true)),
                ("end", end.to_rfc3339_opts(SecondsFormat::Secs, true)),
                ("granularity", GRANULARITY_SECS.to_string()),
            ])
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(CandleError::Status { status, body });
        }

        let body: serde_json::Value = response.json().await?;
        parse_candles(&body, start.timestamp())
    }
}

/// Open price from `[[time, low, high, open, close, volume], ...]` (newest first)
///
/// Prefers the bucket starting exactly at `start_secs`, else the oldest one.
fn parse_candles(body: &serde_json::Value, start_secs: i64) -> Result<Option<Decimal>, CandleError> {
    let rows = body
        .as_array()
        .ok_or_else(|| CandleError::Malformed("candles response is not an array".to_string()))?;

    let exact = rows
        .iter()
        .find(|row| row.get(0).and_then(serde_json::Value::as_i64) == Some(start_secs));

    let Some(row) = exact.or_else(|| rows.last()) else {
        return Ok(None);
    };

    row.get(3)
        .and_then(decimal_from_value)
        .map(Some)
        .ok_or_else(|| CandleError::Malformed(format!("candle without open price: {row}")))
}
