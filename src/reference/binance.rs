//! Binance kline lookup

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::Client;
use rust_decimal::Decimal;
use std::time::Duration;

use super::{decimal_from_value, floor_to_minute, CandleError, CandleSource};
use crate::feed::Asset;

/// Binance REST base URL
pub const BINANCE_REST_URL: &str = "https://api.binance.com";

/// Primary candle source: Binance spot klines
pub struct BinanceCandles {
    base_url: String,
    client: Client,
}

impl BinanceCandles {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self, CandleError> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            base_url: base_url.into(),
            client,
        })
    }
}

#[async_trait]
impl CandleSource for BinanceCandles {
    fn name(&self) -> &'static str {
        "binance"
    }

    async fn open_price(&self, asset: Asset, at: DateTime<Utc>) -> Result<Option<Decimal>, CandleError> {
        let url = format!("{}/api/v3/klines", self.base_url.trim_end_matches('/'));
        let start_ms = floor_to_minute(at).timestamp_millis().to_string();

        let response = self
            .client
            .get(&url)
            .query(&[
                ("symbol", asset.binance_symbol().as_str()),
                ("interval", "1m"),
                ("startTime", start_ms.as_str()),
                ("limit", "1"),
            ])
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(CandleError::Status { status, body });
        }

        let body: serde_json::Value = response.json().await?;
        parse_klines(&body)
    }
}

/// Open price from a klines response: `[[openTime, "open", "high", ...], ...]`
fn parse_klines(body: &serde_json::Value) -> Result<Option<Decimal>, CandleError> {
    let rows = body
        .as_array()
        .ok_or_else(|| CandleError::Malformed("klines response is not an array".to_string()))?;

    let Some(first) = rows.first() else {
        return Ok(None);
    };

    first
        .get(1)
        .and_then(decimal_from_value)
        .map(Some)
        .ok_or_else(|| CandleError::Malformed(format!("kline without open price: {first}")))
}
