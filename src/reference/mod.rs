//! Reference price module
//!
//! Resolves the open price of an up/down market's settlement window from
//! historical exchange candles. Binance klines are the primary source and
//! Coinbase candles the fallback; every resolved price is cached per market.

mod binance;
mod coinbase;
mod resolver;

pub use binance::BinanceCandles;
pub use coinbase::CoinbaseCandles;
pub use resolver::ReferenceResolver;

use async_trait::async_trait;
use chrono::{DateTime, DurationRound, TimeDelta, Utc};
use rust_decimal::Decimal;
use std::str::FromStr;
use thiserror::Error;

use crate::feed::Asset;

/// Candle lookup errors
#[derive(Debug, Error)]
pub enum CandleError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("unexpected status {status}: {body}")]
    Status { status: u16, body: String },

    #[error("malformed candle response: {0}")]
    Malformed(String),
}

/// A source of historical candle open prices
#[async_trait]
pub trait CandleSource: Send + Sync {
    /// Source name for logs
    fn name(&self) -> &'static str;

    /// Open price of the one-minute candle containing `at`
    ///
    /// `Ok(None)` means the venue has no candle for that time yet.
    async fn open_price(&self, asset: Asset, at: DateTime<Utc>) -> Result<Option<Decimal>, CandleError>;
}

/// Start of the minute containing `at`
pub(crate) fn floor_to_minute(at: DateTime<Utc>) -> DateTime<Utc> {
    at.duration_trunc(TimeDelta::minutes(1)).unwrap_or(at)
}

/// Read a price that venues encode either as a JSON string or a number
pub(crate) fn decimal_from_value(value: &serde_json::Value) -> Option<Decimal> {
    match value {
        serde_json::Value::String(s) => Decimal::from_str(s).ok(),
        serde_json::Value::Number(n) => Decimal::from_str(&n.to_string())
            .or_else(|_| Decimal::from_scientific(&n.to_string()))
            .ok(),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use rust_decimal_macros::dec;
    use serde_json::json;

    #[test]
    fn test_floor_to_minute() {
        let at = Utc.with_ymd_and_hms(2024, 10, 16, 19, 0, 42).unwrap();
        let floored = floor_to_minute(at);
        assert_eq!(floored, Utc.with_ymd_and_hms(2024, 10, 16, 19, 0, 0).unwrap());
        assert_eq!(floor_to_minute(floored), floored);
    }

    #[test]
    fn test_decimal_from_value() {
        assert_eq!(decimal_from_value(&json!("67012.34")), Some(dec!(67012.34)));
        assert_eq!(decimal_from_value(&json!(67012.5)), Some(dec!(67012.5)));
        assert_eq!(decimal_from_value(&json!(67012)), Some(dec!(67012)));
        assert_eq!(decimal_from_value(&json!("abc")), None);
        assert_eq!(decimal_from_value(&json!(null)), None);
    }
}
