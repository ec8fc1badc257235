//! Price feed types

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Crypto asset traded against the up/down markets
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Asset {
    Btc,
    Eth,
    Sol,
}

impl Asset {
    /// All supported assets
    pub const ALL: [Asset; 3] = [Asset::Btc, Asset::Eth, Asset::Sol];

    /// Ticker symbol (e.g., "BTC")
    pub fn ticker(&self) -> &'static str {
        match self {
            Asset::Btc => "BTC",
            Asset::Eth => "ETH",
            Asset::Sol => "SOL",
        }
    }

    /// Binance USDT pair symbol (e.g., "BTCUSDT")
    pub fn binance_symbol(&self) -> String {
        format!("{}USDT", self.ticker())
    }

    /// Coinbase product id (e.g., "BTC-USD")
    pub fn coinbase_product(&self) -> String {
        format!("{}-USD", self.ticker())
    }

    /// Map a Binance pair symbol back to an asset
    pub fn from_binance_symbol(symbol: &str) -> Option<Self> {
        let base = symbol.to_ascii_uppercase();
        base.strip_suffix("USDT")?.parse().ok()
    }

    /// Map a Coinbase product id back to an asset
    pub fn from_coinbase_product(product_id: &str) -> Option<Self> {
        let base = product_id.to_ascii_uppercase();
        base.strip_suffix("-USD")?.parse().ok()
    }

    /// Detect the asset named in a market/event title
    ///
    /// Checked in BTC, ETH, SOL order; the first hit wins.
    pub fn from_title(title: &str) -> Option<Self> {
        let upper = title.to_uppercase();
        if upper.contains("BITCOIN") || upper.contains("BTC") {
            Some(Asset::Btc)
        } else if upper.contains("ETHEREUM") || upper.contains("ETH") {
            Some(Asset::Eth)
        } else if upper.contains("SOLANA") || upper.contains("SOL") {
            Some(Asset::Sol)
        } else {
            None
        }
    }
}

impl fmt::Display for Asset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.ticker())
    }
}

impl FromStr for Asset {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "BTC" => Ok(Asset::Btc),
            "ETH" => Ok(Asset::Eth),
            "SOL" => Ok(Asset::Sol),
            other => Err(format!("unsupported asset: {other}")),
        }
    }
}

/// A single spot price observation from one exchange
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpotPriceSample {
    /// Exchange the price came from (e.g., "binance")
    pub source: String,
    /// Asset being priced
    pub asset: Asset,
    /// Last trade / ticker price in USD
    pub price: Decimal,
    /// Exchange timestamp of the observation
    pub timestamp: DateTime<Utc>,
}

impl SpotPriceSample {
    /// Create a new sample
    pub fn new(
        source: impl Into<String>,
        asset: Asset,
        price: Decimal,
        timestamp: DateTime<Utc>,
    ) -> Self {
        Self {
            source: source.into(),
            asset,
            price,
            timestamp,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_asset_symbols() {
        assert_eq!(Asset::Btc.binance_symbol(), "BTCUSDT");
        assert_eq!(Asset::Eth.coinbase_product(), "ETH-USD");
        assert_eq!(Asset::from_binance_symbol("SOLUSDT"), Some(Asset::Sol));
        assert_eq!(Asset::from_binance_symbol("DOGEUSDT"), None);
        assert_eq!(Asset::from_coinbase_product("BTC-USD"), Some(Asset::Btc));
        assert_eq!(Asset::from_coinbase_product("BTC-EUR"), None);
    }

    #[test]
    fn test_asset_from_title() {
        assert_eq!(
            Asset::from_title("Bitcoin Up or Down - October 16, 3PM ET"),
            Some(Asset::Btc)
        );
        assert_eq!(Asset::from_title("Ethereum Up or Down"), Some(Asset::Eth));
        assert_eq!(Asset::from_title("Solana Up or Down"), Some(Asset::Sol));
        assert_eq!(Asset::from_title("XRP Up or Down"), None);
    }

    #[test]
    fn test_asset_serde_uppercase() {
        let json = serde_json::to_string(&Asset::Eth).unwrap();
        assert_eq!(json, "\"ETH\"");
        let asset: Asset = serde_json::from_str("\"SOL\"").unwrap();
        assert_eq!(asset, Asset::Sol);
    }

    #[test]
    fn test_asset_from_str_case_insensitive() {
        assert_eq!("btc".parse::<Asset>().unwrap(), Asset::Btc);
        assert!("ESPORTS".parse::<Asset>().is_err());
    }
}
