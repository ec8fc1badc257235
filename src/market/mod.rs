//! Market quote module
//!
//! Polls Polymarket's Gamma API for crypto up/down markets and emits per-market quotes

mod gamma;

pub use gamma::{GammaConfig, GammaQuoteFeed, GAMMA_API_URL};

use crate::feed::Asset;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;

/// How a binary market settles
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MarketKind {
    /// Settles on close vs. the window's open price
    UpDown,
    /// Settles against a fixed strike named in the question
    PriceStrike,
    Other,
}

impl MarketKind {
    /// Classify a market from its question text
    pub fn classify(question: &str) -> Self {
        let lower = question.to_lowercase();
        if lower.contains("up or down") {
            MarketKind::UpDown
        } else if lower.contains("above")
            || lower.contains("below")
            || lower.contains('>')
            || lower.contains('<')
        {
            MarketKind::PriceStrike
        } else {
            MarketKind::Other
        }
    }
}

/// CLOB token ids for a binary market's two outcomes
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenPair {
    pub yes: String,
    pub no: String,
}

impl TokenPair {
    pub fn new(yes: impl Into<String>, no: impl Into<String>) -> Self {
        Self {
            yes: yes.into(),
            no: no.into(),
        }
    }

    /// Build from a `[yes, no, ..]` list; `None` if fewer than two ids
    pub fn from_list(ids: &[String]) -> Option<Self> {
        match ids {
            [yes, no, ..] if !yes.is_empty() && !no.is_empty() => Some(Self::new(yes, no)),
            _ => None,
        }
    }
}

/// YES/NO prices as quoted by the venue
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct OutcomePrices {
    pub yes: Decimal,
    /// Missing when the venue only quoted the YES side
    pub no: Option<Decimal>,
}

impl OutcomePrices {
    pub fn new(yes: Decimal, no: Option<Decimal>) -> Self {
        Self { yes, no }
    }

    /// NO price, falling back to `1 - yes` when absent or non-positive
    pub fn no_or_complement(&self) -> Decimal {
        match self.no {
            Some(no) if no > Decimal::ZERO => no,
            _ => Decimal::ONE - self.yes,
        }
    }
}

/// A quote update for one binary market
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MarketQuote {
    pub asset: Asset,
    /// Venue market identifier
    pub market_id: String,
    /// Market question text
    pub question: String,
    pub yes_price: Decimal,
    pub no_price: Option<Decimal>,
    /// Start of the settlement window (up/down markets)
    pub anchor_timestamp: Option<DateTime<Utc>>,
    pub market_kind: MarketKind,
    pub token_ids: Option<TokenPair>,
    /// When the quote was observed
    pub timestamp: DateTime<Utc>,
}

impl MarketQuote {
    pub fn outcome_prices(&self) -> OutcomePrices {
        OutcomePrices::new(self.yes_price, self.no_price)
    }
}

/// Trait for market quote feed implementations
#[async_trait]
pub trait QuoteFeed: Send + Sync {
    /// Subscribe to quote updates
    async fn subscribe(&self) -> anyhow::Result<mpsc::Receiver<MarketQuote>>;
}
