//! Aggregated spot price types

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::feed::Asset;

/// Cross-exchange spot price for one asset
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AggregatedPrice {
    pub asset: Asset,
    /// Mean of each contributing source's latest price
    pub price: Decimal,
    /// Number of sources in the mean
    pub contributing_sources: usize,
    /// Timestamp of the sample that triggered this aggregation
    pub timestamp: DateTime<Utc>,
}

/// Last price seen from one source
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct SourceQuote {
    pub price: Decimal,
    pub seen_at: DateTime<Utc>,
}
