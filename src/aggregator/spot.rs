//! Multi-source spot price aggregation

use std::collections::{HashMap, HashSet};
use std::time::Duration;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;

use super::types::{AggregatedPrice, SourceQuote};
use crate::feed::{Asset, SpotPriceSample};
use crate::telemetry::{record_counter, CounterMetric};

/// Combines per-exchange samples into one price per asset
///
/// Every source contributes its most recent price with equal weight. With a
/// staleness TTL configured, sources whose last sample is older than the TTL
/// (measured from the incoming sample) drop out of the mean but keep their
/// slot, so a fresh sample brings them back.
#[derive(Debug)]
pub struct PriceAggregator {
    tracked: HashSet<Asset>,
    staleness_ttl: Option<chrono::Duration>,
    sources: HashMap<Asset, HashMap<String, SourceQuote>>,
    latest: HashMap<Asset, AggregatedPrice>,
}

impl PriceAggregator {
    /// Create an aggregator for the given assets
    pub fn new(tracked: impl IntoIterator<Item = Asset>, staleness_ttl: Option<Duration>) -> Self {
        Self {
            tracked: tracked.into_iter().collect(),
            staleness_ttl: staleness_ttl.and_then(|ttl| chrono::Duration::from_std(ttl).ok()),
            sources: HashMap::new(),
            latest: HashMap::new(),
        }
    }

    /// Ingest a sample and return the asset's new aggregate
    ///
    /// Returns `None` for untracked assets, non-positive prices, or when every
    /// known source is stale.
    pub fn ingest(&mut self, sample: &SpotPriceSample) -> Option<AggregatedPrice> {
        if !self.tracked.contains(&sample.asset) {
            return None;
        }
        if sample.price <= Decimal::ZERO {
            tracing::debug!(
                source = %sample.source,
                asset = %sample.asset,
                price = %sample.price,
                "Dropping non-positive spot price"
            );
            return None;
        }

        record_counter(CounterMetric::SpotSamples);

        let per_source = self.sources.entry(sample.asset).or_default();
        per_source.insert(
            sample.source.clone(),
            SourceQuote {
                price: sample.price,
                seen_at: sample.timestamp,
            },
        );

        let aggregated = Self::mean(per_source, self.staleness_ttl, sample.timestamp).map(
            |(price, contributing_sources)| AggregatedPrice {
                asset: sample.asset,
                price,
                contributing_sources,
                timestamp: sample.timestamp,
            },
        )?;

        tracing::trace!(
            asset = %aggregated.asset,
            price = %aggregated.price,
            sources = aggregated.contributing_sources,
            "Aggregated spot price"
        );

        self.latest.insert(sample.asset, aggregated.clone());
        Some(aggregated)
    }

    fn mean(
        quotes: &HashMap<String, SourceQuote>,
        ttl: Option<chrono::Duration>,
        now: DateTime<Utc>,
    ) -> Option<(Decimal, usize)> {
        let fresh: Vec<Decimal> = quotes
            .values()
            .filter(|q| ttl.map_or(true, |ttl| now - q.seen_at <= ttl))
            .map(|q| q.price)
            .collect();

        if fresh.is_empty() {
            return None;
        }

        let sum: Decimal = fresh.iter().sum();
        Some((sum / Decimal::from(fresh.len()), fresh.len()))
    }

    /// Last emitted aggregate for an asset
    pub fn latest(&self, asset: Asset) -> Option<&AggregatedPrice> {
        self.latest.get(&asset)
    }

    /// Number of sources that have ever reported the asset
    pub fn source_count(&self, asset: Asset) -> usize {
        self.sources.get(&asset).map_or(0, HashMap::len)
    }
}
