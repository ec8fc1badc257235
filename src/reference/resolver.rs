//! Cached, debounced reference price resolution

use std::collections::HashMap;
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;

use super::binance::BinanceCandles;
use super::coinbase::CoinbaseCandles;
use super::{CandleError, CandleSource};
use crate::config::ReferenceConfig;
use crate::feed::Asset;
use crate::telemetry::{record_counter, record_latency, CounterMetric, LatencyMetric};

/// Resolves and caches the window-open price for each market
///
/// A resolved price never changes for a market, so it is cached for the
/// lifetime of the process. Failed lookups are not retried internally; the
/// next quote for the market triggers another attempt once the debounce
/// window has passed.
pub struct ReferenceResolver {
    sources: Vec<Box<dyn CandleSource>>,
    lookahead: chrono::Duration,
    debounce: chrono::Duration,
    anchors: HashMap<String, Decimal>,
    last_attempt: HashMap<String, DateTime<Utc>>,
}

impl ReferenceResolver {
    /// Create a resolver trying `sources` in order
    pub fn new(sources: Vec<Box<dyn CandleSource>>, lookahead: Duration, debounce: Duration) -> Self {
        Self {
            sources,
            lookahead: chrono::Duration::from_std(lookahead).unwrap_or(chrono::Duration::MAX),
            debounce: chrono::Duration::from_std(debounce).unwrap_or(chrono::Duration::MAX),
            anchors: HashMap::new(),
            last_attempt: HashMap::new(),
        }
    }

    /// Create a resolver with Binance as primary and Coinbase as fallback
    pub fn from_config(config: &ReferenceConfig) -> Result<Self, CandleError> {
        let timeout = Duration::from_secs(config.request_timeout_secs);
        let sources: Vec<Box<dyn CandleSource>> = vec![
            Box::new(BinanceCandles::new(&config.binance_url, timeout)?),
            Box::new(CoinbaseCandles::new(&config.coinbase_url, timeout)?),
        ];

        Ok(Self::new(
            sources,
            Duration::from_secs(config.lookahead_secs),
            Duration::from_secs(config.debounce_secs),
        ))
    }

    /// Resolve the reference price for a market window
    pub async fn resolve(
        &mut self,
        asset: Asset,
        anchor: DateTime<Utc>,
        market_id: &str,
    ) -> Option<Decimal> {
        self.resolve_at(asset, anchor, market_id, Utc::now()).await
    }

    /// Resolve against an explicit clock (for testing)
    pub async fn resolve_at(
        &mut self,
        asset: Asset,
        anchor: DateTime<Utc>,
        market_id: &str,
        now: DateTime<Utc>,
    ) -> Option<Decimal> {
        if let Some(price) = self.anchors.get(market_id) {
            return Some(*price);
        }

        if now
            .checked_add_signed(self.lookahead)
            .is_some_and(|limit| anchor > limit)
        {
            tracing::trace!(market_id, %anchor, "Reference window has not opened yet");
            return None;
        }

        if let Some(last) = self.last_attempt.get(market_id) {
            if now - *last < self.debounce {
                tracing::trace!(market_id, "Reference lookup debounced");
                return None;
            }
        }
        self.last_attempt.insert(market_id.to_string(), now);

        let started = Instant::now();
        for source in &self.sources {
            match source.open_price(asset, anchor).await {
                Ok(Some(price)) if price > Decimal::ZERO => {
                    record_latency(LatencyMetric::ReferenceResolution, started.elapsed());
                    tracing::info!(
                        market_id,
                        %asset,
                        %price,
                        source = source.name(),
                        "Resolved reference price"
                    );
                    self.anchors.insert(market_id.to_string(), price);
                    self.last_attempt.remove(market_id);
                    return Some(price);
                }
                Ok(_) => {
                    tracing::debug!(market_id, source = source.name(), "No candle for reference window");
                }
                Err(e) => {
                    tracing::warn!(market_id, source = source.name(), error = %e, "Reference lookup failed");
                }
            }
        }

        record_counter(CounterMetric::ReferenceMisses);
        None
    }

    /// Cached reference price for a market
    pub fn cached(&self, market_id: &str) -> Option<Decimal> {
        self.anchors.get(market_id).copied()
    }

    /// Number of markets with a resolved reference price
    pub fn cached_count(&self) -> usize {
        self.anchors.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use chrono::TimeZone;
    use rust_decimal_macros::dec;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    enum Reply {
        Price(Decimal),
        Empty,
        Fail,
    }

    struct MockSource {
        reply: Reply,
        calls: Arc<AtomicUsize>,
    }

    #[async_trait]
    impl CandleSource for MockSource {
        fn name(&self) -> &'static str {
            "mock"
        }

        async fn open_price(&self, _asset: Asset, _at: DateTime<Utc>) -> Result<Option<Decimal>, CandleError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            match self.reply {
                Reply::Price(p) => Ok(Some(p)),
                Reply::Empty => Ok(None),
                Reply::Fail => Err(CandleError::Malformed("boom".to_string())),
            }
        }
    }

    fn source(reply: Reply) -> (Box<dyn CandleSource>, Arc<AtomicUsize>) {
        let calls = Arc::new(AtomicUsize::new(0));
        let source = MockSource {
            reply,
            calls: calls.clone(),
        };
        (Box::new(source), calls)
    }

    fn make_resolver(sources: Vec<Box<dyn CandleSource>>) -> ReferenceResolver {
        ReferenceResolver::new(sources, Duration::from_secs(60), Duration::from_secs(5))
    }

    fn t(secs: i64) -> DateTime<Utc> {
        Utc.timestamp_opt(1_729_105_200 + secs, 0).unwrap()
    }

    #[tokio::test]
    async fn test_resolves_from_primary_and_caches() {
        let (primary, primary_calls) = source(Reply::Price(dec!(100000)));
        let (fallback, fallback_calls) = source(Reply::Price(dec!(1)));
        let mut resolver = make_resolver(vec![primary, fallback]);

        let price = resolver.resolve_at(Asset::Btc, t(0), "m1", t(10)).await;
        assert_eq!(price, Some(dec!(100000)));
        assert_eq!(resolver.cached("m1"), Some(dec!(100000)));

        // Cached: no further upstream calls, even inside the debounce window
        let again = resolver.resolve_at(Asset::Btc, t(0), "m1", t(11)).await;
        assert_eq!(again, Some(dec!(100000)));
        assert_eq!(primary_calls.load(Ordering::SeqCst), 1);
        assert_eq!(fallback_calls.load(Ordering::SeqCst), 0);
        assert_eq!(resolver.cached_count(), 1);
    }

    #[tokio::test]
    async fn test_falls_back_on_error_and_empty() {
        let (primary, _) = source(Reply::Fail);
        let (fallback, fallback_calls) = source(Reply::Price(dec!(2500.5)));
        let mut resolver = make_resolver(vec![primary, fallback]);
        assert_eq!(
            resolver.resolve_at(Asset::Eth, t(0), "m1", t(1)).await,
            Some(dec!(2500.5))
        );
        assert_eq!(fallback_calls.load(Ordering::SeqCst), 1);

        let (primary, _) = source(Reply::Empty);
        let (fallback, _) = source(Reply::Price(dec!(150)));
        let mut resolver = make_resolver(vec![primary, fallback]);
        assert_eq!(
            resolver.resolve_at(Asset::Sol, t(0), "m2", t(1)).await,
            Some(dec!(150))
        );
    }

    #[tokio::test]
    async fn test_debounce_limits_upstream_lookups() {
        let (primary, calls) = source(Reply::Fail);
        let mut resolver = make_resolver(vec![primary]);

        assert!(resolver.resolve_at(Asset::Btc, t(0), "m1", t(1)).await.is_none());
        assert!(resolver.resolve_at(Asset::Btc, t(0), "m1", t(4)).await.is_none());
        assert_eq!(calls.load(Ordering::SeqCst), 1);

        // Other markets are debounced independently
        assert!(resolver.resolve_at(Asset::Btc, t(0), "m2", t(4)).await.is_none());
        assert_eq!(calls.load(Ordering::SeqCst), 2);

        // Window elapsed: try again
        assert!(resolver.resolve_at(Asset::Btc, t(0), "m1", t(6)).await.is_none());
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_future_anchor_unresolved_without_lookup() {
        let (primary, calls) = source(Reply::Price(dec!(100)));
        let mut resolver = make_resolver(vec![primary]);

        assert!(resolver.resolve_at(Asset::Btc, t(61), "m1", t(0)).await.is_none());
        assert_eq!(calls.load(Ordering::SeqCst), 0);

        // Exactly at the look-ahead boundary is allowed
        assert_eq!(
            resolver.resolve_at(Asset::Btc, t(60), "m1", t(0)).await,
            Some(dec!(100))
        );
    }

    #[tokio::test]
    async fn test_all_sources_failing_is_unresolved() {
        let (primary, _) = source(Reply::Fail);
        let (fallback, _) = source(Reply::Empty);
        let mut resolver = make_resolver(vec![primary, fallback]);
        assert!(resolver.resolve_at(Asset::Btc, t(0), "m1", t(1)).await.is_none());
        assert!(resolver.cached("m1").is_none());
    }

    #[tokio::test]
    async fn test_from_config() {
        let resolver = ReferenceResolver::from_config(&ReferenceConfig::default()).unwrap();
        assert_eq!(resolver.sources.len(), 2);
        assert_eq!(resolver.sources[0].name(), "binance");
        assert_eq!(resolver.sources[1].name(), "coinbase");
    }
}
