//! Bot event loop
//!
//! Wires the aggregator, the lag strategy and the position manager together.
//! Quotes are handled one at a time: a quote's evaluation and any resulting
//! entry or exit finish before the next quote is read. Spot samples keep
//! flowing into the aggregator while a quote waits on an external call.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use rust_decimal::prelude::ToPrimitive;
use tokio::sync::mpsc;
use tracing::{info, warn};

use crate::aggregator::{AggregatedPrice, PriceAggregator, SpotBoard};
use crate::config::Config;
use crate::execution::OrderExecutor;
use crate::feed::SpotPriceSample;
use crate::lag::{LagStrategy, Opportunity};
use crate::market::MarketQuote;
use crate::position::{EngineStats, PositionManager};
use crate::reference::ReferenceResolver;
use crate::store::TradeStore;
use crate::telemetry::{record_counter, set_gauge, CounterMetric, GaugeMetric};

pub struct Bot {
    aggregator: PriceAggregator,
    strategy: LagStrategy,
    positions: PositionManager,
}

impl Bot {
    pub fn new(aggregator: PriceAggregator, strategy: LagStrategy, positions: PositionManager) -> Self {
        Self {
            aggregator,
            strategy,
            positions,
        }
    }

    /// Build every component from configuration
    pub fn from_config(
        config: &Config,
        store: Box<dyn TradeStore>,
        executor: Option<Arc<dyn OrderExecutor>>,
    ) -> anyhow::Result<Self> {
        let aggregator = PriceAggregator::new(
            config.feed.assets.iter().copied(),
            config.aggregator.staleness_ttl(),
        );
        let resolver = ReferenceResolver::from_config(&config.reference)?;
        let strategy = LagStrategy::new(config.lag.clone(), resolver);
        let positions = PositionManager::new(config.engine.clone(), store, executor)?;

        Ok(Self::new(aggregator, strategy, positions))
    }

    pub fn aggregator(&self) -> &PriceAggregator {
        &self.aggregator
    }

    pub fn strategy(&self) -> &LagStrategy {
        &self.strategy
    }

    pub fn positions(&self) -> &PositionManager {
        &self.positions
    }

    /// Fold a spot sample into the aggregate and pass it to the strategy
    pub fn handle_spot(&mut self, sample: &SpotPriceSample) -> Option<AggregatedPrice> {
        let aggregated = self.aggregator.ingest(sample)?;
        self.strategy.on_spot(&aggregated);
        Some(aggregated)
    }

    /// Evaluate a quote, then enter or mark positions
    pub async fn handle_quote_at(
        &mut self,
        quote: &MarketQuote,
        now: DateTime<Utc>,
    ) -> Option<Opportunity> {
        dispatch_quote(&mut self.strategy, &mut self.positions, quote, now).await
    }

    /// Log the ledger summary and update gauges
    pub fn publish_stats(&self) -> EngineStats {
        let stats = self.positions.stats();

        set_gauge(GaugeMetric::Equity, stats.equity.to_f64().unwrap_or_default());
        set_gauge(GaugeMetric::Cash, stats.cash.to_f64().unwrap_or_default());
        set_gauge(
            GaugeMetric::RealizedPnl,
            stats.realized_pnl.to_f64().unwrap_or_default(),
        );
        set_gauge(GaugeMetric::OpenPositions, stats.open_trades as f64);

        info!(
            mode = %stats.mode,
            equity = %stats.equity.round_dp(2),
            cash = %stats.cash.round_dp(2),
            realized_pnl = %stats.realized_pnl.round_dp(2),
            open = stats.open_trades,
            total = stats.total_trades,
            references = self.strategy.resolver().cached_count(),
            "Engine stats"
        );
        for opportunity in self.strategy.recent_opportunities(5) {
            tracing::debug!(
                asset = %opportunity.asset,
                market_id = %opportunity.market_id,
                delta_pct = %opportunity.delta_percent().round_dp(3),
                implied = %opportunity.implied_probability,
                at = %opportunity.timestamp,
                "Recent opportunity"
            );
        }
        stats
    }

    /// Run until ctrl-c or until every input channel closes
    ///
    /// Queued spot samples are drained before the next quote. While a quote
    /// is in flight, spot keeps updating the aggregate; a stats tick is
    /// deferred and ctrl-c stops the loop once the quote has finished.
    pub async fn run(
        &mut self,
        mut spot_rx: mpsc::Receiver<SpotPriceSample>,
        mut quote_rx: mpsc::Receiver<MarketQuote>,
        stats_interval: Duration,
    ) -> anyhow::Result<()> {
        let mut stats_timer = tokio::time::interval(stats_interval);
        stats_timer.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

        let board = self.strategy.spot_board();
        let mut spot_open = true;
        let mut quotes_open = true;
        let mut shutdown = false;

        info!("Bot running");

        while !shutdown && (spot_open || quotes_open) {
            tokio::select! {
                biased;

                _ = tokio::signal::ctrl_c() => {
                    info!("Received shutdown signal");
                    shutdown = true;
                }
                sample = spot_rx.recv(), if spot_open => {
                    spot_open = ingest_spot(&mut self.aggregator, &board, sample);
                }
                _ = stats_timer.tick() => {
                    self.publish_stats();
                }
                quote = quote_rx.recv(), if quotes_open => match quote {
                    Some(quote) => {
                        let mut stats_due = false;
                        {
                            let handler = dispatch_quote(
                                &mut self.strategy,
                                &mut self.positions,
                                &quote,
                                Utc::now(),
                            );
                            tokio::pin!(handler);

                            loop {
                                tokio::select! {
                                    biased;

                                    _ = &mut handler => break,
                                    sample = spot_rx.recv(), if spot_open => {
                                        spot_open = ingest_spot(&mut self.aggregator, &board, sample);
                                    }
                                    _ = stats_timer.tick(), if !stats_due => {
                                        stats_due = true;
                                    }
                                    _ = tokio::signal::ctrl_c(), if !shutdown => {
                                        info!("Received shutdown signal, finishing in-flight quote");
                                        shutdown = true;
                                    }
                                }
                            }
                        }

                        if stats_due {
                            self.publish_stats();
                        }
                    }
                    None => {
                        warn!("Quote feed closed");
                        quotes_open = false;
                    }
                },
            }
        }

        let stats = self.publish_stats();
        info!(equity = %stats.equity.round_dp(2), "Bot stopped");
        Ok(())
    }
}

/// Evaluate a quote, then enter or mark positions
async fn dispatch_quote(
    strategy: &mut LagStrategy,
    positions: &mut PositionManager,
    quote: &MarketQuote,
    now: DateTime<Utc>,
) -> Option<Opportunity> {
    record_counter(CounterMetric::Quotes);

    match strategy.on_quote_at(quote, now).await {
        Some(opportunity) => {
            positions.on_opportunity(&opportunity).await;
            Some(opportunity)
        }
        None => {
            positions.on_quote(quote).await;
            None
        }
    }
}

/// Fold a spot sample into the aggregate; false once the feed has closed
fn ingest_spot(
    aggregator: &mut PriceAggregator,
    board: &SpotBoard,
    sample: Option<SpotPriceSample>,
) -> bool {
    match sample {
        Some(sample) => {
            if let Some(aggregated) = aggregator.ingest(&sample) {
                board.publish(&aggregated);
            }
            true
        }
        None => {
            warn!("Spot feed closed");
            false
        }
    }
}

/// Fan several spot feeds into one channel
pub fn merge_feeds(
    receivers: Vec<mpsc::Receiver<SpotPriceSample>>,
) -> mpsc::Receiver<SpotPriceSample> {
    let (tx, rx) = mpsc::channel(4096);
    for mut receiver in receivers {
        let tx = tx.clone();
        tokio::spawn(async move {
            while let Some(sample) = receiver.recv().await {
                if tx.send(sample).await.is_err() {
                    break;
                }
            }
        });
    }
    rx
}
