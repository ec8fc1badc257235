//! Lag strategy
//!
//! Compares the aggregated spot price with the open price of each up/down
//! market's window. A move beyond the threshold while the market's YES price
//! still sits on the wrong side of the gate is an opportunity.

use std::collections::VecDeque;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;

use crate::aggregator::{AggregatedPrice, SpotBoard};
use crate::config::LagConfig;
use crate::feed::Asset;
use crate::market::{MarketKind, MarketQuote};
use crate::reference::ReferenceResolver;
use crate::telemetry::{record_counter, CounterMetric};

use super::types::{MoveDirection, NoSignalReason, Opportunity};

/// Spot-vs-window-open lag detector
pub struct LagStrategy {
    config: LagConfig,
    resolver: ReferenceResolver,
    spot: SpotBoard,
    recent: VecDeque<Opportunity>,
}

impl LagStrategy {
    pub fn new(config: LagConfig, resolver: ReferenceResolver) -> Self {
        let capacity = config.history_size.max(1);
        Self {
            config,
            resolver,
            spot: SpotBoard::new(),
            recent: VecDeque::with_capacity(capacity),
        }
    }

    /// Record the latest aggregated spot price for an asset
    pub fn on_spot(&self, price: &AggregatedPrice) {
        self.spot.publish(price);
    }

    /// Handle for publishing spot prices while a quote is being evaluated
    pub fn spot_board(&self) -> SpotBoard {
        self.spot.clone()
    }

    /// Evaluate a market quote, resolving its reference price if needed
    pub async fn on_quote(&mut self, quote: &MarketQuote) -> Option<Opportunity> {
        self.on_quote_at(quote, Utc::now()).await
    }

    /// Evaluate a quote against an explicit clock (for testing)
    pub async fn on_quote_at(&mut self, quote: &MarketQuote, now: DateTime<Utc>) -> Option<Opportunity> {
        match self.check_quote(quote, now).await {
            Ok(opportunity) => {
                tracing::info!(
                    asset = %opportunity.asset,
                    market_id = %opportunity.market_id,
                    spot = %opportunity.spot_price,
                    strike = %opportunity.strike_price,
                    delta_pct = %opportunity.delta_percent().round_dp(3),
                    yes = %opportunity.outcome_prices.yes,
                    implied = %opportunity.implied_probability,
                    "Lag opportunity"
                );
                record_counter(CounterMetric::Opportunities);
                self.remember(opportunity.clone());
                Some(opportunity)
            }
            Err(reason) => {
                tracing::trace!(market_id = %quote.market_id, %reason, "No signal");
                None
            }
        }
    }

    async fn check_quote(
        &mut self,
        quote: &MarketQuote,
        now: DateTime<Utc>,
    ) -> Result<Opportunity, NoSignalReason> {
        if quote.market_kind != MarketKind::UpDown {
            return Err(NoSignalReason::NotUpDown);
        }
        let anchor_timestamp = quote
            .anchor_timestamp
            .ok_or(NoSignalReason::NoAnchorTimestamp)?;
        if self.spot.price(quote.asset).is_none() {
            return Err(NoSignalReason::NoSpotPrice);
        }
        let anchor = self
            .resolver
            .resolve_at(quote.asset, anchor_timestamp, &quote.market_id, now)
            .await
            .ok_or(NoSignalReason::ReferenceUnresolved)?;

        // Spot may have moved while the anchor was fetched
        let spot = self
            .spot
            .price(quote.asset)
            .ok_or(NoSignalReason::NoSpotPrice)?;
        self.evaluate(quote, spot, anchor, now)
    }

    /// Pure signal decision for a quote given spot and window-open prices
    pub fn evaluate(
        &self,
        quote: &MarketQuote,
        spot: Decimal,
        anchor: Decimal,
        now: DateTime<Utc>,
    ) -> Result<Opportunity, NoSignalReason> {
        if anchor <= Decimal::ZERO {
            return Err(NoSignalReason::ReferenceUnresolved);
        }

        let delta_percent = (spot - anchor) / anchor * Decimal::ONE_HUNDRED;
        let threshold = self.config.momentum_threshold_pct;

        let (direction, implied_probability) = if delta_percent > threshold {
            if quote.yes_price >= self.config.max_yes_for_up {
                return Err(NoSignalReason::OddsAlreadyMoved {
                    direction: MoveDirection::Up,
                    yes_price: quote.yes_price,
                });
            }
            (MoveDirection::Up, self.config.up_implied_probability)
        } else if delta_percent < -threshold {
            if quote.yes_price <= self.config.min_yes_for_down {
                return Err(NoSignalReason::OddsAlreadyMoved {
                    direction: MoveDirection::Down,
                    yes_price: quote.yes_price,
                });
            }
            (MoveDirection::Down, self.config.down_implied_probability)
        } else {
            return Err(NoSignalReason::MoveTooSmall { delta_percent });
        };

        tracing::debug!(
            market_id = %quote.market_id,
            ?direction,
            delta_pct = %delta_percent.round_dp(4),
            "Spot move not yet priced"
        );

        Ok(Opportunity {
            asset: quote.asset,
            market_id: quote.market_id.clone(),
            question: quote.question.clone(),
            spot_price: spot,
            strike_price: anchor,
            outcome_prices: quote.outcome_prices(),
            token_ids: quote.token_ids.clone(),
            implied_probability,
            timestamp: now,
        })
    }

    fn remember(&mut self, opportunity: Opportunity) {
        while self.recent.len() >= self.config.history_size.max(1) {
            self.recent.pop_front();
        }
        self.recent.push_back(opportunity);
    }

    /// The last `n` opportunities, oldest first
    pub fn recent_opportunities(&self, n: usize) -> Vec<Opportunity> {
        let skip = self.recent.len().saturating_sub(n);
        self.recent.iter().skip(skip).cloned().collect()
    }

    /// Latest aggregated spot price for an asset
    pub fn spot_price(&self, asset: Asset) -> Option<Decimal> {
        self.spot.price(asset)
    }

    pub fn resolver(&self) -> &ReferenceResolver {
        &self.resolver
    }
}
