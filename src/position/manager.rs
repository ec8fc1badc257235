//! Position manager
//!
//! Owns the trade ledger: opens positions from opportunities, marks them on
//! every quote, closes them on take-profit or stop-loss and persists every
//! change through the trade store.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Instant;

use chrono::Utc;
use rust_decimal::Decimal;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use super::types::{
    Direction, EngineError, EngineStats, ExitReason, PriceSnapshot, Trade, TradeKey, TradeStatus,
};
use crate::config::{EngineConfig, TradingMode};
use crate::execution::{OrderExecutor, OrderSide};
use crate::lag::Opportunity;
use crate::market::MarketQuote;
use crate::store::TradeStore;
use crate::telemetry::{record_counter, record_latency, CounterMetric, LatencyMetric};

pub struct PositionManager {
    config: EngineConfig,
    store: Box<dyn TradeStore>,
    executor: Option<Arc<dyn OrderExecutor>>,
    /// All trades, in entry order
    trades: Vec<Trade>,
    open_keys: HashSet<TradeKey>,
    cash: Decimal,
}

impl PositionManager {
    /// Create a manager and rebuild its ledger from `store`
    ///
    /// Live trading needs an executor; the other modes ignore it.
    pub fn new(
        config: EngineConfig,
        store: Box<dyn TradeStore>,
        executor: Option<Arc<dyn OrderExecutor>>,
    ) -> Result<Self, EngineError> {
        if config.mode == TradingMode::LiveTrading && executor.is_none() {
            return Err(EngineError::MissingExecutor);
        }

        let trades = store.load()?;
        let mut cash = config.initial_balance;
        let mut open_keys = HashSet::new();
        for trade in &trades {
            cash -= trade.stake;
            match trade.status {
                TradeStatus::Open => {
                    open_keys.insert(trade.key());
                }
                TradeStatus::Closed => {
                    cash += trade.size * trade.exit_price.unwrap_or(trade.entry_price);
                }
            }
        }

        info!(
            mode = %config.mode,
            trades = trades.len(),
            open = open_keys.len(),
            %cash,
            "Position manager ready"
        );

        Ok(Self {
            config,
            store,
            executor,
            trades,
            open_keys,
            cash,
        })
    }

    pub fn cash(&self) -> Decimal {
        self.cash
    }

    pub fn trades(&self) -> &[Trade] {
        &self.trades
    }

    pub fn open_trades(&self) -> impl Iterator<Item = &Trade> {
        self.trades.iter().filter(|t| t.is_open())
    }

    /// Mark open positions against a fresh quote
    pub async fn on_quote(&mut self, quote: &MarketQuote) {
        self.update_open_positions(&PriceSnapshot::from(quote)).await;
    }

    /// Mark open positions, then maybe enter on the opportunity
    pub async fn on_opportunity(&mut self, opportunity: &Opportunity) {
        self.update_open_positions(&PriceSnapshot::from(opportunity))
            .await;

        if self.config.mode == TradingMode::MonitorOnly {
            debug!(market_id = %opportunity.market_id, "Monitor only, skipping entry");
            return;
        }

        let Some(direction) = self.entry_direction(opportunity.implied_probability) else {
            debug!(
                market_id = %opportunity.market_id,
                implied = %opportunity.implied_probability,
                "Implied probability not decisive"
            );
            return;
        };

        let key = TradeKey {
            market_id: opportunity.market_id.clone(),
            direction,
        };
        if self.open_keys.contains(&key) {
            debug!(market_id = %key.market_id, %direction, "Already holding, skipping entry");
            return;
        }

        let price = direction.price_in(&opportunity.outcome_prices);
        if price <= self.config.min_entry_price {
            warn!(market_id = %key.market_id, %direction, %price, "Entry price too low");
            return;
        }

        self.enter(opportunity, direction, price).await;
    }

    fn entry_direction(&self, implied: Decimal) -> Option<Direction> {
        if implied > self.config.buy_yes_above {
            Some(Direction::BuyYes)
        } else if implied < self.config.buy_no_below {
            Some(Direction::BuyNo)
        } else {
            None
        }
    }

    async fn enter(&mut self, opportunity: &Opportunity, direction: Direction, price: Decimal) {
        let stake = self.config.bet_size.min(self.config.max_trade_size);
        let shares = stake / price;

        let id = if self.config.mode == TradingMode::LiveTrading {
            let Some(executor) = self.executor.clone() else {
                error!("Live entry without an executor");
                return;
            };
            let Some(tokens) = &opportunity.token_ids else {
                error!(market_id = %opportunity.market_id, "Missing token ids, entry aborted");
                return;
            };
            let token_id = direction.token_in(tokens);

            let started = Instant::now();
            let result = executor
                .place_order(token_id, OrderSide::Buy, price, stake)
                .await;
            record_latency(LatencyMetric::OrderSubmission, started.elapsed());

            match result {
                Ok(order) => {
                    info!(order_id = %order.order_id, status = %order.status, "Entry order placed");
                    order.order_id
                }
                Err(e) => {
                    error!(market_id = %opportunity.market_id, error = %e, "Entry order failed");
                    record_counter(CounterMetric::ExecutionFailures);
                    return;
                }
            }
        } else {
            Uuid::new_v4().to_string()
        };

        let trade = Trade {
            id,
            market_id: opportunity.market_id.clone(),
            question: opportunity.question.clone(),
            asset: opportunity.asset,
            direction,
            entry_price: price,
            size: shares,
            stake,
            entry_timestamp: Utc::now(),
            status: TradeStatus::Open,
            current_price: Some(price),
            unrealized_pnl: Some(Decimal::ZERO),
            exit_price: None,
            exit_timestamp: None,
            realized_pnl: None,
            exit_reason: None,
            potential_return: Some(shares - stake),
            token_ids: opportunity.token_ids.clone(),
        };

        self.cash -= stake;
        self.open_keys.insert(trade.key());

        info!(
            id = %trade.id,
            asset = %trade.asset,
            %direction,
            price = %trade.entry_price,
            shares = %trade.size.round_dp(4),
            stake = %stake,
            "Opened trade"
        );

        self.trades.push(trade);
        record_counter(CounterMetric::TradesOpened);
        self.persist(self.trades.len() - 1);
    }

    /// Mark every open trade on the snapshot's market and apply exit rules
    pub async fn update_open_positions(&mut self, snapshot: &PriceSnapshot) {
        let matching: Vec<usize> = self
            .trades
            .iter()
            .enumerate()
            .filter(|(_, t)| t.is_open() && snapshot.matches(t))
            .map(|(i, _)| i)
            .collect();

        for idx in matching {
            let trade = &mut self.trades[idx];
            let price = trade.direction.price_in(&snapshot.prices);
            let unrealized = trade.mark(price);
            let cost = trade.cost_basis();

            let reason = if unrealized > self.config.take_profit_ratio * cost {
                Some(ExitReason::TakeProfit)
            } else if unrealized < -(self.config.stop_loss_ratio * cost) {
                Some(ExitReason::StopLoss)
            } else {
                None
            };

            match reason {
                Some(reason) => {
                    if let Err(e) = self.exit(idx, price, reason).await {
                        error!(id = %self.trades[idx].id, error = %e, "Exit failed, position stays open");
                        self.persist(idx);
                    }
                }
                None => self.persist(idx),
            }
        }
    }

    /// Close an open trade at `exit_price` for a reason outside the exit rules
    pub async fn close_trade(&mut self, id: &str, exit_price: Decimal) -> Result<&Trade, EngineError> {
        let idx = self
            .trades
            .iter()
            .position(|t| t.id == id)
            .ok_or_else(|| EngineError::UnknownTrade(id.to_string()))?;
        if !self.trades[idx].is_open() {
            return Err(EngineError::AlreadyClosed(id.to_string()));
        }

        self.exit(idx, exit_price, ExitReason::External).await?;
        Ok(&self.trades[idx])
    }

    async fn exit(&mut self, idx: usize, price: Decimal, reason: ExitReason) -> Result<(), EngineError> {
        if self.config.mode == TradingMode::LiveTrading {
            let executor = self.executor.clone().ok_or(EngineError::MissingExecutor)?;
            let trade = &self.trades[idx];
            let Some(tokens) = &trade.token_ids else {
                warn!(id = %trade.id, "No token ids stored, cannot exit on venue");
                return Err(EngineError::MissingTokenIds(trade.id.clone()));
            };

            let token_id = trade.direction.token_in(tokens);
            let notional = trade.size * price;

            let started = Instant::now();
            let result = executor
                .place_order(token_id, OrderSide::Sell, price, notional)
                .await;
            record_latency(LatencyMetric::OrderSubmission, started.elapsed());

            if let Err(e) = result {
                record_counter(CounterMetric::ExecutionFailures);
                return Err(e.into());
            }
        }

        let trade = &mut self.trades[idx];
        let realized = trade.close(price, reason, Utc::now());
        self.cash += trade.size * price;
        self.open_keys.remove(&trade.key());

        info!(
            id = %trade.id,
            asset = %trade.asset,
            direction = %trade.direction,
            entry = %trade.entry_price,
            exit = %price,
            %reason,
            pnl = %realized.round_dp(2),
            "Closed trade"
        );

        record_counter(CounterMetric::TradesClosed);
        self.persist(idx);
        Ok(())
    }

    fn persist(&mut self, idx: usize) {
        if let Err(e) = self.store.upsert(&self.trades[idx]) {
            error!(id = %self.trades[idx].id, error = %e, "Failed to persist trade");
        }
    }

    pub fn stats(&self) -> EngineStats {
        let active_trades: Vec<Trade> = self.open_trades().cloned().collect();
        let equity = self.cash + active_trades.iter().map(Trade::marked_value).sum::<Decimal>();
        let realized_pnl = self.trades.iter().filter_map(|t| t.realized_pnl).sum();

        EngineStats {
            mode: self.config.mode,
            equity,
            cash: self.cash,
            open_trades: active_trades.len(),
            total_trades: self.trades.len(),
            realized_pnl,
            active_trades,
        }
    }
}
