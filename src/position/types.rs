//! Trade and position types

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::config::TradingMode;
use crate::execution::ExecutionError;
use crate::feed::Asset;
use crate::lag::Opportunity;
use crate::market::{MarketQuote, OutcomePrices, TokenPair};
use crate::store::StoreError;

/// Which outcome token a trade holds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Direction {
    BuyYes,
    BuyNo,
}

impl Direction {
    /// Price of the held outcome
    pub fn price_in(&self, prices: &OutcomePrices) -> Decimal {
        match self {
            Direction::BuyYes => prices.yes,
            Direction::BuyNo => prices.no_or_complement(),
        }
    }

    /// Token id of the held outcome
    pub fn token_in<'a>(&self, tokens: &'a TokenPair) -> &'a str {
        match self {
            Direction::BuyYes => &tokens.yes,
            Direction::BuyNo => &tokens.no,
        }
    }
}

impl std::fmt::Display for Direction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Direction::BuyYes => write!(f, "BUY_YES"),
            Direction::BuyNo => write!(f, "BUY_NO"),
        }
    }
}

/// Trade lifecycle state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TradeStatus {
    Open,
    Closed,
}

/// Why a trade was closed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ExitReason {
    TakeProfit,
    StopLoss,
    /// Operator or settlement close
    External,
}

impl std::fmt::Display for ExitReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ExitReason::TakeProfit => write!(f, "TAKE_PROFIT"),
            ExitReason::StopLoss => write!(f, "STOP_LOSS"),
            ExitReason::External => write!(f, "EXTERNAL"),
        }
    }
}

/// Idempotency key: at most one open trade per market and direction
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TradeKey {
    pub market_id: String,
    pub direction: Direction,
}

/// A position in one outcome token of one market
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Trade {
    /// Venue order id (live) or generated UUID (simulation)
    pub id: String,
    pub market_id: String,
    pub question: String,
    pub asset: Asset,
    pub direction: Direction,
    pub entry_price: Decimal,
    /// Shares held
    pub size: Decimal,
    /// USDC paid at entry
    pub stake: Decimal,
    pub entry_timestamp: DateTime<Utc>,
    pub status: TradeStatus,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub current_price: Option<Decimal>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unrealized_pnl: Option<Decimal>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exit_price: Option<Decimal>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exit_timestamp: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub realized_pnl: Option<Decimal>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exit_reason: Option<ExitReason>,
    /// Profit if the held outcome settles at 1
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub potential_return: Option<Decimal>,
    /// Outcome tokens, needed to exit a live position
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token_ids: Option<TokenPair>,
}

impl Trade {
    pub fn is_open(&self) -> bool {
        self.status == TradeStatus::Open
    }

    /// Amount paid for the position
    pub fn cost_basis(&self) -> Decimal {
        self.size * self.entry_price
    }

    pub fn key(&self) -> TradeKey {
        TradeKey {
            market_id: self.market_id.clone(),
            direction: self.direction,
        }
    }

    /// Value at the last marked price, falling back to entry
    pub fn marked_value(&self) -> Decimal {
        self.size * self.current_price.unwrap_or(self.entry_price)
    }

    /// Mark to `price` and return the unrealized P&L
    pub fn mark(&mut self, price: Decimal) -> Decimal {
        let unrealized = self.size * price - self.cost_basis();
        self.current_price = Some(price);
        self.unrealized_pnl = Some(unrealized);
        unrealized
    }

    /// Close at `price` and return the realized P&L
    pub fn close(&mut self, price: Decimal, reason: ExitReason, at: DateTime<Utc>) -> Decimal {
        let realized = self.size * (price - self.entry_price);
        self.status = TradeStatus::Closed;
        self.current_price = Some(price);
        self.unrealized_pnl = None;
        self.exit_price = Some(price);
        self.exit_timestamp = Some(at);
        self.realized_pnl = Some(realized);
        self.exit_reason = Some(reason);
        realized
    }
}

/// Latest prices for one market, from a quote or an opportunity
#[derive(Debug, Clone, PartialEq)]
pub struct PriceSnapshot {
    pub market_id: String,
    pub question: String,
    pub prices: OutcomePrices,
}

impl PriceSnapshot {
    /// Whether the snapshot prices `trade`'s market
    ///
    /// Falls back to question text when the market id differs.
    pub fn matches(&self, trade: &Trade) -> bool {
        trade.market_id == self.market_id
            || (!trade.question.is_empty() && trade.question == self.question)
    }
}

impl From<&MarketQuote> for PriceSnapshot {
    fn from(quote: &MarketQuote) -> Self {
        Self {
            market_id: quote.market_id.clone(),
            question: quote.question.clone(),
            prices: quote.outcome_prices(),
        }
    }
}

impl From<&Opportunity> for PriceSnapshot {
    fn from(opportunity: &Opportunity) -> Self {
        Self {
            market_id: opportunity.market_id.clone(),
            question: opportunity.question.clone(),
            prices: opportunity.outcome_prices,
        }
    }
}

/// Read-only summary of the engine's ledger
#[derive(Debug, Clone, Serialize)]
pub struct EngineStats {
    pub mode: TradingMode,
    /// Cash plus open positions at their marked price
    pub equity: Decimal,
    pub cash: Decimal,
    pub open_trades: usize,
    pub total_trades: usize,
    pub realized_pnl: Decimal,
    pub active_trades: Vec<Trade>,
}

impl std::fmt::Display for EngineStats {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "Mode: {}", self.mode)?;
        writeln!(f, "Equity: ${:.2}", self.equity)?;
        writeln!(f, "Cash: ${:.2}", self.cash)?;
        writeln!(f, "Realized PnL: ${:.2}", self.realized_pnl)?;
        writeln!(f, "Trades: {} open / {} total", self.open_trades, self.total_trades)?;
        for trade in &self.active_trades {
            writeln!(
                f,
                "  {} {} {} {:.4} shares @ {} | now {} | uPnL {}",
                trade.id,
                trade.asset,
                trade.direction,
                trade.size,
                trade.entry_price,
                trade
                    .current_price
                    .map_or_else(|| "-".to_string(), |p| p.to_string()),
                trade
                    .unrealized_pnl
                    .map_or_else(|| "-".to_string(), |p| format!("{:.2}", p)),
            )?;
        }
        Ok(())
    }
}

/// Position engine errors
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("live trading requires an order executor")]
    MissingExecutor,

    #[error("unknown trade: {0}")]
    UnknownTrade(String),

    #[error("trade already closed: {0}")]
    AlreadyClosed(String),

    #[error("trade {0} has no token ids; close it manually on the venue")]
    MissingTokenIds(String),

    #[error("execution failed: {0}")]
    Execution(#[from] ExecutionError),

    #[error("trade store error: {0}")]
    Store(#[from] StoreError),
}
