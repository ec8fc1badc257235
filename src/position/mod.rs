//! Position management module
//!
//! Turns opportunities into trades and runs take-profit/stop-loss exits.
//! In live mode every entry and exit goes through an [`OrderExecutor`](crate::execution::OrderExecutor)
//! first; the ledger only changes after the venue accepts.

mod manager;
mod types;

pub use crate::config::TradingMode;
pub use manager::PositionManager;
pub use types::{
    Direction, EngineError, EngineStats, ExitReason, PriceSnapshot, Trade, TradeKey, TradeStatus,
};
