//! Trade store module
//!
//! Durable record of every trade, keyed by id. The position manager rebuilds
//! its ledger from it on startup; the report and status commands read it.

mod json;
mod memory;
mod report;

pub use json::JsonTradeStore;
pub use memory::MemoryTradeStore;
pub use report::DailyReport;

use crate::position::Trade;
use thiserror::Error;

/// Trade store errors
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serde(#[from] serde_json::Error),
}

/// Trait for trade store implementations
pub trait TradeStore: Send {
    /// All stored trades, in insertion order
    fn load(&self) -> Result<Vec<Trade>, StoreError>;

    /// Insert `trade`, or replace the stored trade with the same id
    fn upsert(&mut self, trade: &Trade) -> Result<(), StoreError>;
}

/// Replace the entry with `trade.id` or append
pub(crate) fn upsert_into(trades: &mut Vec<Trade>, trade: &Trade) {
    match trades.iter_mut().find(|t| t.id == trade.id) {
        Some(existing) => *existing = trade.clone(),
        None => trades.push(trade.clone()),
    }
}
