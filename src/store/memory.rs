//! In-memory trade store

use super::{upsert_into, StoreError, TradeStore};
use crate::position::Trade;
use std::sync::{Arc, Mutex, MutexGuard};

/// Trade store that lives for the process
///
/// Clones share the same trades, so a test can hand one clone to the
/// position manager and inspect the other.
#[derive(Debug, Clone, Default)]
pub struct MemoryTradeStore {
    trades: Arc<Mutex<Vec<Trade>>>,
}

impl MemoryTradeStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn guard(&self) -> MutexGuard<'_, Vec<Trade>> {
        self.trades.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl TradeStore for MemoryTradeStore {
    fn load(&self) -> Result<Vec<Trade>, StoreError> {
        Ok(self.guard().clone())
    }

    fn upsert(&mut self, trade: &Trade) -> Result<(), StoreError> {
        upsert_into(&mut self.guard(), trade);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::feed::Asset;
    use crate::position::{Direction, TradeStatus};
    use chrono::Utc;
    use rust_decimal_macros::dec;

    fn trade(id: &str) -> Trade {
        Trade {
            id: id.to_string(),
            market_id: "m1".to_string(),
            question: String::new(),
            asset: Asset::Sol,
            direction: Direction::BuyNo,
            entry_price: dec!(0.3),
            size: dec!(10),
            stake: dec!(3),
            entry_timestamp: Utc::now(),
            status: TradeStatus::Open,
            current_price: None,
            unrealized_pnl: None,
            exit_price: None,
            exit_timestamp: None,
            realized_pnl: None,
            exit_reason: None,
            potential_return: None,
            token_ids: None,
        }
    }

    #[test]
    fn test_upsert_replaces_by_id() {
        let mut store = MemoryTradeStore::new();
        let observer = store.clone();

        store.upsert(&trade("a")).unwrap();
        store.upsert(&trade("b")).unwrap();

        let mut updated = trade("a");
        updated.current_price = Some(dec!(0.35));
        store.upsert(&updated).unwrap();

        let trades = observer.load().unwrap();
        assert_eq!(trades.len(), 2);
        assert_eq!(trades[0].id, "a");
        assert_eq!(trades[0].current_price, Some(dec!(0.35)));
        assert_eq!(trades[1].id, "b");
    }
}
