//! Shared view of the latest aggregated spot prices

use std::collections::HashMap;
use std::sync::Arc;

use rust_decimal::Decimal;
use tokio::sync::watch;

use super::types::AggregatedPrice;
use crate::feed::Asset;

/// Latest aggregated price per asset
pub type SpotPrices = HashMap<Asset, AggregatedPrice>;

/// Last-write-wins spot prices behind a watch channel
///
/// Clones share the channel: the event loop keeps publishing while a quote
/// evaluation holds the strategy.
#[derive(Debug, Clone)]
pub struct SpotBoard {
    tx: Arc<watch::Sender<SpotPrices>>,
}

impl SpotBoard {
    pub fn new() -> Self {
        let (tx, _) = watch::channel(SpotPrices::new());
        Self { tx: Arc::new(tx) }
    }

    pub fn publish(&self, price: &AggregatedPrice) {
        self.tx.send_modify(|prices| {
            prices.insert(price.asset, price.clone());
        });
    }

    pub fn price(&self, asset: Asset) -> Option<Decimal> {
        self.tx.borrow().get(&asset).map(|p| p.price)
    }
}

impl Default for SpotBoard {
    fn default() -> Self {
        Self::new()
    }
}
