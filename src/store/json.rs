//! JSON file trade store

use super::{upsert_into, StoreError, TradeStore};
use crate::position::Trade;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Trade store backed by a pretty-printed JSON array
///
/// The whole ledger is rewritten on each upsert through a temp file and a
/// rename, so readers never see a half-written file.
#[derive(Debug)]
pub struct JsonTradeStore {
    path: PathBuf,
    trades: Vec<Trade>,
}

impl JsonTradeStore {
    /// Open the store at `path`; a missing file is an empty ledger
    pub fn open(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let path = path.as_ref().to_path_buf();
        let trades = if path.exists() {
            let content = fs::read_to_string(&path)?;
            if content.trim().is_empty() {
                Vec::new()
            } else {
                serde_json::from_str(&content)?
            }
        } else {
            Vec::new()
        };

        info!(path = %path.display(), trades = trades.len(), "Opened trade store");
        Ok(Self { path, trades })
    }

    fn flush(&self) -> Result<(), StoreError> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }

        let mut tmp = self.path.clone().into_os_string();
        tmp.push(".tmp");
        let tmp = PathBuf::from(tmp);

        fs::write(&tmp, serde_json::to_vec_pretty(&self.trades)?)?;
        fs::rename(&tmp, &self.path)?;

        debug!(path = %self.path.display(), trades = self.trades.len(), "Flushed trade store");
        Ok(())
    }
}

impl TradeStore for JsonTradeStore {
    fn load(&self) -> Result<Vec<Trade>, StoreError> {
        Ok(self.trades.clone())
    }

    fn upsert(&mut self, trade: &Trade) -> Result<(), StoreError> {
        upsert_into(&mut self.trades, trade);
        self.flush()
    }
}
