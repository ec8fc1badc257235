//! Status command implementation

use crate::config::{Config, TradingMode};
use crate::position::PositionManager;
use crate::store::JsonTradeStore;
use clap::Args;
use std::path::PathBuf;

#[derive(Args, Debug)]
pub struct StatusArgs {
    /// Trade store path (overrides config)
    #[arg(short, long)]
    pub store: Option<PathBuf>,
}

impl StatusArgs {
    pub fn execute(&self, config: &Config) -> anyhow::Result<()> {
        let path = super::store_path(config, self.store.as_ref());
        let store = JsonTradeStore::open(&path)?;

        // Rebuild the ledger read-only
        let mut engine = config.engine.clone();
        engine.mode = TradingMode::MonitorOnly;
        let positions = PositionManager::new(engine, Box::new(store), None)?;

        println!("poly-lag status ({})", path.display());
        print!("{}", positions.stats());
        Ok(())
    }
}
