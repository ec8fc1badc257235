//! Report command implementation

use crate::config::Config;
use crate::store::{DailyReport, JsonTradeStore, TradeStore};
use chrono::Utc;
use clap::Args;
use std::path::PathBuf;

#[derive(Args, Debug)]
pub struct ReportArgs {
    /// Trade store path (overrides config)
    #[arg(short, long)]
    pub store: Option<PathBuf>,

    /// Print as JSON
    #[arg(long)]
    pub json: bool,
}

impl ReportArgs {
    pub fn execute(&self, config: &Config) -> anyhow::Result<()> {
        let store = JsonTradeStore::open(super::store_path(config, self.store.as_ref()))?;
        let report = DailyReport::from_trades(&store.load()?, Utc::now());

        if self.json {
            println!("{}", serde_json::to_string_pretty(&report)?);
        } else {
            println!("{report}");
        }
        Ok(())
    }
}
