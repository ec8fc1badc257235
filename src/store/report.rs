//! Daily trading report

use crate::position::Trade;
use chrono::{DateTime, NaiveDate, TimeDelta, Utc};
use rust_decimal::Decimal;
use serde::Serialize;

/// Summary of the trailing 24 hours of trading
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DailyReport {
    pub date: NaiveDate,
    /// Trades entered in the window
    pub trades: usize,
    /// Of which closed
    pub closed: usize,
    /// Notional of closed trades at entry
    pub volume: Decimal,
    pub realized_pnl: Decimal,
    /// Percent of closed trades with positive P&L
    pub win_rate: Decimal,
}

impl DailyReport {
    pub fn from_trades(trades: &[Trade], now: DateTime<Utc>) -> Self {
        let since = now - TimeDelta::hours(24);
        let recent: Vec<&Trade> = trades.iter().filter(|t| t.entry_timestamp > since).collect();
        let closed: Vec<&Trade> = recent.iter().copied().filter(|t| !t.is_open()).collect();

        let volume = closed.iter().map(|t| t.cost_basis()).sum();
        let realized_pnl = closed.iter().filter_map(|t| t.realized_pnl).sum();
        let wins = closed
            .iter()
            .filter(|t| t.realized_pnl.is_some_and(|pnl| pnl > Decimal::ZERO))
            .count();
        let win_rate = if closed.is_empty() {
            Decimal::ZERO
        } else {
            Decimal::from(wins) / Decimal::from(closed.len()) * Decimal::ONE_HUNDRED
        };

        Self {
            date: now.date_naive(),
            trades: recent.len(),
            closed: closed.len(),
            volume,
            realized_pnl,
            win_rate,
        }
    }
}

impl std::fmt::Display for DailyReport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "=== DAILY TRADING REPORT ===")?;
        writeln!(f, "Date: {}", self.date.format("%Y-%m-%d"))?;
        writeln!(f, "Trades (24h): {}", self.trades)?;
        writeln!(f, "Volume: ${:.2}", self.volume)?;
        writeln!(f, "Realized PnL: ${:.2}", self.realized_pnl)?;
        writeln!(f, "Win Rate: {:.1}%", self.win_rate)?;
        write!(f, "============================")
    }
}
