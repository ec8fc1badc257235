//! Lag strategy module
//!
//! Detects when Polymarket up/down odds are lagging behind the spot move:
//!
//! 1. Track the latest aggregated spot price per asset
//! 2. Resolve the open price of each market's window
//! 3. If spot has moved past the threshold but YES has not followed, emit an opportunity

mod strategy;
mod types;

pub use strategy::LagStrategy;
pub use types::{MoveDirection, NoSignalReason, Opportunity};
