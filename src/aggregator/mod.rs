//! Spot price aggregation module
//!
//! Folds per-exchange samples into a single mean price per asset and
//! publishes the result on a [`SpotBoard`].

mod board;
mod spot;
mod types;

pub use board::{SpotBoard, SpotPrices};
pub use spot::PriceAggregator;
pub use types::AggregatedPrice;
