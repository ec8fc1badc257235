//! Lag strategy types
//!
//! Types for the opportunities emitted when a market's odds have not yet
//! caught up with the spot move since its window opened.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::feed::Asset;
use crate::market::{OutcomePrices, TokenPair};

/// Direction of the spot move relative to the window open
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MoveDirection {
    Up,
    Down,
}

/// A detected lag between spot and market odds
///
/// Snapshot of everything known when the signal fired. Consumed once by the
/// position manager and kept in the strategy's history ring.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Opportunity {
    pub asset: Asset,
    pub market_id: String,
    pub question: String,

    /// Aggregated spot price when the signal fired
    pub spot_price: Decimal,

    /// Window open price the market settles against
    pub strike_price: Decimal,

    /// Market prices when the signal fired
    pub outcome_prices: OutcomePrices,

    pub token_ids: Option<TokenPair>,

    /// Probability of YES implied by the spot move
    pub implied_probability: Decimal,

    pub timestamp: DateTime<Utc>,
}

impl Opportunity {
    /// Percent move of spot vs. strike
    pub fn delta_percent(&self) -> Decimal {
        if self.strike_price.is_zero() {
            return Decimal::ZERO;
        }
        (self.spot_price - self.strike_price) / self.strike_price * Decimal::ONE_HUNDRED
    }

    /// Direction of the move that triggered the signal
    pub fn direction(&self) -> MoveDirection {
        if self.spot_price >= self.strike_price {
            MoveDirection::Up
        } else {
            MoveDirection::Down
        }
    }
}

/// Reason why no opportunity was generated for a quote
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NoSignalReason {
    /// Market does not settle against the window open
    NotUpDown,
    /// Quote carries no window start
    NoAnchorTimestamp,
    /// No aggregated spot price for the asset yet
    NoSpotPrice,
    /// Window open price could not be resolved
    ReferenceUnresolved,
    /// Spot move is within the threshold
    MoveTooSmall { delta_percent: Decimal },
    /// Odds already reflect the move
    OddsAlreadyMoved { direction: MoveDirection, yes_price: Decimal },
}

impl std::fmt::Display for NoSignalReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            NoSignalReason::NotUpDown => write!(f, "Not an up/down market"),
            NoSignalReason::NoAnchorTimestamp => write!(f, "No window start on quote"),
            NoSignalReason::NoSpotPrice => write!(f, "Waiting for spot price"),
            NoSignalReason::ReferenceUnresolved => write!(f, "Reference price unresolved"),
            NoSignalReason::MoveTooSmall { delta_percent } => {
                write!(f, "Move {:.3}% within threshold", delta_percent)
            }
            NoSignalReason::OddsAlreadyMoved { direction, yes_price } => {
                write!(f, "Odds already priced {:?} move (YES {})", direction, yes_price)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn opportunity(spot: Decimal, strike: Decimal) -> Opportunity {
        Opportunity {
            asset: Asset::Btc,
            market_id: "m1".to_string(),
            question: "Bitcoin Up or Down".to_string(),
            spot_price: spot,
            strike_price: strike,
            outcome_prices: OutcomePrices::new(dec!(0.60), Some(dec!(0.40))),
            token_ids: None,
            implied_probability: dec!(0.95),
            timestamp: Utc::now(),
        }
    }

    #[test]
    fn test_delta_percent() {
        assert_eq!(opportunity(dec!(101000), dec!(100000)).delta_percent(), dec!(1));
        assert_eq!(opportunity(dec!(99500), dec!(100000)).delta_percent(), dec!(-0.5));
        assert_eq!(opportunity(dec!(1), dec!(0)).delta_percent(), dec!(0));
    }

    #[test]
    fn test_direction() {
        assert_eq!(opportunity(dec!(101), dec!(100)).direction(), MoveDirection::Up);
        assert_eq!(opportunity(dec!(99), dec!(100)).direction(), MoveDirection::Down);
    }

    #[test]
    fn test_reason_display() {
        let reason = NoSignalReason::MoveTooSmall {
            delta_percent: dec!(0.01234),
        };
        assert_eq!(reason.to_string(), "Move 0.012% within threshold");
        assert_eq!(NoSignalReason::NoSpotPrice.to_string(), "Waiting for spot price");
    }
}
