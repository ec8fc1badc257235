//! Execution types

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Order side
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum OrderSide {
    Buy,
    Sell,
}

impl std::fmt::Display for OrderSide {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OrderSide::Buy => write!(f, "BUY"),
            OrderSide::Sell => write!(f, "SELL"),
        }
    }
}

/// Venue acknowledgement of a placed order
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderResult {
    /// Venue order identifier
    pub order_id: String,
    /// Venue status string (e.g., "matched", "live")
    pub status: String,
}

/// Order submission errors
#[derive(Debug, Error)]
pub enum ExecutionError {
    #[error("insufficient balance")]
    InsufficientBalance,

    #[error("order rejected: {0}")]
    Rejected(String),

    #[error("invalid order: {0}")]
    InvalidOrder(String),

    #[error("transport error: {0}")]
    Transport(String),
}

/// A simulated fill recorded by the paper executor
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Fill {
    pub order_id: String,
    pub token_id: String,
    pub side: OrderSide,
    pub price: Decimal,
    pub size: Decimal,
    pub timestamp: DateTime<Utc>,
}

/// Check order parameters before they reach a venue
pub fn validate_order(token_id: &str, price: Decimal, size: Decimal) -> Result<(), ExecutionError> {
    if token_id.is_empty() {
        return Err(ExecutionError::InvalidOrder("missing token id".to_string()));
    }
    if price <= Decimal::ZERO {
        return Err(ExecutionError::InvalidOrder(format!("price must be positive, got {price}")));
    }
    if size <= Decimal::ZERO {
        return Err(ExecutionError::InvalidOrder(format!("size must be positive, got {size}")));
    }
    Ok(())
}
