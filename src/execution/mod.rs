//! Order execution module
//!
//! The venue order API as a capability; signing and submission live behind it

mod paper;
mod types;

pub use paper::PaperExecutor;
pub use types::{validate_order, ExecutionError, Fill, OrderResult, OrderSide};

use async_trait::async_trait;
use rust_decimal::Decimal;

/// Trait for order executor implementations
#[async_trait]
pub trait OrderExecutor: Send + Sync {
    /// Place a limit order at `price` on `token_id`
    ///
    /// `size` is the order notional in USDC (shares × price) for both sides.
    async fn place_order(
        &self,
        token_id: &str,
        side: OrderSide,
        price: Decimal,
        size: Decimal,
    ) -> Result<OrderResult, ExecutionError>;
}
