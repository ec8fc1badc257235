//! Paper order executor

use super::{validate_order, ExecutionError, Fill, OrderExecutor, OrderResult, OrderSide};
use async_trait::async_trait;
use chrono::Utc;
use rust_decimal::Decimal;
use std::sync::Arc;
use tokio::sync::RwLock;
use uuid::Uuid;

/// Executor that fills every valid order immediately at its limit price
///
/// Exercises the live-trading path without a venue. Can be switched into a
/// rejecting state to rehearse venue failures.
#[derive(Clone, Default)]
pub struct PaperExecutor {
    fills: Arc<RwLock<Vec<Fill>>>,
    reject_reason: Arc<RwLock<Option<String>>>,
}

impl PaperExecutor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reject every subsequent order with `reason`, or accept again with `None`
    pub async fn set_rejecting(&self, reason: Option<String>) {
        *self.reject_reason.write().await = reason;
    }

    /// All fills so far
    pub async fn fills(&self) -> Vec<Fill> {
        self.fills.read().await.clone()
    }
}

#[async_trait]
impl OrderExecutor for PaperExecutor {
    async fn place_order(
        &self,
        token_id: &str,
        side: OrderSide,
        price: Decimal,
        size: Decimal,
    ) -> Result<OrderResult, ExecutionError> {
        validate_order(token_id, price, size)?;

        if let Some(reason) = self.reject_reason.read().await.clone() {
            return Err(ExecutionError::Rejected(reason));
        }

        let order_id = Uuid::new_v4().to_string();
        let fill = Fill {
            order_id: order_id.clone(),
            token_id: token_id.to_string(),
            side,
            price,
            size,
            timestamp: Utc::now(),
        };
        self.fills.write().await.push(fill);

        tracing::info!(%order_id, token_id, %side, %price, %size, "Paper order filled");
        Ok(OrderResult {
            order_id,
            status: "matched".to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[tokio::test]
    async fn test_paper_executor_fill() {
        let executor = PaperExecutor::new();
        let result = executor
            .place_order("tok-yes", OrderSide::Buy, dec!(0.55), dec!(10))
            .await
            .unwrap();
        assert_eq!(result.status, "matched");

        let fills = executor.fills().await;
        assert_eq!(fills.len(), 1);
        assert_eq!(fills[0].order_id, result.order_id);
        assert_eq!(fills[0].token_id, "tok-yes");
        assert_eq!(fills[0].side, OrderSide::Buy);
        assert_eq!(fills[0].price, dec!(0.55));
    }

    #[tokio::test]
    async fn test_paper_executor_rejects() {
        let executor = PaperExecutor::new();
        executor.set_rejecting(Some("halted".to_string())).await;

        let err = executor
            .place_order("tok", OrderSide::Sell, dec!(0.5), dec!(1))
            .await
            .unwrap_err();
        assert!(matches!(err, ExecutionError::Rejected(ref r) if r == "halted"));
        assert!(executor.fills().await.is_empty());

        executor.set_rejecting(None).await;
        assert!(executor
            .place_order("tok", OrderSide::Sell, dec!(0.5), dec!(1))
            .await
            .is_ok());
    }

    #[tokio::test]
    async fn test_paper_executor_validates() {
        let executor = PaperExecutor::new();
        let err = executor
            .place_order("tok", OrderSide::Buy, dec!(0), dec!(1))
            .await
            .unwrap_err();
        assert!(matches!(err, ExecutionError::InvalidOrder(_)));
    }

    #[tokio::test]
    async fn test_clones_share_state() {
        let executor = PaperExecutor::new();
        let handle = executor.clone();
        executor
            .place_order("tok", OrderSide::Buy, dec!(0.4), dec!(10))
            .await
            .unwrap();
        assert_eq!(handle.fills().await.len(), 1);
    }
}
