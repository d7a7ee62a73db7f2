//! The accrual oracle as seen by the reconciliation pipeline.
use accrual_client::{AccrualApi, AccrualApiError, AccrualOrder, HttpTransport};
use bonus_common::OrderNumber;

/// Answers how many points an order earns.
///
/// `Ok(None)` means the oracle does not know the order yet. The order should be left alone until the next cycle.
#[allow(async_fn_in_trait)]
pub trait AccrualOracle {
    async fn order_accrual(&self, order: &OrderNumber) -> Result<Option<AccrualOrder>, AccrualApiError>;
}

impl<T: HttpTransport> AccrualOracle for AccrualApi<T> {
    async fn order_accrual(&self, order: &OrderNumber) -> Result<Option<AccrualOrder>, AccrualApiError> {
        self.get_order(order).await
    }
}
