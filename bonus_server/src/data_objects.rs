//! The JSON bodies accepted and returned by the `/api/user` routes.
use bonus_common::Points;
use bonus_engine::db_types::{BonusBalance, BonusMovement, Order, OrderStatusType};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderResponse {
    pub number: String,
    pub status: OrderStatusType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub accrual: Option<Points>,
    pub uploaded_at: DateTime<Utc>,
}

impl From<Order> for OrderResponse {
    fn from(order: Order) -> Self {
        Self { number: order.id.into(), status: order.status, accrual: order.accrual, uploaded_at: order.uploaded_at }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BalanceResponse {
    pub current: Points,
    pub withdrawn: Points,
}

impl From<BonusBalance> for BalanceResponse {
    fn from(balance: BonusBalance) -> Self {
        Self { current: balance.current, withdrawn: balance.withdrawn }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WithdrawRequest {
    /// The order the points are spent on. Must pass the Luhn check.
    pub order: String,
    pub sum: Points,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WithdrawalResponse {
    pub order: String,
    pub sum: Points,
    pub processed_at: DateTime<Utc>,
}

impl From<BonusMovement> for WithdrawalResponse {
    fn from(movement: BonusMovement) -> Self {
        Self {
            order: movement.order_id.map(String::from).unwrap_or_default(),
            sum: movement.amount,
            processed_at: movement.created_at,
        }
    }
}
