use std::{fmt::Display, str::FromStr};

use accrual_client::AccrualStatus;
use bonus_common::{OrderNumber, Points};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use thiserror::Error;

#[derive(Debug, Clone, Error)]
#[error("Invalid value: {0}")]
pub struct ConversionError(String);

//--------------------------------------   OrderStatusType     ---------------------------------------------------------
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrderStatusType {
    /// The order has been uploaded, but the accrual service has not started on it yet.
    New,
    /// The accrual service is calculating the reward.
    Processing,
    /// Calculation is complete and any accrual has been credited. Terminal.
    Processed,
    /// The order will never earn points. Terminal.
    Invalid,
}

impl OrderStatusType {
    /// The statuses that the reconciliation pipeline still has to resolve.
    pub const PENDING: [OrderStatusType; 2] = [OrderStatusType::New, OrderStatusType::Processing];

    pub fn is_terminal(&self) -> bool {
        matches!(self, OrderStatusType::Processed | OrderStatusType::Invalid)
    }

    fn rank(&self) -> u8 {
        match self {
            OrderStatusType::New => 0,
            OrderStatusType::Processing => 1,
            OrderStatusType::Processed | OrderStatusType::Invalid => 2,
        }
    }

    /// Status only ever moves forward: NEW → PROCESSING → PROCESSED | INVALID.
    pub fn can_transition_to(&self, next: OrderStatusType) -> bool {
        !self.is_terminal() && next.rank() > self.rank()
    }
}

impl Display for OrderStatusType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OrderStatusType::New => write!(f, "NEW"),
            OrderStatusType::Processing => write!(f, "PROCESSING"),
            OrderStatusType::Processed => write!(f, "PROCESSED"),
            OrderStatusType::Invalid => write!(f, "INVALID"),
        }
    }
}

impl FromStr for OrderStatusType {
    type Err = ConversionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "NEW" => Ok(Self::New),
            "PROCESSING" => Ok(Self::Processing),
            "PROCESSED" => Ok(Self::Processed),
            "INVALID" => Ok(Self::Invalid),
            s => Err(ConversionError(format!("Invalid order status: {s}"))),
        }
    }
}

impl TryFrom<String> for OrderStatusType {
    type Error = ConversionError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<AccrualStatus> for OrderStatusType {
    fn from(status: AccrualStatus) -> Self {
        match status {
            AccrualStatus::Registered => OrderStatusType::New,
            AccrualStatus::Processing => OrderStatusType::Processing,
            AccrualStatus::Processed => OrderStatusType::Processed,
            AccrualStatus::Invalid => OrderStatusType::Invalid,
        }
    }
}

//--------------------------------------        Order        ---------------------------------------------------------
#[derive(Debug, Clone, FromRow)]
pub struct Order {
    pub id: OrderNumber,
    pub user_id: i64,
    #[sqlx(try_from = "String")]
    pub status: OrderStatusType,
    pub accrual: Option<Points>,
    /// The most recent reconciliation failure for this order, if the last attempt failed.
    pub last_error: Option<String>,
    pub uploaded_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewOrder {
    pub id: OrderNumber,
    pub user_id: i64,
    pub uploaded_at: DateTime<Utc>,
}

impl NewOrder {
    pub fn new(id: OrderNumber, user_id: i64) -> Self {
        Self { id, user_id, uploaded_at: Utc::now() }
    }
}

/// The result of reconciling a single claimed order, ready to be written back.
#[derive(Debug, Clone, PartialEq)]
pub struct OrderUpdate {
    pub order_id: OrderNumber,
    pub user_id: i64,
    pub status: OrderStatusType,
    pub accrual: Option<Points>,
    pub last_error: Option<String>,
    /// Points to credit to the owner's balance as part of this update.
    pub credit: Option<Points>,
}

//--------------------------------------    MovementType     ---------------------------------------------------------
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MovementType {
    Accrual,
    Withdrawal,
}

impl Display for MovementType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MovementType::Accrual => write!(f, "ACCRUAL"),
            MovementType::Withdrawal => write!(f, "WITHDRAWAL"),
        }
    }
}

impl FromStr for MovementType {
    type Err = ConversionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "ACCRUAL" => Ok(Self::Accrual),
            "WITHDRAWAL" => Ok(Self::Withdrawal),
            s => Err(ConversionError(format!("Invalid movement type: {s}"))),
        }
    }
}

impl TryFrom<String> for MovementType {
    type Error = ConversionError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

//--------------------------------------   BonusMovement     ---------------------------------------------------------
/// An append-only ledger entry. Movements are never updated or deleted.
#[derive(Debug, Clone, FromRow)]
pub struct BonusMovement {
    pub id: i64,
    pub created_at: DateTime<Utc>,
    pub user_id: i64,
    #[sqlx(rename = "type", try_from = "String")]
    pub movement_type: MovementType,
    pub amount: Points,
    pub order_id: Option<OrderNumber>,
}

#[derive(Debug, Clone)]
pub struct NewMovement {
    pub user_id: i64,
    pub movement_type: MovementType,
    pub amount: Points,
    pub order_id: Option<OrderNumber>,
}

impl NewMovement {
    pub fn accrual(user_id: i64, order_id: OrderNumber, amount: Points) -> Self {
        Self { user_id, movement_type: MovementType::Accrual, amount, order_id: Some(order_id) }
    }

    pub fn withdrawal(user_id: i64, order_id: Option<OrderNumber>, amount: Points) -> Self {
        Self { user_id, movement_type: MovementType::Withdrawal, amount, order_id }
    }
}

/// A request to spend points, optionally settled against an order number.
#[derive(Debug, Clone)]
pub struct NewWithdrawal {
    pub user_id: i64,
    pub order_id: Option<OrderNumber>,
    pub amount: Points,
}

impl From<NewWithdrawal> for NewMovement {
    fn from(w: NewWithdrawal) -> Self {
        NewMovement::withdrawal(w.user_id, w.order_id, w.amount)
    }
}

//--------------------------------------    BonusBalance     ---------------------------------------------------------
/// The cached balance of a user. Always equal to the sums over the user's movements.
#[derive(Debug, Clone, Copy, PartialEq, Eq, FromRow, Serialize)]
pub struct BonusBalance {
    pub user_id: i64,
    pub current: Points,
    pub withdrawn: Points,
}

impl BonusBalance {
    pub fn zero(user_id: i64) -> Self {
        Self { user_id, current: Points::zero(), withdrawn: Points::zero() }
    }
}
