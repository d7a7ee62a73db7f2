use std::fmt::Display;

use bonus_common::{OrderNumber, Points};
use serde::{Deserialize, Serialize};

/// The processing state of an order, as reported by the accrual service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AccrualStatus {
    /// The order is known to the accrual service but calculation has not started.
    Registered,
    Processing,
    /// Calculation is complete. `accrual` holds the awarded points, if any.
    Processed,
    /// The order will never earn points.
    Invalid,
}

impl Display for AccrualStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AccrualStatus::Registered => write!(f, "REGISTERED"),
            AccrualStatus::Processing => write!(f, "PROCESSING"),
            AccrualStatus::Processed => write!(f, "PROCESSED"),
            AccrualStatus::Invalid => write!(f, "INVALID"),
        }
    }
}

/// Response body of `GET /api/order/{number}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AccrualOrder {
    pub order: OrderNumber,
    pub status: AccrualStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub accrual: Option<Points>,
}
