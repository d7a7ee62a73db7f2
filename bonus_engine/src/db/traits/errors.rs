use bonus_common::{OrderNumber, OrderNumberError, Points};
use thiserror::Error;

use crate::db::retry::{RetryError, Transience};

/// Errors produced by order uploads and the bonus ledger.
#[derive(Debug, Error)]
pub enum LedgerError {
    #[error("Invalid order number. {0}")]
    InvalidOrderNumber(#[from] OrderNumberError),
    #[error("Order {0} has already been uploaded by another user")]
    OrderConflict(OrderNumber),
    #[error("Insufficient funds. Requested {requested}, but only {available} is available")]
    InsufficientFunds { requested: Points, available: Points },
    #[error("Invalid amount: {0}. Amounts must be positive with at most two decimal places")]
    InvalidAmount(Points),
    #[error("Database error: {0}")]
    DriverError(#[from] sqlx::Error),
    #[error("Could not run database migrations: {0}")]
    MigrationError(String),
    #[error("Database operation failed {attempts} times. Last error: {message}")]
    RetriesExhausted { attempts: usize, message: String },
    #[error("Ledger for user {user_id} is inconsistent. {message}")]
    LedgerInconsistency { user_id: i64, message: String },
}

impl LedgerError {
    /// Validation, conflict and funds errors are the caller's problem. Everything else is an infrastructure failure.
    pub fn is_user_error(&self) -> bool {
        matches!(
            self,
            LedgerError::InvalidOrderNumber(_)
                | LedgerError::OrderConflict(_)
                | LedgerError::InsufficientFunds { .. }
                | LedgerError::InvalidAmount(_)
        )
    }
}

impl Transience for LedgerError {
    fn is_transient(&self) -> bool {
        match self {
            LedgerError::DriverError(e) => e.is_transient(),
            _ => false,
        }
    }
}

impl From<RetryError<LedgerError>> for LedgerError {
    fn from(e: RetryError<LedgerError>) -> Self {
        match e {
            RetryError::Permanent(e) => e,
            RetryError::Exhausted { attempts, last } => {
                LedgerError::RetriesExhausted { attempts, message: last.to_string() }
            },
        }
    }
}

impl From<RetryError<sqlx::Error>> for LedgerError {
    fn from(e: RetryError<sqlx::Error>) -> Self {
        match e {
            RetryError::Permanent(e) => LedgerError::DriverError(e),
            RetryError::Exhausted { attempts, last } => {
                LedgerError::RetriesExhausted { attempts, message: last.to_string() }
            },
        }
    }
}

impl From<sqlx::migrate::MigrateError> for LedgerError {
    fn from(e: sqlx::migrate::MigrateError) -> Self {
        LedgerError::MigrationError(e.to_string())
    }
}
