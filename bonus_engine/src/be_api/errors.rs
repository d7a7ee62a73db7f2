use std::time::Duration;

use thiserror::Error;

use crate::db::traits::LedgerError;

#[derive(Debug, Error)]
pub enum ReconcileError {
    #[error("Reconciliation aborted by a database error. {0}")]
    Database(#[from] LedgerError),
    #[error("Reconciliation cycle was cancelled")]
    Cancelled,
    #[error("Reconciliation cycle did not finish within {0:?}")]
    TimedOut(Duration),
}
