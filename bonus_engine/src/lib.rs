//! Bonus Engine
//!
//! The bonus engine keeps a loyalty-points ledger for a retailer's customers. Customers upload the numbers of their
//! purchase orders; an external accrual service decides how many points each order earns; customers spend their points
//! by withdrawing them against new orders.
//!
//! The library is divided into two main sections:
//! 1. Database management and control ([`mod@db`]). Postgres is the supported backend. The data types stored in the
//!    database live in [`db_types`] and are public.
//! 2. The public API ([`mod@be_api`]). [`OrderApi`] takes order uploads, [`LedgerApi`] reads balances and handles
//!    withdrawals, and [`ReconciliationApi`] runs the batch pipeline that asks the accrual service about pending orders
//!    and credits the points they earned.
//!
//! A user's balance is never stored on its own: it is a cache of the sums over the user's append-only movement ledger,
//! recomputed in the same transaction that appends a movement, and it can never go negative.
mod be_api;
mod db;

pub mod db_types;
pub mod oracle;

#[cfg(any(feature = "test_utils", test))]
pub mod test_utils;

pub use be_api::{
    errors::ReconcileError,
    ledger_api::LedgerApi,
    order_api::{OrderApi, UploadResult},
    reconciliation_api::ReconciliationApi,
    reconciliation_objects,
};
pub use db::{
    postgres::{db as pg_db, PostgresBatch, PostgresDatabase},
    retry::{DbRetryStrategy, RetryError, Transience, DEFAULT_RETRY_DELAYS, TRANSIENT_SQLSTATES},
    traits::{ClaimedBatch, InsertOrderResult, LedgerError, LedgerManagement, OrderManagement, ReconciliationDatabase},
};
pub use oracle::AccrualOracle;
