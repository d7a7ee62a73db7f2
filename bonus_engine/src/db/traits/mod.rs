//! # Backend contracts
//!
//! The traits in this module define what a storage backend must provide for the bonus engine.
//!
//! * [`OrderManagement`] stores uploaded orders.
//! * [`LedgerManagement`] owns the movement ledger and the cached balances, including the withdrawal transaction.
//! * [`ReconciliationDatabase`] hands out [`ClaimedBatch`]es of pending orders to the reconciliation pipeline.
//!
//! [`PostgresDatabase`](crate::PostgresDatabase) implements all of them.
mod errors;
mod ledger_management;
mod order_management;
mod reconciliation;

pub use errors::LedgerError;
pub use ledger_management::LedgerManagement;
pub use order_management::{InsertOrderResult, OrderManagement};
pub use reconciliation::{ClaimedBatch, ReconciliationDatabase};
