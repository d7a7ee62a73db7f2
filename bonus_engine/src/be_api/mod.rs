//! # Bonus engine public API
//!
//! * [`order_api`] validates and stores order uploads, and lists a user's orders.
//! * [`ledger_api`] reads balances and handles withdrawals.
//! * [`reconciliation_api`] runs reconciliation cycles against the accrual oracle.
//!
//! Every API is created by handing it a backend that implements the traits it needs:
//!
//! ```rust,ignore
//! use bonus_engine::{LedgerApi, PostgresDatabase};
//! let db = PostgresDatabase::new_with_url(url, 25).await?;
//! let api = LedgerApi::new(db);
//! let balance = api.balance(user_id).await?;
//! ```
pub mod errors;
pub mod ledger_api;
pub mod order_api;
pub mod reconciliation_api;
pub mod reconciliation_objects;
