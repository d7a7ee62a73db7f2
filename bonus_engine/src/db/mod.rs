//! # Database management and control
//!
//! * [`traits`] defines the contracts a storage backend has to fulfil.
//! * [`postgres`] is the Postgres implementation of those contracts.
//! * [`retry`] retries database work that failed for a transient reason.
pub mod postgres;
pub mod retry;
pub mod traits;
