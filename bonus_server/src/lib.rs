//! # Bonus server
//! This crate hosts the HTTP server for the bonus ledger. It is responsible for:
//! Accepting order uploads from authenticated users.
//! Serving users their orders, balances and withdrawal history, and accepting withdrawals.
//! Running the reconciliation worker that asks the accrual service about pending orders and credits the points they
//! earned.
//!
//! ## Configuration
//! The server is configured via environment variables. See [config](config/index.html) for more information.
//!
//! ## Routes
//! The server exposes the following routes:
//! * `/health`: A health check route that returns a 200 OK response.
//! * `/api/user/orders`: Upload an order number (`POST`) or list your orders (`GET`).
//! * `/api/user/balance`: Your current balance and the total you have withdrawn.
//! * `/api/user/balance/withdraw`: Spend points against a new order.
//! * `/api/user/withdrawals`: Your withdrawal history.
//!
//! Every `/api` route expects the authenticating gateway in front of the server to forward the caller's user id in the
//! `X-User-Id` header.

pub mod auth;
pub mod cli;
pub mod config;
pub mod data_objects;
pub mod errors;
pub mod reconciliation_worker;
pub mod routes;
pub mod server;

#[cfg(test)]
mod endpoint_tests;
