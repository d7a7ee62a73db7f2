//! # Postgres database methods
//!
//! This module contains "low-level" Postgres database interactions.
//!
//! All these interactions are simple functions (rather than stateful structs) that accept a `&mut PgConnection`
//! argument. Callers can obtain a connection from a pool, or open a transaction and pass `&mut *tx`, without any other
//! changes.
use sqlx::{postgres::PgPoolOptions, Error as SqlxError, PgPool};

pub mod ledger;
pub mod orders;

pub async fn new_pool(url: &str, max_connections: u32) -> Result<PgPool, SqlxError> {
    let pool = PgPoolOptions::new().max_connections(max_connections).connect(url).await?;
    Ok(pool)
}
