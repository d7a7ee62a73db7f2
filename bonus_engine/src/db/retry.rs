//! Retrying database work that failed for a transient reason.
//!
//! Postgres reports some failures that say nothing about the statement itself, such as a lost serialization race or a
//! server that is momentarily out of connections. Those are worth another attempt after a pause. Everything else is
//! returned to the caller immediately.
//!
//! [`DbRetryStrategy`] is configured with a list of delays. With `k` delays an operation that keeps failing
//! transiently is attempted exactly `k + 1` times before [`RetryError::Exhausted`] is returned.
//!
//! Inside an open transaction a failed statement aborts the whole transaction, so retrying just that statement is
//! pointless. Use [`DbRetryStrategy::in_transaction`] there, which replays the complete unit of work on a fresh
//! transaction.
use std::{fmt::Display, future::Future, time::Duration};

use futures::future::BoxFuture;
use log::*;
use sqlx::{PgConnection, PgPool, Postgres, Transaction};
use thiserror::Error;

/// SQLSTATE codes that are worth retrying.
pub const TRANSIENT_SQLSTATES: [&str; 6] = [
    "40001", // serialization_failure
    "40P01", // deadlock_detected
    "53300", // too_many_connections
    "55P03", // lock_not_available
    "57P03", // cannot_connect_now
    "57014", // query_canceled
];

pub fn is_transient_sqlstate(code: &str) -> bool {
    TRANSIENT_SQLSTATES.contains(&code)
}

/// Classifies an error as transient (worth retrying) or permanent.
pub trait Transience {
    fn is_transient(&self) -> bool;
}

impl Transience for sqlx::Error {
    fn is_transient(&self) -> bool {
        match self {
            sqlx::Error::Database(e) => e.code().map(|c| is_transient_sqlstate(c.as_ref())).unwrap_or(false),
            _ => false,
        }
    }
}

#[derive(Debug, Error)]
pub enum RetryError<E> {
    /// The operation failed with an error that is not worth retrying.
    #[error("{0}")]
    Permanent(E),
    /// Every attempt failed transiently. `last` is the error from the final attempt.
    #[error("Gave up after {attempts} attempts. {last}")]
    Exhausted { attempts: usize, last: E },
}

impl<E> RetryError<E> {
    pub fn into_inner(self) -> E {
        match self {
            RetryError::Permanent(e) => e,
            RetryError::Exhausted { last, .. } => last,
        }
    }
}

pub const DEFAULT_RETRY_DELAYS: [Duration; 3] =
    [Duration::from_secs(1), Duration::from_secs(3), Duration::from_secs(5)];

#[derive(Debug, Clone)]
pub struct DbRetryStrategy {
    delays: Vec<Duration>,
}

impl Default for DbRetryStrategy {
    fn default() -> Self {
        Self::new(DEFAULT_RETRY_DELAYS.to_vec())
    }
}

impl DbRetryStrategy {
    pub fn new(delays: Vec<Duration>) -> Self {
        Self { delays }
    }

    /// Decides what happens after attempt number `attempt` (zero-based) failed with `err`.
    /// Returns the pause before the next attempt, or the error to give back to the caller.
    fn after_failure<E>(&self, label: &str, attempt: usize, err: E) -> Result<Duration, RetryError<E>>
    where E: Transience + Display {
        if !err.is_transient() {
            return Err(RetryError::Permanent(err));
        }
        match self.delays.get(attempt) {
            Some(delay) => {
                warn!("🗃️ {label}: transient failure on attempt {}. Retrying in {delay:?}. {err}", attempt + 1);
                Ok(*delay)
            },
            None => {
                error!("🗃️ {label}: giving up after {} attempts. {err}", attempt + 1);
                Err(RetryError::Exhausted { attempts: attempt + 1, last: err })
            },
        }
    }

    /// Runs `op` until it succeeds, fails permanently, or the delays run out.
    pub async fn retry<T, E, F, Fut>(&self, label: &str, mut op: F) -> Result<T, RetryError<E>>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: Transience + Display,
    {
        let mut attempt = 0;
        loop {
            match op().await {
                Ok(value) => return Ok(value),
                Err(e) => {
                    let delay = self.after_failure(label, attempt, e)?;
                    attempt += 1;
                    tokio::time::sleep(delay).await;
                },
            }
        }
    }

    /// Opens a transaction, retrying if the server cannot hand out a connection right now.
    pub async fn begin(&self, pool: &PgPool) -> Result<Transaction<'static, Postgres>, RetryError<sqlx::Error>> {
        self.retry("begin", || pool.begin()).await
    }

    /// Runs a single statement (or read-only query) on a connection that is *not* inside a transaction.
    pub async fn with_conn<T, E, F>(&self, label: &str, conn: &mut PgConnection, mut op: F) -> Result<T, RetryError<E>>
    where
        F: for<'c> FnMut(&'c mut PgConnection) -> BoxFuture<'c, Result<T, E>>,
        E: Transience + Display,
    {
        let mut attempt = 0;
        loop {
            match op(&mut *conn).await {
                Ok(value) => return Ok(value),
                Err(e) => {
                    let delay = self.after_failure(label, attempt, e)?;
                    attempt += 1;
                    tokio::time::sleep(delay).await;
                },
            }
        }
    }

    /// Runs `work` inside a fresh transaction and commits it. If anything in the unit of work (including the commit)
    /// fails transiently, the transaction is rolled back and the whole unit is replayed.
    pub async fn in_transaction<T, E, F>(&self, label: &str, pool: &PgPool, mut work: F) -> Result<T, RetryError<E>>
    where
        F: for<'c> FnMut(&'c mut PgConnection) -> BoxFuture<'c, Result<T, E>>,
        E: Transience + Display + From<sqlx::Error>,
    {
        let mut attempt = 0;
        loop {
            let result = async {
                let mut tx = pool.begin().await?;
                let value = work(&mut *tx).await?;
                tx.commit().await?;
                Ok::<T, E>(value)
            }
            .await;
            match result {
                Ok(value) => return Ok(value),
                Err(e) => {
                    let delay = self.after_failure(label, attempt, e)?;
                    attempt += 1;
                    tokio::time::sleep(delay).await;
                },
            }
        }
    }
}
