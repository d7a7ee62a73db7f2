//! Movement ledger and cached balances.
//!
//! Every change to a balance goes through [`append_movement`], which holds the user's balance row lock for the rest of
//! the enclosing transaction. Concurrent credits and debits for one user are therefore applied one after the other,
//! while different users never wait on each other.
use log::{debug, error};
use sqlx::PgConnection;

use bonus_common::Points;

use crate::{
    db::traits::LedgerError,
    db_types::{BonusBalance, BonusMovement, MovementType, NewMovement},
};

/// Fetches the cached balance for the user, if a balance row exists.
pub async fn fetch_balance(user_id: i64, conn: &mut PgConnection) -> Result<Option<BonusBalance>, sqlx::Error> {
    let balance = sqlx::query_as("SELECT user_id, current, withdrawn FROM bonus_balances WHERE user_id = $1")
        .bind(user_id)
        .fetch_optional(conn)
        .await?;
    Ok(balance)
}

/// Takes an exclusive lock on the user's balance row, creating a zero balance first if the user has none.
pub async fn lock_balance(user_id: i64, conn: &mut PgConnection) -> Result<BonusBalance, sqlx::Error> {
    sqlx::query("INSERT INTO bonus_balances (user_id) VALUES ($1) ON CONFLICT (user_id) DO NOTHING")
        .bind(user_id)
        .execute(&mut *conn)
        .await?;
    let balance = sqlx::query_as("SELECT user_id, current, withdrawn FROM bonus_balances WHERE user_id = $1 FOR UPDATE")
        .bind(user_id)
        .fetch_one(conn)
        .await?;
    Ok(balance)
}

async fn insert_movement(movement: NewMovement, conn: &mut PgConnection) -> Result<BonusMovement, sqlx::Error> {
    let movement = sqlx::query_as(
        r#"
            INSERT INTO bonus_movements (user_id, type, amount, order_id)
            VALUES ($1, $2, $3, $4)
            RETURNING *;
        "#,
    )
    .bind(movement.user_id)
    .bind(movement.movement_type.to_string())
    .bind(movement.amount)
    .bind(movement.order_id)
    .fetch_one(conn)
    .await?;
    Ok(movement)
}

/// Sums the user's entire ledger. Returns `(accrued, withdrawn)`.
pub async fn ledger_totals(user_id: i64, conn: &mut PgConnection) -> Result<(Points, Points), sqlx::Error> {
    let totals = sqlx::query_as(
        r#"
            SELECT
                COALESCE(SUM(amount) FILTER (WHERE type = 'ACCRUAL'), 0) AS accrued,
                COALESCE(SUM(amount) FILTER (WHERE type = 'WITHDRAWAL'), 0) AS withdrawn
            FROM bonus_movements WHERE user_id = $1
        "#,
    )
    .bind(user_id)
    .fetch_one(conn)
    .await?;
    Ok(totals)
}

/// Recomputes the cached balance from the ledger and stores it. The caller must hold the balance lock.
pub async fn recompute_balance(user_id: i64, conn: &mut PgConnection) -> Result<BonusBalance, LedgerError> {
    let (accrued, withdrawn) = ledger_totals(user_id, &mut *conn).await?;
    let current = accrued - withdrawn;
    if current.is_negative() {
        error!("🗃️ Ledger for user #{user_id} sums to {current}. Accrued {accrued}, withdrawn {withdrawn}");
        return Err(LedgerError::LedgerInconsistency {
            user_id,
            message: format!("accrued {accrued} is less than withdrawn {withdrawn}"),
        });
    }
    let balance = sqlx::query_as(
        r#"
            UPDATE bonus_balances SET current = $1, withdrawn = $2, updated_at = now()
            WHERE user_id = $3
            RETURNING user_id, current, withdrawn
        "#,
    )
    .bind(current)
    .bind(withdrawn)
    .bind(user_id)
    .fetch_one(conn)
    .await?;
    Ok(balance)
}

/// Appends a movement to the user's ledger and refreshes their balance.
///
/// Withdrawals that exceed the current balance fail with [`LedgerError::InsufficientFunds`] before anything is
/// written. This is not atomic on its own; run it inside a transaction.
pub async fn append_movement(
    movement: NewMovement,
    conn: &mut PgConnection,
) -> Result<(BonusMovement, BonusBalance), LedgerError> {
    let user_id = movement.user_id;
    let balance = lock_balance(user_id, &mut *conn).await?;
    if movement.movement_type == MovementType::Withdrawal && movement.amount > balance.current {
        debug!("🗃️ User #{user_id} cannot withdraw {}. Balance is {}", movement.amount, balance.current);
        return Err(LedgerError::InsufficientFunds { requested: movement.amount, available: balance.current });
    }
    let movement = insert_movement(movement, &mut *conn).await?;
    let balance = recompute_balance(user_id, conn).await?;
    debug!(
        "🗃️ {} of {} recorded for user #{user_id}. Balance is now {} ({} withdrawn)",
        movement.movement_type, movement.amount, balance.current, balance.withdrawn
    );
    Ok((movement, balance))
}

/// The user's movements in chronological order, optionally restricted to a single type.
pub async fn fetch_movements(
    user_id: i64,
    movement_type: Option<MovementType>,
    conn: &mut PgConnection,
) -> Result<Vec<BonusMovement>, sqlx::Error> {
    let movements = match movement_type {
        Some(t) => {
            sqlx::query_as("SELECT * FROM bonus_movements WHERE user_id = $1 AND type = $2 ORDER BY created_at, id")
                .bind(user_id)
                .bind(t.to_string())
                .fetch_all(conn)
                .await?
        },
        None => {
            sqlx::query_as("SELECT * FROM bonus_movements WHERE user_id = $1 ORDER BY created_at, id")
                .bind(user_id)
                .fetch_all(conn)
                .await?
        },
    };
    Ok(movements)
}
