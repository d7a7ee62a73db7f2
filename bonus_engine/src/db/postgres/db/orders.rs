use log::{debug, trace};
use sqlx::PgConnection;

use bonus_common::OrderNumber;

use crate::{
    db::traits::InsertOrderResult,
    db_types::{NewOrder, Order, OrderStatusType, OrderUpdate},
};

/// Inserts the order, unless an order with the same number already exists. In that case the existing order is
/// returned instead, whoever it belongs to.
pub async fn idempotent_insert(order: NewOrder, conn: &mut PgConnection) -> Result<InsertOrderResult, sqlx::Error> {
    let id = order.id.clone();
    match insert_order(order, conn).await? {
        Some(order) => {
            debug!("🗃️ Order {} uploaded by user #{}", order.id, order.user_id);
            Ok(InsertOrderResult::Inserted(order))
        },
        None => {
            let existing = fetch_order_by_id(&id, conn).await?.ok_or(sqlx::Error::RowNotFound)?;
            trace!("🗃️ Order {id} already exists. It belongs to user #{}", existing.user_id);
            Ok(InsertOrderResult::AlreadyExists(existing))
        },
    }
}

/// Inserts a new order in `NEW` status. Returns `None` if the order number is already taken.
async fn insert_order(order: NewOrder, conn: &mut PgConnection) -> Result<Option<Order>, sqlx::Error> {
    let order = sqlx::query_as(
        r#"
            INSERT INTO orders (id, user_id, status, uploaded_at)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (id) DO NOTHING
            RETURNING *;
        "#,
    )
    .bind(order.id)
    .bind(order.user_id)
    .bind(OrderStatusType::New.to_string())
    .bind(order.uploaded_at)
    .fetch_optional(conn)
    .await?;
    Ok(order)
}

pub async fn fetch_order_by_id(id: &OrderNumber, conn: &mut PgConnection) -> Result<Option<Order>, sqlx::Error> {
    let order = sqlx::query_as("SELECT * FROM orders WHERE id = $1").bind(id.as_str()).fetch_optional(conn).await?;
    Ok(order)
}

/// Fetches all the orders of a user, newest first.
pub async fn fetch_orders_for_user(user_id: i64, conn: &mut PgConnection) -> Result<Vec<Order>, sqlx::Error> {
    let orders = sqlx::query_as("SELECT * FROM orders WHERE user_id = $1 ORDER BY uploaded_at DESC, id")
        .bind(user_id)
        .fetch_all(conn)
        .await?;
    Ok(orders)
}

/// Locks up to `limit` orders with one of the given statuses, oldest upload first.
///
/// This must run inside a transaction: the row locks are what stop another worker from claiming the same orders, and
/// they are released when the transaction ends. Rows that are already locked are skipped, not waited on.
///
/// `offset` skips that many unlocked matches. The reconciliation cycle claims a single page and always passes 0; a
/// caller that pages through the whole pending set in one transaction advances it by `limit` per page.
pub async fn claim_batch(
    statuses: &[OrderStatusType],
    limit: i64,
    offset: i64,
    conn: &mut PgConnection,
) -> Result<Vec<Order>, sqlx::Error> {
    let statuses = statuses.iter().map(|s| s.to_string()).collect::<Vec<String>>();
    let orders: Vec<Order> = sqlx::query_as(
        r#"
            SELECT * FROM orders
            WHERE status = ANY($1)
            ORDER BY uploaded_at, id
            LIMIT $2 OFFSET $3
            FOR UPDATE SKIP LOCKED
        "#,
    )
    .bind(statuses)
    .bind(limit)
    .bind(offset)
    .fetch_all(conn)
    .await?;
    trace!("🗃️ Claimed {} orders", orders.len());
    Ok(orders)
}

/// Writes the outcome of reconciling an order.
pub async fn update_reconciled_order(update: &OrderUpdate, conn: &mut PgConnection) -> Result<(), sqlx::Error> {
    let result = sqlx::query("UPDATE orders SET status = $1, accrual = $2, last_error = $3 WHERE id = $4")
        .bind(update.status.to_string())
        .bind(update.accrual)
        .bind(update.last_error.as_deref())
        .bind(update.order_id.as_str())
        .execute(conn)
        .await?;
    if result.rows_affected() == 0 {
        return Err(sqlx::Error::RowNotFound);
    }
    trace!("🗃️ Order {} is now {}", update.order_id, update.status);
    Ok(())
}
