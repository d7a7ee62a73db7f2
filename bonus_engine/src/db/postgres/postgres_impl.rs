//! `PostgresDatabase` is the concrete backend of the bonus engine. It implements all the traits defined in the
//! [`traits`](crate::db::traits) module.
//!
//! Writes run inside [`DbRetryStrategy::in_transaction`], so a unit of work that loses a serialization race or a
//! deadlock is replayed from the start on a fresh transaction.
use std::fmt::Debug;

use log::*;
use sqlx::{PgPool, Postgres, Transaction};

use bonus_common::OrderNumber;

use super::db::{ledger, new_pool, orders};
use crate::{
    db::{
        retry::DbRetryStrategy,
        traits::{
            ClaimedBatch,
            InsertOrderResult,
            LedgerError,
            LedgerManagement,
            OrderManagement,
            ReconciliationDatabase,
        },
    },
    db_types::{
        BonusBalance,
        BonusMovement,
        MovementType,
        NewMovement,
        NewOrder,
        NewWithdrawal,
        Order,
        OrderStatusType,
        OrderUpdate,
    },
};

#[derive(Clone)]
pub struct PostgresDatabase {
    pool: PgPool,
    retry: DbRetryStrategy,
}

impl Debug for PostgresDatabase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "PostgresDatabase ({:?})", self.pool)
    }
}

impl PostgresDatabase {
    pub async fn new_with_url(url: &str, max_connections: u32) -> Result<Self, LedgerError> {
        let pool = new_pool(url, max_connections).await?;
        debug!("🗃️ Connected to Postgres with a pool of up to {max_connections} connections");
        Ok(Self { pool, retry: DbRetryStrategy::default() })
    }

    pub fn with_retry_strategy(mut self, retry: DbRetryStrategy) -> Self {
        self.retry = retry;
        self
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    pub async fn run_migrations(&self) -> Result<(), LedgerError> {
        sqlx::migrate!("./src/db/postgres/migrations").run(&self.pool).await?;
        info!("🗃️ Database migrations complete");
        Ok(())
    }
}

impl OrderManagement for PostgresDatabase {
    async fn insert_order(&self, order: NewOrder) -> Result<InsertOrderResult, LedgerError> {
        let result = self
            .retry
            .in_transaction("insert order", &self.pool, move |conn| {
                let order = order.clone();
                Box::pin(async move { Ok::<_, LedgerError>(orders::idempotent_insert(order, conn).await?) })
            })
            .await?;
        Ok(result)
    }

    async fn fetch_order(&self, order_id: &OrderNumber) -> Result<Option<Order>, LedgerError> {
        let mut conn = self.pool.acquire().await?;
        let order_id = order_id.clone();
        let order = self
            .retry
            .with_conn("fetch order", &mut conn, move |c| {
                let order_id = order_id.clone();
                Box::pin(async move { orders::fetch_order_by_id(&order_id, c).await })
            })
            .await?;
        Ok(order)
    }

    async fn fetch_orders_for_user(&self, user_id: i64) -> Result<Vec<Order>, LedgerError> {
        let mut conn = self.pool.acquire().await?;
        let orders = self
            .retry
            .with_conn("fetch orders", &mut conn, move |c| Box::pin(orders::fetch_orders_for_user(user_id, c)))
            .await?;
        Ok(orders)
    }
}

impl LedgerManagement for PostgresDatabase {
    async fn fetch_balance(&self, user_id: i64) -> Result<BonusBalance, LedgerError> {
        let mut conn = self.pool.acquire().await?;
        let balance = self
            .retry
            .with_conn("fetch balance", &mut conn, move |c| Box::pin(ledger::fetch_balance(user_id, c)))
            .await?;
        Ok(balance.unwrap_or_else(|| BonusBalance::zero(user_id)))
    }

    async fn withdraw(&self, withdrawal: NewWithdrawal) -> Result<(BonusMovement, BonusBalance), LedgerError> {
        let user_id = withdrawal.user_id;
        let amount = withdrawal.amount;
        let result = self
            .retry
            .in_transaction("withdraw", &self.pool, move |conn| {
                let movement = NewMovement::from(withdrawal.clone());
                Box::pin(ledger::append_movement(movement, conn))
            })
            .await?;
        info!("🗃️ User #{user_id} withdrew {amount}. {} remaining", result.1.current);
        Ok(result)
    }

    async fn fetch_movements(
        &self,
        user_id: i64,
        movement_type: Option<MovementType>,
    ) -> Result<Vec<BonusMovement>, LedgerError> {
        let mut conn = self.pool.acquire().await?;
        let movements = self
            .retry
            .with_conn("fetch movements", &mut conn, move |c| {
                Box::pin(ledger::fetch_movements(user_id, movement_type, c))
            })
            .await?;
        Ok(movements)
    }
}

/// A claimed batch of orders, backed by an open Postgres transaction holding their row locks.
pub struct PostgresBatch {
    tx: Transaction<'static, Postgres>,
    orders: Vec<Order>,
}

impl Debug for PostgresBatch {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "PostgresBatch ({} orders)", self.orders.len())
    }
}

impl ReconciliationDatabase for PostgresDatabase {
    type Batch = PostgresBatch;

    async fn claim_batch(&self, limit: usize) -> Result<PostgresBatch, LedgerError> {
        let limit = i64::try_from(limit).unwrap_or(i64::MAX);
        let pool = &self.pool;
        let (tx, orders) = self
            .retry
            .retry("claim batch", move || async move {
                let mut tx = pool.begin().await?;
                let orders = orders::claim_batch(&OrderStatusType::PENDING, limit, 0, &mut tx).await?;
                Ok::<_, sqlx::Error>((tx, orders))
            })
            .await?;
        debug!("🗃️ Claimed a batch of {} pending orders", orders.len());
        Ok(PostgresBatch { tx, orders })
    }
}

impl ClaimedBatch for PostgresBatch {
    fn orders(&self) -> &[Order] {
        &self.orders
    }

    async fn apply_update(&mut self, update: &OrderUpdate) -> Result<Option<BonusMovement>, LedgerError> {
        orders::update_reconciled_order(update, &mut self.tx).await?;
        let credit = match update.credit {
            Some(amount) => {
                let movement = NewMovement::accrual(update.user_id, update.order_id.clone(), amount);
                let (movement, _) = ledger::append_movement(movement, &mut self.tx).await?;
                Some(movement)
            },
            None => None,
        };
        Ok(credit)
    }

    async fn commit(self) -> Result<(), LedgerError> {
        self.tx.commit().await?;
        Ok(())
    }

    async fn rollback(self) -> Result<(), LedgerError> {
        self.tx.rollback().await?;
        Ok(())
    }
}
