use bonus_common::OrderNumber;

use crate::{
    db::traits::LedgerError,
    db_types::{NewOrder, Order},
};

#[derive(Debug, Clone)]
pub enum InsertOrderResult {
    Inserted(Order),
    /// An order with the same number already exists. The existing record is returned unchanged.
    AlreadyExists(Order),
}

/// Storage of uploaded orders.
#[allow(async_fn_in_trait)]
pub trait OrderManagement {
    /// Stores a new order in `NEW` status. The call is idempotent: if an order with the same number is already stored
    /// (by any user), nothing is written and the existing order is returned.
    async fn insert_order(&self, order: NewOrder) -> Result<InsertOrderResult, LedgerError>;

    async fn fetch_order(&self, order_id: &OrderNumber) -> Result<Option<Order>, LedgerError>;

    /// All the orders uploaded by the user, newest first.
    async fn fetch_orders_for_user(&self, user_id: i64) -> Result<Vec<Order>, LedgerError>;
}
