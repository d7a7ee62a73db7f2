//! Uploading orders and listing a user's orders.
use std::fmt::Debug;

use bonus_common::OrderNumber;
use log::*;

use crate::{
    db::traits::{InsertOrderResult, LedgerError, OrderManagement},
    db_types::{NewOrder, Order},
};

#[derive(Debug, Clone)]
pub enum UploadResult {
    /// The order is new and will be picked up by reconciliation.
    Created(Order),
    /// The user had already uploaded this order. Nothing changed.
    AlreadyUploaded(Order),
}

pub struct OrderApi<B> {
    db: B,
}

impl<B: Debug> Debug for OrderApi<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "OrderApi ({:?})", self.db)
    }
}

impl<B> OrderApi<B>
where B: OrderManagement
{
    pub fn new(db: B) -> Self {
        Self { db }
    }

    /// Uploads an order number on behalf of a user.
    ///
    /// The number is validated before anything touches the database. An order uploaded by someone else is a
    /// [`LedgerError::OrderConflict`]. Uploading your own order twice is harmless.
    pub async fn upload_order(&self, user_id: i64, raw_order: &str) -> Result<UploadResult, LedgerError> {
        let order_id = OrderNumber::parse(raw_order).map_err(|e| {
            debug!("🔄️ User #{user_id} uploaded an invalid order number. {e}");
            e
        })?;
        match self.db.insert_order(NewOrder::new(order_id, user_id)).await? {
            InsertOrderResult::Inserted(order) => {
                info!("🔄️ User #{user_id} uploaded order {}", order.id);
                Ok(UploadResult::Created(order))
            },
            InsertOrderResult::AlreadyExists(order) if order.user_id == user_id => {
                debug!("🔄️ User #{user_id} uploaded order {} again", order.id);
                Ok(UploadResult::AlreadyUploaded(order))
            },
            InsertOrderResult::AlreadyExists(order) => {
                debug!("🔄️ User #{user_id} tried to upload order {}, which belongs to user #{}", order.id, order.user_id);
                Err(LedgerError::OrderConflict(order.id))
            },
        }
    }

    /// The user's orders, newest first.
    pub async fn orders_for_user(&self, user_id: i64) -> Result<Vec<Order>, LedgerError> {
        self.db.fetch_orders_for_user(user_id).await
    }

    pub async fn order(&self, order_id: &OrderNumber) -> Result<Option<Order>, LedgerError> {
        self.db.fetch_order(order_id).await
    }
}
