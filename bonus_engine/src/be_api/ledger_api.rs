//! Balances and withdrawals.
use std::fmt::Debug;

use bonus_common::{OrderNumber, Points, POINTS_SCALE};
use log::*;

use crate::{
    db::traits::{LedgerError, LedgerManagement},
    db_types::{BonusBalance, BonusMovement, MovementType, NewWithdrawal},
};

pub struct LedgerApi<B> {
    db: B,
}

impl<B: Debug> Debug for LedgerApi<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "LedgerApi ({:?})", self.db)
    }
}

impl<B> LedgerApi<B>
where B: LedgerManagement
{
    pub fn new(db: B) -> Self {
        Self { db }
    }

    pub async fn balance(&self, user_id: i64) -> Result<BonusBalance, LedgerError> {
        self.db.fetch_balance(user_id).await
    }

    /// Spends `amount` points from the user's balance, settled against `order`.
    ///
    /// Fails with [`LedgerError::InvalidOrderNumber`] or [`LedgerError::InvalidAmount`] before touching the database,
    /// and with [`LedgerError::InsufficientFunds`] if the balance does not cover the amount.
    pub async fn withdraw(&self, user_id: i64, order: &str, amount: Points) -> Result<BonusMovement, LedgerError> {
        let order_id = OrderNumber::parse(order)?;
        if !amount.is_positive() || amount.value().normalize().scale() > POINTS_SCALE {
            return Err(LedgerError::InvalidAmount(amount));
        }
        let withdrawal = NewWithdrawal { user_id, order_id: Some(order_id.clone()), amount };
        match self.db.withdraw(withdrawal).await {
            Ok((movement, balance)) => {
                info!("💰️ User #{user_id} spent {amount} on order {order_id}. {} left", balance.current);
                Ok(movement)
            },
            Err(e @ LedgerError::InsufficientFunds { .. }) => {
                debug!("💰️ User #{user_id} cannot spend {amount}. {e}");
                Err(e)
            },
            Err(e) => Err(e),
        }
    }

    /// The user's withdrawals, oldest first.
    pub async fn withdrawals(&self, user_id: i64) -> Result<Vec<BonusMovement>, LedgerError> {
        self.db.fetch_movements(user_id, Some(MovementType::Withdrawal)).await
    }

    /// Every movement on the user's ledger, oldest first.
    pub async fn movements(&self, user_id: i64) -> Result<Vec<BonusMovement>, LedgerError> {
        self.db.fetch_movements(user_id, None).await
    }
}
