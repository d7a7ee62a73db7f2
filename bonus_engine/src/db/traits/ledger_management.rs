use crate::{
    db::traits::LedgerError,
    db_types::{BonusBalance, BonusMovement, MovementType, NewWithdrawal},
};

/// The bonus ledger: an append-only list of movements per user, plus a cached balance derived from it.
#[allow(async_fn_in_trait)]
pub trait LedgerManagement {
    /// The user's cached balance. Users without any movements have a zero balance.
    async fn fetch_balance(&self, user_id: i64) -> Result<BonusBalance, LedgerError>;

    /// Debits the user's balance in a single transaction, under an exclusive lock on the user's balance.
    ///
    /// If the amount exceeds the current balance, [`LedgerError::InsufficientFunds`] is returned and nothing is
    /// written.
    async fn withdraw(&self, withdrawal: NewWithdrawal) -> Result<(BonusMovement, BonusBalance), LedgerError>;

    /// The user's movements in chronological order, optionally restricted to one type.
    async fn fetch_movements(
        &self,
        user_id: i64,
        movement_type: Option<MovementType>,
    ) -> Result<Vec<BonusMovement>, LedgerError>;
}
