use crate::{
    db::traits::LedgerError,
    db_types::{BonusMovement, Order, OrderUpdate},
};

/// Backend support for the reconciliation pipeline.
#[allow(async_fn_in_trait)]
pub trait ReconciliationDatabase {
    type Batch: ClaimedBatch;

    /// Opens a unit of work and locks up to `limit` orders in `NEW` or `PROCESSING` status, oldest upload first.
    ///
    /// Orders locked by another open batch are skipped rather than waited on, so concurrent claims always return
    /// disjoint sets of orders. The locks are held until the batch is committed or rolled back.
    async fn claim_batch(&self, limit: usize) -> Result<Self::Batch, LedgerError>;
}

/// A set of claimed orders and the open unit of work that owns their locks.
///
/// Nothing written through a batch is visible to anyone else until [`ClaimedBatch::commit`] succeeds. Dropping a
/// batch without committing it discards all of its writes.
#[allow(async_fn_in_trait)]
pub trait ClaimedBatch {
    fn orders(&self) -> &[Order];

    /// Writes the new status, accrual and error of an order. If the update carries a credit, an `ACCRUAL` movement
    /// for the order's owner is appended and their balance recomputed, and the new movement is returned.
    async fn apply_update(&mut self, update: &OrderUpdate) -> Result<Option<BonusMovement>, LedgerError>;

    async fn commit(self) -> Result<(), LedgerError>;

    async fn rollback(self) -> Result<(), LedgerError>;
}
