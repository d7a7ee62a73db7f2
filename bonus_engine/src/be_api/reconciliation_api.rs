//! The reconciliation pipeline.
//!
//! One cycle claims a bounded batch of pending orders, asks the accrual oracle about each of them concurrently, and
//! writes every outcome back in the same unit of work that holds the claim. Either the whole batch commits, or none of
//! it does: a persistence failure, a cancellation or a timeout rolls everything back, and the orders are picked up
//! again by a later cycle.
use std::fmt::Debug;

use futures::{stream, StreamExt};
use log::*;
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;

use crate::{
    be_api::{
        errors::ReconcileError,
        reconciliation_objects::{reconcile_order, CycleOutcome, CycleReport, OrderOutcome, ReconciliationConfig},
    },
    db::traits::{ClaimedBatch, ReconciliationDatabase},
    db_types::OrderUpdate,
    oracle::AccrualOracle,
};

pub struct ReconciliationApi<B, O> {
    db: B,
    oracle: O,
    config: ReconciliationConfig,
    running: Mutex<()>,
}

impl<B: Debug, O: Debug> Debug for ReconciliationApi<B, O> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "ReconciliationApi ({:?}, {:?}, {:?})", self.db, self.oracle, self.config)
    }
}

impl<B, O> ReconciliationApi<B, O>
where
    B: ReconciliationDatabase,
    O: AccrualOracle,
{
    pub fn new(db: B, oracle: O, config: ReconciliationConfig) -> Self {
        Self { db, oracle, config, running: Mutex::new(()) }
    }

    pub fn config(&self) -> &ReconciliationConfig {
        &self.config
    }

    /// Runs one reconciliation cycle.
    ///
    /// If a cycle is already running on this instance, returns [`CycleOutcome::Skipped`] straight away.
    pub async fn run_cycle(&self, cancel: &CancellationToken) -> Result<CycleOutcome, ReconcileError> {
        let Ok(_running) = self.running.try_lock() else {
            debug!("🔄️ A reconciliation cycle is still running. Skipping this one.");
            return Ok(CycleOutcome::Skipped);
        };
        if cancel.is_cancelled() {
            return Err(ReconcileError::Cancelled);
        }
        let mut batch = self.db.claim_batch(self.config.batch_size).await?;
        let mut report = CycleReport { claimed: batch.orders().len(), ..Default::default() };
        if report.claimed == 0 {
            trace!("🔄️ No pending orders");
            batch.rollback().await?;
            return Ok(CycleOutcome::Completed(report));
        }
        debug!("🔄️ Reconciling {} orders", report.claimed);

        let orders = batch.orders().to_vec();
        let concurrency = self.config.max_concurrency.clamp(1, orders.len());
        let queries = stream::iter(orders)
            .map(|order| async move {
                let answer = self.oracle.order_accrual(&order.id).await;
                (order, answer)
            })
            .buffer_unordered(concurrency)
            .collect::<Vec<_>>();
        let answers = tokio::select! {
            answers = queries => answers,
            _ = cancel.cancelled() => {
                warn!("🔄️ Reconciliation cancelled. Rolling back {} claimed orders", report.claimed);
                abandon(batch).await;
                return Err(ReconcileError::Cancelled);
            },
            _ = tokio::time::sleep(self.config.cycle_timeout) => {
                warn!("🔄️ Reconciliation timed out after {:?}. Rolling back", self.config.cycle_timeout);
                abandon(batch).await;
                return Err(ReconcileError::TimedOut(self.config.cycle_timeout));
            },
        };

        let mut updates: Vec<OrderUpdate> = Vec::with_capacity(answers.len());
        for (order, answer) in answers {
            let outcome = reconcile_order(&order, answer);
            match &outcome {
                OrderOutcome::Advanced(u) => {
                    trace!("🔄️ Order {} moves from {} to {}", order.id, order.status, u.status);
                    report.advanced += 1;
                },
                OrderOutcome::Pending(_) => report.pending += 1,
                OrderOutcome::Failed(u) => {
                    warn!("🔄️ Could not reconcile order {}. {}", order.id, u.last_error.as_deref().unwrap_or_default());
                    report.failed += 1;
                },
            }
            updates.extend(outcome.into_update());
        }
        // Balance locks are always taken in the same order, so concurrent batches cannot deadlock on them
        updates.sort_by(|a, b| (a.user_id, &a.order_id).cmp(&(b.user_id, &b.order_id)));

        for update in &updates {
            if cancel.is_cancelled() {
                warn!("🔄️ Reconciliation cancelled while saving results. Rolling back");
                abandon(batch).await;
                return Err(ReconcileError::Cancelled);
            }
            match batch.apply_update(update).await {
                Ok(Some(movement)) => {
                    report.credited += 1;
                    report.total_credited += movement.amount;
                },
                Ok(None) => {},
                Err(e) => {
                    error!("🔄️ Could not save the outcome for order {}. Rolling back the batch. {e}", update.order_id);
                    abandon(batch).await;
                    return Err(e.into());
                },
            }
        }
        batch.commit().await?;
        info!("🔄️ Reconciliation cycle complete. {report}");
        Ok(CycleOutcome::Completed(report))
    }
}

async fn abandon<T: ClaimedBatch>(batch: T) {
    if let Err(e) = batch.rollback().await {
        warn!("🔄️ Rolling back the batch failed. The transaction will be discarded when the connection closes. {e}");
    }
}
