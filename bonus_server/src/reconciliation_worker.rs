use std::time::Duration;

use accrual_client::AccrualApi;
use bonus_engine::{reconciliation_objects::CycleOutcome, PostgresDatabase, ReconcileError, ReconciliationApi};
use log::*;
use tokio::{task::JoinHandle, time::MissedTickBehavior};
use tokio_util::sync::CancellationToken;

/// Starts the reconciliation worker. It runs one cycle per `interval` until `shutdown` is cancelled.
///
/// A cycle that overruns the interval delays the next tick rather than piling cycles up behind it.
pub fn start_reconciliation_worker(
    api: ReconciliationApi<PostgresDatabase, AccrualApi>,
    interval: Duration,
    shutdown: CancellationToken,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut timer = tokio::time::interval(interval);
        timer.set_missed_tick_behavior(MissedTickBehavior::Skip);
        info!("🕰️ Reconciliation worker started. Running every {interval:?}");
        loop {
            tokio::select! {
                _ = shutdown.cancelled() => break,
                _ = timer.tick() => {},
            }
            trace!("🕰️ Running reconciliation job");
            match api.run_cycle(&shutdown).await {
                Ok(CycleOutcome::Completed(report)) if report.claimed > 0 => {
                    info!("🕰️ Reconciliation job complete. {report}");
                },
                Ok(CycleOutcome::Completed(_)) => trace!("🕰️ Nothing to reconcile"),
                Ok(CycleOutcome::Skipped) => debug!("🕰️ Previous reconciliation job is still running"),
                Err(ReconcileError::Cancelled) => break,
                Err(e) => {
                    error!("🕰️ Error running reconciliation job: {e}");
                },
            }
        }
        info!("🕰️ Reconciliation worker stopped");
    })
}
