use std::{fmt::Display, time::Duration};

use accrual_client::{AccrualApiError, AccrualOrder};
use bonus_common::Points;

use crate::db_types::{Order, OrderStatusType, OrderUpdate};

pub const DEFAULT_BATCH_SIZE: usize = 100;
pub const DEFAULT_MAX_CONCURRENCY: usize = 10;
pub const DEFAULT_CYCLE_TIMEOUT: Duration = Duration::from_secs(120);

#[derive(Debug, Clone)]
pub struct ReconciliationConfig {
    /// The most orders claimed in one cycle.
    pub batch_size: usize,
    /// The most oracle queries in flight at once. Never more than the number of claimed orders.
    pub max_concurrency: usize,
    /// A cycle that has not heard back from the oracle within this time is rolled back.
    pub cycle_timeout: Duration,
}

impl Default for ReconciliationConfig {
    fn default() -> Self {
        Self {
            batch_size: DEFAULT_BATCH_SIZE,
            max_concurrency: DEFAULT_MAX_CONCURRENCY,
            cycle_timeout: DEFAULT_CYCLE_TIMEOUT,
        }
    }
}

#[derive(Debug, Clone)]
pub enum CycleOutcome {
    Completed(CycleReport),
    /// Another cycle was still running, so this trigger was ignored.
    Skipped,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct CycleReport {
    pub claimed: usize,
    /// Orders whose status moved forward.
    pub advanced: usize,
    /// Orders that were credited to their owner's balance.
    pub credited: usize,
    /// Orders the oracle had no news about.
    pub pending: usize,
    /// Orders whose oracle query failed.
    pub failed: usize,
    pub total_credited: Points,
}

impl Display for CycleReport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} claimed, {} advanced, {} credited ({}), {} pending, {} failed",
            self.claimed, self.advanced, self.credited, self.total_credited, self.pending, self.failed
        )
    }
}

/// How the oracle's answer for one order is classified.
#[derive(Debug, Clone, PartialEq)]
pub enum OrderOutcome {
    /// The status moved forward. May carry a credit.
    Advanced(OrderUpdate),
    /// No progress. An update is still written if a stale error has to be cleared.
    Pending(Option<OrderUpdate>),
    /// The oracle query failed. Only the error field is written.
    Failed(OrderUpdate),
}

impl OrderOutcome {
    pub fn into_update(self) -> Option<OrderUpdate> {
        match self {
            OrderOutcome::Advanced(u) | OrderOutcome::Failed(u) => Some(u),
            OrderOutcome::Pending(u) => u,
        }
    }
}

fn unchanged(order: &Order, last_error: Option<String>) -> OrderUpdate {
    OrderUpdate {
        order_id: order.id.clone(),
        user_id: order.user_id,
        status: order.status,
        accrual: order.accrual,
        last_error,
        credit: None,
    }
}

fn no_progress(order: &Order) -> OrderOutcome {
    match order.last_error {
        Some(_) => OrderOutcome::Pending(Some(unchanged(order, None))),
        None => OrderOutcome::Pending(None),
    }
}

/// Decides what to write back for a claimed order, given the oracle's answer.
///
/// Status only moves forward, and a credit is only issued on the transition into `PROCESSED`. Feeding the same answer
/// twice therefore never credits an order twice.
pub fn reconcile_order(order: &Order, answer: Result<Option<AccrualOrder>, AccrualApiError>) -> OrderOutcome {
    let report = match answer {
        Ok(Some(report)) => report,
        Ok(None) => return no_progress(order),
        Err(e) => return OrderOutcome::Failed(unchanged(order, Some(e.to_string()))),
    };
    if let Some(accrual) = report.accrual.filter(|a| a.is_negative()) {
        let error = format!("Accrual service reported a negative accrual of {accrual}");
        return OrderOutcome::Failed(unchanged(order, Some(error)));
    }
    let next = OrderStatusType::from(report.status);
    if !order.status.can_transition_to(next) {
        return no_progress(order);
    }
    let credit = match next {
        OrderStatusType::Processed => report.accrual.filter(|a| a.is_positive()),
        _ => None,
    };
    OrderOutcome::Advanced(OrderUpdate {
        order_id: order.id.clone(),
        user_id: order.user_id,
        status: next,
        accrual: report.accrual.or(order.accrual),
        last_error: None,
        credit,
    })
}
