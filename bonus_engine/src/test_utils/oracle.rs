//! A scripted accrual oracle.
use std::{
    collections::HashMap,
    sync::{
        atomic::{AtomicUsize, Ordering},
        Arc,
        Mutex,
    },
    time::Duration,
};

use accrual_client::{AccrualApiError, AccrualOrder, AccrualStatus};
use bonus_common::{OrderNumber, Points};

use crate::oracle::AccrualOracle;

#[derive(Debug, Clone)]
enum ScriptedAnswer {
    Reply(Result<Option<AccrualOrder>, AccrualApiError>),
    /// Never answers.
    Hang,
}

/// Answers oracle queries from a script. Orders without a scripted answer are unknown to it (`Ok(None)`).
///
/// It also keeps count of how many queries it received and how many were in flight at the same time.
#[derive(Debug, Clone, Default)]
pub struct ScriptedOracle {
    answers: Arc<Mutex<HashMap<OrderNumber, ScriptedAnswer>>>,
    delay: Duration,
    calls: Arc<AtomicUsize>,
    in_flight: Arc<AtomicUsize>,
    max_in_flight: Arc<AtomicUsize>,
}

struct InFlight<'a>(&'a AtomicUsize);

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

impl ScriptedOracle {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every answer is delayed by `delay`.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    fn script(&self, order: &OrderNumber, answer: ScriptedAnswer) {
        self.answers.lock().expect("oracle lock poisoned").insert(order.clone(), answer);
    }

    pub fn reply(&self, order: &OrderNumber, status: AccrualStatus, accrual: Option<Points>) {
        let report = AccrualOrder { order: order.clone(), status, accrual };
        self.script(order, ScriptedAnswer::Reply(Ok(Some(report))));
    }

    pub fn processed(&self, order: &OrderNumber, accrual: Points) {
        self.reply(order, AccrualStatus::Processed, Some(accrual));
    }

    pub fn unknown(&self, order: &OrderNumber) {
        self.script(order, ScriptedAnswer::Reply(Ok(None)));
    }

    pub fn fail(&self, order: &OrderNumber, error: AccrualApiError) {
        self.script(order, ScriptedAnswer::Reply(Err(error)));
    }

    pub fn hang(&self, order: &OrderNumber) {
        self.script(order, ScriptedAnswer::Hang);
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }
}

impl AccrualOracle for ScriptedOracle {
    async fn order_accrual(&self, order: &OrderNumber) -> Result<Option<AccrualOrder>, AccrualApiError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);
        let _in_flight = InFlight(&self.in_flight);
        let answer = self.answers.lock().expect("oracle lock poisoned").get(order).cloned();
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        match answer {
            Some(ScriptedAnswer::Reply(result)) => result,
            Some(ScriptedAnswer::Hang) => futures::future::pending().await,
            None => Ok(None),
        }
    }
}
