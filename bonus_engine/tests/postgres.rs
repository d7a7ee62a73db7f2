//! These tests need a Postgres server. Set `BONUS_TEST_DATABASE_URL` (or add it to `.env.test`) to run them; they
//! pass trivially otherwise.
use std::collections::HashSet;

use bonus_common::Points;
use bonus_engine::{
    db_types::{MovementType, NewMovement, OrderStatusType},
    pg_db::{ledger, orders},
    reconciliation_objects::{CycleOutcome, ReconciliationConfig},
    test_utils::{oracle::ScriptedOracle, prepare_env::prepare_test_env, valid_order_number},
    ClaimedBatch,
    LedgerApi,
    LedgerError,
    OrderApi,
    PostgresDatabase,
    ReconciliationApi,
    ReconciliationDatabase,
    UploadResult,
};
use futures::future::join_all;
use log::*;
use tokio_util::sync::CancellationToken;

async fn credit(db: &PostgresDatabase, user_id: i64, seed: u64, amount: i64) {
    let mut tx = db.pool().begin().await.unwrap();
    let movement = NewMovement::accrual(user_id, valid_order_number(seed), Points::from(amount));
    ledger::append_movement(movement, &mut tx).await.unwrap();
    tx.commit().await.unwrap();
}

#[tokio::test]
async fn uploads_and_conflicts() {
    let Some(db) = prepare_test_env().await else { return };
    let api = OrderApi::new(db.clone());
    assert!(matches!(api.upload_order(1, "79927398713").await.unwrap(), UploadResult::Created(_)));
    assert!(matches!(api.upload_order(1, "79927398713").await.unwrap(), UploadResult::AlreadyUploaded(_)));
    let err = api.upload_order(2, "79927398713").await.unwrap_err();
    assert!(matches!(err, LedgerError::OrderConflict(_)));
    let err = api.upload_order(2, "12345").await.unwrap_err();
    assert!(matches!(err, LedgerError::InvalidOrderNumber(_)));

    let orders = api.orders_for_user(1).await.unwrap();
    assert_eq!(orders.len(), 1);
    assert_eq!(orders[0].status, OrderStatusType::New);
    assert!(api.orders_for_user(2).await.unwrap().is_empty());
}

#[tokio::test]
async fn open_claims_are_disjoint() {
    let Some(db) = prepare_test_env().await else { return };
    let api = OrderApi::new(db.clone());
    for i in 0..80 {
        api.upload_order(i % 7, valid_order_number(10_000 + i as u64).as_str()).await.unwrap();
    }
    let first = db.claim_batch(50).await.unwrap();
    let second = db.claim_batch(50).await.unwrap();
    let a = first.orders().iter().map(|o| o.id.clone()).collect::<HashSet<_>>();
    let b = second.orders().iter().map(|o| o.id.clone()).collect::<HashSet<_>>();
    info!("🚀️ Claimed {} and {} orders", a.len(), b.len());
    assert_eq!(a.len(), 50);
    assert_eq!(b.len(), 30);
    assert!(a.is_disjoint(&b));

    second.rollback().await.unwrap();
    first.rollback().await.unwrap();
    let again = db.claim_batch(100).await.unwrap();
    assert_eq!(again.orders().len(), 80);
}

#[tokio::test]
async fn claims_can_page_through_pending_orders() {
    let Some(db) = prepare_test_env().await else { return };
    let api = OrderApi::new(db.clone());
    for seed in 200..205u64 {
        api.upload_order(3, valid_order_number(seed).as_str()).await.unwrap();
    }
    let mut tx = db.pool().begin().await.unwrap();
    let mut seen = HashSet::new();
    for (offset, expected) in [(0, 2), (2, 2), (4, 1), (6, 0)] {
        let page = orders::claim_batch(&OrderStatusType::PENDING, 2, offset, &mut tx).await.unwrap();
        assert_eq!(page.len(), expected, "page at offset {offset}");
        for order in page {
            assert!(seen.insert(order.id), "order claimed twice");
        }
    }
    assert_eq!(seen.len(), 5);
    tx.rollback().await.unwrap();
}

#[tokio::test]
async fn terminal_orders_are_not_claimed() {
    let Some(db) = prepare_test_env().await else { return };
    let api = OrderApi::new(db.clone());
    for seed in 1..=4u64 {
        api.upload_order(1, valid_order_number(seed).as_str()).await.unwrap();
    }
    let oracle = ScriptedOracle::new();
    oracle.processed(&valid_order_number(1), Points::from(40));
    oracle.reply(&valid_order_number(2), accrual_client::AccrualStatus::Invalid, None);
    oracle.reply(&valid_order_number(3), accrual_client::AccrualStatus::Processing, None);
    let pipeline = ReconciliationApi::new(db.clone(), oracle.clone(), ReconciliationConfig::default());
    let CycleOutcome::Completed(report) = pipeline.run_cycle(&CancellationToken::new()).await.unwrap() else {
        panic!("cycle was skipped");
    };
    assert_eq!(report.claimed, 4);
    assert_eq!(report.credited, 1);

    let batch = db.claim_batch(10).await.unwrap();
    let mut claimed = batch.orders().iter().map(|o| o.id.clone()).collect::<Vec<_>>();
    claimed.sort();
    let mut expected = vec![valid_order_number(3), valid_order_number(4)];
    expected.sort();
    assert_eq!(claimed, expected);
    batch.rollback().await.unwrap();

    // A second pass credits nothing more
    pipeline.run_cycle(&CancellationToken::new()).await.unwrap();
    let ledger = LedgerApi::new(db.clone());
    assert_eq!(ledger.balance(1).await.unwrap().current, Points::from(40));
    assert_eq!(ledger.movements(1).await.unwrap().len(), 1);
}

#[tokio::test]
async fn rolled_back_batches_leave_no_trace() {
    let Some(db) = prepare_test_env().await else { return };
    OrderApi::new(db.clone()).upload_order(5, "79927398713").await.unwrap();

    let mut batch = db.claim_batch(10).await.unwrap();
    let order = batch.orders()[0].clone();
    let update = bonus_engine::reconciliation_objects::reconcile_order(
        &order,
        Ok(Some(accrual_client::AccrualOrder {
            order: order.id.clone(),
            status: accrual_client::AccrualStatus::Processed,
            accrual: Some(Points::from(100)),
        })),
    )
    .into_update()
    .unwrap();
    let movement = batch.apply_update(&update).await.unwrap();
    assert!(movement.is_some());
    batch.rollback().await.unwrap();

    let ledger = LedgerApi::new(db.clone());
    assert_eq!(ledger.balance(5).await.unwrap().current, Points::zero());
    assert!(ledger.movements(5).await.unwrap().is_empty());
    let mut conn = db.pool().acquire().await.unwrap();
    let order = orders::fetch_order_by_id(&order.id, &mut conn).await.unwrap().unwrap();
    assert_eq!(order.status, OrderStatusType::New);
}

#[tokio::test]
async fn concurrent_withdrawals_never_overdraw() {
    let Some(db) = prepare_test_env().await else { return };
    credit(&db, 9, 1, 100).await;
    let api = LedgerApi::new(db.clone());
    let attempts = (0..10u64).map(|i| {
        let api = &api;
        async move { api.withdraw(9, valid_order_number(500 + i).as_str(), Points::from(30)).await }
    });
    let results = join_all(attempts).await;
    let succeeded = results.iter().filter(|r| r.is_ok()).count();
    let refused = results.iter().filter(|r| matches!(r, Err(LedgerError::InsufficientFunds { .. }))).count();
    info!("🚀️ {succeeded} withdrawals succeeded, {refused} were refused");
    assert_eq!(succeeded, 3);
    assert_eq!(refused, 7);

    let balance = api.balance(9).await.unwrap();
    assert_eq!(balance.current, Points::from(10));
    assert_eq!(balance.withdrawn, Points::from(90));
    assert_eq!(api.withdrawals(9).await.unwrap().len(), 3);
}

#[tokio::test]
async fn cached_balance_matches_the_ledger() {
    let Some(db) = prepare_test_env().await else { return };
    for (seed, amount) in [(1u64, 250), (2, 80), (3, 5)] {
        credit(&db, 4, seed, amount).await;
    }
    let api = LedgerApi::new(db.clone());
    api.withdraw(4, "2377225624", Points::from(120)).await.unwrap();
    let err = api.withdraw(4, "2377225624", Points::from(1_000)).await.unwrap_err();
    assert!(matches!(err, LedgerError::InsufficientFunds { .. }));

    let mut conn = db.pool().acquire().await.unwrap();
    let (accrued, withdrawn) = ledger::ledger_totals(4, &mut conn).await.unwrap();
    let balance = api.balance(4).await.unwrap();
    assert_eq!(accrued, Points::from(335));
    assert_eq!(withdrawn, Points::from(120));
    assert_eq!(balance.current, accrued - withdrawn);
    assert_eq!(balance.withdrawn, withdrawn);
    let movements = api.movements(4).await.unwrap();
    assert_eq!(movements.iter().filter(|m| m.movement_type == MovementType::Accrual).count(), 3);
}

#[tokio::test]
async fn duplicate_credits_are_rejected_by_the_database() {
    let Some(db) = prepare_test_env().await else { return };
    credit(&db, 6, 77, 10).await;
    let mut tx = db.pool().begin().await.unwrap();
    let movement = NewMovement::accrual(6, valid_order_number(77), Points::from(10));
    let err = ledger::append_movement(movement, &mut tx).await.unwrap_err();
    assert!(matches!(err, LedgerError::DriverError(_)));
    tx.rollback().await.unwrap();
    assert_eq!(LedgerApi::new(db.clone()).balance(6).await.unwrap().current, Points::from(10));
}
