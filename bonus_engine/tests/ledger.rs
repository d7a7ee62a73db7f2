use bonus_common::{OrderNumberError, Points};
use bonus_engine::{
    db_types::{MovementType, NewMovement, OrderStatusType},
    test_utils::{memory::MemoryDatabase, valid_order_number},
    LedgerApi,
    LedgerError,
    OrderApi,
    UploadResult,
};
use proptest::prelude::*;

fn credit(db: &MemoryDatabase, user_id: i64, seed: u64, amount: i64) {
    let order_id = valid_order_number(seed);
    db.append_movement(NewMovement::accrual(user_id, order_id, Points::from(amount))).unwrap();
}

#[tokio::test]
async fn withdraw_within_balance() {
    let db = MemoryDatabase::new();
    credit(&db, 1, 100, 500);
    let api = LedgerApi::new(db.clone());

    let movement = api.withdraw(1, "2377225624", Points::from(200)).await.unwrap();
    assert_eq!(movement.movement_type, MovementType::Withdrawal);
    assert_eq!(movement.amount, Points::from(200));
    assert_eq!(movement.order_id.unwrap().as_str(), "2377225624");

    let balance = api.balance(1).await.unwrap();
    assert_eq!(balance.current, Points::from(300));
    assert_eq!(balance.withdrawn, Points::from(200));
    let withdrawals = api.withdrawals(1).await.unwrap();
    assert_eq!(withdrawals.len(), 1);
    assert_eq!(api.movements(1).await.unwrap().len(), 2);
}

#[tokio::test]
async fn overdraw_is_refused_and_changes_nothing() {
    let db = MemoryDatabase::new();
    credit(&db, 1, 100, 100);
    let api = LedgerApi::new(db.clone());

    let err = api.withdraw(1, "2377225624", Points::from(150)).await.unwrap_err();
    match err {
        LedgerError::InsufficientFunds { requested, available } => {
            assert_eq!(requested, Points::from(150));
            assert_eq!(available, Points::from(100));
        },
        e => panic!("unexpected error: {e}"),
    }
    let balance = api.balance(1).await.unwrap();
    assert_eq!(balance.current, Points::from(100));
    assert_eq!(balance.withdrawn, Points::zero());
    assert_eq!(db.all_movements().len(), 1);
}

#[tokio::test]
async fn unknown_users_have_a_zero_balance() {
    let api = LedgerApi::new(MemoryDatabase::new());
    let balance = api.balance(42).await.unwrap();
    assert_eq!(balance.current, Points::zero());
    assert_eq!(balance.withdrawn, Points::zero());
    assert!(api.withdrawals(42).await.unwrap().is_empty());
    let err = api.withdraw(42, "2377225624", Points::from(1)).await.unwrap_err();
    assert!(matches!(err, LedgerError::InsufficientFunds { .. }));
}

#[tokio::test]
async fn withdrawals_are_validated_first() {
    let db = MemoryDatabase::new();
    credit(&db, 1, 100, 100);
    let api = LedgerApi::new(db.clone());

    let err = api.withdraw(1, "12345", Points::from(10)).await.unwrap_err();
    assert!(matches!(err, LedgerError::InvalidOrderNumber(OrderNumberError::ChecksumMismatch(_))));
    let err = api.withdraw(1, "2377225624", Points::zero()).await.unwrap_err();
    assert!(matches!(err, LedgerError::InvalidAmount(_)));
    let err = api.withdraw(1, "2377225624", Points::from(-5)).await.unwrap_err();
    assert!(matches!(err, LedgerError::InvalidAmount(_)));
    let too_precise: Points = serde_json::from_str("12.345").unwrap();
    let err = api.withdraw(1, "2377225624", too_precise).await.unwrap_err();
    assert!(matches!(err, LedgerError::InvalidAmount(_)));
    assert!(err.is_user_error());

    let fractional: Points = serde_json::from_str("12.50").unwrap();
    api.withdraw(1, "2377225624", fractional).await.unwrap();
    assert_eq!(api.balance(1).await.unwrap().current, "87.5".parse().unwrap());
    assert_eq!(db.all_movements().len(), 2);
}

#[tokio::test]
async fn uploads() {
    let db = MemoryDatabase::new();
    let api = OrderApi::new(db.clone());

    let UploadResult::Created(order) = api.upload_order(1, " 79927398713 ").await.unwrap() else {
        panic!("expected a new order");
    };
    assert_eq!(order.status, OrderStatusType::New);
    assert_eq!(order.user_id, 1);
    assert!(matches!(api.upload_order(1, "79927398713").await.unwrap(), UploadResult::AlreadyUploaded(_)));

    let err = api.upload_order(2, "79927398713").await.unwrap_err();
    assert!(matches!(err, LedgerError::OrderConflict(ref id) if id.as_str() == "79927398713"));
    assert_eq!(db.order(&order.id).unwrap().user_id, 1);

    let err = api.upload_order(1, "12345").await.unwrap_err();
    assert!(matches!(err, LedgerError::InvalidOrderNumber(_)));
    let err = api.upload_order(1, "").await.unwrap_err();
    assert!(matches!(err, LedgerError::InvalidOrderNumber(OrderNumberError::Empty)));
    let err = api.upload_order(1, "7992a398713").await.unwrap_err();
    assert!(matches!(err, LedgerError::InvalidOrderNumber(OrderNumberError::InvalidCharacter { position: 4, .. })));

    api.upload_order(1, "12345678903").await.unwrap();
    let orders = api.orders_for_user(1).await.unwrap();
    assert_eq!(orders.len(), 2);
    assert!(api.orders_for_user(2).await.unwrap().is_empty());
}

#[derive(Debug, Clone)]
enum Op {
    Credit(i64),
    Debit(i64),
}

fn op() -> impl Strategy<Value = Op> {
    prop_oneof![(1i64..1_000).prop_map(Op::Credit), (1i64..1_500).prop_map(Op::Debit)]
}

proptest! {
    #[test]
    fn balance_is_never_negative(ops in prop::collection::vec(op(), 1..40)) {
        let db = MemoryDatabase::new();
        let mut expected_current = 0i64;
        let mut expected_withdrawn = 0i64;
        for (i, op) in ops.into_iter().enumerate() {
            match op {
                Op::Credit(amount) => {
                    credit(&db, 1, i as u64 + 10, amount);
                    expected_current += amount;
                },
                Op::Debit(amount) => {
                    let result = db.append_movement(NewMovement::withdrawal(1, None, Points::from(amount)));
                    if amount > expected_current {
                        let is_insufficient = matches!(result, Err(LedgerError::InsufficientFunds { .. }));
                        prop_assert!(is_insufficient);
                    } else {
                        prop_assert!(result.is_ok());
                        expected_current -= amount;
                        expected_withdrawn += amount;
                    }
                },
            }
            let balance = db.cached_balance(1).unwrap_or_else(|| bonus_engine::db_types::BonusBalance::zero(1));
            prop_assert!(!balance.current.is_negative());
            prop_assert_eq!(balance.current, Points::from(expected_current));
            prop_assert_eq!(balance.withdrawn, Points::from(expected_withdrawn));
        }
        let movements = db.all_movements();
        let total = |t: MovementType| -> Points {
            movements.iter().filter(|m| m.movement_type == t).map(|m| m.amount).sum()
        };
        prop_assert_eq!(total(MovementType::Accrual) - total(MovementType::Withdrawal), Points::from(expected_current));
    }
}
