use actix_web::{http::StatusCode, test::TestRequest, web, web::ServiceConfig};
use bonus_common::{OrderNumber, Points};
use bonus_engine::{
    db_types::{BonusBalance, BonusMovement, MovementType},
    LedgerApi,
    LedgerError,
};
use chrono::{TimeZone, Utc};
use serde_json::json as json_body;

use super::{
    helpers::{json, send_request},
    mocks::MockLedgerManager,
};
use crate::routes::{MyBalanceRoute, MyWithdrawalsRoute, WithdrawRoute};

fn configure(ledger: MockLedgerManager) -> impl FnOnce(&mut ServiceConfig) {
    move |cfg| {
        cfg.service(MyBalanceRoute::<MockLedgerManager>::new())
            .service(WithdrawRoute::<MockLedgerManager>::new())
            .service(MyWithdrawalsRoute::<MockLedgerManager>::new())
            .app_data(web::Data::new(LedgerApi::new(ledger)));
    }
}

fn withdrawal(user_id: i64, order: &str, amount: Points) -> BonusMovement {
    BonusMovement {
        id: 3,
        created_at: Utc.with_ymd_and_hms(2024, 5, 1, 9, 15, 0).unwrap(),
        user_id,
        movement_type: MovementType::Withdrawal,
        amount,
        order_id: Some(OrderNumber::parse(order).unwrap()),
    }
}

fn withdraw(order: &str, sum: f64) -> TestRequest {
    TestRequest::post().uri("/balance/withdraw").set_json(json_body!({ "order": order, "sum": sum }))
}

#[actix_web::test]
async fn fetch_my_balance() {
    let _ = env_logger::try_init().ok();
    let mut ledger = MockLedgerManager::new();
    ledger.expect_fetch_balance().withf(|id| *id == 4).returning(|user_id| {
        Ok(BonusBalance { user_id, current: "500.5".parse().unwrap(), withdrawn: Points::from(42) })
    });
    let (status, body) = send_request(TestRequest::get().uri("/balance"), Some(4), configure(ledger)).await;
    assert_eq!(status, StatusCode::OK);
    let body = json(&body);
    assert_eq!(body["current"].as_f64(), Some(500.5));
    assert_eq!(body["withdrawn"].as_f64(), Some(42.0));
    assert!(body.get("user_id").is_none());
}

#[actix_web::test]
async fn withdraw_points() {
    let mut ledger = MockLedgerManager::new();
    ledger
        .expect_withdraw()
        .withf(|w| {
            w.user_id == 4 &&
                w.amount == Points::from(751) &&
                w.order_id.as_ref().map(|o| o.as_str()) == Some("2377225624")
        })
        .times(1)
        .returning(|w| {
            let movement = withdrawal(w.user_id, "2377225624", w.amount);
            Ok((movement, BonusBalance { user_id: w.user_id, current: Points::from(9), withdrawn: w.amount }))
        });
    let (status, body) = send_request(withdraw("2377225624", 751.0), Some(4), configure(ledger)).await;
    assert_eq!(status, StatusCode::OK);
    let body = json(&body);
    assert_eq!(body["order"], "2377225624");
    assert_eq!(body["sum"].as_f64(), Some(751.0));
    assert_eq!(body["processed_at"], "2024-05-01T09:15:00Z");
}

#[actix_web::test]
async fn withdraw_more_than_the_balance() {
    let mut ledger = MockLedgerManager::new();
    ledger.expect_withdraw().returning(|w| {
        Err(LedgerError::InsufficientFunds { requested: w.amount, available: Points::from(100) })
    });
    let (status, body) = send_request(withdraw("2377225624", 150.0), Some(4), configure(ledger)).await;
    assert_eq!(status, StatusCode::PAYMENT_REQUIRED);
    assert!(json(&body)["error"].as_str().unwrap().starts_with("Insufficient funds."));
}

#[actix_web::test]
async fn withdraw_against_an_invalid_order() {
    let mut ledger = MockLedgerManager::new();
    ledger.expect_withdraw().never();
    let (status, _) = send_request(withdraw("12345", 10.0), Some(4), configure(ledger)).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
}

#[actix_web::test]
async fn withdraw_invalid_sums() {
    for sum in [0.0, -10.0, 1.005] {
        let mut ledger = MockLedgerManager::new();
        ledger.expect_withdraw().never();
        let (status, _) = send_request(withdraw("2377225624", sum), Some(4), configure(ledger)).await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY, "sum {sum}");
    }
}

#[actix_web::test]
async fn withdraw_with_a_malformed_body() {
    let mut ledger = MockLedgerManager::new();
    ledger.expect_withdraw().never();
    let req = TestRequest::post().uri("/balance/withdraw").set_json(json_body!({ "order": "2377225624" }));
    let (status, _) = send_request(req, Some(4), configure(ledger)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[actix_web::test]
async fn withdraw_without_user() {
    let mut ledger = MockLedgerManager::new();
    ledger.expect_withdraw().never();
    let (status, _) = send_request(withdraw("2377225624", 1.0), None, configure(ledger)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[actix_web::test]
async fn fetch_my_withdrawals() {
    let mut ledger = MockLedgerManager::new();
    ledger
        .expect_fetch_movements()
        .withf(|id, t| *id == 4 && *t == Some(MovementType::Withdrawal))
        .returning(|user_id, _| Ok(vec![withdrawal(user_id, "2377225624", Points::from(25))]));
    let (status, body) = send_request(TestRequest::get().uri("/withdrawals"), Some(4), configure(ledger)).await;
    assert_eq!(status, StatusCode::OK);
    let body = json(&body);
    let list = body.as_array().unwrap();
    assert_eq!(list.len(), 1);
    assert_eq!(list[0]["order"], "2377225624");
    assert_eq!(list[0]["sum"].as_f64(), Some(25.0));
}

#[actix_web::test]
async fn fetch_my_withdrawals_when_there_are_none() {
    let mut ledger = MockLedgerManager::new();
    ledger.expect_fetch_movements().returning(|_, _| Ok(vec![]));
    let (status, _) = send_request(TestRequest::get().uri("/withdrawals"), Some(4), configure(ledger)).await;
    assert_eq!(status, StatusCode::NO_CONTENT);
}
