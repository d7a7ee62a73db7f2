use actix_web::{http::StatusCode, test::TestRequest, web, web::ServiceConfig};
use bonus_common::{OrderNumber, Points};
use bonus_engine::{
    db_types::{Order, OrderStatusType},
    InsertOrderResult,
    OrderApi,
};
use chrono::{TimeZone, Utc};

use super::{
    helpers::{json, send_request},
    mocks::MockOrderManager,
};
use crate::routes::{MyOrdersRoute, UploadOrderRoute};

fn order(number: &str, user_id: i64, status: OrderStatusType, accrual: Option<i64>) -> Order {
    Order {
        id: OrderNumber::parse(number).unwrap(),
        user_id,
        status,
        accrual: accrual.map(Points::from),
        last_error: None,
        uploaded_at: Utc.with_ymd_and_hms(2024, 3, 15, 18, 30, 0).unwrap(),
    }
}

fn configure(orders: MockOrderManager) -> impl FnOnce(&mut ServiceConfig) {
    move |cfg| {
        cfg.service(UploadOrderRoute::<MockOrderManager>::new())
            .service(MyOrdersRoute::<MockOrderManager>::new())
            .app_data(web::Data::new(OrderApi::new(orders)));
    }
}

fn upload(body: &str) -> TestRequest {
    TestRequest::post().uri("/orders").insert_header(("Content-Type", "text/plain")).set_payload(body.to_string())
}

#[actix_web::test]
async fn upload_new_order() {
    let _ = env_logger::try_init().ok();
    let mut orders = MockOrderManager::new();
    orders
        .expect_insert_order()
        .withf(|o| o.id.as_str() == "79927398713" && o.user_id == 1)
        .times(1)
        .returning(|o| Ok(InsertOrderResult::Inserted(order(o.id.as_str(), o.user_id, OrderStatusType::New, None))));
    let (status, body) = send_request(upload("79927398713\n"), Some(1), configure(orders)).await;
    assert_eq!(status, StatusCode::ACCEPTED);
    let body = json(&body);
    assert_eq!(body["number"], "79927398713");
    assert_eq!(body["status"], "NEW");
    assert!(body.get("accrual").is_none());
}

#[actix_web::test]
async fn upload_own_order_again() {
    let mut orders = MockOrderManager::new();
    orders.expect_insert_order().returning(|_| {
        Ok(InsertOrderResult::AlreadyExists(order("79927398713", 1, OrderStatusType::Processing, None)))
    });
    let (status, _) = send_request(upload("79927398713"), Some(1), configure(orders)).await;
    assert_eq!(status, StatusCode::OK);
}

#[actix_web::test]
async fn upload_someone_elses_order() {
    let mut orders = MockOrderManager::new();
    orders
        .expect_insert_order()
        .returning(|_| Ok(InsertOrderResult::AlreadyExists(order("79927398713", 2, OrderStatusType::New, None))));
    let (status, body) = send_request(upload("79927398713"), Some(1), configure(orders)).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(json(&body)["error"], "Order 79927398713 was already uploaded by another user.");
}

#[actix_web::test]
async fn upload_invalid_order_number() {
    let mut orders = MockOrderManager::new();
    orders.expect_insert_order().never();
    let (status, body) = send_request(upload("12345"), Some(1), configure(orders)).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert!(json(&body)["error"].as_str().unwrap().starts_with("Invalid order number."));
}

#[actix_web::test]
async fn upload_empty_body() {
    let mut orders = MockOrderManager::new();
    orders.expect_insert_order().never();
    let (status, _) = send_request(upload("  "), Some(1), configure(orders)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[actix_web::test]
async fn upload_without_user() {
    let mut orders = MockOrderManager::new();
    orders.expect_insert_order().never();
    let (status, body) = send_request(upload("79927398713"), None, configure(orders)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(json(&body)["error"], "Authentication Error. The X-User-Id header is missing.");
}

#[actix_web::test]
async fn fetch_my_orders() {
    let mut orders = MockOrderManager::new();
    orders.expect_fetch_orders_for_user().withf(|id| *id == 1).returning(|_| {
        Ok(vec![
            order("12345678903", 1, OrderStatusType::Processed, Some(500)),
            order("79927398713", 1, OrderStatusType::Invalid, None),
        ])
    });
    let (status, body) = send_request(TestRequest::get().uri("/orders"), Some(1), configure(orders)).await;
    assert_eq!(status, StatusCode::OK);
    let body = json(&body);
    let list = body.as_array().unwrap();
    assert_eq!(list.len(), 2);
    assert_eq!(list[0]["number"], "12345678903");
    assert_eq!(list[0]["status"], "PROCESSED");
    assert_eq!(list[0]["accrual"].as_f64(), Some(500.0));
    assert_eq!(list[0]["uploaded_at"], "2024-03-15T18:30:00Z");
    assert_eq!(list[1]["status"], "INVALID");
    assert!(list[1].get("accrual").is_none());
}

#[actix_web::test]
async fn fetch_my_orders_when_there_are_none() {
    let mut orders = MockOrderManager::new();
    orders.expect_fetch_orders_for_user().returning(|_| Ok(vec![]));
    let (status, body) = send_request(TestRequest::get().uri("/orders"), Some(7), configure(orders)).await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    assert!(body.is_empty());
}
