use actix_web::{http::StatusCode, test, test::TestRequest, web::ServiceConfig, App};
use log::debug;

use crate::auth::USER_ID_HEADER;

/// Sends `req` to an app built by `configure`, as `user_id` if one is given. Returns the status and the raw body.
pub async fn send_request<F>(req: TestRequest, user_id: Option<i64>, configure: F) -> (StatusCode, String)
where F: FnOnce(&mut ServiceConfig) {
    let req = match user_id {
        Some(id) => req.insert_header((USER_ID_HEADER, id.to_string())),
        None => req,
    };
    let app = App::new().configure(configure);
    let service = test::init_service(app).await;
    debug!("Making request");
    let res = test::call_service(&service, req.to_request()).await;
    let status = res.status();
    let body = String::from_utf8_lossy(&test::read_body(res).await).into_owned();
    (status, body)
}

pub fn json(body: &str) -> serde_json::Value {
    serde_json::from_str(body).unwrap_or_else(|e| panic!("Body is not JSON ({e}): {body}"))
}
