//! Request handler definitions
//!
//! Define each route and it handler here.
//! Handlers that are more than a line or two MUST go into a separate module. Keep this module neat and tidy 🙏
//!
//! A note about performance:
//! Since each worker thread processes its requests sequentially, handlers which block the current thread will cause the
//! current worker to stop processing new requests:
//! ```nocompile
//!     fn my_handler() -> impl Responder {
//!         std::thread::sleep(Duration::from_secs(5)); // <-- Bad practice! Will cause the current worker thread to
//! hang!
//!     }
//! ```
//! For this reason, any long, non-cpu-bound operation (e.g. I/O, database operations, etc.) should be expressed as
//! futures or asynchronous functions. Async handlers get executed concurrently by worker threads and thus don’t block
//! execution:
//!
//! ```nocompile
//!     async fn my_handler() -> impl Responder {
//!         tokio::time::sleep(Duration::from_secs(5)).await; // <-- Ok. Worker thread will handle other requests here
//!     }
//! ```
use actix_web::{get, web, HttpResponse, Responder};
use bonus_engine::{LedgerApi, LedgerManagement, OrderApi, OrderManagement, UploadResult};
use log::*;

use crate::{
    auth::AuthenticatedUser,
    data_objects::{BalanceResponse, OrderResponse, WithdrawRequest, WithdrawalResponse},
    errors::ServerError,
};

// Web-actix cannot handle generics in handlers, so it's implemented manually using the `route!` macro
#[macro_export]
macro_rules! route {
    ($name:ident => $method:ident $path:literal impl $($bounds:ty),+) => {
        paste::paste! { pub struct [<$name:camel Route>]< $( [< T $bounds:camel> ],)+ >( $( core::marker::PhantomData<fn() -> [< T $bounds:camel> ] >,)+ );}
        paste::paste! { impl< $( [< T $bounds:camel> ],)+ > [<$name:camel Route>]< $( [< T $bounds:camel> ],)+ > {
            #[allow(clippy::new_without_default)]
            pub fn new() -> Self {
                Self($( core::marker::PhantomData::<fn() -> [< T $bounds:camel> ] >,)+)
            }
        }}
        paste::paste! { impl<$( [< T $bounds:camel >] , )+> actix_web::dev::HttpServiceFactory for [<$name:camel Route>]<$([<T $bounds:camel>],)+>
        where
            $([<T $bounds:camel>]: $bounds + 'static,)+
        {
            fn register(self, config: &mut actix_web::dev::AppService) {
                let res = actix_web::Resource::new($path)
                    .name(stringify!($name))
                    .guard(actix_web::guard::$method())
                    .to($name::< $( [< T $bounds:camel >], )+>);
                actix_web::dev::HttpServiceFactory::register(res, config);
            }
        }}
    };
}

// ----------------------------------------------   Health  ----------------------------------------------------
#[get("/health")]
pub async fn health() -> impl Responder {
    trace!("💻️ Received health check request");
    HttpResponse::Ok().body("👍️\n")
}

//----------------------------------------------   Orders  ----------------------------------------------------
route!(upload_order => Post "/orders" impl OrderManagement);
/// Route handler for order uploads
///
/// The request body is the order number as plain text. Responds with
/// * `202 Accepted` if the order is new. It will be picked up by the next reconciliation cycle.
/// * `200 OK` if you had already uploaded this order.
/// * `409 Conflict` if another user uploaded this order.
/// * `422 Unprocessable Entity` if the number fails the Luhn check.
pub async fn upload_order<B: OrderManagement>(
    user: AuthenticatedUser,
    body: String,
    api: web::Data<OrderApi<B>>,
) -> Result<HttpResponse, ServerError> {
    let number = body.trim();
    if number.is_empty() {
        return Err(ServerError::InvalidRequestBody("Expected an order number".into()));
    }
    debug!("💻️ POST order {number} for user #{}", user.user_id);
    let response = match api.upload_order(user.user_id, number).await? {
        UploadResult::Created(order) => HttpResponse::Accepted().json(OrderResponse::from(order)),
        UploadResult::AlreadyUploaded(order) => HttpResponse::Ok().json(OrderResponse::from(order)),
    };
    Ok(response)
}

route!(my_orders => Get "/orders" impl OrderManagement);
/// The caller's orders, newest first. `204 No Content` if there are none.
pub async fn my_orders<B: OrderManagement>(
    user: AuthenticatedUser,
    api: web::Data<OrderApi<B>>,
) -> Result<HttpResponse, ServerError> {
    debug!("💻️ GET orders for user #{}", user.user_id);
    let orders = api.orders_for_user(user.user_id).await?;
    if orders.is_empty() {
        return Ok(HttpResponse::NoContent().finish());
    }
    let orders = orders.into_iter().map(OrderResponse::from).collect::<Vec<_>>();
    Ok(HttpResponse::Ok().json(orders))
}

//----------------------------------------------   Balance  ----------------------------------------------------
route!(my_balance => Get "/balance" impl LedgerManagement);
pub async fn my_balance<B: LedgerManagement>(
    user: AuthenticatedUser,
    api: web::Data<LedgerApi<B>>,
) -> Result<HttpResponse, ServerError> {
    debug!("💻️ GET balance for user #{}", user.user_id);
    let balance = api.balance(user.user_id).await?;
    Ok(HttpResponse::Ok().json(BalanceResponse::from(balance)))
}

route!(withdraw => Post "/balance/withdraw" impl LedgerManagement);
/// Route handler for withdrawals
///
/// Spends `sum` points against the order number in `order`. Responds with `402 Payment Required` if the balance does
/// not cover the sum, and with `422 Unprocessable Entity` if the order number or the sum is invalid.
pub async fn withdraw<B: LedgerManagement>(
    user: AuthenticatedUser,
    body: web::Json<WithdrawRequest>,
    api: web::Data<LedgerApi<B>>,
) -> Result<HttpResponse, ServerError> {
    let WithdrawRequest { order, sum } = body.into_inner();
    debug!("💻️ POST withdrawal of {sum} on order {order} for user #{}", user.user_id);
    let movement = api.withdraw(user.user_id, &order, sum).await?;
    Ok(HttpResponse::Ok().json(WithdrawalResponse::from(movement)))
}

route!(my_withdrawals => Get "/withdrawals" impl LedgerManagement);
/// The caller's withdrawals, oldest first. `204 No Content` if there are none.
pub async fn my_withdrawals<B: LedgerManagement>(
    user: AuthenticatedUser,
    api: web::Data<LedgerApi<B>>,
) -> Result<HttpResponse, ServerError> {
    debug!("💻️ GET withdrawals for user #{}", user.user_id);
    let withdrawals = api.withdrawals(user.user_id).await?;
    if withdrawals.is_empty() {
        return Ok(HttpResponse::NoContent().finish());
    }
    let withdrawals = withdrawals.into_iter().map(WithdrawalResponse::from).collect::<Vec<_>>();
    Ok(HttpResponse::Ok().json(withdrawals))
}
