use std::time::Duration;

use accrual_client::AccrualApi;
use actix_web::{dev::Server, http::KeepAlive, middleware::Logger, web, App, HttpServer};
use bonus_engine::{DbRetryStrategy, LedgerApi, OrderApi, PostgresDatabase, ReconciliationApi};
use log::*;
use tokio_util::sync::CancellationToken;

use crate::{
    config::ServerConfig,
    errors::ServerError,
    reconciliation_worker::start_reconciliation_worker,
    routes::{health, MyBalanceRoute, MyOrdersRoute, MyWithdrawalsRoute, UploadOrderRoute, WithdrawRoute},
};

pub async fn run_server(config: ServerConfig) -> Result<(), ServerError> {
    let db = PostgresDatabase::new_with_url(config.database_url.reveal(), config.max_connections)
        .await
        .map_err(|e| ServerError::InitializeError(e.to_string()))?
        .with_retry_strategy(DbRetryStrategy::new(config.db_retry_delays.clone()));
    if config.run_migrations {
        db.run_migrations().await.map_err(|e| ServerError::InitializeError(e.to_string()))?;
        info!("🚀️ Database migrations are up to date");
    } else {
        info!("🚀️ Skipping database migrations");
    }
    let oracle = AccrualApi::new(config.accrual.clone()).map_err(|e| ServerError::InitializeError(e.to_string()))?;
    info!("🚀️ Using the accrual service at {}", config.accrual.base_url);

    let shutdown = CancellationToken::new();
    let reconciliation = ReconciliationApi::new(db.clone(), oracle, config.reconciliation.clone());
    let worker = start_reconciliation_worker(reconciliation, config.reconcile_interval, shutdown.clone());

    let srv = create_server_instance(config, db)?;
    let result = srv.await.map_err(|e| ServerError::Unspecified(e.to_string()));
    info!("🚀️ Server stopped. Waiting for the reconciliation worker to finish");
    shutdown.cancel();
    if let Err(e) = worker.await {
        warn!("🚀️ Reconciliation worker did not shut down cleanly. {e}");
    }
    result
}

pub fn create_server_instance(config: ServerConfig, db: PostgresDatabase) -> Result<Server, ServerError> {
    let srv = HttpServer::new(move || {
        let orders_api = OrderApi::new(db.clone());
        let ledger_api = LedgerApi::new(db.clone());
        let user_scope = web::scope("/api/user")
            .service(UploadOrderRoute::<PostgresDatabase>::new())
            .service(MyOrdersRoute::<PostgresDatabase>::new())
            .service(MyBalanceRoute::<PostgresDatabase>::new())
            .service(WithdrawRoute::<PostgresDatabase>::new())
            .service(MyWithdrawalsRoute::<PostgresDatabase>::new());
        App::new()
            .wrap(Logger::new("%t (%D ms) %s %a %{Host}i %U").log_target("bonus::access_log"))
            .app_data(web::Data::new(orders_api))
            .app_data(web::Data::new(ledger_api))
            .service(health)
            .service(user_scope)
    })
    .keep_alive(KeepAlive::Timeout(Duration::from_secs(600)))
    .bind((config.host.as_str(), config.port))?
    .run();
    Ok(srv)
}
