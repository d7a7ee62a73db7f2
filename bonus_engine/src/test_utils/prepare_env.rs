use log::*;
use sqlx::{migrate::MigrateDatabase, Postgres};

use crate::PostgresDatabase;

pub const TEST_DATABASE_URL_VAR: &str = "BONUS_TEST_DATABASE_URL";

/// Creates a fresh, migrated database for a test.
///
/// The server is taken from `BONUS_TEST_DATABASE_URL` (which may also be set in `.env.test`). The database name in
/// that URL is replaced with a random one, so tests never see each other's data. Returns `None` if the variable is not
/// set, in which case the caller should skip the test.
pub async fn prepare_test_env() -> Option<PostgresDatabase> {
    dotenvy::from_filename(".env.test").ok();
    let _ = env_logger::try_init();
    let Ok(server_url) = std::env::var(TEST_DATABASE_URL_VAR) else {
        warn!("🚀️ {TEST_DATABASE_URL_VAR} is not set. Skipping Postgres test.");
        return None;
    };
    let url = random_db_url(&server_url);
    create_database(&url).await;
    let db = PostgresDatabase::new_with_url(&url, 20).await.expect("Error creating connection to database");
    db.run_migrations().await.expect("Error running DB migrations");
    Some(db)
}

pub fn random_db_url(server_url: &str) -> String {
    let (scheme, rest) = server_url.split_once("://").unwrap_or(("postgres", server_url));
    let host = rest.split('/').next().unwrap_or(rest);
    format!("{scheme}://{host}/bonus_test_{}", rand::random::<u32>())
}

pub async fn create_database(url: &str) {
    if let Err(e) = Postgres::drop_database(url).await {
        debug!("Could not drop database {url}: {e:?}");
    }
    Postgres::create_database(url).await.expect("Error creating database");
    info!("🚀️ Created Postgres database {url}");
}
