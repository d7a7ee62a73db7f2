use std::{env, fmt::Display, str::FromStr, time::Duration};

use accrual_client::AccrualConfig;
use bonus_common::{parse_boolean_flag, parse_seconds_list, Secret};
use bonus_engine::{reconciliation_objects::ReconciliationConfig, DEFAULT_RETRY_DELAYS};
use log::*;

const DEFAULT_BONUS_HOST: &str = "127.0.0.1";
const DEFAULT_BONUS_PORT: u16 = 8360;
const DEFAULT_MAX_CONNECTIONS: u32 = 25;
const DEFAULT_RECONCILE_INTERVAL: Duration = Duration::from_secs(10);

#[derive(Clone, Debug)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub database_url: Secret<String>,
    pub max_connections: u32,
    /// How long to wait before each retry of a transiently failed database operation. The number of entries is the
    /// number of retries.
    pub db_retry_delays: Vec<Duration>,
    /// If true, pending database migrations are applied before the server starts listening.
    pub run_migrations: bool,
    pub accrual: AccrualConfig,
    /// The time between the starts of two reconciliation cycles.
    pub reconcile_interval: Duration,
    pub reconciliation: ReconciliationConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_BONUS_HOST.to_string(),
            port: DEFAULT_BONUS_PORT,
            database_url: Secret::default(),
            max_connections: DEFAULT_MAX_CONNECTIONS,
            db_retry_delays: DEFAULT_RETRY_DELAYS.to_vec(),
            run_migrations: true,
            accrual: AccrualConfig::default(),
            reconcile_interval: DEFAULT_RECONCILE_INTERVAL,
            reconciliation: ReconciliationConfig::default(),
        }
    }
}

impl ServerConfig {
    pub fn new(host: &str, port: u16) -> Self {
        Self { host: host.to_string(), port, ..Default::default() }
    }

    pub fn from_env_or_default() -> Self {
        let defaults = Self::default();
        let host = env::var("BONUS_HOST").ok().unwrap_or_else(|| DEFAULT_BONUS_HOST.into());
        let port = parse_var("BONUS_PORT", env::var("BONUS_PORT").ok(), DEFAULT_BONUS_PORT);
        let database_url = env::var("BONUS_DATABASE_URL").ok().unwrap_or_else(|| {
            error!("🪛️ BONUS_DATABASE_URL is not set. Please set it to the URL for the bonus database.");
            String::default()
        });
        let max_connections =
            parse_var("BONUS_DB_MAX_CONNECTIONS", env::var("BONUS_DB_MAX_CONNECTIONS").ok(), DEFAULT_MAX_CONNECTIONS);
        let db_retry_delays = configure_retry_delays(env::var("BONUS_DB_RETRY_DELAYS").ok());
        let run_migrations = parse_boolean_flag(env::var("BONUS_RUN_MIGRATIONS").ok(), true);
        let accrual = AccrualConfig::new_from_env_or_default();
        let reconcile_interval = seconds_var("BONUS_RECONCILE_INTERVAL", DEFAULT_RECONCILE_INTERVAL);
        let reconciliation = configure_reconciliation(defaults.reconciliation);
        Self {
            host,
            port,
            database_url: Secret::new(database_url),
            max_connections,
            db_retry_delays,
            run_migrations,
            accrual,
            reconcile_interval,
            reconciliation,
        }
    }
}

fn configure_reconciliation(defaults: ReconciliationConfig) -> ReconciliationConfig {
    let batch_size = count_var("BONUS_RECONCILE_BATCH_SIZE", defaults.batch_size);
    let max_concurrency = count_var("BONUS_RECONCILE_CONCURRENCY", defaults.max_concurrency);
    let config = ReconciliationConfig {
        batch_size,
        max_concurrency,
        cycle_timeout: seconds_var("BONUS_RECONCILE_TIMEOUT", defaults.cycle_timeout),
    };
    info!(
        "🪛️ Reconciling up to {} orders per cycle, {} accrual queries at a time, with a {:?} timeout",
        config.batch_size, config.max_concurrency, config.cycle_timeout
    );
    config
}

fn configure_retry_delays(value: Option<String>) -> Vec<Duration> {
    let Some(value) = value else {
        return DEFAULT_RETRY_DELAYS.to_vec();
    };
    match parse_seconds_list(&value) {
        Ok(delays) => {
            if delays.is_empty() {
                warn!("🪛️ BONUS_DB_RETRY_DELAYS is empty. Transient database errors will not be retried.");
            }
            delays
        },
        Err(entry) => {
            warn!(
                "🪛️ Invalid entry ({entry}) in BONUS_DB_RETRY_DELAYS. Using the default delays, \
                 {DEFAULT_RETRY_DELAYS:?}."
            );
            DEFAULT_RETRY_DELAYS.to_vec()
        },
    }
}

/// A count that must be at least 1.
fn count_var(name: &str, default: usize) -> usize {
    match parse_var(name, env::var(name).ok(), default) {
        0 => {
            warn!("🪛️ {name} must be at least 1. Using the default, {default}, instead.");
            default
        },
        n => n,
    }
}

fn seconds_var(name: &str, default: Duration) -> Duration {
    parse_seconds(name, env::var(name).ok(), default)
}

/// A period in whole seconds that must be at least 1.
fn parse_seconds(name: &str, value: Option<String>, default: Duration) -> Duration {
    match parse_var(name, value, default.as_secs()) {
        0 => {
            warn!("🪛️ {name} must be at least 1 second. Using the default, {default:?}, instead.");
            default
        },
        secs => Duration::from_secs(secs),
    }
}

/// Parses an environment value, falling back to `default` (with a warning) if it is present but invalid.
fn parse_var<T>(name: &str, value: Option<String>, default: T) -> T
where
    T: FromStr + Display,
    T::Err: Display,
{
    let Some(s) = value else {
        return default;
    };
    s.trim().parse::<T>().unwrap_or_else(|e| {
        warn!("🪛️ {s} is not a valid value for {name}. {e} Using the default, {default}, instead.");
        default
    })
}
