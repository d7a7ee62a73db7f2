use std::time::Duration;

use log::*;

use crate::retry::HttpRetryPolicy;

pub const DEFAULT_ACCRUAL_URL: &str = "http://127.0.0.1:8080";
pub const DEFAULT_ACCRUAL_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, Clone)]
pub struct AccrualConfig {
    /// Base URL of the accrual service, without a trailing slash.
    pub base_url: String,
    /// Per-attempt request timeout.
    pub timeout: Duration,
    pub retry: HttpRetryPolicy,
}

impl Default for AccrualConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_ACCRUAL_URL.to_string(),
            timeout: DEFAULT_ACCRUAL_TIMEOUT,
            retry: HttpRetryPolicy::default(),
        }
    }
}

impl AccrualConfig {
    pub fn new(base_url: &str) -> Self {
        Self { base_url: base_url.trim_end_matches('/').to_string(), ..Default::default() }
    }

    pub fn new_from_env_or_default() -> Self {
        let defaults = Self::default();
        let base_url = std::env::var("BONUS_ACCRUAL_URL")
            .map(|s| s.trim_end_matches('/').to_string())
            .unwrap_or_else(|_| {
                warn!("🪛️ BONUS_ACCRUAL_URL not set, using {DEFAULT_ACCRUAL_URL} as default");
                defaults.base_url.clone()
            });
        let timeout = env_number("BONUS_ACCRUAL_TIMEOUT").map(Duration::from_secs).unwrap_or(defaults.timeout);
        let max_retries = env_number("BONUS_ACCRUAL_MAX_RETRIES")
            .and_then(|n| usize::try_from(n).ok())
            .unwrap_or(defaults.retry.max_retries);
        let base_delay =
            env_number("BONUS_ACCRUAL_BACKOFF_MS").map(Duration::from_millis).unwrap_or(defaults.retry.base_delay);
        let retry = HttpRetryPolicy { max_retries, base_delay, ..defaults.retry };
        Self { base_url, timeout, retry }
    }
}

fn env_number(name: &str) -> Option<u64> {
    let value = std::env::var(name).ok()?;
    match value.trim().parse::<u64>() {
        Ok(n) => Some(n),
        Err(e) => {
            warn!("🪛️ {name} is not a valid number ({value}). {e}. Using the default.");
            None
        },
    }
}
