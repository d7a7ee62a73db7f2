//! Client for the external accrual calculation service.
//!
//! The accrual service decides how many bonus points a purchase earns. [`AccrualApi`] queries it one order at a time
//! over a layered [`HttpTransport`] stack: [`LoggingTransport`] records each physical attempt and [`RetryTransport`]
//! replays requests that hit rate limits or temporary server errors.
mod api;
mod config;
mod data_objects;
mod error;
mod retry;
mod transport;

pub use api::{AccrualApi, DefaultTransport};
pub use config::{AccrualConfig, DEFAULT_ACCRUAL_TIMEOUT, DEFAULT_ACCRUAL_URL};
pub use data_objects::{AccrualOrder, AccrualStatus};
pub use error::{AccrualApiError, TransportError};
pub use retry::{is_retryable, retry_after, HttpRetryPolicy, RetryTransport, RETRYABLE_STATUSES};
pub use transport::{HttpTransport, LoggingTransport};
