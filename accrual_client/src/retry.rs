use std::time::Duration;

use log::*;
use reqwest::{header::RETRY_AFTER, Request, Response, StatusCode};

use crate::{transport::HttpTransport, TransportError};

/// Statuses that indicate a temporary condition on the remote side.
pub const RETRYABLE_STATUSES: [StatusCode; 6] = [
    StatusCode::REQUEST_TIMEOUT,
    StatusCode::TOO_MANY_REQUESTS,
    StatusCode::INTERNAL_SERVER_ERROR,
    StatusCode::BAD_GATEWAY,
    StatusCode::SERVICE_UNAVAILABLE,
    StatusCode::GATEWAY_TIMEOUT,
];

#[derive(Debug, Clone)]
pub struct HttpRetryPolicy {
    /// Number of retries after the first attempt.
    pub max_retries: usize,
    pub base_delay: Duration,
    pub multiplier: u32,
    pub max_delay: Duration,
}

impl Default for HttpRetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            base_delay: Duration::from_secs(1),
            multiplier: 2,
            max_delay: Duration::from_secs(30),
        }
    }
}

impl HttpRetryPolicy {
    /// The delay before retry number `retry` (zero-based), ignoring any server hint.
    pub fn backoff(&self, retry: usize) -> Duration {
        let factor = u32::try_from(retry).ok().and_then(|r| self.multiplier.checked_pow(r));
        match factor.and_then(|f| self.base_delay.checked_mul(f)) {
            Some(delay) => delay.min(self.max_delay),
            None => self.max_delay,
        }
    }
}

pub fn is_retryable(status: StatusCode) -> bool {
    RETRYABLE_STATUSES.contains(&status)
}

/// Reads an integer `Retry-After` header, in seconds. HTTP-date values are ignored.
pub fn retry_after(response: &Response) -> Option<Duration> {
    response
        .headers()
        .get(RETRY_AFTER)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.trim().parse::<u64>().ok())
        .map(Duration::from_secs)
}

/// Resends a request when the server answers with one of the [`RETRYABLE_STATUSES`].
///
/// The request must have a buffered body (or none) so that it can be replayed byte for byte. Responses with any
/// other status, including client errors, are handed back untouched. Transport failures are not retried here.
#[derive(Debug, Clone)]
pub struct RetryTransport<T> {
    inner: T,
    policy: HttpRetryPolicy,
}

impl<T> RetryTransport<T> {
    pub fn new(inner: T, policy: HttpRetryPolicy) -> Self {
        Self { inner, policy }
    }

    pub fn policy(&self) -> &HttpRetryPolicy {
        &self.policy
    }
}

impl<T: HttpTransport> HttpTransport for RetryTransport<T> {
    async fn send(&self, request: Request) -> Result<Response, TransportError> {
        let mut retry = 0;
        loop {
            let attempt = match request.try_clone() {
                Some(r) => r,
                None => {
                    warn!("🌐️ Request body for {} is a stream and cannot be replayed. Sending once.", request.url());
                    return self.inner.send(request).await;
                },
            };
            let response = self.inner.send(attempt).await?;
            let status = response.status();
            if !is_retryable(status) {
                return Ok(response);
            }
            if retry >= self.policy.max_retries {
                warn!("🌐️ {} still answering {status} after {} attempts. Giving up.", request.url(), retry + 1);
                return Err(TransportError::RetriesExhausted { attempts: retry + 1, status: status.as_u16() });
            }
            let delay = retry_after(&response).unwrap_or_else(|| self.policy.backoff(retry));
            // Drain the body so the connection can go back to the pool
            if let Err(e) = response.bytes().await {
                debug!("🌐️ Could not drain response body. {e}");
            }
            retry += 1;
            info!("🌐️ {status} from {}. Retry {retry}/{} in {delay:?}", request.url(), self.policy.max_retries);
            tokio::time::sleep(delay).await;
        }
    }
}
