//! The outbound HTTP stack used to reach the accrual service.
//!
//! Every layer implements [`HttpTransport`], so layers can be stacked freely. The production stack is
//! `RetryTransport<LoggingTransport<reqwest::Client>>`: each physical attempt is logged, and retries happen above it.
use std::time::Instant;

use log::*;
use reqwest::{Client, Request, Response};

use crate::TransportError;

/// A single request/response exchange.
#[allow(async_fn_in_trait)]
pub trait HttpTransport {
    async fn send(&self, request: Request) -> Result<Response, TransportError>;
}

impl HttpTransport for Client {
    async fn send(&self, request: Request) -> Result<Response, TransportError> {
        let response = self.execute(request).await?;
        Ok(response)
    }
}

/// Logs the method, URL, status and round-trip time of every request passing through it.
#[derive(Debug, Clone)]
pub struct LoggingTransport<T> {
    inner: T,
}

impl<T> LoggingTransport<T> {
    pub fn new(inner: T) -> Self {
        Self { inner }
    }
}

impl<T: HttpTransport> HttpTransport for LoggingTransport<T> {
    async fn send(&self, request: Request) -> Result<Response, TransportError> {
        let method = request.method().clone();
        let url = request.url().to_string();
        debug!("🌐️ {method} {url}");
        let start = Instant::now();
        match self.inner.send(request).await {
            Ok(response) => {
                let elapsed = start.elapsed().as_millis();
                debug!("🌐️ {method} {url} -> {} ({elapsed} ms)", response.status());
                Ok(response)
            },
            Err(e) => {
                warn!("🌐️ {method} {url} failed. {e}");
                Err(e)
            },
        }
    }
}
