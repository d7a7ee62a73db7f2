use log::*;
use reqwest::{Client, Method, StatusCode};

use bonus_common::OrderNumber;

use crate::{
    config::AccrualConfig,
    retry::RetryTransport,
    transport::{HttpTransport, LoggingTransport},
    AccrualApiError,
    AccrualOrder,
};

/// The transport stack used in production.
pub type DefaultTransport = RetryTransport<LoggingTransport<Client>>;

/// Client for the accrual calculation service.
///
/// The client only understands the service's semantics (which status codes mean what). Resilience concerns live in
/// the transport it is built on.
#[derive(Clone)]
pub struct AccrualApi<T = DefaultTransport> {
    base_url: String,
    // Used to build requests only. Sending goes through `transport`.
    builder: Client,
    transport: T,
}

impl<T> std::fmt::Debug for AccrualApi<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "AccrualApi ({})", self.base_url)
    }
}

impl AccrualApi<DefaultTransport> {
    pub fn new(config: AccrualConfig) -> Result<Self, AccrualApiError> {
        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| AccrualApiError::Initialization(e.to_string()))?;
        let transport = RetryTransport::new(LoggingTransport::new(client.clone()), config.retry.clone());
        let base_url = config.base_url.trim_end_matches('/').to_string();
        Ok(Self { base_url, builder: client, transport })
    }
}

impl<T: HttpTransport> AccrualApi<T> {
    pub fn with_transport(base_url: &str, transport: T) -> Self {
        Self { base_url: base_url.trim_end_matches('/').to_string(), builder: Client::new(), transport }
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }

    /// Fetches the accrual state of an order.
    ///
    /// Returns `Ok(None)` when the service does not know the order yet (`204 No Content`).
    pub async fn get_order(&self, number: &OrderNumber) -> Result<Option<AccrualOrder>, AccrualApiError> {
        let url = self.url(&format!("/api/order/{number}"));
        trace!("🌐️ Fetching accrual for order {number}");
        let request = self
            .builder
            .request(Method::GET, url)
            .build()
            .map_err(|e| AccrualApiError::RestRequestError(e.to_string()))?;
        let response = self.transport.send(request).await?;
        match response.status() {
            StatusCode::OK => {
                let order =
                    response.json::<AccrualOrder>().await.map_err(|e| AccrualApiError::JsonError(e.to_string()))?;
                if &order.order != number {
                    warn!("🌐️ Accrual service answered for order {} when asked about {number}", order.order);
                }
                debug!("🌐️ Order {number} is {} with accrual {:?}", order.status, order.accrual);
                Ok(Some(order))
            },
            StatusCode::NO_CONTENT => {
                debug!("🌐️ Order {number} is not registered with the accrual service yet");
                Ok(None)
            },
            status => {
                let message = response.text().await.unwrap_or_default();
                Err(AccrualApiError::QueryError { status: status.as_u16(), message })
            },
        }
    }
}
