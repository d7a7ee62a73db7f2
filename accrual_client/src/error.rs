use thiserror::Error;

/// Failures of the HTTP transport stack, below the level of the accrual service's own semantics.
#[derive(Debug, Clone, Error)]
pub enum TransportError {
    #[error("Could not send request: {0}")]
    RequestFailed(String),
    #[error("Request timed out: {0}")]
    Timeout(String),
    #[error("Gave up after {attempts} attempts. Last status was {status}")]
    RetriesExhausted { attempts: usize, status: u16 },
}

impl From<reqwest::Error> for TransportError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            TransportError::Timeout(e.to_string())
        } else {
            TransportError::RequestFailed(e.to_string())
        }
    }
}

#[derive(Debug, Clone, Error)]
pub enum AccrualApiError {
    #[error("Could not initialize client: {0}")]
    Initialization(String),
    #[error("Invalid REST request: {0}")]
    RestRequestError(String),
    #[error("Transport error: {0}")]
    Transport(#[from] TransportError),
    #[error("Could not deserialize JSON: {0}")]
    JsonError(String),
    #[error("Query failed. Error {status}. {message}")]
    QueryError { status: u16, message: String },
}
