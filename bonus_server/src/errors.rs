use actix_web::{
    error::ResponseError,
    http::{header::ContentType, StatusCode},
    HttpResponse,
};
use bonus_engine::LedgerError;
use log::error;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ServerError {
    #[error("Could not initialize server. {0}")]
    InitializeError(String),
    #[error("An error occurred on the backend of the server. {0}")]
    BackendError(String),
    #[error("Could not read request body: {0}")]
    InvalidRequestBody(String),
    #[error("An I/O error happened in the server. {0}")]
    IOError(#[from] std::io::Error),
    #[error("UnspecifiedError. {0}")]
    Unspecified(String),
    #[error("Authentication Error. {0}")]
    AuthenticationError(#[from] AuthError),
    #[error("Invalid order number. {0}")]
    InvalidOrderNumber(String),
    #[error("Order {0} was already uploaded by another user.")]
    OrderConflict(String),
    #[error("Insufficient funds. {0}")]
    InsufficientFunds(String),
    #[error("Invalid amount. {0}")]
    InvalidAmount(String),
}

impl ResponseError for ServerError {
    fn status_code(&self) -> StatusCode {
        match self {
            Self::InvalidRequestBody(_) => StatusCode::BAD_REQUEST,
            Self::AuthenticationError(_) => StatusCode::UNAUTHORIZED,
            Self::InvalidOrderNumber(_) => StatusCode::UNPROCESSABLE_ENTITY,
            Self::InvalidAmount(_) => StatusCode::UNPROCESSABLE_ENTITY,
            Self::OrderConflict(_) => StatusCode::CONFLICT,
            Self::InsufficientFunds(_) => StatusCode::PAYMENT_REQUIRED,
            Self::InitializeError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::BackendError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::IOError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::Unspecified(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        HttpResponse::build(self.status_code())
            .insert_header(ContentType::json())
            .body(serde_json::json!({ "error": self.to_string() }).to_string())
    }
}

#[derive(Debug, Clone, Error)]
pub enum AuthError {
    #[error("The X-User-Id header is missing.")]
    MissingUserId,
    #[error("The X-User-Id header does not hold a valid user id. {0}")]
    InvalidUserId(String),
}

impl From<LedgerError> for ServerError {
    fn from(e: LedgerError) -> Self {
        match e {
            LedgerError::InvalidOrderNumber(e) => Self::InvalidOrderNumber(e.to_string()),
            LedgerError::OrderConflict(id) => Self::OrderConflict(id.to_string()),
            e @ LedgerError::InsufficientFunds { .. } => Self::InsufficientFunds(e.to_string()),
            LedgerError::InvalidAmount(amount) => {
                Self::InvalidAmount(format!("{amount} is not a positive amount with at most two decimal places"))
            },
            e => {
                error!("💻️ Backend error. {e}");
                Self::BackendError(e.to_string())
            },
        }
    }
}
