//! Request identity.
//!
//! The server sits behind an authenticating gateway. The gateway checks the caller's credentials and forwards the
//! numeric user id in the `X-User-Id` header. Handlers that need a user take an [`AuthenticatedUser`] argument, and
//! the request is rejected with `401 Unauthorized` if the header is missing or malformed.
use std::future::{ready, Ready};

use actix_web::{dev::Payload, FromRequest, HttpRequest};
use log::debug;

use crate::errors::{AuthError, ServerError};

pub const USER_ID_HEADER: &str = "X-User-Id";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AuthenticatedUser {
    pub user_id: i64,
}

impl AuthenticatedUser {
    pub fn from_request_headers(req: &HttpRequest) -> Result<Self, AuthError> {
        let value = req.headers().get(USER_ID_HEADER).ok_or(AuthError::MissingUserId)?;
        let value = value.to_str().map_err(|e| AuthError::InvalidUserId(e.to_string()))?;
        let user_id = value.trim().parse::<i64>().map_err(|e| AuthError::InvalidUserId(format!("{value}: {e}")))?;
        if user_id <= 0 {
            return Err(AuthError::InvalidUserId(format!("{user_id} is not a positive id")));
        }
        Ok(Self { user_id })
    }
}

impl FromRequest for AuthenticatedUser {
    type Error = ServerError;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
        let result = Self::from_request_headers(req).map_err(|e| {
            debug!("💻️ Rejecting unauthenticated request to {}. {e}", req.path());
            ServerError::from(e)
        });
        ready(result)
    }
}
