//! Shared error handling for API endpoints.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use tracing::error;

use crate::auth::Identity;
use crate::db::{StoreError, StoreUnavailable};

/// Extension trait for concise error mapping on store results.
pub trait ResultExt<T> {
    fn store_err(self, msg: &str) -> Result<T, ApiError>;
}

impl<T> ResultExt<T> for Result<T, StoreError> {
    fn store_err(self, msg: &str) -> Result<T, ApiError> {
        self.map_err(|e| ApiError::store_error(msg, e))
    }
}

/// API error type with automatic response conversion.
#[derive(Debug)]
pub enum ApiError {
    BadRequest(String),
    /// Authenticated, but not allowed to touch this resource
    AccessDenied(String),
    NotFound(String),
    ServiceUnavailable(String),
    Internal(String),
}

impl ApiError {
    pub fn bad_request(msg: impl Into<String>) -> Self {
        Self::BadRequest(msg.into())
    }

    pub fn access_denied() -> Self {
        Self::AccessDenied("Forbidden Access".into())
    }

    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }

    pub fn store_error(context: &str, e: StoreError) -> Self {
        match e {
            StoreError::InvalidField(field) => {
                Self::BadRequest(format!("Invalid field name: {}", field))
            }
            e => {
                error!("{}: {}", context, e);
                Self::Internal("Database error".into())
            }
        }
    }
}

impl From<StoreUnavailable> for ApiError {
    fn from(_: StoreUnavailable) -> Self {
        Self::ServiceUnavailable("Service Unavailable".into())
    }
}

#[derive(Serialize)]
struct ErrorResponse {
    message: String,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            ApiError::AccessDenied(msg) => (StatusCode::FORBIDDEN, msg),
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            ApiError::ServiceUnavailable(msg) => (StatusCode::SERVICE_UNAVAILABLE, msg),
            ApiError::Internal(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg),
        };
        (status, Json(ErrorResponse { message })).into_response()
    }
}

/// The caller's email, required by every owner-scoped route.
/// Identities without one cannot own anything.
pub fn identity_email(identity: &Identity) -> Result<&str, ApiError> {
    identity.email().ok_or_else(ApiError::access_denied)
}

/// Fail with `AccessDenied` unless `owner` is the caller's email.
pub fn ensure_owner(identity: &Identity, owner: Option<&str>) -> Result<(), ApiError> {
    let email = identity_email(identity)?;
    if owner == Some(email) {
        Ok(())
    } else {
        Err(ApiError::access_denied())
    }
}
