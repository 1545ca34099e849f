//! API error type with IntoResponse
//!
//! Every failure leaves a handler as `{"message": ...}`. The debug rendering
//! of the error rides along in the response extensions so the server can add
//! a `stack` field outside production.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;

use crate::auth::GateError;
use crate::models::ValidationError;
use crate::policy::PolicyError;
use crate::store::StoreError;
use crate::uploads::UploadError;

const INTERNAL_MESSAGE: &str = "Internal server error";

/// API error type with automatic HTTP status mapping
#[derive(Debug)]
pub enum ApiError {
    /// Validation failed (400)
    Validation(ValidationError),

    /// Request body or query could not be read (400)
    BadRequest(String),

    /// Missing, malformed or expired credentials (401)
    Unauthorized(String),

    /// Authenticated but the role is not allowed (403)
    Forbidden(String),

    /// Resource absent or not visible to the caller (404)
    NotFound(String),

    /// Resource is in the wrong state for the operation (400)
    InvalidState(String),

    /// Uniqueness violation (409)
    Conflict,

    /// Malformed identifier (400)
    InvalidIdentifier,

    /// Rejected or failed document upload (400, or 500 on disk failure)
    Upload(UploadError),

    /// Storage failure (500, logged)
    Store(StoreError),

    /// Internal error (500, logged)
    Internal { message: String },
}

/// Debug detail of the error that produced a response
#[derive(Debug, Clone)]
pub struct ErrorDetail {
    pub message: String,
    pub stack: String,
}

impl ApiError {
    pub fn route_not_found() -> Self {
        Self::NotFound("Route not found".into())
    }

    pub fn status(&self) -> StatusCode {
        match self {
            Self::Validation(_)
            | Self::BadRequest(_)
            | Self::InvalidState(_)
            | Self::InvalidIdentifier => StatusCode::BAD_REQUEST,
            Self::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            Self::Forbidden(_) => StatusCode::FORBIDDEN,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Conflict => StatusCode::CONFLICT,
            Self::Upload(e) if e.is_client_error() => StatusCode::BAD_REQUEST,
            Self::Upload(_) | Self::Store(_) | Self::Internal { .. } => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    fn message(&self) -> String {
        match self {
            Self::Validation(e) => e.to_string(),
            Self::BadRequest(m)
            | Self::Unauthorized(m)
            | Self::Forbidden(m)
            | Self::NotFound(m)
            | Self::InvalidState(m) => m.clone(),
            Self::Conflict => "Resource already exists".into(),
            Self::InvalidIdentifier => "Invalid identifier format".into(),
            Self::Upload(e) if e.is_client_error() => e.to_string(),
            Self::Upload(_) | Self::Store(_) | Self::Internal { .. } => INTERNAL_MESSAGE.into(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = self.message();

        if status.is_server_error() {
            // Log the actual error, return generic message
            tracing::error!(error = ?self, "request failed");
        }

        let detail = ErrorDetail {
            message: message.clone(),
            stack: format!("{:?}", self),
        };
        let mut response = (status, Json(json!({ "message": message }))).into_response();
        response.extensions_mut().insert(detail);
        response
    }
}

impl From<ValidationError> for ApiError {
    fn from(e: ValidationError) -> Self {
        Self::Validation(e)
    }
}

impl From<GateError> for ApiError {
    fn from(e: GateError) -> Self {
        match e {
            GateError::MissingToken | GateError::InvalidToken => Self::Unauthorized(e.to_string()),
            GateError::Forbidden => Self::Forbidden(e.to_string()),
        }
    }
}

impl From<UploadError> for ApiError {
    fn from(e: UploadError) -> Self {
        Self::Upload(e)
    }
}

impl From<PolicyError> for ApiError {
    fn from(e: PolicyError) -> Self {
        match e {
            PolicyError::Validation(v) => Self::Validation(v),
            PolicyError::Unauthorized(m) => Self::Unauthorized(m.into()),
            e @ PolicyError::NotFound { .. } => Self::NotFound(e.to_string()),
            PolicyError::InvalidState(m) => Self::InvalidState(m.into()),
            PolicyError::Conflict => Self::Conflict,
            PolicyError::InvalidIdentifier => Self::InvalidIdentifier,
            PolicyError::Upload(u) => Self::Upload(u),
            PolicyError::Store(s) => Self::Store(s),
            PolicyError::Internal(message) => Self::Internal { message },
        }
    }
}
