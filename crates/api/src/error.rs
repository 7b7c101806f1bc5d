use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use domain::{DomainError, FieldError};
use serde::Serialize;
use thiserror::Error;

use crate::middleware::rate_limit::rate_limited_response;

const DEFAULT_RETRY_AFTER_SECS: u64 = 60;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    /// The resource exists but is not in a state that allows the operation.
    #[error("Invalid state: {0}")]
    InvalidState(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Validation failed on {} field(s)", .0.len())]
    InvalidFields(Vec<ValidationDetail>),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Invalid token")]
    InvalidToken,

    #[error("Token expired")]
    ExpiredToken,

    #[error("Upstream failure: {0}")]
    Upstream(String),

    /// Carries the number of seconds until the next attempt is allowed.
    #[error("Rate limited")]
    RateLimited(u64),

    #[error("Internal error: {0}")]
    Internal(String),

    #[error("Service unavailable: {0}")]
    ServiceUnavailable(String),
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    error: String,
    message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    details: Option<Vec<ValidationDetail>>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ValidationDetail {
    pub field: String,
    pub message: String,
}

impl From<FieldError> for ValidationDetail {
    fn from(e: FieldError) -> Self {
        Self {
            field: e.field,
            message: e.message,
        }
    }
}

fn summarize(details: &[ValidationDetail]) -> String {
    if details.len() == 1 {
        details[0].message.clone()
    } else {
        format!("{} validation errors", details.len())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error_code, message, details) = match self {
            ApiError::Unauthorized(msg) => (StatusCode::UNAUTHORIZED, "unauthorized", msg, None),
            ApiError::Forbidden(msg) => (StatusCode::FORBIDDEN, "forbidden", msg, None),
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, "not_found", msg, None),
            ApiError::Conflict(msg) => (StatusCode::CONFLICT, "conflict", msg, None),
            ApiError::InvalidState(msg) => (StatusCode::BAD_REQUEST, "invalid_state", msg, None),
            ApiError::Validation(msg) => (StatusCode::BAD_REQUEST, "validation_error", msg, None),
            ApiError::InvalidFields(details) => (
                StatusCode::BAD_REQUEST,
                "validation_error",
                summarize(&details),
                Some(details),
            ),
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, "bad_request", msg, None),
            ApiError::InvalidToken => (
                StatusCode::BAD_REQUEST,
                "invalid_token",
                "Invalid or already used token".into(),
                None,
            ),
            ApiError::ExpiredToken => (
                StatusCode::BAD_REQUEST,
                "token_expired",
                "Token has expired".into(),
                None,
            ),
            ApiError::Upstream(msg) => {
                tracing::warn!(error = %msg, "Upstream failure");
                (StatusCode::BAD_REQUEST, "upstream_failure", msg, None)
            }
            ApiError::RateLimited(retry_after) => return rate_limited_response(retry_after),
            ApiError::Internal(msg) => {
                tracing::error!("Internal error: {}", msg);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "internal_error",
                    "An internal error occurred".into(),
                    None,
                )
            }
            ApiError::ServiceUnavailable(msg) => (
                StatusCode::SERVICE_UNAVAILABLE,
                "service_unavailable",
                msg,
                None,
            ),
        };

        let body = ErrorBody {
            error: error_code.into(),
            message,
            details,
        };

        (status, Json(body)).into_response()
    }
}

impl From<DomainError> for ApiError {
    fn from(err: DomainError) -> Self {
        match err {
            DomainError::Unauthorized => ApiError::Unauthorized("Authentication required".into()),
            DomainError::Forbidden => {
                ApiError::Forbidden("You do not have access to this resource".into())
            }
            DomainError::NotFound(entity) => ApiError::NotFound(format!("{} not found", entity)),
            DomainError::InvalidState(msg) => ApiError::InvalidState(msg),
            DomainError::Validation(fields) => {
                ApiError::InvalidFields(fields.into_iter().map(ValidationDetail::from).collect())
            }
            DomainError::Conflict(msg) => ApiError::Conflict(msg),
            DomainError::InvalidToken => ApiError::InvalidToken,
            DomainError::ExpiredToken => ApiError::ExpiredToken,
            DomainError::RateLimited => ApiError::RateLimited(DEFAULT_RETRY_AFTER_SECS),
            DomainError::Upstream(msg) => ApiError::Upstream(msg),
            DomainError::Internal(msg) => ApiError::Internal(msg),
        }
    }
}

impl From<sqlx::Error> for ApiError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::RowNotFound => ApiError::NotFound("Resource not found".into()),
            sqlx::Error::Database(db_err) => {
                if let Some(code) = db_err.code() {
                    match code.as_ref() {
                        "23505" => ApiError::Conflict("Resource already exists".into()),
                        "23503" => ApiError::NotFound("Referenced resource not found".into()),
                        _ => ApiError::Internal(format!("Database error: {}", db_err)),
                    }
                } else {
                    ApiError::Internal(format!("Database error: {}", db_err))
                }
            }
            _ => ApiError::Internal(format!("Database error: {}", err)),
        }
    }
}

impl From<validator::ValidationErrors> for ApiError {
    fn from(errors: validator::ValidationErrors) -> Self {
        ApiError::InvalidFields(
            domain::error::flatten_validation_errors(&errors)
                .into_iter()
                .map(ValidationDetail::from)
                .collect(),
        )
    }
}
