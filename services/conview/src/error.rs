//! Custom error types for the social service

use axum::{
    Json,
    extract::rejection::{JsonRejection, QueryRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;
use tracing::error;

use crate::repositories::StoreError;

pub const INVALID_CREDENTIALS: &str = "Invalid credentials";

/// Error returned by services and handlers, rendered as the response envelope
#[derive(Error, Debug)]
pub enum ApiError {
    /// Malformed or out-of-bounds input
    #[error("{0}")]
    Validation(String),

    /// Unknown username or wrong password, deliberately indistinguishable
    #[error("Invalid credentials")]
    InvalidCredentials,

    /// Ownership check failed
    #[error("{0}")]
    Forbidden(String),

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    Conflict(String),

    /// Persistence failure; detail is logged, never sent
    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    /// Any other server-side failure; detail is logged, never sent
    #[error("Internal error: {0}")]
    Internal(String),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Validation(_) => StatusCode::BAD_REQUEST,
            ApiError::InvalidCredentials => StatusCode::UNAUTHORIZED,
            ApiError::Forbidden(_) => StatusCode::FORBIDDEN,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Conflict(_) => StatusCode::CONFLICT,
            ApiError::Store(_) | ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn user_not_found() -> Self {
        ApiError::NotFound("User not found".to_string())
    }

    pub fn post_not_found() -> Self {
        ApiError::NotFound("Post not found".to_string())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let message = match &self {
            ApiError::Store(_) | ApiError::Internal(_) => {
                error!("{}", self);
                "Server error".to_string()
            }
            other => other.to_string(),
        };

        let body = Json(json!({
            "success": false,
            "message": message,
        }));

        (self.status(), body).into_response()
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::Validation(format!("Invalid request body: {}", rejection.body_text()))
    }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        ApiError::Validation(format!("Invalid query: {}", rejection.body_text()))
    }
}

/// Type alias for API results
pub type ApiResult<T> = Result<T, ApiError>;
