use axum::{
    Json,
    http::{Method, StatusCode},
    response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;

/// AccessError
///
/// Rejections produced by the middleware chain. The two kinds are kept apart so
/// a caller can tell "log in first" from "you are not allowed to do this".
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum AccessError {
    /// No valid identity could be established for the request.
    #[error("authentication required")]
    Unauthenticated,
    /// An identity is present but its role is not permitted on the route.
    #[error("role not permitted for this route")]
    Forbidden,
}

impl AccessError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            AccessError::Unauthenticated => StatusCode::UNAUTHORIZED,
            AccessError::Forbidden => StatusCode::FORBIDDEN,
        }
    }

    pub fn error_code(&self) -> &'static str {
        match self {
            AccessError::Unauthenticated => "UNAUTHENTICATED",
            AccessError::Forbidden => "FORBIDDEN",
        }
    }
}

impl IntoResponse for AccessError {
    fn into_response(self) -> Response {
        error_response(self.status_code(), self.error_code(), &self.to_string())
    }
}

/// RouteConfigError
///
/// Raised while composing the dispatch table. Any of these aborts startup.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RouteConfigError {
    #[error("duplicate route {method} {path} (already declared by the `{first}` table)")]
    DuplicateRoute {
        method: Method,
        path: String,
        first: &'static str,
    },
    #[error("route {method} {path} declares an empty role set")]
    EmptyRoleSet { method: Method, path: String },
    #[error("route {method} {path} has a malformed path: {reason}")]
    MalformedPath {
        method: Method,
        path: String,
        reason: &'static str,
    },
    /// Same segments as an earlier route but different parameter names; the
    /// dispatcher cannot hold both.
    #[error("route {method} {path} names its parameters differently from {existing}")]
    ConflictingParameters {
        method: Method,
        path: String,
        existing: &'static str,
    },
}

/// ConfigError
///
/// Failures while reading the process configuration from the environment.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{0} must be set")]
    Missing(&'static str),
    #[error("{var} has an invalid value `{value}`")]
    Invalid { var: &'static str, value: String },
}

/// TokenError
///
/// Failures while signing an access token.
#[derive(Debug, Error)]
pub enum TokenError {
    #[error("token lifetime of {0} hours is out of range")]
    Lifetime(i64),
    #[error(transparent)]
    Signing(#[from] jsonwebtoken::errors::Error),
}

/// RepositoryError
///
/// Persistence failures surfaced by `Repository` implementations.
#[derive(Debug, Error)]
pub enum RepositoryError {
    /// A uniqueness constraint rejected the write.
    #[error("conflict: {0}")]
    Conflict(String),
    #[error(transparent)]
    Database(#[from] sqlx::Error),
}

/// ApiError
///
/// Errors raised inside handlers. The middleware chain never inspects these;
/// they are rendered as-is at the transport boundary.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ApiError {
    #[error("{0}")]
    BadRequest(String),
    #[error("{0}")]
    Unauthorized(String),
    #[error("{0}")]
    NotFound(String),
    #[error("{0}")]
    Conflict(String),
    #[error("{0}")]
    Internal(String),
}

impl ApiError {
    pub fn bad_request(message: impl Into<String>) -> Self {
        ApiError::BadRequest(message.into())
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        ApiError::Unauthorized(message.into())
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        ApiError::NotFound(message.into())
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        ApiError::Conflict(message.into())
    }

    pub fn internal(message: impl Into<String>) -> Self {
        ApiError::Internal(message.into())
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Conflict(_) => StatusCode::CONFLICT,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn error_code(&self) -> &'static str {
        match self {
            ApiError::BadRequest(_) => "BAD_REQUEST",
            ApiError::Unauthorized(_) => "UNAUTHORIZED",
            ApiError::NotFound(_) => "NOT_FOUND",
            ApiError::Conflict(_) => "CONFLICT",
            ApiError::Internal(_) => "INTERNAL_SERVER_ERROR",
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        error_response(self.status_code(), self.error_code(), &self.to_string())
    }
}

impl From<RepositoryError> for ApiError {
    fn from(err: RepositoryError) -> Self {
        match err {
            RepositoryError::Conflict(msg) => ApiError::conflict(msg),
            RepositoryError::Database(e) => {
                // Don't expose SQL details to clients
                tracing::error!("database error: {:?}", e);
                ApiError::internal("Database error occurred")
            }
        }
    }
}

fn error_response(status: StatusCode, code: &str, message: &str) -> Response {
    let body = json!({
        "error": true,
        "code": code,
        "message": message,
    });
    (status, Json(body)).into_response()
}
