//! Application error types and result alias.

use axum::{
    http::{header::RETRY_AFTER, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

/// Application result type alias
pub type Result<T> = std::result::Result<T, AppError>;

/// Why a request could not be tied to a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenProblem {
    /// No bearer credential was supplied
    Missing,
    /// A credential was supplied but is malformed, forged or expired
    Invalid,
}

impl std::fmt::Display for TokenProblem {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TokenProblem::Missing => write!(f, "Authentication token not provided"),
            TokenProblem::Invalid => write!(f, "Invalid or expired token"),
        }
    }
}

/// Application error types
#[derive(Error, Debug)]
pub enum AppError {
    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Database error
    #[error("Database error: {0}")]
    Database(String),

    /// Migration error
    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    /// Missing or invalid session
    #[error("{0}")]
    Unauthenticated(TokenProblem),

    /// Login failed. Deliberately says nothing about which half was wrong.
    #[error("Invalid email or password")]
    InvalidCredentials,

    /// Valid session, insufficient permission
    #[error("Access denied: {0}")]
    Forbidden(String),

    /// Role name already taken
    #[error("Role '{0}' already exists")]
    DuplicateName(String),

    /// Role name that does not resolve to a role
    #[error("Unknown role: {0}")]
    UnknownRole(String),

    /// Foreign-key-like field that is not an id or points nowhere
    #[error("Invalid reference: {0}")]
    InvalidReference(String),

    /// Request data failed validation
    #[error("Validation error: {0}")]
    Validation(String),

    /// Conflict with existing data, optionally with the number of blocking rows
    #[error("Conflict: {message}")]
    Conflict { message: String, count: Option<i64> },

    /// Attempt to delete a system role
    #[error("System role '{0}' cannot be deleted")]
    SystemRoleProtected(String),

    /// Attempt to delete a role still assigned to users
    #[error("Role is assigned to {0} user(s) and cannot be deleted")]
    RoleInUse(i64),

    /// Not found error
    #[error("Resource not found: {0}")]
    NotFound(String),

    /// Too many requests from one client
    #[error("Too many requests, retry after {0} seconds")]
    RateLimited(u64),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Address parse error
    #[error("Address parse error: {0}")]
    AddrParse(#[from] std::net::AddrParseError),

    /// Internal server error
    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<sqlx::Error> for AppError {
    fn from(e: sqlx::Error) -> Self {
        AppError::Database(e.to_string())
    }
}

impl AppError {
    /// Shorthand for a conflict without a count.
    pub fn conflict(message: impl Into<String>) -> Self {
        AppError::Conflict {
            message: message.into(),
            count: None,
        }
    }

    /// HTTP status and machine-readable code for this error.
    pub fn status_and_code(&self) -> (StatusCode, &'static str) {
        match self {
            AppError::Config(_) => (StatusCode::INTERNAL_SERVER_ERROR, "CONFIG_ERROR"),
            AppError::Database(_) => (StatusCode::INTERNAL_SERVER_ERROR, "DATABASE_ERROR"),
            AppError::Migration(_) => (StatusCode::INTERNAL_SERVER_ERROR, "MIGRATION_ERROR"),
            AppError::Unauthenticated(TokenProblem::Missing) => {
                (StatusCode::UNAUTHORIZED, "TOKEN_MISSING")
            }
            AppError::Unauthenticated(TokenProblem::Invalid) => {
                (StatusCode::UNAUTHORIZED, "TOKEN_INVALID")
            }
            AppError::InvalidCredentials => (StatusCode::UNAUTHORIZED, "INVALID_CREDENTIALS"),
            AppError::Forbidden(_) => (StatusCode::FORBIDDEN, "FORBIDDEN"),
            AppError::DuplicateName(_) => (StatusCode::CONFLICT, "DUPLICATE_NAME"),
            AppError::UnknownRole(_) => (StatusCode::BAD_REQUEST, "UNKNOWN_ROLE"),
            AppError::InvalidReference(_) => (StatusCode::BAD_REQUEST, "INVALID_REFERENCE"),
            AppError::Validation(_) => (StatusCode::BAD_REQUEST, "VALIDATION_ERROR"),
            AppError::Conflict { .. } => (StatusCode::CONFLICT, "CONFLICT"),
            AppError::SystemRoleProtected(_) => (StatusCode::CONFLICT, "SYSTEM_ROLE_PROTECTED"),
            AppError::RoleInUse(_) => (StatusCode::CONFLICT, "ROLE_IN_USE"),
            AppError::NotFound(_) => (StatusCode::NOT_FOUND, "NOT_FOUND"),
            AppError::RateLimited(_) => (StatusCode::TOO_MANY_REQUESTS, "RATE_LIMITED"),
            AppError::Io(_) => (StatusCode::INTERNAL_SERVER_ERROR, "IO_ERROR"),
            AppError::AddrParse(_) => (StatusCode::INTERNAL_SERVER_ERROR, "ADDR_PARSE_ERROR"),
            AppError::Internal(_) => (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR"),
        }
    }

    fn is_internal(&self) -> bool {
        matches!(
            self,
            AppError::Config(_)
                | AppError::Database(_)
                | AppError::Migration(_)
                | AppError::Io(_)
                | AppError::AddrParse(_)
                | AppError::Internal(_)
        )
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code) = self.status_and_code();

        // Storage and infrastructure details stay in the server log.
        let message = if self.is_internal() {
            tracing::error!(error = %self, code = code, "Request error");
            "Internal server error".to_string()
        } else {
            tracing::debug!(error = %self, code = code, "Request rejected");
            self.to_string()
        };

        let mut body = json!({
            "code": code,
            "message": message,
        });
        match &self {
            AppError::RoleInUse(count) => body["count"] = json!(count),
            AppError::Conflict {
                count: Some(count), ..
            } => body["count"] = json!(count),
            _ => {}
        }

        let mut response = (status, Json(body)).into_response();
        if let AppError::RateLimited(retry_after) = self {
            if let Ok(value) = HeaderValue::from_str(&retry_after.to_string()) {
                response.headers_mut().insert(RETRY_AFTER, value);
            }
        }
        response
    }
}
