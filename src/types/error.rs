//! Error types for Gatehouse
//!
//! Every failure an operation can produce maps to exactly one variant here.
//! The database, hashing, token and config variants are all reported to
//! callers as a generic internal error; their detail only reaches the log.

use hyper::StatusCode;
use serde::Serialize;

/// Message returned to callers for any internal fault
pub const INTERNAL_MESSAGE: &str = "Internal server error";

/// A single rejected input field
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldError {
    pub field: String,
    pub message: String,
}

impl FieldError {
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

fn join_fields(errors: &[FieldError]) -> String {
    errors
        .iter()
        .map(|e| format!("{}: {}", e.field, e.message))
        .collect::<Vec<_>>()
        .join(", ")
}

/// Main error type for Gatehouse operations
#[derive(Debug, thiserror::Error)]
pub enum GatehouseError {
    #[error("Invalid input: {}", join_fields(.0))]
    InvalidInput(Vec<FieldError>),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Hashing error: {0}")]
    Hashing(String),

    #[error("Token error: {0}")]
    Token(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("HTTP error: {0}")]
    Http(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl GatehouseError {
    /// Shorthand for a single-field validation failure
    pub fn invalid(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidInput(vec![FieldError::new(field, message)])
    }

    /// Convert error to HTTP status code
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::InvalidInput(_) => StatusCode::BAD_REQUEST,
            Self::Conflict(_) => StatusCode::CONFLICT,
            Self::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Http(_) => StatusCode::BAD_REQUEST,
            Self::Database(_)
            | Self::Hashing(_)
            | Self::Token(_)
            | Self::Config(_)
            | Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Whether this error belongs to the opaque internal class
    pub fn is_internal(&self) -> bool {
        matches!(
            self,
            Self::Database(_) | Self::Hashing(_) | Self::Token(_) | Self::Config(_) | Self::Internal(_)
        )
    }

    /// Stable machine-readable code for response bodies
    pub fn code(&self) -> &'static str {
        match self {
            Self::InvalidInput(_) => "INVALID_INPUT",
            Self::Conflict(_) => "USER_EXISTS",
            Self::Unauthorized(_) => "INVALID_CREDENTIALS",
            Self::NotFound(_) => "NOT_FOUND",
            Self::Http(_) => "BAD_REQUEST",
            _ => "INTERNAL_ERROR",
        }
    }

    /// Message safe to show to callers
    pub fn public_message(&self) -> String {
        match self {
            Self::InvalidInput(_) => "Invalid input".to_string(),
            Self::Conflict(msg)
            | Self::Unauthorized(msg)
            | Self::NotFound(msg)
            | Self::Http(msg) => msg.clone(),
            _ => INTERNAL_MESSAGE.to_string(),
        }
    }

    /// Field-level detail for validation failures
    pub fn field_errors(&self) -> Option<&[FieldError]> {
        match self {
            Self::InvalidInput(errors) => Some(errors),
            _ => None,
        }
    }
}

impl From<std::io::Error> for GatehouseError {
    fn from(err: std::io::Error) -> Self {
        Self::Internal(err.to_string())
    }
}

impl From<serde_json::Error> for GatehouseError {
    fn from(err: serde_json::Error) -> Self {
        Self::Http(format!("Invalid JSON: {}", err))
    }
}

impl From<hyper::Error> for GatehouseError {
    fn from(err: hyper::Error) -> Self {
        Self::Http(format!("Failed to read body: {}", err))
    }
}

impl From<mongodb::error::Error> for GatehouseError {
    fn from(err: mongodb::error::Error) -> Self {
        Self::Database(err.to_string())
    }
}

impl From<jsonwebtoken::errors::Error> for GatehouseError {
    fn from(err: jsonwebtoken::errors::Error) -> Self {
        Self::Token(err.to_string())
    }
}

impl From<tokio::task::JoinError> for GatehouseError {
    fn from(err: tokio::task::JoinError) -> Self {
        Self::Internal(format!("Blocking task failed: {}", err))
    }
}

/// Result type alias for Gatehouse operations
pub type Result<T> = std::result::Result<T, GatehouseError>;
