//! Error types for Promitto

use hyper::StatusCode;

use crate::level::RitualKind;

/// Main error type for Promitto operations
#[derive(Debug, thiserror::Error)]
pub enum PromittoError {
    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("{0}")]
    Validation(String),

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Not connected to anyone")]
    NotConnected,

    #[error("{0}")]
    NotFound(String),

    #[error("Already completed {0} today")]
    AlreadyCompleted(RitualKind),

    #[error("Concurrent update conflict: {0}")]
    Conflict(String),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Authentication error: {0}")]
    Auth(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl PromittoError {
    /// Convert error to HTTP status code
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::Validation(_) => StatusCode::BAD_REQUEST,
            Self::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            Self::NotConnected => StatusCode::BAD_REQUEST,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::AlreadyCompleted(_) => StatusCode::BAD_REQUEST,
            Self::Conflict(_) => StatusCode::CONFLICT,
            Self::Database(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::Config(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::Auth(_) => StatusCode::UNAUTHORIZED,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Message safe to return to API clients.
    ///
    /// Infrastructure failures collapse to a generic message; the detail is
    /// only logged server-side.
    pub fn public_message(&self) -> String {
        match self {
            Self::AlreadyCompleted(_) => "Already completed this ritual today".to_string(),
            Self::Unauthorized(message) => message.clone(),
            Self::Database(_) | Self::Config(_) | Self::Internal(_) => "Server error".to_string(),
            Self::Conflict(_) => "Connection level was updated concurrently, please retry".to_string(),
            other => other.to_string(),
        }
    }

    /// Whether this error indicates a server-side failure
    pub fn is_server_error(&self) -> bool {
        self.status_code().is_server_error()
    }
}

impl From<std::io::Error> for PromittoError {
    fn from(err: std::io::Error) -> Self {
        Self::Internal(err.to_string())
    }
}

impl From<serde_json::Error> for PromittoError {
    fn from(err: serde_json::Error) -> Self {
        Self::BadRequest(format!("JSON error: {}", err))
    }
}

impl From<mongodb::error::Error> for PromittoError {
    fn from(err: mongodb::error::Error) -> Self {
        Self::Database(err.to_string())
    }
}

impl From<bson::ser::Error> for PromittoError {
    fn from(err: bson::ser::Error) -> Self {
        Self::Database(format!("BSON serialization failed: {}", err))
    }
}

impl From<bson::de::Error> for PromittoError {
    fn from(err: bson::de::Error) -> Self {
        Self::Database(format!("BSON deserialization failed: {}", err))
    }
}

impl From<jsonwebtoken::errors::Error> for PromittoError {
    fn from(err: jsonwebtoken::errors::Error) -> Self {
        Self::Unauthorized(format!("JWT error: {}", err))
    }
}

/// Result type alias for Promitto operations
pub type Result<T> = std::result::Result<T, PromittoError>;
