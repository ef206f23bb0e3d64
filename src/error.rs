// Error handling module
// Defines error types shared by the gateway, the session layer and the catalog API

use reqwest::StatusCode;
use thiserror::Error;

/// Maximum length for error response bodies carried in error messages
const MAX_ERROR_BODY_LENGTH: usize = 500;

/// Errors raised by the session storage backends
#[derive(Error, Debug)]
pub enum StorageError {
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serde(#[from] serde_json::Error),
}

/// API errors that can occur while talking to the catalog backend
#[derive(Error, Debug)]
pub enum ApiError {
    /// 401 that the gateway could not (or may not) recover from
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// The session is gone: refresh impossible, rejected or timed out.
    /// The store has already been cleared when this is returned.
    #[error("Session expired: {0}")]
    SessionExpired(String),

    #[error("Access denied: {0}")]
    Forbidden(String),

    #[error("Resource not found: {0}")]
    NotFound(String),

    /// Any other non-success status from the backend
    #[error("Catalog API error: {status} - {message}")]
    BackendError { status: u16, message: String },

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    /// Form validation error
    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl ApiError {
    /// Truncate a response body to avoid logging excessive data
    fn truncate_body(body: &str) -> String {
        if body.len() <= MAX_ERROR_BODY_LENGTH {
            return body.to_string();
        }
        let mut end = MAX_ERROR_BODY_LENGTH;
        while !body.is_char_boundary(end) {
            end -= 1;
        }
        format!("{}... (truncated, {} total bytes)", &body[..end], body.len())
    }

    /// Pull the backend's human-readable message out of an error body.
    /// The backend answers `{"message": ...}` or `{"error": ...}`.
    fn backend_message(body: &str) -> String {
        if let Ok(json) = serde_json::from_str::<serde_json::Value>(body) {
            for key in ["message", "error"] {
                if let Some(msg) = json.get(key).and_then(|v| v.as_str()) {
                    return msg.to_string();
                }
            }
        }
        Self::truncate_body(body)
    }

    /// Map a non-success response status and body to an error
    pub fn from_status(status: StatusCode, body: &str) -> Self {
        let message = Self::backend_message(body);
        match status.as_u16() {
            401 => ApiError::Unauthorized(message),
            403 => ApiError::Forbidden(message),
            404 => ApiError::NotFound(message),
            code => ApiError::BackendError {
                status: code,
                message,
            },
        }
    }

    pub fn is_session_expired(&self) -> bool {
        matches!(self, ApiError::SessionExpired(_))
    }

    /// Message suitable for showing to the person at the terminal
    pub fn user_message(&self) -> String {
        match self {
            ApiError::Unauthorized(msg)
            | ApiError::Forbidden(msg)
            | ApiError::NotFound(msg)
            | ApiError::BackendError { message: msg, .. }
                if !msg.is_empty() =>
            {
                msg.clone()
            }
            ApiError::SessionExpired(_) => "Your session has expired. Please log in again.".to_string(),
            ApiError::ValidationError(msg) => msg.clone(),
            ApiError::Network(_) => "Could not reach the catalog server.".to_string(),
            _ => "Something went wrong!".to_string(),
        }
    }
}

/// Result type alias for API operations
pub type Result<T> = std::result::Result<T, ApiError>;
