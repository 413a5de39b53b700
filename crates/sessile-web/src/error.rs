//! Error types for the HTTP front end.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};

/// Result type alias for session service operations.
pub type Result<T> = std::result::Result<T, WebError>;

/// Errors surfaced while resolving a request's session.
#[derive(Debug, thiserror::Error)]
pub enum WebError {
    /// The request carried no session cookie.
    #[error("no session cookie '{0}' in request")]
    MissingCookie(String),

    /// The cookie named a session that does not exist (never created,
    /// removed or expired).
    #[error(transparent)]
    Session(#[from] sessile_store::Error),

    /// The configured cookie cannot be written as a `Set-Cookie` header.
    #[error("invalid session cookie: {0}")]
    InvalidCookie(String),
}

impl WebError {
    /// Whether the request should be treated as unauthenticated.
    pub fn is_unauthenticated(&self) -> bool {
        matches!(
            self,
            WebError::MissingCookie(_) | WebError::Session(sessile_store::Error::NotFound(_))
        )
    }
}

impl IntoResponse for WebError {
    fn into_response(self) -> Response {
        let status = match self {
            WebError::InvalidCookie(_) => StatusCode::INTERNAL_SERVER_ERROR,
            WebError::MissingCookie(_) | WebError::Session(_) => StatusCode::UNAUTHORIZED,
        };
        (status, self.to_string()).into_response()
    }
}

/// Errors that can occur while loading configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Failed to read a config file.
    #[error("failed to read config file '{path}': {source}")]
    ReadFile {
        path: String,
        source: std::io::Error,
    },

    /// Failed to parse TOML.
    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    /// A value is out of range.
    #[error("invalid value for '{field}': {reason}")]
    Invalid { field: String, reason: String },
}
