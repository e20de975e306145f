//! Error types for the directory core.
//!
//! Every variant is terminal for the request that produced it. HTTP handlers
//! turn them into a status code and a short text body; the DNS front end logs
//! them and skips the question.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use thiserror::Error;

/// Result type alias for directory operations
pub type Result<T> = std::result::Result<T, DirectoryError>;

/// Errors produced by the registry, the ownership rule and the resolver
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DirectoryError {
    /// Malformed input (undecodable body, invalid address literal)
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// Passkey mismatch
    #[error("Permission denied")]
    Unauthorized,

    /// Name already claimed by another hardware identity
    #[error("Name occupied: {0}")]
    Conflict(String),

    /// Unknown name on a direct lookup
    #[error("Device not found: {0}")]
    NotFound(String),

    /// Name outside the authoritative suffix
    #[error("Not handling this name: {0}")]
    NotHandled(String),

    /// Query type other than A/AAAA
    #[error("Unsupported record type requested: {0}")]
    UnsupportedType(u16),

    /// Invariant violation
    #[error("Internal error: {0}")]
    Internal(String),
}

impl DirectoryError {
    /// HTTP status for this error
    pub fn status_code(&self) -> StatusCode {
        match self {
            DirectoryError::BadRequest(_) => StatusCode::BAD_REQUEST,
            DirectoryError::Unauthorized => StatusCode::UNAUTHORIZED,
            DirectoryError::Conflict(_) => StatusCode::FORBIDDEN,
            DirectoryError::NotFound(_) | DirectoryError::NotHandled(_) => StatusCode::NOT_FOUND,
            DirectoryError::UnsupportedType(_) => StatusCode::BAD_REQUEST,
            DirectoryError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for DirectoryError {
    fn into_response(self) -> Response {
        (self.status_code(), format!("{}\n", self)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        assert_eq!(
            DirectoryError::BadRequest("x".into()).status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(DirectoryError::Unauthorized.status_code(), StatusCode::UNAUTHORIZED);
        assert_eq!(
            DirectoryError::Conflict("foo".into()).status_code(),
            StatusCode::FORBIDDEN
        );
        assert_eq!(
            DirectoryError::NotFound("foo".into()).status_code(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            DirectoryError::Internal("x".into()).status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_messages() {
        assert_eq!(DirectoryError::Unauthorized.to_string(), "Permission denied");
        assert_eq!(
            DirectoryError::UnsupportedType(16).to_string(),
            "Unsupported record type requested: 16"
        );
    }
}
