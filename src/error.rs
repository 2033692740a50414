//! Error taxonomy for microblog operations.

use std::time::Duration;

use thiserror::Error;

/// Errors produced by the client and facades.
#[derive(Error, Debug)]
pub enum Error {
    /// HTTP transport failure.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Response body failed to decode.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Response decoded but was semantically malformed.
    #[error("invalid response: {0}")]
    InvalidResponse(String),

    /// OAuth signature generation failed.
    #[error("OAuth error: {0}")]
    OAuth(String),

    /// The credentials were rejected (HTTP 401).
    #[error("invalid credentials: {0}")]
    InvalidCredentials(String),

    /// The authenticated user may not perform this action (HTTP 403).
    #[error("permission denied: {0}")]
    PermissionDenied(String),

    /// The requested resource does not exist (HTTP 404).
    #[error("not found: {0}")]
    NotFound(String),

    /// The request was malformed (HTTP 400).
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// The API quota is exhausted (HTTP 429).
    #[error("quota exceeded, retry after {retry_after} seconds")]
    QuotaExceeded { retry_after: u64 },

    /// The service returned an unexpected error.
    #[error("service error {status}: {message}")]
    Service { status: u16, message: String },

    /// Configuration error.
    #[error("configuration error: {0}")]
    Config(String),
}

impl Error {
    /// Map an API status code and message to the error taxonomy.
    #[must_use]
    pub fn from_status(status: u16, message: String, retry_after: Option<u64>) -> Self {
        match status {
            400 => Self::InvalidRequest(message),
            401 => Self::InvalidCredentials(message),
            403 => Self::PermissionDenied(message),
            404 => Self::NotFound(message),
            429 => Self::QuotaExceeded {
                retry_after: retry_after.unwrap_or(60),
            },
            _ => Self::Service { status, message },
        }
    }

    /// Check if this error is worth retrying.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        match self {
            Self::Http(_) | Self::QuotaExceeded { .. } => true,
            Self::Service { status, .. } => *status >= 500,
            _ => false,
        }
    }

    /// Get the suggested retry delay, if the server provided one.
    #[must_use]
    pub const fn retry_after(&self) -> Option<Duration> {
        match self {
            Self::QuotaExceeded { retry_after } => Some(Duration::from_secs(*retry_after)),
            _ => None,
        }
    }
}

/// Result type for microblog operations.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        assert!(matches!(
            Error::from_status(400, "bad".into(), None),
            Error::InvalidRequest(_)
        ));
        assert!(matches!(
            Error::from_status(401, "nope".into(), None),
            Error::InvalidCredentials(_)
        ));
        assert!(matches!(
            Error::from_status(403, "nope".into(), None),
            Error::PermissionDenied(_)
        ));
        assert!(matches!(
            Error::from_status(404, "gone".into(), None),
            Error::NotFound(_)
        ));
        assert!(matches!(
            Error::from_status(429, "slow down".into(), Some(30)),
            Error::QuotaExceeded { retry_after: 30 }
        ));
        assert!(matches!(
            Error::from_status(503, "down".into(), None),
            Error::Service { status: 503, .. }
        ));
    }

    #[test]
    fn test_quota_default_retry_after() {
        let err = Error::from_status(429, "slow down".into(), None);
        assert_eq!(err.retry_after(), Some(Duration::from_secs(60)));
    }

    #[test]
    fn test_retryable() {
        assert!(Error::QuotaExceeded { retry_after: 1 }.is_retryable());
        assert!(
            Error::Service {
                status: 500,
                message: String::new()
            }
            .is_retryable()
        );
        assert!(
            !Error::Service {
                status: 422,
                message: String::new()
            }
            .is_retryable()
        );
        assert!(!Error::NotFound("x".into()).is_retryable());
        assert!(!Error::InvalidCredentials("x".into()).is_retryable());
    }
}
