//! Client error types.

use aem_auth::AuthError;
use thiserror::Error;

/// Client error type.
#[derive(Debug, Error)]
pub enum Error {
    /// A required setting is absent.
    #[error("Configuration error: {0}")]
    Config(String),

    /// The identity endpoint rejected the token exchange.
    #[error("Authentication failed ({status}): {body}")]
    UpstreamAuth {
        /// HTTP status from the identity endpoint.
        status: u16,
        /// Raw response body.
        body: String,
    },

    /// AEM answered with a non-success status.
    #[error("AEM request failed: {status} {status_text}: {body}")]
    UpstreamRequest {
        /// HTTP status code.
        status: u16,
        /// Canonical reason phrase.
        status_text: String,
        /// Raw response body.
        body: String,
    },

    /// The request did not complete within the configured timeout.
    #[error("AEM request timed out: {0}")]
    Timeout(String),

    /// Connection-level failure.
    #[error("Network error: {0}")]
    Network(String),

    /// URL parsing failed.
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    /// A repository path that cannot be mapped onto a URL.
    #[error("Invalid repository path: {0}")]
    InvalidPath(String),

    /// A response body could not be decoded.
    #[error("Invalid response: {0}")]
    InvalidResponse(String),
}

impl Error {
    /// Check if this is a configuration error.
    pub fn is_config(&self) -> bool {
        matches!(self, Error::Config(_))
    }

    /// Check if this is a failed AEM request (non-success status or timeout).
    pub fn is_upstream_request(&self) -> bool {
        matches!(self, Error::UpstreamRequest { .. } | Error::Timeout(_))
    }

    /// Check if the identity endpoint rejected us.
    pub fn is_auth_error(&self) -> bool {
        matches!(self, Error::UpstreamAuth { .. })
    }

    /// The HTTP status carried by the error, if any.
    pub fn status(&self) -> Option<u16> {
        match self {
            Error::UpstreamRequest { status, .. } | Error::UpstreamAuth { status, .. } => {
                Some(*status)
            }
            _ => None,
        }
    }
}

impl From<reqwest::Error> for Error {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            Error::Timeout(e.to_string())
        } else {
            Error::Network(e.to_string())
        }
    }
}

impl From<AuthError> for Error {
    fn from(e: AuthError) -> Self {
        match e {
            AuthError::Config(msg) => Error::Config(msg),
            AuthError::Exchange { status, body } => Error::UpstreamAuth { status, body },
            AuthError::Network(msg) => Error::Network(msg),
            AuthError::Serialization(msg) => Error::InvalidResponse(msg),
        }
    }
}

/// Result type for client operations.
pub type Result<T> = std::result::Result<T, Error>;
