//! Error types for credential resolution.

/// Result type alias for this crate.
pub type Result<T> = std::result::Result<T, AuthError>;

/// Errors that can occur while producing an authorization value.
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    /// A required setting is absent.
    #[error("Config error: {0}")]
    Config(String),

    /// The identity endpoint rejected the exchange.
    #[error("Token exchange failed with status {status}: {body}")]
    Exchange { status: u16, body: String },

    /// Network/HTTP error talking to the identity endpoint.
    #[error("Network error: {0}")]
    Network(String),

    /// The identity endpoint answered with something unparsable.
    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl AuthError {
    /// Create a configuration error.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }
}

impl From<reqwest::Error> for AuthError {
    fn from(e: reqwest::Error) -> Self {
        AuthError::Network(e.to_string())
    }
}
