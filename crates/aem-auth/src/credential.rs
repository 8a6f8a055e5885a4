//! The credential value attached to outgoing requests.

use base64::{Engine, engine::general_purpose::STANDARD};
use chrono::{DateTime, Utc};

/// An authorization credential.
#[derive(Clone, PartialEq, Eq)]
pub enum Credential {
    /// Static username/password pair.
    Basic { username: String, password: String },
    /// Bearer token. `expires_at` of `None` means the token never expires
    /// from our point of view (manually supplied tokens).
    Bearer {
        token: String,
        expires_at: Option<DateTime<Utc>>,
    },
}

impl Credential {
    pub fn basic(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self::Basic {
            username: username.into(),
            password: password.into(),
        }
    }

    pub fn bearer(token: impl Into<String>, expires_at: Option<DateTime<Utc>>) -> Self {
        Self::Bearer {
            token: token.into(),
            expires_at,
        }
    }

    /// A bearer credential with `expires_at <= now` is invalid.
    pub fn is_valid_at(&self, now: DateTime<Utc>) -> bool {
        match self {
            Self::Basic { .. } => true,
            Self::Bearer { expires_at, .. } => expires_at.is_none_or(|at| now < at),
        }
    }

    /// The `Authorization` header value.
    pub fn header_value(&self) -> String {
        match self {
            Self::Basic { username, password } => {
                format!("Basic {}", STANDARD.encode(format!("{}:{}", username, password)))
            }
            Self::Bearer { token, .. } => format!("Bearer {}", token),
        }
    }
}

impl std::fmt::Debug for Credential {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Basic { username, .. } => f
                .debug_struct("Basic")
                .field("username", username)
                .finish_non_exhaustive(),
            Self::Bearer { expires_at, .. } => f
                .debug_struct("Bearer")
                .field("expires_at", expires_at)
                .finish_non_exhaustive(),
        }
    }
}
