//! Security (CSRF) token cache.
//!
//! AEM expects a `CSRF-Token` header on state-changing requests. The token is
//! fetched once and reused until invalidated. Fetch failures are not fatal:
//! the cache yields an empty token and the caller sends the request without
//! the header.

use std::future::Future;

use tokio::sync::Mutex;

use crate::error::Result;

/// Endpoint returning `{"token": "..."}`.
pub const SECURITY_TOKEN_PATH: &str = "/libs/granite/csrf/token.json";

/// Header carrying the token on mutating requests.
pub const SECURITY_TOKEN_HEADER: &str = "CSRF-Token";

/// Lazily populated token slot.
///
/// The lock is held across the fetch, so concurrent callers wait for the
/// first fetch instead of issuing their own.
#[derive(Debug, Default)]
pub struct SecurityTokenCache {
    token: Mutex<Option<String>>,
}

impl SecurityTokenCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the cached token or run `fetch` to obtain one.
    ///
    /// Returns an empty string if the fetch fails or yields nothing; nothing
    /// is cached in that case so the next mutating call tries again.
    pub async fn get_or_fetch<F, Fut>(&self, fetch: F) -> String
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<String>>,
    {
        let mut slot = self.token.lock().await;
        if let Some(token) = slot.as_ref() {
            return token.clone();
        }

        match fetch().await {
            Ok(token) if !token.is_empty() => {
                tracing::debug!("Security token acquired");
                *slot = Some(token.clone());
                token
            }
            Ok(_) => {
                tracing::warn!("Security token endpoint returned no token");
                String::new()
            }
            Err(e) => {
                tracing::warn!(error = %e, "Failed to fetch security token, continuing without it");
                String::new()
            }
        }
    }

    /// Forget the cached token.
    pub async fn invalidate(&self) {
        *self.token.lock().await = None;
    }

    pub async fn cached(&self) -> Option<String> {
        self.token.lock().await.clone()
    }
}
