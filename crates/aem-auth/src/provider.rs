//! Credential providers.
//!
//! A provider turns configuration into an `Authorization` header value. The
//! client-credentials provider owns the bearer-token lifecycle: the token is
//! fetched lazily, cached, and refreshed once it is within the safety margin
//! of expiry. Concurrent callers that observe an expired token wait for a
//! single in-flight refresh instead of starting their own.

use std::sync::Arc;

use aem_config::{AuthConfig, AuthMode};
use async_trait::async_trait;
use parking_lot::RwLock;
use tokio::sync::Mutex;

use crate::clock::{SharedClock, SystemClock};
use crate::credential::Credential;
use crate::error::{AuthError, Result};
use crate::exchange::{ClientCredentials, exchange_client_credentials};

// ============================================================================
// CredentialProvider Trait
// ============================================================================

/// Produces the authorization value for outgoing requests.
#[async_trait]
pub trait CredentialProvider: Send + Sync + std::fmt::Debug {
    /// Resolve a valid `Authorization` header value, refreshing if necessary.
    async fn authorization_header(&self) -> Result<String>;

    /// Drop any cached credential so the next call re-resolves it.
    async fn invalidate(&self);

    /// Which auth mode this provider implements.
    fn mode(&self) -> AuthMode;
}

/// Shared provider for use across async contexts.
pub type SharedCredentialProvider = Arc<dyn CredentialProvider>;

// ============================================================================
// Basic
// ============================================================================

/// Username/password provider.
#[derive(Debug)]
pub struct BasicProvider {
    username: Option<String>,
    password: Option<String>,
}

impl BasicProvider {
    pub fn new(username: Option<String>, password: Option<String>) -> Self {
        Self { username, password }
    }
}

#[async_trait]
impl CredentialProvider for BasicProvider {
    async fn authorization_header(&self) -> Result<String> {
        match (non_empty(&self.username), non_empty(&self.password)) {
            (Some(user), Some(pass)) => Ok(Credential::basic(user, pass).header_value()),
            _ => Err(AuthError::config(
                "username and password are required for basic auth mode",
            )),
        }
    }

    async fn invalidate(&self) {}

    fn mode(&self) -> AuthMode {
        AuthMode::Basic
    }
}

// ============================================================================
// Static bearer
// ============================================================================

/// A manually supplied bearer token. Never refreshed.
#[derive(Debug)]
pub struct StaticTokenProvider {
    token: Option<String>,
}

impl StaticTokenProvider {
    pub fn new(token: Option<String>) -> Self {
        Self { token }
    }
}

#[async_trait]
impl CredentialProvider for StaticTokenProvider {
    async fn authorization_header(&self) -> Result<String> {
        non_empty(&self.token)
            .map(|token| Credential::bearer(token, None).header_value())
            .ok_or_else(|| AuthError::config("access_token is required for token auth mode"))
    }

    async fn invalidate(&self) {}

    fn mode(&self) -> AuthMode {
        AuthMode::Token
    }
}

// ============================================================================
// Client credentials
// ============================================================================

/// Bearer provider backed by the client-credentials exchange.
#[derive(Debug)]
pub struct ClientCredentialsProvider {
    http: reqwest::Client,
    credentials: ClientCredentials,
    clock: SharedClock,
    cached: RwLock<Option<Credential>>,
    refresh_lock: Mutex<()>,
}

impl ClientCredentialsProvider {
    pub fn new(http: reqwest::Client, credentials: ClientCredentials) -> Self {
        Self::with_clock(http, credentials, Arc::new(SystemClock))
    }

    pub fn with_clock(
        http: reqwest::Client,
        credentials: ClientCredentials,
        clock: SharedClock,
    ) -> Self {
        Self {
            http,
            credentials,
            clock,
            cached: RwLock::new(None),
            refresh_lock: Mutex::new(()),
        }
    }

    /// The cached credential, if any.
    pub fn cached_credential(&self) -> Option<Credential> {
        self.cached.read().clone()
    }

    fn valid_cached_header(&self) -> Option<String> {
        let now = self.clock.now();
        self.cached
            .read()
            .as_ref()
            .filter(|cred| cred.is_valid_at(now))
            .map(Credential::header_value)
    }

    async fn refresh(&self) -> Result<Credential> {
        tracing::info!(token_url = %self.credentials.token_url, "Refreshing access token");

        let token = exchange_client_credentials(&self.http, &self.credentials).await?;
        let expires_at = token.expires_at(self.clock.now());
        let credential = Credential::bearer(token.access_token, Some(expires_at));

        *self.cached.write() = Some(credential.clone());
        tracing::info!(%expires_at, "Access token refreshed");
        Ok(credential)
    }
}

#[async_trait]
impl CredentialProvider for ClientCredentialsProvider {
    async fn authorization_header(&self) -> Result<String> {
        if let Some(header) = self.valid_cached_header() {
            return Ok(header);
        }

        let _guard = self.refresh_lock.lock().await;

        // Another caller may have refreshed while we waited.
        if let Some(header) = self.valid_cached_header() {
            return Ok(header);
        }

        Ok(self.refresh().await?.header_value())
    }

    async fn invalidate(&self) {
        let _guard = self.refresh_lock.lock().await;
        *self.cached.write() = None;
    }

    fn mode(&self) -> AuthMode {
        AuthMode::OAuth
    }
}

// ============================================================================
// Construction
// ============================================================================

/// Build the provider selected by `config.mode`.
pub fn create_credential_provider(
    config: &AuthConfig,
    http: reqwest::Client,
) -> SharedCredentialProvider {
    match config.mode() {
        AuthMode::Basic => Arc::new(BasicProvider::new(
            config.username.clone(),
            config.password.clone(),
        )),
        AuthMode::Token => Arc::new(StaticTokenProvider::new(config.access_token.clone())),
        AuthMode::OAuth => Arc::new(ClientCredentialsProvider::new(
            http,
            ClientCredentials {
                token_url: config.token_endpoint().to_string(),
                client_id: config.client_id.clone(),
                client_secret: config.client_secret.clone(),
                scope: config.scope.clone(),
            },
        )),
    }
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|v| !v.is_empty())
}
