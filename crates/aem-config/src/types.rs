//! Configuration types.
//!
//! ```toml
//! [server]
//! base_url = "https://author.example.com"
//! timeout_secs = 30
//!
//! [auth]
//! mode = "oauth"
//! client_id = "..."
//! client_secret = "..."
//! scope = "openid,AdobeID,read_organizations"
//! ```
//!
//! Every field is optional. Missing credentials are reported when they are
//! first needed, not at load time.

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::{ConfigError, Result};

/// Request timeout used when none is configured.
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Identity endpoint for the client-credentials exchange.
pub const DEFAULT_TOKEN_ENDPOINT: &str = "https://ims-na1.adobelogin.com/ims/token/v3";

/// Environment variable names consulted by [`AemConfig::apply_env`].
pub mod env {
    pub const BASE_URL: &str = "AEM_BASE_URL";
    pub const TIMEOUT_SECS: &str = "AEM_TIMEOUT_SECS";
    pub const AUTH_MODE: &str = "AEM_AUTH_MODE";
    pub const USERNAME: &str = "AEM_USERNAME";
    pub const PASSWORD: &str = "AEM_PASSWORD";
    pub const CLIENT_ID: &str = "AEM_CLIENT_ID";
    pub const CLIENT_SECRET: &str = "AEM_CLIENT_SECRET";
    pub const SCOPE: &str = "AEM_SCOPE";
    pub const ACCESS_TOKEN: &str = "AEM_ACCESS_TOKEN";
    pub const TOKEN_ENDPOINT: &str = "AEM_TOKEN_ENDPOINT";
}

// ─────────────────────────────────────────────────────────────────────────────
// Root
// ─────────────────────────────────────────────────────────────────────────────

/// Root configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AemConfig {
    /// Target instance settings.
    pub server: ServerConfig,
    /// Credential settings.
    pub auth: AuthConfig,
}

impl AemConfig {
    /// Create an empty configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse from a TOML string.
    pub fn from_toml(toml_str: &str) -> Result<Self> {
        Ok(toml::from_str(toml_str)?)
    }

    /// Overlay another layer on top of this one. Values set in `other` win.
    pub fn merge(&mut self, other: AemConfig) {
        self.server.merge(other.server);
        self.auth.merge(other.auth);
    }

    /// Apply `AEM_*` environment overrides.
    pub fn apply_env(&mut self) -> Result<()> {
        self.apply_env_with(|key| std::env::var(key).ok())
    }

    /// Apply overrides from an arbitrary key lookup. Empty values are ignored.
    pub fn apply_env_with<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(v) = get(env::BASE_URL) {
            self.server.base_url = Some(v);
        }
        if let Some(v) = get(env::TIMEOUT_SECS) {
            let secs = v.trim().parse::<u64>().map_err(|e| ConfigError::InvalidEnv {
                key: env::TIMEOUT_SECS.to_string(),
                value: v.clone(),
                reason: e.to_string(),
            })?;
            self.server.timeout_secs = Some(secs);
        }
        if let Some(v) = get(env::AUTH_MODE) {
            self.auth.mode = Some(v.parse()?);
        }

        let fields: [(&str, &mut Option<String>); 7] = [
            (env::USERNAME, &mut self.auth.username),
            (env::PASSWORD, &mut self.auth.password),
            (env::CLIENT_ID, &mut self.auth.client_id),
            (env::CLIENT_SECRET, &mut self.auth.client_secret),
            (env::SCOPE, &mut self.auth.scope),
            (env::ACCESS_TOKEN, &mut self.auth.access_token),
            (env::TOKEN_ENDPOINT, &mut self.auth.token_endpoint),
        ];
        for (key, slot) in fields {
            if let Some(v) = get(key) {
                *slot = Some(v);
            }
        }

        Ok(())
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Server
// ─────────────────────────────────────────────────────────────────────────────

/// Target instance settings.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Base URL of the author instance, e.g. `https://author.example.com`.
    pub base_url: Option<String>,
    /// Per-request timeout in seconds.
    pub timeout_secs: Option<u64>,
}

impl ServerConfig {
    /// Effective request timeout.
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs.unwrap_or(DEFAULT_TIMEOUT_SECS))
    }

    fn merge(&mut self, other: ServerConfig) {
        if other.base_url.is_some() {
            self.base_url = other.base_url;
        }
        if other.timeout_secs.is_some() {
            self.timeout_secs = other.timeout_secs;
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Auth
// ─────────────────────────────────────────────────────────────────────────────

/// Which credential scheme to use for outgoing requests.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AuthMode {
    /// Username and password.
    #[default]
    Basic,
    /// Client-credentials exchange with automatic refresh.
    OAuth,
    /// A manually supplied bearer token, never refreshed.
    Token,
}

impl AuthMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            AuthMode::Basic => "basic",
            AuthMode::OAuth => "oauth",
            AuthMode::Token => "token",
        }
    }
}

impl fmt::Display for AuthMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AuthMode {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "basic" => Ok(AuthMode::Basic),
            "oauth" | "bearer" => Ok(AuthMode::OAuth),
            "token" => Ok(AuthMode::Token),
            other => Err(ConfigError::UnknownAuthMode(other.to_string())),
        }
    }
}

/// Credential settings. Secrets are redacted from `Debug` output.
#[derive(Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AuthConfig {
    pub mode: Option<AuthMode>,
    pub username: Option<String>,
    pub password: Option<String>,
    pub client_id: Option<String>,
    pub client_secret: Option<String>,
    pub scope: Option<String>,
    pub access_token: Option<String>,
    /// Identity endpoint override for the client-credentials exchange.
    pub token_endpoint: Option<String>,
}

impl AuthConfig {
    /// Effective auth mode.
    pub fn mode(&self) -> AuthMode {
        self.mode.unwrap_or_default()
    }

    /// Effective identity endpoint.
    pub fn token_endpoint(&self) -> &str {
        self.token_endpoint
            .as_deref()
            .unwrap_or(DEFAULT_TOKEN_ENDPOINT)
    }

    fn merge(&mut self, other: AuthConfig) {
        let AuthConfig {
            mode,
            username,
            password,
            client_id,
            client_secret,
            scope,
            access_token,
            token_endpoint,
        } = other;

        if mode.is_some() {
            self.mode = mode;
        }
        overlay(&mut self.username, username);
        overlay(&mut self.password, password);
        overlay(&mut self.client_id, client_id);
        overlay(&mut self.client_secret, client_secret);
        overlay(&mut self.scope, scope);
        overlay(&mut self.access_token, access_token);
        overlay(&mut self.token_endpoint, token_endpoint);
    }
}

fn overlay(slot: &mut Option<String>, value: Option<String>) {
    if value.is_some() {
        *slot = value;
    }
}

fn redact(value: &Option<String>) -> &'static str {
    if value.is_some() { "<set>" } else { "<unset>" }
}

impl fmt::Debug for AuthConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuthConfig")
            .field("mode", &self.mode())
            .field("username", &self.username)
            .field("password", &redact(&self.password))
            .field("client_id", &self.client_id)
            .field("client_secret", &redact(&self.client_secret))
            .field("scope", &self.scope)
            .field("access_token", &redact(&self.access_token))
            .field("token_endpoint", &self.token_endpoint())
            .finish()
    }
}
