//! OAuth 2.0 client-credentials exchange against the identity endpoint.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{AuthError, Result};

/// Tokens are treated as expired this long before the identity service
/// considers them expired.
pub const EXPIRY_SAFETY_MARGIN_SECS: i64 = 60;

/// Settings for the client-credentials grant. Fields are optional so that a
/// missing value is reported when the exchange is attempted.
#[derive(Clone, Default)]
pub struct ClientCredentials {
    pub token_url: String,
    pub client_id: Option<String>,
    pub client_secret: Option<String>,
    pub scope: Option<String>,
}

impl std::fmt::Debug for ClientCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClientCredentials")
            .field("token_url", &self.token_url)
            .field("client_id", &self.client_id)
            .field("scope", &self.scope)
            .finish_non_exhaustive()
    }
}

/// Token response from the identity endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenResponse {
    pub access_token: String,
    /// Lifetime in seconds.
    pub expires_in: i64,
    #[serde(default)]
    pub token_type: Option<String>,
}

impl TokenResponse {
    /// Local expiry: `issued_at + expires_in - 60s`, never earlier than `issued_at`.
    pub fn expires_at(&self, issued_at: DateTime<Utc>) -> DateTime<Utc> {
        let lifetime = (self.expires_in - EXPIRY_SAFETY_MARGIN_SECS).max(0);
        issued_at + Duration::seconds(lifetime)
    }
}

#[derive(Debug, Serialize)]
struct TokenRequest<'a> {
    grant_type: &'static str,
    client_id: &'a str,
    client_secret: &'a str,
    scope: &'a str,
}

fn required<'a>(value: &'a Option<String>, name: &str) -> Result<&'a str> {
    value
        .as_deref()
        .filter(|v| !v.is_empty())
        .ok_or_else(|| AuthError::config(format!("{} is required for oauth auth mode", name)))
}

/// Exchange client id/secret for an access token.
pub async fn exchange_client_credentials(
    http: &reqwest::Client,
    credentials: &ClientCredentials,
) -> Result<TokenResponse> {
    let request = TokenRequest {
        grant_type: "client_credentials",
        client_id: required(&credentials.client_id, "client_id")?,
        client_secret: required(&credentials.client_secret, "client_secret")?,
        scope: required(&credentials.scope, "scope")?,
    };

    let response = http
        .post(&credentials.token_url)
        .form(&request)
        .send()
        .await
        .map_err(|e| AuthError::Network(format!("Token exchange request failed: {}", e)))?;

    let status = response.status();
    if !status.is_success() {
        let body = response
            .text()
            .await
            .unwrap_or_else(|_| "Unknown error".to_string());
        return Err(AuthError::Exchange {
            status: status.as_u16(),
            body,
        });
    }

    response
        .json()
        .await
        .map_err(|e| AuthError::Serialization(format!("Failed to parse token response: {}", e)))
}
