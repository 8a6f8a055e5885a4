//! Main client implementation.

use std::sync::Arc;
use std::time::Duration;

use aem_auth::{SharedCredentialProvider, create_credential_provider};
use aem_config::{AemConfig, AuthConfig, AuthMode, DEFAULT_TIMEOUT_SECS};
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE};
use url::Url;

use crate::csrf::{SECURITY_TOKEN_HEADER, SECURITY_TOKEN_PATH, SecurityTokenCache};
use crate::error::{Error, Result};
use crate::request::{Payload, RequestBody, RequestDescriptor};

/// Default timeout for requests.
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(DEFAULT_TIMEOUT_SECS);

/// Authenticated executor for AEM HTTP calls.
///
/// Cloning is cheap; clones share the credential provider and the security
/// token cache.
///
/// # Example
///
/// ```no_run
/// use aem_client::{AemClient, RequestDescriptor};
///
/// # async fn example() -> aem_client::Result<()> {
/// let config = aem_config::load_config().expect("config").config;
/// let client = AemClient::from_config(&config)?;
/// let page = client
///     .execute(RequestDescriptor::get("/content/site/en.infinity.json"))
///     .await?;
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct AemClient {
    inner: Arc<ClientInner>,
}

struct ClientInner {
    http: reqwest::Client,
    /// `None` when no base URL is configured; every request then fails fast.
    base_url: Option<Url>,
    credentials: SharedCredentialProvider,
    security_token: SecurityTokenCache,
    timeout: Duration,
}

impl std::fmt::Debug for AemClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AemClient")
            .field("base_url", &self.inner.base_url.as_ref().map(Url::as_str))
            .field("auth_mode", &self.auth_mode())
            .field("timeout", &self.inner.timeout)
            .finish()
    }
}

impl AemClient {
    /// Create a new client builder.
    pub fn builder() -> ClientBuilder {
        ClientBuilder::new()
    }

    /// Build a client from loaded configuration.
    pub fn from_config(config: &AemConfig) -> Result<Self> {
        let mut builder = Self::builder()
            .timeout(config.server.timeout())
            .auth(config.auth.clone());
        if let Some(url) = config.server.base_url.as_deref().filter(|u| !u.is_empty()) {
            builder = builder.base_url(url);
        }
        builder.build()
    }

    /// The configured base URL, if any.
    pub fn base_url(&self) -> Option<&Url> {
        self.inner.base_url.as_ref()
    }

    pub fn auth_mode(&self) -> AuthMode {
        self.inner.credentials.mode()
    }

    pub fn credentials(&self) -> &SharedCredentialProvider {
        &self.inner.credentials
    }

    pub fn timeout(&self) -> Duration {
        self.inner.timeout
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Execution
    // ─────────────────────────────────────────────────────────────────────────

    /// Execute a request against AEM.
    ///
    /// Mutating requests carry the security token when one can be obtained.
    /// A non-success status becomes [`Error::UpstreamRequest`] with the raw
    /// body attached.
    pub async fn execute(&self, request: RequestDescriptor) -> Result<Payload> {
        // Resolve the URL first so a missing base URL never touches the network.
        self.url(&request.path)?;

        let security_token = if request.is_mutating() {
            self.security_token().await
        } else {
            String::new()
        };

        self.send(request, &security_token).await
    }

    /// Fetch (or reuse) the security token. Empty if unavailable.
    pub async fn security_token(&self) -> String {
        self.inner
            .security_token
            .get_or_fetch(|| self.fetch_security_token())
            .await
    }

    /// Fetch a fresh security token, bypassing the cache and surfacing errors.
    pub async fn fetch_security_token(&self) -> Result<String> {
        let payload = self
            .send(RequestDescriptor::get(SECURITY_TOKEN_PATH), "")
            .await?;
        payload
            .as_json()
            .and_then(|v| v.get("token"))
            .and_then(|v| v.as_str())
            .map(str::to_string)
            .ok_or_else(|| {
                Error::InvalidResponse("security token response has no \"token\" field".to_string())
            })
    }

    /// Drop the cached security token.
    pub async fn invalidate_security_token(&self) {
        self.inner.security_token.invalidate().await;
    }

    /// Drop the cached bearer credential (no-op for basic and static modes).
    pub async fn invalidate_credentials(&self) {
        self.inner.credentials.invalidate().await;
    }

    /// Build a URL for an AEM path.
    ///
    /// Each path segment is percent-encoded onto the base URL's path, so
    /// `?` and `#` stay part of the node name. Dot segments are rejected.
    fn url(&self, path: &str) -> Result<Url> {
        let mut url = self.inner.base_url.clone().ok_or_else(|| {
            Error::Config("base_url is not configured (set AEM_BASE_URL)".to_string())
        })?;

        let segments: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();
        if segments.iter().any(|s| *s == "." || *s == "..") {
            return Err(Error::InvalidPath(path.to_string()));
        }

        let base = url.as_str().to_string();
        url.path_segments_mut()
            .map_err(|_| Error::Config(format!("base_url {} cannot carry a path", base)))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    async fn send(&self, request: RequestDescriptor, security_token: &str) -> Result<Payload> {
        let url = self.url(&request.path)?;
        let authorization = self.inner.credentials.authorization_header().await?;

        tracing::debug!(method = %request.method, path = %request.path, "Sending AEM request");

        let mut builder = self
            .inner
            .http
            .request(request.method.clone(), url)
            .header(AUTHORIZATION, authorization)
            .timeout(self.inner.timeout);

        if !request.query.is_empty() {
            builder = builder.query(&request.query);
        }
        if !security_token.is_empty() {
            builder = builder.header(SECURITY_TOKEN_HEADER, security_token);
        }
        builder = match &request.body {
            RequestBody::Empty => builder,
            RequestBody::Form(fields) => builder.form(fields),
            RequestBody::Json(value) => builder.json(value),
        };

        let response = builder.send().await.inspect_err(|e| {
            tracing::warn!(path = %request.path, error = %e, "AEM request did not complete");
        })?;
        Self::handle_response(&request, response).await
    }

    /// Handle a response, decoding the body or building the error.
    async fn handle_response(
        request: &RequestDescriptor,
        response: reqwest::Response,
    ) -> Result<Payload> {
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            tracing::warn!(
                method = %request.method,
                path = %request.path,
                status = status.as_u16(),
                "AEM request failed"
            );
            return Err(Error::UpstreamRequest {
                status: status.as_u16(),
                status_text: status.canonical_reason().unwrap_or_default().to_string(),
                body,
            });
        }

        let is_json = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .is_some_and(|ct| ct.contains("json"));
        let text = response.text().await?;

        if is_json && !text.trim().is_empty() {
            serde_json::from_str(&text)
                .map(Payload::Json)
                .map_err(|e| Error::InvalidResponse(format!("malformed JSON body: {}", e)))
        } else {
            Ok(Payload::Text(text))
        }
    }
}

/// Builder for creating an [`AemClient`].
#[derive(Debug)]
pub struct ClientBuilder {
    base_url: Option<String>,
    auth: AuthConfig,
    credentials: Option<SharedCredentialProvider>,
    timeout: Duration,
    user_agent: Option<String>,
}

impl ClientBuilder {
    /// Create a new builder with defaults.
    pub fn new() -> Self {
        Self {
            base_url: None,
            auth: AuthConfig::default(),
            credentials: None,
            timeout: DEFAULT_TIMEOUT,
            user_agent: None,
        }
    }

    /// Set the AEM base URL.
    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = Some(url.into());
        self
    }

    /// Auth settings used to build a provider when none is set explicitly.
    pub fn auth(mut self, auth: AuthConfig) -> Self {
        self.auth = auth;
        self
    }

    /// Use an existing credential provider.
    pub fn credentials(mut self, provider: SharedCredentialProvider) -> Self {
        self.credentials = Some(provider);
        self
    }

    /// Set the request timeout.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Set a custom user agent.
    pub fn user_agent(mut self, agent: impl Into<String>) -> Self {
        self.user_agent = Some(agent.into());
        self
    }

    /// Build the client. A missing base URL is accepted here and reported
    /// when a request is executed.
    pub fn build(self) -> Result<AemClient> {
        let base_url = self.base_url.as_deref().map(Url::parse).transpose()?;

        let user_agent = self
            .user_agent
            .unwrap_or_else(|| format!("aem-mcp/{}", env!("CARGO_PKG_VERSION")));

        // The same timeout bounds token exchanges.
        let http = reqwest::Client::builder()
            .user_agent(user_agent)
            .timeout(self.timeout)
            .build()?;

        let credentials = self
            .credentials
            .unwrap_or_else(|| create_credential_provider(&self.auth, http.clone()));

        Ok(AemClient {
            inner: Arc::new(ClientInner {
                http,
                base_url,
                credentials,
                security_token: SecurityTokenCache::new(),
                timeout: self.timeout,
            }),
        })
    }
}

impl Default for ClientBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder_accepts_missing_base_url() {
        let client = ClientBuilder::new().build().unwrap();
        assert!(client.base_url().is_none());
        assert!(client.url("/content").unwrap_err().is_config());
    }

    #[test]
    fn test_builder_rejects_malformed_url() {
        let result = ClientBuilder::new().base_url("not a url").build();
        assert!(matches!(result, Err(Error::InvalidUrl(_))));
    }

    #[test]
    fn test_url_joining() {
        let client = ClientBuilder::new()
            .base_url("http://localhost:4502/")
            .build()
            .unwrap();
        assert_eq!(
            client.url("/content/site.1.json").unwrap().as_str(),
            "http://localhost:4502/content/site.1.json"
        );

        let client = ClientBuilder::new()
            .base_url("https://author.example.com/aem")
            .build()
            .unwrap();
        assert_eq!(
            client.url("api/assets/x.json").unwrap().as_str(),
            "https://author.example.com/aem/api/assets/x.json"
        );
    }

    #[test]
    fn test_url_encodes_reserved_characters() {
        let client = ClientBuilder::new()
            .base_url("http://localhost:4502")
            .build()
            .unwrap();
        assert_eq!(
            client.url("/content/dam/what?.jpg.json").unwrap().as_str(),
            "http://localhost:4502/content/dam/what%3F.jpg.json"
        );
        assert_eq!(
            client.url("/content/site/a#b/jcr:content").unwrap().as_str(),
            "http://localhost:4502/content/site/a%23b/jcr:content"
        );
    }

    #[test]
    fn test_url_rejects_dot_segments() {
        let client = ClientBuilder::new()
            .base_url("http://localhost:4502/aem/")
            .build()
            .unwrap();
        let err = client.url("/content/../libs/granite").unwrap_err();
        assert!(matches!(err, Error::InvalidPath(p) if p == "/content/../libs/granite"));
        assert!(client.url("/content/./site").is_err());
        assert_eq!(
            client.url("/content/site..v2.json").unwrap().as_str(),
            "http://localhost:4502/aem/content/site..v2.json"
        );
    }

    #[test]
    fn test_from_config() {
        let mut config = AemConfig::new();
        config.server.base_url = Some("http://localhost:4502".to_string());
        config.auth.mode = Some(AuthMode::Token);
        config.auth.access_token = Some("t".to_string());

        let client = AemClient::from_config(&config).unwrap();
        assert_eq!(client.auth_mode(), AuthMode::Token);
        assert_eq!(client.timeout(), Duration::from_secs(30));
        assert!(format!("{client:?}").contains("localhost:4502"));
    }

    #[test]
    fn test_from_config_empty_base_url_is_unset() {
        let mut config = AemConfig::new();
        config.server.base_url = Some(String::new());
        let client = AemClient::from_config(&config).unwrap();
        assert!(client.base_url().is_none());
    }
}
