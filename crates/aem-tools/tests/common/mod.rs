//! Common test utilities for dispatcher integration tests.

use aem_client::AemClient;
use aem_config::{AuthConfig, AuthMode};
use aem_tools::{ToolContext, ToolRegistry};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// A mock AEM instance with a registry and context pointed at it.
pub struct TestInstance {
    pub server: MockServer,
    pub registry: ToolRegistry,
    pub ctx: ToolContext,
}

impl TestInstance {
    /// Start with basic auth (`admin` / `admin`).
    pub async fn start() -> Self {
        Self::start_with_auth(AuthConfig {
            mode: Some(AuthMode::Basic),
            username: Some("admin".to_string()),
            password: Some("admin".to_string()),
            ..Default::default()
        })
        .await
    }

    pub async fn start_with_auth(auth: AuthConfig) -> Self {
        let server = MockServer::start().await;
        let client = AemClient::builder()
            .base_url(server.uri())
            .auth(auth)
            .build()
            .expect("client");
        Self {
            server,
            registry: ToolRegistry::with_aem_tools(),
            ctx: ToolContext::new(client),
        }
    }

    /// Serve a security token on the standard endpoint.
    pub async fn mount_security_token(&self, token: &str) {
        Mock::given(method("GET"))
            .and(path("/libs/granite/csrf/token.json"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(serde_json::json!({ "token": token })),
            )
            .mount(&self.server)
            .await;
    }

    /// Requests received so far, excluding security token fetches.
    pub async fn operation_requests(&self) -> Vec<wiremock::Request> {
        self.server
            .received_requests()
            .await
            .unwrap_or_default()
            .into_iter()
            .filter(|r| r.url.path() != "/libs/granite/csrf/token.json")
            .collect()
    }
}

/// Parse a success envelope's text back into JSON.
pub fn content_json(result: &aem_tools::ToolResult) -> serde_json::Value {
    serde_json::from_str(&result.to_llm_content()).expect("JSON content")
}
