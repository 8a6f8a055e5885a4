//! Connectivity check.
//!
//! Runs four checks against the configured instance and reports each outcome
//! separately. A failing check never stops the others.

use aem_client::{AemClient, RequestDescriptor, SECURITY_TOKEN_PATH};
use async_trait::async_trait;
use serde::Serialize;
use serde_json::{Value, json};

use crate::error::Result;
use crate::tool::{Tool, ToolContext, ToolResult};

const CURRENT_USER_PATH: &str = "/libs/granite/security/currentuser.json";
const CONTENT_ROOT_PATH: &str = "/content.1.json";
const DAM_ROOT_PATH: &str = "/content/dam.1.json";

/// Result of a single check.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckOutcome {
    pub name: String,
    pub endpoint: String,
    pub ok: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<u16>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<Value>,
}

impl CheckOutcome {
    fn from_result(name: &str, endpoint: &str, result: aem_client::Result<Option<Value>>) -> Self {
        match result {
            Ok(detail) => Self {
                name: name.to_string(),
                endpoint: endpoint.to_string(),
                ok: true,
                status: None,
                error: None,
                detail,
            },
            Err(e) => {
                tracing::warn!(check = %name, error = %e, "Connection check failed");
                Self {
                    name: name.to_string(),
                    endpoint: endpoint.to_string(),
                    ok: false,
                    status: e.status(),
                    error: Some(e.to_string()),
                    detail: None,
                }
            }
        }
    }
}

/// Aggregate connectivity report.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectionReport {
    pub base_url: Option<String>,
    pub auth_mode: String,
    /// True when every check succeeded.
    pub healthy: bool,
    pub checks: Vec<CheckOutcome>,
}

/// Check the instance: security token, current user, content root, asset root.
pub async fn check_connection(client: &AemClient) -> ConnectionReport {
    let mut checks = Vec::with_capacity(4);

    // The token itself is never reported.
    let token = client.fetch_security_token().await.map(|_| None);
    checks.push(CheckOutcome::from_result(
        "securityToken",
        SECURITY_TOKEN_PATH,
        token,
    ));

    let user = client
        .execute(RequestDescriptor::get(CURRENT_USER_PATH))
        .await
        .map(|payload| {
            payload
                .as_json()
                .and_then(|v| v.get("authorizableId"))
                .map(|id| json!({ "user": id }))
        });
    checks.push(CheckOutcome::from_result("currentUser", CURRENT_USER_PATH, user));

    for (name, path) in [("contentRead", CONTENT_ROOT_PATH), ("assetRead", DAM_ROOT_PATH)] {
        let read = client
            .execute(RequestDescriptor::get(path))
            .await
            .map(|_| None);
        checks.push(CheckOutcome::from_result(name, path, read));
    }

    let healthy = checks.iter().all(|c| c.ok);
    tracing::info!(healthy, "Connection check finished");

    ConnectionReport {
        base_url: client.base_url().map(|u| u.to_string()),
        auth_mode: client.auth_mode().to_string(),
        healthy,
        checks,
    }
}

#[derive(Debug, Clone, Default)]
pub struct CheckConnectionTool;

#[async_trait]
impl Tool for CheckConnectionTool {
    fn name(&self) -> &str {
        "aem_check_connection"
    }

    fn description(&self) -> &str {
        "Check connectivity and credentials against the AEM instance. Reports the outcome of \
         the security token, current user, content read and asset read checks."
    }

    fn parameters(&self) -> Value {
        json!({
            "type": "object",
            "properties": {}
        })
    }

    async fn execute(&self, _params: Value, ctx: &ToolContext) -> Result<ToolResult> {
        let report = check_connection(&ctx.client).await;
        Ok(ToolResult::json(json!(report)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_unconfigured_client_still_reports_every_check() {
        let client = AemClient::builder().build().unwrap();
        let report = check_connection(&client).await;

        assert!(!report.healthy);
        assert_eq!(report.base_url, None);
        assert_eq!(report.auth_mode, "basic");
        assert_eq!(
            report.checks.iter().map(|c| c.name.as_str()).collect::<Vec<_>>(),
            vec!["securityToken", "currentUser", "contentRead", "assetRead"]
        );
        assert!(report.checks.iter().all(|c| !c.ok && c.error.is_some()));
    }

    #[test]
    fn test_outcome_serialization_omits_empty_fields() {
        let outcome = CheckOutcome::from_result("contentRead", CONTENT_ROOT_PATH, Ok(None));
        assert_eq!(
            serde_json::to_value(&outcome).unwrap(),
            json!({"name": "contentRead", "endpoint": "/content.1.json", "ok": true})
        );
    }
}
