//! Publish / unpublish.

use std::fmt;
use std::str::FromStr;

use aem_client::RequestDescriptor;
use async_trait::async_trait;
use serde_json::{Value, json};

use super::CHARSET_FIELD;
use crate::error::Result;
use crate::tool::{
    ParamExt, ParameterValidationError, Tool, ToolContext, ToolResult, repository_path,
};

/// Replication servlet.
pub const REPLICATE_PATH: &str = "/bin/replicate.json";

/// What to do with the content.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ReplicationAction {
    #[default]
    Publish,
    Unpublish,
}

impl ReplicationAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReplicationAction::Publish => "publish",
            ReplicationAction::Unpublish => "unpublish",
        }
    }

    /// The servlet's `cmd` value.
    pub fn command(&self) -> &'static str {
        match self {
            ReplicationAction::Publish => "Activate",
            ReplicationAction::Unpublish => "Deactivate",
        }
    }
}

impl fmt::Display for ReplicationAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ReplicationAction {
    type Err = ParameterValidationError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "publish" => Ok(ReplicationAction::Publish),
            "unpublish" => Ok(ReplicationAction::Unpublish),
            other => Err(ParameterValidationError::invalid_value(
                "action",
                other,
                "expected 'publish' or 'unpublish'",
            )),
        }
    }
}

/// Arguments for `aem_replicate`.
#[derive(Debug, Clone, PartialEq)]
pub struct ReplicateParams {
    pub path: String,
    pub action: ReplicationAction,
}

impl TryFrom<Value> for ReplicateParams {
    type Error = ParameterValidationError;

    fn try_from(params: Value) -> std::result::Result<Self, Self::Error> {
        Ok(Self {
            path: repository_path("path", params.required_str("path", "content path")?)?,
            action: params
                .optional_str("action")?
                .map(str::parse::<ReplicationAction>)
                .transpose()?
                .unwrap_or_default(),
        })
    }
}

#[derive(Debug, Clone, Default)]
pub struct ReplicateTool;

impl ReplicateTool {
    pub fn request(params: &ReplicateParams) -> RequestDescriptor {
        RequestDescriptor::post(REPLICATE_PATH)
            .form_field("cmd", params.action.command())
            .form_field("path", &params.path)
            .form_field(CHARSET_FIELD.0, CHARSET_FIELD.1)
    }
}

#[async_trait]
impl Tool for ReplicateTool {
    fn name(&self) -> &str {
        "aem_replicate"
    }

    fn description(&self) -> &str {
        "Publish (activate) or unpublish (deactivate) a page or asset to the publish tier."
    }

    fn parameters(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "path": {
                    "type": "string",
                    "minLength": 1,
                    "description": "Page or asset path"
                },
                "action": {
                    "type": "string",
                    "enum": ["publish", "unpublish"],
                    "description": "Replication action (default publish)"
                }
            },
            "required": ["path"]
        })
    }

    async fn execute(&self, params: Value, ctx: &ToolContext) -> Result<ToolResult> {
        let params = ReplicateParams::try_from(params)?;
        ctx.client.execute(Self::request(&params)).await?;
        tracing::info!(path = %params.path, action = %params.action, "Content replicated");
        Ok(ToolResult::json(json!({
            "success": true,
            "path": params.path,
            "action": params.action.as_str()
        })))
    }
}
