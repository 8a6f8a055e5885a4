//! Tool framework for AEM operations.
//!
//! This module defines the [`Tool`] trait every operation implements, the
//! [`ToolResult`] envelope, and the [`ToolRegistry`] that validates arguments
//! and dispatches calls by name.
//!
//! # Example
//!
//! ```rust,ignore
//! use aem_tools::{ToolContext, ToolRegistry};
//!
//! let registry = ToolRegistry::with_aem_tools();
//! let ctx = ToolContext::new(client);
//! let result = registry
//!     .dispatch("aem_get_page", json!({"path": "/content/site/en"}), &ctx)
//!     .await;
//! println!("{}", result.to_llm_content());
//! ```

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;

use aem_client::AemClient;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{Result, ToolError};
use crate::schema::ArgumentValidator;

// ─────────────────────────────────────────────────────────────────────────────
// Parameter Validation
// ─────────────────────────────────────────────────────────────────────────────

/// Error type for tool argument validation failures.
///
/// Messages are written for the calling agent: they name the offending
/// argument and say what was expected.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ParameterValidationError {
    /// A required parameter is missing.
    #[error("missing required parameter '{name}': {hint}")]
    MissingRequired {
        /// The parameter name.
        name: String,
        /// Hint on how to fix.
        hint: String,
    },

    /// A parameter has an invalid type.
    #[error("invalid type for '{name}': expected {expected}, got {actual}")]
    InvalidType {
        name: String,
        expected: String,
        actual: String,
    },

    /// A parameter value is out of range.
    #[error("'{name}' value {value} is out of range: {constraint}")]
    OutOfRange {
        name: String,
        value: String,
        constraint: String,
    },

    /// A parameter value doesn't match the expected pattern or enum.
    #[error("'{name}' has invalid value '{value}': {message}")]
    InvalidValue {
        name: String,
        value: String,
        message: String,
    },

    /// Multiple validation errors.
    #[error("{}", .0.iter().map(|e| e.to_string()).collect::<Vec<_>>().join("; "))]
    Multiple(Vec<ParameterValidationError>),
}

impl ParameterValidationError {
    /// Create a missing required parameter error.
    pub fn missing(name: impl Into<String>, hint: impl Into<String>) -> Self {
        Self::MissingRequired {
            name: name.into(),
            hint: hint.into(),
        }
    }

    /// Create an invalid type error.
    pub fn invalid_type(
        name: impl Into<String>,
        expected: impl Into<String>,
        actual: impl Into<String>,
    ) -> Self {
        Self::InvalidType {
            name: name.into(),
            expected: expected.into(),
            actual: actual.into(),
        }
    }

    /// Create an out of range error.
    pub fn out_of_range(
        name: impl Into<String>,
        value: impl ToString,
        constraint: impl Into<String>,
    ) -> Self {
        Self::OutOfRange {
            name: name.into(),
            value: value.to_string(),
            constraint: constraint.into(),
        }
    }

    /// Create an invalid value error.
    pub fn invalid_value(
        name: impl Into<String>,
        value: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self::InvalidValue {
            name: name.into(),
            value: value.into(),
            message: message.into(),
        }
    }

    /// Collapse a list of errors: `None` if empty, the error itself if single.
    pub fn from_many(mut errors: Vec<ParameterValidationError>) -> Option<Self> {
        match errors.len() {
            0 => None,
            1 => errors.pop(),
            _ => Some(Self::Multiple(errors)),
        }
    }

    /// Get the parameter name associated with this error (if single error).
    pub fn parameter_name(&self) -> Option<&str> {
        match self {
            Self::MissingRequired { name, .. }
            | Self::InvalidType { name, .. }
            | Self::OutOfRange { name, .. }
            | Self::InvalidValue { name, .. } => Some(name.as_str()),
            Self::Multiple(_) => None,
        }
    }
}

/// Result type for parameter validation.
pub type ParamResult<T> = std::result::Result<T, ParameterValidationError>;

/// JSON type name used in validation messages.
pub fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(n) if n.is_i64() || n.is_u64() => "integer",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// Helper trait for extracting and validating parameters from JSON.
///
/// A key holding `null` is treated as absent.
pub trait ParamExt {
    /// Get a required string parameter.
    fn required_str(&self, name: &str, hint: &str) -> ParamResult<&str>;

    /// Get an optional string parameter.
    fn optional_str(&self, name: &str) -> ParamResult<Option<&str>>;

    /// Get an optional non-negative integer parameter with default.
    fn optional_u64(&self, name: &str, default: u64) -> ParamResult<u64>;

    /// Get an optional signed integer parameter with default.
    fn optional_i64(&self, name: &str, default: i64) -> ParamResult<i64>;

    /// Get an optional boolean parameter with default.
    fn optional_bool(&self, name: &str, default: bool) -> ParamResult<bool>;

    /// Get a required object parameter.
    fn required_object(
        &self,
        name: &str,
        hint: &str,
    ) -> ParamResult<&serde_json::Map<String, Value>>;

    /// Get an optional object parameter.
    fn optional_object(&self, name: &str) -> ParamResult<Option<&serde_json::Map<String, Value>>>;
}

fn present<'a>(params: &'a Value, name: &str) -> Option<&'a Value> {
    params.get(name).filter(|v| !v.is_null())
}

impl ParamExt for Value {
    fn required_str(&self, name: &str, hint: &str) -> ParamResult<&str> {
        match present(self, name) {
            None => Err(ParameterValidationError::missing(name, hint)),
            Some(Value::String(s)) => Ok(s.as_str()),
            Some(other) => Err(ParameterValidationError::invalid_type(
                name,
                "string",
                json_type_name(other),
            )),
        }
    }

    fn optional_str(&self, name: &str) -> ParamResult<Option<&str>> {
        match present(self, name) {
            None => Ok(None),
            Some(Value::String(s)) => Ok(Some(s.as_str())),
            Some(other) => Err(ParameterValidationError::invalid_type(
                name,
                "string",
                json_type_name(other),
            )),
        }
    }

    fn optional_u64(&self, name: &str, default: u64) -> ParamResult<u64> {
        match present(self, name) {
            None => Ok(default),
            Some(v) => v.as_u64().ok_or_else(|| match v {
                Value::Number(n) => ParameterValidationError::out_of_range(
                    name,
                    n,
                    "must be a non-negative integer",
                ),
                other => ParameterValidationError::invalid_type(
                    name,
                    "integer",
                    json_type_name(other),
                ),
            }),
        }
    }

    fn optional_i64(&self, name: &str, default: i64) -> ParamResult<i64> {
        match present(self, name) {
            None => Ok(default),
            Some(v) => v.as_i64().ok_or_else(|| match v {
                Value::Number(n) => {
                    ParameterValidationError::out_of_range(name, n, "must be an integer")
                }
                other => ParameterValidationError::invalid_type(
                    name,
                    "integer",
                    json_type_name(other),
                ),
            }),
        }
    }

    fn optional_bool(&self, name: &str, default: bool) -> ParamResult<bool> {
        match present(self, name) {
            None => Ok(default),
            Some(Value::Bool(b)) => Ok(*b),
            Some(other) => Err(ParameterValidationError::invalid_type(
                name,
                "boolean",
                json_type_name(other),
            )),
        }
    }

    fn required_object(
        &self,
        name: &str,
        hint: &str,
    ) -> ParamResult<&serde_json::Map<String, Value>> {
        self.optional_object(name)?
            .ok_or_else(|| ParameterValidationError::missing(name, hint))
    }

    fn optional_object(&self, name: &str) -> ParamResult<Option<&serde_json::Map<String, Value>>> {
        match present(self, name) {
            None => Ok(None),
            Some(Value::Object(map)) => Ok(Some(map)),
            Some(other) => Err(ParameterValidationError::invalid_type(
                name,
                "object",
                json_type_name(other),
            )),
        }
    }
}

/// Validate and normalize a repository path argument.
///
/// The path must be absolute; a trailing slash is dropped.
pub fn repository_path(name: &str, value: &str) -> ParamResult<String> {
    let trimmed = value.trim();
    if !trimmed.starts_with('/') {
        return Err(ParameterValidationError::invalid_value(
            name,
            value,
            "must be an absolute repository path starting with '/'",
        ));
    }
    let normalized = trimmed.trim_end_matches('/');
    if normalized.is_empty() {
        return Err(ParameterValidationError::invalid_value(
            name,
            value,
            "the repository root is not a valid target",
        ));
    }
    Ok(normalized.to_string())
}

/// Validate a subtree a query is scoped to. Unlike [`repository_path`], the
/// root itself is allowed.
pub fn search_scope(name: &str, value: &str) -> ParamResult<String> {
    let trimmed = value.trim();
    if trimmed.starts_with('/') && trimmed.trim_end_matches('/').is_empty() {
        return Ok("/".to_string());
    }
    repository_path(name, value)
}

// ─────────────────────────────────────────────────────────────────────────────
// Tool Trait
// ─────────────────────────────────────────────────────────────────────────────

/// Trait for AEM tools.
///
/// Each tool declares its arguments as a JSON Schema and implements async
/// execution against the shared [`AemClient`].
#[async_trait]
pub trait Tool: Send + Sync {
    /// Get the unique name of this tool.
    fn name(&self) -> &str;

    /// Get a human-readable description of what this tool does.
    fn description(&self) -> &str;

    /// Get the JSON Schema for this tool's parameters.
    fn parameters(&self) -> Value;

    /// Execute the tool with the given parameters.
    async fn execute(&self, params: Value, ctx: &ToolContext) -> Result<ToolResult>;
}

// ─────────────────────────────────────────────────────────────────────────────
// Tool Context
// ─────────────────────────────────────────────────────────────────────────────

/// Context provided to tools during execution.
///
/// Holds the session shared by every invocation: one client, one credential
/// provider, one security token cache.
#[derive(Debug, Clone)]
pub struct ToolContext {
    pub client: AemClient,
}

impl ToolContext {
    pub fn new(client: AemClient) -> Self {
        Self { client }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tool Result
// ─────────────────────────────────────────────────────────────────────────────

/// Result of a tool execution.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ToolResult {
    /// Successful text output.
    Text {
        /// The text content.
        content: String,
    },
    /// Successful JSON output.
    Json {
        /// The JSON content.
        content: Value,
    },
    /// Tool execution failed.
    Error {
        /// Error message.
        message: String,
        /// Whether retrying with different arguments can help.
        recoverable: bool,
    },
}

impl ToolResult {
    /// Create a text result.
    pub fn text(content: impl Into<String>) -> Self {
        Self::Text {
            content: content.into(),
        }
    }

    /// Create a JSON result.
    pub fn json(content: Value) -> Self {
        Self::Json { content }
    }

    /// Create a recoverable error result.
    pub fn error(message: impl Into<String>) -> Self {
        Self::Error {
            message: message.into(),
            recoverable: true,
        }
    }

    /// Create a non-recoverable error result.
    pub fn fatal_error(message: impl Into<String>) -> Self {
        Self::Error {
            message: message.into(),
            recoverable: false,
        }
    }

    /// Wrap a decoded AEM payload: JSON stays structured, text stays literal.
    pub fn from_payload(payload: aem_client::Payload) -> Self {
        match payload {
            aem_client::Payload::Json(v) => Self::json(v),
            aem_client::Payload::Text(s) => Self::text(s),
        }
    }

    /// Check if this result is an error.
    pub fn is_error(&self) -> bool {
        matches!(self, Self::Error { .. })
    }

    /// Check if this result is successful.
    pub fn is_success(&self) -> bool {
        !self.is_error()
    }

    /// Get the content as text for the calling agent.
    pub fn to_llm_content(&self) -> String {
        match self {
            Self::Text { content } => content.clone(),
            Self::Json { content } => {
                serde_json::to_string_pretty(content).unwrap_or_else(|_| content.to_string())
            }
            Self::Error { message, .. } => format!("Error: {}", message),
        }
    }
}

impl From<ToolError> for ToolResult {
    fn from(err: ToolError) -> Self {
        match &err {
            ToolError::Client(e) if e.is_config() => Self::fatal_error(err.to_string()),
            _ => Self::error(err.to_string()),
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tool Registry
// ─────────────────────────────────────────────────────────────────────────────

/// Name, description and argument schema of a registered tool.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolDefinition {
    pub name: String,
    pub description: String,
    pub input_schema: Value,
}

/// Registry for managing available tools.
///
/// Each tool's argument schema is compiled once, at registration.
#[derive(Default, Clone)]
pub struct ToolRegistry {
    tools: HashMap<String, Arc<dyn Tool>>,
    validators: HashMap<String, Arc<ArgumentValidator>>,
}

impl ToolRegistry {
    /// Create a new empty registry.
    pub fn new() -> Self {
        Self {
            tools: HashMap::new(),
            validators: HashMap::new(),
        }
    }

    /// Register a tool.
    ///
    /// If a tool with the same name already exists, it will be replaced.
    pub fn register<T: Tool + 'static>(&mut self, tool: T) {
        self.register_arc(Arc::new(tool));
    }

    /// Register a tool from an Arc.
    ///
    /// A tool whose schema does not compile stays listed, but every call to
    /// it fails with [`ToolError::InvalidSchema`].
    pub fn register_arc(&mut self, tool: Arc<dyn Tool>) {
        let name = tool.name().to_string();
        match ArgumentValidator::compile(tool.parameters()) {
            Ok(validator) => {
                self.validators.insert(name.clone(), Arc::new(validator));
            }
            Err(e) => {
                tracing::error!(tool = %name, error = %e, "Tool schema does not compile");
                self.validators.remove(&name);
            }
        }
        self.tools.insert(name, tool);
    }

    /// Get a tool by name.
    pub fn get(&self, name: &str) -> Option<Arc<dyn Tool>> {
        self.tools.get(name).cloned()
    }

    /// Check if a tool exists.
    pub fn contains(&self, name: &str) -> bool {
        self.tools.contains_key(name)
    }

    /// Get all tool names, sorted.
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.tools.keys().map(|s| s.as_str()).collect();
        names.sort_unstable();
        names
    }

    /// Get the number of registered tools.
    pub fn len(&self) -> usize {
        self.tools.len()
    }

    /// Check if the registry is empty.
    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    /// Definitions of all tools, sorted by name.
    pub fn definitions(&self) -> Vec<ToolDefinition> {
        self.names()
            .into_iter()
            .filter_map(|name| self.tools.get(name))
            .map(|tool| ToolDefinition {
                name: tool.name().to_string(),
                description: tool.description().to_string(),
                input_schema: tool.parameters(),
            })
            .collect()
    }

    /// Execute a tool by name, propagating failures.
    ///
    /// Arguments are validated against the tool's schema before the tool runs,
    /// so a violation never reaches the network.
    pub async fn execute(&self, name: &str, params: Value, ctx: &ToolContext) -> Result<ToolResult> {
        let tool = self
            .get(name)
            .ok_or_else(|| ToolError::NotFound(name.to_string()))?;

        let validator = self
            .validators
            .get(name)
            .ok_or_else(|| ToolError::InvalidSchema(name.to_string()))?;

        let params = if params.is_null() {
            Value::Object(Default::default())
        } else {
            params
        };
        validator.validate(&params)?;

        tool.execute(params, ctx).await
    }

    /// Execute a tool by name and fold any failure into an error result.
    ///
    /// Never fails: callers distinguish outcomes via [`ToolResult::is_error`].
    pub async fn dispatch(&self, name: &str, params: Value, ctx: &ToolContext) -> ToolResult {
        let started = Instant::now();
        tracing::debug!(tool = %name, "Dispatching tool");

        let result = match self.execute(name, params, ctx).await {
            Ok(result) => result,
            Err(e) => {
                tracing::warn!(tool = %name, status = ?e.status(), error = %e, "Tool failed");
                ToolResult::from(e)
            }
        };

        tracing::info!(
            tool = %name,
            is_error = result.is_error(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Tool call finished"
        );
        result
    }
}

impl std::fmt::Debug for ToolRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ToolRegistry")
            .field("tools", &self.names())
            .finish()
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Mock Tool (for testing)
// ─────────────────────────────────────────────────────────────────────────────

/// A mock tool for testing.
///
/// Returns a configurable response and records the arguments it was called with.
#[cfg(test)]
#[derive(Debug)]
pub struct MockTool {
    name: String,
    parameters: Value,
    response: ToolResult,
    calls: std::sync::Mutex<Vec<Value>>,
}

#[cfg(test)]
impl MockTool {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            parameters: serde_json::json!({"type": "object", "properties": {}}),
            response: ToolResult::text("mock"),
            calls: std::sync::Mutex::new(Vec::new()),
        }
    }

    pub fn with_parameters(mut self, parameters: Value) -> Self {
        self.parameters = parameters;
        self
    }

    pub fn with_response(mut self, response: ToolResult) -> Self {
        self.response = response;
        self
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }
}

#[cfg(test)]
#[async_trait]
impl Tool for MockTool {
    fn name(&self) -> &str {
        &self.name
    }

    fn description(&self) -> &str {
        "A mock tool for testing"
    }

    fn parameters(&self) -> Value {
        self.parameters.clone()
    }

    async fn execute(&self, params: Value, _ctx: &ToolContext) -> Result<ToolResult> {
        self.calls.lock().unwrap().push(params);
        Ok(self.response.clone())
    }
}
