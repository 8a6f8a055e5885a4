//! MCP server loop.
//!
//! Reads one JSON-RPC message per line, answers requests on the same stream.
//! Every request runs on its own task so slow tool calls never block the
//! reader; responses funnel through a channel to a single writer so lines
//! are never interleaved.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use aem_tools::{ToolContext, ToolRegistry};
use serde_json::{Value, json};
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt, BufReader};
use tokio::sync::mpsc;

use crate::error::{McpError, Result};
use crate::protocol::{
    CallToolParams, CallToolResult, InitializeResult, JsonRpcError, JsonRpcRequest,
    JsonRpcResponse, ListToolsResult, ToolInfo,
};

/// Serves the tool registry to a single MCP client.
pub struct McpServer {
    registry: ToolRegistry,
    ctx: ToolContext,
    initialized: AtomicBool,
}

impl McpServer {
    pub fn new(registry: ToolRegistry, ctx: ToolContext) -> Self {
        Self {
            registry,
            ctx,
            initialized: AtomicBool::new(false),
        }
    }

    /// Whether the client has sent `notifications/initialized`.
    pub fn is_initialized(&self) -> bool {
        self.initialized.load(Ordering::Acquire)
    }

    pub fn registry(&self) -> &ToolRegistry {
        &self.registry
    }

    /// Handle one raw message. Returns `None` for notifications.
    pub async fn handle_message(&self, raw: &str) -> Option<JsonRpcResponse> {
        let value: Value = match serde_json::from_str(raw) {
            Ok(v) => v,
            Err(e) => {
                tracing::warn!(error = %e, "Unparsable MCP message");
                return Some(JsonRpcResponse::failure(
                    Value::Null,
                    JsonRpcError::parse_error(e),
                ));
            }
        };

        let id = value.get("id").cloned();
        let request: JsonRpcRequest = match serde_json::from_value(value) {
            Ok(r) => r,
            Err(e) => {
                return Some(JsonRpcResponse::failure(
                    id.unwrap_or(Value::Null),
                    JsonRpcError::invalid_request(e),
                ));
            }
        };

        match request.id.clone() {
            None => {
                self.handle_notification(&request);
                None
            }
            Some(id) => Some(self.handle_request(id, request).await),
        }
    }

    fn handle_notification(&self, request: &JsonRpcRequest) {
        match request.method.as_str() {
            "notifications/initialized" => {
                self.initialized.store(true, Ordering::Release);
                tracing::info!("MCP client initialized");
            }
            other => tracing::debug!(method = %other, "Ignoring notification"),
        }
    }

    async fn handle_request(&self, id: Value, request: JsonRpcRequest) -> JsonRpcResponse {
        tracing::debug!(method = %request.method, id = %id, "MCP request");

        let outcome = match request.method.as_str() {
            "initialize" => to_result(&InitializeResult::default()),
            "ping" => Ok(json!({})),
            "tools/list" => to_result(&ListToolsResult {
                tools: self
                    .registry
                    .definitions()
                    .into_iter()
                    .map(ToolInfo::from)
                    .collect(),
            }),
            "tools/call" => self.call_tool(request.params).await,
            other => Err(JsonRpcError::method_not_found(other)),
        };

        match outcome {
            Ok(result) => JsonRpcResponse::success(id, result),
            Err(error) => JsonRpcResponse::failure(id, error),
        }
    }

    async fn call_tool(&self, params: Option<Value>) -> std::result::Result<Value, JsonRpcError> {
        let params: CallToolParams = params
            .ok_or_else(|| JsonRpcError::invalid_params("missing params"))
            .and_then(|p| serde_json::from_value(p).map_err(JsonRpcError::invalid_params))?;

        let arguments = params.arguments.unwrap_or_else(|| json!({}));
        let result = self
            .registry
            .dispatch(&params.name, arguments, &self.ctx)
            .await;

        to_result(&CallToolResult::from(result))
    }

    /// Serve until the reader reaches EOF, then wait for in-flight calls.
    pub async fn serve<R, W>(self: Arc<Self>, reader: R, mut writer: W) -> Result<()>
    where
        R: AsyncBufRead + Unpin,
        W: AsyncWrite + Unpin + Send + 'static,
    {
        let (tx, mut rx) = mpsc::unbounded_channel::<String>();

        let writer_task = tokio::spawn(async move {
            while let Some(line) = rx.recv().await {
                writer.write_all(line.as_bytes()).await?;
                writer.write_all(b"\n").await?;
                writer.flush().await?;
            }
            Ok::<(), std::io::Error>(())
        });

        let mut lines = reader.lines();
        while let Some(line) = lines.next_line().await? {
            if line.trim().is_empty() {
                continue;
            }

            let server = Arc::clone(&self);
            let tx = tx.clone();
            tokio::spawn(async move {
                let Some(response) = server.handle_message(&line).await else {
                    return;
                };
                match serde_json::to_string(&response) {
                    Ok(json) => {
                        if tx.send(json).is_err() {
                            tracing::warn!("Response dropped, writer closed");
                        }
                    }
                    Err(e) => tracing::error!(error = %e, "Failed to serialize response"),
                }
            });
        }

        tracing::info!("MCP input closed, draining in-flight requests");
        drop(tx);
        writer_task.await.map_err(|_| McpError::ConnectionClosed)??;
        Ok(())
    }

    /// Serve over the process's stdin and stdout.
    pub async fn serve_stdio(self: Arc<Self>) -> Result<()> {
        tracing::info!(tools = self.registry.len(), "MCP server listening on stdio");
        self.serve(BufReader::new(tokio::io::stdin()), tokio::io::stdout())
            .await
    }
}

fn to_result<T: serde::Serialize>(value: &T) -> std::result::Result<Value, JsonRpcError> {
    serde_json::to_value(value)
        .map_err(|e| JsonRpcError::new(JsonRpcError::INTERNAL_ERROR, e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use aem_client::AemClient;

    fn server() -> McpServer {
        let client = AemClient::builder().build().unwrap();
        McpServer::new(ToolRegistry::with_aem_tools(), ToolContext::new(client))
    }

    #[tokio::test]
    async fn test_parse_error() {
        let response = server().handle_message("{not json").await.unwrap();
        assert_eq!(response.id, Value::Null);
        assert_eq!(response.error.unwrap().code, JsonRpcError::PARSE_ERROR);
    }

    #[tokio::test]
    async fn test_invalid_request_keeps_id() {
        let response = server()
            .handle_message(r#"{"jsonrpc":"2.0","id":4,"method":12}"#)
            .await
            .unwrap();
        assert_eq!(response.id, json!(4));
        assert_eq!(response.error.unwrap().code, JsonRpcError::INVALID_REQUEST);
    }

    #[tokio::test]
    async fn test_unknown_method() {
        let response = server()
            .handle_message(r#"{"jsonrpc":"2.0","id":1,"method":"resources/list"}"#)
            .await
            .unwrap();
        assert_eq!(response.error.unwrap().code, JsonRpcError::METHOD_NOT_FOUND);
    }

    #[tokio::test]
    async fn test_initialized_notification() {
        let server = server();
        assert!(!server.is_initialized());
        let response = server
            .handle_message(r#"{"jsonrpc":"2.0","method":"notifications/initialized"}"#)
            .await;
        assert!(response.is_none());
        assert!(server.is_initialized());
    }

    #[tokio::test]
    async fn test_tools_list() {
        let response = server()
            .handle_message(r#"{"jsonrpc":"2.0","id":"t","method":"tools/list"}"#)
            .await
            .unwrap();
        let tools = response.result.unwrap()["tools"].as_array().unwrap().clone();
        assert_eq!(tools.len(), 16);
        assert!(tools.iter().all(|t| t["inputSchema"]["type"] == "object"));
    }

    #[tokio::test]
    async fn test_tools_call_without_params() {
        let response = server()
            .handle_message(r#"{"jsonrpc":"2.0","id":2,"method":"tools/call"}"#)
            .await
            .unwrap();
        assert_eq!(response.error.unwrap().code, JsonRpcError::INVALID_PARAMS);
    }

    #[tokio::test]
    async fn test_unknown_tool_is_error_content() {
        let response = server()
            .handle_message(
                r#"{"jsonrpc":"2.0","id":3,"method":"tools/call","params":{"name":"aem_nope"}}"#,
            )
            .await
            .unwrap();
        let result = response.result.unwrap();
        assert_eq!(result["isError"], true);
        assert!(
            result["content"][0]["text"]
                .as_str()
                .unwrap()
                .contains("Unknown tool: aem_nope")
        );
    }
}
