//! MCP (Model Context Protocol) server for the AEM tool set.
//!
//! Exposes a [`ToolRegistry`](aem_tools::ToolRegistry) over newline-delimited
//! JSON-RPC 2.0 on stdio. Supported methods: `initialize`, `ping`,
//! `tools/list`, `tools/call`, plus the `notifications/initialized`
//! notification.
//!
//! # Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use aem_mcp::McpServer;
//!
//! let server = Arc::new(McpServer::new(registry, ctx));
//! server.serve_stdio().await?;
//! ```

pub mod error;
pub mod protocol;
pub mod server;

pub use error::{McpError, Result};
pub use protocol::{
    CallToolParams, CallToolResult, InitializeResult, JsonRpcError, JsonRpcRequest,
    JsonRpcResponse, ListToolsResult, MCP_PROTOCOL_VERSION, ToolContent, ToolInfo,
};
pub use server::McpServer;
