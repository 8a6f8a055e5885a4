//! Serve command - runs the MCP server on stdio.

use std::sync::Arc;

use aem_mcp::McpServer;
use anyhow::Result;
use clap::Args;

use super::Context;

/// Arguments for the serve command.
#[derive(Args, Debug, Default)]
pub struct ServeArgs {}

/// Run the serve command. Returns when stdin closes.
pub async fn run(_args: ServeArgs, ctx: &Context) -> Result<()> {
    let (registry, tool_ctx) = ctx.session()?;

    match tool_ctx.client.base_url() {
        Some(url) => tracing::info!(base_url = %url, auth = %tool_ctx.client.auth_mode(), "Starting MCP server"),
        None => tracing::warn!("No AEM base URL configured, every tool call will fail until AEM_BASE_URL is set"),
    }

    let server = Arc::new(McpServer::new(registry, tool_ctx));
    server.serve_stdio().await?;

    tracing::info!("MCP server stopped");
    Ok(())
}
