//! aem - AEM content tools over MCP
//!
//! Main entry point for the `aem` CLI. With no subcommand it serves MCP on stdio.

use std::path::PathBuf;

use aem_config::LoadOptions;
use anyhow::Result;
use clap::{Parser, Subcommand};

mod commands;

use commands::{call, check, serve, tools};

// ─────────────────────────────────────────────────────────────────────────────
// CLI Structure
// ─────────────────────────────────────────────────────────────────────────────

/// AEM content tools - MCP server and command-line client
#[derive(Parser)]
#[command(name = "aem")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Explicit configuration file (highest precedence file layer)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// AEM instance base URL (overrides configuration files)
    #[arg(long, global = true, env = "AEM_BASE_URL")]
    pub base_url: Option<String>,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Serve the tools over MCP on stdin/stdout (default)
    Serve(serve::ServeArgs),

    /// List available tools
    Tools(tools::ToolsArgs),

    /// Invoke a single tool and print its result
    Call(call::CallArgs),

    /// Check connectivity and credentials
    Check(check::CheckArgs),
}

// ─────────────────────────────────────────────────────────────────────────────
// Main
// ─────────────────────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // stdout carries MCP traffic, so the console layer writes to stderr.
    let filter = if cli.verbose {
        "aem=debug,aem_mcp=debug,aem_tools=debug,aem_client=debug,aem_auth=debug,aem_config=debug,warn"
    } else {
        "aem=info,aem_mcp=info,aem_tools=info,aem_client=warn,aem_auth=warn,aem_config=warn,warn"
    };

    let log_dir = aem_config::xdg_config_dir()
        .map(|d| d.join("logs"))
        .unwrap_or_else(|| PathBuf::from("logs"));
    let file_appender = tracing_appender::rolling::daily(&log_dir, "aem-mcp.log");
    let (non_blocking, _guard) = tracing_appender::non_blocking(file_appender);

    use tracing_subscriber::prelude::*;
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(true)
                .with_writer(std::io::stderr)
                .with_filter(tracing_subscriber::EnvFilter::new(filter)),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .json()
                .with_writer(non_blocking)
                .with_filter(tracing_subscriber::EnvFilter::new(
                    "aem=trace,aem_mcp=trace,aem_tools=trace,aem_client=trace,aem_auth=trace,aem_config=trace,info",
                )),
        )
        .init();

    let loaded = aem_config::load_config_with_options(&LoadOptions {
        explicit_file: cli.config.clone(),
        ..Default::default()
    })?;

    let mut config = loaded.config;
    if let Some(url) = cli.base_url.filter(|u| !u.is_empty()) {
        config.server.base_url = Some(url);
    }

    let ctx = commands::Context { config };

    match cli.command {
        None => serve::run(serve::ServeArgs::default(), &ctx).await,
        Some(Commands::Serve(args)) => serve::run(args, &ctx).await,
        Some(Commands::Tools(args)) => tools::run(args, &ctx).await,
        Some(Commands::Call(args)) => call::run(args, &ctx).await,
        Some(Commands::Check(args)) => check::run(args, &ctx).await,
    }
}
