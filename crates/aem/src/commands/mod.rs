//! CLI command handlers.

pub mod call;
pub mod check;
pub mod serve;
pub mod tools;

use aem_client::AemClient;
use aem_config::AemConfig;
use aem_tools::{ToolContext, ToolRegistry};
use anyhow::Result;

/// Shared context for all commands.
#[derive(Debug, Clone)]
pub struct Context {
    /// Fully merged configuration (files, environment, flags).
    pub config: AemConfig,
}

impl Context {
    /// Build the registry and the single shared session every command runs against.
    pub fn session(&self) -> Result<(ToolRegistry, ToolContext)> {
        let client = AemClient::from_config(&self.config)?;
        Ok((ToolRegistry::with_aem_tools(), ToolContext::new(client)))
    }
}
