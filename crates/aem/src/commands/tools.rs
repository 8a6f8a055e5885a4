//! Tools command - lists registered tools.

use aem_tools::ToolRegistry;
use anyhow::Result;
use clap::Args;

use super::Context;

/// Arguments for the tools command.
#[derive(Args, Debug)]
pub struct ToolsArgs {
    /// Print full definitions, including argument schemas, as JSON
    #[arg(long)]
    pub schema: bool,
}

/// Run the tools command.
pub async fn run(args: ToolsArgs, _ctx: &Context) -> Result<()> {
    let registry = ToolRegistry::with_aem_tools();

    if args.schema {
        println!("{}", serde_json::to_string_pretty(&registry.definitions())?);
        return Ok(());
    }

    let definitions = registry.definitions();
    let width = definitions.iter().map(|d| d.name.len()).max().unwrap_or(0);
    for def in definitions {
        let summary = def.description.split(". ").next().unwrap_or_default();
        println!("{:width$}  {}", def.name, summary, width = width);
    }
    Ok(())
}
