//! Call command - one-shot tool invocation.

use anyhow::{Context as _, Result, bail};
use clap::Args;
use serde_json::Value;

use super::Context;

/// Arguments for the call command.
#[derive(Args, Debug)]
pub struct CallArgs {
    /// Tool name (see `aem tools`)
    pub tool: String,

    /// Tool arguments as a JSON object
    #[arg(short, long, default_value = "{}")]
    pub args: String,
}

/// Run the call command. Prints the result envelope and fails when it is an error.
pub async fn run(args: CallArgs, ctx: &Context) -> Result<()> {
    let params: Value = serde_json::from_str(&args.args)
        .with_context(|| format!("--args is not valid JSON: {}", args.args))?;

    let (registry, tool_ctx) = ctx.session()?;
    let result = registry.dispatch(&args.tool, params, &tool_ctx).await;

    println!("{}", serde_json::to_string_pretty(&result)?);

    if result.is_error() {
        bail!("{} failed", args.tool);
    }
    Ok(())
}
