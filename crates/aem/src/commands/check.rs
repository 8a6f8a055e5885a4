//! Check command - connectivity diagnostics.

use aem_tools::tools::check_connection;
use anyhow::{Result, bail};
use clap::Args;

use super::Context;

/// Arguments for the check command.
#[derive(Args, Debug)]
pub struct CheckArgs {
    /// Print the report as JSON
    #[arg(long)]
    pub json: bool,
}

/// Run the check command.
pub async fn run(args: CheckArgs, ctx: &Context) -> Result<()> {
    let (_, tool_ctx) = ctx.session()?;
    let report = check_connection(&tool_ctx.client).await;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        println!(
            "AEM {} (auth: {})",
            report.base_url.as_deref().unwrap_or("<no base URL>"),
            report.auth_mode
        );
        for check in &report.checks {
            let mark = if check.ok { "ok  " } else { "FAIL" };
            match &check.error {
                Some(error) => println!("  {} {:14} {}", mark, check.name, error),
                None => println!("  {} {:14} {}", mark, check.name, check.endpoint),
            }
        }
    }

    if !report.healthy {
        bail!("connection check failed");
    }
    Ok(())
}
