//! Appc command - pass arguments straight through to the build tool

use clap::Args;
use tracing::info;

use crate::cli::Cli;

/// Pass arguments straight through to the build tool
#[derive(Debug, Args)]
pub struct AppcCommand {
    /// Arguments for the build tool, forwarded unmodified
    #[arg(trailing_var_arg = true, allow_hyphen_values = true, required = true)]
    pub args: Vec<String>,
}

impl AppcCommand {
    /// Execute the appc command
    pub fn execute(&self, cli: &Cli) -> anyhow::Result<()> {
        info!(arg_count = self.args.len(), "executing appc command");
        let ctx = cli.context()?;

        let runtime = tokio::runtime::Runtime::new()?;
        ctx.settle(runtime.block_on(ctx.dispatcher.run_build_tool(&self.args)))
    }
}
