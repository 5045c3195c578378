//! Client command - start and stop the automation client session

use std::path::PathBuf;

use clap::{Args, Subcommand};
use serde_json::Value;
use tracing::{debug, info};

use liftoff_core::Capabilities;

use crate::cli::{output, Cli};

/// Start or stop the automation client session
#[derive(Debug, Args)]
pub struct ClientCommand {
    #[command(subcommand)]
    pub action: ClientAction,
}

#[derive(Debug, Subcommand)]
pub enum ClientAction {
    /// Open a session on the running automation server
    Start(StartArgs),

    /// Close the active session
    Stop,
}

#[derive(Debug, Args)]
pub struct StartArgs {
    /// JSON file with session capabilities (replaces the configured ones)
    #[arg(long)]
    pub capabilities: Option<PathBuf>,

    /// Single capability as NAME=VALUE; VALUE is parsed as JSON when it can be
    #[arg(long = "capability", value_name = "NAME=VALUE", value_parser = parse_capability)]
    pub overrides: Vec<(String, Value)>,
}

fn parse_capability(raw: &str) -> Result<(String, Value), String> {
    let (name, value) = raw
        .split_once('=')
        .ok_or_else(|| format!("expected NAME=VALUE, got '{}'", raw))?;
    if name.is_empty() {
        return Err("capability name is empty".to_string());
    }
    let value = serde_json::from_str(value).unwrap_or_else(|_| Value::String(value.to_string()));
    Ok((name.to_string(), value))
}

impl StartArgs {
    /// Capabilities from the file or config, with overrides applied on top
    fn resolve(&self, configured: &Capabilities) -> liftoff_core::Result<Capabilities> {
        let mut capabilities = match self.capabilities {
            Some(ref path) => {
                debug!(path = %path.display(), "reading capabilities file");
                Capabilities::from_json(&std::fs::read_to_string(path)?)?
            }
            None => configured.clone(),
        };
        for (name, value) in &self.overrides {
            capabilities = capabilities.with(name.clone(), value.clone());
        }
        Ok(capabilities)
    }
}

impl ClientCommand {
    /// Execute the client command
    pub fn execute(&self, cli: &Cli) -> anyhow::Result<()> {
        let ctx = cli.context()?;
        let runtime = tokio::runtime::Runtime::new()?;

        match &self.action {
            ClientAction::Start(args) => {
                let capabilities = ctx.settle(args.resolve(&ctx.config.automation.capabilities))?;
                info!(count = capabilities.0.len(), "executing client start");

                ctx.settle(runtime.block_on(ctx.dispatcher.start_client(&capabilities)))?;
                if cli.is_text() {
                    output::success("Client session started");
                }
            }
            ClientAction::Stop => {
                info!("executing client stop");
                ctx.settle(runtime.block_on(ctx.dispatcher.stop_client()))?;
                if cli.is_text() {
                    output::success("Client session stopped");
                }
            }
        }
        Ok(())
    }
}
