//! Server command - start and stop the automation server

use clap::{Args, Subcommand};
use tracing::info;

use liftoff_adapters::appium::endpoint_for;

use crate::cli::{output, Cli};

/// Start or stop the automation server
#[derive(Debug, Args)]
pub struct ServerCommand {
    #[command(subcommand)]
    pub action: ServerAction,
}

#[derive(Debug, Subcommand)]
pub enum ServerAction {
    /// Start the server and wait until it answers
    Start(StartArgs),

    /// Stop the running server
    Stop,
}

#[derive(Debug, Args)]
pub struct StartArgs {
    /// Address to bind (defaults to the configured hostname)
    #[arg(long)]
    pub hostname: Option<String>,

    /// Port to listen on (defaults to the configured port)
    #[arg(short, long)]
    pub port: Option<u16>,

    /// Keep running until Ctrl-C, then stop the server
    #[arg(long)]
    pub foreground: bool,
}

impl ServerCommand {
    /// Execute the server command
    pub fn execute(&self, cli: &Cli) -> anyhow::Result<()> {
        let runtime = tokio::runtime::Runtime::new()?;
        match &self.action {
            ServerAction::Start(args) => runtime.block_on(args.start(cli)),
            ServerAction::Stop => runtime.block_on(stop(cli)),
        }
    }
}

impl StartArgs {
    async fn start(&self, cli: &Cli) -> anyhow::Result<()> {
        let ctx = cli.context()?;
        let hostname = self
            .hostname
            .clone()
            .unwrap_or_else(|| ctx.config.automation.hostname.clone());
        let port = self.port.unwrap_or(ctx.config.automation.port);
        info!(hostname, port, foreground = self.foreground, "executing server start");

        ctx.settle(
            ctx.dispatcher
                .start_automation_server(&hostname, port)
                .await,
        )?;

        if cli.is_text() {
            output::success(&format!(
                "Automation server listening on {}",
                output::path_style().apply_to(endpoint_for(&hostname, port))
            ));
        }

        if !self.foreground {
            return Ok(());
        }

        if cli.is_text() {
            output::info("Press Ctrl-C to stop");
        }
        tokio::signal::ctrl_c().await?;
        info!("interrupt received, stopping server");

        ctx.settle(ctx.dispatcher.stop_automation_server().await)?;
        if cli.is_text() {
            output::success("Automation server stopped");
        }
        Ok(())
    }
}

async fn stop(cli: &Cli) -> anyhow::Result<()> {
    info!("executing server stop");
    let ctx = cli.context()?;
    ctx.settle(ctx.dispatcher.stop_automation_server().await)?;

    if cli.is_text() {
        output::success("Automation server stopped");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    #[test]
    fn test_parse_start_flags() {
        let cli = Cli::try_parse_from([
            "liftoff",
            "server",
            "start",
            "--hostname",
            "0.0.0.0",
            "--port",
            "4724",
            "--foreground",
        ])
        .unwrap();

        let crate::cli::Commands::Server(cmd) = cli.command else {
            panic!("expected server command");
        };
        let ServerAction::Start(args) = cmd.action else {
            panic!("expected start");
        };
        assert_eq!(args.hostname.as_deref(), Some("0.0.0.0"));
        assert_eq!(args.port, Some(4724));
        assert!(args.foreground);
    }
}
