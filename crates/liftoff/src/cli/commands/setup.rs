//! Setup command - log in and install the build tool CLI and SDK

use clap::Args;
use console::Term;
use dialoguer::Password;
use tracing::info;

use liftoff_core::config::BuildToolConfig;

use crate::cli::{output, Cli};

/// Log in and install the build tool CLI and SDK
#[derive(Debug, Args)]
pub struct SetupCommand {
    /// Account username (overrides config and APPC_USERNAME)
    #[arg(short, long)]
    pub username: Option<String>,

    /// Organization id to log in under
    #[arg(long)]
    pub org_id: Option<String>,

    /// CLI core version to install
    #[arg(long)]
    pub cli_version: Option<String>,

    /// SDK version to install
    #[arg(long)]
    pub sdk_version: Option<String>,

    /// Never prompt for a missing password
    #[arg(long)]
    pub no_prompt: bool,
}

impl SetupCommand {
    /// Execute the setup command
    pub fn execute(&self, cli: &Cli) -> anyhow::Result<()> {
        info!(no_prompt = self.no_prompt, "executing setup command");
        let ctx = cli.context()?;
        let mut config = self.apply(ctx.config.build.clone());

        if config.password.is_none() && !self.no_prompt && Term::stderr().is_term() {
            let user = config.username.clone().unwrap_or_default();
            let password = Password::new()
                .with_prompt(format!("Password for {}", user))
                .interact()?;
            config.password = Some(password);
        }

        let runtime = tokio::runtime::Runtime::new()?;
        ctx.settle(runtime.block_on(ctx.dispatcher.setup_environment(&config)))?;

        if cli.is_text() {
            output::success(&format!(
                "Environment ready (cli {}, sdk {})",
                config.cli_version, config.sdk_version
            ));
        }
        Ok(())
    }

    /// Layer command-line flags over the configured build tool settings
    fn apply(&self, mut config: BuildToolConfig) -> BuildToolConfig {
        if let Some(ref username) = self.username {
            config.username = Some(username.clone());
        }
        if let Some(ref org_id) = self.org_id {
            config.org_id = Some(org_id.clone());
        }
        if let Some(ref version) = self.cli_version {
            config.cli_version = version.clone();
        }
        if let Some(ref version) = self.sdk_version {
            config.sdk_version = version.clone();
        }
        config
    }
}
