//! App path command - prepare the artifact location for an app

use std::path::PathBuf;

use clap::Args;
use tracing::info;

use liftoff_adapters::appc::app_path;
use liftoff_core::Platform;

use super::PlatformArg;
use crate::cli::{output, Cli, OutputFormat};

/// Prepare the artifact path for an app
#[derive(Debug, Args)]
pub struct AppPathCommand {
    /// Project directory
    pub directory: PathBuf,

    /// Target platform
    #[arg(short, long, value_enum)]
    pub platform: PlatformArg,

    /// App name
    #[arg(short, long)]
    pub name: String,
}

impl AppPathCommand {
    /// Execute the app-path command
    pub fn execute(&self, cli: &Cli) -> anyhow::Result<()> {
        let platform: Platform = self.platform.into();
        info!(
            directory = %self.directory.display(),
            platform = %platform,
            name = %self.name,
            "executing app-path command"
        );
        let ctx = cli.context()?;

        let runtime = tokio::runtime::Runtime::new()?;
        ctx.settle(runtime.block_on(ctx.dispatcher.create_app_path(
            &self.directory,
            platform,
            &self.name,
        )))?;

        // the dispatcher only logs the path, so derive it again for display
        let path = ctx.settle(self.artifact_path())?;
        match cli.format {
            OutputFormat::Json => {
                println!("{}", serde_json::json!({ "path": path.display().to_string() }));
            }
            OutputFormat::Text if !cli.quiet => {
                output::success(&format!(
                    "App path ready: {}",
                    output::path_style().apply_to(path.display())
                ));
            }
            OutputFormat::Text => {}
        }
        Ok(())
    }

    fn artifact_path(&self) -> liftoff_core::Result<PathBuf> {
        app_path(&self.directory, self.platform.into(), &self.name)
    }
}
