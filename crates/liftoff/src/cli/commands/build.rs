//! Build command - build an app for a platform with the build tool

use std::path::PathBuf;

use clap::{Args, ValueEnum};
use console::style;
use tracing::info;

use liftoff_core::Platform;

use crate::cli::{output, Cli, OutputFormat};

/// Build an app for a platform
#[derive(Debug, Args)]
pub struct BuildCommand {
    /// Project directory
    pub directory: PathBuf,

    /// Target platform
    #[arg(short, long, value_enum)]
    pub platform: PlatformArg,

    /// Extra arguments to pass to the build tool
    #[arg(last = true)]
    pub extra_args: Vec<String>,
}

/// Target platform argument
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum PlatformArg {
    /// iOS (iPhone, iPad)
    #[value(alias = "iphone", alias = "ipad")]
    Ios,
    /// Android
    Android,
    /// Windows
    Windows,
    /// Mobile web
    #[value(name = "mobileweb")]
    MobileWeb,
}

impl From<PlatformArg> for Platform {
    fn from(arg: PlatformArg) -> Self {
        match arg {
            PlatformArg::Ios => Platform::Ios,
            PlatformArg::Android => Platform::Android,
            PlatformArg::Windows => Platform::Windows,
            PlatformArg::MobileWeb => Platform::MobileWeb,
        }
    }
}

impl BuildCommand {
    /// Execute the build command
    pub fn execute(&self, cli: &Cli) -> anyhow::Result<()> {
        let platform: Platform = self.platform.into();
        info!(
            directory = %self.directory.display(),
            platform = %platform,
            extra_args = self.extra_args.len(),
            "executing build command"
        );
        let ctx = cli.context()?;

        if cli.is_text() {
            println!("{}", style("Building project...").bold());
            println!(
                "{}",
                output::key_value("Directory", &self.directory.display().to_string())
            );
            println!("{}", output::key_value("Platform", platform.as_str()));
            println!();
        }

        let runtime = tokio::runtime::Runtime::new()?;
        let build = ctx.settle(runtime.block_on(ctx.dispatcher.build_app(
            &self.directory,
            platform,
            &self.extra_args,
        )))?;

        match cli.format {
            OutputFormat::Json => {
                println!("{}", serde_json::to_string_pretty(&build)?);
            }
            OutputFormat::Text if !cli.quiet => {
                output::success(&format!(
                    "Build completed in {:.1}s",
                    build.duration.as_secs_f64()
                ));
            }
            OutputFormat::Text => {}
        }
        Ok(())
    }
}
