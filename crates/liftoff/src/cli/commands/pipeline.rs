//! Pipeline command - build, serve, and test in one invocation

use std::path::{Path, PathBuf};

use clap::Args;
use tracing::{info, warn};

use liftoff_core::{BuildOutput, Capabilities, Dispatcher, LiftoffError, Platform, Result};

use super::PlatformArg;
use crate::cli::{output, Cli};

/// Build the app, start the server and a session, run the tests, then tear down
#[derive(Debug, Args)]
pub struct PipelineCommand {
    /// Project directory
    pub directory: PathBuf,

    /// Target platform
    #[arg(short, long, value_enum)]
    pub platform: PlatformArg,

    /// Test directory (defaults to <DIRECTORY>/tests)
    #[arg(long)]
    pub tests: Option<PathBuf>,

    /// Address for the automation server (defaults to the configured hostname)
    #[arg(long)]
    pub hostname: Option<String>,

    /// Port for the automation server (defaults to the configured port)
    #[arg(long)]
    pub port: Option<u16>,

    /// JSON file with session capabilities (replaces the configured ones)
    #[arg(long)]
    pub capabilities: Option<PathBuf>,

    /// Extra arguments to pass to the build tool
    #[arg(last = true)]
    pub extra_args: Vec<String>,
}

/// Everything one pipeline run needs, resolved up front
struct Plan<'a> {
    directory: &'a Path,
    platform: Platform,
    build_args: &'a [String],
    tests: PathBuf,
    hostname: String,
    port: u16,
    capabilities: Capabilities,
}

impl PipelineCommand {
    /// Execute the pipeline command
    pub fn execute(&self, cli: &Cli) -> anyhow::Result<()> {
        info!(directory = %self.directory.display(), "executing pipeline command");
        let ctx = cli.context()?;
        let automation = &ctx.config.automation;

        let capabilities = match self.capabilities {
            Some(ref path) => ctx.settle(
                std::fs::read_to_string(path)
                    .map_err(LiftoffError::from)
                    .and_then(|json| Capabilities::from_json(&json)),
            )?,
            None => automation.capabilities.clone(),
        };
        let plan = Plan {
            directory: &self.directory,
            platform: self.platform.into(),
            build_args: &self.extra_args,
            tests: self.test_directory(),
            hostname: self
                .hostname
                .clone()
                .unwrap_or_else(|| automation.hostname.clone()),
            port: self.port.unwrap_or(automation.port),
            capabilities,
        };

        let runtime = tokio::runtime::Runtime::new()?;
        let build = ctx.settle(runtime.block_on(run(&ctx.dispatcher, &plan)))?;

        if cli.is_text() {
            output::success(&format!(
                "Pipeline passed ({} build in {:.1}s)",
                build.platform,
                build.duration.as_secs_f64()
            ));
        }
        Ok(())
    }

    fn test_directory(&self) -> PathBuf {
        self.tests
            .clone()
            .unwrap_or_else(|| self.directory.join("tests"))
    }
}

/// Run every stage in order. Once the server is up it is always stopped,
/// and the first failure is the one returned.
async fn run(dispatcher: &Dispatcher, plan: &Plan<'_>) -> Result<BuildOutput> {
    dispatcher.output().banner("Building app");
    let build = dispatcher
        .build_app(plan.directory, plan.platform, plan.build_args)
        .await?;

    dispatcher.output().banner("Starting automation server");
    dispatcher
        .start_automation_server(&plan.hostname, plan.port)
        .await?;

    let tested = run_session(dispatcher, plan).await;
    let stopped = dispatcher.stop_automation_server().await;
    first_failure(tested, stopped)?;

    Ok(build)
}

async fn run_session(dispatcher: &Dispatcher, plan: &Plan<'_>) -> Result<()> {
    dispatcher.start_client(&plan.capabilities).await?;

    let tested = dispatcher.run_tests(&plan.tests).await;
    let stopped = dispatcher.stop_client().await;
    first_failure(tested, stopped)
}

fn first_failure(primary: Result<()>, cleanup: Result<()>) -> Result<()> {
    match (primary, cleanup) {
        (Err(err), Err(cleanup_err)) => {
            warn!(error = %cleanup_err, "cleanup failed after earlier error");
            Err(err)
        }
        (Err(err), Ok(())) | (Ok(()), Err(err)) => Err(err),
        (Ok(()), Ok(())) => Ok(()),
    }
}
