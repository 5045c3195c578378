//! CLI definition and command handling

pub mod commands;
pub mod output;

use std::fmt;
use std::path::PathBuf;
use std::sync::{Arc, OnceLock};

use clap::{Parser, Subcommand};
use tracing::{debug, info};

use liftoff_core::config::{load_config, load_config_or_default, Config};
use liftoff_core::{ConsoleOutput, Dispatcher, Output, Terminator};

use crate::exit_codes;
use commands::{
    AppPathCommand, AppcCommand, BuildCommand, ClientCommand, CompletionsCommand, DoctorCommand,
    InitCommand, PipelineCommand, ServerCommand, SetupCommand, TestCommand,
};

/// Liftoff - build, automate and test mobile apps from one place
#[derive(Debug, Parser)]
#[command(name = "liftoff")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Suppress output except errors
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Output format
    #[arg(long, global = true, default_value = "text")]
    pub format: OutputFormat,

    /// Working directory
    #[arg(short = 'C', long, global = true)]
    pub directory: Option<PathBuf>,

    /// Configuration file (searched for from the working directory by default)
    #[arg(long, global = true, env = "LIFTOFF_CONFIG")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

/// Output format for CLI
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    /// Human-readable text output
    #[default]
    Text,
    /// JSON output
    Json,
}

/// Available commands
#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Log in and install the build tool CLI and SDK
    Setup(SetupCommand),

    /// Start or stop the automation server
    Server(ServerCommand),

    /// Run the tests in a directory
    Test(TestCommand),

    /// Build an app for a platform
    Build(BuildCommand),

    /// Start or stop the automation client session
    Client(ClientCommand),

    /// Pass arguments straight through to the build tool
    Appc(AppcCommand),

    /// Prepare the artifact path for an app
    AppPath(AppPathCommand),

    /// Build, serve, and test in one go
    Pipeline(PipelineCommand),

    /// Check that the required tools are installed
    Doctor(DoctorCommand),

    /// Initialize a new Liftoff configuration
    Init(InitCommand),

    /// Generate shell completions
    Completions(CompletionsCommand),
}

impl Cli {
    /// Execute the CLI command
    pub fn execute(self) -> anyhow::Result<()> {
        // Change to specified directory if provided
        if let Some(dir) = &self.directory {
            std::env::set_current_dir(dir)?;
        }

        match self.command {
            Commands::Setup(ref cmd) => cmd.execute(&self),
            Commands::Server(ref cmd) => cmd.execute(&self),
            Commands::Test(ref cmd) => cmd.execute(&self),
            Commands::Build(ref cmd) => cmd.execute(&self),
            Commands::Client(ref cmd) => cmd.execute(&self),
            Commands::Appc(ref cmd) => cmd.execute(&self),
            Commands::AppPath(ref cmd) => cmd.execute(&self),
            Commands::Pipeline(ref cmd) => cmd.execute(&self),
            Commands::Doctor(ref cmd) => cmd.execute(&self),
            Commands::Init(ref cmd) => cmd.execute(&self),
            Commands::Completions(ref cmd) => cmd.execute(&self),
        }
    }

    /// Whether human-readable progress should be printed
    pub fn is_text(&self) -> bool {
        !self.quiet && self.format == OutputFormat::Text
    }

    /// Load configuration and wire a dispatcher over the real tools.
    ///
    /// A config file that fails to load is reported like any other
    /// operation failure and comes back as [`Reported`].
    pub fn context(&self) -> anyhow::Result<Context> {
        self.context_with(|_| {})
    }

    /// Like [`Cli::context`], adjusting the loaded config before wiring
    pub fn context_with(&self, adjust: impl FnOnce(&mut Config)) -> anyhow::Result<Context> {
        let output: Arc<dyn Output> = Arc::new(ConsoleOutput::new().quiet(!self.is_text()));

        let loaded = match &self.config {
            Some(path) => load_config(path).map(|config| (config, Some(path.clone()))),
            None => load_config_or_default(&std::env::current_dir()?),
        };
        let (config, config_path) = settle_with(output.as_ref(), loaded)?;
        let mut config = config.with_env_overrides();
        adjust(&mut config);

        match &config_path {
            Some(path) => info!(path = %path.display(), "loaded configuration"),
            None => debug!("using default configuration"),
        }

        let dispatcher = liftoff_adapters::dispatcher(&config, output);
        Ok(Context {
            config,
            config_path,
            dispatcher,
        })
    }
}

/// Loaded configuration plus the dispatcher built from it
pub struct Context {
    pub config: Config,
    pub config_path: Option<PathBuf>,
    pub dispatcher: Dispatcher,
}

impl Context {
    /// Report a failed operation and turn it into [`Reported`]; pass successes through
    pub fn settle<T>(&self, result: liftoff_core::Result<T>) -> anyhow::Result<T> {
        settle_with(self.dispatcher.output().as_ref(), result)
    }
}

/// A failure that has already been shown to the user.
///
/// `main` exits with `code` once logs are flushed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Reported {
    pub code: i32,
}

impl fmt::Display for Reported {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "operation failed (exit code {})", self.code)
    }
}

impl std::error::Error for Reported {}

/// Remembers the exit code instead of ending the process
#[derive(Debug, Default)]
struct DeferredExit(OnceLock<i32>);

impl Terminator for DeferredExit {
    fn terminate(&self, code: i32) {
        let _ = self.0.set(code);
    }
}

fn settle_with<T>(output: &dyn Output, result: liftoff_core::Result<T>) -> anyhow::Result<T> {
    let exit = DeferredExit::default();
    liftoff_core::settle(result, output, &exit).ok_or_else(|| {
        let code = exit.0.get().copied().unwrap_or(exit_codes::ERROR);
        Reported { code }.into()
    })
}

/// Exit code for a failed command, printing it unless it was already reported
pub fn failure_code(err: &anyhow::Error) -> i32 {
    if let Some(reported) = err.downcast_ref::<Reported>() {
        return reported.code;
    }
    tracing::debug!(error = %err, "command failed");
    output::error(&format!("{:#}", err));
    exit_codes::ERROR
}
