//! Collaborator traits
//!
//! The dispatcher only talks to these interfaces. Production implementations
//! live in `liftoff-adapters`; tests substitute recording doubles.

use std::path::{Path, PathBuf};

use async_trait::async_trait;

use crate::config::BuildToolConfig;
use crate::error::Result;
use crate::types::{BuildOutput, Capabilities, LoginMode, Platform, TestFile};

/// Mobile app build/deployment tool
#[async_trait]
pub trait BuildTool: Send + Sync {
    /// Authenticate against the given environment
    async fn login(&self, config: &BuildToolConfig, mode: LoginMode) -> Result<()>;

    /// Install the tool's CLI core
    async fn install_cli(&self, config: &BuildToolConfig) -> Result<()>;

    /// Install the platform SDK
    async fn install_sdk(&self, config: &BuildToolConfig) -> Result<()>;

    /// Build the project in `dir` for `platform`
    async fn build(&self, dir: &Path, platform: Platform, args: &[String]) -> Result<BuildOutput>;

    /// Run the tool with arbitrary arguments
    async fn runner(&self, args: &[String]) -> Result<()>;

    /// Compute (and prepare) the location of the built app
    async fn create_app_path(&self, dir: &Path, platform: Platform, app_name: &str)
        -> Result<PathBuf>;
}

/// Mobile automation server and its WebDriver client
#[async_trait]
pub trait AutomationServer: Send + Sync {
    /// Launch the server bound to `hostname:port`
    async fn run_server(&self, hostname: &str, port: u16) -> Result<()>;

    /// Terminate the running server
    async fn quit_server(&self) -> Result<()>;

    /// Open a client session
    async fn start_client(&self, capabilities: &Capabilities) -> Result<()>;

    /// Close the active client session
    async fn stop_client(&self) -> Result<()>;
}

/// Test discovery and execution library
#[async_trait]
pub trait TestSuite: Send + Sync {
    /// Enumerate the tests under `dir`
    async fn collect_tests(&self, dir: &Path) -> Result<Vec<TestFile>>;

    /// Execute previously collected tests
    async fn run(&self, tests: &[TestFile]) -> Result<()>;
}
