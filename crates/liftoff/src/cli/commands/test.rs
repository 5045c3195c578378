//! Test command - collect and run the tests in a directory

use std::path::PathBuf;

use clap::Args;
use tracing::info;

use liftoff_core::config::TestConfig;

use crate::cli::{output, Cli};

/// Run the tests in a directory
#[derive(Debug, Args)]
pub struct TestCommand {
    /// Directory to collect test files from
    pub directory: PathBuf,

    /// Mocha reporter (overrides config)
    #[arg(long)]
    pub reporter: Option<String>,

    /// Per-test timeout in milliseconds (overrides config)
    #[arg(long)]
    pub timeout: Option<u64>,

    /// Stop after the first failure
    #[arg(long)]
    pub bail: bool,
}

impl TestCommand {
    /// Execute the test command
    pub fn execute(&self, cli: &Cli) -> anyhow::Result<()> {
        info!(directory = %self.directory.display(), "executing test command");
        let ctx = cli.context_with(|config| self.apply(&mut config.tests))?;

        let runtime = tokio::runtime::Runtime::new()?;
        ctx.settle(runtime.block_on(ctx.dispatcher.run_tests(&self.directory)))?;

        if cli.is_text() {
            output::success("All tests passed");
        }
        Ok(())
    }

    fn apply(&self, tests: &mut TestConfig) {
        if let Some(ref reporter) = self.reporter {
            tests.reporter = reporter.clone();
        }
        if self.timeout.is_some() {
            tests.timeout_ms = self.timeout;
        }
        tests.bail |= self.bail;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flags_override_test_config() {
        let cmd = TestCommand {
            directory: PathBuf::from("tests"),
            reporter: Some("dot".to_string()),
            timeout: Some(60000),
            bail: false,
        };
        let mut config = TestConfig {
            bail: true,
            ..Default::default()
        };

        cmd.apply(&mut config);
        assert_eq!(config.reporter, "dot");
        assert_eq!(config.timeout_ms, Some(60000));
        assert!(config.bail);
    }
}
