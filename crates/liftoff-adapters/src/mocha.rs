//! Mocha test collection and execution

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use globset::{Glob, GlobSet, GlobSetBuilder};
use tracing::{debug, info, instrument};
use walkdir::WalkDir;

use liftoff_core::config::TestConfig;
use liftoff_core::{Result, TestError, TestFile, TestSuite};

use crate::process::{OutputMode, ToolCommand};

/// Collects test files by glob and runs them with mocha
#[derive(Debug, Clone)]
pub struct MochaRunner {
    config: TestConfig,
}

impl MochaRunner {
    pub fn new(config: TestConfig) -> Self {
        Self { config }
    }

    /// Command line that runs `tests`
    pub fn command_for(&self, tests: &[TestFile]) -> ToolCommand {
        let mut command = ToolCommand::new(self.config.command.clone())
            .args(self.config.args.iter().cloned())
            .args(["--reporter", self.config.reporter.as_str()]);

        if let Some(timeout) = self.config.timeout_ms {
            command = command.args(["--timeout".to_string(), timeout.to_string()]);
        }
        if self.config.bail {
            command = command.arg("--bail");
        }

        command.args(tests.iter().map(|t| t.path.display().to_string()))
    }
}

impl Default for MochaRunner {
    fn default() -> Self {
        Self::new(TestConfig::default())
    }
}

fn build_globset(patterns: &[String]) -> Result<GlobSet> {
    let mut builder = GlobSetBuilder::new();
    for pattern in patterns {
        let glob = Glob::new(pattern).map_err(|e| TestError::InvalidPattern {
            pattern: pattern.clone(),
            reason: e.to_string(),
        })?;
        builder.add(glob);
    }
    let set = builder.build().map_err(|e| TestError::InvalidPattern {
        pattern: patterns.join(", "),
        reason: e.to_string(),
    })?;
    Ok(set)
}

/// Walk `dir` and return files matching `include` but not `exclude`, sorted
pub fn collect_files(dir: &Path, include: &[String], exclude: &[String]) -> Result<Vec<PathBuf>> {
    if !dir.is_dir() {
        return Err(TestError::DirectoryNotFound(dir.to_path_buf()).into());
    }

    let include = build_globset(include)?;
    let exclude = build_globset(exclude)?;

    let mut files = Vec::new();
    for entry in WalkDir::new(dir).follow_links(true) {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                debug!(error = %e, "skipping unreadable entry");
                continue;
            }
        };
        if !entry.file_type().is_file() {
            continue;
        }

        let Ok(relative) = entry.path().strip_prefix(dir) else {
            continue;
        };
        if include.is_match(relative) && !exclude.is_match(relative) {
            files.push(entry.path().to_path_buf());
        }
    }

    files.sort();
    Ok(files)
}

#[async_trait]
impl TestSuite for MochaRunner {
    #[instrument(skip(self, dir), fields(dir = %dir.display()))]
    async fn collect_tests(&self, dir: &Path) -> Result<Vec<TestFile>> {
        let dir = dir.to_path_buf();
        let include = self.config.include.clone();
        let exclude = self.config.exclude.clone();

        let files = tokio::task::spawn_blocking(move || collect_files(&dir, &include, &exclude))
            .await
            .map_err(|e| liftoff_core::LiftoffError::other(format!("test collection panicked: {}", e)))??;

        debug!(count = files.len(), "collected test files");
        Ok(files.into_iter().map(TestFile::new).collect())
    }

    #[instrument(skip_all, fields(count = tests.len()))]
    async fn run(&self, tests: &[TestFile]) -> Result<()> {
        let command = self.command_for(tests).output_mode(OutputMode::Inherit);

        let output = command.run().await.map_err(|e| TestError::RunnerUnavailable {
            command: command.program().to_string(),
            reason: e.to_string(),
        })?;

        match output.exit_code {
            Some(0) => {
                info!(
                    duration_ms = output.duration.as_millis() as u64,
                    "all tests passed"
                );
                Ok(())
            }
            Some(failures) => Err(TestError::TestsFailed { failures }.into()),
            None => Err(TestError::Terminated.into()),
        }
    }
}
