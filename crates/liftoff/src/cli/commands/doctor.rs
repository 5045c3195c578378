//! Doctor command - check the environment for the wrapped tools

use std::process::Command;

use clap::Args;
use console::style;
use serde::Serialize;
use tracing::{debug, info};

use liftoff_core::config::{Config, ENV_PASSWORD, ENV_USERNAME};

use crate::cli::{output, Cli, OutputFormat};

/// Check that the required tools are installed
#[derive(Debug, Args)]
pub struct DoctorCommand {
    /// Show suggestions for fixing issues
    #[arg(long)]
    pub fix: bool,
}

/// Result of a single check
#[derive(Debug, Clone, Serialize)]
pub struct CheckResult {
    pub name: String,
    pub status: CheckStatus,
    pub message: Option<String>,
    pub fix_suggestion: Option<String>,
}

/// Status of a check
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum CheckStatus {
    Ok,
    Warn,
    Fail,
}

/// Summary of all checks
#[derive(Debug, Serialize)]
pub struct DoctorSummary {
    pub checks: Vec<CheckResult>,
    pub ok_count: usize,
    pub warn_count: usize,
    pub fail_count: usize,
}

impl DoctorSummary {
    fn new(checks: Vec<CheckResult>) -> Self {
        let count = |status: CheckStatus| checks.iter().filter(|c| c.status == status).count();
        Self {
            ok_count: count(CheckStatus::Ok),
            warn_count: count(CheckStatus::Warn),
            fail_count: count(CheckStatus::Fail),
            checks,
        }
    }
}

impl DoctorCommand {
    /// Execute the doctor command
    pub fn execute(&self, cli: &Cli) -> anyhow::Result<()> {
        info!(fix = self.fix, "executing doctor command");
        let ctx = cli.context()?;

        if cli.is_text() {
            println!("{}", style("Checking environment...").bold());
            println!();
        }

        let mut checks = vec![match ctx.config_path {
            Some(ref path) => ok("Configuration", path.display().to_string()),
            None => CheckResult {
                name: "Configuration".to_string(),
                status: CheckStatus::Warn,
                message: Some("No config file, using defaults".to_string()),
                fix_suggestion: Some("Run 'liftoff init' to create liftoff.yaml".to_string()),
            },
        }];
        checks.extend(tool_checks(&ctx.config));
        checks.push(credentials_check(&ctx.config));

        let summary = DoctorSummary::new(checks);

        match cli.format {
            OutputFormat::Json => {
                println!("{}", serde_json::to_string_pretty(&summary)?);
            }
            OutputFormat::Text if !cli.quiet => self.print(&summary),
            OutputFormat::Text => {}
        }

        if summary.fail_count > 0 {
            anyhow::bail!("{} check(s) failed", summary.fail_count);
        }
        Ok(())
    }

    fn print(&self, summary: &DoctorSummary) {
        for check in &summary.checks {
            let message = check.message.as_deref().unwrap_or_default();
            println!(
                "  {} {} {}",
                status_icon(check.status),
                style(&check.name).bold(),
                style(message).dim()
            );
        }

        println!();
        let line = format!(
            "{} passed, {} warnings, {} failed",
            summary.ok_count, summary.warn_count, summary.fail_count
        );
        if summary.fail_count > 0 {
            output::error(&line);
        } else if summary.warn_count > 0 {
            output::warning(&line);
        } else {
            output::success(&line);
        }

        if self.fix && (summary.fail_count > 0 || summary.warn_count > 0) {
            println!();
            println!("{}", style("Suggested fixes:").bold());
            for check in summary.checks.iter().filter(|c| c.status != CheckStatus::Ok) {
                if let Some(ref fix) = check.fix_suggestion {
                    println!("{}", output::key_value(&check.name, fix));
                }
            }
        }
    }
}

fn status_icon(status: CheckStatus) -> console::StyledObject<&'static str> {
    match status {
        CheckStatus::Ok => style("✓").green().bold(),
        CheckStatus::Warn => style("!").yellow().bold(),
        CheckStatus::Fail => style("✗").red().bold(),
    }
}

fn ok(name: &str, message: String) -> CheckResult {
    CheckResult {
        name: name.to_string(),
        status: CheckStatus::Ok,
        message: Some(message),
        fix_suggestion: None,
    }
}

/// One check per external program the configured adapters invoke
fn tool_checks(config: &Config) -> Vec<CheckResult> {
    [
        (
            "Build tool",
            config.build.executable.as_str(),
            "Install with 'npm install -g appcelerator'",
        ),
        (
            "Automation server",
            config.automation.executable.as_str(),
            "Install with 'npm install -g appium'",
        ),
        (
            "Test runner",
            config.tests.command.as_str(),
            "Install Node.js, then add mocha to the test project",
        ),
    ]
    .into_iter()
    .map(|(name, program, fix)| check_tool(name, program, fix))
    .collect()
}

fn check_tool(name: &str, program: &str, fix: &str) -> CheckResult {
    match which::which(program) {
        Ok(path) => {
            let version = get_command_version(program, &["--version"]);
            let message = match version {
                Some(version) => format!("{} ({})", path.display(), version),
                None => path.display().to_string(),
            };
            ok(name, message)
        }
        Err(e) => {
            debug!(program, error = %e, "tool not found");
            CheckResult {
                name: name.to_string(),
                status: CheckStatus::Fail,
                message: Some(format!("'{}' not found on PATH", program)),
                fix_suggestion: Some(fix.to_string()),
            }
        }
    }
}

fn credentials_check(config: &Config) -> CheckResult {
    if config.build.username.is_some() && config.build.password.is_some() {
        return ok("Credentials", "username and password set".to_string());
    }
    CheckResult {
        name: "Credentials".to_string(),
        status: CheckStatus::Warn,
        message: Some("Build tool login needs a username and password".to_string()),
        fix_suggestion: Some(format!(
            "Set {} and {}, or pass --username to 'liftoff setup'",
            ENV_USERNAME, ENV_PASSWORD
        )),
    }
}

/// First line of `program args..` output, if it runs successfully
fn get_command_version(program: &str, args: &[&str]) -> Option<String> {
    let output = Command::new(program).args(args).output().ok()?;
    if !output.status.success() {
        return None;
    }
    String::from_utf8_lossy(&output.stdout)
        .lines()
        .next()
        .map(|line| line.trim().to_string())
        .filter(|line| !line.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_tool_fails() {
        let check = check_tool("Build tool", "liftoff-definitely-not-a-real-program", "install");
        assert_eq!(check.status, CheckStatus::Fail);
        assert_eq!(check.fix_suggestion.as_deref(), Some("install"));
    }

    #[test]
    fn test_credentials_warn_when_missing() {
        let mut config = Config::default();
        assert_eq!(credentials_check(&config).status, CheckStatus::Warn);

        config.build.username = Some("dev".to_string());
        config.build.password = Some("secret".to_string());
        assert_eq!(credentials_check(&config).status, CheckStatus::Ok);
    }

    #[test]
    fn test_summary_counts() {
        let summary = DoctorSummary::new(vec![
            ok("a", String::new()),
            check_tool("b", "liftoff-definitely-not-a-real-program", "x"),
        ]);
        assert_eq!(summary.ok_count, 1);
        assert_eq!(summary.fail_count, 1);
        assert_eq!(summary.warn_count, 0);
    }
}
