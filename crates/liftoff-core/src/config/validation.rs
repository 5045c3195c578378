//! Configuration validation

use tracing::debug;

use crate::error::{ConfigError, Result};

use super::types::Config;

/// Validate configuration
pub fn validate_config(config: &Config) -> Result<()> {
    debug!("validating configuration");
    validate_build(config)?;
    validate_automation(config)?;
    validate_tests(config)?;
    debug!("configuration validation passed");
    Ok(())
}

fn invalid(field: &str, message: &str) -> crate::error::LiftoffError {
    ConfigError::InvalidValue {
        field: field.to_string(),
        message: message.to_string(),
    }
    .into()
}

fn validate_build(config: &Config) -> Result<()> {
    if config.build.executable.trim().is_empty() {
        return Err(invalid("build.executable", "executable cannot be empty"));
    }

    if config.build.cli_version.trim().is_empty() {
        return Err(invalid("build.cli_version", "version cannot be empty"));
    }

    if config.build.sdk_version.trim().is_empty() {
        return Err(invalid("build.sdk_version", "version cannot be empty"));
    }

    Ok(())
}

fn validate_automation(config: &Config) -> Result<()> {
    let automation = &config.automation;

    if automation.executable.trim().is_empty() {
        return Err(invalid("automation.executable", "executable cannot be empty"));
    }

    if automation.hostname.trim().is_empty() {
        return Err(invalid("automation.hostname", "hostname cannot be empty"));
    }

    if automation.port == 0 {
        return Err(invalid("automation.port", "port must be between 1 and 65535"));
    }

    if !automation.base_path.starts_with('/') {
        return Err(invalid("automation.base_path", "must start with '/'"));
    }

    Ok(())
}

fn validate_tests(config: &Config) -> Result<()> {
    let tests = &config.tests;

    if tests.command.trim().is_empty() {
        return Err(invalid("tests.command", "command cannot be empty"));
    }

    if tests.include.is_empty() {
        return Err(invalid("tests.include", "at least one include pattern is required"));
    }

    if tests.reporter.trim().is_empty() {
        return Err(invalid("tests.reporter", "reporter cannot be empty"));
    }

    if tests.timeout_ms == Some(0) {
        return Err(invalid("tests.timeout_ms", "timeout must be greater than zero"));
    }

    Ok(())
}
