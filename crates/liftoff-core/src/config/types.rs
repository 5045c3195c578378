//! Configuration types

use std::fmt;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::types::Capabilities;

/// Environment variable overriding the build tool username
pub const ENV_USERNAME: &str = "APPC_USERNAME";
/// Environment variable overriding the build tool password
pub const ENV_PASSWORD: &str = "APPC_PASSWORD";
/// Environment variable overriding the build tool organization id
pub const ENV_ORG_ID: &str = "APPC_ORG_ID";

/// Main configuration for Liftoff
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Version of the config schema
    #[serde(rename = "$schema", skip_serializing_if = "Option::is_none")]
    pub schema: Option<String>,

    /// Project name
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    /// Build tool configuration
    pub build: BuildToolConfig,

    /// Automation server configuration
    pub automation: AutomationConfig,

    /// Test runner configuration
    pub tests: TestConfig,
}

impl Config {
    /// Apply environment overrides to secrets
    pub fn with_env_overrides(mut self) -> Self {
        self.build = self.build.with_env_overrides();
        self
    }
}

/// Build tool (appc) configuration
#[derive(Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BuildToolConfig {
    /// Build tool executable
    pub executable: String,

    /// Account username
    #[serde(skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,

    /// Account password
    #[serde(skip_serializing)]
    pub password: Option<String>,

    /// Organization id to log in under
    #[serde(skip_serializing_if = "Option::is_none")]
    pub org_id: Option<String>,

    /// CLI core version to install ("latest" or a version)
    pub cli_version: String,

    /// Platform SDK version to install ("latest" or a version)
    pub sdk_version: String,
}

impl Default for BuildToolConfig {
    fn default() -> Self {
        Self {
            executable: "appc".to_string(),
            username: None,
            password: None,
            org_id: None,
            cli_version: "latest".to_string(),
            sdk_version: "latest".to_string(),
        }
    }
}

impl BuildToolConfig {
    /// Fill credentials from `APPC_*` environment variables when set
    pub fn with_env_overrides(mut self) -> Self {
        if let Ok(username) = std::env::var(ENV_USERNAME) {
            self.username = Some(username);
        }
        if let Ok(password) = std::env::var(ENV_PASSWORD) {
            self.password = Some(password);
        }
        if let Ok(org_id) = std::env::var(ENV_ORG_ID) {
            self.org_id = Some(org_id);
        }
        self
    }
}

impl fmt::Debug for BuildToolConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BuildToolConfig")
            .field("executable", &self.executable)
            .field("username", &self.username)
            .field("password", &self.password.as_ref().map(|_| "<redacted>"))
            .field("org_id", &self.org_id)
            .field("cli_version", &self.cli_version)
            .field("sdk_version", &self.sdk_version)
            .finish()
    }
}

/// Automation server (Appium) configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AutomationConfig {
    /// Server executable
    pub executable: String,

    /// Default bind address
    pub hostname: String,

    /// Default port
    pub port: u16,

    /// WebDriver base path ("/wd/hub" for Appium 1, "/" for Appium 2)
    pub base_path: String,

    /// Extra arguments passed to the server
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub extra_args: Vec<String>,

    /// Directory holding the server PID and client session files
    #[serde(skip_serializing_if = "Option::is_none")]
    pub state_dir: Option<PathBuf>,

    /// Default client capabilities
    #[serde(default, skip_serializing_if = "Capabilities::is_empty")]
    pub capabilities: Capabilities,
}

impl Default for AutomationConfig {
    fn default() -> Self {
        Self {
            executable: "appium".to_string(),
            hostname: "localhost".to_string(),
            port: 4723,
            base_path: "/wd/hub".to_string(),
            extra_args: Vec::new(),
            state_dir: None,
            capabilities: Capabilities::default(),
        }
    }
}

impl AutomationConfig {
    /// State directory, defaulting to `~/.liftoff/automation`
    pub fn resolved_state_dir(&self) -> PathBuf {
        self.state_dir.clone().unwrap_or_else(|| {
            dirs::home_dir()
                .unwrap_or_else(std::env::temp_dir)
                .join(".liftoff")
                .join("automation")
        })
    }
}

/// Test runner (Mocha) configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TestConfig {
    /// Runner command
    pub command: String,

    /// Arguments placed before runner options
    pub args: Vec<String>,

    /// Globs selecting test files, relative to the test directory
    pub include: Vec<String>,

    /// Globs excluded from collection
    pub exclude: Vec<String>,

    /// Mocha reporter
    pub reporter: String,

    /// Per-test timeout in milliseconds
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timeout_ms: Option<u64>,

    /// Stop after the first failure
    pub bail: bool,
}

impl Default for TestConfig {
    fn default() -> Self {
        Self {
            command: "npx".to_string(),
            args: vec!["mocha".to_string()],
            include: vec![
                "**/*.js".to_string(),
                "**/*.mjs".to_string(),
                "**/*.cjs".to_string(),
            ],
            exclude: vec!["**/node_modules/**".to_string()],
            reporter: "spec".to_string(),
            timeout_ms: None,
            bail: false,
        }
    }
}
