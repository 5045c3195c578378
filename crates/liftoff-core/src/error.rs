//! Error types for Liftoff

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias using LiftoffError
pub type Result<T> = std::result::Result<T, LiftoffError>;

/// Main error type for Liftoff operations
#[derive(Debug, Error)]
pub enum LiftoffError {
    /// Configuration-related errors
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Build tool (appc) errors
    #[error(transparent)]
    BuildTool(#[from] BuildToolError),

    /// Automation server/client errors
    #[error(transparent)]
    Automation(#[from] AutomationError),

    /// Test collection/execution errors
    #[error(transparent)]
    Test(#[from] TestError),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON parsing error
    #[error("JSON parsing error: {0}")]
    Json(#[from] serde_json::Error),

    /// Generic errors
    #[error("{0}")]
    Other(String),
}

impl LiftoffError {
    /// Create a new "other" error with a message
    pub fn other<S: Into<String>>(msg: S) -> Self {
        Self::Other(msg.into())
    }

    /// Get exit code for CLI
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::Config(_) => 2,
            Self::BuildTool(_) => 3,
            Self::Automation(_) => 4,
            Self::Test(TestError::NoTestsFound { .. }) => 6,
            Self::Test(_) => 5,
            Self::Io(_) | Self::Json(_) | Self::Other(_) => 1,
        }
    }
}

/// Configuration-related errors
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Invalid configuration value
    #[error("Invalid configuration: {field} - {message}")]
    InvalidValue { field: String, message: String },

    /// YAML parsing error
    #[error("YAML parsing error: {0}")]
    YamlError(#[from] serde_yaml::Error),

    /// TOML parsing error
    #[error("TOML parsing error: {0}")]
    TomlError(#[from] toml::de::Error),

    /// IO error
    #[error("IO error reading config: {0}")]
    Io(#[from] std::io::Error),
}

/// Build tool errors
#[derive(Debug, Error)]
pub enum BuildToolError {
    /// Username or password not configured
    #[error("Missing build tool credentials: {0} is not set")]
    MissingCredentials(&'static str),

    /// Arguments rejected before invoking the tool
    #[error("Invalid arguments: {0}")]
    InvalidArguments(String),

    /// Executable could not be started
    #[error("Failed to start '{command}': {reason}")]
    SpawnFailed { command: String, reason: String },

    /// Command ran and exited unsuccessfully
    #[error("Command failed: {command} (exit code {exit_code:?}){}", tail(.stderr))]
    CommandFailed {
        command: String,
        exit_code: Option<i32>,
        stderr: String,
    },
}

/// Automation server and WebDriver client errors
#[derive(Debug, Error)]
pub enum AutomationError {
    /// Server executable could not be started
    #[error("Failed to start automation server '{command}': {reason}")]
    SpawnFailed { command: String, reason: String },

    /// Server process ended before it reported readiness
    #[error("Automation server exited before it started listening (log: {log})")]
    ServerExited { log: PathBuf },

    /// A server started by liftoff is still running
    #[error("Automation server already running (pid {pid})")]
    AlreadyRunning { pid: u32 },

    /// Some other server already answers on the requested endpoint
    #[error("Another server is already listening on {endpoint}")]
    EndpointInUse { endpoint: String },

    /// No server to stop
    #[error("No running automation server found")]
    NotRunning,

    /// Failed to stop the server process
    #[error("Failed to stop automation server (pid {pid}): {reason}")]
    KillFailed { pid: u32, reason: String },

    /// A client session is already open
    #[error("Client session {0} is already active")]
    SessionActive(String),

    /// No client session to stop
    #[error("No active client session")]
    NoSession,

    /// HTTP transport failure
    #[error("Request to automation server failed: {0}")]
    Http(String),

    /// Server answered with an error status
    #[error("WebDriver error ({status}): {message}")]
    WebDriver { status: u16, message: String },

    /// Session response lacked a session id
    #[error("Invalid session response: {0}")]
    InvalidResponse(String),

    /// Could not read or write automation state files
    #[error("Automation state error at {path}: {reason}")]
    State { path: PathBuf, reason: String },
}

/// Test collection and execution errors
#[derive(Debug, Error)]
pub enum TestError {
    /// Collection produced zero tests
    #[error("No Tests Found!")]
    NoTestsFound { directory: PathBuf },

    /// Test directory does not exist
    #[error("Test directory not found: {0}")]
    DirectoryNotFound(PathBuf),

    /// Invalid include/exclude pattern
    #[error("Invalid test pattern '{pattern}': {reason}")]
    InvalidPattern { pattern: String, reason: String },

    /// Test runner executable could not be started
    #[error("Test runner '{command}' unavailable: {reason}")]
    RunnerUnavailable { command: String, reason: String },

    /// Tests ran with failures
    #[error("Tests failed: {failures} failing")]
    TestsFailed { failures: i32 },

    /// Runner was terminated without an exit code
    #[error("Test runner terminated by signal")]
    Terminated,
}

fn tail(stderr: &str) -> String {
    let lines: Vec<&str> = stderr.lines().filter(|l| !l.trim().is_empty()).collect();
    if lines.is_empty() {
        return String::new();
    }
    let start = lines.len().saturating_sub(5);
    format!("\n{}", lines[start..].join("\n"))
}
