//! Shared value types passed between the dispatcher and its collaborators

use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Build target platforms understood by the build tool
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Platform {
    /// iOS (iPhone, iPad)
    Ios,
    /// Android
    Android,
    /// Windows
    Windows,
    /// Mobile web
    #[serde(rename = "mobileweb")]
    MobileWeb,
}

impl Platform {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Ios => "ios",
            Self::Android => "android",
            Self::Windows => "windows",
            Self::MobileWeb => "mobileweb",
        }
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Environment the build tool authenticates against.
///
/// Environment setup only ever logs in to production.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LoginMode {
    #[default]
    Production,
}

impl LoginMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Production => "production",
        }
    }
}

impl fmt::Display for LoginMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Session capabilities for the automation client, forwarded verbatim
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Capabilities(pub Map<String, Value>);

impl Capabilities {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a capability, replacing any previous value under the same name
    pub fn with(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.0.insert(name.into(), value.into());
        self
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.0.get(name)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn to_value(&self) -> Value {
        Value::Object(self.0.clone())
    }

    /// Parse capabilities from a JSON object string
    pub fn from_json(json: &str) -> crate::Result<Self> {
        Ok(serde_json::from_str(json)?)
    }
}

/// Result of a build tool build
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BuildOutput {
    /// Target platform
    pub platform: Platform,
    /// Project directory that was built
    pub project_dir: PathBuf,
    /// Exit code of the build tool
    pub exit_code: Option<i32>,
    /// Captured standard output
    pub stdout: String,
    /// Captured standard error
    pub stderr: String,
    /// Wall clock time of the build
    #[serde(with = "duration_millis")]
    pub duration: Duration,
}

impl BuildOutput {
    pub fn success(&self) -> bool {
        self.exit_code == Some(0)
    }
}

/// A single test file discovered by collection
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct TestFile {
    /// Absolute (or caller-rooted) path to the file
    pub path: PathBuf,
}

impl TestFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

mod duration_millis {
    use std::time::Duration;

    use serde::Serializer;

    pub fn serialize<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_u64(d.as_millis() as u64)
    }
}
