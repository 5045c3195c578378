//! Configuration loading

use std::path::{Path, PathBuf};

use tracing::{debug, info, warn};

use crate::error::{ConfigError, Result};

use super::defaults::config_file_names;
use super::types::Config;
use super::validation::validate_config;

/// Load configuration from a file
pub fn load_config(path: &Path) -> Result<Config> {
    let format = if path.extension().is_some_and(|e| e == "toml") {
        "TOML"
    } else {
        "YAML"
    };
    info!(path = %path.display(), format, "loading config");

    let content = std::fs::read_to_string(path).map_err(ConfigError::Io)?;

    let config: Config = if format == "TOML" {
        toml::from_str(&content).map_err(ConfigError::TomlError)?
    } else {
        serde_yaml::from_str(&content).map_err(ConfigError::YamlError)?
    };

    validate_config(&config)?;
    debug!(path = %path.display(), "config loaded and validated");
    Ok(config)
}

/// Find configuration file in directory or parent directories.
///
/// At each directory level the search checks `<dir>/<name>` and then
/// `<dir>/.github/<name>`. The first match wins.
pub fn find_config(start_dir: &Path) -> Option<PathBuf> {
    debug!(start_dir = %start_dir.display(), "searching for config file");
    let mut current = start_dir.to_path_buf();

    loop {
        for name in config_file_names() {
            let config_path = current.join(name);
            if config_path.exists() {
                info!(path = %config_path.display(), "found config file");
                return Some(config_path);
            }

            let github_path = current.join(".github").join(name);
            if github_path.exists() {
                info!(path = %github_path.display(), "found config file in .github/");
                return Some(github_path);
            }
        }

        if !current.pop() {
            break;
        }
    }

    debug!("no config file found");
    None
}

/// Load configuration or use defaults.
///
/// A config file that exists but fails to parse or validate is still an error;
/// only a missing file falls back to defaults.
pub fn load_config_or_default(dir: &Path) -> Result<(Config, Option<PathBuf>)> {
    match find_config(dir) {
        Some(path) => {
            let config = load_config(&path)?;
            Ok((config, Some(path)))
        }
        None => {
            warn!(dir = %dir.display(), "no config found, using defaults");
            Ok((Config::default(), None))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::LiftoffError;
    use tempfile::TempDir;

    #[test]
    fn test_find_config_yaml() {
        let temp = TempDir::new().unwrap();
        let config_path = temp.path().join("liftoff.yaml");
        std::fs::write(&config_path, "automation:\n  port: 4724\n").unwrap();

        let found = find_config(temp.path());
        assert_eq!(found, Some(config_path));
    }

    #[test]
    fn test_find_config_prefers_yaml_over_toml() {
        let temp = TempDir::new().unwrap();
        let yaml_path = temp.path().join("liftoff.yaml");
        let toml_path = temp.path().join("liftoff.toml");
        std::fs::write(&yaml_path, "tests:\n  reporter: dot\n").unwrap();
        std::fs::write(&toml_path, "[tests]\nreporter = \"dot\"\n").unwrap();

        assert_eq!(find_config(temp.path()).unwrap(), yaml_path);
    }

    #[test]
    fn test_find_config_in_github_dir() {
        let temp = TempDir::new().unwrap();
        let github_dir = temp.path().join(".github");
        std::fs::create_dir_all(&github_dir).unwrap();
        let config_path = github_dir.join("liftoff.toml");
        std::fs::write(&config_path, "[automation]\nport = 4725\n").unwrap();

        assert_eq!(find_config(temp.path()).unwrap(), config_path);
    }

    #[test]
    fn test_find_config_in_parent() {
        let temp = TempDir::new().unwrap();
        let config_path = temp.path().join(".liftoff.yaml");
        std::fs::write(&config_path, "name: app\n").unwrap();
        let nested = temp.path().join("tests").join("ui");
        std::fs::create_dir_all(&nested).unwrap();

        assert_eq!(find_config(&nested).unwrap(), config_path);
    }

    #[test]
    fn test_load_toml_config() {
        let temp = TempDir::new().unwrap();
        let config_path = temp.path().join("liftoff.toml");
        std::fs::write(
            &config_path,
            r#"
name = "kitchensink"

[build]
username = "ci@example.com"
sdk_version = "12.2.0.GA"

[automation]
port = 4800
base_path = "/"

[automation.capabilities]
platformName = "Android"

[tests]
timeout_ms = 30000
"#,
        )
        .unwrap();

        let config = load_config(&config_path).unwrap();
        assert_eq!(config.name.as_deref(), Some("kitchensink"));
        assert_eq!(config.build.username.as_deref(), Some("ci@example.com"));
        assert_eq!(config.build.sdk_version, "12.2.0.GA");
        assert_eq!(config.build.cli_version, "latest");
        assert_eq!(config.automation.port, 4800);
        assert_eq!(
            config.automation.capabilities.get("platformName"),
            Some(&serde_json::Value::from("Android"))
        );
        assert_eq!(config.tests.timeout_ms, Some(30000));
    }

    #[test]
    fn test_load_yaml_config_with_password() {
        let temp = TempDir::new().unwrap();
        let config_path = temp.path().join("liftoff.yaml");
        std::fs::write(
            &config_path,
            "build:\n  username: me\n  password: hunter2\n  org_id: \"42\"\n",
        )
        .unwrap();

        let config = load_config(&config_path).unwrap();
        assert_eq!(config.build.password.as_deref(), Some("hunter2"));
        assert_eq!(config.build.org_id.as_deref(), Some("42"));
        assert!(!format!("{:?}", config.build).contains("hunter2"));
    }

    #[test]
    fn test_load_invalid_config_is_error() {
        let temp = TempDir::new().unwrap();
        let config_path = temp.path().join("liftoff.yaml");
        std::fs::write(&config_path, "automation:\n  port: 0\n").unwrap();

        let err = load_config_or_default(temp.path()).unwrap_err();
        assert!(matches!(err, LiftoffError::Config(_)));
    }

    #[test]
    fn test_load_config_or_default_without_file() {
        let temp = TempDir::new().unwrap();
        let (config, path) = load_config_or_default(temp.path()).unwrap();
        assert!(path.is_none());
        assert_eq!(config.automation.port, 4723);
    }
}
