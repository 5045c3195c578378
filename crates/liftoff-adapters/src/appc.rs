//! Appcelerator (`appc`) build tool adapter
//!
//! Every operation is one `appc` invocation. Credentials and versions come
//! from the [`BuildToolConfig`] handed to each call; the executable is fixed
//! at construction and used for every invocation.

use std::path::{Component, Path, PathBuf};
use std::time::Instant;

use async_trait::async_trait;
use tracing::{debug, info, instrument};

use liftoff_core::config::BuildToolConfig;
use liftoff_core::{
    BuildOutput, BuildTool, BuildToolError, LoginMode, Platform, Result,
};

use crate::process::{CommandOutput, OutputMode, ToolCommand};

/// Environment variable selecting the appc environment
const APPC_ENV: &str = "APPC_ENV";

/// `appc` command line adapter
#[derive(Debug, Clone)]
pub struct AppcCli {
    executable: String,
}

impl AppcCli {
    pub fn with_executable(executable: impl Into<String>) -> Self {
        Self {
            executable: executable.into(),
        }
    }

    pub fn from_config(config: &BuildToolConfig) -> Self {
        Self::with_executable(config.executable.clone())
    }

    fn command(&self) -> ToolCommand {
        ToolCommand::new(self.executable.clone())
    }

    /// Run a command, mapping spawn failures and non-zero exits
    async fn execute(command: ToolCommand) -> Result<CommandOutput> {
        let output = command.run().await.map_err(|e| BuildToolError::SpawnFailed {
            command: command.program().to_string(),
            reason: e.to_string(),
        })?;

        if !output.success() {
            return Err(BuildToolError::CommandFailed {
                command: command.display(),
                exit_code: output.exit_code,
                stderr: output.stderr,
            }
            .into());
        }

        Ok(output)
    }
}

/// Arguments for `appc login`
pub fn login_args(config: &BuildToolConfig) -> Result<Vec<String>> {
    let username = config
        .username
        .as_deref()
        .filter(|u| !u.is_empty())
        .ok_or(BuildToolError::MissingCredentials("username"))?;
    let password = config
        .password
        .as_deref()
        .filter(|p| !p.is_empty())
        .ok_or(BuildToolError::MissingCredentials("password"))?;

    let mut args = vec![
        "login".to_string(),
        "--username".to_string(),
        username.to_string(),
        "--password".to_string(),
        password.to_string(),
    ];
    if let Some(org_id) = config.org_id.as_deref().filter(|o| !o.is_empty()) {
        args.push("--org-id".to_string());
        args.push(org_id.to_string());
    }
    args.push("--no-prompt".to_string());
    Ok(args)
}

/// Arguments for `appc run` in build-only mode
pub fn build_args(dir: &Path, platform: Platform, extra: &[String]) -> Vec<String> {
    let mut args = vec![
        "run".to_string(),
        "--project-dir".to_string(),
        dir.display().to_string(),
        "--platform".to_string(),
        platform.as_str().to_string(),
        "--build-only".to_string(),
    ];
    args.extend(extra.iter().cloned());
    args
}

/// Where the build tool leaves the app for `platform`
pub fn app_path(dir: &Path, platform: Platform, app_name: &str) -> Result<PathBuf> {
    validate_app_name(app_name)?;

    let path = match platform {
        Platform::Ios => dir
            .join("build")
            .join("iphone")
            .join("build")
            .join("Products")
            .join("Debug-iphonesimulator")
            .join(format!("{}.app", app_name)),
        Platform::Android => dir
            .join("build")
            .join("android")
            .join("bin")
            .join(format!("{}.apk", app_name)),
        Platform::Windows => dir
            .join("build")
            .join("windows")
            .join(format!("{}.appx", app_name)),
        Platform::MobileWeb => dir.join("build").join("mobileweb").join(app_name),
    };
    Ok(path)
}

fn validate_app_name(app_name: &str) -> Result<()> {
    if app_name.trim().is_empty() {
        return Err(BuildToolError::InvalidArguments("app name cannot be empty".to_string()).into());
    }

    let mut components = Path::new(app_name).components();
    let single_normal = matches!(
        (components.next(), components.next()),
        (Some(Component::Normal(_)), None)
    );
    if !single_normal || app_name.contains(&['/', '\\'][..]) {
        return Err(BuildToolError::InvalidArguments(format!(
            "app name '{}' must not contain path separators",
            app_name
        ))
        .into());
    }

    Ok(())
}

#[async_trait]
impl BuildTool for AppcCli {
    #[instrument(skip_all, fields(mode = %mode))]
    async fn login(&self, config: &BuildToolConfig, mode: LoginMode) -> Result<()> {
        let args = login_args(config)?;
        let command = self.command().args(args).env(APPC_ENV, mode.as_str());

        Self::execute(command).await?;
        info!(username = config.username.as_deref().unwrap_or_default(), "logged in");
        Ok(())
    }

    #[instrument(skip_all, fields(version = %config.cli_version))]
    async fn install_cli(&self, config: &BuildToolConfig) -> Result<()> {
        let command = self.command().args(["use", config.cli_version.as_str()]);

        Self::execute(command).await?;
        info!("CLI core installed");
        Ok(())
    }

    #[instrument(skip_all, fields(version = %config.sdk_version))]
    async fn install_sdk(&self, config: &BuildToolConfig) -> Result<()> {
        let command = self.command().args([
            "ti",
            "sdk",
            "install",
            config.sdk_version.as_str(),
            "--default",
        ]);

        Self::execute(command).await?;
        info!("SDK installed");
        Ok(())
    }

    #[instrument(skip(self, dir, args), fields(dir = %dir.display()))]
    async fn build(&self, dir: &Path, platform: Platform, args: &[String]) -> Result<BuildOutput> {
        let start = Instant::now();
        let command = self
            .command()
            .args(build_args(dir, platform, args));

        let output = Self::execute(command).await?;
        let result = BuildOutput {
            platform,
            project_dir: dir.to_path_buf(),
            exit_code: output.exit_code,
            stdout: output.stdout,
            stderr: output.stderr,
            duration: start.elapsed(),
        };

        info!(duration_ms = result.duration.as_millis() as u64, "build finished");
        Ok(result)
    }

    #[instrument(skip_all, fields(arg_count = args.len()))]
    async fn runner(&self, args: &[String]) -> Result<()> {
        if args.is_empty() {
            return Err(
                BuildToolError::InvalidArguments("no arguments given to appc".to_string()).into(),
            );
        }

        let command = self
            .command()
            .args(args.iter().cloned())
            .output_mode(OutputMode::Inherit);
        Self::execute(command).await?;
        Ok(())
    }

    #[instrument(skip(self, dir), fields(dir = %dir.display()))]
    async fn create_app_path(
        &self,
        dir: &Path,
        platform: Platform,
        app_name: &str,
    ) -> Result<PathBuf> {
        let path = app_path(dir, platform, app_name)?;
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        debug!(path = %path.display(), "app path created");
        Ok(path)
    }
}
