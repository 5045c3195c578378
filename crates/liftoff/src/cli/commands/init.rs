//! Init command

use std::path::{Path, PathBuf};

use clap::Args;
use console::{style, Term};
use dialoguer::Confirm;
use tracing::info;

use liftoff_core::config::{Config, DEFAULT_CONFIG_TEMPLATE, DEFAULT_CONFIG_TOML, DEFAULT_CONFIG_YAML};

use crate::cli::{output, Cli};

/// Initialize a new Liftoff configuration
#[derive(Debug, Args)]
pub struct InitCommand {
    /// Force overwrite existing configuration
    #[arg(short, long)]
    pub force: bool,

    /// Never prompt; fail if the file already exists
    #[arg(short = 'y', long)]
    pub yes: bool,

    /// Write TOML instead of YAML
    #[arg(long)]
    pub toml: bool,

    /// Output file path
    #[arg(short, long)]
    pub output: Option<PathBuf>,
}

impl InitCommand {
    /// Execute the init command
    pub fn execute(&self, cli: &Cli) -> anyhow::Result<()> {
        info!(force = self.force, toml = self.toml, "executing init command");
        let cwd = std::env::current_dir()?;
        let config_path = self.config_path(&cwd);

        if config_path.exists() && !self.force {
            if self.yes || !Term::stdout().is_term() {
                anyhow::bail!(
                    "Configuration file already exists at {}. Use --force to overwrite.",
                    config_path.display()
                );
            }

            let overwrite = Confirm::new()
                .with_prompt(format!(
                    "Configuration file already exists at {}. Overwrite?",
                    config_path.display()
                ))
                .default(false)
                .interact()?;

            if !overwrite {
                println!("{}", style("Aborted.").yellow());
                return Ok(());
            }
        }

        std::fs::write(&config_path, self.render(&config_path)?)?;

        if !cli.quiet {
            output::success(&format!(
                "Created configuration at {}",
                output::path_style().apply_to(config_path.display())
            ));
            println!();
            println!("Next steps:");
            println!("  1. Set APPC_USERNAME and APPC_PASSWORD for the build tool login");
            println!("  2. Run {} to verify your setup", style("liftoff doctor").cyan());
            println!("  3. Run {} to prepare the build tool", style("liftoff setup").cyan());
        }

        Ok(())
    }

    fn config_path(&self, cwd: &Path) -> PathBuf {
        match self.output {
            Some(ref path) => path.clone(),
            None if self.toml => cwd.join(DEFAULT_CONFIG_TOML),
            None => cwd.join(DEFAULT_CONFIG_YAML),
        }
    }

    fn render(&self, path: &Path) -> anyhow::Result<String> {
        let wants_toml = self.toml || path.extension().is_some_and(|e| e == "toml");
        if !wants_toml {
            return Ok(DEFAULT_CONFIG_TEMPLATE.to_string());
        }
        let config: Config = serde_yaml::from_str(DEFAULT_CONFIG_TEMPLATE)?;
        Ok(toml::to_string_pretty(&config)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use liftoff_core::config::load_config;
    use tempfile::TempDir;

    fn command(toml: bool) -> InitCommand {
        InitCommand {
            force: false,
            yes: true,
            toml,
            output: None,
        }
    }

    #[test]
    fn test_default_paths() {
        let cwd = Path::new("/work");
        assert_eq!(command(false).config_path(cwd), cwd.join("liftoff.yaml"));
        assert_eq!(command(true).config_path(cwd), cwd.join("liftoff.toml"));
    }

    #[test]
    fn test_rendered_files_load() {
        let temp = TempDir::new().unwrap();
        for toml in [false, true] {
            let cmd = command(toml);
            let path = cmd.config_path(temp.path());
            std::fs::write(&path, cmd.render(&path).unwrap()).unwrap();

            let config = load_config(&path).unwrap();
            assert_eq!(config.automation.port, 4723);
            assert_eq!(config.build.executable, "appc");
        }
    }
}
