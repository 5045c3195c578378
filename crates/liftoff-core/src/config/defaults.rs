//! Default configuration values

/// Default configuration file name (YAML)
pub const DEFAULT_CONFIG_YAML: &str = "liftoff.yaml";

/// Default configuration file name (TOML)
pub const DEFAULT_CONFIG_TOML: &str = "liftoff.toml";

/// Alternative configuration file name
pub const ALT_CONFIG_FILE: &str = ".liftoff.yaml";

/// Get list of config file names to search for
pub fn config_file_names() -> Vec<&'static str> {
    vec![
        DEFAULT_CONFIG_YAML,
        DEFAULT_CONFIG_TOML,
        ALT_CONFIG_FILE,
        ".liftoff.toml",
    ]
}

/// Default configuration template
pub const DEFAULT_CONFIG_TEMPLATE: &str = r#"# Liftoff Configuration
# Credentials may also come from APPC_USERNAME, APPC_PASSWORD and APPC_ORG_ID

build:
  executable: appc
  cli_version: latest
  sdk_version: latest

automation:
  executable: appium
  hostname: localhost
  port: 4723
  base_path: /wd/hub

tests:
  command: npx
  args: [mocha]
  include: ["**/*.js", "**/*.mjs", "**/*.cjs"]
  exclude: ["**/node_modules/**"]
  reporter: spec
  bail: false
"#;
