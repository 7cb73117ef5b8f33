//! Configuration file handling.
//!
//! This module handles loading and merging configuration from
//! `.registry-census.toml` files.

use crate::cli::OutputFormat;
use crate::models::Level;
use crate::registry::http::DEFAULT_BASE_URL;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Default config file name, looked up in the current directory.
pub const CONFIG_FILE_NAME: &str = ".registry-census.toml";

/// Root configuration structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// General settings.
    #[serde(default)]
    pub general: GeneralConfig,

    /// Registry access settings.
    #[serde(default)]
    pub registry: RegistryConfig,

    /// Report settings.
    #[serde(default)]
    pub report: ReportConfig,
}

/// General application settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GeneralConfig {
    /// Enable verbose logging by default.
    #[serde(default)]
    pub verbose: bool,
}

/// Where and how to reach the registry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegistryConfig {
    /// REST API base URL.
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Per-request timeout in seconds.
    #[serde(default = "default_timeout")]
    pub timeout_seconds: u64,

    /// JSON snapshot to read instead of calling the API.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub snapshot: Option<PathBuf>,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            timeout_seconds: default_timeout(),
            snapshot: None,
        }
    }
}

fn default_base_url() -> String {
    DEFAULT_BASE_URL.to_string()
}

fn default_timeout() -> u64 {
    30
}

/// Report generation settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ReportConfig {
    /// Output format.
    #[serde(default)]
    pub format: OutputFormat,

    /// Maximum rows per level.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub top: Option<usize>,

    /// Only report this level.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub level: Option<Level>,
}

impl Config {
    /// Load configuration from a file path.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        Ok(config)
    }

    /// Try to load configuration from the default location.
    ///
    /// Returns `Ok(None)` if the file doesn't exist, `Err` if it exists but can't be parsed.
    pub fn load_default() -> Result<Option<Self>> {
        Self::load_from_dir(Path::new("."))
    }

    /// Try to load `.registry-census.toml` from a directory.
    pub fn load_from_dir(dir: &Path) -> Result<Option<Self>> {
        let config_path = dir.join(CONFIG_FILE_NAME);

        if config_path.exists() {
            Ok(Some(Self::load(&config_path)?))
        } else {
            Ok(None)
        }
    }

    /// Merge this configuration with CLI arguments.
    ///
    /// CLI arguments take precedence over config file settings, but only
    /// when they were actually given.
    pub fn merge_with_args(&mut self, args: &crate::cli::Args) {
        if let Some(ref url) = args.api_url {
            self.registry.base_url = url.clone();
            if args.snapshot.is_none() {
                self.registry.snapshot = None;
            }
        }
        if let Some(timeout) = args.timeout {
            self.registry.timeout_seconds = timeout;
        }
        if let Some(ref snapshot) = args.snapshot {
            self.registry.snapshot = Some(snapshot.clone());
        }

        if let Some(format) = args.format {
            self.report.format = format;
        }
        if let Some(top) = args.top {
            self.report.top = Some(top);
        }
        if let Some(level) = args.level {
            self.report.level = Some(level.into());
        }

        if args.verbose {
            self.general.verbose = true;
        }
    }

    /// Generate a default configuration file content.
    pub fn default_toml() -> String {
        let config = Config::default();
        toml::to_string_pretty(&config).unwrap_or_else(|_| String::new())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::{Args, LevelArg};
    use clap::Parser;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.registry.base_url, DEFAULT_BASE_URL);
        assert_eq!(config.registry.timeout_seconds, 30);
        assert_eq!(config.report.format, OutputFormat::Table);
        assert!(config.registry.snapshot.is_none());
    }

    #[test]
    fn test_parse_config() {
        let toml_content = r#"
[general]
verbose = true

[registry]
base_url = "http://localhost:5000"
timeout_seconds = 5

[report]
format = "markdown"
top = 10
level = "district"
"#;

        let config: Config = toml::from_str(toml_content).unwrap();
        assert!(config.general.verbose);
        assert_eq!(config.registry.base_url, "http://localhost:5000");
        assert_eq!(config.registry.timeout_seconds, 5);
        assert_eq!(config.report.format, OutputFormat::Markdown);
        assert_eq!(config.report.top, Some(10));
        assert_eq!(config.report.level, Some(Level::District));
    }

    #[test]
    fn test_merge_with_args_only_overrides_given_flags() {
        let mut config: Config = toml::from_str(
            r#"
[registry]
base_url = "http://localhost:5000"
timeout_seconds = 5

[report]
top = 3
"#,
        )
        .unwrap();

        let mut args = Args::try_parse_from(["registry-census", "--format", "json"]).unwrap();
        args.api_url = None;
        args.level = Some(LevelArg::Seat);
        config.merge_with_args(&args);

        assert_eq!(config.registry.base_url, "http://localhost:5000");
        assert_eq!(config.registry.timeout_seconds, 5);
        assert_eq!(config.report.format, OutputFormat::Json);
        assert_eq!(config.report.top, Some(3));
        assert_eq!(config.report.level, Some(Level::Seat));
    }

    #[test]
    fn test_load_from_dir() {
        let dir = tempfile::tempdir().unwrap();
        assert!(Config::load_from_dir(dir.path()).unwrap().is_none());

        std::fs::write(
            dir.path().join(CONFIG_FILE_NAME),
            "[registry]\ntimeout_seconds = 12\n",
        )
        .unwrap();
        let config = Config::load_from_dir(dir.path()).unwrap().unwrap();
        assert_eq!(config.registry.timeout_seconds, 12);
        assert_eq!(config.registry.base_url, DEFAULT_BASE_URL);

        std::fs::write(dir.path().join(CONFIG_FILE_NAME), "[registry\n").unwrap();
        assert!(Config::load_from_dir(dir.path()).is_err());
    }

    #[test]
    fn test_default_toml_generation() {
        let toml_str = Config::default_toml();
        assert!(!toml_str.is_empty());
        assert!(toml_str.contains("[general]"));
        assert!(toml_str.contains("[registry]"));
        assert!(toml_str.contains("[report]"));

        let parsed: Config = toml::from_str(&toml_str).unwrap();
        assert_eq!(parsed.registry.timeout_seconds, 30);
    }
}
