//! Command-line interface argument parsing.
//!
//! This module handles all CLI argument parsing using clap,
//! including validation and default values.

use crate::models::Level;
use clap::Parser;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// registry-census - citizen counts for a hierarchical population registry
///
/// Walks every country, territory, district and seat of the registry and
/// reports how many citizens are registered at each level.
///
/// Examples:
///   registry-census
///   registry-census --country 1 --level district --top 10
///   registry-census --snapshot fixtures/registry.json --format markdown -o census.md
///   registry-census --list-citizens --country 1 --territory 10 --district 100
///   registry-census --watch 60
///   registry-census --init-config
#[derive(Parser, Debug, Clone)]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Args {
    /// Registry API base URL
    ///
    /// Overrides the config file. Can also be set via REGISTRY_API_URL.
    #[arg(long, value_name = "URL", env = "REGISTRY_API_URL")]
    pub api_url: Option<String>,

    /// Read the registry from a JSON snapshot instead of the API
    ///
    /// Takes precedence over --api-url and REGISTRY_API_URL.
    #[arg(long, value_name = "FILE")]
    pub snapshot: Option<PathBuf>,

    /// Only count the given country (also the root of --list-citizens)
    #[arg(long, value_name = "ID")]
    pub country: Option<u64>,

    /// Territory to select for --list-citizens
    #[arg(long, value_name = "ID")]
    pub territory: Option<u64>,

    /// District to select for --list-citizens
    #[arg(long, value_name = "ID")]
    pub district: Option<u64>,

    /// Seat to select for --list-citizens
    #[arg(long, value_name = "ID")]
    pub seat: Option<u64>,

    /// List the citizens of the selected district or seat instead of counting
    #[arg(long)]
    pub list_citizens: bool,

    /// Only report one level of the hierarchy
    #[arg(long, value_name = "LEVEL")]
    pub level: Option<LevelArg>,

    /// Maximum rows per level in the report
    #[arg(long, value_name = "COUNT")]
    pub top: Option<usize>,

    /// Output format (table, markdown, json)
    #[arg(long, value_name = "FORMAT")]
    pub format: Option<OutputFormat>,

    /// Write the report to a file instead of stdout
    #[arg(short, long, value_name = "FILE")]
    pub output: Option<PathBuf>,

    /// Per-request timeout in seconds
    #[arg(long, value_name = "SECS")]
    pub timeout: Option<u64>,

    /// Recount every SECS seconds until interrupted
    #[arg(long, value_name = "SECS")]
    pub watch: Option<u64>,

    /// Exit with code 2 if any part of the registry could not be fetched
    #[arg(long)]
    pub fail_on_incomplete: bool,

    /// Path to configuration file
    ///
    /// If not specified, looks for .registry-census.toml in the current directory
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Enable verbose logging output
    #[arg(short, long)]
    pub verbose: bool,

    /// Run in quiet mode (minimal output)
    #[arg(short, long)]
    pub quiet: bool,

    /// Generate a default .registry-census.toml configuration file
    #[arg(long)]
    pub init_config: bool,
}

/// Output format for the report.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// Plain-text table (default)
    #[default]
    Table,
    /// Markdown document
    Markdown,
    /// JSON document
    Json,
}

/// Hierarchy level for --level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum LevelArg {
    Country,
    Territory,
    District,
    Seat,
}

impl From<LevelArg> for Level {
    fn from(arg: LevelArg) -> Self {
        match arg {
            LevelArg::Country => Level::Country,
            LevelArg::Territory => Level::Territory,
            LevelArg::District => Level::District,
            LevelArg::Seat => Level::Seat,
        }
    }
}

impl Args {
    /// Parse command-line arguments.
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// Validate the parsed arguments.
    pub fn validate(&self) -> Result<(), String> {
        if self.init_config {
            return Ok(());
        }

        if let Some(ref url) = self.api_url {
            if !url.starts_with("http://") && !url.starts_with("https://") {
                return Err("API URL must start with 'http://' or 'https://'".to_string());
            }
        }

        if self.verbose && self.quiet {
            return Err("Cannot use both --verbose and --quiet".to_string());
        }

        if self.timeout == Some(0) {
            return Err("Timeout must be at least 1 second".to_string());
        }

        if self.watch == Some(0) {
            return Err("Watch interval must be at least 1 second".to_string());
        }

        if self.top == Some(0) {
            return Err("--top must be at least 1".to_string());
        }

        if self.list_citizens {
            if self.watch.is_some() {
                return Err("Cannot use --watch with --list-citizens".to_string());
            }
            if self.district.is_none() && self.seat.is_none() {
                return Err("--list-citizens needs a --district or --seat".to_string());
            }
        } else if self.territory.is_some() || self.district.is_some() || self.seat.is_some() {
            return Err("--territory, --district and --seat require --list-citizens".to_string());
        }

        if let Some(ref snapshot) = self.snapshot {
            if !snapshot.is_file() {
                return Err(format!("Snapshot file does not exist: {}", snapshot.display()));
            }
        }

        Ok(())
    }

    /// Returns the log level based on verbosity settings.
    pub fn log_level(&self) -> tracing::Level {
        if self.quiet {
            tracing::Level::ERROR
        } else if self.verbose {
            tracing::Level::DEBUG
        } else {
            tracing::Level::INFO
        }
    }
}
