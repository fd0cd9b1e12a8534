//! Command-line interface argument parsing.
//!
//! This module handles all CLI argument parsing using clap,
//! including validation and default values. Every input can also be
//! supplied through the environment variables a GitHub Actions step sets.

use clap::Parser;
use std::path::PathBuf;

/// CoverCheck - publish per-target test coverage as a GitHub check run
///
/// Reads `cover-<target>/cover.json` reports under a directory, merges
/// them into one summary, and attaches it to the triggering commit as a
/// completed check run.
///
/// Examples:
///   covercheck --token $GITHUB_TOKEN --name coverage --path ./coverage
///   covercheck --path ./coverage --dry-run
///   covercheck --init-config
#[derive(Parser, Debug, Clone)]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Args {
    /// Token for the GitHub checks API
    ///
    /// Falls back to GITHUB_TOKEN when INPUT_TOKEN is not set.
    #[arg(long, env = "INPUT_TOKEN", hide_env_values = true)]
    pub token: Option<String>,

    /// Display name of the check run
    #[arg(short, long, env = "INPUT_NAME")]
    pub name: Option<String>,

    /// Directory containing the per-target coverage directories
    #[arg(short, long, value_name = "DIR", env = "INPUT_PATH")]
    pub path: Option<PathBuf>,

    /// GitHub REST API base URL
    #[arg(long, value_name = "URL", env = "GITHUB_API_URL")]
    pub api_url: Option<String>,

    /// Path to configuration file
    ///
    /// If not specified, looks for .covercheck.toml in the current directory
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Request timeout in seconds for each GitHub API call
    #[arg(long, value_name = "SECS")]
    pub timeout: Option<u64>,

    /// Enable verbose logging output
    #[arg(short, long)]
    pub verbose: bool,

    /// Run in quiet mode (errors only)
    #[arg(short, long)]
    pub quiet: bool,

    /// Load and aggregate reports, print the result, and skip GitHub entirely
    #[arg(long)]
    pub dry_run: bool,

    /// Generate a default .covercheck.toml configuration file
    #[arg(long)]
    pub init_config: bool,
}

impl Args {
    /// Parse command-line arguments.
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// Validate the parsed arguments.
    pub fn validate(&self) -> Result<(), String> {
        // Skip validation for --init-config
        if self.init_config {
            return Ok(());
        }

        if self.verbose && self.quiet {
            return Err("Cannot use both --verbose and --quiet".to_string());
        }

        if is_blank(self.path.as_ref().map(|p| p.to_string_lossy().to_string())) {
            return Err("A coverage path is required (--path or INPUT_PATH)".to_string());
        }

        if let Some(timeout) = self.timeout {
            if timeout == 0 {
                return Err("Timeout must be at least 1 second".to_string());
            }
        }

        // The remaining inputs are only needed to talk to GitHub
        if self.dry_run {
            return Ok(());
        }

        if is_blank(self.effective_token()) {
            return Err("A token is required (--token, INPUT_TOKEN or GITHUB_TOKEN)".to_string());
        }

        if is_blank(self.name.clone()) {
            return Err("A check run name is required (--name or INPUT_NAME)".to_string());
        }

        if let Some(ref url) = self.api_url {
            if !url.starts_with("http://") && !url.starts_with("https://") {
                return Err("API URL must start with 'http://' or 'https://'".to_string());
            }
        }

        Ok(())
    }

    /// The token to authenticate with, falling back to GITHUB_TOKEN.
    pub fn effective_token(&self) -> Option<String> {
        self.token
            .clone()
            .filter(|t| !t.trim().is_empty())
            .or_else(|| std::env::var("GITHUB_TOKEN").ok())
    }

    /// Returns the check run name. Validated to be present.
    pub fn check_name(&self) -> &str {
        self.name.as_deref().unwrap_or("")
    }

    /// Returns the coverage base directory. Validated to be present.
    pub fn coverage_path(&self) -> PathBuf {
        self.path.clone().unwrap_or_default()
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

fn is_blank(value: Option<String>) -> bool {
    value.map_or(true, |v| v.trim().is_empty())
}
