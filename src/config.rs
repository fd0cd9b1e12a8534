//! Configuration file handling.
//!
//! This module handles loading and merging configuration from
//! `.covercheck.toml` files.

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Default configuration file name.
pub const DEFAULT_CONFIG_FILE: &str = ".covercheck.toml";

/// Root configuration structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// GitHub API settings.
    #[serde(default)]
    pub github: GitHubConfig,

    /// Coverage artifact layout.
    #[serde(default)]
    pub reports: ReportsConfig,

    /// Check-run presentation.
    #[serde(default)]
    pub check: CheckConfig,
}

/// GitHub API settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GitHubConfig {
    /// REST API base URL.
    #[serde(default = "default_api_url")]
    pub api_url: String,

    /// Request timeout in seconds.
    #[serde(default = "default_timeout")]
    pub timeout_seconds: u64,
}

impl Default for GitHubConfig {
    fn default() -> Self {
        Self {
            api_url: default_api_url(),
            timeout_seconds: default_timeout(),
        }
    }
}

fn default_api_url() -> String {
    "https://api.github.com".to_string()
}

fn default_timeout() -> u64 {
    30
}

/// Coverage artifact layout.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportsConfig {
    /// Prefix of each per-target artifact directory.
    #[serde(default = "default_dir_prefix")]
    pub dir_prefix: String,

    /// Report file inside each artifact directory.
    #[serde(default = "default_file_name")]
    pub file_name: String,
}

impl Default for ReportsConfig {
    fn default() -> Self {
        Self {
            dir_prefix: default_dir_prefix(),
            file_name: default_file_name(),
        }
    }
}

fn default_dir_prefix() -> String {
    "cover-".to_string()
}

fn default_file_name() -> String {
    "cover.json".to_string()
}

/// Check-run presentation settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckConfig {
    /// Output title shown on the check run.
    #[serde(default = "default_title")]
    pub title: String,

    /// File the failure annotation is attached to.
    #[serde(default = "default_annotation_path")]
    pub annotation_path: String,
}

impl Default for CheckConfig {
    fn default() -> Self {
        Self {
            title: default_title(),
            annotation_path: default_annotation_path(),
        }
    }
}

fn default_title() -> String {
    "Test Coverage".to_string()
}

fn default_annotation_path() -> String {
    crate::models::DEFAULT_ANNOTATION_PATH.to_string()
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
        let default_path = Path::new(DEFAULT_CONFIG_FILE);

        if default_path.exists() {
            Ok(Some(Self::load(default_path)?))
        } else {
            Ok(None)
        }
    }

    /// Merge this configuration with CLI arguments.
    ///
    /// Only values given explicitly on the command line override the file.
    pub fn merge_with_args(&mut self, args: &crate::cli::Args) {
        if let Some(ref api_url) = args.api_url {
            self.github.api_url = api_url.clone();
        }

        if let Some(timeout) = args.timeout {
            self.github.timeout_seconds = timeout;
        }
    }

    /// Check the merged settings before any request is made.
    ///
    /// Catches values that only a config file can carry past `Args::validate`.
    pub fn validate(&self) -> Result<()> {
        if self.github.timeout_seconds == 0 {
            bail!("[github] timeout_seconds must be greater than zero");
        }

        let api_url = self.github.api_url.trim();
        if !(api_url.starts_with("http://") || api_url.starts_with("https://")) {
            bail!(
                "[github] api_url must be an http(s) URL, got '{}'",
                self.github.api_url
            );
        }

        Ok(())
    }

    /// Generate a default configuration file content.
    pub fn default_toml() -> String {
        let config = Config::default();
        toml::to_string_pretty(&config).unwrap_or_else(|_| String::new())
    }
}
