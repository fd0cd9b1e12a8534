//! Report loader for discovering and parsing per-target coverage reports.
//!
//! Each target's coverage lives in its own artifact directory under a
//! common base directory:
//!
//! ```text
//! <base>/
//!   cover-<target>/
//!     cover.json      { "CoveragePercent": <number>, ... }
//! ```

use crate::models::TargetReport;
use serde::Deserialize;
use serde_json::Value;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info};
use walkdir::WalkDir;

/// Errors that abort a load. No partial result is ever returned.
#[derive(Error, Debug)]
pub enum LoadError {
    #[error("Coverage directory does not exist: {0}")]
    BaseDirMissing(PathBuf),

    #[error("Coverage path is not a directory: {0}")]
    NotADirectory(PathBuf),

    #[error("Cannot access coverage directory {path}: {source}")]
    ReadBaseDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Cannot read coverage directory {path}: {source}")]
    ReadDir {
        path: PathBuf,
        #[source]
        source: walkdir::Error,
    },

    #[error("Coverage report is missing: {0}")]
    MissingReport(PathBuf),

    #[error("Cannot read coverage report {path}: {source}")]
    ReadReport {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Cannot parse coverage report {path}: {source}")]
    ParseReport {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Coverage report {path} has an invalid CoveragePercent: {value}")]
    InvalidPercent { path: PathBuf, value: f64 },
}

/// Configuration for report discovery.
#[derive(Debug, Clone)]
pub struct LoaderConfig {
    /// Directory name prefix that marks a coverage artifact (e.g. `cover-`).
    pub dir_prefix: String,
    /// Report file read from each artifact directory.
    pub file_name: String,
}

impl Default for LoaderConfig {
    fn default() -> Self {
        Self {
            dir_prefix: "cover-".to_string(),
            file_name: "cover.json".to_string(),
        }
    }
}

impl From<&crate::config::ReportsConfig> for LoaderConfig {
    fn from(config: &crate::config::ReportsConfig) -> Self {
        Self {
            dir_prefix: config.dir_prefix.clone(),
            file_name: config.file_name.clone(),
        }
    }
}

/// On-disk shape of a coverage report.
#[derive(Debug, Deserialize)]
struct CoverFile {
    #[serde(rename = "CoveragePercent")]
    coverage_percent: f64,
}

/// Loads per-target coverage reports from a base directory.
pub struct ReportLoader {
    config: LoaderConfig,
}

impl ReportLoader {
    /// Create a new report loader.
    pub fn new(config: LoaderConfig) -> Self {
        Self { config }
    }

    /// Discover and parse every target report under `base_dir`.
    ///
    /// Targets come back in lexical order of their directory names.
    /// Entries that are not directories, or whose names lack the prefix,
    /// are skipped.
    pub fn load(&self, base_dir: &Path) -> Result<Vec<TargetReport>, LoadError> {
        match fs::metadata(base_dir) {
            Ok(meta) if meta.is_dir() => {}
            Ok(_) => return Err(LoadError::NotADirectory(base_dir.to_path_buf())),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                return Err(LoadError::BaseDirMissing(base_dir.to_path_buf()));
            }
            Err(source) => {
                return Err(LoadError::ReadBaseDir {
                    path: base_dir.to_path_buf(),
                    source,
                });
            }
        }

        let mut reports = Vec::new();

        let walker = WalkDir::new(base_dir)
            .min_depth(1)
            .max_depth(1)
            .follow_links(true)
            .sort_by_file_name();

        for entry in walker {
            let entry = entry.map_err(|source| LoadError::ReadDir {
                path: base_dir.to_path_buf(),
                source,
            })?;

            if !entry.file_type().is_dir() {
                debug!("Skipping non-directory entry: {}", entry.path().display());
                continue;
            }

            let name = entry.file_name().to_string_lossy();
            let Some(target_name) = self.target_name(&name) else {
                debug!("Skipping directory without '{}' prefix: {}", self.config.dir_prefix, name);
                continue;
            };

            let report = self.load_target(target_name, entry.path())?;
            debug!(
                "Loaded coverage for {}: {}%",
                report.target_name, report.coverage_percent
            );
            reports.push(report);
        }

        info!(
            "Loaded {} coverage report(s) from {}",
            reports.len(),
            base_dir.display()
        );

        Ok(reports)
    }

    /// Strip the artifact prefix from a directory name.
    fn target_name<'a>(&self, dir_name: &'a str) -> Option<&'a str> {
        dir_name
            .strip_prefix(self.config.dir_prefix.as_str())
            .filter(|suffix| !suffix.is_empty())
    }

    /// Read and parse the report file in one artifact directory.
    fn load_target(&self, target_name: &str, dir: &Path) -> Result<TargetReport, LoadError> {
        let path = dir.join(&self.config.file_name);

        if !path.is_file() {
            return Err(LoadError::MissingReport(path));
        }

        let content = fs::read_to_string(&path).map_err(|source| LoadError::ReadReport {
            path: path.clone(),
            source,
        })?;

        let raw: Value = serde_json::from_str(&content).map_err(|source| LoadError::ParseReport {
            path: path.clone(),
            source,
        })?;

        let cover: CoverFile =
            serde_json::from_value(raw.clone()).map_err(|source| LoadError::ParseReport {
                path: path.clone(),
                source,
            })?;

        let percent = cover.coverage_percent;
        if !percent.is_finite() || !(0.0..=100.0).contains(&percent) {
            return Err(LoadError::InvalidPercent {
                path,
                value: percent,
            });
        }

        Ok(TargetReport {
            target_name: target_name.to_string(),
            coverage_percent: percent,
            raw,
        })
    }
}
