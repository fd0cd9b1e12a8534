//! Data models for the coverage check.
//!
//! This module contains the core data structures shared by the loader,
//! the aggregator and the check-run lifecycle.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

/// Path GitHub uses for annotations that have no specific location.
pub const DEFAULT_ANNOTATION_PATH: &str = ".github";

/// Line GitHub uses for annotations that have no specific location.
pub const DEFAULT_ANNOTATION_LINE: u32 = 1;

/// Coverage result for a single build target.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TargetReport {
    /// Target name (the artifact directory name without its prefix).
    pub target_name: String,
    /// Coverage percentage, 0 to 100.
    pub coverage_percent: f64,
    /// The parsed report document as found on disk.
    #[serde(skip_serializing_if = "Value::is_null", default)]
    pub raw: Value,
}

impl TargetReport {
    #[allow(dead_code)] // Convenience constructor for tests
    pub fn new(target_name: impl Into<String>, coverage_percent: f64) -> Self {
        Self {
            target_name: target_name.into(),
            coverage_percent,
            raw: Value::Null,
        }
    }
}

/// Severity of a check-run annotation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
#[allow(dead_code)] // Failures are the only annotations produced today
pub enum AnnotationLevel {
    Notice,
    Warning,
    Failure,
}

/// An inline comment attached to a check run's output.
///
/// Serialises to the field names the GitHub checks API expects.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Annotation {
    #[serde(rename = "path")]
    pub file_path: String,
    pub start_line: u32,
    pub end_line: u32,
    #[serde(rename = "annotation_level")]
    pub severity: AnnotationLevel,
    pub title: String,
    pub message: String,
}

impl Annotation {
    /// Build an annotation that is not tied to any source location.
    pub fn unlocated(
        file_path: impl Into<String>,
        severity: AnnotationLevel,
        title: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            file_path: file_path.into(),
            start_line: DEFAULT_ANNOTATION_LINE,
            end_line: DEFAULT_ANNOTATION_LINE,
            severity,
            title: title.into(),
            message: message.into(),
        }
    }
}

/// Run-level outcome handed to the check-run lifecycle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AggregateResult {
    /// Per-target results in discovery order.
    pub per_target: Vec<TargetReport>,
    /// Human-readable summary shown on the check run.
    pub summary_text: String,
    /// Whether coverage processing failed.
    pub failed: bool,
    /// Why processing failed. Present iff `failed`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub failure_reason: Option<String>,
    /// Annotations; empty unless `failed`.
    pub annotations: Vec<Annotation>,
}

impl AggregateResult {
    /// The conclusion the check run should be completed with.
    pub fn conclusion(&self) -> CheckConclusion {
        if self.failed {
            CheckConclusion::Failure
        } else {
            CheckConclusion::Success
        }
    }
}

/// Status of a check run on the remote side.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[allow(dead_code)] // Queued is never requested
pub enum CheckStatus {
    Queued,
    InProgress,
    Completed,
}

/// Final conclusion of a completed check run.
///
/// Only `Success` and `Failure` are ever emitted; the rest mirror the
/// values the remote service accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[allow(dead_code)] // Accepted by the API, never produced here
pub enum CheckConclusion {
    Success,
    Failure,
    Neutral,
    Cancelled,
    TimedOut,
    ActionRequired,
    Skipped,
}

impl fmt::Display for CheckConclusion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            CheckConclusion::Success => "success",
            CheckConclusion::Failure => "failure",
            CheckConclusion::Neutral => "neutral",
            CheckConclusion::Cancelled => "cancelled",
            CheckConclusion::TimedOut => "timed_out",
            CheckConclusion::ActionRequired => "action_required",
            CheckConclusion::Skipped => "skipped",
        };
        write!(f, "{}", s)
    }
}

/// Output payload of a check run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CheckOutput {
    pub title: String,
    pub summary: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    pub annotations: Vec<Annotation>,
}
