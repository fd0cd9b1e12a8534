//! Coverage aggregation.
//!
//! Merges per-target reports into the single result published on the
//! check run. Pure functions, no I/O.

use crate::models::{AggregateResult, Annotation, AnnotationLevel, TargetReport};

/// First line of every successful summary.
pub const SUMMARY_HEADER: &str = "Total test coverage:";

/// Title of the annotation attached to a failed run.
pub const FAILURE_TITLE: &str = "Failed to process test coverage";

/// Merge loaded reports into an aggregate result.
///
/// Reports are listed in input order. An empty input is valid and yields
/// just the header line. No threshold is applied.
pub fn aggregate(reports: Vec<TargetReport>) -> AggregateResult {
    AggregateResult {
        summary_text: summary_text(&reports),
        per_target: reports,
        failed: false,
        failure_reason: None,
        annotations: Vec::new(),
    }
}

/// Build the result published when reports could not be loaded.
///
/// `annotation_path` is the file the failure annotation is attached to.
pub fn failure_result(reason: &str, annotation_path: &str) -> AggregateResult {
    AggregateResult {
        per_target: Vec::new(),
        summary_text: format!("Failed: {}", reason),
        failed: true,
        failure_reason: Some(reason.to_string()),
        annotations: vec![Annotation::unlocated(
            annotation_path,
            AnnotationLevel::Failure,
            FAILURE_TITLE,
            reason,
        )],
    }
}

/// Generate the summary: a header then one line per target.
pub fn summary_text(reports: &[TargetReport]) -> String {
    let mut lines = Vec::with_capacity(reports.len() + 1);

    lines.push(SUMMARY_HEADER.to_string());
    for report in reports {
        lines.push(format!(
            "* {}: {}%",
            report.target_name, report.coverage_percent
        ));
    }

    lines.join("\n")
}
