//! Check-run output generation.
//!
//! This module turns an aggregate result into the output payload shown
//! on the check run, and into JSON for dry runs.

use crate::models::{AggregateResult, CheckOutput, TargetReport};
use anyhow::Result;

/// Build the check-run output for an aggregate result.
pub fn render_output(result: &AggregateResult, title: &str) -> CheckOutput {
    let text = if result.failed || result.per_target.is_empty() {
        None
    } else {
        Some(generate_coverage_table(&result.per_target))
    };

    CheckOutput {
        title: title.to_string(),
        summary: result.summary_text.clone(),
        text,
        annotations: result.annotations.clone(),
    }
}

/// Generate a Markdown table of per-target coverage.
fn generate_coverage_table(reports: &[TargetReport]) -> String {
    let mut table = String::new();

    table.push_str("| Target | Coverage |\n");
    table.push_str("|:---|---:|\n");

    for report in reports {
        table.push_str(&format!(
            "| {} | {}% |\n",
            report.target_name, report.coverage_percent
        ));
    }

    table
}

/// Generate a JSON rendering of the aggregate result.
pub fn render_json(result: &AggregateResult) -> Result<String> {
    serde_json::to_string_pretty(result).map_err(Into::into)
}
