//! Run orchestration.
//!
//! Resolves the commit, opens the check run, loads and aggregates the
//! coverage reports, and closes the check run. Once a check run is open,
//! a close is attempted on every path: a load failure becomes a failed
//! result instead of an error.

use crate::analysis::{aggregate, failure_result};
use crate::checks::{ChecksApi, CheckLifecycle};
use crate::models::{AggregateResult, CheckConclusion};
use crate::repo::Invocation;
use crate::scanner::{LoaderConfig, ReportLoader};
use anyhow::{Context, Result};
use std::path::PathBuf;
use tracing::{error, info, warn};

/// Inputs for a single run.
#[derive(Debug, Clone)]
pub struct RunSettings {
    /// Check run display name.
    pub name: String,
    /// Base directory holding the per-target coverage directories.
    pub coverage_path: PathBuf,
    pub loader: LoaderConfig,
    /// Output title of the check run.
    pub title: String,
    /// File the failure annotation is attached to.
    pub annotation_path: String,
}

/// What a completed run published.
#[derive(Debug, Clone, PartialEq)]
pub struct RunOutcome {
    pub check_run_id: u64,
    pub conclusion: CheckConclusion,
    pub result: AggregateResult,
}

/// Process exit code for a finished run.
///
/// A completed check run exits 0 even when its conclusion is `failure`;
/// only an error from [`run`] exits 1.
pub fn exit_code(outcome: &Result<RunOutcome>) -> i32 {
    match outcome {
        Ok(_) => 0,
        Err(_) => 1,
    }
}

/// Load and aggregate the coverage reports.
///
/// Never fails: a load error is turned into a failed result.
pub fn collect_result(settings: &RunSettings) -> AggregateResult {
    let loader = ReportLoader::new(settings.loader.clone());

    match loader.load(&settings.coverage_path) {
        Ok(reports) => aggregate(reports),
        Err(e) => {
            warn!("Failed to load coverage reports: {}", e);
            failure_result(&e.to_string(), &settings.annotation_path)
        }
    }
}

/// Publish coverage as a check run.
///
/// Errors are fatal: an unresolved commit or a failed create leave no
/// check run behind, while a failed close leaves the run `in_progress`.
pub async fn run(
    settings: &RunSettings,
    invocation: &Invocation,
    api: &dyn ChecksApi,
) -> Result<RunOutcome> {
    let commit = invocation
        .trigger
        .resolve()
        .context("Cannot determine the commit to attach the check run to")?;
    info!("Reporting coverage for {} at {}", invocation.repo, commit);

    let lifecycle = CheckLifecycle::new(api, invocation.repo.clone(), settings.title.clone());

    let check = lifecycle
        .open(&settings.name, &commit)
        .await
        .with_context(|| format!("Failed to create check run '{}'", settings.name))?;
    let check_run_id = check.id();

    let result = collect_result(settings);

    match lifecycle.close(check, &result).await {
        Ok(conclusion) => Ok(RunOutcome {
            check_run_id,
            conclusion,
            result,
        }),
        Err(e) => {
            error!(
                "Check run {} could not be completed and is left in progress: {}",
                check_run_id, e
            );
            Err(e).with_context(|| format!("Failed to complete check run {}", check_run_id))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::checks::fake::FakeChecksApi;
    use crate::models::CheckStatus;
    use crate::repo::context::TriggerContext;
    use crate::repo::RepoSlug;
    use std::fs;
    use std::path::Path;
    use tempfile::TempDir;

    fn settings(path: &Path) -> RunSettings {
        RunSettings {
            name: "coverage".to_string(),
            coverage_path: path.to_path_buf(),
            loader: LoaderConfig::default(),
            title: "Test Coverage".to_string(),
            annotation_path: ".github".to_string(),
        }
    }

    fn invocation(trigger: TriggerContext) -> Invocation {
        Invocation {
            trigger,
            repo: RepoSlug::parse("acme/widgets").unwrap(),
        }
    }

    fn push(sha: &str) -> Invocation {
        invocation(TriggerContext::DirectCommit {
            sha: sha.to_string(),
        })
    }

    fn write_report(base: &Path, target: &str, percent: &str) {
        let dir = base.join(format!("cover-{}", target));
        fs::create_dir_all(&dir).unwrap();
        fs::write(
            dir.join("cover.json"),
            format!(r#"{{"CoveragePercent": {}}}"#, percent),
        )
        .unwrap();
    }

    #[tokio::test]
    async fn test_end_to_end_success() {
        let temp = TempDir::new().unwrap();
        write_report(temp.path(), "linux", "90");
        write_report(temp.path(), "windows", "85");
        let api = FakeChecksApi::new();

        let outcome = run(&settings(temp.path()), &push("abc123"), &api)
            .await
            .unwrap();

        assert_eq!(outcome.conclusion, CheckConclusion::Success);
        assert!(!outcome.result.failed);
        assert_eq!(
            outcome.result.summary_text,
            "Total test coverage:\n* linux: 90%\n* windows: 85%"
        );

        let creates = api.creates();
        assert_eq!(creates.len(), 1);
        assert_eq!(creates[0].head_sha, "abc123");
        assert_eq!(creates[0].status, CheckStatus::InProgress);

        let updates = api.updates();
        assert_eq!(updates.len(), 1);
        assert_eq!(updates[0].0, outcome.check_run_id);
        assert_eq!(updates[0].1.status, Some(CheckStatus::Completed));
        assert_eq!(updates[0].1.conclusion, Some(CheckConclusion::Success));
    }

    #[tokio::test]
    async fn test_missing_directory_closes_as_failure() {
        let temp = TempDir::new().unwrap();
        let api = FakeChecksApi::new();

        let outcome = run(
            &settings(&temp.path().join("missing")),
            &push("abc123"),
            &api,
        )
        .await
        .unwrap();

        assert_eq!(outcome.conclusion, CheckConclusion::Failure);

        let updates = api.updates();
        assert_eq!(updates.len(), 1);
        let request = &updates[0].1;
        assert_eq!(request.status, Some(CheckStatus::Completed));
        assert_eq!(request.conclusion, Some(CheckConclusion::Failure));
        assert!(request.output.summary.starts_with("Failed:"));
        assert_eq!(request.output.annotations.len(), 1);
    }

    #[tokio::test]
    async fn test_malformed_report_closes_as_failure() {
        let temp = TempDir::new().unwrap();
        write_report(temp.path(), "linux", "90");
        write_report(temp.path(), "windows", "\"eighty\"");
        let api = FakeChecksApi::new();

        let outcome = run(&settings(temp.path()), &push("abc123"), &api)
            .await
            .unwrap();

        assert!(outcome.result.failed);
        assert!(outcome.result.per_target.is_empty());
        assert!(outcome
            .result
            .failure_reason
            .as_deref()
            .unwrap()
            .contains("cover-windows"));
    }

    #[tokio::test]
    async fn test_pull_request_uses_head_sha() {
        let temp = TempDir::new().unwrap();
        write_report(temp.path(), "linux", "90");
        let api = FakeChecksApi::new();
        let trigger = TriggerContext::PullRequest {
            head_sha: Some("def456".to_string()),
            fallback_after: Some("abc123".to_string()),
        };

        run(&settings(temp.path()), &invocation(trigger), &api)
            .await
            .unwrap();

        assert_eq!(api.creates()[0].head_sha, "def456");
    }

    #[tokio::test]
    async fn test_unresolved_commit_touches_nothing() {
        let temp = TempDir::new().unwrap();
        let api = FakeChecksApi::new();
        let trigger = TriggerContext::PullRequest {
            head_sha: Some(String::new()),
            fallback_after: Some(String::new()),
        };

        let result = run(&settings(temp.path()), &invocation(trigger), &api).await;

        assert!(result.is_err());
        assert!(api.calls().is_empty());
    }

    #[tokio::test]
    async fn test_open_failure_is_fatal() {
        let temp = TempDir::new().unwrap();
        let api = FakeChecksApi::failing_create();

        let result = run(&settings(temp.path()), &push("abc123"), &api).await;

        assert!(result.is_err());
        assert!(api.updates().is_empty());
    }

    #[tokio::test]
    async fn test_close_failure_is_fatal() {
        let temp = TempDir::new().unwrap();
        write_report(temp.path(), "linux", "90");
        let api = FakeChecksApi::failing_update();

        let result = run(&settings(temp.path()), &push("abc123"), &api).await;

        let err = result.unwrap_err();
        assert!(err.to_string().contains("Failed to complete check run"));
        assert_eq!(api.updates().len(), 1);
    }

    #[tokio::test]
    async fn test_two_runs_create_two_check_runs() {
        let temp = TempDir::new().unwrap();
        write_report(temp.path(), "linux", "90");
        let api = FakeChecksApi::new();
        let settings = settings(temp.path());

        let first = run(&settings, &push("abc123"), &api).await.unwrap();
        let second = run(&settings, &push("abc123"), &api).await.unwrap();

        assert_ne!(first.check_run_id, second.check_run_id);
        assert_eq!(api.creates().len(), 2);
    }

    #[tokio::test]
    async fn test_load_failure_after_close_exits_zero() {
        let temp = TempDir::new().unwrap();
        let api = FakeChecksApi::new();

        let outcome = run(
            &settings(&temp.path().join("missing")),
            &push("abc123"),
            &api,
        )
        .await;

        assert_eq!(exit_code(&outcome), 0);
        assert_eq!(outcome.unwrap().conclusion, CheckConclusion::Failure);
    }

    #[tokio::test]
    async fn test_fatal_errors_exit_one() {
        let temp = TempDir::new().unwrap();

        let open_failed = run(
            &settings(temp.path()),
            &push("abc123"),
            &FakeChecksApi::failing_create(),
        )
        .await;
        assert_eq!(exit_code(&open_failed), 1);

        let close_failed = run(
            &settings(temp.path()),
            &push("abc123"),
            &FakeChecksApi::failing_update(),
        )
        .await;
        assert_eq!(exit_code(&close_failed), 1);
    }

    #[test]
    fn test_collect_result_empty_directory() {
        let temp = TempDir::new().unwrap();
        let result = collect_result(&settings(temp.path()));

        assert!(!result.failed);
        assert_eq!(result.summary_text, "Total test coverage:");
    }
}
