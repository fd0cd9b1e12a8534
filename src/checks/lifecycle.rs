//! Two-phase check-run lifecycle.
//!
//! A check run is opened `in_progress` and later closed `completed`.
//! [`OpenCheck`] is only produced by [`CheckLifecycle::open`] and is
//! consumed by [`CheckLifecycle::close`], so a run can be closed at most
//! once.

use crate::checks::client::{ApiError, ChecksApi, CreateCheckRun, UpdateCheckRun};
use crate::models::{AggregateResult, CheckConclusion, CheckOutput, CheckStatus};
use crate::repo::{CommitReference, RepoSlug};
use crate::report::render_output;
use chrono::Utc;
use tracing::{debug, info, warn};

/// The remote service rejects more annotations than this per request.
pub const MAX_ANNOTATIONS_PER_REQUEST: usize = 50;

/// A check run that has been created and not yet completed.
#[derive(Debug)]
#[must_use = "an open check run must be closed"]
pub struct OpenCheck {
    id: u64,
}

impl OpenCheck {
    pub fn id(&self) -> u64 {
        self.id
    }
}

/// Drives one check run from creation to completion.
pub struct CheckLifecycle<'a> {
    api: &'a dyn ChecksApi,
    repo: RepoSlug,
    title: String,
}

impl<'a> CheckLifecycle<'a> {
    pub fn new(api: &'a dyn ChecksApi, repo: RepoSlug, title: impl Into<String>) -> Self {
        Self {
            api,
            repo,
            title: title.into(),
        }
    }

    /// Create an `in_progress` check run on `commit`.
    pub async fn open(&self, name: &str, commit: &CommitReference) -> Result<OpenCheck, ApiError> {
        let request = CreateCheckRun {
            name: name.to_string(),
            head_sha: commit.as_str().to_string(),
            status: CheckStatus::InProgress,
            started_at: Some(Utc::now()),
        };

        let created = self.api.create(&self.repo, &request).await?;

        match created.html_url.as_deref() {
            Some(url) => info!("Opened check run {} ({})", created.id, url),
            None => info!("Opened check run {}", created.id),
        }

        Ok(OpenCheck { id: created.id })
    }

    /// Complete the check run with the given result.
    ///
    /// The completing update carries the first batch of annotations; any
    /// further batches are appended with output-only updates. Only the
    /// completing update can fail the close: once the run is completed, a
    /// rejected follow-up batch is logged and the remaining batches dropped.
    pub async fn close(
        &self,
        check: OpenCheck,
        result: &AggregateResult,
    ) -> Result<CheckConclusion, ApiError> {
        let conclusion = result.conclusion();
        let output = render_output(result, &self.title);
        let (first, rest) = split_output(output);

        let request = UpdateCheckRun {
            status: Some(CheckStatus::Completed),
            conclusion: Some(conclusion),
            completed_at: Some(Utc::now()),
            output: first,
        };
        self.api.update(&self.repo, check.id, &request).await?;
        info!("Closed check run {} with conclusion {}", check.id, conclusion);

        for output in rest {
            debug!(
                "Appending {} annotation(s) to check run {}",
                output.annotations.len(),
                check.id
            );
            let request = UpdateCheckRun {
                status: None,
                conclusion: None,
                completed_at: None,
                output,
            };
            if let Err(e) = self.api.update(&self.repo, check.id, &request).await {
                warn!(
                    "Check run {} is completed but some annotations were not attached: {}",
                    check.id, e
                );
                break;
            }
        }

        Ok(conclusion)
    }
}

/// Split an output into the completing payload and the follow-up
/// payloads, each carrying at most [`MAX_ANNOTATIONS_PER_REQUEST`]
/// annotations.
fn split_output(output: CheckOutput) -> (CheckOutput, Vec<CheckOutput>) {
    let CheckOutput {
        title,
        summary,
        text,
        mut annotations,
    } = output;

    let overflow = if annotations.len() > MAX_ANNOTATIONS_PER_REQUEST {
        annotations.split_off(MAX_ANNOTATIONS_PER_REQUEST)
    } else {
        Vec::new()
    };

    let rest = overflow
        .chunks(MAX_ANNOTATIONS_PER_REQUEST)
        .map(|chunk| CheckOutput {
            title: title.clone(),
            summary: summary.clone(),
            text: text.clone(),
            annotations: chunk.to_vec(),
        })
        .collect();

    let first = CheckOutput {
        title,
        summary,
        text,
        annotations,
    };

    (first, rest)
}
