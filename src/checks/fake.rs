//! In-memory fake of the checks API (testing only).

use std::sync::Mutex;

use async_trait::async_trait;

use crate::checks::client::{
    ApiError, CheckRunResponse, ChecksApi, CreateCheckRun, UpdateCheckRun,
};
use crate::repo::RepoSlug;

/// A call received by [`FakeChecksApi`].
#[derive(Debug, Clone)]
pub enum RecordedCall {
    Create {
        repo: String,
        request: CreateCheckRun,
    },
    Update {
        repo: String,
        check_run_id: u64,
        request: UpdateCheckRun,
    },
}

/// Records every call and hands out sequential check-run ids.
#[derive(Debug, Default)]
pub struct FakeChecksApi {
    calls: Mutex<Vec<RecordedCall>>,
    fail_create: bool,
    /// Zero-based index of the first update to reject.
    fail_updates_from: Option<usize>,
}

impl FakeChecksApi {
    pub const FIRST_ID: u64 = 1000;

    pub fn new() -> Self {
        Self::default()
    }

    /// A fake whose create calls are rejected with 403.
    pub fn failing_create() -> Self {
        Self {
            fail_create: true,
            ..Self::default()
        }
    }

    /// A fake whose update calls are rejected with 502.
    pub fn failing_update() -> Self {
        Self::failing_update_after(0)
    }

    /// A fake that accepts the first `accepted` updates and rejects the rest.
    pub fn failing_update_after(accepted: usize) -> Self {
        Self {
            fail_updates_from: Some(accepted),
            ..Self::default()
        }
    }

    pub fn calls(&self) -> Vec<RecordedCall> {
        self.calls.lock().unwrap().clone()
    }

    pub fn creates(&self) -> Vec<CreateCheckRun> {
        self.calls()
            .into_iter()
            .filter_map(|call| match call {
                RecordedCall::Create { request, .. } => Some(request),
                RecordedCall::Update { .. } => None,
            })
            .collect()
    }

    pub fn updates(&self) -> Vec<(u64, UpdateCheckRun)> {
        self.calls()
            .into_iter()
            .filter_map(|call| match call {
                RecordedCall::Update {
                    check_run_id,
                    request,
                    ..
                } => Some((check_run_id, request)),
                RecordedCall::Create { .. } => None,
            })
            .collect()
    }
}

#[async_trait]
impl ChecksApi for FakeChecksApi {
    async fn create(
        &self,
        repo: &RepoSlug,
        request: &CreateCheckRun,
    ) -> Result<CheckRunResponse, ApiError> {
        if self.fail_create {
            return Err(ApiError::Status {
                status: 403,
                body: "Resource not accessible by integration".to_string(),
            });
        }

        let mut calls = self.calls.lock().unwrap();
        let created = calls
            .iter()
            .filter(|c| matches!(c, RecordedCall::Create { .. }))
            .count() as u64;
        calls.push(RecordedCall::Create {
            repo: repo.to_string(),
            request: request.clone(),
        });

        Ok(CheckRunResponse {
            id: Self::FIRST_ID + created,
            html_url: None,
        })
    }

    async fn update(
        &self,
        repo: &RepoSlug,
        check_run_id: u64,
        request: &UpdateCheckRun,
    ) -> Result<(), ApiError> {
        let mut calls = self.calls.lock().unwrap();
        let previous = calls
            .iter()
            .filter(|c| matches!(c, RecordedCall::Update { .. }))
            .count();
        calls.push(RecordedCall::Update {
            repo: repo.to_string(),
            check_run_id,
            request: request.clone(),
        });

        if self.fail_updates_from.is_some_and(|from| previous >= from) {
            return Err(ApiError::Status {
                status: 502,
                body: "Bad Gateway".to_string(),
            });
        }

        Ok(())
    }
}
