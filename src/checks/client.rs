//! GitHub checks REST client.
//!
//! [`ChecksApi`] is the seam between the check-run lifecycle and the
//! remote service. [`GitHubChecksClient`] implements it over reqwest.

use crate::models::{CheckConclusion, CheckOutput, CheckStatus};
use crate::repo::RepoSlug;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, AUTHORIZATION, USER_AGENT};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;
use tracing::debug;

const GITHUB_API_VERSION: &str = "2022-11-28";

/// Errors from the check-run service.
#[derive(Error, Debug)]
pub enum ApiError {
    #[error("Request to {url} timed out after {seconds}s")]
    Timeout { url: String, seconds: u64 },

    #[error("Cannot connect to {url}")]
    Connect { url: String },

    #[error("Failed to send request to {url}: {source}")]
    Transport {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("GitHub API error {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Failed to parse GitHub API response: {0}")]
    Decode(#[source] reqwest::Error),

    #[error("Invalid API token")]
    InvalidToken,

    #[error("Failed to create HTTP client: {0}")]
    Client(#[source] reqwest::Error),
}

/// Body of a check-run create call.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CreateCheckRun {
    pub name: String,
    pub head_sha: String,
    pub status: CheckStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub started_at: Option<DateTime<Utc>>,
}

/// Body of a check-run update call.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UpdateCheckRun {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<CheckStatus>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub conclusion: Option<CheckConclusion>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
    pub output: CheckOutput,
}

/// The part of a check-run response this tool reads.
#[derive(Debug, Clone, Deserialize)]
pub struct CheckRunResponse {
    pub id: u64,
    #[serde(default)]
    pub html_url: Option<String>,
}

/// Remote check-run operations.
#[async_trait]
pub trait ChecksApi: Send + Sync {
    /// Create a check run and return its id.
    async fn create(
        &self,
        repo: &RepoSlug,
        request: &CreateCheckRun,
    ) -> Result<CheckRunResponse, ApiError>;

    /// Update an existing check run.
    async fn update(
        &self,
        repo: &RepoSlug,
        check_run_id: u64,
        request: &UpdateCheckRun,
    ) -> Result<(), ApiError>;
}

/// Settings for the REST client.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub api_url: String,
    pub token: String,
    pub timeout_seconds: u64,
}

/// reqwest-backed [`ChecksApi`].
pub struct GitHubChecksClient {
    config: ClientConfig,
    http_client: reqwest::Client,
}

impl GitHubChecksClient {
    /// Create a client authenticated with the configured token.
    pub fn new(config: ClientConfig) -> Result<Self, ApiError> {
        let mut headers = HeaderMap::new();

        let mut auth = HeaderValue::from_str(&format!("Bearer {}", config.token))
            .map_err(|_| ApiError::InvalidToken)?;
        auth.set_sensitive(true);
        headers.insert(AUTHORIZATION, auth);
        headers.insert(
            ACCEPT,
            HeaderValue::from_static("application/vnd.github+json"),
        );
        headers.insert(
            "X-GitHub-Api-Version",
            HeaderValue::from_static(GITHUB_API_VERSION),
        );
        headers.insert(
            USER_AGENT,
            HeaderValue::from_static(concat!("covercheck/", env!("CARGO_PKG_VERSION"))),
        );

        let http_client = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(Duration::from_secs(config.timeout_seconds))
            .build()
            .map_err(ApiError::Client)?;

        Ok(Self {
            config,
            http_client,
        })
    }

    fn check_runs_url(&self, repo: &RepoSlug) -> String {
        format!(
            "{}/repos/{}/{}/check-runs",
            self.config.api_url.trim_end_matches('/'),
            repo.owner,
            repo.repo
        )
    }

    fn classify(&self, url: &str, e: reqwest::Error) -> ApiError {
        if e.is_timeout() {
            ApiError::Timeout {
                url: url.to_string(),
                seconds: self.config.timeout_seconds,
            }
        } else if e.is_connect() {
            ApiError::Connect {
                url: url.to_string(),
            }
        } else {
            ApiError::Transport {
                url: url.to_string(),
                source: e,
            }
        }
    }

    async fn ensure_success(response: reqwest::Response) -> Result<reqwest::Response, ApiError> {
        if response.status().is_success() {
            return Ok(response);
        }

        let status = response.status().as_u16();
        let body = response.text().await.unwrap_or_default();
        Err(ApiError::Status { status, body })
    }
}

#[async_trait]
impl ChecksApi for GitHubChecksClient {
    async fn create(
        &self,
        repo: &RepoSlug,
        request: &CreateCheckRun,
    ) -> Result<CheckRunResponse, ApiError> {
        let url = self.check_runs_url(repo);
        debug!("POST {}", url);

        let response = self
            .http_client
            .post(&url)
            .json(request)
            .send()
            .await
            .map_err(|e| self.classify(&url, e))?;

        let response = Self::ensure_success(response).await?;
        response.json().await.map_err(ApiError::Decode)
    }

    async fn update(
        &self,
        repo: &RepoSlug,
        check_run_id: u64,
        request: &UpdateCheckRun,
    ) -> Result<(), ApiError> {
        let url = format!("{}/{}", self.check_runs_url(repo), check_run_id);
        debug!("PATCH {}", url);

        let response = self
            .http_client
            .patch(&url)
            .json(request)
            .send()
            .await
            .map_err(|e| self.classify(&url, e))?;

        Self::ensure_success(response).await?;
        Ok(())
    }
}
