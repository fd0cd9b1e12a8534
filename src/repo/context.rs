//! Trigger context and commit reference resolution.
//!
//! The invoking CI environment is read exactly once, at the process
//! boundary, into a [`TriggerContext`] and a [`RepoSlug`]. Everything
//! downstream receives those values explicitly.

use serde::Deserialize;
use std::fmt;
use std::path::Path;
use thiserror::Error;
use tracing::debug;

/// Errors raised while reading or resolving the trigger context.
#[derive(Error, Debug)]
pub enum ContextError {
    /// Neither the head SHA nor any fallback produced a commit.
    #[error("No commit reference could be resolved from the {0} trigger")]
    UnresolvedCommit(&'static str),

    /// The repository owner/name could not be determined.
    #[error("Repository could not be determined: {0}")]
    UnknownRepository(String),

    /// A required environment variable is missing.
    #[error("Environment variable {0} is not set")]
    MissingVariable(&'static str),

    /// The event payload file could not be read.
    #[error("Failed to read event payload {path}: {source}")]
    ReadPayload {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// The event payload file is not valid JSON.
    #[error("Failed to parse event payload {path}: {source}")]
    ParsePayload {
        path: String,
        #[source]
        source: serde_json::Error,
    },
}

/// The commit a check run is attached to. Immutable once resolved.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CommitReference(String);

impl CommitReference {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CommitReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// How the run was triggered.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TriggerContext {
    /// A push or any other event carrying a single commit.
    DirectCommit { sha: String },
    /// A pull request event; the head SHA wins, `after` is the fallback.
    PullRequest {
        head_sha: Option<String>,
        fallback_after: Option<String>,
    },
}

impl TriggerContext {
    /// Resolve the commit reference for this trigger.
    ///
    /// Empty strings count as absent.
    pub fn resolve(&self) -> Result<CommitReference, ContextError> {
        let candidate = match self {
            TriggerContext::DirectCommit { sha } => non_empty(Some(sha)),
            TriggerContext::PullRequest {
                head_sha,
                fallback_after,
            } => non_empty(head_sha.as_ref()).or_else(|| non_empty(fallback_after.as_ref())),
        };

        candidate
            .map(|sha| CommitReference(sha.to_string()))
            .ok_or(ContextError::UnresolvedCommit(self.kind()))
    }

    fn kind(&self) -> &'static str {
        match self {
            TriggerContext::DirectCommit { .. } => "direct commit",
            TriggerContext::PullRequest { .. } => "pull request",
        }
    }

    /// Build the trigger context from an event name, the commit SHA the
    /// runner reports, and the parsed event payload.
    pub fn from_event(event_name: &str, sha: Option<String>, payload: &EventPayload) -> Self {
        if event_name == "pull_request" {
            TriggerContext::PullRequest {
                head_sha: payload
                    .pull_request
                    .as_ref()
                    .and_then(|pr| pr.head.as_ref())
                    .and_then(|head| head.sha.clone()),
                fallback_after: payload.after.clone(),
            }
        } else {
            TriggerContext::DirectCommit {
                sha: sha.unwrap_or_default(),
            }
        }
    }
}

fn non_empty(value: Option<&String>) -> Option<&str> {
    value.map(|s| s.trim()).filter(|s| !s.is_empty())
}

/// Owner and name of the remote repository.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepoSlug {
    pub owner: String,
    pub repo: String,
}

impl RepoSlug {
    /// Parse an `owner/repo` string.
    pub fn parse(slug: &str) -> Option<Self> {
        let slug = slug.trim().trim_end_matches(".git");
        let (owner, repo) = slug.split_once('/')?;

        if owner.is_empty() || repo.is_empty() || repo.contains('/') {
            return None;
        }

        Some(Self {
            owner: owner.to_string(),
            repo: repo.to_string(),
        })
    }
}

impl fmt::Display for RepoSlug {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.owner, self.repo)
    }
}

/// The subset of a webhook event payload this tool reads.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct EventPayload {
    #[serde(default)]
    pub pull_request: Option<PullRequestPayload>,
    #[serde(default)]
    pub after: Option<String>,
    #[serde(default)]
    pub repository: Option<RepositoryPayload>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PullRequestPayload {
    #[serde(default)]
    pub head: Option<HeadPayload>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct HeadPayload {
    #[serde(default)]
    pub sha: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RepositoryPayload {
    pub name: String,
    pub owner: OwnerPayload,
}

#[derive(Debug, Clone, Deserialize)]
pub struct OwnerPayload {
    pub login: String,
}

impl EventPayload {
    /// Load and parse an event payload file.
    pub fn load(path: &Path) -> Result<Self, ContextError> {
        let content = std::fs::read_to_string(path).map_err(|source| ContextError::ReadPayload {
            path: path.display().to_string(),
            source,
        })?;

        serde_json::from_str(&content).map_err(|source| ContextError::ParsePayload {
            path: path.display().to_string(),
            source,
        })
    }
}

/// Everything read from the invoking environment.
#[derive(Debug, Clone)]
pub struct Invocation {
    pub trigger: TriggerContext,
    pub repo: RepoSlug,
}

impl Invocation {
    /// Read the trigger context from the GitHub Actions environment.
    pub fn from_env() -> Result<Self, ContextError> {
        let event_name = std::env::var("GITHUB_EVENT_NAME")
            .map_err(|_| ContextError::MissingVariable("GITHUB_EVENT_NAME"))?;
        let sha = std::env::var("GITHUB_SHA").ok();

        let payload = match std::env::var("GITHUB_EVENT_PATH") {
            Ok(path) if !path.is_empty() => EventPayload::load(Path::new(&path))?,
            _ => {
                debug!("GITHUB_EVENT_PATH not set, using an empty event payload");
                EventPayload::default()
            }
        };

        let repository = std::env::var("GITHUB_REPOSITORY").ok();
        Self::from_parts(&event_name, sha, &payload, repository.as_deref())
    }

    /// Assemble an invocation from already-read environment values.
    pub fn from_parts(
        event_name: &str,
        sha: Option<String>,
        payload: &EventPayload,
        repository: Option<&str>,
    ) -> Result<Self, ContextError> {
        let trigger = TriggerContext::from_event(event_name, sha, payload);

        let repo = match &payload.repository {
            Some(r) => RepoSlug {
                owner: r.owner.login.clone(),
                repo: r.name.clone(),
            },
            None => {
                let slug =
                    repository.ok_or(ContextError::MissingVariable("GITHUB_REPOSITORY"))?;
                RepoSlug::parse(slug)
                    .ok_or_else(|| ContextError::UnknownRepository(slug.to_string()))?
            }
        };

        debug!("Trigger: {:?}, repository: {}", trigger, repo);

        Ok(Self { trigger, repo })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pull_request(head: &str, after: &str) -> TriggerContext {
        TriggerContext::PullRequest {
            head_sha: Some(head.to_string()),
            fallback_after: Some(after.to_string()),
        }
    }

    #[test]
    fn test_pull_request_falls_back_to_after() {
        let commit = pull_request("", "abc123").resolve().unwrap();
        assert_eq!(commit.as_str(), "abc123");
    }

    #[test]
    fn test_pull_request_prefers_head_sha() {
        let commit = pull_request("def456", "abc123").resolve().unwrap();
        assert_eq!(commit.as_str(), "def456");
    }

    #[test]
    fn test_direct_commit_uses_sha() {
        let trigger = TriggerContext::DirectCommit {
            sha: "xyz789".to_string(),
        };
        assert_eq!(trigger.resolve().unwrap().as_str(), "xyz789");
    }

    #[test]
    fn test_pull_request_without_candidates_fails() {
        let result = pull_request("", "").resolve();
        assert!(matches!(result, Err(ContextError::UnresolvedCommit(_))));

        let missing = TriggerContext::PullRequest {
            head_sha: None,
            fallback_after: None,
        };
        assert!(missing.resolve().is_err());
    }

    #[test]
    fn test_direct_commit_empty_sha_fails() {
        let trigger = TriggerContext::DirectCommit { sha: String::new() };
        assert!(trigger.resolve().is_err());
    }

    #[test]
    fn test_from_event_pull_request_payload() {
        let payload: EventPayload = serde_json::from_str(
            r#"{
                "after": "abc123",
                "pull_request": { "head": { "sha": "def456", "ref": "feature" } },
                "repository": { "name": "widgets", "owner": { "login": "acme" } }
            }"#,
        )
        .unwrap();

        let invocation =
            Invocation::from_parts("pull_request", Some("merge".to_string()), &payload, None)
                .unwrap();

        assert_eq!(invocation.trigger.resolve().unwrap().as_str(), "def456");
        assert_eq!(invocation.repo.to_string(), "acme/widgets");
    }

    #[test]
    fn test_from_event_push_ignores_payload_shas() {
        let payload: EventPayload = serde_json::from_str(r#"{ "after": "abc123" }"#).unwrap();

        let invocation = Invocation::from_parts(
            "push",
            Some("xyz789".to_string()),
            &payload,
            Some("acme/widgets"),
        )
        .unwrap();

        assert_eq!(
            invocation.trigger,
            TriggerContext::DirectCommit {
                sha: "xyz789".to_string()
            }
        );
        assert_eq!(invocation.repo.owner, "acme");
    }

    #[test]
    fn test_missing_repository_is_an_error() {
        let result = Invocation::from_parts("push", Some("a".into()), &EventPayload::default(), None);
        assert!(matches!(result, Err(ContextError::MissingVariable(_))));

        let result = Invocation::from_parts(
            "push",
            Some("a".into()),
            &EventPayload::default(),
            Some("not-a-slug"),
        );
        assert!(matches!(result, Err(ContextError::UnknownRepository(_))));
    }

    #[test]
    fn test_parse_repo_slug() {
        assert_eq!(
            RepoSlug::parse("rust-lang/rust"),
            Some(RepoSlug {
                owner: "rust-lang".to_string(),
                repo: "rust".to_string()
            })
        );
        assert_eq!(RepoSlug::parse("a/b/c"), None);
        assert_eq!(RepoSlug::parse("/rust"), None);
    }

    #[test]
    fn test_event_payload_load_rejects_bad_json() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("event.json");
        std::fs::write(&path, "{ not json").unwrap();

        let result = EventPayload::load(&path);
        assert!(matches!(result, Err(ContextError::ParsePayload { .. })));
    }
}
