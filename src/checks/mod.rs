//! Remote check-run client and lifecycle.

pub mod client;
pub mod lifecycle;

#[cfg(test)]
pub mod fake;

pub use client::{ChecksApi, ClientConfig, GitHubChecksClient};
pub use lifecycle::CheckLifecycle;
