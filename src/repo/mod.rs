//! Repository and trigger context.

pub mod context;

pub use context::{CommitReference, Invocation, RepoSlug};
