//! Repository error types.

use std::path::PathBuf;
use thiserror::Error;

/// Result type for repository operations.
pub type GitResult<T> = Result<T, GitError>;

/// Errors raised inside the repository manager.
///
/// These never cross the manager's public API; they are folded into
/// result objects there.
#[derive(Debug, Error)]
pub enum GitError {
    /// No repository at the project root.
    #[error("Not a git repository: {}", .0.display())]
    NotARepository(PathBuf),

    /// Uncommitted changes present.
    #[error("Working copy has uncommitted changes")]
    DirtyWorkingCopy,

    /// Local branch missing.
    #[error("Branch not found: {0}")]
    BranchNotFound(String),

    /// Neither the base branch nor its fallback exists.
    #[error("No base branch found (tried '{primary}' and '{fallback}')")]
    NoBaseBranch { primary: String, fallback: String },

    /// Merge or rebase stopped on conflicts.
    #[error("Conflicts while applying {0}")]
    Conflict(String),

    /// A `git` CLI invocation failed.
    #[error("git {args} failed: {message}")]
    Command { args: String, message: String },

    /// libgit2 error.
    #[error("Git error: {0}")]
    Git2(#[from] git2::Error),

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
