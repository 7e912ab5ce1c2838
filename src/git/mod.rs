//! Repository state management.
//!
//! Wraps the project's git working copy: branch naming and creation,
//! cleanliness checks, ahead/behind tracking, pre-merge validation and
//! merging back into the base branch.
//!
//! Local operations go through libgit2. Network operations (pull, push)
//! shell out to `git` so the user's credential helpers and SSH agent apply.

mod error;
mod manager;
pub mod naming;

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

pub use error::{GitError, GitResult};
pub use manager::{CommitSummary, RepositoryManager};
pub use naming::{name_branch, slugify, validate_name};

/// Kind prefix of a branch name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BranchKind {
    Feature,
    Bugfix,
    Hotfix,
    Refactor,
    Docs,
    Test,
    Chore,
    Release,
}

impl BranchKind {
    /// All kinds accepted by the naming grammar.
    pub const ALL: [Self; 8] = [
        Self::Feature,
        Self::Bugfix,
        Self::Hotfix,
        Self::Refactor,
        Self::Docs,
        Self::Test,
        Self::Chore,
        Self::Release,
    ];

    /// Prefix used in branch names.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Feature => "feature",
            Self::Bugfix => "bugfix",
            Self::Hotfix => "hotfix",
            Self::Refactor => "refactor",
            Self::Docs => "docs",
            Self::Test => "test",
            Self::Chore => "chore",
            Self::Release => "release",
        }
    }

    /// Conventional-commit type for checkpoints on this kind of branch.
    pub fn commit_type(&self) -> &'static str {
        match self {
            Self::Feature => "feat",
            Self::Bugfix | Self::Hotfix => "fix",
            Self::Refactor => "refactor",
            Self::Docs => "docs",
            Self::Test => "test",
            Self::Chore | Self::Release => "chore",
        }
    }
}

impl fmt::Display for BranchKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BranchKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|kind| kind.as_str() == s)
            .ok_or_else(|| format!("Unknown branch kind: {s}"))
    }
}

/// Input for deriving and creating a branch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BranchSpec {
    /// Branch kind (prefix)
    pub kind: BranchKind,

    /// Free-text name, slugged into the branch name
    pub name: String,

    /// What the branch is for; used in the checkpoint message
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    /// Issue reference, e.g. `#42` or `PROJ-7`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub issue: Option<String>,

    /// Branch to start from instead of the configured base
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base: Option<String>,
}

impl BranchSpec {
    /// Create a spec with only a kind and a name.
    pub fn new(kind: BranchKind, name: impl Into<String>) -> Self {
        Self { kind, name: name.into(), description: None, issue: None, base: None }
    }

    /// Shorthand for a feature branch.
    pub fn feature(name: impl Into<String>) -> Self {
        Self::new(BranchKind::Feature, name)
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_issue(mut self, issue: impl Into<String>) -> Self {
        self.issue = Some(issue.into());
        self
    }

    pub fn with_base(mut self, base: impl Into<String>) -> Self {
        self.base = Some(base.into());
        self
    }

    /// Conventional-commit message for the branch's first checkpoint.
    pub fn checkpoint_message(&self) -> String {
        let subject = self
            .description
            .as_deref()
            .map(str::trim)
            .filter(|d| !d.is_empty())
            .unwrap_or(self.name.trim());
        format!("{}: start {}", self.kind.commit_type(), subject.to_lowercase())
    }
}

/// Point-in-time snapshot of the working copy.
///
/// Recomputed on every [`RepositoryManager::current_state`] call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BranchInfo {
    /// Checked-out branch, `HEAD` when detached, `unknown` when unreadable
    pub current_branch: String,

    /// No staged, unstaged or untracked changes
    pub is_clean: bool,

    /// Commits ahead of upstream
    pub ahead: usize,

    /// Commits behind upstream
    pub behind: usize,

    /// Whether the configured remote exists
    pub has_remote: bool,

    /// Number of staged changes
    pub staged_count: usize,

    /// Number of unstaged changes
    pub unstaged_count: usize,

    /// Number of untracked files
    pub untracked_count: usize,
}

impl BranchInfo {
    /// Placeholder returned when the repository cannot be read.
    pub fn unknown() -> Self {
        Self {
            current_branch: "unknown".to_string(),
            is_clean: false,
            ahead: 0,
            behind: 0,
            has_remote: false,
            staged_count: 0,
            unstaged_count: 0,
            untracked_count: 0,
        }
    }

    /// Whether this snapshot came from a readable repository.
    pub fn is_known(&self) -> bool {
        self.current_branch != "unknown"
    }

    /// Get a compact status string for display.
    pub fn status_string(&self) -> String {
        let mut parts = Vec::new();

        if self.ahead > 0 {
            parts.push(format!("↑{}", self.ahead));
        }
        if self.behind > 0 {
            parts.push(format!("↓{}", self.behind));
        }
        if self.staged_count > 0 {
            parts.push(format!("●{}", self.staged_count));
        }
        if self.unstaged_count > 0 {
            parts.push(format!("✚{}", self.unstaged_count));
        }
        if self.untracked_count > 0 {
            parts.push(format!("?{}", self.untracked_count));
        }

        if parts.is_empty() {
            "✓".to_string()
        } else {
            parts.join(" ")
        }
    }
}

/// Itemized outcome of a name or merge-readiness check.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationResult {
    /// No errors were recorded
    pub valid: bool,

    /// Blocking problems
    pub errors: Vec<String>,

    /// Non-blocking problems
    pub warnings: Vec<String>,

    /// Things the user should do or consider
    pub suggestions: Vec<String>,
}

impl ValidationResult {
    /// Create a passing result.
    pub fn new() -> Self {
        Self { valid: true, errors: Vec::new(), warnings: Vec::new(), suggestions: Vec::new() }
    }

    /// Record an error; the result becomes invalid.
    pub fn add_error(&mut self, error: impl Into<String>) {
        self.valid = false;
        self.errors.push(error.into());
    }

    pub fn add_warning(&mut self, warning: impl Into<String>) {
        self.warnings.push(warning.into());
    }

    pub fn add_suggestion(&mut self, suggestion: impl Into<String>) {
        self.suggestions.push(suggestion.into());
    }
}

impl Default for ValidationResult {
    fn default() -> Self {
        Self::new()
    }
}

/// How a branch is folded into the base branch.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MergeStrategy {
    /// Merge commit, or fast-forward when possible
    #[default]
    Merge,
    /// One commit on the base carrying the branch's changes
    Squash,
    /// Replay the branch onto the base, then fast-forward
    Rebase,
}

impl MergeStrategy {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Merge => "merge",
            Self::Squash => "squash",
            Self::Rebase => "rebase",
        }
    }
}

impl FromStr for MergeStrategy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "merge" => Ok(Self::Merge),
            "squash" => Ok(Self::Squash),
            "rebase" => Ok(Self::Rebase),
            _ => Err(format!("Unknown merge strategy: {s} (expected merge, squash or rebase)")),
        }
    }
}

/// Outcome of [`RepositoryManager::create_branch`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BranchOutcome {
    pub success: bool,
    pub branch_name: String,
    pub message: String,
}

/// Outcome of [`RepositoryManager::merge_to_main`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MergeOutcome {
    pub success: bool,
    pub message: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_branch_kind_round_trip() {
        for kind in BranchKind::ALL {
            assert_eq!(kind.as_str().parse::<BranchKind>().unwrap(), kind);
        }
        assert!("Feature".parse::<BranchKind>().is_err());
    }

    #[test]
    fn test_checkpoint_message_prefers_description() {
        let spec = BranchSpec::feature("billing").with_description("Invoice Generation");
        assert_eq!(spec.checkpoint_message(), "feat: start invoice generation");

        let spec = BranchSpec::new(BranchKind::Hotfix, "Session leak");
        assert_eq!(spec.checkpoint_message(), "fix: start session leak");
    }

    #[test]
    fn test_unknown_state_is_dirty() {
        let info = BranchInfo::unknown();
        assert!(!info.is_clean);
        assert!(!info.is_known());
    }

    #[test]
    fn test_status_string() {
        let mut info = BranchInfo::unknown();
        info.current_branch = "main".to_string();
        info.is_clean = true;
        assert_eq!(info.status_string(), "✓");

        info.ahead = 1;
        info.behind = 2;
        info.untracked_count = 3;
        let status = info.status_string();
        assert!(status.contains("↑1"));
        assert!(status.contains("↓2"));
        assert!(status.contains("?3"));
    }

    #[test]
    fn test_validation_result_tracks_validity() {
        let mut result = ValidationResult::new();
        result.add_warning("heads up");
        assert!(result.valid);
        result.add_error("broken");
        assert!(!result.valid);
    }

    #[test]
    fn test_merge_strategy_parse() {
        assert_eq!("Squash".parse::<MergeStrategy>().unwrap(), MergeStrategy::Squash);
        assert!("octopus".parse::<MergeStrategy>().is_err());
    }
}
