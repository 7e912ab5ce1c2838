//! Branch lifecycle operations on a working copy.

use std::path::{Path, PathBuf};
use std::process::Command;

use git2::build::CheckoutBuilder;
use git2::{
    BranchType, Commit, ErrorCode, IndexAddOption, Oid, RebaseOptions, Repository,
    RepositoryInitOptions, Signature, StatusOptions,
};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

use super::error::{GitError, GitResult};
use super::{
    naming, BranchInfo, BranchKind, BranchOutcome, BranchSpec, MergeOutcome, MergeStrategy,
    ValidationResult,
};
use crate::core::config::GitConfig;

static CONVENTIONAL_COMMIT: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"^(feat|fix|docs|style|refactor|perf|test|build|ci|chore|revert)(\([a-z0-9._/-]+\))?!?: \S",
    )
    .expect("valid conventional commit regex")
});

/// Identity used when the repository has no `user.name`/`user.email`.
const FALLBACK_AUTHOR: (&str, &str) = ("conductor", "conductor@localhost");

/// Short description of a commit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommitSummary {
    /// Abbreviated commit id
    pub id: String,

    /// First line of the message
    pub summary: String,

    /// Author name
    pub author: String,

    /// Commit time, seconds since the epoch
    pub time: i64,
}

/// Wraps a git working copy and exposes branch lifecycle operations.
///
/// Every public operation is infallible from the caller's side: failures are
/// logged and folded into `bool`s or result objects.
#[derive(Debug, Clone)]
pub struct RepositoryManager {
    root: PathBuf,
    config: GitConfig,
}

impl RepositoryManager {
    /// Create a manager for the working copy at `root`.
    pub fn new(root: impl Into<PathBuf>, config: GitConfig) -> Self {
        Self { root: root.into(), config }
    }

    /// Working copy root.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Version-control settings in effect.
    pub fn config(&self) -> &GitConfig {
        &self.config
    }

    /// Whether the root is inside a git working copy.
    pub fn is_initialized(&self) -> bool {
        self.open().is_ok()
    }

    /// Create the repository (and an initial commit) if needed.
    ///
    /// A root inside an existing working copy reuses that repository instead
    /// of nesting a new one. Idempotent. Returns `false` on any underlying
    /// failure.
    pub fn initialize(&self) -> bool {
        match self.try_initialize() {
            Ok(()) => true,
            Err(e) => {
                tracing::warn!(root = ?self.root, error = %e, "Failed to initialize repository");
                false
            }
        }
    }

    /// Snapshot the working copy.
    ///
    /// Returns [`BranchInfo::unknown`] when the repository cannot be read.
    pub fn current_state(&self) -> BranchInfo {
        match self.read_state() {
            Ok(info) => info,
            Err(e) => {
                tracing::debug!(root = ?self.root, error = %e, "Could not read repository state");
                BranchInfo::unknown()
            }
        }
    }

    /// Derive the branch name for a [`BranchSpec`].
    pub fn name_branch(&self, spec: &BranchSpec) -> String {
        naming::name_branch(spec)
    }

    /// Check a branch name against the grammar, warning on collisions.
    pub fn validate_name(&self, name: &str) -> ValidationResult {
        let mut result = naming::validate_name(name);

        if let Ok(repo) = self.open() {
            if repo.find_branch(name, BranchType::Local).is_ok() {
                result.add_warning(format!("Branch '{name}' already exists and will be reused"));
            }
        }

        result
    }

    /// Create (or switch to) the branch for `spec`.
    ///
    /// Refuses to run on a dirty working copy.
    pub fn create_branch(&self, spec: &BranchSpec) -> BranchOutcome {
        let branch_name = self.name_branch(spec);
        let state = self.current_state();

        if !state.is_known() {
            return BranchOutcome {
                success: false,
                branch_name,
                message: format!(
                    "No readable git repository at {}; run `conductor init` or `git init` first",
                    self.root.display()
                ),
            };
        }
        if !state.is_clean {
            return BranchOutcome {
                success: false,
                branch_name,
                message: format!(
                    "{}; commit or stash them before creating a branch",
                    GitError::DirtyWorkingCopy
                ),
            };
        }

        match self.try_create_branch(spec, &branch_name) {
            Ok(message) => {
                tracing::info!(branch = %branch_name, "Branch ready");
                BranchOutcome { success: true, branch_name, message }
            }
            Err(e) => {
                tracing::warn!(branch = %branch_name, error = %e, "Branch creation failed");
                BranchOutcome {
                    success: false,
                    message: format!("Failed to create branch '{branch_name}': {e}"),
                    branch_name,
                }
            }
        }
    }

    /// Check whether `branch` (default: the current branch) can be merged.
    pub fn validate_for_merge(&self, branch: Option<&str>) -> ValidationResult {
        let mut result = ValidationResult::new();
        let state = self.current_state();

        if !state.is_clean {
            if state.is_known() {
                result.add_error(format!("{}; commit or stash them first", GitError::DirtyWorkingCopy));
            } else {
                result.add_error(format!("No readable git repository at {}", self.root.display()));
            }
        }

        let branch = branch.map(String::from).unwrap_or_else(|| state.current_branch.clone());
        if state.is_known() {
            if let Err(e) = self.check_merge_readiness(&branch, &mut result) {
                result.add_error(format!("Unable to inspect branch '{branch}': {e}"));
            }
        }

        result.add_suggestion("Run the full test suite and review the diff manually before merging");
        result
    }

    /// Fold `branch` into the base branch and delete it.
    pub fn merge_to_main(&self, branch: &str, strategy: MergeStrategy) -> MergeOutcome {
        let validation = self.validate_for_merge(Some(branch));
        if !validation.valid {
            return MergeOutcome {
                success: false,
                message: format!("Pre-merge validation failed: {}", validation.errors.join("; ")),
            };
        }

        match self.try_merge(branch, strategy) {
            Ok(message) => {
                tracing::info!(branch, strategy = strategy.as_str(), "Branch merged");
                MergeOutcome { success: true, message }
            }
            Err(e) => {
                tracing::warn!(branch, error = %e, "Merge failed");
                MergeOutcome { success: false, message: format!("Failed to merge '{branch}': {e}") }
            }
        }
    }

    /// Get all local branch names.
    pub fn list_branches(&self) -> Vec<String> {
        let Ok(repo) = self.open() else {
            return Vec::new();
        };

        repo.branches(Some(BranchType::Local))
            .ok()
            .map(|branches| {
                branches
                    .filter_map(std::result::Result::ok)
                    .filter_map(|(branch, _)| branch.name().ok().flatten().map(String::from))
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Most recent commits reachable from HEAD, newest first.
    pub fn recent_commits(&self, limit: usize) -> Vec<CommitSummary> {
        self.read_commits(limit).unwrap_or_else(|e| {
            tracing::debug!(error = %e, "Could not read commit history");
            Vec::new()
        })
    }

    fn open(&self) -> GitResult<Repository> {
        Repository::discover(&self.root).map_err(|_| GitError::NotARepository(self.root.clone()))
    }

    fn try_initialize(&self) -> GitResult<()> {
        let repo = match self.open() {
            Ok(repo) => repo,
            Err(_) => {
                let mut opts = RepositoryInitOptions::new();
                opts.initial_head(&self.config.base_branch);
                tracing::info!(root = ?self.root, "Initializing git repository");
                Repository::init_opts(&self.root, &opts)?
            }
        };

        if is_unborn(&repo) {
            let mut index = repo.index()?;
            index.add_all(["*"].iter(), IndexAddOption::DEFAULT, None)?;
            index.write()?;
            let tree = repo.find_tree(index.write_tree()?)?;
            let sig = signature(&repo)?;
            repo.commit(Some("HEAD"), &sig, &sig, "chore: initial commit", &tree, &[])?;
        }

        Ok(())
    }

    fn read_state(&self) -> GitResult<BranchInfo> {
        let repo = self.open()?;
        let current_branch = head_name(&repo)?;
        let (staged_count, unstaged_count, untracked_count) = status_counts(&repo)?;
        let (ahead, behind) = ahead_behind(&repo);
        let has_remote = repo.find_remote(&self.config.remote).is_ok();

        Ok(BranchInfo {
            current_branch,
            is_clean: staged_count == 0 && unstaged_count == 0 && untracked_count == 0,
            ahead,
            behind,
            has_remote,
            staged_count,
            unstaged_count,
            untracked_count,
        })
    }

    fn try_create_branch(&self, spec: &BranchSpec, branch_name: &str) -> GitResult<String> {
        let repo = self.open()?;
        let base = self.resolve_base(&repo, spec.base.as_deref())?;

        checkout_branch(&repo, &base)?;
        self.sync(&repo, &base);

        if repo.find_branch(branch_name, BranchType::Local).is_ok() {
            checkout_branch(&repo, branch_name)?;
            return Ok(format!("Switched to existing branch '{branch_name}'"));
        }

        let base_commit = repo.find_branch(&base, BranchType::Local)?.get().peel_to_commit()?;
        repo.branch(branch_name, &base_commit, false)?;
        checkout_branch(&repo, branch_name)?;

        let sig = signature(&repo)?;
        let message = spec.checkpoint_message();
        repo.commit(Some("HEAD"), &sig, &sig, &message, &base_commit.tree()?, &[&base_commit])?;

        Ok(format!("Created branch '{branch_name}' from '{base}' with checkpoint \"{message}\""))
    }

    fn check_merge_readiness(&self, branch: &str, result: &mut ValidationResult) -> GitResult<()> {
        let repo = self.open()?;
        let base = self.resolve_base(&repo, None)?;

        if branch == base {
            result.add_error(format!("'{branch}' is the base branch; nothing to merge"));
            return Ok(());
        }

        let branch_oid = branch_tip(&repo, branch)?;
        let base_oid = branch_tip(&repo, &base)?;

        let naming = naming::validate_name(branch);
        if !naming.valid {
            result.add_warning(format!("Branch name '{branch}' does not follow <kind>/<name>"));
        }

        let (ahead, behind) = repo.graph_ahead_behind(branch_oid, base_oid)?;
        if behind > 0 {
            result.add_warning(format!(
                "'{branch}' is {behind} commit(s) behind '{base}'; consider rebasing first"
            ));
        }
        if ahead == 0 {
            result.add_warning(format!("'{branch}' has no commits that are not already on '{base}'"));
        }

        let mut walk = repo.revwalk()?;
        walk.push(branch_oid)?;
        walk.hide(base_oid)?;
        for oid in walk {
            let commit = repo.find_commit(oid?)?;
            let summary = commit.summary().unwrap_or_default();
            if commit.parent_count() < 2 && !CONVENTIONAL_COMMIT.is_match(summary) {
                result.add_warning(format!(
                    "Commit {} does not follow the conventional format: \"{summary}\"",
                    short_id(commit.id())
                ));
            }
        }

        Ok(())
    }

    fn try_merge(&self, branch: &str, strategy: MergeStrategy) -> GitResult<String> {
        let repo = self.open()?;
        let base = self.resolve_base(&repo, None)?;

        checkout_branch(&repo, &base)?;
        self.sync(&repo, &base);

        let base_commit = repo.find_commit(branch_tip(&repo, &base)?)?;
        let branch_commit = repo.find_commit(branch_tip(&repo, branch)?)?;
        let sig = signature(&repo)?;

        let applied = match strategy {
            MergeStrategy::Merge => merge_commit(&repo, &sig, &base, &base_commit, &branch_commit)?,
            MergeStrategy::Squash => squash(&repo, &sig, branch, &base_commit, &branch_commit)?,
            MergeStrategy::Rebase => rebase(&repo, &sig, &base, &base_commit, &branch_commit)?,
        };
        repo.checkout_head(Some(CheckoutBuilder::new().force()))?;

        let mut notes = vec![applied];
        if let Some(note) = self.publish(&repo, &base) {
            notes.push(note);
        }

        repo.find_branch(branch, BranchType::Local)?.delete()?;
        notes.push(format!("deleted '{branch}'"));
        self.delete_remote_branch(&repo, branch);

        Ok(format!("Merged '{branch}' into '{base}' ({})", notes.join("; ")))
    }

    /// First existing branch among the requested/configured base and its fallback.
    fn resolve_base(&self, repo: &Repository, requested: Option<&str>) -> GitResult<String> {
        let primary = requested.unwrap_or(&self.config.base_branch);
        let fallback = &self.config.fallback_base_branch;

        [primary, fallback.as_str()]
            .into_iter()
            .find(|name| repo.find_branch(name, BranchType::Local).is_ok())
            .map(String::from)
            .ok_or_else(|| GitError::NoBaseBranch {
                primary: primary.to_string(),
                fallback: fallback.clone(),
            })
    }

    fn has_remote(&self, repo: &Repository) -> bool {
        self.config.sync && repo.find_remote(&self.config.remote).is_ok()
    }

    /// Best-effort fast-forward of `branch` from the remote.
    fn sync(&self, repo: &Repository, branch: &str) {
        if !self.has_remote(repo) {
            return;
        }
        if let Err(e) = self.run_git(&["pull", "--ff-only", &self.config.remote, branch]) {
            tracing::warn!(branch, error = %e, "Sync with remote failed, continuing with local state");
        }
    }

    /// Best-effort push; returns a note for the outcome message.
    fn publish(&self, repo: &Repository, branch: &str) -> Option<String> {
        if !self.has_remote(repo) {
            return None;
        }
        match self.run_git(&["push", &self.config.remote, branch]) {
            Ok(_) => Some(format!("pushed to {}", self.config.remote)),
            Err(e) => {
                tracing::warn!(branch, error = %e, "Publishing failed");
                Some(format!("push to {} failed, publish manually", self.config.remote))
            }
        }
    }

    fn delete_remote_branch(&self, repo: &Repository, branch: &str) {
        let remote_ref = format!("refs/remotes/{}/{branch}", self.config.remote);
        if !self.has_remote(repo) || repo.find_reference(&remote_ref).is_err() {
            return;
        }
        if let Err(e) = self.run_git(&["push", &self.config.remote, "--delete", branch]) {
            tracing::warn!(branch, error = %e, "Could not delete remote branch");
        }
    }

    fn run_git(&self, args: &[&str]) -> GitResult<String> {
        tracing::debug!(args = ?args, "Running git");
        let output = Command::new("git").args(args).current_dir(&self.root).output()?;

        if output.status.success() {
            Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
        } else {
            Err(GitError::Command {
                args: args.join(" "),
                message: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            })
        }
    }

    fn read_commits(&self, limit: usize) -> GitResult<Vec<CommitSummary>> {
        let repo = self.open()?;
        if is_unborn(&repo) {
            return Ok(Vec::new());
        }

        let mut walk = repo.revwalk()?;
        walk.push_head()?;

        let mut commits = Vec::new();
        for oid in walk.take(limit) {
            let commit = repo.find_commit(oid?)?;
            commits.push(CommitSummary {
                id: short_id(commit.id()),
                summary: commit.summary().unwrap_or_default().to_string(),
                author: commit.author().name().unwrap_or_default().to_string(),
                time: commit.time().seconds(),
            });
        }
        Ok(commits)
    }
}

fn signature(repo: &Repository) -> GitResult<Signature<'static>> {
    match repo.signature() {
        Ok(sig) => Ok(sig),
        Err(_) => Ok(Signature::now(FALLBACK_AUTHOR.0, FALLBACK_AUTHOR.1)?),
    }
}

/// HEAD names a branch that has no commits yet.
///
/// `Repository::is_empty` only recognizes this when HEAD points at the
/// host's `init.defaultBranch`, so it cannot be used here.
fn is_unborn(repo: &Repository) -> bool {
    matches!(repo.head(), Err(e) if e.code() == ErrorCode::UnbornBranch)
}

fn short_id(oid: Oid) -> String {
    oid.to_string().chars().take(7).collect()
}

fn head_name(repo: &Repository) -> GitResult<String> {
    match repo.head() {
        Ok(head) if head.is_branch() => Ok(head.shorthand().unwrap_or("HEAD").to_string()),
        Ok(_) => Ok("HEAD".to_string()),
        Err(e) if e.code() == ErrorCode::UnbornBranch => {
            let head = repo.find_reference("HEAD")?;
            Ok(head
                .symbolic_target()
                .and_then(|target| target.strip_prefix("refs/heads/"))
                .unwrap_or("HEAD")
                .to_string())
        }
        Err(e) => Err(e.into()),
    }
}

fn branch_tip(repo: &Repository, branch: &str) -> GitResult<Oid> {
    let branch_ref = repo
        .find_branch(branch, BranchType::Local)
        .map_err(|_| GitError::BranchNotFound(branch.to_string()))?;
    branch_ref.get().target().ok_or_else(|| GitError::BranchNotFound(branch.to_string()))
}

fn checkout_branch(repo: &Repository, branch: &str) -> GitResult<()> {
    let refname = format!("refs/heads/{branch}");
    let target = repo.revparse_single(&refname)?;
    repo.checkout_tree(&target, Some(CheckoutBuilder::new().safe()))?;
    repo.set_head(&refname)?;
    Ok(())
}

fn status_counts(repo: &Repository) -> GitResult<(usize, usize, usize)> {
    let mut opts = StatusOptions::new();
    opts.include_untracked(true)
        .recurse_untracked_dirs(false)
        .include_ignored(false)
        .include_unmodified(false);

    let statuses = repo.statuses(Some(&mut opts))?;

    let mut staged = 0;
    let mut unstaged = 0;
    let mut untracked = 0;

    for entry in statuses.iter() {
        let status = entry.status();

        if status.is_index_new()
            || status.is_index_modified()
            || status.is_index_deleted()
            || status.is_index_renamed()
            || status.is_index_typechange()
        {
            staged += 1;
        }

        if status.is_wt_modified()
            || status.is_wt_deleted()
            || status.is_wt_renamed()
            || status.is_wt_typechange()
        {
            unstaged += 1;
        }

        if status.is_wt_new() {
            untracked += 1;
        }
    }

    Ok((staged, unstaged, untracked))
}

/// Commits ahead/behind the upstream of the checked-out branch.
fn ahead_behind(repo: &Repository) -> (usize, usize) {
    let Ok(head) = repo.head() else {
        return (0, 0);
    };
    let Some(local_oid) = head.target() else {
        return (0, 0);
    };
    let Some(branch_name) = head.shorthand() else {
        return (0, 0);
    };
    let Ok(branch) = repo.find_branch(branch_name, BranchType::Local) else {
        return (0, 0);
    };
    let Ok(upstream) = branch.upstream() else {
        return (0, 0);
    };
    let Some(upstream_oid) = upstream.get().target() else {
        return (0, 0);
    };

    repo.graph_ahead_behind(local_oid, upstream_oid).unwrap_or((0, 0))
}

fn fast_forward(repo: &Repository, base: &str, target: Oid) -> GitResult<()> {
    let mut base_ref = repo.find_reference(&format!("refs/heads/{base}"))?;
    base_ref.set_target(target, "conductor: fast-forward")?;
    Ok(())
}

fn merge_commit(
    repo: &Repository,
    sig: &Signature<'_>,
    base: &str,
    base_commit: &Commit<'_>,
    branch_commit: &Commit<'_>,
) -> GitResult<String> {
    let merge_base = repo.merge_base(base_commit.id(), branch_commit.id())?;
    if merge_base == branch_commit.id() {
        return Ok("already up to date".to_string());
    }
    if merge_base == base_commit.id() {
        fast_forward(repo, base, branch_commit.id())?;
        return Ok("fast-forward".to_string());
    }

    let mut index = repo.merge_commits(base_commit, branch_commit, None)?;
    if index.has_conflicts() {
        return Err(GitError::Conflict("merge".to_string()));
    }
    let tree = repo.find_tree(index.write_tree_to(repo)?)?;
    let branch_name = branch_commit_label(repo, branch_commit);
    let message = format!("Merge branch '{branch_name}' into {base}");
    repo.commit(Some("HEAD"), sig, sig, &message, &tree, &[base_commit, branch_commit])?;

    Ok("merge commit".to_string())
}

fn squash(
    repo: &Repository,
    sig: &Signature<'_>,
    branch: &str,
    base_commit: &Commit<'_>,
    branch_commit: &Commit<'_>,
) -> GitResult<String> {
    let mut walk = repo.revwalk()?;
    walk.push(branch_commit.id())?;
    walk.hide(base_commit.id())?;
    let mut summaries = Vec::new();
    for oid in walk {
        let commit = repo.find_commit(oid?)?;
        summaries.push(format!("- {}", commit.summary().unwrap_or_default()));
    }
    if summaries.is_empty() {
        return Ok("already up to date".to_string());
    }

    let mut index = repo.merge_commits(base_commit, branch_commit, None)?;
    if index.has_conflicts() {
        return Err(GitError::Conflict("squash".to_string()));
    }
    let tree = repo.find_tree(index.write_tree_to(repo)?)?;

    summaries.reverse();
    let message = format!("{}\n\n{}", squash_subject(branch), summaries.join("\n"));
    repo.commit(Some("HEAD"), sig, sig, &message, &tree, &[base_commit])?;

    Ok(format!("squashed {} commit(s)", summaries.len()))
}

fn rebase(
    repo: &Repository,
    sig: &Signature<'_>,
    base: &str,
    base_commit: &Commit<'_>,
    branch_commit: &Commit<'_>,
) -> GitResult<String> {
    let branch_annotated = repo.find_annotated_commit(branch_commit.id())?;
    let base_annotated = repo.find_annotated_commit(base_commit.id())?;

    let mut opts = RebaseOptions::new();
    opts.inmemory(true);
    let mut rebase =
        repo.rebase(Some(&branch_annotated), Some(&base_annotated), None, Some(&mut opts))?;

    let mut tip = base_commit.id();
    let mut replayed = 0;
    while let Some(operation) = rebase.next() {
        operation?;
        if rebase.inmemory_index()?.has_conflicts() {
            rebase.abort()?;
            return Err(GitError::Conflict("rebase".to_string()));
        }
        match rebase.commit(None, sig, None) {
            Ok(oid) => {
                tip = oid;
                replayed += 1;
            }
            Err(e) if e.code() == ErrorCode::Applied => {}
            Err(e) => {
                rebase.abort()?;
                return Err(e.into());
            }
        }
    }
    rebase.finish(Some(sig))?;

    fast_forward(repo, base, tip)?;
    Ok(format!("rebased {replayed} commit(s)"))
}

/// Conventional subject for a squash commit of `branch`.
fn squash_subject(branch: &str) -> String {
    match branch.split_once('/') {
        Some((kind, slug)) => match kind.parse::<BranchKind>() {
            Ok(kind) => format!("{}: {}", kind.commit_type(), slug.replace('-', " ")),
            Err(_) => format!("chore: squash {branch}"),
        },
        None => format!("chore: squash {branch}"),
    }
}

/// Name of a local branch pointing at `commit`, or its short id.
fn branch_commit_label(repo: &Repository, commit: &Commit<'_>) -> String {
    repo.branches(Some(BranchType::Local))
        .ok()
        .and_then(|mut branches| {
            branches.find_map(|entry| {
                let (branch, _) = entry.ok()?;
                if branch.get().target() == Some(commit.id()) {
                    branch.name().ok().flatten().map(String::from)
                } else {
                    None
                }
            })
        })
        .unwrap_or_else(|| short_id(commit.id()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_conventional_commit_pattern() {
        assert!(CONVENTIONAL_COMMIT.is_match("feat: start billing"));
        assert!(CONVENTIONAL_COMMIT.is_match("fix(auth)!: reject expired tokens"));
        assert!(!CONVENTIONAL_COMMIT.is_match("WIP"));
        assert!(!CONVENTIONAL_COMMIT.is_match("feat:missing space"));
    }

    #[test]
    fn test_squash_subject() {
        assert_eq!(squash_subject("feature/user-profile"), "feat: user profile");
        assert_eq!(squash_subject("hotfix/42-null-session"), "fix: 42 null session");
        assert_eq!(squash_subject("experiment"), "chore: squash experiment");
    }

    #[test]
    fn test_state_of_missing_repository_is_unknown() {
        let dir = tempfile::tempdir().unwrap();
        let manager = RepositoryManager::new(dir.path(), GitConfig::default());

        assert!(!manager.is_initialized());
        let state = manager.current_state();
        assert_eq!(state.current_branch, "unknown");
        assert!(!state.is_clean);
    }

    #[test]
    fn test_initialize_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("README.md"), "# demo\n").unwrap();
        let manager = RepositoryManager::new(dir.path(), GitConfig::default());

        assert!(manager.initialize());
        assert!(manager.initialize());
        assert!(manager.is_initialized());

        let state = manager.current_state();
        assert_eq!(state.current_branch, "main");
        assert!(state.is_clean);
        assert!(!state.has_remote);
        assert_eq!(manager.recent_commits(10).len(), 1);
    }

    #[test]
    fn test_initialize_commits_on_non_default_base_branch() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join("app/src")).unwrap();
        std::fs::write(dir.path().join("app/src/main.txt"), "entry\n").unwrap();
        let config = GitConfig { base_branch: "trunk".to_string(), ..GitConfig::default() };
        let manager = RepositoryManager::new(dir.path(), config);

        assert!(manager.initialize());

        let repo = Repository::open(dir.path()).unwrap();
        assert!(!is_unborn(&repo));
        let state = manager.current_state();
        assert_eq!(state.current_branch, "trunk");
        assert!(state.is_clean, "{state:?}");
        assert_eq!(state.untracked_count, 0);

        let commits = manager.recent_commits(10);
        assert_eq!(commits.len(), 1);
        assert_eq!(commits[0].summary, "chore: initial commit");
    }

    #[test]
    fn test_unborn_repository_has_no_commits() {
        let dir = tempfile::tempdir().unwrap();
        let mut opts = RepositoryInitOptions::new();
        opts.initial_head("develop");
        let repo = Repository::init_opts(dir.path(), &opts).unwrap();
        let manager = RepositoryManager::new(dir.path(), GitConfig::default());

        assert!(is_unborn(&repo));
        assert!(manager.recent_commits(5).is_empty());
        assert_eq!(manager.current_state().current_branch, "develop");
    }

    #[test]
    fn test_create_branch_refuses_uninitialized_repository() {
        let dir = tempfile::tempdir().unwrap();
        let manager = RepositoryManager::new(dir.path(), GitConfig::default());

        let outcome = manager.create_branch(&BranchSpec::feature("billing"));
        assert!(!outcome.success);
        assert_eq!(outcome.branch_name, "feature/billing");
    }
}
