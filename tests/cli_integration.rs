//! CLI Integration Tests
//!
//! Tests the command-line interface end-to-end.

use assert_cmd::Command;
use assert_fs::prelude::*;
use predicates::prelude::*;

/// Get the binary to test.
fn conductor() -> Command {
    Command::cargo_bin("conductor").unwrap()
}

// ============================================================================
// Help & Version Tests
// ============================================================================

#[test]
fn test_help_flag() {
    conductor()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("Dependency-ordered workflow orchestration"));
}

#[test]
fn test_version_flag() {
    conductor()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains(env!("CARGO_PKG_VERSION")));
}

#[test]
fn test_missing_subcommand_is_usage_error() {
    conductor().assert().failure().stderr(predicate::str::contains("Usage:"));
}

// ============================================================================
// Analyze & Patterns Tests
// ============================================================================

#[test]
fn test_analyze_empty_project_reports_violations() {
    let temp = assert_fs::TempDir::new().unwrap();

    conductor()
        .arg("analyze")
        .current_dir(temp.path())
        .assert()
        .success()
        .stdout(predicate::str::contains("Violations:"))
        .stdout(predicate::str::contains("Required directory 'src' is missing"));
}

#[test]
fn test_analyze_json_output() {
    let temp = assert_fs::TempDir::new().unwrap();
    temp.child("src/features/cart/handlers/mod.rs").write_str("").unwrap();
    temp.child("package.json").write_str("{}").unwrap();

    let output = conductor()
        .args(["--project", temp.path().to_str().unwrap(), "analyze", "--format", "json"])
        .output()
        .unwrap();
    assert!(output.status.success());

    let analysis: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(analysis["structure"]["features"][0]["name"], "cart");
    assert_eq!(analysis["structure"]["tooling"][0]["name"], "npm");
}

#[test]
fn test_patterns_lists_rules() {
    let temp = assert_fs::TempDir::new().unwrap();

    conductor()
        .arg("patterns")
        .current_dir(temp.path())
        .assert()
        .success()
        .stdout(predicate::str::contains("src/features/<feature>/{handlers,views,tests}"))
        .stdout(predicate::str::contains("feature|bugfix|hotfix"));
}

#[test]
fn test_patterns_follow_project_config() {
    let temp = assert_fs::TempDir::new().unwrap();
    temp.child(".conductor.toml")
        .write_str("[analyzer]\nfeature_root = \"app/modules\"\nfeature_parts = [\"models\"]\n")
        .unwrap();

    conductor()
        .arg("patterns")
        .current_dir(temp.path())
        .assert()
        .success()
        .stdout(predicate::str::contains("app/modules/<feature>/{models}"));
}

// ============================================================================
// Workflow Tests
// ============================================================================

#[test]
fn test_workflows_text() {
    conductor()
        .arg("workflows")
        .assert()
        .success()
        .stdout(predicate::str::contains("new-feature"))
        .stdout(predicate::str::contains("[repository-state] Create branch feature/<name>"))
        .stdout(predicate::str::contains("violation-remediation"));
}

#[test]
fn test_workflows_json() {
    let output = conductor().args(["workflows", "--format", "json"]).output().unwrap();
    assert!(output.status.success());

    let templates: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(templates.as_array().unwrap().len(), 4);
    assert_eq!(templates[0]["template"], "new-feature");
}

#[test]
fn test_workflows_yaml() {
    conductor()
        .args(["workflows", "--format", "yaml"])
        .assert()
        .success()
        .stdout(predicate::str::contains("template: structural-analysis"));
}

#[test]
fn test_run_without_specialists_reports_failure_as_text() {
    let temp = assert_fs::TempDir::new().unwrap();

    conductor()
        .args(["run", "tidy up the logging"])
        .current_dir(temp.path())
        .assert()
        .success()
        .stdout(predicate::str::contains("[failed]"))
        .stdout(predicate::str::contains("No specialist registered"));
}

// ============================================================================
// Git Tests
// ============================================================================

#[test]
fn test_git_status_outside_repository() {
    let temp = assert_fs::TempDir::new().unwrap();

    conductor()
        .arg("git-status")
        .current_dir(temp.path())
        .assert()
        .success()
        .stdout(predicate::str::contains("Not a git repository"));
}

#[test]
fn test_create_branch_rejects_unknown_kind() {
    conductor()
        .args(["create-branch", "feat", "billing"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Unknown branch kind"));
}

#[test]
fn test_branch_lifecycle() {
    let temp = assert_fs::TempDir::new().unwrap();

    conductor()
        .args(["init", "--skip-install"])
        .current_dir(temp.path())
        .assert()
        .success()
        .stdout(predicate::str::contains("git repository"));

    conductor()
        .args(["create-branch", "feature", "Invoice Export", "--issue", "17"])
        .current_dir(temp.path())
        .assert()
        .success()
        .stdout(predicate::str::contains("✓ Created branch 'feature/17-invoice-export'"));

    conductor()
        .arg("git-status")
        .current_dir(temp.path())
        .assert()
        .success()
        .stdout(predicate::str::contains("Branch: feature/17-invoice-export"))
        .stdout(predicate::str::contains("feat: start invoice export"));

    conductor()
        .arg("validate-merge")
        .current_dir(temp.path())
        .assert()
        .success()
        .stdout(predicate::str::contains("✓ Ready to merge"));

    conductor()
        .args(["merge", "feature/17-invoice-export", "--strategy", "squash"])
        .current_dir(temp.path())
        .assert()
        .success()
        .stdout(predicate::str::contains("✓ Merged 'feature/17-invoice-export' into 'main'"));
}

#[test]
fn test_validate_merge_outside_repository() {
    let temp = assert_fs::TempDir::new().unwrap();

    conductor()
        .args(["validate-merge", "feature/billing"])
        .current_dir(temp.path())
        .assert()
        .success()
        .stdout(predicate::str::contains("✗ Not ready to merge"));
}

// ============================================================================
// Init Tests
// ============================================================================

#[test]
fn test_init_named_project() {
    let temp = assert_fs::TempDir::new().unwrap();

    conductor()
        .args(["init", "--name", "shop", "--description", "An online shop", "--skip-git"])
        .args(["--skip-install"])
        .current_dir(temp.path())
        .assert()
        .success()
        .stdout(predicate::str::contains("cd shop"));

    temp.child("shop/src/features").assert(predicate::path::is_dir());
    temp.child("shop/README.md").assert(predicate::str::contains("An online shop"));
    temp.child("shop/.conductor.toml").assert(predicate::str::contains("project_name = \"shop\""));
    temp.child("shop/.git").assert(predicate::path::missing());
}

#[test]
fn test_init_non_empty_directory_fails() {
    let temp = assert_fs::TempDir::new().unwrap();
    temp.child("existing.txt").write_str("keep me").unwrap();

    conductor()
        .args(["init", "--skip-git", "--skip-install"])
        .current_dir(temp.path())
        .assert()
        .failure()
        .stderr(predicate::str::contains("is not empty"));
}

// ============================================================================
// Config & Completions Tests
// ============================================================================

#[test]
fn test_config_shows_defaults() {
    let temp = assert_fs::TempDir::new().unwrap();

    conductor()
        .arg("config")
        .current_dir(temp.path())
        .assert()
        .success()
        .stdout(predicate::str::contains("[git]"))
        .stdout(predicate::str::contains("base_branch = \"main\""));
}

#[test]
fn test_config_path_prefers_project_file() {
    let temp = assert_fs::TempDir::new().unwrap();
    temp.child(".conductor.toml").write_str("").unwrap();

    conductor()
        .args(["config", "--path"])
        .current_dir(temp.path())
        .assert()
        .success()
        .stdout(predicate::str::contains(".conductor.toml"));
}

#[test]
fn test_explicit_config_file_overrides_project_file() {
    let temp = assert_fs::TempDir::new().unwrap();
    temp.child(".conductor.toml")
        .write_str("[analyzer]\nfeature_root = \"app/modules\"\n")
        .unwrap();
    let custom = temp.child("ci.toml");
    custom.write_str("[analyzer]\nfeature_root = \"lib/domains\"\n").unwrap();

    conductor()
        .args(["--config", custom.path().to_str().unwrap(), "patterns"])
        .current_dir(temp.path())
        .assert()
        .success()
        .stdout(predicate::str::contains("lib/domains/<feature>/"));

    conductor()
        .args(["--config", custom.path().to_str().unwrap(), "config", "--path"])
        .current_dir(temp.path())
        .assert()
        .success()
        .stdout(predicate::str::contains("ci.toml"));
}

#[test]
fn test_completions_bash() {
    conductor()
        .args(["completions", "bash"])
        .assert()
        .success()
        .stdout(predicate::str::contains("conductor"));
}
