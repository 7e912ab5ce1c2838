//! Project scaffolding.
//!
//! Creates the directory layout the analyzer expects, a README, a
//! `.gitignore` and a `.conductor.toml`, then optionally initializes git and
//! runs the dependency install command.

mod templates;

use std::fs;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

use serde::Serialize;

use crate::core::config::CONFIG_FILE;
use crate::core::Config;
use crate::git::RepositoryManager;

/// Scaffolding errors.
#[derive(Debug, thiserror::Error)]
pub enum InitError {
    /// Target directory already has content.
    #[error("{} is not empty; choose a new --name or an empty directory", .0.display())]
    NotEmpty(PathBuf),

    /// Target path exists but is not a directory.
    #[error("{} exists and is not a directory", .0.display())]
    NotADirectory(PathBuf),

    /// Project name cannot be used as a directory name.
    #[error("Invalid project name '{0}': use letters, digits, '-', '_' or '.'")]
    InvalidName(String),

    /// Writing the scaffold failed.
    #[error("Failed to write {}: {source}", .path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Generated configuration could not be serialized.
    #[error("Failed to generate .conductor.toml: {0}")]
    Config(String),
}

/// Options for `conductor init`.
#[derive(Debug, Clone, Default)]
pub struct InitOptions {
    /// Create `./<name>` instead of using the current directory
    pub name: Option<String>,

    /// One-line project description
    pub description: Option<String>,

    /// Do not create a git repository
    pub skip_git: bool,

    /// Do not run the install command
    pub skip_install: bool,

    /// Stream install output
    pub verbose: bool,
}

/// Result of running the install command.
#[derive(Debug, Clone, Serialize)]
pub struct InstallReport {
    pub command: String,
    pub success: bool,
    pub message: String,
}

/// What `setup_project` did.
#[derive(Debug, Clone, Serialize)]
pub struct InitReport {
    pub root: PathBuf,
    pub project_name: String,

    /// Paths created, relative to `root`
    pub created: Vec<String>,

    pub git_initialized: bool,
    pub install: Option<InstallReport>,
    pub warnings: Vec<String>,
    pub next_steps: Vec<String>,
}

/// Scaffold a project under `base`.
///
/// `config` supplies the layout rules, the git settings and the install
/// command. Git and install failures are reported as warnings; only problems
/// with the target directory itself are errors.
pub fn setup_project(
    base: &Path,
    options: &InitOptions,
    config: &Config,
) -> Result<InitReport, InitError> {
    let root = match &options.name {
        Some(name) => {
            validate_project_name(name)?;
            base.join(name)
        }
        None => base.to_path_buf(),
    };
    ensure_empty_target(&root)?;

    let project_name = options
        .name
        .clone()
        .or_else(|| root.file_name().map(|n| n.to_string_lossy().into_owned()))
        .unwrap_or_else(|| "project".to_string());

    tracing::info!(root = ?root, "Scaffolding project");
    let rules = &config.analyzer;
    let mut created = Vec::new();

    create_dir(&root)?;
    for dir in rules.required_dirs.iter().chain(std::iter::once(&rules.feature_root)) {
        let path = root.join(dir);
        create_dir(&path)?;
        write_file_atomic(&path.join(".gitkeep"), "")?;
        created.push(format!("{dir}/"));
    }

    let mut project_config = config.clone();
    project_config.general.project_name = Some(project_name.clone());
    project_config.general.description.clone_from(&options.description);
    let config_toml = project_config.to_toml().map_err(|e| InitError::Config(e.to_string()))?;

    let files = [
        ("README.md", templates::readme(&project_name, options.description.as_deref(), rules)),
        (".gitignore", templates::gitignore(rules)),
        (CONFIG_FILE, config_toml),
    ];
    for (name, content) in &files {
        write_file_atomic(&root.join(name), content)?;
        created.push((*name).to_string());
    }

    let mut warnings = Vec::new();

    let install = match (&config.init.install_command, options.skip_install) {
        (Some(command), false) => {
            let report = run_install(&root, command, options.verbose);
            if !report.success {
                warnings.push(format!("Install command failed: {}", report.message));
            }
            Some(report)
        }
        _ => None,
    };

    let git_initialized = if options.skip_git {
        false
    } else {
        let initialized = RepositoryManager::new(&root, config.git.clone()).initialize();
        if !initialized {
            warnings.push("Could not initialize a git repository; run `git init` manually".to_string());
        }
        initialized
    };

    let mut next_steps = Vec::new();
    if options.name.is_some() {
        next_steps.push(format!("cd {project_name}"));
    }
    if !git_initialized {
        next_steps.push("git init && git add . && git commit -m \"chore: initial commit\"".to_string());
    }
    next_steps.push("conductor analyze".to_string());
    next_steps.push("conductor new-feature <name>".to_string());

    Ok(InitReport { root, project_name, created, git_initialized, install, warnings, next_steps })
}

fn validate_project_name(name: &str) -> Result<(), InitError> {
    let valid = !name.is_empty()
        && name != "."
        && name != ".."
        && name.chars().all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'));
    if valid {
        Ok(())
    } else {
        Err(InitError::InvalidName(name.to_string()))
    }
}

fn ensure_empty_target(root: &Path) -> Result<(), InitError> {
    if !root.exists() {
        return Ok(());
    }
    if !root.is_dir() {
        return Err(InitError::NotADirectory(root.to_path_buf()));
    }

    let mut entries = fs::read_dir(root)
        .map_err(|source| InitError::Write { path: root.to_path_buf(), source })?;
    if entries.next().is_some() {
        return Err(InitError::NotEmpty(root.to_path_buf()));
    }
    Ok(())
}

fn create_dir(path: &Path) -> Result<(), InitError> {
    fs::create_dir_all(path).map_err(|source| InitError::Write { path: path.to_path_buf(), source })
}

/// Write a file atomically (write to temp, then rename).
fn write_file_atomic(path: &Path, content: &str) -> Result<(), InitError> {
    let file_name = path.file_name().map(|n| n.to_string_lossy().into_owned()).unwrap_or_default();
    let temp_path = path.with_file_name(format!(".{file_name}.tmp"));

    fs::write(&temp_path, content)
        .map_err(|source| InitError::Write { path: temp_path.clone(), source })?;

    fs::rename(&temp_path, path).map_err(|source| InitError::Write { path: path.to_path_buf(), source })
}

fn run_install(root: &Path, command: &str, verbose: bool) -> InstallReport {
    let (shell, shell_arg) =
        if cfg!(target_os = "windows") { ("cmd", "/C") } else { ("sh", "-c") };

    tracing::info!(command, "Running install command");
    let mut cmd = Command::new(shell);
    cmd.arg(shell_arg).arg(command).current_dir(root);
    if verbose {
        cmd.stdout(Stdio::inherit()).stderr(Stdio::inherit());
    }

    match cmd.output() {
        Ok(output) if output.status.success() => InstallReport {
            command: command.to_string(),
            success: true,
            message: "Dependencies installed".to_string(),
        },
        Ok(output) => InstallReport {
            command: command.to_string(),
            success: false,
            message: format!(
                "exited with {}: {}",
                output.status,
                String::from_utf8_lossy(&output.stderr).trim()
            ),
        },
        Err(e) => InstallReport { command: command.to_string(), success: false, message: e.to_string() },
    }
}
