//! Conductor - workflow orchestration for multi-specialist code generation.
//!
//! Plans development requests into domain-tagged steps, dispatches them to
//! specialists and keeps the git working copy on a safe branch.

#![allow(clippy::single_match_else)]

use std::io;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{CommandFactory, Parser, Subcommand, ValueEnum};
use clap_complete::{generate, Shell};
use serde::Serialize;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use conductor::core::config::CONFIG_FILE;
use conductor::git::naming::MAX_BRANCH_NAME_LEN;
use conductor::git::{BranchKind, BranchSpec, MergeStrategy, RepositoryManager, ValidationResult};
use conductor::init::{setup_project, InitOptions};
use conductor::workflow::{describe_templates, Orchestrator, WorkflowOutcome, WorkflowRequest};
use conductor::{Config, ProjectAnalyzer};

/// Workflow orchestration for multi-specialist code generation
#[derive(Parser)]
#[command(name = "conductor")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Subcommand to run
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Project directory (defaults to the current directory)
    #[arg(short, long, global = true)]
    project: Option<PathBuf>,

    /// Configuration file to use instead of the project/user config
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Analyze the project structure and report violations
    Analyze {
        /// Output format
        #[arg(short, long, value_enum, default_value_t = Format::Text)]
        format: Format,
    },

    /// Plan and run a new-feature workflow on its own branch
    NewFeature {
        /// Feature name
        name: String,

        /// What the feature does
        #[arg(short, long)]
        description: Option<String>,
    },

    /// Run a workflow that fixes the current structure violations
    FixViolations,

    /// Run a workflow from a natural-language request
    Run {
        /// Request text, e.g. "create new feature named billing"
        request: String,
    },

    /// List workflow templates and their steps
    Workflows {
        /// Output format
        #[arg(short, long, value_enum, default_value_t = Format::Text)]
        format: Format,
    },

    /// Show the working copy state
    GitStatus,

    /// Create a conventionally named branch
    CreateBranch {
        /// Branch kind (feature, bugfix, hotfix, refactor, docs, test, chore, release)
        kind: BranchKind,

        /// Free-text branch name
        name: String,

        /// What the branch is for
        #[arg(short, long)]
        description: Option<String>,

        /// Issue reference, e.g. 42 or PROJ-7
        #[arg(short, long)]
        issue: Option<String>,

        /// Branch to start from instead of the configured base
        #[arg(short, long)]
        base: Option<String>,
    },

    /// Check whether a branch is ready to merge
    ValidateMerge {
        /// Branch to check (defaults to the current branch)
        branch: Option<String>,
    },

    /// Merge a branch into the base branch
    Merge {
        /// Branch to merge
        branch: String,

        /// Merge strategy (merge, squash, rebase)
        #[arg(short, long, default_value = "merge")]
        strategy: MergeStrategy,
    },

    /// Show the structure rules the analyzer checks
    Patterns,

    /// Scaffold a new project
    Init {
        /// Create ./<name> instead of using the current directory
        #[arg(short, long)]
        name: Option<String>,

        /// One-line project description
        #[arg(short, long)]
        description: Option<String>,

        /// Do not create a git repository
        #[arg(long)]
        skip_git: bool,

        /// Do not run the install command
        #[arg(long)]
        skip_install: bool,
    },

    /// Show configuration
    Config {
        /// Show config file path
        #[arg(long)]
        path: bool,
    },

    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        shell: Shell,
    },
}

/// Output format for structured commands.
#[derive(Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Format {
    Text,
    Json,
    Yaml,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Setup logging
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };

    tracing_subscriber::registry().with(fmt::layer().with_target(false)).with(filter).init();

    let root = match &cli.project {
        Some(path) => path.clone(),
        None => std::env::current_dir().context("Failed to read the current directory")?,
    };
    let project = Project { root, config_path: cli.config };

    let result = match cli.command {
        // Init errors are the only ones that change the exit code
        Commands::Init { name, description, skip_git, skip_install } => {
            let options =
                InitOptions { name, description, skip_git, skip_install, verbose: cli.verbose };
            return cmd_init(&project, &options);
        }
        Commands::Analyze { format } => cmd_analyze(&project, format),
        Commands::NewFeature { name, description } => {
            cmd_workflow(&project, WorkflowRequest::NewFeature { name, description })
        }
        Commands::FixViolations => cmd_workflow(&project, WorkflowRequest::FixViolations),
        Commands::Run { request } => cmd_workflow(&project, WorkflowRequest::from_text(&request)),
        Commands::Workflows { format } => cmd_workflows(format),
        Commands::GitStatus => cmd_git_status(&project),
        Commands::CreateBranch { kind, name, description, issue, base } => {
            let mut spec = BranchSpec::new(kind, name);
            spec.description = description;
            spec.issue = issue;
            spec.base = base;
            cmd_create_branch(&project, &spec)
        }
        Commands::ValidateMerge { branch } => cmd_validate_merge(&project, branch.as_deref()),
        Commands::Merge { branch, strategy } => cmd_merge(&project, &branch, strategy),
        Commands::Patterns => cmd_patterns(&project),
        Commands::Config { path } => cmd_config(&project, path),
        Commands::Completions { shell } => {
            cmd_completions(shell);
            Ok(())
        }
    };

    if let Err(e) = result {
        println!("Error: {e:#}");
    }

    Ok(())
}

/// Print a serializable value as JSON or YAML.
fn print_structured<T: Serialize>(value: &T, format: Format) -> Result<()> {
    match format {
        Format::Json => println!("{}", serde_json::to_string_pretty(value)?),
        Format::Yaml => print!("{}", serde_yaml::to_string(value)?),
        Format::Text => {}
    }
    Ok(())
}

/// Where the command runs and which configuration it reads.
struct Project {
    root: PathBuf,
    config_path: Option<PathBuf>,
}

impl Project {
    fn config(&self) -> Result<Config> {
        match &self.config_path {
            Some(path) => Config::load_from_file(path),
            None => Config::load(&self.root),
        }
    }

    fn repository(&self) -> Result<RepositoryManager> {
        Ok(RepositoryManager::new(&self.root, self.config()?.git))
    }
}

/// Analyze the project structure.
fn cmd_analyze(project: &Project, format: Format) -> Result<()> {
    let config = project.config()?;
    let analysis = ProjectAnalyzer::new(&project.root, config.analyzer).analyze();

    if format != Format::Text {
        return print_structured(&analysis, format);
    }

    println!("Project: {}", project.root.display());
    println!("{}\n", analysis.summary());

    println!("Structure:");
    for subtree in &analysis.structure.subtrees {
        let mark = if subtree.present { "✓" } else { "✗" };
        println!("  {mark} {}/", subtree.path);
    }
    for feature in &analysis.structure.features {
        println!("  • {} ({} files)", feature.path, feature.file_count);
    }
    if let Some(schema) = &analysis.structure.schema_path {
        println!("  • schema: {schema}");
    }

    if !analysis.structure.tooling.is_empty() {
        println!("\nTooling:");
        for tool in &analysis.structure.tooling {
            println!("  • {} ({})", tool.name, tool.marker);
        }
    }

    if analysis.is_clean() {
        println!("\n✓ No structure violations");
    } else {
        println!("\nViolations:");
        for violation in &analysis.violations {
            println!("  ✗ [{}] {}", violation.domain, violation.message);
            println!("      → {}", violation.remediation);
        }
    }

    if !analysis.recommendations.is_empty() {
        println!("\nRecommendations:");
        for recommendation in &analysis.recommendations {
            println!("  • {recommendation}");
        }
    }

    Ok(())
}

/// Plan and execute a workflow.
fn cmd_workflow(project: &Project, request: WorkflowRequest) -> Result<()> {
    let mut orchestrator = Orchestrator::new(&project.root, project.config()?);

    let rt = tokio::runtime::Runtime::new()?;
    let outcome = rt.block_on(orchestrator.run(request));

    print_outcome(&outcome);
    Ok(())
}

fn print_outcome(outcome: &WorkflowOutcome) {
    let mark = if outcome.is_success() { "✓" } else { "✗" };
    println!("{mark} {} [{}]", outcome.workflow_name, outcome.status);
    println!("  {}", outcome.message);
    if let Some(branch) = &outcome.branch {
        println!("  Branch: {branch}");
    }
    println!("  Tasks completed: {}", outcome.completed_tasks);

    if !outcome.errors.is_empty() {
        println!("\nErrors:");
        for error in &outcome.errors {
            println!("  ✗ {error}");
        }
    }
    if !outcome.warnings.is_empty() {
        println!("\nWarnings:");
        for warning in &outcome.warnings {
            println!("  ! {warning}");
        }
    }
    if !outcome.next_steps.is_empty() {
        println!("\nNext steps:");
        for step in &outcome.next_steps {
            println!("  • {step}");
        }
    }
}

/// List workflow templates.
fn cmd_workflows(format: Format) -> Result<()> {
    let templates = describe_templates();

    if format != Format::Text {
        return print_structured(&templates, format);
    }

    for template in &templates {
        println!("{} ({})", template.template, template.trigger);
        for step in &template.steps {
            let after = if step.depends_on.is_empty() {
                String::new()
            } else {
                let deps: Vec<String> = step.depends_on.iter().map(ToString::to_string).collect();
                format!(" (after {})", deps.join(", "))
            };
            println!("  {}. [{}] {}{after}", step.number, step.domain, step.description);
        }
        println!();
    }

    Ok(())
}

/// Show the working copy state.
fn cmd_git_status(project: &Project) -> Result<()> {
    let repo = project.repository()?;
    let state = repo.current_state();

    if !state.is_known() {
        println!("Not a git repository: {}", project.root.display());
        println!("Run `git init` or `conductor init` first.");
        return Ok(());
    }

    println!("Branch: {} {}", state.current_branch, state.status_string());
    println!("Clean: {}", if state.is_clean { "yes" } else { "no" });
    if state.has_remote {
        println!("Ahead: {}  Behind: {}", state.ahead, state.behind);
    } else {
        println!("Remote: none");
    }

    let commits = repo.recent_commits(5);
    if !commits.is_empty() {
        println!("\nRecent commits:");
        for commit in &commits {
            println!("  {} {} ({})", commit.id, commit.summary, commit.author);
        }
    }

    Ok(())
}

/// Create a branch.
fn cmd_create_branch(project: &Project, spec: &BranchSpec) -> Result<()> {
    let repo = project.repository()?;
    let outcome = repo.create_branch(spec);

    if outcome.success {
        println!("✓ {}", outcome.message);
    } else {
        println!("✗ {}", outcome.message);
    }
    Ok(())
}

fn print_validation(result: &ValidationResult) {
    for error in &result.errors {
        println!("  ✗ {error}");
    }
    for warning in &result.warnings {
        println!("  ! {warning}");
    }
    for suggestion in &result.suggestions {
        println!("  → {suggestion}");
    }
}

/// Check merge readiness.
fn cmd_validate_merge(project: &Project, branch: Option<&str>) -> Result<()> {
    let repo = project.repository()?;
    let result = repo.validate_for_merge(branch);

    if result.valid {
        println!("✓ Ready to merge");
    } else {
        println!("✗ Not ready to merge");
    }
    print_validation(&result);
    Ok(())
}

/// Merge a branch into the base.
fn cmd_merge(project: &Project, branch: &str, strategy: MergeStrategy) -> Result<()> {
    let repo = project.repository()?;
    let outcome = repo.merge_to_main(branch, strategy);

    if outcome.success {
        println!("✓ {}", outcome.message);
    } else {
        println!("✗ {}", outcome.message);
    }
    Ok(())
}

/// Show the analyzer's structure rules and the branch naming grammar.
fn cmd_patterns(project: &Project) -> Result<()> {
    let analyzer = ProjectAnalyzer::new(&project.root, project.config()?.analyzer);
    let rules = analyzer.patterns();

    println!("Required directories:");
    for dir in &rules.required_dirs {
        println!("  {dir}/");
    }
    println!("\nFeature layout:");
    println!("  {}/<feature>/{{{}}}", rules.feature_root, rules.feature_parts.join(","));
    println!("\nSchema locations:");
    for path in &rules.schema_paths {
        println!("  {path}");
    }

    let kinds: Vec<&str> = BranchKind::ALL.iter().map(|k| k.as_str()).collect();
    println!("\nBranch names:");
    println!("  <{}>/[<issue>-]<name>", kinds.join("|"));
    println!("  lowercase letters, digits and single hyphens, at most {MAX_BRANCH_NAME_LEN} characters");

    Ok(())
}

/// Scaffold a project.
fn cmd_init(project: &Project, options: &InitOptions) -> Result<()> {
    let config = project.config()?;
    let report = setup_project(&project.root, options, &config)?;

    println!("✓ Created {} at {}", report.project_name, report.root.display());
    for path in &report.created {
        println!("  + {path}");
    }
    if report.git_initialized {
        println!("  + git repository");
    }
    if let Some(install) = &report.install {
        let mark = if install.success { "✓" } else { "✗" };
        println!("  {mark} {}: {}", install.command, install.message);
    }
    for warning in &report.warnings {
        println!("  ! {warning}");
    }

    println!("\nNext steps:");
    for step in &report.next_steps {
        println!("  {step}");
    }

    Ok(())
}

/// Show configuration.
fn cmd_config(project: &Project, show_path: bool) -> Result<()> {
    if show_path {
        let local = project.root.join(CONFIG_FILE);
        if let Some(path) = &project.config_path {
            println!("{}", path.display());
        } else if local.exists() {
            println!("{}", local.display());
        } else if let Some(path) = Config::config_dir() {
            println!("{}", path.join("config.toml").display());
        }
        return Ok(());
    }

    println!("{}", project.config()?.to_toml()?);

    Ok(())
}

/// Generate shell completions.
fn cmd_completions(shell: Shell) {
    let mut cmd = Cli::command();
    generate(shell, &mut cmd, "conductor", &mut io::stdout());
}
