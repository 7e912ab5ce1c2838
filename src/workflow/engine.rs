//! Workflow orchestration engine.
//!
//! Plans a workflow from a request, walks its steps in order and dispatches
//! every task to the specialist for the step's domain. A failed testing task
//! is classified, handed to the responsible specialist as a fix task and
//! retried once. Any other failure stops the workflow.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::classify::classify_response;
use super::planning::{number_steps, template_steps, workflow_name};
use super::request::WorkflowRequest;
use super::specialist::{Specialist, SpecialistRegistry, SpecialistRequest, SpecialistResponse};
use super::types::{Priority, Step, Task, TaskStatus, TemplateKind, Workflow, WorkflowStatus};
use crate::analyzer::ProjectAnalyzer;
use crate::collab::{CollaborationStore, Recipient};
use crate::core::{Config, Domain};
use crate::git::{BranchSpec, RepositoryManager};

/// Terminal report for a workflow.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkflowOutcome {
    pub workflow_id: String,
    pub workflow_name: String,
    pub template: TemplateKind,
    pub status: WorkflowStatus,
    pub message: String,

    /// Working branch, for new-feature workflows
    #[serde(skip_serializing_if = "Option::is_none")]
    pub branch: Option<String>,

    pub completed_tasks: usize,
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
    pub next_steps: Vec<String>,
}

impl WorkflowOutcome {
    pub fn is_success(&self) -> bool {
        self.status == WorkflowStatus::Completed
    }
}

/// Why a step stopped the workflow.
struct StepFailure(String);

/// Runs workflows against one project.
///
/// One workflow executes at a time; [`Orchestrator::execute`] takes
/// `&mut self` for that reason.
#[derive(Debug)]
pub struct Orchestrator {
    root: PathBuf,
    config: Config,
    repository: RepositoryManager,
    analyzer: ProjectAnalyzer,
    specialists: SpecialistRegistry,
    store: CollaborationStore,
    history: Vec<Workflow>,
}

impl Orchestrator {
    /// Create an engine with the specialists named in `config`.
    pub fn new(root: impl Into<PathBuf>, config: Config) -> Self {
        Self::with_store(root, config, CollaborationStore::new())
    }

    /// Create an engine sharing an existing collaboration store.
    pub fn with_store(root: impl Into<PathBuf>, config: Config, store: CollaborationStore) -> Self {
        let root = root.into();
        let specialists = SpecialistRegistry::from_config(&config, &root, &store);
        Self {
            repository: RepositoryManager::new(&root, config.git.clone()),
            analyzer: ProjectAnalyzer::new(&root, config.analyzer.clone()),
            specialists,
            store,
            config,
            root,
            history: Vec::new(),
        }
    }

    /// Replace the specialist registry.
    #[must_use]
    pub fn with_specialists(mut self, specialists: SpecialistRegistry) -> Self {
        self.specialists = specialists;
        self
    }

    /// Register (or replace) one specialist.
    pub fn register_specialist(&mut self, domain: Domain, specialist: Arc<dyn Specialist>) {
        self.specialists.register(domain, specialist);
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn repository(&self) -> &RepositoryManager {
        &self.repository
    }

    pub fn analyzer(&self) -> &ProjectAnalyzer {
        &self.analyzer
    }

    pub fn store(&self) -> &CollaborationStore {
        &self.store
    }

    /// Terminal workflows of this process, oldest first.
    pub fn history(&self) -> &[Workflow] {
        &self.history
    }

    /// Plan and execute a request.
    pub async fn run(&mut self, request: WorkflowRequest) -> WorkflowOutcome {
        let mut workflow = self.plan(&request);
        self.execute(&mut workflow).await
    }

    /// Build the workflow for a request.
    ///
    /// For a new feature this also establishes the working branch, creating
    /// the repository first if needed. When that fails the branch step is left
    /// out and the failure is recorded as a warning.
    pub fn plan(&self, request: &WorkflowRequest) -> Workflow {
        let id = Uuid::new_v4().to_string();
        let mut warnings = Vec::new();

        let analysis = match request {
            WorkflowRequest::FixViolations => Some(self.analyzer.analyze()),
            _ => None,
        };

        let branch = match request {
            WorkflowRequest::NewFeature { name, description } => {
                self.establish_branch(name, description.as_deref(), &mut warnings)
            }
            _ => None,
        };

        let steps = number_steps(template_steps(request, analysis.as_ref()), branch.as_deref());
        let description = match request {
            WorkflowRequest::NewFeature { description: Some(d), .. } => d.clone(),
            WorkflowRequest::Generic { text } => text.clone(),
            _ => workflow_name(request),
        };

        tracing::info!(workflow = %id, template = %request.template(), steps = steps.len(), "Workflow planned");

        Workflow {
            id,
            name: workflow_name(request),
            description,
            template: request.template(),
            steps,
            current_step: 0,
            status: WorkflowStatus::Planning,
            tasks: Vec::new(),
            subject: request.subject().map(String::from),
            branch,
            warnings,
            created_at: Utc::now(),
        }
    }

    fn establish_branch(
        &self,
        name: &str,
        description: Option<&str>,
        warnings: &mut Vec<String>,
    ) -> Option<String> {
        if !self.repository.is_initialized() && !self.repository.initialize() {
            warnings.push("Could not initialize a git repository; continuing without a branch".to_string());
            return None;
        }

        let mut spec = BranchSpec::feature(name);
        if let Some(description) = description {
            spec = spec.with_description(description);
        }

        let outcome = self.repository.create_branch(&spec);
        if outcome.success {
            Some(outcome.branch_name)
        } else {
            tracing::warn!(branch = %outcome.branch_name, "Continuing without a working branch");
            warnings.push(outcome.message);
            None
        }
    }

    /// Execute a planned (or partially executed) workflow to a terminal state.
    ///
    /// Steps before the current-step pointer, and tasks already completed,
    /// are skipped. Broadcasts left by earlier workflows are dropped first;
    /// direct messages stay until their recipient clears them.
    pub async fn execute(&mut self, workflow: &mut Workflow) -> WorkflowOutcome {
        if workflow.status.is_terminal() {
            return self.outcome(workflow, Vec::new(), Vec::new());
        }
        self.store.clear(&Recipient::All);

        workflow.status = WorkflowStatus::Executing;
        tracing::info!(workflow = %workflow.id, name = %workflow.name, "Workflow executing");

        let mut errors = Vec::new();
        let mut warnings = workflow.warnings.clone();
        let resume_from = workflow.current_step.max(1);
        let steps: Vec<Step> =
            workflow.steps.iter().filter(|s| s.number >= resume_from).cloned().collect();

        for step in &steps {
            if workflow.is_step_complete(step) {
                continue;
            }
            workflow.current_step = step.number;

            if let Err(StepFailure(error)) = self.run_step(workflow, step).await {
                tracing::warn!(workflow = %workflow.id, step = step.number, %error, "Workflow failed");
                errors.push(error);
                workflow.status = WorkflowStatus::Failed;
                break;
            }
        }

        if workflow.status == WorkflowStatus::Executing {
            workflow.status = WorkflowStatus::Completed;
            if workflow.template == TemplateKind::NewFeature {
                let validation = self.repository.validate_for_merge(workflow.branch.as_deref());
                warnings.extend(validation.warnings);
                if !validation.valid {
                    errors.extend(validation.errors);
                    workflow.status = WorkflowStatus::Failed;
                }
            }
        }

        for task in &workflow.tasks {
            if let Some(result) = &task.result {
                warnings.extend(result.warnings.iter().cloned());
            }
        }

        tracing::info!(workflow = %workflow.id, status = %workflow.status, "Workflow finished");
        self.history.push(workflow.clone());
        self.outcome(workflow, errors, warnings)
    }

    async fn run_step(&self, workflow: &mut Workflow, step: &Step) -> Result<(), StepFailure> {
        for dependency in &step.depends_on {
            match workflow.step(*dependency) {
                None => {
                    return Err(StepFailure(format!(
                        "Step {} depends on step {dependency}, which does not exist",
                        step.number
                    )));
                }
                Some(dep) if !workflow.is_step_complete(dep) => {
                    return Err(StepFailure(format!(
                        "Step {} cannot start: step {dependency} ({}) has not completed",
                        step.number, dep.description
                    )));
                }
                Some(_) => {}
            }
        }

        tracing::debug!(step = step.number, domain = %step.domain, "Starting step");
        let mut previous: Option<String> = None;

        for (index, description) in step.tasks.iter().enumerate() {
            let id = format!("{}-s{}-t{}", workflow.id, step.number, index + 1);
            let retry_id = format!("{id}-retry");
            if workflow.tasks.iter().any(|t| (t.id == id || t.id == retry_id) && t.is_completed()) {
                previous = Some(id);
                continue;
            }

            let mut task = Task::new(id.clone(), step.number, description.clone(), step.domain);
            task.dependencies.extend(previous.take());
            let response = self.dispatch_task(workflow, task).await;

            if !response.success {
                if !step.domain.is_verification() {
                    return Err(StepFailure(format!(
                        "Step {} task '{description}' failed: {}",
                        step.number,
                        failure_text(&response)
                    )));
                }
                self.fix_and_retry(workflow, &id, &response).await?;
            }
            previous = Some(id);
        }

        Ok(())
    }

    /// Fix/retry for a failed verification: one fix, one retry.
    async fn fix_and_retry(
        &self,
        workflow: &mut Workflow,
        failed_id: &str,
        failure: &SpecialistResponse,
    ) -> Result<(), StepFailure> {
        let Some(failed) = workflow.tasks.iter().find(|t| t.id == failed_id).cloned() else {
            return Err(StepFailure(format!("Task {failed_id} vanished from the workflow")));
        };

        let fix_domain = classify_response(&failed.description, failure);
        tracing::info!(task = %failed.id, fix_domain = %fix_domain, "Verification failed, dispatching fix");

        let mut fix = Task::new(
            format!("{failed_id}-fix"),
            failed.step,
            format!("Fix failure in '{}': {}", failed.description, failure_text(failure)),
            fix_domain,
        );
        fix.priority = Priority::High;
        fix.fix_for = Some(failed_id.to_string());
        fix.dependencies.push(failed_id.to_string());

        let fix_response = self.dispatch_task(workflow, fix).await;
        if !fix_response.success {
            return Err(StepFailure(format!(
                "Fix for '{}' by the {} failed: {}",
                failed.description,
                fix_domain.specialist_name(),
                failure_text(&fix_response)
            )));
        }

        let mut retry = Task::new(
            format!("{failed_id}-retry"),
            failed.step,
            failed.description.clone(),
            failed.domain,
        );
        retry.priority = failed.priority;
        retry.dependencies.push(format!("{failed_id}-fix"));

        let retry_response = self.dispatch_task(workflow, retry).await;
        if !retry_response.success {
            return Err(StepFailure(format!(
                "'{}' still failing after a fix by the {}: {}",
                failed.description,
                fix_domain.specialist_name(),
                failure_text(&retry_response)
            )));
        }

        if let Some(task) = workflow.tasks.last_mut() {
            task.fixed_by = Some(fix_domain);
        }
        Ok(())
    }

    /// Append `task` to the workflow, dispatch it and record the response.
    async fn dispatch_task(&self, workflow: &mut Workflow, mut task: Task) -> SpecialistResponse {
        task.status = TaskStatus::InProgress;
        let request = SpecialistRequest {
            domain: task.domain,
            task: task.description.clone(),
            workflow_id: workflow.id.clone(),
            workflow_name: workflow.name.clone(),
            subject: workflow.subject.clone(),
            project_root: self.root.clone(),
            step: task.step,
        };
        workflow.tasks.push(task);

        let response = self.dispatch(&request).await;

        if let Some(task) = workflow.tasks.last_mut() {
            task.status = if response.success { TaskStatus::Completed } else { TaskStatus::Failed };
            task.result = Some(response.clone());
        }
        response
    }

    async fn dispatch(&self, request: &SpecialistRequest) -> SpecialistResponse {
        let Some(specialist) = self.specialists.get(request.domain) else {
            return SpecialistResponse::failure(format!(
                "No specialist registered for domain '{}'",
                request.domain
            ));
        };

        let limit = specialist.timeout().unwrap_or_else(|| self.config.task_timeout());
        tracing::debug!(
            specialist = specialist.name(),
            step = request.step,
            task = %request.task,
            "Dispatching task"
        );

        match tokio::time::timeout(limit, specialist.handle(request)).await {
            Ok(response) => response,
            Err(_) => {
                tracing::warn!(specialist = specialist.name(), timeout = ?limit, "Task timed out");
                SpecialistResponse::failure(format!(
                    "{} did not answer within {}s",
                    specialist.name(),
                    limit.as_secs()
                ))
            }
        }
    }

    fn outcome(
        &self,
        workflow: &Workflow,
        errors: Vec<String>,
        mut warnings: Vec<String>,
    ) -> WorkflowOutcome {
        warnings.dedup();
        let completed = workflow.status == WorkflowStatus::Completed;

        let message = if completed {
            format!(
                "Workflow '{}' completed: {} task(s) across {} step(s)",
                workflow.name,
                workflow.completed_tasks(),
                workflow.steps.len()
            )
        } else {
            format!("Workflow '{}' failed at step {}", workflow.name, workflow.current_step)
        };

        WorkflowOutcome {
            workflow_id: workflow.id.clone(),
            workflow_name: workflow.name.clone(),
            template: workflow.template,
            status: workflow.status,
            message,
            branch: workflow.branch.clone(),
            completed_tasks: workflow.completed_tasks(),
            errors,
            warnings,
            next_steps: next_steps(workflow),
        }
    }
}

fn failure_text(response: &SpecialistResponse) -> String {
    if !response.message.trim().is_empty() {
        response.message.trim().to_string()
    } else if let Some(error) = response.errors.first() {
        error.clone()
    } else {
        "no details given".to_string()
    }
}

/// Template-specific guidance for the user.
fn next_steps(workflow: &Workflow) -> Vec<String> {
    let completed = workflow.status == WorkflowStatus::Completed;
    let subject = workflow.subject.as_deref().unwrap_or("<name>");
    let mut steps = Vec::new();

    if !completed {
        steps.push("Inspect the failed task output above".to_string());
    }

    match (workflow.template, completed) {
        (TemplateKind::NewFeature, true) => {
            let branch = workflow.branch.as_deref().unwrap_or("<branch>");
            steps.push(format!("Review the changes on '{branch}'"));
            steps.push(format!("Run `conductor validate-merge {branch}`"));
            steps.push(format!("Merge with `conductor merge {branch} --strategy squash`"));
        }
        (TemplateKind::NewFeature, false) => {
            steps.push("Check the working copy with `conductor git-status`".to_string());
            steps.push(format!("Re-run `conductor new-feature {subject}` once fixed"));
        }
        (TemplateKind::StructuralAnalysis, true) => {
            steps.push("Run `conductor fix-violations` to remediate violations".to_string());
            steps.push("Review the rule set with `conductor patterns`".to_string());
        }
        (TemplateKind::ViolationRemediation, true) => {
            steps.push("Run `conductor analyze` to confirm no violations remain".to_string());
            steps.push("Commit the remediation".to_string());
        }
        (TemplateKind::Generic, true) => {
            steps.push("Review the changes".to_string());
            steps.push("Commit once the test suite passes".to_string());
        }
        (_, false) => {
            steps.push("Re-run the workflow once the failure is addressed".to_string());
        }
    }

    steps
}
