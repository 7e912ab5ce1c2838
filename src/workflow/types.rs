//! Workflow, step and task records.

use std::collections::BTreeSet;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::specialist::SpecialistResponse;
use crate::core::Domain;

/// Plan template a workflow was built from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TemplateKind {
    NewFeature,
    StructuralAnalysis,
    ViolationRemediation,
    Generic,
}

impl TemplateKind {
    pub const ALL: [Self; 4] =
        [Self::NewFeature, Self::StructuralAnalysis, Self::ViolationRemediation, Self::Generic];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::NewFeature => "new-feature",
            Self::StructuralAnalysis => "structural-analysis",
            Self::ViolationRemediation => "violation-remediation",
            Self::Generic => "generic",
        }
    }
}

impl fmt::Display for TemplateKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Workflow lifecycle.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WorkflowStatus {
    #[default]
    Planning,
    Executing,
    Completed,
    Failed,
}

impl WorkflowStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Failed)
    }
}

impl fmt::Display for WorkflowStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Planning => "planning",
            Self::Executing => "executing",
            Self::Completed => "completed",
            Self::Failed => "failed",
        };
        f.write_str(s)
    }
}

/// Task lifecycle.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    #[default]
    Pending,
    InProgress,
    Completed,
    Failed,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    Low,
    #[default]
    Normal,
    High,
    Critical,
}

/// One stage of a workflow, owned by a single domain.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Step {
    /// 1-based position in the workflow
    pub number: usize,

    pub description: String,

    pub domain: Domain,

    /// Task descriptions, dispatched in order
    pub tasks: Vec<String>,

    /// Steps whose tasks must all be completed first
    pub depends_on: BTreeSet<usize>,
}

/// A dispatched unit of work. Appended to the workflow and never removed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Task {
    /// `<workflow>-s<step>-t<n>`, with `-fix`/`-retry` suffixes for
    /// fix/retry dispatches
    pub id: String,

    /// Owning step number
    pub step: usize,

    pub description: String,

    pub domain: Domain,

    pub priority: Priority,

    /// Task ids this task waits on
    pub dependencies: Vec<String>,

    pub status: TaskStatus,

    /// Specialist response, once received
    pub result: Option<SpecialistResponse>,

    /// Set when a failed verification passed after a fix from this domain
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fixed_by: Option<Domain>,

    /// Id of the failed task this fix was dispatched for
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fix_for: Option<String>,
}

impl Task {
    pub fn new(id: String, step: usize, description: impl Into<String>, domain: Domain) -> Self {
        Self {
            id,
            step,
            description: description.into(),
            domain,
            priority: Priority::Normal,
            dependencies: Vec::new(),
            status: TaskStatus::Pending,
            result: None,
            fixed_by: None,
            fix_for: None,
        }
    }

    pub fn is_completed(&self) -> bool {
        self.status == TaskStatus::Completed
    }
}

/// A planned and (possibly) executed unit of work.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Workflow {
    pub id: String,
    pub name: String,
    pub description: String,
    pub template: TemplateKind,
    pub steps: Vec<Step>,

    /// Number of the step being (or last) executed; 0 before execution
    pub current_step: usize,

    pub status: WorkflowStatus,

    /// Audit trail of every dispatch
    pub tasks: Vec<Task>,

    /// Feature name or other subject extracted from the request
    pub subject: Option<String>,

    /// Working branch established during planning
    pub branch: Option<String>,

    /// Problems noticed while planning (e.g. branch creation failed)
    #[serde(default)]
    pub warnings: Vec<String>,

    pub created_at: DateTime<Utc>,
}

impl Workflow {
    pub fn step(&self, number: usize) -> Option<&Step> {
        self.steps.iter().find(|s| s.number == number)
    }

    /// Tasks that belong to `step`, excluding fix dispatches.
    pub fn step_tasks(&self, step: usize) -> impl Iterator<Item = &Task> {
        self.tasks.iter().filter(move |t| t.step == step && t.fix_for.is_none())
    }

    /// Whether every task of `step` has been dispatched and completed.
    ///
    /// A verification that was retried counts once, by its final attempt.
    pub fn is_step_complete(&self, step: &Step) -> bool {
        let originals: Vec<&Task> =
            self.step_tasks(step.number).filter(|t| !t.id.ends_with("-retry")).collect();
        originals.len() >= step.tasks.len()
            && originals.iter().all(|task| {
                task.is_completed()
                    || self
                        .tasks
                        .iter()
                        .any(|t| t.id == format!("{}-retry", task.id) && t.is_completed())
            })
    }

    pub fn completed_tasks(&self) -> usize {
        self.tasks.iter().filter(|t| t.is_completed()).count()
    }
}
