//! Workflow orchestration.
//!
//! A request is turned into a [`Workflow`] from one of four templates, then
//! executed step by step by the [`Orchestrator`].
//!
//! ## Templates
//!
//! - `new-feature` - branch, schema, logic, routes, views, styles, tests
//! - `structural-analysis` - inspect the project and document findings
//! - `violation-remediation` - one fix step per violating domain, then tests
//! - `generic` - inspect, implement, verify
//!
//! ## Failure handling
//!
//! A failed testing task is classified with [`classify_failure`], fixed by
//! the responsible specialist and retried once. Other failures stop the
//! workflow.

mod classify;
mod engine;
mod planning;
mod request;
mod specialist;
mod types;

pub use classify::{classify_failure, classify_response, DEFAULT_FIX_DOMAIN};
pub use engine::{Orchestrator, WorkflowOutcome};
pub use planning::{
    describe_templates, number_steps, template_steps, workflow_name, StepDescription,
    StepTemplate, TemplateDescription,
};
pub use request::{extract_subject, WorkflowRequest};
#[cfg(feature = "http")]
pub use specialist::HttpSpecialist;
pub use specialist::{
    AnalysisSpecialist, CommandSpecialist, RepositorySpecialist, Specialist, SpecialistError,
    SpecialistRegistry, SpecialistRequest, SpecialistResponse,
};
pub use types::{Priority, Step, Task, TaskStatus, TemplateKind, Workflow, WorkflowStatus};
