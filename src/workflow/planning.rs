//! Plan templates.
//!
//! Templates declare dependencies relative to their own step list; numbers are
//! assigned afterwards, so a plan with or without the leading branch step uses
//! the same template.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use super::request::WorkflowRequest;
use super::types::{Step, TemplateKind};
use crate::analyzer::ProjectAnalysis;
use crate::core::Domain;

/// Placeholder subject used when describing templates.
const SUBJECT_PLACEHOLDER: &str = "<name>";

/// A step before numbering.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StepTemplate {
    pub description: String,
    pub domain: Domain,
    pub tasks: Vec<String>,

    /// Indices of earlier templates in the same list
    pub after: Vec<usize>,
}

impl StepTemplate {
    fn new(domain: Domain, description: impl Into<String>, tasks: Vec<String>) -> Self {
        Self { description: description.into(), domain, tasks, after: Vec::new() }
    }

    fn after(mut self, indices: &[usize]) -> Self {
        self.after = indices.to_vec();
        self
    }
}

/// Template steps for a request.
///
/// `analysis` is used by violation remediation to list one fix task per
/// violation; other templates ignore it.
pub fn template_steps(
    request: &WorkflowRequest,
    analysis: Option<&ProjectAnalysis>,
) -> Vec<StepTemplate> {
    match request {
        WorkflowRequest::NewFeature { name, .. } => new_feature_steps(name),
        WorkflowRequest::Analyze => analysis_steps(),
        WorkflowRequest::FixViolations => remediation_steps(analysis),
        WorkflowRequest::Generic { text } => generic_steps(text),
    }
}

fn new_feature_steps(subject: &str) -> Vec<StepTemplate> {
    vec![
        StepTemplate::new(
            Domain::Schema,
            format!("Define the data model for {subject}"),
            vec![format!("Design the {subject} schema"), format!("Write the {subject} migration")],
        ),
        StepTemplate::new(
            Domain::Development,
            format!("Implement business logic for {subject}"),
            vec![format!("Implement the {subject} services")],
        )
        .after(&[0]),
        StepTemplate::new(
            Domain::Interface,
            format!("Expose {subject} routes"),
            vec![format!("Add request handlers and routes for {subject}")],
        )
        .after(&[1]),
        StepTemplate::new(
            Domain::Markup,
            format!("Render {subject} views"),
            vec![format!("Create the {subject} templates")],
        )
        .after(&[2]),
        StepTemplate::new(
            Domain::Style,
            format!("Style {subject} views"),
            vec![format!("Add styles for the {subject} views")],
        )
        .after(&[3]),
        StepTemplate::new(
            Domain::Testing,
            format!("Verify {subject}"),
            vec![format!("Write tests for {subject}"), format!("Run the test suite for {subject}")],
        )
        .after(&[1, 2, 3]),
    ]
}

fn analysis_steps() -> Vec<StepTemplate> {
    vec![
        StepTemplate::new(
            Domain::Analysis,
            "Inspect project structure",
            vec!["Scan the project structure and report violations".to_string()],
        ),
        StepTemplate::new(
            Domain::Documentation,
            "Document the findings",
            vec!["Summarize the structure analysis and recommendations".to_string()],
        )
        .after(&[0]),
    ]
}

fn remediation_steps(analysis: Option<&ProjectAnalysis>) -> Vec<StepTemplate> {
    let mut steps = vec![StepTemplate::new(
        Domain::Analysis,
        "Confirm current violations",
        vec!["Re-scan the project structure".to_string()],
    )];

    if let Some(analysis) = analysis {
        for (domain, violations) in analysis.violations_by_domain() {
            steps.push(
                StepTemplate::new(
                    domain,
                    format!("Fix {} violations", domain.specialist_name()),
                    violations.iter().map(|v| v.remediation.clone()).collect(),
                )
                .after(&[0]),
            );
        }
    }

    let fix_steps: Vec<usize> = (1..steps.len()).collect();
    let verify_after = if fix_steps.is_empty() { vec![0] } else { fix_steps };
    steps.push(
        StepTemplate::new(
            Domain::Testing,
            "Verify remediation",
            vec!["Run the test suite".to_string()],
        )
        .after(&verify_after),
    );
    steps
}

fn generic_steps(text: &str) -> Vec<StepTemplate> {
    vec![
        StepTemplate::new(
            Domain::Analysis,
            "Inspect the project",
            vec![format!("Gather context for: {text}")],
        ),
        StepTemplate::new(
            Domain::Development,
            "Carry out the request",
            vec![format!("Implement: {text}")],
        )
        .after(&[0]),
        StepTemplate::new(Domain::Testing, "Verify the change", vec!["Run the test suite".to_string()])
            .after(&[1]),
    ]
}

/// Assign step numbers and resolve relative dependencies.
///
/// With a `branch`, a repository-state step confirming it becomes step 1 and
/// every template step without dependencies waits on it.
pub fn number_steps(templates: Vec<StepTemplate>, branch: Option<&str>) -> Vec<Step> {
    let mut steps = Vec::with_capacity(templates.len() + 1);
    let offset = usize::from(branch.is_some());

    if let Some(branch) = branch {
        steps.push(Step {
            number: 1,
            description: format!("Create branch {branch}"),
            domain: Domain::RepositoryState,
            tasks: vec![format!("Confirm the working branch is {branch}")],
            depends_on: BTreeSet::new(),
        });
    }

    for (index, template) in templates.into_iter().enumerate() {
        let mut depends_on: BTreeSet<usize> =
            template.after.iter().map(|i| i + offset + 1).collect();
        if depends_on.is_empty() && offset == 1 {
            depends_on.insert(1);
        }
        steps.push(Step {
            number: index + offset + 1,
            description: template.description,
            domain: template.domain,
            tasks: template.tasks,
            depends_on,
        });
    }

    steps
}

/// Human-readable workflow name for a request.
pub fn workflow_name(request: &WorkflowRequest) -> String {
    match request {
        WorkflowRequest::NewFeature { name, .. } => format!("New feature: {name}"),
        WorkflowRequest::Analyze => "Structural analysis".to_string(),
        WorkflowRequest::FixViolations => "Violation remediation".to_string(),
        WorkflowRequest::Generic { text } => {
            let short: String = text.chars().take(48).collect();
            if short.len() < text.len() {
                format!("Request: {short}...")
            } else {
                format!("Request: {short}")
            }
        }
    }
}

/// A step as shown by the `workflows` command.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StepDescription {
    pub number: usize,
    pub domain: Domain,
    pub description: String,
    pub depends_on: Vec<usize>,
}

/// A template as shown by the `workflows` command.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TemplateDescription {
    pub template: TemplateKind,
    pub trigger: String,
    pub steps: Vec<StepDescription>,
}

/// All templates with placeholder subjects.
pub fn describe_templates() -> Vec<TemplateDescription> {
    TemplateKind::ALL
        .into_iter()
        .map(|template| {
            let (trigger, request, branch) = match template {
                TemplateKind::NewFeature => (
                    "conductor new-feature <name>",
                    WorkflowRequest::new_feature(SUBJECT_PLACEHOLDER),
                    Some(format!("feature/{SUBJECT_PLACEHOLDER}")),
                ),
                TemplateKind::StructuralAnalysis => {
                    ("conductor run \"analyze the project\"", WorkflowRequest::Analyze, None)
                }
                TemplateKind::ViolationRemediation => {
                    ("conductor fix-violations", WorkflowRequest::FixViolations, None)
                }
                TemplateKind::Generic => (
                    "conductor run <request>",
                    WorkflowRequest::Generic { text: "<request>".to_string() },
                    None,
                ),
            };

            let steps = number_steps(template_steps(&request, None), branch.as_deref())
                .into_iter()
                .map(|step| StepDescription {
                    number: step.number,
                    domain: step.domain,
                    description: step.description,
                    depends_on: step.depends_on.into_iter().collect(),
                })
                .collect();

            TemplateDescription { template, trigger: trigger.to_string(), steps }
        })
        .collect()
}
