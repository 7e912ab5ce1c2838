//! Workflow requests and natural-language intent classification.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

use super::types::TemplateKind;

static NAMED_SUBJECT: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?i)\b(?:named|called)\s+["'`]?([A-Za-z0-9][A-Za-z0-9 _-]*?)["'`]?\s*(?:[.,;:!?]|$|\s+(?:that|which|to|with|for)\b)"#)
        .expect("valid subject regex")
});

static FEATURE_SUBJECT: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\bfeature\s+(?:for\s+)?([A-Za-z0-9][A-Za-z0-9_-]*)").expect("valid feature regex")
});

/// Words that follow "feature" without naming it.
const NOT_A_SUBJECT: &[&str] = &["named", "called", "that", "which", "to", "with", "the", "a", "an"];

/// What the user asked for.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum WorkflowRequest {
    /// Build a new feature on its own branch
    NewFeature {
        name: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        description: Option<String>,
    },
    /// Inspect the project structure
    Analyze,
    /// Fix every structure violation the analyzer finds
    FixViolations,
    /// Anything else
    Generic { text: String },
}

impl WorkflowRequest {
    pub fn new_feature(name: impl Into<String>) -> Self {
        Self::NewFeature { name: name.into(), description: None }
    }

    /// Classify a free-text request.
    ///
    /// Keyword heuristics are confined to this function; callers that know
    /// what they want build the variant directly.
    pub fn from_text(text: &str) -> Self {
        let lower = text.to_lowercase();
        let has = |words: &[&str]| words.iter().any(|w| lower.contains(w));

        if has(&["feature"]) && has(&["new", "create", "add", "build", "implement"]) {
            if let Some(name) = extract_subject(text) {
                return Self::NewFeature { name, description: Some(text.trim().to_string()) };
            }
        }
        if has(&["violation", "remediat"]) {
            return Self::FixViolations;
        }
        if has(&["analy", "structure", "audit", "inspect"]) {
            return Self::Analyze;
        }

        Self::Generic { text: text.trim().to_string() }
    }

    pub fn template(&self) -> TemplateKind {
        match self {
            Self::NewFeature { .. } => TemplateKind::NewFeature,
            Self::Analyze => TemplateKind::StructuralAnalysis,
            Self::FixViolations => TemplateKind::ViolationRemediation,
            Self::Generic { .. } => TemplateKind::Generic,
        }
    }

    /// Subject the workflow is about, if any.
    pub fn subject(&self) -> Option<&str> {
        match self {
            Self::NewFeature { name, .. } => Some(name),
            _ => None,
        }
    }
}

/// Feature name from `named X`, `called X` or `feature X`.
pub fn extract_subject(text: &str) -> Option<String> {
    if let Some(caps) = NAMED_SUBJECT.captures(text) {
        let name = caps[1].trim();
        if !name.is_empty() {
            return Some(name.to_string());
        }
    }

    FEATURE_SUBJECT
        .captures_iter(text)
        .map(|caps| caps[1].to_string())
        .find(|word| !NOT_A_SUBJECT.contains(&word.to_lowercase().as_str()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_feature_named() {
        let request = WorkflowRequest::from_text("create new feature named billing");
        assert_eq!(request.subject(), Some("billing"));
        assert_eq!(request.template(), TemplateKind::NewFeature);
    }

    #[test]
    fn test_new_feature_called_with_trailing_clause() {
        let request =
            WorkflowRequest::from_text("Add a feature called user profile that shows avatars");
        assert_eq!(request.subject(), Some("user profile"));
    }

    #[test]
    fn test_feature_word_subject() {
        let request = WorkflowRequest::from_text("build the feature invoices");
        assert_eq!(request.subject(), Some("invoices"));
    }

    #[test]
    fn test_feature_without_subject_falls_through() {
        let request = WorkflowRequest::from_text("create a new feature");
        assert!(matches!(request, WorkflowRequest::Generic { .. }));
    }

    #[test]
    fn test_other_templates() {
        assert_eq!(WorkflowRequest::from_text("fix the violations"), WorkflowRequest::FixViolations);
        assert_eq!(WorkflowRequest::from_text("analyze the project structure"), WorkflowRequest::Analyze);
        assert_eq!(
            WorkflowRequest::from_text("speed up page loads"),
            WorkflowRequest::Generic { text: "speed up page loads".to_string() }
        );
    }

    #[test]
    fn test_serde_tagging() {
        let json = serde_json::to_string(&WorkflowRequest::Analyze).unwrap();
        assert_eq!(json, r#"{"type":"analyze"}"#);
    }
}
