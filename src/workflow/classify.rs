//! Failure-domain classification.
//!
//! Maps a failed verification to the specialist most likely to fix it.
//! Buckets are checked in order and the first match wins; text that matches
//! nothing goes to business logic.

use super::specialist::SpecialistResponse;
use crate::core::Domain;

/// Ordered (domain, keywords) buckets.
const BUCKETS: &[(Domain, &[&str])] = &[
    (
        Domain::Interface,
        &["endpoint", "route", "request", "response", "api", "http", "status code", "handler"],
    ),
    (Domain::Markup, &["template", "render", "view", "html", "markup", "element", "selector"]),
    (Domain::Schema, &["database", "schema", "migration", "column", "table", "query", "sql"]),
    (
        Domain::Authorization,
        &["auth", "permission", "unauthorized", "forbidden", "token", "session", "login"],
    ),
];

/// Domain that failures default to.
pub const DEFAULT_FIX_DOMAIN: Domain = Domain::Development;

/// Classify failure text into a non-testing domain.
pub fn classify_failure(text: &str) -> Domain {
    let text = text.to_lowercase();

    BUCKETS
        .iter()
        .find(|(_, keywords)| keywords.iter().any(|k| text.contains(k)))
        .map(|(domain, _)| *domain)
        .unwrap_or(DEFAULT_FIX_DOMAIN)
}

/// Classify a failed task from its description and the specialist's response.
pub fn classify_response(task_description: &str, response: &SpecialistResponse) -> Domain {
    let mut text = format!("{task_description}\n{}", response.message);
    for error in &response.errors {
        text.push('\n');
        text.push_str(error);
    }
    if let Some(details) = &response.details {
        text.push('\n');
        text.push_str(&details.to_string());
    }
    classify_failure(&text)
}
