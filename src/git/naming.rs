//! Branch naming and name validation.
//!
//! Names follow `kind/slug` or `kind/issue-slug`. Both [`name_branch`] and
//! [`validate_name`] are pure; collision checks against an actual repository
//! live on [`super::RepositoryManager::validate_name`].

use once_cell::sync::Lazy;
use regex::Regex;

use super::{BranchKind, BranchSpec, ValidationResult};

/// Longest accepted branch name.
pub const MAX_BRANCH_NAME_LEN: usize = 100;

/// Slug used when the requested name has no alphanumerics at all.
const FALLBACK_SLUG: &str = "work";

static SLUG_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[a-z0-9]+(-[a-z0-9]+)*$").expect("valid slug regex"));

/// Lower-case `input`, turn every run of non-alphanumerics into one hyphen and
/// trim hyphens at the edges.
pub fn slugify(input: &str) -> String {
    let mut slug = String::with_capacity(input.len());
    let mut pending_hyphen = false;

    for c in input.chars() {
        if c.is_ascii_alphanumeric() {
            if pending_hyphen && !slug.is_empty() {
                slug.push('-');
            }
            pending_hyphen = false;
            slug.push(c.to_ascii_lowercase());
        } else {
            pending_hyphen = true;
        }
    }

    slug
}

/// Derive the branch name for a [`BranchSpec`].
///
/// Deterministic for identical inputs, and the result always passes
/// [`validate_name`].
pub fn name_branch(spec: &BranchSpec) -> String {
    let kind = spec.kind.as_str();
    let issue = spec.issue.as_deref().map(slugify).filter(|s| !s.is_empty());

    let mut slug = slugify(&spec.name);
    if slug.is_empty() {
        slug = FALLBACK_SLUG.to_string();
    }

    let prefix = match &issue {
        Some(issue) => format!("{kind}/{issue}-"),
        None => format!("{kind}/"),
    };

    let budget = MAX_BRANCH_NAME_LEN.saturating_sub(prefix.len());
    if slug.len() > budget {
        slug.truncate(budget);
        while slug.ends_with('-') {
            slug.pop();
        }
    }
    if slug.is_empty() {
        return format!("{kind}/{FALLBACK_SLUG}");
    }

    format!("{prefix}{slug}")
}

/// Check a branch name against the naming grammar.
pub fn validate_name(name: &str) -> ValidationResult {
    let mut result = ValidationResult::new();

    if name.is_empty() {
        result.add_error("Invalid branch name format: name is empty");
        result.add_suggestion(format!("Use the format <kind>/<name>, e.g. feature/{FALLBACK_SLUG}"));
        return result;
    }

    if name.len() > MAX_BRANCH_NAME_LEN {
        result.add_error(format!(
            "Branch name is {} characters long; the limit is {MAX_BRANCH_NAME_LEN}",
            name.len()
        ));
    }

    match name.split_once('/') {
        None => {
            result.add_error("Invalid branch name format: expected <kind>/<name>");
        }
        Some((kind, slug)) => {
            if kind.parse::<BranchKind>().is_err() {
                result.add_error(format!(
                    "Invalid branch name format: unknown kind '{kind}' (expected one of: {})",
                    BranchKind::ALL.map(|k| k.as_str()).join(", ")
                ));
            }
            if !SLUG_PATTERN.is_match(slug) {
                result.add_error(
                    "Invalid characters in branch name: use lowercase letters, digits and single hyphens",
                );
            }
        }
    }

    if !result.valid {
        result.add_suggestion(format!("Try '{}'", suggest_name(name)));
    }

    result
}

/// Closest valid name for an invalid input.
fn suggest_name(name: &str) -> String {
    let (kind, rest) = match name.split_once('/') {
        Some((kind, rest)) => match kind.to_lowercase().parse::<BranchKind>() {
            Ok(kind) => (kind, rest.to_string()),
            Err(_) => (BranchKind::Feature, name.to_string()),
        },
        None => (BranchKind::Feature, name.to_string()),
    };

    name_branch(&BranchSpec::new(kind, rest))
}
