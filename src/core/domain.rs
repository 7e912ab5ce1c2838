//! Specialist domain tags.
//!
//! Every step, task and specialist is tagged with exactly one domain. The set
//! is closed: specialists are looked up by domain, so adding a variant means
//! adding a routing target.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Category of implementation work handled by one specialist.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Domain {
    /// Business logic, handlers and services
    Development,
    /// Server-rendered markup and views
    Markup,
    /// Data model, schema and migrations
    Schema,
    /// Test authoring and verification
    Testing,
    /// Authentication, permissions and sessions
    Authorization,
    /// Routes and request/response plumbing
    Interface,
    /// Stylesheets and visual design
    Style,
    /// Read-only project inspection
    Analysis,
    /// Branch lifecycle of the working copy
    RepositoryState,
    /// Profiling and optimisation
    Performance,
    /// Security review and hardening
    Security,
    /// Project documentation
    Documentation,
    /// Release and deployment
    Deployment,
}

impl Domain {
    /// All domains, in declaration order.
    pub const ALL: [Self; 13] = [
        Self::Development,
        Self::Markup,
        Self::Schema,
        Self::Testing,
        Self::Authorization,
        Self::Interface,
        Self::Style,
        Self::Analysis,
        Self::RepositoryState,
        Self::Performance,
        Self::Security,
        Self::Documentation,
        Self::Deployment,
    ];

    /// Canonical tag used in configuration and on the wire.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Development => "development",
            Self::Markup => "markup",
            Self::Schema => "schema",
            Self::Testing => "testing",
            Self::Authorization => "authorization",
            Self::Interface => "interface",
            Self::Style => "style",
            Self::Analysis => "analysis",
            Self::RepositoryState => "repository-state",
            Self::Performance => "performance",
            Self::Security => "security",
            Self::Documentation => "documentation",
            Self::Deployment => "deployment",
        }
    }

    /// Human-readable specialist name for this domain.
    pub fn specialist_name(&self) -> &'static str {
        match self {
            Self::Development => "business logic specialist",
            Self::Markup => "markup specialist",
            Self::Schema => "schema specialist",
            Self::Testing => "testing specialist",
            Self::Authorization => "authorization specialist",
            Self::Interface => "interface specialist",
            Self::Style => "style specialist",
            Self::Analysis => "analysis specialist",
            Self::RepositoryState => "repository specialist",
            Self::Performance => "performance specialist",
            Self::Security => "security specialist",
            Self::Documentation => "documentation specialist",
            Self::Deployment => "deployment specialist",
        }
    }

    /// Whether failures in this domain trigger the fix/retry protocol.
    pub fn is_verification(&self) -> bool {
        matches!(self, Self::Testing)
    }
}

impl fmt::Display for Domain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Domain {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_lowercase().replace('_', "-");
        match normalized.as_str() {
            "development" | "logic" | "business-logic" => Ok(Self::Development),
            "markup" | "views" => Ok(Self::Markup),
            "schema" | "database" => Ok(Self::Schema),
            "testing" | "tests" => Ok(Self::Testing),
            "authorization" | "auth" => Ok(Self::Authorization),
            "interface" | "api" => Ok(Self::Interface),
            "style" | "styles" => Ok(Self::Style),
            "analysis" => Ok(Self::Analysis),
            "repository-state" | "repository" | "git" => Ok(Self::RepositoryState),
            "performance" => Ok(Self::Performance),
            "security" => Ok(Self::Security),
            "documentation" | "docs" => Ok(Self::Documentation),
            "deployment" | "deploy" => Ok(Self::Deployment),
            _ => Err(format!("Unknown domain: {s}")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tags_round_trip_through_from_str() {
        for domain in Domain::ALL {
            assert_eq!(domain.as_str().parse::<Domain>().unwrap(), domain);
        }
    }

    #[test]
    fn test_aliases() {
        assert_eq!("auth".parse::<Domain>().unwrap(), Domain::Authorization);
        assert_eq!("repository_state".parse::<Domain>().unwrap(), Domain::RepositoryState);
        assert!("painting".parse::<Domain>().is_err());
    }

    #[test]
    fn test_serde_uses_kebab_case() {
        let json = serde_json::to_string(&Domain::RepositoryState).unwrap();
        assert_eq!(json, "\"repository-state\"");
    }

    #[test]
    fn test_only_testing_is_verification() {
        let verifying: Vec<_> = Domain::ALL.iter().filter(|d| d.is_verification()).collect();
        assert_eq!(verifying, vec![&Domain::Testing]);
    }
}
