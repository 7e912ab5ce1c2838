//! Project state analysis.
//!
//! Inspects the project tree against the configured structure rules and
//! produces a structural report, a violation list and recommendations. The
//! analyzer is read-only; it never touches the filesystem beyond reading.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use walkdir::WalkDir;

use crate::core::config::AnalyzerConfig;
use crate::core::Domain;

/// Auxiliary tooling detected by marker files: (name, marker paths).
const TOOLING_MARKERS: &[(&str, &[&str])] = &[
    ("npm", &["package.json"]),
    ("Cargo", &["Cargo.toml"]),
    ("Python", &["pyproject.toml", "requirements.txt"]),
    ("Docker", &["Dockerfile"]),
    ("Docker Compose", &["docker-compose.yml", "docker-compose.yaml", "compose.yaml"]),
    ("Make", &["Makefile"]),
    ("GitHub Actions", &[".github/workflows"]),
    ("Tailwind", &["tailwind.config.js", "tailwind.config.ts"]),
    ("ESLint", &[".eslintrc", ".eslintrc.json", ".eslintrc.js", "eslint.config.js"]),
    ("Prettier", &[".prettierrc", ".prettierrc.json", "prettier.config.js"]),
];

/// Presence of one required top-level subtree.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubtreeStatus {
    pub path: String,
    pub present: bool,
}

/// A child directory of the feature root.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeatureGroup {
    /// Directory name
    pub name: String,

    /// Path relative to the project root
    pub path: String,

    /// Required parts that exist
    pub parts: Vec<String>,

    /// Required parts that are missing
    pub missing_parts: Vec<String>,

    /// Files below the grouping
    pub file_count: usize,
}

/// Detected auxiliary tool.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DetectedTool {
    pub name: String,

    /// Marker that triggered detection
    pub marker: String,
}

/// Structural report of the project tree.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectStructure {
    /// Required top-level subtrees
    pub subtrees: Vec<SubtreeStatus>,

    /// Whether the feature root exists
    pub has_feature_root: bool,

    /// Feature groupings, sorted by name
    pub features: Vec<FeatureGroup>,

    /// Detected tooling
    pub tooling: Vec<DetectedTool>,

    /// First schema path that exists
    pub schema_path: Option<String>,

    /// Whether a README exists at the root
    pub has_readme: bool,
}

impl ProjectStructure {
    pub fn has_schema(&self) -> bool {
        self.schema_path.is_some()
    }

    /// Whether a tool with this name was detected.
    pub fn has_tool(&self, name: &str) -> bool {
        self.tooling.iter().any(|t| t.name == name)
    }
}

/// Rule a violation was raised by.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ViolationRule {
    MissingSubtree,
    MissingFeaturePart,
}

/// A broken structure rule.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Violation {
    pub rule: ViolationRule,

    /// Path relative to the project root
    pub path: String,

    pub message: String,

    /// How to fix it
    pub remediation: String,

    /// Specialist responsible for the fix
    pub domain: Domain,
}

/// Full analysis result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectAnalysis {
    pub structure: ProjectStructure,
    pub violations: Vec<Violation>,
    pub recommendations: Vec<String>,
    pub specialist_suggestions: BTreeMap<Domain, Vec<String>>,
}

impl ProjectAnalysis {
    /// No violations were found.
    pub fn is_clean(&self) -> bool {
        self.violations.is_empty()
    }

    /// Violations grouped by responsible domain, in first-seen order.
    pub fn violations_by_domain(&self) -> Vec<(Domain, Vec<&Violation>)> {
        let mut groups: Vec<(Domain, Vec<&Violation>)> = Vec::new();
        for violation in &self.violations {
            match groups.iter_mut().find(|(domain, _)| *domain == violation.domain) {
                Some((_, items)) => items.push(violation),
                None => groups.push((violation.domain, vec![violation])),
            }
        }
        groups
    }

    /// One-line summary.
    pub fn summary(&self) -> String {
        format!(
            "{} feature group(s), {} violation(s), {} tool(s) detected",
            self.structure.features.len(),
            self.violations.len(),
            self.structure.tooling.len()
        )
    }
}

/// Checks a project tree against the structure rules.
#[derive(Debug, Clone)]
pub struct ProjectAnalyzer {
    root: PathBuf,
    rules: AnalyzerConfig,
}

impl ProjectAnalyzer {
    pub fn new(root: impl Into<PathBuf>, rules: AnalyzerConfig) -> Self {
        Self { root: root.into(), rules }
    }

    /// Rule set in effect.
    pub fn patterns(&self) -> &AnalyzerConfig {
        &self.rules
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Analyze the project tree.
    pub fn analyze(&self) -> ProjectAnalysis {
        let structure = self.scan_structure();
        let violations = self.find_violations(&structure);
        let recommendations = self.recommend(&structure, &violations);
        let specialist_suggestions = suggest(&structure, &violations);

        tracing::debug!(
            root = ?self.root,
            features = structure.features.len(),
            violations = violations.len(),
            "Project analyzed"
        );

        ProjectAnalysis { structure, violations, recommendations, specialist_suggestions }
    }

    fn scan_structure(&self) -> ProjectStructure {
        let subtrees = self
            .rules
            .required_dirs
            .iter()
            .map(|dir| SubtreeStatus { path: dir.clone(), present: self.root.join(dir).is_dir() })
            .collect();

        let feature_root = self.root.join(&self.rules.feature_root);
        let has_feature_root = feature_root.is_dir();
        let features = if has_feature_root { self.scan_features(&feature_root) } else { Vec::new() };

        let tooling = TOOLING_MARKERS
            .iter()
            .filter_map(|(name, markers)| {
                markers.iter().find(|m| self.root.join(m).exists()).map(|marker| DetectedTool {
                    name: (*name).to_string(),
                    marker: (*marker).to_string(),
                })
            })
            .collect();

        let schema_path =
            self.rules.schema_paths.iter().find(|p| self.root.join(p).exists()).cloned();

        let has_readme = ["README.md", "README", "readme.md"].iter().any(|f| self.root.join(f).is_file());

        ProjectStructure { subtrees, has_feature_root, features, tooling, schema_path, has_readme }
    }

    fn scan_features(&self, feature_root: &Path) -> Vec<FeatureGroup> {
        let entries = match std::fs::read_dir(feature_root) {
            Ok(entries) => entries,
            Err(e) => {
                tracing::debug!(path = ?feature_root, error = %e, "Could not read feature root");
                return Vec::new();
            }
        };

        let mut features: Vec<FeatureGroup> = entries
            .filter_map(Result::ok)
            .filter(|e| e.path().is_dir())
            .filter_map(|entry| {
                let name = entry.file_name().to_str()?.to_string();
                if name.starts_with('.') || self.is_ignored(&name) {
                    return None;
                }
                let dir = entry.path();
                let (parts, missing_parts): (Vec<String>, Vec<String>) = self
                    .rules
                    .feature_parts
                    .iter()
                    .cloned()
                    .partition(|part| dir.join(part).is_dir());

                Some(FeatureGroup {
                    path: format!("{}/{name}", self.rules.feature_root.trim_end_matches('/')),
                    file_count: self.count_files(&dir),
                    name,
                    parts,
                    missing_parts,
                })
            })
            .collect();

        features.sort_by(|a, b| a.name.cmp(&b.name));
        features
    }

    fn count_files(&self, dir: &Path) -> usize {
        WalkDir::new(dir)
            .into_iter()
            .filter_entry(|e| {
                let name = e.file_name().to_string_lossy();
                !self.is_ignored(&name)
            })
            .filter_map(Result::ok)
            .filter(|e| e.file_type().is_file())
            .count()
    }

    fn is_ignored(&self, name: &str) -> bool {
        self.rules.ignore_dirs.iter().any(|d| d == name)
    }

    fn find_violations(&self, structure: &ProjectStructure) -> Vec<Violation> {
        let mut violations = Vec::new();

        for subtree in structure.subtrees.iter().filter(|s| !s.present) {
            violations.push(Violation {
                rule: ViolationRule::MissingSubtree,
                path: subtree.path.clone(),
                message: format!("Required directory '{}' is missing", subtree.path),
                remediation: format!("Create '{}/' at the project root", subtree.path),
                domain: part_domain(&subtree.path),
            });
        }

        for feature in &structure.features {
            for part in &feature.missing_parts {
                let path = format!("{}/{part}", feature.path);
                violations.push(Violation {
                    rule: ViolationRule::MissingFeaturePart,
                    message: format!("Feature '{}' has no '{part}' directory", feature.name),
                    remediation: format!("Create '{path}/' with the feature's {part}"),
                    domain: part_domain(part),
                    path,
                });
            }
        }

        violations
    }

    fn recommend(&self, structure: &ProjectStructure, violations: &[Violation]) -> Vec<String> {
        let mut recommendations: Vec<String> =
            violations.iter().map(|v| v.remediation.clone()).collect();

        if !structure.has_feature_root {
            recommendations.push(format!(
                "Group features under '{}/' so each feature keeps its {} together",
                self.rules.feature_root,
                self.rules.feature_parts.join(", ")
            ));
        }
        if !structure.has_schema() {
            recommendations.push(format!(
                "No schema definition found; add one of: {}",
                self.rules.schema_paths.join(", ")
            ));
        }
        if !structure.has_tool("GitHub Actions") {
            recommendations.push("Add a CI workflow under .github/workflows".to_string());
        }
        if !structure.has_readme {
            recommendations.push("Add a README.md describing the project".to_string());
        }

        recommendations
    }
}

/// Specialist responsible for a missing directory, by name.
pub fn part_domain(part: &str) -> Domain {
    let part = part.to_lowercase();
    let has = |needles: &[&str]| needles.iter().any(|n| part.contains(n));

    if has(&["test", "spec"]) {
        Domain::Testing
    } else if has(&["view", "template", "page"]) {
        Domain::Markup
    } else if has(&["model", "schema", "migration", "db"]) {
        Domain::Schema
    } else if has(&["style", "css"]) {
        Domain::Style
    } else if has(&["handler", "route", "controller", "api"]) {
        Domain::Interface
    } else if has(&["config", "public"]) {
        Domain::Deployment
    } else {
        Domain::Development
    }
}

fn suggest(
    structure: &ProjectStructure,
    violations: &[Violation],
) -> BTreeMap<Domain, Vec<String>> {
    let mut suggestions: BTreeMap<Domain, Vec<String>> = BTreeMap::new();
    let mut push = |domain: Domain, text: String| {
        let bucket = suggestions.entry(domain).or_default();
        if !bucket.contains(&text) {
            bucket.push(text);
        }
    };

    for violation in violations {
        push(violation.domain, violation.remediation.clone());
    }

    if !structure.has_schema() {
        push(Domain::Schema, "Define the data model and its first migration".to_string());
    }
    if !structure.features.is_empty() {
        push(
            Domain::Testing,
            format!("Keep tests for all {} feature group(s) passing", structure.features.len()),
        );
    }
    if structure.has_tool("Tailwind") {
        push(Domain::Style, "Use the Tailwind configuration for new styles".to_string());
    }
    if !structure.has_tool("GitHub Actions") {
        push(Domain::Deployment, "Set up a CI workflow that runs the test suite".to_string());
    }
    if !structure.has_readme {
        push(Domain::Documentation, "Write a README covering setup and layout".to_string());
    }

    suggestions
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn mkdirs(root: &Path, dirs: &[&str]) {
        for dir in dirs {
            fs::create_dir_all(root.join(dir)).unwrap();
        }
    }

    #[test]
    fn test_empty_project_reports_missing_subtrees() {
        let dir = tempfile::tempdir().unwrap();
        let analysis = ProjectAnalyzer::new(dir.path(), AnalyzerConfig::default()).analyze();

        let missing: Vec<_> = analysis
            .violations
            .iter()
            .filter(|v| v.rule == ViolationRule::MissingSubtree)
            .map(|v| v.path.as_str())
            .collect();
        assert_eq!(missing, vec!["src", "public", "config", "tests"]);
        assert!(!analysis.structure.has_feature_root);
        assert!(!analysis.structure.has_schema());
    }

    #[test]
    fn test_feature_groups_and_missing_parts() {
        let dir = tempfile::tempdir().unwrap();
        mkdirs(
            dir.path(),
            &[
                "src/features/billing/handlers",
                "src/features/billing/views",
                "src/features/billing/tests",
                "src/features/auth/handlers",
                "public",
                "config",
                "tests",
                "migrations",
            ],
        );
        fs::write(dir.path().join("src/features/billing/handlers/invoice.rs"), "").unwrap();
        fs::write(dir.path().join("src/features/billing/views/list.html"), "").unwrap();

        let analysis = ProjectAnalyzer::new(dir.path(), AnalyzerConfig::default()).analyze();

        let names: Vec<_> = analysis.structure.features.iter().map(|f| f.name.as_str()).collect();
        assert_eq!(names, vec!["auth", "billing"]);

        let billing = &analysis.structure.features[1];
        assert_eq!(billing.file_count, 2);
        assert!(billing.missing_parts.is_empty());

        assert_eq!(analysis.violations.len(), 2);
        assert!(analysis.violations.iter().all(|v| v.rule == ViolationRule::MissingFeaturePart));
        assert_eq!(analysis.violations[0].path, "src/features/auth/views");
        assert_eq!(analysis.violations[0].domain, Domain::Markup);
        assert_eq!(analysis.violations[1].domain, Domain::Testing);
        assert_eq!(analysis.structure.schema_path.as_deref(), Some("migrations"));
    }

    #[test]
    fn test_tooling_detection() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("package.json"), "{}").unwrap();
        fs::write(dir.path().join("tailwind.config.js"), "").unwrap();
        mkdirs(dir.path(), &[".github/workflows"]);

        let analysis = ProjectAnalyzer::new(dir.path(), AnalyzerConfig::default()).analyze();
        assert!(analysis.structure.has_tool("npm"));
        assert!(analysis.structure.has_tool("Tailwind"));
        assert!(analysis.structure.has_tool("GitHub Actions"));
        assert!(!analysis.structure.has_tool("Docker"));
        assert!(analysis.specialist_suggestions.contains_key(&Domain::Style));
        assert!(!analysis.specialist_suggestions.contains_key(&Domain::Deployment));
    }

    #[test]
    fn test_analysis_is_deterministic() {
        let dir = tempfile::tempdir().unwrap();
        mkdirs(dir.path(), &["src/features/a", "src/features/b/views"]);

        let analyzer = ProjectAnalyzer::new(dir.path(), AnalyzerConfig::default());
        assert_eq!(analyzer.analyze(), analyzer.analyze());
    }

    #[test]
    fn test_violations_by_domain_keeps_first_seen_order() {
        let dir = tempfile::tempdir().unwrap();
        mkdirs(dir.path(), &["src/features/a", "public", "config", "tests"]);

        let analysis = ProjectAnalyzer::new(dir.path(), AnalyzerConfig::default()).analyze();
        let domains: Vec<_> = analysis.violations_by_domain().into_iter().map(|(d, _)| d).collect();
        assert_eq!(domains, vec![Domain::Interface, Domain::Markup, Domain::Testing]);
    }

    #[test]
    fn test_part_domain_mapping() {
        assert_eq!(part_domain("views"), Domain::Markup);
        assert_eq!(part_domain("tests"), Domain::Testing);
        assert_eq!(part_domain("handlers"), Domain::Interface);
        assert_eq!(part_domain("models"), Domain::Schema);
        assert_eq!(part_domain("styles"), Domain::Style);
        assert_eq!(part_domain("src"), Domain::Development);
    }
}
