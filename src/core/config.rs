//! Configuration management for Conductor.
//!
//! Handles loading and saving configuration from TOML files.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::Context;
use serde::{Deserialize, Serialize};

use super::Domain;

/// Name of the project-local configuration file.
pub const CONFIG_FILE: &str = ".conductor.toml";

/// Application configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// General settings
    pub general: GeneralConfig,

    /// Version-control settings
    pub git: GitConfig,

    /// Workflow engine settings
    pub orchestration: OrchestrationConfig,

    /// Project structure rules
    pub analyzer: AnalyzerConfig,

    /// Scaffolding settings
    pub init: InitConfig,

    /// External specialists, keyed by domain tag
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub specialists: BTreeMap<String, SpecialistConfig>,
}

/// General application settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// Project name (defaults to the directory name)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub project_name: Option<String>,

    /// Short project description
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// Version-control settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GitConfig {
    /// Branch that work branches start from and merge into
    pub base_branch: String,

    /// Conventional alternative used when `base_branch` does not exist
    pub fallback_base_branch: String,

    /// Remote used for syncing and publishing
    pub remote: String,

    /// Whether to pull/push against the remote at all
    pub sync: bool,
}

/// Workflow engine settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OrchestrationConfig {
    /// Upper bound on a single specialist dispatch, in seconds
    pub task_timeout_secs: u64,
}

/// Project structure rules used by the analyzer.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalyzerConfig {
    /// Top-level directories every project must have
    pub required_dirs: Vec<String>,

    /// Directory whose children are feature groupings
    pub feature_root: String,

    /// Sub-directories every feature grouping must have
    pub feature_parts: Vec<String>,

    /// Paths that count as a schema definition (first match wins)
    pub schema_paths: Vec<String>,

    /// Directories skipped when counting files
    pub ignore_dirs: Vec<String>,
}

/// Scaffolding settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct InitConfig {
    /// Dependency install command run after scaffolding
    #[serde(skip_serializing_if = "Option::is_none")]
    pub install_command: Option<String>,
}

/// How a command specialist exchanges data with the engine.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SpecialistProtocol {
    /// Request JSON on stdin, response JSON on stdout
    #[default]
    Json,
    /// Exit status decides success; output becomes the message
    ExitCode,
}

/// An external specialist reachable by command or URL.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SpecialistConfig {
    /// Shell command to run (supports `~` and `$VAR`)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub command: Option<String>,

    /// HTTP endpoint receiving the request as JSON
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,

    /// Data exchange protocol for commands
    pub protocol: SpecialistProtocol,

    /// Per-specialist timeout override, in seconds
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timeout_secs: Option<u64>,
}

impl SpecialistConfig {
    /// Create a command specialist entry.
    pub fn command(command: impl Into<String>, protocol: SpecialistProtocol) -> Self {
        Self { command: Some(command.into()), url: None, protocol, timeout_secs: None }
    }
}

impl Config {
    /// Load configuration for a project.
    ///
    /// Looks for config in:
    /// 1. `.conductor.toml` in the project root
    /// 2. `~/.config/conductor/config.toml`
    /// 3. Falls back to defaults
    pub fn load(project_root: &Path) -> anyhow::Result<Self> {
        let local_config = project_root.join(CONFIG_FILE);
        if local_config.exists() {
            return Self::load_from_file(&local_config);
        }

        if let Some(config_dir) = Self::config_dir() {
            let global_config = config_dir.join("config.toml");
            if global_config.exists() {
                return Self::load_from_file(&global_config);
            }
        }

        Ok(Self::default())
    }

    /// Load configuration from a specific file.
    pub fn load_from_file(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        let config: Self = toml::from_str(&content)
            .with_context(|| format!("Failed to parse {}", path.display()))?;
        Ok(config)
    }

    /// Serialize to TOML.
    pub fn to_toml(&self) -> anyhow::Result<String> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Get the config directory path.
    pub fn config_dir() -> Option<PathBuf> {
        dirs::config_dir().map(|d| d.join("conductor"))
    }

    /// Default bound on a specialist dispatch.
    pub fn task_timeout(&self) -> Duration {
        Duration::from_secs(self.orchestration.task_timeout_secs.max(1))
    }

    /// Configured specialists with their parsed domains.
    ///
    /// Entries whose key is not a known domain are skipped with a warning.
    pub fn specialist_entries(&self) -> Vec<(Domain, &SpecialistConfig)> {
        self.specialists
            .iter()
            .filter_map(|(key, entry)| match key.parse::<Domain>() {
                Ok(domain) => Some((domain, entry)),
                Err(e) => {
                    tracing::warn!("Ignoring specialist entry: {e}");
                    None
                }
            })
            .collect()
    }
}

impl Default for GitConfig {
    fn default() -> Self {
        Self {
            base_branch: "main".to_string(),
            fallback_base_branch: "master".to_string(),
            remote: "origin".to_string(),
            sync: true,
        }
    }
}

impl Default for OrchestrationConfig {
    fn default() -> Self {
        Self { task_timeout_secs: 600 }
    }
}

impl Default for AnalyzerConfig {
    fn default() -> Self {
        Self {
            required_dirs: vec![
                "src".to_string(),
                "public".to_string(),
                "config".to_string(),
                "tests".to_string(),
            ],
            feature_root: "src/features".to_string(),
            feature_parts: vec!["handlers".to_string(), "views".to_string(), "tests".to_string()],
            schema_paths: vec![
                "db/schema.sql".to_string(),
                "db/migrations".to_string(),
                "migrations".to_string(),
                "prisma/schema.prisma".to_string(),
            ],
            ignore_dirs: vec![
                ".git".to_string(),
                "node_modules".to_string(),
                "target".to_string(),
                "dist".to_string(),
                "build".to_string(),
            ],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.git.base_branch, "main");
        assert_eq!(config.git.fallback_base_branch, "master");
        assert_eq!(config.orchestration.task_timeout_secs, 600);
        assert!(config.specialists.is_empty());
        assert_eq!(config.analyzer.feature_root, "src/features");
    }

    #[test]
    fn test_config_serialization() {
        let config = Config::default();
        let toml_str = config.to_toml().unwrap();
        assert!(toml_str.contains("[git]"));
        assert!(toml_str.contains("[analyzer]"));
        assert!(!toml_str.contains("[specialists"));
    }

    #[test]
    fn test_config_deserialization() {
        let toml_str = r#"
            [git]
            base_branch = "trunk"
            sync = false

            [orchestration]
            task_timeout_secs = 30

            [specialists.testing]
            command = "npm test"
            protocol = "exit-code"

            [specialists.markup]
            url = "http://localhost:8080/markup"
            timeout_secs = 120
        "#;

        let config: Config = toml::from_str(toml_str).unwrap();
        assert_eq!(config.git.base_branch, "trunk");
        assert_eq!(config.git.remote, "origin");
        assert!(!config.git.sync);
        assert_eq!(config.task_timeout(), Duration::from_secs(30));

        let testing = &config.specialists["testing"];
        assert_eq!(testing.command.as_deref(), Some("npm test"));
        assert_eq!(testing.protocol, SpecialistProtocol::ExitCode);

        let markup = &config.specialists["markup"];
        assert_eq!(markup.protocol, SpecialistProtocol::Json);
        assert_eq!(markup.timeout_secs, Some(120));
    }

    #[test]
    fn test_specialist_entries_skip_unknown_domains() {
        let mut config = Config::default();
        config
            .specialists
            .insert("testing".to_string(), SpecialistConfig::command("true", SpecialistProtocol::ExitCode));
        config
            .specialists
            .insert("juggling".to_string(), SpecialistConfig::command("true", SpecialistProtocol::Json));

        let entries = config.specialist_entries();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].0, Domain::Testing);
    }

    #[test]
    fn test_load_prefers_project_file() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join(CONFIG_FILE), "[general]\nproject_name = \"shop\"\n")
            .unwrap();

        let config = Config::load(dir.path()).unwrap();
        assert_eq!(config.general.project_name.as_deref(), Some("shop"));
    }

    #[test]
    fn test_load_reports_parse_errors() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join(CONFIG_FILE), "[git\nbase_branch = 1").unwrap();

        let err = Config::load(dir.path()).unwrap_err();
        assert!(err.to_string().contains("Failed to parse"));
    }
}
