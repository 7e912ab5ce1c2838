//! File templates for scaffolded projects.

use crate::core::config::AnalyzerConfig;

/// Generate the README for a new project.
pub fn readme(name: &str, description: Option<&str>, rules: &AnalyzerConfig) -> String {
    let mut out = format!("# {name}\n\n");
    if let Some(description) = description.map(str::trim).filter(|d| !d.is_empty()) {
        out.push_str(description);
        out.push_str("\n\n");
    }

    out.push_str("## Layout\n\n");
    for dir in &rules.required_dirs {
        out.push_str(&format!("- `{dir}/`\n"));
    }
    out.push_str(&format!(
        "- `{}/<feature>/` with {}\n",
        rules.feature_root,
        rules.feature_parts.iter().map(|p| format!("`{p}/`")).collect::<Vec<_>>().join(", ")
    ));

    out.push_str(
        "\n## Workflows\n\n\
         - `conductor new-feature <name>` - build a feature on its own branch\n\
         - `conductor analyze` - check the layout against the rules\n\
         - `conductor fix-violations` - remediate layout violations\n",
    );
    out
}

/// Generate `.gitignore` from the analyzer's ignored directories.
pub fn gitignore(rules: &AnalyzerConfig) -> String {
    let mut out = String::from("# Generated by conductor\n");
    for dir in rules.ignore_dirs.iter().filter(|d| d.as_str() != ".git") {
        out.push_str(&format!("/{dir}/\n"));
    }
    out.push_str(".env\n*.log\n");
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_readme_lists_layout() {
        let readme = readme("shop", Some("An online shop"), &AnalyzerConfig::default());
        assert!(readme.starts_with("# shop\n\nAn online shop"));
        assert!(readme.contains("- `public/`"));
        assert!(readme.contains("`src/features/<feature>/` with `handlers/`, `views/`, `tests/`"));
    }

    #[test]
    fn test_gitignore_skips_git_dir() {
        let ignore = gitignore(&AnalyzerConfig::default());
        assert!(ignore.contains("/node_modules/"));
        assert!(!ignore.contains("/.git/"));
    }
}
