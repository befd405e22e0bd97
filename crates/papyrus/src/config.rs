//! Project configuration (papyrus.toml).

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use papyrus_detective::DetectiveConfig;
use serde::Deserialize;

/// Configuration file structure.
#[derive(Debug, Deserialize, Default)]
pub struct ConfigFile {
    #[serde(default)]
    pub site: SiteConfig,
    #[serde(default)]
    pub build: BuildSettings,
    #[serde(default, alias = "hazmat")]
    pub detective: DetectiveConfig,
    #[serde(default)]
    pub tools: ToolsConfig,
}

#[derive(Debug, Deserialize)]
pub struct SiteConfig {
    #[serde(default = "default_source")]
    pub source: PathBuf,
    #[serde(default = "default_output")]
    pub output: PathBuf,
    #[serde(default = "default_title")]
    pub title: String,
    #[serde(default = "default_base_url")]
    pub base_url: String,
    /// Directories searched for templates before the built-in theme
    #[serde(default)]
    pub templates_path: Vec<PathBuf>,
}

impl Default for SiteConfig {
    fn default() -> Self {
        Self {
            source: default_source(),
            output: default_output(),
            title: default_title(),
            base_url: default_base_url(),
            templates_path: Vec::new(),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct BuildSettings {
    #[serde(default = "default_true")]
    pub minify: bool,
    #[serde(default = "default_true")]
    pub keep_going: bool,
    pub jobs: Option<usize>,
}

impl Default for BuildSettings {
    fn default() -> Self {
        Self {
            minify: true,
            keep_going: true,
            jobs: None,
        }
    }
}

/// External tools run by `lint`, `format` and `edit`.
#[derive(Debug, Deserialize)]
pub struct ToolsConfig {
    #[serde(default = "default_lint")]
    pub lint: Vec<Vec<String>>,
    #[serde(default = "default_format")]
    pub format: Vec<Vec<String>>,
    #[serde(default = "default_editor")]
    pub editor: String,
}

impl Default for ToolsConfig {
    fn default() -> Self {
        Self {
            lint: default_lint(),
            format: default_format(),
            editor: default_editor(),
        }
    }
}

fn default_source() -> PathBuf {
    PathBuf::from("source")
}
fn default_output() -> PathBuf {
    PathBuf::from("build")
}
fn default_title() -> String {
    "Documentation".to_string()
}
fn default_base_url() -> String {
    "/".to_string()
}
fn default_true() -> bool {
    true
}
fn default_editor() -> String {
    "code".to_string()
}

fn argv(args: &[&str]) -> Vec<String> {
    args.iter().map(|a| a.to_string()).collect()
}

fn default_lint() -> Vec<Vec<String>> {
    vec![
        argv(&["cargo", "fmt", "--all", "--check"]),
        argv(&["cargo", "clippy", "--workspace", "--", "-D", "warnings"]),
    ]
}

fn default_format() -> Vec<Vec<String>> {
    vec![argv(&["cargo", "fmt", "--all"])]
}

/// A loaded configuration and the directory it applies to.
#[derive(Debug)]
pub struct Project {
    /// Directory containing the config file; relative paths resolve from here
    pub root: PathBuf,
    pub config: ConfigFile,
}

impl Project {
    /// Load the config at `path` if it exists, defaults otherwise.
    /// Returns an error if the config file exists but is malformed.
    pub fn load(path: &Path) -> Result<Self> {
        let root = path
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .unwrap_or(Path::new("."))
            .to_path_buf();

        let config = if path.exists() {
            let content = fs::read_to_string(path)
                .with_context(|| format!("Failed to read {}", path.display()))?;
            let config: ConfigFile = toml::from_str(&content)
                .with_context(|| format!("Failed to parse {}", path.display()))?;
            tracing::info!("Loaded config from {}", path.display());
            config
        } else {
            tracing::debug!("No config at {}, using defaults", path.display());
            ConfigFile::default()
        };

        Ok(Self { root, config })
    }

    /// Resolve a configured path against the project root.
    pub fn resolve(&self, path: &Path) -> PathBuf {
        self.root.join(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use tempfile::tempdir;

    #[test]
    fn missing_file_uses_defaults() {
        let temp = tempdir().unwrap();
        let project = Project::load(&temp.path().join("papyrus.toml")).unwrap();

        assert_eq!(project.root, temp.path());
        assert_eq!(project.config.site.source, PathBuf::from("source"));
        assert_eq!(project.config.site.base_url, "/");
        assert!(project.config.build.minify);
        assert!(!project.config.detective.enabled);
        assert_eq!(project.config.tools.editor, "code");
        assert_eq!(project.config.tools.lint.len(), 2);
    }

    #[test]
    fn parses_partial_config() {
        let config: ConfigFile = toml::from_str(
            r#"
[site]
title = "Papyrus"
templates_path = ["_templates"]

[build]
jobs = 2

[detective]
enabled = true
"#,
        )
        .unwrap();

        assert_eq!(config.site.title, "Papyrus");
        assert_eq!(config.site.output, PathBuf::from("build"));
        assert_eq!(config.site.templates_path, vec![PathBuf::from("_templates")]);
        assert_eq!(config.build.jobs, Some(2));
        assert!(config.build.keep_going);
        assert!(config.detective.enabled);
        assert_eq!(config.detective.insert_before, "</body>");
    }

    #[test]
    fn accepts_hazmat_table() {
        let config: ConfigFile = toml::from_str(
            r#"
[hazmat]
enabled = true
insert_before = "<!-- debug -->"
"#,
        )
        .unwrap();

        assert!(config.detective.enabled);
        assert_eq!(config.detective.insert_before, "<!-- debug -->");
    }

    #[test]
    fn malformed_file_is_an_error() {
        let temp = tempdir().unwrap();
        let path = temp.path().join("papyrus.toml");
        fs::write(&path, "[site\ntitle = ").unwrap();

        assert!(Project::load(&path).is_err());
    }

    #[test]
    fn custom_tools() {
        let config: ConfigFile = toml::from_str(
            r#"
[tools]
lint = [["ruff", "check", "."]]
editor = "vim"
"#,
        )
        .unwrap();

        assert_eq!(config.tools.lint, vec![argv(&["ruff", "check", "."])]);
        assert_eq!(config.tools.format, default_format());
        assert_eq!(config.tools.editor, "vim");
    }
}
