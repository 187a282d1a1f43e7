use anyhow::{Context, Result};
use serde::Deserialize;
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

pub const DEFAULT_REPORT_PATH: &str = "build/reports/jacoco/test/jacocoTestReport.xml";
pub const DEFAULT_SERVICE_NAME: &str = "coveralls-jacoco";
pub const MAIN_SOURCE_SET: &str = "main";
pub const MAIN_SOURCE_DIR: &str = "src/main/java";

#[derive(Debug, Default, Deserialize)]
pub struct Config {
    /// Source sets whose directories are searched, in order (default: `main`)
    #[serde(default)]
    pub report_source_sets: Vec<String>,
    #[serde(default)]
    pub report: Report,
    #[serde(default)]
    pub project: Project,
    #[serde(default)]
    pub source_sets: HashMap<String, Vec<PathBuf>>,
    #[serde(default)]
    pub coveralls: Coveralls,
}

#[derive(Debug, Deserialize)]
pub struct Report {
    #[serde(default = "default_report_path")]
    pub path: PathBuf,
    /// Package prefix stripped from report paths, e.g. `com.example`
    #[serde(default)]
    pub root_package: Option<String>,
}

impl Default for Report {
    fn default() -> Self {
        Self {
            path: default_report_path(),
            root_package: None,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct Project {
    /// Project root, relative to the config file's directory
    #[serde(default)]
    pub root: Option<PathBuf>,
}

#[derive(Debug, Deserialize)]
pub struct Coveralls {
    #[serde(default = "default_service_name")]
    pub service_name: String,
    #[serde(default)]
    pub service_job_id: Option<String>,
}

impl Default for Coveralls {
    fn default() -> Self {
        Self {
            service_name: default_service_name(),
            service_job_id: None,
        }
    }
}

fn default_report_path() -> PathBuf {
    PathBuf::from(DEFAULT_REPORT_PATH)
}

fn default_service_name() -> String {
    DEFAULT_SERVICE_NAME.to_string()
}

/// Command line values that take precedence over the config file
#[derive(Debug, Default, Clone)]
pub struct Overrides {
    pub report: Option<PathBuf>,
    pub root_package: Option<String>,
    pub project_dir: Option<PathBuf>,
    pub source_dirs: Vec<PathBuf>,
}

/// Everything a reconciliation run needs, with paths resolved
#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    pub report_path: PathBuf,
    pub root_package: Option<String>,
    pub project_root: PathBuf,
    pub source_roots: Vec<PathBuf>,
    pub service_name: String,
    pub service_job_id: Option<String>,
}

impl Config {
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse {}", path.display()))?;

        config.validate()?;

        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        for name in &self.report_source_sets {
            if !self.source_sets.contains_key(name) && name != MAIN_SOURCE_SET {
                anyhow::bail!(
                    "Source set '{}' is listed in report_source_sets but not declared in [source_sets]",
                    name
                );
            }
        }

        Ok(())
    }

    /// Directories of a source set; `main` falls back to `src/main/java`
    pub fn source_set(&self, name: &str) -> Option<Vec<PathBuf>> {
        match self.source_sets.get(name) {
            Some(dirs) => Some(dirs.clone()),
            None if name == MAIN_SOURCE_SET => Some(vec![PathBuf::from(MAIN_SOURCE_DIR)]),
            None => None,
        }
    }

    /// Ordered source roots for the configured source sets, resolved against `project_root`
    pub fn source_dirs(&self, project_root: &Path) -> Vec<PathBuf> {
        let names: Vec<&str> = if self.report_source_sets.is_empty() {
            vec![MAIN_SOURCE_SET]
        } else {
            self.report_source_sets.iter().map(String::as_str).collect()
        };

        names
            .into_iter()
            .filter_map(|name| self.source_set(name))
            .flatten()
            .map(|dir| project_root.join(dir))
            .collect()
    }

    /// Resolve the run settings; `base_dir` is the directory holding the config file
    pub fn resolve(&self, base_dir: &Path, overrides: &Overrides) -> Settings {
        let project_root = match (&overrides.project_dir, &self.project.root) {
            (Some(dir), _) => dir.clone(),
            (None, Some(root)) => base_dir.join(root),
            (None, None) => base_dir.to_path_buf(),
        };

        let report_path = project_root.join(overrides.report.as_ref().unwrap_or(&self.report.path));

        let source_roots = if overrides.source_dirs.is_empty() {
            self.source_dirs(&project_root)
        } else {
            overrides
                .source_dirs
                .iter()
                .map(|dir| project_root.join(dir))
                .collect()
        };

        Settings {
            report_path,
            root_package: overrides
                .root_package
                .clone()
                .or_else(|| self.report.root_package.clone()),
            project_root,
            source_roots,
            service_name: self.coveralls.service_name.clone(),
            service_job_id: self.coveralls.service_job_id.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_parse_config() {
        let toml_content = r#"
report_source_sets = ["main", "generated"]

[report]
path = "target/site/jacoco/jacoco.xml"
root_package = "com.example"

[project]
root = "app"

[source_sets]
main = ["src/main/java", "src/main/kotlin"]
generated = ["build/generated/sources"]

[coveralls]
service_name = "github"
"#;

        let config: Config = toml::from_str(toml_content).unwrap();
        assert!(config.validate().is_ok());
        assert_eq!(config.report.path, PathBuf::from("target/site/jacoco/jacoco.xml"));
        assert_eq!(config.report.root_package.as_deref(), Some("com.example"));
        assert_eq!(config.coveralls.service_name, "github");

        let dirs = config.source_dirs(Path::new("/work/app"));
        assert_eq!(
            dirs,
            vec![
                PathBuf::from("/work/app/src/main/java"),
                PathBuf::from("/work/app/src/main/kotlin"),
                PathBuf::from("/work/app/build/generated/sources"),
            ]
        );
    }

    #[test]
    fn test_defaults() {
        let config: Config = toml::from_str("").unwrap();
        let settings = config.resolve(Path::new("/work"), &Overrides::default());

        assert_eq!(
            settings.report_path,
            PathBuf::from("/work").join(DEFAULT_REPORT_PATH)
        );
        assert_eq!(settings.root_package, None);
        assert_eq!(settings.project_root, PathBuf::from("/work"));
        assert_eq!(settings.source_roots, vec![PathBuf::from("/work/src/main/java")]);
        assert_eq!(settings.service_name, DEFAULT_SERVICE_NAME);
    }

    #[test]
    fn test_source_set_order_is_kept() {
        let config: Config = toml::from_str(
            r#"
report_source_sets = ["b", "a"]

[source_sets]
a = ["a1"]
b = ["b1", "b2"]
"#,
        )
        .unwrap();

        let dirs = config.source_dirs(Path::new("/p"));
        assert_eq!(
            dirs,
            vec![
                PathBuf::from("/p/b1"),
                PathBuf::from("/p/b2"),
                PathBuf::from("/p/a1"),
            ]
        );
    }

    #[test]
    fn test_unknown_source_set_is_rejected() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("coveralls.toml");
        fs::write(&path, "report_source_sets = [\"integration\"]\n").unwrap();

        let err = Config::load(&path).unwrap_err();
        assert!(err.to_string().contains("integration"));
    }

    #[test]
    fn test_main_source_set_is_implicit() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("coveralls.toml");
        fs::write(&path, "report_source_sets = [\"main\"]\n").unwrap();

        let config = Config::load(&path).unwrap();
        assert_eq!(
            config.source_dirs(Path::new("/p")),
            vec![PathBuf::from("/p/src/main/java")]
        );
    }

    #[test]
    fn test_empty_source_set() {
        let config: Config = toml::from_str(
            r#"
[source_sets]
main = []
"#,
        )
        .unwrap();

        assert!(config.source_dirs(Path::new("/p")).is_empty());
    }

    #[test]
    fn test_overrides_take_precedence() {
        let config: Config = toml::from_str(
            r#"
[report]
root_package = "com.example"

[project]
root = "app"
"#,
        )
        .unwrap();

        let overrides = Overrides {
            report: Some(PathBuf::from("/tmp/jacoco.xml")),
            root_package: Some("org.other".to_string()),
            project_dir: Some(PathBuf::from("/elsewhere")),
            source_dirs: vec![PathBuf::from("src"), PathBuf::from("/abs/src")],
        };

        let settings = config.resolve(Path::new("/work"), &overrides);
        assert_eq!(settings.report_path, PathBuf::from("/tmp/jacoco.xml"));
        assert_eq!(settings.root_package.as_deref(), Some("org.other"));
        assert_eq!(settings.project_root, PathBuf::from("/elsewhere"));
        assert_eq!(
            settings.source_roots,
            vec![PathBuf::from("/elsewhere/src"), PathBuf::from("/abs/src")]
        );
    }

    #[test]
    fn test_project_root_relative_to_config() {
        let config: Config = toml::from_str("[project]\nroot = \"app\"\n").unwrap();
        let settings = config.resolve(Path::new("/work"), &Overrides::default());

        assert_eq!(settings.project_root, PathBuf::from("/work/app"));
        assert_eq!(settings.source_roots, vec![PathBuf::from("/work/app/src/main/java")]);
    }
}
