//! Console config file (`config.yml`).
//!
//! Only the console name and the dependency mapping matter here; providers,
//! dashboards and widgets are carried through untouched.

use crate::error::{OpsError, Result};
use serde::Deserialize;
use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;

#[derive(Debug, Deserialize)]
struct ConfigDocument {
    #[serde(rename = "Console")]
    console: ConsoleManifest,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ConsoleManifest {
    pub name: String,
    #[allow(dead_code)]
    #[serde(default)]
    pub providers: serde_yaml::Value,
    #[allow(dead_code)]
    #[serde(default)]
    pub dashboards: serde_yaml::Value,
    #[allow(dead_code)]
    #[serde(default)]
    pub widgets: serde_yaml::Value,
    /// Type name -> package identifier.
    #[serde(default)]
    pub dependencies: BTreeMap<String, String>,
}

impl ConsoleManifest {
    pub fn parse(contents: &str, path: &Path) -> Result<Self> {
        let doc: ConfigDocument =
            serde_yaml::from_str(contents).map_err(|source| OpsError::MalformedConfig {
                path: path.to_path_buf(),
                source,
            })?;
        Ok(doc.console)
    }

    pub fn load(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path).map_err(|source| OpsError::ConfigRead {
            path: path.to_path_buf(),
            source,
        })?;
        Self::parse(&contents, path)
    }

    /// Deduplicated package identifiers, in stable order.
    pub fn dependency_set(&self) -> BTreeSet<String> {
        self.dependencies
            .values()
            .map(|d| d.trim())
            .filter(|d| !d.is_empty())
            .map(str::to_string)
            .collect()
    }
}

pub fn load_dependencies(path: &Path) -> Result<BTreeSet<String>> {
    Ok(ConsoleManifest::load(path)?.dependency_set())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    const CONFIG: &str = r#"
Console:
  name: console
  providers:
    AwsLocalProvider:
      type: AwsCredentialsProvider
  dashboards:
    Main:
      route: main
      widgets:
        - $ref: '#/Console/widgets/Ecs'
  widgets:
    Ecs:
      type: EcsInfo
      displayName: ECS Info
  dependencies:
    EcsInfo: '@tinystacks/aws-widgets'
    EcsDeployments: '@tinystacks/aws-widgets'
    AwsCredentialsProvider: '@tinystacks/aws-credentials-provider'
"#;

    #[test]
    fn parses_name_and_deduplicates_dependencies() {
        let manifest = ConsoleManifest::parse(CONFIG, Path::new("config.yml")).unwrap();
        assert_eq!(manifest.name, "console");
        let deps: Vec<_> = manifest.dependency_set().into_iter().collect();
        assert_eq!(
            deps,
            vec![
                "@tinystacks/aws-credentials-provider".to_string(),
                "@tinystacks/aws-widgets".to_string()
            ]
        );
    }

    #[test]
    fn opaque_sections_are_carried_through() {
        let manifest = ConsoleManifest::parse(CONFIG, Path::new("config.yml")).unwrap();
        assert!(manifest.providers.get("AwsLocalProvider").is_some());
        assert!(manifest.dashboards.get("Main").is_some());
        assert!(manifest.widgets.get("Ecs").is_some());
    }

    #[test]
    fn missing_dependencies_section_is_empty() {
        let manifest =
            ConsoleManifest::parse("Console:\n  name: bare\n", Path::new("config.yml")).unwrap();
        assert!(manifest.dependency_set().is_empty());
    }

    #[test]
    fn malformed_yaml_keeps_cause_and_suggests_template_fix() {
        let err = ConsoleManifest::parse("Console:\n  name: [unclosed\n", Path::new("bad.yml"))
            .unwrap_err();
        assert!(matches!(err, OpsError::MalformedConfig { .. }));
        assert!(std::error::Error::source(&err).is_some());
        assert!(err.hints()[0].contains("malformed"));
    }

    #[test]
    fn missing_console_root_is_malformed() {
        let err = ConsoleManifest::parse("name: x\n", Path::new("config.yml")).unwrap_err();
        assert!(matches!(err, OpsError::MalformedConfig { .. }));
    }

    #[test]
    fn load_dependencies_reads_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.yml");
        std::fs::write(&path, CONFIG).unwrap();

        assert_eq!(load_dependencies(&path).unwrap().len(), 2);
    }
}
