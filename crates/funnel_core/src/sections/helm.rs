//! Helm chart sections.

use serde::{Deserialize, Serialize};

use super::general::{GitSource, SourceKind};

/// Chart coming from a Helm repository registered in the organization.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HelmRepositorySource {
    pub repository: String,
    pub chart_name: String,
    pub chart_version: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "source_provider", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum HelmSource {
    Git(GitSource),
    HelmRepository(HelmRepositorySource),
}

impl HelmSource {
    pub fn kind(&self) -> SourceKind {
        match self {
            Self::Git(_) => SourceKind::Git,
            Self::HelmRepository(_) => SourceKind::HelmRepository,
        }
    }
}

fn default_timeout_sec() -> u32 {
    600
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HelmGeneral {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub icon_uri: Option<String>,
    pub source: HelmSource,
    /// Extra `helm` command-line arguments as free text.
    #[serde(default)]
    pub arguments: Option<String>,
    #[serde(default = "default_timeout_sec")]
    pub timeout_sec: u32,
    #[serde(default)]
    pub allow_cluster_wide_resources: bool,
    #[serde(default)]
    pub auto_deploy: bool,
}

/// Where override values come from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ValuesOverrideFileData {
    GitRepository {
        provider: super::general::GitProvider,
        repository: String,
        #[serde(default)]
        branch: String,
        #[serde(default)]
        git_token_id: Option<String>,
        /// Comma-separated list of values files inside the repository.
        #[serde(default)]
        paths: String,
    },
    Yaml {
        #[serde(default)]
        content: String,
    },
    None,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValuesOverrideFile {
    #[serde(flatten)]
    pub file: ValuesOverrideFileData,
    #[serde(default)]
    pub auto_deploy: Option<bool>,
}

/// Flag a value override is passed with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum HelmArgumentType {
    #[serde(rename = "--set")]
    Set,
    #[serde(rename = "--set-string")]
    SetString,
    #[serde(rename = "--set-json")]
    SetJson,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HelmArgument {
    #[serde(rename = "type")]
    pub kind: HelmArgumentType,
    pub key: String,
    #[serde(default)]
    pub value: String,
    /// Raw JSON for `--set-json`; takes precedence over `value`.
    #[serde(default)]
    pub json: Option<String>,
}

impl HelmArgument {
    pub fn effective_value(&self) -> &str {
        self.json.as_deref().unwrap_or(&self.value)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ValuesOverrideArguments {
    #[serde(default)]
    pub arguments: Vec<HelmArgument>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_values_file_variants() {
        let yaml: ValuesOverrideFile =
            serde_json::from_value(json!({"type": "YAML", "content": "replicas: 2"})).unwrap();
        assert!(matches!(yaml.file, ValuesOverrideFileData::Yaml { .. }));

        let none: ValuesOverrideFile =
            serde_json::from_value(json!({"type": "NONE", "auto_deploy": true})).unwrap();
        assert_eq!(none.file, ValuesOverrideFileData::None);
        assert_eq!(none.auto_deploy, Some(true));
    }

    #[test]
    fn test_argument_json_takes_precedence() {
        let arg: HelmArgument = serde_json::from_value(json!({
            "type": "--set-json",
            "key": "resources",
            "value": "ignored",
            "json": "{\"cpu\": 1}"
        }))
        .unwrap();

        assert_eq!(arg.kind, HelmArgumentType::SetJson);
        assert_eq!(arg.effective_value(), "{\"cpu\": 1}");
    }

    #[test]
    fn test_helm_general_defaults() {
        let general: HelmGeneral = serde_json::from_value(json!({
            "name": "redis",
            "source": {
                "source_provider": "HELM_REPOSITORY",
                "repository": "repo-1",
                "chart_name": "redis",
                "chart_version": "18.0.0"
            }
        }))
        .unwrap();

        assert_eq!(general.timeout_sec, 600);
        assert_eq!(general.source.kind(), SourceKind::HelmRepository);
    }
}
