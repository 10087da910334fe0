//! General section shared by applications, containers and jobs.

use serde::{Deserialize, Serialize};

use crate::draft::{Draft, Section};

/// Hosted git provider a repository lives on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum GitProvider {
    Github,
    Gitlab,
    Bitbucket,
}

impl GitProvider {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Github => "GITHUB",
            Self::Gitlab => "GITLAB",
            Self::Bitbucket => "BITBUCKET",
        }
    }

    /// Public host used when no override is configured.
    pub fn default_host(&self) -> &'static str {
        match self {
            Self::Github => "https://github.com",
            Self::Gitlab => "https://gitlab.com",
            Self::Bitbucket => "https://bitbucket.org",
        }
    }
}

/// Repository coordinates as entered in a general step.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GitSource {
    pub provider: GitProvider,
    /// `owner/name` or a full clone URL.
    pub repository: String,
    #[serde(default)]
    pub branch: String,
    #[serde(default)]
    pub root_path: Option<String>,
    #[serde(default)]
    pub git_token_id: Option<String>,
    #[serde(default)]
    pub dockerfile_path: Option<String>,
}

/// Image coordinates in a container registry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegistrySource {
    pub registry_id: String,
    pub image_name: String,
    #[serde(default)]
    pub image_tag: String,
}

/// Where the service is built from. The tag is the discriminant the
/// request builder switches on.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "source_provider", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ServiceSource {
    Git(GitSource),
    Registry(RegistrySource),
}

impl ServiceSource {
    pub fn kind(&self) -> SourceKind {
        match self {
            Self::Git(_) => SourceKind::Git,
            Self::Registry(_) => SourceKind::Registry,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SourceKind {
    Git,
    Registry,
    HelmRepository,
}

/// General step data for applications, containers and jobs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServiceGeneral {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub icon_uri: Option<String>,
    pub source: ServiceSource,
    /// Free-text arguments, tokenized when the request is built.
    #[serde(default)]
    pub cmd_arguments: Option<String>,
    #[serde(default)]
    pub image_entry_point: Option<String>,
    #[serde(default)]
    pub auto_deploy: bool,
    #[serde(default)]
    pub labels_groups: Vec<String>,
    #[serde(default)]
    pub annotations_groups: Vec<String>,
}

#[derive(Deserialize)]
struct SourceTag {
    source_provider: SourceKind,
}

#[derive(Deserialize)]
struct GeneralSourceProbe {
    source: SourceTag,
}

/// Source kind recorded in the general section, without decoding the rest.
///
/// Skip predicates call this on every materialization, so it must tolerate
/// a general section that is still incomplete.
pub fn source_kind(draft: &Draft) -> Option<SourceKind> {
    let value = draft.get(Section::General)?;
    serde_json::from_value::<GeneralSourceProbe>(value.clone())
        .ok()
        .map(|probe| probe.source.source_provider)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_source_is_tagged_by_provider() {
        let general: ServiceGeneral = serde_json::from_value(json!({
            "name": "api",
            "source": {
                "source_provider": "GIT",
                "provider": "GITHUB",
                "repository": "acme/api",
                "branch": "main"
            }
        }))
        .unwrap();

        assert_eq!(general.source.kind(), SourceKind::Git);
        assert!(!general.auto_deploy);
        assert!(general.labels_groups.is_empty());
    }

    #[test]
    fn test_source_kind_on_partial_section() {
        let mut draft = Draft::new();
        assert_eq!(source_kind(&draft), None);

        draft
            .set(Section::General, &json!({"source": {"source_provider": "REGISTRY"}}))
            .unwrap();
        assert_eq!(source_kind(&draft), Some(SourceKind::Registry));

        draft.set(Section::General, &json!({"name": "only-name"})).unwrap();
        assert_eq!(source_kind(&draft), None);
    }
}
