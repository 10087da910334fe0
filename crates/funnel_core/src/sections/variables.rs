//! Environment variables declared during creation.

use serde::{Deserialize, Serialize};

/// Scope a variable is attached to.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum VariableScope {
    #[default]
    Project,
    Environment,
    Application,
    Container,
    Job,
    Helm,
    Terraform,
}

impl VariableScope {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Project => "PROJECT",
            Self::Environment => "ENVIRONMENT",
            Self::Application => "APPLICATION",
            Self::Container => "CONTAINER",
            Self::Job => "JOB",
            Self::Helm => "HELM",
            Self::Terraform => "TERRAFORM",
        }
    }
}

/// Mount settings of a variable delivered as a file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VariableFile {
    /// Absolute path the file is mounted at.
    pub path: String,
    #[serde(default)]
    pub enable_interpolation: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VariableData {
    pub variable: String,
    #[serde(default)]
    pub value: String,
    #[serde(default, alias = "isSecret")]
    pub is_secret: bool,
    #[serde(default)]
    pub scope: Option<VariableScope>,
    /// File variables are created one by one instead of being bulk imported.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file: Option<VariableFile>,
}

impl VariableData {
    pub fn is_file(&self) -> bool {
        self.file.is_some()
    }

    /// Scope the variable ends up in once `default` fills a missing one.
    pub fn scope_or(&self, default: VariableScope) -> VariableScope {
        self.scope.unwrap_or(default)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct VariablesData {
    #[serde(default)]
    pub variables: Vec<VariableData>,
}
