//! Terraform stack sections.

use serde::{Deserialize, Serialize};

use super::general::GitProvider;
use super::resources::{CpuUnit, MemoryUnit};

fn default_timeout_sec() -> u32 {
    1800
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TerraformGeneral {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub icon_uri: Option<String>,
    pub provider: GitProvider,
    pub repository: String,
    #[serde(default)]
    pub branch: String,
    #[serde(default)]
    pub root_path: Option<String>,
    #[serde(default)]
    pub git_token_id: Option<String>,
    #[serde(default = "default_timeout_sec")]
    pub timeout_sec: u32,
    #[serde(default)]
    pub auto_deploy: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProviderVersion {
    #[serde(default = "default_true")]
    pub read_from_terraform_block: bool,
    #[serde(default)]
    pub explicit_version: Option<String>,
}

fn default_true() -> bool {
    true
}

impl Default for ProviderVersion {
    fn default() -> Self {
        Self {
            read_from_terraform_block: true,
            explicit_version: None,
        }
    }
}

/// Resources of the runner executing terraform.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TerraformJobResources {
    pub cpu: f64,
    #[serde(default)]
    pub cpu_unit: CpuUnit,
    pub memory: f64,
    #[serde(default)]
    pub memory_unit: MemoryUnit,
    #[serde(default = "default_storage_gib")]
    pub storage_gib: u32,
}

fn default_storage_gib() -> u32 {
    1
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TerraformConfiguration {
    #[serde(default)]
    pub provider_version: ProviderVersion,
    pub job_resources: TerraformJobResources,
    #[serde(default)]
    pub use_cluster_credentials: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TfVar {
    pub key: String,
    #[serde(default)]
    pub value: String,
    #[serde(default)]
    pub secret: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TerraformInputVariables {
    #[serde(default)]
    pub tf_var_file_paths: Vec<String>,
    #[serde(default)]
    pub tf_vars: Vec<TfVar>,
}
