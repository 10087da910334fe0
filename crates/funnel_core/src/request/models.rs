//! Payloads sent to the service API.
//!
//! Field order is fixed by the struct definitions and no hash-ordered
//! collection appears in a payload, so serializing the same request twice
//! yields identical bytes.

use serde::{Deserialize, Serialize};

use crate::sections::{
    Accessibility, DatabaseMode, DatabaseType, PortProtocol, ProviderVersion, TfVar, VariableScope,
};
use crate::variant::ServiceType;

/// Create payload, tagged with the backend service type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "serviceType", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CreateRequest {
    Application(ApplicationRequest),
    Container(ContainerRequest),
    Database(DatabaseRequest),
    Job(JobRequest),
    Helm(HelmRequest),
    Terraform(TerraformRequest),
}

impl CreateRequest {
    pub fn service_type(&self) -> ServiceType {
        match self {
            Self::Application(_) => ServiceType::Application,
            Self::Container(_) => ServiceType::Container,
            Self::Database(_) => ServiceType::Database,
            Self::Job(_) => ServiceType::Job,
            Self::Helm(_) => ServiceType::Helm,
            Self::Terraform(_) => ServiceType::Terraform,
        }
    }

    pub fn name(&self) -> &str {
        match self {
            Self::Application(r) => &r.name,
            Self::Container(r) => &r.name,
            Self::Database(r) => &r.name,
            Self::Job(r) => &r.name,
            Self::Helm(r) => &r.name,
            Self::Terraform(r) => &r.name,
        }
    }

    /// Serialize to pretty JSON.
    pub fn to_json_pretty(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GitRepositoryRequest {
    pub url: String,
    pub branch: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub root_path: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub git_token_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PortRequest {
    pub name: String,
    pub internal_port: u16,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub external_port: Option<u16>,
    pub publicly_accessible: bool,
    pub protocol: PortProtocol,
}

/// How a probe checks the container.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProbeKind {
    Tcp {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        host: Option<String>,
    },
    Http {
        path: String,
        scheme: String,
    },
    Grpc {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        service: Option<String>,
    },
    Exec {
        command: Vec<String>,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Probe {
    #[serde(rename = "type")]
    pub kind: ProbeKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub port: Option<u16>,
    pub initial_delay_seconds: u32,
    pub period_seconds: u32,
    pub timeout_seconds: u32,
    pub success_threshold: u32,
    pub failure_threshold: u32,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Healthchecks {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub readiness_probe: Option<Probe>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub liveness_probe: Option<Probe>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BuildMode {
    #[default]
    Docker,
}

/// Application built from a git repository.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApplicationRequest {
    pub name: String,
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub icon_uri: Option<String>,
    pub ports: Vec<PortRequest>,
    pub cpu: u32,
    pub memory: u32,
    pub min_running_instances: u32,
    pub max_running_instances: u32,
    pub build_mode: BuildMode,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dockerfile_path: Option<String>,
    pub git_repository: GitRepositoryRequest,
    pub arguments: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub entrypoint: Option<String>,
    pub healthchecks: Healthchecks,
    pub auto_deploy: bool,
    pub annotations_groups: Vec<String>,
    pub labels_groups: Vec<String>,
}

/// Container deployed from a registry image.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContainerRequest {
    pub name: String,
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub icon_uri: Option<String>,
    pub ports: Vec<PortRequest>,
    pub cpu: u32,
    pub memory: u32,
    pub min_running_instances: u32,
    pub max_running_instances: u32,
    pub registry_id: String,
    pub image_name: String,
    pub tag: String,
    pub arguments: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub entrypoint: Option<String>,
    pub healthchecks: Healthchecks,
    pub auto_deploy: bool,
    pub annotations_groups: Vec<String>,
    pub labels_groups: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DatabaseRequest {
    pub name: String,
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub icon_uri: Option<String>,
    #[serde(rename = "type")]
    pub database_type: DatabaseType,
    pub version: String,
    pub mode: DatabaseMode,
    pub accessibility: Accessibility,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cpu: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub memory: Option<u32>,
    /// Storage in GB.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub storage: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub instance_type: Option<String>,
    pub annotations_groups: Vec<String>,
    pub labels_groups: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobImageSource {
    pub image_name: String,
    pub tag: String,
    pub registry_id: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobDockerSource {
    pub git_repository: GitRepositoryRequest,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dockerfile_path: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dockerfile_raw: Option<String>,
}

/// Where a job image comes from. Exactly one of the two keys is emitted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobSource {
    Image(JobImageSource),
    Docker(JobDockerSource),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CronSchedule {
    pub scheduled_at: String,
    pub timezone: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub entrypoint: Option<String>,
    pub arguments: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LifecycleHook {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub entrypoint: Option<String>,
    pub arguments: Vec<String>,
}

/// Job triggers. A cron job sets `cronjob`; a lifecycle job sets only the
/// hooks that are enabled.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobSchedule {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cronjob: Option<CronSchedule>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub on_start: Option<LifecycleHook>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub on_stop: Option<LifecycleHook>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub on_delete: Option<LifecycleHook>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lifecycle_type: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobRequest {
    pub name: String,
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub icon_uri: Option<String>,
    pub cpu: u32,
    pub memory: u32,
    pub max_nb_restart: u32,
    pub max_duration_seconds: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub port: Option<u16>,
    pub auto_preview: bool,
    pub auto_deploy: bool,
    pub source: JobSource,
    pub schedule: JobSchedule,
    pub healthchecks: Healthchecks,
    pub annotations_groups: Vec<String>,
    pub labels_groups: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HelmRepositoryRequest {
    pub repository: String,
    pub chart_name: String,
    pub chart_version: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HelmSourceRequest {
    GitRepository(GitRepositoryRequest),
    HelmRepository(HelmRepositoryRequest),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawValues {
    pub name: String,
    pub content: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HelmValuesFile {
    Git {
        git_repository: GitRepositoryRequest,
        paths: Vec<String>,
    },
    Raw {
        values: Vec<RawValues>,
    },
}

/// `(key, value)` pairs grouped by the flag they are passed with.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HelmValuesOverride {
    pub set: Vec<(String, String)>,
    pub set_string: Vec<(String, String)>,
    pub set_json: Vec<(String, String)>,
    pub file: Option<HelmValuesFile>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HelmRequest {
    pub name: String,
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub icon_uri: Option<String>,
    pub source: HelmSourceRequest,
    pub allow_cluster_wide_resources: bool,
    pub arguments: Vec<String>,
    pub timeout_sec: u32,
    pub auto_deploy: bool,
    pub values_override: HelmValuesOverride,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TerraformFilesSource {
    pub git_repository: GitRepositoryRequest,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TerraformVariablesSource {
    pub tf_var_file_paths: Vec<String>,
    pub tf_vars: Vec<TfVar>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TerraformJobResourcesRequest {
    pub cpu_milli: u32,
    pub ram_mib: u32,
    pub storage_gib: u32,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TerraformEngine {
    #[default]
    Terraform,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TerraformRequest {
    pub name: String,
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub icon_uri: Option<String>,
    pub timeout_sec: u32,
    pub auto_deploy: bool,
    pub auto_approve: bool,
    pub provider: TerraformEngine,
    pub terraform_files_source: TerraformFilesSource,
    pub terraform_variables_source: TerraformVariablesSource,
    pub provider_version: ProviderVersion,
    pub job_resources: TerraformJobResourcesRequest,
    pub use_cluster_credentials: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VariableImport {
    pub name: String,
    pub value: String,
    pub is_secret: bool,
    pub scope: VariableScope,
}

/// Bulk variable import issued right after creation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VariableImportRequest {
    pub overwrite: bool,
    pub vars: Vec<VariableImport>,
}

/// A file variable, built from the draft before the service exists.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileVariable {
    pub key: String,
    pub value: String,
    pub variable_scope: VariableScope,
    pub is_secret: bool,
    pub mount_path: String,
    pub enable_interpolation_in_file: bool,
}

impl FileVariable {
    /// Attach the variable to the entity that owns its scope.
    pub fn with_parent(&self, parent_id: impl Into<String>) -> VariableRequest {
        VariableRequest {
            key: self.key.clone(),
            value: self.value.clone(),
            variable_scope: self.variable_scope,
            variable_parent_id: parent_id.into(),
            is_secret: self.is_secret,
            mount_path: self.mount_path.clone(),
            enable_interpolation_in_file: self.enable_interpolation_in_file,
        }
    }
}

/// Single variable creation, used for file variables.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VariableRequest {
    pub key: String,
    pub value: String,
    pub variable_scope: VariableScope,
    pub variable_parent_id: String,
    pub is_secret: bool,
    pub mount_path: String,
    pub enable_interpolation_in_file: bool,
}

/// A created service, addressed by id and type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceRef {
    pub service_id: String,
    pub service_type: ServiceType,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeployRequest {
    pub service_id: String,
    pub service_type: ServiceType,
    /// Plan without applying (terraform only).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dry_run: Option<bool>,
}

impl DeployRequest {
    pub fn new(service: &ServiceRef) -> Self {
        Self {
            service_id: service.service_id.clone(),
            service_type: service.service_type,
            dry_run: None,
        }
    }

    pub fn dry_run(mut self) -> Self {
        self.dry_run = Some(true);
        self
    }
}
