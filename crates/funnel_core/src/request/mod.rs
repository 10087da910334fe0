//! Create-request payloads and the builder that assembles them from a draft.

pub mod builder;
pub mod models;

pub use builder::{
    build, file_variables, git_url, variable_import_request, BuildDefaults, RequestBuilder,
};
pub use models::{
    ApplicationRequest, BuildMode, ContainerRequest, CreateRequest, CronSchedule, DatabaseRequest,
    DeployRequest, FileVariable, GitRepositoryRequest, Healthchecks, HelmRepositoryRequest,
    HelmRequest, HelmSourceRequest, HelmValuesFile, HelmValuesOverride, JobDockerSource,
    JobImageSource, JobRequest, JobSchedule, JobSource, LifecycleHook, PortRequest, Probe,
    ProbeKind, RawValues, ServiceRef, TerraformEngine, TerraformFilesSource,
    TerraformJobResourcesRequest, TerraformRequest, TerraformVariablesSource, VariableImport,
    VariableImportRequest, VariableRequest,
};
