//! Typed payloads stored in draft sections.
//!
//! Each step writes one or more of these structs into the [`Draft`] through
//! serde; the validators and the request builder decode them back for the
//! active variant.
//!
//! [`Draft`]: crate::draft::Draft

pub mod database;
pub mod general;
pub mod helm;
pub mod job;
pub mod ports;
pub mod resources;
pub mod terraform;
pub mod variables;

pub use database::{Accessibility, DatabaseGeneral, DatabaseMode, DatabaseType};
pub use general::{
    source_kind, GitProvider, GitSource, RegistrySource, ServiceGeneral, ServiceSource, SourceKind,
};
pub use helm::{
    HelmArgument, HelmArgumentType, HelmGeneral, HelmRepositorySource, HelmSource,
    ValuesOverrideArguments, ValuesOverrideFile, ValuesOverrideFileData,
};
pub use job::{CronConfigure, DockerfileData, JobRunSettings, LifecycleConfigure, LifecycleEvent};
pub use ports::{
    declares_no_port, HealthchecksData, PortData, PortProtocol, PortsData, ProbeData, ProbeType,
};
pub use resources::{is_valid_amount, CpuUnit, MemoryUnit, ResourcesData};
pub use terraform::{
    ProviderVersion, TerraformConfiguration, TerraformGeneral, TerraformInputVariables,
    TerraformJobResources, TfVar,
};
pub use variables::{VariableData, VariableFile, VariableScope, VariablesData};
