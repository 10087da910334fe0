//! Draft to create-request assembly.

use std::collections::{HashMap, HashSet};

use tracing::debug;

use crate::args::tokenize_opt;
use crate::draft::{Draft, Section};
use crate::error::{CoreError, CoreResult};
use crate::sections::{
    declares_no_port, is_valid_amount, CronConfigure, DatabaseGeneral, DatabaseMode,
    DockerfileData, GitProvider, GitSource, HealthchecksData, HelmArgumentType, HelmGeneral,
    HelmSource, LifecycleConfigure, LifecycleEvent, PortProtocol, PortsData, ProbeData, ProbeType,
    ResourcesData, ServiceGeneral, ServiceSource, TerraformConfiguration, TerraformGeneral,
    TerraformInputVariables, ValuesOverrideArguments, ValuesOverrideFile, ValuesOverrideFileData,
    VariableData, VariableScope, VariablesData,
};
use crate::validator::split_paths;
use crate::variant::Variant;

use super::models::*;

/// Values filled in when the draft leaves a field unset.
#[derive(Debug, Clone)]
pub struct BuildDefaults {
    pub internal_port: u16,
    pub protocol: PortProtocol,
    pub timezone: String,
    pub variable_scope: VariableScope,
    /// Host overrides per git provider (self-hosted instances).
    pub git_hosts: HashMap<GitProvider, String>,
    /// Name of the raw values file sent for inline helm YAML.
    pub raw_values_name: String,
}

impl Default for BuildDefaults {
    fn default() -> Self {
        Self {
            internal_port: 80,
            protocol: PortProtocol::Http,
            timezone: "Etc/UTC".to_string(),
            variable_scope: VariableScope::Project,
            git_hosts: HashMap::new(),
            raw_values_name: "override".to_string(),
        }
    }
}

/// Clone URL for a repository on a git provider.
///
/// Full URLs (`https://`, `http://`, `git@`) pass through unchanged; an
/// `owner/name` path is joined to the provider host.
pub fn git_url(
    provider: GitProvider,
    repository: &str,
    hosts: &HashMap<GitProvider, String>,
) -> String {
    let repository = repository.trim();
    if repository.starts_with("https://")
        || repository.starts_with("http://")
        || repository.starts_with("git@")
    {
        return repository.to_string();
    }

    let host = hosts
        .get(&provider)
        .map(String::as_str)
        .unwrap_or_else(|| provider.default_host())
        .trim_end_matches('/');
    let path = repository.trim_matches('/');
    let path = path.strip_suffix(".git").unwrap_or(path);
    format!("{}/{}.git", host, path)
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

/// Refuse amounts that would silently convert to 0.
fn amount(field: &str, label: &str, value: Option<f64>) -> CoreResult<()> {
    match value {
        Some(value) if !is_valid_amount(value) => Err(CoreError::invalid_value(
            field,
            format!("{} must be a non-negative number", label),
        )),
        _ => Ok(()),
    }
}

fn arguments(field: &str, value: Option<&str>) -> CoreResult<Vec<String>> {
    tokenize_opt(value).map_err(|e| CoreError::arguments(field, e))
}

/// Pure builder turning a draft into the payload of its variant.
pub struct RequestBuilder {
    defaults: BuildDefaults,
}

impl Default for RequestBuilder {
    fn default() -> Self {
        Self::new(BuildDefaults::default())
    }
}

impl RequestBuilder {
    pub fn new(defaults: BuildDefaults) -> Self {
        Self { defaults }
    }

    pub fn defaults(&self) -> &BuildDefaults {
        &self.defaults
    }

    /// Build the create request for a variant.
    pub fn build(&self, variant: Variant, draft: &Draft) -> CoreResult<CreateRequest> {
        debug!("Building {} request", variant);
        match variant {
            Variant::ApplicationGit => self.application(draft).map(CreateRequest::Application),
            Variant::ApplicationContainer => self.container(draft).map(CreateRequest::Container),
            Variant::CronJob | Variant::LifecycleJob => {
                self.job(variant, draft).map(CreateRequest::Job)
            }
            Variant::Helm => self.helm(draft).map(CreateRequest::Helm),
            Variant::Terraform => self.terraform(draft).map(CreateRequest::Terraform),
            Variant::Database => self.database(draft).map(CreateRequest::Database),
        }
    }

    /// Bulk variable import issued after creation, if any plain variable was
    /// declared. File variables are left out, see [`Self::file_variables`].
    pub fn variable_import_request(
        &self,
        draft: &Draft,
    ) -> CoreResult<Option<VariableImportRequest>> {
        let variables = self.variables(draft)?;
        let vars: Vec<VariableImport> = variables
            .into_iter()
            .filter(|v| !v.is_file())
            .map(|v| VariableImport {
                scope: v.scope_or(self.defaults.variable_scope),
                name: v.variable,
                value: v.value,
                is_secret: v.is_secret,
            })
            .collect();
        if vars.is_empty() {
            return Ok(None);
        }
        Ok(Some(VariableImportRequest {
            overwrite: true,
            vars,
        }))
    }

    /// Variables mounted as files, each created on its own after creation.
    pub fn file_variables(&self, draft: &Draft) -> CoreResult<Vec<FileVariable>> {
        let variables = self.variables(draft)?;
        Ok(variables
            .into_iter()
            .filter_map(|v| {
                let file = v.file.clone()?;
                Some(FileVariable {
                    variable_scope: v.scope_or(self.defaults.variable_scope),
                    key: v.variable,
                    value: v.value,
                    is_secret: v.is_secret,
                    mount_path: file.path,
                    enable_interpolation_in_file: file.enable_interpolation,
                })
            })
            .collect())
    }

    /// Declared variables, refusing two that land on the same name and scope.
    fn variables(&self, draft: &Draft) -> CoreResult<Vec<VariableData>> {
        let Some(data) = draft.get_as::<VariablesData>(Section::Variables)? else {
            return Ok(Vec::new());
        };
        let mut seen = HashSet::new();
        for (index, variable) in data.variables.iter().enumerate() {
            let scope = variable.scope_or(self.defaults.variable_scope);
            if !seen.insert((variable.variable.as_str(), scope)) {
                return Err(CoreError::invalid_value(
                    format!("variables[{}].variable", index),
                    format!(
                        "{} is declared twice in scope {}",
                        variable.variable,
                        scope.as_str()
                    ),
                ));
            }
        }
        Ok(data.variables)
    }

    fn git_repository(&self, git: &GitSource) -> GitRepositoryRequest {
        GitRepositoryRequest {
            url: git_url(git.provider, &git.repository, &self.defaults.git_hosts),
            branch: git.branch.clone(),
            root_path: non_empty(git.root_path.clone()),
            git_token_id: non_empty(git.git_token_id.clone()),
        }
    }

    fn sizing(&self, resources: &ResourcesData) -> CoreResult<(u32, u32)> {
        amount("resources.cpu", "CPU", resources.cpu)?;
        amount("resources.memory", "Memory", resources.memory)?;
        let cpu = resources
            .cpu_milli()
            .ok_or_else(|| CoreError::invalid_value("resources.cpu", "CPU is required"))?;
        let memory = resources
            .memory_mb()
            .ok_or_else(|| CoreError::invalid_value("resources.memory", "Memory is required"))?;
        Ok((cpu, memory))
    }

    fn ports(&self, ports: &PortsData) -> Vec<PortRequest> {
        ports
            .ports
            .iter()
            .map(|port| {
                let internal_port = port.application_port.unwrap_or(self.defaults.internal_port);
                PortRequest {
                    name: non_empty(port.name.clone())
                        .unwrap_or_else(|| format!("p{}", internal_port)),
                    internal_port,
                    external_port: port.external_port,
                    publicly_accessible: port.is_public,
                    protocol: port.protocol.unwrap_or(self.defaults.protocol),
                }
            })
            .collect()
    }

    fn probe(
        &self,
        field: &str,
        probe: &ProbeData,
        default_port: Option<u16>,
    ) -> CoreResult<Option<Probe>> {
        let kind = match probe.probe_type {
            ProbeType::None => return Ok(None),
            ProbeType::Tcp => ProbeKind::Tcp { host: None },
            ProbeType::Http => ProbeKind::Http {
                path: probe.path.clone().unwrap_or_else(|| "/".to_string()),
                scheme: probe.scheme.clone().unwrap_or_else(|| "HTTP".to_string()),
            },
            ProbeType::Grpc => ProbeKind::Grpc {
                service: non_empty(probe.service.clone()),
            },
            ProbeType::Exec => ProbeKind::Exec {
                command: arguments(&format!("{}.command", field), probe.command.as_deref())?,
            },
        };
        let port = match probe.probe_type {
            ProbeType::Exec => None,
            _ => probe.port.or(default_port),
        };
        Ok(Some(Probe {
            kind,
            port,
            initial_delay_seconds: probe.initial_delay_seconds,
            period_seconds: probe.period_seconds,
            timeout_seconds: probe.timeout_seconds,
            success_threshold: probe.success_threshold,
            failure_threshold: probe.failure_threshold,
        }))
    }

    fn healthchecks(&self, draft: &Draft, ports: &PortsData) -> CoreResult<Healthchecks> {
        // Healthchecks of a flow that skipped the step never reach the payload.
        if declares_no_port(draft) {
            return Ok(Healthchecks::default());
        }
        let Some(checks) = draft.get_as::<HealthchecksData>(Section::Healthchecks)? else {
            return Ok(Healthchecks::default());
        };
        let default_port = ports.first_application_port();
        Ok(Healthchecks {
            readiness_probe: self.probe("healthchecks.readiness", &checks.readiness, default_port)?,
            liveness_probe: self.probe("healthchecks.liveness", &checks.liveness, default_port)?,
        })
    }

    fn application(&self, draft: &Draft) -> CoreResult<ApplicationRequest> {
        let general: ServiceGeneral = draft.require(Section::General)?;
        let ServiceSource::Git(git) = &general.source else {
            return Err(CoreError::invalid_value(
                "general.source",
                "A git application must be built from a git repository",
            ));
        };
        let resources: ResourcesData = draft.require(Section::Resources)?;
        let ports: PortsData = draft.require(Section::Ports)?;
        let (cpu, memory) = self.sizing(&resources)?;

        Ok(ApplicationRequest {
            name: general.name.clone(),
            description: general.description.clone().unwrap_or_default(),
            icon_uri: general.icon_uri.clone(),
            ports: self.ports(&ports),
            cpu,
            memory,
            min_running_instances: resources.min_running_instances,
            max_running_instances: resources.max_running_instances,
            build_mode: BuildMode::Docker,
            dockerfile_path: non_empty(git.dockerfile_path.clone()),
            git_repository: self.git_repository(git),
            arguments: arguments("general.cmd_arguments", general.cmd_arguments.as_deref())?,
            entrypoint: non_empty(general.image_entry_point.clone()),
            healthchecks: self.healthchecks(draft, &ports)?,
            auto_deploy: general.auto_deploy,
            annotations_groups: general.annotations_groups.clone(),
            labels_groups: general.labels_groups.clone(),
        })
    }

    fn container(&self, draft: &Draft) -> CoreResult<ContainerRequest> {
        let general: ServiceGeneral = draft.require(Section::General)?;
        let ServiceSource::Registry(image) = &general.source else {
            return Err(CoreError::invalid_value(
                "general.source",
                "A container must be deployed from a registry image",
            ));
        };
        let resources: ResourcesData = draft.require(Section::Resources)?;
        let ports: PortsData = draft.require(Section::Ports)?;
        let (cpu, memory) = self.sizing(&resources)?;

        Ok(ContainerRequest {
            name: general.name.clone(),
            description: general.description.clone().unwrap_or_default(),
            icon_uri: general.icon_uri.clone(),
            ports: self.ports(&ports),
            cpu,
            memory,
            min_running_instances: resources.min_running_instances,
            max_running_instances: resources.max_running_instances,
            registry_id: image.registry_id.clone(),
            image_name: image.image_name.clone(),
            tag: image.image_tag.clone(),
            arguments: arguments("general.cmd_arguments", general.cmd_arguments.as_deref())?,
            entrypoint: non_empty(general.image_entry_point.clone()),
            healthchecks: self.healthchecks(draft, &ports)?,
            auto_deploy: general.auto_deploy,
            annotations_groups: general.annotations_groups.clone(),
            labels_groups: general.labels_groups.clone(),
        })
    }

    fn job_source(&self, general: &ServiceGeneral, draft: &Draft) -> CoreResult<JobSource> {
        match &general.source {
            ServiceSource::Registry(image) => Ok(JobSource::Image(JobImageSource {
                image_name: image.image_name.clone(),
                tag: image.image_tag.clone(),
                registry_id: image.registry_id.clone(),
            })),
            ServiceSource::Git(git) => {
                let dockerfile = draft
                    .get_as::<DockerfileData>(Section::Dockerfile)?
                    .unwrap_or_default();
                let dockerfile_path = non_empty(git.dockerfile_path.clone())
                    .or_else(|| non_empty(dockerfile.dockerfile_path));
                let dockerfile_raw = non_empty(dockerfile.dockerfile_raw);
                if dockerfile_path.is_none() && dockerfile_raw.is_none() {
                    return Err(CoreError::invalid_value(
                        "dockerfile.dockerfile_path",
                        "A Dockerfile path or inline Dockerfile is required",
                    ));
                }
                Ok(JobSource::Docker(JobDockerSource {
                    git_repository: self.git_repository(git),
                    dockerfile_path,
                    dockerfile_raw,
                }))
            }
        }
    }

    fn lifecycle_hook(
        &self,
        name: &str,
        event: Option<&LifecycleEvent>,
    ) -> CoreResult<Option<LifecycleHook>> {
        let Some(event) = event.filter(|e| e.enabled) else {
            return Ok(None);
        };
        Ok(Some(LifecycleHook {
            entrypoint: non_empty(event.entrypoint.clone()),
            arguments: arguments(
                &format!("configure.{}.arguments", name),
                event.arguments.as_deref(),
            )?,
        }))
    }

    fn job(&self, variant: Variant, draft: &Draft) -> CoreResult<JobRequest> {
        let general: ServiceGeneral = draft.require(Section::General)?;
        let resources: ResourcesData = draft.require(Section::Resources)?;
        let (cpu, memory) = self.sizing(&resources)?;
        let source = self.job_source(&general, draft)?;

        let (schedule, run) = if variant == Variant::CronJob {
            let configure: CronConfigure = draft.require(Section::Configure)?;
            let schedule = JobSchedule {
                cronjob: Some(CronSchedule {
                    scheduled_at: configure.schedule.trim().to_string(),
                    timezone: non_empty(configure.timezone.clone())
                        .unwrap_or_else(|| self.defaults.timezone.clone()),
                    entrypoint: non_empty(general.image_entry_point.clone()),
                    arguments: arguments(
                        "general.cmd_arguments",
                        general.cmd_arguments.as_deref(),
                    )?,
                }),
                ..JobSchedule::default()
            };
            (schedule, configure.run)
        } else {
            let configure: LifecycleConfigure = draft.require(Section::Configure)?;
            let schedule = JobSchedule {
                cronjob: None,
                on_start: self.lifecycle_hook("on_start", configure.on_start.as_ref())?,
                on_stop: self.lifecycle_hook("on_stop", configure.on_stop.as_ref())?,
                on_delete: self.lifecycle_hook("on_delete", configure.on_delete.as_ref())?,
                lifecycle_type: non_empty(configure.lifecycle_type.clone()),
            };
            (schedule, configure.run)
        };

        Ok(JobRequest {
            name: general.name.clone(),
            description: general.description.clone().unwrap_or_default(),
            icon_uri: general.icon_uri.clone(),
            cpu,
            memory,
            max_nb_restart: run.nb_restarts.unwrap_or(0),
            max_duration_seconds: run.max_duration_seconds.unwrap_or(0),
            port: run.port,
            auto_preview: false,
            auto_deploy: general.auto_deploy,
            source,
            schedule,
            healthchecks: Healthchecks::default(),
            annotations_groups: general.annotations_groups,
            labels_groups: general.labels_groups,
        })
    }

    fn helm(&self, draft: &Draft) -> CoreResult<HelmRequest> {
        let general: HelmGeneral = draft.require(Section::General)?;
        let values_file: ValuesOverrideFile = draft.require(Section::ValuesOverrideFile)?;
        let values_arguments: ValuesOverrideArguments =
            draft.require(Section::ValuesOverrideArguments)?;

        let source = match &general.source {
            HelmSource::Git(git) => HelmSourceRequest::GitRepository(self.git_repository(git)),
            HelmSource::HelmRepository(repo) => {
                HelmSourceRequest::HelmRepository(HelmRepositoryRequest {
                    repository: repo.repository.clone(),
                    chart_name: repo.chart_name.clone(),
                    chart_version: repo.chart_version.clone(),
                })
            }
        };

        let file = match &values_file.file {
            ValuesOverrideFileData::GitRepository {
                provider,
                repository,
                branch,
                git_token_id,
                paths,
            } => Some(HelmValuesFile::Git {
                git_repository: GitRepositoryRequest {
                    url: git_url(*provider, repository, &self.defaults.git_hosts),
                    branch: branch.clone(),
                    root_path: None,
                    git_token_id: non_empty(git_token_id.clone()),
                },
                paths: split_paths(paths),
            }),
            ValuesOverrideFileData::Yaml { content } => Some(HelmValuesFile::Raw {
                values: vec![RawValues {
                    name: self.defaults.raw_values_name.clone(),
                    content: content.clone(),
                }],
            }),
            ValuesOverrideFileData::None => None,
        };

        let by_type = |kind: HelmArgumentType| -> Vec<(String, String)> {
            values_arguments
                .arguments
                .iter()
                .filter(|a| a.kind == kind)
                .map(|a| (a.key.clone(), a.effective_value().to_string()))
                .collect()
        };

        Ok(HelmRequest {
            name: general.name.clone(),
            description: general.description.clone().unwrap_or_default(),
            icon_uri: general.icon_uri.clone(),
            source,
            allow_cluster_wide_resources: general.allow_cluster_wide_resources,
            arguments: arguments("general.arguments", general.arguments.as_deref())?,
            timeout_sec: general.timeout_sec,
            auto_deploy: general.auto_deploy || values_file.auto_deploy.unwrap_or(false),
            values_override: HelmValuesOverride {
                set: by_type(HelmArgumentType::Set),
                set_string: by_type(HelmArgumentType::SetString),
                set_json: by_type(HelmArgumentType::SetJson),
                file,
            },
        })
    }

    fn terraform(&self, draft: &Draft) -> CoreResult<TerraformRequest> {
        let general: TerraformGeneral = draft.require(Section::General)?;
        let configuration: TerraformConfiguration = draft.require(Section::Configuration)?;
        let inputs: TerraformInputVariables = draft.require(Section::InputVariables)?;

        let resources = &configuration.job_resources;
        amount("configuration.job_resources.cpu", "CPU", Some(resources.cpu))?;
        amount("configuration.job_resources.memory", "Memory", Some(resources.memory))?;
        Ok(TerraformRequest {
            name: general.name.clone(),
            description: general.description.clone().unwrap_or_default(),
            icon_uri: general.icon_uri.clone(),
            timeout_sec: general.timeout_sec,
            auto_deploy: general.auto_deploy,
            auto_approve: false,
            provider: TerraformEngine::Terraform,
            terraform_files_source: TerraformFilesSource {
                git_repository: GitRepositoryRequest {
                    url: git_url(general.provider, &general.repository, &self.defaults.git_hosts),
                    branch: general.branch.clone(),
                    root_path: non_empty(general.root_path.clone()),
                    git_token_id: non_empty(general.git_token_id.clone()),
                },
            },
            terraform_variables_source: TerraformVariablesSource {
                tf_var_file_paths: inputs.tf_var_file_paths,
                tf_vars: inputs.tf_vars,
            },
            provider_version: configuration.provider_version.clone(),
            job_resources: TerraformJobResourcesRequest {
                cpu_milli: resources.cpu_unit.to_milli(resources.cpu),
                ram_mib: resources.memory_unit.to_mb(resources.memory),
                storage_gib: resources.storage_gib,
            },
            use_cluster_credentials: configuration.use_cluster_credentials,
        })
    }

    fn database(&self, draft: &Draft) -> CoreResult<DatabaseRequest> {
        let general: DatabaseGeneral = draft.require(Section::General)?;
        let resources: ResourcesData = draft.require(Section::Resources)?;

        let (cpu, memory, instance_type) = match general.mode {
            DatabaseMode::Managed => {
                let instance_type = non_empty(resources.instance_type.clone()).ok_or_else(|| {
                    CoreError::invalid_value(
                        "resources.instance_type",
                        "Managed databases require an instance type",
                    )
                })?;
                (None, None, Some(instance_type))
            }
            DatabaseMode::Container => {
                let (cpu, memory) = self.sizing(&resources)?;
                (Some(cpu), Some(memory), None)
            }
        };

        Ok(DatabaseRequest {
            name: general.name,
            description: general.description.unwrap_or_default(),
            icon_uri: general.icon_uri,
            database_type: general.database_type,
            version: general.version,
            mode: general.mode,
            accessibility: general.accessibility,
            cpu,
            memory,
            storage: resources.storage,
            instance_type,
            annotations_groups: general.annotations_groups,
            labels_groups: general.labels_groups,
        })
    }
}

/// Build a request with default settings.
pub fn build(variant: Variant, draft: &Draft) -> CoreResult<CreateRequest> {
    RequestBuilder::default().build(variant, draft)
}

/// Variable import payload with default settings.
pub fn variable_import_request(draft: &Draft) -> CoreResult<Option<VariableImportRequest>> {
    RequestBuilder::default().variable_import_request(draft)
}

/// File variables with default settings.
pub fn file_variables(draft: &Draft) -> CoreResult<Vec<FileVariable>> {
    RequestBuilder::default().file_variables(draft)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::args::ArgumentParseError;
    use serde_json::json;

    fn set(draft: &mut Draft, section: Section, value: serde_json::Value) {
        draft.set_value(section, value);
    }

    fn application_draft(source: serde_json::Value) -> Draft {
        let mut draft = Draft::new();
        set(
            &mut draft,
            Section::General,
            json!({"name": "api", "source": source, "cmd_arguments": "-a --flag value"}),
        );
        set(
            &mut draft,
            Section::Resources,
            json!({"cpu": 0.5, "cpu_unit": "CORES", "memory": 2, "memory_unit": "GB",
                   "min_running_instances": 1, "max_running_instances": 2}),
        );
        set(
            &mut draft,
            Section::Ports,
            json!({"ports": [{"application_port": 8080, "external_port": 443, "is_public": true}]}),
        );
        set(
            &mut draft,
            Section::Healthchecks,
            json!({"readiness": {"probe_type": "HTTP", "path": "/ready"}}),
        );
        draft
    }

    fn git_source() -> serde_json::Value {
        json!({
            "source_provider": "GIT",
            "provider": "GITHUB",
            "repository": "acme/api",
            "branch": "main"
        })
    }

    fn registry_source() -> serde_json::Value {
        json!({
            "source_provider": "REGISTRY",
            "registry_id": "reg-1",
            "image_name": "nginx",
            "image_tag": "1.27"
        })
    }

    #[test]
    fn test_git_url() {
        let hosts = HashMap::new();
        assert_eq!(
            git_url(GitProvider::Github, "acme/api", &hosts),
            "https://github.com/acme/api.git"
        );
        assert_eq!(
            git_url(GitProvider::Gitlab, "/group/sub/repo.git", &hosts),
            "https://gitlab.com/group/sub/repo.git"
        );
        assert_eq!(
            git_url(GitProvider::Github, "https://example.com/x/y.git", &hosts),
            "https://example.com/x/y.git"
        );

        let mut hosts = HashMap::new();
        hosts.insert(GitProvider::Gitlab, "https://git.internal/".to_string());
        assert_eq!(
            git_url(GitProvider::Gitlab, "team/app", &hosts),
            "https://git.internal/team/app.git"
        );
    }

    #[test]
    fn test_application_git_payload() {
        let draft = application_draft(git_source());
        let CreateRequest::Application(request) = build(Variant::ApplicationGit, &draft).unwrap()
        else {
            panic!("expected an application request");
        };

        assert_eq!(request.cpu, 500);
        assert_eq!(request.memory, 2048);
        assert_eq!(request.arguments, vec!["-a", "--flag", "value"]);
        assert_eq!(request.git_repository.url, "https://github.com/acme/api.git");
        assert_eq!(request.ports[0].name, "p8080");
        assert_eq!(request.ports[0].protocol, PortProtocol::Http);

        let readiness = request.healthchecks.readiness_probe.unwrap();
        assert_eq!(readiness.port, Some(8080));
        assert!(request.healthchecks.liveness_probe.is_none());
    }

    #[test]
    fn test_source_exclusivity() {
        let git = build(Variant::ApplicationGit, &application_draft(git_source())).unwrap();
        let value = serde_json::to_value(&git).unwrap();
        assert!(value.get("git_repository").is_some());
        assert!(value.get("registry_id").is_none());
        assert!(value.get("image_name").is_none());

        let container =
            build(Variant::ApplicationContainer, &application_draft(registry_source())).unwrap();
        let value = serde_json::to_value(&container).unwrap();
        assert!(value.get("git_repository").is_none());
        assert_eq!(value["registry_id"], "reg-1");
        assert_eq!(value["tag"], "1.27");
        assert_eq!(value["serviceType"], "CONTAINER");
    }

    #[test]
    fn test_negative_amounts_are_not_clamped() {
        let mut draft = application_draft(git_source());
        set(
            &mut draft,
            Section::Resources,
            json!({"cpu": -1, "memory": 512, "min_running_instances": 1,
                   "max_running_instances": 1}),
        );
        let err = build(Variant::ApplicationGit, &draft).unwrap_err();
        assert!(matches!(
            err,
            CoreError::InvalidValue { ref field, .. } if field == "resources.cpu"
        ));
    }

    #[test]
    fn test_mismatched_source_is_rejected() {
        let draft = application_draft(registry_source());
        assert!(matches!(
            build(Variant::ApplicationGit, &draft),
            Err(CoreError::InvalidValue { .. })
        ));
    }

    #[test]
    fn test_build_is_deterministic() {
        let draft = application_draft(git_source());
        let first = serde_json::to_vec(&build(Variant::ApplicationGit, &draft).unwrap()).unwrap();
        let second = serde_json::to_vec(&build(Variant::ApplicationGit, &draft).unwrap()).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_argument_parse_error_names_field() {
        let mut draft = application_draft(git_source());
        set(
            &mut draft,
            Section::General,
            json!({"name": "api", "source": git_source(), "cmd_arguments": "run \"unterminated"}),
        );

        match build(Variant::ApplicationGit, &draft) {
            Err(CoreError::Arguments { field, source }) => {
                assert_eq!(field, "general.cmd_arguments");
                assert_eq!(
                    source,
                    ArgumentParseError::UnterminatedQuote { quote: '"', offset: 4 }
                );
            }
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[test]
    fn test_healthchecks_dropped_when_no_port() {
        let mut draft = application_draft(git_source());
        set(&mut draft, Section::Ports, json!({"ports": []}));

        let CreateRequest::Application(request) = build(Variant::ApplicationGit, &draft).unwrap()
        else {
            panic!("expected an application request");
        };
        assert!(request.ports.is_empty());
        assert_eq!(request.healthchecks, Healthchecks::default());
    }

    #[test]
    fn test_lifecycle_job_keeps_only_enabled_hooks() {
        let mut draft = Draft::new();
        set(
            &mut draft,
            Section::General,
            json!({"name": "seed", "source": registry_source()}),
        );
        set(&mut draft, Section::Resources, json!({"cpu": 250, "memory": 512}));
        set(
            &mut draft,
            Section::Configure,
            json!({
                "on_start": {"enabled": true, "arguments": "[\"seed\", \"--all\"]"},
                "on_stop": {"enabled": false, "arguments": "stop"},
                "on_delete": {"enabled": false}
            }),
        );

        let request = build(Variant::LifecycleJob, &draft).unwrap();
        let value = serde_json::to_value(&request).unwrap();
        let schedule = value["schedule"].as_object().unwrap();
        assert_eq!(schedule.keys().collect::<Vec<_>>(), vec!["on_start"]);
        assert_eq!(value["schedule"]["on_start"]["arguments"], json!(["seed", "--all"]));
        assert_eq!(value["source"]["image"]["image_name"], "nginx");
        assert!(value["source"].get("docker").is_none());
        assert_eq!(value["memory"], 512);
    }

    #[test]
    fn test_cron_job_from_git() {
        let mut draft = Draft::new();
        set(
            &mut draft,
            Section::General,
            json!({"name": "nightly", "source": git_source(), "cmd_arguments": "backup --full"}),
        );
        set(&mut draft, Section::Dockerfile, json!({"dockerfile_path": "Dockerfile.cron"}));
        set(
            &mut draft,
            Section::Configure,
            json!({"schedule": "0 3 * * *", "max_duration_seconds": 600}),
        );
        set(
            &mut draft,
            Section::Resources,
            json!({"cpu": 1, "cpu_unit": "CORES", "memory": 1, "memory_unit": "GB"}),
        );

        let CreateRequest::Job(job) = build(Variant::CronJob, &draft).unwrap() else {
            panic!("expected a job request");
        };
        let cron = job.schedule.cronjob.unwrap();
        assert_eq!(cron.scheduled_at, "0 3 * * *");
        assert_eq!(cron.timezone, "Etc/UTC");
        assert_eq!(cron.arguments, vec!["backup", "--full"]);
        assert_eq!(job.max_duration_seconds, 600);
        assert_eq!(job.cpu, 1000);
        assert_eq!(job.memory, 1024);
        match job.source {
            JobSource::Docker(docker) => {
                assert_eq!(docker.dockerfile_path.as_deref(), Some("Dockerfile.cron"));
                assert_eq!(docker.git_repository.branch, "main");
            }
            JobSource::Image(_) => panic!("expected a docker source"),
        }
    }

    #[test]
    fn test_helm_payload() {
        let mut draft = Draft::new();
        set(
            &mut draft,
            Section::General,
            json!({"name": "redis", "arguments": "--wait --atomic", "source": {
                "source_provider": "HELM_REPOSITORY", "repository": "repo-1",
                "chart_name": "redis", "chart_version": "18.0.0"}}),
        );
        set(
            &mut draft,
            Section::ValuesOverrideFile,
            json!({"type": "YAML", "content": "replicas: 2", "auto_deploy": true}),
        );
        set(
            &mut draft,
            Section::ValuesOverrideArguments,
            json!({"arguments": [
                {"type": "--set", "key": "a", "value": "1"},
                {"type": "--set-json", "key": "b", "value": "", "json": "{\"x\":1}"},
                {"type": "--set", "key": "c", "value": "3"}
            ]}),
        );

        let CreateRequest::Helm(helm) = build(Variant::Helm, &draft).unwrap() else {
            panic!("expected a helm request");
        };
        assert!(helm.auto_deploy);
        assert_eq!(helm.arguments, vec!["--wait", "--atomic"]);
        assert_eq!(
            helm.values_override.set,
            vec![("a".to_string(), "1".to_string()), ("c".to_string(), "3".to_string())]
        );
        assert_eq!(
            helm.values_override.set_json,
            vec![("b".to_string(), "{\"x\":1}".to_string())]
        );
        assert!(helm.values_override.set_string.is_empty());
        assert!(matches!(helm.values_override.file, Some(HelmValuesFile::Raw { .. })));
        assert!(matches!(helm.source, HelmSourceRequest::HelmRepository(_)));
    }

    #[test]
    fn test_terraform_payload() {
        let mut draft = Draft::new();
        set(
            &mut draft,
            Section::General,
            json!({
                "name": "infra",
                "provider": "GITLAB",
                "repository": "ops/infra",
                "branch": "main"
            }),
        );
        set(
            &mut draft,
            Section::Configuration,
            json!({"job_resources": {
                "cpu": 0.5,
                "cpu_unit": "CORES",
                "memory": 1,
                "memory_unit": "GB"
            }}),
        );
        set(
            &mut draft,
            Section::InputVariables,
            json!({"tf_vars": [{"key": "region", "value": "eu-west-3"}]}),
        );

        let CreateRequest::Terraform(tf) = build(Variant::Terraform, &draft).unwrap() else {
            panic!("expected a terraform request");
        };
        assert!(!tf.auto_approve);
        assert_eq!(tf.job_resources.cpu_milli, 500);
        assert_eq!(tf.job_resources.ram_mib, 1024);
        assert_eq!(tf.job_resources.storage_gib, 1);
        assert_eq!(tf.timeout_sec, 1800);
        assert_eq!(
            tf.terraform_files_source.git_repository.url,
            "https://gitlab.com/ops/infra.git"
        );
        assert!(tf.provider_version.read_from_terraform_block);
    }

    #[test]
    fn test_database_payload_by_mode() {
        let general = |mode: &str| {
            json!({"name": "db", "type": "POSTGRESQL", "version": "16", "mode": mode})
        };

        let mut managed = Draft::new();
        set(&mut managed, Section::General, general("MANAGED"));
        set(
            &mut managed,
            Section::Resources,
            json!({"instance_type": "db.t3.micro", "storage": 10, "cpu": 500}),
        );
        let value = serde_json::to_value(build(Variant::Database, &managed).unwrap()).unwrap();
        assert_eq!(value["instance_type"], "db.t3.micro");
        assert!(value.get("cpu").is_none());
        assert_eq!(value["storage"], 10);

        let mut container = Draft::new();
        set(&mut container, Section::General, general("CONTAINER"));
        set(
            &mut container,
            Section::Resources,
            json!({"storage": 10, "cpu": 500, "memory": 1, "memory_unit": "GB"}),
        );
        let value = serde_json::to_value(build(Variant::Database, &container).unwrap()).unwrap();
        assert!(value.get("instance_type").is_none());
        assert_eq!(value["memory"], 1024);
    }

    #[test]
    fn test_variable_import_request() {
        let mut draft = Draft::new();
        assert!(variable_import_request(&draft).unwrap().is_none());

        set(&mut draft, Section::Variables, json!({"variables": []}));
        assert!(variable_import_request(&draft).unwrap().is_none());

        set(
            &mut draft,
            Section::Variables,
            json!({"variables": [
                {"variable": "A", "value": "1"},
                {"variable": "B", "value": "2", "isSecret": true, "scope": "ENVIRONMENT"}
            ]}),
        );
        let request = variable_import_request(&draft).unwrap().unwrap();
        assert!(request.overwrite);
        assert_eq!(request.vars[0].scope, VariableScope::Project);
        assert!(request.vars[1].is_secret);
        assert_eq!(request.vars[1].scope, VariableScope::Environment);
    }

    #[test]
    fn test_file_variables_leave_bulk_import() {
        let mut draft = Draft::new();
        set(
            &mut draft,
            Section::Variables,
            json!({"variables": [
                {"variable": "A", "value": "1"},
                {
                    "variable": "CONFIG",
                    "value": "port: 80",
                    "scope": "JOB",
                    "file": {"path": "/etc/app/config.yaml", "enable_interpolation": true}
                }
            ]}),
        );

        let request = variable_import_request(&draft).unwrap().unwrap();
        assert_eq!(request.vars.len(), 1);
        assert_eq!(request.vars[0].name, "A");

        let files = file_variables(&draft).unwrap();
        assert_eq!(files.len(), 1);
        assert_eq!(files[0].key, "CONFIG");
        assert_eq!(files[0].variable_scope, VariableScope::Job);
        assert_eq!(files[0].mount_path, "/etc/app/config.yaml");
        assert!(files[0].enable_interpolation_in_file);

        let request = files[0].with_parent("svc-1");
        assert_eq!(request.variable_parent_id, "svc-1");
    }

    #[test]
    fn test_only_file_variables_skip_bulk_import() {
        let mut draft = Draft::new();
        set(
            &mut draft,
            Section::Variables,
            json!({"variables": [
                {"variable": "CERT", "value": "---", "file": {"path": "/certs/ca.pem"}}
            ]}),
        );
        assert!(variable_import_request(&draft).unwrap().is_none());
        let files = file_variables(&draft).unwrap();
        assert_eq!(files[0].variable_scope, VariableScope::Project);
        assert!(!files[0].enable_interpolation_in_file);
    }

    #[test]
    fn test_default_scope_collision_is_refused() {
        let mut draft = Draft::new();
        set(
            &mut draft,
            Section::Variables,
            json!({"variables": [
                {"variable": "A", "value": "1"},
                {"variable": "A", "value": "2", "scope": "PROJECT"}
            ]}),
        );
        let err = variable_import_request(&draft).unwrap_err();
        assert!(matches!(
            err,
            CoreError::InvalidValue { ref field, .. } if field == "variables[1].variable"
        ));

        // With another default scope the two no longer collide.
        let builder = RequestBuilder::new(BuildDefaults {
            variable_scope: VariableScope::Environment,
            ..BuildDefaults::default()
        });
        let request = builder.variable_import_request(&draft).unwrap().unwrap();
        assert_eq!(request.vars[0].scope, VariableScope::Environment);
        assert_eq!(request.vars[1].scope, VariableScope::Project);
    }
}
