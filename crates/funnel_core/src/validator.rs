//! Per-step validation over the draft.
//!
//! Validators are pure: they decode the sections a step reads, check them
//! and report every problem found with the field path it belongs to. They
//! never write to the draft. A step may only be left forward when its
//! result is valid.

use std::collections::HashSet;
use std::sync::LazyLock;

use regex::Regex;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::args::tokenize;
use crate::draft::{Draft, Section};
use crate::error::CoreError;
use crate::request;
use crate::sections::{
    CronConfigure, DatabaseGeneral, DatabaseMode, DockerfileData, GitSource, HealthchecksData,
    HelmArgumentType, HelmGeneral, HelmSource, LifecycleConfigure, PortsData, ProbeData,
    ProbeType, RegistrySource, ResourcesData, ServiceGeneral, ServiceSource,
    TerraformConfiguration, TerraformGeneral, TerraformInputVariables, ValuesOverrideArguments,
    ValuesOverrideFile, ValuesOverrideFileData, VariableScope, VariablesData,
};
use crate::step::StepId;
use crate::variant::Variant;

static VARIABLE_NAME: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*$").ok());

static CRON_FIELD: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"^[0-9A-Za-z*?/,#LW-]+$").ok());

static SERVICE_NAME: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z0-9][A-Za-z0-9 ._-]*$").ok());

const CRON_MACROS: [&str; 7] = [
    "@yearly",
    "@annually",
    "@monthly",
    "@weekly",
    "@daily",
    "@midnight",
    "@hourly",
];

fn re_match(re: &LazyLock<Option<Regex>>, value: &str) -> bool {
    re.as_ref().is_some_and(|re| re.is_match(value))
}

/// Whether a string is a five-field cron expression or a supported macro.
pub fn is_valid_cron(expression: &str) -> bool {
    let expression = expression.trim();
    if expression.starts_with('@') {
        return CRON_MACROS.contains(&expression);
    }
    let fields: Vec<&str> = expression.split_whitespace().collect();
    fields.len() == 5 && fields.iter().all(|f| re_match(&CRON_FIELD, f))
}

/// Whether a string is usable as an environment variable name.
pub fn is_valid_variable_name(name: &str) -> bool {
    re_match(&VARIABLE_NAME, name)
}

/// One problem found in a step, attached to a field path.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldError {
    pub field: String,
    pub message: String,
}

impl std::fmt::Display for FieldError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

/// Validation result with details.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidationResult {
    pub valid: bool,
    pub errors: Vec<FieldError>,
    pub warnings: Vec<String>,
}

impl Default for ValidationResult {
    fn default() -> Self {
        Self::new()
    }
}

impl ValidationResult {
    pub fn new() -> Self {
        Self {
            valid: true,
            errors: Vec::new(),
            warnings: Vec::new(),
        }
    }

    pub fn add_error(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.valid = false;
        self.errors.push(FieldError {
            field: field.into(),
            message: message.into(),
        });
    }

    pub fn add_warning(&mut self, message: impl Into<String>) {
        self.warnings.push(message.into());
    }

    pub fn merge(&mut self, other: ValidationResult) {
        if !other.valid {
            self.valid = false;
        }
        self.errors.extend(other.errors);
        self.warnings.extend(other.warnings);
    }

    /// Errors on a given field path.
    pub fn errors_for<'a>(&'a self, field: &'a str) -> impl Iterator<Item = &'a FieldError> + 'a {
        self.errors.iter().filter(move |e| e.field == field)
    }

    pub fn has_error_on(&self, field: &str) -> bool {
        self.errors_for(field).next().is_some()
    }

    /// Error messages as `field: message` lines.
    pub fn messages(&self) -> Vec<String> {
        self.errors.iter().map(ToString::to_string).collect()
    }

    fn require_text(&mut self, field: &str, value: &str, label: &str) {
        if value.trim().is_empty() {
            self.add_error(field, format!("{} is required", label));
        }
    }

    fn require_arguments(&mut self, field: &str, value: Option<&str>) {
        if let Some(value) = value {
            if let Err(e) = tokenize(value) {
                self.add_error(field, e.to_string());
            }
        }
    }
}

/// Decode a section, recording missing or malformed data as an error.
fn section<T: DeserializeOwned>(
    draft: &Draft,
    section: Section,
    result: &mut ValidationResult,
) -> Option<T> {
    match draft.get_as::<T>(section) {
        Ok(Some(value)) => Some(value),
        Ok(None) => {
            result.add_error(section.as_str(), "Section is required");
            None
        }
        Err(e) => {
            result.add_error(section.as_str(), e.to_string());
            None
        }
    }
}

/// Validator for wizard steps.
pub struct StepValidator;

impl StepValidator {
    /// Validate the data a step owns for the given variant.
    pub fn validate_step(variant: Variant, step: StepId, draft: &Draft) -> ValidationResult {
        match step {
            StepId::General => Self::validate_general(variant, draft),
            StepId::Dockerfile => Self::validate_dockerfile(draft),
            StepId::Configure => Self::validate_configure(variant, draft),
            StepId::Resources => Self::validate_resources(variant, draft),
            StepId::Ports => Self::validate_ports(draft),
            StepId::Healthchecks => Self::validate_healthchecks(draft),
            StepId::Variables => Self::validate_variables(draft),
            StepId::ValuesOverrideFile => Self::validate_values_override_file(draft),
            StepId::ValuesOverrideArguments => Self::validate_values_override_arguments(draft),
            StepId::Configuration => Self::validate_terraform_configuration(draft),
            StepId::InputVariables => Self::validate_input_variables(draft),
            StepId::Summary => Self::validate_summary(variant, draft),
        }
    }

    pub fn is_complete(variant: Variant, step: StepId, draft: &Draft) -> bool {
        Self::validate_step(variant, step, draft).valid
    }

    /// Validate the general step.
    pub fn validate_general(variant: Variant, draft: &Draft) -> ValidationResult {
        let mut result = ValidationResult::new();
        match variant {
            Variant::ApplicationGit
            | Variant::ApplicationContainer
            | Variant::CronJob
            | Variant::LifecycleJob => {
                let general = section::<ServiceGeneral>(draft, Section::General, &mut result);
                if let Some(general) = general {
                    Self::check_service_general(variant, &general, &mut result);
                }
            }
            Variant::Helm => {
                let general = section::<HelmGeneral>(draft, Section::General, &mut result);
                if let Some(general) = general {
                    check_name(&general.name, &mut result);
                    match &general.source {
                        HelmSource::Git(git) => check_git(git, "general.source", &mut result),
                        HelmSource::HelmRepository(repo) => {
                            result.require_text(
                                "general.source.repository",
                                &repo.repository,
                                "Helm repository",
                            );
                            result.require_text(
                                "general.source.chart_name",
                                &repo.chart_name,
                                "Chart name",
                            );
                            result.require_text(
                                "general.source.chart_version",
                                &repo.chart_version,
                                "Chart version",
                            );
                        }
                    }
                    result.require_arguments("general.arguments", general.arguments.as_deref());
                    if general.timeout_sec == 0 {
                        result.add_error("general.timeout_sec", "Timeout must be greater than 0");
                    }
                }
            }
            Variant::Terraform => {
                if let Some(general) =
                    section::<TerraformGeneral>(draft, Section::General, &mut result)
                {
                    check_name(&general.name, &mut result);
                    result.require_text("general.repository", &general.repository, "Repository");
                    result.require_text("general.branch", &general.branch, "Branch");
                    if general.timeout_sec == 0 {
                        result.add_error("general.timeout_sec", "Timeout must be greater than 0");
                    }
                }
            }
            Variant::Database => {
                if let Some(general) =
                    section::<DatabaseGeneral>(draft, Section::General, &mut result)
                {
                    check_name(&general.name, &mut result);
                    result.require_text("general.version", &general.version, "Version");
                }
            }
        }
        result
    }

    fn check_service_general(
        variant: Variant,
        general: &ServiceGeneral,
        result: &mut ValidationResult,
    ) {
        check_name(&general.name, result);

        match (&general.source, variant) {
            (ServiceSource::Registry(_), Variant::ApplicationGit) => {
                result.add_error(
                    "general.source.source_provider",
                    "A git application must be built from a git repository",
                );
            }
            (ServiceSource::Git(_), Variant::ApplicationContainer) => {
                result.add_error(
                    "general.source.source_provider",
                    "A container must be deployed from a registry image",
                );
            }
            (ServiceSource::Git(git), _) => check_git(git, "general.source", result),
            (ServiceSource::Registry(registry), _) => check_registry(registry, result),
        }

        result.require_arguments("general.cmd_arguments", general.cmd_arguments.as_deref());
    }

    /// Validate the dockerfile step of git-sourced jobs.
    pub fn validate_dockerfile(draft: &Draft) -> ValidationResult {
        let mut result = ValidationResult::new();
        if let Some(dockerfile) = section::<DockerfileData>(draft, Section::Dockerfile, &mut result)
        {
            let has_path = dockerfile
                .dockerfile_path
                .as_deref()
                .is_some_and(|p| !p.trim().is_empty());
            let has_raw = dockerfile
                .dockerfile_raw
                .as_deref()
                .is_some_and(|r| !r.trim().is_empty());
            if !has_path && !has_raw {
                result.add_error(
                    "dockerfile.dockerfile_path",
                    "A Dockerfile path or inline Dockerfile is required",
                );
            }
            if has_path && has_raw {
                result.add_warning("Inline Dockerfile takes precedence over the Dockerfile path");
            }
        }
        result
    }

    /// Validate the configure step of cron and lifecycle jobs.
    pub fn validate_configure(variant: Variant, draft: &Draft) -> ValidationResult {
        let mut result = ValidationResult::new();
        match variant {
            Variant::CronJob => {
                if let Some(configure) =
                    section::<CronConfigure>(draft, Section::Configure, &mut result)
                {
                    if configure.schedule.trim().is_empty() {
                        result.add_error("configure.schedule", "Schedule is required");
                    } else if !is_valid_cron(&configure.schedule) {
                        result.add_error("configure.schedule", "Invalid cron expression");
                    }
                    if configure.timezone.is_none() {
                        result.add_warning("No timezone set, schedule runs in UTC");
                    }
                    check_run_settings(configure.run.max_duration_seconds, &mut result);
                }
            }
            Variant::LifecycleJob => {
                if let Some(configure) =
                    section::<LifecycleConfigure>(draft, Section::Configure, &mut result)
                {
                    if !configure.any_enabled() {
                        result.add_error(
                            "configure",
                            "At least one lifecycle event must be enabled",
                        );
                    }
                    for (name, event) in configure.events() {
                        if let Some(event) = event.filter(|e| e.enabled) {
                            result.require_arguments(
                                &format!("configure.{}.arguments", name),
                                event.arguments.as_deref(),
                            );
                        }
                    }
                    check_run_settings(configure.run.max_duration_seconds, &mut result);
                }
            }
            other => {
                result.add_error("configure", format!("{} has no configure step", other));
            }
        }
        result
    }

    /// Validate the resources step.
    pub fn validate_resources(variant: Variant, draft: &Draft) -> ValidationResult {
        let mut result = ValidationResult::new();
        let Some(resources) = section::<ResourcesData>(draft, Section::Resources, &mut result)
        else {
            return result;
        };

        if variant == Variant::Database {
            let Some(general) = section::<DatabaseGeneral>(draft, Section::General, &mut result)
            else {
                return result;
            };
            match general.mode {
                DatabaseMode::Managed => {
                    if resources
                        .instance_type
                        .as_deref()
                        .map_or(true, |t| t.trim().is_empty())
                    {
                        result.add_error(
                            "resources.instance_type",
                            "Managed databases require an instance type",
                        );
                    }
                }
                DatabaseMode::Container => check_cpu_memory(&resources, &mut result),
            }
            if resources.storage.map_or(true, |s| s == 0) {
                result.add_error("resources.storage", "Storage must be at least 1 GB");
            }
            return result;
        }

        check_cpu_memory(&resources, &mut result);
        if resources.max_running_instances == 0 {
            result.add_error(
                "resources.max_running_instances",
                "Maximum instances must be at least 1",
            );
        }
        if resources.min_running_instances > resources.max_running_instances {
            result.add_error(
                "resources.min_running_instances",
                "Minimum instances cannot exceed maximum instances",
            );
        }
        result
    }

    /// Validate the ports step.
    pub fn validate_ports(draft: &Draft) -> ValidationResult {
        let mut result = ValidationResult::new();
        let Some(ports) = section::<PortsData>(draft, Section::Ports, &mut result) else {
            return result;
        };

        let mut seen_ports = HashSet::new();
        let mut seen_names = HashSet::new();
        for (index, port) in ports.ports.iter().enumerate() {
            let path = format!("ports[{}]", index);
            match port.application_port {
                None | Some(0) => {
                    result.add_error(
                        format!("{}.application_port", path),
                        "Application port is required",
                    );
                }
                Some(number) => {
                    if !seen_ports.insert(number) {
                        result.add_error(
                            format!("{}.application_port", path),
                            format!("Port {} is declared twice", number),
                        );
                    }
                }
            }
            if port.is_public && port.external_port.map_or(true, |p| p == 0) {
                result.add_error(
                    format!("{}.external_port", path),
                    "Public ports require an external port",
                );
            }
            if let Some(name) = port.name.as_deref().filter(|n| !n.is_empty()) {
                if !seen_names.insert(name.to_string()) {
                    result.add_error(
                        format!("{}.name", path),
                        format!("Port name {} is used twice", name),
                    );
                }
            }
        }
        result
    }

    /// Validate the healthchecks step.
    pub fn validate_healthchecks(draft: &Draft) -> ValidationResult {
        let mut result = ValidationResult::new();
        let ports = section::<PortsData>(draft, Section::Ports, &mut result);
        let Some(checks) = section::<HealthchecksData>(draft, Section::Healthchecks, &mut result)
        else {
            return result;
        };
        let default_port = ports.as_ref().and_then(PortsData::first_application_port);

        check_probe("healthchecks.readiness", &checks.readiness, default_port, &mut result);
        check_probe("healthchecks.liveness", &checks.liveness, default_port, &mut result);
        if checks.liveness.is_enabled() && checks.liveness.success_threshold != 1 {
            result.add_error(
                "healthchecks.liveness.success_threshold",
                "Liveness success threshold must be 1",
            );
        }
        if !checks.liveness.is_enabled() {
            result.add_warning("No liveness probe configured");
        }
        result
    }

    /// Validate the variables step.
    pub fn validate_variables(draft: &Draft) -> ValidationResult {
        let mut result = ValidationResult::new();
        let Some(data) = section::<VariablesData>(draft, Section::Variables, &mut result) else {
            return result;
        };

        let mut seen = HashSet::new();
        for (index, variable) in data.variables.iter().enumerate() {
            let field = format!("variables[{}].variable", index);
            if variable.variable.is_empty() {
                result.add_error(field, "Variable name is required");
                continue;
            }
            if !is_valid_variable_name(&variable.variable) {
                result.add_error(
                    field.clone(),
                    format!(
                        "{} must start with a letter or underscore and contain only \
                         letters, digits and underscores",
                        variable.variable
                    ),
                );
            }
            // A missing scope is imported in the default one.
            let scope = variable.scope_or(VariableScope::default());
            if !seen.insert((variable.variable.clone(), scope)) {
                result.add_error(field, format!("{} is declared twice", variable.variable));
            }
            if let Some(file) = &variable.file {
                let path_field = format!("variables[{}].file.path", index);
                if file.path.trim().is_empty() {
                    result.add_error(path_field, "File path is required");
                } else if !file.path.starts_with('/') || file.path.contains(char::is_whitespace) {
                    result.add_error(
                        path_field,
                        format!("{} must be an absolute path without spaces", file.path),
                    );
                }
            }
        }
        result
    }

    /// Validate the helm values file step.
    pub fn validate_values_override_file(draft: &Draft) -> ValidationResult {
        let mut result = ValidationResult::new();
        let Some(values) =
            section::<ValuesOverrideFile>(draft, Section::ValuesOverrideFile, &mut result)
        else {
            return result;
        };

        match &values.file {
            ValuesOverrideFileData::GitRepository {
                repository,
                branch,
                paths,
                ..
            } => {
                result.require_text("values_override_file.repository", repository, "Repository");
                result.require_text("values_override_file.branch", branch, "Branch");
                if split_paths(paths).is_empty() {
                    result.add_error(
                        "values_override_file.paths",
                        "At least one values file path is required",
                    );
                }
            }
            ValuesOverrideFileData::Yaml { content } => {
                if content.trim().is_empty() {
                    result.add_error("values_override_file.content", "YAML content is required");
                } else if let Err(e) = serde_yaml::from_str::<serde_yaml::Value>(content) {
                    result.add_error(
                        "values_override_file.content",
                        format!("Invalid YAML: {}", e),
                    );
                }
            }
            ValuesOverrideFileData::None => {}
        }
        result
    }

    /// Validate the helm values arguments step.
    pub fn validate_values_override_arguments(draft: &Draft) -> ValidationResult {
        let mut result = ValidationResult::new();
        let Some(values) =
            section::<ValuesOverrideArguments>(draft, Section::ValuesOverrideArguments, &mut result)
        else {
            return result;
        };

        for (index, argument) in values.arguments.iter().enumerate() {
            let path = format!("values_override_arguments[{}]", index);
            if argument.key.trim().is_empty() {
                result.add_error(format!("{}.key", path), "Key is required");
            }
            if argument.kind == HelmArgumentType::SetJson {
                let parsed = serde_json::from_str::<serde_json::Value>(argument.effective_value());
                if let Err(e) = parsed {
                    result.add_error(format!("{}.json", path), format!("Invalid JSON: {}", e));
                }
            }
        }
        result
    }

    /// Validate the terraform configuration step.
    pub fn validate_terraform_configuration(draft: &Draft) -> ValidationResult {
        let mut result = ValidationResult::new();
        let Some(configuration) =
            section::<TerraformConfiguration>(draft, Section::Configuration, &mut result)
        else {
            return result;
        };

        let version = &configuration.provider_version;
        if !version.read_from_terraform_block
            && version
                .explicit_version
                .as_deref()
                .map_or(true, |v| v.trim().is_empty())
        {
            result.add_error(
                "configuration.provider_version.explicit_version",
                "A provider version is required when it is not read from the terraform block",
            );
        }

        let resources = &configuration.job_resources;
        check_amount(
            "configuration.job_resources.cpu",
            "CPU",
            Some(resources.cpu),
            Some(resources.cpu_unit.to_milli(resources.cpu)),
            &mut result,
        );
        check_amount(
            "configuration.job_resources.memory",
            "Memory",
            Some(resources.memory),
            Some(resources.memory_unit.to_mb(resources.memory)),
            &mut result,
        );
        if resources.storage_gib == 0 {
            result.add_error(
                "configuration.job_resources.storage_gib",
                "Storage must be at least 1 GiB",
            );
        }
        result
    }

    /// Validate the terraform input variables step.
    pub fn validate_input_variables(draft: &Draft) -> ValidationResult {
        let mut result = ValidationResult::new();
        let Some(inputs) =
            section::<TerraformInputVariables>(draft, Section::InputVariables, &mut result)
        else {
            return result;
        };

        for (index, path) in inputs.tf_var_file_paths.iter().enumerate() {
            if path.trim().is_empty() {
                result.add_error(
                    format!("input_variables.tf_var_file_paths[{}]", index),
                    "File path cannot be empty",
                );
            }
        }
        let mut seen = HashSet::new();
        for (index, var) in inputs.tf_vars.iter().enumerate() {
            let field = format!("input_variables.tf_vars[{}].key", index);
            if var.key.trim().is_empty() {
                result.add_error(field, "Key is required");
            } else if !seen.insert(var.key.as_str()) {
                result.add_error(field, format!("{} is declared twice", var.key));
            }
        }
        result
    }

    /// The summary step is valid when the whole request can be built.
    pub fn validate_summary(variant: Variant, draft: &Draft) -> ValidationResult {
        let mut result = ValidationResult::new();
        if let Err(e) = request::build(variant, draft) {
            let field = match &e {
                CoreError::Arguments { field, .. } | CoreError::InvalidValue { field, .. } => {
                    field.clone()
                }
                CoreError::MissingSection(section) => section.clone(),
                CoreError::MalformedSection { section, .. } => section.clone(),
                _ => "summary".to_string(),
            };
            result.add_error(field, e.to_string());
        }
        result
    }
}

fn check_name(name: &str, result: &mut ValidationResult) {
    if name.trim().is_empty() {
        result.add_error("general.name", "Name is required");
    } else if !re_match(&SERVICE_NAME, name) {
        result.add_error(
            "general.name",
            "Name must start with a letter or digit and contain only letters, digits, \
             spaces, dots, dashes and underscores",
        );
    }
}

fn check_git(git: &GitSource, prefix: &str, result: &mut ValidationResult) {
    result.require_text(&format!("{}.repository", prefix), &git.repository, "Repository");
    result.require_text(&format!("{}.branch", prefix), &git.branch, "Branch");
}

fn check_registry(registry: &RegistrySource, result: &mut ValidationResult) {
    result.require_text("general.source.registry_id", &registry.registry_id, "Registry");
    result.require_text("general.source.image_name", &registry.image_name, "Image name");
    result.require_text("general.source.image_tag", &registry.image_tag, "Image tag");
}

fn check_cpu_memory(resources: &ResourcesData, result: &mut ValidationResult) {
    check_amount("resources.cpu", "CPU", resources.cpu, resources.cpu_milli(), result);
    check_amount("resources.memory", "Memory", resources.memory, resources.memory_mb(), result);
}

/// Check a raw amount and its converted value.
fn check_amount(
    field: &str,
    label: &str,
    raw: Option<f64>,
    converted: Option<u32>,
    result: &mut ValidationResult,
) {
    match raw {
        None => result.add_error(field, format!("{} is required", label)),
        Some(value) if value.is_nan() || value.is_infinite() => {
            result.add_error(field, format!("{} must be a number", label))
        }
        Some(value) if value < 0.0 => {
            result.add_error(field, format!("{} cannot be negative", label))
        }
        Some(_) if converted.map_or(true, |v| v == 0) => {
            result.add_error(field, format!("{} must be greater than 0", label))
        }
        Some(_) => {}
    }
}

fn check_run_settings(max_duration_seconds: Option<u32>, result: &mut ValidationResult) {
    if max_duration_seconds == Some(0) {
        result.add_error(
            "configure.max_duration_seconds",
            "Maximum duration must be greater than 0",
        );
    }
}

fn check_probe(
    path: &str,
    probe: &ProbeData,
    default_port: Option<u16>,
    result: &mut ValidationResult,
) {
    if !probe.is_enabled() {
        return;
    }

    match probe.probe_type {
        ProbeType::Http => {
            let ok = probe.path.as_deref().is_some_and(|p| p.starts_with('/'));
            if !ok {
                result.add_error(
                    format!("{}.path", path),
                    "HTTP probes need a path starting with /",
                );
            }
        }
        ProbeType::Exec => match probe.command.as_deref().map(tokenize) {
            None => result.add_error(format!("{}.command", path), "Exec probes need a command"),
            Some(Err(e)) => result.add_error(format!("{}.command", path), e.to_string()),
            Some(Ok(tokens)) if tokens.is_empty() => {
                result.add_error(format!("{}.command", path), "Exec probes need a command")
            }
            Some(Ok(_)) => {}
        },
        ProbeType::Tcp | ProbeType::Grpc | ProbeType::None => {}
    }

    if probe.probe_type != ProbeType::Exec && probe.port.or(default_port).is_none() {
        result.add_error(
            format!("{}.port", path),
            "Probe port is required when no port is declared",
        );
    }
    if probe.period_seconds == 0 {
        result.add_error(format!("{}.period_seconds", path), "Period must be greater than 0");
    }
    if probe.timeout_seconds == 0 {
        result.add_error(format!("{}.timeout_seconds", path), "Timeout must be greater than 0");
    }
    if probe.timeout_seconds > probe.period_seconds {
        result.add_warning(format!("{} timeout exceeds its period", path));
    }
    if probe.success_threshold == 0 {
        result.add_error(format!("{}.success_threshold", path), "Threshold must be at least 1");
    }
    if probe.failure_threshold == 0 {
        result.add_error(format!("{}.failure_threshold", path), "Threshold must be at least 1");
    }
}

/// Values file paths from their comma-separated form.
pub(crate) fn split_paths(paths: &str) -> Vec<String> {
    paths
        .split(',')
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn draft(sections: &[(Section, serde_json::Value)]) -> Draft {
        let mut draft = Draft::new();
        for (section, value) in sections {
            draft.set_value(*section, value.clone());
        }
        draft
    }

    fn git_general() -> serde_json::Value {
        json!({
            "name": "api",
            "source": {
                "source_provider": "GIT",
                "provider": "GITHUB",
                "repository": "acme/api",
                "branch": "main"
            }
        })
    }

    fn registry_general() -> serde_json::Value {
        json!({
            "name": "web",
            "source": {
                "source_provider": "REGISTRY",
                "registry_id": "reg-1",
                "image_name": "nginx",
                "image_tag": "1.27"
            }
        })
    }

    #[test]
    fn test_validation_result_merge() {
        let mut result = ValidationResult::new();
        let mut other = ValidationResult::new();
        other.add_error("general.name", "Name is required");
        other.add_warning("careful");

        result.merge(other);
        assert!(!result.valid);
        assert!(result.has_error_on("general.name"));
        assert_eq!(result.warnings, vec!["careful"]);
        assert_eq!(result.messages(), vec!["general.name: Name is required"]);
    }

    #[test]
    fn test_missing_section_is_reported() {
        let result =
            StepValidator::validate_step(Variant::ApplicationGit, StepId::General, &Draft::new());
        assert!(!result.valid);
        assert!(result.has_error_on("general"));
    }

    #[test]
    fn test_general_source_must_match_variant() {
        let git = draft(&[(Section::General, git_general())]);
        let registry = draft(&[(Section::General, registry_general())]);

        let complete = |variant: Variant, data: &Draft| {
            StepValidator::is_complete(variant, StepId::General, data)
        };
        assert!(complete(Variant::ApplicationGit, &git));
        assert!(!complete(Variant::ApplicationContainer, &git));
        assert!(complete(Variant::ApplicationContainer, &registry));
        assert!(!complete(Variant::ApplicationGit, &registry));
        // Jobs accept both.
        assert!(complete(Variant::CronJob, &git));
        assert!(complete(Variant::CronJob, &registry));
    }

    #[test]
    fn test_branch_required_only_for_git() {
        let mut general = git_general();
        general["source"]["branch"] = json!("");
        let general = draft(&[(Section::General, general)]);
        let result = StepValidator::validate_general(Variant::ApplicationGit, &general);
        assert!(result.has_error_on("general.source.branch"));

        let result = StepValidator::validate_general(
            Variant::ApplicationContainer,
            &draft(&[(Section::General, registry_general())]),
        );
        assert!(result.valid);
    }

    #[test]
    fn test_unparsable_arguments_surface_on_general() {
        let mut general = git_general();
        general["cmd_arguments"] = json!("run \"oops");
        let general = draft(&[(Section::General, general)]);
        let result = StepValidator::validate_general(Variant::ApplicationGit, &general);
        assert!(result.has_error_on("general.cmd_arguments"));
    }

    #[test]
    fn test_resources_rules() {
        let ok = draft(&[(
            Section::Resources,
            json!({"cpu": 0.5, "cpu_unit": "CORES", "memory": 1, "memory_unit": "GB",
                   "min_running_instances": 1, "max_running_instances": 3}),
        )]);
        assert!(StepValidator::validate_resources(Variant::ApplicationGit, &ok).valid);

        let bad = draft(&[(
            Section::Resources,
            json!({
                "cpu": 0,
                "memory": 256,
                "min_running_instances": 4,
                "max_running_instances": 2
            }),
        )]);
        let result = StepValidator::validate_resources(Variant::ApplicationGit, &bad);
        assert!(result.has_error_on("resources.cpu"));
        assert!(result.has_error_on("resources.min_running_instances"));
        assert!(!result.has_error_on("resources.memory"));

        let negative = draft(&[(Section::Resources, json!({"cpu": -250, "memory": 256}))]);
        let result = StepValidator::validate_resources(Variant::ApplicationGit, &negative);
        let messages: Vec<&str> = result
            .errors_for("resources.cpu")
            .map(|e| e.message.as_str())
            .collect();
        assert_eq!(messages, vec!["CPU cannot be negative"]);

        let zero = StepValidator::validate_resources(Variant::ApplicationGit, &bad);
        let message = zero.errors_for("resources.cpu").next().map(|e| e.message.clone());
        assert_eq!(message.as_deref(), Some("CPU must be greater than 0"));
    }

    #[test]
    fn test_database_resources_depend_on_mode() {
        let general = |mode: &str| {
            json!({"name": "db", "type": "POSTGRESQL", "version": "16", "mode": mode})
        };

        let managed = draft(&[
            (Section::General, general("MANAGED")),
            (Section::Resources, json!({"storage": 10})),
        ]);
        let result = StepValidator::validate_resources(Variant::Database, &managed);
        assert!(result.has_error_on("resources.instance_type"));
        assert!(!result.has_error_on("resources.cpu"));

        let container = draft(&[
            (Section::General, general("CONTAINER")),
            (Section::Resources, json!({"storage": 10, "cpu": 250, "memory": 256})),
        ]);
        assert!(StepValidator::validate_resources(Variant::Database, &container).valid);
    }

    #[test]
    fn test_ports_rules() {
        let ports = draft(&[(
            Section::Ports,
            json!({"ports": [
                {"application_port": 8080, "is_public": true},
                {"application_port": 8080},
                {"is_public": false}
            ]}),
        )]);
        let result = StepValidator::validate_ports(&ports);
        assert!(result.has_error_on("ports[0].external_port"));
        assert!(result.has_error_on("ports[1].application_port"));
        assert!(result.has_error_on("ports[2].application_port"));

        let empty = draft(&[(Section::Ports, json!({"ports": []}))]);
        assert!(StepValidator::validate_ports(&empty).valid);
    }

    #[test]
    fn test_healthchecks_rules() {
        let checks = draft(&[
            (Section::Ports, json!({"ports": [{"application_port": 8080}]})),
            (
                Section::Healthchecks,
                json!({
                    "readiness": {"probe_type": "HTTP", "path": "health"},
                    "liveness": {"probe_type": "TCP", "success_threshold": 2}
                }),
            ),
        ]);
        let result = StepValidator::validate_healthchecks(&checks);
        assert!(result.has_error_on("healthchecks.readiness.path"));
        assert!(result.has_error_on("healthchecks.liveness.success_threshold"));
        assert!(!result.has_error_on("healthchecks.liveness.port"));
    }

    #[test]
    fn test_cron_expressions() {
        assert!(is_valid_cron("*/5 * * * *"));
        assert!(is_valid_cron("0 3 * * MON-FRI"));
        assert!(is_valid_cron("@daily"));
        assert!(!is_valid_cron("* * * *"));
        assert!(!is_valid_cron("@sometimes"));
        assert!(!is_valid_cron("0 3 * * $(date)"));
    }

    #[test]
    fn test_lifecycle_requires_an_enabled_event() {
        let none = draft(&[(Section::Configure, json!({"on_start": {"enabled": false}}))]);
        let result = StepValidator::validate_configure(Variant::LifecycleJob, &none);
        assert!(result.has_error_on("configure"));

        let start = draft(&[(
            Section::Configure,
            json!({"on_start": {"enabled": true, "arguments": "'unclosed"}}),
        )]);
        let result = StepValidator::validate_configure(Variant::LifecycleJob, &start);
        assert!(!result.has_error_on("configure"));
        assert!(result.has_error_on("configure.on_start.arguments"));
    }

    #[test]
    fn test_variables_rules() {
        let vars = draft(&[(
            Section::Variables,
            json!({"variables": [
                {"variable": "DATABASE_URL", "value": "x"},
                {"variable": "1BAD", "value": "x"},
                {"variable": "DATABASE_URL", "value": "y"}
            ]}),
        )]);
        let result = StepValidator::validate_variables(&vars);
        assert!(!result.has_error_on("variables[0].variable"));
        assert!(result.has_error_on("variables[1].variable"));
        assert!(result.has_error_on("variables[2].variable"));
    }

    #[test]
    fn test_missing_scope_collides_with_default_scope() {
        let vars = draft(&[(
            Section::Variables,
            json!({"variables": [
                {"variable": "A", "value": "1"},
                {"variable": "A", "value": "2", "scope": "PROJECT"},
                {"variable": "A", "value": "3", "scope": "ENVIRONMENT"}
            ]}),
        )]);
        let result = StepValidator::validate_variables(&vars);
        assert!(!result.valid);
        assert!(result.has_error_on("variables[1].variable"));
        assert!(!result.has_error_on("variables[2].variable"));
    }

    #[test]
    fn test_file_variable_needs_absolute_path() {
        let vars = draft(&[(
            Section::Variables,
            json!({"variables": [
                {"variable": "CONFIG", "value": "x", "file": {"path": "/etc/app.yaml"}},
                {"variable": "CERT", "value": "x", "file": {"path": "certs/ca.pem"}},
                {"variable": "KEY", "value": "x", "file": {"path": " "}}
            ]}),
        )]);
        let result = StepValidator::validate_variables(&vars);
        assert!(!result.has_error_on("variables[0].file.path"));
        assert!(result.has_error_on("variables[1].file.path"));
        assert!(result.has_error_on("variables[2].file.path"));
    }

    #[test]
    fn test_helm_set_json_must_be_json() {
        let args = draft(&[(
            Section::ValuesOverrideArguments,
            json!({"arguments": [
                {"type": "--set", "key": "replicas", "value": "2"},
                {"type": "--set-json", "key": "resources", "value": "{not json"}
            ]}),
        )]);
        let result = StepValidator::validate_values_override_arguments(&args);
        assert!(!result.has_error_on("values_override_arguments[0].json"));
        assert!(result.has_error_on("values_override_arguments[1].json"));
    }

    #[test]
    fn test_values_file_rules() {
        let git = draft(&[(
            Section::ValuesOverrideFile,
            json!({"type": "GIT_REPOSITORY", "provider": "GITHUB", "repository": "acme/charts",
                   "branch": "main", "paths": " , "}),
        )]);
        assert!(StepValidator::validate_values_override_file(&git)
            .has_error_on("values_override_file.paths"));

        let none = draft(&[(Section::ValuesOverrideFile, json!({"type": "NONE"}))]);
        assert!(StepValidator::validate_values_override_file(&none).valid);
    }

    #[test]
    fn test_terraform_configuration_rules() {
        let config = draft(&[(
            Section::Configuration,
            json!({
                "provider_version": {"read_from_terraform_block": false},
                "job_resources": {"cpu": 500, "memory": 0, "storage_gib": 1}
            }),
        )]);
        let result = StepValidator::validate_terraform_configuration(&config);
        assert!(result.has_error_on("configuration.provider_version.explicit_version"));
        assert!(result.has_error_on("configuration.job_resources.memory"));
        assert!(!result.has_error_on("configuration.job_resources.cpu"));
    }

    #[test]
    fn test_split_paths() {
        assert_eq!(split_paths("a.yaml, b.yaml,,"), vec!["a.yaml", "b.yaml"]);
        assert!(split_paths("").is_empty());
    }
}
