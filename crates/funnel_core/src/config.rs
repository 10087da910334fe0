//! Wizard configuration, read from `funnel.toml`.
//!
//! Every section is optional; missing keys fall back to the built-in
//! defaults used by the request builder.

use std::collections::HashMap;
use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{CoreError, CoreResult};
use crate::request::BuildDefaults;
use crate::sections::{GitProvider, PortProtocol, VariableScope};

/// Default file name looked up in the working directory.
pub const CONFIG_FILE_NAME: &str = "funnel.toml";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PortsConfig {
    /// Port used when an application declares none.
    pub internal_port: u16,
    pub protocol: PortProtocol,
}

impl Default for PortsConfig {
    fn default() -> Self {
        Self {
            internal_port: 80,
            protocol: PortProtocol::Http,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VariablesConfig {
    /// Scope given to variables that do not set one.
    pub default_scope: VariableScope,
}

impl Default for VariablesConfig {
    fn default() -> Self {
        Self {
            default_scope: VariableScope::Project,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct JobsConfig {
    /// Timezone of cron schedules that do not set one.
    pub timezone: String,
}

impl Default for JobsConfig {
    fn default() -> Self {
        Self {
            timezone: "Etc/UTC".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HelmConfig {
    /// Name of the values file sent for inline YAML overrides.
    pub raw_values_name: String,
}

impl Default for HelmConfig {
    fn default() -> Self {
        Self {
            raw_values_name: "override".to_string(),
        }
    }
}

/// Retry policy of the template prefill read.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TemplateConfig {
    pub fetch_attempts: u32,
    pub retry_delay_ms: u64,
}

impl Default for TemplateConfig {
    fn default() -> Self {
        Self {
            fetch_attempts: 3,
            retry_delay_ms: 250,
        }
    }
}

impl TemplateConfig {
    pub fn retry_delay(&self) -> Duration {
        Duration::from_millis(self.retry_delay_ms)
    }
}

/// Host overrides for self-hosted git providers.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GitConfig {
    pub github: Option<String>,
    pub gitlab: Option<String>,
    pub bitbucket: Option<String>,
}

impl GitConfig {
    fn hosts(&self) -> HashMap<GitProvider, String> {
        [
            (GitProvider::Github, &self.github),
            (GitProvider::Gitlab, &self.gitlab),
            (GitProvider::Bitbucket, &self.bitbucket),
        ]
        .into_iter()
        .filter_map(|(provider, host)| host.clone().map(|host| (provider, host)))
        .collect()
    }
}

/// Top-level configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WizardConfig {
    pub ports: PortsConfig,
    pub variables: VariablesConfig,
    pub jobs: JobsConfig,
    pub helm: HelmConfig,
    pub template: TemplateConfig,
    pub git: GitConfig,
}

impl WizardConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load configuration from a TOML file.
    pub fn load(path: &Path) -> CoreResult<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
            .map_err(|e| CoreError::Config(format!("{}: {}", path.display(), e)))
    }

    /// Load `path` if it exists, defaults otherwise.
    pub fn load_or_default(path: &Path) -> CoreResult<Self> {
        if path.exists() {
            Self::load(path)
        } else {
            Ok(Self::default())
        }
    }

    pub fn from_toml_str(content: &str) -> CoreResult<Self> {
        let config: Self = toml::from_str(content).map_err(|e| CoreError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_toml_string(&self) -> CoreResult<String> {
        toml::to_string_pretty(self).map_err(|e| CoreError::Serialization(e.to_string()))
    }

    fn validate(&self) -> CoreResult<()> {
        if self.ports.internal_port == 0 {
            return Err(CoreError::Config("ports.internal_port must be positive".to_string()));
        }
        if self.template.fetch_attempts == 0 {
            return Err(CoreError::Config(
                "template.fetch_attempts must be at least 1".to_string(),
            ));
        }
        if self.jobs.timezone.trim().is_empty() {
            return Err(CoreError::Config("jobs.timezone must not be empty".to_string()));
        }
        Ok(())
    }

    pub fn internal_port(mut self, port: u16) -> Self {
        self.ports.internal_port = port;
        self
    }

    pub fn protocol(mut self, protocol: PortProtocol) -> Self {
        self.ports.protocol = protocol;
        self
    }

    pub fn variable_scope(mut self, scope: VariableScope) -> Self {
        self.variables.default_scope = scope;
        self
    }

    pub fn timezone(mut self, timezone: impl Into<String>) -> Self {
        self.jobs.timezone = timezone.into();
        self
    }

    pub fn fetch_attempts(mut self, attempts: u32) -> Self {
        self.template.fetch_attempts = attempts;
        self
    }

    pub fn retry_delay_ms(mut self, delay: u64) -> Self {
        self.template.retry_delay_ms = delay;
        self
    }

    pub fn git_host(mut self, provider: GitProvider, host: impl Into<String>) -> Self {
        let host = Some(host.into());
        match provider {
            GitProvider::Github => self.git.github = host,
            GitProvider::Gitlab => self.git.gitlab = host,
            GitProvider::Bitbucket => self.git.bitbucket = host,
        }
        self
    }

    /// Defaults handed to the request builder.
    pub fn to_build_defaults(&self) -> BuildDefaults {
        BuildDefaults {
            internal_port: self.ports.internal_port,
            protocol: self.ports.protocol,
            timezone: self.jobs.timezone.clone(),
            variable_scope: self.variables.default_scope,
            git_hosts: self.git.hosts(),
            raw_values_name: self.helm.raw_values_name.clone(),
        }
    }
}
