//! Ports and healthcheck probes.

use serde::{Deserialize, Serialize};

use crate::draft::{Draft, Section};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PortProtocol {
    Http,
    Grpc,
    Tcp,
    Udp,
}

impl PortProtocol {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Http => "HTTP",
            Self::Grpc => "GRPC",
            Self::Tcp => "TCP",
            Self::Udp => "UDP",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PortData {
    #[serde(default)]
    pub application_port: Option<u16>,
    #[serde(default)]
    pub external_port: Option<u16>,
    #[serde(default)]
    pub is_public: bool,
    #[serde(default)]
    pub protocol: Option<PortProtocol>,
    #[serde(default)]
    pub name: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PortsData {
    #[serde(default)]
    pub ports: Vec<PortData>,
}

impl PortsData {
    /// First declared application port, used as the probe default.
    pub fn first_application_port(&self) -> Option<u16> {
        self.ports.iter().find_map(|p| p.application_port)
    }
}

/// True once the ports step has stored a list that declares no port.
pub fn declares_no_port(draft: &Draft) -> bool {
    draft
        .get(Section::Ports)
        .and_then(|value| serde_json::from_value::<PortsData>(value.clone()).ok())
        .is_some_and(|ports| ports.ports.is_empty())
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ProbeType {
    #[default]
    None,
    Tcp,
    Http,
    Grpc,
    Exec,
}

fn default_initial_delay() -> u32 {
    30
}

fn default_period() -> u32 {
    10
}

fn default_timeout() -> u32 {
    5
}

fn default_one() -> u32 {
    1
}

fn default_failure_threshold() -> u32 {
    3
}

/// One readiness or liveness probe as configured in the healthchecks step.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProbeData {
    #[serde(default)]
    pub probe_type: ProbeType,
    #[serde(default)]
    pub port: Option<u16>,
    #[serde(default)]
    pub path: Option<String>,
    #[serde(default)]
    pub scheme: Option<String>,
    #[serde(default)]
    pub service: Option<String>,
    /// Exec command, tokenized like other argument strings.
    #[serde(default)]
    pub command: Option<String>,
    #[serde(default = "default_initial_delay")]
    pub initial_delay_seconds: u32,
    #[serde(default = "default_period")]
    pub period_seconds: u32,
    #[serde(default = "default_timeout")]
    pub timeout_seconds: u32,
    #[serde(default = "default_one")]
    pub success_threshold: u32,
    #[serde(default = "default_failure_threshold")]
    pub failure_threshold: u32,
}

impl Default for ProbeData {
    fn default() -> Self {
        Self {
            probe_type: ProbeType::None,
            port: None,
            path: None,
            scheme: None,
            service: None,
            command: None,
            initial_delay_seconds: default_initial_delay(),
            period_seconds: default_period(),
            timeout_seconds: default_timeout(),
            success_threshold: default_one(),
            failure_threshold: default_failure_threshold(),
        }
    }
}

impl ProbeData {
    pub fn is_enabled(&self) -> bool {
        self.probe_type != ProbeType::None
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HealthchecksData {
    #[serde(default)]
    pub readiness: ProbeData,
    #[serde(default)]
    pub liveness: ProbeData,
}
