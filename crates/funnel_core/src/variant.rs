//! Creation flow variants and the backend service types they map to.

use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::CoreError;

/// The kind of service being created. Fixed for the life of a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Variant {
    ApplicationGit,
    ApplicationContainer,
    Database,
    CronJob,
    LifecycleJob,
    Helm,
    Terraform,
}

impl Variant {
    pub const ALL: [Variant; 7] = [
        Variant::ApplicationGit,
        Variant::ApplicationContainer,
        Variant::Database,
        Variant::CronJob,
        Variant::LifecycleJob,
        Variant::Helm,
        Variant::Terraform,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ApplicationGit => "application-git",
            Self::ApplicationContainer => "application-container",
            Self::Database => "database",
            Self::CronJob => "cron-job",
            Self::LifecycleJob => "lifecycle-job",
            Self::Helm => "helm",
            Self::Terraform => "terraform",
        }
    }

    /// Backend service type the created entity belongs to.
    pub fn service_type(&self) -> ServiceType {
        match self {
            Self::ApplicationGit => ServiceType::Application,
            Self::ApplicationContainer => ServiceType::Container,
            Self::Database => ServiceType::Database,
            Self::CronJob | Self::LifecycleJob => ServiceType::Job,
            Self::Helm => ServiceType::Helm,
            Self::Terraform => ServiceType::Terraform,
        }
    }

    pub fn is_job(&self) -> bool {
        matches!(self, Self::CronJob | Self::LifecycleJob)
    }

    pub fn is_application(&self) -> bool {
        matches!(self, Self::ApplicationGit | Self::ApplicationContainer)
    }
}

impl FromStr for Variant {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().replace('_', "-").as_str() {
            "application-git" | "application" => Ok(Self::ApplicationGit),
            "application-container" | "container" => Ok(Self::ApplicationContainer),
            "database" => Ok(Self::Database),
            "cron-job" | "cron" => Ok(Self::CronJob),
            "lifecycle-job" | "lifecycle" => Ok(Self::LifecycleJob),
            "helm" => Ok(Self::Helm),
            "terraform" => Ok(Self::Terraform),
            other => Err(CoreError::InvalidVariant(other.to_string())),
        }
    }
}

impl std::fmt::Display for Variant {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Service type as understood by the create/deploy endpoints.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ServiceType {
    Application,
    Container,
    Database,
    Job,
    Helm,
    Terraform,
}

impl ServiceType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Application => "APPLICATION",
            Self::Container => "CONTAINER",
            Self::Database => "DATABASE",
            Self::Job => "JOB",
            Self::Helm => "HELM",
            Self::Terraform => "TERRAFORM",
        }
    }
}

impl std::fmt::Display for ServiceType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
