//! Collaborator interfaces: the service API and the template source.
//!
//! The wizard core never speaks HTTP. Everything it needs from the backend
//! goes through these traits, which the console, the CLI outbox and the
//! test doubles implement.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::request::{
    CreateRequest, DeployRequest, ServiceRef, VariableImportRequest, VariableRequest,
};
use crate::sections::VariableData;

/// Result type alias for service API calls.
pub type ApiResult<T> = Result<T, ApiError>;

/// Errors reported by a service API implementation.
#[derive(Error, Debug)]
pub enum ApiError {
    #[error("Request rejected: {0}")]
    Rejected(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Service unavailable: {0}")]
    Unavailable(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Service returned by a successful create call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreatedService {
    pub id: String,
}

/// Backend operations used at submission time.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ServiceApi: Send + Sync {
    /// Create a service in an environment.
    async fn create_service(
        &self,
        environment_id: &str,
        request: &CreateRequest,
    ) -> ApiResult<CreatedService>;

    /// Deploy (or plan, with `dry_run`) a created service.
    async fn deploy_service(&self, request: &DeployRequest) -> ApiResult<()>;

    /// Import variables onto a created service.
    async fn import_variables(
        &self,
        service: &ServiceRef,
        request: &VariableImportRequest,
    ) -> ApiResult<()>;

    /// Create a single variable. File variables go through here.
    async fn create_variable(&self, request: &VariableRequest) -> ApiResult<()>;
}

/// Defaults a template seeds the draft with before the first step.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TemplatePrefill {
    #[serde(default)]
    pub name: Option<String>,
    /// CPU in milli-cores.
    #[serde(default)]
    pub cpu: Option<u32>,
    /// Memory in MB.
    #[serde(default)]
    pub memory: Option<u32>,
    #[serde(default)]
    pub arguments: Option<String>,
    #[serde(default)]
    pub variables: Vec<VariableData>,
}

/// Read-only source of templates. Reads are idempotent and may be retried.
#[async_trait]
pub trait TemplateSource: Send + Sync {
    async fn fetch_template(&self, template_id: &str) -> ApiResult<TemplatePrefill>;
}
