//! Submission of a built request: create, then optionally deploy.
//!
//! The controller sequences the calls on the service API and keeps the
//! state the summary step renders (which button is loading, whether the
//! service exists). Create is never retried automatically. Deploy is only
//! issued once create resolved with an id and the variables were sent, and a
//! failed deploy leaves the created service in place so that only the deploy
//! can be retried.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{error, info, warn};

use crate::api::{ApiError, ServiceApi};
use crate::request::{CreateRequest, DeployRequest, FileVariable, ServiceRef, VariableImportRequest};
use crate::sections::VariableScope;
use crate::variant::ServiceType;

/// Which summary action was triggered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubmitAction {
    Create,
    CreateAndDeploy,
}

/// Lifecycle of one submission.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum SubmissionState {
    Idle,
    Creating,
    /// The service exists and its variables are being sent.
    ImportingVariables { service_id: String },
    /// The service exists but its deploy failed; only the deploy may be retried.
    Created { service_id: String },
    Deploying { service_id: String },
    Done { service_id: String },
    /// Create failed; the draft is untouched and the submission may be retried.
    Failed { message: String },
}

impl SubmissionState {
    pub fn is_in_flight(&self) -> bool {
        matches!(
            self,
            Self::Creating | Self::ImportingVariables { .. } | Self::Deploying { .. }
        )
    }
}

/// How a submission ended.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum SubmissionOutcome {
    Created { service_id: String },
    Deployed { service_id: String, dry_run: bool },
    /// Create succeeded but deploy failed. Not a success, not a create failure.
    CreatedNotDeployed { service_id: String, message: String },
}

impl SubmissionOutcome {
    pub fn service_id(&self) -> &str {
        match self {
            Self::Created { service_id }
            | Self::Deployed { service_id, .. }
            | Self::CreatedNotDeployed { service_id, .. } => service_id,
        }
    }

    pub fn is_complete(&self) -> bool {
        !matches!(self, Self::CreatedNotDeployed { .. })
    }
}

/// Result of sending variables once the service exists.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum VariableImportStatus {
    #[default]
    Skipped,
    Imported { count: usize },
    Failed { message: String },
}

/// Everything the summary step needs once a submission resolves.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubmissionReport {
    pub service: ServiceRef,
    pub outcome: SubmissionOutcome,
    /// Bulk import of plain variables.
    pub variables: VariableImportStatus,
    /// One by one creation of file variables.
    #[serde(default)]
    pub file_variables: VariableImportStatus,
    pub completed_at: DateTime<Utc>,
}

/// Errors that stop a submission.
#[derive(Error, Debug)]
pub enum SubmissionError {
    #[error("Service creation failed: {0}")]
    CreateFailed(#[source] ApiError),

    #[error("A submission is already in flight")]
    InFlight,

    #[error("Service {service_id} was already created")]
    AlreadyCreated { service_id: String },

    #[error("No pending deploy to retry")]
    NothingToRetry,
}

#[derive(Debug)]
struct Inner {
    state: SubmissionState,
    loading_create: bool,
    loading_create_and_deploy: bool,
    service: Option<ServiceRef>,
    /// Deploy flavour of the pending retry.
    pending_dry_run: bool,
}

impl Inner {
    fn set_loading(&mut self, action: SubmitAction, loading: bool) {
        match action {
            SubmitAction::Create => self.loading_create = loading,
            SubmitAction::CreateAndDeploy => self.loading_create_and_deploy = loading,
        }
    }

    fn clear_loading(&mut self) {
        self.loading_create = false;
        self.loading_create_and_deploy = false;
    }
}

/// Drives create and create-and-deploy against a [`ServiceApi`].
pub struct SubmissionController {
    api: Arc<dyn ServiceApi>,
    environment_id: String,
    /// Parent of project scoped file variables.
    project_id: Option<String>,
    inner: Mutex<Inner>,
}

impl SubmissionController {
    pub fn new(api: Arc<dyn ServiceApi>, environment_id: impl Into<String>) -> Self {
        Self {
            api,
            environment_id: environment_id.into(),
            project_id: None,
            inner: Mutex::new(Inner {
                state: SubmissionState::Idle,
                loading_create: false,
                loading_create_and_deploy: false,
                service: None,
                pending_dry_run: false,
            }),
        }
    }

    /// Project the environment belongs to.
    pub fn with_project(mut self, project_id: impl Into<String>) -> Self {
        self.project_id = Some(project_id.into());
        self
    }

    pub fn environment_id(&self) -> &str {
        &self.environment_id
    }

    pub fn project_id(&self) -> Option<&str> {
        self.project_id.as_deref()
    }

    pub fn state(&self) -> SubmissionState {
        self.inner.lock().state.clone()
    }

    /// Loading flag of the "create" button.
    pub fn loading_create(&self) -> bool {
        self.inner.lock().loading_create
    }

    /// Loading flag of the "create and deploy" button.
    pub fn loading_create_and_deploy(&self) -> bool {
        self.inner.lock().loading_create_and_deploy
    }

    pub fn is_loading(&self, action: SubmitAction) -> bool {
        match action {
            SubmitAction::Create => self.loading_create(),
            SubmitAction::CreateAndDeploy => self.loading_create_and_deploy(),
        }
    }

    /// The created service, once create succeeded.
    pub fn service(&self) -> Option<ServiceRef> {
        self.inner.lock().service.clone()
    }

    /// Create the service and, for [`SubmitAction::CreateAndDeploy`], deploy it.
    ///
    /// Terraform services are planned rather than applied: their deploy
    /// carries `dry_run`.
    pub async fn submit(
        &self,
        action: SubmitAction,
        request: &CreateRequest,
        variables: Option<&VariableImportRequest>,
    ) -> Result<SubmissionReport, SubmissionError> {
        self.submit_with_files(action, request, variables, &[]).await
    }

    /// Like [`Self::submit`], also creating file variables once the service
    /// exists.
    pub async fn submit_with_files(
        &self,
        action: SubmitAction,
        request: &CreateRequest,
        variables: Option<&VariableImportRequest>,
        files: &[FileVariable],
    ) -> Result<SubmissionReport, SubmissionError> {
        {
            let mut inner = self.inner.lock();
            if inner.state.is_in_flight() {
                warn!("Submission refused: another one is in flight");
                return Err(SubmissionError::InFlight);
            }
            if let Some(service) = &inner.service {
                return Err(SubmissionError::AlreadyCreated {
                    service_id: service.service_id.clone(),
                });
            }
            inner.state = SubmissionState::Creating;
            inner.set_loading(action, true);
        }

        let service_type = request.service_type();
        info!(
            "Creating {} service {} in environment {}",
            service_type,
            request.name(),
            self.environment_id
        );

        let created = match self.api.create_service(&self.environment_id, request).await {
            Ok(created) => created,
            Err(e) => {
                error!("Service creation failed: {}", e);
                let mut inner = self.inner.lock();
                inner.state = SubmissionState::Failed {
                    message: e.to_string(),
                };
                inner.clear_loading();
                return Err(SubmissionError::CreateFailed(e));
            }
        };

        let service = ServiceRef {
            service_id: created.id.clone(),
            service_type,
        };
        info!("Service {} created", service.service_id);
        {
            let mut inner = self.inner.lock();
            inner.service = Some(service.clone());
            inner.state = SubmissionState::ImportingVariables {
                service_id: service.service_id.clone(),
            };
        }

        let variables = self.import_variables(&service, variables).await;
        let file_variables = self.create_file_variables(&service, files).await;

        if action == SubmitAction::Create {
            let mut inner = self.inner.lock();
            inner.state = SubmissionState::Done {
                service_id: service.service_id.clone(),
            };
            inner.clear_loading();
            return Ok(SubmissionReport {
                outcome: SubmissionOutcome::Created {
                    service_id: service.service_id.clone(),
                },
                service,
                variables,
                file_variables,
                completed_at: Utc::now(),
            });
        }

        let dry_run = service_type == ServiceType::Terraform;
        let outcome = self.deploy(&service, dry_run).await;
        Ok(SubmissionReport {
            service,
            outcome,
            variables,
            file_variables,
            completed_at: Utc::now(),
        })
    }

    /// Re-issue only the deploy call after a [`SubmissionOutcome::CreatedNotDeployed`].
    pub async fn retry_deploy(&self) -> Result<SubmissionReport, SubmissionError> {
        let (service, dry_run) = {
            let mut inner = self.inner.lock();
            if inner.state.is_in_flight() {
                return Err(SubmissionError::InFlight);
            }
            let (SubmissionState::Created { .. }, Some(service)) = (&inner.state, &inner.service)
            else {
                return Err(SubmissionError::NothingToRetry);
            };
            let service = service.clone();
            inner.set_loading(SubmitAction::CreateAndDeploy, true);
            (service, inner.pending_dry_run)
        };

        info!("Retrying deploy of {}", service.service_id);
        let outcome = self.deploy(&service, dry_run).await;
        Ok(SubmissionReport {
            service,
            outcome,
            variables: VariableImportStatus::Skipped,
            file_variables: VariableImportStatus::Skipped,
            completed_at: Utc::now(),
        })
    }

    async fn import_variables(
        &self,
        service: &ServiceRef,
        variables: Option<&VariableImportRequest>,
    ) -> VariableImportStatus {
        let Some(request) = variables.filter(|r| !r.vars.is_empty()) else {
            return VariableImportStatus::Skipped;
        };
        match self.api.import_variables(service, request).await {
            Ok(()) => {
                info!("Imported {} variables", request.vars.len());
                VariableImportStatus::Imported {
                    count: request.vars.len(),
                }
            }
            Err(e) => {
                warn!("Variable import failed for {}: {}", service.service_id, e);
                VariableImportStatus::Failed {
                    message: e.to_string(),
                }
            }
        }
    }

    /// Create every file variable, continuing past failures.
    async fn create_file_variables(
        &self,
        service: &ServiceRef,
        files: &[FileVariable],
    ) -> VariableImportStatus {
        if files.is_empty() {
            return VariableImportStatus::Skipped;
        }

        let mut failures = Vec::new();
        for file in files {
            let parent_id = match self.parent_id(file.variable_scope, service) {
                Ok(parent_id) => parent_id,
                Err(message) => {
                    failures.push(format!("{}: {}", file.key, message));
                    continue;
                }
            };
            if let Err(e) = self.api.create_variable(&file.with_parent(parent_id)).await {
                failures.push(format!("{}: {}", file.key, e));
            }
        }

        if failures.is_empty() {
            info!("Created {} file variables", files.len());
            VariableImportStatus::Imported { count: files.len() }
        } else {
            warn!(
                "{} of {} file variables failed for {}",
                failures.len(),
                files.len(),
                service.service_id
            );
            VariableImportStatus::Failed {
                message: failures.join("; "),
            }
        }
    }

    /// Id of the entity a variable of `scope` is attached to.
    fn parent_id(&self, scope: VariableScope, service: &ServiceRef) -> Result<String, String> {
        let service_scope = match service.service_type {
            ServiceType::Application => Some(VariableScope::Application),
            ServiceType::Container => Some(VariableScope::Container),
            ServiceType::Job => Some(VariableScope::Job),
            ServiceType::Helm => Some(VariableScope::Helm),
            ServiceType::Terraform => Some(VariableScope::Terraform),
            ServiceType::Database => None,
        };
        match scope {
            VariableScope::Project => self
                .project_id
                .clone()
                .ok_or_else(|| "no project id to attach a PROJECT variable to".to_string()),
            VariableScope::Environment => Ok(self.environment_id.clone()),
            scope if Some(scope) == service_scope => Ok(service.service_id.clone()),
            scope => Err(format!(
                "scope {} does not apply to a {} service",
                scope.as_str(),
                service.service_type
            )),
        }
    }

    async fn deploy(&self, service: &ServiceRef, dry_run: bool) -> SubmissionOutcome {
        {
            let mut inner = self.inner.lock();
            inner.state = SubmissionState::Deploying {
                service_id: service.service_id.clone(),
            };
            inner.pending_dry_run = dry_run;
        }

        let mut request = DeployRequest::new(service);
        if dry_run {
            request = request.dry_run();
        }

        let result = self.api.deploy_service(&request).await;
        let mut inner = self.inner.lock();
        inner.clear_loading();
        match result {
            Ok(()) => {
                info!("Service {} deployed", service.service_id);
                inner.state = SubmissionState::Done {
                    service_id: service.service_id.clone(),
                };
                SubmissionOutcome::Deployed {
                    service_id: service.service_id.clone(),
                    dry_run,
                }
            }
            Err(e) => {
                error!("Deploy of {} failed: {}", service.service_id, e);
                inner.state = SubmissionState::Created {
                    service_id: service.service_id.clone(),
                };
                SubmissionOutcome::CreatedNotDeployed {
                    service_id: service.service_id.clone(),
                    message: e.to_string(),
                }
            }
        }
    }
}
