//! Recording service API for testing.
//!
//! Captures every call and returns programmable results, so flows can be
//! exercised end to end without a backend.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::RwLock;

use crate::api::{ApiError, ApiResult, CreatedService, ServiceApi, TemplatePrefill, TemplateSource};
use crate::request::{
    CreateRequest, DeployRequest, ServiceRef, VariableImportRequest, VariableRequest,
};

/// Captured call information for verification.
#[derive(Debug, Clone, PartialEq)]
pub enum CapturedCall {
    Create {
        environment_id: String,
        request: CreateRequest,
    },
    Deploy(DeployRequest),
    ImportVariables {
        service: ServiceRef,
        request: VariableImportRequest,
    },
    CreateVariable(VariableRequest),
}

impl CapturedCall {
    pub fn method(&self) -> &'static str {
        match self {
            Self::Create { .. } => "create_service",
            Self::Deploy(_) => "deploy_service",
            Self::ImportVariables { .. } => "import_variables",
            Self::CreateVariable(_) => "create_variable",
        }
    }
}

/// Service API double that records every call.
#[derive(Clone)]
pub struct RecordingServiceApi {
    /// Ids handed out by successive create calls.
    service_ids: Arc<RwLock<VecDeque<String>>>,
    created: Arc<AtomicUsize>,
    captured_calls: Arc<RwLock<Vec<CapturedCall>>>,
    fail_create: Arc<RwLock<Option<String>>>,
    fail_deploy: Arc<RwLock<Option<String>>>,
    fail_import: Arc<RwLock<Option<String>>>,
    fail_create_variable: Arc<RwLock<Option<String>>>,
    /// Delay applied to create calls.
    latency: Arc<RwLock<Option<Duration>>>,
    /// Delay applied to variable import calls.
    import_latency: Arc<RwLock<Option<Duration>>>,
}

impl Default for RecordingServiceApi {
    fn default() -> Self {
        Self::new()
    }
}

impl RecordingServiceApi {
    pub fn new() -> Self {
        Self {
            service_ids: Arc::new(RwLock::new(VecDeque::new())),
            created: Arc::new(AtomicUsize::new(0)),
            captured_calls: Arc::new(RwLock::new(Vec::new())),
            fail_create: Arc::new(RwLock::new(None)),
            fail_deploy: Arc::new(RwLock::new(None)),
            fail_import: Arc::new(RwLock::new(None)),
            fail_create_variable: Arc::new(RwLock::new(None)),
            latency: Arc::new(RwLock::new(None)),
            import_latency: Arc::new(RwLock::new(None)),
        }
    }

    /// Id returned by the next create call. Defaults to `svc-{n}`.
    pub fn with_service_id(self, id: impl Into<String>) -> Self {
        self.service_ids.write().push_back(id.into());
        self
    }

    pub fn fail_create(self, message: impl Into<String>) -> Self {
        *self.fail_create.write() = Some(message.into());
        self
    }

    pub fn fail_deploy(self, message: impl Into<String>) -> Self {
        *self.fail_deploy.write() = Some(message.into());
        self
    }

    pub fn fail_import(self, message: impl Into<String>) -> Self {
        *self.fail_import.write() = Some(message.into());
        self
    }

    pub fn fail_create_variable(self, message: impl Into<String>) -> Self {
        *self.fail_create_variable.write() = Some(message.into());
        self
    }

    /// Make create calls take `latency` before answering.
    pub fn with_latency(self, latency: Duration) -> Self {
        *self.latency.write() = Some(latency);
        self
    }

    /// Make variable import calls take `latency` before answering.
    pub fn with_import_latency(self, latency: Duration) -> Self {
        *self.import_latency.write() = Some(latency);
        self
    }

    /// Stop failing deploy calls.
    pub fn heal_deploy(&self) {
        *self.fail_deploy.write() = None;
    }

    pub fn clear_calls(&self) {
        self.captured_calls.write().clear();
    }

    pub fn get_calls(&self) -> Vec<CapturedCall> {
        self.captured_calls.read().clone()
    }

    pub fn call_count(&self) -> usize {
        self.captured_calls.read().len()
    }

    pub fn was_called(&self, method: &str) -> bool {
        self.captured_calls.read().iter().any(|c| c.method() == method)
    }

    pub fn get_method_calls(&self, method: &str) -> Vec<CapturedCall> {
        self.captured_calls
            .read()
            .iter()
            .filter(|c| c.method() == method)
            .cloned()
            .collect()
    }

    /// Deploy requests received, in order.
    pub fn deploys(&self) -> Vec<DeployRequest> {
        self.captured_calls
            .read()
            .iter()
            .filter_map(|c| match c {
                CapturedCall::Deploy(request) => Some(request.clone()),
                _ => None,
            })
            .collect()
    }

    /// Single variable creations received, in order.
    pub fn created_variables(&self) -> Vec<VariableRequest> {
        self.captured_calls
            .read()
            .iter()
            .filter_map(|c| match c {
                CapturedCall::CreateVariable(request) => Some(request.clone()),
                _ => None,
            })
            .collect()
    }

    fn record_call(&self, call: CapturedCall) {
        self.captured_calls.write().push(call);
    }

    fn check_failure(slot: &RwLock<Option<String>>) -> ApiResult<()> {
        if let Some(message) = slot.read().clone() {
            return Err(ApiError::Rejected(message));
        }
        Ok(())
    }
}

#[async_trait]
impl ServiceApi for RecordingServiceApi {
    async fn create_service(
        &self,
        environment_id: &str,
        request: &CreateRequest,
    ) -> ApiResult<CreatedService> {
        self.record_call(CapturedCall::Create {
            environment_id: environment_id.to_string(),
            request: request.clone(),
        });
        let latency = *self.latency.read();
        if let Some(latency) = latency {
            tokio::time::sleep(latency).await;
        }
        Self::check_failure(&self.fail_create)?;

        let n = self.created.fetch_add(1, Ordering::SeqCst) + 1;
        let id = self
            .service_ids
            .write()
            .pop_front()
            .unwrap_or_else(|| format!("svc-{}", n));
        Ok(CreatedService { id })
    }

    async fn deploy_service(&self, request: &DeployRequest) -> ApiResult<()> {
        self.record_call(CapturedCall::Deploy(request.clone()));
        Self::check_failure(&self.fail_deploy)
    }

    async fn import_variables(
        &self,
        service: &ServiceRef,
        request: &VariableImportRequest,
    ) -> ApiResult<()> {
        self.record_call(CapturedCall::ImportVariables {
            service: service.clone(),
            request: request.clone(),
        });
        let latency = *self.import_latency.read();
        if let Some(latency) = latency {
            tokio::time::sleep(latency).await;
        }
        Self::check_failure(&self.fail_import)
    }

    async fn create_variable(&self, request: &VariableRequest) -> ApiResult<()> {
        self.record_call(CapturedCall::CreateVariable(request.clone()));
        Self::check_failure(&self.fail_create_variable)
    }
}

/// Template source that fails a fixed number of times before answering.
#[derive(Clone, Default)]
pub struct ScriptedTemplateSource {
    template: Arc<RwLock<TemplatePrefill>>,
    failures_left: Arc<AtomicUsize>,
    fetches: Arc<AtomicUsize>,
}

impl ScriptedTemplateSource {
    pub fn new(template: TemplatePrefill) -> Self {
        Self {
            template: Arc::new(RwLock::new(template)),
            failures_left: Arc::new(AtomicUsize::new(0)),
            fetches: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Fail the next `count` fetches.
    pub fn failing(self, count: usize) -> Self {
        self.failures_left.store(count, Ordering::SeqCst);
        self
    }

    pub fn fetch_count(&self) -> usize {
        self.fetches.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl TemplateSource for ScriptedTemplateSource {
    async fn fetch_template(&self, template_id: &str) -> ApiResult<TemplatePrefill> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        let left = self.failures_left.load(Ordering::SeqCst);
        if left > 0 {
            self.failures_left.store(left - 1, Ordering::SeqCst);
            return Err(ApiError::Unavailable(format!("template {}", template_id)));
        }
        Ok(self.template.read().clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::variant::ServiceType;

    fn deploy(id: &str) -> DeployRequest {
        DeployRequest {
            service_id: id.to_string(),
            service_type: ServiceType::Application,
            dry_run: None,
        }
    }

    #[tokio::test]
    async fn test_mock_records_deploys() {
        let api = RecordingServiceApi::new();
        api.deploy_service(&deploy("svc-1")).await.unwrap();

        assert_eq!(api.call_count(), 1);
        assert!(api.was_called("deploy_service"));
        assert!(!api.was_called("create_service"));
        assert_eq!(api.deploys(), vec![deploy("svc-1")]);

        api.clear_calls();
        assert_eq!(api.call_count(), 0);
    }

    #[tokio::test]
    async fn test_mock_simulated_failure() {
        let api = RecordingServiceApi::new().fail_deploy("cluster unreachable");
        let result = api.deploy_service(&deploy("svc-1")).await;
        assert!(matches!(result, Err(ApiError::Rejected(_))));
        // Failed calls are still captured.
        assert_eq!(api.get_method_calls("deploy_service").len(), 1);

        api.heal_deploy();
        assert!(api.deploy_service(&deploy("svc-1")).await.is_ok());
    }

    #[tokio::test]
    async fn test_template_source_fails_then_answers() {
        let source = ScriptedTemplateSource::new(TemplatePrefill {
            name: Some("from-template".to_string()),
            ..TemplatePrefill::default()
        })
        .failing(1);

        assert!(source.fetch_template("t-1").await.is_err());
        let template = source.fetch_template("t-1").await.unwrap();
        assert_eq!(template.name.as_deref(), Some("from-template"));
        assert_eq!(source.fetch_count(), 2);
    }
}
