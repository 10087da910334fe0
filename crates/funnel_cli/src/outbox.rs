//! File-backed service API.
//!
//! Every call is written as a JSON envelope into an outbox directory, where
//! another process (or a person) picks it up. Created services get a fresh
//! uuid as id.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;
use uuid::Uuid;

use funnel_core::{
    ApiResult, CreateRequest, CreatedService, DeployRequest, ServiceApi, ServiceRef,
    VariableImportRequest, VariableRequest,
};

/// One file in the outbox.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Envelope {
    pub kind: String,
    pub service_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub environment_id: Option<String>,
    pub written_at: DateTime<Utc>,
    pub payload: serde_json::Value,
}

pub struct OutboxApi {
    dir: PathBuf,
    sequence: AtomicUsize,
}

impl OutboxApi {
    /// Use `dir` as outbox, creating it if needed.
    pub fn new(dir: impl Into<PathBuf>) -> ApiResult<Self> {
        let dir = dir.into();
        std::fs::create_dir_all(&dir)?;
        Ok(Self {
            dir,
            sequence: AtomicUsize::new(0),
        })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    async fn write(
        &self,
        kind: &str,
        service_id: &str,
        environment_id: Option<&str>,
        payload: serde_json::Value,
    ) -> ApiResult<PathBuf> {
        let envelope = Envelope {
            kind: kind.to_string(),
            service_id: service_id.to_string(),
            environment_id: environment_id.map(str::to_string),
            written_at: Utc::now(),
            payload,
        };
        let n = self.sequence.fetch_add(1, Ordering::SeqCst) + 1;
        let path = self.dir.join(format!("{:03}-{}-{}.json", n, kind, service_id));
        tokio::fs::write(&path, serde_json::to_vec_pretty(&envelope)?).await?;
        debug!("Wrote {}", path.display());
        Ok(path)
    }
}

#[async_trait]
impl ServiceApi for OutboxApi {
    async fn create_service(
        &self,
        environment_id: &str,
        request: &CreateRequest,
    ) -> ApiResult<CreatedService> {
        let id = Uuid::new_v4().to_string();
        self.write("create", &id, Some(environment_id), serde_json::to_value(request)?)
            .await?;
        Ok(CreatedService { id })
    }

    async fn deploy_service(&self, request: &DeployRequest) -> ApiResult<()> {
        self.write("deploy", &request.service_id, None, serde_json::to_value(request)?)
            .await?;
        Ok(())
    }

    async fn import_variables(
        &self,
        service: &ServiceRef,
        request: &VariableImportRequest,
    ) -> ApiResult<()> {
        self.write("variables", &service.service_id, None, serde_json::to_value(request)?)
            .await?;
        Ok(())
    }

    async fn create_variable(&self, request: &VariableRequest) -> ApiResult<()> {
        self.write(
            "variable",
            &request.variable_parent_id,
            None,
            serde_json::to_value(request)?,
        )
        .await?;
        Ok(())
    }
}
