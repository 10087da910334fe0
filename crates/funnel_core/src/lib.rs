//! # funnel_core
//!
//! Core of the funnel service creation wizard.
//!
//! This crate drives a multi-step creation flow for one service variant:
//! it stores the draft, decides which steps apply, validates each step,
//! assembles the create payload and submits it through a service API.
//!
//! # Architecture
//!
//! - **Draft**: section-keyed store written by the step owning each section
//! - **Steps**: declarations of owned and required sections plus a skip predicate
//! - **Graph**: ordered steps of a variant, materialized against the draft
//! - **Navigator**: next/previous over the materialized list
//! - **Validator**: per-step field errors gating navigation
//! - **Request**: pure draft to payload builder
//! - **Submission**: create, import variables, deploy
//! - **Session**: ties the above together for one user flow
//!
//! # Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use funnel_core::{
//!     Advance, RequestBuilder, Section, SubmissionController, SubmitAction, Variant,
//!     WizardConfig, WizardSession,
//! };
//!
//! let config = WizardConfig::default();
//! let builder = RequestBuilder::new(config.to_build_defaults());
//! let mut session = WizardSession::new(Variant::Database)?;
//!
//! session.set_section(Section::General, &general)?;
//! session.advance()?;
//! session.set_section(Section::Resources, &resources)?;
//! session.advance()?;
//!
//! let request = session.request(&builder)?;
//! let controller = SubmissionController::new(Arc::new(api), "env-1");
//! let report = controller.submit(SubmitAction::CreateAndDeploy, &request, None).await?;
//! ```

pub mod api;
pub mod args;
pub mod config;
pub mod draft;
pub mod error;
pub mod graph;
pub mod mock;
pub mod navigator;
pub mod request;
pub mod sections;
pub mod session;
pub mod step;
pub mod submission;
pub mod validator;
pub mod variant;

// Re-export main types for convenience
pub use api::{ApiError, ApiResult, CreatedService, ServiceApi, TemplatePrefill, TemplateSource};
pub use args::{tokenize, tokenize_opt, ArgumentParseError};
pub use config::{WizardConfig, CONFIG_FILE_NAME};
pub use draft::{Draft, Section};
pub use error::{CoreError, CoreResult};
pub use graph::{materialize, StepGraph};
pub use mock::{CapturedCall, RecordingServiceApi, ScriptedTemplateSource};
pub use navigator::Navigator;
pub use request::{
    build, file_variables, variable_import_request, BuildDefaults, CreateRequest, DeployRequest,
    FileVariable, RequestBuilder, ServiceRef, VariableImportRequest, VariableRequest,
};
pub use session::{fetch_prefill, Advance, Back, SessionGuard, WizardSession};
pub use step::{StepDefinition, StepId};
pub use submission::{
    SubmissionController, SubmissionError, SubmissionOutcome, SubmissionReport, SubmissionState,
    SubmitAction, VariableImportStatus,
};
pub use validator::{FieldError, StepValidator, ValidationResult};
pub use variant::{ServiceType, Variant};
