//! CLI command definitions.
//!
//! Each subcommand takes a variant and a draft file (YAML or JSON, keyed by
//! section name) and runs it through the wizard core.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use async_trait::async_trait;
use clap::{Args, Parser, Subcommand};
use thiserror::Error;
use tracing::{debug, info};

use funnel_core::{
    Advance, ApiError, ApiResult, Draft, StepId, TemplatePrefill, TemplateSource,
    ValidationResult, Variant, WizardConfig, WizardSession, CONFIG_FILE_NAME,
};

pub mod build;
pub mod steps;
pub mod submit;
pub mod validate;

/// funnel - service creation wizard
#[derive(Parser)]
#[command(name = "funnel")]
#[command(version, about = "funnel - service creation wizard")]
#[command(long_about = r#"
funnel walks a draft through the creation flow of a service variant:
it materializes the steps, validates each one, builds the create payload
and submits it.

VARIANTS:
  application-git, application-container, database, cron-job,
  lifecycle-job, helm, terraform

COMMANDS:
  steps     → List the steps that apply to a draft
  validate  → Validate every step of a draft
  build     → Print the create payload of a draft
  submit    → Create (and deploy) through the outbox

EXIT CODES:
  0 - Success
  1 - General error
  2 - Invalid arguments
  3 - Validation failure
  4 - Submission failure
"#)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Suppress non-essential output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Emit logs as JSON lines
    #[arg(long, global = true, env = "FUNNEL_JSON_LOGS")]
    pub json_logs: bool,

    #[command(flatten)]
    pub global: GlobalArgs,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Args, Debug, Clone)]
pub struct GlobalArgs {
    /// Configuration file (defaults to ./funnel.toml when present)
    #[arg(short, long, global = true, env = "FUNNEL_CONFIG")]
    pub config: Option<PathBuf>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// List the steps that apply to a draft
    Steps(steps::StepsArgs),

    /// Validate the steps of a draft
    Validate(validate::ValidateArgs),

    /// Build the create payload of a draft
    Build(build::BuildArgs),

    /// Submit a draft through the outbox
    Submit(submit::SubmitArgs),
}

/// Variant and draft shared by every command.
#[derive(Args, Debug, Clone)]
pub struct DraftArgs {
    /// Service variant (e.g. application-git, helm, terraform)
    #[arg(long)]
    pub variant: Variant,

    /// Draft file, YAML or JSON
    #[arg(short, long)]
    pub draft: Option<PathBuf>,
}

/// Problems with the command inputs themselves.
#[derive(Error, Debug)]
pub enum InputError {
    #[error("Draft file not found: {0}")]
    DraftNotFound(PathBuf),

    #[error("Unsupported draft format: {0} (expected .yaml, .yml or .json)")]
    UnsupportedFormat(PathBuf),

    #[error("Template file not found: {0}")]
    TemplateNotFound(PathBuf),
}

/// Load the configuration named on the command line, or the default file.
pub fn load_config(global: &GlobalArgs) -> Result<WizardConfig> {
    match &global.config {
        Some(path) => WizardConfig::load(path)
            .with_context(|| format!("Failed to load configuration {}", path.display())),
        None => Ok(WizardConfig::load_or_default(Path::new(CONFIG_FILE_NAME))?),
    }
}

/// Read a draft file. A missing path yields an empty draft.
pub fn load_draft(path: Option<&Path>) -> Result<Draft> {
    let Some(path) = path else {
        return Ok(Draft::new());
    };
    if !path.exists() {
        return Err(InputError::DraftNotFound(path.to_path_buf()).into());
    }

    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    let draft = match path.extension().and_then(|e| e.to_str()) {
        Some("yaml") | Some("yml") => Draft::from_yaml_str(&content)?,
        Some("json") => Draft::from_json_str(&content)?,
        _ => return Err(InputError::UnsupportedFormat(path.to_path_buf()).into()),
    };
    debug!("Loaded draft with {} sections from {}", draft.sections().count(), path.display());
    Ok(draft)
}

/// Template prefill read from a local YAML or JSON file.
pub struct FileTemplateSource {
    path: PathBuf,
}

impl FileTemplateSource {
    pub fn new(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        if !path.exists() {
            return Err(InputError::TemplateNotFound(path).into());
        }
        Ok(Self { path })
    }
}

#[async_trait]
impl TemplateSource for FileTemplateSource {
    async fn fetch_template(&self, _template_id: &str) -> ApiResult<TemplatePrefill> {
        let content = tokio::fs::read_to_string(&self.path).await?;
        match self.path.extension().and_then(|e| e.to_str()) {
            Some("json") => Ok(serde_json::from_str(&content)?),
            _ => serde_yaml::from_str(&content).map_err(|e| ApiError::Rejected(e.to_string())),
        }
    }
}

/// Outcome of replaying a draft through a session.
pub struct Replay {
    pub session: WizardSession,
    /// Validation of every step visited, in order.
    pub visited: Vec<(StepId, ValidationResult)>,
    pub ready: bool,
}

/// Feed a draft to a new session step by step, as a user would.
///
/// Each step receives the sections it owns from the draft, then the session
/// advances. Replay stops at the first step that does not validate.
pub async fn replay(
    variant: Variant,
    draft: &Draft,
    template: Option<&FileTemplateSource>,
    config: &WizardConfig,
) -> Result<Replay> {
    let mut session = WizardSession::new(variant)?;
    if let Some(source) = template {
        session.prefill_from(source, variant.as_str(), &config.template).await?;
    }

    let mut visited = Vec::new();
    loop {
        let step = session.current_step();
        let owned = session
            .steps()
            .iter()
            .find(|s| s.id == step)
            .map(|s| s.owns)
            .unwrap_or_default();
        for section in owned {
            if let Some(value) = draft.get(*section) {
                session.set_section(*section, value)?;
            }
        }

        let validation = session.validate_current();
        let valid = validation.valid;
        visited.push((step, validation));
        if !valid {
            info!("Replay stopped at incomplete step {}", step);
            return Ok(Replay {
                session,
                visited,
                ready: false,
            });
        }

        if session.advance()? == Advance::ReadyToSubmit {
            return Ok(Replay {
                session,
                visited,
                ready: true,
            });
        }
    }
}

/// Print a validation result the way every command does.
pub fn print_validation(step: StepId, result: &ValidationResult) {
    if result.valid {
        println!("   ✅ {}", step);
    } else {
        println!("   ❌ {}", step);
        for error in &result.errors {
            println!("      - {}", error);
        }
    }
    for warning in &result.warnings {
        println!("   ⚠️  {}", warning);
    }
}
