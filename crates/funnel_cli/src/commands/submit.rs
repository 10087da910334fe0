//! Submit command - Create (and deploy) a service through the outbox.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Args;
use tracing::{info, warn};

use funnel_core::{SubmissionController, SubmissionOutcome, SubmitAction, VariableImportStatus};

use super::build::build_payload;
use super::{DraftArgs, GlobalArgs};
use crate::outbox::OutboxApi;

#[derive(Args)]
pub struct SubmitArgs {
    #[command(flatten)]
    draft: DraftArgs,

    /// Environment the service is created in
    #[arg(short, long, env = "FUNNEL_ENVIRONMENT")]
    environment: String,

    /// Project of the environment, parent of project scoped file variables
    #[arg(short, long, env = "FUNNEL_PROJECT")]
    project: Option<String>,

    /// Outbox directory receiving the calls
    #[arg(long, default_value = "outbox")]
    outbox: PathBuf,

    /// Deploy right after creation (terraform plans only)
    #[arg(long)]
    deploy: bool,

    /// Template file used to prefill the draft
    #[arg(long)]
    template: Option<PathBuf>,
}

pub async fn execute(args: SubmitArgs, global: &GlobalArgs) -> Result<()> {
    let (mut replay, payload) = build_payload(&args.draft, args.template.as_ref(), global).await?;

    let api = OutboxApi::new(&args.outbox)
        .with_context(|| format!("Failed to open outbox {}", args.outbox.display()))?;
    info!("Writing calls to outbox {}", api.dir().display());
    let mut controller = SubmissionController::new(Arc::new(api), args.environment.clone());
    if let Some(project) = &args.project {
        controller = controller.with_project(project.clone());
    }
    let action = if args.deploy {
        SubmitAction::CreateAndDeploy
    } else {
        SubmitAction::Create
    };

    info!(
        "Submitting {} {} to environment {}",
        args.draft.variant,
        payload.create.name(),
        args.environment
    );
    let report = controller
        .submit_with_files(
            action,
            &payload.create,
            payload.variables.as_ref(),
            &payload.files,
        )
        .await?;

    print_variables("variables imported", &report.variables);
    print_variables("file variables created", &report.file_variables);

    match &report.outcome {
        SubmissionOutcome::Created { service_id } => {
            println!("✅ Service {} created", service_id);
        }
        SubmissionOutcome::Deployed {
            service_id,
            dry_run: true,
        } => {
            println!("✅ Service {} created, plan requested", service_id);
        }
        SubmissionOutcome::Deployed { service_id, .. } => {
            println!("✅ Service {} created and deployed", service_id);
        }
        SubmissionOutcome::CreatedNotDeployed {
            service_id,
            message,
        } => {
            warn!("Deploy of {} failed: {}", service_id, message);
            anyhow::bail!(
                "Service {} was created but deploy failed: {}",
                service_id,
                message
            );
        }
    }

    println!("   Outbox: {}", args.outbox.display());
    println!("{}", serde_json::to_string_pretty(&report)?);
    replay.session.complete()?;
    Ok(())
}

fn print_variables(label: &str, status: &VariableImportStatus) {
    match status {
        VariableImportStatus::Skipped => {}
        VariableImportStatus::Imported { count } => println!("   ✅ {} {}", count, label),
        VariableImportStatus::Failed { message } => {
            println!("   ⚠️  Not all {}: {}", label, message)
        }
    }
}
