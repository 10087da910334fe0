//! Build command - Print the create payload of a draft.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;
use serde::Serialize;
use tracing::info;

use funnel_core::{CoreError, CreateRequest, FileVariable, RequestBuilder, VariableImportRequest};

use super::{
    load_config, load_draft, print_validation, replay, DraftArgs, FileTemplateSource, GlobalArgs,
    Replay,
};

#[derive(Args)]
pub struct BuildArgs {
    #[command(flatten)]
    draft: DraftArgs,

    /// Template file used to prefill the draft
    #[arg(long)]
    template: Option<PathBuf>,

    /// Write the payload to a file instead of stdout
    #[arg(short, long)]
    output: Option<PathBuf>,
}

/// Everything submission would send.
#[derive(Serialize)]
pub struct BuiltPayload {
    pub create: CreateRequest,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub variables: Option<VariableImportRequest>,
    /// File variables, created one by one after the service.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub files: Vec<FileVariable>,
}

/// Replay a draft and build its payload, failing on the first incomplete step.
pub async fn build_payload(
    draft_args: &DraftArgs,
    template: Option<&PathBuf>,
    global: &GlobalArgs,
) -> Result<(Replay, BuiltPayload)> {
    let config = load_config(global)?;
    let draft = load_draft(draft_args.draft.as_deref())?;
    let template = template.map(FileTemplateSource::new).transpose()?;

    let replay = replay(draft_args.variant, &draft, template.as_ref(), &config).await?;
    if !replay.ready {
        if let Some((step, result)) = replay.visited.last() {
            print_validation(*step, result);
            return Err(CoreError::StepIncomplete {
                step: step.to_string(),
                errors: result.messages(),
            }
            .into());
        }
    }

    let builder = RequestBuilder::new(config.to_build_defaults());
    let create = replay.session.request(&builder)?;
    let variables = replay.session.variable_import(&builder)?;
    let files = replay.session.file_variables(&builder)?;
    Ok((
        replay,
        BuiltPayload {
            create,
            variables,
            files,
        },
    ))
}

pub async fn execute(args: BuildArgs, global: &GlobalArgs) -> Result<()> {
    info!("Building {} payload", args.draft.variant);
    let (_, payload) = build_payload(&args.draft, args.template.as_ref(), global).await?;
    let json = serde_json::to_string_pretty(&payload)?;

    match &args.output {
        Some(path) => {
            std::fs::write(path, &json)
                .with_context(|| format!("Failed to write {}", path.display()))?;
            println!("✅ Payload written to {}", path.display());
        }
        None => println!("{}", json),
    }
    Ok(())
}
