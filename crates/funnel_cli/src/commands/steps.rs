//! Steps command - List the materialized steps of a draft.

use anyhow::Result;
use clap::Args;
use tracing::info;

use funnel_core::{StepGraph, StepValidator};

use super::{load_draft, DraftArgs, GlobalArgs};

#[derive(Args)]
pub struct StepsArgs {
    #[command(flatten)]
    draft: DraftArgs,

    /// Also list steps skipped for this draft
    #[arg(long)]
    all: bool,
}

pub async fn execute(args: StepsArgs, _global: &GlobalArgs) -> Result<()> {
    let variant = args.draft.variant;
    let draft = load_draft(args.draft.draft.as_deref())?;
    info!("Listing steps for {}", variant);

    let graph = StepGraph::steps_for(variant);
    let materialized = graph.materialize(&draft)?;

    println!("📋 Steps for {}:", variant);
    let mut position = 0;
    for step in graph.definitions() {
        let applies = materialized.iter().any(|s| s.id == step.id);
        if !applies {
            if args.all {
                println!("   ⏭️  {} ({}) - skipped", step.title, step.id);
            }
            continue;
        }
        position += 1;
        let marker = if StepValidator::is_complete(variant, step.id, &draft) {
            "✅"
        } else {
            "⬜"
        };
        println!("   {} {}. {} ({})", marker, position, step.title, step.id);
    }

    Ok(())
}
