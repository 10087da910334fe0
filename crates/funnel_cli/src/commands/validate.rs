//! Validate command - Validate the steps of a draft.

use anyhow::Result;
use clap::Args;
use tracing::info;

use funnel_core::{StepGraph, StepId, StepValidator, ValidationResult};

use super::{load_draft, print_validation, DraftArgs, GlobalArgs};

#[derive(Args)]
pub struct ValidateArgs {
    #[command(flatten)]
    draft: DraftArgs,

    /// Validate a single step (e.g. ports, healthchecks)
    #[arg(long)]
    step: Option<String>,
}

fn parse_step(name: &str) -> Result<StepId> {
    let quoted = serde_json::Value::String(name.replace('_', "-"));
    serde_json::from_value(quoted)
        .map_err(|_| anyhow::anyhow!("Invalid argument: unknown step {}", name))
}

pub async fn execute(args: ValidateArgs, _global: &GlobalArgs) -> Result<()> {
    let variant = args.draft.variant;
    let draft = load_draft(args.draft.draft.as_deref())?;
    info!("Validating {} draft", variant);

    let materialized = StepGraph::steps_for(variant).materialize(&draft)?;
    let steps: Vec<StepId> = match &args.step {
        Some(name) => {
            let step = parse_step(name)?;
            if !materialized.iter().any(|s| s.id == step) {
                anyhow::bail!("Invalid argument: step {} does not apply to this draft", step);
            }
            vec![step]
        }
        None => materialized.iter().map(|s| s.id).collect(),
    };

    println!("📋 Validating {} ({} steps)...", variant, steps.len());
    let mut overall = ValidationResult::new();
    for step in steps {
        let result = StepValidator::validate_step(variant, step, &draft);
        print_validation(step, &result);
        overall.merge(result);
    }

    println!();
    if overall.valid {
        println!("✅ All validations passed!");
        Ok(())
    } else {
        anyhow::bail!("Validation failed with {} error(s)", overall.errors.len())
    }
}
