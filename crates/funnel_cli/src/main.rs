//! funnel CLI - Main entry point.
//!
//! Exit codes:
//! - 0: Success
//! - 1: General error
//! - 2: Invalid arguments
//! - 3: Validation failure
//! - 4: Submission failure

use std::process::ExitCode;

use clap::Parser;
use funnel_core::{CoreError, SubmissionError};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

mod commands;
mod outbox;

use commands::{Cli, Commands, InputError};

/// CI-friendly exit codes
pub struct ExitCodes;

impl ExitCodes {
    pub const SUCCESS: u8 = 0;
    pub const GENERAL_ERROR: u8 = 1;
    pub const INVALID_ARGS: u8 = 2;
    pub const VALIDATION_FAILURE: u8 = 3;
    pub const SUBMISSION_FAILURE: u8 = 4;
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let level = if cli.verbose {
        "funnel=debug"
    } else if cli.quiet {
        "funnel=warn"
    } else {
        "funnel=info"
    };
    let mut filter = EnvFilter::from_default_env().add_directive(tracing::Level::WARN.into());
    if let Ok(directive) = level.parse() {
        filter = filter.add_directive(directive);
    }
    let registry = tracing_subscriber::registry().with(filter);
    let log_result = if cli.json_logs {
        registry
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .try_init()
    } else {
        registry
            .with(fmt::layer().with_target(false).with_writer(std::io::stderr))
            .try_init()
    };

    if log_result.is_err() {
        // Logging already initialized, continue
    }

    let result = match cli.command {
        Commands::Steps(args) => commands::steps::execute(args, &cli.global).await,
        Commands::Validate(args) => commands::validate::execute(args, &cli.global).await,
        Commands::Build(args) => commands::build::execute(args, &cli.global).await,
        Commands::Submit(args) => commands::submit::execute(args, &cli.global).await,
    };

    match result {
        Ok(()) => ExitCode::from(ExitCodes::SUCCESS),
        Err(e) => {
            let exit_code = categorize_error(&e);
            eprintln!("Error: {:#}", e);
            ExitCode::from(exit_code)
        }
    }
}

/// Categorize error to determine exit code
fn categorize_error(e: &anyhow::Error) -> u8 {
    for cause in e.chain() {
        if let Some(error) = cause.downcast_ref::<SubmissionError>() {
            return match error {
                SubmissionError::CreateFailed(_) => ExitCodes::SUBMISSION_FAILURE,
                _ => ExitCodes::GENERAL_ERROR,
            };
        }
        if let Some(error) = cause.downcast_ref::<CoreError>() {
            return match error {
                CoreError::StepIncomplete { .. }
                | CoreError::MissingSection(_)
                | CoreError::MalformedSection { .. }
                | CoreError::InvalidValue { .. }
                | CoreError::Arguments { .. } => ExitCodes::VALIDATION_FAILURE,
                CoreError::InvalidVariant(_) | CoreError::Config(_) => ExitCodes::INVALID_ARGS,
                _ => ExitCodes::GENERAL_ERROR,
            };
        }
        if cause.downcast_ref::<InputError>().is_some() {
            return ExitCodes::INVALID_ARGS;
        }
    }

    let msg = e.to_string().to_lowercase();
    if msg.contains("validation") {
        ExitCodes::VALIDATION_FAILURE
    } else if msg.contains("deploy") || msg.contains("submission") {
        ExitCodes::SUBMISSION_FAILURE
    } else if msg.contains("argument") || msg.contains("not found") {
        ExitCodes::INVALID_ARGS
    } else {
        ExitCodes::GENERAL_ERROR
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Context;

    #[test]
    fn test_categorize_core_errors() {
        let incomplete = anyhow::Error::new(CoreError::StepIncomplete {
            step: "general".to_string(),
            errors: vec!["general.name: Name is required".to_string()],
        });
        assert_eq!(categorize_error(&incomplete), ExitCodes::VALIDATION_FAILURE);

        let variant: anyhow::Result<()> =
            Err(CoreError::InvalidVariant("lambda".to_string()).into());
        let variant = variant.context("Reading arguments").unwrap_err();
        assert_eq!(categorize_error(&variant), ExitCodes::INVALID_ARGS);
    }

    #[test]
    fn test_categorize_submission_errors() {
        let failed = anyhow::Error::new(SubmissionError::CreateFailed(
            funnel_core::ApiError::Rejected("quota".to_string()),
        ));
        assert_eq!(categorize_error(&failed), ExitCodes::SUBMISSION_FAILURE);
    }

    #[test]
    fn test_categorize_by_message() {
        assert_eq!(
            categorize_error(&anyhow::anyhow!("Service created but deploy failed")),
            ExitCodes::SUBMISSION_FAILURE
        );
        assert_eq!(
            categorize_error(&anyhow::anyhow!("something else")),
            ExitCodes::GENERAL_ERROR
        );
    }
}
