//! Error types for the wizard core.

use thiserror::Error;

use crate::args::ArgumentParseError;

/// Result type alias for core operations.
pub type CoreResult<T> = Result<T, CoreError>;

/// Errors that can occur while driving a creation flow.
#[derive(Error, Debug)]
pub enum CoreError {
    #[error("Unknown variant: {0}")]
    InvalidVariant(String),

    #[error("Flow for {0} has no applicable steps")]
    EmptyFlow(String),

    #[error("Missing section: {0}")]
    MissingSection(String),

    #[error("Malformed section {section}: {message}")]
    MalformedSection { section: String, message: String },

    #[error("Section {section} is not owned by step {step}")]
    SectionNotOwned { section: String, step: String },

    #[error("Step {step} requires section {section} produced by a later step")]
    ForwardDependency { step: String, section: String },

    #[error("Section {section} is owned by both {first} and {second}")]
    DuplicateOwner {
        section: String,
        first: String,
        second: String,
    },

    #[error("Step {step} is incomplete: {}", errors.join("; "))]
    StepIncomplete { step: String, errors: Vec<String> },

    #[error("Invalid arguments in {field}: {source}")]
    Arguments {
        field: String,
        #[source]
        source: ArgumentParseError,
    },

    #[error("Invalid value for {field}: {message}")]
    InvalidValue { field: String, message: String },

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl CoreError {
    pub fn invalid_value(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidValue {
            field: field.into(),
            message: message.into(),
        }
    }

    pub fn arguments(field: impl Into<String>, source: ArgumentParseError) -> Self {
        Self::Arguments {
            field: field.into(),
            source,
        }
    }
}
