//! Step definitions.
//!
//! Steps are the building blocks of a creation flow. Each one collects a
//! slice of the draft, declares which sections it writes and which it reads,
//! and carries a skip predicate evaluated against the current draft.
//!
//! # Step Lifecycle
//!
//! 1. **Declaration**: a [`StepGraph`](crate::graph::StepGraph) lists the
//!    steps of a variant in order.
//! 2. **Materialization**: steps whose `skip_if` holds for the draft are
//!    dropped from the visible list.
//! 3. **Validation**: the step's validator gates the "continue" action.
//! 4. **Navigation**: the navigator moves to the next materialized step.

use serde::{Deserialize, Serialize};

use crate::draft::{Draft, Section};

/// Step identifiers, shared across variants.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum StepId {
    General,
    Dockerfile,
    Configure,
    Resources,
    Ports,
    Healthchecks,
    Variables,
    ValuesOverrideFile,
    ValuesOverrideArguments,
    Configuration,
    InputVariables,
    Summary,
}

impl StepId {
    pub fn as_str(&self) -> &'static str {
        match self {
            StepId::General => "general",
            StepId::Dockerfile => "dockerfile",
            StepId::Configure => "configure",
            StepId::Resources => "resources",
            StepId::Ports => "ports",
            StepId::Healthchecks => "healthchecks",
            StepId::Variables => "variables",
            StepId::ValuesOverrideFile => "values-override-file",
            StepId::ValuesOverrideArguments => "values-override-arguments",
            StepId::Configuration => "configuration",
            StepId::InputVariables => "input-variables",
            StepId::Summary => "summary",
        }
    }
}

impl std::fmt::Display for StepId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Skip predicate type.
pub type SkipPredicate = fn(&Draft) -> bool;

fn never_skip(_draft: &Draft) -> bool {
    false
}

/// Declarative description of one step.
#[derive(Debug, Clone, Copy)]
pub struct StepDefinition {
    pub id: StepId,
    pub title: &'static str,
    /// Sections this step writes. No other step may write them.
    pub owns: &'static [Section],
    /// Sections the step's validator reads, including its own.
    pub required_sections: &'static [Section],
    pub skip_if: SkipPredicate,
}

impl StepDefinition {
    pub const fn new(id: StepId, title: &'static str) -> Self {
        Self {
            id,
            title,
            owns: &[],
            required_sections: &[],
            skip_if: never_skip,
        }
    }

    pub const fn owns(mut self, sections: &'static [Section]) -> Self {
        self.owns = sections;
        self
    }

    pub const fn requires(mut self, sections: &'static [Section]) -> Self {
        self.required_sections = sections;
        self
    }

    pub const fn skip_if(mut self, predicate: SkipPredicate) -> Self {
        self.skip_if = predicate;
        self
    }

    /// Whether the step applies to the given draft.
    pub fn applies_to(&self, draft: &Draft) -> bool {
        !(self.skip_if)(draft)
    }

    pub fn owns_section(&self, section: Section) -> bool {
        self.owns.contains(&section)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn always(_draft: &Draft) -> bool {
        true
    }

    #[test]
    fn test_step_builder() {
        let step = StepDefinition::new(StepId::Ports, "Ports")
            .owns(&[Section::Ports])
            .requires(&[Section::Ports]);

        assert!(step.owns_section(Section::Ports));
        assert!(!step.owns_section(Section::General));
        assert!(step.applies_to(&Draft::new()));

        let skipped = step.skip_if(always);
        assert!(!skipped.applies_to(&Draft::new()));
    }

    #[test]
    fn test_step_id_display() {
        assert_eq!(StepId::ValuesOverrideFile.to_string(), "values-override-file");
        assert_eq!(StepId::Summary.as_str(), "summary");
    }
}
