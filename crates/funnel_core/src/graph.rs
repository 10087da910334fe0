//! Step graphs per variant and their materialization against a draft.

use std::collections::HashMap;

use tracing::debug;

use crate::draft::{Draft, Section};
use crate::error::{CoreError, CoreResult};
use crate::sections::{declares_no_port, source_kind, SourceKind};
use crate::step::{StepDefinition, StepId};
use crate::variant::Variant;

fn registry_source(draft: &Draft) -> bool {
    source_kind(draft) == Some(SourceKind::Registry)
}

const GENERAL: StepDefinition = StepDefinition::new(StepId::General, "General information")
    .owns(&[Section::General])
    .requires(&[Section::General]);

const RESOURCES: StepDefinition = StepDefinition::new(StepId::Resources, "Resources")
    .owns(&[Section::Resources])
    .requires(&[Section::Resources]);

const PORTS: StepDefinition = StepDefinition::new(StepId::Ports, "Ports")
    .owns(&[Section::Ports])
    .requires(&[Section::Ports]);

const HEALTHCHECKS: StepDefinition = StepDefinition::new(StepId::Healthchecks, "Healthchecks")
    .owns(&[Section::Healthchecks])
    .requires(&[Section::Ports, Section::Healthchecks])
    .skip_if(declares_no_port);

const VARIABLES: StepDefinition = StepDefinition::new(StepId::Variables, "Environment variables")
    .owns(&[Section::Variables])
    .requires(&[Section::Variables]);

const DOCKERFILE: StepDefinition = StepDefinition::new(StepId::Dockerfile, "Dockerfile")
    .owns(&[Section::Dockerfile])
    .requires(&[Section::General, Section::Dockerfile])
    .skip_if(registry_source);

const CONFIGURE: StepDefinition = StepDefinition::new(StepId::Configure, "Configure job")
    .owns(&[Section::Configure])
    .requires(&[Section::Configure]);

const VALUES_OVERRIDE_FILE: StepDefinition =
    StepDefinition::new(StepId::ValuesOverrideFile, "Values override as file")
        .owns(&[Section::ValuesOverrideFile])
        .requires(&[Section::ValuesOverrideFile]);

const VALUES_OVERRIDE_ARGUMENTS: StepDefinition =
    StepDefinition::new(StepId::ValuesOverrideArguments, "Values override as arguments")
        .owns(&[Section::ValuesOverrideArguments])
        .requires(&[Section::ValuesOverrideArguments]);

const TERRAFORM_CONFIGURATION: StepDefinition =
    StepDefinition::new(StepId::Configuration, "Terraform configuration")
        .owns(&[Section::Configuration])
        .requires(&[Section::Configuration]);

const INPUT_VARIABLES: StepDefinition =
    StepDefinition::new(StepId::InputVariables, "Input variables")
        .owns(&[Section::InputVariables])
        .requires(&[Section::InputVariables]);

const SUMMARY: StepDefinition = StepDefinition::new(StepId::Summary, "Summary");

/// Ordered steps of one variant.
#[derive(Debug, Clone)]
pub struct StepGraph {
    variant: Variant,
    steps: Vec<StepDefinition>,
}

impl StepGraph {
    /// Create an empty graph for a variant.
    pub fn new(variant: Variant) -> Self {
        Self {
            variant,
            steps: Vec::new(),
        }
    }

    /// Add a step.
    pub fn step(mut self, step: StepDefinition) -> Self {
        self.steps.push(step);
        self
    }

    /// Add multiple steps.
    pub fn steps(mut self, steps: impl IntoIterator<Item = StepDefinition>) -> Self {
        self.steps.extend(steps);
        self
    }

    /// The static graph for a variant.
    pub fn steps_for(variant: Variant) -> Self {
        let graph = Self::new(variant);
        match variant {
            Variant::ApplicationGit | Variant::ApplicationContainer => {
                graph.steps([GENERAL, RESOURCES, PORTS, HEALTHCHECKS, VARIABLES, SUMMARY])
            }
            Variant::CronJob | Variant::LifecycleJob => {
                graph.steps([GENERAL, DOCKERFILE, CONFIGURE, RESOURCES, VARIABLES, SUMMARY])
            }
            Variant::Helm => graph.steps([
                GENERAL,
                VALUES_OVERRIDE_FILE,
                VALUES_OVERRIDE_ARGUMENTS,
                SUMMARY,
            ]),
            Variant::Terraform => {
                graph.steps([GENERAL, TERRAFORM_CONFIGURATION, INPUT_VARIABLES, SUMMARY])
            }
            Variant::Database => graph.steps([GENERAL, RESOURCES, SUMMARY]),
        }
    }

    pub fn variant(&self) -> Variant {
        self.variant
    }

    pub fn definitions(&self) -> &[StepDefinition] {
        &self.steps
    }

    pub fn get(&self, id: StepId) -> Option<&StepDefinition> {
        self.steps.iter().find(|s| s.id == id)
    }

    pub fn contains(&self, id: StepId) -> bool {
        self.get(id).is_some()
    }

    /// Step owning a section, if any.
    pub fn owner_of(&self, section: Section) -> Option<&StepDefinition> {
        self.steps.iter().find(|s| s.owns_section(section))
    }

    /// Steps that apply to the draft, in graph order.
    pub fn materialize(&self, draft: &Draft) -> CoreResult<Vec<StepDefinition>> {
        materialize(&self.steps, draft).map_err(|_| CoreError::EmptyFlow(self.variant.to_string()))
    }

    /// Check the structural invariants of the graph.
    ///
    /// Every required section must be owned by the step itself or an earlier
    /// one, and no section may have two owners.
    pub fn verify(&self) -> CoreResult<()> {
        if self.steps.is_empty() {
            return Err(CoreError::EmptyFlow(self.variant.to_string()));
        }

        let mut owners: HashMap<Section, StepId> = HashMap::new();
        for step in &self.steps {
            for section in step.owns {
                if let Some(first) = owners.insert(*section, step.id) {
                    return Err(CoreError::DuplicateOwner {
                        section: section.to_string(),
                        first: first.to_string(),
                        second: step.id.to_string(),
                    });
                }
            }
            for section in step.required_sections {
                if !owners.contains_key(section) {
                    return Err(CoreError::ForwardDependency {
                        step: step.id.to_string(),
                        section: section.to_string(),
                    });
                }
            }
        }
        Ok(())
    }
}

/// Filter out steps whose skip predicate holds, preserving relative order.
///
/// An empty result is a broken flow, not a finished one.
pub fn materialize(steps: &[StepDefinition], draft: &Draft) -> CoreResult<Vec<StepDefinition>> {
    let materialized: Vec<StepDefinition> = steps
        .iter()
        .filter(|step| {
            let applies = step.applies_to(draft);
            if !applies {
                debug!("Step {} skipped for current draft", step.id);
            }
            applies
        })
        .copied()
        .collect();

    if materialized.is_empty() {
        return Err(CoreError::EmptyFlow("materialized step list".to_string()));
    }
    debug!("Materialized {} of {} steps", materialized.len(), steps.len());
    Ok(materialized)
}
