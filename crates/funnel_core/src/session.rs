//! A single creation session: draft, materialized steps and position.
//!
//! The session is the only writer of its draft. A step may only replace the
//! sections it owns, and every write recomputes the materialized step list
//! so that skip predicates see the latest data. Navigation and exit bump an
//! epoch; results of asynchronous work started under an older epoch are
//! dropped instead of being applied to a screen the user already left.

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::{Map, Value};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::api::{ApiResult, TemplatePrefill, TemplateSource};
use crate::config::TemplateConfig;
use crate::draft::{Draft, Section};
use crate::error::{CoreError, CoreResult};
use crate::graph::StepGraph;
use crate::navigator::Navigator;
use crate::request::{CreateRequest, FileVariable, RequestBuilder, VariableImportRequest};
use crate::step::{StepDefinition, StepId};
use crate::validator::{StepValidator, ValidationResult};
use crate::variant::Variant;

/// Snapshot of the session position, handed to asynchronous work.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionGuard {
    session_id: Uuid,
    epoch: u64,
}

/// Result of pressing "continue".
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Advance {
    Moved(StepId),
    /// The current step is the last one; the draft can be submitted.
    ReadyToSubmit,
}

/// Result of pressing "back".
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Back {
    Moved(StepId),
    /// Going back from the first step leaves the flow.
    Exit,
}

pub struct WizardSession {
    id: Uuid,
    created_at: DateTime<Utc>,
    graph: StepGraph,
    draft: Draft,
    materialized: Vec<StepDefinition>,
    current: StepId,
    epoch: u64,
}

impl WizardSession {
    /// Start a session on the first step of `variant`.
    pub fn new(variant: Variant) -> CoreResult<Self> {
        let graph = StepGraph::steps_for(variant);
        graph.verify()?;
        let draft = Draft::new();
        let materialized = graph.materialize(&draft)?;
        let current = Navigator::first(&materialized)?;

        let id = Uuid::new_v4();
        info!("Session {} started for {}", id, variant);
        Ok(Self {
            id,
            created_at: Utc::now(),
            graph,
            draft,
            materialized,
            current,
            epoch: 0,
        })
    }

    /// Discard everything and start over, possibly with another variant.
    pub fn restart(&mut self, variant: Variant) -> CoreResult<()> {
        let graph = StepGraph::steps_for(variant);
        graph.verify()?;
        let draft = Draft::new();
        let materialized = graph.materialize(&draft)?;
        self.current = Navigator::first(&materialized)?;
        self.graph = graph;
        self.draft = draft;
        self.materialized = materialized;
        self.bump();
        info!("Session {} restarted for {}", self.id, variant);
        Ok(())
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn variant(&self) -> Variant {
        self.graph.variant()
    }

    pub fn current_step(&self) -> StepId {
        self.current
    }

    /// Materialized steps, in order.
    pub fn steps(&self) -> &[StepDefinition] {
        &self.materialized
    }

    pub fn step_ids(&self) -> Vec<StepId> {
        self.materialized.iter().map(|s| s.id).collect()
    }

    pub fn draft(&self) -> &Draft {
        &self.draft
    }

    /// Position of the current step, 1-based, for progress display.
    pub fn progress(&self) -> (usize, usize) {
        let index = self
            .materialized
            .iter()
            .position(|s| s.id == self.current)
            .unwrap_or(0);
        (index + 1, self.materialized.len())
    }

    /// Replace a section owned by the current step.
    pub fn set_section<T: Serialize>(&mut self, section: Section, data: &T) -> CoreResult<()> {
        let owns = self
            .graph
            .get(self.current)
            .is_some_and(|step| step.owns_section(section));
        if !owns {
            return Err(CoreError::SectionNotOwned {
                section: section.to_string(),
                step: self.current.to_string(),
            });
        }

        self.draft.set(section, data)?;
        self.rematerialize()
    }

    fn rematerialize(&mut self) -> CoreResult<()> {
        self.materialized = self.graph.materialize(&self.draft)?;
        if !self.materialized.iter().any(|s| s.id == self.current) {
            let index = Navigator::resolve(&self.materialized, self.current)?;
            self.current = self.materialized[index].id;
            self.bump();
        }
        Ok(())
    }

    pub fn validate_current(&self) -> ValidationResult {
        StepValidator::validate_step(self.variant(), self.current, &self.draft)
    }

    /// Move forward if the current step validates.
    pub fn advance(&mut self) -> CoreResult<Advance> {
        let validation = self.validate_current();
        if !validation.valid {
            return Err(CoreError::StepIncomplete {
                step: self.current.to_string(),
                errors: validation.messages(),
            });
        }

        match Navigator::next(&self.materialized, self.current)? {
            Some(next) => {
                debug!("Advancing from {} to {}", self.current, next);
                self.current = next;
                self.bump();
                Ok(Advance::Moved(next))
            }
            None => Ok(Advance::ReadyToSubmit),
        }
    }

    /// Move back one step. The draft is kept.
    pub fn back(&mut self) -> CoreResult<Back> {
        match Navigator::previous(&self.materialized, self.current)? {
            Some(previous) => {
                self.current = previous;
                self.bump();
                Ok(Back::Moved(previous))
            }
            None => Ok(Back::Exit),
        }
    }

    /// Jump to a step by id. Steps that are not materialized resolve to the
    /// first step.
    pub fn goto(&mut self, step: StepId) -> CoreResult<StepId> {
        let target = if self.materialized.iter().any(|s| s.id == step) {
            step
        } else {
            warn!("Step {} is not available, opening the first step", step);
            Navigator::first(&self.materialized)?
        };
        self.current = target;
        self.bump();
        Ok(target)
    }

    /// Capture the current position before starting asynchronous work.
    pub fn guard(&self) -> SessionGuard {
        SessionGuard {
            session_id: self.id,
            epoch: self.epoch,
        }
    }

    /// True when nothing happened since `guard` was taken.
    pub fn is_current(&self, guard: &SessionGuard) -> bool {
        guard.session_id == self.id && guard.epoch == self.epoch
    }

    /// Seed the draft from a template fetched while the user could still
    /// navigate. Returns false when the result is stale.
    ///
    /// Only fields the draft does not hold yet are filled, and only in
    /// sections this variant has a step for.
    pub fn apply_prefill(
        &mut self,
        guard: &SessionGuard,
        template: &TemplatePrefill,
    ) -> CoreResult<bool> {
        if !self.is_current(guard) {
            debug!("Discarding stale template prefill for session {}", self.id);
            return Ok(false);
        }
        self.seed_template(template)?;
        Ok(true)
    }

    fn seed_template(&mut self, template: &TemplatePrefill) -> CoreResult<()> {
        let variant = self.variant();
        if let Some(name) = &template.name {
            self.seed(Section::General, &["name"], &[("name", Value::String(name.clone()))]);
        }
        if let Some(arguments) = &template.arguments {
            if variant.is_application() || variant.is_job() {
                self.seed(
                    Section::General,
                    &["cmd_arguments"],
                    &[("cmd_arguments", Value::String(arguments.clone()))],
                );
            }
        }
        if self.graph.owner_of(Section::Resources).is_some() {
            // A value is only meaningful with its unit: seed both or neither.
            if let Some(cpu) = template.cpu {
                self.seed(
                    Section::Resources,
                    &["cpu", "cpu_unit"],
                    &[
                        ("cpu", Value::from(cpu)),
                        ("cpu_unit", Value::String("MILLI".to_string())),
                    ],
                );
            }
            if let Some(memory) = template.memory {
                self.seed(
                    Section::Resources,
                    &["memory", "memory_unit", "unit"],
                    &[
                        ("memory", Value::from(memory)),
                        ("memory_unit", Value::String("MB".to_string())),
                    ],
                );
            }
        }
        if self.graph.owner_of(Section::Variables).is_some() && !template.variables.is_empty() {
            let variables = serde_json::to_value(&template.variables)
                .map_err(|e| CoreError::Serialization(e.to_string()))?;
            self.seed(Section::Variables, &["variables"], &[("variables", variables)]);
        }

        self.rematerialize()?;
        info!("Applied template prefill to session {}", self.id);
        Ok(())
    }

    /// Insert `entries` unless the section already holds any of `keys`.
    fn seed(&mut self, section: Section, keys: &[&str], entries: &[(&str, Value)]) {
        let mut object = match self.draft.get(section) {
            Some(Value::Object(object)) => object.clone(),
            _ => Map::new(),
        };
        if keys.iter().any(|key| object.contains_key(*key)) {
            return;
        }
        for (key, value) in entries {
            object.insert(key.to_string(), value.clone());
        }
        self.draft.set_value(section, Value::Object(object));
    }

    /// Fetch a template and seed the draft with it.
    ///
    /// The session is borrowed for the whole fetch, so no navigation can
    /// happen meanwhile. Callers that keep the session usable while the
    /// template loads use [`fetch_prefill`] and [`Self::apply_prefill`].
    pub async fn prefill_from(
        &mut self,
        source: &dyn TemplateSource,
        template_id: &str,
        policy: &TemplateConfig,
    ) -> CoreResult<bool> {
        match fetch_prefill(source, template_id, policy).await {
            Ok(template) => {
                self.seed_template(&template)?;
                Ok(true)
            }
            Err(e) => {
                warn!("Template {} unavailable, starting empty: {}", template_id, e);
                Ok(false)
            }
        }
    }

    /// Build the create payload of the current draft.
    pub fn request(&self, builder: &RequestBuilder) -> CoreResult<CreateRequest> {
        builder.build(self.variant(), &self.draft)
    }

    pub fn variable_import(
        &self,
        builder: &RequestBuilder,
    ) -> CoreResult<Option<VariableImportRequest>> {
        builder.variable_import_request(&self.draft)
    }

    /// File variables of the current draft, created one by one after creation.
    pub fn file_variables(&self, builder: &RequestBuilder) -> CoreResult<Vec<FileVariable>> {
        builder.file_variables(&self.draft)
    }

    /// Leave the flow, discarding the draft.
    pub fn exit(&mut self) -> CoreResult<()> {
        info!("Session {} exited, draft discarded", self.id);
        self.reset()
    }

    /// Finish the flow after a successful submission, returning the draft.
    pub fn complete(&mut self) -> CoreResult<Draft> {
        let draft = std::mem::take(&mut self.draft);
        self.reset()?;
        info!("Session {} completed", self.id);
        Ok(draft)
    }

    fn reset(&mut self) -> CoreResult<()> {
        self.draft = Draft::new();
        self.materialized = self.graph.materialize(&self.draft)?;
        self.current = Navigator::first(&self.materialized)?;
        self.bump();
        Ok(())
    }

    fn bump(&mut self) {
        self.epoch += 1;
    }
}

/// Read a template, retrying transient failures up to the configured limit.
pub async fn fetch_prefill(
    source: &dyn TemplateSource,
    template_id: &str,
    policy: &TemplateConfig,
) -> ApiResult<TemplatePrefill> {
    let attempts = policy.fetch_attempts.max(1);
    let mut attempt = 1;
    loop {
        match source.fetch_template(template_id).await {
            Ok(template) => return Ok(template),
            Err(e) if attempt < attempts => {
                warn!(
                    "Template fetch attempt {}/{} failed: {}",
                    attempt, attempts, e
                );
                tokio::time::sleep(policy.retry_delay()).await;
                attempt += 1;
            }
            Err(e) => return Err(e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::ScriptedTemplateSource;
    use crate::sections::{ResourcesData, VariableData, VariablesData};
    use serde_json::json;

    fn git_general() -> Value {
        json!({
            "name": "api",
            "source": {
                "source_provider": "GIT",
                "provider": "GITHUB",
                "repository": "acme/api",
                "branch": "main"
            }
        })
    }

    fn fast_policy(attempts: u32) -> TemplateConfig {
        TemplateConfig {
            fetch_attempts: attempts,
            retry_delay_ms: 1,
        }
    }

    #[test]
    fn test_new_session_starts_on_general() {
        let session = WizardSession::new(Variant::ApplicationGit).unwrap();
        assert_eq!(session.current_step(), StepId::General);
        assert_eq!(
            session.step_ids(),
            vec![
                StepId::General,
                StepId::Resources,
                StepId::Ports,
                StepId::Healthchecks,
                StepId::Variables,
                StepId::Summary
            ]
        );
        assert_eq!(session.progress(), (1, 6));
    }

    #[test]
    fn test_set_section_requires_ownership() {
        let mut session = WizardSession::new(Variant::ApplicationGit).unwrap();
        let err = session
            .set_section(Section::Ports, &json!({"ports": []}))
            .unwrap_err();
        assert!(matches!(err, CoreError::SectionNotOwned { .. }));
        assert!(session.draft().is_empty());
    }

    #[test]
    fn test_advance_refused_while_invalid() {
        let mut session = WizardSession::new(Variant::ApplicationGit).unwrap();
        let err = session.advance().unwrap_err();
        assert!(matches!(err, CoreError::StepIncomplete { .. }));
        assert_eq!(session.current_step(), StepId::General);

        session.set_section(Section::General, &git_general()).unwrap();
        assert_eq!(session.advance().unwrap(), Advance::Moved(StepId::Resources));
    }

    #[test]
    fn test_empty_ports_skip_healthchecks() {
        let mut session = WizardSession::new(Variant::ApplicationGit).unwrap();
        session.set_section(Section::General, &git_general()).unwrap();
        session.advance().unwrap();
        session
            .set_section(Section::Resources, &json!({"cpu": 500, "memory": 512}))
            .unwrap();
        session.advance().unwrap();
        assert_eq!(session.current_step(), StepId::Ports);

        session.set_section(Section::Ports, &json!({"ports": []})).unwrap();
        assert!(!session.step_ids().contains(&StepId::Healthchecks));
        assert_eq!(session.advance().unwrap(), Advance::Moved(StepId::Variables));
    }

    #[test]
    fn test_back_from_first_step_exits() {
        let mut session = WizardSession::new(Variant::Database).unwrap();
        assert_eq!(session.back().unwrap(), Back::Exit);
        assert_eq!(session.current_step(), StepId::General);
    }

    #[test]
    fn test_goto_unknown_step_opens_first() {
        let mut session = WizardSession::new(Variant::Helm).unwrap();
        assert_eq!(session.goto(StepId::Ports).unwrap(), StepId::General);
        assert_eq!(
            session.goto(StepId::ValuesOverrideArguments).unwrap(),
            StepId::ValuesOverrideArguments
        );
        assert_eq!(session.back().unwrap(), Back::Moved(StepId::ValuesOverrideFile));
    }

    #[test]
    fn test_navigation_invalidates_guard() {
        let mut session = WizardSession::new(Variant::Database).unwrap();
        let guard = session.guard();
        assert!(session.is_current(&guard));

        session.goto(StepId::Resources).unwrap();
        assert!(!session.is_current(&guard));

        let template = TemplatePrefill {
            name: Some("late".to_string()),
            ..TemplatePrefill::default()
        };
        assert!(!session.apply_prefill(&guard, &template).unwrap());
        assert!(session.draft().get(Section::General).is_none());
    }

    #[test]
    fn test_guard_is_bound_to_session() {
        let first = WizardSession::new(Variant::Database).unwrap();
        let second = WizardSession::new(Variant::Database).unwrap();
        assert!(!second.is_current(&first.guard()));
    }

    #[test]
    fn test_prefill_seeds_owned_sections() {
        let mut session = WizardSession::new(Variant::ApplicationGit).unwrap();
        let template = TemplatePrefill {
            name: Some("from-template".to_string()),
            cpu: Some(250),
            memory: Some(512),
            arguments: Some("--port 8080".to_string()),
            variables: vec![VariableData {
                variable: "LOG_LEVEL".to_string(),
                value: "info".to_string(),
                is_secret: false,
                scope: None,
                file: None,
            }],
        };
        let guard = session.guard();
        assert!(session.apply_prefill(&guard, &template).unwrap());

        let general = session.draft().get(Section::General).unwrap();
        assert_eq!(general["name"], "from-template");
        assert_eq!(general["cmd_arguments"], "--port 8080");

        let resources: ResourcesData = session.draft().require(Section::Resources).unwrap();
        assert_eq!(resources.cpu_milli(), Some(250));
        assert_eq!(resources.memory_mb(), Some(512));

        let variables: VariablesData = session.draft().require(Section::Variables).unwrap();
        assert_eq!(variables.variables.len(), 1);
    }

    #[test]
    fn test_prefill_keeps_existing_values() {
        let mut session = WizardSession::new(Variant::ApplicationGit).unwrap();
        session.set_section(Section::General, &git_general()).unwrap();

        let template = TemplatePrefill {
            name: Some("from-template".to_string()),
            ..TemplatePrefill::default()
        };
        let guard = session.guard();
        session.apply_prefill(&guard, &template).unwrap();
        assert_eq!(session.draft().get(Section::General).unwrap()["name"], "api");
    }

    #[test]
    fn test_prefill_keeps_cpu_unit_with_its_value() {
        let mut session = WizardSession::new(Variant::ApplicationGit).unwrap();
        session.set_section(Section::General, &git_general()).unwrap();
        session.advance().unwrap();
        session
            .set_section(Section::Resources, &json!({"cpu_unit": "CORES"}))
            .unwrap();

        let template = TemplatePrefill {
            cpu: Some(500),
            memory: Some(512),
            ..TemplatePrefill::default()
        };
        let guard = session.guard();
        assert!(session.apply_prefill(&guard, &template).unwrap());

        let resources: ResourcesData = session.draft().require(Section::Resources).unwrap();
        assert_eq!(resources.cpu, None);
        assert_eq!(resources.cpu_milli(), None);
        assert_eq!(resources.memory_mb(), Some(512));
    }

    #[test]
    fn test_prefill_respects_memory_unit_alias() {
        let mut session = WizardSession::new(Variant::ApplicationGit).unwrap();
        session.set_section(Section::General, &git_general()).unwrap();
        session.advance().unwrap();
        session
            .set_section(Section::Resources, &json!({"unit": "GB"}))
            .unwrap();

        let template = TemplatePrefill {
            memory: Some(512),
            ..TemplatePrefill::default()
        };
        let guard = session.guard();
        session.apply_prefill(&guard, &template).unwrap();

        let resources = session.draft().get(Section::Resources).unwrap();
        assert!(resources.get("memory_unit").is_none());
        assert!(resources.get("memory").is_none());
        let resources: ResourcesData = session.draft().require(Section::Resources).unwrap();
        assert_eq!(resources.memory_unit, crate::sections::MemoryUnit::Gb);
    }

    #[tokio::test]
    async fn test_navigation_during_fetch_discards_prefill() {
        let source = ScriptedTemplateSource::new(TemplatePrefill {
            name: Some("late".to_string()),
            ..TemplatePrefill::default()
        });
        let mut session = WizardSession::new(Variant::Database).unwrap();

        let guard = session.guard();
        let template = fetch_prefill(&source, "t-1", &fast_policy(1)).await.unwrap();
        session.goto(StepId::Resources).unwrap();

        assert!(!session.apply_prefill(&guard, &template).unwrap());
        assert!(session.draft().is_empty());
    }

    #[test]
    fn test_exit_discards_draft() {
        let mut session = WizardSession::new(Variant::ApplicationGit).unwrap();
        session.set_section(Section::General, &git_general()).unwrap();
        session.advance().unwrap();
        let guard = session.guard();

        session.exit().unwrap();
        assert!(session.draft().is_empty());
        assert_eq!(session.current_step(), StepId::General);
        assert!(!session.is_current(&guard));
    }

    #[test]
    fn test_restart_switches_variant() {
        let mut session = WizardSession::new(Variant::ApplicationGit).unwrap();
        session.set_section(Section::General, &git_general()).unwrap();

        session.restart(Variant::Terraform).unwrap();
        assert_eq!(session.variant(), Variant::Terraform);
        assert!(session.draft().is_empty());
        assert_eq!(
            session.step_ids(),
            vec![
                StepId::General,
                StepId::Configuration,
                StepId::InputVariables,
                StepId::Summary
            ]
        );
    }

    #[tokio::test]
    async fn test_prefill_retries_transient_failures() {
        let source = ScriptedTemplateSource::new(TemplatePrefill {
            name: Some("retried".to_string()),
            ..TemplatePrefill::default()
        })
        .failing(2);

        let mut session = WizardSession::new(Variant::Database).unwrap();
        assert!(session.prefill_from(&source, "t-1", &fast_policy(3)).await.unwrap());
        assert_eq!(source.fetch_count(), 3);
        assert_eq!(session.draft().get(Section::General).unwrap()["name"], "retried");
    }

    #[tokio::test]
    async fn test_prefill_gives_up_after_attempts() {
        let source = ScriptedTemplateSource::new(TemplatePrefill::default()).failing(5);

        let mut session = WizardSession::new(Variant::Database).unwrap();
        assert!(!session.prefill_from(&source, "t-1", &fast_policy(2)).await.unwrap());
        assert_eq!(source.fetch_count(), 2);
        assert!(session.draft().is_empty());
    }
}
