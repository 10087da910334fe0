//! Positional navigation over a materialized step list.

use tracing::warn;

use crate::error::{CoreError, CoreResult};
use crate::step::{StepDefinition, StepId};

/// Computes neighbouring steps. Holds no state of its own.
pub struct Navigator;

impl Navigator {
    /// Index of `current` in `steps`.
    ///
    /// A step that is no longer materialized (its skip predicate started to
    /// hold after a draft change) resolves to the first step, so `next` and
    /// `previous` are computed relative to it.
    pub fn resolve(steps: &[StepDefinition], current: StepId) -> CoreResult<usize> {
        if steps.is_empty() {
            return Err(CoreError::EmptyFlow("materialized step list".to_string()));
        }
        match steps.iter().position(|s| s.id == current) {
            Some(index) => Ok(index),
            None => {
                warn!(
                    "Step {} is not part of the current flow, resuming from {}",
                    current, steps[0].id
                );
                Ok(0)
            }
        }
    }

    /// Step after `current`, or `None` when the flow is ready to submit.
    pub fn next(steps: &[StepDefinition], current: StepId) -> CoreResult<Option<StepId>> {
        let index = Self::resolve(steps, current)?;
        Ok(steps.get(index + 1).map(|s| s.id))
    }

    /// Step before `current`, or `None` when going back exits the flow.
    pub fn previous(steps: &[StepDefinition], current: StepId) -> CoreResult<Option<StepId>> {
        let index = Self::resolve(steps, current)?;
        if index == 0 {
            return Ok(None);
        }
        Ok(Some(steps[index - 1].id))
    }

    /// First step of the flow.
    pub fn first(steps: &[StepDefinition]) -> CoreResult<StepId> {
        steps
            .first()
            .map(|s| s.id)
            .ok_or_else(|| CoreError::EmptyFlow("materialized step list".to_string()))
    }
}
