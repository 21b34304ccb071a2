//! Fan-out/fan-in execution of independent steps.
//!
//! A [`FanOutGroup`] runs the members whose gate passes concurrently against
//! one shared snapshot. Unlike a fail-fast batch it always waits for every
//! member, so the caller gets a complete list of failures; the fragments of
//! successful siblings are discarded when any member fails.

use std::sync::Arc;

use content_workflow_sdk::{log_fan_in, log_fan_out};
use futures::stream::{FuturesUnordered, StreamExt};

use crate::error::{Result, WorkflowError};
use crate::state::{StateFragment, WorkflowState};
use crate::steps::{run_logged, GenerationStep, Stage, StepId};

pub struct FanOutGroup {
    stage: Stage,
    members: Vec<Arc<dyn GenerationStep>>,
}

impl FanOutGroup {
    pub fn new(stage: Stage) -> Self {
        Self {
            stage,
            members: Vec::new(),
        }
    }

    pub fn member(mut self, step: Arc<dyn GenerationStep>) -> Self {
        self.members.push(step);
        self
    }

    pub fn stage(&self) -> Stage {
        self.stage
    }

    /// Members whose gate passes on `state`, in registration order
    pub fn active_members(&self, state: &WorkflowState) -> Vec<StepId> {
        self.members
            .iter()
            .filter(|step| step.is_enabled(state))
            .map(|step| step.id())
            .collect()
    }

    /// Run the active members and return their fragments, unmerged
    ///
    /// Fragments come back in completion order; [`WorkflowState::merge`]
    /// makes that order irrelevant.
    pub async fn run(&self, snapshot: Arc<WorkflowState>) -> Result<Vec<StateFragment>> {
        let active: Vec<Arc<dyn GenerationStep>> = self
            .members
            .iter()
            .filter(|step| step.is_enabled(&snapshot))
            .cloned()
            .collect();
        if active.is_empty() {
            return Ok(Vec::new());
        }

        log_fan_out!(
            self.stage,
            active.iter().map(|step| step.id().to_string()).collect::<Vec<_>>()
        );

        let mut tasks = FuturesUnordered::new();
        for step in active {
            let snapshot = Arc::clone(&snapshot);
            tasks.push(async move { run_logged(step.as_ref(), &snapshot).await });
        }

        let mut fragments = Vec::new();
        let mut failures = Vec::new();
        while let Some(result) = tasks.next().await {
            match result {
                Ok(fragment) => fragments.push(fragment),
                Err(err) => failures.push(err),
            }
        }

        if !failures.is_empty() {
            failures.sort_by_key(|err: &WorkflowError| err.step());
            return Err(WorkflowError::Aggregate {
                stage: self.stage,
                failures,
            });
        }

        log_fan_in!(
            self.stage,
            fragments
                .iter()
                .map(|fragment| fragment.slot().field_name().to_string())
                .collect::<Vec<_>>()
        );
        Ok(fragments)
    }
}
