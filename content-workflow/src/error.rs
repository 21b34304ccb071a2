//! Error types for the workflow engine and its capabilities.

use std::time::Duration;

use crate::state::CurrentStep;
use crate::steps::{Stage, StepId};

/// Result alias used throughout the engine
pub type Result<T, E = WorkflowError> = std::result::Result<T, E>;

/// Failure reported by an external capability (model, search, config store)
#[derive(Debug, thiserror::Error)]
pub enum CapabilityError {
    #[error("capability unavailable: {0}")]
    Unavailable(String),

    #[error("request timed out after {0:?}")]
    Timeout(Duration),

    #[error("transport error: {0}")]
    Transport(String),

    #[error("no configuration stored for `{0}`")]
    NotFound(String),

    #[error("malformed reply: {0}")]
    Malformed(String),
}

impl From<reqwest::Error> for CapabilityError {
    fn from(err: reqwest::Error) -> Self {
        CapabilityError::Transport(err.to_string())
    }
}

impl From<rusqlite::Error> for CapabilityError {
    fn from(err: rusqlite::Error) -> Self {
        CapabilityError::Unavailable(format!("sqlite: {}", err))
    }
}

/// Terminal failure of a workflow run
///
/// Every variant that originates in a step names that step, so callers can
/// decide whether to restart from scratch without parsing messages.
#[derive(Debug, thiserror::Error)]
pub enum WorkflowError {
    #[error("{step}: precondition failed, `{field}` is missing")]
    Precondition { step: StepId, field: &'static str },

    #[error("{step}: capability failed: {source}")]
    Capability {
        step: StepId,
        #[source]
        source: CapabilityError,
    },

    #[error("{step}: validation failed: {message}")]
    Validation { step: StepId, message: String },

    #[error("{step}: retrieval produced no results after {queries} queries")]
    NoEvidence { step: StepId, queries: usize },

    #[error("{step}: configuration error: {message}")]
    Config { step: StepId, message: String },

    #[error("{stage} stage failed: {}", summarize(.failures))]
    Aggregate {
        stage: Stage,
        failures: Vec<WorkflowError>,
    },

    #[error("invalid workflow input: {0}")]
    InvalidInput(String),

    #[error("theme `{0}` is not among the generated themes")]
    UnknownTheme(String),

    #[error("workflow is not awaiting theme selection (current step: {0})")]
    NotSuspended(CurrentStep),

    #[error("regeneration limit of {0} reached")]
    RegenerationLimit(u32),
}

fn summarize(failures: &[WorkflowError]) -> String {
    failures
        .iter()
        .map(|failure| failure.to_string())
        .collect::<Vec<_>>()
        .join("; ")
}

impl WorkflowError {
    pub fn precondition(step: StepId, field: &'static str) -> Self {
        WorkflowError::Precondition { step, field }
    }

    pub fn validation(step: StepId, message: impl Into<String>) -> Self {
        WorkflowError::Validation {
            step,
            message: message.into(),
        }
    }

    pub fn capability(step: StepId, source: CapabilityError) -> Self {
        WorkflowError::Capability { step, source }
    }

    pub fn config(step: StepId, message: impl Into<String>) -> Self {
        WorkflowError::Config {
            step,
            message: message.into(),
        }
    }

    /// Step that produced this error, when there is exactly one
    pub fn step(&self) -> Option<StepId> {
        match self {
            WorkflowError::Precondition { step, .. }
            | WorkflowError::Capability { step, .. }
            | WorkflowError::Validation { step, .. }
            | WorkflowError::NoEvidence { step, .. }
            | WorkflowError::Config { step, .. } => Some(*step),
            WorkflowError::Aggregate { failures, .. } if failures.len() == 1 => failures[0].step(),
            _ => None,
        }
    }

    /// Steps named anywhere in this error, flattening aggregates
    pub fn failed_steps(&self) -> Vec<StepId> {
        match self {
            WorkflowError::Aggregate { failures, .. } => {
                failures.iter().flat_map(|f| f.failed_steps()).collect()
            }
            other => other.step().into_iter().collect(),
        }
    }

    /// Whether rerunning with the same input could plausibly succeed
    ///
    /// Precondition, input and selection errors are caller mistakes; model,
    /// search and schema failures are worth a fresh run.
    pub fn is_retryable(&self) -> bool {
        match self {
            WorkflowError::Capability { .. }
            | WorkflowError::Validation { .. }
            | WorkflowError::NoEvidence { .. } => true,
            WorkflowError::Aggregate { failures, .. } => failures.iter().all(|f| f.is_retryable()),
            _ => false,
        }
    }
}
