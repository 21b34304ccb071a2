//! Structured logging for the content workflow engine.
//!
//! Every observable event in a run (stage transitions, step execution,
//! retrieval queries, fan-out merges, suspension) is described by a
//! [`WorkflowLog`] value. Events are emitted to stderr as single JSON lines
//! prefixed with [`EVENT_PREFIX`] so that a supervising process can parse
//! them out of the regular console output.
//!
//! The `log_*!` macros are thin wrappers that build and emit an event in one
//! line; the console macros (`log_info!`, `log_warning!`, ...) print
//! human-readable, colored lines to stdout for CLI use.

use serde::{Deserialize, Serialize};

/// Prefix marking a structured event line on stderr.
pub const EVENT_PREFIX: &str = "__WF_EVENT__:";

/// Environment variable that suppresses structured event emission.
pub const QUIET_ENV: &str = "CONTENT_WORKFLOW_QUIET";

/// Structured logging events emitted by the workflow engine
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum WorkflowLog {
    /// A pipeline stage started
    StageStarted { stage: String, name: String },
    /// A pipeline stage completed
    StageCompleted { stage: String, name: String },
    /// A pipeline stage failed; the run is terminated
    StageFailed {
        stage: String,
        name: String,
        error: String,
    },
    /// A generation step started
    StepStarted { step: String, description: String },
    /// A generation step produced its fragment
    StepCompleted { step: String, result: Option<String> },
    /// A generation step failed
    StepFailed { step: String, error: String },
    /// A retrieval query is about to be executed
    SearchIssued {
        step: String,
        iteration: usize,
        budget: usize,
        query: String,
    },
    /// A retrieval query returned
    SearchCompleted {
        step: String,
        query: String,
        hits: usize,
    },
    /// A retrieval query failed and was counted as zero results
    SearchFailed {
        step: String,
        query: String,
        error: String,
    },
    /// A fan-out group launched its members
    FanOutStarted { stage: String, members: Vec<String> },
    /// A fan-out group merged its members' fragments
    FanInCompleted { stage: String, merged: Vec<String> },
    /// The workflow suspended and is waiting for a human decision
    AwaitingInput { reason: String, options: usize },
    /// A state file was written by the caller
    StateFileCreated {
        file_path: String,
        description: String,
    },
}

impl WorkflowLog {
    /// Emit this log event to stderr
    pub fn emit(&self) {
        if is_quiet() {
            return;
        }
        if let Ok(json) = serde_json::to_string(self) {
            use std::io::Write;
            eprintln!("{}{}", EVENT_PREFIX, json);
            // Flush so lines from concurrent steps are not interleaved mid-line
            let _ = std::io::stderr().flush();
        }
    }

    /// Parse a stderr line back into an event, if it carries one
    pub fn parse_line(line: &str) -> Option<WorkflowLog> {
        let json = line.trim().strip_prefix(EVENT_PREFIX)?;
        serde_json::from_str(json).ok()
    }
}

/// Whether structured event emission is disabled through the environment
pub fn is_quiet() -> bool {
    std::env::var(QUIET_ENV)
        .map(|value| matches!(value.as_str(), "1" | "true" | "yes"))
        .unwrap_or(false)
}

#[macro_export]
macro_rules! log_stage_start {
    ($stage:expr, $name:expr) => {
        $crate::WorkflowLog::StageStarted {
            stage: $stage.to_string(),
            name: $name.to_string(),
        }
        .emit();
    };
}

#[macro_export]
macro_rules! log_stage_complete {
    ($stage:expr, $name:expr) => {
        $crate::WorkflowLog::StageCompleted {
            stage: $stage.to_string(),
            name: $name.to_string(),
        }
        .emit();
    };
}

#[macro_export]
macro_rules! log_stage_failed {
    ($stage:expr, $name:expr, $error:expr) => {
        $crate::WorkflowLog::StageFailed {
            stage: $stage.to_string(),
            name: $name.to_string(),
            error: $error.to_string(),
        }
        .emit();
    };
}

#[macro_export]
macro_rules! log_step_start {
    ($step:expr, $desc:expr) => {
        $crate::WorkflowLog::StepStarted {
            step: $step.to_string(),
            description: $desc.to_string(),
        }
        .emit();
    };
}

#[macro_export]
macro_rules! log_step_complete {
    ($step:expr) => {
        $crate::WorkflowLog::StepCompleted {
            step: $step.to_string(),
            result: None,
        }
        .emit();
    };
    ($step:expr, $result:expr) => {
        $crate::WorkflowLog::StepCompleted {
            step: $step.to_string(),
            result: Some($result.to_string()),
        }
        .emit();
    };
}

#[macro_export]
macro_rules! log_step_failed {
    ($step:expr, $error:expr) => {
        $crate::WorkflowLog::StepFailed {
            step: $step.to_string(),
            error: $error.to_string(),
        }
        .emit();
    };
}

#[macro_export]
macro_rules! log_search_issued {
    ($step:expr, $iteration:expr, $budget:expr, $query:expr) => {
        $crate::WorkflowLog::SearchIssued {
            step: $step.to_string(),
            iteration: $iteration,
            budget: $budget,
            query: $query.to_string(),
        }
        .emit();
    };
}

#[macro_export]
macro_rules! log_search_complete {
    ($step:expr, $query:expr, $hits:expr) => {
        $crate::WorkflowLog::SearchCompleted {
            step: $step.to_string(),
            query: $query.to_string(),
            hits: $hits,
        }
        .emit();
    };
}

#[macro_export]
macro_rules! log_search_failed {
    ($step:expr, $query:expr, $error:expr) => {
        $crate::WorkflowLog::SearchFailed {
            step: $step.to_string(),
            query: $query.to_string(),
            error: $error.to_string(),
        }
        .emit();
    };
}

#[macro_export]
macro_rules! log_fan_out {
    ($stage:expr, $members:expr) => {
        $crate::WorkflowLog::FanOutStarted {
            stage: $stage.to_string(),
            members: $members,
        }
        .emit();
    };
}

#[macro_export]
macro_rules! log_fan_in {
    ($stage:expr, $merged:expr) => {
        $crate::WorkflowLog::FanInCompleted {
            stage: $stage.to_string(),
            merged: $merged,
        }
        .emit();
    };
}

#[macro_export]
macro_rules! log_awaiting_input {
    ($reason:expr, $options:expr) => {
        $crate::WorkflowLog::AwaitingInput {
            reason: $reason.to_string(),
            options: $options,
        }
        .emit();
    };
}

#[macro_export]
macro_rules! log_state_file {
    ($path:expr, $desc:expr) => {
        $crate::WorkflowLog::StateFileCreated {
            file_path: $path.to_string(),
            description: $desc.to_string(),
        }
        .emit();
    };
}

// ============================================================================
// Console Logging Macros
// ============================================================================
// Human-readable colored output for the CLI, complementing the structured
// WorkflowLog events above.
// ============================================================================

/// Logs a section header.
///
/// # Example
/// ```
/// use content_workflow_sdk::log_header;
/// log_header!("Theme Selection");
/// ```
///
/// Outputs:
/// ```text
/// ═══ Theme Selection ═══
/// ```
#[macro_export]
macro_rules! log_header {
    ($title:expr) => {
        println!("\x1b[1;36m═══ {} ═══\x1b[0m", $title);
    };
}

/// Logs an informational message.
///
/// # Example
/// ```
/// use content_workflow_sdk::log_info;
/// log_info!("Loading step configuration...");
/// let count = 3;
/// log_info!("Generated {} themes", count);
/// ```
#[macro_export]
macro_rules! log_info {
    ($message:expr) => {
        println!("\x1b[36mℹ {}\x1b[0m", $message);
    };
    ($fmt:expr, $($arg:tt)*) => {
        println!("\x1b[36mℹ {}\x1b[0m", format!($fmt, $($arg)*));
    };
}

/// Logs a warning message.
///
/// # Example
/// ```
/// use content_workflow_sdk::log_warning;
/// log_warning!("Search endpoint not configured");
/// ```
#[macro_export]
macro_rules! log_warning {
    ($message:expr) => {
        println!("\x1b[33m⚠ Warning: {}\x1b[0m", $message);
    };
    ($fmt:expr, $($arg:tt)*) => {
        println!("\x1b[33m⚠ Warning: {}\x1b[0m", format!($fmt, $($arg)*));
    };
}

/// Logs that a file has been saved.
///
/// # Example
/// ```
/// use content_workflow_sdk::log_file_saved;
/// log_file_saved!("./workflow_state.json");
/// ```
#[macro_export]
macro_rules! log_file_saved {
    ($path:expr) => {
        println!("\x1b[32m✓ Saved: {}\x1b[0m", $path);
    };
}

/// Logs a debug message (intended to be used conditionally).
///
/// # Example
/// ```
/// use content_workflow_sdk::log_debug;
/// let budget = 8;
/// log_debug!("Theme search budget: {}", budget);
/// ```
#[macro_export]
macro_rules! log_debug {
    ($message:expr) => {
        println!("\x1b[2m[DEBUG] {}\x1b[0m", $message);
    };
    ($fmt:expr, $($arg:tt)*) => {
        println!("\x1b[2m[DEBUG] {}\x1b[0m", format!($fmt, $($arg)*));
    };
}
