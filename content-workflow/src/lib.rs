// Records produced by generation steps
pub mod types;

// Workflow state, fragments and caller input
pub mod state;

// Error taxonomy
pub mod error;

// Engine settings
pub mod settings;

// Typed prompt templates
pub mod prompt;

// Reply extraction and validation
pub mod validate;

// Model, search and configuration capabilities
pub mod capabilities;

// Search, analyze, refine loop
pub mod retrieval;

// The nine generation steps
pub mod steps;

// Concurrent stage execution
pub mod fanout;

// State machine and entry points
pub mod machine;

// Binary arguments and state files
pub mod cli;

pub use error::{CapabilityError, Result, WorkflowError};
pub use machine::WorkflowMachine;
pub use settings::WorkflowSettings;
pub use state::{WorkflowInput, WorkflowState};
