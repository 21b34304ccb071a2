//! External capabilities consumed by the engine.
//!
//! The engine never talks to a model, a vector index or a prompt store
//! directly; it goes through the three traits defined here, injected as
//! trait objects through [`Capabilities`]. Concrete adapters:
//!
//! - [`HttpSearchCapability`] - vector search over HTTP
//! - [`YamlConfigStore`] - step prompts from a YAML file
//! - [`SqliteConfigStore`] - step prompts from a SQLite table
//! - `ClaudeTextCapability` - Claude agent SDK (feature `claude`)

pub mod http_search;
pub mod sqlite_config;
pub mod yaml_config;

#[cfg(feature = "claude")]
pub mod claude;

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::CapabilityError;

pub use http_search::HttpSearchCapability;
pub use sqlite_config::SqliteConfigStore;
pub use yaml_config::YamlConfigStore;

#[cfg(feature = "claude")]
pub use claude::ClaudeTextCapability;

/// One call to a language model
#[derive(Debug, Clone, PartialEq)]
pub struct GenerationRequest {
    /// Configuration key of the call, e.g. `theme_generation.analysis`
    pub purpose: String,
    pub model: String,
    pub system_prompt: String,
    pub user_prompt: String,
    /// JSON Schema the reply must follow; `None` for free text
    pub schema: Option<serde_json::Value>,
}

/// Reply of a language model
#[derive(Debug, Clone, PartialEq)]
pub enum GenerationOutput {
    /// Payload produced in schema-constrained mode
    Structured(serde_json::Value),
    /// Free text; may still contain JSON
    Text(String),
}

#[async_trait]
pub trait GenerativeTextCapability: Send + Sync {
    async fn invoke(&self, request: GenerationRequest) -> Result<GenerationOutput, CapabilityError>;
}

/// Query against the vector index of one source document
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchQuery {
    pub text: String,
    pub corpus_ref: String,
    pub top_k: usize,
    pub top_n: usize,
}

/// Ranked passage returned by a search
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchHit {
    pub id: String,
    pub text: String,
    pub score: f32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
}

/// Must be idempotent; the engine may issue the same query more than once
#[async_trait]
pub trait SearchCapability: Send + Sync {
    async fn query(&self, query: SearchQuery) -> Result<Vec<SearchHit>, CapabilityError>;
}

/// Prompt and model configuration of one step or sub-call
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StepConfig {
    pub system_prompt: String,
    pub user_prompt_template: String,
    pub model_identifier: String,
}

/// Read-only source of step configuration, consulted on every invocation
#[async_trait]
pub trait ConfigurationStore: Send + Sync {
    async fn load(&self, key: &str) -> Result<StepConfig, CapabilityError>;
}

/// Capabilities shared by every step of a run
#[derive(Clone)]
pub struct Capabilities {
    pub text: Arc<dyn GenerativeTextCapability>,
    pub search: Arc<dyn SearchCapability>,
    pub config: Arc<dyn ConfigurationStore>,
}

impl Capabilities {
    pub fn new(
        text: Arc<dyn GenerativeTextCapability>,
        search: Arc<dyn SearchCapability>,
        config: Arc<dyn ConfigurationStore>,
    ) -> Self {
        Self {
            text,
            search,
            config,
        }
    }
}
