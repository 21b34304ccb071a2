//! Engine settings: retrieval budgets, ranking cut-offs and regeneration cap.

use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

/// Override for [`WorkflowSettings::theme_search_budget`]
pub const THEME_BUDGET_ENV: &str = "CONTENT_WORKFLOW_THEME_BUDGET";
/// Override for [`WorkflowSettings::research_search_budget`]
pub const RESEARCH_BUDGET_ENV: &str = "CONTENT_WORKFLOW_RESEARCH_BUDGET";

/// Tunables for a workflow run
///
/// # Examples
///
/// ```
/// use content_workflow::settings::WorkflowSettings;
///
/// let settings = WorkflowSettings {
///     theme_search_budget: 4,
///     ..Default::default()
/// };
/// assert_eq!(settings.theme_synthesis_top_n, 30);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct WorkflowSettings {
    /// Maximum search calls issued by the theme step's retrieval loop
    pub theme_search_budget: usize,
    /// Maximum search calls issued by the research step's retrieval loop
    pub research_search_budget: usize,
    /// Candidates retrieved per query before reranking
    pub search_top_k: usize,
    /// Hits returned per query after reranking
    pub search_top_n: usize,
    /// Ranked hits handed to theme synthesis
    pub theme_synthesis_top_n: usize,
    /// Ranked hits handed to research synthesis
    pub research_synthesis_top_n: usize,
    /// Hits kept per drafter pre-flight search
    pub preflight_search_top_n: usize,
    /// Cap on theme-generation invocations per run; `None` is uncapped
    pub max_regenerations: Option<u32>,
}

impl Default for WorkflowSettings {
    fn default() -> Self {
        Self {
            theme_search_budget: 8,
            research_search_budget: 12,
            search_top_k: 20,
            search_top_n: 8,
            theme_synthesis_top_n: 30,
            research_synthesis_top_n: 40,
            preflight_search_top_n: 5,
            max_regenerations: None,
        }
    }
}

impl WorkflowSettings {
    /// Load settings from a YAML file, filling unspecified fields with defaults
    pub fn from_yaml_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read settings file: {}", path.display()))?;
        serde_yaml::from_str(&content)
            .with_context(|| format!("Failed to parse settings YAML from: {}", path.display()))
    }

    /// Apply budget overrides from the environment
    pub fn with_env_overrides(mut self) -> Result<Self> {
        if let Ok(value) = std::env::var(THEME_BUDGET_ENV) {
            self.theme_search_budget = value
                .parse()
                .with_context(|| format!("{} must be a positive integer", THEME_BUDGET_ENV))?;
        }
        if let Ok(value) = std::env::var(RESEARCH_BUDGET_ENV) {
            self.research_search_budget = value
                .parse()
                .with_context(|| format!("{} must be a positive integer", RESEARCH_BUDGET_ENV))?;
        }
        Ok(self)
    }
}
