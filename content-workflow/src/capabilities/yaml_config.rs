//! Step configuration loaded from a YAML document.
//!
//! The document maps step keys to their configuration:
//!
//! ```yaml
//! marketing_brief:
//!   systemPrompt: You are a marketing strategist.
//!   userPromptTemplate: "Write a brief for: {{business_context}}"
//!   modelIdentifier: sonnet
//! ```

use std::collections::BTreeMap;
use std::path::Path;

use anyhow::{Context, Result};
use async_trait::async_trait;

use super::{ConfigurationStore, StepConfig};
use crate::error::CapabilityError;

#[derive(Debug, Clone, Default)]
pub struct YamlConfigStore {
    steps: BTreeMap<String, StepConfig>,
}

impl YamlConfigStore {
    pub fn from_yaml_str(yaml: &str) -> Result<Self> {
        let steps: BTreeMap<String, StepConfig> =
            serde_yaml::from_str(yaml).context("Failed to parse step configuration YAML")?;
        Ok(Self { steps })
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read step configuration: {}", path.display()))?;
        Self::from_yaml_str(&content)
            .with_context(|| format!("Invalid step configuration in {}", path.display()))
    }

    pub fn insert(&mut self, key: impl Into<String>, config: StepConfig) {
        self.steps.insert(key.into(), config);
    }

    pub fn entries(&self) -> impl Iterator<Item = (&String, &StepConfig)> {
        self.steps.iter()
    }
}

#[async_trait]
impl ConfigurationStore for YamlConfigStore {
    async fn load(&self, key: &str) -> Result<StepConfig, CapabilityError> {
        self.steps
            .get(key)
            .cloned()
            .ok_or_else(|| CapabilityError::NotFound(key.to_string()))
    }
}
