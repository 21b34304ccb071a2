//! Generation steps and the plumbing they share.
//!
//! Every step reads a snapshot of [`WorkflowState`], checks its
//! preconditions, makes exactly one final schema-validated model call and
//! returns the [`StateFragment`] it owns. Prompts and model identifiers are
//! loaded from the [`ConfigurationStore`](crate::capabilities::ConfigurationStore)
//! on every call through [`StepContext::generate`].

pub mod brief;
pub mod channel;
pub mod drafting;
pub mod editing;
pub mod research;
pub mod themes;

use std::fmt;

use async_trait::async_trait;
use content_workflow_sdk::{log_step_complete, log_step_failed, log_step_start};
use schemars::JsonSchema;
use serde::de::DeserializeOwned;

use crate::capabilities::{Capabilities, GenerationRequest};
use crate::error::{CapabilityError, Result, WorkflowError};
use crate::prompt::{PromptSlot, PromptTemplate, PromptValues};
use crate::settings::WorkflowSettings;
use crate::state::{StateFragment, WorkflowState};
use crate::validate::{parse_reply, schema_for, Validate};

pub use brief::BriefStep;
pub use channel::{ArticleChannel, Channel, LinkedInChannel, SocialChannel};
pub use drafting::Drafter;
pub use editing::Editor;
pub use research::ResearchStep;
pub use themes::ThemeStep;

/// Identity of one of the nine generation steps
///
/// The display form is the step's configuration key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum StepId {
    Brief,
    Themes,
    Research,
    ArticleDraft,
    LinkedInDraft,
    SocialDraft,
    ArticleEdit,
    LinkedInEdit,
    SocialEdit,
}

impl StepId {
    pub const ALL: [StepId; 9] = [
        StepId::Brief,
        StepId::Themes,
        StepId::Research,
        StepId::ArticleDraft,
        StepId::LinkedInDraft,
        StepId::SocialDraft,
        StepId::ArticleEdit,
        StepId::LinkedInEdit,
        StepId::SocialEdit,
    ];

    pub fn config_key(&self) -> &'static str {
        match self {
            StepId::Brief => "marketing_brief",
            StepId::Themes => "theme_generation",
            StepId::Research => "theme_research",
            StepId::ArticleDraft => "article_writer",
            StepId::LinkedInDraft => "linkedin_writer",
            StepId::SocialDraft => "social_writer",
            StepId::ArticleEdit => "article_editor",
            StepId::LinkedInEdit => "linkedin_editor",
            StepId::SocialEdit => "social_editor",
        }
    }

    /// Key of a sub-call made by this step, e.g. `theme_generation.analysis`
    pub fn sub_key(&self, call: SubCall) -> String {
        format!("{}.{}", self.config_key(), call.suffix())
    }

    pub fn description(&self) -> &'static str {
        match self {
            StepId::Brief => "Create marketing brief",
            StepId::Themes => "Generate candidate themes",
            StepId::Research => "Research selected theme",
            StepId::ArticleDraft => "Draft articles",
            StepId::LinkedInDraft => "Draft LinkedIn posts",
            StepId::SocialDraft => "Draft social posts",
            StepId::ArticleEdit => "Edit articles",
            StepId::LinkedInEdit => "Edit LinkedIn posts",
            StepId::SocialEdit => "Edit social posts",
        }
    }

    pub fn stage(&self) -> Stage {
        match self {
            StepId::Brief => Stage::Brief,
            StepId::Themes => Stage::Themes,
            StepId::Research => Stage::Research,
            StepId::ArticleDraft | StepId::LinkedInDraft | StepId::SocialDraft => {
                Stage::ContentGeneration
            }
            StepId::ArticleEdit | StepId::LinkedInEdit | StepId::SocialEdit => {
                Stage::ContentEditing
            }
        }
    }
}

impl fmt::Display for StepId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.config_key())
    }
}

/// Auxiliary model calls a step may make before its final generation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubCall {
    /// Initial query planning of a retrieval loop
    Queries,
    /// Per-query "analyze and refine" call of a retrieval loop
    Analysis,
    /// Drafter research-sufficiency decision
    Preflight,
}

impl SubCall {
    pub fn suffix(&self) -> &'static str {
        match self {
            SubCall::Queries => "queries",
            SubCall::Analysis => "analysis",
            SubCall::Preflight => "preflight",
        }
    }
}

/// The five pipeline stages
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Stage {
    Brief,
    Themes,
    Research,
    ContentGeneration,
    ContentEditing,
}

impl Stage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Stage::Brief => "brief",
            Stage::Themes => "themes",
            Stage::Research => "research",
            Stage::ContentGeneration => "content_generation",
            Stage::ContentEditing => "content_editing",
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Stage::Brief => "Marketing Brief",
            Stage::Themes => "Theme Generation",
            Stage::Research => "Theme Research",
            Stage::ContentGeneration => "Content Generation",
            Stage::ContentEditing => "Content Editing",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A unit of work in the pipeline
#[async_trait]
pub trait GenerationStep: Send + Sync {
    fn id(&self) -> StepId;

    /// Gate evaluated by a fan-out group before the step is scheduled
    fn is_enabled(&self, _state: &WorkflowState) -> bool {
        true
    }

    async fn execute(&self, state: &WorkflowState) -> Result<StateFragment>;
}

/// Execute a step with start/complete/failed events around it
pub async fn run_logged(step: &dyn GenerationStep, state: &WorkflowState) -> Result<StateFragment> {
    let id = step.id();
    log_step_start!(id, id.description());
    match step.execute(state).await {
        Ok(fragment) => {
            log_step_complete!(id, fragment.slot().field_name());
            Ok(fragment)
        }
        Err(err) => {
            log_step_failed!(id, &err);
            Err(err)
        }
    }
}

/// Capabilities and settings shared by every step of a machine
#[derive(Clone)]
pub struct StepContext {
    pub capabilities: Capabilities,
    pub settings: WorkflowSettings,
}

impl StepContext {
    pub fn new(capabilities: Capabilities, settings: WorkflowSettings) -> Self {
        Self {
            capabilities,
            settings,
        }
    }

    /// Load `key`'s configuration, render its template with `values`, invoke
    /// the model with `T`'s schema and validate the reply
    ///
    /// Errors are attributed to `step` whichever sub-call `key` names.
    pub async fn generate<T>(&self, step: StepId, key: &str, values: &PromptValues) -> Result<T>
    where
        T: DeserializeOwned + JsonSchema + Validate,
    {
        let config = self
            .capabilities
            .config
            .load(key)
            .await
            .map_err(|err| match err {
                CapabilityError::NotFound(key) => {
                    WorkflowError::config(step, format!("no configuration stored for `{}`", key))
                }
                other => WorkflowError::capability(step, other),
            })?;

        let template = PromptTemplate::parse(&config.user_prompt_template)
            .map_err(|e| WorkflowError::config(step, format!("{}: {}", key, e)))?;
        let user_prompt = template
            .render(values)
            .map_err(|e| WorkflowError::config(step, format!("{}: {}", key, e)))?;

        let request = GenerationRequest {
            purpose: key.to_string(),
            model: config.model_identifier,
            system_prompt: config.system_prompt,
            user_prompt,
            schema: Some(schema_for::<T>()),
        };

        let output = self
            .capabilities
            .text
            .invoke(request)
            .await
            .map_err(|e| WorkflowError::capability(step, e))?;

        parse_reply(output).map_err(|message| WorkflowError::validation(step, format!("{}: {}", key, message)))
    }
}

/// Prompt values every step can offer: the caller's input and, once
/// produced, the marketing brief
pub(crate) fn base_values(step: StepId, state: &WorkflowState) -> Result<PromptValues> {
    let target_audience = state
        .target_audience
        .clone()
        .or_else(|| state.marketing_brief.as_ref().map(|b| b.target_audience.clone()))
        .unwrap_or_else(|| "(not specified)".to_string());

    let mut values = PromptValues::new()
        .text(PromptSlot::BusinessContext, state.business_context.clone())
        .text(PromptSlot::TargetAudience, target_audience)
        .text(PromptSlot::CtaType, state.cta_type.as_str())
        .text(
            PromptSlot::CtaUrl,
            state.cta_url.clone().unwrap_or_else(|| "(none)".to_string()),
        );

    if let Some(brief) = &state.marketing_brief {
        values = values
            .json(PromptSlot::MarketingBrief, brief)
            .map_err(|e| WorkflowError::config(step, e.to_string()))?;
    }
    Ok(values)
}

/// Attach a JSON value to `values`, attributing failures to `step`
pub(crate) fn with_json<T: serde::Serialize + ?Sized>(
    step: StepId,
    values: PromptValues,
    slot: PromptSlot,
    value: &T,
) -> Result<PromptValues> {
    values
        .json(slot, value)
        .map_err(|e| WorkflowError::config(step, e.to_string()))
}
