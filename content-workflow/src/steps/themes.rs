//! Step 2: three candidate themes grounded in the source document.
//!
//! Runs a retrieval loop seeded with the brief, excluding every theme the
//! human has already seen, then asks for exactly three new themes. Novelty
//! is best-effort: a repeated title is reported, not rejected.

use std::sync::Arc;

use async_trait::async_trait;
use content_workflow_sdk::log_warning;

use super::{base_values, with_json, GenerationStep, StepContext, StepId};
use crate::error::{Result, WorkflowError};
use crate::prompt::PromptSlot;
use crate::retrieval::{RetrievalLoop, RetrievalVariant};
use crate::state::{StateFragment, WorkflowState};
use crate::types::ThemeBatch;

pub struct ThemeStep {
    ctx: Arc<StepContext>,
}

impl ThemeStep {
    pub fn new(ctx: Arc<StepContext>) -> Self {
        Self { ctx }
    }
}

/// Titles of every theme already shown, the loop's exclusion set
pub fn exclusion_set(state: &WorkflowState) -> Vec<String> {
    state
        .previous_themes
        .iter()
        .map(|theme| theme.title.clone())
        .collect()
}

#[async_trait]
impl GenerationStep for ThemeStep {
    fn id(&self) -> StepId {
        StepId::Themes
    }

    async fn execute(&self, state: &WorkflowState) -> Result<StateFragment> {
        let step = StepId::Themes;
        let brief = state
            .marketing_brief
            .as_ref()
            .ok_or_else(|| WorkflowError::precondition(step, "marketingBrief"))?;
        let whitepaper = state
            .selected_whitepaper_id
            .as_deref()
            .ok_or_else(|| WorkflowError::precondition(step, "selectedWhitepaperId"))?;

        let exclusions = exclusion_set(state);
        let seed = base_values(step, state)?.text(
            PromptSlot::SeedContext,
            format!("{}\n\n{}", state.business_context, brief.summary),
        );

        let settings = &self.ctx.settings;
        let outcome = RetrievalLoop::new(
            &self.ctx,
            RetrievalVariant::Themes,
            whitepaper,
            settings.theme_synthesis_top_n,
        )
        .run(&seed, settings.theme_search_budget, &exclusions)
        .await?;

        let values = seed
            .list(PromptSlot::ExcludedThemes, &exclusions)
            .list(PromptSlot::PriorQueries, &outcome.queries);
        let values = with_json(step, values, PromptSlot::SearchResults, &outcome.hits)?;

        let batch: ThemeBatch = self.ctx.generate(step, step.config_key(), &values).await?;

        for draft in &batch.themes {
            let title = draft.title.trim();
            if exclusions.iter().any(|seen| seen.trim().eq_ignore_ascii_case(title)) {
                log_warning!("Theme `{}` repeats a previously shown theme", draft.title);
            }
        }

        Ok(StateFragment::Themes {
            themes: batch.themes.into_iter().map(|draft| draft.into_theme()).collect(),
            queries: outcome.queries,
        })
    }
}
