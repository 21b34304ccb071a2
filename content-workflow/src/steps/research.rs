//! Step 3: research dossier for the selected theme.

use std::sync::Arc;

use async_trait::async_trait;

use super::{base_values, with_json, GenerationStep, StepContext, StepId};
use crate::error::{Result, WorkflowError};
use crate::prompt::PromptSlot;
use crate::retrieval::{RetrievalLoop, RetrievalVariant};
use crate::state::{StateFragment, WorkflowState};
use crate::types::{DossierDraft, ResearchDossier};

pub struct ResearchStep {
    ctx: Arc<StepContext>,
}

impl ResearchStep {
    pub fn new(ctx: Arc<StepContext>) -> Self {
        Self { ctx }
    }
}

#[async_trait]
impl GenerationStep for ResearchStep {
    fn id(&self) -> StepId {
        StepId::Research
    }

    async fn execute(&self, state: &WorkflowState) -> Result<StateFragment> {
        let step = StepId::Research;
        let theme = state
            .selected_theme
            .as_ref()
            .ok_or_else(|| WorkflowError::precondition(step, "selectedTheme"))?;
        let whitepaper = state
            .selected_whitepaper_id
            .as_deref()
            .ok_or_else(|| WorkflowError::precondition(step, "selectedWhitepaperId"))?;

        let seed = base_values(step, state)?.text(
            PromptSlot::SeedContext,
            format!("{}\n\n{}", theme.title, theme.detailed_description),
        );
        let seed = with_json(step, seed, PromptSlot::SelectedTheme, theme)?;

        let settings = &self.ctx.settings;
        let outcome = RetrievalLoop::new(
            &self.ctx,
            RetrievalVariant::Research,
            whitepaper,
            settings.research_synthesis_top_n,
        )
        .run(&seed, settings.research_search_budget, &[])
        .await?;

        let values = seed
            .list::<String>(PromptSlot::ExcludedThemes, &[])
            .list(PromptSlot::PriorQueries, &outcome.queries)
            .list(PromptSlot::EmergingConcepts, &outcome.emerging_concepts);
        let values = with_json(step, values, PromptSlot::SearchResults, &outcome.hits)?;

        let draft: DossierDraft = self.ctx.generate(step, step.config_key(), &values).await?;

        Ok(StateFragment::Research {
            dossier: ResearchDossier::from_draft(theme.clone(), draft),
            queries: outcome.queries,
        })
    }
}
