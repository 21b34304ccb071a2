//! Content drafters (steps 4-6), one per channel.
//!
//! Before writing, a drafter asks the model whether the research dossier is
//! enough for its channel. Only when it is not does it run the one to three
//! extra searches the model asked for; those searches degrade to zero
//! results on failure, like the retrieval loop's.

use std::marker::PhantomData;
use std::sync::Arc;

use async_trait::async_trait;
use content_workflow_sdk::{log_search_complete, log_search_failed, log_search_issued};

use super::{base_values, with_json, Channel, GenerationStep, StepContext, StepId, SubCall};
use crate::capabilities::{SearchHit, SearchQuery};
use crate::error::{Result, WorkflowError};
use crate::prompt::{PromptSlot, PromptValues};
use crate::retrieval::rank_hits;
use crate::state::{StateFragment, WorkflowState};
use crate::types::ResearchDecision;

pub struct Drafter<C: Channel> {
    ctx: Arc<StepContext>,
    channel: PhantomData<C>,
}

impl<C: Channel> Drafter<C> {
    pub fn new(ctx: Arc<StepContext>) -> Self {
        Self {
            ctx,
            channel: PhantomData,
        }
    }

    /// Extra passages for the draft, or `None` when the dossier sufficed
    async fn preflight(
        &self,
        state: &WorkflowState,
        values: &PromptValues,
    ) -> Result<(Option<Vec<SearchHit>>, Vec<String>)> {
        let step = C::DRAFT_STEP;
        let decision: ResearchDecision = self
            .ctx
            .generate(step, &step.sub_key(SubCall::Preflight), values)
            .await?;
        if decision.sufficient {
            return Ok((None, Vec::new()));
        }

        let corpus_ref = state
            .selected_whitepaper_id
            .as_deref()
            .ok_or_else(|| WorkflowError::precondition(step, "selectedWhitepaperId"))?;
        let top_n = self.ctx.settings.preflight_search_top_n;
        let budget = decision.queries.len();

        let mut hits = Vec::new();
        for (idx, query) in decision.queries.iter().enumerate() {
            log_search_issued!(step, idx + 1, budget, query);
            let request = SearchQuery {
                text: query.clone(),
                corpus_ref: corpus_ref.to_string(),
                top_k: self.ctx.settings.search_top_k,
                top_n,
            };
            match self.ctx.capabilities.search.query(request).await {
                Ok(found) => {
                    log_search_complete!(step, query, found.len());
                    hits.extend(found);
                }
                Err(err) => {
                    log_search_failed!(step, query, &err);
                }
            }
        }

        Ok((Some(rank_hits(hits, top_n * budget)), decision.queries))
    }
}

#[async_trait]
impl<C: Channel> GenerationStep for Drafter<C> {
    fn id(&self) -> StepId {
        C::DRAFT_STEP
    }

    fn is_enabled(&self, state: &WorkflowState) -> bool {
        C::requested(&state.counts) > 0
    }

    async fn execute(&self, state: &WorkflowState) -> Result<StateFragment> {
        let step = C::DRAFT_STEP;
        let requested = C::requested(&state.counts);
        if requested == 0 {
            return Err(WorkflowError::precondition(step, C::COUNT_FIELD));
        }
        if state.marketing_brief.is_none() {
            return Err(WorkflowError::precondition(step, "marketingBrief"));
        }
        let dossier = state
            .research_dossier
            .as_ref()
            .ok_or_else(|| WorkflowError::precondition(step, "researchDossier"))?;

        let values = base_values(step, state)?.text(PromptSlot::ContentCount, requested.to_string());
        let values = with_json(step, values, PromptSlot::SelectedTheme, &dossier.selected_theme)?;
        let values = with_json(step, values, PromptSlot::ResearchDossier, dossier)?;

        let (extra, queries) = self.preflight(state, &values).await?;
        let values = match extra {
            Some(hits) => with_json(step, values, PromptSlot::AdditionalResearch, &hits)?,
            None => values.text(PromptSlot::AdditionalResearch, "(none)"),
        };

        let output: C::Output = self.ctx.generate(step, step.config_key(), &values).await?;
        let produced = C::item_count(&output);
        if produced != requested {
            return Err(WorkflowError::validation(
                step,
                format!("requested {} items, got {}", requested, produced),
            ));
        }

        Ok(C::draft_fragment(output, queries))
    }
}
