//! Content editors (steps 7-9), one per channel.

use std::marker::PhantomData;
use std::sync::Arc;

use async_trait::async_trait;

use super::{base_values, with_json, Channel, GenerationStep, StepContext, StepId};
use crate::error::{Result, WorkflowError};
use crate::prompt::PromptSlot;
use crate::state::{StateFragment, WorkflowState};

pub struct Editor<C: Channel> {
    ctx: Arc<StepContext>,
    channel: PhantomData<C>,
}

impl<C: Channel> Editor<C> {
    pub fn new(ctx: Arc<StepContext>) -> Self {
        Self {
            ctx,
            channel: PhantomData,
        }
    }
}

#[async_trait]
impl<C: Channel> GenerationStep for Editor<C> {
    fn id(&self) -> StepId {
        C::EDIT_STEP
    }

    fn is_enabled(&self, state: &WorkflowState) -> bool {
        C::draft(state).is_some()
    }

    async fn execute(&self, state: &WorkflowState) -> Result<StateFragment> {
        let step = C::EDIT_STEP;
        let draft = C::draft(state).ok_or_else(|| WorkflowError::precondition(step, C::DRAFT_FIELD))?;
        let expected = C::item_count(draft);

        let mut values = base_values(step, state)?.text(PromptSlot::ContentCount, expected.to_string());
        values = with_json(step, values, PromptSlot::Draft, draft)?;
        if let Some(theme) = &state.selected_theme {
            values = with_json(step, values, PromptSlot::SelectedTheme, theme)?;
        }

        let edited: C::Output = self.ctx.generate(step, step.config_key(), &values).await?;
        let produced = C::item_count(&edited);
        if produced != expected {
            // Editors polish; they must not add or drop pieces
            return Err(WorkflowError::validation(
                step,
                format!("draft has {} items, edit returned {}", expected, produced),
            ));
        }

        Ok(C::edit_fragment(edited))
    }
}
