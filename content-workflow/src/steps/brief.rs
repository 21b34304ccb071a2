//! Step 1: marketing brief from the caller's business context.

use std::sync::Arc;

use async_trait::async_trait;

use super::{base_values, GenerationStep, StepContext, StepId};
use crate::error::{Result, WorkflowError};
use crate::state::{StateFragment, WorkflowState};
use crate::types::MarketingBrief;

pub struct BriefStep {
    ctx: Arc<StepContext>,
}

impl BriefStep {
    pub fn new(ctx: Arc<StepContext>) -> Self {
        Self { ctx }
    }
}

#[async_trait]
impl GenerationStep for BriefStep {
    fn id(&self) -> StepId {
        StepId::Brief
    }

    async fn execute(&self, state: &WorkflowState) -> Result<StateFragment> {
        if state.business_context.trim().is_empty() {
            return Err(WorkflowError::precondition(StepId::Brief, "businessContext"));
        }

        let values = base_values(StepId::Brief, state)?;
        let brief: MarketingBrief = self
            .ctx
            .generate(StepId::Brief, StepId::Brief.config_key(), &values)
            .await?;

        Ok(StateFragment::Brief(brief))
    }
}
