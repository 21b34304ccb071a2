//! Workflow state machine.
//!
//! [`WorkflowMachine`] owns the pipeline: it decides what runs next from the
//! current state through [`next_transition`], runs single steps and fan-out
//! groups, and stops at the one human decision point (theme selection).
//!
//! Entry points never mutate the caller's state. `resume` and
//! `regenerate_themes` take a borrowed suspended state and return a new one,
//! so a failed call leaves the caller free to try again from the same value.
//!
//! # Example Usage
//!
//! ```rust,no_run
//! use content_workflow::machine::WorkflowMachine;
//! use content_workflow::capabilities::Capabilities;
//! use content_workflow::settings::WorkflowSettings;
//! use content_workflow::state::WorkflowInput;
//!
//! # async fn example(capabilities: Capabilities, input: WorkflowInput) -> anyhow::Result<()> {
//! let machine = WorkflowMachine::new(capabilities, WorkflowSettings::default());
//!
//! let suspended = machine.start(input).await?;
//! let theme_id = suspended.generated_themes[0].id.clone();
//! let finished = machine.resume(&suspended, &theme_id).await?;
//! assert!(finished.is_complete);
//! # Ok(())
//! # }
//! ```

use std::sync::Arc;

use content_workflow_sdk::{
    log_awaiting_input, log_stage_complete, log_stage_failed, log_stage_start,
};

use crate::capabilities::Capabilities;
use crate::error::{Result, WorkflowError};
use crate::fanout::FanOutGroup;
use crate::settings::WorkflowSettings;
use crate::state::{CurrentStep, WorkflowInput, WorkflowState};
use crate::steps::{
    run_logged, ArticleChannel, BriefStep, Drafter, Editor, GenerationStep, LinkedInChannel,
    ResearchStep, SocialChannel, Stage, StepContext, ThemeStep,
};

/// What the machine does next from a given state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    CreateBrief,
    GenerateThemes,
    /// Themes are ready; hand control back to the caller
    Suspend,
    /// Already suspended; only `resume` or `regenerate_themes` moves on
    AwaitSelection,
    Research,
    GenerateContent,
    EditContent,
    /// Finish successfully with `isComplete = true`
    Complete,
    /// Stop without completing
    Halt,
}

/// Pure transition predicate evaluated after every step
pub fn next_transition(state: &WorkflowState) -> Transition {
    match state.current_step {
        CurrentStep::BriefCreation => Transition::CreateBrief,
        CurrentStep::BriefComplete if state.marketing_brief.is_some() => Transition::GenerateThemes,
        CurrentStep::ThemesGenerated if state.generated_themes.len() == 3 => Transition::Suspend,
        CurrentStep::AwaitingThemeSelection => Transition::AwaitSelection,
        CurrentStep::ThemeSelected if state.selected_theme.is_some() => Transition::Research,
        CurrentStep::ResearchComplete if state.research_dossier.is_some() => {
            if state.counts.any_requested() {
                Transition::GenerateContent
            } else {
                Transition::Complete
            }
        }
        CurrentStep::ContentGenerated if state.has_any_draft() => Transition::EditContent,
        CurrentStep::ContentEdited => Transition::Complete,
        _ => Transition::Halt,
    }
}

pub struct WorkflowMachine {
    ctx: Arc<StepContext>,
    brief: Arc<dyn GenerationStep>,
    themes: Arc<dyn GenerationStep>,
    research: Arc<dyn GenerationStep>,
    drafting: FanOutGroup,
    editing: FanOutGroup,
}

impl WorkflowMachine {
    pub fn new(capabilities: Capabilities, settings: WorkflowSettings) -> Self {
        let ctx = Arc::new(StepContext::new(capabilities, settings));

        let drafting = FanOutGroup::new(Stage::ContentGeneration)
            .member(Arc::new(Drafter::<ArticleChannel>::new(ctx.clone())))
            .member(Arc::new(Drafter::<LinkedInChannel>::new(ctx.clone())))
            .member(Arc::new(Drafter::<SocialChannel>::new(ctx.clone())));
        let editing = FanOutGroup::new(Stage::ContentEditing)
            .member(Arc::new(Editor::<ArticleChannel>::new(ctx.clone())))
            .member(Arc::new(Editor::<LinkedInChannel>::new(ctx.clone())))
            .member(Arc::new(Editor::<SocialChannel>::new(ctx.clone())));

        Self {
            brief: Arc::new(BriefStep::new(ctx.clone())),
            themes: Arc::new(ThemeStep::new(ctx.clone())),
            research: Arc::new(ResearchStep::new(ctx.clone())),
            drafting,
            editing,
            ctx,
        }
    }

    pub fn settings(&self) -> &WorkflowSettings {
        &self.ctx.settings
    }

    /// Run from the caller's input up to theme selection
    pub async fn start(&self, input: WorkflowInput) -> Result<WorkflowState> {
        input.validate()?;
        self.drive(WorkflowState::from_input(input)).await
    }

    /// Continue a suspended run with the human's theme choice
    ///
    /// Every generated theme moves into `previousThemes`; the chosen one
    /// becomes `selectedTheme`. Runs research, drafting and editing without
    /// suspending again.
    pub async fn resume(&self, state: &WorkflowState, theme_id: &str) -> Result<WorkflowState> {
        ensure_suspended(state)?;
        let theme = state
            .find_generated_theme(theme_id)
            .cloned()
            .ok_or_else(|| WorkflowError::UnknownTheme(theme_id.to_string()))?;

        let mut next = retire_generated_themes(state.clone());
        next.selected_theme = Some(theme);
        self.drive(next.advance(CurrentStep::ThemeSelected)).await
    }

    /// Replace the current themes with three new ones and suspend again
    ///
    /// The retired themes join the exclusion set so none is proposed twice.
    pub async fn regenerate_themes(&self, state: &WorkflowState) -> Result<WorkflowState> {
        ensure_suspended(state)?;
        if let Some(limit) = self.ctx.settings.max_regenerations {
            if state.regeneration_count >= limit {
                return Err(WorkflowError::RegenerationLimit(limit));
            }
        }

        let next = retire_generated_themes(state.clone());
        self.drive(next.advance(CurrentStep::BriefComplete)).await
    }

    async fn drive(&self, mut state: WorkflowState) -> Result<WorkflowState> {
        loop {
            state = match next_transition(&state) {
                Transition::CreateBrief => self
                    .run_single(Stage::Brief, self.brief.as_ref(), state)
                    .await?
                    .advance(CurrentStep::BriefComplete),
                Transition::GenerateThemes => self
                    .run_single(Stage::Themes, self.themes.as_ref(), state)
                    .await?
                    .advance(CurrentStep::ThemesGenerated),
                Transition::Suspend => {
                    let mut suspended = state.advance(CurrentStep::AwaitingThemeSelection);
                    suspended.needs_human_input = true;
                    log_awaiting_input!("theme_selection", suspended.generated_themes.len());
                    return Ok(suspended);
                }
                Transition::AwaitSelection | Transition::Halt => return Ok(state),
                Transition::Research => self
                    .run_single(Stage::Research, self.research.as_ref(), state)
                    .await?
                    .advance(CurrentStep::ResearchComplete),
                Transition::GenerateContent => self
                    .run_group(&self.drafting, state)
                    .await?
                    .advance(CurrentStep::ContentGenerated),
                Transition::EditContent => self
                    .run_group(&self.editing, state)
                    .await?
                    .advance(CurrentStep::ContentEdited),
                Transition::Complete => {
                    state.is_complete = true;
                    return Ok(state);
                }
            };
        }
    }

    async fn run_single(
        &self,
        stage: Stage,
        step: &dyn GenerationStep,
        state: WorkflowState,
    ) -> Result<WorkflowState> {
        log_stage_start!(stage, stage.name());
        match run_logged(step, &state).await {
            Ok(fragment) => {
                log_stage_complete!(stage, stage.name());
                Ok(state.apply(fragment))
            }
            Err(err) => {
                log_stage_failed!(stage, stage.name(), &err);
                Err(err)
            }
        }
    }

    async fn run_group(&self, group: &FanOutGroup, state: WorkflowState) -> Result<WorkflowState> {
        let stage = group.stage();
        log_stage_start!(stage, stage.name());

        let snapshot = Arc::new(state);
        match group.run(Arc::clone(&snapshot)).await {
            Ok(fragments) => {
                log_stage_complete!(stage, stage.name());
                let state = Arc::try_unwrap(snapshot).unwrap_or_else(|shared| (*shared).clone());
                Ok(state.merge(fragments))
            }
            Err(err) => {
                log_stage_failed!(stage, stage.name(), &err);
                Err(err)
            }
        }
    }
}

fn ensure_suspended(state: &WorkflowState) -> Result<()> {
    if state.current_step == CurrentStep::AwaitingThemeSelection && state.needs_human_input {
        Ok(())
    } else {
        Err(WorkflowError::NotSuspended(state.current_step))
    }
}

/// Move every generated theme into the append-only memory set
fn retire_generated_themes(mut state: WorkflowState) -> WorkflowState {
    let retired = std::mem::take(&mut state.generated_themes);
    state.previous_themes.extend(retired);
    state.needs_human_input = false;
    state
}
