//! Content channels.
//!
//! Drafting and editing work the same way for articles, LinkedIn posts and
//! short social posts; a [`Channel`] supplies the per-channel types, step
//! identities and state fields so [`Drafter`](super::Drafter) and
//! [`Editor`](super::Editor) can be written once.

use schemars::JsonSchema;
use serde::de::DeserializeOwned;
use serde::Serialize;

use super::StepId;
use crate::state::{ContentCounts, StateFragment, WorkflowState};
use crate::types::{ArticleOutput, LinkedInOutput, SocialOutput};
use crate::validate::Validate;

pub trait Channel: Send + Sync + 'static {
    type Output: Serialize + DeserializeOwned + JsonSchema + Validate + Clone + Send + Sync;

    const DRAFT_STEP: StepId;
    const EDIT_STEP: StepId;
    /// Input field holding the requested count
    const COUNT_FIELD: &'static str;
    /// State field holding the draft
    const DRAFT_FIELD: &'static str;

    fn requested(counts: &ContentCounts) -> usize;

    fn item_count(output: &Self::Output) -> usize;

    fn draft(state: &WorkflowState) -> Option<&Self::Output>;

    fn draft_fragment(output: Self::Output, queries: Vec<String>) -> StateFragment;

    fn edit_fragment(output: Self::Output) -> StateFragment;
}

pub struct ArticleChannel;

impl Channel for ArticleChannel {
    type Output = ArticleOutput;

    const DRAFT_STEP: StepId = StepId::ArticleDraft;
    const EDIT_STEP: StepId = StepId::ArticleEdit;
    const COUNT_FIELD: &'static str = "articlesCount";
    const DRAFT_FIELD: &'static str = "articleOutput";

    fn requested(counts: &ContentCounts) -> usize {
        counts.articles_count
    }

    fn item_count(output: &ArticleOutput) -> usize {
        output.articles.len()
    }

    fn draft(state: &WorkflowState) -> Option<&ArticleOutput> {
        state.article_output.as_ref()
    }

    fn draft_fragment(output: ArticleOutput, queries: Vec<String>) -> StateFragment {
        StateFragment::ArticleDraft { output, queries }
    }

    fn edit_fragment(output: ArticleOutput) -> StateFragment {
        StateFragment::ArticleEdit(output)
    }
}

pub struct LinkedInChannel;

impl Channel for LinkedInChannel {
    type Output = LinkedInOutput;

    const DRAFT_STEP: StepId = StepId::LinkedInDraft;
    const EDIT_STEP: StepId = StepId::LinkedInEdit;
    const COUNT_FIELD: &'static str = "linkedinPostsCount";
    const DRAFT_FIELD: &'static str = "linkedinOutput";

    fn requested(counts: &ContentCounts) -> usize {
        counts.linkedin_posts_count
    }

    fn item_count(output: &LinkedInOutput) -> usize {
        output.posts.len()
    }

    fn draft(state: &WorkflowState) -> Option<&LinkedInOutput> {
        state.linkedin_output.as_ref()
    }

    fn draft_fragment(output: LinkedInOutput, queries: Vec<String>) -> StateFragment {
        StateFragment::LinkedInDraft { output, queries }
    }

    fn edit_fragment(output: LinkedInOutput) -> StateFragment {
        StateFragment::LinkedInEdit(output)
    }
}

pub struct SocialChannel;

impl Channel for SocialChannel {
    type Output = SocialOutput;

    const DRAFT_STEP: StepId = StepId::SocialDraft;
    const EDIT_STEP: StepId = StepId::SocialEdit;
    const COUNT_FIELD: &'static str = "socialPostsCount";
    const DRAFT_FIELD: &'static str = "socialOutput";

    fn requested(counts: &ContentCounts) -> usize {
        counts.social_posts_count
    }

    fn item_count(output: &SocialOutput) -> usize {
        output.posts.len()
    }

    fn draft(state: &WorkflowState) -> Option<&SocialOutput> {
        state.social_output.as_ref()
    }

    fn draft_fragment(output: SocialOutput, queries: Vec<String>) -> StateFragment {
        StateFragment::SocialDraft { output, queries }
    }

    fn edit_fragment(output: SocialOutput) -> StateFragment {
        StateFragment::SocialEdit(output)
    }
}
