//! Workflow state threaded through the pipeline.
//!
//! [`WorkflowState`] is the single source of truth for a run. Steps never
//! mutate it: they read a snapshot and return a [`StateFragment`], and the
//! state machine folds fragments into a new state value. Serialized field
//! names are camelCase so a suspended state can be stored by the caller and
//! handed back to [`resume`](crate::machine::WorkflowMachine::resume).

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{Result, WorkflowError};
use crate::types::{
    ArticleOutput, LinkedInOutput, MarketingBrief, ResearchDossier, SocialOutput, Theme,
};

/// Last step that completed successfully
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CurrentStep {
    BriefCreation,
    BriefComplete,
    ThemesGenerated,
    AwaitingThemeSelection,
    ThemeSelected,
    ResearchComplete,
    ContentGenerated,
    ContentEdited,
}

impl CurrentStep {
    pub fn as_str(&self) -> &'static str {
        match self {
            CurrentStep::BriefCreation => "brief_creation",
            CurrentStep::BriefComplete => "brief_complete",
            CurrentStep::ThemesGenerated => "themes_generated",
            CurrentStep::AwaitingThemeSelection => "awaiting_theme_selection",
            CurrentStep::ThemeSelected => "theme_selected",
            CurrentStep::ResearchComplete => "research_complete",
            CurrentStep::ContentGenerated => "content_generated",
            CurrentStep::ContentEdited => "content_edited",
        }
    }
}

impl fmt::Display for CurrentStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Call to action the content should drive towards
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CtaType {
    ContactUs,
    BookDemo,
    DownloadWhitepaper,
    FreeTrial,
    VisitWebsite,
}

impl CtaType {
    pub fn as_str(&self) -> &'static str {
        match self {
            CtaType::ContactUs => "contact_us",
            CtaType::BookDemo => "book_demo",
            CtaType::DownloadWhitepaper => "download_whitepaper",
            CtaType::FreeTrial => "free_trial",
            CtaType::VisitWebsite => "visit_website",
        }
    }
}

/// How many pieces of each channel's content were requested
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContentCounts {
    #[serde(default)]
    pub articles_count: usize,
    #[serde(default)]
    pub linkedin_posts_count: usize,
    #[serde(default)]
    pub social_posts_count: usize,
}

impl ContentCounts {
    pub fn any_requested(&self) -> bool {
        self.articles_count > 0 || self.linkedin_posts_count > 0 || self.social_posts_count > 0
    }
}

/// Caller-supplied input that starts a run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkflowInput {
    pub business_context: String,
    #[serde(default)]
    pub target_audience: Option<String>,
    pub cta_type: CtaType,
    #[serde(default)]
    pub cta_url: Option<String>,
    #[serde(default)]
    pub selected_whitepaper_id: Option<String>,
    #[serde(flatten)]
    pub counts: ContentCounts,
}

impl WorkflowInput {
    pub fn validate(&self) -> Result<()> {
        if self.business_context.trim().is_empty() {
            return Err(WorkflowError::InvalidInput(
                "businessContext must not be empty".to_string(),
            ));
        }
        if matches!(&self.selected_whitepaper_id, Some(id) if id.trim().is_empty()) {
            return Err(WorkflowError::InvalidInput(
                "selectedWhitepaperId must not be blank when provided".to_string(),
            ));
        }
        Ok(())
    }
}

/// Canonical state of one workflow run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkflowState {
    pub current_step: CurrentStep,
    #[serde(default)]
    pub needs_human_input: bool,
    #[serde(default)]
    pub is_complete: bool,

    pub business_context: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_audience: Option<String>,
    pub cta_type: CtaType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cta_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub selected_whitepaper_id: Option<String>,
    #[serde(flatten)]
    pub counts: ContentCounts,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub marketing_brief: Option<MarketingBrief>,
    #[serde(default)]
    pub generated_themes: Vec<Theme>,
    #[serde(default)]
    pub previous_themes: Vec<Theme>,
    #[serde(default)]
    pub search_history: Vec<String>,
    #[serde(default)]
    pub regeneration_count: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub selected_theme: Option<Theme>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub research_dossier: Option<ResearchDossier>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub article_output: Option<ArticleOutput>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub linkedin_output: Option<LinkedInOutput>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub social_output: Option<SocialOutput>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub edited_article_output: Option<ArticleOutput>,
    #[serde(
        default,
        rename = "editedLinkedInOutput",
        skip_serializing_if = "Option::is_none"
    )]
    pub edited_linkedin_output: Option<LinkedInOutput>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub edited_social_output: Option<SocialOutput>,
}

impl WorkflowState {
    /// Initial state for a fresh run
    pub fn from_input(input: WorkflowInput) -> Self {
        Self {
            current_step: CurrentStep::BriefCreation,
            needs_human_input: false,
            is_complete: false,
            business_context: input.business_context,
            target_audience: input.target_audience,
            cta_type: input.cta_type,
            cta_url: input.cta_url,
            selected_whitepaper_id: input.selected_whitepaper_id,
            counts: input.counts,
            marketing_brief: None,
            generated_themes: Vec::new(),
            previous_themes: Vec::new(),
            search_history: Vec::new(),
            regeneration_count: 0,
            selected_theme: None,
            research_dossier: None,
            article_output: None,
            linkedin_output: None,
            social_output: None,
            edited_article_output: None,
            edited_linkedin_output: None,
            edited_social_output: None,
        }
    }

    /// Fold one step's fragment into the state
    ///
    /// Replaces exactly the fields the fragment owns and appends its queries
    /// to the search history.
    pub fn apply(mut self, fragment: StateFragment) -> Self {
        match fragment {
            StateFragment::Brief(brief) => self.marketing_brief = Some(brief),
            StateFragment::Themes { themes, queries } => {
                self.generated_themes = themes;
                self.regeneration_count += 1;
                self.search_history.extend(queries);
            }
            StateFragment::Research { dossier, queries } => {
                self.research_dossier = Some(dossier);
                self.search_history.extend(queries);
            }
            StateFragment::ArticleDraft { output, queries } => {
                self.article_output = Some(output);
                self.search_history.extend(queries);
            }
            StateFragment::LinkedInDraft { output, queries } => {
                self.linkedin_output = Some(output);
                self.search_history.extend(queries);
            }
            StateFragment::SocialDraft { output, queries } => {
                self.social_output = Some(output);
                self.search_history.extend(queries);
            }
            StateFragment::ArticleEdit(output) => self.edited_article_output = Some(output),
            StateFragment::LinkedInEdit(output) => self.edited_linkedin_output = Some(output),
            StateFragment::SocialEdit(output) => self.edited_social_output = Some(output),
        }
        self
    }

    /// Fold the fragments of a fan-in group
    ///
    /// Fragments are ordered by the field they own first, so the result does
    /// not depend on the order in which siblings finished.
    pub fn merge(self, mut fragments: Vec<StateFragment>) -> Self {
        fragments.sort_by_key(StateFragment::slot);
        debug_assert!(
            fragments.windows(2).all(|pair| pair[0].slot() != pair[1].slot()),
            "fan-in fragments must own disjoint fields"
        );
        fragments
            .into_iter()
            .fold(self, |state, fragment| state.apply(fragment))
    }

    /// Move to a new control-flow position
    pub fn advance(mut self, step: CurrentStep) -> Self {
        self.current_step = step;
        self
    }

    pub fn has_any_draft(&self) -> bool {
        self.article_output.is_some() || self.linkedin_output.is_some() || self.social_output.is_some()
    }

    pub fn find_generated_theme(&self, theme_id: &str) -> Option<&Theme> {
        self.generated_themes.iter().find(|theme| theme.id == theme_id)
    }

    /// Final content per channel, preferring edited over drafted output
    pub fn final_content(&self) -> FinalContent<'_> {
        FinalContent {
            article: self
                .edited_article_output
                .as_ref()
                .or(self.article_output.as_ref()),
            linkedin: self
                .edited_linkedin_output
                .as_ref()
                .or(self.linkedin_output.as_ref()),
            social: self
                .edited_social_output
                .as_ref()
                .or(self.social_output.as_ref()),
        }
    }
}

/// Borrowed view of the content a finished run produced
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FinalContent<'a> {
    pub article: Option<&'a ArticleOutput>,
    pub linkedin: Option<&'a LinkedInOutput>,
    pub social: Option<&'a SocialOutput>,
}

/// State field owned by a fragment
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum FieldSlot {
    MarketingBrief,
    GeneratedThemes,
    ResearchDossier,
    ArticleOutput,
    LinkedinOutput,
    SocialOutput,
    EditedArticleOutput,
    EditedLinkedInOutput,
    EditedSocialOutput,
}

impl FieldSlot {
    pub fn field_name(&self) -> &'static str {
        match self {
            FieldSlot::MarketingBrief => "marketingBrief",
            FieldSlot::GeneratedThemes => "generatedThemes",
            FieldSlot::ResearchDossier => "researchDossier",
            FieldSlot::ArticleOutput => "articleOutput",
            FieldSlot::LinkedinOutput => "linkedinOutput",
            FieldSlot::SocialOutput => "socialOutput",
            FieldSlot::EditedArticleOutput => "editedArticleOutput",
            FieldSlot::EditedLinkedInOutput => "editedLinkedInOutput",
            FieldSlot::EditedSocialOutput => "editedSocialOutput",
        }
    }
}

/// Output of one generation step; each arm owns a disjoint set of fields
#[derive(Debug, Clone, PartialEq)]
pub enum StateFragment {
    Brief(MarketingBrief),
    Themes {
        themes: Vec<Theme>,
        queries: Vec<String>,
    },
    Research {
        dossier: ResearchDossier,
        queries: Vec<String>,
    },
    ArticleDraft {
        output: ArticleOutput,
        queries: Vec<String>,
    },
    LinkedInDraft {
        output: LinkedInOutput,
        queries: Vec<String>,
    },
    SocialDraft {
        output: SocialOutput,
        queries: Vec<String>,
    },
    ArticleEdit(ArticleOutput),
    LinkedInEdit(LinkedInOutput),
    SocialEdit(SocialOutput),
}

impl StateFragment {
    pub fn slot(&self) -> FieldSlot {
        match self {
            StateFragment::Brief(_) => FieldSlot::MarketingBrief,
            StateFragment::Themes { .. } => FieldSlot::GeneratedThemes,
            StateFragment::Research { .. } => FieldSlot::ResearchDossier,
            StateFragment::ArticleDraft { .. } => FieldSlot::ArticleOutput,
            StateFragment::LinkedInDraft { .. } => FieldSlot::LinkedinOutput,
            StateFragment::SocialDraft { .. } => FieldSlot::SocialOutput,
            StateFragment::ArticleEdit(_) => FieldSlot::EditedArticleOutput,
            StateFragment::LinkedInEdit(_) => FieldSlot::EditedLinkedInOutput,
            StateFragment::SocialEdit(_) => FieldSlot::EditedSocialOutput,
        }
    }
}
