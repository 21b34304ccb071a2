//! Records produced by generation steps.
//!
//! Every type that a language model is asked to produce derives
//! [`JsonSchema`] so the schema can be sent with the request, and implements
//! [`Validate`](crate::validate::Validate) so the reply is checked before it
//! reaches the workflow state.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

// ============================================================================
// Brief
// ============================================================================

/// Marketing brief produced by the first step and read by every later one
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct MarketingBrief {
    /// Who the content is written for
    pub target_audience: String,

    /// One-sentence statement of the offer's value
    pub value_proposition: String,

    /// Messages every channel should reinforce
    pub key_messages: Vec<String>,

    /// Voice and register to write in
    pub tone_of_voice: String,

    /// How the call to action should be phrased
    pub call_to_action: String,

    /// Short prose summary of the brief
    pub summary: String,
}

// ============================================================================
// Themes
// ============================================================================

/// A candidate content angle shown to the human for selection
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct Theme {
    pub id: String,
    pub title: String,
    pub description: String,
    /// Exactly three supporting reasons
    pub why_it_works: Vec<String>,
    pub detailed_description: String,
}

/// Theme as returned by the model, before an id is assigned
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ThemeDraft {
    pub title: String,
    pub description: String,
    pub why_it_works: Vec<String>,
    pub detailed_description: String,
}

impl ThemeDraft {
    /// Promote the draft into an immutable theme with a fresh id
    pub fn into_theme(self) -> Theme {
        Theme {
            id: uuid::Uuid::new_v4().to_string(),
            title: self.title,
            description: self.description,
            why_it_works: self.why_it_works,
            detailed_description: self.detailed_description,
        }
    }
}

/// Theme synthesis reply: a batch of exactly three themes
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ThemeBatch {
    pub themes: Vec<ThemeDraft>,
}

// ============================================================================
// Research
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum Confidence {
    High,
    Medium,
    Low,
}

/// A finding backed by evidence from the source document
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct KeyFinding {
    pub finding: String,
    /// Supporting excerpt or paraphrase from the retrieved passages
    pub evidence: String,
    pub confidence: Confidence,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct WhitepaperEvidence {
    /// Six to eight findings
    pub key_findings: Vec<KeyFinding>,
}

/// A content concept the drafters can build on
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct SuggestedConcept {
    pub title: String,
    pub angle: String,
    pub rationale: String,
}

/// Research synthesis reply, before the selected theme is attached
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct DossierDraft {
    pub whitepaper_evidence: WhitepaperEvidence,
    /// Exactly three concepts
    pub suggested_concepts: Vec<SuggestedConcept>,
    pub research_summary: String,
}

/// Research dossier consumed by every drafting step
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResearchDossier {
    pub selected_theme: Theme,
    pub whitepaper_evidence: WhitepaperEvidence,
    pub suggested_concepts: Vec<SuggestedConcept>,
    pub research_summary: String,
}

impl ResearchDossier {
    pub fn from_draft(selected_theme: Theme, draft: DossierDraft) -> Self {
        Self {
            selected_theme,
            whitepaper_evidence: draft.whitepaper_evidence,
            suggested_concepts: draft.suggested_concepts,
            research_summary: draft.research_summary,
        }
    }
}

// ============================================================================
// Retrieval sub-call replies
// ============================================================================

/// Initial broad queries for a retrieval loop
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct QueryBatch {
    pub queries: Vec<String>,
}

/// Reply of the "analyze and refine" call made after each search
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct SearchAnalysis {
    pub analysis: String,
    /// Follow-up queries; empty when the model considers the search done
    #[serde(default)]
    pub next_queries: Vec<String>,
    /// Concepts noticed in the results (research variant only)
    #[serde(default)]
    pub emerging_concepts: Vec<String>,
}

/// Drafter pre-flight decision: is the dossier enough to write from?
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ResearchDecision {
    pub sufficient: bool,
    /// One to three ad hoc queries, only when `sufficient` is false
    #[serde(default)]
    pub queries: Vec<String>,
}

// ============================================================================
// Channel content
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct Article {
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subtitle: Option<String>,
    pub body: String,
    pub summary: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ArticleOutput {
    pub articles: Vec<Article>,
    /// Editor's change notes; empty for drafts
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub editor_notes: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct LinkedInPost {
    pub hook: String,
    pub body: String,
    #[serde(default)]
    pub hashtags: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct LinkedInOutput {
    pub posts: Vec<LinkedInPost>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub editor_notes: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct SocialPost {
    pub platform: String,
    pub text: String,
    #[serde(default)]
    pub hashtags: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct SocialOutput {
    pub posts: Vec<SocialPost>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub editor_notes: Vec<String>,
}
