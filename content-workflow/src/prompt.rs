//! Typed prompt templates.
//!
//! User prompt templates come from the configuration store and reference
//! values through `{{slot_name}}` placeholders. The set of slots is closed:
//! an unknown placeholder is rejected when the template is parsed, and a
//! placeholder without a value is rejected when it is rendered.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use serde::Serialize;

/// Named value a prompt template may reference
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum PromptSlot {
    BusinessContext,
    TargetAudience,
    CtaType,
    CtaUrl,
    MarketingBrief,
    SeedContext,
    ExcludedThemes,
    PriorQueries,
    LatestQuery,
    SearchResults,
    EmergingConcepts,
    SelectedTheme,
    ResearchDossier,
    AdditionalResearch,
    ContentCount,
    Draft,
}

impl PromptSlot {
    pub const ALL: [PromptSlot; 16] = [
        PromptSlot::BusinessContext,
        PromptSlot::TargetAudience,
        PromptSlot::CtaType,
        PromptSlot::CtaUrl,
        PromptSlot::MarketingBrief,
        PromptSlot::SeedContext,
        PromptSlot::ExcludedThemes,
        PromptSlot::PriorQueries,
        PromptSlot::LatestQuery,
        PromptSlot::SearchResults,
        PromptSlot::EmergingConcepts,
        PromptSlot::SelectedTheme,
        PromptSlot::ResearchDossier,
        PromptSlot::AdditionalResearch,
        PromptSlot::ContentCount,
        PromptSlot::Draft,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            PromptSlot::BusinessContext => "business_context",
            PromptSlot::TargetAudience => "target_audience",
            PromptSlot::CtaType => "cta_type",
            PromptSlot::CtaUrl => "cta_url",
            PromptSlot::MarketingBrief => "marketing_brief",
            PromptSlot::SeedContext => "seed_context",
            PromptSlot::ExcludedThemes => "excluded_themes",
            PromptSlot::PriorQueries => "prior_queries",
            PromptSlot::LatestQuery => "latest_query",
            PromptSlot::SearchResults => "search_results",
            PromptSlot::EmergingConcepts => "emerging_concepts",
            PromptSlot::SelectedTheme => "selected_theme",
            PromptSlot::ResearchDossier => "research_dossier",
            PromptSlot::AdditionalResearch => "additional_research",
            PromptSlot::ContentCount => "content_count",
            PromptSlot::Draft => "draft",
        }
    }

    pub fn from_name(name: &str) -> Option<PromptSlot> {
        PromptSlot::ALL.into_iter().find(|slot| slot.name() == name)
    }
}

impl fmt::Display for PromptSlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TemplateError {
    #[error("unknown placeholder `{{{{{0}}}}}`")]
    UnknownPlaceholder(String),

    #[error("unterminated placeholder starting at byte {0}")]
    Unterminated(usize),

    #[error("no value supplied for `{{{{{0}}}}}`")]
    MissingValue(PromptSlot),

    #[error("could not serialize value for `{0}`: {1}")]
    Serialize(PromptSlot, String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Literal(String),
    Slot(PromptSlot),
}

/// Parsed user prompt template
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PromptTemplate {
    segments: Vec<Segment>,
}

impl PromptTemplate {
    pub fn parse(source: &str) -> Result<Self, TemplateError> {
        let mut segments = Vec::new();
        let mut rest = source;
        let mut offset = 0;

        while let Some(open) = rest.find("{{") {
            if open > 0 {
                segments.push(Segment::Literal(rest[..open].to_string()));
            }
            let after_open = &rest[open + 2..];
            let close = after_open
                .find("}}")
                .ok_or(TemplateError::Unterminated(offset + open))?;
            let name = after_open[..close].trim();
            let slot = PromptSlot::from_name(name)
                .ok_or_else(|| TemplateError::UnknownPlaceholder(name.to_string()))?;
            segments.push(Segment::Slot(slot));

            let consumed = open + 2 + close + 2;
            offset += consumed;
            rest = &rest[consumed..];
        }
        if !rest.is_empty() {
            segments.push(Segment::Literal(rest.to_string()));
        }

        Ok(Self { segments })
    }

    /// Slots referenced by this template
    pub fn slots(&self) -> BTreeSet<PromptSlot> {
        self.segments
            .iter()
            .filter_map(|segment| match segment {
                Segment::Slot(slot) => Some(*slot),
                Segment::Literal(_) => None,
            })
            .collect()
    }

    pub fn render(&self, values: &PromptValues) -> Result<String, TemplateError> {
        let mut out = String::new();
        for segment in &self.segments {
            match segment {
                Segment::Literal(text) => out.push_str(text),
                Segment::Slot(slot) => {
                    let value = values
                        .get(*slot)
                        .ok_or(TemplateError::MissingValue(*slot))?;
                    out.push_str(value);
                }
            }
        }
        Ok(out)
    }
}

/// Values available to a template render
///
/// Supplying more values than a template uses is fine; templates are free to
/// ignore context they do not need.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PromptValues {
    values: BTreeMap<PromptSlot, String>,
}

impl PromptValues {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn text(mut self, slot: PromptSlot, value: impl Into<String>) -> Self {
        self.values.insert(slot, value.into());
        self
    }

    /// Set a slot to the pretty-printed JSON form of `value`
    pub fn json<T: Serialize + ?Sized>(mut self, slot: PromptSlot, value: &T) -> Result<Self, TemplateError> {
        let rendered = serde_json::to_string_pretty(value)
            .map_err(|e| TemplateError::Serialize(slot, e.to_string()))?;
        self.values.insert(slot, rendered);
        Ok(self)
    }

    /// Set a slot to a bulleted list, or `(none)` when empty
    pub fn list<S: AsRef<str>>(mut self, slot: PromptSlot, items: &[S]) -> Self {
        let rendered = if items.is_empty() {
            "(none)".to_string()
        } else {
            items
                .iter()
                .map(|item| format!("- {}", item.as_ref()))
                .collect::<Vec<_>>()
                .join("\n")
        };
        self.values.insert(slot, rendered);
        self
    }

    pub fn get(&self, slot: PromptSlot) -> Option<&str> {
        self.values.get(&slot).map(String::as_str)
    }
}
