//! Schema validation of model replies.
//!
//! A reply is accepted into the workflow state only after it has been
//! extracted (structured payload, or JSON found inside free text),
//! deserialized into the expected Rust type, and checked by that type's
//! [`Validate`] implementation.

use std::collections::HashSet;

use schemars::JsonSchema;
use serde::de::DeserializeOwned;

use crate::capabilities::GenerationOutput;
use crate::types::{
    ArticleOutput, DossierDraft, LinkedInOutput, MarketingBrief, QueryBatch, ResearchDecision,
    SearchAnalysis, SocialOutput, ThemeBatch,
};

/// Shape rules a deserialized reply must satisfy
pub trait Validate {
    fn validate(&self) -> Result<(), String>;
}

/// JSON Schema sent with a request for `T`
pub fn schema_for<T: JsonSchema>() -> serde_json::Value {
    schemars::schema_for!(T).to_value()
}

/// Extract JSON content from markdown code blocks or raw text
///
/// Handles:
/// - Fenced blocks with any language tag (```json, ```JSON, ...)
/// - Generic ``` blocks
/// - Prose around a bare object (first `{` to last `}`)
pub fn extract_json(text: &str) -> String {
    if let Some(start) = text.find("```") {
        let mut body_start = start + 3;
        let tag_end = text[body_start..]
            .find('\n')
            .map(|pos| pos + body_start)
            .unwrap_or(text.len());
        let tag = text[body_start..tag_end].trim();
        if !tag.is_empty() && tag.chars().all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_') {
            body_start = tag_end;
        }
        let body_end = text[body_start..]
            .find("```")
            .map(|pos| pos + body_start)
            .unwrap_or(text.len());
        return text[body_start..body_end].trim().to_string();
    }

    match (text.find('{'), text.rfind('}')) {
        (Some(open), Some(close)) if open < close => text[open..=close].to_string(),
        _ => text.trim().to_string(),
    }
}

/// Deserialize and validate a model reply into `T`
pub fn parse_reply<T>(output: GenerationOutput) -> Result<T, String>
where
    T: DeserializeOwned + Validate,
{
    let parsed: T = match output {
        GenerationOutput::Structured(value) => {
            serde_json::from_value(value).map_err(|e| format!("reply does not match schema: {}", e))?
        }
        GenerationOutput::Text(text) => {
            let json = extract_json(&text);
            serde_json::from_str(&json).map_err(|e| {
                let preview: String = json.chars().take(200).collect();
                format!("reply is not valid JSON for the schema: {} (preview: {})", e, preview)
            })?
        }
    };
    parsed.validate()?;
    Ok(parsed)
}

fn require_text(field: &str, value: &str) -> Result<(), String> {
    if value.trim().is_empty() {
        Err(format!("`{}` must not be empty", field))
    } else {
        Ok(())
    }
}

fn require_count(field: &str, actual: usize, expected: std::ops::RangeInclusive<usize>) -> Result<(), String> {
    if expected.contains(&actual) {
        return Ok(());
    }
    if expected.start() == expected.end() {
        Err(format!("`{}` must have exactly {} items, got {}", field, expected.start(), actual))
    } else {
        Err(format!(
            "`{}` must have {} to {} items, got {}",
            field,
            expected.start(),
            expected.end(),
            actual
        ))
    }
}

fn require_queries(field: &str, queries: &[String]) -> Result<(), String> {
    if queries.iter().any(|q| q.trim().is_empty()) {
        return Err(format!("`{}` contains a blank query", field));
    }
    Ok(())
}

impl Validate for MarketingBrief {
    fn validate(&self) -> Result<(), String> {
        require_text("targetAudience", &self.target_audience)?;
        require_text("valueProposition", &self.value_proposition)?;
        require_text("toneOfVoice", &self.tone_of_voice)?;
        require_text("callToAction", &self.call_to_action)?;
        require_text("summary", &self.summary)?;
        if self.key_messages.is_empty() {
            return Err("`keyMessages` must not be empty".to_string());
        }
        Ok(())
    }
}

impl Validate for ThemeBatch {
    fn validate(&self) -> Result<(), String> {
        require_count("themes", self.themes.len(), 3..=3)?;
        let mut titles = HashSet::new();
        for (idx, theme) in self.themes.iter().enumerate() {
            require_text(&format!("themes[{}].title", idx), &theme.title)?;
            require_text(&format!("themes[{}].description", idx), &theme.description)?;
            require_text(
                &format!("themes[{}].detailedDescription", idx),
                &theme.detailed_description,
            )?;
            require_count(
                &format!("themes[{}].whyItWorks", idx),
                theme.why_it_works.len(),
                3..=3,
            )?;
            if !titles.insert(theme.title.trim().to_lowercase()) {
                return Err(format!("duplicate theme title `{}`", theme.title));
            }
        }
        Ok(())
    }
}

impl Validate for DossierDraft {
    fn validate(&self) -> Result<(), String> {
        let findings = &self.whitepaper_evidence.key_findings;
        require_count("whitepaperEvidence.keyFindings", findings.len(), 6..=8)?;
        for (idx, finding) in findings.iter().enumerate() {
            require_text(&format!("keyFindings[{}].finding", idx), &finding.finding)?;
        }
        require_count("suggestedConcepts", self.suggested_concepts.len(), 3..=3)?;
        for (idx, concept) in self.suggested_concepts.iter().enumerate() {
            require_text(&format!("suggestedConcepts[{}].title", idx), &concept.title)?;
        }
        require_text("researchSummary", &self.research_summary)
    }
}

impl Validate for QueryBatch {
    fn validate(&self) -> Result<(), String> {
        require_count("queries", self.queries.len(), 2..=3)?;
        require_queries("queries", &self.queries)
    }
}

impl Validate for SearchAnalysis {
    fn validate(&self) -> Result<(), String> {
        if self.next_queries.len() > 4 {
            return Err(format!(
                "`nextQueries` must have at most 4 items, got {}",
                self.next_queries.len()
            ));
        }
        require_queries("nextQueries", &self.next_queries)
    }
}

impl Validate for ResearchDecision {
    fn validate(&self) -> Result<(), String> {
        if self.sufficient {
            return Ok(());
        }
        require_count("queries", self.queries.len(), 1..=3)?;
        require_queries("queries", &self.queries)
    }
}

impl Validate for ArticleOutput {
    fn validate(&self) -> Result<(), String> {
        for (idx, article) in self.articles.iter().enumerate() {
            require_text(&format!("articles[{}].title", idx), &article.title)?;
            require_text(&format!("articles[{}].body", idx), &article.body)?;
        }
        Ok(())
    }
}

impl Validate for LinkedInOutput {
    fn validate(&self) -> Result<(), String> {
        for (idx, post) in self.posts.iter().enumerate() {
            require_text(&format!("posts[{}].hook", idx), &post.hook)?;
            require_text(&format!("posts[{}].body", idx), &post.body)?;
        }
        Ok(())
    }
}

impl Validate for SocialOutput {
    fn validate(&self) -> Result<(), String> {
        for (idx, post) in self.posts.iter().enumerate() {
            require_text(&format!("posts[{}].platform", idx), &post.platform)?;
            require_text(&format!("posts[{}].text", idx), &post.text)?;
        }
        Ok(())
    }
}
