//! Iterative "search, analyze, refine" retrieval loop.
//!
//! Used by the theme and research steps before their synthesis call. One
//! planning call yields the initial query batch; every executed query is
//! followed by an analysis call that may propose follow-ups. The loop stops
//! when the search budget is spent or a round proposes nothing new, then
//! hands back the de-duplicated, score-ranked hits.
//!
//! A failed search never fails the loop: it is logged and counted as zero
//! results. A failed planning or analysis call does.

use std::cmp::Ordering;
use std::collections::{HashMap, HashSet};

use content_workflow_sdk::{log_search_complete, log_search_failed, log_search_issued};
use serde::Serialize;

use crate::capabilities::{SearchHit, SearchQuery};
use crate::error::{Result, WorkflowError};
use crate::prompt::{PromptSlot, PromptValues};
use crate::steps::{with_json, StepContext, StepId, SubCall};
use crate::types::{QueryBatch, SearchAnalysis};

/// Which step the loop runs for
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetrievalVariant {
    /// Theme discovery: plain analysis
    Themes,
    /// Theme research: analysis also tracks emerging concepts
    Research,
}

impl RetrievalVariant {
    fn step(&self) -> StepId {
        match self {
            RetrievalVariant::Themes => StepId::Themes,
            RetrievalVariant::Research => StepId::Research,
        }
    }
}

/// One executed query and what the analysis made of it
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LoopEntry {
    /// 1-based count of queries executed so far
    pub iteration: usize,
    pub query: String,
    pub hits: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub search_error: Option<String>,
    pub analysis: String,
    pub next_queries: Vec<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RetrievalOutcome {
    /// Ranked, de-duplicated hits, truncated to the loop's top-N
    pub hits: Vec<SearchHit>,
    pub log: Vec<LoopEntry>,
    /// Queries in execution order
    pub queries: Vec<String>,
    pub emerging_concepts: Vec<String>,
}

pub struct RetrievalLoop<'a> {
    ctx: &'a StepContext,
    variant: RetrievalVariant,
    corpus_ref: String,
    top_n: usize,
}

impl<'a> RetrievalLoop<'a> {
    pub fn new(ctx: &'a StepContext, variant: RetrievalVariant, corpus_ref: impl Into<String>, top_n: usize) -> Self {
        Self {
            ctx,
            variant,
            corpus_ref: corpus_ref.into(),
            top_n,
        }
    }

    /// Run the loop to completion
    ///
    /// `seed` carries the step's context slots; the loop adds the exclusion
    /// set, prior queries, latest query, its results and (research variant)
    /// emerging concepts before each model call.
    pub async fn run(
        &self,
        seed: &PromptValues,
        max_iterations: usize,
        exclusions: &[String],
    ) -> Result<RetrievalOutcome> {
        let step = self.variant.step();
        let seed = seed.clone().list(PromptSlot::ExcludedThemes, exclusions);

        let plan_values = seed
            .clone()
            .list::<String>(PromptSlot::PriorQueries, &[])
            .list::<String>(PromptSlot::EmergingConcepts, &[]);
        let plan: QueryBatch = self
            .ctx
            .generate(step, &step.sub_key(SubCall::Queries), &plan_values)
            .await?;

        let mut issued: Vec<String> = Vec::new();
        let mut issued_keys: HashSet<String> = HashSet::new();
        let mut log = Vec::new();
        let mut all_hits = Vec::new();
        let mut emerging: Vec<String> = Vec::new();
        let mut batch = next_batch(plan.queries, &issued_keys);

        'rounds: while issued.len() < max_iterations && !batch.is_empty() {
            let mut proposed = Vec::new();

            for query in batch {
                if issued.len() >= max_iterations {
                    break 'rounds;
                }
                issued_keys.insert(query_key(&query));
                issued.push(query.clone());
                let iteration = issued.len();

                log_search_issued!(step, iteration, max_iterations, &query);
                let (hits, search_error) = self.search(step, &query).await;

                let analysis = self.analyze(step, &seed, &issued, &query, &hits, &emerging).await?;
                if self.variant == RetrievalVariant::Research {
                    for concept in &analysis.emerging_concepts {
                        if !emerging.iter().any(|known| known.eq_ignore_ascii_case(concept)) {
                            emerging.push(concept.clone());
                        }
                    }
                }
                proposed.extend(analysis.next_queries.iter().cloned());

                log.push(LoopEntry {
                    iteration,
                    query,
                    hits: hits.len(),
                    search_error,
                    analysis: analysis.analysis,
                    next_queries: analysis.next_queries,
                });
                all_hits.extend(hits);
            }

            batch = next_batch(proposed, &issued_keys);
        }

        if all_hits.is_empty() {
            return Err(WorkflowError::NoEvidence {
                step,
                queries: issued.len(),
            });
        }

        Ok(RetrievalOutcome {
            hits: rank_hits(all_hits, self.top_n),
            log,
            queries: issued,
            emerging_concepts: emerging,
        })
    }

    async fn search(&self, step: StepId, query: &str) -> (Vec<SearchHit>, Option<String>) {
        let request = SearchQuery {
            text: query.to_string(),
            corpus_ref: self.corpus_ref.clone(),
            top_k: self.ctx.settings.search_top_k,
            top_n: self.ctx.settings.search_top_n,
        };
        match self.ctx.capabilities.search.query(request).await {
            Ok(hits) => {
                log_search_complete!(step, query, hits.len());
                (hits, None)
            }
            Err(err) => {
                log_search_failed!(step, query, &err);
                (Vec::new(), Some(err.to_string()))
            }
        }
    }

    async fn analyze(
        &self,
        step: StepId,
        seed: &PromptValues,
        issued: &[String],
        latest: &str,
        hits: &[SearchHit],
        emerging: &[String],
    ) -> Result<SearchAnalysis> {
        let values = seed
            .clone()
            .list(PromptSlot::PriorQueries, issued)
            .text(PromptSlot::LatestQuery, latest)
            .list(PromptSlot::EmergingConcepts, emerging);
        let values = with_json(step, values, PromptSlot::SearchResults, hits)?;

        self.ctx
            .generate(step, &step.sub_key(SubCall::Analysis), &values)
            .await
    }
}

fn query_key(query: &str) -> String {
    query.trim().to_lowercase()
}

/// De-duplicated proposals that have not been issued yet, in proposal order
pub fn next_batch(proposed: Vec<String>, issued: &HashSet<String>) -> Vec<String> {
    let mut seen = HashSet::new();
    proposed
        .into_iter()
        .map(|query| query.trim().to_string())
        .filter(|query| !query.is_empty())
        .filter(|query| {
            let key = query_key(query);
            !issued.contains(&key) && seen.insert(key)
        })
        .collect()
}

/// Keep the best-scoring hit per id, order by score (ties by id) and truncate
pub fn rank_hits(hits: Vec<SearchHit>, top_n: usize) -> Vec<SearchHit> {
    let mut best: HashMap<String, SearchHit> = HashMap::new();
    for hit in hits {
        match best.get(&hit.id) {
            Some(existing) if existing.score >= hit.score => {}
            _ => {
                best.insert(hit.id.clone(), hit);
            }
        }
    }

    let mut ranked: Vec<SearchHit> = best.into_values().collect();
    ranked.sort_by(|a, b| match b.score.total_cmp(&a.score) {
        Ordering::Equal => a.id.cmp(&b.id),
        other => other,
    });
    ranked.truncate(top_n);
    ranked
}
