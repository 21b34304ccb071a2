//! Retrieval loop: budgets, degraded searches and evidence handling

use content_workflow::steps::StepId;
use content_workflow::{WorkflowError, WorkflowSettings};

use super::common::{fixture_config, input, FakeText, Harness, SearchMode};

fn budgets(themes: usize, research: usize) -> WorkflowSettings {
    WorkflowSettings {
        theme_search_budget: themes,
        research_search_budget: research,
        ..Default::default()
    }
}

#[tokio::test]
async fn test_search_calls_never_exceed_the_budget() {
    let h = Harness::with(
        FakeText::with_endless_follow_ups(),
        SearchMode::Hits,
        fixture_config(),
        budgets(3, 5),
    );

    let suspended = h.machine.start(input(0, 0, 0)).await.unwrap();
    assert_eq!(h.search.call_count(), 3);
    assert_eq!(suspended.search_history.len(), 3);
    // One analysis call per executed query
    assert_eq!(h.text.calls("theme_generation.analysis"), 3);

    let id = suspended.generated_themes[0].id.clone();
    let done = h.machine.resume(&suspended, &id).await.unwrap();
    assert_eq!(h.search.call_count(), 3 + 5);
    assert_eq!(done.search_history.len(), 3 + 5);
}

#[tokio::test]
async fn test_budget_stops_mid_batch() {
    // Two planned queries, budget of one
    let h = Harness::with(FakeText::new(), SearchMode::Hits, fixture_config(), budgets(1, 12));

    let state = h.machine.start(input(1, 0, 0)).await.unwrap();

    assert_eq!(state.search_history, vec!["theme_generation overview"]);
    assert_eq!(h.search.call_count(), 1);
}

#[tokio::test]
async fn test_queries_are_never_issued_twice() {
    let text = FakeText::new();
    // Follow-ups repeat queries already issued
    text.reply_on(
        "theme_generation.analysis",
        serde_json::json!({
            "analysis": "same ground",
            "nextQueries": ["theme_generation overview", "THEME_GENERATION EVIDENCE", "fresh angle"]
        }),
    );
    let h = Harness::new(text, SearchMode::Hits);

    let state = h.machine.start(input(1, 0, 0)).await.unwrap();

    assert_eq!(
        state.search_history,
        vec!["theme_generation overview", "theme_generation evidence", "fresh angle"]
    );
}

#[tokio::test]
async fn test_total_search_failure_fails_theme_generation() {
    let h = Harness::new(FakeText::new(), SearchMode::AlwaysFail);

    let err = h.machine.start(input(1, 1, 1)).await.unwrap_err();

    match err {
        WorkflowError::NoEvidence { step, queries } => {
            assert_eq!(step, StepId::Themes);
            assert_eq!(queries, h.search.call_count());
            assert!(queries > 0);
        }
        other => panic!("expected no-evidence error, got {}", other),
    }
    // Failed searches still go through analysis; synthesis is never reached
    assert_eq!(h.text.calls("theme_generation.analysis"), h.search.call_count());
    assert_eq!(h.text.calls("theme_generation"), 0);
}

#[tokio::test]
async fn test_total_search_failure_fails_research() {
    // Theme searches succeed; every research query fails
    let h = Harness::new(FakeText::new(), SearchMode::FailMatching("theme_research".to_string()));
    let suspended = h.machine.start(input(1, 1, 1)).await.unwrap();
    let before = suspended.clone();
    let id = suspended.generated_themes[0].id.clone();

    let err = h.machine.resume(&suspended, &id).await.unwrap_err();

    match err {
        WorkflowError::NoEvidence { step, queries } => {
            assert_eq!(step, StepId::Research);
            assert!(queries > 0);
        }
        other => panic!("expected no-evidence error, got {}", other),
    }
    assert_eq!(h.text.calls("theme_research"), 0);
    assert_eq!(h.text.calls("article_writer"), 0);
    assert_eq!(suspended, before);
}

#[tokio::test]
async fn test_partial_search_failure_is_tolerated() {
    let h = Harness::new(FakeText::new(), SearchMode::FailMatching("follow-up".to_string()));

    let state = h.machine.start(input(1, 0, 0)).await.unwrap();

    assert_eq!(state.generated_themes.len(), 3);
    // Failed queries are still part of the audit trail
    assert_eq!(state.search_history.len(), 4);
}

#[tokio::test]
async fn test_zero_budget_means_no_evidence() {
    let h = Harness::with(FakeText::new(), SearchMode::Hits, fixture_config(), budgets(0, 12));

    let err = h.machine.start(input(1, 0, 0)).await.unwrap_err();

    assert!(matches!(
        err,
        WorkflowError::NoEvidence {
            step: StepId::Themes,
            queries: 0
        }
    ));
    assert_eq!(h.search.call_count(), 0);
}

#[tokio::test]
async fn test_research_passes_emerging_concepts_to_synthesis() {
    let h = Harness::new(FakeText::new(), SearchMode::Hits);
    let suspended = h.machine.start(input(0, 0, 0)).await.unwrap();
    let id = suspended.generated_themes[0].id.clone();

    h.machine.resume(&suspended, &id).await.unwrap();

    let synthesis = h.text.requests_for("theme_research");
    assert_eq!(synthesis.len(), 1);
    assert!(synthesis[0]
        .user_prompt
        .contains("concept from theme_research overview"));
    // Every request carries the reply schema
    assert!(synthesis[0].schema.is_some());
    assert!(h
        .search
        .calls()
        .iter()
        .all(|q| q.corpus_ref == "wp-cold-chain" && q.top_k == 20 && q.top_n == 8));
}
