//! State machine: happy path, suspension, resume and regeneration

use content_workflow::state::CurrentStep;
use content_workflow::steps::StepId;
use content_workflow::{WorkflowError, WorkflowSettings};

use super::common::{fixture_config, input, FakeText, Harness, SearchMode};

#[tokio::test]
async fn test_start_suspends_with_three_themes() {
    let h = Harness::new(FakeText::new(), SearchMode::Hits);

    let state = h.machine.start(input(1, 2, 3)).await.unwrap();

    assert_eq!(state.current_step, CurrentStep::AwaitingThemeSelection);
    assert!(state.needs_human_input);
    assert!(!state.is_complete);
    assert!(state.marketing_brief.is_some());
    assert_eq!(state.generated_themes.len(), 3);
    assert_eq!(state.regeneration_count, 1);
    assert!(state.previous_themes.is_empty());
    // Two planned queries plus one follow-up each
    assert_eq!(state.search_history.len(), 4);
    assert_eq!(h.search.call_count(), 4);
    assert_eq!(h.text.calls("theme_research"), 0);
}

#[tokio::test]
async fn test_happy_path_runs_to_edited_content() {
    let h = Harness::new(FakeText::new(), SearchMode::Hits);
    let suspended = h.machine.start(input(1, 2, 3)).await.unwrap();
    let chosen = suspended.generated_themes[1].clone();

    let done = h.machine.resume(&suspended, &chosen.id).await.unwrap();

    assert!(done.is_complete);
    assert!(!done.needs_human_input);
    assert_eq!(done.current_step, CurrentStep::ContentEdited);
    assert_eq!(done.selected_theme.as_ref(), Some(&chosen));
    assert!(done.generated_themes.is_empty());
    assert_eq!(done.previous_themes, suspended.generated_themes);

    let dossier = done.research_dossier.as_ref().unwrap();
    assert_eq!(dossier.selected_theme, chosen);
    assert_eq!(dossier.whitepaper_evidence.key_findings.len(), 6);

    assert_eq!(done.article_output.as_ref().unwrap().articles.len(), 1);
    assert_eq!(done.linkedin_output.as_ref().unwrap().posts.len(), 2);
    assert_eq!(done.social_output.as_ref().unwrap().posts.len(), 3);

    let content = done.final_content();
    assert_eq!(content.article, done.edited_article_output.as_ref());
    assert_eq!(content.linkedin.unwrap().posts.len(), 2);
    assert_eq!(content.social.unwrap().posts.len(), 3);

    for step in [StepId::ArticleEdit, StepId::LinkedInEdit, StepId::SocialEdit] {
        assert_eq!(h.text.calls(step.config_key()), 1, "{} should run once", step);
    }
    // Research queries are appended after the theme queries
    assert!(done.search_history.len() > suspended.search_history.len());
    assert!(done.search_history.starts_with(&suspended.search_history));
}

#[tokio::test]
async fn test_only_requested_channels_run() {
    let h = Harness::new(FakeText::new(), SearchMode::Hits);
    let suspended = h.machine.start(input(0, 1, 0)).await.unwrap();
    let id = suspended.generated_themes[0].id.clone();

    let done = h.machine.resume(&suspended, &id).await.unwrap();

    assert!(done.is_complete);
    assert!(done.article_output.is_none());
    assert!(done.social_output.is_none());
    assert!(done.edited_linkedin_output.is_some());
    assert_eq!(h.text.calls("article_writer"), 0);
    assert_eq!(h.text.calls("social_editor"), 0);
}

#[tokio::test]
async fn test_zero_content_request_stops_after_research() {
    let h = Harness::new(FakeText::new(), SearchMode::Hits);
    let suspended = h.machine.start(input(0, 0, 0)).await.unwrap();
    let id = suspended.generated_themes[0].id.clone();

    let done = h.machine.resume(&suspended, &id).await.unwrap();

    assert!(done.is_complete);
    assert_eq!(done.current_step, CurrentStep::ResearchComplete);
    assert!(done.research_dossier.is_some());
    assert!(!done.has_any_draft());
    for writer in ["article_writer", "linkedin_writer", "social_writer"] {
        assert_eq!(h.text.calls(writer), 0);
    }
}

#[tokio::test]
async fn test_resume_is_repeatable_from_the_same_suspended_state() {
    let h = Harness::new(FakeText::new(), SearchMode::Hits);
    let suspended = h.machine.start(input(1, 1, 1)).await.unwrap();
    let before = suspended.clone();
    let id = suspended.generated_themes[2].id.clone();

    let first = h.machine.resume(&suspended, &id).await.unwrap();
    let second = h.machine.resume(&suspended, &id).await.unwrap();

    assert_eq!(suspended, before);
    assert_eq!(first, second);
}

#[tokio::test]
async fn test_resume_rejects_unknown_theme() {
    let h = Harness::new(FakeText::new(), SearchMode::Hits);
    let suspended = h.machine.start(input(1, 0, 0)).await.unwrap();

    let err = h.machine.resume(&suspended, "not-a-theme").await.unwrap_err();
    assert!(matches!(err, WorkflowError::UnknownTheme(ref id) if id == "not-a-theme"));
    assert_eq!(h.text.calls("theme_research"), 0);
}

#[tokio::test]
async fn test_resume_requires_suspension() {
    let h = Harness::new(FakeText::new(), SearchMode::Hits);
    let suspended = h.machine.start(input(0, 0, 1)).await.unwrap();
    let id = suspended.generated_themes[0].id.clone();
    let done = h.machine.resume(&suspended, &id).await.unwrap();

    let err = h.machine.resume(&done, &id).await.unwrap_err();
    assert!(matches!(
        err,
        WorkflowError::NotSuspended(CurrentStep::ContentEdited)
    ));
    assert!(matches!(
        h.machine.regenerate_themes(&done).await,
        Err(WorkflowError::NotSuspended(_))
    ));
}

#[tokio::test]
async fn test_regeneration_excludes_every_theme_already_shown() {
    let h = Harness::new(FakeText::new(), SearchMode::Hits);
    let first = h.machine.start(input(1, 0, 0)).await.unwrap();
    let first_titles: Vec<String> = first.generated_themes.iter().map(|t| t.title.clone()).collect();

    let second = h.machine.regenerate_themes(&first).await.unwrap();

    assert_eq!(second.current_step, CurrentStep::AwaitingThemeSelection);
    assert!(second.needs_human_input);
    assert_eq!(second.regeneration_count, 2);
    assert_eq!(second.previous_themes, first.generated_themes);
    assert!(second
        .generated_themes
        .iter()
        .all(|theme| !first_titles.contains(&theme.title)));

    // The synthesis prompt of the second round lists the retired themes
    let synthesis = h.text.requests_for("theme_generation");
    assert_eq!(synthesis.len(), 2);
    assert!(synthesis[0].user_prompt.contains("(none)"));
    for title in &first_titles {
        assert!(synthesis[1].user_prompt.contains(title.as_str()));
    }
    // And so does the query planning call of the retrieval loop
    let planning = h.text.requests_for("theme_generation.queries");
    for title in &first_titles {
        assert!(planning[1].user_prompt.contains(title.as_str()));
    }
}

#[tokio::test]
async fn test_repeated_theme_title_does_not_fail_regeneration() {
    let h = Harness::new(FakeText::new(), SearchMode::Hits);
    let first = h.machine.start(input(1, 0, 0)).await.unwrap();
    let repeated = first.generated_themes[0].title.clone();
    let theme = |title: &str| {
        serde_json::json!({
            "title": title,
            "description": "An angle",
            "whyItWorks": ["timely", "evidenced", "differentiated"],
            "detailedDescription": "Longer description"
        })
    };
    h.text.reply_on(
        "theme_generation",
        serde_json::json!({ "themes": [theme(&repeated), theme("Fresh B"), theme("Fresh C")] }),
    );

    let second = h.machine.regenerate_themes(&first).await.unwrap();

    assert_eq!(second.current_step, CurrentStep::AwaitingThemeSelection);
    assert_eq!(second.generated_themes[0].title, repeated);
    assert_eq!(second.previous_themes, first.generated_themes);
    // The retired titles still reach the synthesis prompt
    let synthesis = h.text.requests_for("theme_generation");
    assert!(synthesis[1].user_prompt.contains(repeated.as_str()));
}

#[tokio::test]
async fn test_start_twice_yields_same_control_flow() {
    let h = Harness::new(FakeText::new(), SearchMode::Hits);

    let first = h.machine.start(input(1, 1, 1)).await.unwrap();
    let second = h.machine.start(input(1, 1, 1)).await.unwrap();

    assert_eq!(first.current_step, CurrentStep::AwaitingThemeSelection);
    assert_eq!(first.current_step, second.current_step);
    assert_eq!(first.needs_human_input, second.needs_human_input);
    assert!(second.needs_human_input);
    assert_eq!(first.generated_themes.len(), second.generated_themes.len());
    assert_eq!(first.search_history, second.search_history);
}

#[tokio::test]
async fn test_theme_memory_only_grows() {
    let h = Harness::new(FakeText::new(), SearchMode::Hits);
    let s1 = h.machine.start(input(0, 0, 1)).await.unwrap();
    let s2 = h.machine.regenerate_themes(&s1).await.unwrap();
    let s3 = h.machine.regenerate_themes(&s2).await.unwrap();
    let id = s3.generated_themes[0].id.clone();
    let s4 = h.machine.resume(&s3, &id).await.unwrap();

    let sizes: Vec<usize> = [&s1, &s2, &s3, &s4]
        .iter()
        .map(|s| s.previous_themes.len())
        .collect();
    assert_eq!(sizes, vec![0, 3, 6, 9]);
    assert!(s3.previous_themes.starts_with(&s2.previous_themes));
    assert!(s4.previous_themes.starts_with(&s3.previous_themes));
    assert!(s4.search_history.starts_with(&s3.search_history));
}

#[tokio::test]
async fn test_regeneration_limit() {
    let settings = WorkflowSettings {
        max_regenerations: Some(2),
        ..Default::default()
    };
    let h = Harness::with(FakeText::new(), SearchMode::Hits, fixture_config(), settings);

    let s1 = h.machine.start(input(1, 0, 0)).await.unwrap();
    let s2 = h.machine.regenerate_themes(&s1).await.unwrap();
    let err = h.machine.regenerate_themes(&s2).await.unwrap_err();

    assert!(matches!(err, WorkflowError::RegenerationLimit(2)));
    assert_eq!(h.text.calls("theme_generation"), 2);
}

#[tokio::test]
async fn test_missing_whitepaper_is_a_precondition_error() {
    let h = Harness::new(FakeText::new(), SearchMode::Hits);
    let mut request = input(1, 0, 0);
    request.selected_whitepaper_id = None;

    let err = h.machine.start(request).await.unwrap_err();

    assert!(matches!(
        err,
        WorkflowError::Precondition {
            step: StepId::Themes,
            field: "selectedWhitepaperId"
        }
    ));
    assert!(!err.is_retryable());
    assert_eq!(h.search.call_count(), 0);
    assert_eq!(h.text.calls("theme_generation.queries"), 0);
}

#[tokio::test]
async fn test_blank_business_context_is_rejected_before_any_call() {
    let h = Harness::new(FakeText::new(), SearchMode::Hits);
    let mut request = input(1, 0, 0);
    request.business_context = String::new();

    let err = h.machine.start(request).await.unwrap_err();

    assert!(matches!(err, WorkflowError::InvalidInput(_)));
    assert!(h.text.requests().is_empty());
}

#[tokio::test]
async fn test_unknown_placeholder_is_a_config_error() {
    let mut config = fixture_config();
    // Overwrite with a template naming an unknown slot
    config.insert(
        "theme_research",
        content_workflow::capabilities::StepConfig {
            system_prompt: "system".to_string(),
            user_prompt_template: "{{whitepaper_title}}".to_string(),
            model_identifier: "test-model".to_string(),
        },
    );
    let h = Harness::with(FakeText::new(), SearchMode::Hits, config, WorkflowSettings::default());
    let suspended = h.machine.start(input(1, 0, 0)).await.unwrap();
    let id = suspended.generated_themes[0].id.clone();

    let err = h.machine.resume(&suspended, &id).await.unwrap_err();

    match err {
        WorkflowError::Config { step, message } => {
            assert_eq!(step, StepId::Research);
            assert!(message.contains("whitepaper_title"));
        }
        other => panic!("expected config error, got {}", other),
    }
    assert_eq!(h.text.calls("theme_research"), 0);
}

#[tokio::test]
async fn test_brief_capability_failure_is_fatal() {
    let text = FakeText::new();
    text.fail_on("marketing_brief");
    let h = Harness::new(text, SearchMode::Hits);

    let err = h.machine.start(input(1, 1, 1)).await.unwrap_err();

    assert_eq!(err.step(), Some(StepId::Brief));
    assert!(matches!(err, WorkflowError::Capability { .. }));
    assert!(err.is_retryable());
    assert_eq!(h.text.calls("theme_generation.queries"), 0);
}

#[tokio::test]
async fn test_invalid_theme_batch_is_a_validation_error() {
    let text = FakeText::new();
    text.reply_on(
        "theme_generation",
        serde_json::json!({ "themes": [{
            "title": "Only one",
            "description": "d",
            "whyItWorks": ["a", "b", "c"],
            "detailedDescription": "dd"
        }] }),
    );
    let h = Harness::new(text, SearchMode::Hits);

    let err = h.machine.start(input(1, 0, 0)).await.unwrap_err();

    assert!(matches!(
        err,
        WorkflowError::Validation {
            step: StepId::Themes,
            ..
        }
    ));
}

#[tokio::test]
async fn test_insufficient_preflight_issues_extra_searches() {
    let text = FakeText::new();
    text.reply_on(
        "article_writer.preflight",
        serde_json::json!({ "sufficient": false, "queries": ["excursion cost per pallet"] }),
    );
    let h = Harness::new(text, SearchMode::Hits);
    let suspended = h.machine.start(input(1, 1, 0)).await.unwrap();
    let id = suspended.generated_themes[0].id.clone();

    let done = h.machine.resume(&suspended, &id).await.unwrap();

    assert!(done.is_complete);
    assert!(done
        .search_history
        .iter()
        .any(|q| q == "excursion cost per pallet"));
    let extra: Vec<_> = h
        .search
        .calls()
        .into_iter()
        .filter(|q| q.text == "excursion cost per pallet")
        .collect();
    assert_eq!(extra.len(), 1);
    assert_eq!(extra[0].top_n, WorkflowSettings::default().preflight_search_top_n);
    assert_eq!(extra[0].corpus_ref, "wp-cold-chain");
}

#[tokio::test]
async fn test_preflight_search_failure_does_not_fail_the_draft() {
    let text = FakeText::new();
    text.reply_on(
        "social_writer.preflight",
        serde_json::json!({ "sufficient": false, "queries": ["broken lookup"] }),
    );
    let h = Harness::new(text, SearchMode::FailMatching("broken".to_string()));
    let suspended = h.machine.start(input(0, 0, 2)).await.unwrap();
    let id = suspended.generated_themes[0].id.clone();

    let done = h.machine.resume(&suspended, &id).await.unwrap();

    assert_eq!(done.edited_social_output.as_ref().unwrap().posts.len(), 2);
}
