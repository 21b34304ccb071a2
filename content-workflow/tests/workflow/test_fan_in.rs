//! Fan-out/fan-in: concurrent stages apply everything or nothing

use content_workflow::capabilities::YamlConfigStore;
use content_workflow::state::CurrentStep;
use content_workflow::steps::{Stage, StepId};
use content_workflow::{WorkflowError, WorkflowSettings};

use super::common::{fixture_config, input, FakeText, Harness, SearchMode};

#[tokio::test]
async fn test_one_failed_drafter_fails_the_stage() {
    let text = FakeText::new();
    text.fail_on("linkedin_writer");
    let h = Harness::new(text, SearchMode::Hits);
    let suspended = h.machine.start(input(1, 1, 1)).await.unwrap();
    let before = suspended.clone();
    let id = suspended.generated_themes[0].id.clone();

    let err = h.machine.resume(&suspended, &id).await.unwrap_err();

    match &err {
        WorkflowError::Aggregate { stage, failures } => {
            assert_eq!(*stage, Stage::ContentGeneration);
            assert_eq!(failures.len(), 1);
            assert_eq!(failures[0].step(), Some(StepId::LinkedInDraft));
        }
        other => panic!("expected aggregate error, got {}", other),
    }
    // Siblings still ran to completion; none reached editing
    assert_eq!(h.text.calls("article_writer"), 1);
    assert_eq!(h.text.calls("social_writer"), 1);
    assert_eq!(h.text.calls("article_editor"), 0);
    assert_eq!(suspended, before);
}

#[tokio::test]
async fn test_every_failed_member_is_reported() {
    let text = FakeText::new();
    text.fail_on("article_writer");
    // Two posts where three were requested
    text.reply_on(
        "social_writer",
        serde_json::json!({ "posts": [
            { "platform": "x", "text": "one" },
            { "platform": "x", "text": "two" }
        ] }),
    );
    let h = Harness::new(text, SearchMode::Hits);
    let suspended = h.machine.start(input(1, 1, 3)).await.unwrap();
    let id = suspended.generated_themes[0].id.clone();

    let err = h.machine.resume(&suspended, &id).await.unwrap_err();

    assert_eq!(
        err.failed_steps(),
        vec![StepId::ArticleDraft, StepId::SocialDraft]
    );
    assert!(err.to_string().starts_with("content_generation stage failed"));
    match err {
        WorkflowError::Aggregate { failures, .. } => {
            assert!(matches!(failures[0], WorkflowError::Capability { .. }));
            assert!(matches!(failures[1], WorkflowError::Validation { .. }));
        }
        other => panic!("expected aggregate error, got {}", other),
    }
}

#[tokio::test]
async fn test_editing_failure_discards_sibling_edits() {
    let mut config = YamlConfigStore::default();
    for (key, step) in fixture_config().entries() {
        if key != "linkedin_editor" {
            config.insert(key.clone(), step.clone());
        }
    }
    let h = Harness::with(FakeText::new(), SearchMode::Hits, config, WorkflowSettings::default());
    let suspended = h.machine.start(input(1, 1, 0)).await.unwrap();
    let id = suspended.generated_themes[0].id.clone();

    let err = h.machine.resume(&suspended, &id).await.unwrap_err();

    match err {
        WorkflowError::Aggregate { stage, failures } => {
            assert_eq!(stage, Stage::ContentEditing);
            assert!(matches!(
                failures.as_slice(),
                [WorkflowError::Config {
                    step: StepId::LinkedInEdit,
                    ..
                }]
            ));
        }
        other => panic!("expected aggregate error, got {}", other),
    }
    assert_eq!(h.text.calls("article_editor"), 1);
}

#[tokio::test]
async fn test_merge_does_not_depend_on_completion_order() {
    // Same run twice; the fakes answer in whatever order the tasks poll
    let run = || async {
        let h = Harness::new(FakeText::new(), SearchMode::Hits);
        let suspended = h.machine.start(input(2, 2, 2)).await.unwrap();
        let id = suspended.generated_themes[0].id.clone();
        h.machine.resume(&suspended, &id).await.unwrap()
    };

    let first = run().await;
    let second = run().await;

    assert_eq!(first.current_step, CurrentStep::ContentEdited);
    assert_eq!(first.final_content().article, second.final_content().article);
    assert_eq!(first.final_content().linkedin, second.final_content().linkedin);
    assert_eq!(first.final_content().social, second.final_content().social);
    assert_eq!(first.search_history, second.search_history);
}
