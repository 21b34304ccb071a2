//! Shipped step configuration and the configuration stores

use std::path::PathBuf;

use content_workflow::capabilities::{ConfigurationStore, SqliteConfigStore, YamlConfigStore};
use content_workflow::prompt::PromptTemplate;
use content_workflow::settings::WorkflowSettings;
use content_workflow::steps::{StepId, SubCall};

fn example(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("config")
        .join(name)
}

/// Every key the engine loads during a full run
fn required_keys() -> Vec<String> {
    let mut keys: Vec<String> = StepId::ALL
        .iter()
        .map(|step| step.config_key().to_string())
        .collect();
    for step in [StepId::Themes, StepId::Research] {
        keys.push(step.sub_key(SubCall::Queries));
        keys.push(step.sub_key(SubCall::Analysis));
    }
    for step in [StepId::ArticleDraft, StepId::LinkedInDraft, StepId::SocialDraft] {
        keys.push(step.sub_key(SubCall::Preflight));
    }
    keys
}

#[tokio::test]
async fn test_example_config_covers_every_step_with_valid_templates() {
    let store = YamlConfigStore::from_file(&example("steps.example.yaml")).unwrap();

    for key in required_keys() {
        let config = store
            .load(&key)
            .await
            .unwrap_or_else(|e| panic!("{}: {}", key, e));
        PromptTemplate::parse(&config.user_prompt_template)
            .unwrap_or_else(|e| panic!("{}: {}", key, e));
        assert!(!config.model_identifier.is_empty());
    }
}

#[tokio::test]
async fn test_import_example_config_into_sqlite() {
    let dir = tempfile::tempdir().unwrap();
    let yaml = YamlConfigStore::from_file(&example("steps.example.yaml")).unwrap();
    let db = SqliteConfigStore::open(dir.path().join("steps.db")).unwrap();
    db.initialize_schema().unwrap();

    let imported = db.import(&yaml).unwrap();

    let keys = db.list_keys().unwrap();
    assert_eq!(imported, keys.len());
    for key in required_keys() {
        assert!(keys.contains(&key), "missing {}", key);
        assert_eq!(db.load(&key).await.unwrap(), yaml.load(&key).await.unwrap());
    }
}

#[test]
fn test_example_settings_match_defaults() {
    let settings = WorkflowSettings::from_yaml_file(&example("settings.example.yaml")).unwrap();
    assert_eq!(settings, WorkflowSettings::default());
}

#[test]
fn test_example_input_parses() {
    let input = content_workflow::cli::read_input(&example("input.example.json")).unwrap();
    assert!(input.validate().is_ok());
    assert_eq!(input.counts.social_posts_count, 3);
}
