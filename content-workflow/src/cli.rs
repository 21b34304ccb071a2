//! Command-line arguments and state-file helpers for the `content-workflow`
//! binary.
//!
//! Runs are driven one invocation at a time: `start` writes the suspended
//! state to a JSON file, `resume` and `regenerate` read it back. State files
//! are plain serialized [`WorkflowState`] values.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use chrono::Local;
use clap::{Args, Parser, Subcommand};

use crate::capabilities::{ConfigurationStore, SqliteConfigStore, YamlConfigStore};
use crate::settings::WorkflowSettings;
use crate::state::{WorkflowInput, WorkflowState};

/// Multi-channel content workflow
#[derive(Parser, Debug, Clone)]
#[command(name = "content-workflow", version, about)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Create the brief and candidate themes, then stop for theme selection
    Start {
        /// Workflow input as JSON (WorkflowInput)
        #[arg(short, long)]
        input: PathBuf,

        #[command(flatten)]
        run: RunArgs,
    },

    /// Continue a suspended run with the chosen theme
    Resume {
        /// Suspended state file written by `start` or `regenerate`
        #[arg(short, long)]
        state: PathBuf,

        /// Id of one of the generated themes
        #[arg(short, long)]
        theme_id: String,

        #[command(flatten)]
        run: RunArgs,
    },

    /// Replace the generated themes with three new ones
    Regenerate {
        #[arg(short, long)]
        state: PathBuf,

        #[command(flatten)]
        run: RunArgs,
    },

    /// Print a summary of a state file
    Show {
        #[arg(short, long)]
        state: PathBuf,
    },

    /// Copy step prompts from a YAML file into the SQLite store
    ImportConfig {
        /// YAML file mapping step keys to prompts
        #[arg(short, long)]
        from: PathBuf,

        /// Target database (defaults to the user data directory)
        #[arg(long)]
        db: Option<PathBuf>,
    },
}

/// Options shared by every command that runs steps
#[derive(Args, Debug, Clone)]
pub struct RunArgs {
    /// Step prompts from a YAML file instead of the SQLite store
    #[arg(long, conflicts_with = "config_db")]
    pub config: Option<PathBuf>,

    /// SQLite store of step prompts (defaults to the user data directory)
    #[arg(long)]
    pub config_db: Option<PathBuf>,

    /// Engine settings YAML
    #[arg(long)]
    pub settings: Option<PathBuf>,

    /// Directory for state files
    #[arg(short, long, default_value = "./OUTPUT")]
    pub output_dir: PathBuf,

    /// Abort the run after this many seconds
    #[arg(long)]
    pub deadline_secs: Option<u64>,
}

impl RunArgs {
    pub fn load_settings(&self) -> Result<WorkflowSettings> {
        let settings = match &self.settings {
            Some(path) => WorkflowSettings::from_yaml_file(path)?,
            None => WorkflowSettings::default(),
        };
        settings.with_env_overrides()
    }

    pub fn config_store(&self) -> Result<Arc<dyn ConfigurationStore>> {
        if let Some(path) = &self.config {
            return Ok(Arc::new(YamlConfigStore::from_file(path)?));
        }
        let path = match &self.config_db {
            Some(path) => path.clone(),
            None => default_config_db()?,
        };
        let store = SqliteConfigStore::open(path.clone())
            .with_context(|| format!("Failed to open config store: {}", path.display()))?;
        store.initialize_schema()?;
        Ok(Arc::new(store))
    }
}

/// `<data dir>/content-workflow/steps.db`
pub fn default_config_db() -> Result<PathBuf> {
    let data_dir = dirs::data_dir().context("Could not determine user data directory")?;
    Ok(data_dir.join("content-workflow").join("steps.db"))
}

pub fn read_input(path: &Path) -> Result<WorkflowInput> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read input file: {}", path.display()))?;
    serde_json::from_str(&content)
        .with_context(|| format!("Failed to parse workflow input from: {}", path.display()))
}

pub fn read_state(path: &Path) -> Result<WorkflowState> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read state file: {}", path.display()))?;
    serde_json::from_str(&content)
        .with_context(|| format!("Failed to parse workflow state from: {}", path.display()))
}

/// Write `state` to `<dir>/workflow_state_<step>_<timestamp>.json`
pub async fn write_state(dir: &Path, state: &WorkflowState) -> Result<PathBuf> {
    tokio::fs::create_dir_all(dir)
        .await
        .with_context(|| format!("Failed to create {}", dir.display()))?;

    let timestamp = Local::now().format("%Y%m%d_%H%M%S");
    let path = dir.join(format!(
        "workflow_state_{}_{}.json",
        state.current_step, timestamp
    ));
    let json = serde_json::to_string_pretty(state)?;
    tokio::fs::write(&path, json)
        .await
        .with_context(|| format!("Failed to write state file: {}", path.display()))?;
    Ok(path)
}

/// Human-readable summary of a state
pub fn summarize(state: &WorkflowState) -> String {
    let mut lines = vec![
        format!("Step:            {}", state.current_step),
        format!("Complete:        {}", state.is_complete),
        format!("Awaiting input:  {}", state.needs_human_input),
        format!("Theme rounds:    {}", state.regeneration_count),
        format!("Queries issued:  {}", state.search_history.len()),
    ];

    if state.needs_human_input {
        lines.push(String::new());
        lines.push("Themes:".to_string());
        for theme in &state.generated_themes {
            lines.push(format!("  [{}] {}", theme.id, theme.title));
            lines.push(format!("      {}", theme.description));
        }
    }
    if let Some(theme) = &state.selected_theme {
        lines.push(format!("Selected theme:  {}", theme.title));
    }

    let content = state.final_content();
    if let Some(output) = content.article {
        lines.push(format!("Articles:        {}", output.articles.len()));
    }
    if let Some(output) = content.linkedin {
        lines.push(format!("LinkedIn posts:  {}", output.posts.len()));
    }
    if let Some(output) = content.social {
        lines.push(format!("Social posts:    {}", output.posts.len()));
    }
    lines.join("\n")
}
