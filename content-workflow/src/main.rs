//! `content-workflow` - drive a content run from the command line.
//!
//! ```text
//! content-workflow start --input brief.json --config config/steps.yaml
//!   -> OUTPUT/workflow_state_awaiting_theme_selection_<ts>.json
//! content-workflow show --state OUTPUT/workflow_state_awaiting_theme_selection_<ts>.json
//! content-workflow regenerate --state ...          (optional, repeatable)
//! content-workflow resume --state ... --theme-id <id>
//!   -> OUTPUT/workflow_state_content_edited_<ts>.json
//! ```
//!
//! Search goes to `CONTENT_WORKFLOW_SEARCH_URL`; text generation uses the
//! Claude agent SDK.

use std::future::Future;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use clap::Parser;

use content_workflow::capabilities::{
    Capabilities, ClaudeTextCapability, HttpSearchCapability, SqliteConfigStore, YamlConfigStore,
};
use content_workflow::cli::{
    default_config_db, read_input, read_state, summarize, write_state, Cli, Command, RunArgs,
};
use content_workflow::{WorkflowMachine, WorkflowState};
use content_workflow_sdk::{log_file_saved, log_header, log_info, log_state_file, log_warning};

#[tokio::main]
async fn main() -> Result<()> {
    dotenv::dotenv().ok();
    let cli = Cli::parse();

    match cli.command {
        Command::Start { input, run } => {
            let input = read_input(&input)?;
            log_header!("Content Workflow: start");
            let machine = build_machine(&run)?;
            let state = with_deadline(&run, machine.start(input)).await?;
            finish(&run, &state).await
        }
        Command::Resume {
            state,
            theme_id,
            run,
        } => {
            let suspended = read_state(&state)?;
            log_header!("Content Workflow: resume");
            let machine = build_machine(&run)?;
            let state = with_deadline(&run, machine.resume(&suspended, &theme_id)).await?;
            finish(&run, &state).await
        }
        Command::Regenerate { state, run } => {
            let suspended = read_state(&state)?;
            log_header!("Content Workflow: regenerate themes");
            let machine = build_machine(&run)?;
            let state = with_deadline(&run, machine.regenerate_themes(&suspended)).await?;
            finish(&run, &state).await
        }
        Command::Show { state } => {
            let state = read_state(&state)?;
            println!("{}", summarize(&state));
            Ok(())
        }
        Command::ImportConfig { from, db } => import_config(&from, db),
    }
}

fn build_machine(run: &RunArgs) -> Result<WorkflowMachine> {
    let settings = run.load_settings()?;
    let search = HttpSearchCapability::from_env().context("Search capability is not configured")?;
    log_info!("Search endpoint: {}", search.endpoint());

    let capabilities = Capabilities::new(
        Arc::new(ClaudeTextCapability::new()),
        Arc::new(search),
        run.config_store()?,
    );
    Ok(WorkflowMachine::new(capabilities, settings))
}

async fn with_deadline<F>(run: &RunArgs, future: F) -> Result<WorkflowState>
where
    F: Future<Output = content_workflow::Result<WorkflowState>>,
{
    let result = match run.deadline_secs {
        Some(secs) => tokio::time::timeout(Duration::from_secs(secs), future)
            .await
            .with_context(|| format!("Run exceeded its deadline of {}s", secs))?,
        None => future.await,
    };

    match result {
        Ok(state) => Ok(state),
        Err(err) => {
            if err.is_retryable() {
                log_warning!("Run failed; starting again from the same state may succeed");
            }
            Err(err.into())
        }
    }
}

async fn finish(run: &RunArgs, state: &WorkflowState) -> Result<()> {
    let path = write_state(&run.output_dir, state).await?;
    log_state_file!(path.display(), format!("Workflow state at {}", state.current_step));
    log_file_saved!(path.display());

    println!();
    println!("{}", summarize(state));
    if state.needs_human_input {
        println!();
        log_info!(
            "Choose a theme with: content-workflow resume --state {} --theme-id <id>",
            path.display()
        );
    }
    Ok(())
}

fn import_config(from: &Path, db: Option<std::path::PathBuf>) -> Result<()> {
    let yaml = YamlConfigStore::from_file(from)?;
    let db = match db {
        Some(path) => path,
        None => default_config_db()?,
    };

    let store = SqliteConfigStore::open(db.clone())?;
    store.initialize_schema()?;
    let count = store.import(&yaml)?;
    if count == 0 {
        bail!("{} contains no step configuration", from.display());
    }

    log_info!("Imported {} step configurations into {}", count, db.display());
    for key in store.list_keys()? {
        println!("  • {}", key);
    }
    Ok(())
}
