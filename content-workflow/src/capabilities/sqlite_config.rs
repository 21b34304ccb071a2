//! SQLite-backed step configuration store
//!
//! Prompts and model identifiers live in a single `step_configs` table keyed
//! by step key. The store is read on every step invocation, so edits made by
//! another process are picked up by the next step without restarting a run.
//!
//! # Example Usage
//!
//! ```rust,no_run
//! use content_workflow::capabilities::{SqliteConfigStore, StepConfig};
//! use std::path::PathBuf;
//!
//! # fn main() -> anyhow::Result<()> {
//! let store = SqliteConfigStore::open(PathBuf::from("./config/steps.db"))?;
//! store.initialize_schema()?;
//! store.upsert(
//!     "marketing_brief",
//!     &StepConfig {
//!         system_prompt: "You are a marketing strategist.".to_string(),
//!         user_prompt_template: "Brief for {{business_context}}".to_string(),
//!         model_identifier: "sonnet".to_string(),
//!     },
//! )?;
//! # Ok(())
//! # }
//! ```

use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension};

use super::{ConfigurationStore, StepConfig, YamlConfigStore};
use crate::error::CapabilityError;

pub struct SqliteConfigStore {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteConfigStore {
    /// Open (or create) the database at the specified path
    pub fn open(path: PathBuf) -> Result<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let conn = Connection::open(path)?;

        // WAL lets an editor process write while runs are reading
        conn.pragma_update(None, "journal_mode", "WAL")?;

        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    fn connection(&self) -> Result<std::sync::MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|_| anyhow!("configuration store connection poisoned"))
    }

    pub fn initialize_schema(&self) -> Result<()> {
        let conn = self.connection()?;
        conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS step_configs (
                step_key TEXT PRIMARY KEY,
                system_prompt TEXT NOT NULL,
                user_prompt_template TEXT NOT NULL,
                model_identifier TEXT NOT NULL,
                updated_at TEXT NOT NULL
            );

            CREATE TABLE IF NOT EXISTS schema_version (
                version INTEGER PRIMARY KEY,
                applied_at TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP
            );
            "#,
        )?;
        conn.execute(
            "INSERT OR IGNORE INTO schema_version (version) VALUES (1)",
            [],
        )?;
        Ok(())
    }

    pub fn get_schema_version(&self) -> Result<i32> {
        let conn = self.connection()?;
        let version = conn.query_row(
            "SELECT COALESCE(MAX(version), 0) FROM schema_version",
            [],
            |row| row.get(0),
        )?;
        Ok(version)
    }

    pub fn upsert(&self, key: &str, config: &StepConfig) -> Result<()> {
        let conn = self.connection()?;
        conn.execute(
            r#"
            INSERT INTO step_configs (step_key, system_prompt, user_prompt_template, model_identifier, updated_at)
            VALUES (?1, ?2, ?3, ?4, ?5)
            ON CONFLICT(step_key) DO UPDATE SET
                system_prompt = excluded.system_prompt,
                user_prompt_template = excluded.user_prompt_template,
                model_identifier = excluded.model_identifier,
                updated_at = excluded.updated_at
            "#,
            params![
                key,
                config.system_prompt,
                config.user_prompt_template,
                config.model_identifier,
                Utc::now().to_rfc3339(),
            ],
        )?;
        Ok(())
    }

    /// Copy every entry of a YAML store into the table; returns the count
    pub fn import(&self, source: &YamlConfigStore) -> Result<usize> {
        let mut imported = 0;
        for (key, config) in source.entries() {
            self.upsert(key, config)?;
            imported += 1;
        }
        Ok(imported)
    }

    pub fn list_keys(&self) -> Result<Vec<String>> {
        let conn = self.connection()?;
        let mut stmt = conn.prepare("SELECT step_key FROM step_configs ORDER BY step_key")?;
        let keys = stmt
            .query_map([], |row| row.get(0))?
            .collect::<rusqlite::Result<Vec<String>>>()?;
        Ok(keys)
    }
}

fn fetch(conn: &Mutex<Connection>, key: &str) -> Result<Option<StepConfig>, CapabilityError> {
    let conn = conn
        .lock()
        .map_err(|_| CapabilityError::Unavailable("connection poisoned".to_string()))?;
    let config = conn
        .query_row(
            "SELECT system_prompt, user_prompt_template, model_identifier FROM step_configs WHERE step_key = ?1",
            params![key],
            |row| {
                Ok(StepConfig {
                    system_prompt: row.get(0)?,
                    user_prompt_template: row.get(1)?,
                    model_identifier: row.get(2)?,
                })
            },
        )
        .optional()?;
    Ok(config)
}

#[async_trait]
impl ConfigurationStore for SqliteConfigStore {
    /// Runs the query on the blocking pool; fan-out siblings load concurrently
    async fn load(&self, key: &str) -> Result<StepConfig, CapabilityError> {
        let conn = Arc::clone(&self.conn);
        let owned_key = key.to_string();
        tokio::task::spawn_blocking(move || fetch(&conn, &owned_key))
            .await
            .map_err(|e| CapabilityError::Unavailable(format!("configuration lookup aborted: {}", e)))??
            .ok_or_else(|| CapabilityError::NotFound(key.to_string()))
    }
}
