//! SQLite-backed prompt version history
//!
//! Rows are only ever inserted. A connection is opened per call and never
//! creates the database: provisioning goes through [`init_schema`].

use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::{params, Connection, OpenFlags, OptionalExtension};
use std::path::{Path, PathBuf};
use tracing::info;

use super::PromptTier;
use crate::error::StoreError;
use crate::types::{PromptSource, PromptVersion};

const TIER: &str = "database";

const SCHEMA: &str = r#"
    CREATE TABLE IF NOT EXISTS system_prompts (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        prompt_text TEXT NOT NULL,
        source TEXT NOT NULL DEFAULT 'auto',
        created_at TEXT NOT NULL DEFAULT (strftime('%Y-%m-%dT%H:%M:%fZ', 'now'))
    );

    CREATE INDEX IF NOT EXISTS idx_system_prompts_created ON system_prompts(created_at DESC);
"#;

/// Create the prompt table if it does not exist yet.
/// Returns `true` when the table was created by this call.
pub fn init_schema(path: &Path) -> Result<bool, StoreError> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }

    let conn = Connection::open(path)?;
    let exists: bool = conn
        .query_row(
            "SELECT EXISTS(SELECT 1 FROM sqlite_master WHERE type = 'table' AND name = 'system_prompts')",
            [],
            |row| row.get(0),
        )?;

    if exists {
        info!("Table 'system_prompts' already exists in {}", path.display());
        return Ok(false);
    }

    conn.execute_batch(SCHEMA)?;
    info!("Created table 'system_prompts' in {}", path.display());
    Ok(true)
}

/// Database tier
#[derive(Debug, Clone)]
pub struct SqlitePromptDb {
    path: PathBuf,
}

impl SqlitePromptDb {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn connect(&self) -> Result<Connection, StoreError> {
        Connection::open_with_flags(
            &self.path,
            OpenFlags::SQLITE_OPEN_READ_WRITE | OpenFlags::SQLITE_OPEN_NO_MUTEX,
        )
        .map_err(|e| StoreError::Unreachable { tier: TIER, reason: e.to_string() })
    }

    fn row_to_version(text: String, source: String, created_at: String) -> PromptVersion {
        let created_at = DateTime::parse_from_rfc3339(&created_at)
            .map(|t| t.with_timezone(&Utc))
            .unwrap_or_else(|_| Utc::now());
        PromptVersion {
            text,
            source: PromptSource::parse(&source),
            created_at,
        }
    }
}

impl PromptTier for SqlitePromptDb {
    fn name(&self) -> &'static str {
        TIER
    }

    fn load_latest(&self) -> Result<Option<PromptVersion>, StoreError> {
        let conn = self.connect()?;
        let row = conn
            .query_row(
                "SELECT prompt_text, source, created_at FROM system_prompts
                 ORDER BY created_at DESC, id DESC LIMIT 1",
                [],
                |row| {
                    Ok((
                        row.get::<_, String>(0)?,
                        row.get::<_, String>(1)?,
                        row.get::<_, String>(2)?,
                    ))
                },
            )
            .optional()?;

        Ok(row.map(|(text, source, created_at)| Self::row_to_version(text, source, created_at)))
    }

    fn persist(&self, version: &PromptVersion) -> Result<(), StoreError> {
        let conn = self.connect()?;
        conn.execute(
            "INSERT INTO system_prompts (prompt_text, source, created_at) VALUES (?1, ?2, ?3)",
            params![
                version.text,
                version.source.as_str(),
                // fixed-width UTC so text ordering matches time ordering
                version.created_at.to_rfc3339_opts(SecondsFormat::Micros, true),
            ],
        )?;
        Ok(())
    }

    fn list_recent(&self, limit: usize) -> Result<Option<Vec<PromptVersion>>, StoreError> {
        let conn = self.connect()?;
        let mut stmt = conn.prepare(
            "SELECT prompt_text, source, created_at FROM system_prompts
             ORDER BY created_at DESC, id DESC LIMIT ?1",
        )?;
        let rows = stmt.query_map(params![limit as i64], |row| {
            Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?, row.get::<_, String>(2)?))
        })?;

        let mut versions = Vec::new();
        for row in rows {
            let (text, source, created_at) = row?;
            versions.push(Self::row_to_version(text, source, created_at));
        }
        Ok(Some(versions))
    }
}
