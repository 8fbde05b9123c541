//! Prompt version store
//!
//! Provides:
//! - Ordered read precedence across storage tiers (local record, then database)
//! - Writes to every reachable tier, with the local record as durability floor
//! - A fixed default prompt when no tier holds a version
//!
//! Nothing is cached: every read re-queries the tiers.

pub mod local;
pub mod sqlite;

use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::config::StorageConfig;
use crate::error::StoreError;
use crate::learning::prompts::DEFAULT_PROMPT;
use crate::types::{PromptSource, PromptVersion};

pub use local::LocalRecord;
pub use sqlite::{init_schema, SqlitePromptDb};

/// A storage tier holding prompt versions
pub trait PromptTier: Send + Sync {
    /// Tier name for logs
    fn name(&self) -> &'static str;

    /// Latest version held by this tier, `None` when it holds nothing
    fn load_latest(&self) -> Result<Option<PromptVersion>, StoreError>;

    /// Record a new version
    fn persist(&self, version: &PromptVersion) -> Result<(), StoreError>;

    /// Most recent versions, newest first. `None` when the tier keeps no history.
    fn list_recent(&self, _limit: usize) -> Result<Option<Vec<PromptVersion>>, StoreError> {
        Ok(None)
    }
}

/// Precedence-ordered prompt store
#[derive(Clone)]
pub struct PromptStore {
    read_order: Vec<Arc<dyn PromptTier>>,
    write_order: Vec<Arc<dyn PromptTier>>,
    floor: Arc<dyn PromptTier>,
    default_prompt: String,
}

impl PromptStore {
    /// Local record read first, database written first.
    ///
    /// Local presence always wins on read, even when the database holds a
    /// newer row written by another process.
    pub fn new(local: LocalRecord, database: Option<SqlitePromptDb>) -> Self {
        let local: Arc<dyn PromptTier> = Arc::new(local);
        let database: Option<Arc<dyn PromptTier>> =
            database.map(|db| Arc::new(db) as Arc<dyn PromptTier>);

        let mut read_order = vec![local.clone()];
        let mut write_order = Vec::new();
        if let Some(db) = database {
            read_order.push(db.clone());
            write_order.push(db);
        }
        write_order.push(local.clone());

        Self::with_tiers(read_order, write_order, local)
    }

    /// Build from explicit tier orders. `floor` must appear in `write_order`;
    /// a save succeeds exactly when the floor tier persisted.
    pub fn with_tiers(
        read_order: Vec<Arc<dyn PromptTier>>,
        write_order: Vec<Arc<dyn PromptTier>>,
        floor: Arc<dyn PromptTier>,
    ) -> Self {
        Self {
            read_order,
            write_order,
            floor,
            default_prompt: DEFAULT_PROMPT.to_string(),
        }
    }

    /// Store for the configured local record path and optional database
    pub fn from_config(config: &StorageConfig) -> Self {
        let database = config.database_path.as_ref().map(SqlitePromptDb::new);
        if database.is_none() {
            debug!("No prompt database configured; using local record only");
        }
        Self::new(LocalRecord::new(&config.local_record), database)
    }

    pub fn with_default_prompt(mut self, text: impl Into<String>) -> Self {
        self.default_prompt = text.into();
        self
    }

    pub fn default_prompt(&self) -> &str {
        &self.default_prompt
    }

    /// Text of the active prompt. Never fails.
    pub fn get_active_prompt(&self) -> String {
        for tier in &self.read_order {
            match tier.load_latest() {
                Ok(Some(version)) => {
                    debug!("Loaded prompt from {}", tier.name());
                    return version.text;
                }
                Ok(None) => debug!("No prompt in {}", tier.name()),
                Err(e) => warn!("Skipping {}: {}", tier.name(), e),
            }
        }

        info!("Using default prompt");
        self.default_prompt.clone()
    }

    /// Append a new version to every tier in write order.
    ///
    /// A failing tier is logged and does not stop the others.
    pub fn save_new_prompt(
        &self,
        text: &str,
        source: PromptSource,
    ) -> Result<PromptVersion, StoreError> {
        let version = PromptVersion::new(text, source);
        let mut floor_result = None;

        for tier in &self.write_order {
            let result = tier.persist(&version);
            match &result {
                Ok(()) => info!(source = %source, "New prompt saved to {}", tier.name()),
                Err(e) => warn!("Failed to save prompt to {}: {}", tier.name(), e),
            }
            if Arc::ptr_eq(tier, &self.floor) {
                floor_result = Some(result);
            }
        }

        match floor_result {
            Some(Ok(())) => Ok(version),
            Some(Err(e)) => Err(StoreError::NotPersisted(e.to_string())),
            None => Err(StoreError::NotPersisted(format!(
                "{} is not in the write order",
                self.floor.name()
            ))),
        }
    }

    /// Version history from the first tier that keeps one
    pub fn history(&self, limit: usize) -> Vec<PromptVersion> {
        for tier in &self.write_order {
            match tier.list_recent(limit) {
                Ok(Some(versions)) => return versions,
                Ok(None) => {}
                Err(e) => warn!("Cannot list history from {}: {}", tier.name(), e),
            }
        }
        Vec::new()
    }
}
