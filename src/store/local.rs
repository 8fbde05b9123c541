//! Durable local prompt record
//!
//! A single JSON document holding the latest prompt. Its presence overrides
//! the database on read, which lets an operator pin a prompt by editing it.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::io::Write;
use std::path::{Path, PathBuf};

use super::PromptTier;
use crate::error::StoreError;
use crate::types::{PromptSource, PromptVersion};

const TIER: &str = "local record";

/// On-disk shape of the record
#[derive(Debug, Clone, Serialize, Deserialize)]
struct RecordFile {
    prompt_text: String,
    #[serde(default)]
    source: String,
    #[serde(default)]
    updated_at: String,
}

/// JSON file tier
#[derive(Debug, Clone)]
pub struct LocalRecord {
    path: PathBuf,
}

impl LocalRecord {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn dir(&self) -> &Path {
        match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        }
    }
}

impl PromptTier for LocalRecord {
    fn name(&self) -> &'static str {
        TIER
    }

    fn load_latest(&self) -> Result<Option<PromptVersion>, StoreError> {
        let contents = match std::fs::read_to_string(&self.path) {
            Ok(c) => c,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => {
                return Err(StoreError::Unreachable { tier: TIER, reason: e.to_string() });
            }
        };

        let record: RecordFile = serde_json::from_str(&contents)
            .map_err(|e| StoreError::Corrupt { tier: TIER, reason: e.to_string() })?;

        // hand-edited records may carry any timestamp text
        let created_at = DateTime::parse_from_rfc3339(&record.updated_at)
            .map(|t| t.with_timezone(&Utc))
            .unwrap_or_else(|_| Utc::now());

        Ok(Some(PromptVersion {
            text: record.prompt_text,
            source: PromptSource::parse(&record.source),
            created_at,
        }))
    }

    fn persist(&self, version: &PromptVersion) -> Result<(), StoreError> {
        let dir = self.dir();
        std::fs::create_dir_all(dir)?;

        let record = RecordFile {
            prompt_text: version.text.clone(),
            source: version.source.as_str().to_string(),
            updated_at: version.created_at.to_rfc3339(),
        };
        let json = serde_json::to_string_pretty(&record)
            .map_err(|e| StoreError::NotPersisted(e.to_string()))?;

        // unique sibling temp file per write, renamed into place; last rename wins
        let mut tmp = tempfile::NamedTempFile::new_in(dir)?;
        tmp.write_all(json.as_bytes())?;
        tmp.as_file().sync_all()?;
        tmp.persist(&self.path).map_err(|e| e.error)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_missing_record_is_absent() {
        let dir = tempdir().unwrap();
        let record = LocalRecord::new(dir.path().join("local_prompts.json"));
        assert!(record.load_latest().unwrap().is_none());
    }

    #[test]
    fn test_persist_then_load() {
        let dir = tempdir().unwrap();
        let record = LocalRecord::new(dir.path().join("nested").join("local_prompts.json"));

        let version = PromptVersion::new("Be brief.", PromptSource::ManualUpdate);
        record.persist(&version).unwrap();

        let loaded = record.load_latest().unwrap().unwrap();
        assert_eq!(loaded.text, "Be brief.");
        assert_eq!(loaded.source, PromptSource::ManualUpdate);

        // no temp files left behind
        let entries = std::fs::read_dir(dir.path().join("nested")).unwrap().count();
        assert_eq!(entries, 1);
    }

    #[test]
    fn test_persist_overwrites() {
        let dir = tempdir().unwrap();
        let record = LocalRecord::new(dir.path().join("local_prompts.json"));

        record.persist(&PromptVersion::new("first", PromptSource::Auto)).unwrap();
        record.persist(&PromptVersion::new("second", PromptSource::DirectEdit)).unwrap();

        let loaded = record.load_latest().unwrap().unwrap();
        assert_eq!(loaded.text, "second");
        assert_eq!(loaded.source, PromptSource::DirectEdit);
    }

    #[test]
    fn test_corrupt_record_is_an_error() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("local_prompts.json");
        std::fs::write(&path, "{ not json").unwrap();

        let err = LocalRecord::new(&path).load_latest().unwrap_err();
        assert!(matches!(err, StoreError::Corrupt { .. }));
    }

    #[test]
    fn test_hand_edited_record() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("local_prompts.json");
        std::fs::write(&path, r#"{"prompt_text": "Pinned.", "updated_at": "now"}"#).unwrap();

        let loaded = LocalRecord::new(&path).load_latest().unwrap().unwrap();
        assert_eq!(loaded.text, "Pinned.");
        assert_eq!(loaded.source, PromptSource::Auto);
    }

    #[test]
    fn test_concurrent_writes_all_land() {
        let dir = tempdir().unwrap();
        let record = LocalRecord::new(dir.path().join("local_prompts.json"));
        record.persist(&PromptVersion::new("seed", PromptSource::Auto)).unwrap();

        std::thread::scope(|s| {
            for t in 0..8 {
                let record = &record;
                s.spawn(move || {
                    for i in 0..50 {
                        let version = PromptVersion::new(format!("t{t}-{i}"), PromptSource::Auto);
                        record.persist(&version).unwrap();
                    }
                });
            }
            s.spawn(|| {
                for _ in 0..200 {
                    // readers only ever see a complete record
                    assert!(record.load_latest().unwrap().is_some());
                }
            });
        });

        let last = record.load_latest().unwrap().unwrap();
        assert!(last.text.starts_with('t'));
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 1);
    }
}
