//! Durable state: the keyed table of resolved videos and the append-only input backup.
//!
//! Both stores hold only a path. Every operation opens the underlying file, does its
//! work and releases it before returning, so no connection outlives a single call.
//! The two stores are deliberately not coupled: an input is backed up before it is
//! resolved, and a failed resolution leaves that entry without a matching row.

use anyhow::Context;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::Path;

pub mod backup;
pub mod sqlite;

pub use backup::BackupLog;
pub use sqlite::VideoStore;

use crate::config::StorageConfig;
use crate::{Result, VidscribeError};

/// One resolved video, keyed by its identifier
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VideoRecord {
    pub identifier: String,
    pub source_url: String,
    pub author: String,
    pub resolved_at: DateTime<Utc>,
}

/// One raw submission, successful or not
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InputBackupEntry {
    #[serde(rename = "input")]
    pub raw_input: String,
    #[serde(rename = "timestamp")]
    pub submitted_at: DateTime<Utc>,
}

/// Storage facade handed to the application
#[derive(Debug, Clone)]
pub struct Persistence {
    videos: VideoStore,
    backups: BackupLog,
}

impl Persistence {
    pub fn new(database_path: impl AsRef<Path>, backup_path: impl AsRef<Path>) -> Self {
        Self {
            videos: VideoStore::new(database_path),
            backups: BackupLog::new(backup_path),
        }
    }

    pub fn from_config(config: &StorageConfig) -> Self {
        Self::new(&config.database_path, &config.backup_path)
    }

    /// Append the raw input to the backup log
    pub fn record_input(&self, raw: &str) -> Result<InputBackupEntry> {
        let entry = InputBackupEntry {
            raw_input: raw.to_string(),
            submitted_at: Utc::now(),
        };
        self.backups
            .append(&entry)
            .with_context(|| format!("Failed to back up input {:?}", raw))
            .map_err(persistence_error)?;
        tracing::debug!("Backed up input {:?}", raw);
        Ok(entry)
    }

    /// Insert or replace the record for `identifier`
    pub fn upsert_video(&self, identifier: &str, source_url: &str, author: &str) -> Result<VideoRecord> {
        let record = VideoRecord {
            identifier: identifier.to_string(),
            source_url: source_url.to_string(),
            author: author.to_string(),
            resolved_at: Utc::now(),
        };
        self.videos
            .upsert(&record)
            .with_context(|| format!("Failed to store video {}", identifier))
            .map_err(persistence_error)?;
        tracing::info!("Stored video {} (author: {})", identifier, author);
        Ok(record)
    }

    pub fn list_videos(&self) -> Result<Vec<VideoRecord>> {
        self.videos
            .list()
            .context("Failed to list stored videos")
            .map_err(persistence_error)
    }

    pub fn list_backups(&self) -> Result<Vec<InputBackupEntry>> {
        self.backups
            .read_all()
            .context("Failed to read input backup")
            .map_err(persistence_error)
    }
}

fn persistence_error(err: anyhow::Error) -> anyhow::Error {
    VidscribeError::Persistence(format!("{:#}", err)).into()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn persistence(dir: &TempDir) -> Persistence {
        Persistence::new(dir.path().join("videos.db"), dir.path().join("backup.json"))
    }

    #[test]
    fn test_repeated_identifier_overwrites() {
        let dir = tempfile::tempdir().unwrap();
        let store = persistence(&dir);

        store.upsert_video("1123503", "https://hsex.icu/video-1123503.htm", "Alice").unwrap();
        store.upsert_video("42", "https://hsex.icu/video-42.htm", "Bob").unwrap();
        store.upsert_video("1123503", "https://hsex.icu/video-1123503.htm", "Carol").unwrap();

        let videos = store.list_videos().unwrap();
        assert_eq!(videos.len(), 2);
        let updated = videos.iter().find(|v| v.identifier == "1123503").unwrap();
        assert_eq!(updated.author, "Carol");
    }

    #[test]
    fn test_backup_grows_by_one_per_submission_in_order() {
        let dir = tempfile::tempdir().unwrap();
        let store = persistence(&dir);

        store.record_input("first").unwrap();
        let before = store.list_backups().unwrap().len();

        let inputs = ["1123503", "https://example.com/x", "1123503", "not a url"];
        for input in inputs {
            store.record_input(input).unwrap();
        }

        let backups = store.list_backups().unwrap();
        assert_eq!(backups.len(), before + inputs.len());
        let tail: Vec<&str> = backups[before..].iter().map(|e| e.raw_input.as_str()).collect();
        assert_eq!(tail, inputs);
        assert!(backups.windows(2).all(|w| w[0].submitted_at <= w[1].submitted_at));
    }

    #[test]
    fn test_stores_start_empty() {
        let dir = tempfile::tempdir().unwrap();
        let store = persistence(&dir);
        assert!(store.list_videos().unwrap().is_empty());
        assert!(store.list_backups().unwrap().is_empty());
    }

    #[test]
    fn test_storage_failure_is_a_persistence_error() {
        let dir = tempfile::tempdir().unwrap();
        // A directory where the backup file should be cannot be replaced by a file
        let backup_path = dir.path().join("backup.json");
        fs_err::create_dir_all(backup_path.join("occupied")).unwrap();
        let store = Persistence::new(dir.path().join("videos.db"), &backup_path);

        let err = store.record_input("1").unwrap_err();
        assert!(matches!(
            err.downcast_ref::<VidscribeError>(),
            Some(VidscribeError::Persistence(_))
        ));
    }
}
