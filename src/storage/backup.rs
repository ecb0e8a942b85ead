use anyhow::{Context, Result};
use std::io::Write;
use std::path::{Path, PathBuf};

use super::InputBackupEntry;

/// JSON array of raw inputs, rewritten in full on every append
#[derive(Debug, Clone)]
pub struct BackupLog {
    path: PathBuf,
}

impl BackupLog {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    /// All entries in insertion order; a missing file is an empty log
    pub fn read_all(&self) -> Result<Vec<InputBackupEntry>> {
        if !self.path.exists() {
            return Ok(Vec::new());
        }

        let content = fs_err::read_to_string(&self.path)?;
        if content.trim().is_empty() {
            return Ok(Vec::new());
        }

        serde_json::from_str(&content)
            .with_context(|| format!("Backup log {} is not a JSON array", self.path.display()))
    }

    pub fn append(&self, entry: &InputBackupEntry) -> Result<()> {
        let mut entries = self.read_all()?;
        entries.push(entry.clone());
        self.write_all(&entries)
    }

    fn write_all(&self, entries: &[InputBackupEntry]) -> Result<()> {
        let parent = match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        };
        fs_err::create_dir_all(&parent)?;

        // Readers never observe a half-written array
        let mut staging = tempfile::NamedTempFile::new_in(&parent)
            .context("Failed to create staging file for backup log")?;
        serde_json::to_writer_pretty(&mut staging, entries)?;
        staging.flush()?;
        staging
            .persist(&self.path)
            .map_err(|e| anyhow::anyhow!("Failed to replace {}: {}", self.path.display(), e.error))?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    #[test]
    fn test_file_is_a_json_array_of_input_and_timestamp() {
        let dir = tempfile::tempdir().unwrap();
        let log = BackupLog::new(dir.path().join("backup.json"));

        log.append(&InputBackupEntry {
            raw_input: "1123503".to_string(),
            submitted_at: Utc::now(),
        })
        .unwrap();

        let raw: serde_json::Value =
            serde_json::from_str(&fs_err::read_to_string(&log.path).unwrap()).unwrap();
        let array = raw.as_array().unwrap();
        assert_eq!(array.len(), 1);
        assert_eq!(array[0]["input"], "1123503");
        assert!(array[0]["timestamp"].is_string());
    }

    #[test]
    fn test_corrupt_log_is_not_overwritten() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("backup.json");
        fs_err::write(&path, "{ not json").unwrap();
        let log = BackupLog::new(&path);

        let entry = InputBackupEntry {
            raw_input: "x".to_string(),
            submitted_at: Utc::now(),
        };
        assert!(log.append(&entry).is_err());
        assert_eq!(fs_err::read_to_string(&path).unwrap(), "{ not json");
    }
}
