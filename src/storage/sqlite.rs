use anyhow::{Context, Result};
use rusqlite::{params, Connection, OpenFlags};
use std::path::{Path, PathBuf};

use super::VideoRecord;

const VIDEO_SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS videos (
    identifier  TEXT PRIMARY KEY,
    source_url  TEXT NOT NULL,
    author      TEXT NOT NULL,
    resolved_at TEXT NOT NULL
);
";

fn configure_connection(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch(
        "PRAGMA journal_mode = WAL;\n\
         PRAGMA synchronous = NORMAL;\n\
         PRAGMA busy_timeout = 5000;\n",
    )
}

/// SQLite table of resolved videos
#[derive(Debug, Clone)]
pub struct VideoStore {
    path: PathBuf,
}

impl VideoStore {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    fn open(&self) -> Result<Connection> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs_err::create_dir_all(parent)?;
            }
        }

        let flags = OpenFlags::SQLITE_OPEN_READ_WRITE | OpenFlags::SQLITE_OPEN_CREATE;
        let conn = Connection::open_with_flags(&self.path, flags)
            .with_context(|| format!("Failed to open database {}", self.path.display()))?;
        configure_connection(&conn)?;
        conn.execute_batch(VIDEO_SCHEMA)?;
        Ok(conn)
    }

    pub fn upsert(&self, record: &VideoRecord) -> Result<()> {
        let conn = self.open()?;
        conn.execute(
            "INSERT INTO videos (identifier, source_url, author, resolved_at)
             VALUES (?1, ?2, ?3, ?4)
             ON CONFLICT(identifier) DO UPDATE SET
                source_url = excluded.source_url,
                author = excluded.author,
                resolved_at = excluded.resolved_at",
            params![
                record.identifier,
                record.source_url,
                record.author,
                record.resolved_at,
            ],
        )?;
        Ok(())
    }

    pub fn list(&self) -> Result<Vec<VideoRecord>> {
        let conn = self.open()?;
        let mut stmt = conn.prepare(
            "SELECT identifier, source_url, author, resolved_at FROM videos ORDER BY identifier",
        )?;
        let rows = stmt.query_map([], |row| {
            Ok(VideoRecord {
                identifier: row.get(0)?,
                source_url: row.get(1)?,
                author: row.get(2)?,
                resolved_at: row.get(3)?,
            })
        })?;

        let mut records = Vec::new();
        for row in rows {
            records.push(row?);
        }
        Ok(records)
    }
}
