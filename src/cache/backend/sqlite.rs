//! SQLite storage backend.

use std::path::{Path, PathBuf};
use std::sync::Mutex;

use rusqlite::{params, Connection, OptionalExtension};

use crate::error::{Error, Result};

use super::{ensure_parent_dir, StorageBackend};

/// Schema for the response cache table. The URL is the primary key,
/// so inserts with `ON CONFLICT DO NOTHING` give the put-if-absent
/// semantics directly.
const CACHE_SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS response_cache (
    url TEXT PRIMARY KEY,
    body TEXT NOT NULL,
    fetched_at TEXT NOT NULL DEFAULT (datetime('now'))
);
"#;

/// SQLite-backed store. One file, one table, URL-keyed.
pub struct SqliteBackend {
  conn: Mutex<Connection>,
  path: PathBuf,
}

impl SqliteBackend {
  pub fn open(path: &Path) -> Result<Self> {
    ensure_parent_dir(path)?;

    let conn = Connection::open(path).map_err(|e| Error::StorageUnavailable {
      path: path.to_path_buf(),
      reason: format!("failed to open cache database: {}", e),
    })?;

    conn
      .execute_batch(CACHE_SCHEMA)
      .map_err(|e| Error::StorageUnavailable {
        path: path.to_path_buf(),
        reason: format!("failed to run cache migrations: {}", e),
      })?;

    Ok(Self {
      conn: Mutex::new(conn),
      path: path.to_path_buf(),
    })
  }

  fn lock(&self) -> Result<std::sync::MutexGuard<'_, Connection>> {
    self
      .conn
      .lock()
      .map_err(|e| Error::Storage(format!("lock poisoned: {}", e)))
  }
}

impl StorageBackend for SqliteBackend {
  fn get(&self, key: &str) -> Result<Option<String>> {
    let conn = self.lock()?;

    conn
      .query_row(
        "SELECT body FROM response_cache WHERE url = ?",
        params![key],
        |row| row.get(0),
      )
      .optional()
      .map_err(|e| Error::Storage(format!("failed to read {}: {}", self.path.display(), e)))
  }

  fn put_if_absent(&self, key: &str, value: &str) -> Result<String> {
    let conn = self.lock()?;

    conn
      .execute(
        "INSERT INTO response_cache (url, body) VALUES (?, ?)
         ON CONFLICT(url) DO NOTHING",
        params![key, value],
      )
      .map_err(|e| Error::Storage(format!("failed to write {}: {}", self.path.display(), e)))?;

    // Read back the winner: ours, or whatever was already there.
    conn
      .query_row(
        "SELECT body FROM response_cache WHERE url = ?",
        params![key],
        |row| row.get(0),
      )
      .map_err(|e| Error::Storage(format!("failed to read {}: {}", self.path.display(), e)))
  }

  fn entries(&self) -> Result<Box<dyn Iterator<Item = (String, String)> + Send>> {
    let conn = self.lock()?;

    let mut stmt = conn
      .prepare("SELECT url, body FROM response_cache")
      .map_err(|e| Error::Storage(format!("failed to prepare query: {}", e)))?;

    let rows: Vec<(String, String)> = stmt
      .query_map([], |row| Ok((row.get(0)?, row.get(1)?)))
      .map_err(|e| Error::Storage(format!("failed to query entries: {}", e)))?
      .collect::<std::result::Result<_, _>>()
      .map_err(|e| Error::Storage(format!("failed to read entry: {}", e)))?;

    Ok(Box::new(rows.into_iter()))
  }

  fn flush(&self) -> Result<()> {
    // Writes go straight through the connection; nothing is buffered.
    Ok(())
  }
}
