//! Storage backends for the response cache.
//!
//! A backend is a durable string-keyed, string-valued store. All
//! conforming backends are interchangeable: loaded from the same key
//! set they must yield identical maps from `entries()`, which is the
//! property the shared tests below pin down for every implementation.

mod dir;
mod flat;
mod gzip;
mod json;
mod sqlite;

use std::collections::BTreeMap;
use std::fmt;
use std::path::Path;
use std::str::FromStr;

use serde::Deserialize;

use crate::error::{Error, Result};

pub use dir::DirBackend;
pub use flat::FlatFileBackend;
pub use gzip::GzipFileBackend;
pub use json::JsonFileBackend;
pub use sqlite::SqliteBackend;

/// Durable key-value store underneath the response cache.
///
/// Keys are fetch URLs, values are raw response bodies. A key's value
/// is immutable once written: there is no update or delete operation.
/// Opening happens through each backend's `open` constructor; closing
/// is `Drop`, so the handle is released on every exit path.
pub trait StorageBackend: Send + Sync {
  /// Value previously stored under `key`, if any.
  fn get(&self, key: &str) -> Result<Option<String>>;

  /// Store `value` under `key` unless the key is already present.
  /// Returns the winning value: the existing one if the key was
  /// present, otherwise `value` after it has been durably written.
  fn put_if_absent(&self, key: &str, value: &str) -> Result<String>;

  /// Snapshot of all stored entries. Finite; fresh per call.
  fn entries(&self) -> Result<Box<dyn Iterator<Item = (String, String)> + Send>>;

  /// Force any buffered writes to durable storage.
  fn flush(&self) -> Result<()>;
}

/// Which storage technology backs the cache. Selected by config or
/// the `--backend` flag; every kind satisfies the same contract.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
  /// Embedded relational store (SQLite file).
  #[default]
  Sqlite,
  /// NUL-delimited flat file, append-only.
  Flat,
  /// Gzip-compressed flat file.
  Gzip,
  /// Single JSON map file.
  Json,
  /// One JSON document per entry under a directory.
  Dir,
}

impl BackendKind {
  pub const ALL: [BackendKind; 5] = [
    BackendKind::Sqlite,
    BackendKind::Flat,
    BackendKind::Gzip,
    BackendKind::Json,
    BackendKind::Dir,
  ];

  /// File (or directory) name used when the config gives no explicit
  /// cache path.
  pub fn default_file_name(self) -> &'static str {
    match self {
      BackendKind::Sqlite => "cache.db",
      BackendKind::Flat => "cache.dat",
      BackendKind::Gzip => "cache.dat.gz",
      BackendKind::Json => "cache.json",
      BackendKind::Dir => "cache",
    }
  }
}

impl fmt::Display for BackendKind {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    let name = match self {
      BackendKind::Sqlite => "sqlite",
      BackendKind::Flat => "flat",
      BackendKind::Gzip => "gzip",
      BackendKind::Json => "json",
      BackendKind::Dir => "dir",
    };
    f.write_str(name)
  }
}

impl FromStr for BackendKind {
  type Err = Error;

  fn from_str(s: &str) -> Result<Self> {
    match s {
      "sqlite" => Ok(BackendKind::Sqlite),
      "flat" => Ok(BackendKind::Flat),
      "gzip" => Ok(BackendKind::Gzip),
      "json" => Ok(BackendKind::Json),
      "dir" => Ok(BackendKind::Dir),
      other => Err(Error::Config(format!(
        "unknown backend '{}' (expected sqlite, flat, gzip, json or dir)",
        other
      ))),
    }
  }
}

/// Open the backend of the given kind at `path`.
pub fn open(kind: BackendKind, path: &Path) -> Result<Box<dyn StorageBackend>> {
  let backend: Box<dyn StorageBackend> = match kind {
    BackendKind::Sqlite => Box::new(SqliteBackend::open(path)?),
    BackendKind::Flat => Box::new(FlatFileBackend::open(path)?),
    BackendKind::Gzip => Box::new(GzipFileBackend::open(path)?),
    BackendKind::Json => Box::new(JsonFileBackend::open(path)?),
    BackendKind::Dir => Box::new(DirBackend::open(path)?),
  };
  Ok(backend)
}

/// Collect a backend's entries into an ordered map. This is the
/// observable state two backends are compared on.
pub fn entries_map(backend: &dyn StorageBackend) -> Result<BTreeMap<String, String>> {
  Ok(backend.entries()?.collect())
}

/// Ensure the parent directory of a backend file exists.
pub(crate) fn ensure_parent_dir(path: &Path) -> Result<()> {
  if let Some(parent) = path.parent() {
    if !parent.as_os_str().is_empty() {
      std::fs::create_dir_all(parent).map_err(|e| Error::StorageUnavailable {
        path: path.to_path_buf(),
        reason: format!("failed to create cache directory: {}", e),
      })?;
    }
  }
  Ok(())
}
