//! NUL-delimited flat-file storage backend.
//!
//! One record per line: `key<NUL>value\n`, with backslash escapes so
//! bodies containing newlines or NUL bytes round-trip. The file is
//! append-only; the full map is loaded into memory at open and every
//! insert is written through before it is acknowledged.

use std::collections::BTreeMap;
use std::fs::{File, OpenOptions};
use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use crate::error::{Error, Result};

use super::{ensure_parent_dir, StorageBackend};

pub struct FlatFileBackend {
  inner: Mutex<Inner>,
  path: PathBuf,
}

struct Inner {
  map: BTreeMap<String, String>,
  file: File,
}

impl FlatFileBackend {
  pub fn open(path: &Path) -> Result<Self> {
    ensure_parent_dir(path)?;

    let mut contents = String::new();
    if path.exists() {
      File::open(path)
        .and_then(|mut f| f.read_to_string(&mut contents))
        .map_err(|e| Error::StorageUnavailable {
          path: path.to_path_buf(),
          reason: format!("failed to read cache file: {}", e),
        })?;
    }

    let map = decode_records(&contents).map_err(|reason| Error::StorageUnavailable {
      path: path.to_path_buf(),
      reason,
    })?;

    let file = OpenOptions::new()
      .create(true)
      .append(true)
      .open(path)
      .map_err(|e| Error::StorageUnavailable {
        path: path.to_path_buf(),
        reason: format!("failed to open cache file for append: {}", e),
      })?;

    Ok(Self {
      inner: Mutex::new(Inner { map, file }),
      path: path.to_path_buf(),
    })
  }

  fn lock(&self) -> Result<std::sync::MutexGuard<'_, Inner>> {
    self
      .inner
      .lock()
      .map_err(|e| Error::Storage(format!("lock poisoned: {}", e)))
  }
}

impl StorageBackend for FlatFileBackend {
  fn get(&self, key: &str) -> Result<Option<String>> {
    Ok(self.lock()?.map.get(key).cloned())
  }

  fn put_if_absent(&self, key: &str, value: &str) -> Result<String> {
    let mut inner = self.lock()?;

    if let Some(existing) = inner.map.get(key) {
      return Ok(existing.clone());
    }

    let record = encode_record(key, value);
    inner
      .file
      .write_all(record.as_bytes())
      .and_then(|_| inner.file.flush())
      .map_err(|e| Error::Storage(format!("failed to append to {}: {}", self.path.display(), e)))?;

    inner.map.insert(key.to_string(), value.to_string());
    Ok(value.to_string())
  }

  fn entries(&self) -> Result<Box<dyn Iterator<Item = (String, String)> + Send>> {
    let snapshot: Vec<(String, String)> = self
      .lock()?
      .map
      .iter()
      .map(|(k, v)| (k.clone(), v.clone()))
      .collect();
    Ok(Box::new(snapshot.into_iter()))
  }

  fn flush(&self) -> Result<()> {
    let inner = self.lock()?;
    inner
      .file
      .sync_data()
      .map_err(|e| Error::Storage(format!("failed to sync {}: {}", self.path.display(), e)))
  }
}

// ============================================================================
// Record codec, shared with the gzip variant
// ============================================================================

/// Escape a field so the NUL and newline delimiters stay unambiguous.
fn escape(field: &str) -> String {
  let mut out = String::with_capacity(field.len());
  for c in field.chars() {
    match c {
      '\\' => out.push_str("\\\\"),
      '\n' => out.push_str("\\n"),
      '\0' => out.push_str("\\0"),
      other => out.push(other),
    }
  }
  out
}

fn unescape(field: &str) -> std::result::Result<String, String> {
  let mut out = String::with_capacity(field.len());
  let mut chars = field.chars();
  while let Some(c) = chars.next() {
    if c != '\\' {
      out.push(c);
      continue;
    }
    match chars.next() {
      Some('\\') => out.push('\\'),
      Some('n') => out.push('\n'),
      Some('0') => out.push('\0'),
      Some(other) => return Err(format!("invalid escape '\\{}'", other)),
      None => return Err("truncated escape at end of field".to_string()),
    }
  }
  Ok(out)
}

/// One `key<NUL>value\n` record with both fields escaped.
pub(super) fn encode_record(key: &str, value: &str) -> String {
  format!("{}\0{}\n", escape(key), escape(value))
}

/// Parse the concatenation of records back into a map. Later records
/// for a key never occur in practice (inserts are if-absent), but the
/// first one wins if a file was produced otherwise.
pub(super) fn decode_records(contents: &str) -> std::result::Result<BTreeMap<String, String>, String> {
  let mut map = BTreeMap::new();

  for (idx, line) in contents.lines().enumerate() {
    if line.is_empty() {
      continue;
    }
    let (key, value) = line
      .split_once('\0')
      .ok_or_else(|| format!("record {} has no delimiter", idx + 1))?;
    let key = unescape(key).map_err(|e| format!("record {} key: {}", idx + 1, e))?;
    let value = unescape(value).map_err(|e| format!("record {} value: {}", idx + 1, e))?;
    map.entry(key).or_insert(value);
  }

  Ok(map)
}
