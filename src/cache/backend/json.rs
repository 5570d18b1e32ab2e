//! Single-file JSON map storage backend.
//!
//! The whole store is one serialized `BTreeMap<String, String>`. Every
//! insert rewrites the file through a temp file and rename, so the
//! on-disk map is always a complete document.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use crate::error::{Error, Result};

use super::{ensure_parent_dir, StorageBackend};

pub struct JsonFileBackend {
  map: Mutex<BTreeMap<String, String>>,
  path: PathBuf,
}

impl JsonFileBackend {
  pub fn open(path: &Path) -> Result<Self> {
    ensure_parent_dir(path)?;

    let map = if path.exists() {
      let contents = std::fs::read_to_string(path).map_err(|e| Error::StorageUnavailable {
        path: path.to_path_buf(),
        reason: format!("failed to read cache file: {}", e),
      })?;
      if contents.trim().is_empty() {
        BTreeMap::new()
      } else {
        serde_json::from_str(&contents).map_err(|e| Error::StorageUnavailable {
          path: path.to_path_buf(),
          reason: format!("corrupt cache file: {}", e),
        })?
      }
    } else {
      BTreeMap::new()
    };

    Ok(Self {
      map: Mutex::new(map),
      path: path.to_path_buf(),
    })
  }

  fn lock(&self) -> Result<std::sync::MutexGuard<'_, BTreeMap<String, String>>> {
    self
      .map
      .lock()
      .map_err(|e| Error::Storage(format!("lock poisoned: {}", e)))
  }

  /// Rewrite the whole map atomically: temp file in the same
  /// directory, then rename over the target.
  fn persist(&self, map: &BTreeMap<String, String>) -> Result<()> {
    let serialized = serde_json::to_string(map)
      .map_err(|e| Error::Storage(format!("failed to serialize cache map: {}", e)))?;

    let tmp = self.path.with_extension("json.tmp");
    std::fs::write(&tmp, serialized)
      .and_then(|_| std::fs::rename(&tmp, &self.path))
      .map_err(|e| Error::Storage(format!("failed to write {}: {}", self.path.display(), e)))
  }
}

impl StorageBackend for JsonFileBackend {
  fn get(&self, key: &str) -> Result<Option<String>> {
    Ok(self.lock()?.get(key).cloned())
  }

  fn put_if_absent(&self, key: &str, value: &str) -> Result<String> {
    let mut map = self.lock()?;

    if let Some(existing) = map.get(key) {
      return Ok(existing.clone());
    }

    map.insert(key.to_string(), value.to_string());
    self.persist(&map)?;
    Ok(value.to_string())
  }

  fn entries(&self) -> Result<Box<dyn Iterator<Item = (String, String)> + Send>> {
    let snapshot: Vec<(String, String)> = self
      .lock()?
      .iter()
      .map(|(k, v)| (k.clone(), v.clone()))
      .collect();
    Ok(Box::new(snapshot.into_iter()))
  }

  fn flush(&self) -> Result<()> {
    let map = self.lock()?;
    self.persist(&map)
  }
}
