//! Directory-of-documents storage backend.
//!
//! One JSON document per entry, named by the SHA-256 of the key so
//! arbitrary URLs map to file-system-safe names. The key is repeated
//! inside the document, which is what makes `entries()` recoverable
//! from the directory alone.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::error::{Error, Result};

use super::StorageBackend;

/// Stored representation of a single cache entry.
#[derive(Debug, Serialize, Deserialize)]
struct StoredDoc {
  url: String,
  body: String,
  fetched_at: DateTime<Utc>,
}

pub struct DirBackend {
  root: PathBuf,
}

impl DirBackend {
  pub fn open(root: &Path) -> Result<Self> {
    std::fs::create_dir_all(root).map_err(|e| Error::StorageUnavailable {
      path: root.to_path_buf(),
      reason: format!("failed to create cache directory: {}", e),
    })?;

    Ok(Self {
      root: root.to_path_buf(),
    })
  }

  fn doc_path(&self, key: &str) -> PathBuf {
    let mut hasher = Sha256::new();
    hasher.update(key.as_bytes());
    self.root.join(format!("{}.json", hex::encode(hasher.finalize())))
  }

  fn read_doc(&self, path: &Path) -> Result<StoredDoc> {
    let contents = std::fs::read_to_string(path)
      .map_err(|e| Error::Storage(format!("failed to read {}: {}", path.display(), e)))?;
    serde_json::from_str(&contents)
      .map_err(|e| Error::Storage(format!("corrupt cache document {}: {}", path.display(), e)))
  }
}

impl StorageBackend for DirBackend {
  fn get(&self, key: &str) -> Result<Option<String>> {
    let path = self.doc_path(key);
    if !path.exists() {
      return Ok(None);
    }
    Ok(Some(self.read_doc(&path)?.body))
  }

  fn put_if_absent(&self, key: &str, value: &str) -> Result<String> {
    let path = self.doc_path(key);

    if path.exists() {
      return Ok(self.read_doc(&path)?.body);
    }

    let doc = StoredDoc {
      url: key.to_string(),
      body: value.to_string(),
      fetched_at: Utc::now(),
    };
    let serialized = serde_json::to_string(&doc)
      .map_err(|e| Error::Storage(format!("failed to serialize cache document: {}", e)))?;

    // Temp file + rename keeps half-written documents out of the
    // directory; a rename loser simply leaves the winner in place.
    let tmp = path.with_extension("json.tmp");
    std::fs::write(&tmp, serialized)
      .and_then(|_| std::fs::rename(&tmp, &path))
      .map_err(|e| Error::Storage(format!("failed to write {}: {}", path.display(), e)))?;

    self.read_doc(&path).map(|doc| doc.body)
  }

  fn entries(&self) -> Result<Box<dyn Iterator<Item = (String, String)> + Send>> {
    let mut entries = Vec::new();

    let dir = std::fs::read_dir(&self.root)
      .map_err(|e| Error::Storage(format!("failed to list {}: {}", self.root.display(), e)))?;

    for entry in dir {
      let entry =
        entry.map_err(|e| Error::Storage(format!("failed to list {}: {}", self.root.display(), e)))?;
      let path = entry.path();
      if path.extension().and_then(|e| e.to_str()) != Some("json") {
        continue;
      }
      let doc = self.read_doc(&path)?;
      entries.push((doc.url, doc.body));
    }

    Ok(Box::new(entries.into_iter()))
  }

  fn flush(&self) -> Result<()> {
    // Every document is renamed into place when written.
    Ok(())
  }
}
