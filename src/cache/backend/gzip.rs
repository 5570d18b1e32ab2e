//! Gzip-compressed flat-file storage backend.
//!
//! Same record format as the plain flat file, but every append writes
//! one complete gzip member. Concatenated members are a valid gzip
//! stream, so the file stays append-only and each insert is durable on
//! its own; reads go through `MultiGzDecoder` to accept the
//! concatenation.

use std::collections::BTreeMap;
use std::fs::{File, OpenOptions};
use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use flate2::read::MultiGzDecoder;
use flate2::write::GzEncoder;
use flate2::Compression;

use crate::error::{Error, Result};

use super::flat::{decode_records, encode_record};
use super::{ensure_parent_dir, StorageBackend};

pub struct GzipFileBackend {
  inner: Mutex<Inner>,
  path: PathBuf,
}

struct Inner {
  map: BTreeMap<String, String>,
  file: File,
}

impl GzipFileBackend {
  pub fn open(path: &Path) -> Result<Self> {
    ensure_parent_dir(path)?;

    let mut contents = String::new();
    if path.exists() {
      let file = File::open(path).map_err(|e| Error::StorageUnavailable {
        path: path.to_path_buf(),
        reason: format!("failed to read cache file: {}", e),
      })?;
      // An empty file is fine; a short or mangled stream is not.
      let metadata_len = file.metadata().map(|m| m.len()).unwrap_or(0);
      if metadata_len > 0 {
        MultiGzDecoder::new(file)
          .read_to_string(&mut contents)
          .map_err(|e| Error::StorageUnavailable {
            path: path.to_path_buf(),
            reason: format!("corrupt gzip cache file: {}", e),
          })?;
      }
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

impl StorageBackend for GzipFileBackend {
  fn get(&self, key: &str) -> Result<Option<String>> {
    Ok(self.lock()?.map.get(key).cloned())
  }

  fn put_if_absent(&self, key: &str, value: &str) -> Result<String> {
    let mut inner = self.lock()?;

    if let Some(existing) = inner.map.get(key) {
      return Ok(existing.clone());
    }

    let record = encode_record(key, value);
    let mut encoder = GzEncoder::new(&mut inner.file, Compression::default());
    encoder
      .write_all(record.as_bytes())
      .and_then(|_| encoder.try_finish())
      .map_err(|e| Error::Storage(format!("failed to append to {}: {}", self.path.display(), e)))?;
    drop(encoder);

    inner
      .file
      .flush()
      .map_err(|e| Error::Storage(format!("failed to flush {}: {}", self.path.display(), e)))?;

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

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn members_concatenate_across_reopens() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("cache.dat.gz");

    {
      let backend = GzipFileBackend::open(&path).unwrap();
      backend.put_if_absent("a", "1").unwrap();
    }
    {
      let backend = GzipFileBackend::open(&path).unwrap();
      backend.put_if_absent("b", "2").unwrap();
    }

    let reopened = GzipFileBackend::open(&path).unwrap();
    assert_eq!(reopened.get("a").unwrap().as_deref(), Some("1"));
    assert_eq!(reopened.get("b").unwrap().as_deref(), Some("2"));
  }

  #[test]
  fn open_rejects_corrupt_stream() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("cache.dat.gz");
    std::fs::write(&path, b"this is not gzip").unwrap();

    assert!(matches!(
      GzipFileBackend::open(&path),
      Err(Error::StorageUnavailable { .. })
    ));
  }
}
