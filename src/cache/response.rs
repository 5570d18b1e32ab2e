//! URL-keyed response cache over a storage backend.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use serde::de::DeserializeOwned;
use tracing::debug;

use crate::error::{Error, Result};
use crate::net::RemoteFetcher;

use super::backend::StorageBackend;

/// Single point of truth mapping a URL to its last-fetched raw body.
///
/// A hit returns straight from storage. A miss performs exactly one
/// network GET, durably persists the body, and returns the stored
/// value. Entries are immutable once written; there is no expiry.
pub struct ResponseCache {
  storage: Box<dyn StorageBackend>,
  fetcher: Arc<dyn RemoteFetcher>,
  /// Per-URL fetch locks. Concurrent callers for the same URL wait on
  /// one lock and re-check storage, so a URL costs at most one network
  /// call for the life of the process.
  locks: Mutex<HashMap<String, Arc<tokio::sync::Mutex<()>>>>,
}

impl ResponseCache {
  pub fn new(storage: Box<dyn StorageBackend>, fetcher: Arc<dyn RemoteFetcher>) -> Self {
    Self {
      storage,
      fetcher,
      locks: Mutex::new(HashMap::new()),
    }
  }

  /// Raw body for `url`, fetching over the network only on first
  /// access. Network failures propagate without retry.
  pub async fn fetch(&self, url: &str) -> Result<String> {
    if let Some(body) = self.storage.get(url)? {
      return Ok(body);
    }

    let lock = self.lock_for(url)?;
    let _guard = lock.lock().await;

    // Another caller may have completed the fetch while we waited.
    if let Some(body) = self.storage.get(url)? {
      return Ok(body);
    }

    debug!(url, "cache miss");
    let body = self.fetcher.get(url).await?;
    self.storage.put_if_absent(url, &body)
  }

  /// Fetch and decode in one step. A decode failure does not
  /// invalidate the cached body.
  pub async fn fetch_typed<T: DeserializeOwned>(&self, url: &str) -> Result<T> {
    let body = self.fetch(url).await?;
    decode(url, &body)
  }

  pub fn storage(&self) -> &dyn StorageBackend {
    self.storage.as_ref()
  }

  fn lock_for(&self, url: &str) -> Result<Arc<tokio::sync::Mutex<()>>> {
    let mut locks = self
      .locks
      .lock()
      .map_err(|e| Error::Storage(format!("lock poisoned: {}", e)))?;
    Ok(locks.entry(url.to_string()).or_default().clone())
  }
}

/// Decode a raw response body into a typed record. The wire format is
/// JSON with lower_case_with_underscores field names, which serde maps
/// onto snake_case Rust fields directly.
pub fn decode<T: DeserializeOwned>(url: &str, body: &str) -> Result<T> {
  serde_json::from_str(body).map_err(|e| Error::Decode {
    url: url.to_string(),
    reason: e.to_string(),
  })
}

#[cfg(test)]
mod tests {
  use std::sync::Arc;
  use std::time::Duration;

  use serde::Deserialize;

  use crate::cache::backend::{BackendKind, FlatFileBackend};
  use crate::net::testing::FakeFetcher;

  use super::*;

  const URL: &str = "https://pokeapi.co/api/v2/language/9/";

  fn cache_with(
    dir: &tempfile::TempDir,
    fetcher: Arc<FakeFetcher>,
  ) -> ResponseCache {
    let path = dir.path().join(BackendKind::Flat.default_file_name());
    let storage = Box::new(FlatFileBackend::open(&path).unwrap());
    ResponseCache::new(storage, fetcher)
  }

  #[tokio::test]
  async fn repeated_fetches_cost_one_network_call() {
    let dir = tempfile::tempdir().unwrap();
    let fetcher = Arc::new(FakeFetcher::new([(
      URL.to_string(),
      r#"{"id":9}"#.to_string(),
    )]));
    let cache = cache_with(&dir, fetcher.clone());

    assert_eq!(cache.fetch(URL).await.unwrap(), r#"{"id":9}"#);
    assert_eq!(cache.fetch(URL).await.unwrap(), r#"{"id":9}"#);
    assert_eq!(cache.fetch(URL).await.unwrap(), r#"{"id":9}"#);

    assert_eq!(fetcher.call_count(), 1);
  }

  #[tokio::test]
  async fn concurrent_callers_share_one_fetch() {
    let dir = tempfile::tempdir().unwrap();
    let fetcher = Arc::new(
      FakeFetcher::new([(URL.to_string(), "body".to_string())])
        .with_delay(Duration::from_millis(25)),
    );
    let cache = cache_with(&dir, fetcher.clone());

    let (a, b, c) = tokio::join!(cache.fetch(URL), cache.fetch(URL), cache.fetch(URL));
    assert_eq!(a.unwrap(), "body");
    assert_eq!(b.unwrap(), "body");
    assert_eq!(c.unwrap(), "body");

    assert_eq!(fetcher.calls_for(URL), 1);
  }

  #[tokio::test]
  async fn decode_failure_preserves_the_cached_body() {
    #[derive(Debug, Deserialize)]
    struct Typed {
      #[allow(dead_code)]
      id: i64,
    }

    let dir = tempfile::tempdir().unwrap();
    let fetcher = Arc::new(FakeFetcher::new([(
      URL.to_string(),
      "definitely not json".to_string(),
    )]));
    let cache = cache_with(&dir, fetcher.clone());

    let first = cache.fetch_typed::<Typed>(URL).await;
    assert!(matches!(first, Err(Error::Decode { .. })));

    // The raw body stays cached; retrying the decode costs no
    // further network calls.
    assert_eq!(
      cache.storage().get(URL).unwrap().as_deref(),
      Some("definitely not json")
    );
    let second = cache.fetch_typed::<Typed>(URL).await;
    assert!(matches!(second, Err(Error::Decode { .. })));
    assert_eq!(fetcher.call_count(), 1);
  }

  #[tokio::test]
  async fn fetch_errors_propagate_and_cache_nothing() {
    let dir = tempfile::tempdir().unwrap();
    let fetcher = Arc::new(FakeFetcher::new([]));
    let cache = cache_with(&dir, fetcher.clone());

    let result = cache.fetch(URL).await;
    assert!(matches!(result, Err(Error::Fetch { .. })));
    assert_eq!(cache.storage().get(URL).unwrap(), None);
  }
}
