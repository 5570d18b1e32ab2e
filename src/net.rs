//! Network boundary: a minimal GET-only fetcher behind a trait so the
//! cache can be exercised without touching the real API.

use async_trait::async_trait;
use tracing::debug;

use crate::error::{Error, Result};

/// A remote resource provider. One method: GET a fully-qualified URL
/// and hand back the body verbatim.
#[async_trait]
pub trait RemoteFetcher: Send + Sync {
  async fn get(&self, url: &str) -> Result<String>;
}

/// HTTP fetcher backed by reqwest. Attaches a fixed User-Agent; does
/// no retries, auth, or rate limiting.
pub struct HttpFetcher {
  client: reqwest::Client,
}

impl HttpFetcher {
  pub fn new(user_agent: &str) -> Result<Self> {
    let client = reqwest::Client::builder()
      .user_agent(user_agent)
      .build()
      .map_err(|e| Error::Config(format!("failed to build HTTP client: {}", e)))?;

    Ok(Self { client })
  }
}

#[async_trait]
impl RemoteFetcher for HttpFetcher {
  async fn get(&self, url: &str) -> Result<String> {
    debug!(url, "GET");

    let response = self
      .client
      .get(url)
      .send()
      .await
      .map_err(|e| Error::Fetch {
        url: url.to_string(),
        reason: e.to_string(),
      })?;

    let response = response.error_for_status().map_err(|e| Error::Fetch {
      url: url.to_string(),
      reason: e.to_string(),
    })?;

    response.text().await.map_err(|e| Error::Fetch {
      url: url.to_string(),
      reason: e.to_string(),
    })
  }
}

#[cfg(test)]
pub(crate) mod testing {
  //! In-memory fetcher for cache and loader tests.

  use std::collections::HashMap;
  use std::sync::atomic::{AtomicUsize, Ordering};
  use std::sync::Mutex;
  use std::time::Duration;

  use async_trait::async_trait;

  use crate::error::{Error, Result};

  use super::RemoteFetcher;

  /// Serves canned bodies from a map and counts every call, so tests
  /// can assert how many network round trips a code path costs.
  pub struct FakeFetcher {
    routes: HashMap<String, String>,
    calls: Mutex<Vec<String>>,
    total: AtomicUsize,
    /// Artificial latency, to widen race windows in concurrency tests.
    delay: Option<Duration>,
  }

  impl FakeFetcher {
    pub fn new(routes: impl IntoIterator<Item = (String, String)>) -> Self {
      Self {
        routes: routes.into_iter().collect(),
        calls: Mutex::new(Vec::new()),
        total: AtomicUsize::new(0),
        delay: None,
      }
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
      self.delay = Some(delay);
      self
    }

    pub fn call_count(&self) -> usize {
      self.total.load(Ordering::SeqCst)
    }

    pub fn calls_for(&self, url: &str) -> usize {
      self
        .calls
        .lock()
        .unwrap()
        .iter()
        .filter(|c| c.as_str() == url)
        .count()
    }
  }

  #[async_trait]
  impl RemoteFetcher for FakeFetcher {
    async fn get(&self, url: &str) -> Result<String> {
      self.total.fetch_add(1, Ordering::SeqCst);
      self.calls.lock().unwrap().push(url.to_string());

      if let Some(delay) = self.delay {
        tokio::time::sleep(delay).await;
      }

      self.routes.get(url).cloned().ok_or_else(|| Error::Fetch {
        url: url.to_string(),
        reason: "no route configured".to_string(),
      })
    }
  }
}
