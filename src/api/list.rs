//! Resource-list loading with pagination completion.
//!
//! The protocol is two calls, not a cursor loop: fetch the endpoint
//! once, and if the first page is truncated, re-fetch with an explicit
//! `?limit=<count>` override and accept that response as the complete
//! list. If the catalog changes between the two calls, or the server
//! ignores the limit parameter, the only guard is the count invariant
//! checked by the collection loader, which then fails the load.

use tracing::debug;
use url::Url;

use crate::cache::ResponseCache;
use crate::error::{Error, Result};

use super::types::NamedApiResourceList;

/// Fetch the complete resource list behind `endpoint`.
///
/// A first page with `results.len() >= count` is already complete and
/// is accepted as-is; that includes `count == 0`, which never issues a
/// second fetch. Errors propagate; no partial list is ever returned as
/// if it were complete.
pub async fn load_full_list(cache: &ResponseCache, endpoint: &str) -> Result<NamedApiResourceList> {
  let first: NamedApiResourceList = cache.fetch_typed(endpoint).await?;

  if first.results.len() >= first.count {
    return Ok(first);
  }

  debug!(
    endpoint,
    count = first.count,
    got = first.results.len(),
    "first page truncated, re-fetching with limit override"
  );

  let full_url = with_limit(endpoint, first.count)?;
  cache.fetch_typed(&full_url).await
}

/// Append `limit=<n>` to the endpoint's query string.
fn with_limit(endpoint: &str, limit: usize) -> Result<String> {
  let mut url = Url::parse(endpoint).map_err(|e| Error::Fetch {
    url: endpoint.to_string(),
    reason: format!("invalid endpoint url: {}", e),
  })?;
  url
    .query_pairs_mut()
    .append_pair("limit", &limit.to_string());
  Ok(url.into())
}

#[cfg(test)]
mod tests {
  use std::sync::Arc;

  use crate::api::types::NamedApiResource;
  use crate::cache::backend::FlatFileBackend;
  use crate::net::testing::FakeFetcher;

  use super::*;

  const ENDPOINT: &str = "https://pokeapi.co/api/v2/pokemon-species";

  fn refs(names: &[&str]) -> Vec<NamedApiResource> {
    names
      .iter()
      .map(|n| NamedApiResource {
        name: n.to_string(),
        url: format!("https://pokeapi.co/api/v2/pokemon-species/{}/", n),
      })
      .collect()
  }

  fn page(count: usize, names: &[&str]) -> String {
    serde_json::to_string(&NamedApiResourceList {
      count,
      next: None,
      previous: None,
      results: refs(names),
    })
    .unwrap()
  }

  fn cache_with(
    dir: &tempfile::TempDir,
    fetcher: Arc<FakeFetcher>,
  ) -> ResponseCache {
    let storage = Box::new(FlatFileBackend::open(&dir.path().join("cache.dat")).unwrap());
    ResponseCache::new(storage, fetcher)
  }

  #[tokio::test]
  async fn truncated_first_page_is_completed_with_a_limit_override() {
    let dir = tempfile::tempdir().unwrap();
    let fetcher = Arc::new(FakeFetcher::new([
      (ENDPOINT.to_string(), page(3, &["a", "b"])),
      (format!("{}?limit=3", ENDPOINT), page(3, &["a", "b", "c"])),
    ]));
    let cache = cache_with(&dir, fetcher.clone());

    let list = load_full_list(&cache, ENDPOINT).await.unwrap();
    assert_eq!(list.count, 3);
    assert_eq!(list.results.len(), 3);
    assert_eq!(fetcher.call_count(), 2);
  }

  #[tokio::test]
  async fn complete_first_page_issues_no_second_fetch() {
    let dir = tempfile::tempdir().unwrap();
    let fetcher = Arc::new(FakeFetcher::new([(
      ENDPOINT.to_string(),
      page(3, &["a", "b", "c"]),
    )]));
    let cache = cache_with(&dir, fetcher.clone());

    let list = load_full_list(&cache, ENDPOINT).await.unwrap();
    assert_eq!(list.results.len(), 3);
    assert_eq!(fetcher.call_count(), 1);
  }

  #[tokio::test]
  async fn empty_catalog_is_one_fetch_and_an_empty_list() {
    let dir = tempfile::tempdir().unwrap();
    let fetcher = Arc::new(FakeFetcher::new([(ENDPOINT.to_string(), page(0, &[]))]));
    let cache = cache_with(&dir, fetcher.clone());

    let list = load_full_list(&cache, ENDPOINT).await.unwrap();
    assert_eq!(list.count, 0);
    assert!(list.results.is_empty());
    assert_eq!(fetcher.call_count(), 1);
  }

  #[tokio::test]
  async fn override_response_is_accepted_unconditionally() {
    // Even a still-short override page is returned as-is; the
    // collection loader's invariant check is what rejects it.
    let dir = tempfile::tempdir().unwrap();
    let fetcher = Arc::new(FakeFetcher::new([
      (ENDPOINT.to_string(), page(3, &["a", "b"])),
      (format!("{}?limit=3", ENDPOINT), page(3, &["a", "b"])),
    ]));
    let cache = cache_with(&dir, fetcher.clone());

    let list = load_full_list(&cache, ENDPOINT).await.unwrap();
    assert_eq!(list.count, 3);
    assert_eq!(list.results.len(), 2);
  }
}
