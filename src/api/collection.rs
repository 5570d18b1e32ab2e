//! Collection materialization: every item behind a list endpoint,
//! fetched through the cache and decoded, or nothing at all.

use std::collections::BTreeMap;

use futures::{StreamExt, TryStreamExt};
use serde::de::DeserializeOwned;
use tracing::debug;

use crate::cache::ResponseCache;
use crate::error::{Error, Result};

use super::list::load_full_list;

/// Detail fetches run with bounded concurrency. The cache's per-URL
/// single-flight keeps the one-call-per-URL guarantee under this.
const DETAIL_FETCH_CONCURRENCY: usize = 8;

/// Materialize the full collection behind `endpoint` into a map from
/// item URL to decoded item.
///
/// The resolved list must satisfy `count == results.len()`; downstream
/// consumers compute aggregates that assume completeness, so any
/// single item failure fails the whole load and no partial collection
/// is ever returned. Each item is present exactly once: a post-build
/// size check catches duplicate URLs collapsing in the map.
pub async fn load_collection<T: DeserializeOwned>(
  cache: &ResponseCache,
  endpoint: &str,
) -> Result<BTreeMap<String, T>> {
  let list = load_full_list(cache, endpoint).await?;

  if list.count != list.results.len() {
    return Err(Error::CountMismatch {
      url: endpoint.to_string(),
      count: list.count,
      got: list.results.len(),
    });
  }

  let expected = list.count;
  debug!(endpoint, items = expected, "materializing collection");

  let collection: BTreeMap<String, T> = futures::stream::iter(list.results)
    .map(|resource| async move {
      let item = cache.fetch_typed::<T>(&resource.url).await?;
      Ok::<_, Error>((resource.url, item))
    })
    .buffer_unordered(DETAIL_FETCH_CONCURRENCY)
    .try_collect()
    .await?;

  if collection.len() != expected {
    return Err(Error::CountMismatch {
      url: endpoint.to_string(),
      count: expected,
      got: collection.len(),
    });
  }

  Ok(collection)
}

#[cfg(test)]
mod tests {
  use std::sync::Arc;

  use crate::api::types::{Language, NamedApiResource, NamedApiResourceList};
  use crate::cache::backend::FlatFileBackend;
  use crate::net::testing::FakeFetcher;

  use super::*;

  const ENDPOINT: &str = "https://pokeapi.co/api/v2/language";

  fn item_url(name: &str) -> String {
    format!("https://pokeapi.co/api/v2/language/{}/", name)
  }

  fn list_body(count: usize, names: &[&str]) -> String {
    serde_json::to_string(&NamedApiResourceList {
      count,
      next: None,
      previous: None,
      results: names
        .iter()
        .map(|n| NamedApiResource {
          name: n.to_string(),
          url: item_url(n),
        })
        .collect(),
    })
    .unwrap()
  }

  fn language_body(id: i64, name: &str) -> String {
    format!(
      r#"{{"id":{},"name":"{}","official":true,"iso639":"{}","iso3166":"{}","names":[]}}"#,
      id, name, name, name
    )
  }

  fn cache_with(
    dir: &tempfile::TempDir,
    fetcher: Arc<FakeFetcher>,
  ) -> ResponseCache {
    let storage = Box::new(FlatFileBackend::open(&dir.path().join("cache.dat")).unwrap());
    ResponseCache::new(storage, fetcher)
  }

  #[tokio::test]
  async fn materializes_every_item_keyed_by_url() {
    let dir = tempfile::tempdir().unwrap();
    let fetcher = Arc::new(FakeFetcher::new([
      (ENDPOINT.to_string(), list_body(2, &["en", "fr"])),
      (item_url("en"), language_body(9, "en")),
      (item_url("fr"), language_body(5, "fr")),
    ]));
    let cache = cache_with(&dir, fetcher.clone());

    let collection: BTreeMap<String, Language> =
      load_collection(&cache, ENDPOINT).await.unwrap();

    assert_eq!(collection.len(), 2);
    assert_eq!(collection[&item_url("en")].id, 9);
    assert_eq!(collection[&item_url("fr")].name, "fr");
    // list + two items
    assert_eq!(fetcher.call_count(), 3);
  }

  #[tokio::test]
  async fn one_bad_item_fails_the_whole_load() {
    let dir = tempfile::tempdir().unwrap();
    let fetcher = Arc::new(FakeFetcher::new([
      (ENDPOINT.to_string(), list_body(2, &["en", "fr"])),
      (item_url("en"), language_body(9, "en")),
      (item_url("fr"), "{\"id\":\"broken\"}".to_string()),
    ]));
    let cache = cache_with(&dir, fetcher.clone());

    let result: Result<BTreeMap<String, Language>> = load_collection(&cache, ENDPOINT).await;
    assert!(matches!(result, Err(Error::Decode { .. })));
  }

  #[tokio::test]
  async fn unresolvable_count_mismatch_is_fatal() {
    // The limit override still comes back short, so the invariant
    // check rejects the list before any detail fetch happens.
    let dir = tempfile::tempdir().unwrap();
    let fetcher = Arc::new(FakeFetcher::new([
      (ENDPOINT.to_string(), list_body(3, &["en", "fr"])),
      (format!("{}?limit=3", ENDPOINT), list_body(3, &["en", "fr"])),
    ]));
    let cache = cache_with(&dir, fetcher.clone());

    let result: Result<BTreeMap<String, Language>> = load_collection(&cache, ENDPOINT).await;
    assert!(matches!(
      result,
      Err(Error::CountMismatch { count: 3, got: 2, .. })
    ));
  }

  #[tokio::test]
  async fn duplicate_item_urls_are_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let fetcher = Arc::new(FakeFetcher::new([
      (ENDPOINT.to_string(), list_body(2, &["en", "en"])),
      (item_url("en"), language_body(9, "en")),
    ]));
    let cache = cache_with(&dir, fetcher.clone());

    let result: Result<BTreeMap<String, Language>> = load_collection(&cache, ENDPOINT).await;
    assert!(matches!(
      result,
      Err(Error::CountMismatch { count: 2, got: 1, .. })
    ));
  }
}
