//! PokeAPI client wired through the response cache.

use std::collections::BTreeMap;
use std::sync::Arc;

use tracing::info;

use crate::cache::{backend, ResponseCache};
use crate::config::Config;
use crate::error::Result;
use crate::net::HttpFetcher;

use super::collection::load_collection;
use super::list::load_full_list;
use super::types::{Generation, Language, NamedApiResourceList, PokemonSpecies};

/// Catalog client. All reads go through the response cache, so any
/// resource is fetched over the network at most once per store.
pub struct PokeClient {
  cache: ResponseCache,
  base_url: String,
}

impl PokeClient {
  /// Build a client from configuration: open the configured storage
  /// backend and attach an HTTP fetcher with the configured agent.
  pub fn new(config: &Config) -> Result<Self> {
    let path = config.cache.resolved_path()?;
    let storage = backend::open(config.cache.backend, &path)?;
    info!(backend = %config.cache.backend, path = %path.display(), "cache open");

    let fetcher = Arc::new(HttpFetcher::new(&config.api.user_agent)?);
    Ok(Self::from_parts(
      ResponseCache::new(storage, fetcher),
      config.api.base_url.clone(),
    ))
  }

  /// Assemble a client from an existing cache, mainly for tests.
  pub fn from_parts(cache: ResponseCache, base_url: impl Into<String>) -> Self {
    Self {
      cache,
      base_url: base_url.into(),
    }
  }

  fn endpoint(&self, resource: &str) -> String {
    format!("{}/{}", self.base_url.trim_end_matches('/'), resource)
  }

  /// Complete name/url listing for any list endpoint, e.g.
  /// `pokemon-species` or `generation`.
  pub async fn list(&self, resource: &str) -> Result<NamedApiResourceList> {
    load_full_list(&self.cache, &self.endpoint(resource)).await
  }

  pub async fn species(&self) -> Result<BTreeMap<String, PokemonSpecies>> {
    load_collection(&self.cache, &self.endpoint("pokemon-species")).await
  }

  pub async fn generations(&self) -> Result<BTreeMap<String, Generation>> {
    load_collection(&self.cache, &self.endpoint("generation")).await
  }

  pub async fn languages(&self) -> Result<BTreeMap<String, Language>> {
    load_collection(&self.cache, &self.endpoint("language")).await
  }

  pub fn cache(&self) -> &ResponseCache {
    &self.cache
  }
}

#[cfg(test)]
mod tests {
  use std::sync::Arc;

  use crate::cache::backend::FlatFileBackend;
  use crate::net::testing::FakeFetcher;

  use super::*;

  #[tokio::test]
  async fn endpoint_joins_base_url_without_doubled_slashes() {
    let dir = tempfile::tempdir().unwrap();
    let fetcher = Arc::new(FakeFetcher::new([(
      "https://pokeapi.co/api/v2/language".to_string(),
      r#"{"count":0,"results":[]}"#.to_string(),
    )]));
    let storage = Box::new(FlatFileBackend::open(&dir.path().join("cache.dat")).unwrap());
    let client = PokeClient::from_parts(
      ResponseCache::new(storage, fetcher.clone()),
      "https://pokeapi.co/api/v2/",
    );

    let list = client.list("language").await.unwrap();
    assert_eq!(list.count, 0);
    assert_eq!(fetcher.call_count(), 1);
  }
}
