//! Serde-deserializable types matching PokeAPI responses.
//!
//! Field names on the wire are lower_case_with_underscores, which is
//! exactly what serde derives from snake_case Rust fields, so no
//! rename attributes are needed. Nested objects and arrays decode
//! recursively.

use serde::{Deserialize, Serialize};

// ============================================================================
// Resource pointers and lists
// ============================================================================

/// A pointer to a remote item that has no canonical name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApiResource {
  pub url: String,
}

/// A named pointer to a remote item. Never owns the item's content.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NamedApiResource {
  pub name: String,
  pub url: String,
}

/// One page of a paginated list endpoint.
///
/// After pagination resolution the loader requires
/// `count == results.len()`; see `api::list`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NamedApiResourceList {
  pub count: usize,
  #[serde(default)]
  pub next: Option<String>,
  #[serde(default)]
  pub previous: Option<String>,
  pub results: Vec<NamedApiResource>,
}

// ============================================================================
// Common nested field types
// ============================================================================

/// A localized name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Name {
  pub name: String,
  pub language: NamedApiResource,
}

/// A localized free-form description.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Description {
  pub description: String,
  pub language: NamedApiResource,
}

/// A localized flavor text entry, tied to the game version it first
/// appeared in.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FlavorText {
  pub flavor_text: String,
  pub language: NamedApiResource,
  #[serde(default)]
  pub version: Option<NamedApiResource>,
}

// ============================================================================
// Typed resources
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Language {
  pub id: i64,
  pub name: String,
  pub official: bool,
  pub iso639: String,
  pub iso3166: String,
  #[serde(default)]
  pub names: Vec<Name>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PokemonSpecies {
  pub id: i64,
  pub name: String,
  #[serde(default)]
  pub order: Option<i64>,
  pub gender_rate: i64,
  pub capture_rate: i64,
  #[serde(default)]
  pub base_happiness: Option<i64>,
  pub is_baby: bool,
  pub is_legendary: bool,
  pub is_mythical: bool,
  #[serde(default)]
  pub hatch_counter: Option<i64>,
  #[serde(default)]
  pub growth_rate: Option<NamedApiResource>,
  #[serde(default)]
  pub egg_groups: Vec<NamedApiResource>,
  #[serde(default)]
  pub color: Option<NamedApiResource>,
  #[serde(default)]
  pub shape: Option<NamedApiResource>,
  #[serde(default)]
  pub evolves_from_species: Option<NamedApiResource>,
  #[serde(default)]
  pub evolution_chain: Option<ApiResource>,
  #[serde(default)]
  pub habitat: Option<NamedApiResource>,
  pub generation: NamedApiResource,
  #[serde(default)]
  pub names: Vec<Name>,
  #[serde(default)]
  pub flavor_text_entries: Vec<FlavorText>,
  #[serde(default)]
  pub form_descriptions: Vec<Description>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Generation {
  pub id: i64,
  pub name: String,
  pub main_region: NamedApiResource,
  #[serde(default)]
  pub names: Vec<Name>,
  #[serde(default)]
  pub pokemon_species: Vec<NamedApiResource>,
  #[serde(default)]
  pub version_groups: Vec<NamedApiResource>,
}
