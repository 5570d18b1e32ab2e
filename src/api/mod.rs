//! PokeAPI domain: wire types, list pagination, collection loading,
//! and the client tying them to the response cache.

mod client;
mod collection;
mod list;
mod types;

pub use client::PokeClient;
pub use collection::load_collection;
pub use list::load_full_list;
pub use types::{
  ApiResource, Description, FlavorText, Generation, Language, Name, NamedApiResource,
  NamedApiResourceList, PokemonSpecies,
};
