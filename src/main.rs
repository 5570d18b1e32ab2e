mod api;
mod cache;
mod config;
mod error;
mod net;

use clap::{Parser, Subcommand};
use color_eyre::eyre::eyre;
use color_eyre::Result;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

use cache::backend::{self, BackendKind};

#[derive(Parser, Debug)]
#[command(name = "pokefetch")]
#[command(about = "A caching catalog fetcher for the PokeAPI")]
#[command(version)]
struct Args {
  /// Path to config file (default: $XDG_CONFIG_HOME/pokefetch/config.yaml)
  #[arg(short, long)]
  config: Option<PathBuf>,

  /// Storage backend for the response cache
  #[arg(short, long)]
  backend: Option<BackendKind>,

  /// Cache file (or directory) to use instead of the default
  #[arg(long)]
  cache_path: Option<PathBuf>,

  #[command(subcommand)]
  command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
  /// Print the complete name => url listing of a list endpoint
  List {
    /// Resource name, e.g. pokemon-species, generation, language
    resource: String,
  },
  /// Load every Pokémon species
  Species,
  /// Load every generation
  Generations,
  /// Load every language
  Languages,
  /// Show how many responses the cache currently holds
  Stats,
  /// Check that another cache store holds exactly the same entries
  Compare {
    /// Backend kind of the other store
    other_backend: BackendKind,
    /// Path of the other store
    other_path: PathBuf,
  },
}

#[tokio::main]
async fn main() -> Result<()> {
  color_eyre::install()?;

  tracing_subscriber::fmt()
    .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
    .with_writer(std::io::stderr)
    .init();

  let args = Args::parse();

  // Load configuration, then apply command-line overrides
  let mut config = config::Config::load(args.config.as_deref())?;
  if let Some(backend) = args.backend {
    config.cache.backend = backend;
  }
  if let Some(path) = args.cache_path {
    config.cache.path = Some(path);
  }

  match args.command {
    Command::List { resource } => {
      let client = api::PokeClient::new(&config)?;
      let list = client.list(&resource).await?;
      for resource in &list.results {
        println!("{} => {}", resource.name, resource.url);
      }
      println!("{} resources", list.count);
    }
    Command::Species => {
      let client = api::PokeClient::new(&config)?;
      let species = client.species().await?;

      let mut by_id: Vec<_> = species.values().collect();
      by_id.sort_by_key(|s| s.id);
      for s in by_id {
        let mut flags = String::new();
        if s.is_legendary {
          flags.push_str(" [legendary]");
        }
        if s.is_mythical {
          flags.push_str(" [mythical]");
        }
        println!("{:>4} {}{}", s.id, s.name, flags);
      }
      println!("{} species", species.len());
    }
    Command::Generations => {
      let client = api::PokeClient::new(&config)?;
      let generations = client.generations().await?;

      let mut by_id: Vec<_> = generations.values().collect();
      by_id.sort_by_key(|g| g.id);
      for g in by_id {
        println!(
          "{:>2} {} ({}, {} species)",
          g.id,
          g.name,
          g.main_region.name,
          g.pokemon_species.len()
        );
      }
      println!("{} generations", generations.len());
    }
    Command::Languages => {
      let client = api::PokeClient::new(&config)?;
      let languages = client.languages().await?;

      let mut by_id: Vec<_> = languages.values().collect();
      by_id.sort_by_key(|l| l.id);
      for l in by_id {
        let official = if l.official { "official" } else { "unofficial" };
        println!("{:>2} {} ({}, {})", l.id, l.name, l.iso639, official);
      }
      println!("{} languages", languages.len());
    }
    Command::Stats => {
      let path = config.cache.resolved_path()?;
      let store = backend::open(config.cache.backend, &path)?;

      let mut entries = 0usize;
      let mut bytes = 0usize;
      for (key, value) in store.entries()? {
        entries += 1;
        bytes += key.len() + value.len();
      }
      println!(
        "{} ({}): {} cached responses, {} bytes",
        path.display(),
        config.cache.backend,
        entries,
        bytes
      );
    }
    Command::Compare {
      other_backend,
      other_path,
    } => {
      let path = config.cache.resolved_path()?;
      let ours = backend::open(config.cache.backend, &path)?;
      let theirs = backend::open(other_backend, &other_path)?;

      let our_map = backend::entries_map(ours.as_ref())?;
      let their_map = backend::entries_map(theirs.as_ref())?;

      if our_map == their_map {
        println!("stores are equivalent ({} entries)", our_map.len());
      } else {
        for key in our_map.keys() {
          if !their_map.contains_key(key) {
            println!("only in {}: {}", path.display(), key);
          }
        }
        for key in their_map.keys() {
          if !our_map.contains_key(key) {
            println!("only in {}: {}", other_path.display(), key);
          }
        }
        for (key, value) in &our_map {
          if their_map.get(key).is_some_and(|other| other != value) {
            println!("differing value for {}", key);
          }
        }
        return Err(eyre!(
          "stores differ ({} vs {} entries)",
          our_map.len(),
          their_map.len()
        ));
      }
    }
  }

  Ok(())
}
