//! Error types shared across the crate.

use std::path::PathBuf;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

/// Everything that can go wrong while loading a collection.
///
/// No variant is ever swallowed or defaulted: any failure aborts the
/// enclosing load and surfaces to the caller.
#[derive(Debug, Error)]
pub enum Error {
  /// The cache store could not be opened at all. Fatal for the run.
  #[error("storage unavailable at {}: {reason}", .path.display())]
  StorageUnavailable { path: PathBuf, reason: String },

  /// The cache store failed mid-operation.
  #[error("storage failure: {0}")]
  Storage(String),

  /// A network GET failed. Not retried here; callers may retry the
  /// whole operation.
  #[error("fetch failed for {url}: {reason}")]
  Fetch { url: String, reason: String },

  /// A cached body could not be decoded into the requested type. The
  /// raw body stays cached, so decoding can be retried without a
  /// network round trip.
  #[error("decode failed for {url}: {reason}")]
  Decode { url: String, reason: String },

  /// The server's reported count does not match the results it
  /// returned, even after the limit override. Pagination beyond that
  /// single override is unsupported, so this is fatal.
  #[error("resource list {url}: count ({count}) should equal the length of the results array ({got})")]
  CountMismatch { url: String, count: usize, got: usize },

  /// Configuration could not be loaded or applied.
  #[error("configuration error: {0}")]
  Config(String),
}
