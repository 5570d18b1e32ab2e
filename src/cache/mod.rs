//! Persistent URL-keyed response caching.
//!
//! This module is the reason repeated runs never re-fetch a resource:
//! - `backend` defines the durable key-value store contract and its
//!   interchangeable implementations
//! - `response` maps fetch URLs to raw response bodies on top of a
//!   backend, fetching over the network only on first access

pub mod backend;
mod response;

pub use response::{decode, ResponseCache};
