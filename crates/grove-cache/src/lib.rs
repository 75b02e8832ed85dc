//! Repository cache for grove
//!
//! This crate provides the shared on-disk store of working copies, keyed by
//! normalized repository URL. Acquisitions of the same URL serialize; different
//! URLs proceed in parallel. A persisted index records when each entry was
//! last synced and whether its working copy is known to be complete.

pub mod index;
pub mod repository;

// Re-export main types
pub use index::{CacheEntry, CacheIndex};
pub use repository::{CacheHandle, CacheOptions, Freshness, RepositoryCache};

use grove_core::error::GroveError;

/// Result type for cache operations
pub type CacheResult<T> = Result<T, GroveError>;
