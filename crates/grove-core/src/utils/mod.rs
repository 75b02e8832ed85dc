//! Utility functions and helpers.
//!
//! Common functionality used across multiple grove crates.

pub mod hash;
pub mod repo;

// Re-export commonly used utilities
pub use hash::{blake3_hash, cache_key};
pub use repo::{default_repository, infer_vcs, normalize_url, repository_root};
