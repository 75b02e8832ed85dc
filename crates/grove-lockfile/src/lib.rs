//! # grove-lockfile
//!
//! The lock model: a snapshot of every pinned package plus a fingerprint of
//! the manifest it was resolved from.
//!
//! - `compute_fingerprint` hashes the manifest's semantic fields only, so
//!   reformatting or reordering a manifest does not make its lock stale.
//! - `load_lock` / `save_lock` persist snapshots as TOML with packages sorted
//!   by import path, which keeps the file byte-identical across runs.

mod fingerprint;
mod snapshot;

pub use fingerprint::{compute_fingerprint, is_stale};
pub use snapshot::{load_lock, save_lock, LockSnapshot, LOCK_FILE_NAME};

use grove_core::error::GroveError;

/// Result type for lock file operations
pub type LockResult<T> = Result<T, GroveError>;
