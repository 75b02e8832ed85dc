//! # grove-vcs
//!
//! Version-control plumbing for grove.
//!
//! This crate provides:
//! - `MirrorTable`: longest-prefix URL rewriting consulted before any fetch
//! - `VcsBackend`: one capability set implemented per VCS kind (git, hg, svn, bzr)
//! - `Backends`: the kind-to-backend registry handed to the cache and resolver
//! - `with_retry`: bounded exponential backoff for transient failures

pub mod backend;
pub mod command;
#[cfg(any(test, feature = "testing"))]
pub mod memory;
pub mod mirror;
pub mod retry;

pub use backend::{Backends, RefEntry, RefKind, VcsBackend};
pub use mirror::{MirrorEntry, MirrorResolution, MirrorTable};
pub use retry::{with_retry, RetryConfig};

use grove_core::error::GroveError;

/// Result type for VCS operations
pub type VcsResult<T> = Result<T, GroveError>;
