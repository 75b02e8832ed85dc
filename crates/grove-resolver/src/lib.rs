//! Dependency resolution engine for grove
//!
//! This crate discovers the transitive dependency graph breadth-first,
//! reconciles the constraints every requester places on each import path,
//! fetches sources through the mirror table and repository cache, and emits
//! a lock snapshot pinning one revision per import path.

pub mod engine;
pub mod graph;
pub mod inspect;
pub mod reconcile;
pub mod semver;

// Re-export main types
pub use engine::{Resolution, ResolutionWarning, Resolver, ResolverOptions, WarningKind};
pub use graph::DependencyGraph;
pub use reconcile::{reconcile, Reconciled};
pub use semver::{select_revision, Selection};

use grove_core::error::GroveError;

/// Result type for resolver operations
pub type ResolverResult<T> = Result<T, GroveError>;
