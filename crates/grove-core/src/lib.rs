//! # grove-core
//!
//! Core types and utilities shared across all grove crates.
//!
//! This crate provides:
//! - Version, VersionReq and Constraint types for dependency declarations
//! - Declaration, Manifest and ResolvedPackage types for the resolution data model
//! - GroveError enum for unified error handling
//! - Repository URL helpers (normalization, VCS inference, cache keys)
//!
//! ## Architecture
//!
//! The crate is organized into modules:
//! - `types`: Core data types (Version, Constraint, Declaration, etc.)
//! - `error`: Error types and result aliases
//! - `utils`: Utility functions and helpers

pub mod error;
pub mod types;
pub mod utils;

// Re-export commonly used types
pub use error::{GroveError, GroveResult};
pub use types::{
    Constraint, Declaration, Manifest, ManifestReader, Requester, ResolvedPackage, VcsKind,
    Version, VersionReq,
};
