//! Core data types for grove dependency management.
//!
//! This module provides the fundamental types used throughout grove:
//! - Version and constraint types for declarations
//! - Dependency declarations and the manifest that carries them
//! - Resolved (pinned) packages and VCS kinds

pub mod constraint;
pub mod dependency;
pub mod manifest;
pub mod package;
pub mod vcs;
pub mod version;

// Re-export all public types
pub use constraint::Constraint;
pub use dependency::{Declaration, Requester};
pub use manifest::{Manifest, ManifestReader};
pub use package::ResolvedPackage;
pub use vcs::VcsKind;
pub use version::{Comparator, Op, PartialVersion, Version, VersionError, VersionReq};
