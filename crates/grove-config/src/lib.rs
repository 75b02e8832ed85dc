//! Configuration handling for grove
//!
//! This crate reads project manifests (`grove.toml`), the persisted mirror
//! list (`mirrors.toml`) and the layered global configuration, turning them
//! into the in-memory types the resolver works with.

pub mod manifest;
pub mod merge;
pub mod mirrors;

// Re-export main types
pub use manifest::{
    find_manifest, load_manifest, parse_manifest, DependencySpec, GroveToml, PackageSection, TomlManifestReader,
    MANIFEST_FILE_NAME,
};
pub use merge::{ConfigLayering, ConfigLoader, GroveConfig};
pub use mirrors::{load_mirror_table, load_mirrors, remove_mirror, save_mirrors, set_mirror, MIRRORS_FILE_NAME};

use grove_core::error::GroveError;

/// Result type for configuration operations
pub type ConfigResult<T> = Result<T, GroveError>;
