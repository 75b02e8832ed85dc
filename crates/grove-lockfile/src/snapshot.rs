//! Lock snapshots and their TOML persistence.

use crate::LockResult;
use grove_core::{GroveError, ResolvedPackage};
use serde::{Deserialize, Serialize};
use std::fs;
use std::io::Write;
use std::path::Path;
use tracing::debug;

/// Conventional lock file name, next to the manifest
pub const LOCK_FILE_NAME: &str = "grove.lock";

const HEADER: &str = "# This file is generated by grove. Do not edit it by hand.\n\n";

/// Pinned packages plus the fingerprint of the manifest they came from
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LockSnapshot {
    /// Manifest fingerprint at lock time
    pub hash: String,
    /// Sorted by import path, one entry per path
    #[serde(default, rename = "package")]
    pub packages: Vec<ResolvedPackage>,
}

impl LockSnapshot {
    /// Create a snapshot, ordering packages by import path
    pub fn new(hash: impl Into<String>, mut packages: Vec<ResolvedPackage>) -> Self {
        packages.sort_by(|a, b| a.import_path.cmp(&b.import_path));
        Self {
            hash: hash.into(),
            packages,
        }
    }

    /// Look up a pinned package
    pub fn package(&self, import_path: &str) -> Option<&ResolvedPackage> {
        self.packages
            .binary_search_by(|p| p.import_path.as_str().cmp(import_path))
            .ok()
            .map(|i| &self.packages[i])
    }

    pub fn len(&self) -> usize {
        self.packages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.packages.is_empty()
    }

    /// Render the snapshot as lock file text
    pub fn to_toml(&self) -> LockResult<String> {
        let body = toml::to_string_pretty(self).map_err(|e| GroveError::LockInvalid {
            path: LOCK_FILE_NAME.to_string(),
            message: format!("failed to serialize: {}", e),
        })?;
        Ok(format!("{}{}", HEADER, body))
    }

    /// Parse lock file text
    pub fn from_toml(content: &str, origin: &str) -> LockResult<Self> {
        let snapshot: LockSnapshot = toml::from_str(content).map_err(|e| GroveError::LockInvalid {
            path: origin.to_string(),
            message: e.to_string(),
        })?;

        for pair in snapshot.packages.windows(2) {
            if pair[0].import_path >= pair[1].import_path {
                return Err(GroveError::LockInvalid {
                    path: origin.to_string(),
                    message: format!(
                        "packages are not sorted or '{}' is listed twice",
                        pair[1].import_path
                    ),
                });
            }
        }
        Ok(snapshot)
    }
}

/// Read a lock file; `Ok(None)` when it does not exist
pub fn load_lock(path: &Path) -> LockResult<Option<LockSnapshot>> {
    let content = match fs::read_to_string(path) {
        Ok(content) => content,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            debug!(path = %path.display(), "no lock file");
            return Ok(None);
        },
        Err(e) => {
            return Err(GroveError::io(format!("Failed to read {}", path.display()), e));
        },
    };

    let snapshot = LockSnapshot::from_toml(&content, &path.display().to_string())?;
    debug!(path = %path.display(), packages = snapshot.len(), "loaded lock file");
    Ok(Some(snapshot))
}

/// Write a lock file, replacing any previous one atomically
pub fn save_lock(snapshot: &LockSnapshot, path: &Path) -> LockResult<()> {
    let content = snapshot.to_toml()?;
    let parent = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };

    let mut staged = tempfile::NamedTempFile::new_in(parent)
        .map_err(|e| GroveError::io(format!("Failed to stage {}", path.display()), e))?;
    staged
        .write_all(content.as_bytes())
        .map_err(|e| GroveError::io(format!("Failed to write {}", path.display()), e))?;
    staged
        .persist(path)
        .map_err(|e| GroveError::io(format!("Failed to replace {}", path.display()), e.error))?;

    debug!(path = %path.display(), packages = snapshot.len(), "saved lock file");
    Ok(())
}
