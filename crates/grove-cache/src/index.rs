//! Cache index for entry metadata
//!
//! This module provides the CacheIndex, persisted as `index.json` at the cache
//! root, tracking every working copy and its sync state.

use chrono::{DateTime, Duration as ChronoDuration, Utc};
use dashmap::DashMap;
use grove_core::{GroveError, VcsKind};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::warn;

use crate::CacheResult;

/// Metadata for one cached working copy
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheEntry {
    /// Normalized repository URL
    pub url: String,
    pub kind: VcsKind,
    /// Directory name under the cache's repository root
    pub path: String,
    pub last_synced: DateTime<Utc>,
    /// False while a sync is in progress or after one failed midway
    pub valid: bool,
}

impl CacheEntry {
    /// Create a new, valid entry synced now
    pub fn new(url: impl Into<String>, kind: VcsKind, path: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            kind,
            path: path.into(),
            last_synced: Utc::now(),
            valid: true,
        }
    }

    /// Check if the entry was synced within `grace`
    pub fn is_within(&self, grace: Duration) -> bool {
        match ChronoDuration::from_std(grace) {
            Ok(grace) => Utc::now() - self.last_synced < grace,
            Err(_) => true,
        }
    }
}

/// Persisted index of cache entries, keyed by normalized URL
#[derive(Debug)]
pub struct CacheIndex {
    entries: DashMap<String, CacheEntry>,
    index_path: PathBuf,
    /// Serializes writers of the index file
    save_lock: Mutex<()>,
}

impl CacheIndex {
    /// Load existing index or create an empty one.
    ///
    /// An unreadable index is discarded: every working copy it described is
    /// treated as unknown and will be re-cloned.
    pub fn load_or_create<P: AsRef<Path>>(index_path: P) -> CacheResult<Self> {
        let index_path = index_path.as_ref().to_path_buf();
        let entries = DashMap::new();

        if index_path.exists() {
            let loaded = fs::read_to_string(&index_path)
                .map_err(|e| e.to_string())
                .and_then(|content| {
                    serde_json::from_str::<Vec<CacheEntry>>(&content).map_err(|e| e.to_string())
                });
            match loaded {
                Ok(list) => {
                    for entry in list {
                        entries.insert(entry.url.clone(), entry);
                    }
                },
                Err(error) => {
                    warn!(path = %index_path.display(), error = %error, "discarding unreadable cache index");
                },
            }
        }

        Ok(Self {
            entries,
            index_path,
            save_lock: Mutex::new(()),
        })
    }

    /// Insert or replace an entry
    pub fn insert(&self, entry: CacheEntry) {
        self.entries.insert(entry.url.clone(), entry);
    }

    /// Get an entry by URL
    pub fn get(&self, url: &str) -> Option<CacheEntry> {
        self.entries.get(url).map(|e| e.clone())
    }

    /// Remove an entry
    pub fn remove(&self, url: &str) -> Option<CacheEntry> {
        self.entries.remove(url).map(|(_, e)| e)
    }

    /// Flip an entry's valid flag, stamping `last_synced` when it becomes valid
    pub fn set_valid(&self, url: &str, valid: bool) {
        if let Some(mut entry) = self.entries.get_mut(url) {
            entry.valid = valid;
            if valid {
                entry.last_synced = Utc::now();
            }
        }
    }

    /// All entries, sorted by URL
    pub fn entries(&self) -> Vec<CacheEntry> {
        let mut list: Vec<CacheEntry> = self.entries.iter().map(|e| e.value().clone()).collect();
        list.sort_by(|a, b| a.url.cmp(&b.url));
        list
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Drop every entry (in memory only)
    pub fn clear(&self) {
        self.entries.clear();
    }

    /// Save index to disk, replacing the previous file atomically
    pub fn save(&self) -> CacheResult<()> {
        let _guard = self.save_lock.lock();
        let content = serde_json::to_string_pretty(&self.entries()).map_err(|e| {
            GroveError::io(
                "Failed to serialize cache index",
                std::io::Error::new(std::io::ErrorKind::InvalidData, e.to_string()),
            )
        })?;

        let parent = self
            .index_path
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from("."));
        fs::create_dir_all(&parent)
            .map_err(|e| GroveError::io("Failed to create cache directory", e))?;

        let mut staged = tempfile::NamedTempFile::new_in(&parent)
            .map_err(|e| GroveError::io("Failed to stage cache index", e))?;
        staged
            .write_all(content.as_bytes())
            .map_err(|e| GroveError::io("Failed to write cache index", e))?;
        staged
            .persist(&self.index_path)
            .map_err(|e| GroveError::io("Failed to replace cache index", e.error))?;
        Ok(())
    }
}
