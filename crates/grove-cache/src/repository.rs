//! Repository cache with per-URL single-flight acquisition.
//!
//! Working copies live under `<root>/repos/<cache key>`. A new clone is made
//! in a staging directory inside the cache root and renamed into place only
//! once the backend reports success, so an aborted clone never leaves a
//! half-written working copy behind. Updates mark the entry invalid for their
//! duration; an entry found invalid on the next acquisition is re-cloned.

use crate::index::{CacheEntry, CacheIndex};
use crate::CacheResult;
use dashmap::{DashMap, DashSet};
use grove_core::utils::{cache_key, normalize_url};
use grove_core::{GroveError, VcsKind};
use grove_vcs::{with_retry, Backends, RetryConfig, VcsBackend};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Mutex, OwnedMutexGuard};
use tracing::{debug, info, warn};

const REPOS_DIR: &str = "repos";
const INDEX_FILE: &str = "index.json";

/// Tunables for cache synchronization
#[derive(Debug, Clone)]
pub struct CacheOptions {
    /// Entries synced more recently than this skip the network entirely
    pub grace_period: Duration,
    pub retry: RetryConfig,
}

impl Default for CacheOptions {
    fn default() -> Self {
        Self {
            grace_period: Duration::ZERO,
            retry: RetryConfig::default(),
        }
    }
}

/// How the working copy behind a handle was brought up to date
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Freshness {
    /// Cloned by this acquisition
    Cloned,
    /// Updated in place by this acquisition
    Updated,
    /// Already synced this session or within the grace period; no network
    Fresh,
}

/// Exclusive access to one cached working copy.
///
/// Other acquisitions of the same URL wait until this handle is dropped.
pub struct CacheHandle {
    url: String,
    kind: VcsKind,
    path: PathBuf,
    freshness: Freshness,
    backend: Arc<dyn VcsBackend>,
    _guard: OwnedMutexGuard<()>,
}

impl CacheHandle {
    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn kind(&self) -> VcsKind {
        self.kind
    }

    /// Working copy directory
    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn freshness(&self) -> Freshness {
        self.freshness
    }

    /// Backend that manages this working copy
    pub fn backend(&self) -> &dyn VcsBackend {
        self.backend.as_ref()
    }
}

impl std::fmt::Debug for CacheHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CacheHandle")
            .field("url", &self.url)
            .field("kind", &self.kind)
            .field("path", &self.path)
            .field("freshness", &self.freshness)
            .finish()
    }
}

/// Shared store of working copies, keyed by normalized URL
pub struct RepositoryCache {
    root: PathBuf,
    backends: Backends,
    index: CacheIndex,
    options: CacheOptions,
    locks: DashMap<String, Arc<Mutex<()>>>,
    /// URLs synced during this session; later acquisitions reuse them as-is
    synced: DashSet<String>,
}

impl RepositoryCache {
    /// Open (or create) the cache rooted at `root`
    pub fn open(root: impl AsRef<Path>, backends: Backends, options: CacheOptions) -> CacheResult<Self> {
        let root = root.as_ref().to_path_buf();
        fs::create_dir_all(root.join(REPOS_DIR)).map_err(|e| {
            GroveError::io(format!("Failed to create cache directory {}", root.display()), e)
        })?;
        let index = CacheIndex::load_or_create(root.join(INDEX_FILE))?;
        debug!(root = %root.display(), entries = index.len(), "opened repository cache");

        Ok(Self {
            root,
            backends,
            index,
            options,
            locks: DashMap::new(),
            synced: DashSet::new(),
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn index(&self) -> &CacheIndex {
        &self.index
    }

    pub fn backends(&self) -> &Backends {
        &self.backends
    }

    /// Deterministic working-copy location for a URL
    pub fn location(&self, url: &str) -> PathBuf {
        self.root.join(REPOS_DIR).join(cache_key(&normalize_url(url)))
    }

    async fn lock(&self, url: &str) -> OwnedMutexGuard<()> {
        let lock = self
            .locks
            .entry(url.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone();
        lock.lock_owned().await
    }

    /// Acquire exclusive access to an up-to-date working copy of `url`.
    ///
    /// Concurrent callers for the same URL serialize; the later ones observe
    /// the state the first one left and do not sync again.
    pub async fn acquire(&self, url: &str, kind: VcsKind) -> CacheResult<CacheHandle> {
        let url = normalize_url(url);
        let guard = self.lock(&url).await;
        let backend = self.backends.get(kind)?;

        let freshness = match self.sync(&url, kind, backend.as_ref()).await {
            Err(error) if error.is_corruption() => {
                warn!(url = %url, error = %error, "cached working copy is corrupt, re-cloning");
                self.discard(&url)?;
                self.sync(&url, kind, backend.as_ref()).await?
            },
            other => other?,
        };

        Ok(CacheHandle {
            path: self.location(&url),
            url,
            kind,
            freshness,
            backend,
            _guard: guard,
        })
    }

    /// Acquire a working copy without any network access.
    ///
    /// Returns `None` when there is no valid cached copy.
    pub async fn acquire_local(&self, url: &str, kind: VcsKind) -> CacheResult<Option<CacheHandle>> {
        let url = normalize_url(url);
        let guard = self.lock(&url).await;
        let path = self.location(&url);

        let usable = self
            .index
            .get(&url)
            .map_or(false, |e| e.valid && e.kind == kind && path.exists());
        if !usable {
            return Ok(None);
        }

        Ok(Some(CacheHandle {
            url,
            kind,
            path,
            freshness: Freshness::Fresh,
            backend: self.backends.get(kind)?,
            _guard: guard,
        }))
    }

    /// Drop the cached working copy for `url`; the next acquisition re-clones
    pub async fn invalidate(&self, url: &str) -> CacheResult<()> {
        let url = normalize_url(url);
        let _guard = self.lock(&url).await;
        self.discard(&url)
    }

    /// Remove every working copy and the index
    pub fn clean(&self) -> CacheResult<usize> {
        let removed = self.index.len();
        let repos = self.root.join(REPOS_DIR);
        if repos.exists() {
            fs::remove_dir_all(&repos)
                .map_err(|e| GroveError::io(format!("Failed to remove {}", repos.display()), e))?;
        }
        fs::create_dir_all(&repos)
            .map_err(|e| GroveError::io(format!("Failed to create {}", repos.display()), e))?;
        self.index.clear();
        self.synced.clear();
        self.index.save()?;
        info!(root = %self.root.display(), removed, "cleaned repository cache");
        Ok(removed)
    }

    /// Must be called with the URL's lock held
    fn discard(&self, url: &str) -> CacheResult<()> {
        let path = self.location(url);
        if path.exists() {
            fs::remove_dir_all(&path)
                .map_err(|e| GroveError::io(format!("Failed to remove {}", path.display()), e))?;
        }
        self.synced.remove(url);
        if self.index.remove(url).is_some() {
            self.index.save()?;
        }
        Ok(())
    }

    /// Must be called with the URL's lock held
    async fn sync(&self, url: &str, kind: VcsKind, backend: &dyn VcsBackend) -> CacheResult<Freshness> {
        let path = self.location(url);
        let existing = self
            .index
            .get(url)
            .filter(|e| e.valid && e.kind == kind && path.exists());

        let Some(entry) = existing else {
            self.discard(url)?;
            self.clone_into_place(url, kind, backend, &path).await?;
            self.synced.insert(url.to_string());
            return Ok(Freshness::Cloned);
        };

        if self.synced.contains(url) {
            return Ok(Freshness::Fresh);
        }
        if entry.is_within(self.options.grace_period) {
            debug!(url = %url, last_synced = %entry.last_synced, "within grace period, skipping update");
            self.synced.insert(url.to_string());
            return Ok(Freshness::Fresh);
        }

        self.index.set_valid(url, false);
        self.index.save()?;
        let wc = path.as_path();
        with_retry(&self.options.retry, "update", move || backend.update(wc)).await?;
        self.index.set_valid(url, true);
        self.index.save()?;

        debug!(url = %url, "updated cached working copy");
        self.synced.insert(url.to_string());
        Ok(Freshness::Updated)
    }

    async fn clone_into_place(
        &self,
        url: &str,
        kind: VcsKind,
        backend: &dyn VcsBackend,
        path: &Path,
    ) -> CacheResult<()> {
        let repos = self.root.join(REPOS_DIR);
        let staging = tempfile::Builder::new()
            .prefix(".clone-")
            .tempdir_in(&repos)
            .map_err(|e| GroveError::io("Failed to create clone staging directory", e))?;
        let staged = staging.path().join("wc");
        let dest = staged.as_path();

        info!(url = %url, kind = %kind, "cloning repository");
        with_retry(&self.options.retry, "clone", move || async move {
            if dest.exists() {
                fs::remove_dir_all(dest)
                    .map_err(|e| GroveError::io("Failed to reset clone staging directory", e))?;
            }
            backend.clone_to(url, dest).await
        })
        .await?;

        fs::rename(&staged, path)
            .map_err(|e| GroveError::io(format!("Failed to move clone into {}", path.display()), e))?;

        let key = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        self.index.insert(CacheEntry::new(url, kind, key));
        self.index.save()
    }
}

#[cfg(test)]
mod tests;
