//! In-memory VCS backend for tests.
//!
//! Repositories live in memory keyed by URL. Working copies are real
//! directories: a checkout writes the revision's files, so tree inspection
//! behaves exactly as with a real backend. Every capability counts its calls,
//! which lets tests assert on network activity.

use crate::backend::{RefEntry, RefKind, VcsBackend};
use crate::VcsResult;
use async_trait::async_trait;
use grove_core::utils::normalize_url;
use grove_core::{GroveError, VcsKind};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

const ORIGIN_FILE: &str = ".memory-origin";
const HEAD_FILE: &str = ".memory-head";

/// A repository: revisions with their files, plus named refs
#[derive(Debug, Clone, Default)]
pub struct MemoryRepo {
    revisions: HashMap<String, Vec<(String, String)>>,
    refs: Vec<RefEntry>,
    unreachable: bool,
}

impl MemoryRepo {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a revision with the given `(relative path, contents)` files
    pub fn revision(mut self, id: &str, files: &[(&str, &str)]) -> Self {
        let files = files
            .iter()
            .map(|(p, c)| (p.to_string(), c.to_string()))
            .collect();
        self.revisions.insert(id.to_string(), files);
        self
    }

    /// Point the default branch at `revision`
    pub fn default_branch(mut self, name: &str, revision: &str) -> Self {
        self.refs.insert(0, RefEntry::new("HEAD", revision, RefKind::Default));
        self.refs.push(RefEntry::new(name, revision, RefKind::Branch));
        self
    }

    pub fn branch(mut self, name: &str, revision: &str) -> Self {
        self.refs.push(RefEntry::new(name, revision, RefKind::Branch));
        self
    }

    pub fn tag(mut self, name: &str, revision: &str) -> Self {
        self.refs.push(RefEntry::new(name, revision, RefKind::Tag));
        self
    }

    /// Every network operation against this repository fails as unreachable
    /// A revision by full id or by an unambiguous prefix of one
    fn lookup(&self, id: &str) -> Option<(&str, &[(String, String)])> {
        if let Some((full, files)) = self.revisions.get_key_value(id) {
            return Some((full.as_str(), files.as_slice()));
        }
        let mut matches = self.revisions.iter().filter(|(full, _)| full.starts_with(id));
        match (matches.next(), matches.next()) {
            (Some((full, files)), None) if !id.is_empty() => Some((full.as_str(), files.as_slice())),
            _ => None,
        }
    }

    pub fn unreachable(mut self) -> Self {
        self.unreachable = true;
        self
    }
}

/// Call counters
#[derive(Debug, Default)]
struct Counters {
    clones: AtomicUsize,
    updates: AtomicUsize,
    checkouts: AtomicUsize,
    list_refs: AtomicUsize,
}

/// In-memory backend serving one VCS kind
#[derive(Debug)]
pub struct MemoryBackend {
    kind: VcsKind,
    repos: Mutex<HashMap<String, MemoryRepo>>,
    counters: Counters,
    fetched: Mutex<Vec<String>>,
    delay: Option<Duration>,
}

impl MemoryBackend {
    pub fn new(kind: VcsKind) -> Self {
        Self {
            kind,
            repos: Mutex::new(HashMap::new()),
            counters: Counters::default(),
            fetched: Mutex::new(Vec::new()),
            delay: None,
        }
    }

    /// Make every network operation take at least `delay`
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Register (or replace) the repository served at `url`
    pub fn add_repo(&self, url: &str, repo: MemoryRepo) {
        self.repos.lock().insert(normalize_url(url), repo);
    }

    /// Number of `clone_to` calls
    pub fn clones(&self) -> usize {
        self.counters.clones.load(Ordering::SeqCst)
    }

    /// Number of `update` calls
    pub fn updates(&self) -> usize {
        self.counters.updates.load(Ordering::SeqCst)
    }

    /// Number of network operations (clones plus updates)
    pub fn network_calls(&self) -> usize {
        self.clones() + self.updates()
    }

    pub fn checkouts(&self) -> usize {
        self.counters.checkouts.load(Ordering::SeqCst)
    }

    pub fn list_refs_calls(&self) -> usize {
        self.counters.list_refs.load(Ordering::SeqCst)
    }

    /// URLs passed to `clone_to` or `update`, in call order
    pub fn fetched_urls(&self) -> Vec<String> {
        self.fetched.lock().clone()
    }

    async fn network(&self, url: &str) -> VcsResult<MemoryRepo> {
        self.fetched.lock().push(url.to_string());
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        let repo = self.repo(url)?;
        if repo.unreachable {
            return Err(GroveError::NetworkUnavailable {
                url: url.to_string(),
                message: "connection refused".to_string(),
            });
        }
        Ok(repo)
    }

    fn repo(&self, url: &str) -> VcsResult<MemoryRepo> {
        self.repos
            .lock()
            .get(&normalize_url(url))
            .cloned()
            .ok_or_else(|| GroveError::VcsCommand {
                command: format!("{} clone {}", self.kind.command(), url),
                message: "repository not found".to_string(),
            })
    }

    fn origin(&self, path: &Path) -> VcsResult<String> {
        std::fs::read_to_string(path.join(ORIGIN_FILE)).map_err(|e| GroveError::CacheCorruption {
            path: path.display().to_string(),
            message: format!("missing working copy metadata: {}", e),
        })
    }
}

fn write_file(path: &Path, contents: &str) -> VcsResult<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .map_err(|e| GroveError::io(format!("Failed to create {}", parent.display()), e))?;
    }
    std::fs::write(path, contents)
        .map_err(|e| GroveError::io(format!("Failed to write {}", path.display()), e))
}

/// Remove everything but the origin marker
fn clear_working_copy(path: &Path) -> VcsResult<()> {
    let entries = std::fs::read_dir(path)
        .map_err(|e| GroveError::io(format!("Failed to read {}", path.display()), e))?;
    for entry in entries {
        let entry = entry.map_err(|e| GroveError::io(format!("Failed to read {}", path.display()), e))?;
        if entry.file_name() == ORIGIN_FILE {
            continue;
        }
        let target = entry.path();
        let removed = if target.is_dir() {
            std::fs::remove_dir_all(&target)
        } else {
            std::fs::remove_file(&target)
        };
        removed.map_err(|e| GroveError::io(format!("Failed to remove {}", target.display()), e))?;
    }
    Ok(())
}

#[async_trait]
impl VcsBackend for MemoryBackend {
    fn kind(&self) -> VcsKind {
        self.kind
    }

    async fn clone_to(&self, url: &str, dest: &Path) -> VcsResult<()> {
        self.counters.clones.fetch_add(1, Ordering::SeqCst);
        self.network(url).await?;
        write_file(&dest.join(ORIGIN_FILE), url)
    }

    async fn update(&self, path: &Path) -> VcsResult<()> {
        self.counters.updates.fetch_add(1, Ordering::SeqCst);
        let origin = self.origin(path)?;
        self.network(&origin).await?;
        Ok(())
    }

    async fn checkout(&self, path: &Path, revision: &str) -> VcsResult<()> {
        self.counters.checkouts.fetch_add(1, Ordering::SeqCst);
        let origin = self.origin(path)?;
        let repo = self.repo(&origin)?;

        let requested = repo
            .refs
            .iter()
            .find(|r| r.name == revision)
            .map_or(revision, |r| r.revision.as_str());
        let (revision, files) = repo
            .lookup(requested)
            .ok_or_else(|| GroveError::RevisionNotFound {
                url: origin.clone(),
                revision: requested.to_string(),
            })?;
        let revision = revision.to_string();

        clear_working_copy(path)?;
        for (relative, contents) in files {
            write_file(&path.join(relative), contents)?;
        }
        write_file(&path.join(HEAD_FILE), &revision)
    }

    async fn list_refs(&self, path: &Path) -> VcsResult<Vec<RefEntry>> {
        self.counters.list_refs.fetch_add(1, Ordering::SeqCst);
        let origin = self.origin(path)?;
        Ok(self.repo(&origin)?.refs)
    }

    async fn current_revision(&self, path: &Path) -> VcsResult<String> {
        std::fs::read_to_string(path.join(HEAD_FILE)).map_err(|e| GroveError::CacheCorruption {
            path: path.display().to_string(),
            message: format!("no revision checked out: {}", e),
        })
    }
}
