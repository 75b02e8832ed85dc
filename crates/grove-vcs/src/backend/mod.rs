//! VCS backend abstraction.
//!
//! Every backend realizes the same capability set; callers pick a backend by
//! kind through [`Backends`] and never branch on the kind themselves. All side
//! effects are confined to the path the caller passes in.

mod bzr;
mod git;
mod hg;
mod svn;

pub use bzr::BzrBackend;
pub use git::GitBackend;
pub use hg::HgBackend;
pub use svn::SvnBackend;

use crate::VcsResult;
use async_trait::async_trait;
use grove_core::{GroveError, VcsKind};
use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

/// What a listed ref names
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RefKind {
    Branch,
    Tag,
    /// The remote's default branch
    Default,
}

/// One named ref and the revision it points at
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RefEntry {
    pub name: String,
    pub revision: String,
    pub kind: RefKind,
}

impl RefEntry {
    pub fn new(name: impl Into<String>, revision: impl Into<String>, kind: RefKind) -> Self {
        Self {
            name: name.into(),
            revision: revision.into(),
            kind,
        }
    }
}

/// Capability set implemented once per VCS kind
#[async_trait]
pub trait VcsBackend: Send + Sync {
    /// The kind this backend serves
    fn kind(&self) -> VcsKind;

    /// Create a working copy of `url` at `dest` (which must not exist yet)
    async fn clone_to(&self, url: &str, dest: &Path) -> VcsResult<()>;

    /// Bring the working copy at `path` up to date with its remote
    async fn update(&self, path: &Path) -> VcsResult<()>;

    /// Check out `revision` (a revision id or ref name) in the working copy
    async fn checkout(&self, path: &Path, revision: &str) -> VcsResult<()>;

    /// List branches and tags known to the working copy, in native order
    async fn list_refs(&self, path: &Path) -> VcsResult<Vec<RefEntry>>;

    /// Revision currently checked out
    async fn current_revision(&self, path: &Path) -> VcsResult<String>;
}

/// Registry of backends by kind
#[derive(Clone, Default)]
pub struct Backends {
    backends: HashMap<VcsKind, Arc<dyn VcsBackend>>,
}

impl Backends {
    /// Registry with no backends
    pub fn empty() -> Self {
        Self::default()
    }

    /// Backends that drive the system's command-line tools
    pub fn system() -> Self {
        Self::empty()
            .with(Arc::new(GitBackend))
            .with(Arc::new(HgBackend))
            .with(Arc::new(SvnBackend))
            .with(Arc::new(BzrBackend))
    }

    /// Register (or replace) the backend for its kind
    pub fn with(mut self, backend: Arc<dyn VcsBackend>) -> Self {
        self.backends.insert(backend.kind(), backend);
        self
    }

    /// Backend for `kind`
    pub fn get(&self, kind: VcsKind) -> VcsResult<Arc<dyn VcsBackend>> {
        self.backends
            .get(&kind)
            .cloned()
            .ok_or_else(|| GroveError::VcsCommand {
                command: kind.command().to_string(),
                message: format!("no backend registered for {}", kind),
            })
    }
}

impl std::fmt::Debug for Backends {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut kinds: Vec<_> = self.backends.keys().collect();
        kinds.sort();
        f.debug_struct("Backends").field("kinds", &kinds).finish()
    }
}

fn path_str(path: &Path) -> String {
    path.display().to_string()
}
