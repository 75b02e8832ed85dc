//! Project manifests and the reader seam that produces them.

use super::{Declaration, Requester};
use crate::error::GroveResult;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// The declarations of one project, root or dependency
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Manifest {
    /// The project's own import path
    pub name: String,
    /// Declarations in manifest order
    pub dependencies: Vec<Declaration>,
}

impl Manifest {
    /// Create an empty manifest
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            dependencies: Vec::new(),
        }
    }

    /// Add a declaration
    pub fn with_dependency(mut self, declaration: Declaration) -> Self {
        self.dependencies.push(declaration);
        self
    }

    /// The requester identity for declarations made by this root manifest
    pub fn root_requester(&self) -> Requester {
        Requester::Root(self.name.clone())
    }
}

/// Reads manifests from checked-out source trees.
///
/// The resolver calls this for the root project and for every fetched
/// dependency; a dependency without a manifest yields `Ok(None)`.
pub trait ManifestReader: Send + Sync {
    /// File name this reader looks for (e.g. `grove.toml`)
    fn manifest_file_name(&self) -> &str;

    /// Read the manifest in `dir`, attributing declarations to `requester`
    fn read(&self, dir: &Path, requester: &Requester) -> GroveResult<Option<Manifest>>;
}
