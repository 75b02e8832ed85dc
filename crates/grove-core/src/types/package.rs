//! Resolved (pinned) package records.

use super::{Constraint, VcsKind};
use serde::{Deserialize, Serialize};

/// A dependency pinned to one revision
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolvedPackage {
    #[serde(rename = "name")]
    pub import_path: String,
    /// URL actually fetched, after mirror rewriting
    pub repository: String,
    /// URL as declared (or derived) before mirror rewriting
    #[serde(rename = "declared-repository")]
    pub declared_repository: String,
    pub vcs: VcsKind,
    pub revision: String,
    /// Tag the revision was selected through, if any
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    /// Effective constraint the revision was selected for
    pub constraint: Constraint,
    /// Import paths this package depends on, sorted
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub dependencies: Vec<String>,
}

impl ResolvedPackage {
    /// Check if the fetch went through a mirror
    pub fn is_mirrored(&self) -> bool {
        self.repository != self.declared_repository
    }

    /// Short form of the revision for display
    pub fn short_revision(&self) -> &str {
        let end = self
            .revision
            .char_indices()
            .nth(12)
            .map_or(self.revision.len(), |(i, _)| i);
        &self.revision[..end]
    }
}
