//! Dependency declaration types.
//!
//! A declaration is one requester's statement about one import path. Several
//! declarations may name the same path; they stay distinct until reconciled.

use super::{Constraint, VcsKind};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Who made a declaration
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Requester {
    /// The root manifest, identified by the project's own import path
    Root(String),
    /// A dependency that was fetched and inspected, by import path
    Package(String),
}

/// Dependency declaration
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Declaration {
    pub import_path: String,
    /// Declared repository URL; derived from the import path when absent
    pub repository: Option<String>,
    /// Declared VCS kind; inferred from the repository URL when absent
    pub vcs: Option<VcsKind>,
    pub constraint: Constraint,
    pub requester: Requester,
    pub optional: bool,
}

impl Requester {
    /// Check if this is the root manifest
    pub fn is_root(&self) -> bool {
        matches!(self, Requester::Root(_))
    }

    /// Identifier used in messages and log fields
    pub fn name(&self) -> &str {
        match self {
            Requester::Root(name) | Requester::Package(name) => name,
        }
    }
}

impl fmt::Display for Requester {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Requester::Root(name) => write!(f, "root manifest ({})", name),
            Requester::Package(name) => write!(f, "{}", name),
        }
    }
}

impl Declaration {
    /// Create a new declaration
    pub fn new(import_path: impl Into<String>, constraint: Constraint, requester: Requester) -> Self {
        Self {
            import_path: import_path.into(),
            repository: None,
            vcs: None,
            constraint,
            requester,
            optional: false,
        }
    }

    /// Set the declared repository URL
    pub fn with_repository(mut self, repository: impl Into<String>) -> Self {
        self.repository = Some(repository.into());
        self
    }

    /// Set the declared VCS kind
    pub fn with_vcs(mut self, vcs: VcsKind) -> Self {
        self.vcs = Some(vcs);
        self
    }

    /// Make this declaration optional
    pub fn optional(mut self) -> Self {
        self.optional = true;
        self
    }

    /// Check if this declaration makes its path required by the root
    pub fn is_root_required(&self) -> bool {
        self.requester.is_root() && !self.optional
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder() {
        let decl = Declaration::new(
            "github.com/acme/x",
            Constraint::Any,
            Requester::Root("example.com/app".to_string()),
        )
        .with_repository("https://github.com/acme/x")
        .with_vcs(VcsKind::Git);

        assert_eq!(decl.repository.as_deref(), Some("https://github.com/acme/x"));
        assert!(decl.is_root_required());
        assert!(!decl.clone().optional().is_root_required());
    }

    #[test]
    fn test_transitive_is_not_root_required() {
        let decl = Declaration::new(
            "github.com/acme/y",
            Constraint::Any,
            Requester::Package("github.com/acme/x".to_string()),
        );
        assert!(!decl.is_root_required());
        assert_eq!(decl.requester.name(), "github.com/acme/x");
    }
}
