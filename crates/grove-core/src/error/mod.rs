//! Error types and result aliases for grove operations.
//!
//! Provides a unified error type that covers every failure the resolution
//! engine can surface, with actionable suggestions for the CLI.

use thiserror::Error;

/// Unified error type for all grove operations
#[derive(Error, Debug)]
pub enum GroveError {
    // Remote errors
    #[error("Network unavailable while contacting {url}: {message}")]
    NetworkUnavailable { url: String, message: String },

    #[error("Authentication rejected by {url}: {message}")]
    AuthenticationRejected { url: String, message: String },

    #[error("Revision '{revision}' not found in {url}")]
    RevisionNotFound { url: String, revision: String },

    // Resolution errors
    #[error(
        "Constraint conflict on {import_path}: {requester} requires {constraint}, but {conflicting} requires {conflict}"
    )]
    ConstraintConflict {
        import_path: String,
        requester: String,
        constraint: String,
        conflicting: String,
        conflict: String,
    },

    #[error("Resolution of {import_path} was cancelled")]
    Cancelled { import_path: String },

    // Cache errors
    #[error("Cached working copy at {path} is unusable: {message}")]
    CacheCorruption { path: String, message: String },

    // Config errors
    #[error("Invalid manifest {path}: {message}")]
    ManifestInvalid { path: String, message: String },

    #[error("Configuration field '{field}' is invalid: {reason}")]
    ConfigValidation { field: String, reason: String },

    #[error("Invalid lock file {path}: {message}")]
    LockInvalid { path: String, message: String },

    // Backend errors
    #[error("{command} failed: {message}")]
    VcsCommand { command: String, message: String },

    // IO errors
    #[error("IO error: {message}")]
    Io {
        message: String,
        #[source]
        source: std::io::Error,
    },
}

/// Result type alias for grove operations
pub type GroveResult<T> = Result<T, GroveError>;

impl GroveError {
    /// Create an IO error from std::io::Error
    pub fn io(message: impl Into<String>, source: std::io::Error) -> Self {
        Self::Io {
            message: message.into(),
            source,
        }
    }

    /// Create a cancellation error for an import path
    pub fn cancelled(import_path: impl Into<String>) -> Self {
        Self::Cancelled {
            import_path: import_path.into(),
        }
    }

    /// Check if this error is worth retrying with backoff
    pub fn is_transient(&self) -> bool {
        matches!(self, GroveError::NetworkUnavailable { .. })
    }

    /// Check if this error means the cached working copy must be re-cloned
    pub fn is_corruption(&self) -> bool {
        matches!(self, GroveError::CacheCorruption { .. })
    }

    /// Get a user-friendly suggestion for fixing this error
    pub fn suggestion(&self) -> Option<&'static str> {
        match self {
            GroveError::NetworkUnavailable { .. } => {
                Some("Check your internet connection or configure a mirror with 'grove mirror set'")
            },
            GroveError::AuthenticationRejected { .. } => {
                Some("Check your VCS credentials for this host")
            },
            GroveError::RevisionNotFound { .. } => {
                Some("Check the pinned revision, branch or tag, or run 'grove update'")
            },
            GroveError::ConstraintConflict { .. } => {
                Some("Relax one of the conflicting constraints in grove.toml")
            },
            GroveError::CacheCorruption { .. } => Some("Run 'grove cache clean' and try again"),
            GroveError::LockInvalid { .. } => Some("Delete grove.lock and run 'grove install'"),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_conflict_display_names_both_requesters() {
        let error = GroveError::ConstraintConflict {
            import_path: "github.com/acme/y".to_string(),
            requester: "root".to_string(),
            constraint: "rev:abc".to_string(),
            conflicting: "github.com/acme/x".to_string(),
            conflict: "rev:def".to_string(),
        };

        let message = error.to_string();
        assert!(message.contains("github.com/acme/y"));
        assert!(message.contains("root"));
        assert!(message.contains("github.com/acme/x"));
        assert!(message.contains("rev:def"));
    }

    #[test]
    fn test_transient_kinds() {
        let network = GroveError::NetworkUnavailable {
            url: "https://example.com/r".to_string(),
            message: "timed out".to_string(),
        };
        let missing = GroveError::RevisionNotFound {
            url: "https://example.com/r".to_string(),
            revision: "v9".to_string(),
        };

        assert!(network.is_transient());
        assert!(!missing.is_transient());
        assert!(network.suggestion().is_some());
    }
}
