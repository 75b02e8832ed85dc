//! Constraint reconciliation
//!
//! Folds every declaration naming one import path into a single effective
//! constraint. `Any` is the identity; revisions, branches and tags only agree
//! with an identical value; ranges intersect. Declarations are put in a
//! canonical order before folding, so the outcome (including which pair is
//! reported on conflict) does not depend on the order they were discovered in.

use crate::ResolverResult;
use grove_core::utils::{default_repository, normalize_url};
use grove_core::{Constraint, Declaration, GroveError, Requester, VcsKind};

/// The effective requirements on one import path
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reconciled {
    pub constraint: Constraint,
    /// Repository URL to fetch from, before mirror rewriting
    pub repository: String,
    /// Declared VCS kind, if any declaration names one
    pub vcs: Option<VcsKind>,
    /// A non-optional root declaration names this path
    pub root_required: bool,
    /// Repository URLs other declarations asked for and lost
    pub repository_conflicts: Vec<String>,
}

/// Combine two constraints, or `None` if no single revision can satisfy both
pub fn merge(a: &Constraint, b: &Constraint) -> Option<Constraint> {
    match (a, b) {
        (Constraint::Any, other) | (other, Constraint::Any) => Some(other.clone()),
        (Constraint::Range(x), Constraint::Range(y)) => x.intersect(y).map(Constraint::Range),
        (x, y) if x == y => Some(x.clone()),
        _ => None,
    }
}

/// Whether `after` admits fewer revisions than `before`
fn narrows(before: &Constraint, after: &Constraint) -> bool {
    match (before, after) {
        (Constraint::Range(a), Constraint::Range(b)) => a.intersect(a) != b.intersect(b),
        _ => before != after,
    }
}

fn canonical_order(declarations: &[Declaration]) -> Vec<&Declaration> {
    let mut sorted: Vec<&Declaration> = declarations.iter().collect();
    sorted.sort_by_cached_key(|d| {
        (
            d.requester.clone(),
            d.constraint.to_string(),
            d.repository.clone(),
            d.vcs,
            d.optional,
        )
    });
    sorted
}

/// Reconcile all declarations for `import_path`.
///
/// Fails with `ConstraintConflict` naming both requesters when two
/// declarations cannot be satisfied by one revision.
pub fn reconcile(import_path: &str, declarations: &[Declaration]) -> ResolverResult<Reconciled> {
    let sorted = canonical_order(declarations);

    let mut constraint = Constraint::Any;
    let mut holder: Option<&Requester> = None;
    for decl in &sorted {
        match merge(&constraint, &decl.constraint) {
            Some(merged) => {
                // The holder is whoever last narrowed the effective constraint
                if narrows(&constraint, &merged) {
                    holder = Some(&decl.requester);
                }
                constraint = merged;
            },
            None => {
                return Err(GroveError::ConstraintConflict {
                    import_path: import_path.to_string(),
                    requester: holder.map_or_else(|| "unknown".to_string(), |r| r.to_string()),
                    constraint: constraint.to_string(),
                    conflicting: decl.requester.to_string(),
                    conflict: decl.constraint.to_string(),
                });
            },
        }
    }

    let repository = sorted
        .iter()
        .find_map(|d| d.repository.as_deref())
        .map(normalize_url)
        .unwrap_or_else(|| normalize_url(&default_repository(import_path)));

    let mut repository_conflicts: Vec<String> = sorted
        .iter()
        .filter_map(|d| d.repository.as_deref().map(normalize_url))
        .filter(|url| url != &repository)
        .collect();
    repository_conflicts.sort();
    repository_conflicts.dedup();

    Ok(Reconciled {
        constraint,
        repository,
        vcs: sorted.iter().find_map(|d| d.vcs),
        root_required: sorted.iter().any(|d| d.is_root_required()),
        repository_conflicts,
    })
}

#[cfg(test)]
mod tests;
