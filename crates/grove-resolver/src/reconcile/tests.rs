//! Unit tests for constraint reconciliation

use super::*;
use proptest::prelude::*;

fn root() -> Requester {
    Requester::Root("example.com/app".to_string())
}

fn pkg(path: &str) -> Requester {
    Requester::Package(path.to_string())
}

fn decl(constraint: &str, requester: Requester) -> Declaration {
    Declaration::new("github.com/acme/y", constraint.parse().unwrap(), requester)
}

#[test]
fn test_any_is_identity() {
    let reconciled = reconcile(
        "github.com/acme/y",
        &[decl("any", root()), decl("rev:abc", pkg("github.com/acme/x")), decl("any", pkg("github.com/acme/z"))],
    )
    .unwrap();

    assert_eq!(reconciled.constraint, Constraint::Revision("abc".to_string()));
    assert!(reconciled.root_required);
}

#[test]
fn test_only_any_stays_any() {
    let reconciled = reconcile("github.com/acme/y", &[decl("any", pkg("github.com/acme/x"))]).unwrap();
    assert_eq!(reconciled.constraint, Constraint::Any);
    assert!(!reconciled.root_required);
}

#[test]
fn test_ranges_intersect() {
    let reconciled = reconcile(
        "github.com/acme/y",
        &[decl(">=1.0,<2.0", root()), decl("^1.4", pkg("github.com/acme/x"))],
    )
    .unwrap();

    assert_eq!(reconciled.constraint.to_string(), "version:>=1.4.0, <2.0.0");
}

#[test]
fn test_disjoint_ranges_conflict() {
    let error = reconcile(
        "github.com/acme/y",
        &[decl("<1.0", root()), decl(">=1.0", pkg("github.com/acme/x"))],
    )
    .unwrap_err();

    assert!(matches!(error, GroveError::ConstraintConflict { .. }));
}

#[test]
fn test_revision_conflict_names_both_requesters() {
    let error = reconcile(
        "github.com/acme/y",
        &[decl("rev:abc", root()), decl("rev:def", pkg("github.com/acme/x"))],
    )
    .unwrap_err();

    match error {
        GroveError::ConstraintConflict {
            import_path,
            requester,
            conflicting,
            ..
        } => {
            assert_eq!(import_path, "github.com/acme/y");
            assert!(requester.contains("example.com/app"));
            assert_eq!(conflicting, "github.com/acme/x");
        },
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn test_conflict_names_the_last_narrowing_requester() {
    let error = reconcile(
        "github.com/acme/y",
        &[
            decl(">=1.0,<2.0", root()),
            decl(">=1.5", pkg("github.com/acme/p")),
            decl(">=0.1", pkg("github.com/acme/pa")),
            decl("<1.2", pkg("github.com/acme/q")),
        ],
    )
    .unwrap_err();

    match error {
        GroveError::ConstraintConflict {
            requester,
            constraint,
            conflicting,
            ..
        } => {
            // ">=0.1" widens nothing, so p still holds the constraint
            assert_eq!(requester, "github.com/acme/p");
            assert_eq!(constraint, "version:>=1.5.0, <2.0.0");
            assert_eq!(conflicting, "github.com/acme/q");
        },
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn test_revision_against_range_conflicts() {
    let result = reconcile(
        "github.com/acme/y",
        &[decl("rev:abc", root()), decl(">=1.0", pkg("github.com/acme/x"))],
    );
    assert!(result.is_err());
}

#[test]
fn test_identical_branches_agree() {
    let reconciled = reconcile(
        "github.com/acme/y",
        &[decl("branch:main", root()), decl("branch:main", pkg("github.com/acme/x"))],
    )
    .unwrap();
    assert_eq!(reconciled.constraint, Constraint::Branch("main".to_string()));

    let result = reconcile(
        "github.com/acme/y",
        &[decl("branch:main", root()), decl("tag:main", pkg("github.com/acme/x"))],
    );
    assert!(result.is_err());
}

#[test]
fn test_repository_prefers_root_and_defaults_from_path() {
    let reconciled = reconcile(
        "github.com/acme/y/sub",
        &[decl("any", pkg("github.com/acme/x"))],
    )
    .unwrap();
    assert_eq!(reconciled.repository, "https://github.com/acme/y");

    let reconciled = reconcile(
        "github.com/acme/y",
        &[
            decl("any", pkg("github.com/acme/x")).with_repository("https://fork.example/y"),
            decl("any", root()).with_repository("https://github.com/acme/y"),
        ],
    )
    .unwrap();
    assert_eq!(reconciled.repository, "https://github.com/acme/y");
    assert_eq!(reconciled.repository_conflicts, vec!["https://fork.example/y".to_string()]);
}

#[test]
fn test_optional_root_is_not_required() {
    let reconciled = reconcile("github.com/acme/y", &[decl("any", root()).optional()]).unwrap();
    assert!(!reconciled.root_required);
}

fn pool() -> Vec<Declaration> {
    vec![
        decl("any", root()),
        decl(">=1.0,<3.0", root()),
        decl("^1.2", pkg("github.com/acme/a")),
        decl("~1.4", pkg("github.com/acme/b")),
        decl(">=2.0", pkg("github.com/acme/c")),
        decl("rev:abc", pkg("github.com/acme/d")),
        decl("branch:main", pkg("github.com/acme/e")),
        decl("any", pkg("github.com/acme/f")),
    ]
}

fn outcome(decls: &[Declaration]) -> Result<Reconciled, String> {
    reconcile("github.com/acme/y", decls).map_err(|e| e.to_string())
}

proptest! {
    #[test]
    fn reconciliation_is_order_independent(
        picks in prop::collection::vec(0usize..8, 1..5),
        seed in any::<u64>(),
    ) {
        let all = pool();
        let decls: Vec<Declaration> = picks.iter().map(|&i| all[i].clone()).collect();

        let mut permuted = decls.clone();
        let len = permuted.len();
        for i in (1..len).rev() {
            let j = ((seed.rotate_left(i as u32 * 7)) as usize) % (i + 1);
            permuted.swap(i, j);
        }

        prop_assert_eq!(outcome(&decls), outcome(&permuted));
    }

    #[test]
    fn merge_is_commutative(a in 0usize..8, b in 0usize..8) {
        let all = pool();
        prop_assert_eq!(
            merge(&all[a].constraint, &all[b].constraint),
            merge(&all[b].constraint, &all[a].constraint)
        );
    }
}
