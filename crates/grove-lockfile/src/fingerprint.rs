//! Manifest fingerprints.

use crate::snapshot::LockSnapshot;
use grove_core::utils::blake3_hash;
use grove_core::Manifest;

/// Hash the semantically relevant fields of a manifest.
///
/// Each declaration contributes one canonical line (import path, declared
/// repository, declared VCS kind, constraint, optional flag); lines are
/// sorted before hashing, so declaration order and source formatting do not
/// affect the result.
pub fn compute_fingerprint(manifest: &Manifest) -> String {
    let mut lines: Vec<String> = manifest
        .dependencies
        .iter()
        .map(|decl| {
            format!(
                "{}\t{}\t{}\t{}\t{}",
                decl.import_path.trim(),
                decl.repository.as_deref().map(str::trim).unwrap_or(""),
                decl.vcs.map(|k| k.to_string()).unwrap_or_default(),
                decl.constraint,
                decl.optional,
            )
        })
        .collect();
    lines.sort();
    lines.dedup();

    let mut canonical = format!("name\t{}\n", manifest.name.trim());
    for line in lines {
        canonical.push_str(&line);
        canonical.push('\n');
    }
    blake3_hash(canonical.as_bytes())
}

/// Check if `snapshot` was resolved from a manifest other than `manifest`
pub fn is_stale(snapshot: &LockSnapshot, manifest: &Manifest) -> bool {
    snapshot.hash != compute_fingerprint(manifest)
}


#[cfg(test)]
mod property_tests {
    use super::*;
    use grove_core::{Declaration, Requester};
    use proptest::prelude::*;

    fn decl(path: &str, constraint: &str) -> Declaration {
        Declaration::new(
            path,
            constraint.parse().unwrap(),
            Requester::Root("example.com/app".to_string()),
        )
    }

    proptest! {
        #[test]
        fn fingerprint_ignores_declaration_order(seed in any::<u64>()) {
            let decls = vec![
                decl("github.com/acme/a", "any"),
                decl("github.com/acme/b", "^1.2"),
                decl("github.com/acme/c", "branch:main"),
                decl("github.com/acme/d", "rev:0123abcd"),
            ];
            let mut shuffled = decls.clone();
            let len = shuffled.len();
            for i in 0..len {
                let j = ((seed >> (i * 8)) as usize) % len;
                shuffled.swap(i, j);
            }

            let mut a = Manifest::new("example.com/app");
            a.dependencies = decls;
            let mut b = Manifest::new("example.com/app");
            b.dependencies = shuffled;
            prop_assert_eq!(compute_fingerprint(&a), compute_fingerprint(&b));
        }

        #[test]
        fn fingerprint_ignores_constraint_spacing(
            pad_a in "[ ]{0,3}",
            pad_b in "[ ]{0,3}",
        ) {
            let tight = Manifest::new("example.com/app")
                .with_dependency(decl("github.com/acme/a", ">=1.0,<2.0"));
            let spaced_text = format!(">={}1.0{},{}<2.0", pad_a, pad_b, pad_a);
            let spaced = Manifest::new("example.com/app")
                .with_dependency(decl("github.com/acme/a", &spaced_text));
            prop_assert_eq!(compute_fingerprint(&tight), compute_fingerprint(&spaced));
        }
    }
}
