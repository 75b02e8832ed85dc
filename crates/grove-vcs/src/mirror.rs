//! Mirror table: rewrites repository URLs before any network operation.
//!
//! Entries are matched by longest prefix on a path-segment boundary, and a
//! rewritten URL is fed back through the table until nothing matches. Tables
//! whose entries could rewrite into each other forever are rejected when the
//! table is built, so `resolve` always terminates and is idempotent.

use crate::VcsResult;
use grove_core::utils::normalize_url;
use grove_core::{GroveError, VcsKind};
use petgraph::algo::toposort;
use petgraph::graph::DiGraph;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// One redirect from a URL prefix to a replacement prefix
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MirrorEntry {
    pub pattern: String,
    pub replacement: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vcs: Option<VcsKind>,
}

/// Outcome of resolving a URL through the table
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MirrorResolution {
    pub url: String,
    /// VCS kind of the last matching entry that names one
    pub vcs: Option<VcsKind>,
    pub matched: bool,
}

/// Immutable, validated set of mirror entries
#[derive(Debug, Clone, Default)]
pub struct MirrorTable {
    /// Sorted by descending pattern length, then pattern
    entries: Vec<MirrorEntry>,
}

impl MirrorEntry {
    /// Create a new entry
    pub fn new(pattern: impl Into<String>, replacement: impl Into<String>, vcs: Option<VcsKind>) -> Self {
        Self {
            pattern: pattern.into(),
            replacement: replacement.into(),
            vcs,
        }
    }

    fn normalized(&self) -> Self {
        Self {
            pattern: normalize_url(&self.pattern),
            replacement: normalize_url(&self.replacement),
            vcs: self.vcs,
        }
    }
}

/// Well-known ecosystem redirects that are always present unless overridden
pub fn builtin_entries() -> Vec<MirrorEntry> {
    vec![
        MirrorEntry::new("https://golang.org/x", "https://github.com/golang", Some(VcsKind::Git)),
        MirrorEntry::new(
            "https://google.golang.org/grpc",
            "https://github.com/grpc/grpc-go",
            Some(VcsKind::Git),
        ),
        MirrorEntry::new(
            "https://google.golang.org/genproto",
            "https://github.com/google/go-genproto",
            Some(VcsKind::Git),
        ),
        MirrorEntry::new(
            "https://google.golang.org/api",
            "https://github.com/googleapis/google-api-go-client",
            Some(VcsKind::Git),
        ),
    ]
}

/// Check that `prefix` is `s` or a prefix of it ending on a `/` boundary
fn is_segment_prefix(prefix: &str, s: &str) -> bool {
    match s.strip_prefix(prefix) {
        Some(rest) => rest.is_empty() || rest.starts_with('/') || prefix.ends_with('/'),
        None => false,
    }
}

impl MirrorTable {
    /// Table with no entries; every URL passes through
    pub fn empty() -> Self {
        Self::default()
    }

    /// Build a table from entries, rejecting duplicates and rewrite cycles
    pub fn new(entries: Vec<MirrorEntry>) -> VcsResult<Self> {
        let mut normalized: Vec<MirrorEntry> = Vec::with_capacity(entries.len());
        for entry in entries.iter().map(MirrorEntry::normalized) {
            if entry.pattern.is_empty() || entry.replacement.is_empty() {
                return Err(GroveError::ConfigValidation {
                    field: "mirror".to_string(),
                    reason: format!("empty pattern or replacement in '{}'", entry.pattern),
                });
            }
            if normalized.iter().any(|e| e.pattern == entry.pattern) {
                return Err(GroveError::ConfigValidation {
                    field: "mirror".to_string(),
                    reason: format!("duplicate mirror for '{}'", entry.pattern),
                });
            }
            normalized.push(entry);
        }

        normalized.sort_by(|a, b| {
            b.pattern
                .len()
                .cmp(&a.pattern.len())
                .then_with(|| a.pattern.cmp(&b.pattern))
        });
        let table = Self { entries: normalized };
        table.check_acyclic()?;
        Ok(table)
    }

    /// Built-in redirects only
    pub fn builtin() -> VcsResult<Self> {
        Self::new(builtin_entries())
    }

    /// Built-in redirects with `loaded` entries merged over them.
    ///
    /// A loaded entry replaces a built-in with the same pattern.
    pub fn with_builtins(loaded: Vec<MirrorEntry>) -> VcsResult<Self> {
        let loaded: Vec<MirrorEntry> = loaded.iter().map(MirrorEntry::normalized).collect();
        let mut merged: Vec<MirrorEntry> = builtin_entries()
            .into_iter()
            .map(|e| e.normalized())
            .filter(|builtin| !loaded.iter().any(|e| e.pattern == builtin.pattern))
            .collect();
        merged.extend(loaded);
        Self::new(merged)
    }

    /// Registered entries, longest pattern first
    pub fn entries(&self) -> &[MirrorEntry] {
        &self.entries
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Rewrite `url` through the table.
    ///
    /// Unmatched URLs come back exactly as given with `matched = false`.
    pub fn resolve(&self, url: &str) -> MirrorResolution {
        let mut current = normalize_url(url);
        let mut vcs = None;
        let mut matched = false;

        // Validation guarantees each entry applies at most once per chain
        for _ in 0..=self.entries.len() {
            let Some(entry) = self.longest_match(&current) else {
                break;
            };
            let rest = &current[entry.pattern.len()..];
            let rewritten = format!("{}{}", entry.replacement, rest);
            debug!(original = %current, replacement = %rewritten, "mirror rewrite");
            current = rewritten;
            vcs = entry.vcs.or(vcs);
            matched = true;
        }

        if !matched {
            return MirrorResolution {
                url: url.to_string(),
                vcs: None,
                matched: false,
            };
        }
        MirrorResolution {
            url: current,
            vcs,
            matched,
        }
    }

    fn longest_match(&self, url: &str) -> Option<&MirrorEntry> {
        self.entries
            .iter()
            .find(|entry| is_segment_prefix(&entry.pattern, url))
    }

    /// Reject tables where a rewrite can lead back into an entry already applied.
    ///
    /// Entry `a` can be followed by entry `b` when `b`'s pattern could match
    /// some URL starting with `a`'s replacement.
    fn check_acyclic(&self) -> VcsResult<()> {
        let mut graph = DiGraph::<usize, ()>::new();
        let nodes: Vec<_> = (0..self.entries.len()).map(|i| graph.add_node(i)).collect();

        for (i, from) in self.entries.iter().enumerate() {
            for (j, to) in self.entries.iter().enumerate() {
                if is_segment_prefix(&to.pattern, &from.replacement)
                    || is_segment_prefix(&from.replacement, &to.pattern)
                {
                    graph.add_edge(nodes[i], nodes[j], ());
                }
            }
        }

        toposort(&graph, None).map(|_| ()).map_err(|cycle| {
            let entry = &self.entries[graph[cycle.node_id()]];
            GroveError::ConfigValidation {
                field: "mirror".to_string(),
                reason: format!(
                    "mirror for '{}' rewrites into a loop (via '{}')",
                    entry.pattern, entry.replacement
                ),
            }
        })
    }
}


#[cfg(test)]
mod property_tests {
    use super::*;
    use proptest::prelude::*;

    fn table() -> MirrorTable {
        MirrorTable::with_builtins(vec![
            MirrorEntry::new("https://github.com/golang", "https://git.corp.example/golang", None),
            MirrorEntry::new("https://example.com/a", "https://mirror.example/a", None),
            MirrorEntry::new("https://example.com/a/b", "https://other.example", Some(VcsKind::Mercurial)),
        ])
        .unwrap()
    }

    fn arb_url() -> impl Strategy<Value = String> {
        let host = prop_oneof![
            Just("golang.org"),
            Just("github.com"),
            Just("example.com"),
            Just("google.golang.org"),
            Just("mirror.example"),
        ];
        let segment = prop_oneof![
            Just("x"),
            Just("a"),
            Just("b"),
            Just("golang"),
            Just("grpc"),
            Just("tools"),
        ];
        (host, prop::collection::vec(segment, 0..4)).prop_map(|(host, segments)| {
            let mut url = format!("https://{}", host);
            for s in segments {
                url.push('/');
                url.push_str(s);
            }
            url
        })
    }

    proptest! {
        #[test]
        fn resolve_is_idempotent(url in arb_url()) {
            let table = table();
            let once = table.resolve(&url);
            let twice = table.resolve(&once.url);
            prop_assert_eq!(&twice.url, &once.url);
        }
    }
}
