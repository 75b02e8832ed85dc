//! Revision selection
//!
//! Turns an effective constraint plus a repository's listed refs into one
//! concrete revision. Ranges pick the highest matching tag, preferring stable
//! tags over pre-releases; tags that parse to the same version keep the
//! backend's listing order (first listed wins).

use grove_core::{Constraint, Version, VersionReq};
use grove_vcs::{RefEntry, RefKind};

/// A concrete revision chosen for a constraint
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Selection {
    pub revision: String,
    /// Tag the revision was chosen through
    pub tag: Option<String>,
}

/// Tags of a repository that parse as versions, in listing order
#[derive(Debug, Clone)]
pub struct TagSelector<'a> {
    tags: Vec<(Version, &'a RefEntry)>,
}

impl<'a> TagSelector<'a> {
    /// Collect the version-like tags from `refs`
    pub fn new(refs: &'a [RefEntry]) -> Self {
        let tags = refs
            .iter()
            .filter(|r| r.kind == RefKind::Tag)
            .filter_map(|r| Version::parse_tag(&r.name).map(|v| (v, r)))
            .collect();
        Self { tags }
    }

    /// Highest tag matching `req`, if any
    pub fn select_best(&self, req: &VersionReq, stable_only: bool) -> Option<&'a RefEntry> {
        let mut best: Option<(&Version, &'a RefEntry)> = None;
        for (version, entry) in &self.tags {
            if stable_only && version.is_prerelease() {
                continue;
            }
            if !req.matches(version) {
                continue;
            }
            if best.map_or(true, |(current, _)| version > current) {
                best = Some((version, *entry));
            }
        }
        best.map(|(_, entry)| entry)
    }

    /// Stable tags first; pre-releases only when no stable tag matches
    pub fn select_preferred(&self, req: &VersionReq) -> Option<&'a RefEntry> {
        self.select_best(req, true)
            .or_else(|| self.select_best(req, false))
    }

    /// Every matching version, listing order
    pub fn find_matching(&self, req: &VersionReq) -> Vec<&Version> {
        self.tags
            .iter()
            .filter(|(v, _)| req.matches(v))
            .map(|(v, _)| v)
            .collect()
    }
}

/// Choose the revision `constraint` resolves to among `refs`
pub fn select_revision(constraint: &Constraint, refs: &[RefEntry]) -> Option<Selection> {
    let find = |kind: RefKind, name: &str| {
        refs.iter()
            .find(|r| r.kind == kind && r.name == name)
            .map(|r| r.revision.clone())
    };

    match constraint {
        Constraint::Revision(id) => Some(Selection {
            revision: id.clone(),
            tag: None,
        }),
        Constraint::Branch(name) => find(RefKind::Branch, name).map(|revision| Selection {
            revision,
            tag: None,
        }),
        Constraint::Tag(name) => find(RefKind::Tag, name).map(|revision| Selection {
            revision,
            tag: Some(name.clone()),
        }),
        Constraint::Range(req) => TagSelector::new(refs).select_preferred(req).map(|entry| Selection {
            revision: entry.revision.clone(),
            tag: Some(entry.name.clone()),
        }),
        Constraint::Any => refs
            .iter()
            .find(|r| r.kind == RefKind::Default)
            .map(|r| Selection {
                revision: r.revision.clone(),
                tag: None,
            }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tags(names: &[&str]) -> Vec<RefEntry> {
        names
            .iter()
            .enumerate()
            .map(|(i, n)| RefEntry::new(*n, format!("rev-{}", i), RefKind::Tag))
            .collect()
    }

    #[test]
    fn test_highest_matching_tag() {
        let refs = tags(&["0.9", "1.3", "1.9", "2.0"]);
        let selection = select_revision(&">=1.0,<2.0".parse().unwrap(), &refs).unwrap();

        assert_eq!(selection.tag.as_deref(), Some("1.9"));
        assert_eq!(selection.revision, "rev-2");
    }

    #[test]
    fn test_prefers_stable_over_prerelease() {
        let refs = tags(&["v1.2.0", "v1.3.0-rc1"]);
        let selection = select_revision(&"^1.0".parse().unwrap(), &refs).unwrap();
        assert_eq!(selection.tag.as_deref(), Some("v1.2.0"));

        let only_pre = tags(&["v1.3.0-rc1"]);
        let selection = select_revision(&"^1.0".parse().unwrap(), &only_pre).unwrap();
        assert_eq!(selection.tag.as_deref(), Some("v1.3.0-rc1"));
    }

    #[test]
    fn test_equal_versions_keep_first_listed() {
        let refs = tags(&["v1.2", "1.2.0"]);
        let selection = select_revision(&"^1".parse().unwrap(), &refs).unwrap();
        assert_eq!(selection.tag.as_deref(), Some("v1.2"));
    }

    #[test]
    fn test_non_version_tags_are_ignored() {
        let refs = tags(&["nightly", "release-2"]);
        assert!(select_revision(&"*".parse::<Constraint>().unwrap(), &refs).is_none());
        assert!(select_revision(&"version:*".parse().unwrap(), &refs).is_none());
    }

    #[test]
    fn test_branch_tag_and_default() {
        let refs = vec![
            RefEntry::new("HEAD", "tip", RefKind::Default),
            RefEntry::new("main", "tip", RefKind::Branch),
            RefEntry::new("dev", "dev-tip", RefKind::Branch),
            RefEntry::new("v1", "v1-rev", RefKind::Tag),
        ];

        assert_eq!(select_revision(&Constraint::Any, &refs).unwrap().revision, "tip");
        assert_eq!(
            select_revision(&Constraint::Branch("dev".to_string()), &refs).unwrap().revision,
            "dev-tip"
        );
        assert_eq!(
            select_revision(&Constraint::Tag("v1".to_string()), &refs).unwrap().tag.as_deref(),
            Some("v1")
        );
        assert!(select_revision(&Constraint::Branch("v1".to_string()), &refs).is_none());
    }

    #[test]
    fn test_exact_revision_is_used_directly() {
        let selection = select_revision(&Constraint::Revision("abc".to_string()), &[]).unwrap();
        assert_eq!(selection.revision, "abc");
    }

    #[test]
    fn test_find_matching() {
        let refs = tags(&["0.9", "1.3", "1.9", "2.0"]);
        let selector = TagSelector::new(&refs);
        let req = VersionReq::parse(">=1.0,<2.0").unwrap();
        assert_eq!(selector.find_matching(&req).len(), 2);
    }
}
