//! Semantic version types.
//!
//! Provides Version and VersionReq types for semantic-version range
//! constraints. Requirements are evaluated as a single half-open interval so
//! that two ranges can be intersected exactly.

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Semantic version (major.minor.patch-prerelease+build)
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Version {
    pub major: u64,
    pub minor: u64,
    pub patch: u64,
    pub prerelease: Option<String>,
    pub build: Option<String>,
}

/// Version requirement (^1.0.0, ~2.3.0, >=1.0, <2.0)
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct VersionReq {
    pub comparators: Vec<Comparator>,
}

/// Individual version comparator
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Comparator {
    pub op: Op,
    pub version: PartialVersion,
}

/// Comparison operator for version requirements
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Op {
    Exact,     // =1.0.0
    Greater,   // >1.0.0
    GreaterEq, // >=1.0.0
    Less,      // <1.0.0
    LessEq,    // <=1.0.0
    Tilde,     // ~1.0.0
    Caret,     // ^1.0.0
    Wildcard,  // *
}

/// Partial version for comparisons (may have missing components)
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PartialVersion {
    pub major: u64,
    pub minor: Option<u64>,
    pub patch: Option<u64>,
    pub prerelease: Option<String>,
}

/// Version parsing and validation errors
#[derive(Error, Debug)]
pub enum VersionError {
    #[error("Invalid version format: {input}")]
    InvalidFormat { input: String },

    #[error("Invalid number in version: {component}")]
    InvalidNumber { component: String },
}

/// One end of a version interval
#[derive(Debug, Clone, PartialEq, Eq)]
struct Bound {
    version: Version,
    inclusive: bool,
}

/// The set of versions a requirement admits. `None` means unbounded.
#[derive(Debug, Clone, PartialEq, Eq)]
struct Interval {
    lower: Option<Bound>,
    upper: Option<Bound>,
}

impl Version {
    /// Create a new version
    pub fn new(major: u64, minor: u64, patch: u64) -> Self {
        Self {
            major,
            minor,
            patch,
            prerelease: None,
            build: None,
        }
    }

    /// Parse a repository tag as a version.
    ///
    /// Tags are looser than versions: a leading `v` is allowed and missing
    /// minor/patch components are zero (`v1.9` is `1.9.0`).
    pub fn parse_tag(tag: &str) -> Option<Version> {
        let partial = PartialVersion::parse(tag).ok()?;
        let mut version = partial.to_version();
        if let Some((_, build)) = tag.trim().split_once('+') {
            version.build = Some(build.to_string());
        }
        Some(version)
    }

    /// Check if this version satisfies a version requirement
    pub fn satisfies(&self, req: &VersionReq) -> bool {
        req.matches(self)
    }

    /// Check if this is a prerelease version
    pub fn is_prerelease(&self) -> bool {
        self.prerelease.is_some()
    }

    fn bump_major(&self) -> Version {
        Version::new(self.major + 1, 0, 0)
    }

    fn bump_minor(&self) -> Version {
        Version::new(self.major, self.minor + 1, 0)
    }

    /// Get the precedence for comparison (ignores build metadata)
    fn precedence_cmp(&self, other: &Self) -> Ordering {
        match (self.major, self.minor, self.patch).cmp(&(other.major, other.minor, other.patch)) {
            Ordering::Equal => {
                match (&self.prerelease, &other.prerelease) {
                    (None, None) => Ordering::Equal,
                    (Some(_), None) => Ordering::Less, // prerelease < normal
                    (None, Some(_)) => Ordering::Greater, // normal > prerelease
                    (Some(a), Some(b)) => a.cmp(b),    // lexical comparison
                }
            },
            other => other,
        }
    }
}

impl FromStr for Version {
    type Err = VersionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let input = s.trim();

        let (version_part, build) = match input.split_once('+') {
            Some((v, b)) => (v, Some(b.to_string())),
            None => (input, None),
        };

        let (core_part, prerelease) = match version_part.split_once('-') {
            Some((c, p)) => (c, Some(p.to_string())),
            None => (version_part, None),
        };

        let parts: Vec<&str> = core_part.split('.').collect();
        if parts.len() != 3 {
            return Err(VersionError::InvalidFormat {
                input: input.to_string(),
            });
        }

        Ok(Version {
            major: parse_component(parts[0])?,
            minor: parse_component(parts[1])?,
            patch: parse_component(parts[2])?,
            prerelease,
            build,
        })
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.major, self.minor, self.patch)?;

        if let Some(ref pre) = self.prerelease {
            write!(f, "-{}", pre)?;
        }

        if let Some(ref build) = self.build {
            write!(f, "+{}", build)?;
        }

        Ok(())
    }
}

impl PartialOrd for Version {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Version {
    fn cmp(&self, other: &Self) -> Ordering {
        self.precedence_cmp(other)
    }
}

fn parse_component(component: &str) -> Result<u64, VersionError> {
    component.parse().map_err(|_| VersionError::InvalidNumber {
        component: component.to_string(),
    })
}

impl VersionReq {
    /// Requirement that admits every version
    pub fn any() -> Self {
        VersionReq {
            comparators: vec![Comparator {
                op: Op::Wildcard,
                version: PartialVersion {
                    major: 0,
                    minor: None,
                    patch: None,
                    prerelease: None,
                },
            }],
        }
    }

    /// Parse a version requirement string.
    ///
    /// Comparators are separated by commas or whitespace, and an operator may
    /// be detached from its version (`>= 1.0, < 2.0`).
    pub fn parse(input: &str) -> Result<Self, VersionError> {
        let input = input.trim();
        if input.is_empty() || input == "*" {
            return Ok(Self::any());
        }

        let mut tokens: Vec<String> = Vec::new();
        let mut pending_op: Option<&str> = None;
        for token in input.split(|c: char| c == ',' || c.is_whitespace()) {
            if token.is_empty() {
                continue;
            }
            if token.chars().all(|c| matches!(c, '<' | '>' | '=' | '^' | '~')) {
                pending_op = Some(token);
                continue;
            }
            match pending_op.take() {
                Some(op) => tokens.push(format!("{}{}", op, token)),
                None => tokens.push(token.to_string()),
            }
        }
        if pending_op.is_some() || tokens.is_empty() {
            return Err(VersionError::InvalidFormat {
                input: input.to_string(),
            });
        }

        let comparators = tokens
            .iter()
            .map(|token| Comparator::parse(token))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(VersionReq { comparators })
    }

    /// Check if a version matches this requirement
    pub fn matches(&self, version: &Version) -> bool {
        self.comparators.iter().all(|comp| comp.matches(version))
    }

    /// Check if any version at all can satisfy this requirement
    pub fn is_satisfiable(&self) -> bool {
        self.interval().is_some()
    }

    /// Intersect two requirements.
    ///
    /// Returns `None` when no version satisfies both. The result is written in
    /// canonical `>=`/`<` form, so the intersection of the same ranges is equal
    /// whatever order they were combined in.
    pub fn intersect(&self, other: &VersionReq) -> Option<VersionReq> {
        let left = self.interval()?;
        let right = other.interval()?;
        left.intersect(&right).map(Interval::into_req)
    }

    fn interval(&self) -> Option<Interval> {
        self.comparators
            .iter()
            .try_fold(Interval::unbounded(), |acc, comp| acc.intersect(&comp.interval()))
    }
}

impl fmt::Display for VersionReq {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = self.comparators.iter().map(|c| c.to_string()).collect();
        write!(f, "{}", parts.join(", "))
    }
}

impl FromStr for VersionReq {
    type Err = VersionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        VersionReq::parse(s)
    }
}

impl Comparator {
    fn parse(token: &str) -> Result<Self, VersionError> {
        if matches!(token, "*" | "x" | "X") {
            return Ok(VersionReq::any().comparators.remove(0));
        }

        let (op, version_str) = if let Some(stripped) = token.strip_prefix('^') {
            (Op::Caret, stripped)
        } else if let Some(stripped) = token.strip_prefix('~') {
            (Op::Tilde, stripped)
        } else if let Some(stripped) = token.strip_prefix(">=") {
            (Op::GreaterEq, stripped)
        } else if let Some(stripped) = token.strip_prefix("<=") {
            (Op::LessEq, stripped)
        } else if let Some(stripped) = token.strip_prefix('>') {
            (Op::Greater, stripped)
        } else if let Some(stripped) = token.strip_prefix('<') {
            (Op::Less, stripped)
        } else if let Some(stripped) = token.strip_prefix('=') {
            (Op::Exact, stripped)
        } else {
            (Op::Exact, token)
        };

        Ok(Comparator {
            op,
            version: PartialVersion::parse(version_str)?,
        })
    }

    /// Check if a version matches this comparator
    pub fn matches(&self, version: &Version) -> bool {
        self.interval().contains(version)
    }

    fn interval(&self) -> Interval {
        let base = self.version.to_version();
        // Exclusive end of the range the partial version names (1.2 -> 1.3.0)
        let next = match (self.version.minor, self.version.patch) {
            (None, _) => Some(base.bump_major()),
            (Some(_), None) => Some(base.bump_minor()),
            (Some(_), Some(_)) => None,
        };

        match self.op {
            Op::Wildcard => Interval::unbounded(),
            Op::Exact => match next {
                Some(end) => Interval::between(base, end),
                None => Interval {
                    lower: Some(Bound::inclusive(base.clone())),
                    upper: Some(Bound::inclusive(base)),
                },
            },
            Op::Greater => match next {
                Some(end) => Interval::at_least(end),
                None => Interval {
                    lower: Some(Bound::exclusive(base)),
                    upper: None,
                },
            },
            Op::GreaterEq => Interval::at_least(base),
            Op::Less => Interval {
                lower: None,
                upper: Some(Bound::exclusive(base)),
            },
            Op::LessEq => match next {
                Some(end) => Interval {
                    lower: None,
                    upper: Some(Bound::exclusive(end)),
                },
                None => Interval {
                    lower: None,
                    upper: Some(Bound::inclusive(base)),
                },
            },
            Op::Tilde => {
                let end = match self.version.minor {
                    Some(_) => base.bump_minor(),
                    None => base.bump_major(),
                };
                Interval::between(base, end)
            },
            Op::Caret => {
                let end = base.bump_major();
                Interval::between(base, end)
            },
        }
    }
}

impl fmt::Display for Comparator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let prefix = match self.op {
            Op::Wildcard => return write!(f, "*"),
            Op::Exact => "=",
            Op::Greater => ">",
            Op::GreaterEq => ">=",
            Op::Less => "<",
            Op::LessEq => "<=",
            Op::Tilde => "~",
            Op::Caret => "^",
        };
        write!(f, "{}{}", prefix, self.version)
    }
}

impl PartialVersion {
    /// Parse `1`, `1.2`, `1.2.3` or `1.2.3-pre`, with an optional `v` prefix
    pub fn parse(input: &str) -> Result<Self, VersionError> {
        let trimmed = input.trim();
        let stripped = trimmed
            .strip_prefix('v')
            .or_else(|| trimmed.strip_prefix('V'))
            .unwrap_or(trimmed);
        let without_build = stripped.split_once('+').map_or(stripped, |(v, _)| v);
        let (core, prerelease) = match without_build.split_once('-') {
            Some((c, p)) => (c, Some(p.to_string())),
            None => (without_build, None),
        };

        let parts: Vec<&str> = core.split('.').collect();
        if parts.is_empty() || parts.len() > 3 || parts.iter().any(|p| p.is_empty()) {
            return Err(VersionError::InvalidFormat {
                input: input.to_string(),
            });
        }

        Ok(PartialVersion {
            major: parse_component(parts[0])?,
            minor: parts.get(1).map(|p| parse_component(p)).transpose()?,
            patch: parts.get(2).map(|p| parse_component(p)).transpose()?,
            prerelease,
        })
    }

    /// Convert to a full version (filling missing parts with 0)
    pub fn to_version(&self) -> Version {
        Version {
            major: self.major,
            minor: self.minor.unwrap_or(0),
            patch: self.patch.unwrap_or(0),
            prerelease: self.prerelease.clone(),
            build: None,
        }
    }
}

impl fmt::Display for PartialVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.major)?;
        if let Some(minor) = self.minor {
            write!(f, ".{}", minor)?;
        }
        if let Some(patch) = self.patch {
            write!(f, ".{}", patch)?;
        }
        if let Some(ref pre) = self.prerelease {
            write!(f, "-{}", pre)?;
        }
        Ok(())
    }
}

impl Bound {
    fn inclusive(version: Version) -> Self {
        Self {
            version,
            inclusive: true,
        }
    }

    fn exclusive(version: Version) -> Self {
        Self {
            version,
            inclusive: false,
        }
    }
}

impl Interval {
    fn unbounded() -> Self {
        Self {
            lower: None,
            upper: None,
        }
    }

    fn at_least(version: Version) -> Self {
        Self {
            lower: Some(Bound::inclusive(version)),
            upper: None,
        }
    }

    fn between(start: Version, end: Version) -> Self {
        Self {
            lower: Some(Bound::inclusive(start)),
            upper: Some(Bound::exclusive(end)),
        }
    }

    fn contains(&self, version: &Version) -> bool {
        let above = self.lower.as_ref().map_or(true, |b| match version.cmp(&b.version) {
            Ordering::Greater => true,
            Ordering::Equal => b.inclusive,
            Ordering::Less => false,
        });
        let below = self.upper.as_ref().map_or(true, |b| match version.cmp(&b.version) {
            Ordering::Less => true,
            Ordering::Equal => b.inclusive,
            Ordering::Greater => false,
        });
        above && below
    }

    fn intersect(&self, other: &Interval) -> Option<Interval> {
        let lower = match (&self.lower, &other.lower) {
            (None, b) | (b, None) => b.clone(),
            (Some(a), Some(b)) => Some(match a.version.cmp(&b.version) {
                Ordering::Greater => a.clone(),
                Ordering::Less => b.clone(),
                Ordering::Equal => Bound {
                    version: a.version.clone(),
                    inclusive: a.inclusive && b.inclusive,
                },
            }),
        };
        let upper = match (&self.upper, &other.upper) {
            (None, b) | (b, None) => b.clone(),
            (Some(a), Some(b)) => Some(match a.version.cmp(&b.version) {
                Ordering::Less => a.clone(),
                Ordering::Greater => b.clone(),
                Ordering::Equal => Bound {
                    version: a.version.clone(),
                    inclusive: a.inclusive && b.inclusive,
                },
            }),
        };

        if let (Some(lo), Some(hi)) = (&lower, &upper) {
            match lo.version.cmp(&hi.version) {
                Ordering::Greater => return None,
                Ordering::Equal if !(lo.inclusive && hi.inclusive) => return None,
                _ => {},
            }
        }
        Some(Interval { lower, upper })
    }

    fn into_req(self) -> VersionReq {
        let full = |version: Version| PartialVersion {
            major: version.major,
            minor: Some(version.minor),
            patch: Some(version.patch),
            prerelease: version.prerelease,
        };

        match (self.lower, self.upper) {
            (None, None) => VersionReq::any(),
            (Some(lo), Some(hi)) if lo.version == hi.version => VersionReq {
                comparators: vec![Comparator {
                    op: Op::Exact,
                    version: full(lo.version),
                }],
            },
            (lower, upper) => {
                let mut comparators = Vec::new();
                if let Some(lo) = lower {
                    comparators.push(Comparator {
                        op: if lo.inclusive { Op::GreaterEq } else { Op::Greater },
                        version: full(lo.version),
                    });
                }
                if let Some(hi) = upper {
                    comparators.push(Comparator {
                        op: if hi.inclusive { Op::LessEq } else { Op::Less },
                        version: full(hi.version),
                    });
                }
                VersionReq { comparators }
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version_parsing() {
        let v = Version::from_str("1.2.3").unwrap();
        assert_eq!(v.major, 1);
        assert_eq!(v.minor, 2);
        assert_eq!(v.patch, 3);
        assert_eq!(v.prerelease, None);
        assert_eq!(v.build, None);
    }

    #[test]
    fn test_version_with_prerelease() {
        let v = Version::from_str("1.2.3-alpha.1").unwrap();
        assert_eq!(v.patch, 3);
        assert_eq!(v.prerelease, Some("alpha.1".to_string()));
        assert!(v.is_prerelease());
    }

    #[test]
    fn test_parse_tag() {
        assert_eq!(Version::parse_tag("v1.9"), Some(Version::new(1, 9, 0)));
        assert_eq!(Version::parse_tag("2"), Some(Version::new(2, 0, 0)));
        assert_eq!(Version::parse_tag("1.3.4"), Some(Version::new(1, 3, 4)));
        assert!(Version::parse_tag("release-candidate").is_none());
        assert!(Version::parse_tag("v1..2").is_none());
    }

    #[test]
    fn test_version_comparison() {
        let v1 = Version::new(1, 0, 0);
        let v2 = Version::new(2, 0, 0);
        let v3 = Version::new(1, 1, 0);

        assert!(v1 < v2);
        assert!(v1 < v3);
        assert!(v3 < v2);
    }

    #[test]
    fn test_version_req_exact() {
        let req = VersionReq::parse("1.2.3").unwrap();
        assert!(req.matches(&Version::new(1, 2, 3)));
        assert!(!req.matches(&Version::new(1, 2, 4)));

        let partial = VersionReq::parse("1.2").unwrap();
        assert!(partial.matches(&Version::new(1, 2, 9)));
        assert!(!partial.matches(&Version::new(1, 3, 0)));
    }

    #[test]
    fn test_version_req_range_list() {
        let req = VersionReq::parse(">=1.0,<2.0").unwrap();
        assert_eq!(req.comparators.len(), 2);
        assert!(req.matches(&Version::new(1, 9, 0)));
        assert!(!req.matches(&Version::new(2, 0, 0)));
        assert!(!req.matches(&Version::new(0, 9, 0)));

        let spaced = VersionReq::parse(">= 1.0 < 2.0").unwrap();
        assert_eq!(spaced, req);
    }

    #[test]
    fn test_version_req_caret_and_tilde() {
        let caret = VersionReq::parse("^1.2.3").unwrap();
        assert!(caret.matches(&Version::new(1, 3, 0)));
        assert!(!caret.matches(&Version::new(2, 0, 0)));
        assert!(!caret.matches(&Version::new(1, 2, 2)));

        let tilde = VersionReq::parse("~1.2.3").unwrap();
        assert!(tilde.matches(&Version::new(1, 2, 9)));
        assert!(!tilde.matches(&Version::new(1, 3, 0)));
    }

    #[test]
    fn test_version_req_wildcard() {
        let req = VersionReq::parse("*").unwrap();
        assert!(req.matches(&Version::new(999, 999, 999)));
        assert_eq!(req, VersionReq::any());
    }

    #[test]
    fn test_intersect_overlapping() {
        let a = VersionReq::parse(">=1.0, <2.0").unwrap();
        let b = VersionReq::parse("^1.5").unwrap();
        let both = a.intersect(&b).unwrap();

        assert_eq!(both.to_string(), ">=1.5.0, <2.0.0");
        assert!(both.matches(&Version::new(1, 7, 0)));
        assert!(!both.matches(&Version::new(1, 4, 0)));
    }

    #[test]
    fn test_intersect_disjoint() {
        let a = VersionReq::parse("<1.0").unwrap();
        let b = VersionReq::parse(">=1.0").unwrap();
        assert!(a.intersect(&b).is_none());

        let touching = VersionReq::parse("<=1.0.0").unwrap();
        let exact = touching.intersect(&VersionReq::parse(">=1.0.0").unwrap()).unwrap();
        assert_eq!(exact.to_string(), "=1.0.0");
    }

    #[test]
    fn test_unsatisfiable_requirement() {
        assert!(!VersionReq::parse(">2.0, <1.0").unwrap().is_satisfiable());
        assert!(VersionReq::parse(">=1.0, <1.1").unwrap().is_satisfiable());
    }

    #[test]
    fn test_display_reparses() {
        let req = VersionReq::parse("^1.2, <1.8.0-rc1, >v1.3").unwrap();
        let reparsed = VersionReq::parse(&req.to_string()).unwrap();
        assert_eq!(req, reparsed);
    }
}

#[cfg(test)]
mod property_tests {
    use super::*;
    use proptest::prelude::*;

    fn arb_req() -> impl Strategy<Value = VersionReq> {
        let op = prop_oneof![
            Just(">="),
            Just(">"),
            Just("<"),
            Just("<="),
            Just("^"),
            Just("~"),
            Just("="),
        ];
        prop::collection::vec((op, 0u64..4, 0u64..4), 1..3).prop_map(|parts| {
            let text = parts
                .iter()
                .map(|(op, major, minor)| format!("{}{}.{}", op, major, minor))
                .collect::<Vec<_>>()
                .join(", ");
            VersionReq::parse(&text).unwrap()
        })
    }

    proptest! {
        #[test]
        fn intersection_is_commutative(a in arb_req(), b in arb_req()) {
            prop_assert_eq!(a.intersect(&b), b.intersect(&a));
        }

        #[test]
        fn intersection_matches_both(
            a in arb_req(),
            b in arb_req(),
            major in 0u64..5,
            minor in 0u64..5,
            patch in 0u64..3,
        ) {
            let version = Version::new(major, minor, patch);
            let both = a.matches(&version) && b.matches(&version);
            match a.intersect(&b) {
                Some(req) => prop_assert_eq!(req.matches(&version), both),
                None => prop_assert!(!both),
            }
        }
    }

    proptest! {
        #[test]
        fn version_comparison_transitivity(
            a_major in 0u64..100,
            a_minor in 0u64..100,
            b_major in 0u64..100,
            b_minor in 0u64..100,
            c_major in 0u64..100,
            c_minor in 0u64..100,
        ) {
            let a = Version::new(a_major, a_minor, 0);
            let b = Version::new(b_major, b_minor, 0);
            let c = Version::new(c_major, c_minor, 0);

            if a < b && b < c {
                prop_assert!(a < c, "Transitivity violated: {} < {} < {} but {} >= {}", a, b, c, a, c);
            }
        }
    }
}
