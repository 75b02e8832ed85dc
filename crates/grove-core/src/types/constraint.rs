//! Version constraints carried by dependency declarations.

use super::VersionReq;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// What a declaration requires of a dependency's revision
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum Constraint {
    /// Unconstrained; resolves to the default branch tip
    Any,
    /// An exact revision identifier
    Revision(String),
    /// A branch name, resolved to its tip
    Branch(String),
    /// A tag name
    Tag(String),
    /// A semantic-version range, resolved against the repository's tags
    Range(VersionReq),
}

#[derive(Error, Debug)]
#[error("Invalid constraint '{input}': {reason}")]
pub struct ConstraintParseError {
    pub input: String,
    pub reason: String,
}

impl Constraint {
    /// Check if this is the unconstrained identity
    pub fn is_any(&self) -> bool {
        matches!(self, Constraint::Any)
    }

    /// Short label for the constraint kind, used in log fields
    pub fn kind(&self) -> &'static str {
        match self {
            Constraint::Any => "any",
            Constraint::Revision(_) => "rev",
            Constraint::Branch(_) => "branch",
            Constraint::Tag(_) => "tag",
            Constraint::Range(_) => "version",
        }
    }

    /// Check whether a pinned tag name satisfies this constraint.
    ///
    /// Only ranges and tags can be checked without a repository, so every
    /// other kind reports `true`.
    pub fn admits_tag(&self, tag: Option<&str>) -> bool {
        match self {
            Constraint::Range(req) => tag
                .and_then(super::Version::parse_tag)
                .map_or(false, |v| req.matches(&v)),
            Constraint::Tag(name) => tag == Some(name.as_str()),
            _ => true,
        }
    }
}

impl fmt::Display for Constraint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Constraint::Any => write!(f, "any"),
            Constraint::Revision(rev) => write!(f, "rev:{}", rev),
            Constraint::Branch(name) => write!(f, "branch:{}", name),
            Constraint::Tag(name) => write!(f, "tag:{}", name),
            Constraint::Range(req) => write!(f, "version:{}", req),
        }
    }
}

impl FromStr for Constraint {
    type Err = ConstraintParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let input = s.trim();
        if input.is_empty() || input == "any" || input == "*" {
            return Ok(Constraint::Any);
        }

        let error = |reason: &str| ConstraintParseError {
            input: input.to_string(),
            reason: reason.to_string(),
        };

        let (kind, value) = match input.split_once(':') {
            Some((kind, value)) => (kind, value.trim()),
            // Bare strings are version ranges (`^1.2`, `>=1.0, <2.0`)
            None => ("version", input),
        };
        if value.is_empty() {
            return Err(error("missing value"));
        }

        match kind {
            "rev" => Ok(Constraint::Revision(value.to_string())),
            "branch" => Ok(Constraint::Branch(value.to_string())),
            "tag" => Ok(Constraint::Tag(value.to_string())),
            "version" => VersionReq::parse(value)
                .map(Constraint::Range)
                .map_err(|e| error(&e.to_string())),
            _ => Err(error("unknown constraint kind")),
        }
    }
}

impl TryFrom<String> for Constraint {
    type Error = ConstraintParseError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Constraint> for String {
    fn from(value: Constraint) -> Self {
        value.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_kinds() {
        assert_eq!(Constraint::from_str("any").unwrap(), Constraint::Any);
        assert_eq!(Constraint::from_str("").unwrap(), Constraint::Any);
        assert_eq!(
            Constraint::from_str("rev:abc123").unwrap(),
            Constraint::Revision("abc123".to_string())
        );
        assert_eq!(
            Constraint::from_str("branch:main").unwrap(),
            Constraint::Branch("main".to_string())
        );
        assert_eq!(
            Constraint::from_str("tag:v1.2.0").unwrap(),
            Constraint::Tag("v1.2.0".to_string())
        );
        assert!(matches!(
            Constraint::from_str(">=1.0,<2.0").unwrap(),
            Constraint::Range(_)
        ));
    }

    #[test]
    fn test_parse_rejects_unknown_kind() {
        assert!(Constraint::from_str("commit:abc").is_err());
        assert!(Constraint::from_str("rev:").is_err());
    }

    #[test]
    fn test_display_reparses() {
        for text in ["any", "rev:abc", "branch:dev", "tag:v1", "version:>=1.0.0, <2.0.0"] {
            let constraint = Constraint::from_str(text).unwrap();
            assert_eq!(constraint.to_string(), text);
        }
    }

    #[test]
    fn test_admits_tag() {
        let range = Constraint::from_str(">=1.0,<2.0").unwrap();
        assert!(range.admits_tag(Some("v1.9")));
        assert!(!range.admits_tag(Some("2.0")));
        assert!(!range.admits_tag(None));
        assert!(Constraint::Any.admits_tag(None));
    }

    #[test]
    fn test_serde_as_string() {
        let constraint = Constraint::Branch("main".to_string());
        let json = serde_json::to_string(&constraint).unwrap();
        assert_eq!(json, "\"branch:main\"");
        let back: Constraint = serde_json::from_str(&json).unwrap();
        assert_eq!(back, constraint);
    }
}
