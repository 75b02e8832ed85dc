//! Version-control system kinds.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Kind of version-control system a repository is served by
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VcsKind {
    Git,
    #[serde(rename = "hg", alias = "mercurial")]
    Mercurial,
    #[serde(rename = "svn", alias = "subversion")]
    Subversion,
    #[serde(rename = "bzr", alias = "bazaar")]
    Bazaar,
}

impl VcsKind {
    /// All supported kinds
    pub const ALL: [VcsKind; 4] = [
        VcsKind::Git,
        VcsKind::Mercurial,
        VcsKind::Subversion,
        VcsKind::Bazaar,
    ];

    /// Name of the command-line tool for this kind
    pub fn command(&self) -> &'static str {
        match self {
            VcsKind::Git => "git",
            VcsKind::Mercurial => "hg",
            VcsKind::Subversion => "svn",
            VcsKind::Bazaar => "bzr",
        }
    }

    /// Check if the history is distributed (every clone carries all refs)
    pub fn is_distributed(&self) -> bool {
        !matches!(self, VcsKind::Subversion)
    }
}

impl fmt::Display for VcsKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.command())
    }
}

impl FromStr for VcsKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "git" => Ok(VcsKind::Git),
            "hg" | "mercurial" => Ok(VcsKind::Mercurial),
            "svn" | "subversion" => Ok(VcsKind::Subversion),
            "bzr" | "bazaar" => Ok(VcsKind::Bazaar),
            other => Err(format!("unknown VCS kind '{}'", other)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_aliases() {
        assert_eq!("Mercurial".parse::<VcsKind>().unwrap(), VcsKind::Mercurial);
        assert_eq!("svn".parse::<VcsKind>().unwrap(), VcsKind::Subversion);
        assert!("cvs".parse::<VcsKind>().is_err());
    }

    #[test]
    fn test_serde_names() {
        assert_eq!(serde_json::to_string(&VcsKind::Mercurial).unwrap(), "\"hg\"");
        let kind: VcsKind = serde_json::from_str("\"bazaar\"").unwrap();
        assert_eq!(kind, VcsKind::Bazaar);
    }
}
