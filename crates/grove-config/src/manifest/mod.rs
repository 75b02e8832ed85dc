//! grove.toml manifest parsing

use crate::ConfigResult;
use grove_core::{Constraint, Declaration, GroveError, Manifest, ManifestReader, Requester, VcsKind};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Conventional manifest file name
pub const MANIFEST_FILE_NAME: &str = "grove.toml";

/// Complete grove.toml document
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GroveToml {
    /// Package metadata section
    pub package: PackageSection,

    /// Dependencies by import path
    #[serde(default)]
    pub dependencies: BTreeMap<String, DependencySpec>,
}

/// Package metadata section
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PackageSection {
    /// The project's own import path
    pub name: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// Dependency specification (simple constraint string or detailed table)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum DependencySpec {
    /// Constraint string: `"^1.2"`, `"any"`, `"branch:main"`
    Simple(String),

    Detailed {
        /// Repository URL, when it cannot be derived from the import path
        #[serde(default, skip_serializing_if = "Option::is_none")]
        repo: Option<String>,

        #[serde(default, skip_serializing_if = "Option::is_none")]
        vcs: Option<VcsKind>,

        /// Semantic-version range over the repository's tags
        #[serde(default, skip_serializing_if = "Option::is_none")]
        version: Option<String>,

        #[serde(default, skip_serializing_if = "Option::is_none")]
        branch: Option<String>,

        #[serde(default, skip_serializing_if = "Option::is_none")]
        tag: Option<String>,

        /// Exact revision id
        #[serde(default, skip_serializing_if = "Option::is_none")]
        rev: Option<String>,

        #[serde(default)]
        optional: bool,
    },
}

impl DependencySpec {
    /// The constraint this spec places on its dependency
    pub fn constraint(&self) -> Result<Constraint, String> {
        match self {
            DependencySpec::Simple(text) => text.parse().map_err(|e| format!("{}", e)),
            DependencySpec::Detailed {
                version,
                branch,
                tag,
                rev,
                ..
            } => {
                let selectors = [version.is_some(), branch.is_some(), tag.is_some(), rev.is_some()];
                if selectors.iter().filter(|&&set| set).count() > 1 {
                    return Err("only one of version, branch, tag or rev may be given".to_string());
                }
                if let Some(version) = version {
                    return format!("version:{}", version).parse().map_err(|e| format!("{}", e));
                }
                if let Some(branch) = branch {
                    return Ok(Constraint::Branch(branch.trim().to_string()));
                }
                if let Some(tag) = tag {
                    return Ok(Constraint::Tag(tag.trim().to_string()));
                }
                if let Some(rev) = rev {
                    return Ok(Constraint::Revision(rev.trim().to_string()));
                }
                Ok(Constraint::Any)
            },
        }
    }

    /// Build the declaration this spec makes on behalf of `requester`
    pub fn to_declaration(&self, import_path: &str, requester: &Requester) -> Result<Declaration, String> {
        let mut declaration = Declaration::new(import_path, self.constraint()?, requester.clone());
        if let DependencySpec::Detailed {
            repo, vcs, optional, ..
        } = self
        {
            if let Some(repo) = repo {
                if repo.trim().is_empty() {
                    return Err("repo must not be empty".to_string());
                }
                declaration = declaration.with_repository(repo.trim());
            }
            if let Some(vcs) = vcs {
                declaration = declaration.with_vcs(*vcs);
            }
            if *optional {
                declaration = declaration.optional();
            }
        }
        Ok(declaration)
    }
}

impl GroveToml {
    /// Convert to a manifest; declarations come in import-path order
    pub fn to_manifest(&self, requester: Option<&Requester>, origin: &str) -> ConfigResult<Manifest> {
        let requester = requester
            .cloned()
            .unwrap_or_else(|| Requester::Root(self.package.name.clone()));

        let mut manifest = Manifest::new(self.package.name.clone());
        for (import_path, spec) in &self.dependencies {
            let declaration = spec
                .to_declaration(import_path, &requester)
                .map_err(|message| invalid(origin, format!("dependency '{}': {}", import_path, message)))?;
            manifest.dependencies.push(declaration);
        }
        Ok(manifest)
    }
}

fn invalid(origin: &str, message: impl Into<String>) -> GroveError {
    GroveError::ManifestInvalid {
        path: origin.to_string(),
        message: message.into(),
    }
}

/// Check if `path` looks like an import path (`host/owner/repo`, no scheme)
fn is_valid_import_path(path: &str) -> bool {
    !path.is_empty()
        && !path.contains("://")
        && !path.starts_with('/')
        && !path.ends_with('/')
        && !path.split('/').any(|segment| segment.is_empty() || segment == "..")
        && path.chars().all(|c| !c.is_whitespace() && !c.is_control())
}

/// Parse grove.toml text.
///
/// Declarations are attributed to `requester`, or to the manifest's own
/// root identity when none is given.
pub fn parse_manifest(content: &str, origin: &str, requester: Option<&Requester>) -> ConfigResult<Manifest> {
    let document: GroveToml = toml::from_str(content).map_err(|e| invalid(origin, e.to_string()))?;

    if document.package.name.trim().is_empty() {
        return Err(invalid(origin, "package name is required in [package]"));
    }
    if !is_valid_import_path(&document.package.name) {
        return Err(invalid(
            origin,
            format!("package name '{}' is not an import path", document.package.name),
        ));
    }
    if let Some(bad) = document.dependencies.keys().find(|k| !is_valid_import_path(k)) {
        return Err(invalid(origin, format!("dependency '{}' is not an import path", bad)));
    }

    document.to_manifest(requester, origin)
}

/// Read and parse a root manifest file
pub fn load_manifest(path: &Path) -> ConfigResult<Manifest> {
    let content = fs::read_to_string(path)
        .map_err(|e| GroveError::io(format!("Failed to read {}", path.display()), e))?;
    let manifest = parse_manifest(&content, &path.display().to_string(), None)?;
    debug!(path = %path.display(), dependencies = manifest.dependencies.len(), "loaded manifest");
    Ok(manifest)
}

/// Find the nearest grove.toml, walking up from `start`
pub fn find_manifest(start: &Path) -> Option<PathBuf> {
    start
        .ancestors()
        .map(|dir| dir.join(MANIFEST_FILE_NAME))
        .find(|candidate| candidate.is_file())
}

/// Reads grove.toml from fetched dependency trees
#[derive(Debug, Clone, Copy, Default)]
pub struct TomlManifestReader;

impl ManifestReader for TomlManifestReader {
    fn manifest_file_name(&self) -> &str {
        MANIFEST_FILE_NAME
    }

    fn read(&self, dir: &Path, requester: &Requester) -> ConfigResult<Option<Manifest>> {
        let path = dir.join(MANIFEST_FILE_NAME);
        let content = match fs::read_to_string(&path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(GroveError::io(format!("Failed to read {}", path.display()), e)),
        };
        parse_manifest(&content, &path.display().to_string(), Some(requester)).map(Some)
    }
}
