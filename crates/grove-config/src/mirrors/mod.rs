//! Persisted mirror list (`mirrors.toml`)
//!
//! ```toml
//! [[repo]]
//! original = "https://golang.org/x/tools"
//! repo = "https://github.com/golang/tools"
//! vcs = "git"
//! ```

use crate::ConfigResult;
use grove_core::utils::normalize_url;
use grove_core::{GroveError, VcsKind};
use grove_vcs::{MirrorEntry, MirrorTable};
use serde::{Deserialize, Serialize};
use std::fs;
use std::io::Write;
use std::path::Path;
use tracing::{debug, info};

/// Conventional mirrors file name, inside the grove home directory
pub const MIRRORS_FILE_NAME: &str = "mirrors.toml";

#[derive(Debug, Default, Serialize, Deserialize)]
struct MirrorsFile {
    #[serde(default, rename = "repo")]
    repos: Vec<MirrorRecord>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct MirrorRecord {
    original: String,
    repo: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    vcs: Option<VcsKind>,
}

fn unusable(path: &Path, reason: impl std::fmt::Display) -> GroveError {
    GroveError::ConfigValidation {
        field: path.display().to_string(),
        reason: reason.to_string(),
    }
}

/// Load persisted mirror entries; a missing file is an empty list
pub fn load_mirrors(path: &Path) -> ConfigResult<Vec<MirrorEntry>> {
    let content = match fs::read_to_string(path) {
        Ok(content) => content,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            debug!(path = %path.display(), "no mirrors file");
            return Ok(Vec::new());
        },
        Err(e) => return Err(unusable(path, e)),
    };

    let file: MirrorsFile = toml::from_str(&content).map_err(|e| unusable(path, e))?;
    let entries: Vec<MirrorEntry> = file
        .repos
        .into_iter()
        .map(|r| MirrorEntry::new(r.original, r.repo, r.vcs))
        .collect();
    debug!(path = %path.display(), mirrors = entries.len(), "loaded mirrors");
    Ok(entries)
}

/// Persisted mirrors merged over the built-in redirects
pub fn load_mirror_table(path: &Path) -> ConfigResult<MirrorTable> {
    MirrorTable::with_builtins(load_mirrors(path)?)
}

/// Write mirror entries, sorted by original URL, replacing the file atomically
pub fn save_mirrors(path: &Path, entries: &[MirrorEntry]) -> ConfigResult<()> {
    let mut repos: Vec<MirrorRecord> = entries
        .iter()
        .map(|e| MirrorRecord {
            original: e.pattern.clone(),
            repo: e.replacement.clone(),
            vcs: e.vcs,
        })
        .collect();
    repos.sort_by(|a, b| a.original.cmp(&b.original));

    let content = toml::to_string_pretty(&MirrorsFile { repos }).map_err(|e| unusable(path, e))?;
    let parent = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    fs::create_dir_all(parent)
        .map_err(|e| GroveError::io(format!("Failed to create {}", parent.display()), e))?;

    let mut staged = tempfile::NamedTempFile::new_in(parent)
        .map_err(|e| GroveError::io(format!("Failed to stage {}", path.display()), e))?;
    staged
        .write_all(content.as_bytes())
        .map_err(|e| GroveError::io(format!("Failed to write {}", path.display()), e))?;
    staged
        .persist(path)
        .map_err(|e| GroveError::io(format!("Failed to replace {}", path.display()), e.error))?;

    info!(path = %path.display(), mirrors = entries.len(), "saved mirrors");
    Ok(())
}

/// Add or replace the mirror for `entry.pattern`; returns the replaced entry
pub fn set_mirror(entries: &mut Vec<MirrorEntry>, entry: MirrorEntry) -> Option<MirrorEntry> {
    let key = normalize_url(&entry.pattern);
    match entries.iter_mut().find(|e| normalize_url(&e.pattern) == key) {
        Some(existing) => Some(std::mem::replace(existing, entry)),
        None => {
            entries.push(entry);
            None
        },
    }
}

/// Remove the mirror for `original`; false if there was none
pub fn remove_mirror(entries: &mut Vec<MirrorEntry>, original: &str) -> bool {
    let key = normalize_url(original);
    let before = entries.len();
    entries.retain(|e| normalize_url(&e.pattern) != key);
    entries.len() != before
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_file_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        assert!(load_mirrors(&dir.path().join(MIRRORS_FILE_NAME)).unwrap().is_empty());
        let table = load_mirror_table(&dir.path().join(MIRRORS_FILE_NAME)).unwrap();
        assert!(table.resolve("https://golang.org/x/net").matched);
    }

    #[test]
    fn test_save_then_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join(MIRRORS_FILE_NAME);
        let entries = vec![
            MirrorEntry::new("https://example.com/b", "https://mirror.example/b", None),
            MirrorEntry::new("https://example.com/a", "https://mirror.example/a", Some(VcsKind::Mercurial)),
        ];
        save_mirrors(&path, &entries).unwrap();

        let text = fs::read_to_string(&path).unwrap();
        assert!(text.find("example.com/a").unwrap() < text.find("example.com/b").unwrap());

        let loaded = load_mirrors(&path).unwrap();
        assert_eq!(loaded.len(), 2);
        assert_eq!(loaded[0].pattern, "https://example.com/a");
        assert_eq!(loaded[0].vcs, Some(VcsKind::Mercurial));
        assert_eq!(loaded[1].vcs, None);
    }

    #[test]
    fn test_invalid_file_names_the_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(MIRRORS_FILE_NAME);
        fs::write(&path, "[[repo]]\noriginal = 3\n").unwrap();

        match load_mirrors(&path) {
            Err(GroveError::ConfigValidation { field, .. }) => assert!(field.ends_with(MIRRORS_FILE_NAME)),
            other => panic!("expected a validation error, got {:?}", other),
        }
    }

    #[test]
    fn test_loaded_entry_overrides_builtin() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(MIRRORS_FILE_NAME);
        save_mirrors(
            &path,
            &[MirrorEntry::new("https://golang.org/x", "https://mirror.example/golang", None)],
        )
        .unwrap();

        let table = load_mirror_table(&path).unwrap();
        assert_eq!(
            table.resolve("https://golang.org/x/tools").url,
            "https://mirror.example/golang/tools"
        );
    }

    #[test]
    fn test_set_and_remove() {
        let mut entries = Vec::new();
        assert!(set_mirror(&mut entries, MirrorEntry::new("https://a.com/x", "https://m.com/x", None)).is_none());

        let replaced = set_mirror(&mut entries, MirrorEntry::new("https://A.com/x/", "https://n.com/x", None));
        assert_eq!(replaced.unwrap().replacement, "https://m.com/x");
        assert_eq!(entries.len(), 1);

        assert!(remove_mirror(&mut entries, "https://a.com/x"));
        assert!(!remove_mirror(&mut entries, "https://a.com/x"));
        assert!(entries.is_empty());
    }
}
