//! Subversion backend.
//!
//! Revisions are global revision numbers. Branches and tags follow the
//! conventional `^/branches` and `^/tags` layout; a repository without those
//! directories simply has no branches or tags.

use super::{path_str, RefEntry, RefKind, VcsBackend};
use crate::command::ToolCommand;
use crate::VcsResult;
use async_trait::async_trait;
use grove_core::{GroveError, VcsKind};
use std::path::Path;

/// Centralized-history backend driving `svn`
#[derive(Debug, Clone, Copy, Default)]
pub struct SvnBackend;

impl SvnBackend {
    async fn list_dir(&self, path: &Path, dir: &str, kind: RefKind) -> VcsResult<Vec<RefEntry>> {
        let result = ToolCommand::new(VcsKind::Subversion, path_str(path))
            .args(["list", "--verbose", "--non-interactive"])
            .arg(format!("^/{}", dir))
            .current_dir(path)
            .run()
            .await;

        match result {
            Ok(output) => Ok(parse_verbose_list(&output, kind)),
            Err(GroveError::RevisionNotFound { .. }) => Ok(Vec::new()),
            Err(error) => Err(error),
        }
    }
}

#[async_trait]
impl VcsBackend for SvnBackend {
    fn kind(&self) -> VcsKind {
        VcsKind::Subversion
    }

    async fn clone_to(&self, url: &str, dest: &Path) -> VcsResult<()> {
        ToolCommand::new(VcsKind::Subversion, url)
            .args(["checkout", "--quiet", "--non-interactive", url])
            .arg(path_str(dest))
            .run()
            .await?;
        Ok(())
    }

    async fn update(&self, path: &Path) -> VcsResult<()> {
        ToolCommand::new(VcsKind::Subversion, path_str(path))
            .args(["update", "--quiet", "--non-interactive"])
            .current_dir(path)
            .run()
            .await?;
        Ok(())
    }

    async fn checkout(&self, path: &Path, revision: &str) -> VcsResult<()> {
        ToolCommand::new(VcsKind::Subversion, path_str(path))
            .args(["update", "--quiet", "--non-interactive", "--revision", revision])
            .current_dir(path)
            .run()
            .await?;
        Ok(())
    }

    async fn list_refs(&self, path: &Path) -> VcsResult<Vec<RefEntry>> {
        let head = ToolCommand::new(VcsKind::Subversion, path_str(path))
            .args(["info", "--show-item", "last-changed-revision", "--revision", "HEAD"])
            .current_dir(path)
            .run()
            .await?;

        let mut refs = vec![RefEntry::new("HEAD", head, RefKind::Default)];
        refs.extend(self.list_dir(path, "branches", RefKind::Branch).await?);
        refs.extend(self.list_dir(path, "tags", RefKind::Tag).await?);
        Ok(refs)
    }

    async fn current_revision(&self, path: &Path) -> VcsResult<String> {
        ToolCommand::new(VcsKind::Subversion, path_str(path))
            .args(["info", "--show-item", "revision"])
            .current_dir(path)
            .run()
            .await
    }
}

/// Parse `svn list --verbose` lines: revision first, entry name last
fn parse_verbose_list(output: &str, kind: RefKind) -> Vec<RefEntry> {
    output
        .lines()
        .filter_map(|line| {
            let fields: Vec<&str> = line.split_whitespace().collect();
            let revision = fields.first()?;
            let name = fields.last()?.trim_end_matches('/');
            if fields.len() < 2 || name == "." || revision.parse::<u64>().is_err() {
                return None;
            }
            Some(RefEntry::new(name, *revision, kind))
        })
        .collect()
}
