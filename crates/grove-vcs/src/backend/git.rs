//! Git backend.

use super::{path_str, RefEntry, RefKind, VcsBackend};
use crate::command::ToolCommand;
use crate::VcsResult;
use async_trait::async_trait;
use grove_core::VcsKind;
use std::path::Path;

const REMOTE_PREFIX: &str = "refs/remotes/origin/";
const TAG_PREFIX: &str = "refs/tags/";

/// Distributed-history backend driving `git`
#[derive(Debug, Clone, Copy, Default)]
pub struct GitBackend;

#[async_trait]
impl VcsBackend for GitBackend {
    fn kind(&self) -> VcsKind {
        VcsKind::Git
    }

    async fn clone_to(&self, url: &str, dest: &Path) -> VcsResult<()> {
        ToolCommand::new(VcsKind::Git, url)
            .args(["clone", "--quiet", "--no-checkout", url])
            .arg(path_str(dest))
            .run()
            .await?;
        Ok(())
    }

    async fn update(&self, path: &Path) -> VcsResult<()> {
        ToolCommand::new(VcsKind::Git, path_str(path))
            .args(["fetch", "--quiet", "--tags", "--force", "--prune", "origin"])
            .current_dir(path)
            .run()
            .await?;
        // Keeps refs/remotes/origin/HEAD pointing at the current default branch
        ToolCommand::new(VcsKind::Git, path_str(path))
            .args(["remote", "set-head", "origin", "--auto"])
            .current_dir(path)
            .run()
            .await?;
        Ok(())
    }

    async fn checkout(&self, path: &Path, revision: &str) -> VcsResult<()> {
        ToolCommand::new(VcsKind::Git, path_str(path))
            .args(["checkout", "--quiet", "--force", "--detach", revision])
            .current_dir(path)
            .run()
            .await?;
        Ok(())
    }

    async fn list_refs(&self, path: &Path) -> VcsResult<Vec<RefEntry>> {
        let output = ToolCommand::new(VcsKind::Git, path_str(path))
            .args([
                "for-each-ref",
                "--format=%(objectname) %(*objectname) %(refname)",
                "refs/remotes/origin",
                "refs/tags",
            ])
            .current_dir(path)
            .run()
            .await?;
        Ok(parse_for_each_ref(&output))
    }

    async fn current_revision(&self, path: &Path) -> VcsResult<String> {
        ToolCommand::new(VcsKind::Git, path_str(path))
            .args(["rev-parse", "HEAD"])
            .current_dir(path)
            .run()
            .await
    }
}

/// Parse `for-each-ref` output; annotated tags resolve to the peeled commit
fn parse_for_each_ref(output: &str) -> Vec<RefEntry> {
    output
        .lines()
        .filter_map(|line| {
            let fields: Vec<&str> = line.split_whitespace().collect();
            let (revision, refname) = match fields.as_slice() {
                [object, refname] => (*object, *refname),
                [_, peeled, refname] => (*peeled, *refname),
                _ => return None,
            };

            if let Some(name) = refname.strip_prefix(TAG_PREFIX) {
                Some(RefEntry::new(name, revision, RefKind::Tag))
            } else if let Some(name) = refname.strip_prefix(REMOTE_PREFIX) {
                let kind = if name == "HEAD" {
                    RefKind::Default
                } else {
                    RefKind::Branch
                };
                Some(RefEntry::new(name, revision, kind))
            } else {
                None
            }
        })
        .collect()
}
