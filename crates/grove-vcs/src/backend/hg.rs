//! Mercurial backend.

use super::{path_str, RefEntry, RefKind, VcsBackend};
use crate::command::ToolCommand;
use crate::VcsResult;
use async_trait::async_trait;
use grove_core::VcsKind;
use std::path::Path;

/// Distributed-history backend driving `hg`
#[derive(Debug, Clone, Copy, Default)]
pub struct HgBackend;

#[async_trait]
impl VcsBackend for HgBackend {
    fn kind(&self) -> VcsKind {
        VcsKind::Mercurial
    }

    async fn clone_to(&self, url: &str, dest: &Path) -> VcsResult<()> {
        ToolCommand::new(VcsKind::Mercurial, url)
            .args(["clone", "--quiet", "--noupdate", url])
            .arg(path_str(dest))
            .run()
            .await?;
        Ok(())
    }

    async fn update(&self, path: &Path) -> VcsResult<()> {
        ToolCommand::new(VcsKind::Mercurial, path_str(path))
            .args(["pull", "--quiet"])
            .current_dir(path)
            .run()
            .await?;
        Ok(())
    }

    async fn checkout(&self, path: &Path, revision: &str) -> VcsResult<()> {
        ToolCommand::new(VcsKind::Mercurial, path_str(path))
            .args(["update", "--quiet", "--clean", "--rev", revision])
            .current_dir(path)
            .run()
            .await?;
        Ok(())
    }

    async fn list_refs(&self, path: &Path) -> VcsResult<Vec<RefEntry>> {
        let target = path_str(path);
        let default = ToolCommand::new(VcsKind::Mercurial, target.clone())
            .args(["log", "--rev", "default", "--template", "{node}"])
            .current_dir(path)
            .run()
            .await?;
        let branches = ToolCommand::new(VcsKind::Mercurial, target.clone())
            .args(["branches", "--template", "{node} {branch}\\n"])
            .current_dir(path)
            .run()
            .await?;
        let tags = ToolCommand::new(VcsKind::Mercurial, target)
            .args(["tags", "--template", "{node} {tag}\\n"])
            .current_dir(path)
            .run()
            .await?;

        let mut refs = vec![RefEntry::new("default", default, RefKind::Default)];
        refs.extend(parse_node_lines(&branches, RefKind::Branch));
        refs.extend(parse_node_lines(&tags, RefKind::Tag).filter(|r| r.name != "tip"));
        Ok(refs)
    }

    async fn current_revision(&self, path: &Path) -> VcsResult<String> {
        ToolCommand::new(VcsKind::Mercurial, path_str(path))
            .args(["log", "--rev", ".", "--template", "{node}"])
            .current_dir(path)
            .run()
            .await
    }
}

/// Parse `<node> <name>` lines
fn parse_node_lines(output: &str, kind: RefKind) -> impl Iterator<Item = RefEntry> + '_ {
    output.lines().filter_map(move |line| {
        let (node, name) = line.trim().split_once(' ')?;
        Some(RefEntry::new(name.trim(), node, kind))
    })
}
