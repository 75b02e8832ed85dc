//! Bazaar backend.

use super::{path_str, RefEntry, RefKind, VcsBackend};
use crate::command::ToolCommand;
use crate::VcsResult;
use async_trait::async_trait;
use grove_core::VcsKind;
use std::path::Path;

/// Distributed-history backend driving `bzr`; revisions are branch revnos
#[derive(Debug, Clone, Copy, Default)]
pub struct BzrBackend;

#[async_trait]
impl VcsBackend for BzrBackend {
    fn kind(&self) -> VcsKind {
        VcsKind::Bazaar
    }

    async fn clone_to(&self, url: &str, dest: &Path) -> VcsResult<()> {
        ToolCommand::new(VcsKind::Bazaar, url)
            .args(["branch", "--quiet", url])
            .arg(path_str(dest))
            .run()
            .await?;
        Ok(())
    }

    async fn update(&self, path: &Path) -> VcsResult<()> {
        ToolCommand::new(VcsKind::Bazaar, path_str(path))
            .args(["pull", "--quiet", "--overwrite"])
            .current_dir(path)
            .run()
            .await?;
        Ok(())
    }

    async fn checkout(&self, path: &Path, revision: &str) -> VcsResult<()> {
        ToolCommand::new(VcsKind::Bazaar, path_str(path))
            .args(["update", "--quiet", "--revision", revision])
            .current_dir(path)
            .run()
            .await?;
        Ok(())
    }

    async fn list_refs(&self, path: &Path) -> VcsResult<Vec<RefEntry>> {
        let tip = ToolCommand::new(VcsKind::Bazaar, path_str(path))
            .arg("revno")
            .current_dir(path)
            .run()
            .await?;
        let tags = ToolCommand::new(VcsKind::Bazaar, path_str(path))
            .arg("tags")
            .current_dir(path)
            .run()
            .await?;

        let mut refs = vec![RefEntry::new("trunk", tip, RefKind::Default)];
        refs.extend(parse_tags(&tags));
        Ok(refs)
    }

    async fn current_revision(&self, path: &Path) -> VcsResult<String> {
        ToolCommand::new(VcsKind::Bazaar, path_str(path))
            .args(["revno", "--tree"])
            .current_dir(path)
            .run()
            .await
    }
}

/// Parse `bzr tags` lines (`name   revno`); tags on absent revisions show `?`
fn parse_tags(output: &str) -> Vec<RefEntry> {
    output
        .lines()
        .filter_map(|line| {
            let (name, revno) = line.trim().rsplit_once(char::is_whitespace)?;
            let revno = revno.trim();
            if revno == "?" {
                return None;
            }
            Some(RefEntry::new(name.trim(), revno, RefKind::Tag))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_tags() {
        let refs = parse_tags("v1.0                 12\nv1.1                 19\nlost                 ?\n");
        assert_eq!(refs.len(), 2);
        assert_eq!(refs[1], RefEntry::new("v1.1", "19", RefKind::Tag));
    }
}
