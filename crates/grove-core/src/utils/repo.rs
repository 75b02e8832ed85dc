//! Repository URL helpers.
//!
//! Maps import paths to repository roots and URLs, normalizes URLs for cache
//! keying, and infers the VCS kind when a declaration leaves it out.

use crate::types::VcsKind;
use url::Url;

/// Hosts whose repositories live at `host/owner/repo`
const THREE_SEGMENT_HOSTS: &[&str] = &["github.com", "gitlab.com", "bitbucket.org", "golang.org"];

/// Hosts whose repositories live at `host/repo`
const TWO_SEGMENT_HOSTS: &[&str] = &["google.golang.org", "gopkg.in", "launchpad.net"];

/// Normalize a repository URL.
///
/// Scheme and host are lowercased, default ports and trailing slashes are
/// dropped, and a missing scheme becomes `https`. Strings that are not URLs
/// (scp-style `git@host:path`, local paths) are only trimmed.
pub fn normalize_url(raw: &str) -> String {
    let trimmed = raw.trim();
    let candidate = if trimmed.contains("://") {
        trimmed.to_string()
    } else if looks_like_host_path(trimmed) {
        format!("https://{}", trimmed)
    } else {
        return trimmed.trim_end_matches('/').to_string();
    };

    match Url::parse(&candidate) {
        Ok(mut url) => {
            url.set_fragment(None);
            let path = url.path().trim_end_matches('/').to_string();
            url.set_path(&path);
            url.to_string().trim_end_matches('/').to_string()
        },
        Err(_) => trimmed.trim_end_matches('/').to_string(),
    }
}

fn looks_like_host_path(s: &str) -> bool {
    let host = s.split('/').next().unwrap_or_default();
    !s.contains(':') && host.contains('.') && !s.starts_with('.') && !s.starts_with('/')
}

/// The import path of the repository that contains `import_path`.
///
/// `github.com/a/b/c` lives in `github.com/a/b`; unknown hosts are assumed to
/// serve the whole path as one repository.
pub fn repository_root(import_path: &str) -> String {
    let trimmed = import_path.trim().trim_matches('/');
    let segments: Vec<&str> = trimmed.split('/').collect();
    let host = segments.first().copied().unwrap_or_default();

    let depth = if THREE_SEGMENT_HOSTS.contains(&host) {
        3
    } else if TWO_SEGMENT_HOSTS.contains(&host) {
        2
    } else {
        segments.len()
    };

    segments[..depth.min(segments.len())].join("/")
}

/// Default repository URL for an import path with no declared repository
pub fn default_repository(import_path: &str) -> String {
    format!("https://{}", repository_root(import_path))
}

/// Infer the VCS kind from a repository URL, defaulting to git
pub fn infer_vcs(url: &str) -> VcsKind {
    let lower = url.to_ascii_lowercase();
    let host = Url::parse(&lower)
        .ok()
        .and_then(|u| u.host_str().map(str::to_string))
        .unwrap_or_default();

    if lower.ends_with(".git") || lower.starts_with("git@") || lower.starts_with("git://") {
        return VcsKind::Git;
    }
    if THREE_SEGMENT_HOSTS.contains(&host.as_str()) {
        return VcsKind::Git;
    }
    if lower.starts_with("svn://") || lower.starts_with("svn+") || lower.contains("/svn/") || host.starts_with("svn.") {
        return VcsKind::Subversion;
    }
    if lower.ends_with(".hg") || host.starts_with("hg.") || lower.contains("/hg/") {
        return VcsKind::Mercurial;
    }
    if host == "launchpad.net" || lower.starts_with("bzr://") || lower.starts_with("bzr+") {
        return VcsKind::Bazaar;
    }
    VcsKind::Git
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_url() {
        assert_eq!(
            normalize_url("HTTPS://GitHub.com/acme/x/"),
            "https://github.com/acme/x"
        );
        assert_eq!(normalize_url("github.com/acme/x"), "https://github.com/acme/x");
        assert_eq!(
            normalize_url("https://example.com:443/r#frag"),
            "https://example.com/r"
        );
        assert_eq!(normalize_url("git@github.com:acme/x.git"), "git@github.com:acme/x.git");
    }

    #[test]
    fn test_repository_root() {
        assert_eq!(repository_root("github.com/acme/x/sub/pkg"), "github.com/acme/x");
        assert_eq!(repository_root("golang.org/x/tools/go/ast"), "golang.org/x/tools");
        assert_eq!(repository_root("google.golang.org/grpc/codes"), "google.golang.org/grpc");
        assert_eq!(repository_root("example.com/whole/path"), "example.com/whole/path");
        assert_eq!(repository_root("github.com/acme"), "github.com/acme");
    }

    #[test]
    fn test_default_repository() {
        assert_eq!(
            default_repository("github.com/acme/x/sub"),
            "https://github.com/acme/x"
        );
    }

    #[test]
    fn test_infer_vcs() {
        assert_eq!(infer_vcs("https://github.com/acme/x"), VcsKind::Git);
        assert_eq!(infer_vcs("https://example.com/r.git"), VcsKind::Git);
        assert_eq!(infer_vcs("svn://example.com/trunk"), VcsKind::Subversion);
        assert_eq!(infer_vcs("https://hg.example.com/r"), VcsKind::Mercurial);
        assert_eq!(infer_vcs("https://launchpad.net/project"), VcsKind::Bazaar);
        assert_eq!(infer_vcs("https://example.com/unknown"), VcsKind::Git);
    }
}
