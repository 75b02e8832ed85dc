//! Unit tests for CLI commands.

use super::*;
use camino::Utf8PathBuf;
use grove_config::{load_mirrors, GroveConfig};
use grove_core::VcsKind;
use grove_lockfile::{load_lock, LOCK_FILE_NAME};
use grove_vcs::memory::{MemoryBackend, MemoryRepo};
use std::fs;
use std::sync::Arc;
use tempfile::TempDir;

const MANIFEST: &str = r#"
[package]
name = "example.com/app"

[dependencies]
"github.com/acme/x" = "any"
"#;

/// Context whose home lives in `home` and whose only backend is `backend`
fn create_test_context(home: &TempDir, cwd: PathBuf, backend: MemoryBackend) -> CommandContext {
    CommandContext {
        cwd,
        output: crate::output::OutputHandler::new(),
        loader: ConfigLoader::new(Utf8PathBuf::try_from(home.path().to_path_buf()).unwrap()),
        config: GroveConfig {
            max_retries: 0,
            ..GroveConfig::default()
        },
        backends: Backends::empty().with(Arc::new(backend)),
        cancel: CancellationToken::new(),
    }
}

fn project() -> TempDir {
    let dir = tempfile::tempdir().unwrap();
    fs::write(dir.path().join(MANIFEST_FILE_NAME), MANIFEST).unwrap();
    dir
}

fn acme_backend() -> MemoryBackend {
    let backend = MemoryBackend::new(VcsKind::Git);
    backend.add_repo(
        "https://github.com/acme/x",
        MemoryRepo::new()
            .revision("x1", &[("x.go", "package x\n")])
            .default_branch("main", "x1"),
    );
    backend
}

#[test]
fn test_manifest_path_walks_up() {
    let home = tempfile::tempdir().unwrap();
    let project = project();
    let nested = project.path().join("cmd").join("tool");
    fs::create_dir_all(&nested).unwrap();

    let ctx = create_test_context(&home, nested, MemoryBackend::new(VcsKind::Git));
    assert_eq!(ctx.manifest_path().unwrap(), project.path().join(MANIFEST_FILE_NAME));
    assert!(name::execute(&ctx).is_ok());
}

#[test]
fn test_missing_manifest() {
    let home = tempfile::tempdir().unwrap();
    let empty = tempfile::tempdir().unwrap();
    let ctx = create_test_context(&home, empty.path().to_path_buf(), MemoryBackend::new(VcsKind::Git));

    assert!(matches!(ctx.manifest_path(), Err(GroveError::ManifestInvalid { .. })));
    assert!(name::execute(&ctx).is_err());
}

#[test]
fn test_mirror_set_replace_and_remove() {
    let home = tempfile::tempdir().unwrap();
    let ctx = create_test_context(&home, home.path().to_path_buf(), MemoryBackend::new(VcsKind::Git));
    let path = ctx.loader.mirrors_path();

    mirror::set(
        "https://example.com/lib".to_string(),
        "https://mirror.example/lib".to_string(),
        None,
        &ctx,
    )
    .unwrap();
    mirror::set(
        "https://example.com/lib".to_string(),
        "https://other.example/lib".to_string(),
        Some(VcsKind::Mercurial),
        &ctx,
    )
    .unwrap();

    let entries = load_mirrors(path.as_std_path()).unwrap();
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].replacement, "https://other.example/lib");
    assert_eq!(entries[0].vcs, Some(VcsKind::Mercurial));
    assert!(mirror::list(&ctx).is_ok());

    mirror::remove("https://example.com/lib", &ctx).unwrap();
    assert!(load_mirrors(path.as_std_path()).unwrap().is_empty());

    // Removing something that is not there is only a warning
    assert!(mirror::remove("https://example.com/lib", &ctx).is_ok());
}

#[test]
fn test_mirror_loop_is_not_saved() {
    let home = tempfile::tempdir().unwrap();
    let ctx = create_test_context(&home, home.path().to_path_buf(), MemoryBackend::new(VcsKind::Git));

    mirror::set("https://a.example/x".to_string(), "https://b.example/x".to_string(), None, &ctx).unwrap();
    let result = mirror::set("https://b.example/x".to_string(), "https://a.example/x".to_string(), None, &ctx);
    assert!(matches!(result, Err(GroveError::ConfigValidation { .. })));

    let entries = load_mirrors(ctx.loader.mirrors_path().as_std_path()).unwrap();
    assert_eq!(entries.len(), 1);
}

#[tokio::test]
async fn test_install_writes_then_reuses_lock() {
    let home = tempfile::tempdir().unwrap();
    let project = project();
    let ctx = create_test_context(&home, project.path().to_path_buf(), acme_backend());
    let lock_path = project.path().join(LOCK_FILE_NAME);

    install::execute(false, &ctx).await.unwrap();
    let lock = load_lock(&lock_path).unwrap().unwrap();
    assert_eq!(lock.len(), 1);
    let x = lock.package("github.com/acme/x").unwrap();
    assert_eq!(x.revision, "x1");
    assert_eq!(x.vcs, VcsKind::Git);

    let written = fs::read_to_string(&lock_path).unwrap();
    install::execute(false, &ctx).await.unwrap();
    assert_eq!(fs::read_to_string(&lock_path).unwrap(), written);

    install::execute(true, &ctx).await.unwrap();
    assert_eq!(load_lock(&lock_path).unwrap().unwrap(), lock);
}

#[tokio::test]
async fn test_install_fails_when_required_repository_is_unreachable() {
    let home = tempfile::tempdir().unwrap();
    let project = project();
    let backend = MemoryBackend::new(VcsKind::Git);
    backend.add_repo("https://github.com/acme/x", MemoryRepo::new().unreachable());
    let ctx = create_test_context(&home, project.path().to_path_buf(), backend);

    let result = install::execute(false, &ctx).await;
    assert!(matches!(result, Err(GroveError::NetworkUnavailable { .. })));
    assert!(!project.path().join(LOCK_FILE_NAME).exists());
}

#[tokio::test]
async fn test_cache_clean_after_install() {
    let home = tempfile::tempdir().unwrap();
    let project = project();
    let ctx = create_test_context(&home, project.path().to_path_buf(), acme_backend());

    install::execute(false, &ctx).await.unwrap();
    let cache = ctx.open_cache().unwrap();
    assert_eq!(cache.index().len(), 1);
    drop(cache);

    cache::clean(&ctx).unwrap();
    assert!(ctx.open_cache().unwrap().index().is_empty());
}
