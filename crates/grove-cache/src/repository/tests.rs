//! Unit tests for the repository cache

use super::*;
use grove_vcs::memory::{MemoryBackend, MemoryRepo};
use tempfile::TempDir;

const URL: &str = "https://example.com/acme/lib";

fn backend_with_repo(delay: Option<Duration>) -> Arc<MemoryBackend> {
    let mut backend = MemoryBackend::new(VcsKind::Git);
    if let Some(delay) = delay {
        backend = backend.with_delay(delay);
    }
    backend.add_repo(
        URL,
        MemoryRepo::new()
            .revision("r1", &[("lib.go", "package lib")])
            .default_branch("main", "r1"),
    );
    Arc::new(backend)
}

fn open_cache(dir: &TempDir, backend: &Arc<MemoryBackend>, grace: Duration) -> RepositoryCache {
    let options = CacheOptions {
        grace_period: grace,
        retry: RetryConfig::none(),
    };
    RepositoryCache::open(dir.path(), Backends::empty().with(backend.clone()), options).unwrap()
}

#[tokio::test]
async fn test_first_acquire_clones() {
    let dir = TempDir::new().unwrap();
    let backend = backend_with_repo(None);
    let cache = open_cache(&dir, &backend, Duration::ZERO);

    let handle = cache.acquire(URL, VcsKind::Git).await.unwrap();
    assert_eq!(handle.freshness(), Freshness::Cloned);
    assert!(handle.path().exists());
    assert_eq!(handle.path(), cache.location(URL));
    drop(handle);

    let entry = cache.index().get(URL).unwrap();
    assert!(entry.valid);
    assert_eq!(backend.clones(), 1);
}

#[tokio::test]
async fn test_same_session_reacquire_does_not_sync() {
    let dir = TempDir::new().unwrap();
    let backend = backend_with_repo(None);
    let cache = open_cache(&dir, &backend, Duration::ZERO);

    drop(cache.acquire(URL, VcsKind::Git).await.unwrap());
    let again = cache.acquire(URL, VcsKind::Git).await.unwrap();

    assert_eq!(again.freshness(), Freshness::Fresh);
    assert_eq!(backend.network_calls(), 1);
}

#[tokio::test]
async fn test_later_session_updates_in_place() {
    let dir = TempDir::new().unwrap();
    let backend = backend_with_repo(None);

    drop(open_cache(&dir, &backend, Duration::ZERO).acquire(URL, VcsKind::Git).await.unwrap());

    let cache = open_cache(&dir, &backend, Duration::ZERO);
    let handle = cache.acquire(URL, VcsKind::Git).await.unwrap();
    assert_eq!(handle.freshness(), Freshness::Updated);
    assert_eq!(backend.clones(), 1);
    assert_eq!(backend.updates(), 1);
}

#[tokio::test]
async fn test_grace_period_skips_network() {
    let dir = TempDir::new().unwrap();
    let backend = backend_with_repo(None);

    drop(open_cache(&dir, &backend, Duration::ZERO).acquire(URL, VcsKind::Git).await.unwrap());

    let cache = open_cache(&dir, &backend, Duration::from_secs(3600));
    let handle = cache.acquire(URL, VcsKind::Git).await.unwrap();
    assert_eq!(handle.freshness(), Freshness::Fresh);
    assert_eq!(backend.network_calls(), 1);
}

#[tokio::test]
async fn test_concurrent_acquire_clones_once() {
    let dir = TempDir::new().unwrap();
    let backend = backend_with_repo(Some(Duration::from_millis(20)));
    let cache = Arc::new(open_cache(&dir, &backend, Duration::ZERO));

    let mut tasks = tokio::task::JoinSet::new();
    for _ in 0..8 {
        let cache = cache.clone();
        tasks.spawn(async move {
            let handle = cache.acquire(URL, VcsKind::Git).await?;
            Ok::<_, GroveError>(handle.path().to_path_buf())
        });
    }

    let mut paths = Vec::new();
    while let Some(result) = tasks.join_next().await {
        paths.push(result.unwrap().unwrap());
    }

    assert_eq!(paths.len(), 8);
    assert!(paths.iter().all(|p| p == &paths[0]));
    assert_eq!(backend.clones(), 1);
    assert_eq!(backend.updates(), 0);
}

#[tokio::test]
async fn test_aborted_clone_leaves_no_entry() {
    let dir = TempDir::new().unwrap();
    let backend = backend_with_repo(Some(Duration::from_secs(30)));
    let cache = open_cache(&dir, &backend, Duration::ZERO);

    let result = tokio::time::timeout(Duration::from_millis(20), cache.acquire(URL, VcsKind::Git)).await;
    assert!(result.is_err());

    assert!(cache.index().get(URL).is_none());
    assert!(!cache.location(URL).exists());
    let leftovers: Vec<_> = fs::read_dir(dir.path().join(REPOS_DIR)).unwrap().collect();
    assert!(leftovers.is_empty());
}

#[tokio::test]
async fn test_invalid_entry_is_recloned() {
    let dir = TempDir::new().unwrap();
    let backend = backend_with_repo(None);

    {
        let cache = open_cache(&dir, &backend, Duration::ZERO);
        drop(cache.acquire(URL, VcsKind::Git).await.unwrap());
        cache.index().set_valid(&normalize_url(URL), false);
        cache.index().save().unwrap();
    }

    let cache = open_cache(&dir, &backend, Duration::ZERO);
    let handle = cache.acquire(URL, VcsKind::Git).await.unwrap();
    assert_eq!(handle.freshness(), Freshness::Cloned);
    assert_eq!(backend.clones(), 2);
}

#[tokio::test]
async fn test_corrupt_working_copy_is_recloned_once() {
    let dir = TempDir::new().unwrap();
    let backend = backend_with_repo(None);

    drop(open_cache(&dir, &backend, Duration::ZERO).acquire(URL, VcsKind::Git).await.unwrap());

    // Wipe the working copy metadata so the next update reports corruption
    let cache = open_cache(&dir, &backend, Duration::ZERO);
    for entry in fs::read_dir(cache.location(URL)).unwrap() {
        fs::remove_file(entry.unwrap().path()).unwrap();
    }

    let handle = cache.acquire(URL, VcsKind::Git).await.unwrap();
    assert_eq!(handle.freshness(), Freshness::Cloned);
    assert_eq!(backend.clones(), 2);
}

#[tokio::test]
async fn test_acquire_local_never_fetches() {
    let dir = TempDir::new().unwrap();
    let backend = backend_with_repo(None);
    let cache = open_cache(&dir, &backend, Duration::ZERO);

    assert!(cache.acquire_local(URL, VcsKind::Git).await.unwrap().is_none());
    drop(cache.acquire(URL, VcsKind::Git).await.unwrap());
    assert!(cache.acquire_local(URL, VcsKind::Git).await.unwrap().is_some());
    assert_eq!(backend.network_calls(), 1);
}

#[tokio::test]
async fn test_clean_removes_everything() {
    let dir = TempDir::new().unwrap();
    let backend = backend_with_repo(None);
    let cache = open_cache(&dir, &backend, Duration::ZERO);
    drop(cache.acquire(URL, VcsKind::Git).await.unwrap());

    assert_eq!(cache.clean().unwrap(), 1);
    assert!(cache.index().is_empty());
    assert!(!cache.location(URL).exists());
}
