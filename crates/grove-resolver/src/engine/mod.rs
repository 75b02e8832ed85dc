//! Resolution engine
//!
//! Discovers the dependency graph level by level. Every import path of one
//! level is reconciled, then fetched, pinned and inspected by a bounded pool
//! of workers; the declarations they discover are merged in import-path order
//! at the level boundary before the next level starts. Pinning is therefore
//! independent of which worker finishes first.
//!
//! The visited set is the only engine-level lock and is held just long enough
//! to test-and-set membership. Cache acquisition serializes per repository.

use crate::graph::DependencyGraph;
use crate::inspect::discover;
use crate::reconcile::{reconcile, Reconciled};
use crate::semver::{select_revision, Selection};
use crate::ResolverResult;
use grove_cache::{CacheHandle, RepositoryCache};
use grove_core::utils::{infer_vcs, repository_root};
use grove_core::{
    Constraint, Declaration, GroveError, Manifest, ManifestReader, Requester, ResolvedPackage, VcsKind,
};
use grove_lockfile::{compute_fingerprint, is_stale, LockSnapshot};
use grove_vcs::MirrorTable;
use parking_lot::Mutex;
use std::collections::{BTreeMap, BTreeSet, HashSet};
use std::fmt;
use std::sync::Arc;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Engine tunables
#[derive(Debug, Clone)]
pub struct ResolverOptions {
    /// Maximum number of import paths fetched at once
    pub workers: usize,
    /// Inspect `_test.go` files for imports too
    pub include_tests: bool,
    /// Ignore a fresh lock and resolve from scratch
    pub force_update: bool,
    /// Check cached working copies against a fresh lock before reusing it
    pub verify_lock: bool,
    pub cancel: CancellationToken,
}

impl Default for ResolverOptions {
    fn default() -> Self {
        Self {
            workers: 8,
            include_tests: false,
            force_update: false,
            verify_lock: true,
            cancel: CancellationToken::new(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum WarningKind {
    /// A path that is not root-required could not be fetched or pinned
    FetchFailed,
    /// Declarations that cannot be reconciled on a path that is not root-required
    Conflict,
    /// A declaration arrived after its path was pinned and the pin does not satisfy it
    LateConstraint,
    /// Declarations named different repositories for one path
    RepositoryMismatch,
    /// A locked package has no cached working copy
    LockMissing,
    /// A cached working copy is not at its locked revision
    LockDrift,
}

impl fmt::Display for WarningKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            WarningKind::FetchFailed => "fetch-failed",
            WarningKind::Conflict => "conflict",
            WarningKind::LateConstraint => "late-constraint",
            WarningKind::RepositoryMismatch => "repository-mismatch",
            WarningKind::LockMissing => "lock-missing",
            WarningKind::LockDrift => "lock-drift",
        };
        f.write_str(name)
    }
}

/// A non-fatal problem found during resolution
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolutionWarning {
    pub import_path: String,
    pub kind: WarningKind,
    pub message: String,
}

/// Outcome of a successful `resolve`
#[derive(Debug, Clone)]
pub struct Resolution {
    pub snapshot: LockSnapshot,
    pub warnings: Vec<ResolutionWarning>,
    /// The previous lock was fresh and returned as-is
    pub reused_lock: bool,
}

/// Resolves manifests into lock snapshots
#[derive(Clone)]
pub struct Resolver {
    cache: Arc<RepositoryCache>,
    mirrors: Arc<MirrorTable>,
    reader: Arc<dyn ManifestReader>,
    options: ResolverOptions,
}

/// What a worker learned about one import path
#[derive(Debug)]
struct Fetched {
    url: String,
    kind: VcsKind,
    selection: Selection,
    declarations: Vec<Declaration>,
}

type LevelOutcomes = BTreeMap<String, (Reconciled, ResolverResult<Fetched>)>;

/// Visited set plus the paths waiting for the next level
#[derive(Debug, Default)]
struct Frontier {
    visited: HashSet<String>,
    pending: BTreeSet<String>,
}

impl Frontier {
    fn seeded(root: &str) -> Self {
        let mut frontier = Self::default();
        frontier.visited.insert(root.to_string());
        frontier
    }

    /// Schedule `path` unless it was ever scheduled before
    fn enqueue(&mut self, path: &str) {
        if self.visited.insert(path.to_string()) {
            self.pending.insert(path.to_string());
        }
    }

    fn take_level(&mut self) -> BTreeSet<String> {
        std::mem::take(&mut self.pending)
    }
}

/// Driver-owned state of one resolution
#[derive(Debug, Default)]
struct Traversal {
    declarations: BTreeMap<String, Vec<Declaration>>,
    pinned: BTreeMap<String, ResolvedPackage>,
    failed: BTreeSet<String>,
    warnings: Vec<ResolutionWarning>,
}

impl Traversal {
    fn declarations_for(&self, path: &str) -> &[Declaration] {
        self.declarations.get(path).map(Vec::as_slice).unwrap_or(&[])
    }

    fn root_required(&self, path: &str) -> bool {
        self.declarations_for(path).iter().any(Declaration::is_root_required)
    }

    fn warn(&mut self, import_path: &str, kind: WarningKind, message: String) {
        warn!(import_path = %import_path, kind = %kind, "{}", message);
        self.warnings.push(ResolutionWarning {
            import_path: import_path.to_string(),
            kind,
            message,
        });
    }

    /// Fatal on root-required paths; otherwise a warning and the subtree is skipped
    fn fail(&mut self, path: &str, error: GroveError, kind: WarningKind) -> ResolverResult<()> {
        if self.root_required(path) {
            return Err(error);
        }
        self.warn(path, kind, error.to_string());
        self.failed.insert(path.to_string());
        Ok(())
    }

    /// Reconcile every path of a level; paths that fail are dropped from it
    fn reconcile_level(&mut self, paths: BTreeSet<String>) -> ResolverResult<Vec<(String, Reconciled)>> {
        let mut jobs = Vec::with_capacity(paths.len());
        for path in paths {
            match reconcile(&path, self.declarations_for(&path)) {
                Ok(reconciled) => {
                    if !reconciled.repository_conflicts.is_empty() {
                        let message = format!(
                            "also declared as {}; using {}",
                            reconciled.repository_conflicts.join(", "),
                            reconciled.repository
                        );
                        self.warn(&path, WarningKind::RepositoryMismatch, message);
                    }
                    jobs.push((path, reconciled));
                },
                Err(error) => self.fail(&path, error, WarningKind::Conflict)?,
            }
        }
        Ok(jobs)
    }

    /// Pin the level's packages, then merge what they declare
    fn absorb(&mut self, outcomes: LevelOutcomes) -> ResolverResult<()> {
        let mut discovered = Vec::new();
        for (path, (reconciled, outcome)) in outcomes {
            match outcome {
                Ok(fetched) => {
                    let mut dependencies: Vec<String> =
                        fetched.declarations.iter().map(|d| d.import_path.clone()).collect();
                    dependencies.sort();
                    dependencies.dedup();

                    self.pinned.insert(
                        path.clone(),
                        ResolvedPackage {
                            import_path: path,
                            repository: fetched.url,
                            declared_repository: reconciled.repository,
                            vcs: fetched.kind,
                            revision: fetched.selection.revision,
                            version: fetched.selection.tag,
                            constraint: reconciled.constraint,
                            dependencies,
                        },
                    );
                    discovered.extend(fetched.declarations);
                },
                Err(error @ GroveError::Cancelled { .. }) => return Err(error),
                Err(error) => self.fail(&path, error, WarningKind::FetchFailed)?,
            }
        }

        let mut late = BTreeSet::new();
        for declaration in discovered {
            if self.pinned.contains_key(&declaration.import_path) {
                late.insert(declaration.import_path.clone());
            }
            self.declarations
                .entry(declaration.import_path.clone())
                .or_default()
                .push(declaration);
        }
        for path in late {
            self.check_late(&path)?;
        }
        Ok(())
    }

    /// Re-reconcile a pinned path that received new declarations
    fn check_late(&mut self, path: &str) -> ResolverResult<()> {
        let reconciled = match reconcile(path, self.declarations_for(path)) {
            Ok(reconciled) => reconciled,
            Err(error) => {
                if self.root_required(path) {
                    return Err(error);
                }
                self.warn(path, WarningKind::Conflict, error.to_string());
                return Ok(());
            },
        };

        let Some(package) = self.pinned.get(path) else {
            return Ok(());
        };
        if satisfies(package, &reconciled.constraint) {
            return Ok(());
        }
        let message = format!(
            "pinned at {} ({}) before a declaration narrowed it to {}",
            package.short_revision(),
            package.version.as_deref().unwrap_or("untagged"),
            reconciled.constraint
        );
        self.warn(path, WarningKind::LateConstraint, message);
        Ok(())
    }
}

/// Key a declaration by the repository that serves its import path
fn fold_onto_repository(mut declaration: Declaration) -> Declaration {
    declaration.import_path = repository_root(&declaration.import_path);
    declaration
}

/// Whether an existing pin meets a constraint that arrived after it was made
fn satisfies(package: &ResolvedPackage, constraint: &Constraint) -> bool {
    if &package.constraint == constraint {
        return true;
    }
    match constraint {
        Constraint::Any => true,
        Constraint::Revision(id) => package.revision.starts_with(id.as_str()),
        Constraint::Branch(_) => false,
        Constraint::Tag(_) | Constraint::Range(_) => constraint.admits_tag(package.version.as_deref()),
    }
}

impl Resolver {
    pub fn new(
        cache: Arc<RepositoryCache>,
        mirrors: Arc<MirrorTable>,
        reader: Arc<dyn ManifestReader>,
        options: ResolverOptions,
    ) -> Self {
        Self {
            cache,
            mirrors,
            reader,
            options,
        }
    }

    pub fn options(&self) -> &ResolverOptions {
        &self.options
    }

    /// Resolve `manifest` into a lock snapshot.
    ///
    /// A fresh `previous` lock is returned unchanged without touching the
    /// network, unless `force_update` is set.
    pub async fn resolve(&self, manifest: &Manifest, previous: Option<&LockSnapshot>) -> ResolverResult<Resolution> {
        if let Some(snapshot) = previous {
            if self.options.force_update {
                info!(project = %manifest.name, "update forced, ignoring lock");
            } else if is_stale(snapshot, manifest) {
                info!(project = %manifest.name, "manifest changed since lock, resolving");
            } else {
                info!(project = %manifest.name, packages = snapshot.len(), "lock is up to date");
                let warnings = self.validate_lock(snapshot).await?;
                return Ok(Resolution {
                    snapshot: snapshot.clone(),
                    warnings,
                    reused_lock: true,
                });
            }
        }
        self.resolve_graph(manifest).await
    }

    /// Compare a fresh lock with the cache without any network access
    async fn validate_lock(&self, snapshot: &LockSnapshot) -> ResolverResult<Vec<ResolutionWarning>> {
        let mut warnings = Vec::new();
        if !self.options.verify_lock {
            return Ok(warnings);
        }

        for package in &snapshot.packages {
            if self.options.cancel.is_cancelled() {
                return Err(GroveError::cancelled(&package.import_path));
            }
            let problem = match self.cache.acquire_local(&package.repository, package.vcs).await? {
                None => Some((WarningKind::LockMissing, "no cached working copy".to_string())),
                Some(handle) => match handle.backend().current_revision(handle.path()).await {
                    Ok(revision) if revision == package.revision => None,
                    Ok(revision) => Some((
                        WarningKind::LockDrift,
                        format!("checked out {} but locked at {}", revision, package.revision),
                    )),
                    Err(error) => Some((WarningKind::LockDrift, error.to_string())),
                },
            };
            if let Some((kind, message)) = problem {
                warn!(import_path = %package.import_path, kind = %kind, "{}", message);
                warnings.push(ResolutionWarning {
                    import_path: package.import_path.clone(),
                    kind,
                    message,
                });
            }
        }
        Ok(warnings)
    }

    async fn resolve_graph(&self, manifest: &Manifest) -> ResolverResult<Resolution> {
        let own_root = repository_root(&manifest.name);
        let frontier = Arc::new(Mutex::new(Frontier::seeded(&own_root)));
        let mut traversal = Traversal::default();

        for declaration in manifest.dependencies.iter().cloned().map(fold_onto_repository) {
            if declaration.import_path == own_root {
                continue;
            }
            frontier.lock().enqueue(&declaration.import_path);
            traversal
                .declarations
                .entry(declaration.import_path.clone())
                .or_default()
                .push(declaration);
        }

        let mut depth = 0usize;
        loop {
            if self.options.cancel.is_cancelled() {
                return Err(GroveError::cancelled(&manifest.name));
            }
            let paths = frontier.lock().take_level();
            if paths.is_empty() {
                break;
            }
            depth += 1;
            debug!(depth, paths = paths.len(), "resolving level");

            let jobs = traversal.reconcile_level(paths)?;
            let outcomes = self.fetch_level(jobs, &frontier).await?;
            traversal.absorb(outcomes)?;
        }

        let packages: Vec<ResolvedPackage> = traversal.pinned.into_values().collect();
        let graph = DependencyGraph::from_packages(&packages);
        for cycle in graph.detect_cycles() {
            debug!(cycle = %DependencyGraph::format_cycle(&cycle), "dependency cycle");
        }
        info!(
            project = %manifest.name,
            packages = packages.len(),
            edges = graph.dependency_count(),
            skipped = traversal.failed.len(),
            warnings = traversal.warnings.len(),
            "resolution complete"
        );

        Ok(Resolution {
            snapshot: LockSnapshot::new(compute_fingerprint(manifest), packages),
            warnings: traversal.warnings,
            reused_lock: false,
        })
    }

    /// Run one level's jobs on the worker pool, aborting them all on cancellation
    async fn fetch_level(
        &self,
        jobs: Vec<(String, Reconciled)>,
        frontier: &Arc<Mutex<Frontier>>,
    ) -> ResolverResult<LevelOutcomes> {
        let permits = Arc::new(Semaphore::new(self.options.workers.max(1)));
        let mut in_flight: BTreeSet<String> = BTreeSet::new();
        let mut tasks = JoinSet::new();

        for (path, reconciled) in jobs {
            in_flight.insert(path.clone());
            let resolver = self.clone();
            let permits = permits.clone();
            let frontier = frontier.clone();
            tasks.spawn(async move {
                let outcome = match permits.acquire_owned().await {
                    Ok(permit) => {
                        let outcome = resolver.fetch_node(&path, &reconciled, &frontier).await;
                        drop(permit);
                        outcome
                    },
                    Err(_) => Err(GroveError::cancelled(&path)),
                };
                (path, reconciled, outcome)
            });
        }

        let mut outcomes = BTreeMap::new();
        loop {
            let joined = tokio::select! {
                _ = self.options.cancel.cancelled() => {
                    tasks.abort_all();
                    let path = in_flight.into_iter().next().unwrap_or_default();
                    info!(import_path = %path, "resolution cancelled");
                    return Err(GroveError::cancelled(path));
                },
                joined = tasks.join_next() => joined,
            };
            let Some(joined) = joined else {
                break;
            };
            match joined {
                Ok((path, reconciled, outcome)) => {
                    in_flight.remove(&path);
                    outcomes.insert(path, (reconciled, outcome));
                },
                Err(error) if error.is_panic() => std::panic::resume_unwind(error.into_panic()),
                Err(_) => {
                    let path = in_flight.into_iter().next().unwrap_or_default();
                    return Err(GroveError::cancelled(path));
                },
            }
        }
        Ok(outcomes)
    }

    /// Fetch, pin and inspect one import path while holding its cache entry
    async fn fetch_node(
        &self,
        path: &str,
        reconciled: &Reconciled,
        frontier: &Mutex<Frontier>,
    ) -> ResolverResult<Fetched> {
        let mirrored = self.mirrors.resolve(&reconciled.repository);
        let kind = mirrored
            .vcs
            .or(reconciled.vcs)
            .unwrap_or_else(|| infer_vcs(&mirrored.url));
        if mirrored.matched {
            debug!(
                import_path = %path,
                declared = %reconciled.repository,
                mirror = %mirrored.url,
                "fetching through mirror"
            );
        }

        let (handle, selection) = self.checkout_pin(&mirrored.url, kind, &reconciled.constraint).await?;

        let requester = Requester::Package(path.to_string());
        let manifest = self.reader.read(handle.path(), &requester)?;
        let imports = discover(handle.path(), path, self.options.include_tests)?;
        drop(handle);

        let mut declarations: Vec<Declaration> = manifest
            .map(|m| m.dependencies)
            .unwrap_or_default()
            .into_iter()
            .map(fold_onto_repository)
            .collect();
        let declared: HashSet<String> = declarations.iter().map(|d| d.import_path.clone()).collect();
        declarations.extend(
            imports
                .into_iter()
                .filter(|import| !declared.contains(import))
                .map(|import| Declaration::new(import, Constraint::Any, requester.clone())),
        );
        declarations.retain(|d| d.import_path != path);

        {
            let mut frontier = frontier.lock();
            for declaration in &declarations {
                frontier.enqueue(&declaration.import_path);
            }
        }

        info!(
            import_path = %path,
            revision = %selection.revision,
            version = selection.tag.as_deref().unwrap_or("-"),
            dependencies = declarations.len(),
            "pinned package"
        );
        Ok(Fetched {
            url: mirrored.url,
            kind,
            selection,
            declarations,
        })
    }

    /// Check out the revision `constraint` selects, recloning once if the
    /// working copy turns out to be corrupt
    async fn checkout_pin(
        &self,
        url: &str,
        kind: VcsKind,
        constraint: &Constraint,
    ) -> ResolverResult<(CacheHandle, Selection)> {
        match self.try_checkout(url, kind, constraint).await {
            Err(error) if error.is_corruption() => {
                warn!(url = %url, error = %error, "corrupt working copy, recloning");
                self.cache.invalidate(url).await?;
                self.try_checkout(url, kind, constraint).await
            },
            outcome => outcome,
        }
    }

    async fn try_checkout(
        &self,
        url: &str,
        kind: VcsKind,
        constraint: &Constraint,
    ) -> ResolverResult<(CacheHandle, Selection)> {
        let handle = self.cache.acquire(url, kind).await?;
        let backend = handle.backend();
        let refs = backend.list_refs(handle.path()).await?;
        let mut selection = select_revision(constraint, &refs).ok_or_else(|| GroveError::RevisionNotFound {
            url: url.to_string(),
            revision: constraint.to_string(),
        })?;
        backend.checkout(handle.path(), &selection.revision).await?;
        // Lock the full id the tool reports, not an abbreviation from a declaration
        selection.revision = backend.current_revision(handle.path()).await?;
        Ok((handle, selection))
    }
}
