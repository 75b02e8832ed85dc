//! `grove install` and `grove update`

use super::CommandContext;
use grove_config::{load_manifest, load_mirror_table, TomlManifestReader};
use grove_core::error::GroveResult;
use grove_lockfile::{load_lock, save_lock, LOCK_FILE_NAME};
use grove_resolver::{Resolution, Resolver, ResolverOptions};
use std::path::Path;
use std::sync::Arc;
use tracing::info;

/// Resolve the nearest manifest and write grove.lock next to it.
///
/// With `force_update` a fresh lock is ignored and resolution starts from scratch.
pub async fn execute(force_update: bool, ctx: &CommandContext) -> GroveResult<()> {
    let manifest_path = ctx.manifest_path()?;
    let project_dir = manifest_path.parent().unwrap_or_else(|| Path::new("."));
    let manifest = load_manifest(&manifest_path)?;
    let lock_path = project_dir.join(LOCK_FILE_NAME);
    let lock = load_lock(&lock_path)?;

    ctx.output.step("🌱", &format!("Resolving {}", manifest.name));

    let mirrors = load_mirror_table(ctx.loader.mirrors_path().as_std_path())?;
    let options = ResolverOptions {
        workers: ctx.config.workers,
        include_tests: ctx.config.include_tests,
        force_update,
        verify_lock: ctx.config.verify_lock,
        cancel: ctx.cancel.clone(),
    };
    let resolver = Resolver::new(
        Arc::new(ctx.open_cache()?),
        Arc::new(mirrors),
        Arc::new(TomlManifestReader),
        options,
    );

    let resolution = resolver.resolve(&manifest, lock.as_ref()).await?;
    report(&resolution, ctx);

    let unchanged = resolution.reused_lock && lock.as_ref() == Some(&resolution.snapshot);
    if unchanged {
        ctx.output.success(&format!("{} is up to date", LOCK_FILE_NAME));
    } else {
        save_lock(&resolution.snapshot, &lock_path)?;
        info!(path = %lock_path.display(), packages = resolution.snapshot.len(), "wrote lock");
        ctx.output.success(&format!(
            "Locked {} package{} in {}",
            resolution.snapshot.len(),
            if resolution.snapshot.len() == 1 { "" } else { "s" },
            LOCK_FILE_NAME
        ));
    }
    Ok(())
}

fn report(resolution: &Resolution, ctx: &CommandContext) {
    for package in &resolution.snapshot.packages {
        let pin = match &package.version {
            Some(version) => format!("{} ({})", version, short(&package.revision)),
            None => short(&package.revision).to_string(),
        };
        ctx.output.info(&format!("  {} {}", package.import_path, pin));
    }
    for warning in &resolution.warnings {
        ctx.output
            .warn(&format!("{} [{}]: {}", warning.import_path, warning.kind, warning.message));
    }
}

fn short(revision: &str) -> &str {
    revision.get(..12).unwrap_or(revision)
}
