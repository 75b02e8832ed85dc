//! `grove mirror` subcommands, editing the persisted mirrors file

use super::CommandContext;
use grove_config::{load_mirrors, remove_mirror, save_mirrors, set_mirror};
use grove_core::error::GroveResult;
use grove_core::utils::normalize_url;
use grove_core::VcsKind;
use grove_vcs::mirror::builtin_entries;
use grove_vcs::{MirrorEntry, MirrorTable};

fn describe(entry: &MirrorEntry) -> String {
    match entry.vcs {
        Some(vcs) => format!("{} -> {} ({})", entry.pattern, entry.replacement, vcs),
        None => format!("{} -> {}", entry.pattern, entry.replacement),
    }
}

/// Print every effective mirror, marking built-in redirects
pub fn list(ctx: &CommandContext) -> GroveResult<()> {
    let persisted = load_mirrors(ctx.loader.mirrors_path().as_std_path())?;
    let table = MirrorTable::with_builtins(persisted.clone())?;

    for entry in table.entries() {
        let line = describe(entry);
        if persisted.iter().any(|p| normalize_url(&p.pattern) == entry.pattern) {
            ctx.output.print(&line);
        } else {
            ctx.output.print(&format!("{} [built-in]", line));
        }
    }
    Ok(())
}

/// Add or replace the mirror for `original`
pub fn set(original: String, repo: String, vcs: Option<VcsKind>, ctx: &CommandContext) -> GroveResult<()> {
    let path = ctx.loader.mirrors_path();
    let mut entries = load_mirrors(path.as_std_path())?;
    let entry = MirrorEntry::new(original, repo, vcs);
    let line = describe(&entry);

    let replaced = set_mirror(&mut entries, entry);
    // Rejects entries whose redirects loop
    MirrorTable::with_builtins(entries.clone())?;
    save_mirrors(path.as_std_path(), &entries)?;

    match replaced {
        Some(old) => ctx.output.success(&format!("Replaced {} with {}", describe(&old), line)),
        None => ctx.output.success(&format!("Added {}", line)),
    }
    Ok(())
}

/// Remove the persisted mirror for `original`
pub fn remove(original: &str, ctx: &CommandContext) -> GroveResult<()> {
    let path = ctx.loader.mirrors_path();
    let mut entries = load_mirrors(path.as_std_path())?;

    if !remove_mirror(&mut entries, original) {
        let key = normalize_url(original);
        if builtin_entries().iter().any(|b| normalize_url(&b.pattern) == key) {
            ctx.output.warn(&format!("{} is a built-in redirect and cannot be removed", original));
        } else {
            ctx.output.warn(&format!("No mirror configured for {}", original));
        }
        return Ok(());
    }

    save_mirrors(path.as_std_path(), &entries)?;
    ctx.output.success(&format!("Removed mirror for {}", original));
    Ok(())
}
