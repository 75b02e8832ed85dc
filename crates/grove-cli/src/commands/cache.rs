//! `grove cache` subcommands

use super::CommandContext;
use grove_core::error::GroveResult;

/// Remove every cached working copy and reset the index
pub fn clean(ctx: &CommandContext) -> GroveResult<()> {
    let cache = ctx.open_cache()?;
    let removed = cache.clean()?;
    ctx.output.success(&format!(
        "Removed {} cached repositor{} from {}",
        removed,
        if removed == 1 { "y" } else { "ies" },
        cache.root().display()
    ));
    Ok(())
}
