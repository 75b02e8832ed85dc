//! `grove name`

use super::CommandContext;
use grove_config::load_manifest;
use grove_core::error::GroveResult;

/// Print the package name of the nearest manifest
pub fn execute(ctx: &CommandContext) -> GroveResult<()> {
    let manifest = load_manifest(&ctx.manifest_path()?)?;
    ctx.output.print(&manifest.name);
    Ok(())
}
