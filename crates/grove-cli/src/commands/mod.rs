//! Command implementations and dispatch logic.
//!
//! Each command is an async function taking the shared `CommandContext`.

use grove_cache::{CacheOptions, RepositoryCache};
use grove_config::{find_manifest, ConfigLayering, ConfigLoader, GroveConfig, MANIFEST_FILE_NAME};
use grove_core::error::{GroveError, GroveResult};
use grove_vcs::Backends;
use std::collections::HashMap;
use std::path::PathBuf;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

pub mod cache;
pub mod install;
pub mod mirror;
pub mod name;

#[cfg(test)]
mod tests;

use crate::{CacheAction, Commands, MirrorAction, output::OutputHandler};

/// Shared context for all commands
pub struct CommandContext {
    pub cwd: PathBuf,
    pub output: OutputHandler,
    pub loader: ConfigLoader,
    /// Global configuration with environment and flag overrides applied
    pub config: GroveConfig,
    pub backends: Backends,
    /// Cancelled on Ctrl-C
    pub cancel: CancellationToken,
}

impl CommandContext {
    /// Create a new command context, layering `cli_overrides` over the global config
    pub async fn new(cli_overrides: &HashMap<String, String>) -> GroveResult<Self> {
        let cwd = std::env::current_dir().map_err(|e| GroveError::io("Failed to get current directory", e))?;

        let loader = ConfigLoader::from_env()?;
        let global = loader.load_global_config().await?;
        let config = ConfigLayering::merge_configs(global, &ConfigLayering::collect_env_overrides(), cli_overrides)?;
        debug!(home = %loader.home(), workers = config.workers, "loaded configuration");

        Ok(Self {
            cwd,
            output: OutputHandler::new(),
            loader,
            config,
            backends: Backends::system(),
            cancel: CancellationToken::new(),
        })
    }

    /// Nearest grove.toml at or above the working directory
    pub fn manifest_path(&self) -> GroveResult<PathBuf> {
        find_manifest(&self.cwd).ok_or_else(|| GroveError::ManifestInvalid {
            path: self.cwd.join(MANIFEST_FILE_NAME).display().to_string(),
            message: "no grove.toml found in this directory or any parent".to_string(),
        })
    }

    /// Open the repository cache described by the configuration
    pub fn open_cache(&self) -> GroveResult<RepositoryCache> {
        let options = CacheOptions {
            grace_period: self.config.grace_period(),
            retry: self.config.retry_config(),
        };
        RepositoryCache::open(self.loader.cache_dir(&self.config), self.backends.clone(), options)
    }
}

/// Dispatch a command to its handler
pub async fn dispatch_command(command: Commands, ctx: &CommandContext) -> GroveResult<()> {
    match command {
        Commands::Install { .. } => {
            info!("Installing dependencies");
            install::execute(false, ctx).await
        },
        Commands::Update { .. } => {
            info!("Updating dependencies");
            install::execute(true, ctx).await
        },
        Commands::Name => name::execute(ctx),
        Commands::Mirror { action } => match action {
            MirrorAction::List => mirror::list(ctx),
            MirrorAction::Set { original, repo, vcs } => mirror::set(original, repo, vcs, ctx),
            MirrorAction::Remove { original } => mirror::remove(&original, ctx),
        },
        Commands::Cache { action } => match action {
            CacheAction::Clean => cache::clean(ctx),
        },
    }
}
