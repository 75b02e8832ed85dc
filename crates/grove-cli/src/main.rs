//! # grove-cli
//!
//! Entry point for the `grove` dependency manager. Parses the command line,
//! installs logging, layers configuration and dispatches to a command
//! handler.

use anyhow::Context;
use clap::{Parser, Subcommand};
use grove_core::VcsKind;
use std::collections::HashMap;
use std::process::ExitCode;
use tracing::{debug, error};

mod commands;
mod output;

use commands::CommandContext;
use output::errors::ErrorFormatter;

/// Reproducible source dependencies pinned from version control
#[derive(Parser)]
#[command(name = "grove", version, about = "Source dependency manager")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Maximum number of repositories fetched at once
    #[arg(long, global = true)]
    pub workers: Option<usize>,

    /// Repository cache directory
    #[arg(long, global = true)]
    pub cache_dir: Option<String>,

    /// Skip fetching repositories synced within this many seconds
    #[arg(long, global = true)]
    pub grace_period: Option<u64>,
}

impl Cli {
    /// Flags that override the layered configuration, keyed like the config layer expects
    fn overrides(&self) -> HashMap<String, String> {
        let mut overrides = HashMap::new();
        if let Some(workers) = self.workers {
            overrides.insert("workers".to_string(), workers.to_string());
        }
        if let Some(dir) = &self.cache_dir {
            overrides.insert("cache-dir".to_string(), dir.clone());
        }
        if let Some(secs) = self.grace_period {
            overrides.insert("grace-period".to_string(), secs.to_string());
        }
        if let Commands::Install { include_tests: true, .. } | Commands::Update { include_tests: true } =
            &self.command
        {
            overrides.insert("include-tests".to_string(), "true".to_string());
        }
        if let Commands::Install { no_verify: true, .. } = &self.command {
            overrides.insert("verify-lock".to_string(), "false".to_string());
        }
        overrides
    }
}

#[derive(Subcommand)]
pub enum Commands {
    /// Resolve dependencies, reusing grove.lock when it is up to date
    Install {
        /// Also follow imports of test files
        #[arg(long)]
        include_tests: bool,
        /// Reuse a fresh lock without checking cached working copies
        #[arg(long)]
        no_verify: bool,
    },
    /// Resolve from scratch and rewrite grove.lock
    Update {
        #[arg(long)]
        include_tests: bool,
    },
    /// Print the package name of the nearest grove.toml
    Name,
    /// Manage repository mirrors
    Mirror {
        #[command(subcommand)]
        action: MirrorAction,
    },
    /// Manage the repository cache
    Cache {
        #[command(subcommand)]
        action: CacheAction,
    },
}

#[derive(Subcommand)]
pub enum MirrorAction {
    /// List configured mirrors
    List,
    /// Redirect a repository URL (and everything below it) to another
    Set {
        original: String,
        repo: String,
        #[arg(long)]
        vcs: Option<VcsKind>,
    },
    /// Remove the mirror for a repository URL
    Remove { original: String },
}

#[derive(Subcommand)]
pub enum CacheAction {
    /// Remove every cached working copy
    Clean,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    setup_logging(cli.verbose);
    debug!("Starting grove v{}", env!("CARGO_PKG_VERSION"));

    match run_cli(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            let formatter = ErrorFormatter::new();
            match e.downcast_ref::<grove_core::GroveError>() {
                Some(grove_error) => eprint!("{}", formatter.format_error(grove_error)),
                None => eprintln!("{}", formatter.format_simple(&format!("{:#}", e))),
            }
            ExitCode::FAILURE
        },
    }
}

fn run_cli(cli: Cli) -> anyhow::Result<()> {
    let rt = tokio::runtime::Runtime::new().context("Failed to create async runtime")?;

    rt.block_on(async {
        let ctx = CommandContext::new(&cli.overrides()).await?;

        let cancel = ctx.cancel.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                error!("interrupted, cancelling");
                cancel.cancel();
            }
        });

        commands::dispatch_command(cli.command, &ctx).await?;
        Ok::<(), anyhow::Error>(())
    })
}

fn setup_logging(verbose: bool) {
    let level = if verbose { "debug" } else { "warn" };
    let filter = tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        tracing_subscriber::EnvFilter::new(format!(
            "grove_cli={level},grove_core={level},grove_vcs={level},grove_cache={level},\
             grove_lockfile={level},grove_resolver={level},grove_config={level}"
        ))
    });

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}
