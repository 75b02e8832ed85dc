//! Global configuration layering and environment overrides
//!
//! Precedence, lowest first: built-in defaults, `~/.grove/config.toml`,
//! `GROVE_*` environment variables, command-line flags.

use crate::mirrors::MIRRORS_FILE_NAME;
use crate::ConfigResult;
use camino::{Utf8Path, Utf8PathBuf};
use grove_core::GroveError;
use grove_vcs::RetryConfig;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::str::FromStr;
use std::time::Duration;
use tracing::debug;

const HOME_DIR_NAME: &str = ".grove";
const CONFIG_FILE_NAME: &str = "config.toml";
const CACHE_DIR_NAME: &str = "cache";
const ENV_PREFIX: &str = "GROVE_";

/// Global grove settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GroveConfig {
    /// Repository cache location; `<home>/cache` when unset
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cache_dir: Option<Utf8PathBuf>,
    pub workers: usize,
    /// Cached repositories synced more recently than this are not fetched
    pub grace_period_secs: u64,
    pub max_retries: u32,
    pub retry_initial_delay_ms: u64,
    pub retry_max_delay_ms: u64,
    pub verify_lock: bool,
    pub include_tests: bool,
}

impl Default for GroveConfig {
    fn default() -> Self {
        Self {
            cache_dir: None,
            workers: 8,
            grace_period_secs: 0,
            max_retries: 3,
            retry_initial_delay_ms: 200,
            retry_max_delay_ms: 10_000,
            verify_lock: true,
            include_tests: false,
        }
    }
}

impl GroveConfig {
    pub fn grace_period(&self) -> Duration {
        Duration::from_secs(self.grace_period_secs)
    }

    /// Backoff policy for network operations
    pub fn retry_config(&self) -> RetryConfig {
        RetryConfig {
            max_retries: self.max_retries,
            initial_delay: Duration::from_millis(self.retry_initial_delay_ms),
            max_delay: Duration::from_millis(self.retry_max_delay_ms),
            ..RetryConfig::default()
        }
    }

    /// Check value ranges
    pub fn validate(&self) -> ConfigResult<()> {
        if self.workers == 0 {
            return Err(GroveError::ConfigValidation {
                field: "workers".to_string(),
                reason: "must be at least 1".to_string(),
            });
        }
        if self.retry_initial_delay_ms > self.retry_max_delay_ms {
            return Err(GroveError::ConfigValidation {
                field: "retry_initial_delay_ms".to_string(),
                reason: format!("must not exceed retry_max_delay_ms ({})", self.retry_max_delay_ms),
            });
        }
        Ok(())
    }
}

/// Locates grove's home directory and the files inside it
#[derive(Debug, Clone, PartialEq)]
pub struct ConfigLoader {
    home: Utf8PathBuf,
}

impl ConfigLoader {
    /// Create a loader rooted at an explicit home directory
    pub fn new(home: Utf8PathBuf) -> Self {
        Self { home }
    }

    /// `$GROVE_HOME`, or `~/.grove`
    pub fn from_env() -> ConfigResult<Self> {
        if let Ok(home) = std::env::var("GROVE_HOME") {
            if !home.trim().is_empty() {
                return Ok(Self::new(Utf8PathBuf::from(home)));
            }
        }

        let home_dir = dirs::home_dir().ok_or_else(|| GroveError::ConfigValidation {
            field: "home_dir".to_string(),
            reason: "Could not determine home directory".to_string(),
        })?;
        let home_dir = Utf8PathBuf::try_from(home_dir).map_err(|e| GroveError::ConfigValidation {
            field: "home_dir".to_string(),
            reason: format!("Invalid home directory path: {}", e),
        })?;
        Ok(Self::new(home_dir.join(HOME_DIR_NAME)))
    }

    pub fn home(&self) -> &Utf8Path {
        &self.home
    }

    pub fn config_path(&self) -> Utf8PathBuf {
        self.home.join(CONFIG_FILE_NAME)
    }

    pub fn mirrors_path(&self) -> Utf8PathBuf {
        self.home.join(MIRRORS_FILE_NAME)
    }

    /// Cache directory from `config`, falling back to `<home>/cache`
    pub fn cache_dir(&self, config: &GroveConfig) -> Utf8PathBuf {
        config
            .cache_dir
            .clone()
            .unwrap_or_else(|| self.home.join(CACHE_DIR_NAME))
    }

    /// Load the global configuration file; defaults when it does not exist
    pub async fn load_global_config(&self) -> ConfigResult<GroveConfig> {
        let path = self.config_path();
        let content = match tokio::fs::read_to_string(&path).await {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!(path = %path, "no global config, using defaults");
                return Ok(GroveConfig::default());
            },
            Err(e) => return Err(GroveError::io(format!("Failed to read {}", path), e)),
        };

        toml::from_str(&content).map_err(|e| GroveError::ConfigValidation {
            field: path.to_string(),
            reason: e.to_string(),
        })
    }
}

/// Configuration layering and merging
pub struct ConfigLayering;

fn parse_value<T: FromStr>(field: &str, value: &str) -> ConfigResult<T>
where
    T::Err: std::fmt::Display,
{
    value.trim().parse().map_err(|e: T::Err| GroveError::ConfigValidation {
        field: field.to_string(),
        reason: format!("'{}': {}", value, e),
    })
}

impl ConfigLayering {
    /// Apply environment then command-line overrides on top of `global`
    pub fn merge_configs(
        global: GroveConfig,
        env_overrides: &HashMap<String, String>,
        cli_overrides: &HashMap<String, String>,
    ) -> ConfigResult<GroveConfig> {
        let mut merged = global;
        Self::apply_env_overrides(&mut merged, env_overrides)?;
        Self::apply_cli_overrides(&mut merged, cli_overrides)?;
        merged.validate()?;
        Ok(merged)
    }

    fn apply_env_overrides(config: &mut GroveConfig, overrides: &HashMap<String, String>) -> ConfigResult<()> {
        for (key, value) in overrides {
            match key.as_str() {
                "GROVE_CACHE_DIR" => config.cache_dir = Some(Utf8PathBuf::from(value)),
                "GROVE_WORKERS" => config.workers = parse_value(key, value)?,
                "GROVE_GRACE_PERIOD" => config.grace_period_secs = parse_value(key, value)?,
                // GROVE_HOME is consumed by ConfigLoader
                _ => {},
            }
        }
        Ok(())
    }

    fn apply_cli_overrides(config: &mut GroveConfig, overrides: &HashMap<String, String>) -> ConfigResult<()> {
        for (key, value) in overrides {
            match key.as_str() {
                "cache-dir" => config.cache_dir = Some(Utf8PathBuf::from(value)),
                "workers" => config.workers = parse_value(key, value)?,
                "grace-period" => config.grace_period_secs = parse_value(key, value)?,
                "include-tests" => config.include_tests = parse_value(key, value)?,
                "verify-lock" => config.verify_lock = parse_value(key, value)?,
                _ => {},
            }
        }
        Ok(())
    }

    /// Collect `GROVE_*` environment variables
    pub fn collect_env_overrides() -> HashMap<String, String> {
        std::env::vars()
            .filter(|(key, _)| key.starts_with(ENV_PREFIX))
            .collect()
    }
}
