//! Ledger configuration.
//!
//! [`LedgerConfig`] has sensible defaults and can be layered from an optional
//! TOML file and `ACCRUE_*` environment variables, in that order of
//! precedence (environment wins).

use std::path::{Path, PathBuf};

use serde::Deserialize;

use accrue_core::constants::{CONFIG_ENV_PREFIX, DEFAULT_INITIAL_GLOBAL_RATE, DEFAULT_LOG_LEVEL};

/// Configuration for a ledger instance.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct LedgerConfig {
    /// Root directory for persistent data.
    pub data_dir: PathBuf,
    /// Global rate written to a fresh store. Ignored once a rate is persisted.
    pub initial_global_rate: u64,
    /// Log level filter string (e.g. "info", "debug", "accrue_ledger=trace").
    pub log_level: String,
    /// Log output format: "text" or "json".
    pub log_format: String,
}

impl Default for LedgerConfig {
    fn default() -> Self {
        let data_dir = dirs::data_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("accrue");

        Self {
            data_dir,
            initial_global_rate: DEFAULT_INITIAL_GLOBAL_RATE,
            log_level: DEFAULT_LOG_LEVEL.to_string(),
            log_format: "text".to_string(),
        }
    }
}

impl LedgerConfig {
    /// Load defaults, then `file` (if given, must exist), then environment.
    pub fn load(file: Option<&Path>) -> Result<Self, config::ConfigError> {
        Self::load_with_env(file, config::Environment::with_prefix(CONFIG_ENV_PREFIX))
    }

    fn load_with_env(
        file: Option<&Path>,
        env: config::Environment,
    ) -> Result<Self, config::ConfigError> {
        let defaults = Self::default();
        let mut builder = config::Config::builder()
            .set_default("data_dir", defaults.data_dir.to_string_lossy().to_string())?
            .set_default("initial_global_rate", defaults.initial_global_rate)?
            .set_default("log_level", defaults.log_level)?
            .set_default("log_format", defaults.log_format)?;

        if let Some(path) = file {
            builder = builder.add_source(config::File::from(path).required(true));
        }

        builder
            .add_source(env.try_parsing(true))
            .build()?
            .try_deserialize()
    }

    /// Path to the RocksDB ledger directory.
    pub fn db_path(&self) -> PathBuf {
        self.data_dir.join("ledger")
    }
}
