//! Engine configuration.
//!
//! Plain options struct with [`Default`] for embedding, plus
//! [`EngineConfig::from_env`] for processes that detect their environment at
//! boot. Path selection between "persistent" and "ephemeral" environments is
//! the caller's concern; the engine only consumes the resulting paths.

use std::env;
use std::path::PathBuf;

/// Environment variable naming the source file directory.
pub const DATA_DIR_ENV: &str = "SINESP_DATA_DIR";
/// Environment variable naming the parquet cache directory.
pub const CACHE_DIR_ENV: &str = "SINESP_CACHE_DIR";
/// When set to `1`, assume an ephemeral filesystem: cache under the OS temp
/// directory and halve the ingestion worker bound.
pub const EPHEMERAL_ENV: &str = "SINESP_EPHEMERAL";

/// Configuration for the ingestion pipeline and dataset service.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Directory scanned for source files. Created if missing.
    pub data_dir: PathBuf,
    /// Directory holding per-file parquet caches.
    pub cache_dir: PathBuf,
    /// Upper bound on parallel file-loading workers. The effective worker
    /// count is additionally clamped to the number of discovered files.
    pub max_workers: usize,
    /// Disable to always re-parse sources (e.g. read-only filesystems where
    /// cache writes would fail anyway).
    pub cache_enabled: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("dados"),
            cache_dir: PathBuf::from("cache"),
            max_workers: 4,
            cache_enabled: true,
        }
    }
}

impl EngineConfig {
    /// Build a configuration from environment variables, falling back to
    /// [`Default`] for anything unset.
    pub fn from_env() -> Self {
        let mut cfg = Self::default();

        if env::var(EPHEMERAL_ENV).as_deref() == Ok("1") {
            cfg.cache_dir = env::temp_dir().join("sinesp-cache");
            cfg.max_workers = 2;
        }
        if let Ok(dir) = env::var(DATA_DIR_ENV) {
            cfg.data_dir = PathBuf::from(dir);
        }
        if let Ok(dir) = env::var(CACHE_DIR_ENV) {
            cfg.cache_dir = PathBuf::from(dir);
        }

        cfg
    }

    /// Override the data directory.
    pub fn with_data_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.data_dir = dir.into();
        self
    }

    /// Override the cache directory.
    pub fn with_cache_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.cache_dir = dir.into();
        self
    }

    /// Override the worker bound.
    ///
    /// # Panics
    ///
    /// Panics if `workers == 0`.
    pub fn with_max_workers(mut self, workers: usize) -> Self {
        assert!(workers > 0, "max_workers must be > 0");
        self.max_workers = workers;
        self
    }

    /// Enable or disable the on-disk file cache.
    pub fn with_cache_enabled(mut self, enabled: bool) -> Self {
        self.cache_enabled = enabled;
        self
    }
}
