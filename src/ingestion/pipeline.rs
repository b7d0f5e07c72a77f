//! Ingestion pipeline: discover, load, merge.
//!
//! Runs once per load (startup or explicit reload). Each discovered file is
//! loaded and normalized independently on a bounded worker pool; one file's
//! failure never aborts its siblings. Successfully loaded tables are merged
//! by column-union concatenation into the unified table.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};

use rayon::ThreadPoolBuilder;
use rayon::prelude::*;

use crate::config::EngineConfig;
use crate::error::{DataError, DataResult};
use crate::table::{CANONICAL_COLUMNS, Table, Value};

use super::cache::FileCache;
use super::normalize::{normalize, optimize_types};
use super::observability::{FileContext, IngestionObserver, severity_for_error};
use super::source::{SourceFormat, read_raw};

/// Outcome of one source file within a load.
#[derive(Debug, Clone)]
pub struct FileOutcome {
    /// Source file name (base name, as stamped into `arquivo_origem`).
    pub file_name: String,
    /// Rows contributed to the merge. Zero when the file failed.
    pub rows: usize,
    /// Whether the normalized table came from the parquet cache.
    pub from_cache: bool,
    /// Failure message when the file was skipped.
    pub error: Option<String>,
}

impl FileOutcome {
    /// Whether this file contributed rows to the unified table.
    pub fn succeeded(&self) -> bool {
        self.error.is_none()
    }
}

/// Observability summary of one completed load.
#[derive(Debug, Clone)]
pub struct LoadReport {
    /// Rows in the unified table.
    pub row_count: usize,
    /// Columns in the unified table.
    pub column_count: usize,
    /// Wall-clock duration of the load.
    pub elapsed: Duration,
    /// Per-file outcomes, including skipped files.
    pub files: Vec<FileOutcome>,
}

impl LoadReport {
    /// Number of files merged into the table.
    pub fn files_loaded(&self) -> usize {
        self.files.iter().filter(|f| f.succeeded()).count()
    }

    /// Number of files skipped for errors.
    pub fn files_failed(&self) -> usize {
        self.files.len() - self.files_loaded()
    }
}

/// Loads every recognized source file under the configured data directory
/// into one unified [`Table`].
pub struct IngestionPipeline {
    config: EngineConfig,
    cache: FileCache,
    observer: Option<Arc<dyn IngestionObserver>>,
}

impl IngestionPipeline {
    /// Build a pipeline from configuration.
    pub fn new(config: EngineConfig) -> Self {
        let cache = if config.cache_enabled {
            FileCache::new(&config.cache_dir, true)
        } else {
            FileCache::disabled()
        };
        Self {
            config,
            cache,
            observer: None,
        }
    }

    /// Attach an observer for per-file and whole-load events.
    pub fn with_observer(mut self, observer: Arc<dyn IngestionObserver>) -> Self {
        self.observer = Some(observer);
        self
    }

    /// Discover, load, normalize, and merge all source files.
    ///
    /// - Missing data directory: created, empty canonical table returned.
    /// - Directory with no recognized files: empty canonical table.
    /// - Some files fail: they are reported and excluded.
    /// - Every file fails: [`DataError::NoFilesLoaded`].
    pub fn load_all(&self) -> DataResult<(Table, LoadReport)> {
        let start = Instant::now();
        let files = self.discover()?;

        if files.is_empty() {
            let table = Table::empty_canonical();
            let report = LoadReport {
                row_count: 0,
                column_count: table.column_count(),
                elapsed: start.elapsed(),
                files: Vec::new(),
            };
            return Ok((table, report));
        }

        let workers = self.config.max_workers.min(files.len()).max(1);
        let pool = ThreadPoolBuilder::new()
            .num_threads(workers)
            .build()
            .map_err(|e| std::io::Error::other(e.to_string()))?;

        let results: Vec<(PathBuf, DataResult<(Table, bool)>)> = pool.install(|| {
            files
                .par_iter()
                .map(|path| (path.clone(), self.load_one(path)))
                .collect()
        });

        let mut outcomes = Vec::with_capacity(results.len());
        let mut loaded: Vec<Table> = Vec::new();
        for (path, result) in results {
            let file_name = base_name(&path);
            match result {
                Ok((table, from_cache)) => {
                    outcomes.push(FileOutcome {
                        file_name,
                        rows: table.row_count(),
                        from_cache,
                        error: None,
                    });
                    loaded.push(table);
                }
                Err(err) => {
                    outcomes.push(FileOutcome {
                        file_name,
                        rows: 0,
                        from_cache: false,
                        error: Some(err.to_string()),
                    });
                }
            }
        }

        if loaded.is_empty() {
            return Err(DataError::NoFilesLoaded {
                attempted: outcomes.len(),
            });
        }

        let table = merge(loaded);
        let report = LoadReport {
            row_count: table.row_count(),
            column_count: table.column_count(),
            elapsed: start.elapsed(),
            files: outcomes,
        };
        if let Some(obs) = &self.observer {
            obs.on_load_finished(&report);
        }
        Ok((table, report))
    }

    /// Candidate files in the data directory, sorted for determinism.
    fn discover(&self) -> DataResult<Vec<PathBuf>> {
        if !self.config.data_dir.exists() {
            std::fs::create_dir_all(&self.config.data_dir)?;
            return Ok(Vec::new());
        }

        let mut files = Vec::new();
        for format in SourceFormat::ALL {
            let pattern = self
                .config
                .data_dir
                .join(format.glob_pattern())
                .to_string_lossy()
                .into_owned();
            let paths = glob::glob(&pattern)
                .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidInput, e))?;
            files.extend(paths.filter_map(Result::ok));
        }
        files.sort();
        Ok(files)
    }

    /// Load one file, via the cache where possible.
    fn load_one(&self, path: &PathBuf) -> DataResult<(Table, bool)> {
        let ctx = FileContext::new(path);
        let identity = FileCache::identity(path);

        if let Some(identity) = identity.as_deref() {
            if let Some(table) = self.cache.load(path, identity) {
                if let Some(obs) = &self.observer {
                    obs.on_file_loaded(&ctx, table.row_count(), true);
                }
                return Ok((table, true));
            }
        }

        let result = read_raw(path).map(|raw| normalize(&raw, &base_name(path)));
        match result {
            Ok(table) => {
                if let Some(identity) = identity.as_deref() {
                    if let Err(err) = self.cache.store(path, identity, &table) {
                        if let Some(obs) = &self.observer {
                            obs.on_cache_write_failed(&ctx, &err);
                        }
                    }
                }
                if let Some(obs) = &self.observer {
                    obs.on_file_loaded(&ctx, table.row_count(), false);
                }
                Ok((table, false))
            }
            Err(err) => {
                if let Some(obs) = &self.observer {
                    obs.on_file_failed(&ctx, severity_for_error(&err), &err);
                }
                Err(err)
            }
        }
    }
}

fn base_name(path: &PathBuf) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.to_string_lossy().into_owned())
}

/// Merge per-file tables by column-union concatenation.
///
/// The merged column set is the union of per-file columns, in canonical
/// order; rows from files missing a column get [`Value::Absent`] there (count
/// columns are then zero-filled by the type optimization pass). Rows keep
/// their within-file order.
fn merge(tables: Vec<Table>) -> Table {
    let columns: Vec<String> = CANONICAL_COLUMNS
        .iter()
        .map(|def| def.name)
        .filter(|name| tables.iter().any(|t| t.has_column(name)))
        .map(str::to_string)
        .collect();

    let total_rows: usize = tables.iter().map(Table::row_count).sum();
    let mut rows = Vec::with_capacity(total_rows);
    for table in tables {
        // union index -> this table's column index
        let mapping: Vec<Option<usize>> = columns
            .iter()
            .map(|name| table.column_index(name))
            .collect();
        for row in table.rows {
            let merged_row: Vec<Value> = mapping
                .iter()
                .map(|src| match src {
                    Some(idx) => row[*idx].clone(),
                    None => Value::Absent,
                })
                .collect();
            rows.push(merged_row);
        }
    }

    let mut merged = Table::new(columns, rows);
    optimize_types(&mut merged);
    merged
}
