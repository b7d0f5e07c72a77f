//! Observer hooks for ingestion outcomes.
//!
//! The pipeline recovers per-file failures locally; observers are how those
//! recoveries (and cache behavior) become visible. Implementors can record
//! metrics, logs, or trigger alerts.

use std::fmt;
use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::{SystemTime, UNIX_EPOCH};

use crate::error::DataError;

use super::pipeline::LoadReport;
use super::source::SourceFormat;

/// Severity classification for per-file failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum IngestionSeverity {
    /// Informational event.
    Info,
    /// Non-fatal event (e.g. a failed cache write).
    Warning,
    /// A file failed to load and was skipped.
    Error,
    /// Infrastructure failure (typically I/O).
    Critical,
}

/// Context about one source file being ingested.
#[derive(Debug, Clone)]
pub struct FileContext {
    /// Path of the source file.
    pub path: PathBuf,
    /// Detected format, if the extension was recognized.
    pub format: Option<SourceFormat>,
}

impl FileContext {
    pub(crate) fn new(path: &Path) -> Self {
        Self {
            path: path.to_path_buf(),
            format: SourceFormat::from_path(path),
        }
    }
}

/// Classify a per-file error for alerting purposes.
pub fn severity_for_error(e: &DataError) -> IngestionSeverity {
    match e {
        DataError::Io(_) => IngestionSeverity::Critical,
        DataError::Csv(err) => match err.kind() {
            csv::ErrorKind::Io(_) => IngestionSeverity::Critical,
            _ => IngestionSeverity::Error,
        },
        _ => IngestionSeverity::Error,
    }
}

/// Observer interface for ingestion outcomes.
pub trait IngestionObserver: Send + Sync {
    /// A file was loaded and normalized (or restored from cache).
    fn on_file_loaded(&self, _ctx: &FileContext, _rows: usize, _from_cache: bool) {}

    /// A file failed and was excluded from the merge.
    fn on_file_failed(&self, _ctx: &FileContext, _severity: IngestionSeverity, _error: &DataError) {}

    /// A cache write failed; the load itself proceeded uncached.
    fn on_cache_write_failed(&self, _ctx: &FileContext, _error: &DataError) {}

    /// The whole load finished (successfully).
    fn on_load_finished(&self, _report: &LoadReport) {}
}

/// Fans callbacks out to a list of observers.
#[derive(Default)]
pub struct CompositeObserver {
    observers: Vec<Arc<dyn IngestionObserver>>,
}

impl CompositeObserver {
    /// Create a composite from a list of observers.
    pub fn new(observers: Vec<Arc<dyn IngestionObserver>>) -> Self {
        Self { observers }
    }
}

impl fmt::Debug for CompositeObserver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CompositeObserver")
            .field("observers_len", &self.observers.len())
            .finish()
    }
}

impl IngestionObserver for CompositeObserver {
    fn on_file_loaded(&self, ctx: &FileContext, rows: usize, from_cache: bool) {
        for o in &self.observers {
            o.on_file_loaded(ctx, rows, from_cache);
        }
    }

    fn on_file_failed(&self, ctx: &FileContext, severity: IngestionSeverity, error: &DataError) {
        for o in &self.observers {
            o.on_file_failed(ctx, severity, error);
        }
    }

    fn on_cache_write_failed(&self, ctx: &FileContext, error: &DataError) {
        for o in &self.observers {
            o.on_cache_write_failed(ctx, error);
        }
    }

    fn on_load_finished(&self, report: &LoadReport) {
        for o in &self.observers {
            o.on_load_finished(report);
        }
    }
}

/// Logs ingestion events to stderr.
#[derive(Debug, Default)]
pub struct StdErrObserver {
    min_severity: Option<IngestionSeverity>,
}

impl StdErrObserver {
    /// Only report failures at or above `severity`. Loads, cache warnings,
    /// and the final report are always printed.
    pub fn with_min_severity(mut self, severity: IngestionSeverity) -> Self {
        self.min_severity = Some(severity);
        self
    }
}

impl IngestionObserver for StdErrObserver {
    fn on_file_loaded(&self, ctx: &FileContext, rows: usize, from_cache: bool) {
        let origin = if from_cache { "cache" } else { "parsed" };
        eprintln!(
            "[ingest][ok] path={} rows={rows} source={origin}",
            ctx.path.display()
        );
    }

    fn on_file_failed(&self, ctx: &FileContext, severity: IngestionSeverity, error: &DataError) {
        if self.min_severity.is_some_and(|min| severity < min) {
            return;
        }
        eprintln!(
            "[ingest][{severity:?}] path={} err={error}",
            ctx.path.display()
        );
    }

    fn on_cache_write_failed(&self, ctx: &FileContext, error: &DataError) {
        eprintln!(
            "[ingest][Warning] cache write failed path={} err={error}",
            ctx.path.display()
        );
    }

    fn on_load_finished(&self, report: &LoadReport) {
        eprintln!(
            "[ingest][done] rows={} files_ok={} files_failed={} elapsed={:?}",
            report.row_count,
            report.files_loaded(),
            report.files_failed(),
            report.elapsed
        );
    }
}

/// Appends ingestion events to a local log file.
///
/// Writes are best-effort; failures to open or write the log are ignored.
#[derive(Debug)]
pub struct FileObserver {
    path: PathBuf,
    lock: Mutex<()>,
}

impl FileObserver {
    /// Create a file observer appending to `path`.
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            lock: Mutex::new(()),
        }
    }

    fn append_line(&self, line: &str) {
        let _guard = self.lock.lock().ok();
        if let Ok(mut f) = OpenOptions::new().create(true).append(true).open(&self.path) {
            let _ = writeln!(f, "{line}");
        }
    }
}

impl IngestionObserver for FileObserver {
    fn on_file_loaded(&self, ctx: &FileContext, rows: usize, from_cache: bool) {
        self.append_line(&format!(
            "{} ok path={} rows={rows} from_cache={from_cache}",
            unix_ts(),
            ctx.path.display()
        ));
    }

    fn on_file_failed(&self, ctx: &FileContext, severity: IngestionSeverity, error: &DataError) {
        self.append_line(&format!(
            "{} fail severity={severity:?} path={} err={error}",
            unix_ts(),
            ctx.path.display()
        ));
    }

    fn on_cache_write_failed(&self, ctx: &FileContext, error: &DataError) {
        self.append_line(&format!(
            "{} cache-write-fail path={} err={error}",
            unix_ts(),
            ctx.path.display()
        ));
    }

    fn on_load_finished(&self, report: &LoadReport) {
        self.append_line(&format!(
            "{} done rows={} files_ok={} files_failed={} elapsed={:?}",
            unix_ts(),
            report.row_count,
            report.files_loaded(),
            report.files_failed(),
            report.elapsed
        ));
    }
}

fn unix_ts() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs()
}
