use std::path::PathBuf;

use thiserror::Error;

/// Convenience result type used across the crate.
pub type DataResult<T> = Result<T, DataError>;

/// Error type shared by ingestion, caching, and query operations.
///
/// Per-file ingestion errors are recovered inside the pipeline (the file is
/// skipped and reported); every other variant propagates to the caller.
#[derive(Debug, Error)]
pub enum DataError {
    /// Underlying I/O error (e.g. file not found, permission denied).
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Spreadsheet ingestion error.
    #[error("spreadsheet error: {0}")]
    Excel(#[from] calamine::Error),

    /// CSV ingestion error.
    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),

    /// Cache (de)serialization error.
    #[error("cache serialization error: {0}")]
    Parquet(#[from] parquet::errors::ParquetError),

    /// The file extension does not match any recognized source format.
    #[error("unsupported source format: {path}")]
    UnsupportedFormat { path: PathBuf },

    /// Every discovered source file failed to load. No partial dataset is
    /// produced in this case.
    #[error("no source file could be loaded ({attempted} attempted)")]
    NoFilesLoaded { attempted: usize },

    /// A query referenced a column that is not part of the loaded schema.
    ///
    /// Distinct from an empty result: this is a configuration/data problem.
    #[error("column '{column}' not present in the loaded dataset")]
    ColumnNotFound { column: String },

    /// A query was invoked while the dataset service is not ready.
    #[error("dataset not available: {reason}")]
    DataUnavailable { reason: String },
}

impl DataError {
    /// True when the error means the dataset is not ready (the caller may
    /// retry later), as opposed to a problem with the request itself.
    pub fn is_unavailable(&self) -> bool {
        matches!(self, DataError::DataUnavailable { .. })
    }
}
