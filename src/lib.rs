//! Ingestion and query engine for SINESP VDE public-safety incident tables.
//!
//! The crate loads the published spreadsheet exports (`.xlsx`) and compressed
//! CSVs (`.csv.gz`, `.csv.xz`) from a data directory, normalizes them onto a
//! single canonical schema, and merges them into one in-memory table served
//! through a read-only query engine.
//!
//! Layers, bottom up:
//!
//! - [`table`]: the canonical schema and the row-major [`table::Table`].
//! - [`ingestion`]: per-format readers, header/value normalization, the
//!   Parquet file cache, and the parallel [`ingestion::IngestionPipeline`].
//! - [`query`]: filtered search, summaries, distributions, rankings, and
//!   time series over one immutable table snapshot.
//! - [`dataset`]: the process-wide [`dataset::DatasetService`] that owns
//!   lazy loading, reloads, and snapshot handout.
//!
//! # Example
//!
//! ```no_run
//! use sinesp_dataset::config::EngineConfig;
//! use sinesp_dataset::dataset::DatasetService;
//! use sinesp_dataset::query::SummaryFilters;
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let service = DatasetService::new(EngineConfig::from_env());
//!     let data = service.ensure_ready()?;
//!     let engine = data.engine();
//!
//!     let summary = engine.victim_summary(
//!         &SummaryFilters::default().uf("SP").ano(2023),
//!     )?;
//!     println!("vitimas em SP/2023: {}", summary.total_vitimas);
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod dataset;
pub mod error;
pub mod ingestion;
pub mod query;
pub mod table;

pub use config::EngineConfig;
pub use dataset::{DatasetService, LoadedData, ServiceStatus};
pub use error::{DataError, DataResult};
pub use ingestion::{IngestionPipeline, LoadReport};
pub use query::{QueryEngine, QueryStatus};
pub use table::{Table, Value};
