//! Source discovery, parsing, normalization, and caching.
//!
//! Most callers should use [`IngestionPipeline::load_all`], which:
//!
//! - discovers `.xlsx`, `.csv.gz`, and `.csv.xz` files in the data directory
//! - loads and normalizes each file in parallel, via [`cache::FileCache`]
//! - skips (and reports) failing files instead of aborting the load
//! - merges all successes into one unified [`crate::table::Table`]

pub mod cache;
pub mod normalize;
pub mod observability;
pub mod pipeline;
pub mod source;

pub use cache::FileCache;
pub use observability::{
    CompositeObserver, FileContext, FileObserver, IngestionObserver, IngestionSeverity,
    StdErrObserver,
};
pub use pipeline::{FileOutcome, IngestionPipeline, LoadReport};
pub use source::{RawTable, SourceFormat};
