//! Read-only query operations over the unified table.
//!
//! Every operation is a pure function of (table, parameters), except that
//! dimension queries consult the [`QueryCache`] first. The engine borrows the
//! table; it never mutates it.
//!
//! Result structs all derive `serde::Serialize` so a routing layer can render
//! them directly.

mod aggregate;
pub mod cache;
mod distinct;
pub mod filters;
mod search;
mod series;

use serde::Serialize;

use crate::error::{DataError, DataResult};
use crate::table::{SOURCE_FILE_COLUMN, Table};

pub use aggregate::{DatasetOverview, Distribution, GroupShare, RankEntry, Ranking, SharePercentages, VictimSummary};
pub use cache::QueryCache;
pub use distinct::SourceFileCount;
pub use filters::{SearchFilters, SeriesFilters, SummaryFilters, extract_year, scan_year_token, scan_year_tokens};
pub use search::{FieldValue, Pagination, Record, SearchResult};
pub use series::{TimeSeries, Trend};

use filters::{CompiledFilters, TextFilter, TextMode, YearFilter};

/// Outcome tag distinguishing "matches found" from the normal, non-error
/// empty result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum QueryStatus {
    Success,
    NoMatches,
}

/// Operational diagnostics for the loaded table.
#[derive(Debug, Clone, Serialize)]
pub struct MemoryUsage {
    /// Approximate in-memory size of the table, bytes.
    pub approx_bytes: usize,
    /// Same, in mebibytes rounded to 2 decimals.
    pub approx_mb: f64,
    pub row_count: usize,
    pub column_count: usize,
    /// Result-cache entries currently held.
    pub cached_queries: usize,
}

/// Query engine over one immutable table snapshot.
pub struct QueryEngine<'a> {
    table: &'a Table,
    cache: &'a QueryCache,
}

impl<'a> QueryEngine<'a> {
    /// Borrow a table and its result cache.
    pub fn new(table: &'a Table, cache: &'a QueryCache) -> Self {
        Self { table, cache }
    }

    /// The underlying table.
    pub fn table(&self) -> &Table {
        self.table
    }

    pub(crate) fn cache(&self) -> &QueryCache {
        self.cache
    }

    /// Resolve a column or fail with [`DataError::ColumnNotFound`].
    pub(crate) fn require_column(&self, name: &str) -> DataResult<usize> {
        self.table
            .column_index(name)
            .ok_or_else(|| DataError::ColumnNotFound {
                column: name.to_string(),
            })
    }

    /// Compile optional text filters (failing on columns absent from the
    /// schema) plus the optional year filter.
    pub(crate) fn compile_filters(
        &self,
        specs: &[(&str, Option<&str>, TextMode)],
        ano: Option<i32>,
    ) -> DataResult<CompiledFilters> {
        let mut compiled = CompiledFilters::default();
        for (field, value, mode) in specs {
            if let Some(value) = value {
                compiled.text.push(TextFilter {
                    col: self.require_column(field)?,
                    needle_lower: value.to_lowercase(),
                    mode: *mode,
                });
            }
        }
        if let Some(year) = ano {
            compiled.year = Some(YearFilter {
                year,
                digits: year.to_string(),
                date_col: self.table.column_index("data_referencia"),
                origin_col: self.table.column_index(SOURCE_FILE_COLUMN),
            });
        }
        Ok(compiled)
    }

    /// Indices of rows matching the compiled filters, in table order.
    pub(crate) fn matching_rows(&self, compiled: &CompiledFilters) -> Vec<usize> {
        self.table
            .rows
            .iter()
            .enumerate()
            .filter(|(_, row)| compiled.matches(row))
            .map(|(idx, _)| idx)
            .collect()
    }

    /// Approximate memory and cache diagnostics.
    pub fn memory_usage(&self) -> MemoryUsage {
        let approx_bytes = self.table.approx_bytes();
        MemoryUsage {
            approx_bytes,
            approx_mb: ((approx_bytes as f64 / (1024.0 * 1024.0)) * 100.0).round() / 100.0,
            row_count: self.table.row_count(),
            column_count: self.table.column_count(),
            cached_queries: self.cache.len(),
        }
    }

    /// Drop every cached query result.
    pub fn clear_cache(&self) {
        self.cache.clear();
    }
}
