//! Yearly time series of victim totals with a coarse trend label.

use std::collections::BTreeMap;

use serde::Serialize;

use crate::error::DataResult;

use super::filters::{SeriesFilters, TextMode, extract_year};
use super::{QueryEngine, QueryStatus};

/// Direction of the series between its first and last year.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Trend {
    Increasing,
    Decreasing,
    Stable,
    /// Fewer than two years with data.
    Insufficient,
    /// No row carried a parseable reference year.
    NoData,
}

/// Victim totals per reference year.
#[derive(Debug, Clone, Serialize)]
pub struct TimeSeries {
    /// Year to summed `total_vitima`, ascending by year.
    pub series: BTreeMap<i32, i64>,
    pub total: i64,
    /// "{first}-{last}" over the covered years, `None` when empty.
    pub period: Option<String>,
    pub trend: Trend,
    pub status: QueryStatus,
}

fn trend_of(series: &BTreeMap<i32, i64>) -> Trend {
    match (series.values().next(), series.values().next_back()) {
        (None, _) | (_, None) => Trend::NoData,
        _ if series.len() < 2 => Trend::Insufficient,
        (Some(first), Some(last)) => match last.cmp(first) {
            std::cmp::Ordering::Greater => Trend::Increasing,
            std::cmp::Ordering::Less => Trend::Decreasing,
            std::cmp::Ordering::Equal => Trend::Stable,
        },
    }
}

impl QueryEngine<'_> {
    /// Sum `total_vitima` per reference year under the given filters.
    ///
    /// Only rows whose `data_referencia` yields a year participate; there is
    /// no file-name fallback here, because a per-year sum needs a concrete
    /// year for each row, not just evidence that a file covers one.
    pub fn time_series(&self, filters: &SeriesFilters) -> DataResult<TimeSeries> {
        let specs = [
            ("uf", filters.uf.as_deref(), TextMode::Exact),
            ("municipio", filters.municipio.as_deref(), TextMode::Contains),
            ("evento", filters.evento.as_deref(), TextMode::Contains),
        ];
        let compiled = self.compile_filters(&specs, None)?;
        let rows = self.matching_rows(&compiled);

        let date_col = self.table().column_index("data_referencia");
        let value_col = self.table().column_index("total_vitima");

        let mut series: BTreeMap<i32, i64> = BTreeMap::new();
        if let Some(date_col) = date_col {
            for &row_idx in &rows {
                let row = &self.table().rows[row_idx];
                let Some(year) = row[date_col].as_str().and_then(extract_year) else {
                    continue;
                };
                let value = value_col.map(|c| row[c].int_or_zero()).unwrap_or(0);
                *series.entry(year).or_insert(0) += value;
            }
        }

        let total: i64 = series.values().sum();
        let period = match (series.keys().next(), series.keys().next_back()) {
            (Some(first), Some(last)) => Some(format!("{first}-{last}")),
            _ => None,
        };
        let trend = trend_of(&series);
        let status = if series.is_empty() {
            QueryStatus::NoMatches
        } else {
            QueryStatus::Success
        };

        Ok(TimeSeries {
            series,
            total,
            period,
            trend,
            status,
        })
    }
}
