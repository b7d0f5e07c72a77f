//! Aggregations: victim summaries, dataset overview, group-by distributions,
//! and ranked aggregation.
//!
//! Sums run over the count columns, which are concrete non-negative integers
//! after normalization; a count column missing from the loaded schema
//! contributes 0 rather than failing, matching the tolerant summary
//! semantics. Group fields, by contrast, must exist ([`DataError::ColumnNotFound`]
//! otherwise) — grouping over a missing column is a configuration error, not
//! an empty result.
//!
//! [`DataError::ColumnNotFound`]: crate::error::DataError::ColumnNotFound

use std::collections::{HashMap, HashSet};

use serde::Serialize;

use crate::error::DataResult;
use crate::table::Value;

use super::filters::{SummaryFilters, TextMode};
use super::{QueryEngine, QueryStatus};

/// Share of each sex category in the summed victim total, rounded to 2
/// decimals; all zero when the total is zero.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SharePercentages {
    pub feminino: f64,
    pub masculino: f64,
    pub nao_informado: f64,
}

/// Victim totals after filtering.
#[derive(Debug, Clone, Serialize)]
pub struct VictimSummary {
    pub total_vitimas: i64,
    pub feminino: i64,
    pub masculino: i64,
    pub nao_informado: i64,
    pub rows_analyzed: usize,
    pub percentages: SharePercentages,
    pub status: QueryStatus,
}

/// Dataset-wide totals and coverage counts.
#[derive(Debug, Clone, Serialize)]
pub struct DatasetOverview {
    pub total_rows: usize,
    pub total_vitimas: i64,
    pub feminino: i64,
    pub masculino: i64,
    pub nao_informado: i64,
    pub distinct_ufs: usize,
    pub distinct_municipios: usize,
    pub distinct_eventos: usize,
}

/// One group in a distribution.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GroupShare {
    pub value: String,
    pub total: i64,
    /// Share of the grand total, percent, 2 decimals; 0 when the grand total
    /// is 0.
    pub percent: f64,
}

/// Group-by distribution of summed victim totals.
#[derive(Debug, Clone, Serialize)]
pub struct Distribution {
    pub field: String,
    pub groups: Vec<GroupShare>,
    pub grand_total: i64,
    pub rows_analyzed: usize,
    pub status: QueryStatus,
}

/// One entry of a ranking.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RankEntry {
    pub value: String,
    pub total: i64,
    /// 1-based position in the truncated output.
    pub rank: usize,
}

/// Ranked aggregation result.
#[derive(Debug, Clone, Serialize)]
pub struct Ranking {
    pub field: String,
    pub entries: Vec<RankEntry>,
    pub status: QueryStatus,
}

pub(crate) fn round2(x: f64) -> f64 {
    (x * 100.0).round() / 100.0
}

fn share(part: i64, total: i64) -> f64 {
    if total > 0 {
        round2(part as f64 / total as f64 * 100.0)
    } else {
        0.0
    }
}

impl QueryEngine<'_> {
    fn summary_specs<'f>(
        filters: &'f SummaryFilters,
    ) -> [(&'static str, Option<&'f str>, TextMode); 2] {
        [
            ("uf", filters.uf.as_deref(), TextMode::Exact),
            ("evento", filters.evento.as_deref(), TextMode::Contains),
        ]
    }

    /// Sum a count column over the given rows; a column missing from the
    /// schema sums to 0.
    fn sum_over(&self, rows: &[usize], column: &str) -> i64 {
        match self.table().column_index(column) {
            Some(col) => rows
                .iter()
                .map(|&idx| self.table().rows[idx][col].int_or_zero())
                .sum(),
            None => 0,
        }
    }

    fn distinct_over(&self, rows: &[usize], column: &str) -> usize {
        match self.table().column_index(column) {
            Some(col) => {
                let set: HashSet<&str> = rows
                    .iter()
                    .filter_map(|&idx| self.table().rows[idx][col].as_str())
                    .collect();
                set.len()
            }
            None => 0,
        }
    }

    /// Victim totals under the given filters, with share percentages.
    ///
    /// An empty result yields an all-zero summary tagged
    /// [`QueryStatus::NoMatches`].
    pub fn victim_summary(&self, filters: &SummaryFilters) -> DataResult<VictimSummary> {
        let compiled = self.compile_filters(&Self::summary_specs(filters), filters.ano)?;
        let rows = self.matching_rows(&compiled);

        let total_vitimas = self.sum_over(&rows, "total_vitima");
        let feminino = self.sum_over(&rows, "feminino");
        let masculino = self.sum_over(&rows, "masculino");
        let nao_informado = self.sum_over(&rows, "nao_informado");

        let status = if rows.is_empty() {
            QueryStatus::NoMatches
        } else {
            QueryStatus::Success
        };

        Ok(VictimSummary {
            total_vitimas,
            feminino,
            masculino,
            nao_informado,
            rows_analyzed: rows.len(),
            percentages: SharePercentages {
                feminino: share(feminino, total_vitimas),
                masculino: share(masculino, total_vitimas),
                nao_informado: share(nao_informado, total_vitimas),
            },
            status,
        })
    }

    /// Unfiltered dataset totals plus coverage counts.
    pub fn overview(&self) -> DatasetOverview {
        let rows: Vec<usize> = (0..self.table().row_count()).collect();
        DatasetOverview {
            total_rows: rows.len(),
            total_vitimas: self.sum_over(&rows, "total_vitima"),
            feminino: self.sum_over(&rows, "feminino"),
            masculino: self.sum_over(&rows, "masculino"),
            nao_informado: self.sum_over(&rows, "nao_informado"),
            distinct_ufs: self.distinct_over(&rows, "uf"),
            distinct_municipios: self.distinct_over(&rows, "municipio"),
            distinct_eventos: self.distinct_over(&rows, "evento"),
        }
    }

    /// Group the filtered rows by `field` and sum `total_vitima` per group,
    /// with each group's share of the grand total. Absent group values are
    /// excluded. Groups are ordered by descending total (stable on ties).
    pub fn distribution(
        &self,
        field: &str,
        filters: &SummaryFilters,
    ) -> DataResult<Distribution> {
        let group_col = self.require_column(field)?;
        let compiled = self.compile_filters(&Self::summary_specs(filters), filters.ano)?;
        let rows = self.matching_rows(&compiled);

        let value_col = self.table().column_index("total_vitima");
        let groups = group_sums(self.table().rows.as_slice(), &rows, group_col, value_col);
        let grand_total: i64 = groups.iter().map(|(_, total)| total).sum();

        let mut shares: Vec<GroupShare> = groups
            .into_iter()
            .map(|(value, total)| GroupShare {
                percent: share(total, grand_total),
                value,
                total,
            })
            .collect();
        shares.sort_by(|a, b| b.total.cmp(&a.total));

        let status = if shares.is_empty() {
            QueryStatus::NoMatches
        } else {
            QueryStatus::Success
        };

        Ok(Distribution {
            field: field.to_string(),
            groups: shares,
            grand_total,
            rows_analyzed: rows.len(),
            status,
        })
    }

    /// Rank groups by summed `total_vitima`, descending, truncated to
    /// `limit`. Ties keep first-appearance order; ranks are the 1-based
    /// positions in the truncated output.
    pub fn ranking(&self, field: &str, limit: usize) -> DataResult<Ranking> {
        let group_col = self.require_column(field)?;
        let rows: Vec<usize> = (0..self.table().row_count()).collect();
        let value_col = self.table().column_index("total_vitima");

        let mut groups = group_sums(self.table().rows.as_slice(), &rows, group_col, value_col);
        // Stable sort: insertion (first-appearance) order breaks ties.
        groups.sort_by(|a, b| b.1.cmp(&a.1));
        groups.truncate(limit.max(1));

        let entries: Vec<RankEntry> = groups
            .into_iter()
            .enumerate()
            .map(|(idx, (value, total))| RankEntry {
                value,
                total,
                rank: idx + 1,
            })
            .collect();

        let status = if entries.is_empty() {
            QueryStatus::NoMatches
        } else {
            QueryStatus::Success
        };

        Ok(Ranking {
            field: field.to_string(),
            entries,
            status,
        })
    }
}

/// Per-group sums in first-appearance order, skipping absent group values.
fn group_sums(
    all_rows: &[Vec<Value>],
    selected: &[usize],
    group_col: usize,
    value_col: Option<usize>,
) -> Vec<(String, i64)> {
    let mut order: Vec<(String, i64)> = Vec::new();
    let mut index: HashMap<String, usize> = HashMap::new();

    for &row_idx in selected {
        let row = &all_rows[row_idx];
        let Some(group) = row[group_col].as_str() else {
            continue;
        };
        let value = value_col.map(|c| row[c].int_or_zero()).unwrap_or(0);
        match index.get(group) {
            Some(&pos) => order[pos].1 += value,
            None => {
                index.insert(group.to_owned(), order.len());
                order.push((group.to_owned(), value));
            }
        }
    }

    order
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round2_rounds_half_up() {
        assert_eq!(round2(33.333), 33.33);
        assert_eq!(round2(66.666), 66.67);
        assert_eq!(round2(0.0), 0.0);
    }

    #[test]
    fn share_is_zero_for_zero_total() {
        assert_eq!(share(10, 0), 0.0);
        assert_eq!(share(1, 3), 33.33);
    }

    #[test]
    fn group_sums_keep_first_appearance_order_and_skip_absent() {
        let rows = vec![
            vec![Value::Text("RJ".into()), Value::Int(1)],
            vec![Value::Absent, Value::Int(100)],
            vec![Value::Text("SP".into()), Value::Int(2)],
            vec![Value::Text("RJ".into()), Value::Int(3)],
        ];
        let selected: Vec<usize> = (0..rows.len()).collect();
        let sums = group_sums(&rows, &selected, 0, Some(1));
        assert_eq!(
            sums,
            vec![("RJ".to_string(), 4), ("SP".to_string(), 2)]
        );
    }
}
