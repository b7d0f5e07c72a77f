//! Record retrieval: filtered paginated search, exact-match occurrence
//! lookup, capped export, and preview.
//!
//! Records leave the engine as field→value mappings in canonical column
//! order, ready for an external JSON or CSV formatter; the engine performs no
//! export I/O itself.

use serde::ser::SerializeMap;
use serde::{Serialize, Serializer};

use crate::error::DataResult;
use crate::table::{Table, Value};

use super::filters::{SearchFilters, TextMode};
use super::{QueryEngine, QueryStatus};

/// Interactive queries never return more rows than this per page.
pub const MAX_SEARCH_LIMIT: usize = 1_000;
/// Export queries are capped higher but still bounded.
pub const MAX_EXPORT_LIMIT: usize = 50_000;

/// One field value as exposed to callers.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum FieldValue {
    Null,
    Int(i64),
    Text(String),
}

impl From<&Value> for FieldValue {
    fn from(v: &Value) -> Self {
        match v {
            Value::Absent => FieldValue::Null,
            Value::Int(i) => FieldValue::Int(*i),
            Value::Text(s) => FieldValue::Text(s.to_string()),
        }
    }
}

/// One record as a field→value mapping, preserving canonical column order.
#[derive(Debug, Clone, PartialEq)]
pub struct Record(pub Vec<(String, FieldValue)>);

impl Record {
    /// Value of a field by name.
    pub fn get(&self, field: &str) -> Option<&FieldValue> {
        self.0
            .iter()
            .find(|(name, _)| name == field)
            .map(|(_, value)| value)
    }
}

impl Serialize for Record {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for (name, value) in &self.0 {
            map.serialize_entry(name, value)?;
        }
        map.end()
    }
}

pub(crate) fn record_at(table: &Table, row_idx: usize) -> Record {
    let row = &table.rows[row_idx];
    Record(
        table
            .columns
            .iter()
            .zip(row.iter())
            .map(|(name, value)| (name.clone(), FieldValue::from(value)))
            .collect(),
    )
}

/// Pagination metadata for a search page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Pagination {
    /// Rows matching the filters, before pagination.
    pub total_matched: usize,
    /// Rows in this page.
    pub returned: usize,
    pub offset: usize,
    pub limit: usize,
    /// Offset of the next page, when one exists.
    pub next_offset: Option<usize>,
}

/// A page of matching records.
#[derive(Debug, Clone, Serialize)]
pub struct SearchResult {
    pub records: Vec<Record>,
    pub pagination: Pagination,
    pub status: QueryStatus,
}

impl QueryEngine<'_> {
    /// Filtered search with offset/limit pagination.
    ///
    /// All filters are case-insensitive substring matches, combined with
    /// AND. `limit` is clamped to [`MAX_SEARCH_LIMIT`]; `offset` is clamped
    /// to the match count.
    pub fn search(
        &self,
        filters: &SearchFilters,
        offset: usize,
        limit: usize,
    ) -> DataResult<SearchResult> {
        let compiled = self.compile_filters(
            &[
                ("uf", filters.uf.as_deref(), TextMode::Contains),
                ("municipio", filters.municipio.as_deref(), TextMode::Contains),
                ("evento", filters.evento.as_deref(), TextMode::Contains),
                ("agente", filters.agente.as_deref(), TextMode::Contains),
                ("arma", filters.arma.as_deref(), TextMode::Contains),
            ],
            filters.ano,
        )?;

        let matches = self.matching_rows(&compiled);
        let total_matched = matches.len();
        let limit = limit.clamp(1, MAX_SEARCH_LIMIT);
        let offset = offset.min(total_matched);

        let records: Vec<Record> = matches[offset..]
            .iter()
            .take(limit)
            .map(|&idx| record_at(self.table(), idx))
            .collect();

        let next_offset = if offset + limit < total_matched {
            Some(offset + limit)
        } else {
            None
        };
        let status = if records.is_empty() {
            QueryStatus::NoMatches
        } else {
            QueryStatus::Success
        };

        Ok(SearchResult {
            pagination: Pagination {
                total_matched,
                returned: records.len(),
                offset,
                limit,
                next_offset,
            },
            records,
            status,
        })
    }

    /// Exact-match occurrence lookup: `uf` is required, the optional filters
    /// all match by case-insensitive equality.
    ///
    /// Returns `Ok(None)` when nothing matches — the caller decides how to
    /// signal the empty outcome.
    pub fn occurrences(
        &self,
        uf: &str,
        municipio: Option<&str>,
        evento: Option<&str>,
        ano: Option<i32>,
    ) -> DataResult<Option<Vec<Record>>> {
        let compiled = self.compile_filters(
            &[
                ("uf", Some(uf), TextMode::Exact),
                ("municipio", municipio, TextMode::Exact),
                ("evento", evento, TextMode::Exact),
            ],
            ano,
        )?;

        let matches = self.matching_rows(&compiled);
        if matches.is_empty() {
            return Ok(None);
        }
        Ok(Some(
            matches
                .into_iter()
                .map(|idx| record_at(self.table(), idx))
                .collect(),
        ))
    }

    /// Filtered rows for export, capped at [`MAX_EXPORT_LIMIT`]. The caller
    /// renders CSV/JSON; no file I/O happens here.
    pub fn export_rows(&self, filters: &SearchFilters, limit: usize) -> DataResult<Vec<Record>> {
        let compiled = self.compile_filters(
            &[
                ("uf", filters.uf.as_deref(), TextMode::Contains),
                ("municipio", filters.municipio.as_deref(), TextMode::Contains),
                ("evento", filters.evento.as_deref(), TextMode::Contains),
                ("agente", filters.agente.as_deref(), TextMode::Contains),
                ("arma", filters.arma.as_deref(), TextMode::Contains),
            ],
            filters.ano,
        )?;

        let limit = limit.clamp(1, MAX_EXPORT_LIMIT);
        Ok(self
            .matching_rows(&compiled)
            .into_iter()
            .take(limit)
            .map(|idx| record_at(self.table(), idx))
            .collect())
    }

    /// First `limit` records, unfiltered.
    pub fn preview(&self, limit: usize) -> Vec<Record> {
        (0..self.table().row_count().min(limit))
            .map(|idx| record_at(self.table(), idx))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn record_serializes_in_column_order() {
        let record = Record(vec![
            ("uf".to_string(), FieldValue::Text("SP".to_string())),
            ("total_vitima".to_string(), FieldValue::Int(3)),
            ("agente".to_string(), FieldValue::Null),
        ]);
        let json = serde_json::to_string(&record).unwrap();
        assert_eq!(json, r#"{"uf":"SP","total_vitima":3,"agente":null}"#);
    }

    #[test]
    fn record_get_finds_fields() {
        let record = Record(vec![("uf".to_string(), FieldValue::Text("RJ".to_string()))]);
        assert_eq!(record.get("uf"), Some(&FieldValue::Text("RJ".to_string())));
        assert_eq!(record.get("missing"), None);
    }
}
