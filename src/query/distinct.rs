//! Dimension queries: distinct values, available years, municipalities,
//! loaded files. All results are cached by operation plus parameters.

use std::collections::{BTreeMap, BTreeSet};

use serde::Serialize;

use crate::error::DataResult;
use crate::table::SOURCE_FILE_COLUMN;

use super::QueryEngine;
use super::cache::CachedEntry;
use super::filters::{TextMode, extract_year, scan_year_tokens};

/// Row count contributed by one source file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SourceFileCount {
    pub file: String,
    pub records: usize,
}

impl QueryEngine<'_> {
    /// Distinct values of a string column, sorted ascending, without absent
    /// markers. A field outside the loaded schema yields an empty list.
    pub fn distinct_values(&self, field: &str) -> Vec<String> {
        let key = format!("distinct:{field}");
        if let Some(CachedEntry::Strings(values)) = self.cache().get(&key) {
            return values;
        }

        let values = match self.table().column_index(field) {
            Some(col) => {
                let set: BTreeSet<&str> = self
                    .table()
                    .rows
                    .iter()
                    .filter_map(|row| row[col].as_str())
                    .collect();
                set.into_iter().map(str::to_owned).collect()
            }
            None => Vec::new(),
        };

        self.cache().insert(key, CachedEntry::Strings(values.clone()));
        values
    }

    /// Years covered by the dataset: extracted from `data_referencia` per
    /// record, plus 20xx tokens in the distinct source file names. Sorted
    /// ascending.
    pub fn available_years(&self) -> Vec<i32> {
        const KEY: &str = "years";
        if let Some(CachedEntry::Years(years)) = self.cache().get(KEY) {
            return years;
        }

        let mut set: BTreeSet<i32> = BTreeSet::new();
        if let Some(col) = self.table().column_index("data_referencia") {
            for row in &self.table().rows {
                if let Some(year) = row[col].as_str().and_then(extract_year) {
                    set.insert(year);
                }
            }
        }
        for file in self.distinct_values(SOURCE_FILE_COLUMN) {
            set.extend(scan_year_tokens(&file));
        }

        let years: Vec<i32> = set.into_iter().collect();
        self.cache().insert(KEY.to_string(), CachedEntry::Years(years.clone()));
        years
    }

    /// Distinct municipalities, optionally restricted to one state (exact
    /// case-insensitive `uf` match).
    pub fn municipalities(&self, uf: Option<&str>) -> DataResult<Vec<String>> {
        let key = match uf {
            Some(uf) => format!("municipios:{}", uf.to_lowercase()),
            None => "municipios:all".to_string(),
        };
        if let Some(CachedEntry::Strings(values)) = self.cache().get(&key) {
            return Ok(values);
        }

        let col = self.require_column("municipio")?;
        let compiled = self.compile_filters(&[("uf", uf, TextMode::Exact)], None)?;

        let set: BTreeSet<&str> = self
            .table()
            .rows
            .iter()
            .filter(|row| compiled.matches(row))
            .filter_map(|row| row[col].as_str())
            .collect();
        let values: Vec<String> = set.into_iter().map(str::to_owned).collect();

        self.cache().insert(key, CachedEntry::Strings(values.clone()));
        Ok(values)
    }

    /// Row counts per source file, sorted by file name.
    pub fn loaded_files(&self) -> Vec<SourceFileCount> {
        const KEY: &str = "files";
        if let Some(CachedEntry::Files(pairs)) = self.cache().get(KEY) {
            return pairs
                .into_iter()
                .map(|(file, records)| SourceFileCount { file, records })
                .collect();
        }

        let mut counts: BTreeMap<&str, usize> = BTreeMap::new();
        if let Some(col) = self.table().column_index(SOURCE_FILE_COLUMN) {
            for row in &self.table().rows {
                if let Some(file) = row[col].as_str() {
                    *counts.entry(file).or_default() += 1;
                }
            }
        }

        let pairs: Vec<(String, usize)> = counts
            .into_iter()
            .map(|(file, records)| (file.to_owned(), records))
            .collect();
        self.cache().insert(KEY.to_string(), CachedEntry::Files(pairs.clone()));
        pairs
            .into_iter()
            .map(|(file, records)| SourceFileCount { file, records })
            .collect()
    }
}
