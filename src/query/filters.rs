//! Filter parameters and row matching.
//!
//! Two text-matching modes exist and which one applies is part of each
//! operation's contract: exact case-insensitive equality (dimension lookups,
//! summaries) and case-insensitive substring containment (free-text search).
//!
//! The year filter first tries to parse `data_referencia` as a date; when no
//! year can be extracted from it, the record matches if `arquivo_origem`
//! contains the year digits.

use chrono::{Datelike, NaiveDate, NaiveDateTime};
use serde::Serialize;

use crate::table::Value;

/// Free-text filters used by search and export; all substring,
/// case-insensitive, combined conjunctively.
#[derive(Debug, Clone, Default, Serialize)]
pub struct SearchFilters {
    pub uf: Option<String>,
    pub municipio: Option<String>,
    pub evento: Option<String>,
    pub agente: Option<String>,
    pub arma: Option<String>,
    pub ano: Option<i32>,
}

impl SearchFilters {
    pub fn uf(mut self, v: impl Into<String>) -> Self {
        self.uf = Some(v.into());
        self
    }

    pub fn municipio(mut self, v: impl Into<String>) -> Self {
        self.municipio = Some(v.into());
        self
    }

    pub fn evento(mut self, v: impl Into<String>) -> Self {
        self.evento = Some(v.into());
        self
    }

    pub fn agente(mut self, v: impl Into<String>) -> Self {
        self.agente = Some(v.into());
        self
    }

    pub fn arma(mut self, v: impl Into<String>) -> Self {
        self.arma = Some(v.into());
        self
    }

    pub fn ano(mut self, ano: i32) -> Self {
        self.ano = Some(ano);
        self
    }
}

/// Filters used by summaries and distributions: `uf` exact, `evento`
/// substring, plus the year filter.
#[derive(Debug, Clone, Default, Serialize)]
pub struct SummaryFilters {
    pub uf: Option<String>,
    pub evento: Option<String>,
    pub ano: Option<i32>,
}

impl SummaryFilters {
    pub fn uf(mut self, v: impl Into<String>) -> Self {
        self.uf = Some(v.into());
        self
    }

    pub fn evento(mut self, v: impl Into<String>) -> Self {
        self.evento = Some(v.into());
        self
    }

    pub fn ano(mut self, ano: i32) -> Self {
        self.ano = Some(ano);
        self
    }
}

/// Filters used by the time series: `uf` exact, the rest substring.
#[derive(Debug, Clone, Default, Serialize)]
pub struct SeriesFilters {
    pub uf: Option<String>,
    pub municipio: Option<String>,
    pub evento: Option<String>,
}

impl SeriesFilters {
    pub fn uf(mut self, v: impl Into<String>) -> Self {
        self.uf = Some(v.into());
        self
    }

    pub fn municipio(mut self, v: impl Into<String>) -> Self {
        self.municipio = Some(v.into());
        self
    }

    pub fn evento(mut self, v: impl Into<String>) -> Self {
        self.evento = Some(v.into());
        self
    }
}

/// Text-matching mode for one filter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum TextMode {
    Exact,
    Contains,
}

/// One compiled text filter: resolved column plus pre-lowercased needle.
#[derive(Debug, Clone)]
pub(crate) struct TextFilter {
    pub col: usize,
    pub needle_lower: String,
    pub mode: TextMode,
}

impl TextFilter {
    fn matches(&self, row: &[Value]) -> bool {
        let Some(s) = row[self.col].as_str() else {
            return false;
        };
        let hay = s.to_lowercase();
        match self.mode {
            TextMode::Exact => hay == self.needle_lower,
            TextMode::Contains => hay.contains(self.needle_lower.as_str()),
        }
    }
}

/// Compiled year filter.
#[derive(Debug, Clone)]
pub(crate) struct YearFilter {
    pub year: i32,
    pub digits: String,
    pub date_col: Option<usize>,
    pub origin_col: Option<usize>,
}

impl YearFilter {
    fn matches(&self, row: &[Value]) -> bool {
        if let Some(col) = self.date_col {
            if let Some(raw) = row[col].as_str() {
                if let Some(year) = extract_year(raw) {
                    return year == self.year;
                }
            }
        }
        // No year in the reference date; fall back to the provenance name.
        match self.origin_col.and_then(|c| row[c].as_str()) {
            Some(name) => name.contains(&self.digits),
            None => false,
        }
    }
}

/// A conjunctive set of compiled filters, ready for per-row evaluation.
#[derive(Debug, Clone, Default)]
pub(crate) struct CompiledFilters {
    pub text: Vec<TextFilter>,
    pub year: Option<YearFilter>,
}

impl CompiledFilters {
    pub fn matches(&self, row: &[Value]) -> bool {
        self.text.iter().all(|f| f.matches(row))
            && self.year.as_ref().is_none_or(|y| y.matches(row))
    }
}

const DATE_LAYOUTS: [&str; 3] = ["%Y-%m-%d", "%d/%m/%Y", "%Y/%m/%d"];
const DATETIME_LAYOUTS: [&str; 2] = ["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S"];

/// Extract a year from a heterogeneous date-like string: try the known date
/// layouts first, then fall back to scanning for a standalone 20xx token.
pub fn extract_year(raw: &str) -> Option<i32> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }
    for layout in DATE_LAYOUTS {
        if let Ok(d) = NaiveDate::parse_from_str(trimmed, layout) {
            return Some(d.year());
        }
    }
    for layout in DATETIME_LAYOUTS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(trimmed, layout) {
            return Some(dt.year());
        }
    }
    scan_year_token(trimmed)
}

/// First standalone 4-digit token in 2000–2099 (digit runs longer or shorter
/// than 4 never match).
pub fn scan_year_token(s: &str) -> Option<i32> {
    scan_year_tokens(s).into_iter().next()
}

/// All standalone 4-digit tokens in 2000–2099, in order of appearance.
pub fn scan_year_tokens(s: &str) -> Vec<i32> {
    let bytes = s.as_bytes();
    let mut out = Vec::new();
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i].is_ascii_digit() {
            let start = i;
            while i < bytes.len() && bytes[i].is_ascii_digit() {
                i += 1;
            }
            if i - start == 4 {
                if let Ok(year) = s[start..i].parse::<i32>() {
                    if (2000..=2099).contains(&year) {
                        out.push(year);
                    }
                }
            }
        } else {
            i += 1;
        }
    }
    out
}
