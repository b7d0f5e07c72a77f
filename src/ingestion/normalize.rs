//! Schema normalization.
//!
//! Turns a [`RawTable`] with arbitrary columns into a [`Table`] restricted to
//! the canonical column set with canonical types:
//!
//! - headers are lowercased, trimmed, and internal spaces become underscores
//! - raw columns outside the canonical set are dropped; canonical columns
//!   missing from the source are simply absent from the output
//! - string sentinels ("nan", "None", "", "null") become [`Value::Absent`]
//! - count columns coerce to non-negative integers, unparsable tokens to 0
//! - category columns intern repeated values behind shared `Arc`s
//!
//! The provenance column is appended last with the source file name.

use std::collections::HashMap;
use std::sync::Arc;

use crate::table::{CANONICAL_COLUMNS, ColumnKind, SOURCE_FILE_COLUMN, Table, Value, column_kind};

use super::source::RawTable;

/// Textual sentinels treated as absent after trimming.
const ABSENT_SENTINELS: [&str; 4] = ["nan", "None", "", "null"];

/// Canonicalize one raw header name.
pub fn normalize_header(raw: &str) -> String {
    raw.trim().to_lowercase().replace(' ', "_")
}

fn is_absent_sentinel(trimmed: &str) -> bool {
    ABSENT_SENTINELS.contains(&trimmed)
}

/// Per-column string interner for category columns.
#[derive(Default)]
struct Interner {
    pool: HashMap<String, Arc<str>>,
}

impl Interner {
    fn intern(&mut self, s: &str) -> Arc<str> {
        if let Some(v) = self.pool.get(s) {
            return Arc::clone(v);
        }
        let v: Arc<str> = Arc::from(s);
        self.pool.insert(s.to_owned(), Arc::clone(&v));
        v
    }
}

/// Coerce a raw token into a count cell. Never fails, never negative.
fn coerce_count(raw: &str) -> Value {
    let trimmed = raw.trim();
    if let Ok(v) = trimmed.parse::<i64>() {
        return Value::Int(v.max(0));
    }
    match trimmed.parse::<f64>() {
        Ok(f) if f.is_finite() => Value::Int((f as i64).max(0)),
        _ => Value::Int(0),
    }
}

fn coerce_string(raw: &str, kind: ColumnKind, interner: &mut Interner) -> Value {
    let trimmed = raw.trim();
    if is_absent_sentinel(trimmed) {
        return Value::Absent;
    }
    match kind {
        ColumnKind::Category => Value::Text(interner.intern(trimmed)),
        _ => Value::Text(Arc::from(trimmed)),
    }
}

/// Normalize a raw table and stamp every row with its origin file name.
pub fn normalize(raw: &RawTable, origin: &str) -> Table {
    let normalized_headers: Vec<String> = raw.headers.iter().map(|h| normalize_header(h)).collect();

    // Canonical columns present in the source, in canonical order, each with
    // its raw column index.
    let mut projection: Vec<(&'static str, ColumnKind, usize)> = Vec::new();
    for def in CANONICAL_COLUMNS.iter().filter(|d| d.name != SOURCE_FILE_COLUMN) {
        if let Some(idx) = normalized_headers.iter().position(|h| h == def.name) {
            projection.push((def.name, def.kind, idx));
        }
    }

    let mut interners: Vec<Interner> = projection.iter().map(|_| Interner::default()).collect();
    let origin_value: Arc<str> = Arc::from(origin);

    let mut rows = Vec::with_capacity(raw.rows.len());
    for raw_row in &raw.rows {
        let mut row = Vec::with_capacity(projection.len() + 1);
        for ((_, kind, raw_idx), interner) in projection.iter().zip(interners.iter_mut()) {
            let cell = raw_row.get(*raw_idx).map(String::as_str).unwrap_or("");
            let value = match kind {
                ColumnKind::Count => coerce_count(cell),
                kind => coerce_string(cell, *kind, interner),
            };
            row.push(value);
        }
        row.push(Value::Text(Arc::clone(&origin_value)));
        rows.push(row);
    }

    let mut columns: Vec<String> = projection.iter().map(|(name, ..)| name.to_string()).collect();
    columns.push(SOURCE_FILE_COLUMN.to_string());

    Table::new(columns, rows)
}

/// Re-run type optimization over a (possibly merged) table in place.
///
/// Column-union concatenation can leave absent cells in count columns (rows
/// from files that lacked the column) and duplicate category allocations
/// across per-file interner pools. This pass restores the count-column
/// invariant (concrete, non-negative integers everywhere) and re-interns
/// category values across the whole table.
pub fn optimize_types(table: &mut Table) {
    let kinds: Vec<Option<ColumnKind>> = table.columns.iter().map(|c| column_kind(c)).collect();
    let mut interners: Vec<Interner> = kinds.iter().map(|_| Interner::default()).collect();

    for row in &mut table.rows {
        for (idx, cell) in row.iter_mut().enumerate() {
            match kinds[idx] {
                Some(ColumnKind::Count) => {
                    let v = match &*cell {
                        Value::Int(v) => (*v).max(0),
                        Value::Text(s) => coerce_count(s).int_or_zero(),
                        Value::Absent => 0,
                    };
                    *cell = Value::Int(v);
                }
                Some(ColumnKind::Category) => {
                    if let Value::Text(s) = &*cell {
                        let interned = interners[idx].intern(s);
                        *cell = Value::Text(interned);
                    }
                }
                _ => {}
            }
        }
    }
}
