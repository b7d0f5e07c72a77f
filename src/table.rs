//! Core data model: the canonical incident schema and the in-memory table.
//!
//! Source files arrive with arbitrary columns; normalization restricts them
//! to the canonical column set below. The unified table produced by the
//! ingestion pipeline carries the union of canonical columns actually present
//! in at least one source file (plus [`SOURCE_FILE_COLUMN`], appended at
//! ingestion time).

use std::sync::Arc;

/// How a canonical column is stored and queried.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnKind {
    /// Free text (high cardinality, e.g. `municipio`).
    Text,
    /// Low-cardinality string stored with deduplicated (interned) values.
    /// Query semantics are identical to [`ColumnKind::Text`].
    Category,
    /// Non-negative integer count. Unparsable source values become 0.
    Count,
}

/// A canonical column: name plus storage kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ColumnDef {
    pub name: &'static str,
    pub kind: ColumnKind,
}

/// Provenance column appended to every record at ingestion time.
pub const SOURCE_FILE_COLUMN: &str = "arquivo_origem";

/// Canonical column set, in output order. Raw columns outside this set are
/// dropped during normalization.
pub const CANONICAL_COLUMNS: [ColumnDef; 16] = [
    ColumnDef { name: "uf", kind: ColumnKind::Category },
    ColumnDef { name: "municipio", kind: ColumnKind::Text },
    ColumnDef { name: "evento", kind: ColumnKind::Category },
    ColumnDef { name: "data_referencia", kind: ColumnKind::Text },
    ColumnDef { name: "agente", kind: ColumnKind::Category },
    ColumnDef { name: "arma", kind: ColumnKind::Category },
    ColumnDef { name: "faixa_etaria", kind: ColumnKind::Category },
    ColumnDef { name: "feminino", kind: ColumnKind::Count },
    ColumnDef { name: "masculino", kind: ColumnKind::Count },
    ColumnDef { name: "nao_informado", kind: ColumnKind::Count },
    ColumnDef { name: "total_vitima", kind: ColumnKind::Count },
    ColumnDef { name: "total", kind: ColumnKind::Count },
    ColumnDef { name: "total_peso", kind: ColumnKind::Count },
    ColumnDef { name: "abrangencia", kind: ColumnKind::Category },
    ColumnDef { name: "formulario", kind: ColumnKind::Category },
    ColumnDef { name: SOURCE_FILE_COLUMN, kind: ColumnKind::Text },
];

/// Look up the kind of a canonical column.
pub fn column_kind(name: &str) -> Option<ColumnKind> {
    CANONICAL_COLUMNS
        .iter()
        .find(|c| c.name == name)
        .map(|c| c.kind)
}

/// A single cell in a [`Table`].
///
/// Absence is a first-class value: string sentinels ("nan", "None", "",
/// "null") normalize to [`Value::Absent`], never to an empty string.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// Missing value.
    Absent,
    /// Count value (always >= 0 after normalization).
    Int(i64),
    /// String value. Category columns share one `Arc` per distinct value.
    Text(Arc<str>),
}

impl Value {
    /// Borrow the string content, if any.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Text(s) => Some(s),
            _ => None,
        }
    }

    /// Integer content, if any.
    pub fn as_int(&self) -> Option<i64> {
        match self {
            Value::Int(v) => Some(*v),
            _ => None,
        }
    }

    /// Integer content with the count-column default of 0.
    pub fn int_or_zero(&self) -> i64 {
        self.as_int().unwrap_or(0)
    }

    /// Whether this cell is [`Value::Absent`].
    pub fn is_absent(&self) -> bool {
        matches!(self, Value::Absent)
    }

    fn approx_bytes(&self) -> usize {
        match self {
            Value::Absent => size_of::<Value>(),
            Value::Int(_) => size_of::<Value>(),
            // Interned strings overstate slightly (shared allocations are
            // counted once per row), which is acceptable for diagnostics.
            Value::Text(s) => size_of::<Value>() + s.len(),
        }
    }
}

/// In-memory tabular dataset, row-major.
///
/// `columns` is always a subset of [`CANONICAL_COLUMNS`] names, in canonical
/// order. Rows have exactly `columns.len()` cells.
#[derive(Debug, Clone, PartialEq)]
pub struct Table {
    /// Column names, canonical order.
    pub columns: Vec<String>,
    /// Row-major cell storage.
    pub rows: Vec<Vec<Value>>,
}

impl Table {
    /// Create a table from columns and rows.
    pub fn new(columns: Vec<String>, rows: Vec<Vec<Value>>) -> Self {
        Self { columns, rows }
    }

    /// A zero-row table carrying the full canonical schema.
    pub fn empty_canonical() -> Self {
        Self {
            columns: CANONICAL_COLUMNS
                .iter()
                .map(|c| c.name.to_string())
                .collect(),
            rows: Vec::new(),
        }
    }

    /// Number of rows.
    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    /// Number of columns.
    pub fn column_count(&self) -> usize {
        self.columns.len()
    }

    /// Index of a column by name, if present.
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    /// Whether the table carries the named column.
    pub fn has_column(&self, name: &str) -> bool {
        self.column_index(name).is_some()
    }

    /// Approximate in-memory size in bytes, for diagnostics only.
    pub fn approx_bytes(&self) -> usize {
        let cells: usize = self
            .rows
            .iter()
            .map(|row| row.iter().map(Value::approx_bytes).sum::<usize>())
            .sum();
        let headers: usize = self.columns.iter().map(|c| c.len()).sum();
        cells + headers
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn canonical_order_ends_with_provenance_column() {
        assert_eq!(CANONICAL_COLUMNS.last().unwrap().name, SOURCE_FILE_COLUMN);
        assert_eq!(CANONICAL_COLUMNS[0].name, "uf");
    }

    #[test]
    fn column_kind_lookup() {
        assert_eq!(column_kind("uf"), Some(ColumnKind::Category));
        assert_eq!(column_kind("municipio"), Some(ColumnKind::Text));
        assert_eq!(column_kind("total_vitima"), Some(ColumnKind::Count));
        assert_eq!(column_kind("unknown"), None);
    }

    #[test]
    fn empty_canonical_has_full_schema() {
        let t = Table::empty_canonical();
        assert_eq!(t.row_count(), 0);
        assert_eq!(t.column_count(), CANONICAL_COLUMNS.len());
        assert!(t.has_column("arquivo_origem"));
    }

    #[test]
    fn value_accessors() {
        assert_eq!(Value::Int(3).int_or_zero(), 3);
        assert_eq!(Value::Absent.int_or_zero(), 0);
        assert!(Value::Absent.is_absent());
        assert_eq!(Value::Text("SP".into()).as_str(), Some("SP"));
        assert_eq!(Value::Int(1).as_str(), None);
    }
}
