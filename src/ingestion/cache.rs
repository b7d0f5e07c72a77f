//! Read-through file cache for normalized tables.
//!
//! Each source file maps to one parquet file in the cache directory (same
//! base name, extension replaced). The source's identity — file size plus
//! modification time — is stored in the parquet key-value metadata; a cache
//! file whose stored identity no longer matches the source is simply treated
//! as a miss and overwritten on the next store. Stale files are never
//! explicitly deleted.
//!
//! Cache writes are best-effort; cache reads that fail for any reason fall
//! back to re-parsing the source.

use std::fs::File;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::UNIX_EPOCH;

use parquet::column::writer::ColumnWriter;
use parquet::data_type::ByteArray;
use parquet::file::metadata::KeyValue;
use parquet::file::properties::WriterProperties;
use parquet::file::reader::FileReader;
use parquet::file::serialized_reader::SerializedFileReader;
use parquet::file::writer::SerializedFileWriter;
use parquet::record::Field as ParquetField;
use parquet::schema::parser::parse_message_type;

use crate::error::{DataError, DataResult};
use crate::table::{ColumnKind, Table, Value, column_kind};

use super::normalize::optimize_types;

const IDENTITY_KEY: &str = "source_identity";

/// On-disk cache of normalized tables, keyed by source identity.
#[derive(Debug, Clone)]
pub struct FileCache {
    dir: PathBuf,
    enabled: bool,
}

impl FileCache {
    /// Create a cache rooted at `dir`. The directory is created lazily on
    /// first store.
    pub fn new(dir: impl Into<PathBuf>, enabled: bool) -> Self {
        Self {
            dir: dir.into(),
            enabled,
        }
    }

    /// A cache that never hits and never stores.
    pub fn disabled() -> Self {
        Self {
            dir: PathBuf::new(),
            enabled: false,
        }
    }

    /// Identity key for a source file, derived from size and mtime.
    ///
    /// `None` (e.g. the file cannot be stat'ed) means "no cache": the caller
    /// always re-parses.
    pub fn identity(path: &Path) -> Option<String> {
        let meta = std::fs::metadata(path).ok()?;
        let mtime = meta.modified().ok()?.duration_since(UNIX_EPOCH).ok()?;
        Some(format!(
            "{}_{}.{:09}",
            meta.len(),
            mtime.as_secs(),
            mtime.subsec_nanos()
        ))
    }

    /// Path of the cache file for a source path: same base name with the
    /// source extension replaced by `.parquet`.
    pub fn cache_path(&self, source: &Path) -> PathBuf {
        let name = source
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("unknown");
        let lower = name.to_ascii_lowercase();
        let base = [".xlsx", ".csv.gz", ".csv.xz"]
            .iter()
            .find(|suffix| lower.ends_with(*suffix))
            .map(|suffix| &name[..name.len() - suffix.len()])
            .unwrap_or(name);
        self.dir.join(format!("{base}.parquet"))
    }

    /// Load the cached table for `source` if one exists for `identity`.
    ///
    /// Any failure — missing file, identity mismatch, undecodable parquet —
    /// is a miss.
    pub fn load(&self, source: &Path, identity: &str) -> Option<Table> {
        if !self.enabled {
            return None;
        }
        self.try_load(source, identity).ok()
    }

    fn try_load(&self, source: &Path, identity: &str) -> DataResult<Table> {
        let reader = SerializedFileReader::try_from(self.cache_path(source).as_path())?;
        let file_meta = reader.metadata().file_metadata();

        let stored = file_meta
            .key_value_metadata()
            .and_then(|kvs| kvs.iter().find(|kv| kv.key == IDENTITY_KEY))
            .and_then(|kv| kv.value.as_deref());
        if stored != Some(identity) {
            return Err(DataError::Parquet(parquet::errors::ParquetError::General(
                "cache identity mismatch".to_string(),
            )));
        }

        let columns: Vec<String> = file_meta
            .schema_descr()
            .columns()
            .iter()
            .map(|c| c.path().string())
            .collect();

        let mut rows = Vec::new();
        for row in reader.into_iter() {
            let row = row?;
            let mut cells = Vec::with_capacity(columns.len());
            for (_, field) in row.get_column_iter() {
                cells.push(match field {
                    ParquetField::Null => Value::Absent,
                    ParquetField::Long(v) => Value::Int(*v),
                    ParquetField::Str(s) => Value::Text(Arc::from(s.as_str())),
                    other => {
                        return Err(DataError::Parquet(
                            parquet::errors::ParquetError::General(format!(
                                "unexpected cached value: {other}"
                            )),
                        ));
                    }
                });
            }
            rows.push(cells);
        }

        let mut table = Table::new(columns, rows);
        // Restore category interning lost in serialization.
        optimize_types(&mut table);
        Ok(table)
    }

    /// Persist the normalized table for `source` under `identity`.
    ///
    /// Callers treat failures as non-fatal (logged, load proceeds uncached).
    pub fn store(&self, source: &Path, identity: &str, table: &Table) -> DataResult<()> {
        if !self.enabled {
            return Ok(());
        }
        std::fs::create_dir_all(&self.dir)?;

        let schema = Arc::new(parse_message_type(&message_type(table))?);
        let props = Arc::new(
            WriterProperties::builder()
                .set_key_value_metadata(Some(vec![KeyValue::new(
                    IDENTITY_KEY.to_string(),
                    identity.to_string(),
                )]))
                .build(),
        );

        let file = File::create(self.cache_path(source))?;
        let mut writer = SerializedFileWriter::new(file, schema, props)?;
        let mut rg = writer.next_row_group()?;

        let mut col_idx = 0usize;
        while let Some(mut col) = rg.next_column()? {
            let name = &table.columns[col_idx];
            match col.untyped() {
                ColumnWriter::Int64ColumnWriter(w) => {
                    let values: Vec<i64> = table
                        .rows
                        .iter()
                        .map(|row| row[col_idx].int_or_zero())
                        .collect();
                    w.write_batch(&values, None, None)?;
                }
                ColumnWriter::ByteArrayColumnWriter(w) => {
                    let mut values = Vec::new();
                    let mut def_levels = Vec::with_capacity(table.row_count());
                    for row in &table.rows {
                        match row[col_idx].as_str() {
                            Some(s) => {
                                values.push(ByteArray::from(s));
                                def_levels.push(1i16);
                            }
                            None => def_levels.push(0i16),
                        }
                    }
                    w.write_batch(&values, Some(&def_levels), None)?;
                }
                _ => {
                    return Err(DataError::Parquet(parquet::errors::ParquetError::General(
                        format!("unexpected column writer for '{name}'"),
                    )));
                }
            }
            col.close()?;
            col_idx += 1;
        }

        rg.close()?;
        writer.close()?;
        Ok(())
    }
}

/// Parquet message type for a normalized table: count columns as required
/// INT64, string columns as optional UTF-8 byte arrays.
fn message_type(table: &Table) -> String {
    let mut out = String::from("message sinesp_cache {\n");
    for name in &table.columns {
        match column_kind(name) {
            Some(ColumnKind::Count) => {
                out.push_str(&format!("  REQUIRED INT64 {name};\n"));
            }
            _ => {
                out.push_str(&format!("  OPTIONAL BINARY {name} (UTF8);\n"));
            }
        }
    }
    out.push('}');
    out
}
