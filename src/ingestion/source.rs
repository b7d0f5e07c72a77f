//! Raw source readers.
//!
//! Every supported format is read into a [`RawTable`] of plain strings;
//! type coercion happens later, in [`crate::ingestion::normalize`]. Format is
//! dispatched by file extension (including the double extensions of
//! compressed CSV).

use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;

use calamine::{Data, Reader, open_workbook_auto};

use crate::error::{DataError, DataResult};

/// Supported source file formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceFormat {
    /// Spreadsheet workbook, first sheet only.
    Xlsx,
    /// Comma-separated values, gzip-compressed.
    CsvGz,
    /// Comma-separated values, xz-compressed.
    CsvXz,
}

impl SourceFormat {
    /// Detect the format from a path's file name (case-insensitive).
    pub fn from_path(path: &Path) -> Option<Self> {
        let name = path.file_name()?.to_str()?.to_ascii_lowercase();
        if name.ends_with(".xlsx") {
            Some(Self::Xlsx)
        } else if name.ends_with(".csv.gz") {
            Some(Self::CsvGz)
        } else if name.ends_with(".csv.xz") {
            Some(Self::CsvXz)
        } else {
            None
        }
    }

    /// Glob pattern matching this format inside a directory.
    pub fn glob_pattern(self) -> &'static str {
        match self {
            Self::Xlsx => "*.xlsx",
            Self::CsvGz => "*.csv.gz",
            Self::CsvXz => "*.csv.xz",
        }
    }

    /// All recognized formats, in discovery order.
    pub const ALL: [SourceFormat; 3] = [Self::Xlsx, Self::CsvGz, Self::CsvXz];
}

/// An untyped table as read from disk: headers plus string cells.
///
/// Empty cells are empty strings at this stage; normalization turns them
/// (and the other sentinels) into absent values.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawTable {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

/// Read a source file into a [`RawTable`], dispatching on the extension.
///
/// Unrecognized extensions yield [`DataError::UnsupportedFormat`]; the
/// pipeline treats that as a skippable per-file failure.
pub fn read_raw(path: &Path) -> DataResult<RawTable> {
    let format = SourceFormat::from_path(path).ok_or_else(|| DataError::UnsupportedFormat {
        path: path.to_path_buf(),
    })?;

    match format {
        SourceFormat::Xlsx => read_xlsx(path),
        SourceFormat::CsvGz => {
            let file = File::open(path)?;
            read_csv(flate2::read::GzDecoder::new(BufReader::new(file)))
        }
        SourceFormat::CsvXz => {
            let file = File::open(path)?;
            read_csv(xz2::read::XzDecoder::new(BufReader::new(file)))
        }
    }
}

/// Read the first sheet of a workbook. The first non-empty row is the header.
fn read_xlsx(path: &Path) -> DataResult<RawTable> {
    let mut workbook = open_workbook_auto(path)?;
    let sheet = workbook
        .sheet_names()
        .first()
        .cloned()
        .ok_or_else(|| calamine::Error::Msg("workbook has no sheets"))?;
    let range = workbook.worksheet_range(&sheet)?;

    let mut iter = range.rows();
    let headers = loop {
        match iter.next() {
            Some(row) if row.iter().any(|c| !matches!(c, Data::Empty)) => {
                break row.iter().map(cell_to_string).collect::<Vec<_>>();
            }
            Some(_) => continue,
            None => {
                return Err(calamine::Error::Msg("sheet has no header row").into());
            }
        }
    };

    let rows = iter
        .map(|row| {
            let mut cells: Vec<String> = row.iter().map(cell_to_string).collect();
            // Short rows pad out to the header width.
            cells.resize(headers.len(), String::new());
            cells
        })
        .collect();

    Ok(RawTable { headers, rows })
}

fn cell_to_string(c: &Data) -> String {
    match c {
        Data::Empty => String::new(),
        Data::String(s) => s.clone(),
        Data::Int(i) => i.to_string(),
        Data::Float(f) => {
            if f.fract() == 0.0 {
                (*f as i64).to_string()
            } else {
                f.to_string()
            }
        }
        Data::Bool(b) => b.to_string(),
        Data::DateTime(dt) => dt.to_string(),
        Data::DateTimeIso(s) | Data::DurationIso(s) => s.clone(),
        Data::Error(e) => format!("{e:?}"),
    }
}

/// Read headered CSV from an already-decompressed reader.
fn read_csv<R: Read>(reader: R) -> DataResult<RawTable> {
    let mut rdr = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_reader(reader);

    let headers: Vec<String> = rdr.headers()?.iter().map(str::to_owned).collect();

    let mut rows = Vec::new();
    for record in rdr.records() {
        let record = record?;
        let mut cells: Vec<String> = record.iter().map(str::to_owned).collect();
        cells.resize(headers.len(), String::new());
        rows.push(cells);
    }

    Ok(RawTable { headers, rows })
}
