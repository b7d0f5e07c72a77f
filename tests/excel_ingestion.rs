use std::path::Path;

use rust_xlsxwriter::Workbook;
use tempfile::TempDir;

use sinesp_dataset::config::EngineConfig;
use sinesp_dataset::ingestion::IngestionPipeline;
use sinesp_dataset::table::Value;

fn write_vde_xlsx(path: &Path) {
    let mut wb = Workbook::new();
    let ws = wb.add_worksheet();

    // Headers as published: mixed case, stray padding.
    ws.write_string(0, 0, " UF ").unwrap();
    ws.write_string(0, 1, "Municipio").unwrap();
    ws.write_string(0, 2, "EVENTO").unwrap();
    ws.write_string(0, 3, "Data Referencia").unwrap();
    ws.write_string(0, 4, "Total Vitima").unwrap();

    ws.write_string(1, 0, "SP").unwrap();
    ws.write_string(1, 1, "Campinas").unwrap();
    ws.write_string(1, 2, "Roubo").unwrap();
    ws.write_string(1, 3, "2023-05-01").unwrap();
    ws.write_number(1, 4, 3).unwrap();

    ws.write_string(2, 0, "RJ").unwrap();
    ws.write_string(2, 1, "Niteroi").unwrap();
    ws.write_string(2, 2, "Furto").unwrap();
    ws.write_string(2, 3, "nan").unwrap();
    ws.write_number(2, 4, 2.0).unwrap();

    wb.save(path).unwrap();
}

fn write_headerless_xlsx(path: &Path) {
    let mut wb = Workbook::new();
    wb.add_worksheet();
    wb.save(path).unwrap();
}

#[test]
fn workbook_headers_canonicalize_and_counts_coerce() {
    let dir = TempDir::new().unwrap();
    let data_dir = dir.path().join("dados");
    std::fs::create_dir_all(&data_dir).unwrap();
    write_vde_xlsx(&data_dir.join("vde-2023.xlsx"));

    let config = EngineConfig::default()
        .with_data_dir(&data_dir)
        .with_cache_enabled(false);
    let (table, report) = IngestionPipeline::new(config).load_all().unwrap();

    assert_eq!(report.files_loaded(), 1);
    assert_eq!(table.row_count(), 2);
    for col in ["uf", "municipio", "evento", "data_referencia", "total_vitima"] {
        assert!(table.has_column(col), "missing column {col}");
    }

    let data = table.column_index("data_referencia").unwrap();
    let total = table.column_index("total_vitima").unwrap();
    let origin = table.column_index("arquivo_origem").unwrap();

    assert_eq!(table.rows[0][data].as_str(), Some("2023-05-01"));
    assert_eq!(table.rows[0][total], Value::Int(3));
    assert!(table.rows[1][data].is_absent());
    assert_eq!(table.rows[1][total], Value::Int(2));
    assert_eq!(table.rows[0][origin].as_str(), Some("vde-2023.xlsx"));
}

#[test]
fn workbook_without_header_row_fails_per_file() {
    let dir = TempDir::new().unwrap();
    let data_dir = dir.path().join("dados");
    std::fs::create_dir_all(&data_dir).unwrap();
    write_headerless_xlsx(&data_dir.join("vazio.xlsx"));
    write_vde_xlsx(&data_dir.join("vde-2023.xlsx"));

    let config = EngineConfig::default()
        .with_data_dir(&data_dir)
        .with_cache_enabled(false);
    let (table, report) = IngestionPipeline::new(config).load_all().unwrap();

    assert_eq!(report.files_loaded(), 1);
    assert_eq!(report.files_failed(), 1);
    assert_eq!(table.row_count(), 2);
}

#[test]
fn workbook_rows_survive_the_parquet_cache() {
    let dir = TempDir::new().unwrap();
    let data_dir = dir.path().join("dados");
    std::fs::create_dir_all(&data_dir).unwrap();
    write_vde_xlsx(&data_dir.join("vde-2023.xlsx"));

    let config = EngineConfig::default()
        .with_data_dir(&data_dir)
        .with_cache_dir(dir.path().join("cache"))
        .with_cache_enabled(true);

    let (first, _) = IngestionPipeline::new(config.clone()).load_all().unwrap();
    let (second, report) = IngestionPipeline::new(config).load_all().unwrap();

    assert!(report.files[0].from_cache);
    assert_eq!(first.columns, second.columns);
    assert_eq!(first.rows, second.rows);
}
