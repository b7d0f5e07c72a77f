use std::fs::File;
use std::io::Write;
use std::path::Path;

use flate2::Compression;
use flate2::write::GzEncoder;
use tempfile::TempDir;

use sinesp_dataset::config::EngineConfig;
use sinesp_dataset::error::DataError;
use sinesp_dataset::ingestion::IngestionPipeline;
use sinesp_dataset::table::Value;

fn write_csv_gz(dir: &Path, name: &str, contents: &str) {
    let file = File::create(dir.join(name)).unwrap();
    let mut enc = GzEncoder::new(file, Compression::default());
    enc.write_all(contents.as_bytes()).unwrap();
    enc.finish().unwrap();
}

fn write_csv_xz(dir: &Path, name: &str, contents: &str) {
    let file = File::create(dir.join(name)).unwrap();
    let mut enc = xz2::write::XzEncoder::new(file, 6);
    enc.write_all(contents.as_bytes()).unwrap();
    enc.finish().unwrap();
}

fn config_for(dir: &TempDir) -> EngineConfig {
    EngineConfig::default()
        .with_data_dir(dir.path().join("dados"))
        .with_cache_enabled(false)
        .with_max_workers(2)
}

#[test]
fn missing_data_dir_is_created_and_yields_empty_table() {
    let dir = TempDir::new().unwrap();
    let data_dir = dir.path().join("dados");
    assert!(!data_dir.exists());

    let (table, report) = IngestionPipeline::new(config_for(&dir)).load_all().unwrap();

    assert!(data_dir.is_dir());
    assert_eq!(table.row_count(), 0);
    assert!(table.has_column("uf"));
    assert!(table.has_column("arquivo_origem"));
    assert!(report.files.is_empty());
}

#[test]
fn empty_data_dir_yields_empty_canonical_table() {
    let dir = TempDir::new().unwrap();
    std::fs::create_dir_all(dir.path().join("dados")).unwrap();

    let (table, report) = IngestionPipeline::new(config_for(&dir)).load_all().unwrap();

    assert_eq!(table.row_count(), 0);
    assert_eq!(report.row_count, 0);
    assert_eq!(report.files_loaded(), 0);
}

#[test]
fn corrupt_file_is_skipped_and_reported() {
    let dir = TempDir::new().unwrap();
    let data_dir = dir.path().join("dados");
    std::fs::create_dir_all(&data_dir).unwrap();

    write_csv_gz(&data_dir, "2022.csv.gz", "uf,municipio,total_vitima\nSP,Campinas,3\n");
    write_csv_gz(&data_dir, "2023.csv.gz", "uf,municipio,total_vitima\nRJ,Niteroi,5\n");
    // Not gzip at all.
    std::fs::write(data_dir.join("broken.csv.gz"), b"plain text, no gzip magic").unwrap();

    let (table, report) = IngestionPipeline::new(config_for(&dir)).load_all().unwrap();

    assert_eq!(table.row_count(), 2);
    assert_eq!(report.files_loaded(), 2);
    assert_eq!(report.files_failed(), 1);
    let failed = report.files.iter().find(|f| !f.succeeded()).unwrap();
    assert_eq!(failed.file_name, "broken.csv.gz");
    assert!(failed.error.is_some());
}

#[test]
fn every_file_failing_is_a_fatal_error() {
    let dir = TempDir::new().unwrap();
    let data_dir = dir.path().join("dados");
    std::fs::create_dir_all(&data_dir).unwrap();
    std::fs::write(data_dir.join("a.csv.gz"), b"nope").unwrap();
    std::fs::write(data_dir.join("b.csv.xz"), b"also nope").unwrap();

    let err = IngestionPipeline::new(config_for(&dir)).load_all().unwrap_err();
    match err {
        DataError::NoFilesLoaded { attempted } => assert_eq!(attempted, 2),
        other => panic!("expected NoFilesLoaded, got {other:?}"),
    }
}

#[test]
fn merge_unions_columns_across_files() {
    let dir = TempDir::new().unwrap();
    let data_dir = dir.path().join("dados");
    std::fs::create_dir_all(&data_dir).unwrap();

    // Different column subsets per file.
    write_csv_gz(
        &data_dir,
        "ocorrencias.csv.gz",
        "uf,municipio,evento,total\nSP,Santos,Roubo,4\nMG,Uberaba,Furto,1\n",
    );
    write_csv_xz(
        &data_dir,
        "vitimas.csv.xz",
        "uf,evento,feminino,total_vitima\nRJ,Homicidio,2,6\n",
    );

    let (table, _) = IngestionPipeline::new(config_for(&dir)).load_all().unwrap();

    assert_eq!(table.row_count(), 3);
    for col in ["uf", "municipio", "evento", "total", "feminino", "total_vitima", "arquivo_origem"] {
        assert!(table.has_column(col), "missing column {col}");
    }

    let municipio = table.column_index("municipio").unwrap();
    let feminino = table.column_index("feminino").unwrap();
    let origin = table.column_index("arquivo_origem").unwrap();
    let vitimas_row = table
        .rows
        .iter()
        .find(|r| r[origin].as_str() == Some("vitimas.csv.xz"))
        .unwrap();
    // Text columns absent from a file stay absent; counts fill with 0.
    assert!(vitimas_row[municipio].is_absent());
    assert_eq!(vitimas_row[feminino], Value::Int(2));

    let ocorrencias_row = table
        .rows
        .iter()
        .find(|r| r[origin].as_str() == Some("ocorrencias.csv.gz"))
        .unwrap();
    let total_vitima = table.column_index("total_vitima").unwrap();
    assert_eq!(ocorrencias_row[total_vitima], Value::Int(0));
}

#[test]
fn sentinel_strings_and_bad_numbers_normalize() {
    let dir = TempDir::new().unwrap();
    let data_dir = dir.path().join("dados");
    std::fs::create_dir_all(&data_dir).unwrap();

    write_csv_gz(
        &data_dir,
        "dados.csv.gz",
        "uf,agente,total_vitima\nSP,nan,abc\nNone,Policial,3.0\n,null,-2\n",
    );

    let (table, _) = IngestionPipeline::new(config_for(&dir)).load_all().unwrap();
    assert_eq!(table.row_count(), 3);

    let uf = table.column_index("uf").unwrap();
    let agente = table.column_index("agente").unwrap();
    let total_vitima = table.column_index("total_vitima").unwrap();

    assert_eq!(table.rows[0][uf].as_str(), Some("SP"));
    assert!(table.rows[0][agente].is_absent());
    assert_eq!(table.rows[0][total_vitima], Value::Int(0));

    assert!(table.rows[1][uf].is_absent());
    assert_eq!(table.rows[1][total_vitima], Value::Int(3));

    assert!(table.rows[2][uf].is_absent());
    assert!(table.rows[2][agente].is_absent());
    // Negative counts clamp to zero.
    assert_eq!(table.rows[2][total_vitima], Value::Int(0));
}
