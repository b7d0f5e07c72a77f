use std::fs::File;
use std::io::Write;
use std::path::Path;
use std::sync::Arc;

use flate2::Compression;
use flate2::write::GzEncoder;
use tempfile::TempDir;

use sinesp_dataset::config::EngineConfig;
use sinesp_dataset::dataset::{DatasetService, ServiceStatus};

fn write_csv_gz(dir: &Path, name: &str, contents: &str) {
    let file = File::create(dir.join(name)).unwrap();
    let mut enc = GzEncoder::new(file, Compression::default());
    enc.write_all(contents.as_bytes()).unwrap();
    enc.finish().unwrap();
}

fn service_for(dir: &TempDir) -> DatasetService {
    DatasetService::new(
        EngineConfig::default()
            .with_data_dir(dir.path().join("dados"))
            .with_cache_enabled(false),
    )
}

#[test]
fn ensure_ready_loads_once_and_shares_the_snapshot() {
    let dir = TempDir::new().unwrap();
    let data_dir = dir.path().join("dados");
    std::fs::create_dir_all(&data_dir).unwrap();
    write_csv_gz(&data_dir, "vde-2023.csv.gz", "uf,total_vitima\nSP,3\nRJ,2\n");

    let service = service_for(&dir);
    let first = service.ensure_ready().unwrap();
    let second = service.ensure_ready().unwrap();

    assert!(Arc::ptr_eq(&first, &second));
    assert_eq!(first.table.row_count(), 2);
    assert_eq!(service.status(), ServiceStatus::Ready { rows: 2 });
}

#[test]
fn reload_replaces_the_snapshot_without_touching_old_handles() {
    let dir = TempDir::new().unwrap();
    let data_dir = dir.path().join("dados");
    std::fs::create_dir_all(&data_dir).unwrap();
    write_csv_gz(&data_dir, "a.csv.gz", "uf,total_vitima\nSP,3\n");

    let service = service_for(&dir);
    let before = service.ensure_ready().unwrap();
    assert_eq!(before.table.row_count(), 1);

    write_csv_gz(&data_dir, "b.csv.gz", "uf,total_vitima\nMG,1\nBA,4\n");
    let after = service.load().unwrap();

    assert_eq!(after.table.row_count(), 3);
    // The handle taken before the reload still sees the old table.
    assert_eq!(before.table.row_count(), 1);
    assert_eq!(service.snapshot().unwrap().table.row_count(), 3);
}

#[test]
fn failed_load_is_reported_and_retried() {
    let dir = TempDir::new().unwrap();
    let data_dir = dir.path().join("dados");
    std::fs::create_dir_all(&data_dir).unwrap();
    std::fs::write(data_dir.join("broken.csv.gz"), b"not gzip").unwrap();

    let service = service_for(&dir);
    assert!(service.ensure_ready().is_err());
    match service.status() {
        ServiceStatus::Failed { .. } => {}
        other => panic!("expected failed status, got {other:?}"),
    }
    assert!(service.snapshot().unwrap_err().is_unavailable());

    // Fixing the data directory lets the next access succeed.
    std::fs::remove_file(data_dir.join("broken.csv.gz")).unwrap();
    write_csv_gz(&data_dir, "ok.csv.gz", "uf,total_vitima\nSP,1\n");

    let data = service.ensure_ready().unwrap();
    assert_eq!(data.table.row_count(), 1);
    assert_eq!(service.status(), ServiceStatus::Ready { rows: 1 });
}

#[test]
fn snapshot_engine_serves_queries() {
    let dir = TempDir::new().unwrap();
    let data_dir = dir.path().join("dados");
    std::fs::create_dir_all(&data_dir).unwrap();
    write_csv_gz(
        &data_dir,
        "vde-2023.csv.gz",
        "uf,municipio,total_vitima\nSP,Campinas,3\nSP,Santos,1\nRJ,Niteroi,2\n",
    );

    let service = service_for(&dir);
    let data = service.ensure_ready().unwrap();
    let engine = data.engine();

    assert_eq!(engine.distinct_values("uf"), vec!["RJ", "SP"]);
    assert_eq!(engine.municipalities(Some("SP")).unwrap(), vec!["Campinas", "Santos"]);
    let ranking = engine.ranking("uf", 10).unwrap();
    assert_eq!(ranking.entries[0].value, "SP");
    assert_eq!(ranking.entries[0].total, 4);
}
