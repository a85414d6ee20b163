use importer::config::ImportConfig;
use importer::errors::ImportError;
use importer::services::import::pipeline::import_csv;
use importer::store::SqliteStore;
use std::io::Write;
use tempfile::NamedTempFile;

const HEADER: &str =
    "Reino,Filo,Clase,Orden,Familia,Genero,Especie,Pais,Latitude,Longitude,Date,ScientificName";

fn csv_file(lines: &[&str]) -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    for line in lines {
        writeln!(file, "{}", line).unwrap();
    }
    file
}

#[test]
fn four_row_scenario_produces_expected_summary() {
    let file = csv_file(&[
        HEADER,
        "Animalia,Chordata,Aves,Psittaciformes,Psittacidae,Ara,macao,MX,\"19,4326\",-99.1332,2024-03-05,Ara macao",
        ",,,,,,,,,,,",
        "Animalia,Chordata,Aves,Psittaciformes,Psittacidae,Ara,militaris,,19.4,-99.1,2024-03-06,Ara militaris",
        "Animalia,Chordata,Aves,Psittaciformes,Psittacidae,Ara,ambiguus,CR,not_a_number,-84.0,2024-03-07,Ara ambiguus",
    ]);
    let mut store = SqliteStore::in_memory().unwrap();

    let summary = import_csv(&ImportConfig::for_csv(file.path()), &mut store, |_| {}).unwrap();

    assert_eq!(summary.total_rows, 4);
    assert_eq!(summary.inserted, 1);
    assert_eq!(summary.skipped, 3);
    assert_eq!(summary.skipped_empty, 1);
    assert_eq!(summary.skipped_invalid, 2);
    assert_eq!(summary.missing_geolocation, 1);
    assert_eq!(summary.missing_event_date, 1);
    assert_eq!(summary.final_flush_error, None);
    assert_eq!(store.count().unwrap(), 1);
    assert_eq!(
        store.sample().unwrap(),
        Some(("Ara macao".to_string(), "MX".to_string()))
    );
}

#[test]
fn batches_follow_the_configured_size() {
    let rows: Vec<String> = (0..5)
        .map(|i| {
            format!(
                "Animalia,Chordata,Aves,Psittaciformes,Psittacidae,Ara,sp{0},MX,19.4,-99.1,2024-03-05,Ara sp{0}",
                i
            )
        })
        .collect();
    let mut lines = vec![HEADER];
    lines.extend(rows.iter().map(String::as_str));
    let file = csv_file(&lines);

    let mut config = ImportConfig::for_csv(file.path());
    config.batch_size = 2;
    let mut store = SqliteStore::in_memory().unwrap();
    let mut batches = Vec::new();

    let summary = import_csv(&config, &mut store, |report| batches.push(report.batch_len)).unwrap();

    assert_eq!(batches, vec![2, 2, 1]);
    assert_eq!(summary.flushes, 3);
    assert_eq!(summary.inserted, 5);
    assert_eq!(store.count().unwrap(), 5);
}

#[test]
fn semicolon_export_with_accented_headers_and_components() {
    let file = csv_file(&[
        "Reino;Filo;Clase;Orden;Familia;Género;Especie;País;Latitud;Longitud;Year;Month;Day;Nombre Científico",
        "Plantae;Tracheophyta;Magnoliopsida;Fagales;Fagaceae;Quercus;rugosa;MX;19,43;-99,13;2023;7;9;Quercus rugosa",
        "Plantae;Tracheophyta;Magnoliopsida;Fagales;Fagaceae;Quercus",
    ]);
    let mut config = ImportConfig::for_csv(file.path());
    config.csv_separator = b';';
    let mut store = SqliteStore::in_memory().unwrap();

    let summary = import_csv(&config, &mut store, |_| {}).unwrap();

    assert_eq!(summary.total_rows, 2);
    assert_eq!(summary.inserted, 1);
    assert_eq!(summary.skipped_invalid, 1);
    assert_eq!(summary.missing_event_date, 1);
    assert_eq!(store.count().unwrap(), 1);
}

#[test]
fn header_only_file_imports_nothing() {
    let file = csv_file(&[HEADER]);
    let mut store = SqliteStore::in_memory().unwrap();

    let summary = import_csv(&ImportConfig::for_csv(file.path()), &mut store, |_| {}).unwrap();

    assert_eq!(summary.total_rows, 0);
    assert_eq!(summary.flushes, 0);
    assert_eq!(store.count().unwrap(), 0);
}

#[test]
fn missing_input_file_is_fatal() {
    let dir = tempfile::tempdir().unwrap();
    let mut store = SqliteStore::in_memory().unwrap();

    let result = import_csv(
        &ImportConfig::for_csv(dir.path().join("nope.csv")),
        &mut store,
        |_| {},
    );

    assert!(matches!(result, Err(ImportError::CsvOpen { .. })));
}
