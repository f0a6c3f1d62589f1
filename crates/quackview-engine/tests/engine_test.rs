//! Integration tests for file ingestion and querying through the engine crate.
//!
//! Covers:
//!
//! - CSV, Excel, JSON and Parquet loading and table naming
//! - Name collisions on repeated loads
//! - Errors for invalid queries and unreadable files
//! - Catalog listing after loads, renames and drops
//! - In-memory lifetime of the connection

use quackview_engine::{
    derive_table_name, split_statements, Engine, EngineError, FileFormat, PageRequest, TableKind,
};
use std::fs;
use std::path::PathBuf;
use tempfile::TempDir;

// ── Fixtures ─────────────────────────────────────────────────────────

fn write_fixture(dir: &TempDir, name: &str, contents: &str) -> PathBuf {
    let path = dir.path().join(name);
    fs::write(&path, contents).unwrap();
    path
}

fn csv_fixture(dir: &TempDir) -> PathBuf {
    write_fixture(
        dir,
        "My Data-2024.csv",
        "id,region,amount\n1,north,10.5\n2,south,20.0\n3,north,7.25\n",
    )
}

// ── Loading ──────────────────────────────────────────────────────────

#[test]
fn test_csv_load_uses_normalized_name() {
    let dir = TempDir::new().unwrap();
    let path = csv_fixture(&dir);
    let engine = Engine::open_in_memory().unwrap();

    let loaded = engine.load_file(&path, FileFormat::Csv).unwrap();
    assert_eq!(loaded.name, "my_data_2024");
    assert_eq!(loaded.row_count, 3);
    assert_eq!(loaded.name, derive_table_name(&path));

    let result = engine.execute("SELECT * FROM my_data_2024").unwrap();
    assert_eq!(result.columns, vec!["id", "region", "amount"]);
    assert_eq!(result.row_count, 3);
}

#[test]
fn test_query_column_count_matches_table() {
    let dir = TempDir::new().unwrap();
    let engine = Engine::open_in_memory().unwrap();
    let loaded = engine.load_file(&csv_fixture(&dir), FileFormat::Csv).unwrap();

    let catalog = engine.list_catalog().unwrap();
    let table = catalog.iter().find(|t| t.name == loaded.name).unwrap();

    let result = engine
        .execute_script(
            &split_statements(&format!("SELECT * FROM {};", loaded.name)),
            PageRequest::default(),
        )
        .unwrap();
    assert_eq!(result.columns.len(), table.columns.len());
}

#[test]
fn test_loading_same_file_twice_gets_suffix() {
    let dir = TempDir::new().unwrap();
    let path = csv_fixture(&dir);
    let engine = Engine::open_in_memory().unwrap();

    let first = engine.load_file(&path, FileFormat::Csv).unwrap();
    let second = engine.load_file(&path, FileFormat::Csv).unwrap();
    assert_eq!(first.name, "my_data_2024");
    assert_eq!(second.name, "my_data_2024_1");
}

#[test]
fn test_json_load() {
    let dir = TempDir::new().unwrap();
    let path = write_fixture(
        &dir,
        "events.json",
        r#"[{"kind": "click", "n": 1}, {"kind": "view", "n": 2}]"#,
    );
    let engine = Engine::open_in_memory().unwrap();

    let loaded = engine.load_file(&path, FileFormat::Json).unwrap();
    assert_eq!(loaded.name, "events");
    assert_eq!(loaded.row_count, 2);

    let result = engine
        .execute("SELECT n FROM events WHERE kind = 'view'")
        .unwrap();
    assert_eq!(result.rows[0].values[0], serde_json::json!(2));
}

#[test]
fn test_parquet_load_from_exported_query() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("numbers.parquet");
    let engine = Engine::open_in_memory().unwrap();
    engine
        .export_query("SELECT range AS x FROM range(25)", &path, "parquet")
        .unwrap();

    let loaded = engine.load_file(&path, FileFormat::Parquet).unwrap();
    assert_eq!(loaded.name, "numbers");
    assert_eq!(loaded.row_count, 25);
}

#[test]
fn test_excel_load_infers_column_types() {
    let path = PathBuf::from(concat!(env!("CARGO_MANIFEST_DIR"), "/tests/fixtures/orders.xlsx"));
    let engine = Engine::open_in_memory().unwrap();

    let loaded = engine.load_file(&path, FileFormat::Excel).unwrap();
    assert_eq!(loaded.name, "orders");
    assert_eq!(loaded.row_count, 3);

    let catalog = engine.list_catalog().unwrap();
    assert_eq!(catalog.len(), 1);
    let columns: Vec<(&str, &str)> = catalog[0]
        .columns
        .iter()
        .map(|c| (c.name.as_str(), c.data_type.as_str()))
        .collect();
    assert_eq!(
        columns,
        vec![
            ("id", "BIGINT"),
            ("product", "VARCHAR"),
            ("price", "DOUBLE"),
            ("in_stock", "BOOLEAN"),
            ("ordered", "DATE"),
        ]
    );

    let count = |sql: &str| engine.query_count(sql).unwrap();
    assert_eq!(count("SELECT COUNT(*) FROM orders WHERE in_stock"), 2);
    assert_eq!(count("SELECT COUNT(*) FROM orders WHERE product = 'Gizmo' AND price = 7.25"), 1);
    assert_eq!(count("SELECT COUNT(*) FROM orders WHERE ordered = DATE '2024-01-02' AND id = 2"), 1);
}

#[test]
fn test_failed_load_leaves_catalog_untouched() {
    let dir = TempDir::new().unwrap();
    let bogus = write_fixture(&dir, "broken.xlsx", "this is not a workbook");
    let missing = dir.path().join("missing.csv");
    let engine = Engine::open_in_memory().unwrap();

    let err = engine.load_file(&bogus, FileFormat::Excel).unwrap_err();
    assert!(matches!(err, EngineError::Load { .. }), "got {:?}", err);
    let err = engine.load_file(&missing, FileFormat::Csv).unwrap_err();
    assert!(err.to_string().contains("missing.csv"));

    assert!(engine.list_catalog().unwrap().is_empty());
}

// ── Querying ─────────────────────────────────────────────────────────

#[test]
fn test_missing_table_is_an_error_not_a_partial_result() {
    let engine = Engine::open_in_memory().unwrap();
    let err = engine
        .execute_paged("SELECT * FROM nowhere", PageRequest::default())
        .unwrap_err();
    assert!(matches!(err, EngineError::Sql(_)));
    assert!(err.to_string().contains("nowhere"));
}

#[test]
fn test_repeated_queries_are_independent() {
    let dir = TempDir::new().unwrap();
    let engine = Engine::open_in_memory().unwrap();
    engine.load_file(&csv_fixture(&dir), FileFormat::Csv).unwrap();

    let sql = "SELECT region, SUM(amount) AS total FROM my_data_2024 GROUP BY region ORDER BY region";
    let first = engine.execute(sql).unwrap();
    let second = engine.execute(sql).unwrap();
    assert_eq!(first.rows, second.rows);
    assert_eq!(second.row_count, 2);
}

// ── Catalog ──────────────────────────────────────────────────────────

#[test]
fn test_catalog_follows_rename_and_drop() {
    let dir = TempDir::new().unwrap();
    let engine = Engine::open_in_memory().unwrap();
    engine.load_file(&csv_fixture(&dir), FileFormat::Csv).unwrap();
    engine
        .execute_batch("CREATE VIEW north AS SELECT * FROM my_data_2024 WHERE region = 'north'")
        .unwrap();

    let catalog = engine.list_catalog().unwrap();
    assert_eq!(catalog.len(), 2);
    assert!(catalog
        .iter()
        .any(|t| t.name == "north" && t.kind == TableKind::View));

    engine.drop_table("north").unwrap();
    engine.rename_table("my_data_2024", "sales").unwrap();

    let names: Vec<String> = engine
        .list_catalog()
        .unwrap()
        .into_iter()
        .map(|t| t.name)
        .collect();
    assert_eq!(names, vec!["sales"]);
}

// ── Lifetime ─────────────────────────────────────────────────────────

#[test]
fn test_reopened_engine_starts_empty() {
    let dir = TempDir::new().unwrap();
    let engine = Engine::open_in_memory().unwrap();
    engine.load_file(&csv_fixture(&dir), FileFormat::Csv).unwrap();
    engine.close().unwrap();

    let reopened = Engine::open_in_memory().unwrap();
    assert!(reopened.list_catalog().unwrap().is_empty());
    assert!(reopened.execute("SELECT * FROM my_data_2024").is_err());
}
