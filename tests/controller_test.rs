//! End-to-end tests for the controller: files in, queries through the
//! worker, results and messages out.

use quackview::controller::{Completion, Controller, ControllerOptions, Submission};
use quackview::logging::{LogBuffer, LogLevel};
use quackview::{FileFormat, QuackviewError};
use std::fs;
use std::path::Path;
use std::thread;
use std::time::Duration;
use tempfile::TempDir;

fn open(page_size: usize) -> Controller {
    Controller::open(
        ControllerOptions {
            page_size,
            ..ControllerOptions::default()
        },
        LogBuffer::new_shared(),
    )
    .unwrap()
}

fn wait_for(controller: &mut Controller) -> Completion {
    for _ in 0..2_000 {
        if let Some(done) = controller.poll() {
            return done;
        }
        thread::sleep(Duration::from_millis(5));
    }
    panic!("query did not complete in time");
}

fn run(controller: &mut Controller, sql: &str) -> Completion {
    match controller.submit_query(sql) {
        Submission::Started(_) => wait_for(controller),
        other => panic!("query did not start: {:?}", other),
    }
}

fn write_csv(dir: &Path, name: &str, contents: &str) -> std::path::PathBuf {
    let path = dir.join(name);
    fs::write(&path, contents).unwrap();
    path
}

#[test]
fn test_load_csv_and_query_it() {
    let dir = TempDir::new().unwrap();
    let path = write_csv(
        dir.path(),
        "My Data-2024.csv",
        "city,population\nOslo,700000\nBergen,285000\nTromso,77000\n",
    );

    let mut controller = open(1000);
    let loaded = controller.load_file(&path, None).unwrap();
    assert_eq!(loaded.name, "my_data_2024");
    assert_eq!(loaded.format, FileFormat::Csv);
    assert_eq!(loaded.row_count, 3);
    assert_eq!(controller.catalog().len(), 1);
    assert_eq!(controller.catalog()[0].columns.len(), 2);

    let done = run(
        &mut controller,
        "SELECT city FROM my_data_2024 WHERE population > 100000 ORDER BY city",
    );
    assert!(done.succeeded);
    assert_eq!(controller.grid().headers, vec!["city"]);
    assert_eq!(
        controller.grid().rows,
        vec![vec!["Bergen".to_string()], vec!["Oslo".to_string()]]
    );
}

#[test]
fn test_loading_same_file_twice_gets_suffix() {
    let dir = TempDir::new().unwrap();
    let path = write_csv(dir.path(), "sales.csv", "a\n1\n");

    let mut controller = open(1000);
    assert_eq!(controller.load_file(&path, None).unwrap().name, "sales");
    assert_eq!(controller.load_file(&path, None).unwrap().name, "sales_1");
    assert_eq!(controller.loaded_tables().len(), 2);
}

#[test]
fn test_failed_load_leaves_catalog_untouched() {
    let dir = TempDir::new().unwrap();
    let good = write_csv(dir.path(), "good.csv", "x\n1\n");
    let mut controller = open(1000);
    controller.load_file(&good, None).unwrap();

    let missing = dir.path().join("missing.parquet");
    assert!(controller.load_file(&missing, None).is_err());
    assert_eq!(controller.catalog().len(), 1);
    assert!(controller.popup().is_some());
    let error = controller.messages().last(LogLevel::Error).unwrap();
    assert!(error.message.contains("missing.parquet"));
}

#[test]
fn test_busy_rejects_second_submission() {
    let mut controller = open(1000);
    let first = controller.submit_query("SELECT SUM(range) FROM range(2000000)");
    assert!(matches!(first, Submission::Started(_)));
    assert_eq!(controller.submit_query("SELECT 1"), Submission::Busy);
    assert!(matches!(
        controller.refresh_schema(),
        Err(QuackviewError::Busy)
    ));
    assert!(wait_for(&mut controller).succeeded);
    assert!(!controller.is_busy());
}

#[test]
fn test_repeated_queries_are_independent() {
    let mut controller = open(1000);
    for i in 0..5 {
        let done = run(&mut controller, &format!("SELECT {} AS n", i));
        assert!(done.succeeded);
        assert_eq!(controller.grid().rows, vec![vec![i.to_string()]]);
    }
}

#[test]
fn test_error_then_success() {
    let mut controller = open(1000);
    assert!(!run(&mut controller, "SELECT * FROM nowhere").succeeded);
    assert!(run(&mut controller, "SELECT 'ok' AS status").succeeded);
    assert_eq!(controller.grid().rows, vec![vec!["ok".to_string()]]);
}

#[test]
fn test_use_switches_context_without_worker() {
    let mut controller = open(1000);
    assert!(run(&mut controller, "CREATE SCHEMA reporting").succeeded);
    assert_eq!(
        controller.submit_query("USE reporting"),
        Submission::ContextSwitched("memory.reporting".to_string())
    );
    assert!(!controller.is_busy());

    assert!(run(&mut controller, "USE memory.main; CREATE TABLE t (a INT)").succeeded);
    assert_eq!(controller.context(), "memory.main");
    assert_eq!(controller.catalog()[0].schema, "main");
}

#[test]
fn test_use_applies_at_its_position_in_a_batch() {
    let mut controller = open(1000);
    assert!(run(&mut controller, "CREATE SCHEMA s; USE s; CREATE TABLE t (a INT)").succeeded);
    assert_eq!(controller.context(), "memory.s");
    assert_eq!(controller.catalog().len(), 1);
    assert_eq!(controller.catalog()[0].schema, "s");

    let done = run(
        &mut controller,
        "CREATE SCHEMA a; CREATE SCHEMA b; \
         USE a; CREATE TABLE x (i INT); USE b; CREATE TABLE y (i INT); \
         SELECT current_schema() AS schema",
    );
    assert!(done.succeeded);
    assert_eq!(controller.grid().rows, vec![vec!["b".to_string()]]);
    assert_eq!(controller.context(), "memory.b");
    let placed: Vec<(String, String)> = controller
        .catalog()
        .iter()
        .filter(|t| t.name == "x" || t.name == "y")
        .map(|t| (t.schema.clone(), t.name.clone()))
        .collect();
    assert!(placed.contains(&("a".to_string(), "x".to_string())));
    assert!(placed.contains(&("b".to_string(), "y".to_string())));
}

#[test]
fn test_paging_an_insert_then_select_batch_inserts_once() {
    let mut controller = open(2);
    run(&mut controller, "CREATE TABLE t (a INT)");
    run(&mut controller, "INSERT INTO t VALUES (1), (2), (3); SELECT * FROM t ORDER BY a");

    assert!(matches!(controller.next_page(), Submission::Started(_)));
    assert!(wait_for(&mut controller).succeeded);
    assert_eq!(controller.grid().page_label, "Showing 3-3 of 3 rows (Page 2 of 2)");

    let done = run(&mut controller, "SELECT COUNT(*) AS n FROM t");
    assert!(done.succeeded);
    assert_eq!(controller.grid().rows, vec![vec!["3".to_string()]]);

    let dir = TempDir::new().unwrap();
    let out = dir.path().join("t.csv");
    run(&mut controller, "INSERT INTO t VALUES (4); SELECT a FROM t");
    controller.export(&out).unwrap();
    // Header plus four rows: exporting does not insert again.
    assert_eq!(fs::read_to_string(&out).unwrap().lines().count(), 5);
}

#[test]
fn test_paging_through_a_large_result() {
    let mut controller = open(100);
    run(&mut controller, "SELECT range AS n FROM range(250) ORDER BY n");
    let result = controller.current_result().unwrap();
    assert_eq!(result.total_rows, Some(250));
    assert_eq!(result.row_count, 100);

    assert!(matches!(controller.next_page(), Submission::Started(_)));
    wait_for(&mut controller);
    assert_eq!(controller.grid().rows[0], vec!["100".to_string()]);

    assert!(matches!(controller.last_page(), Submission::Started(_)));
    wait_for(&mut controller);
    assert_eq!(controller.current_result().unwrap().row_count, 50);

    assert!(matches!(controller.first_page(), Submission::Started(_)));
    wait_for(&mut controller);
    assert_eq!(controller.grid().rows[0], vec!["0".to_string()]);
    assert_eq!(controller.prev_page(), Submission::Empty);
}

#[test]
fn test_rename_and_drop() {
    let mut controller = open(1000);
    run(&mut controller, "CREATE TABLE draft AS SELECT 1 AS a");
    controller.rename_table("draft", "published").unwrap();
    assert_eq!(controller.catalog()[0].name, "published");

    run(&mut controller, "CREATE TABLE other AS SELECT 2 AS b");
    assert!(controller.rename_table("published", "other").is_err());

    controller.drop_table("published").unwrap();
    controller.drop_table("memory.main.other").unwrap();
    assert!(controller.catalog().is_empty());
}

#[test]
fn test_export_last_result() {
    let dir = TempDir::new().unwrap();
    let mut controller = open(2);
    run(&mut controller, "SELECT range AS n FROM range(5)");

    let out = dir.path().join("out.csv");
    controller.export(&out).unwrap();
    let contents = fs::read_to_string(&out).unwrap();
    // The export holds every row, not just the visible page.
    assert_eq!(contents.lines().count(), 6);

    assert!(controller.export(&dir.path().join("out.txt")).is_err());
}

#[test]
fn test_reopen_starts_empty() {
    let mut controller = open(1000);
    run(&mut controller, "CREATE TABLE kept AS SELECT 1 AS a");
    assert_eq!(controller.catalog().len(), 1);
    controller.shutdown().unwrap();

    let mut controller = open(1000);
    controller.refresh_schema().unwrap();
    assert!(controller.catalog().is_empty());
    assert!(!run(&mut controller, "SELECT * FROM kept").succeeded);
}
