//! The embedded DuckDB engine.
//!
//! [`Engine`] owns the application's single in-memory DuckDB connection.
//! Every call into DuckDB goes through it: statement execution, paged
//! queries, file ingestion ([`crate::loader`]), catalog listing
//! ([`crate::catalog`]) and attaching remote databases ([`crate::attach`]).
//!
//! # Threading
//!
//! The handle is cheap to clone and `Send + Sync`. DuckDB's `Connection` is
//! not `Sync`, so it lives behind a mutex; whoever holds the lock (the UI
//! thread or the one query worker) has exclusive use of the connection for
//! the duration of the call.
//!
//! # Examples
//!
//! ```no_run
//! use quackview_engine::{Engine, PageRequest};
//!
//! let engine = Engine::open_in_memory().unwrap();
//! let result = engine
//!     .execute_paged("SELECT * FROM range(10)", PageRequest::first(5))
//!     .unwrap();
//! assert_eq!(result.row_count, 5);
//! assert_eq!(result.total_rows, Some(10));
//! ```

use crate::error::{EngineError, Result};
use crate::statement::{is_pageable, strip_trailing_semicolon, PageRequest, StatementKind};
use duckdb::types::{TimeUnit, ValueRef};
use duckdb::Connection;
use parking_lot::{Mutex, MutexGuard};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};

// ─── Public types ────────────────────────────────────────────────────────────

/// Handle to the embedded DuckDB database.
#[derive(Clone)]
pub struct Engine {
    /// Note: Mutex because DuckDB's Connection contains a RefCell and is not Sync.
    connection: Arc<Mutex<Connection>>,
}

/// The result of executing a statement.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct QueryResult {
    /// The statement that produced this result (after page rewriting was undone).
    pub sql: String,

    /// Column names in the result set.
    pub columns: Vec<String>,

    /// Rows returned by the query.
    pub rows: Vec<QueryResultRow>,

    /// Number of rows in `rows`.
    pub row_count: usize,

    /// Total number of rows the unpaged query would return, when known.
    ///
    /// `None` when the statement was not paged (or the count failed).
    pub total_rows: Option<usize>,

    /// The page this result represents, for paged queries.
    pub page: Option<PageRequest>,

    /// Execution time in milliseconds.
    pub execution_time_ms: u64,
}

/// A single row in query results.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueryResultRow {
    /// Column values encoded as JSON.
    pub values: Vec<JsonValue>,
}

impl QueryResult {
    /// True when another page follows this one.
    pub fn has_more(&self) -> bool {
        match (self.page, self.total_rows) {
            (Some(page), Some(total)) => page.offset() + self.row_count < total,
            _ => false,
        }
    }
}

// ─── Engine implementation ───────────────────────────────────────────────────

impl Engine {
    /// Open a fresh in-memory database.
    ///
    /// Nothing is persisted: closing the engine discards every table.
    pub fn open_in_memory() -> Result<Self> {
        let connection = Connection::open_in_memory().map_err(|e| {
            EngineError::DuckDb(format!("Failed to create DuckDB connection: {}", e))
        })?;

        if let Err(e) = configure_extensions(&connection) {
            warn!(error = %e, "Failed to configure extension autoloading");
        }

        info!("DuckDB engine initialized");

        Ok(Self {
            connection: Arc::new(Mutex::new(connection)),
        })
    }

    /// Lock the connection for a sequence of calls.
    pub(crate) fn lock(&self) -> MutexGuard<'_, Connection> {
        self.connection.lock()
    }

    /// Execute one statement and collect its full result.
    pub fn execute(&self, sql: &str) -> Result<QueryResult> {
        let start = Instant::now();
        let conn = self.lock();
        let mut result = run_statement(&conn, sql)?;
        result.execution_time_ms = start.elapsed().as_millis() as u64;
        Ok(result)
    }

    /// Execute a statement without collecting results.
    pub fn execute_batch(&self, sql: &str) -> Result<()> {
        let conn = self.lock();
        conn.execute_batch(sql).map_err(|e| EngineError::sql(sql, e.to_string()))
    }

    /// Execute one statement, returning only the requested page when the
    /// statement is a pageable query.
    ///
    /// The total row count is obtained with a `COUNT(*)` over the statement
    /// first. If counting fails the statement is executed unpaged and
    /// `total_rows` is `None`.
    pub fn execute_paged(&self, sql: &str, page: PageRequest) -> Result<QueryResult> {
        let start = Instant::now();
        let conn = self.lock();
        let mut result = run_paged(&conn, sql, page)?;
        result.execution_time_ms = start.elapsed().as_millis() as u64;
        Ok(result)
    }

    /// Execute a batch of statements in order while holding the connection,
    /// returning the (paged) result of the last one.
    ///
    /// The first failing statement aborts the batch; its error is returned
    /// and no result is produced.
    pub fn execute_script(&self, statements: &[String], page: PageRequest) -> Result<QueryResult> {
        let start = Instant::now();
        let Some((last, leading)) = statements.split_last() else {
            return Ok(QueryResult::default());
        };

        let conn = self.lock();
        for stmt in leading {
            run_statement(&conn, stmt)?;
        }
        let mut result = run_paged(&conn, last, page)?;
        result.execution_time_ms = start.elapsed().as_millis() as u64;

        info!(
            statements = statements.len(),
            rows = result.row_count,
            total_rows = ?result.total_rows,
            execution_time_ms = result.execution_time_ms,
            "Query executed successfully"
        );
        Ok(result)
    }

    /// Switch the default database/schema (`USE <target>`).
    ///
    /// Returns the new `database.schema` context as reported by DuckDB.
    pub fn use_context(&self, target: &str) -> Result<String> {
        let conn = self.lock();
        conn.execute_batch(&format!("USE {}", target))
            .map_err(|e| EngineError::sql(target, e.to_string()))?;
        current_context(&conn)
    }

    /// The current `database.schema` context.
    pub fn context(&self) -> Result<String> {
        current_context(&self.lock())
    }

    /// Run a single-value query such as `SELECT COUNT(*) ...`.
    pub fn query_count(&self, sql: &str) -> Result<usize> {
        count_rows_raw(&self.lock(), sql)
    }

    /// Export the result of `sql` to a file with DuckDB's `COPY`.
    ///
    /// `format` is one of `csv`, `json` or `parquet`.
    pub fn export_query(&self, sql: &str, path: &std::path::Path, format: &str) -> Result<()> {
        let copy = format!(
            "COPY ({}) TO {} (FORMAT {})",
            strip_trailing_semicolon(sql),
            quote_literal(&path.to_string_lossy()),
            format
        );
        let conn = self.lock();
        conn.execute_batch(&copy)
            .map_err(|e| EngineError::sql(&copy, e.to_string()))?;
        info!(path = %path.display(), format, "Query result exported");
        Ok(())
    }

    /// Close the connection.
    ///
    /// If another clone of the handle is still alive the connection is closed
    /// when the last clone is dropped instead.
    pub fn close(self) -> Result<()> {
        match Arc::try_unwrap(self.connection) {
            Ok(mutex) => {
                mutex
                    .into_inner()
                    .close()
                    .map_err(|(_, e)| EngineError::DuckDb(format!("Failed to close: {}", e)))?;
                info!("DuckDB engine closed");
            }
            Err(_) => debug!("Engine still shared; connection closes with the last handle"),
        }
        Ok(())
    }
}

// ─── Statement execution ─────────────────────────────────────────────────────

/// Execute one statement on an already-locked connection.
pub(crate) fn run_statement(conn: &Connection, sql: &str) -> Result<QueryResult> {
    let sql = strip_trailing_semicolon(sql);
    match StatementKind::classify(sql) {
        StatementKind::RowReturning => {
            let (columns, rows) = collect_rows(conn, sql)?;
            Ok(QueryResult {
                sql: sql.to_string(),
                columns,
                row_count: rows.len(),
                rows,
                ..Default::default()
            })
        }
        StatementKind::Modification => {
            let changed = conn
                .execute(sql, [])
                .map_err(|e| EngineError::sql(sql, e.to_string()))?;
            Ok(QueryResult {
                sql: sql.to_string(),
                columns: vec!["Count".to_string()],
                rows: vec![QueryResultRow {
                    values: vec![JsonValue::from(changed as u64)],
                }],
                row_count: 1,
                ..Default::default()
            })
        }
        StatementKind::Use(_) | StatementKind::CatalogChange | StatementKind::Other => {
            conn.execute_batch(sql)
                .map_err(|e| EngineError::sql(sql, e.to_string()))?;
            Ok(QueryResult {
                sql: sql.to_string(),
                ..Default::default()
            })
        }
    }
}

fn run_paged(conn: &Connection, sql: &str, page: PageRequest) -> Result<QueryResult> {
    let sql = strip_trailing_semicolon(sql);
    if page.page_size == 0 || !is_pageable(sql) {
        return run_statement(conn, sql);
    }

    let total = match count_rows_raw(
        conn,
        &format!("SELECT COUNT(*) FROM ({}) AS count_subquery", sql),
    ) {
        Ok(total) => total,
        Err(e) => {
            debug!(error = %e, "Row count failed; running query unpaged");
            return run_statement(conn, sql);
        }
    };

    let page = page.with_page(page.page_number, total);
    let (columns, rows) = collect_rows(conn, &page.apply(sql))?;
    Ok(QueryResult {
        sql: sql.to_string(),
        columns,
        row_count: rows.len(),
        rows,
        total_rows: Some(total),
        page: Some(page),
        execution_time_ms: 0,
    })
}

fn count_rows_raw(conn: &Connection, sql: &str) -> Result<usize> {
    let count: i64 = conn
        .query_row(sql, [], |row| row.get(0))
        .map_err(|e| EngineError::sql(sql, e.to_string()))?;
    Ok(count.max(0) as usize)
}

/// Extensions are loaded from the bundled build only; attaching a remote
/// database installs its extension explicitly.
fn configure_extensions(conn: &Connection) -> Result<()> {
    const SETTINGS: &str =
        "SET autoinstall_known_extensions=false; SET autoload_known_extensions=true;";
    conn.execute_batch(SETTINGS)
        .map_err(|e| EngineError::sql(SETTINGS, e.to_string()))
}

fn current_context(conn: &Connection) -> Result<String> {
    let (database, schema): (String, String) = conn.query_row(
        "SELECT current_database(), current_schema()",
        [],
        |row| Ok((row.get(0)?, row.get(1)?)),
    )?;
    Ok(format!("{}.{}", database, schema))
}

/// Prepare and run a row-returning statement, collecting every row.
fn collect_rows(conn: &Connection, sql: &str) -> Result<(Vec<String>, Vec<QueryResultRow>)> {
    let mut stmt = conn
        .prepare(sql)
        .map_err(|e| EngineError::sql(sql, e.to_string()))?;

    let mut rows_result = stmt
        .query([])
        .map_err(|e| EngineError::sql(sql, e.to_string()))?;

    // Column names are only available once the statement has run, and
    // `Rows` holds a mutable borrow on the statement, so probe the column
    // count from each row and read the names after dropping `Rows`.
    let mut rows = Vec::new();
    while let Some(row) = rows_result
        .next()
        .map_err(|e| EngineError::DuckDb(format!("Failed to fetch row: {}", e)))?
    {
        let mut values = Vec::new();
        for i in 0.. {
            match row.get_ref(i) {
                Ok(value) => values.push(duckdb_value_to_json(value)),
                Err(_) => break,
            }
        }
        rows.push(QueryResultRow { values });
    }
    drop(rows_result);

    let columns: Vec<String> = stmt.column_names().iter().map(|s| s.to_string()).collect();
    Ok((columns, rows))
}

// ─── Helpers ─────────────────────────────────────────────────────────────────

/// Quote an identifier for interpolation into SQL.
pub fn quote_identifier(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

/// Quote a string literal for interpolation into SQL.
pub fn quote_literal(value: &str) -> String {
    format!("'{}'", value.replace('\'', "''"))
}

fn to_micros(unit: TimeUnit, value: i64) -> i64 {
    match unit {
        TimeUnit::Second => value.saturating_mul(1_000_000),
        TimeUnit::Millisecond => value.saturating_mul(1_000),
        TimeUnit::Microsecond => value,
        TimeUnit::Nanosecond => value / 1_000,
    }
}

/// Convert a DuckDB `ValueRef` to a `serde_json::Value`.
///
/// Temporal and decimal values become strings so that they display exactly
/// as DuckDB would print them.
pub(crate) fn duckdb_value_to_json(value: ValueRef<'_>) -> JsonValue {
    match value {
        ValueRef::Null => JsonValue::Null,
        ValueRef::Boolean(b) => JsonValue::Bool(b),
        ValueRef::TinyInt(i) => JsonValue::Number(i.into()),
        ValueRef::SmallInt(i) => JsonValue::Number(i.into()),
        ValueRef::Int(i) => JsonValue::Number(i.into()),
        ValueRef::BigInt(i) => JsonValue::Number(i.into()),
        ValueRef::HugeInt(i) => {
            // Fit into i64 when possible; very large values fall back to a string.
            if let Ok(n) = i64::try_from(i) {
                JsonValue::Number(n.into())
            } else {
                JsonValue::String(i.to_string())
            }
        }
        ValueRef::UTinyInt(i) => JsonValue::Number(i.into()),
        ValueRef::USmallInt(i) => JsonValue::Number(i.into()),
        ValueRef::UInt(i) => JsonValue::Number(i.into()),
        ValueRef::UBigInt(i) => JsonValue::Number(i.into()),
        ValueRef::Float(f) => serde_json::Number::from_f64(f as f64)
            .map(JsonValue::Number)
            .unwrap_or(JsonValue::Null),
        ValueRef::Double(f) => serde_json::Number::from_f64(f)
            .map(JsonValue::Number)
            .unwrap_or(JsonValue::Null),
        ValueRef::Decimal(d) => JsonValue::String(d.to_string()),
        ValueRef::Text(s) => JsonValue::String(String::from_utf8_lossy(s).into_owned()),
        ValueRef::Blob(b) => JsonValue::String(base64::Engine::encode(
            &base64::engine::general_purpose::STANDARD,
            b,
        )),
        ValueRef::Date32(days) => chrono::NaiveDate::from_num_days_from_ce_opt(days + 719_163)
            .map(|d| JsonValue::String(d.format("%Y-%m-%d").to_string()))
            .unwrap_or(JsonValue::Null),
        ValueRef::Timestamp(unit, value) => {
            chrono::DateTime::from_timestamp_micros(to_micros(unit, value))
                .map(|dt| {
                    JsonValue::String(dt.naive_utc().format("%Y-%m-%d %H:%M:%S%.f").to_string())
                })
                .unwrap_or(JsonValue::Null)
        }
        ValueRef::Time64(unit, value) => {
            let micros = to_micros(unit, value);
            chrono::NaiveTime::from_num_seconds_from_midnight_opt(
                (micros / 1_000_000) as u32,
                ((micros % 1_000_000) * 1_000) as u32,
            )
            .map(|t| JsonValue::String(t.format("%H:%M:%S%.f").to_string()))
            .unwrap_or(JsonValue::Null)
        }
        ValueRef::Interval {
            months,
            days,
            nanos,
        } => JsonValue::String(format!("{} months {} days {} us", months, days, nanos / 1_000)),
        _ => JsonValue::String(format!("{:?}", value.to_owned())),
    }
}

// ─── Tests ───────────────────────────────────────────────────────────────────
