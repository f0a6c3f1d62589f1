//! Embedded query engine for quackview (DuckDB-powered SQL over local files).
//!
//! This crate is a workspace member that isolates the heavy `duckdb` (bundled C++)
//! and `polars` dependencies into their own compilation unit, so the terminal
//! front-end can be rebuilt without recompiling DuckDB.
//!
//! # Overview
//!
//! 1. A single in-memory connection is opened with [`Engine::open_in_memory`].
//! 2. Files are registered as tables with [`Engine::load_file`].
//! 3. SQL is executed (and optionally paged) with [`Engine::execute_script`].
//! 4. Results come back as JSON-encoded rows in a [`QueryResult`].
//!
//! # Modules
//!
//! - [`engine`] -- Connection handle, statement execution, value conversion.
//! - [`statement`] -- Statement splitting, classification and page rewriting.
//! - [`loader`] -- CSV/Excel/JSON/Parquet ingestion and table naming.
//! - [`excel`] -- Workbook parsing into a dataframe.
//! - [`catalog`] -- Catalog listing, rename and drop.
//! - [`attach`] -- Attaching MySQL/PostgreSQL/SQLite databases.
//! - [`error`] -- Domain-specific error types.

pub mod attach;
pub mod catalog;
pub mod engine;
pub mod error;
pub mod excel;
pub mod loader;
pub mod statement;

pub use attach::{ConnectionProfile, RemoteKind};
pub use catalog::{
    completion_names, describe_sql, is_valid_identifier, select_sql, CatalogColumn, CatalogTable,
    TableKind,
};
pub use engine::{quote_identifier, quote_literal, Engine, QueryResult, QueryResultRow};
pub use error::{EngineError, Result};
pub use loader::{derive_table_name, unique_name, FileFormat, LoadedTable};
pub use statement::{split_statements, PageRequest, StatementKind};
