//! Catalog listing and table-level operations.
//!
//! The schema tree and the editor's completions are both built from
//! [`Engine::list_catalog`], which reads DuckDB's `duckdb_columns()` table
//! function. Every database attached to the connection is included.

use crate::engine::{quote_identifier, quote_literal, Engine};
use crate::error::{EngineError, Result};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::sync::OnceLock;
use tracing::info;

const CATALOG_SQL: &str = "\
SELECT c.database_name, c.schema_name, c.table_name, c.column_name, c.data_type,
       v.view_name IS NOT NULL AS is_view
FROM duckdb_columns() c
LEFT JOIN duckdb_views() v
  ON v.database_name = c.database_name
 AND v.schema_name = c.schema_name
 AND v.view_name = c.table_name
WHERE NOT c.internal
ORDER BY c.database_name, c.schema_name, c.table_name, c.column_index";

/// Whether a catalog entry is a base table or a view.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TableKind {
    Table,
    View,
}

/// One column of a catalog table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogColumn {
    pub name: String,
    /// DuckDB type name, e.g. `BIGINT` or `VARCHAR`.
    pub data_type: String,
}

/// A table or view with its columns in declaration order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogTable {
    pub database: String,
    pub schema: String,
    pub name: String,
    pub kind: TableKind,
    pub columns: Vec<CatalogColumn>,
}

impl CatalogTable {
    /// `"database"."schema"."name"`, quoted for use in SQL.
    pub fn qualified_name(&self) -> String {
        format!(
            "{}.{}.{}",
            quote_identifier(&self.database),
            quote_identifier(&self.schema),
            quote_identifier(&self.name)
        )
    }
}

/// Query that shows the first rows of a table.
pub fn select_sql(table: &CatalogTable) -> String {
    format!("SELECT * FROM {} LIMIT 100;", table.qualified_name())
}

/// Query that describes a table's columns.
pub fn describe_sql(table: &CatalogTable) -> String {
    format!("DESCRIBE {};", table.qualified_name())
}

/// Table names offered for completion: each bare name once, plus the
/// `schema.table` and `database.schema.table` forms.
pub fn completion_names(tables: &[CatalogTable]) -> Vec<String> {
    let mut names = BTreeSet::new();
    for table in tables {
        names.insert(table.name.clone());
        names.insert(format!("{}.{}", table.schema, table.name));
        names.insert(format!("{}.{}.{}", table.database, table.schema, table.name));
    }
    names.into_iter().collect()
}

/// Plain SQL identifier: a letter or underscore followed by letters,
/// digits or underscores.
pub fn is_valid_identifier(name: &str) -> bool {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN
        .get_or_init(|| Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*$").expect("static regex"))
        .is_match(name)
}

/// Quote a possibly dotted name (`db.schema.table`) part by part.
fn quote_qualified(name: &str) -> String {
    name.split('.')
        .map(quote_identifier)
        .collect::<Vec<_>>()
        .join(".")
}

impl Engine {
    /// Every non-internal table and view with its columns.
    pub fn list_catalog(&self) -> Result<Vec<CatalogTable>> {
        let conn = self.lock();
        let mut stmt = conn.prepare(CATALOG_SQL)?;
        let rows = stmt.query_map([], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, String>(2)?,
                row.get::<_, String>(3)?,
                row.get::<_, String>(4)?,
                row.get::<_, bool>(5)?,
            ))
        })?;

        let mut tables: Vec<CatalogTable> = Vec::new();
        for row in rows {
            let (database, schema, table, column, data_type, is_view) = row?;
            let same_table = tables.last().is_some_and(|t| {
                t.database == database && t.schema == schema && t.name == table
            });
            if !same_table {
                tables.push(CatalogTable {
                    database,
                    schema,
                    name: table,
                    kind: if is_view {
                        TableKind::View
                    } else {
                        TableKind::Table
                    },
                    columns: Vec::new(),
                });
            }
            if let Some(current) = tables.last_mut() {
                current.columns.push(CatalogColumn {
                    name: column,
                    data_type,
                });
            }
        }
        Ok(tables)
    }

    /// Drop a table or view. `name` may be qualified with `schema.` or
    /// `database.schema.`.
    pub fn drop_table(&self, name: &str) -> Result<()> {
        let bare = name.rsplit('.').next().unwrap_or(name);
        let is_view = self
            .query_count(&format!(
                "SELECT COUNT(*) FROM duckdb_views() WHERE NOT internal AND view_name = {}",
                quote_literal(bare)
            ))
            .unwrap_or(0)
            > 0;
        let object = if is_view { "VIEW" } else { "TABLE" };
        self.execute_batch(&format!("DROP {} {}", object, quote_qualified(name)))?;
        info!(table = %name, kind = object, "Dropped");
        Ok(())
    }

    /// Rename a table in the current schema.
    ///
    /// Fails without touching the catalog when `new_name` is not a plain
    /// identifier or already names a table.
    pub fn rename_table(&self, old_name: &str, new_name: &str) -> Result<()> {
        let new_name = new_name.trim();
        if !is_valid_identifier(new_name) {
            return Err(EngineError::InvalidName(new_name.to_string()));
        }
        if old_name.eq_ignore_ascii_case(new_name) {
            return Ok(());
        }
        let existing = self.table_names()?;
        if existing.iter().any(|t| t.eq_ignore_ascii_case(new_name)) {
            return Err(EngineError::Catalog(format!(
                "a table named '{}' already exists",
                new_name
            )));
        }
        self.execute_batch(&format!(
            "ALTER TABLE {} RENAME TO {}",
            quote_qualified(old_name),
            quote_identifier(new_name)
        ))?;
        info!(from = %old_name, to = %new_name, "Table renamed");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn engine() -> Engine {
        let engine = Engine::open_in_memory().unwrap();
        engine
            .execute_batch(
                "CREATE TABLE orders (id INTEGER, total DECIMAL(10,2), note VARCHAR);
                 CREATE TABLE customers (id INTEGER, name VARCHAR);
                 CREATE VIEW big_orders AS SELECT id FROM orders WHERE total > 100;",
            )
            .unwrap();
        engine
    }

    #[test]
    fn test_list_catalog_groups_columns() {
        let tables = engine().list_catalog().unwrap();
        let names: Vec<&str> = tables.iter().map(|t| t.name.as_str()).collect();
        assert_eq!(names, vec!["big_orders", "customers", "orders"]);

        let orders = &tables[2];
        assert_eq!(orders.database, "memory");
        assert_eq!(orders.schema, "main");
        assert_eq!(orders.kind, TableKind::Table);
        let cols: Vec<&str> = orders.columns.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(cols, vec!["id", "total", "note"]);
        assert_eq!(orders.columns[0].data_type, "INTEGER");
        assert_eq!(tables[0].kind, TableKind::View);
    }

    #[test]
    fn test_generated_sql() {
        let tables = engine().list_catalog().unwrap();
        assert_eq!(
            select_sql(&tables[1]),
            "SELECT * FROM \"memory\".\"main\".\"customers\" LIMIT 100;"
        );
        assert_eq!(
            describe_sql(&tables[1]),
            "DESCRIBE \"memory\".\"main\".\"customers\";"
        );
    }

    #[test]
    fn test_rename_rejects_existing_name() {
        let engine = engine();
        let err = engine.rename_table("orders", "Customers").unwrap_err();
        assert!(matches!(err, EngineError::Catalog(_)));
        assert!(matches!(
            engine.rename_table("orders", "bad name"),
            Err(EngineError::InvalidName(_))
        ));

        engine.rename_table("orders", "sales").unwrap();
        let names = engine.table_names().unwrap();
        assert!(names.contains(&"sales".to_string()));
        assert!(!names.contains(&"orders".to_string()));
    }

    #[test]
    fn test_drop_table_and_view() {
        let engine = engine();
        engine.drop_table("big_orders").unwrap();
        engine.drop_table("main.customers").unwrap();
        let tables = engine.list_catalog().unwrap();
        assert_eq!(tables.len(), 1);
        assert_eq!(tables[0].name, "orders");
        assert!(engine.drop_table("nope").is_err());
    }

    #[test]
    fn test_completion_names() {
        let tables = engine().list_catalog().unwrap();
        let names = completion_names(&tables);
        assert!(names.contains(&"orders".to_string()));
        assert!(names.contains(&"main.orders".to_string()));
        assert!(names.contains(&"memory.main.orders".to_string()));
    }

    #[test]
    fn test_identifier_validation() {
        assert!(is_valid_identifier("_t1"));
        assert!(!is_valid_identifier("1t"));
        assert!(!is_valid_identifier("a-b"));
        assert!(!is_valid_identifier(""));
    }
}
