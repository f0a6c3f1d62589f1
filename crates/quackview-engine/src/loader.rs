//! Ingesting local files as catalog tables.
//!
//! CSV, JSON and Parquet are read by DuckDB's own table functions. Excel
//! workbooks are parsed into a dataframe first (see [`crate::excel`]) and
//! handed to DuckDB as a temporary Parquet file.
//!
//! Table names are derived from the file stem: `"My Data-2024.csv"` becomes
//! `my_data_2024`, and `_1`, `_2`, ... are appended when the name is taken.

use crate::engine::{quote_identifier, quote_literal, Engine};
use crate::error::{EngineError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Instant;
use tracing::{debug, info, warn};

/// Supported input file formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FileFormat {
    Csv,
    Excel,
    Json,
    Parquet,
}

impl FileFormat {
    /// All formats, in menu order.
    pub const ALL: [FileFormat; 4] = [
        FileFormat::Csv,
        FileFormat::Excel,
        FileFormat::Json,
        FileFormat::Parquet,
    ];

    /// Infer the format from a file extension.
    pub fn from_path(path: &Path) -> Option<Self> {
        let ext = path.extension()?.to_str()?.to_ascii_lowercase();
        match ext.as_str() {
            "csv" | "tsv" | "txt" => Some(FileFormat::Csv),
            "xlsx" | "xls" | "xlsm" | "xlsb" | "ods" => Some(FileFormat::Excel),
            "json" | "jsonl" | "ndjson" => Some(FileFormat::Json),
            "parquet" | "pq" => Some(FileFormat::Parquet),
            _ => None,
        }
    }

    /// Lowercase name used in commands and logs.
    pub fn as_str(&self) -> &'static str {
        match self {
            FileFormat::Csv => "csv",
            FileFormat::Excel => "excel",
            FileFormat::Json => "json",
            FileFormat::Parquet => "parquet",
        }
    }

    /// Extensions accepted for this format.
    pub fn extensions(&self) -> &'static [&'static str] {
        match self {
            FileFormat::Csv => &["csv", "tsv", "txt"],
            FileFormat::Excel => &["xlsx", "xls", "xlsm", "xlsb", "ods"],
            FileFormat::Json => &["json", "jsonl", "ndjson"],
            FileFormat::Parquet => &["parquet", "pq"],
        }
    }
}

impl fmt::Display for FileFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FileFormat {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "csv" | "tsv" => Ok(FileFormat::Csv),
            "excel" | "xlsx" | "xls" => Ok(FileFormat::Excel),
            "json" | "jsonl" | "ndjson" => Ok(FileFormat::Json),
            "parquet" => Ok(FileFormat::Parquet),
            other => Err(format!(
                "unknown file format '{}' (expected csv, excel, json or parquet)",
                other
            )),
        }
    }
}

/// A table created from a file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoadedTable {
    /// Name of the table in the catalog.
    pub name: String,
    /// The file it was loaded from.
    pub source: PathBuf,
    /// The format used to read it.
    pub format: FileFormat,
    /// Number of rows ingested.
    pub row_count: usize,
}

/// Derive a table name from a file path.
///
/// Spaces and hyphens (and any other character that is not ASCII
/// alphanumeric) become `_`, the result is lowercased, and names that would
/// start with a digit get a `t_` prefix.
pub fn derive_table_name(path: &Path) -> String {
    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();

    let mut name: String = stem
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '_' {
                c.to_ascii_lowercase()
            } else {
                '_'
            }
        })
        .collect();

    if name.is_empty() {
        name.push_str("table");
    } else if name.starts_with(|c: char| c.is_ascii_digit()) {
        name.insert_str(0, "t_");
    }
    name
}

/// Pick the first of `base`, `base_1`, `base_2`, ... not in `existing`
/// (compared case-insensitively).
pub fn unique_name<'a>(base: &str, existing: impl IntoIterator<Item = &'a str>) -> String {
    let taken: std::collections::HashSet<String> =
        existing.into_iter().map(|s| s.to_lowercase()).collect();
    if !taken.contains(&base.to_lowercase()) {
        return base.to_string();
    }
    let mut counter = 1;
    loop {
        let candidate = format!("{}_{}", base, counter);
        if !taken.contains(&candidate.to_lowercase()) {
            return candidate;
        }
        counter += 1;
    }
}

impl Engine {
    /// Table names in the current schema (`SHOW TABLES`).
    pub fn table_names(&self) -> Result<Vec<String>> {
        let result = self.execute("SHOW TABLES")?;
        Ok(result
            .rows
            .iter()
            .filter_map(|row| row.values.first())
            .filter_map(|v| v.as_str().map(str::to_string))
            .collect())
    }

    /// `base` if unused in the current schema, otherwise `base_N`.
    pub fn unique_table_name(&self, base: &str) -> String {
        match self.table_names() {
            Ok(existing) => unique_name(base, existing.iter().map(String::as_str)),
            Err(e) => {
                warn!(error = %e, "Could not list tables; using base name");
                base.to_string()
            }
        }
    }

    /// Load a file into a new table named after it.
    ///
    /// On failure nothing is created in the catalog.
    pub fn load_file(&self, path: &Path, format: FileFormat) -> Result<LoadedTable> {
        let start = Instant::now();
        if !path.is_file() {
            return Err(EngineError::load(path, "file does not exist"));
        }

        let name = self.unique_table_name(&derive_table_name(path));
        debug!(path = %path.display(), table = %name, format = %format, "Loading file");

        match format {
            FileFormat::Excel => {
                let mut df = crate::excel::read_excel(path, None)
                    .map_err(|e| EngineError::load(path, e.detail()))?;
                let staged = crate::excel::write_parquet(&mut df)
                    .map_err(|e| EngineError::load(path, e.detail()))?;
                self.create_table_from(&name, "read_parquet", staged.path())
                    .map_err(|e| EngineError::load(path, e.detail()))?;
            }
            FileFormat::Csv => self
                .create_table_from(&name, "read_csv_auto", path)
                .map_err(|e| EngineError::load(path, e.detail()))?,
            FileFormat::Json => self
                .create_table_from(&name, "read_json_auto", path)
                .map_err(|e| EngineError::load(path, e.detail()))?,
            FileFormat::Parquet => self
                .create_table_from(&name, "read_parquet", path)
                .map_err(|e| EngineError::load(path, e.detail()))?,
        }

        let row_count = self
            .query_count(&format!("SELECT COUNT(*) FROM {}", quote_identifier(&name)))
            .unwrap_or(0);

        info!(
            path = %path.display(),
            table = %name,
            format = %format,
            rows = row_count,
            elapsed_ms = start.elapsed().as_millis() as u64,
            "File loaded"
        );

        Ok(LoadedTable {
            name,
            source: path.to_path_buf(),
            format,
            row_count,
        })
    }

    fn create_table_from(&self, name: &str, reader: &str, path: &Path) -> Result<()> {
        self.execute_batch(&format!(
            "CREATE TABLE {} AS SELECT * FROM {}({})",
            quote_identifier(name),
            reader,
            quote_literal(&path.to_string_lossy())
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_derive_table_name_normalizes_spaces_and_hyphens() {
        assert_eq!(
            derive_table_name(Path::new("/data/My Data-2024.csv")),
            "my_data_2024"
        );
        assert_eq!(derive_table_name(Path::new("sales.q1.parquet")), "sales_q1");
        assert_eq!(derive_table_name(Path::new("2024 report.xlsx")), "t_2024_report");
    }

    #[test]
    fn test_unique_name_appends_counter() {
        let existing = ["orders", "Orders_1"];
        assert_eq!(unique_name("customers", existing), "customers");
        assert_eq!(unique_name("orders", existing), "orders_2");
    }

    #[test]
    fn test_format_from_path() {
        assert_eq!(
            FileFormat::from_path(Path::new("a.JSONL")),
            Some(FileFormat::Json)
        );
        assert_eq!(
            FileFormat::from_path(Path::new("a.xlsx")),
            Some(FileFormat::Excel)
        );
        assert_eq!(FileFormat::from_path(Path::new("a.bin")), None);
        assert_eq!("Parquet".parse::<FileFormat>(), Ok(FileFormat::Parquet));
        assert!("yaml".parse::<FileFormat>().is_err());
    }

    proptest! {
        #[test]
        fn prop_derived_names_are_plain_identifiers(stem in "[ A-Za-z0-9_\\-\\.]{0,24}") {
            let name = derive_table_name(Path::new(&format!("{}.csv", stem)));
            prop_assert!(!name.is_empty());
            prop_assert!(!name.starts_with(|c: char| c.is_ascii_digit()));
            prop_assert!(name.chars().all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_'));
        }
    }
}
