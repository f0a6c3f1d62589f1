//! Error types for the quackview engine.
//!
//! Every failure coming out of DuckDB, the Excel reader or the dataframe
//! layer is mapped onto [`EngineError`] so that callers only ever see one
//! error type with a human-readable message.

use std::path::{Path, PathBuf};

/// Errors from the embedded engine.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    /// The SQL statement could not be parsed, bound or resolved.
    ///
    /// The inner string contains the DuckDB diagnostic message.
    #[error("SQL error: {0}")]
    Sql(String),

    /// A DuckDB operation failed for a reason other than the statement text.
    #[error("DuckDB error: {0}")]
    DuckDb(String),

    /// A file could not be ingested into the catalog.
    #[error("Failed to load {}: {detail}", path.display())]
    Load {
        /// The file that was being loaded.
        path: PathBuf,
        /// What went wrong.
        detail: String,
    },

    /// The Excel workbook could not be read.
    #[error("Excel error: {0}")]
    Excel(String),

    /// Building or writing the intermediate dataframe failed.
    #[error("DataFrame error: {0}")]
    DataFrame(String),

    /// A catalog operation was refused (e.g. renaming onto an existing table).
    #[error("Catalog error: {0}")]
    Catalog(String),

    /// A user-supplied name is not a valid identifier.
    #[error("Invalid identifier: {0}")]
    InvalidName(String),

    /// Filesystem failure.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl EngineError {
    /// Create a `Sql` error that also shows (a prefix of) the offending query.
    pub fn sql(sql: &str, detail: impl Into<String>) -> Self {
        let detail = detail.into();
        let preview: String = sql.chars().take(120).collect();
        if preview.len() < sql.len() {
            Self::Sql(format!("{} (query: {}...)", detail, preview))
        } else {
            Self::Sql(format!("{} (query: {})", detail, preview))
        }
    }

    /// Create a `Load` error for `path`.
    pub fn load(path: &Path, detail: impl Into<String>) -> Self {
        Self::Load {
            path: path.to_path_buf(),
            detail: detail.into(),
        }
    }

    /// The bare message without the variant prefix, suitable for a popup.
    pub fn detail(&self) -> String {
        match self {
            Self::Sql(m)
            | Self::DuckDb(m)
            | Self::Excel(m)
            | Self::DataFrame(m)
            | Self::Catalog(m)
            | Self::InvalidName(m) => m.clone(),
            Self::Load { detail, .. } => detail.clone(),
            Self::Io(e) => e.to_string(),
        }
    }
}

impl From<duckdb::Error> for EngineError {
    fn from(e: duckdb::Error) -> Self {
        let msg = e.to_string();
        // DuckDB prefixes its diagnostics with the phase that rejected the query.
        if msg.contains("Parser Error")
            || msg.contains("Binder Error")
            || msg.contains("Catalog Error")
        {
            EngineError::Sql(msg)
        } else {
            EngineError::DuckDb(msg)
        }
    }
}

impl From<calamine::Error> for EngineError {
    fn from(e: calamine::Error) -> Self {
        EngineError::Excel(e.to_string())
    }
}

impl From<polars::error::PolarsError> for EngineError {
    fn from(e: polars::error::PolarsError) -> Self {
        EngineError::DataFrame(e.to_string())
    }
}

/// A specialised `Result` type for engine operations.
pub type Result<T> = std::result::Result<T, EngineError>;
