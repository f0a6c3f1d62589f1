//! Excel ingestion through a dataframe.
//!
//! A worksheet is read with `calamine`, each column's type is inferred from
//! its cells, and the columns are assembled into a `polars` [`DataFrame`].
//! The frame is then written to a temporary Parquet file that DuckDB reads
//! with `read_parquet`.

use crate::error::{EngineError, Result};
use calamine::{open_workbook_auto, Data, DataType as CellType, Reader};
use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use polars::prelude::*;
use std::collections::HashMap;
use std::path::Path;
use tempfile::NamedTempFile;
use tracing::debug;

/// Column types an Excel column can be mapped to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ExcelColType {
    Int64,
    Float64,
    Boolean,
    Date,
    Datetime,
    Utf8,
}

/// Read one worksheet into a dataframe.
///
/// `sheet` selects a worksheet by name or 0-based index; the first sheet is
/// used when it is `None`. The first row supplies column names.
pub fn read_excel(path: &Path, sheet: Option<&str>) -> Result<DataFrame> {
    let mut workbook = open_workbook_auto(path)?;
    if workbook.sheet_names().is_empty() {
        return Err(EngineError::Excel("workbook has no worksheets".to_string()));
    }

    let range = match sheet {
        Some(sel) => match sel.parse::<usize>() {
            Ok(idx) => workbook
                .worksheet_range_at(idx)
                .ok_or_else(|| EngineError::Excel(format!("no sheet at index {}", idx)))??,
            Err(_) => workbook.worksheet_range(sel)?,
        },
        None => workbook
            .worksheet_range_at(0)
            .ok_or_else(|| EngineError::Excel("no first sheet".to_string()))??,
    };

    let rows: Vec<Vec<Data>> = range.rows().map(|r| r.to_vec()).collect();
    let Some(header_row) = rows.first() else {
        return Err(EngineError::Excel("worksheet is empty".to_string()));
    };

    let headers = column_names(header_row);
    let mut columns: Vec<Column> = Vec::with_capacity(headers.len());
    for (col_idx, name) in headers.iter().enumerate() {
        let cells: Vec<Option<&Data>> = rows[1..].iter().map(|row| row.get(col_idx)).collect();
        let col_type = infer_column_type(&cells);
        debug!(column = %name, ty = ?col_type, "Inferred Excel column type");
        columns.push(column_to_series(name, &cells, col_type)?.into());
    }

    Ok(DataFrame::new(columns)?)
}

/// Write a dataframe to a temporary Parquet file.
///
/// The file is deleted when the returned handle is dropped.
pub fn write_parquet(df: &mut DataFrame) -> Result<NamedTempFile> {
    let file = tempfile::Builder::new()
        .prefix("quackview-")
        .suffix(".parquet")
        .tempfile()?;
    ParquetWriter::new(file.as_file()).finish(df)?;
    Ok(file)
}

/// Header cells as unique, non-empty column names.
fn column_names(header_row: &[Data]) -> Vec<String> {
    let mut seen: HashMap<String, usize> = HashMap::new();
    header_row
        .iter()
        .enumerate()
        .map(|(idx, cell)| {
            let raw = cell.as_string().unwrap_or_else(|| cell.to_string());
            let base = if raw.trim().is_empty() {
                format!("column_{}", idx + 1)
            } else {
                raw.trim().to_string()
            };
            let count = seen.entry(base.to_lowercase()).or_insert(0);
            *count += 1;
            if *count == 1 {
                base
            } else {
                format!("{}_{}", base, count)
            }
        })
        .collect()
}

/// Infer a column type from its cells.
///
/// Any string cell makes the column text unless every non-empty cell parses
/// as a date/datetime. Whole-number floats become integers.
pub(crate) fn infer_column_type(cells: &[Option<&Data>]) -> ExcelColType {
    let mut has_string = false;
    let mut has_float = false;
    let mut has_int = false;
    let mut has_bool = false;
    let mut has_datetime = false;
    for cell in cells.iter().flatten() {
        if cell.is_string() {
            has_string = true;
            break;
        }
        if cell.is_float() {
            has_float = true;
        }
        if cell.is_int() {
            has_int = true;
        }
        if cell.is_bool() {
            has_bool = true;
        }
        if cell.is_datetime() || cell.is_datetime_iso() {
            has_datetime = true;
        }
    }

    if has_string {
        let non_empty: Vec<&&Data> = cells.iter().flatten().filter(|c| !c.is_empty()).collect();
        if !non_empty.is_empty() && non_empty.iter().all(|c| cell_to_datetime(c).is_some()) {
            return temporal_type(cells);
        }
        ExcelColType::Utf8
    } else if has_datetime {
        temporal_type(cells)
    } else if has_float {
        let all_whole = cells.iter().flatten().all(|cell| {
            cell.as_f64()
                .map_or(true, |f| f.is_finite() && (f - f.trunc()).abs() < 1e-10)
        });
        if all_whole {
            ExcelColType::Int64
        } else {
            ExcelColType::Float64
        }
    } else if has_int {
        ExcelColType::Int64
    } else if has_bool {
        ExcelColType::Boolean
    } else {
        ExcelColType::Utf8
    }
}

fn temporal_type(cells: &[Option<&Data>]) -> ExcelColType {
    let midnight = NaiveTime::MIN;
    let all_midnight = cells
        .iter()
        .flatten()
        .filter_map(|c| cell_to_datetime(c))
        .all(|dt| dt.time() == midnight);
    if all_midnight {
        ExcelColType::Date
    } else {
        ExcelColType::Datetime
    }
}

/// Excel serial date, ISO datetime cell, or a string in a common ISO layout.
fn cell_to_datetime(cell: &Data) -> Option<NaiveDateTime> {
    if let Some(dt) = cell.as_datetime() {
        return Some(dt);
    }
    let s = cell.get_datetime_iso().or_else(|| cell.get_string())?;
    parse_datetime_str(s)
}

fn parse_datetime_str(s: &str) -> Option<NaiveDateTime> {
    const FORMATS: &[&str] = &[
        "%Y-%m-%dT%H:%M:%S%.f",
        "%Y-%m-%dT%H:%M:%S",
        "%Y-%m-%d %H:%M:%S%.f",
        "%Y-%m-%d %H:%M:%S",
    ];
    let s = s.trim();
    if s.is_empty() {
        return None;
    }
    FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(s, fmt).ok())
        .or_else(|| {
            NaiveDate::parse_from_str(s, "%Y-%m-%d")
                .ok()
                .map(|d| d.and_time(NaiveTime::MIN))
        })
}

fn column_to_series(name: &str, cells: &[Option<&Data>], col_type: ExcelColType) -> Result<Series> {
    let series = match col_type {
        ExcelColType::Int64 => {
            let v: Vec<Option<i64>> = cells.iter().map(|c| c.and_then(|cell| cell.as_i64())).collect();
            Series::new(name.into(), v)
        }
        ExcelColType::Float64 => {
            let v: Vec<Option<f64>> = cells.iter().map(|c| c.and_then(|cell| cell.as_f64())).collect();
            Series::new(name.into(), v)
        }
        ExcelColType::Boolean => {
            let v: Vec<Option<bool>> = cells.iter().map(|c| c.and_then(|cell| cell.get_bool())).collect();
            Series::new(name.into(), v)
        }
        ExcelColType::Utf8 => {
            let v: Vec<Option<String>> = cells
                .iter()
                .map(|c| c.filter(|cell| !cell.is_empty()).and_then(|cell| cell.as_string()))
                .collect();
            Series::new(name.into(), v)
        }
        ExcelColType::Date => {
            let epoch = NaiveDate::from_ymd_opt(1970, 1, 1).unwrap_or_default();
            let v: Vec<Option<i32>> = cells
                .iter()
                .map(|c| {
                    c.and_then(cell_to_datetime)
                        .map(|dt| (dt.date() - epoch).num_days() as i32)
                })
                .collect();
            Series::new(name.into(), v).cast(&DataType::Date)?
        }
        ExcelColType::Datetime => {
            let v: Vec<Option<i64>> = cells
                .iter()
                .map(|c| c.and_then(cell_to_datetime).map(|dt| dt.and_utc().timestamp_micros()))
                .collect();
            Series::new(name.into(), v).cast(&DataType::Datetime(TimeUnit::Microseconds, None))?
        }
    };
    Ok(series)
}
