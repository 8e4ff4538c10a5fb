//! Generic CSV loading and column extraction shared by the reference tables,
//! the vectorizer and the analytics helpers.
//!
//! Everything is loaded as strings first; typed views are produced on demand
//! so dirty source files never fail at read time.

use std::collections::HashMap;
use std::fs::File;
use std::io::Write;
use std::path::Path;

use polars::prelude::*;

use crate::error::{PolicyError, Result};
use crate::schema::long;

/// Read a CSV file with all columns as String dtype.
/// Trims whitespace from column names and applies optional rename.
pub fn read_csv_as_strings(
    path: &Path,
    rename: Option<&HashMap<String, String>>,
) -> Result<DataFrame> {
    let mut df = CsvReadOptions::default()
        .with_has_header(true)
        .with_infer_schema_length(Some(0)) // all columns as String
        .try_into_reader_with_file_path(Some(path.to_path_buf()))?
        .finish()?;

    let trimmed: Vec<String> = df
        .get_column_names_str()
        .iter()
        .map(|c| c.trim().to_string())
        .collect();
    df.set_column_names(trimmed.as_slice())?;

    if let Some(map) = rename {
        let old: Vec<&str> = map.keys().map(|s| s.as_str()).collect();
        let new: Vec<&str> = map.values().map(|s| s.as_str()).collect();
        df = df.lazy().rename(old, new, true).collect()?;
    }

    tracing::debug!(
        path = %path.display(),
        rows = df.height(),
        columns = df.width(),
        "Loaded CSV"
    );
    Ok(df)
}

/// Write a frame as CSV with a header row.
pub fn write_csv(df: &mut DataFrame, path: &Path) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    write_csv_to(df, File::create(path)?)
}

/// Write a frame as CSV to any writer (stdout in the CLI).
pub fn write_csv_to<W: Write>(df: &mut DataFrame, mut writer: W) -> Result<()> {
    CsvWriter::new(&mut writer).include_header(true).finish(df)?;
    Ok(())
}

pub fn require_columns(df: &DataFrame, required: &[&str]) -> Result<()> {
    for &col_name in required {
        if df.column(col_name).is_err() {
            return Err(PolicyError::MissingColumn(col_name.to_string()));
        }
    }
    Ok(())
}

// ── Parse helpers ───────────────────────────────────────────────────────────

/// Parse a column to Float64. String columns are trimmed first; values that
/// do not parse become null.
pub fn parse_float(df: DataFrame, column: &str) -> Result<DataFrame> {
    parse_column(df, column, DataType::Float64)
}

/// Parse a column to Int64.
pub fn parse_int(df: DataFrame, column: &str) -> Result<DataFrame> {
    parse_column(df, column, DataType::Int64)
}

fn parse_column(df: DataFrame, column: &str, dtype: DataType) -> Result<DataFrame> {
    let is_string = df
        .column(column)
        .map_err(|_| PolicyError::MissingColumn(column.to_string()))?
        .dtype()
        == &DataType::String;

    let expr = if is_string {
        col(column).str().strip_chars(lit(" \t\r\n")).cast(dtype)
    } else {
        col(column).cast(dtype)
    };
    Ok(df.lazy().with_columns([expr]).collect()?)
}

// ── Column extraction ───────────────────────────────────────────────────────

/// String values of a column. A missing column yields all-null values so
/// that optional metadata columns degrade instead of failing.
pub fn optional_str_values(df: &DataFrame, column: &str) -> Result<Vec<Option<String>>> {
    match df.column(column) {
        Ok(c) => {
            let c = c.cast(&DataType::String)?;
            Ok(c.str()?
                .into_iter()
                .map(|v| v.map(|s| s.to_string()))
                .collect())
        }
        Err(_) => Ok(vec![None; df.height()]),
    }
}

pub fn str_values(df: &DataFrame, column: &str) -> Result<Vec<Option<String>>> {
    require_columns(df, &[column])?;
    optional_str_values(df, column)
}

/// Float values of a column. String cells are trimmed and parsed; anything
/// that is not a finite number becomes `None`.
pub fn f64_values(df: &DataFrame, column: &str) -> Result<Vec<Option<f64>>> {
    let c = df
        .column(column)
        .map_err(|_| PolicyError::MissingColumn(column.to_string()))?;
    if c.dtype() == &DataType::String {
        Ok(c.str()?.into_iter().map(|v| v.and_then(parse_number)).collect())
    } else {
        let c = c.cast(&DataType::Float64)?;
        Ok(c.f64()?
            .into_iter()
            .map(|v| v.filter(|x| x.is_finite()))
            .collect())
    }
}

/// Integer values of a column (years). Accepts `2005` and `2005.0`.
pub fn i64_values(df: &DataFrame, column: &str) -> Result<Vec<Option<i64>>> {
    Ok(f64_values(df, column)?
        .into_iter()
        .map(|v| v.filter(|x| x.fract() == 0.0).map(|x| x as i64))
        .collect())
}

/// Parse a trimmed numeric cell. Rejects NaN and infinities.
pub fn parse_number(raw: &str) -> Option<f64> {
    raw.trim().parse::<f64>().ok().filter(|v| v.is_finite())
}

/// Rows whose `column` equals `value`.
pub fn filter_eq(df: &DataFrame, column: &str, value: &str) -> Result<DataFrame> {
    require_columns(df, &[column])?;
    Ok(df
        .clone()
        .lazy()
        .filter(col(column).eq(lit(value)))
        .collect()?)
}

// ── Reshaping ───────────────────────────────────────────────────────────────

/// Melt wide year columns into long `(entity, year, value)` rows.
///
/// Year columns are the ones whose name, after stripping `prefix`, parses as
/// an integer (`1990`, or `Y_1990` with prefix `Y_`). Empty or non-numeric
/// cells are dropped.
pub fn melt_year_columns(df: &DataFrame, id_column: &str, prefix: &str) -> Result<DataFrame> {
    let ids = str_values(df, id_column)?;

    let year_cols: Vec<(String, i64)> = df
        .get_column_names_str()
        .iter()
        .filter_map(|name| {
            let year = name.strip_prefix(prefix)?.trim().parse::<i64>().ok()?;
            Some((name.to_string(), year))
        })
        .collect();

    if year_cols.is_empty() {
        return Err(PolicyError::InvalidData(format!(
            "No year columns found (prefix '{prefix}')"
        )));
    }

    let mut entities: Vec<String> = Vec::new();
    let mut years: Vec<i64> = Vec::new();
    let mut values: Vec<f64> = Vec::new();

    for (name, year) in &year_cols {
        let cells = f64_values(df, name)?;
        for (id, cell) in ids.iter().zip(cells) {
            if let (Some(id), Some(v)) = (id, cell) {
                entities.push(id.clone());
                years.push(*year);
                values.push(v);
            }
        }
    }

    Ok(DataFrame::new(vec![
        Column::new(long::ENTITY.into(), &entities),
        Column::new(long::YEAR.into(), &years),
        Column::new(long::VALUE.into(), &values),
    ])?)
}
