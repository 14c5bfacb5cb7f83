//! Column lookups shared by the pipeline stages.

use polars::prelude::*;
use std::collections::BTreeSet;

use crate::error::{AnalysisError, Result};

/// Column names in table order.
pub fn column_names(df: &DataFrame) -> Vec<String> {
    df.get_column_names()
        .iter()
        .map(|s| s.to_string())
        .collect()
}

/// Fail with a schema error on the first name missing from `df`.
pub fn require_columns<S: AsRef<str>>(df: &DataFrame, columns: &[S]) -> Result<()> {
    for name in columns {
        let name = name.as_ref();
        if df.column(name).is_err() {
            return Err(AnalysisError::Schema {
                column: name.to_string(),
            });
        }
    }
    Ok(())
}

pub fn is_numeric(dtype: &DataType) -> bool {
    matches!(
        dtype,
        DataType::Float32
            | DataType::Float64
            | DataType::Int8
            | DataType::Int16
            | DataType::Int32
            | DataType::Int64
            | DataType::UInt8
            | DataType::UInt16
            | DataType::UInt32
            | DataType::UInt64
    )
}

/// A column rendered as strings; nulls stay null.
pub fn string_column(df: &DataFrame, column: &str) -> Result<StringChunked> {
    let source = df.column(column).map_err(|_| AnalysisError::Schema {
        column: column.to_string(),
    })?;
    let rendered = source.cast(&DataType::String)?;
    Ok(rendered.str()?.clone())
}

/// A column cast to `Float64`; values that do not convert become null.
pub fn float_column(df: &DataFrame, column: &str) -> Result<Float64Chunked> {
    let source = df.column(column).map_err(|_| AnalysisError::Schema {
        column: column.to_string(),
    })?;
    let cast = source.cast(&DataType::Float64)?;
    Ok(cast.f64()?.clone())
}

/// Sorted distinct non-null values of a column.
pub fn unique_values(df: &DataFrame, column: &str) -> Result<Vec<String>> {
    let values = string_column(df, column)?;
    let distinct: BTreeSet<String> = values
        .into_iter()
        .flatten()
        .map(|v| v.to_string())
        .collect();
    Ok(distinct.into_iter().collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> DataFrame {
        df!(
            "boro" => ["BRONX", "QUEENS", "BRONX"],
            "precinct" => [40i64, 105, 44],
        )
        .unwrap()
    }

    #[test]
    fn names_and_numeric() {
        let df = sample();
        assert_eq!(column_names(&df), vec!["boro", "precinct"]);
        assert!(!is_numeric(df.column("boro").unwrap().dtype()));
        assert!(is_numeric(df.column("precinct").unwrap().dtype()));
    }

    #[test]
    fn missing_column_is_schema_error() {
        let err = require_columns(&sample(), &["boro", "Boro"]).unwrap_err();
        assert!(matches!(err, AnalysisError::Schema { column } if column == "Boro"));
    }

    #[test]
    fn unique_values_are_sorted() {
        assert_eq!(
            unique_values(&sample(), "boro").unwrap(),
            vec!["BRONX".to_string(), "QUEENS".to_string()]
        );
    }

    #[test]
    fn numbers_render_as_strings() {
        let values = string_column(&sample(), "precinct").unwrap();
        assert_eq!(values.get(1), Some("105"));
    }
}
