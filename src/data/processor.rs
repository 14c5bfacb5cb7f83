//! Data Processor Module
//! Column pruning, field re-encoding and the wide-to-long stack operation.

use polars::prelude::*;
use tracing::debug;

use super::columns::{require_columns, string_column};
use super::encode::{
    days_since_epoch, flag_value, hour_label, month_label, parse_date_column, year_of,
};
use crate::error::{AnalysisError, Result};

/// Name of the date column produced by [`DataProcessor::stack_to_long`].
pub const DATE_COLUMN: &str = "date";

/// Handles column pruning and field normalization.
pub struct DataProcessor;

impl DataProcessor {
    /// Remove the named columns; everything else is unchanged.
    pub fn drop_columns<S: AsRef<str>>(df: &DataFrame, columns: &[S]) -> Result<DataFrame> {
        require_columns(df, columns)?;
        let dropped: Vec<&str> = columns.iter().map(AsRef::as_ref).collect();
        let kept: Vec<String> = df
            .get_column_names()
            .iter()
            .map(|s| s.to_string())
            .filter(|name| !dropped.contains(&name.as_str()))
            .collect();
        debug!(dropped = dropped.len(), kept = kept.len(), "pruned columns");
        Ok(df.select(kept)?)
    }

    /// Keep exactly the named columns, in the given order.
    pub fn select_columns<S: AsRef<str>>(df: &DataFrame, columns: &[S]) -> Result<DataFrame> {
        require_columns(df, columns)?;
        let names: Vec<&str> = columns.iter().map(AsRef::as_ref).collect();
        Ok(df.select(names)?)
    }

    /// Encode a `MM/DD/YYYY` column to month abbreviations.
    pub fn encode_month(df: &DataFrame, source: &str, output: &str) -> Result<DataFrame> {
        Self::map_labels(df, source, output, month_label)
    }

    /// Encode an `HH:MM:SS` column to 12-hour clock labels.
    pub fn encode_hour(df: &DataFrame, source: &str, output: &str) -> Result<DataFrame> {
        Self::map_labels(df, source, output, hour_label)
    }

    /// Extract the year of a `MM/DD/YYYY` column.
    pub fn encode_year(df: &DataFrame, source: &str, output: &str) -> Result<DataFrame> {
        let values = string_column(df, source)?;
        let years: Vec<Option<i32>> = values
            .into_iter()
            .map(|v| v.and_then(year_of))
            .collect();

        let mut out = df.clone();
        out.with_column(Column::new(output.into(), years))?;
        Ok(out)
    }

    /// Re-code a yes/no flag column (boolean or text) as 1.0 / 0.0.
    pub fn encode_flag(df: &DataFrame, source: &str, output: &str) -> Result<DataFrame> {
        let values = string_column(df, source)?;
        let flags: Vec<Option<f64>> = values
            .into_iter()
            .map(|v| v.and_then(flag_value))
            .collect();

        let mut out = df.clone();
        out.with_column(Column::new(output.into(), flags))?;
        Ok(out)
    }

    fn map_labels<F>(df: &DataFrame, source: &str, output: &str, encode: F) -> Result<DataFrame>
    where
        F: Fn(&str) -> Option<&'static str>,
    {
        let values = string_column(df, source)?;
        let labels: Vec<Option<&str>> = values
            .into_iter()
            .map(|v| v.and_then(&encode))
            .collect();

        let mut out = df.clone();
        out.with_column(Column::new(output.into(), labels))?;
        Ok(out)
    }

    /// Transform per-date columns to long format (stack operation).
    ///
    /// Every column not listed in `id_cols` must be named after a date.
    /// Output columns: `[id_cols.., "date", value_name]`, one row per
    /// (input row, date column), all dates of a row kept together.
    pub fn stack_to_long<S: AsRef<str>>(
        df: &DataFrame,
        id_cols: &[S],
        value_name: &str,
    ) -> Result<DataFrame> {
        require_columns(df, id_cols)?;
        let ids: Vec<&str> = id_cols.iter().map(AsRef::as_ref).collect();

        let mut days: Vec<i32> = Vec::new();
        let mut date_values: Vec<Vec<Option<f64>>> = Vec::new();

        for column in df.get_columns() {
            let name = column.name().as_str();
            if ids.contains(&name) {
                continue;
            }
            let date = parse_date_column(name).ok_or_else(|| AnalysisError::Format {
                column: name.to_string(),
            })?;
            let value_f64 = column.cast(&DataType::Float64)?;
            days.push(days_since_epoch(date));
            date_values.push(value_f64.f64()?.into_iter().collect());
        }

        let height = df.height();
        let width = days.len();
        let mut rows: Vec<IdxSize> = Vec::with_capacity(height * width);
        let mut dates: Vec<i32> = Vec::with_capacity(height * width);
        let mut values: Vec<Option<f64>> = Vec::with_capacity(height * width);

        for row in 0..height {
            for (day, column) in days.iter().zip(&date_values) {
                rows.push(row as IdxSize);
                dates.push(*day);
                values.push(column[row]);
            }
        }

        let index = IdxCa::from_vec("row".into(), rows);
        let mut long = df.select(ids.iter().copied())?.take(&index)?;
        long.with_column(Column::new(DATE_COLUMN.into(), dates).cast(&DataType::Date)?)?;
        long.with_column(Column::new(value_name.into(), values))?;

        debug!(
            entities = height,
            dates = width,
            rows = long.height(),
            "stacked wide table"
        );
        Ok(long)
    }
}
