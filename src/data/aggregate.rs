//! Group-by aggregation and derived columns.

use polars::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::columns::{float_column, require_columns};
use crate::error::Result;

/// Per-group reduction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Reduction {
    Sum,
    Max,
    /// Rows in the group; the source column is ignored.
    Count,
}

/// `(output column, source column, reduction)`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AggregateSpec {
    pub output: String,
    #[serde(default)]
    pub source: String,
    pub reduction: Reduction,
}

impl AggregateSpec {
    pub fn sum(output: &str, source: &str) -> Self {
        Self {
            output: output.to_string(),
            source: source.to_string(),
            reduction: Reduction::Sum,
        }
    }

    pub fn max(output: &str, source: &str) -> Self {
        Self {
            output: output.to_string(),
            source: source.to_string(),
            reduction: Reduction::Max,
        }
    }

    pub fn count(output: &str) -> Self {
        Self {
            output: output.to_string(),
            source: String::new(),
            reduction: Reduction::Count,
        }
    }

    fn expr(&self) -> Expr {
        let source = col(self.source.as_str());
        let reduced = match self.reduction {
            // A group with no values sums to null, not zero.
            Reduction::Sum => when(source.clone().null_count().eq(len()))
                .then(lit(NULL))
                .otherwise(source.sum()),
            Reduction::Max => source.max(),
            Reduction::Count => len(),
        };
        reduced.alias(self.output.as_str())
    }
}

/// Grouped reductions and per-row derivations.
pub struct Aggregator;

impl Aggregator {
    /// One row per distinct key combination, sorted by the keys.
    ///
    /// With no keys the whole table reduces to a single row.
    pub fn group_aggregate<S: AsRef<str>>(
        df: &DataFrame,
        keys: &[S],
        specs: &[AggregateSpec],
    ) -> Result<DataFrame> {
        require_columns(df, keys)?;
        let sources: Vec<&str> = specs
            .iter()
            .filter(|spec| spec.reduction != Reduction::Count)
            .map(|spec| spec.source.as_str())
            .collect();
        require_columns(df, &sources)?;

        let key_exprs = key_exprs(keys);
        let aggs: Vec<Expr> = specs.iter().map(AggregateSpec::expr).collect();

        let grouped = if key_exprs.is_empty() {
            df.clone().lazy().select(aggs).collect()?
        } else {
            df.clone()
                .lazy()
                .group_by(key_exprs.clone())
                .agg(aggs)
                .sort_by_exprs(key_exprs, SortMultipleOptions::default())
                .collect()?
        };

        debug!(
            groups = grouped.height(),
            rows = df.height(),
            "aggregated table"
        );
        Ok(grouped)
    }

    /// `output = source - previous source` within each key group, ordered by `order_by`.
    ///
    /// The first row of every group has no predecessor and gets a null.
    /// The result is sorted by keys then `order_by`.
    pub fn lag_difference<S: AsRef<str>>(
        df: &DataFrame,
        keys: &[S],
        order_by: &str,
        source: &str,
        output: &str,
    ) -> Result<DataFrame> {
        require_columns(df, keys)?;
        require_columns(df, &[order_by, source])?;

        let partition = key_exprs(keys);
        let mut order = partition.clone();
        order.push(col(order_by));

        let value = col(source).cast(DataType::Float64);
        let previous = if partition.is_empty() {
            value.clone().shift(lit(1))
        } else {
            value.clone().shift(lit(1)).over(partition)
        };

        let derived = df
            .clone()
            .lazy()
            .sort_by_exprs(order, SortMultipleOptions::default().with_maintain_order(true))
            .with_column((value - previous).alias(output))
            .collect()?;
        Ok(derived)
    }

    /// `output = scale * numerator / denominator`.
    ///
    /// Null when either side is null or the denominator is zero.
    pub fn derive_ratio(
        df: &DataFrame,
        numerator: &str,
        denominator: &str,
        scale: f64,
        output: &str,
    ) -> Result<DataFrame> {
        let top = float_column(df, numerator)?;
        let bottom = float_column(df, denominator)?;

        let ratios: Vec<Option<f64>> = top
            .into_iter()
            .zip(bottom.into_iter())
            .map(|(n, d)| match (n, d) {
                (Some(n), Some(d)) if d != 0.0 => Some(scale * n / d),
                _ => None,
            })
            .collect();

        let mut out = df.clone();
        out.with_column(Column::new(output.into(), ratios))?;
        Ok(out)
    }
}

fn key_exprs<S: AsRef<str>>(keys: &[S]) -> Vec<Expr> {
    keys.iter().map(|k| col(k.as_ref())).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::AnalysisError;

    fn f64_values(df: &DataFrame, name: &str) -> Vec<Option<f64>> {
        df.column(name)
            .unwrap()
            .cast(&DataType::Float64)
            .unwrap()
            .f64()
            .unwrap()
            .into_iter()
            .collect()
    }

    #[test]
    fn sums_and_maxima_per_group() {
        let df = df!(
            "state" => ["Ohio", "Utah", "Ohio", "Utah"],
            "cases" => [1.0, 10.0, 2.0, 30.0],
            "deaths" => [0.0, 1.0, 5.0, 2.0],
        )
        .unwrap();
        let out = Aggregator::group_aggregate(
            &df,
            &["state"],
            &[
                AggregateSpec::sum("cases", "cases"),
                AggregateSpec::max("deaths", "deaths"),
                AggregateSpec::count("n"),
            ],
        )
        .unwrap();

        assert_eq!(out.height(), 2);
        let states: Vec<Option<&str>> = out.column("state").unwrap().str().unwrap().into_iter().collect();
        assert_eq!(states, vec![Some("Ohio"), Some("Utah")]);
        assert_eq!(f64_values(&out, "cases"), vec![Some(3.0), Some(40.0)]);
        assert_eq!(f64_values(&out, "deaths"), vec![Some(5.0), Some(2.0)]);
        assert_eq!(f64_values(&out, "n"), vec![Some(2.0), Some(2.0)]);
    }

    #[test]
    fn sum_of_only_missing_values_is_missing() {
        let df = df!(
            "state" => ["Ohio", "Ohio", "Utah", "Utah"],
            "deaths" => [None, None, Some(2.0), None],
        )
        .unwrap();
        let out =
            Aggregator::group_aggregate(&df, &["state"], &[AggregateSpec::sum("deaths", "deaths")])
                .unwrap();
        assert_eq!(f64_values(&out, "deaths"), vec![None, Some(2.0)]);
    }

    #[test]
    fn no_keys_reduces_to_one_row() {
        let df = df!("cases" => [1.0, 2.0, 4.0]).unwrap();
        let out =
            Aggregator::group_aggregate::<&str>(&df, &[], &[AggregateSpec::sum("total", "cases")])
                .unwrap();
        assert_eq!(out.height(), 1);
        assert_eq!(f64_values(&out, "total"), vec![Some(7.0)]);
    }

    #[test]
    fn missing_source_is_schema_error() {
        let df = df!("state" => ["Ohio"]).unwrap();
        let err =
            Aggregator::group_aggregate(&df, &["state"], &[AggregateSpec::sum("c", "cases")])
                .unwrap_err();
        assert!(matches!(err, AnalysisError::Schema { column } if column == "cases"));
    }

    #[test]
    fn new_from_cumulative() {
        let df = df!(
            "state" => ["Ohio", "Ohio", "Ohio"],
            "date" => [3i32, 1, 2],
            "cases" => [25.0, 10.0, 10.0],
        )
        .unwrap();
        let out = Aggregator::lag_difference(&df, &["state"], "date", "cases", "new_cases").unwrap();
        assert_eq!(f64_values(&out, "new_cases"), vec![None, Some(0.0), Some(15.0)]);
    }

    #[test]
    fn lag_restarts_per_group_and_keeps_negatives() {
        let df = df!(
            "state" => ["Utah", "Ohio", "Utah", "Ohio"],
            "date" => [1i32, 1, 2, 2],
            "cases" => [5.0, 7.0, 3.0, 9.0],
        )
        .unwrap();
        let out = Aggregator::lag_difference(&df, &["state"], "date", "cases", "new").unwrap();
        let states: Vec<Option<&str>> = out.column("state").unwrap().str().unwrap().into_iter().collect();
        assert_eq!(states, vec![Some("Ohio"), Some("Ohio"), Some("Utah"), Some("Utah")]);
        assert_eq!(f64_values(&out, "new"), vec![None, Some(2.0), None, Some(-2.0)]);
    }

    #[test]
    fn ratio_with_zero_denominator_is_null() {
        let df = df!(
            "deaths" => [Some(1.0), Some(2.0), None],
            "cases" => [Some(4.0), Some(0.0), Some(3.0)],
        )
        .unwrap();
        let out = Aggregator::derive_ratio(&df, "deaths", "cases", 1000.0, "per_thou").unwrap();
        assert_eq!(f64_values(&out, "per_thou"), vec![Some(250.0), None, None]);
    }
}
