//! Statistics Calculator Module
//! Frequency tables and descriptive statistics for report columns.

use polars::prelude::*;

use crate::data::{float_column, require_columns};
use crate::error::Result;

/// Name of the count column in frequency tables.
pub const COUNT_COLUMN: &str = "n";

/// Descriptive statistics for one numeric column.
#[derive(Debug, Clone, PartialEq)]
pub struct SummaryStats {
    pub column: String,
    pub count: usize,
    pub missing: usize,
    pub mean: f64,
    pub median: f64,
    pub std: f64,
    pub min: f64,
    pub max: f64,
    pub p05: f64,
    pub p95: f64,
}

impl SummaryStats {
    fn empty(column: &str, missing: usize) -> Self {
        Self {
            column: column.to_string(),
            count: 0,
            missing,
            mean: f64::NAN,
            median: f64::NAN,
            std: f64::NAN,
            min: f64::NAN,
            max: f64::NAN,
            p05: f64::NAN,
            p95: f64::NAN,
        }
    }
}

/// Computes frequency tables and column summaries.
pub struct StatsCalculator;

impl StatsCalculator {
    /// Rows per distinct value of `column`, most frequent first.
    ///
    /// Output columns: `[column, "n"]`. Ties are ordered by value.
    pub fn frequency_table(df: &DataFrame, column: &str) -> Result<DataFrame> {
        require_columns(df, &[column])?;
        let counts = df
            .clone()
            .lazy()
            .group_by([col(column)])
            .agg([len().alias(COUNT_COLUMN)])
            .sort_by_exprs(
                [col(COUNT_COLUMN), col(column)],
                SortMultipleOptions::default().with_order_descending_multi([true, false]),
            )
            .collect()?;
        Ok(counts)
    }

    /// Summarize a column cast to `Float64`; nulls and NaN count as missing.
    pub fn summarize(df: &DataFrame, column: &str) -> Result<SummaryStats> {
        let values = float_column(df, column)?;
        let present: Vec<f64> = values
            .into_iter()
            .flatten()
            .filter(|v| !v.is_nan())
            .collect();
        let missing = df.height() - present.len();
        if present.is_empty() {
            return Ok(SummaryStats::empty(column, missing));
        }
        Ok(Self::compute_descriptive_stats(column, &present, missing))
    }

    fn compute_descriptive_stats(column: &str, values: &[f64], missing: usize) -> SummaryStats {
        let n = values.len();

        let mut sorted = values.to_vec();
        sorted.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));

        let mean = values.iter().sum::<f64>() / n as f64;
        let median = if n % 2 == 0 {
            (sorted[n / 2 - 1] + sorted[n / 2]) / 2.0
        } else {
            sorted[n / 2]
        };

        let variance = if n > 1 {
            values.iter().map(|x| (x - mean).powi(2)).sum::<f64>() / (n - 1) as f64
        } else {
            0.0
        };

        SummaryStats {
            column: column.to_string(),
            count: n,
            missing,
            mean,
            median,
            std: variance.sqrt(),
            min: sorted[0],
            max: sorted[n - 1],
            p05: Self::percentile(&sorted, 5.0),
            p95: Self::percentile(&sorted, 95.0),
        }
    }

    /// Percentile by linear interpolation between closest ranks.
    fn percentile(sorted_values: &[f64], p: f64) -> f64 {
        let n = sorted_values.len();
        if n == 0 {
            return f64::NAN;
        }
        if n == 1 {
            return sorted_values[0];
        }

        let rank = (p / 100.0) * (n - 1) as f64;
        let lower = rank.floor() as usize;
        let upper = (rank.ceil() as usize).min(n - 1);
        let frac = rank - lower as f64;

        if lower == upper {
            sorted_values[lower]
        } else {
            sorted_values[lower] * (1.0 - frac) + sorted_values[upper] * frac
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn frequency_counts_most_common_first() {
        let df = df!("BORO" => ["BRONX", "QUEENS", "BRONX", "BROOKLYN", "QUEENS", "BRONX"]).unwrap();
        let table = StatsCalculator::frequency_table(&df, "BORO").unwrap();
        let boros: Vec<Option<&str>> = table.column("BORO").unwrap().str().unwrap().into_iter().collect();
        assert_eq!(boros, vec![Some("BRONX"), Some("QUEENS"), Some("BROOKLYN")]);
        let counts = table.column(COUNT_COLUMN).unwrap().cast(&DataType::UInt64).unwrap();
        let counts: Vec<Option<u64>> = counts.u64().unwrap().into_iter().collect();
        assert_eq!(counts, vec![Some(3), Some(2), Some(1)]);
    }

    #[test]
    fn summary_of_small_column() {
        let df = df!("x" => [Some(1.0), Some(2.0), None, Some(3.0), Some(4.0)]).unwrap();
        let stats = StatsCalculator::summarize(&df, "x").unwrap();
        assert_eq!(stats.count, 4);
        assert_eq!(stats.missing, 1);
        assert!((stats.mean - 2.5).abs() < 1e-12);
        assert!((stats.median - 2.5).abs() < 1e-12);
        assert_eq!(stats.min, 1.0);
        assert_eq!(stats.max, 4.0);
        assert!((stats.p95 - 3.85).abs() < 1e-12);
    }

    #[test]
    fn summary_of_all_missing_column() {
        let df = df!("x" => [None::<f64>, None]).unwrap();
        let stats = StatsCalculator::summarize(&df, "x").unwrap();
        assert_eq!(stats.count, 0);
        assert_eq!(stats.missing, 2);
        assert!(stats.mean.is_nan());
    }
}
