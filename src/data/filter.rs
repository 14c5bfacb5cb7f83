//! Row filtering by exclusion sets and numeric floors.

use polars::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use tracing::debug;

use super::columns::{float_column, string_column};
use crate::error::Result;

/// Literal values treated as invalid in one column. Nulls are always invalid.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ExclusionSet {
    values: BTreeSet<String>,
}

impl ExclusionSet {
    pub fn new<I, S>(values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            values: values.into_iter().map(Into::into).collect(),
        }
    }

    /// Only nulls are excluded.
    pub fn nulls_only() -> Self {
        Self::default()
    }

    pub fn contains(&self, value: &str) -> bool {
        self.values.contains(value)
    }

    pub fn is_valid(&self, value: Option<&str>) -> bool {
        value.is_some_and(|v| !self.contains(v))
    }
}

/// One row predicate. A row is kept only when every rule holds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum FilterRule {
    /// Value is non-null and not in the exclusion set.
    Exclude {
        column: String,
        #[serde(default)]
        values: ExclusionSet,
    },
    /// Value is non-null, numeric, and at least `min` (strictly above when `strict`).
    MinValue {
        column: String,
        min: f64,
        #[serde(default)]
        strict: bool,
    },
}

impl FilterRule {
    pub fn exclude<I, S>(column: &str, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::Exclude {
            column: column.to_string(),
            values: ExclusionSet::new(values),
        }
    }

    pub fn not_null(column: &str) -> Self {
        Self::Exclude {
            column: column.to_string(),
            values: ExclusionSet::nulls_only(),
        }
    }

    pub fn at_least(column: &str, min: f64) -> Self {
        Self::MinValue {
            column: column.to_string(),
            min,
            strict: false,
        }
    }

    pub fn above(column: &str, min: f64) -> Self {
        Self::MinValue {
            column: column.to_string(),
            min,
            strict: true,
        }
    }

    pub fn column(&self) -> &str {
        match self {
            Self::Exclude { column, .. } | Self::MinValue { column, .. } => column,
        }
    }

    fn apply(&self, df: &DataFrame, keep: &mut [bool]) -> Result<()> {
        match self {
            Self::Exclude { column, values } => {
                let rendered = string_column(df, column)?;
                for (flag, value) in keep.iter_mut().zip(rendered.into_iter()) {
                    *flag = *flag && values.is_valid(value);
                }
            }
            Self::MinValue {
                column,
                min,
                strict,
            } => {
                let numbers = float_column(df, column)?;
                for (flag, value) in keep.iter_mut().zip(numbers.into_iter()) {
                    let passes = match value {
                        Some(v) if v.is_nan() => false,
                        Some(v) if *strict => v > *min,
                        Some(v) => v >= *min,
                        None => false,
                    };
                    *flag = *flag && passes;
                }
            }
        }
        Ok(())
    }
}

/// Keeps rows that satisfy all rules, preserving order.
pub struct RowFilter;

impl RowFilter {
    /// An empty result is a valid, empty table.
    pub fn apply(df: &DataFrame, rules: &[FilterRule]) -> Result<DataFrame> {
        let mut keep = vec![true; df.height()];
        for rule in rules {
            rule.apply(df, &mut keep)?;
            debug!(
                column = rule.column(),
                remaining = keep.iter().filter(|k| **k).count(),
                "applied filter rule"
            );
        }

        let mask = BooleanChunked::from_slice("keep".into(), &keep);
        let filtered = df.filter(&mask)?;
        debug!(
            rules = rules.len(),
            before = df.height(),
            after = filtered.height(),
            "filtered rows"
        );
        Ok(filtered)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::AnalysisError;

    #[test]
    fn sentinel_age_groups_are_dropped() {
        let df = df!(
            "age" => ["(null)", "25-44"],
            "boro" => ["BRONX", "QUEENS"],
        )
        .unwrap();
        let out = RowFilter::apply(&df, &[FilterRule::exclude("age", ["(null)"])]).unwrap();
        assert_eq!(out.height(), 1);
        assert_eq!(out.column("age").unwrap().str().unwrap().get(0), Some("25-44"));
    }

    #[test]
    fn nulls_are_always_excluded_and_unknown_is_kept() {
        let df = df!("sex" => [Some("M"), None, Some("U"), Some("(null)")]).unwrap();
        let out = RowFilter::apply(&df, &[FilterRule::exclude("sex", ["(null)"])]).unwrap();
        let kept: Vec<Option<&str>> = out.column("sex").unwrap().str().unwrap().into_iter().collect();
        assert_eq!(kept, vec![Some("M"), Some("U")]);
    }

    #[test]
    fn numeric_floor() {
        let df = df!("new_cases" => [Some(3.0), Some(-2.0), None, Some(0.0)]).unwrap();
        let at_least = RowFilter::apply(&df, &[FilterRule::at_least("new_cases", 0.0)]).unwrap();
        assert_eq!(at_least.height(), 2);
        let above = RowFilter::apply(&df, &[FilterRule::above("new_cases", 0.0)]).unwrap();
        assert_eq!(above.height(), 1);
    }

    #[test]
    fn no_matches_gives_empty_table() {
        let df = df!("age" => ["(null)", "940"]).unwrap();
        let out = RowFilter::apply(&df, &[FilterRule::exclude("age", ["(null)", "940"])]).unwrap();
        assert_eq!(out.height(), 0);
        assert_eq!(out.width(), 1);
    }

    #[test]
    fn unknown_column_is_schema_error() {
        let df = df!("age" => ["25-44"]).unwrap();
        let err = RowFilter::apply(&df, &[FilterRule::not_null("AGE")]).unwrap_err();
        assert!(matches!(err, AnalysisError::Schema { .. }));
    }

    #[test]
    fn rule_reports_its_column() {
        assert_eq!(FilterRule::not_null("BORO").column(), "BORO");
        assert_eq!(FilterRule::above("cases", 0.0).column(), "cases");
    }

    #[test]
    fn rules_deserialize_from_config() {
        let json = r#"[
            {"kind": "exclude", "column": "PERP_AGE_GROUP", "values": ["1020", "(null)"]},
            {"kind": "min_value", "column": "cases", "min": 0.0, "strict": true}
        ]"#;
        let rules: Vec<FilterRule> = serde_json::from_str(json).unwrap();
        assert_eq!(rules[0], FilterRule::exclude("PERP_AGE_GROUP", ["(null)", "1020"]));
        assert_eq!(rules[1], FilterRule::above("cases", 0.0));
    }
}
