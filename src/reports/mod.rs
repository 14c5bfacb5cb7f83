//! Reports module - the two analysis pipelines and their output

pub mod covid;
mod export;
pub mod shooting;

pub use export::{export_report, COEFFICIENTS_FILE};

use polars::prelude::DataFrame;

use crate::data::FilterRule;
use crate::stats::{ModelFit, ModelSpec, SummaryStats};

/// A table produced by a report, named for display and export.
#[derive(Debug, Clone)]
pub struct NamedTable {
    pub name: String,
    pub table: DataFrame,
}

impl NamedTable {
    pub fn new(name: impl Into<String>, table: DataFrame) -> Self {
        Self {
            name: name.into(),
            table,
        }
    }
}

/// Everything one report run produces.
#[derive(Debug, Clone)]
pub struct ReportOutput {
    pub name: String,
    pub tables: Vec<NamedTable>,
    pub fit: ModelFit,
    pub summaries: Vec<SummaryStats>,
}

impl ReportOutput {
    pub fn table(&self, name: &str) -> Option<&DataFrame> {
        self.tables
            .iter()
            .find(|t| t.name == name)
            .map(|t| &t.table)
    }
}

/// Rules dropping rows with a missing response or predictor.
fn complete_cases(spec: &ModelSpec) -> Vec<FilterRule> {
    std::iter::once(&spec.response)
        .chain(&spec.predictors)
        .map(|column| FilterRule::not_null(column))
        .collect()
}

/// Response and predictor columns, in formula order.
fn model_columns(spec: &ModelSpec) -> Vec<&str> {
    std::iter::once(spec.response.as_str())
        .chain(spec.predictors.iter().map(String::as_str))
        .collect()
}
