//! Stats module - descriptive statistics and regression fitting

mod calculator;
mod regression;

pub use calculator::{StatsCalculator, SummaryStats, COUNT_COLUMN};
pub use regression::{
    Coefficient, Family, FitStatistics, GlmFitter, ModelFit, ModelFitter, ModelSpec, INTERCEPT,
};
