//! Incident Analysis - shooting-incident and COVID time-series reports
//!
//! Each report is a chain of table stages over polars DataFrames: load,
//! prune, normalize, filter, aggregate, join and fit. Stages never mutate
//! their input; every one returns a new table.

pub mod config;
pub mod data;
pub mod error;
pub mod logging;
pub mod reports;
pub mod stats;

pub use config::{AnalysisConfig, CovidConfig, ShootingConfig};
pub use error::{AnalysisError, ModelError, Result};
