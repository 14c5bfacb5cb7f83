//! Error types for the analysis pipelines.

use std::path::PathBuf;
use thiserror::Error;

/// Errors raised by the regression fitter.
#[derive(Error, Debug)]
pub enum ModelError {
    #[error("column '{column}' has {count} missing values; clean the table before fitting")]
    IncompleteData { column: String, count: usize },
    #[error("{observations} observations cannot identify {terms} model terms")]
    InsufficientData { observations: usize, terms: usize },
    #[error("design matrix is singular")]
    Singular,
    /// The regression backend rejected the data or failed to converge.
    #[error("model fit failed: {message}")]
    Solver { message: String },
    #[error("level '{level}' of '{column}' was not seen when fitting")]
    UnknownLevel { column: String, level: String },
    #[error("response column '{column}' cannot be coded for this family: {reason}")]
    UnsupportedResponse { column: String, reason: String },
}

/// Errors that abort a pipeline stage.
#[derive(Error, Debug)]
pub enum AnalysisError {
    /// Source file or URL could not be reached.
    #[error("failed to fetch {source_name}: {message}")]
    Fetch { source_name: String, message: String },

    /// Source content is not well-formed delimited text.
    #[error("failed to parse {source_name}: {message}")]
    Parse { source_name: String, message: String },

    /// A wide-table column name does not encode a date.
    #[error("column name '{column}' is not a month/day/year date")]
    Format { column: String },

    /// A referenced column is not present in the table.
    #[error("column '{column}' not found in table")]
    Schema { column: String },

    #[error(transparent)]
    Model(#[from] ModelError),

    #[error("invalid configuration {path}: {message}")]
    Config { path: PathBuf, message: String },

    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("DataFrame operation failed: {message}")]
    DataFrame { message: String },
}

impl From<polars::prelude::PolarsError> for AnalysisError {
    fn from(err: polars::prelude::PolarsError) -> Self {
        Self::DataFrame {
            message: err.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, AnalysisError>;
