//! Regression fitting for the report models.
//!
//! Provides ordinary least squares (Gaussian family, identity link) and
//! logistic regression (binomial family, logit link) with the usual
//! coefficient inference: standard errors, t or z statistics and two-sided
//! p-values.
//!
//! Non-numeric predictors are expanded with treatment coding. Levels are
//! sorted and the first level is the reference, so a predictor `BORO` with
//! levels `BRONX`, `QUEENS` contributes the single term `BOROQUEENS`.
//! Terms that are linear combinations of earlier terms are reported as
//! aliased and left out of the fit.

use linregress::{FormulaRegressionBuilder, RegressionDataBuilder};
use nalgebra::{DMatrix, DVector};
use ndarray::{Array1, Array2};
use ndarray_glm::{Logistic, ModelBuilder};
use polars::prelude::*;
use serde::{Deserialize, Serialize};
use statrs::distribution::{ContinuousCDF, FisherSnedecor, Normal};
use std::collections::HashMap;
use tracing::{debug, warn};

use crate::data::{
    flag_value, float_column, is_numeric, require_columns, string_column, unique_values,
};
use crate::error::{ModelError, Result};

pub const INTERCEPT: &str = "(Intercept)";

/// Singular value, on unit-length columns, below which a term counts as aliased.
const ALIAS_TOLERANCE: f64 = 1e-7;

/// Fitted probabilities are kept this far from 0 and 1.
const PROBABILITY_EPSILON: f64 = 1e-10;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Family {
    /// Logistic regression on a 0/1 response.
    Binomial,
    /// Ordinary least squares.
    Gaussian,
}

/// `response ~ predictors` under a family.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelSpec {
    pub response: String,
    pub predictors: Vec<String>,
    pub family: Family,
}

impl ModelSpec {
    pub fn new(response: &str, predictors: &[&str], family: Family) -> Self {
        Self {
            response: response.to_string(),
            predictors: predictors.iter().map(|p| p.to_string()).collect(),
            family,
        }
    }

    pub fn formula(&self) -> String {
        format!("{} ~ {}", self.response, self.predictors.join(" + "))
    }
}

/// One row of the coefficient table.
#[derive(Debug, Clone, PartialEq)]
pub struct Coefficient {
    pub term: String,
    pub estimate: f64,
    pub std_error: f64,
    /// t statistic for Gaussian fits, z statistic for binomial fits.
    pub statistic: f64,
    pub p_value: f64,
}

/// Whole-model statistics.
#[derive(Debug, Clone, PartialEq)]
pub enum FitStatistics {
    Gaussian {
        r_squared: f64,
        adj_r_squared: f64,
        residual_std_error: f64,
        f_statistic: f64,
        f_p_value: f64,
    },
    Binomial {
        null_deviance: f64,
        residual_deviance: f64,
        aic: f64,
        iterations: usize,
    },
}

/// Result of fitting a [`ModelSpec`].
#[derive(Debug, Clone)]
pub struct ModelFit {
    pub family: Family,
    pub formula: String,
    pub coefficients: Vec<Coefficient>,
    /// Terms dropped because they are collinear with earlier terms.
    pub aliased: Vec<String>,
    pub observations: usize,
    pub df_residual: usize,
    pub statistics: FitStatistics,
    layout: DesignLayout,
    kept: Vec<usize>,
}

impl ModelFit {
    pub fn coefficient(&self, term: &str) -> Option<&Coefficient> {
        self.coefficients.iter().find(|c| c.term == term)
    }

    /// Coefficient table as a DataFrame.
    pub fn coefficient_frame(&self) -> Result<DataFrame> {
        let terms: Vec<&str> = self.coefficients.iter().map(|c| c.term.as_str()).collect();
        let estimates: Vec<f64> = self.coefficients.iter().map(|c| c.estimate).collect();
        let errors: Vec<f64> = self.coefficients.iter().map(|c| c.std_error).collect();
        let statistics: Vec<f64> = self.coefficients.iter().map(|c| c.statistic).collect();
        let p_values: Vec<f64> = self.coefficients.iter().map(|c| c.p_value).collect();

        let statistic_name = match self.family {
            Family::Gaussian => "t_value",
            Family::Binomial => "z_value",
        };

        Ok(DataFrame::new(vec![
            Column::new("term".into(), terms),
            Column::new("estimate".into(), estimates),
            Column::new("std_error".into(), errors),
            Column::new(statistic_name.into(), statistics),
            Column::new("p_value".into(), p_values),
        ])?)
    }

    /// Fitted values on the response scale (probabilities for binomial fits).
    ///
    /// `df` must carry the predictors, fully populated, and only categorical
    /// levels seen while fitting.
    pub fn predict(&self, df: &DataFrame) -> Result<Vec<f64>> {
        let x = self.layout.matrix(df)?.select_columns(&self.kept);
        let beta = DVector::from_iterator(
            self.coefficients.len(),
            self.coefficients.iter().map(|c| c.estimate),
        );
        let eta = x * beta;
        Ok(match self.family {
            Family::Gaussian => eta.iter().copied().collect(),
            Family::Binomial => eta.iter().map(|e| inverse_logit(*e)).collect(),
        })
    }
}

/// Capability boundary for model fitting.
pub trait ModelFitter {
    fn fit(&self, df: &DataFrame, spec: &ModelSpec) -> Result<ModelFit>;
}

/// Ordinary least squares through `linregress`, logistic regression through
/// `ndarray-glm`. Both backends add their own intercept, so only the kept
/// non-intercept design columns are handed over.
#[derive(Debug, Clone)]
pub struct GlmFitter {
    /// Fisher scoring iterations allowed for logistic fits.
    pub max_iterations: usize,
}

impl Default for GlmFitter {
    fn default() -> Self {
        Self { max_iterations: 25 }
    }
}

impl ModelFitter for GlmFitter {
    fn fit(&self, df: &DataFrame, spec: &ModelSpec) -> Result<ModelFit> {
        let mut used: Vec<&str> = vec![spec.response.as_str()];
        used.extend(spec.predictors.iter().map(String::as_str));
        require_columns(df, &used)?;
        check_complete(df, &used)?;

        let y = response_values(df, &spec.response, spec.family)?;
        let layout = DesignLayout::from_frame(df, &spec.predictors)?;
        let x = layout.matrix(df)?;

        let n = x.nrows();
        let kept = independent_columns(&x);
        let aliased: Vec<String> = (0..layout.names.len())
            .filter(|j| !kept.contains(j))
            .map(|j| layout.names[j].clone())
            .collect();
        if !aliased.is_empty() {
            warn!(terms = ?aliased, "dropping aliased terms");
        }
        if kept.first() != Some(&0) || n <= kept.len() {
            return Err(ModelError::InsufficientData {
                observations: n,
                terms: layout.names.len(),
            }
            .into());
        }
        let regressors = &kept[1..];
        if regressors.is_empty() {
            return Err(ModelError::Singular.into());
        }

        let estimate = match spec.family {
            Family::Gaussian => fit_least_squares(&x, regressors, &y)?,
            Family::Binomial => self.fit_logistic(&x, regressors, &y)?,
        };

        let df_residual = n - kept.len();
        let coefficients = kept
            .iter()
            .zip(estimate.rows)
            .map(|(&j, (value, std_error, statistic, p_value))| Coefficient {
                term: layout.names[j].clone(),
                estimate: value,
                std_error,
                statistic,
                p_value,
            })
            .collect();

        debug!(
            formula = %spec.formula(),
            observations = n,
            terms = kept.len(),
            "fitted model"
        );

        Ok(ModelFit {
            family: spec.family,
            formula: spec.formula(),
            coefficients,
            aliased,
            observations: n,
            df_residual,
            statistics: estimate.statistics,
            layout,
            kept,
        })
    }
}

/// Backend output: `(estimate, std error, statistic, p-value)` per kept term.
struct Estimate {
    rows: Vec<(f64, f64, f64, f64)>,
    statistics: FitStatistics,
}

fn solver_error(err: impl std::fmt::Display) -> ModelError {
    ModelError::Solver {
        message: err.to_string(),
    }
}

fn fit_least_squares(x: &DMatrix<f64>, regressors: &[usize], y: &[f64]) -> Result<Estimate> {
    let names: Vec<String> = (1..=regressors.len()).map(|i| format!("x{i}")).collect();
    let mut columns: Vec<(String, Vec<f64>)> = vec![("y".to_string(), y.to_vec())];
    for (name, &j) in names.iter().zip(regressors) {
        columns.push((name.clone(), x.column(j).iter().copied().collect()));
    }

    let data = RegressionDataBuilder::new()
        .build_from(columns)
        .map_err(solver_error)?;
    let model = FormulaRegressionBuilder::new()
        .data(&data)
        .formula(format!("y ~ {}", names.join(" + ")))
        .fit()
        .map_err(solver_error)?;

    let rows = model
        .parameters()
        .iter()
        .zip(model.se())
        .zip(model.p_values())
        .map(|((&value, &std_error), &p_value)| (value, std_error, value / std_error, p_value))
        .collect();

    let n = y.len() as f64;
    let df_model = regressors.len() as f64;
    let df_residual = n - df_model - 1.0;
    let rss: f64 = model.residuals().iter().map(|r| r * r).sum();
    let r_squared = model.rsquared();
    let f_statistic = (r_squared / df_model) / ((1.0 - r_squared) / df_residual);
    let f_p_value = FisherSnedecor::new(df_model, df_residual)
        .map(|dist| dist.sf(f_statistic))
        .unwrap_or(f64::NAN);

    Ok(Estimate {
        rows,
        statistics: FitStatistics::Gaussian {
            r_squared,
            adj_r_squared: model.rsquared_adj(),
            residual_std_error: (rss / df_residual).sqrt(),
            f_statistic,
            f_p_value,
        },
    })
}

impl GlmFitter {
    fn fit_logistic(&self, x: &DMatrix<f64>, regressors: &[usize], y: &[f64]) -> Result<Estimate> {
        let outcomes: Array1<bool> = y.iter().map(|v| *v == 1.0).collect();
        let design = Array2::from_shape_fn((x.nrows(), regressors.len()), |(i, c)| {
            x[(i, regressors[c])]
        });

        let model = ModelBuilder::<Logistic>::data(&outcomes, &design)
            .build()
            .map_err(solver_error)?;
        let fit = model
            .fit_options()
            .max_iter(self.max_iterations)
            .fit()
            .map_err(solver_error)?;
        let std_errors = fit.bse().map_err(solver_error)?;
        let z = fit.wald_z().map_err(solver_error)?;

        let rows = fit
            .result
            .iter()
            .zip(std_errors.iter())
            .zip(z.iter())
            .map(|((&value, &std_error), &statistic)| {
                (value, std_error, statistic, normal_two_sided_p(statistic))
            })
            .collect();

        Ok(Estimate {
            rows,
            statistics: FitStatistics::Binomial {
                null_deviance: null_deviance(y),
                residual_deviance: fit.deviance(),
                aic: fit.aic(),
                iterations: fit.n_iter,
            },
        })
    }
}

fn inverse_logit(eta: f64) -> f64 {
    (1.0 / (1.0 + (-eta).exp())).clamp(PROBABILITY_EPSILON, 1.0 - PROBABILITY_EPSILON)
}

/// Deviance of the intercept-only logistic model, whose fit is the mean response.
fn null_deviance(y: &[f64]) -> f64 {
    let mean = y.iter().sum::<f64>() / y.len() as f64;
    let p = mean.clamp(PROBABILITY_EPSILON, 1.0 - PROBABILITY_EPSILON);
    -2.0 * y
        .iter()
        .map(|&yi| yi * p.ln() + (1.0 - yi) * (1.0 - p).ln())
        .sum::<f64>()
}

fn normal_two_sided_p(statistic: f64) -> f64 {
    Normal::new(0.0, 1.0).map_or(f64::NAN, |dist| 2.0 * dist.sf(statistic.abs()))
}

/// Indices of design columns that are not linear combinations of earlier ones.
///
/// Columns are scaled to unit length and added one at a time; a column is
/// kept when it raises the numerical rank of the kept set.
fn independent_columns(x: &DMatrix<f64>) -> Vec<usize> {
    let mut scaled = x.clone();
    for mut column in scaled.column_iter_mut() {
        let norm = column.norm();
        if norm > 0.0 {
            column /= norm;
        }
    }

    let mut kept: Vec<usize> = Vec::new();
    for j in 0..scaled.ncols() {
        let mut candidate = kept.clone();
        candidate.push(j);
        if scaled.select_columns(&candidate).rank(ALIAS_TOLERANCE) == candidate.len() {
            kept = candidate;
        }
    }
    kept
}

fn check_complete(df: &DataFrame, columns: &[&str]) -> Result<()> {
    for &name in columns {
        let column = df.column(name)?;
        let mut count = column.null_count();
        if matches!(column.dtype(), DataType::Float32 | DataType::Float64) {
            count += float_column(df, name)?
                .into_iter()
                .filter(|v| v.is_some_and(f64::is_nan))
                .count();
        }
        if count > 0 {
            return Err(ModelError::IncompleteData {
                column: name.to_string(),
                count,
            }
            .into());
        }
    }
    Ok(())
}

fn response_values(df: &DataFrame, column: &str, family: Family) -> Result<Vec<f64>> {
    let dtype = df.column(column)?.dtype().clone();
    let unsupported = |reason: &str| ModelError::UnsupportedResponse {
        column: column.to_string(),
        reason: reason.to_string(),
    };

    let values: Vec<f64> = if is_numeric(&dtype) || dtype == DataType::Boolean {
        float_column(df, column)?.into_iter().flatten().collect()
    } else if family == Family::Binomial {
        let mut coded = Vec::with_capacity(df.height());
        for value in string_column(df, column)?.into_iter().flatten() {
            let flag = flag_value(value).ok_or_else(|| unsupported("expected a two-valued flag"))?;
            coded.push(flag);
        }
        coded
    } else {
        return Err(unsupported("expected a numeric column").into());
    };

    if family == Family::Binomial && values.iter().any(|v| *v != 0.0 && *v != 1.0) {
        return Err(unsupported("binomial response must be 0 or 1").into());
    }
    Ok(values)
}

/// How one predictor expands into design columns.
#[derive(Debug, Clone)]
enum Term {
    Numeric { column: String },
    Categorical { column: String, levels: Vec<String> },
}

/// Column layout of the design matrix, intercept first.
#[derive(Debug, Clone)]
struct DesignLayout {
    terms: Vec<Term>,
    names: Vec<String>,
}

impl DesignLayout {
    fn from_frame(df: &DataFrame, predictors: &[String]) -> Result<Self> {
        let mut terms = Vec::with_capacity(predictors.len());
        let mut names = vec![INTERCEPT.to_string()];

        for predictor in predictors {
            let dtype = df.column(predictor.as_str())?.dtype().clone();
            if is_numeric(&dtype) {
                names.push(predictor.clone());
                terms.push(Term::Numeric {
                    column: predictor.clone(),
                });
            } else {
                let levels = unique_values(df, predictor)?;
                names.extend(levels.iter().skip(1).map(|level| format!("{predictor}{level}")));
                terms.push(Term::Categorical {
                    column: predictor.clone(),
                    levels,
                });
            }
        }
        Ok(Self { terms, names })
    }

    fn matrix(&self, df: &DataFrame) -> Result<DMatrix<f64>> {
        let n = df.height();
        let mut x = DMatrix::zeros(n, self.names.len());
        x.column_mut(0).fill(1.0);

        let mut offset = 1;
        for term in &self.terms {
            match term {
                Term::Numeric { column } => {
                    for (i, value) in float_column(df, column)?.into_iter().enumerate() {
                        x[(i, offset)] = value.ok_or_else(|| incomplete(column))?;
                    }
                    offset += 1;
                }
                Term::Categorical { column, levels } => {
                    let positions: HashMap<&str, usize> = levels
                        .iter()
                        .enumerate()
                        .map(|(i, level)| (level.as_str(), i))
                        .collect();
                    for (i, value) in string_column(df, column)?.into_iter().enumerate() {
                        let value = value.ok_or_else(|| incomplete(column))?;
                        let level = *positions.get(value).ok_or_else(|| ModelError::UnknownLevel {
                            column: column.clone(),
                            level: value.to_string(),
                        })?;
                        if level > 0 {
                            x[(i, offset + level - 1)] = 1.0;
                        }
                    }
                    offset += levels.len().saturating_sub(1);
                }
            }
        }
        Ok(x)
    }
}

fn incomplete(column: &str) -> ModelError {
    ModelError::IncompleteData {
        column: column.to_string(),
        count: 1,
    }
}
