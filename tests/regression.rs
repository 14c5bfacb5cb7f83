//! Integration tests for the regression fitter.

use polars::prelude::*;

use incident_analysis::stats::{
    Family, FitStatistics, GlmFitter, ModelFitter, ModelSpec, INTERCEPT,
};
use incident_analysis::{AnalysisError, ModelError};

fn close(actual: f64, expected: f64, tolerance: f64) -> bool {
    (actual - expected).abs() < tolerance
}

#[test]
fn least_squares_matches_closed_form() {
    let df = df!(
        "x" => [1.0, 2.0, 3.0, 4.0, 5.0],
        "y" => [2.1, 3.9, 6.2, 7.8, 10.1],
    )
    .unwrap();
    let spec = ModelSpec::new("y", &["x"], Family::Gaussian);
    let fit = GlmFitter::default().fit(&df, &spec).unwrap();

    // slope = Sxy / Sxx = 19.9 / 10, intercept = 6.02 - 3 * 1.99
    let slope = fit.coefficient("x").unwrap();
    let intercept = fit.coefficient(INTERCEPT).unwrap();
    assert!(close(slope.estimate, 1.99, 1e-9));
    assert!(close(intercept.estimate, 0.05, 1e-9));
    assert!(slope.p_value < 1e-3);
    assert_eq!(fit.observations, 5);
    assert_eq!(fit.df_residual, 3);

    let FitStatistics::Gaussian {
        r_squared,
        f_statistic,
        ..
    } = fit.statistics
    else {
        panic!("expected Gaussian statistics");
    };
    assert!(r_squared > 0.99 && r_squared < 1.0);
    // With one predictor F equals t squared.
    assert!(close(f_statistic, slope.statistic.powi(2), 1e-6 * f_statistic));

    let predicted = fit.predict(&df).unwrap();
    assert!(close(predicted[0], 2.04, 1e-9));
}

#[test]
fn logistic_fit_of_two_groups_recovers_log_odds() {
    let df = df!(
        "group" => ["A", "A", "A", "A", "B", "B", "B", "B"],
        "flag" => ["Y", "N", "N", "N", "Y", "Y", "Y", "N"],
    )
    .unwrap();
    let spec = ModelSpec::new("flag", &["group"], Family::Binomial);
    let fit = GlmFitter::default().fit(&df, &spec).unwrap();

    let ln3 = 3.0f64.ln();
    assert!(close(fit.coefficient(INTERCEPT).unwrap().estimate, -ln3, 1e-5));
    assert!(close(fit.coefficient("groupB").unwrap().estimate, 2.0 * ln3, 1e-5));

    let FitStatistics::Binomial {
        null_deviance,
        residual_deviance,
        aic,
        ..
    } = fit.statistics
    else {
        panic!("expected binomial statistics");
    };
    assert!(close(null_deviance, 16.0 * 2.0f64.ln(), 1e-9));
    // Each group's deviance is -2 * (ln 0.25 + 3 ln 0.75).
    let expected = -4.0 * (0.25f64.ln() + 3.0 * 0.75f64.ln());
    assert!(close(residual_deviance, expected, 1e-6));
    assert!(close(aic, residual_deviance + 4.0, 1e-6));

    let probabilities = fit.predict(&df).unwrap();
    assert!(close(probabilities[0], 0.25, 1e-5));
    assert!(close(probabilities[7], 0.75, 1e-5));

    let table = fit.coefficient_frame().unwrap();
    assert_eq!(table.height(), 2);
    assert!(table.column("z_value").is_ok());
}

#[test]
fn missing_values_are_rejected() {
    let df = df!(
        "x" => [Some(1.0), None, Some(3.0), Some(4.0)],
        "y" => [1.0, 2.0, 3.0, 5.0],
    )
    .unwrap();
    let spec = ModelSpec::new("y", &["x"], Family::Gaussian);
    let err = GlmFitter::default().fit(&df, &spec).unwrap_err();
    assert!(matches!(
        err,
        AnalysisError::Model(ModelError::IncompleteData { ref column, count: 1 }) if column == "x"
    ));
}

#[test]
fn duplicated_predictor_is_reported_aliased() {
    let df = df!(
        "a" => ["p", "q", "p", "q", "p", "q"],
        "b" => ["p", "q", "p", "q", "p", "q"],
        "y" => [1.0, 2.5, 1.2, 2.4, 0.9, 2.6],
    )
    .unwrap();
    let spec = ModelSpec::new("y", &["a", "b"], Family::Gaussian);
    let fit = GlmFitter::default().fit(&df, &spec).unwrap();
    assert_eq!(fit.aliased, vec!["bq".to_string()]);
    assert_eq!(fit.coefficients.len(), 2);
    assert!(fit.coefficient("aq").is_some());
}

#[test]
fn constant_predictor_leaves_nothing_to_fit() {
    let df = df!(
        "x" => [2.0, 2.0, 2.0, 2.0],
        "y" => [1.0, 2.0, 3.0, 5.0],
    )
    .unwrap();
    let spec = ModelSpec::new("y", &["x"], Family::Gaussian);
    let err = GlmFitter::default().fit(&df, &spec).unwrap_err();
    assert!(matches!(err, AnalysisError::Model(ModelError::Singular)));
}

#[test]
fn too_few_rows_is_insufficient_data() {
    let df = df!("x" => [1.0, 2.0], "y" => [1.0, 3.0]).unwrap();
    let spec = ModelSpec::new("y", &["x"], Family::Gaussian);
    let err = GlmFitter::default().fit(&df, &spec).unwrap_err();
    assert!(matches!(
        err,
        AnalysisError::Model(ModelError::InsufficientData { observations: 2, terms: 2 })
    ));
}

#[test]
fn unseen_level_cannot_be_predicted() {
    let df = df!(
        "group" => ["A", "A", "B", "B", "B"],
        "y" => [1.0, 1.5, 3.0, 3.2, 2.9],
    )
    .unwrap();
    let spec = ModelSpec::new("y", &["group"], Family::Gaussian);
    let fit = GlmFitter::default().fit(&df, &spec).unwrap();

    let new = df!("group" => ["C"]).unwrap();
    let err = fit.predict(&new).unwrap_err();
    assert!(matches!(
        err,
        AnalysisError::Model(ModelError::UnknownLevel { ref level, .. }) if level == "C"
    ));
}

#[test]
fn non_binary_response_is_unsupported() {
    let df = df!(
        "x" => [1.0, 2.0, 3.0, 4.0],
        "y" => [0.0, 1.0, 2.0, 1.0],
    )
    .unwrap();
    let spec = ModelSpec::new("y", &["x"], Family::Binomial);
    let err = GlmFitter::default().fit(&df, &spec).unwrap_err();
    assert!(matches!(
        err,
        AnalysisError::Model(ModelError::UnsupportedResponse { .. })
    ));
}
