//! COVID time-series report.
//!
//! The cases and deaths tables arrive wide, one column per date. Both are
//! stacked to long form and joined per entity and date; the joined table is
//! then rolled up per state and per country, and each state's latest totals
//! feed the `deaths_per_thou ~ cases_per_thou` model.

use polars::prelude::*;
use tracing::{info, info_span};

use super::{complete_cases, model_columns, NamedTable, ReportOutput};
use crate::config::CovidConfig;
use crate::data::{
    AggregateSpec, Aggregator, DataLoader, DataProcessor, FilterRule, Joiner, RowFilter,
    DATE_COLUMN,
};
use crate::error::Result;
use crate::stats::{ModelFitter, StatsCalculator};

pub const REPORT_NAME: &str = "covid";

pub const LONG_TABLE: &str = "cases_deaths";
pub const STATE_TABLE: &str = "by_state";
pub const COUNTRY_TABLE: &str = "totals";
pub const NEW_STATE_TABLE: &str = "new_by_state";
pub const NEW_COUNTRY_TABLE: &str = "new_totals";
pub const STATE_TOTALS_TABLE: &str = "state_totals";

pub const CASES: &str = "cases";
pub const DEATHS: &str = "deaths";
pub const NEW_CASES: &str = "new_cases";
pub const NEW_DEATHS: &str = "new_deaths";
pub const DEATHS_PER_MILL: &str = "deaths_per_mill";
pub const DEATH_RATE: &str = "death_rate";
pub const CASES_PER_THOU: &str = "cases_per_thou";
pub const DEATHS_PER_THOU: &str = "deaths_per_thou";
pub const PREDICTION: &str = "pred";

/// Load both wide tables and run the report.
pub fn run(
    loader: &DataLoader,
    config: &CovidConfig,
    fitter: &dyn ModelFitter,
) -> Result<ReportOutput> {
    let cases = loader.load_csv(&config.cases_source)?;
    let deaths = loader.load_csv(&config.deaths_source)?;
    analyze(&cases, &deaths, config, fitter)
}

/// Run the report on already loaded wide tables.
pub fn analyze(
    cases: &DataFrame,
    deaths: &DataFrame,
    config: &CovidConfig,
    fitter: &dyn ModelFitter,
) -> Result<ReportOutput> {
    let _span = info_span!("report", name = REPORT_NAME).entered();

    let long = long_table(cases, deaths, config)?;
    info!(rows = long.height(), "joined cases and deaths");

    let by_state = rollup(&long, &config.state_columns, config)?;
    let totals = rollup(&long, &config.country_columns, config)?;
    let totals = Aggregator::derive_ratio(&totals, DEATHS, CASES, 1.0, DEATH_RATE)?;

    let non_negative = [
        FilterRule::at_least(NEW_CASES, 0.0),
        FilterRule::at_least(NEW_DEATHS, 0.0),
    ];
    let new_by_state = RowFilter::apply(&by_state, &non_negative)?;
    let new_totals = RowFilter::apply(&totals, &non_negative)?;

    let state_totals = state_totals(&by_state, config)?;
    let mut rules = complete_cases(&config.model);
    rules.push(FilterRule::above(&config.population_column, 0.0));
    let model_data = RowFilter::apply(&state_totals, &rules)?;

    let fit = fitter.fit(
        &DataProcessor::select_columns(&model_data, &model_columns(&config.model))?,
        &config.model,
    )?;
    info!(
        formula = %fit.formula,
        observations = fit.observations,
        "fitted model"
    );

    let mut state_totals = model_data;
    let predicted = fit.predict(&state_totals)?;
    state_totals.with_column(Column::new(PREDICTION.into(), predicted))?;

    let summaries = vec![
        StatsCalculator::summarize(&state_totals, CASES_PER_THOU)?,
        StatsCalculator::summarize(&state_totals, DEATHS_PER_THOU)?,
    ];

    Ok(ReportOutput {
        name: REPORT_NAME.to_string(),
        tables: vec![
            NamedTable::new(LONG_TABLE, long),
            NamedTable::new(STATE_TABLE, by_state),
            NamedTable::new(COUNTRY_TABLE, totals),
            NamedTable::new(NEW_STATE_TABLE, new_by_state),
            NamedTable::new(NEW_COUNTRY_TABLE, new_totals),
            NamedTable::new(STATE_TOTALS_TABLE, state_totals),
        ],
        fit,
        summaries,
    })
}

/// Prune, stack and join the wide tables, keeping rows with reported cases.
pub fn long_table(cases: &DataFrame, deaths: &DataFrame, config: &CovidConfig) -> Result<DataFrame> {
    let cases = DataProcessor::drop_columns(cases, &config.drop_columns)?;
    let deaths = DataProcessor::drop_columns(deaths, &config.drop_columns)?;

    let cases = DataProcessor::stack_to_long(&cases, &config.case_id_columns, CASES)?;
    let deaths = DataProcessor::stack_to_long(&deaths, &config.death_id_columns, DEATHS)?;

    let mut keys = config.entity_columns.clone();
    keys.push(DATE_COLUMN.to_string());
    let joined = Joiner::full_outer(&cases, &deaths, &keys)?;

    RowFilter::apply(&joined, &[FilterRule::above(CASES, config.min_cases)])
}

/// Per-group daily sums with deaths per million and lagged new counts.
fn rollup(long: &DataFrame, group: &[String], config: &CovidConfig) -> Result<DataFrame> {
    let mut keys = group.to_vec();
    keys.push(DATE_COLUMN.to_string());

    let daily = Aggregator::group_aggregate(
        long,
        &keys,
        &[
            AggregateSpec::sum(CASES, CASES),
            AggregateSpec::sum(DEATHS, DEATHS),
            AggregateSpec::sum(&config.population_column, &config.population_column),
        ],
    )?;
    let daily = Aggregator::derive_ratio(
        &daily,
        DEATHS,
        &config.population_column,
        1_000_000.0,
        DEATHS_PER_MILL,
    )?;
    let daily = Aggregator::lag_difference(&daily, group, DATE_COLUMN, CASES, NEW_CASES)?;
    Aggregator::lag_difference(&daily, group, DATE_COLUMN, DEATHS, NEW_DEATHS)
}

/// Latest cumulative counts per state, with per-thousand rates.
fn state_totals(by_state: &DataFrame, config: &CovidConfig) -> Result<DataFrame> {
    let totals = Aggregator::group_aggregate(
        by_state,
        &config.state_columns,
        &[
            AggregateSpec::max(CASES, CASES),
            AggregateSpec::max(DEATHS, DEATHS),
            AggregateSpec::max(&config.population_column, &config.population_column),
        ],
    )?;
    let totals = RowFilter::apply(&totals, &[FilterRule::above(CASES, 0.0)])?;
    let totals = Aggregator::derive_ratio(
        &totals,
        CASES,
        &config.population_column,
        1000.0,
        CASES_PER_THOU,
    )?;
    Aggregator::derive_ratio(
        &totals,
        DEATHS,
        &config.population_column,
        1000.0,
        DEATHS_PER_THOU,
    )
}
