//! Shooting-incident report.
//!
//! Prune location columns, encode occurrence date and time, count incidents
//! per category and per borough, then fit the murder-flag model on rows with
//! valid perpetrator and victim demographics.

use polars::prelude::*;
use tracing::{info, info_span};

use super::{complete_cases, model_columns, NamedTable, ReportOutput};
use crate::config::ShootingConfig;
use crate::data::{AggregateSpec, Aggregator, DataLoader, DataProcessor, RowFilter};
use crate::error::Result;
use crate::stats::{ModelFitter, StatsCalculator};

pub const REPORT_NAME: &str = "shooting";

/// Incidents per borough.
pub const BOROUGH_TABLE: &str = "by_borough";
/// Rows handed to the fitter.
pub const MODEL_TABLE: &str = "model_data";

const FLAG_VALUE_COLUMN: &str = "flag_value";

/// Load the incident table and run the report.
pub fn run(
    loader: &DataLoader,
    config: &ShootingConfig,
    fitter: &dyn ModelFitter,
) -> Result<ReportOutput> {
    let raw = loader.load_csv(&config.source)?;
    analyze(&raw, config, fitter)
}

/// Run the report on an already loaded incident table.
pub fn analyze(
    raw: &DataFrame,
    config: &ShootingConfig,
    fitter: &dyn ModelFitter,
) -> Result<ReportOutput> {
    let _span = info_span!("report", name = REPORT_NAME).entered();

    let incidents = normalize(raw, config)?;
    let mut tables = Vec::with_capacity(config.frequency_columns.len() + 2);

    for column in &config.frequency_columns {
        let counts = StatsCalculator::frequency_table(&incidents, column)?;
        tables.push(NamedTable::new(
            format!("freq_{}", column.to_lowercase()),
            counts,
        ));
    }
    tables.push(NamedTable::new(
        BOROUGH_TABLE,
        borough_counts(&incidents, config)?,
    ));

    let mut rules = config.filters.clone();
    rules.extend(complete_cases(&config.model));
    let cleaned = RowFilter::apply(&incidents, &rules)?;
    let model_data = DataProcessor::select_columns(&cleaned, &model_columns(&config.model))?;
    info!(
        incidents = incidents.height(),
        valid = model_data.height(),
        "filtered invalid demographics"
    );

    let fit = fitter.fit(&model_data, &config.model)?;
    info!(
        formula = %fit.formula,
        observations = fit.observations,
        "fitted model"
    );
    tables.push(NamedTable::new(MODEL_TABLE, model_data));

    Ok(ReportOutput {
        name: REPORT_NAME.to_string(),
        tables,
        fit,
        summaries: Vec::new(),
    })
}

/// Prune and add month, year and hour labels.
pub fn normalize(raw: &DataFrame, config: &ShootingConfig) -> Result<DataFrame> {
    let pruned = DataProcessor::drop_columns(raw, &config.drop_columns)?;
    let df = DataProcessor::encode_month(&pruned, &config.date_column, &config.month_column)?;
    let df = DataProcessor::encode_year(&df, &config.date_column, &config.year_column)?;
    DataProcessor::encode_hour(&df, &config.time_column, &config.hour_column)
}

/// Incidents, flagged incidents and flag rate per borough.
fn borough_counts(incidents: &DataFrame, config: &ShootingConfig) -> Result<DataFrame> {
    let flagged = DataProcessor::encode_flag(incidents, &config.flag_column, FLAG_VALUE_COLUMN)?;
    let counts = Aggregator::group_aggregate(
        &flagged,
        &[config.borough_column.as_str()],
        &[
            AggregateSpec::count("incidents"),
            AggregateSpec::sum("flagged", FLAG_VALUE_COLUMN),
        ],
    )?;
    Aggregator::derive_ratio(&counts, "flagged", "incidents", 1.0, "flagged_rate")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::FilterRule;
    use crate::stats::{Family, GlmFitter, ModelSpec};

    fn config() -> ShootingConfig {
        ShootingConfig {
            drop_columns: vec!["INCIDENT_KEY".to_string()],
            frequency_columns: vec!["BORO".to_string(), "OCCUR_MONTH".to_string()],
            filters: vec![FilterRule::exclude("PERP_AGE_GROUP", ["(null)"])],
            model: ModelSpec::new(
                "STATISTICAL_MURDER_FLAG",
                &["PERP_AGE_GROUP"],
                Family::Binomial,
            ),
            ..ShootingConfig::default()
        }
    }

    fn incidents() -> DataFrame {
        df!(
            "INCIDENT_KEY" => [1i64, 2, 3, 4, 5, 6, 7, 8],
            "OCCUR_DATE" => ["01/05/2019", "02/11/2019", "01/20/2020", "07/04/2020",
                             "07/09/2021", "12/25/2021", "03/03/2021", "03/15/2020"],
            "OCCUR_TIME" => ["00:30:00", "13:05:00", "23:59:00", "09:00:00",
                             "21:10:00", "02:45:00", "18:00:00", "11:11:00"],
            "BORO" => ["BRONX", "BRONX", "QUEENS", "BRONX", "QUEENS", "BRONX", "QUEENS", "BRONX"],
            "STATISTICAL_MURDER_FLAG" => ["true", "false", "false", "true",
                                          "false", "false", "true", "false"],
            "PERP_AGE_GROUP" => ["25-44", "18-24", "(null)", "25-44",
                                 "18-24", "25-44", "18-24", "18-24"],
        )
        .unwrap()
    }

    #[test]
    fn normalize_adds_labels() {
        let df = normalize(&incidents(), &config()).unwrap();
        assert!(df.column("INCIDENT_KEY").is_err());
        let months: Vec<Option<&str>> = df.column("OCCUR_MONTH").unwrap().str().unwrap().into_iter().collect();
        assert_eq!(months[0], Some("Jan"));
        assert_eq!(months[5], Some("Dec"));
        let hours: Vec<Option<&str>> = df.column("OCCUR_HOUR").unwrap().str().unwrap().into_iter().collect();
        assert_eq!(hours[0], Some("12:00 AM"));
        assert_eq!(hours[1], Some("1:00 PM"));
        let years: Vec<Option<i32>> = df.column("OCCUR_YEAR").unwrap().i32().unwrap().into_iter().collect();
        assert_eq!(years[2], Some(2020));
    }

    #[test]
    fn report_tables_and_fit() {
        let output = analyze(&incidents(), &config(), &GlmFitter::default()).unwrap();
        assert_eq!(output.name, REPORT_NAME);
        assert!(output.table("freq_boro").is_some());
        assert!(output.table("freq_occur_month").is_some());

        let by_borough = output.table(BOROUGH_TABLE).unwrap();
        let boros: Vec<Option<&str>> = by_borough.column("BORO").unwrap().str().unwrap().into_iter().collect();
        assert_eq!(boros, vec![Some("BRONX"), Some("QUEENS")]);
        let rates: Vec<Option<f64>> = by_borough.column("flagged_rate").unwrap().f64().unwrap().into_iter().collect();
        assert_eq!(rates, vec![Some(0.4), Some(1.0 / 3.0)]);

        let model_data = output.table(MODEL_TABLE).unwrap();
        assert_eq!(model_data.height(), 7);
        assert_eq!(output.fit.observations, 7);
        assert!(output.fit.coefficient("PERP_AGE_GROUP25-44").is_some());
    }
}
