//! Report configuration.
//!
//! Source locations, pruned columns, exclusion sets and model formulas are
//! properties of one upstream data release, so they live here as data with
//! defaults matching the current releases. A JSON file may override any
//! part of them.

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::data::FilterRule;
use crate::error::{AnalysisError, Result};
use crate::stats::{Family, ModelSpec};

pub const SHOOTING_URL: &str =
    "https://data.cityofnewyork.us/api/views/833y-m6ck/rows.csv?accessType=DOWNLOAD";

const JHU_TIME_SERIES: &str = "https://raw.githubusercontent.com/CSSEGISandData/COVID-19/master/csse_covid_19_data/csse_covid_19_time_series";

/// Settings for both reports.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisConfig {
    pub shooting: ShootingConfig,
    pub covid: CovidConfig,
}

impl AnalysisConfig {
    /// Read a JSON configuration; fields left out keep their defaults.
    pub fn from_file(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path).map_err(|source| AnalysisError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        serde_json::from_str(&text).map_err(|e| AnalysisError::Config {
            path: path.to_path_buf(),
            message: e.to_string(),
        })
    }

    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string_pretty(self).map_err(|e| AnalysisError::Config {
            path: "<default>".into(),
            message: e.to_string(),
        })
    }
}

/// Shooting-incident report settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ShootingConfig {
    pub source: String,
    pub drop_columns: Vec<String>,
    pub date_column: String,
    pub time_column: String,
    pub borough_column: String,
    pub month_column: String,
    pub year_column: String,
    pub hour_column: String,
    /// Yes/no column counted per borough.
    pub flag_column: String,
    /// Columns that get a frequency table.
    pub frequency_columns: Vec<String>,
    /// Invalid values removed before fitting.
    pub filters: Vec<FilterRule>,
    pub model: ModelSpec,
}

impl Default for ShootingConfig {
    fn default() -> Self {
        Self {
            source: SHOOTING_URL.to_string(),
            drop_columns: strings(&[
                "INCIDENT_KEY",
                "LOC_OF_OCCUR_DESC",
                "PRECINCT",
                "JURISDICTION_CODE",
                "LOC_CLASSFCTN_DESC",
                "LOCATION_DESC",
                "X_COORD_CD",
                "Y_COORD_CD",
                "Latitude",
                "Longitude",
                "Lon_Lat",
            ]),
            date_column: "OCCUR_DATE".to_string(),
            time_column: "OCCUR_TIME".to_string(),
            borough_column: "BORO".to_string(),
            month_column: "OCCUR_MONTH".to_string(),
            year_column: "OCCUR_YEAR".to_string(),
            hour_column: "OCCUR_HOUR".to_string(),
            flag_column: "STATISTICAL_MURDER_FLAG".to_string(),
            frequency_columns: strings(&[
                "BORO",
                "OCCUR_YEAR",
                "OCCUR_MONTH",
                "OCCUR_HOUR",
                "PERP_AGE_GROUP",
                "VIC_AGE_GROUP",
            ]),
            filters: vec![
                FilterRule::exclude("PERP_AGE_GROUP", ["(null)", "1020", "1028", "224", "940"]),
                FilterRule::exclude("PERP_SEX", ["(null)"]),
                FilterRule::exclude("PERP_RACE", ["(null)"]),
                FilterRule::exclude("VIC_AGE_GROUP", ["1022"]),
            ],
            model: ModelSpec::new(
                "STATISTICAL_MURDER_FLAG",
                &["PERP_AGE_GROUP", "PERP_SEX", "PERP_RACE", "VIC_AGE_GROUP"],
                Family::Binomial,
            ),
        }
    }
}

/// COVID time-series report settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CovidConfig {
    pub cases_source: String,
    pub deaths_source: String,
    /// Columns removed from both wide tables before stacking.
    pub drop_columns: Vec<String>,
    /// Non-date columns left in the cases table.
    pub case_id_columns: Vec<String>,
    /// Non-date columns left in the deaths table.
    pub death_id_columns: Vec<String>,
    /// Columns identifying one row of the joined long table, date excluded.
    pub entity_columns: Vec<String>,
    pub state_columns: Vec<String>,
    pub country_columns: Vec<String>,
    pub population_column: String,
    /// Rows with no more cases than this are dropped after the join.
    pub min_cases: f64,
    pub model: ModelSpec,
}

impl Default for CovidConfig {
    fn default() -> Self {
        Self {
            cases_source: format!("{JHU_TIME_SERIES}/time_series_covid19_confirmed_US.csv"),
            deaths_source: format!("{JHU_TIME_SERIES}/time_series_covid19_deaths_US.csv"),
            drop_columns: strings(&[
                "UID", "iso2", "iso3", "code3", "FIPS", "Admin2", "Lat", "Long_",
            ]),
            case_id_columns: strings(&["Province_State", "Country_Region", "Combined_Key"]),
            death_id_columns: strings(&[
                "Province_State",
                "Country_Region",
                "Combined_Key",
                "Population",
            ]),
            entity_columns: strings(&["Province_State", "Country_Region", "Combined_Key"]),
            state_columns: strings(&["Province_State", "Country_Region"]),
            country_columns: strings(&["Country_Region"]),
            population_column: "Population".to_string(),
            min_cases: 0.0,
            model: ModelSpec::new("deaths_per_thou", &["cases_per_thou"], Family::Gaussian),
        }
    }
}

fn strings(values: &[&str]) -> Vec<String> {
    values.iter().map(|v| v.to_string()).collect()
}
