//! CSV export of report tables.

use polars::prelude::*;
use std::fs::{self, File};
use std::path::{Path, PathBuf};
use tracing::info;

use super::ReportOutput;
use crate::error::{AnalysisError, Result};

/// File name of the coefficient table inside a report directory.
pub const COEFFICIENTS_FILE: &str = "coefficients.csv";

/// Write every table of `report` plus its coefficients to
/// `{output_dir}/{report name}/`. Returns the written paths in table order.
pub fn export_report(report: &ReportOutput, output_dir: &Path) -> Result<Vec<PathBuf>> {
    let report_dir = output_dir.join(&report.name);
    fs::create_dir_all(&report_dir).map_err(|source| AnalysisError::Io {
        path: report_dir.clone(),
        source,
    })?;

    let mut written = Vec::with_capacity(report.tables.len() + 1);
    for named in &report.tables {
        let path = report_dir.join(format!("{}.csv", named.name));
        write_csv(&named.table, &path)?;
        written.push(path);
    }

    let path = report_dir.join(COEFFICIENTS_FILE);
    write_csv(&report.fit.coefficient_frame()?, &path)?;
    written.push(path);

    info!(
        report = %report.name,
        files = written.len(),
        dir = %report_dir.display(),
        "exported report"
    );
    Ok(written)
}

fn write_csv(df: &DataFrame, path: &Path) -> Result<()> {
    let mut file = File::create(path).map_err(|source| AnalysisError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let mut df = df.clone();
    CsvWriter::new(&mut file)
        .include_header(true)
        .finish(&mut df)?;
    Ok(())
}
