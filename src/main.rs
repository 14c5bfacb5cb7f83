//! Incident Analysis CLI.

use anyhow::{Context, Result};
use clap::Parser;
use std::path::Path;
use tracing::{error, info};

use incident_analysis::data::DataLoader;
use incident_analysis::logging::{init_logging, LogConfig, LogFormat};
use incident_analysis::reports::{covid, export_report, shooting, ReportOutput};
use incident_analysis::stats::GlmFitter;
use incident_analysis::AnalysisConfig;

mod cli;
mod summary;

use crate::cli::{Cli, Command, LogFormatArg, ReportArg, RunArgs};
use crate::summary::print_report;

fn main() {
    let cli = Cli::parse();
    let log_config = log_config_from_cli(&cli);
    if let Err(error) = init_logging(&log_config) {
        eprintln!("error: failed to initialize logging: {error}");
        std::process::exit(1);
    }

    let outcome = match &cli.command {
        Command::Run(args) => run(args),
        Command::Config => print_default_config(),
    };
    if let Err(error) = outcome {
        error!("{error:#}");
        eprintln!("error: {error:#}");
        std::process::exit(1);
    }
}

fn log_config_from_cli(cli: &Cli) -> LogConfig {
    let format = match cli.log_format {
        LogFormatArg::Pretty => LogFormat::Pretty,
        LogFormatArg::Compact => LogFormat::Compact,
        LogFormatArg::Json => LogFormat::Json,
    };
    LogConfig::from_verbosity(cli.verbose, cli.quiet)
        .with_format(format)
        .with_log_file(cli.log_file.clone())
}

fn print_default_config() -> Result<()> {
    println!("{}", AnalysisConfig::default().to_json()?);
    Ok(())
}

fn run(args: &RunArgs) -> Result<()> {
    let config = load_config(args)?;
    let loader = DataLoader::new().context("failed to build HTTP client")?;
    let fitter = GlmFitter::default();

    let run_shooting = || {
        shooting::run(&loader, &config.shooting, &fitter).context("shooting report failed")
    };
    let run_covid =
        || covid::run(&loader, &config.covid, &fitter).context("COVID report failed");

    let reports = match args.report {
        ReportArg::Shooting => vec![run_shooting()?],
        ReportArg::Covid => vec![run_covid()?],
        ReportArg::All => {
            // The reports share nothing but the HTTP client.
            let (shooting, covid) = rayon::join(run_shooting, run_covid);
            vec![shooting?, covid?]
        }
    };

    for report in &reports {
        let exported = match &args.output_dir {
            Some(dir) => export(report, dir)?,
            None => Vec::new(),
        };
        print_report(report, args.preview, &exported);
    }
    info!(reports = reports.len(), "done");
    Ok(())
}

fn load_config(args: &RunArgs) -> Result<AnalysisConfig> {
    let mut config = match &args.config {
        Some(path) => AnalysisConfig::from_file(path)
            .with_context(|| format!("failed to load configuration {}", path.display()))?,
        None => AnalysisConfig::default(),
    };
    if let Some(source) = &args.shooting_source {
        config.shooting.source = source.clone();
    }
    if let Some(source) = &args.cases_source {
        config.covid.cases_source = source.clone();
    }
    if let Some(source) = &args.deaths_source {
        config.covid.deaths_source = source.clone();
    }
    Ok(config)
}

fn export(report: &ReportOutput, dir: &Path) -> Result<Vec<std::path::PathBuf>> {
    export_report(report, dir)
        .with_context(|| format!("failed to export {} report to {}", report.name, dir.display()))
}
