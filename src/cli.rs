//! CLI argument definitions.

use std::path::PathBuf;

use clap::{ArgAction, Args, Parser, Subcommand, ValueEnum};

#[derive(Parser)]
#[command(
    name = "incident-analysis",
    version,
    about = "Shooting-incident and COVID time-series analysis reports",
    long_about = "Load the NYPD shooting-incident records and the JHU CSSE US COVID time \
                  series, clean and aggregate them, and fit the report models.\n\n\
                  Sources may be URLs or local CSV files."
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// More log output (-v for debug, -vv for trace).
    #[arg(short, long, action = ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Less log output (-q for warnings, -qq for errors only).
    #[arg(short, long, action = ArgAction::Count, global = true, conflicts_with = "verbose")]
    pub quiet: u8,

    /// Log output format.
    #[arg(long = "log-format", value_enum, default_value = "pretty", global = true)]
    pub log_format: LogFormatArg,

    /// Write logs to a file instead of stderr.
    #[arg(long = "log-file", value_name = "PATH", global = true)]
    pub log_file: Option<PathBuf>,
}

#[derive(Subcommand)]
pub enum Command {
    /// Run one or both reports.
    Run(RunArgs),

    /// Print the default configuration as JSON.
    Config,
}

#[derive(Args)]
pub struct RunArgs {
    /// Which report to run.
    #[arg(value_enum, default_value = "all")]
    pub report: ReportArg,

    /// JSON configuration file; missing fields keep their defaults.
    #[arg(long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Write every report table as CSV under this directory.
    #[arg(long = "output-dir", value_name = "DIR")]
    pub output_dir: Option<PathBuf>,

    /// Shooting-incident CSV (URL or path).
    #[arg(long = "shooting-source", value_name = "SRC")]
    pub shooting_source: Option<String>,

    /// Confirmed-cases time series CSV (URL or path).
    #[arg(long = "cases-source", value_name = "SRC")]
    pub cases_source: Option<String>,

    /// Deaths time series CSV (URL or path).
    #[arg(long = "deaths-source", value_name = "SRC")]
    pub deaths_source: Option<String>,

    /// Rows of each table to print.
    #[arg(long, value_name = "N", default_value_t = 5)]
    pub preview: usize,
}

#[derive(Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ReportArg {
    Shooting,
    Covid,
    All,
}

/// CLI log format choices.
#[derive(Clone, Copy, ValueEnum)]
pub enum LogFormatArg {
    Pretty,
    Compact,
    Json,
}
