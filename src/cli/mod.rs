//! Command line interface.

pub mod command;

use std::path::PathBuf;

use clap::{command, Args, Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};

use crate::assemble::AttributeSource;

#[derive(Parser)]
#[command(version, about, long_about = None)]
/// Combines per-timestep NetCDF files into time series
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Log each included file
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Reduce hourly files to one file of daily steps per month
    Daily(DailyArgs),
    /// Reduce daily files to one file of monthly steps per year
    Monthly(MonthlyArgs),
    /// Concatenate every .nc file of a directory along time
    Append(AppendArgs),
}

#[derive(Args, Debug)]
/// Options shared by the aggregating commands.
pub struct AggregateArgs {
    /// Directory holding the input files
    #[arg(long)]
    pub source: PathBuf,

    /// Directory the combined file is moved to
    #[arg(long)]
    pub destination: PathBuf,

    /// Variable to reduce
    #[arg(long)]
    pub variable: String,

    /// Data type in the file names, e.g. 2m_temperature
    #[arg(long)]
    pub data_type: String,

    #[arg(long)]
    pub year: String,

    /// Statistic: mean, sum, median, min, max, std, var or count
    #[arg(long, default_value = "sum")]
    pub method: String,

    /// Input glob, with {prefix}, {data_type}, {year} and {month} placeholders
    #[arg(long)]
    pub pattern: Option<String>,

    /// strftime format of the date at the end of each file name
    #[arg(long)]
    pub date_format: Option<String>,

    /// Dimension collapsed in each file
    #[arg(long, default_value = "time")]
    pub dimension: String,

    /// Output file name, with the same placeholders as --pattern
    #[arg(long)]
    pub output_pattern: Option<String>,

    #[arg(long, default_value = "era5")]
    pub prefix: String,

    /// Where the combined file is written before it is moved
    #[arg(long, default_value = ".")]
    pub staging_dir: PathBuf,

    /// Files processed at the same time
    #[arg(long, default_value_t = 1)]
    pub jobs: usize,

    /// Which input file the output variable's units come from
    #[arg(long, value_enum, default_value_t = AttributeSource::LastOpened)]
    pub attributes_from: AttributeSource,
}

#[derive(Args, Debug)]
pub struct DailyArgs {
    #[command(flatten)]
    pub common: AggregateArgs,

    #[arg(long)]
    pub month: String,
}

#[derive(Args, Debug)]
pub struct MonthlyArgs {
    #[command(flatten)]
    pub common: AggregateArgs,
}

#[derive(Args, Debug)]
pub struct AppendArgs {
    /// Directory whose .nc files are concatenated
    #[arg(long)]
    pub directory: PathBuf,

    /// Name of the combined file
    #[arg(long)]
    pub output: String,

    #[arg(long)]
    pub variable: String,

    /// Directory the combined file is moved to
    #[arg(long)]
    pub destination: PathBuf,

    #[arg(long, default_value = "time")]
    pub time_dimension: String,

    /// Where the combined file is written before it is moved [default: system temp dir]
    #[arg(long)]
    pub staging_dir: Option<PathBuf>,

    /// Overwrite an existing destination file without asking
    #[arg(short, long)]
    pub yes: bool,

    /// Files processed at the same time
    #[arg(long, default_value_t = 1)]
    pub jobs: usize,
}

/// Creates a progress bar.
pub fn create_progress_bar(size: u64, message: String) -> ProgressBar {
    ProgressBar::new(size).with_message(message).with_style(
        ProgressStyle::with_template("[{eta_precise}] {bar:40.cyan/blue} {msg}")
            .unwrap()
            .progress_chars("##-"),
    )
}

// -- Tests -------------------------------------------------------------------

#[cfg(test)]
mod test {
    use clap::CommandFactory;

    use super::*;

    #[test]
    fn should_have_valid_cli() {
        Cli::command().debug_assert();
    }

    #[test]
    fn should_parse_daily_defaults() {
        let cli = Cli::parse_from([
            "ncagg", "daily", "--source", "in", "--destination", "out", "--variable", "t2m",
            "--data-type", "2m_temperature", "--year", "2020", "--month", "01",
        ]);

        let Commands::Daily(args) = cli.command else {
            panic!("expected daily command");
        };
        assert_eq!(args.month, "01");
        assert_eq!(args.common.method, "sum");
        assert_eq!(args.common.prefix, "era5");
        assert_eq!(args.common.dimension, "time");
        assert_eq!(args.common.jobs, 1);
        assert_eq!(args.common.attributes_from, AttributeSource::LastOpened);
        assert!(args.common.pattern.is_none());
        assert!(!cli.verbose);
    }

    #[test]
    fn should_parse_append_flags() {
        let cli = Cli::parse_from([
            "ncagg", "append", "--directory", "in", "--output", "all.nc", "--variable", "t2m",
            "--destination", "out", "--yes", "-v",
        ]);

        let Commands::Append(args) = cli.command else {
            panic!("expected append command");
        };
        assert!(args.yes);
        assert!(cli.verbose);
        assert_eq!(args.time_dimension, "time");
        assert!(args.staging_dir.is_none());
    }

    #[test]
    fn should_require_month_for_daily() {
        let result = Cli::try_parse_from([
            "ncagg", "daily", "--source", "in", "--destination", "out", "--variable", "t2m",
            "--data-type", "2m_temperature", "--year", "2020",
        ]);

        assert!(result.is_err());
    }
}
