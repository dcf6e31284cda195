use chrono::{Datelike, Utc};
use clap::Parser;
use commute_drivetrain::common::strava_client::{STRAVA_API_BASE, STRAVA_OAUTH_BASE};
use commute_drivetrain::common::token_store::{DEFAULT_SECRETS_FILE, DEFAULT_TOKENS_FILE};
use std::path::PathBuf;

fn current_year() -> i32 {
    Utc::now().year()
}

/// Sums commute and pleasure riding per year from Strava and charts it.
#[derive(Debug, Parser)]
#[command(name = "commute-report", version, about, long_about = None)]
pub struct Cli {
    /// First year to run the commute numbers for. Defaults to current year.
    #[arg(long, alias = "startYear", default_value_t = current_year())]
    pub start_year: i32,

    /// Last year to run the commute numbers for. Defaults to current year.
    #[arg(long, alias = "endYear", default_value_t = current_year())]
    pub end_year: i32,

    /// JSON file with the API application ClientID and ClientSecret
    #[arg(long, env = "COMMUTE_SECRETS_FILE", default_value = DEFAULT_SECRETS_FILE)]
    pub secrets_file: PathBuf,

    /// JSON file the OAuth tokens are read from and written back to
    #[arg(long, env = "COMMUTE_TOKENS_FILE", default_value = DEFAULT_TOKENS_FILE)]
    pub tokens_file: PathBuf,

    /// Directory the chart is written to
    #[arg(long, env = "COMMUTE_CHART_DIR", default_value = ".")]
    pub chart_dir: PathBuf,

    /// Skip writing the chart
    #[arg(long)]
    pub no_chart: bool,

    #[arg(long, env = "STRAVA_API_BASE", default_value = STRAVA_API_BASE, hide = true)]
    pub api_base: String,

    #[arg(long, env = "STRAVA_OAUTH_BASE", default_value = STRAVA_OAUTH_BASE, hide = true)]
    pub oauth_base: String,

    /// Log as JSON lines instead of plain text
    #[arg(long)]
    pub json: bool,

    /// Write the log to this file, truncating it, instead of stderr
    #[arg(long, env = "COMMUTE_LOG_FILE")]
    pub log_file: Option<PathBuf>,
}
