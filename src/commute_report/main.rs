use anyhow::{Context, Result};
use chrono::Utc;
use clap::Parser;
use commute_drivetrain::activity_totals::{MultiYearScheduler, YearAggregator};
use commute_drivetrain::common::oauth::{OAuthClient, OAuthSession, StdinPrompt};
use commute_drivetrain::common::strava_client::StravaClient;
use commute_drivetrain::common::token_store::TokenStore;
use commute_drivetrain::report::{self, ChartRenderer, SvgBarChart};
use std::fs::File;
use std::path::Path;
use std::sync::Arc;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt::writer::BoxMakeWriter;

mod cli;

use crate::cli::Cli;

#[tokio::main]
async fn main() {
    let args = Cli::parse();
    if let Err(e) = init_tracing(args.json, args.log_file.as_deref()) {
        eprintln!("{e:#}");
        std::process::exit(1);
    }

    if let Err(e) = run(args).await {
        error!("{e:#}");
        std::process::exit(1);
    }
}

fn init_tracing(json: bool, log_file: Option<&Path>) -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(log_writer(log_file)?);

    if json {
        builder.json().with_current_span(false).init();
    } else {
        builder.init();
    }
    Ok(())
}

// stdout is reserved for the report
fn log_writer(log_file: Option<&Path>) -> Result<BoxMakeWriter> {
    match log_file {
        Some(path) => {
            let file = File::create(path)
                .with_context(|| format!("Unable to open {} for logging", path.display()))?;
            Ok(BoxMakeWriter::new(Arc::new(file)))
        }
        None => Ok(BoxMakeWriter::new(std::io::stderr)),
    }
}

async fn run(args: Cli) -> Result<()> {
    info!("Requested years {} to {}", args.start_year, args.end_year);

    let client = StravaClient::with_endpoints(&args.api_base, &args.oauth_base)
        .context("Failed to create HTTP client")?;
    let store = TokenStore::new(args.secrets_file, args.tokens_file);
    let oauth = OAuthClient::new(client.clone());

    // No fetch starts before a valid access token exists
    let session = OAuthSession::establish(&store, &oauth, &StdinPrompt)
        .await
        .context("Strava authentication failed")?;

    let aggregator = YearAggregator::new(Arc::new(client), Arc::new(session));
    let results = MultiYearScheduler::new(aggregator)
        .run(args.start_year, args.end_year)
        .await
        .context("Failed to aggregate activities")?;

    let text = report::render_text(&results, Utc::now())?;
    println!("{text}");

    if !args.no_chart {
        let path = SvgBarChart::new(args.chart_dir)
            .render(&results)
            .context("Failed to render chart")?;
        println!("\nChart saved to: {}", path.display());
    }

    Ok(())
}
