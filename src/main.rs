mod config;
mod coordinator;
mod errors;
mod models;
mod output;
mod probe;
mod schedule;
mod scrapers;
#[cfg(test)]
mod test_utils;

use anyhow::{Context, Result};
use chrono::{Days, Local, SubsecRound};
use clap::{Parser, Subcommand};
use config::Config;
use coordinator::{local_today, run_all};
use models::WalkTarget;
use scrapers::{AvailabilitySource, DocBookingClient};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(version, about = "DOC Great Walks availability scraper")]
struct Cli {
    /// Walk list and scraping parameters
    #[arg(short, long, env = "SCOUT_CONFIG", default_value = "config/walks.json")]
    config: PathBuf,

    /// Root directory for CSV snapshots
    #[arg(short, long, env = "SCOUT_DATA_DIR", default_value = "data")]
    data_dir: PathBuf,

    /// Override the booking search endpoint
    #[arg(long, env = "SCOUT_API_URL")]
    api_url: Option<String>,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug, Clone)]
enum Command {
    /// Scrape every enabled walk and save a snapshot (default)
    Scrape,
    /// Send one request for a single walk and summarise the response
    Probe {
        #[arg(long)]
        place_id: i64,
        #[arg(long, default_value = "Probe")]
        name: String,
        /// Days from today to the arrival date
        #[arg(long, default_value_t = 30)]
        days_out: u64,
        #[arg(long, default_value_t = 5)]
        nights: u32,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_target(false)
        .init();

    let cli = Cli::parse();

    let client = match &cli.api_url {
        Some(url) => DocBookingClient::with_url(url.as_str())?,
        None => DocBookingClient::new()?,
    };

    match cli.command.clone().unwrap_or(Command::Scrape) {
        Command::Scrape => scrape(&cli, client).await,
        Command::Probe {
            place_id,
            name,
            days_out,
            nights,
        } => {
            let walk = WalkTarget { name, place_id };
            let arrival_date = local_today()
                .checked_add_days(Days::new(days_out))
                .context("Arrival date out of range")?;
            probe::probe(&client, &walk, arrival_date, nights).await;
            Ok(())
        }
    }
}

async fn scrape(cli: &Cli, client: DocBookingClient) -> Result<()> {
    info!("{}", "=".repeat(60));
    info!("DOC Great Walks Availability Scraper");
    info!("{}", "=".repeat(60));

    let config = Config::load(&cli.config)?;
    let params = &config.scraping;

    info!("Scraping parameters:");
    info!("  Days ahead: {}", params.days_ahead);
    info!("  Nights per request: {}", params.nights_per_request);
    info!("  Workers per walk: {}", params.max_workers_per_walk);
    info!("  Parallel walks: {}", params.max_parallel_walks);

    // One timestamp for every row in this run
    let check_timestamp = Local::now().trunc_subsecs(6);
    info!("Check timestamp: {}", check_timestamp.to_rfc3339());

    let source: Arc<dyn AvailabilitySource> = Arc::new(client);
    let Some(mut outcome) = run_all(source, &config.walks, params, local_today).await else {
        warn!(
            "Please update {} with placeIds and set enabled=true",
            cli.config.display()
        );
        return Ok(());
    };

    info!("Records per walk:");
    for (walk, count) in &outcome.walk_counts {
        info!("  {}: {}", walk, count);
    }

    if outcome.records.is_empty() {
        warn!("⚠ No data collected");
        return Ok(());
    }

    output::write_snapshot(&cli.data_dir, &mut outcome.records, check_timestamp)?;
    info!("✓ Scraping complete! Total records: {}", outcome.records.len());

    Ok(())
}
