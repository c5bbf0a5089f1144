mod cli;
mod config;
mod logging;

use std::collections::HashSet;

use anyhow::{Context, Result};
use chrono::Utc;
use clap::Parser;
use hoops_core::schema::names;
use hoops_core::{EntityKind, Frame};
use hoops_engine::{
    filter_listings_by_date, DatabaseStore, DetailCache, FetchSettings, FileStore, Harvester,
    ReqwestFetcher, StorageBackend, WriteMode,
};
use hoops_logging::hoops_info;
use url::Url;

use crate::cli::{Cli, Mode};
use crate::config::Settings;
use crate::logging::LogOptions;

fn main() -> Result<()> {
    let cli = Cli::parse();
    logging::initialize(LogOptions {
        file: &cli.log_file,
        console: cli.log_to_console,
        verbose: cli.verbose,
    });
    let settings = Settings::from_env()?;

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("failed to start the async runtime")?;
    runtime.block_on(run(cli, settings))
}

async fn run(cli: Cli, settings: Settings) -> Result<()> {
    let target_date = cli.resolved_target_date(Utc::now().date_naive());
    let base_url = Url::parse(&cli.base_url)
        .with_context(|| format!("invalid --base-url '{}'", cli.base_url))?;
    let fetcher = ReqwestFetcher::new(FetchSettings {
        proxy: settings.proxy.clone(),
        ..FetchSettings::default()
    })
    .context("failed to build the HTTP client")?;
    if settings.proxy.is_some() {
        hoops_info!("Routing requests through the scraping proxy");
    }

    let harvester = Harvester::new(fetcher, base_url)
        .with_start_path(cli.start_path.clone())
        .with_max_units(Some(cli.max_units));
    let store = open_store(&cli, &settings).await?;

    let (units, unit_report) = harvester
        .harvest_units()
        .await
        .context("the season index could not be harvested")?;
    println!(
        "Scraped {} season rows ({} dropped for missing labels, {} without a schedule URL)",
        unit_report.rows, unit_report.dropped_missing_labels, unit_report.without_listing_url
    );

    let (mut listings, listing_report) = harvester.harvest_listings(&units).await;
    if listing_report.units_skipped > 0 || listing_report.rows_dropped > 0 {
        println!(
            "Skipped {} of {} schedules; dropped {} rows without a parseable date",
            listing_report.units_skipped, listing_report.units_attempted, listing_report.rows_dropped
        );
    }
    if let Some(date) = target_date {
        let before = listings.len();
        listings = filter_listings_by_date(&listings, date);
        println!(
            "Filtered schedules to {} rows for {} (from {})",
            listings.len(),
            date.format("%Y-%m-%d"),
            before
        );
    }
    if listings.is_empty() {
        println!("No schedule rows matched the requested criteria.");
    } else {
        println!(
            "Scraped {} schedule rows across {} leagues",
            listings.len(),
            distinct(&listings, names::LEAGUE)
        );
    }

    let mut cache = DetailCache::new();
    // Boxscore rows go straight to the store; only the counts come back.
    let (_, detail_report) = harvester
        .harvest_details(&listings, &mut cache, Some(&*store))
        .await;
    if detail_report.rows == 0 {
        println!("No boxscore data was available.");
    } else {
        println!(
            "Scraped {} boxscore rows from {} pages ({} skipped, {} via fallback lookup)",
            detail_report.rows,
            detail_report.pages_fetched,
            detail_report.pages_skipped,
            detail_report.fallback_assignments
        );
    }

    if detail_report.rows_flushed > 0 {
        println!(
            "Stored boxscore rows incrementally in {}",
            store.target(EntityKind::Detail)
        );
    }
    if detail_report.flush_failures > 0 {
        println!(
            "Warning: {} boxscore flushes failed; see the log for details",
            detail_report.flush_failures
        );
    }

    if cli.mode == Mode::Full && !units.is_empty() {
        let saved = store
            .save_units(&units, WriteMode::Replace)
            .await
            .context("failed to store seasons")?;
        println!("Stored {} season rows in {}", saved, store.target(EntityKind::Unit));
    }
    if !listings.is_empty() {
        let mode = match cli.mode {
            Mode::Full => WriteMode::Replace,
            Mode::Daily => WriteMode::Append,
        };
        let saved = store
            .save_listings(&listings, mode)
            .await
            .context("failed to store schedules")?;
        println!(
            "Stored {} schedule rows in {} using {}",
            saved,
            store.target(EntityKind::Listing),
            mode.as_str()
        );
    }
    Ok(())
}

/// Flat files when `--output-dir` is given, otherwise the database (with
/// its embedded fallback).
async fn open_store(cli: &Cli, settings: &Settings) -> Result<Box<dyn StorageBackend>> {
    if let Some(dir) = &cli.output_dir {
        hoops_info!("Writing JSON-lines output to {}", dir.display());
        return Ok(Box::new(FileStore::new(dir.clone())));
    }
    let store = DatabaseStore::connect(settings.store.clone())
        .await
        .context("no store reachable; set DATABASE_URL or pass --output-dir")?;
    if store.is_fallback() {
        println!("Primary database unavailable; using {}", store.location());
    }
    Ok(Box::new(store))
}

fn distinct(frame: &Frame, column: &str) -> usize {
    frame
        .column(column)
        .unwrap_or_default()
        .into_iter()
        .filter_map(|value| value.as_text())
        .collect::<HashSet<_>>()
        .len()
}
