use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use serde::Serialize;
use visa_stats_scraper::{
    run_issuances, run_wait_times, Config, HttpFetcher, IssuanceKind, LoadOutcome, PostgresStore,
    RunOutcome, WarehouseStore,
};

/// Scrape published visa statistics and append new batches to the warehouse
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Scrape and normalize only; never connect to the database
    #[arg(long, global = true)]
    dry_run: bool,

    /// Save the normalized records to this JSON file
    #[arg(long, global = true)]
    output: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Monthly nonimmigrant visa issuances by nationality
    Nationality,
    /// Monthly nonimmigrant visa issuances by post
    Post,
    /// Today's interview wait times per post and visa type
    WaitTimes {
        /// Run even on a Saturday or Sunday
        #[arg(long)]
        any_day: bool,
    },
}

fn save_json<T: Serialize>(path: &Path, records: &T) -> Result<()> {
    let json = serde_json::to_string_pretty(records).context("Failed to serialize records")?;
    fs::write(path, json).with_context(|| format!("Failed to write {}", path.display()))?;
    println!("Records saved to {}", path.display());
    Ok(())
}

fn print_outcome(outcome: &RunOutcome) {
    match outcome {
        RunOutcome::Completed(loads) if loads.is_empty() => {
            println!("Dry run, nothing loaded.");
        }
        RunOutcome::Completed(loads) => {
            for (table, load) in loads {
                match load {
                    LoadOutcome::Inserted(n) => println!("Inserted {} new rows into {}.", n, table),
                    LoadOutcome::UpToDate => println!("No new data to insert into {}.", table),
                    LoadOutcome::Empty => println!("Nothing to insert into {}.", table),
                }
            }
        }
        RunOutcome::NoData(reason) => println!("No data retrieved: {}", reason),
        RunOutcome::Skipped => println!("Today is not a weekday, skipped."),
        RunOutcome::Aborted(reason) => println!("Load aborted: {}", reason),
    }
}

fn issuances(
    fetcher: &HttpFetcher,
    config: &Config,
    kind: IssuanceKind,
    store: Option<&mut dyn WarehouseStore>,
    output: Option<&Path>,
) -> Result<()> {
    let (outcome, report) = run_issuances(fetcher, config, kind, store)?;
    if let Some(report) = &report {
        println!(
            "Report {} from {}: {} rows",
            report.report_date,
            report.spreadsheet_url,
            report.records.len()
        );
        if let Some(path) = output {
            save_json(path, &report.records)?;
        }
    }
    print_outcome(&outcome);
    Ok(())
}

fn wait_times(
    fetcher: &HttpFetcher,
    config: &Config,
    any_day: bool,
    store: Option<&mut dyn WarehouseStore>,
    output: Option<&Path>,
) -> Result<()> {
    let today = chrono::Local::now().date_naive();
    let (outcome, batch) = run_wait_times(fetcher, config, today, any_day, store)?;
    if !batch.raw.is_empty() {
        println!("Wait times for {}: {} entries", today, batch.raw.len());
        if let Some(path) = output {
            save_json(path, &batch.observations)?;
        }
    }
    print_outcome(&outcome);
    Ok(())
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();
    let config = Config::from_env()?;
    let fetcher = HttpFetcher::new(config.http_timeout)?;

    let mut postgres = if cli.dry_run {
        None
    } else {
        Some(PostgresStore::new(config.database_url()?))
    };
    let store = postgres.as_mut().map(|s| s as &mut dyn WarehouseStore);

    match cli.command {
        Command::Nationality => {
            issuances(&fetcher, &config, IssuanceKind::Nationality, store, cli.output.as_deref())
        }
        Command::Post => issuances(&fetcher, &config, IssuanceKind::Post, store, cli.output.as_deref()),
        Command::WaitTimes { any_day } => {
            wait_times(&fetcher, &config, any_day, store, cli.output.as_deref())
        }
    }
}
