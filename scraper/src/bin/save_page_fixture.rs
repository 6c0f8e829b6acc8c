use anyhow::{Context, Result};
use std::env;
use std::fs;
use std::path::Path;
use visa_stats_scraper::links::document_links;
use visa_stats_scraper::{
    parse_wait_time_table, resolve_latest_report, Config, Fetch, HttpFetcher, IssuanceKind,
};

fn main() -> Result<()> {
    env_logger::init();

    // Get URL from command line arguments
    let args: Vec<String> = env::args().collect();

    if args.len() < 3 {
        eprintln!("Please provide a URL and a fixture name");
        eprintln!("Usage: cargo run --bin save_page_fixture <URL> <name> [nationality|post|wait-times]");
        std::process::exit(1);
    }

    let url = &args[1];
    let name = &args[2];
    let page_kind = args.get(3).map(String::as_str).unwrap_or("nationality");

    let config = Config::from_env()?;
    let fetcher = HttpFetcher::new(config.http_timeout)?;

    println!("Fetching HTML from {}...", url);
    let html = fetcher.fetch_text(url)?;

    // Create failures directory if it doesn't exist
    let failures_dir = Path::new("src/tests/fixtures/failures");
    fs::create_dir_all(failures_dir).context("Failed to create failures directory")?;

    // Save the HTML for testing
    let file_path = failures_dir.join(format!("{}.html", name));
    fs::write(&file_path, &html).context("Failed to write HTML file")?;

    println!(
        "Saved HTML to {} for regression testing",
        file_path.display()
    );

    println!("\nHTML analysis results:");
    match page_kind {
        "wait-times" => {
            let today = chrono::Local::now().date_naive();
            match parse_wait_time_table(&html, today) {
                Ok(records) => println!("  - Wait-time entries: {}", records.len()),
                Err(e) => println!("  - Parse failed: {}", e),
            }
        }
        "nationality" | "post" => {
            let kind = if page_kind == "post" {
                IssuanceKind::Post
            } else {
                IssuanceKind::Nationality
            };
            let filter = kind.category().filter();

            let links = document_links(&html, filter);
            println!("  - Links matching '{}' with a date: {}", filter, links.len());
            for link in links.iter().take(5) {
                println!("      {} -> {}", link.report_date, link.href);
            }

            match resolve_latest_report(&html, filter, &config.site_base_url) {
                Some(selection) => match selection.spreadsheet_url {
                    Some(spreadsheet) => {
                        println!("  - Latest report {} at {}", selection.report_date, spreadsheet)
                    }
                    None => println!(
                        "  - Latest report {} has no adjacent spreadsheet link",
                        selection.report_date
                    ),
                },
                None => println!("  - No qualifying report link"),
            }
        }
        other => {
            eprintln!("Unknown page kind '{}'", other);
            std::process::exit(1);
        }
    }

    println!("\nThis page has been saved and will be included in regression tests.");

    Ok(())
}
