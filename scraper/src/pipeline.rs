use chrono::NaiveDate;
use reqwest::Url;

use crate::config::Config;
use crate::error::ScrapeError;
use crate::fetch::Fetch;
use crate::issuances::{normalize_issuances, IssuanceKind, IssuanceRecord};
use crate::links::resolve_latest_report;
use crate::spreadsheet::read_first_sheet;
use crate::store::{load_if_newer, LoadOutcome, StoreError, WarehouseStore};
use crate::wait_times::{
    is_weekday, parse_wait_time_table, process_wait_times, WaitTimeObservation, WaitTimeRecord,
    OBSERVATION_COLUMNS, RAW_COLUMNS,
};

/// A normalized monthly issuance report.
#[derive(Debug, Clone)]
pub struct IssuanceReport {
    pub kind: IssuanceKind,
    pub report_date: NaiveDate,
    pub spreadsheet_url: Url,
    pub records: Vec<IssuanceRecord>,
}

/// How a run ended when it did not hit a fatal error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunOutcome {
    /// Rows were scraped; one load outcome per destination table (empty on dry runs).
    Completed(Vec<(String, LoadOutcome)>),
    /// Nothing usable was scraped.
    NoData(String),
    /// Wait times are not published on weekends.
    Skipped,
    /// The destination store failed.
    Aborted(String),
}

/// Resolve the latest report of `kind`, download its spreadsheet and
/// normalize it.
pub fn scrape_issuances(
    fetcher: &dyn Fetch,
    config: &Config,
    kind: IssuanceKind,
) -> Result<IssuanceReport, ScrapeError> {
    let filter = kind.category().filter();
    let html = fetcher.fetch_text(&config.issuances_page_url)?;

    let selection = resolve_latest_report(&html, filter, &config.site_base_url).ok_or_else(|| {
        ScrapeError::NoQualifyingLink {
            filter: filter.to_string(),
        }
    })?;
    log::info!("Latest date found: {}", selection.report_date);

    let spreadsheet_url = selection
        .spreadsheet_url
        .ok_or(ScrapeError::NoSpreadsheetLink {
            report_date: selection.report_date,
        })?;
    log::info!("Latest spreadsheet link: {}", spreadsheet_url);

    let bytes = fetcher.fetch_bytes(spreadsheet_url.as_str())?;
    let table = read_first_sheet(&bytes)?;
    let records = normalize_issuances(table, kind, selection.report_date)?;

    Ok(IssuanceReport {
        kind,
        report_date: selection.report_date,
        spreadsheet_url,
        records,
    })
}

/// Fetch the wait-time page and flatten its table, stamped with `today`.
pub fn scrape_wait_times(
    fetcher: &dyn Fetch,
    config: &Config,
    today: NaiveDate,
) -> Result<Vec<WaitTimeRecord>, ScrapeError> {
    let html = fetcher.fetch_text(&config.wait_times_page_url)?;
    parse_wait_time_table(&html, today)
}

fn error_chain(error: &dyn std::error::Error) -> String {
    let mut message = error.to_string();
    let mut source = error.source();
    while let Some(cause) = source {
        message.push_str(&format!("\n  caused by: {}", cause));
        source = cause.source();
    }
    message
}

/// Non-fatal scrape errors end the run with no data; fatal ones propagate.
fn no_data(error: ScrapeError) -> Result<RunOutcome, ScrapeError> {
    if error.is_fatal() {
        log::error!("{}", error_chain(&error));
        return Err(error);
    }
    match &error {
        ScrapeError::Network { .. } => log::error!("Error fetching the page: {}", error_chain(&error)),
        _ => log::warn!("{}", error),
    }
    log::info!("No data retrieved.");
    Ok(RunOutcome::NoData(error.to_string()))
}

fn aborted(error: StoreError) -> RunOutcome {
    log::error!("Error inserting data into the warehouse: {}", error_chain(&error));
    RunOutcome::Aborted(error.to_string())
}

/// Scrape one issuance report and append it to its table when it is newer
/// than what the table holds. `store: None` scrapes without loading.
pub fn run_issuances(
    fetcher: &dyn Fetch,
    config: &Config,
    kind: IssuanceKind,
    store: Option<&mut dyn WarehouseStore>,
) -> Result<(RunOutcome, Option<IssuanceReport>), ScrapeError> {
    let report = match scrape_issuances(fetcher, config, kind) {
        Ok(report) => report,
        Err(e) => return no_data(e).map(|outcome| (outcome, None)),
    };
    log::info!(
        "Normalized {} {} rows for {}",
        report.records.len(),
        kind.key_column(),
        report.report_date
    );

    let Some(store) = store else {
        return Ok((RunOutcome::Completed(Vec::new()), Some(report)));
    };

    let table = config.issuances_table(kind);
    let outcome = match load_if_newer(store, table, &kind.output_columns(), &report.records) {
        Ok(loaded) => RunOutcome::Completed(vec![(table.to_string(), loaded)]),
        Err(e) => aborted(e),
    };
    Ok((outcome, Some(report)))
}

/// Scraped wait times in both published and parsed form.
#[derive(Debug, Clone, Default)]
pub struct WaitTimeBatch {
    pub raw: Vec<WaitTimeRecord>,
    pub observations: Vec<WaitTimeObservation>,
}

/// Scrape today's wait times and load the raw and parsed rows into their
/// tables, each guarded by its own date check.
pub fn run_wait_times(
    fetcher: &dyn Fetch,
    config: &Config,
    today: NaiveDate,
    any_day: bool,
    store: Option<&mut dyn WarehouseStore>,
) -> Result<(RunOutcome, WaitTimeBatch), ScrapeError> {
    if !any_day && !is_weekday(today) {
        log::info!("Today is not a weekday. Exiting.");
        return Ok((RunOutcome::Skipped, WaitTimeBatch::default()));
    }

    let raw = match scrape_wait_times(fetcher, config, today) {
        Ok(raw) => raw,
        Err(e) => return no_data(e).map(|outcome| (outcome, WaitTimeBatch::default())),
    };
    if raw.is_empty() {
        log::warn!("Wait-time table has no entries");
        log::info!("No data retrieved.");
        return Ok((
            RunOutcome::NoData("wait-time table has no entries".to_string()),
            WaitTimeBatch::default(),
        ));
    }

    let batch = WaitTimeBatch {
        observations: process_wait_times(&raw),
        raw,
    };
    log::info!("Parsed {} wait-time entries", batch.raw.len());

    let Some(store) = store else {
        return Ok((RunOutcome::Completed(Vec::new()), batch));
    };

    let outcome = match load_wait_times(store, config, &batch) {
        Ok(loads) => RunOutcome::Completed(loads),
        Err(e) => aborted(e),
    };
    Ok((outcome, batch))
}

fn load_wait_times(
    store: &mut dyn WarehouseStore,
    config: &Config,
    batch: &WaitTimeBatch,
) -> Result<Vec<(String, LoadOutcome)>, StoreError> {
    let tables = &config.tables;
    let raw = load_if_newer(store, &tables.wait_time_raw, &RAW_COLUMNS, &batch.raw)?;
    let parsed = load_if_newer(
        store,
        &tables.wait_time,
        &OBSERVATION_COLUMNS,
        &batch.observations,
    )?;
    Ok(vec![
        (tables.wait_time_raw.clone(), raw),
        (tables.wait_time.clone(), parsed),
    ])
}
