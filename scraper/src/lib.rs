pub mod config;
pub mod error;
pub mod fetch;
pub mod issuances;
pub mod links;
pub mod pipeline;
pub mod spreadsheet;
pub mod store;
pub mod table;
pub mod wait_times;

// Re-export tests for integration testing
#[cfg(test)]
pub mod tests;

// Re-export key types and functions for easier access
pub use crate::config::Config;
pub use crate::error::ScrapeError;
pub use crate::fetch::{Fetch, HttpFetcher};
pub use crate::issuances::{clean_issuances, normalize_issuances, IssuanceKind, IssuanceRecord};
pub use crate::links::{resolve_latest_report, DocumentLink, ReportCategory, ReportSelection};
pub use crate::pipeline::{
    run_issuances, run_wait_times, scrape_issuances, scrape_wait_times, IssuanceReport,
    RunOutcome, WaitTimeBatch,
};
pub use crate::store::{
    load_if_newer, LoadOutcome, MemoryStore, PostgresStore, WarehouseStore,
};
pub use crate::wait_times::{
    parse_wait_time, parse_wait_time_table, WaitTimeObservation, WaitTimeRecord,
};
