use chrono::NaiveDate;
use thiserror::Error;

use crate::store::StoreError;

/// Everything that can go wrong between fetching a page and loading its rows.
#[derive(Debug, Error)]
pub enum ScrapeError {
    #[error("failed to fetch {url}: {source}")]
    Network {
        url: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("no link matching '{filter}' with a month and year was found")]
    NoQualifyingLink { filter: String },
    #[error("latest report is {report_date} but no spreadsheet link follows it")]
    NoSpreadsheetLink { report_date: NaiveDate },
    #[error("failed to read spreadsheet: {0}")]
    Spreadsheet(String),
    #[error("no table found in the HTML content")]
    NoTable,
    #[error("required columns are missing: {}", .0.join(", "))]
    MissingColumns(Vec<String>),
    #[error("unexpected decimal value: {value}")]
    InvalidNumericFormat { value: String },
    #[error(transparent)]
    Store(#[from] StoreError),
}

impl ScrapeError {
    /// Fatal errors must fail the run; all others mean "no data this time".
    pub fn is_fatal(&self) -> bool {
        matches!(self, ScrapeError::InvalidNumericFormat { .. })
    }
}
