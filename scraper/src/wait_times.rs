use std::sync::LazyLock;

use chrono::{Datelike, NaiveDate, Weekday};
use regex::Regex;
use scraper::{ElementRef, Html, Selector};
use serde::Serialize;

use crate::error::ScrapeError;
use crate::store::{Record, Value};

pub const RAW_COLUMNS: [&str; 4] = [
    "DATE",
    "POST",
    "NONIMMIGRANT_VISA_TYPE",
    "APPOINTMENT_WAIT_TIME_RAW",
];

pub const OBSERVATION_COLUMNS: [&str; 5] = [
    "DATE",
    "POST",
    "NONIMMIGRANT_VISA_TYPE",
    "APPOINTMENT_WAIT_TIME",
    "APPOINTMENT_STATUS",
];

const INTERVIEW_REQUIRED: &str = "Interview Required";

static DAYS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)^(\d+)\s*days?$").expect("day count pattern is valid"));

/// One non-empty cell of the wait-time table, as published.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub struct WaitTimeRecord {
    pub date: NaiveDate,
    pub post: String,
    #[serde(rename = "NONIMMIGRANT_VISA_TYPE")]
    pub visa_type: String,
    #[serde(rename = "APPOINTMENT_WAIT_TIME_RAW")]
    pub wait_time_raw: String,
}

/// A wait-time record with the day count parsed out.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub struct WaitTimeObservation {
    pub date: NaiveDate,
    pub post: String,
    #[serde(rename = "NONIMMIGRANT_VISA_TYPE")]
    pub visa_type: String,
    #[serde(rename = "APPOINTMENT_WAIT_TIME")]
    pub wait_days: Option<u32>,
    /// Raw text when no positive day count could be read, empty otherwise.
    #[serde(rename = "APPOINTMENT_STATUS")]
    pub status: String,
}

impl Record for WaitTimeRecord {
    fn date(&self) -> NaiveDate {
        self.date
    }

    fn values(&self) -> Vec<Value> {
        vec![
            Value::Date(self.date),
            Value::Text(self.post.clone()),
            Value::Text(self.visa_type.clone()),
            Value::Text(self.wait_time_raw.clone()),
        ]
    }
}

impl Record for WaitTimeObservation {
    fn date(&self) -> NaiveDate {
        self.date
    }

    fn values(&self) -> Vec<Value> {
        vec![
            Value::Date(self.date),
            Value::Text(self.post.clone()),
            Value::Text(self.visa_type.clone()),
            Value::OptInt(self.wait_days.map(i64::from)),
            Value::Text(self.status.clone()),
        ]
    }
}

/// The page is refreshed on business days only.
pub fn is_weekday(date: NaiveDate) -> bool {
    !matches!(date.weekday(), Weekday::Sat | Weekday::Sun)
}

fn cell_text(element: &ElementRef) -> String {
    element.text().collect::<String>().trim().to_string()
}

/// Flatten the first `<table>` of the page into one record per non-empty
/// wait-time cell. The first header names the post column; the remaining
/// headers are the visa types.
pub fn parse_wait_time_table(
    html: &str,
    current_date: NaiveDate,
) -> Result<Vec<WaitTimeRecord>, ScrapeError> {
    let document = Html::parse_document(html);
    let table_selector = Selector::parse("table").unwrap();
    let th_selector = Selector::parse("th").unwrap();
    let tr_selector = Selector::parse("tr").unwrap();
    let td_selector = Selector::parse("td").unwrap();

    let table = document
        .select(&table_selector)
        .next()
        .ok_or(ScrapeError::NoTable)?;

    let headers: Vec<String> = table.select(&th_selector).map(|th| cell_text(&th)).collect();
    let visa_types = headers.get(1..).unwrap_or_default();

    log::info!("Current date: {}", current_date);

    let mut records = Vec::new();
    for row in table.select(&tr_selector).skip(1) {
        let cells: Vec<ElementRef> = row.select(&td_selector).collect();
        let Some((post_cell, wait_cells)) = cells.split_first() else {
            continue;
        };
        let post = cell_text(post_cell);

        for (j, cell) in wait_cells.iter().enumerate() {
            let wait_time_raw = cell_text(cell);
            if wait_time_raw.is_empty() {
                continue;
            }
            let Some(visa_type) = visa_types.get(j) else {
                log::warn!("{}: cell {} has no matching header, skipping", post, j + 1);
                continue;
            };
            records.push(WaitTimeRecord {
                date: current_date,
                post: post.clone(),
                visa_type: visa_type.replace('\u{a0}', " "),
                wait_time_raw,
            });
        }
    }

    Ok(records)
}

/// "Same Day" is zero days, "<N> day(s)" is N, anything else is unknown.
pub fn parse_wait_time(raw: &str) -> Option<u32> {
    let text = raw.trim();
    if text.eq_ignore_ascii_case("same day") {
        return Some(0);
    }
    DAYS.captures(text)
        .and_then(|captures| captures[1].parse().ok())
}

/// Echo the raw text when it did not yield a positive day count.
pub fn wait_time_status(raw: &str, parsed: Option<u32>) -> String {
    match parsed {
        Some(days) if days > 0 => String::new(),
        _ => raw.trim().to_string(),
    }
}

/// Drop the "Interview Required" marker and collapse whitespace,
/// including non-breaking spaces.
pub fn clean_visa_type(label: &str) -> String {
    label
        .replace(INTERVIEW_REQUIRED, "")
        .replace('\u{a0}', " ")
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

impl From<&WaitTimeRecord> for WaitTimeObservation {
    fn from(record: &WaitTimeRecord) -> Self {
        let wait_days = parse_wait_time(&record.wait_time_raw);
        WaitTimeObservation {
            date: record.date,
            post: record.post.clone(),
            visa_type: clean_visa_type(&record.visa_type),
            wait_days,
            status: wait_time_status(&record.wait_time_raw, wait_days),
        }
    }
}

pub fn process_wait_times(records: &[WaitTimeRecord]) -> Vec<WaitTimeObservation> {
    records.iter().map(WaitTimeObservation::from).collect()
}
