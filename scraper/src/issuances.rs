use chrono::{Datelike, NaiveDate};
use serde::{Serialize, Serializer};
use serde::ser::SerializeMap;

use crate::error::ScrapeError;
use crate::links::ReportCategory;
use crate::store::{Record, Value};
use crate::table::Table;

pub const VISA_CLASS: &str = "VISA_CLASS";
pub const ISSUANCES: &str = "ISSUANCES";
pub const DATE: &str = "DATE";

const GRAND_TOTAL: &str = "grand total";

/// The two monthly issuance spreadsheets differ only in their key column.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IssuanceKind {
    Nationality,
    Post,
}

impl IssuanceKind {
    pub fn key_column(self) -> &'static str {
        match self {
            IssuanceKind::Nationality => "NATIONALITY",
            IssuanceKind::Post => "POST",
        }
    }

    /// The documents-page link category carrying this report.
    pub fn category(self) -> ReportCategory {
        match self {
            IssuanceKind::Nationality => ReportCategory::ByNationality,
            IssuanceKind::Post => ReportCategory::ByPost,
        }
    }

    pub fn required_columns(self) -> [&'static str; 3] {
        [self.key_column(), VISA_CLASS, ISSUANCES]
    }

    /// Column order used when loading into the destination table.
    pub fn output_columns(self) -> [&'static str; 4] {
        [self.key_column(), VISA_CLASS, ISSUANCES, DATE]
    }
}

/// One normalized row of an issuance report.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IssuanceRecord {
    pub kind: IssuanceKind,
    /// Nationality or post, depending on `kind`.
    pub key: String,
    pub visa_class: String,
    pub issuances: i64,
    pub date: NaiveDate,
}

impl Serialize for IssuanceRecord {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(4))?;
        map.serialize_entry(self.kind.key_column(), &self.key)?;
        map.serialize_entry(VISA_CLASS, &self.visa_class)?;
        map.serialize_entry(ISSUANCES, &self.issuances)?;
        map.serialize_entry(DATE, &self.date)?;
        map.end()
    }
}

impl Record for IssuanceRecord {
    fn date(&self) -> NaiveDate {
        self.date
    }

    fn values(&self) -> Vec<Value> {
        vec![
            Value::Text(self.key.clone()),
            Value::Text(self.visa_class.clone()),
            Value::Int(self.issuances),
            Value::Date(self.date),
        ]
    }
}

/// Strip thousands separators and a trailing `.0`. Any other decimal form
/// means the upstream format changed and is rejected.
pub fn clean_issuances(value: &str) -> Result<String, ScrapeError> {
    let cleaned = value.replace(',', "");
    if cleaned.contains('.') {
        return match cleaned.strip_suffix(".0") {
            Some(whole) if !whole.contains('.') => Ok(whole.to_string()),
            _ => Err(ScrapeError::InvalidNumericFormat {
                value: value.to_string(),
            }),
        };
    }
    Ok(cleaned)
}

fn parse_issuances(value: &str) -> Result<i64, ScrapeError> {
    let cleaned = clean_issuances(value.trim())?;
    cleaned
        .parse::<i64>()
        .map_err(|_| ScrapeError::InvalidNumericFormat {
            value: value.to_string(),
        })
}

fn looks_like_count(value: &str) -> bool {
    let digits = value.trim().replace(',', "").replace(".0", "");
    !digits.is_empty() && digits.chars().all(|c| c.is_ascii_digit())
}

/// Normalize a parsed issuance spreadsheet into records dated on the first
/// day of the report month.
///
/// Missing required columns produce [`ScrapeError::MissingColumns`], which
/// callers treat as "no data". A malformed issuance count produces
/// [`ScrapeError::InvalidNumericFormat`] after the offending rows are logged.
pub fn normalize_issuances(
    mut table: Table,
    kind: IssuanceKind,
    report_date: NaiveDate,
) -> Result<Vec<IssuanceRecord>, ScrapeError> {
    table.normalize_columns();

    let key_column = kind.key_column();
    if table.truncate_at_marker(key_column, GRAND_TOTAL) {
        log::debug!("dropped grand total and trailing rows");
    }

    let missing = table.missing_columns(&kind.required_columns());
    if !missing.is_empty() {
        return Err(ScrapeError::MissingColumns(missing));
    }

    // Presence was checked above.
    let key_idx = table.column_index(key_column).unwrap_or_default();
    let class_idx = table.column_index(VISA_CLASS).unwrap_or_default();
    let count_idx = table.column_index(ISSUANCES).unwrap_or_default();

    let date = report_date.with_day(1).unwrap_or(report_date);

    let counts: Result<Vec<i64>, ScrapeError> = (0..table.rows.len())
        .map(|row| parse_issuances(&table.cell(row, count_idx).as_text()))
        .collect();
    let counts = match counts {
        Ok(counts) => counts,
        Err(e) => {
            let problematic: Vec<String> = (0..table.rows.len())
                .filter(|row| !looks_like_count(&table.cell(*row, count_idx).as_text()))
                .map(|row| {
                    format!(
                        "{{{}: {:?}, {}: {:?}, {}: {:?}}}",
                        key_column,
                        table.cell(row, key_idx).as_text(),
                        VISA_CLASS,
                        table.cell(row, class_idx).as_text(),
                        ISSUANCES,
                        table.cell(row, count_idx).as_text()
                    )
                })
                .collect();
            log::error!("Error processing rows: [{}]", problematic.join(", "));
            return Err(e);
        }
    };

    let records = counts
        .into_iter()
        .enumerate()
        .map(|(row, issuances)| IssuanceRecord {
            kind,
            key: table.cell(row, key_idx).as_text().trim().to_string(),
            visa_class: table.cell(row, class_idx).as_text().trim().to_string(),
            issuances,
            date,
        })
        .collect();

    Ok(records)
}
