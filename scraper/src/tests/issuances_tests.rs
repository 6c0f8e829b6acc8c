use super::fixtures;
use crate::error::ScrapeError;
use crate::issuances::{clean_issuances, normalize_issuances, IssuanceKind};
use crate::spreadsheet::read_first_sheet;
use crate::table::{Cell, Table};
use chrono::NaiveDate;

fn march_2024() -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 3, 1).unwrap()
}

fn text_row(values: &[&str]) -> Vec<Cell> {
    values.iter().map(|&v| Cell::from(v)).collect()
}

#[test]
fn test_clean_issuances() {
    assert_eq!(clean_issuances("1,234").unwrap(), "1234");
    assert_eq!(clean_issuances("1234.0").unwrap(), "1234");
    assert_eq!(clean_issuances("1,234.0").unwrap(), "1234");
    assert_eq!(clean_issuances("42").unwrap(), "42");
}

#[test]
fn test_clean_issuances_rejects_fractions() {
    let result = clean_issuances("1234.5");
    match result {
        Err(ScrapeError::InvalidNumericFormat { value }) => assert_eq!(value, "1234.5"),
        other => panic!("expected InvalidNumericFormat, got {:?}", other),
    }
    assert!(clean_issuances("12.50").is_err());
    assert!(clean_issuances("1.0.0").is_err());
    assert!(clean_issuances("1.5.0").is_err());
    assert!(clean_issuances("1,2.0.0").is_err());
}

#[test]
fn test_invalid_numeric_format_is_fatal() {
    let err = clean_issuances("3.14").unwrap_err();
    assert!(err.is_fatal());
    assert!(err.to_string().contains("3.14"));
    assert!(!ScrapeError::MissingColumns(vec!["ISSUANCES".to_string()]).is_fatal());
}

#[test]
fn test_normalize_nationality_table() {
    let table = Table::new(
        vec![
            "Nationality".to_string(),
            "Visa Class".to_string(),
            "Issuances".to_string(),
        ],
        vec![
            text_row(&["  Albania ", " F1 ", "1,234"]),
            vec![Cell::from("Algeria"), Cell::from("H1B"), Cell::Float(12.0)],
            text_row(&["Grand Total", "", "1,246"]),
            text_row(&["* footnote", "", ""]),
        ],
    );

    let records = normalize_issuances(table, IssuanceKind::Nationality, march_2024()).unwrap();
    assert_eq!(records.len(), 2);
    assert_eq!(records[0].key, "Albania");
    assert_eq!(records[0].visa_class, "F1");
    assert_eq!(records[0].issuances, 1234);
    assert_eq!(records[1].key, "Algeria");
    assert_eq!(records[1].issuances, 12);
    assert!(records.iter().all(|r| r.date == march_2024()));
}

#[test]
fn test_report_date_normalized_to_first_of_month() {
    let table = Table::new(
        vec!["POST".to_string(), "VISA_CLASS".to_string(), "ISSUANCES".to_string()],
        vec![text_row(&["Accra", "J1", "87"])],
    );

    let mid_month = NaiveDate::from_ymd_opt(2024, 3, 17).unwrap();
    let records = normalize_issuances(table, IssuanceKind::Post, mid_month).unwrap();
    assert_eq!(records[0].date, march_2024());
}

#[test]
fn test_missing_required_columns() {
    let table = Table::new(
        vec!["Post".to_string(), "Class".to_string(), "Issuances".to_string()],
        vec![text_row(&["Accra", "J1", "87"])],
    );

    match normalize_issuances(table, IssuanceKind::Post, march_2024()) {
        Err(ScrapeError::MissingColumns(missing)) => assert_eq!(missing, vec!["VISA_CLASS"]),
        other => panic!("expected MissingColumns, got {:?}", other),
    }
}

#[test]
fn test_fractional_issuances_fail() {
    let table = Table::new(
        vec!["NATIONALITY".to_string(), "VISA_CLASS".to_string(), "ISSUANCES".to_string()],
        vec![
            text_row(&["Albania", "F1", "10"]),
            vec![Cell::from("Algeria"), Cell::from("H1B"), Cell::Float(2.5)],
        ],
    );

    let err = normalize_issuances(table, IssuanceKind::Nationality, march_2024()).unwrap_err();
    assert!(matches!(err, ScrapeError::InvalidNumericFormat { ref value } if value == "2.5"));
}

#[test]
fn test_non_numeric_issuances_fail() {
    let table = Table::new(
        vec!["NATIONALITY".to_string(), "VISA_CLASS".to_string(), "ISSUANCES".to_string()],
        vec![text_row(&["Albania", "F1", "n/a"])],
    );

    let err = normalize_issuances(table, IssuanceKind::Nationality, march_2024()).unwrap_err();
    assert!(err.is_fatal());
}

#[test]
fn test_nationality_spreadsheet_fixture() {
    let bytes = fixtures::load_xlsx_fixture("issuances_by_nationality");
    let table = read_first_sheet(&bytes).unwrap();
    assert_eq!(table.columns, vec!["Nationality", "Visa Class", "Issuances"]);

    let records = normalize_issuances(table, IssuanceKind::Nationality, march_2024()).unwrap();
    let keys: Vec<&str> = records.iter().map(|r| r.key.as_str()).collect();
    assert_eq!(keys, vec!["Afghanistan", "Albania", "Algeria", "Andorra"]);
    let counts: Vec<i64> = records.iter().map(|r| r.issuances).collect();
    assert_eq!(counts, vec![5, 1234, 1234, 1]);
    assert_eq!(records[1].visa_class, "F1");
}

#[test]
fn test_post_spreadsheet_fixture() {
    let bytes = fixtures::load_xlsx_fixture("issuances_by_post");
    let table = read_first_sheet(&bytes).unwrap();

    let records = normalize_issuances(table, IssuanceKind::Post, march_2024()).unwrap();
    assert_eq!(records.len(), 3);
    assert_eq!(records[1].key, "Abu Dhabi");
    assert_eq!(records[1].issuances, 2045);
}

#[test]
fn test_unreadable_spreadsheet() {
    let result = read_first_sheet(b"<html>not a workbook</html>");
    assert!(matches!(result, Err(ScrapeError::Spreadsheet(_))));
}

#[test]
fn test_records_serialize_with_column_names() {
    let table = Table::new(
        vec!["POST".to_string(), "VISA_CLASS".to_string(), "ISSUANCES".to_string()],
        vec![text_row(&["Accra", "J1", "87"])],
    );
    let records = normalize_issuances(table, IssuanceKind::Post, march_2024()).unwrap();

    let json = serde_json::to_value(&records[0]).unwrap();
    assert_eq!(
        json,
        serde_json::json!({
            "POST": "Accra",
            "VISA_CLASS": "J1",
            "ISSUANCES": 87,
            "DATE": "2024-03-01",
        })
    );
}
