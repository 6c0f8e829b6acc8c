use std::sync::LazyLock;

use chrono::NaiveDate;
use regex::Regex;
use reqwest::Url;
use scraper::{ElementRef, Html, Selector};

/// Report links point at the PDF rendition; the spreadsheet sits next to it.
const REPORT_HREF_MARKER: &str = "pdf";
const SPREADSHEET_EXTENSION: &str = ".xlsx";

static MONTH_YEAR: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b(\w+)\s+(\d{4})\b").expect("month/year pattern is valid"));

/// Which monthly issuance report to look for on the documents page.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReportCategory {
    ByNationality,
    ByPost,
}

impl ReportCategory {
    pub fn filter(self) -> &'static str {
        match self {
            ReportCategory::ByNationality => "by nationality",
            ReportCategory::ByPost => "by post",
        }
    }
}

/// A dated report anchor found on the page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocumentLink {
    pub label: String,
    pub href: String,
    pub report_date: NaiveDate,
}

/// The most recent report and the spreadsheet published alongside it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportSelection {
    pub report_date: NaiveDate,
    pub spreadsheet_url: Option<Url>,
}

/// Parse "March 2024" style text into the first day of that month. Only full
/// month names are accepted; "Mar 2024" is not a report date.
pub fn parse_report_month(text: &str) -> Option<NaiveDate> {
    let captures = MONTH_YEAR.captures(text)?;
    let month = &captures[1];
    let candidate = format!("1 {} {}", month, &captures[2]);
    let date = NaiveDate::parse_from_str(&candidate, "%d %B %Y").ok()?;
    // %B also accepts abbreviations
    date.format("%B")
        .to_string()
        .eq_ignore_ascii_case(month)
        .then_some(date)
}

fn anchor_text(anchor: &ElementRef) -> String {
    anchor.text().collect::<String>()
}

fn qualifying_link(anchor: &ElementRef, filter: &str) -> Option<DocumentLink> {
    let href = anchor.value().attr("href")?;
    if !href.contains(REPORT_HREF_MARKER) {
        return None;
    }

    let label = anchor_text(anchor);
    if !label.to_lowercase().contains(&filter.to_lowercase()) {
        return None;
    }

    let report_date = parse_report_month(&label)?;
    Some(DocumentLink {
        label: label.trim().to_string(),
        href: href.to_string(),
        report_date,
    })
}

fn is_spreadsheet_href(href: &str) -> bool {
    let path = href.split(['?', '#']).next().unwrap_or(href);
    path.to_lowercase().ends_with(SPREADSHEET_EXTENSION)
}

/// The next `<a>` sibling, accepted only when it points at a spreadsheet.
fn adjacent_spreadsheet(anchor: &ElementRef, base: &Url) -> Option<Url> {
    let sibling = anchor
        .next_siblings()
        .filter_map(ElementRef::wrap)
        .find(|element| element.value().name() == "a")?;
    let href = sibling.value().attr("href")?;
    if !is_spreadsheet_href(href) {
        return None;
    }
    base.join(href).ok()
}

/// Every anchor on the page that matches `filter` and carries a month and
/// year, in document order.
pub fn document_links(html: &str, filter: &str) -> Vec<DocumentLink> {
    let document = Html::parse_document(html);
    let anchor_selector = Selector::parse("a").unwrap();

    document
        .select(&anchor_selector)
        .filter_map(|anchor| qualifying_link(&anchor, filter))
        .collect()
}

/// Find the most recent report matching `filter` and resolve its companion
/// spreadsheet link against `base`.
///
/// Only a strictly later date replaces the current pick, so among equally
/// dated anchors the first one in document order wins. When the chosen anchor
/// has no spreadsheet next to it the selection is returned with
/// `spreadsheet_url: None`.
pub fn resolve_latest_report(html: &str, filter: &str, base: &Url) -> Option<ReportSelection> {
    let document = Html::parse_document(html);
    let anchor_selector = Selector::parse("a").unwrap();

    let mut latest: Option<ReportSelection> = None;

    for anchor in document.select(&anchor_selector) {
        let Some(link) = qualifying_link(&anchor, filter) else {
            continue;
        };

        let is_newer = latest
            .as_ref()
            .map_or(true, |current| link.report_date > current.report_date);
        if !is_newer {
            continue;
        }

        log::debug!("candidate report {} ({})", link.report_date, link.label);
        latest = Some(ReportSelection {
            report_date: link.report_date,
            spreadsheet_url: adjacent_spreadsheet(&anchor, base),
        });
    }

    latest
}
