use std::io::Cursor;

use calamine::{Data, Reader, Xlsx};

use crate::error::ScrapeError;
use crate::table::{Cell, Table};

/// Sheet rows above the header. The published workbooks carry a title row.
const HEADER_OFFSET: u32 = 1;

fn to_cell(data: &Data) -> Cell {
    match data {
        Data::Empty => Cell::Empty,
        Data::String(s) => Cell::Text(s.clone()),
        Data::Int(i) => Cell::Int(*i),
        Data::Float(f) => Cell::Float(*f),
        Data::Bool(b) => Cell::Text(b.to_string()),
        Data::DateTimeIso(s) | Data::DurationIso(s) => Cell::Text(s.clone()),
        other => Cell::Text(other.to_string()),
    }
}

/// Read the first worksheet of an `.xlsx` document. Row 1 of the sheet is
/// skipped, row 2 is the header and everything below it is data.
pub fn read_first_sheet(bytes: &[u8]) -> Result<Table, ScrapeError> {
    let mut workbook = Xlsx::new(Cursor::new(bytes))
        .map_err(|e| ScrapeError::Spreadsheet(format!("not a readable workbook: {}", e)))?;

    let range = workbook
        .worksheet_range_at(0)
        .ok_or_else(|| ScrapeError::Spreadsheet("workbook has no worksheets".to_string()))?
        .map_err(|e| ScrapeError::Spreadsheet(e.to_string()))?;

    // The used range may begin below row 1 when the title row is blank.
    let first_row = range.start().map_or(0, |(row, _)| row);
    let skip = HEADER_OFFSET.saturating_sub(first_row) as usize;

    let mut rows = range.rows().skip(skip);
    let header = rows
        .next()
        .ok_or_else(|| ScrapeError::Spreadsheet("worksheet has no header row".to_string()))?;

    let columns = header
        .iter()
        .map(|data| to_cell(data).as_text())
        .collect::<Vec<_>>();

    let body = rows
        .map(|row| row.iter().map(to_cell).collect::<Vec<_>>())
        .filter(|cells| !cells.iter().all(Cell::is_empty))
        .collect();

    Ok(Table::new(columns, body))
}
