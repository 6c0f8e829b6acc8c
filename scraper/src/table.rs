use std::collections::BTreeSet;
use std::fmt;

/// A single spreadsheet or HTML table value.
#[derive(Debug, Clone, PartialEq)]
pub enum Cell {
    Empty,
    Text(String),
    Int(i64),
    Float(f64),
}

impl Cell {
    /// Text form of the cell. Floats keep their decimal point (`1234.0`) so
    /// numeric cleaning can tell whole numbers from fractional ones.
    pub fn as_text(&self) -> String {
        match self {
            Cell::Empty => String::new(),
            Cell::Text(s) => s.clone(),
            Cell::Int(i) => i.to_string(),
            Cell::Float(f) => format!("{:?}", f),
        }
    }

    pub fn is_empty(&self) -> bool {
        match self {
            Cell::Empty => true,
            Cell::Text(s) => s.trim().is_empty(),
            _ => false,
        }
    }
}

impl fmt::Display for Cell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.as_text())
    }
}

impl From<&str> for Cell {
    fn from(s: &str) -> Self {
        Cell::Text(s.to_string())
    }
}

/// Uppercase, trim, drop apostrophes and turn spaces into underscores.
/// Applying it twice gives the same result as applying it once.
pub fn normalize_column_name(name: &str) -> String {
    name.to_uppercase()
        .trim()
        .replace('\'', "")
        .replace(' ', "_")
}

static EMPTY: Cell = Cell::Empty;

/// Header plus rows, kept in source order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Table {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<Cell>>,
}

impl Table {
    pub fn new(columns: Vec<String>, rows: Vec<Vec<Cell>>) -> Self {
        Table { columns, rows }
    }

    pub fn normalize_columns(&mut self) {
        for column in &mut self.columns {
            *column = normalize_column_name(column);
        }
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|column| column == name)
    }

    /// The cell at `row`/`col`, treating short rows as padded with empties.
    pub fn cell(&self, row: usize, col: usize) -> &Cell {
        self.rows
            .get(row)
            .and_then(|cells| cells.get(col))
            .unwrap_or(&EMPTY)
    }

    /// Keep only the rows before the first one whose `column` value equals
    /// `marker` (trimmed, case-insensitive). Returns whether a marker was found.
    pub fn truncate_at_marker(&mut self, column: &str, marker: &str) -> bool {
        let Some(col) = self.column_index(column) else {
            return false;
        };
        let marker = marker.to_lowercase();
        let position = self
            .rows
            .iter()
            .position(|row| match row.get(col) {
                Some(cell) => cell.as_text().trim().to_lowercase() == marker,
                None => false,
            });

        match position {
            Some(idx) => {
                self.rows.truncate(idx);
                true
            }
            None => false,
        }
    }

    /// Names from `required` that are not columns of this table, sorted.
    pub fn missing_columns(&self, required: &[&str]) -> Vec<String> {
        let present: BTreeSet<&str> = self.columns.iter().map(String::as_str).collect();
        let mut missing: Vec<String> = required
            .iter()
            .filter(|name| !present.contains(**name))
            .map(|name| name.to_string())
            .collect();
        missing.sort();
        missing
    }
}
