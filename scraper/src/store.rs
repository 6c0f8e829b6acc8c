use std::collections::HashMap;

use chrono::NaiveDate;
use postgres::types::ToSql;
use postgres::{Client, NoTls};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("'{0}' is not a valid table or column name")]
    InvalidTableName(String),
    #[error("database error: {0}")]
    Database(#[from] postgres::Error),
}

/// A column value handed to the destination store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Value {
    Date(NaiveDate),
    Text(String),
    Int(i64),
    OptInt(Option<i64>),
}

impl Value {
    fn as_sql(&self) -> &(dyn ToSql + Sync) {
        match self {
            Value::Date(date) => date,
            Value::Text(text) => text,
            Value::Int(int) => int,
            Value::OptInt(int) => int,
        }
    }
}

/// A row that can be loaded: it has a report date and an ordered list of
/// values matching the destination columns.
pub trait Record {
    fn date(&self) -> NaiveDate;
    fn values(&self) -> Vec<Value>;
}

/// The warehouse the normalized batches are appended to.
pub trait WarehouseStore {
    /// Latest `DATE` present in `table`, or `None` when it is empty.
    fn max_date(&mut self, table: &str) -> Result<Option<NaiveDate>, StoreError>;

    /// Append `rows` and return how many were inserted.
    fn append_rows(
        &mut self,
        table: &str,
        columns: &[&str],
        rows: &[Vec<Value>],
    ) -> Result<u64, StoreError>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadOutcome {
    /// The batch was newer than the table and was appended.
    Inserted(u64),
    /// The table already holds data as recent as the batch.
    UpToDate,
    /// Nothing to load.
    Empty,
}

/// Append `records` only when the batch is newer than everything already in
/// `table`. An empty table always accepts the batch.
pub fn load_if_newer<R: Record>(
    store: &mut dyn WarehouseStore,
    table: &str,
    columns: &[&str],
    records: &[R],
) -> Result<LoadOutcome, StoreError> {
    let Some(batch_max) = records.iter().map(Record::date).max() else {
        return Ok(LoadOutcome::Empty);
    };

    let stored_max = store.max_date(table)?;
    if stored_max.is_some_and(|stored| batch_max <= stored) {
        log::info!("No new data to insert into {}.", table);
        return Ok(LoadOutcome::UpToDate);
    }

    let rows: Vec<Vec<Value>> = records.iter().map(Record::values).collect();
    let inserted = store.append_rows(table, columns, &rows)?;
    log::info!("Inserted {} new rows into {}.", inserted, table);
    Ok(LoadOutcome::Inserted(inserted))
}

/// Accepts `name` or `schema.name` made of ASCII letters, digits and underscores.
fn is_valid_identifier(name: &str) -> bool {
    name.split('.').all(|part| {
        let mut chars = part.chars();
        matches!(chars.next(), Some(c) if c.is_ascii_alphabetic() || c == '_')
            && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
    })
}

fn checked_identifier(name: &str) -> Result<&str, StoreError> {
    if is_valid_identifier(name) {
        Ok(name)
    } else {
        Err(StoreError::InvalidTableName(name.to_string()))
    }
}

/// Postgres-backed warehouse over the blocking client. The connection is
/// opened on first use, so runs that scrape nothing never connect.
pub struct PostgresStore {
    database_url: String,
    client: Option<Client>,
}

impl PostgresStore {
    pub fn new(database_url: impl Into<String>) -> Self {
        PostgresStore {
            database_url: database_url.into(),
            client: None,
        }
    }

    fn client(&mut self) -> Result<&mut Client, StoreError> {
        let client = match self.client.take() {
            Some(client) => client,
            None => Client::connect(&self.database_url, NoTls)?,
        };
        Ok(self.client.insert(client))
    }
}

impl WarehouseStore for PostgresStore {
    fn max_date(&mut self, table: &str) -> Result<Option<NaiveDate>, StoreError> {
        let sql = format!("SELECT MAX(date) FROM {}", checked_identifier(table)?);
        let row = self.client()?.query_one(sql.as_str(), &[])?;
        Ok(row.try_get::<_, Option<NaiveDate>>(0)?)
    }

    fn append_rows(
        &mut self,
        table: &str,
        columns: &[&str],
        rows: &[Vec<Value>],
    ) -> Result<u64, StoreError> {
        let table = checked_identifier(table)?;
        let columns = columns
            .iter()
            .map(|column| checked_identifier(column))
            .collect::<Result<Vec<_>, _>>()?;
        let placeholders = (1..=columns.len())
            .map(|i| format!("${}", i))
            .collect::<Vec<_>>()
            .join(", ");
        let sql = format!(
            "INSERT INTO {} ({}) VALUES ({})",
            table,
            columns.join(", "),
            placeholders
        );

        let mut transaction = self.client()?.transaction()?;
        let statement = transaction.prepare(&sql)?;
        let mut inserted = 0;
        for row in rows {
            let params: Vec<&(dyn ToSql + Sync)> = row.iter().map(Value::as_sql).collect();
            inserted += transaction.execute(&statement, &params)?;
        }
        transaction.commit()?;

        Ok(inserted)
    }
}

#[derive(Debug, Default)]
struct MemoryTable {
    columns: Vec<String>,
    rows: Vec<Vec<Value>>,
}

/// In-process store, used for dry runs and tests.
#[derive(Debug, Default)]
pub struct MemoryStore {
    tables: HashMap<String, MemoryTable>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn rows(&self, table: &str) -> &[Vec<Value>] {
        self.tables
            .get(table)
            .map(|t| t.rows.as_slice())
            .unwrap_or_default()
    }
}

impl WarehouseStore for MemoryStore {
    fn max_date(&mut self, table: &str) -> Result<Option<NaiveDate>, StoreError> {
        let Some(table) = self.tables.get(table) else {
            return Ok(None);
        };
        let Some(date_idx) = table
            .columns
            .iter()
            .position(|column| column.eq_ignore_ascii_case("date"))
        else {
            return Ok(None);
        };

        Ok(table
            .rows
            .iter()
            .filter_map(|row| match row.get(date_idx) {
                Some(Value::Date(date)) => Some(*date),
                _ => None,
            })
            .max())
    }

    fn append_rows(
        &mut self,
        table: &str,
        columns: &[&str],
        rows: &[Vec<Value>],
    ) -> Result<u64, StoreError> {
        let table = self
            .tables
            .entry(checked_identifier(table)?.to_string())
            .or_default();
        if table.columns.is_empty() {
            table.columns = columns.iter().map(|c| c.to_string()).collect();
        }
        table.rows.extend_from_slice(rows);
        Ok(rows.len() as u64)
    }
}
