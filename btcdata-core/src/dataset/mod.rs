//! The persisted date-keyed table.
//!
//! A `Dataset` is a header plus rows. One column holds calendar dates; every
//! other column holds numeric or text cells, possibly missing. The canonical
//! form has strictly increasing dates, one row per date, and every row as
//! wide as the header.

mod io;
mod value;

pub use value::{Cell, Value};

use chrono::NaiveDate;
use std::path::PathBuf;
use thiserror::Error;

/// Errors from reading, writing, or editing a dataset.
#[derive(Debug, Error)]
pub enum DatasetError {
    #[error("I/O error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("date column '{0}' not found in header")]
    MissingDateColumn(String),

    #[error("invalid date {value:?} on line {line}")]
    BadDate { line: u64, value: String },

    #[error("row for {date} has {got} cells, schema has {expected}")]
    SchemaMismatch {
        date: NaiveDate,
        expected: usize,
        got: usize,
    },

    #[error("dataset has no rows")]
    NoRows,
}

/// One dated row. `cells` is aligned with [`Dataset::columns`].
#[derive(Debug, Clone, PartialEq)]
pub struct Row {
    pub date: NaiveDate,
    pub cells: Vec<Cell>,
}

impl Row {
    /// Names of the columns whose cell is missing.
    pub fn missing_columns<'a>(&self, columns: &'a [String]) -> Vec<&'a str> {
        self.cells
            .iter()
            .zip(columns)
            .filter(|(cell, _)| cell.is_none())
            .map(|(_, name)| name.as_str())
            .collect()
    }

    pub fn is_complete(&self) -> bool {
        self.cells.iter().all(Option::is_some)
    }
}

/// Date-keyed table with a fixed schema.
#[derive(Debug, Clone, PartialEq)]
pub struct Dataset {
    date_column: String,
    /// Position of the date column in the file header.
    date_position: usize,
    /// Non-date columns in header order.
    columns: Vec<String>,
    rows: Vec<Row>,
}

impl Dataset {
    /// Empty dataset whose header is the date column followed by `columns`.
    pub fn new(date_column: impl Into<String>, columns: Vec<String>) -> Self {
        Self {
            date_column: date_column.into(),
            date_position: 0,
            columns,
            rows: Vec::new(),
        }
    }

    pub fn date_column(&self) -> &str {
        &self.date_column
    }

    /// Non-date columns, in header order.
    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    /// Full header as persisted, date column included.
    pub fn header(&self) -> Vec<&str> {
        let mut header: Vec<&str> = self.columns.iter().map(String::as_str).collect();
        header.insert(self.date_position, &self.date_column);
        header
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    pub fn rows(&self) -> &[Row] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn first_date(&self) -> Option<NaiveDate> {
        self.rows.iter().map(|r| r.date).min()
    }

    /// Maximum date present. Does not assume the rows are sorted.
    pub fn last_date(&self) -> Option<NaiveDate> {
        self.rows.iter().map(|r| r.date).max()
    }

    /// Most recent non-missing value of `column`, scanning from the latest date.
    pub fn last_known(&self, column: &str) -> Option<&Value> {
        let idx = self.column_index(column)?;
        let mut order: Vec<&Row> = self.rows.iter().collect();
        order.sort_by_key(|r| r.date);
        order
            .into_iter()
            .rev()
            .find_map(|row| row.cells.get(idx).and_then(Option::as_ref))
    }

    /// Value of `column` on `date`, if both exist and the cell is present.
    pub fn value(&self, date: NaiveDate, column: &str) -> Option<&Value> {
        let idx = self.column_index(column)?;
        self.rows
            .iter()
            .find(|r| r.date == date)
            .and_then(|r| r.cells.get(idx))
            .and_then(Option::as_ref)
    }

    /// The last `n` rows in stored order.
    pub fn tail(&self, n: usize) -> &[Row] {
        let start = self.rows.len().saturating_sub(n);
        &self.rows[start..]
    }

    /// Add a row without reordering. Rejects rows not as wide as the schema.
    pub fn push_row(&mut self, row: Row) -> Result<(), DatasetError> {
        if row.cells.len() != self.columns.len() {
            return Err(DatasetError::SchemaMismatch {
                date: row.date,
                expected: self.columns.len(),
                got: row.cells.len(),
            });
        }
        self.rows.push(row);
        Ok(())
    }

    /// Append rows and restore canonical order. Returns the net number of
    /// rows gained (rows on an already-present date are discarded).
    pub fn append(&mut self, rows: Vec<Row>) -> Result<usize, DatasetError> {
        let before = self.rows.len();
        for row in rows {
            self.push_row(row)?;
        }
        self.canonicalize();
        Ok(self.rows.len().saturating_sub(before))
    }

    /// Sort by date ascending and drop duplicate dates, keeping the first
    /// occurrence.
    pub fn canonicalize(&mut self) {
        self.rows.sort_by_key(|r| r.date);
        self.rows.dedup_by_key(|r| r.date);
    }

    /// True when dates are strictly increasing.
    pub fn is_canonical(&self) -> bool {
        self.rows.windows(2).all(|w| w[0].date < w[1].date)
    }

    /// BLAKE3 hash over the header and every row, in stored order.
    pub fn fingerprint(&self) -> String {
        let mut hasher = blake3::Hasher::new();
        for name in self.header() {
            hasher.update(name.as_bytes());
            hasher.update(b"\x1f");
        }
        for row in &self.rows {
            hasher.update(b"\x1e");
            hasher.update(row.date.to_string().as_bytes());
            for cell in &row.cells {
                hasher.update(b"\x1f");
                if let Some(value) = cell {
                    hasher.update(value.to_string().as_bytes());
                }
            }
        }
        hasher.finalize().to_hex().to_string()
    }

    /// Rows as JSON objects keyed by column name, for display.
    pub fn rows_as_json(&self, rows: &[Row]) -> Vec<serde_json::Value> {
        rows.iter()
            .map(|row| {
                let mut obj = serde_json::Map::new();
                obj.insert(
                    self.date_column.clone(),
                    serde_json::Value::String(row.date.to_string()),
                );
                for (name, cell) in self.columns.iter().zip(&row.cells) {
                    let v = match cell {
                        Some(value) => match value.as_f64().and_then(serde_json::Number::from_f64) {
                            Some(n) => serde_json::Value::Number(n),
                            None => serde_json::Value::String(value.to_string()),
                        },
                        None => serde_json::Value::Null,
                    };
                    obj.insert(name.clone(), v);
                }
                serde_json::Value::Object(obj)
            })
            .collect()
    }
}
