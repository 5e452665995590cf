//! CSV persistence for [`Dataset`].
//!
//! Writes are atomic: the table is written to `{file}.tmp` and renamed into
//! place, so a crash mid-write never leaves a truncated dataset behind.

use super::{Dataset, DatasetError, Row, Value};
use chrono::NaiveDate;
use std::fs;
use std::io;
use std::path::Path;

const DATE_FORMAT: &str = "%Y-%m-%d";

/// Parse a date field. A trailing time component (`2024-01-02 00:00:00`,
/// `2024-01-02T00:00:00`) is accepted and dropped.
fn parse_date(raw: &str) -> Option<NaiveDate> {
    let trimmed = raw.trim();
    let date_part = trimmed.get(..10).unwrap_or(trimmed);
    NaiveDate::parse_from_str(date_part, DATE_FORMAT).ok()
}

impl Dataset {
    /// Load a dataset from a CSV file with a header row.
    pub fn read_csv(path: &Path, date_column: &str) -> Result<Self, DatasetError> {
        let file = fs::File::open(path).map_err(|source| DatasetError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_reader(io::BufReader::new(file), date_column)
    }

    /// Parse a dataset from any CSV reader.
    pub fn from_reader<R: io::Read>(reader: R, date_column: &str) -> Result<Self, DatasetError> {
        let mut rdr = csv::ReaderBuilder::new()
            .has_headers(true)
            .from_reader(reader);

        let headers = rdr.headers()?.clone();
        let date_position = headers
            .iter()
            .position(|h| h.trim() == date_column)
            .ok_or_else(|| DatasetError::MissingDateColumn(date_column.to_string()))?;

        let columns: Vec<String> = headers
            .iter()
            .enumerate()
            .filter(|(i, _)| *i != date_position)
            .map(|(_, h)| h.trim().to_string())
            .collect();

        let mut rows = Vec::new();
        for record in rdr.records() {
            let record = record?;
            let line = record.position().map(|p| p.line()).unwrap_or(0);
            let raw_date = record.get(date_position).unwrap_or_default();
            let date = parse_date(raw_date).ok_or_else(|| DatasetError::BadDate {
                line,
                value: raw_date.to_string(),
            })?;

            let cells = record
                .iter()
                .enumerate()
                .filter(|(i, _)| *i != date_position)
                .map(|(_, field)| Value::parse(field))
                .collect();
            rows.push(Row { date, cells });
        }

        Ok(Self {
            date_column: date_column.to_string(),
            date_position,
            columns,
            rows,
        })
    }

    /// Serialize the dataset as CSV, header first, rows in stored order.
    pub fn to_writer<W: io::Write>(&self, writer: W) -> Result<(), DatasetError> {
        self.rows_to_writer(writer, &self.rows)
    }

    /// Header plus `rows` (normally a slice of this dataset) as CSV.
    pub fn rows_to_writer<W: io::Write>(&self, writer: W, rows: &[Row]) -> Result<(), DatasetError> {
        let mut wtr = csv::Writer::from_writer(writer);
        wtr.write_record(self.header())?;

        for row in rows {
            let mut fields: Vec<String> = row
                .cells
                .iter()
                .map(|cell| cell.as_ref().map(Value::to_string).unwrap_or_default())
                .collect();
            fields.insert(self.date_position, row.date.format(DATE_FORMAT).to_string());
            wtr.write_record(&fields)?;
        }

        wtr.flush().map_err(|source| DatasetError::Io {
            path: Default::default(),
            source,
        })?;
        Ok(())
    }

    /// Atomically replace `path` with this dataset. Creates parent directories.
    pub fn write_csv(&self, path: &Path) -> Result<(), DatasetError> {
        let io_err = |source| DatasetError::Io {
            path: path.to_path_buf(),
            source,
        };

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(io_err)?;
        }

        let tmp_path = path.with_extension("csv.tmp");
        {
            let file = fs::File::create(&tmp_path).map_err(io_err)?;
            self.to_writer(io::BufWriter::new(file))?;
        }

        fs::rename(&tmp_path, path).map_err(|e| {
            // Clean up temp file on rename failure
            let _ = fs::remove_file(&tmp_path);
            io_err(e)
        })
    }
}
