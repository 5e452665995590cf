//! Last-updated timestamp record: one line of `YYYY-MM-DD HH:MM:SS`.

use chrono::NaiveDateTime;
use std::fmt;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

const STAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Persisted sync time as read back from disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LastUpdate {
    Never,
    /// Timestamp text exactly as stored.
    At(String),
}

impl fmt::Display for LastUpdate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LastUpdate::Never => f.write_str("Never"),
            LastUpdate::At(text) => f.write_str(text),
        }
    }
}

/// File holding the last successful sync time.
#[derive(Debug, Clone)]
pub struct StampFile {
    path: PathBuf,
}

impl StampFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Overwrite the record with `at`. Creates parent directories.
    pub fn record(&self, at: NaiveDateTime) -> io::Result<()> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        fs::write(&self.path, at.format(STAMP_FORMAT).to_string())
    }

    /// Read the record. Absent, unreadable, or blank records read as `Never`.
    pub fn read(&self) -> LastUpdate {
        if !self.path.is_file() {
            return LastUpdate::Never;
        }
        match fs::read_to_string(&self.path) {
            Ok(text) if !text.trim().is_empty() => LastUpdate::At(text.trim().to_string()),
            _ => LastUpdate::Never,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    #[test]
    fn absent_record_is_never() {
        let dir = tempfile::tempdir().unwrap();
        let stamp = StampFile::new(dir.path().join("last_updated.txt"));
        assert_eq!(stamp.read(), LastUpdate::Never);
        assert_eq!(stamp.read().to_string(), "Never");
    }

    #[test]
    fn record_then_read() {
        let dir = tempfile::tempdir().unwrap();
        let stamp = StampFile::new(dir.path().join("data").join("last_updated.txt"));
        let at = NaiveDate::from_ymd_opt(2024, 7, 1)
            .unwrap()
            .and_hms_opt(9, 5, 3)
            .unwrap();

        stamp.record(at).unwrap();
        assert_eq!(stamp.read(), LastUpdate::At("2024-07-01 09:05:03".into()));
    }

    #[test]
    fn foreign_text_is_returned_verbatim() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("last_updated.txt");
        fs::write(&path, "sometime yesterday\n").unwrap();
        assert_eq!(
            StampFile::new(&path).read(),
            LastUpdate::At("sometime yesterday".into())
        );
    }

    #[test]
    fn directory_in_place_of_file_is_never() {
        let dir = tempfile::tempdir().unwrap();
        assert_eq!(StampFile::new(dir.path()).read(), LastUpdate::Never);
    }
}
