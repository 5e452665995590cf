//! What a sync run hands back to the caller.

use crate::dataset::Dataset;
use chrono::NaiveDate;
use std::fmt;
use std::path::PathBuf;

/// Why a run left the dataset untouched.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoUpdateReason {
    /// The last stored date already covers yesterday.
    UpToDate,
    /// The primary series failed or returned nothing for the gap.
    PrimaryUnavailable,
    /// Every candidate row still had a missing cell after reconciliation.
    AllRowsIncomplete,
}

impl fmt::Display for NoUpdateReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            NoUpdateReason::UpToDate => "dataset already up to date",
            NoUpdateReason::PrimaryUnavailable => "no new primary data available",
            NoUpdateReason::AllRowsIncomplete => "every new row had missing values",
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncStatus {
    Updated { rows_added: usize },
    NoUpdate(NoUpdateReason),
}

/// A degradation the run recovered from locally.
#[derive(Debug, Clone, PartialEq)]
pub enum SyncIssue {
    SourceFetchFailed { source: String, reason: String },
    IncompleteRow { date: NaiveDate, missing: Vec<String> },
    /// Rows were persisted but the last-updated record could not be written.
    StampNotRecorded { path: PathBuf, reason: String },
}

impl fmt::Display for SyncIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SyncIssue::SourceFetchFailed { source, reason } => {
                write!(f, "source {source} failed: {reason}")
            }
            SyncIssue::IncompleteRow { date, missing } => {
                write!(f, "dropped {date}: missing {}", missing.join(", "))
            }
            SyncIssue::StampNotRecorded { path, reason } => {
                write!(f, "sync time not recorded in {}: {reason}", path.display())
            }
        }
    }
}

/// Dataset snapshot after a run, plus what happened.
#[derive(Debug, Clone)]
pub struct SyncOutcome {
    pub dataset: Dataset,
    pub status: SyncStatus,
    pub issues: Vec<SyncIssue>,
}

impl SyncOutcome {
    pub(crate) fn unchanged(dataset: Dataset, reason: NoUpdateReason, issues: Vec<SyncIssue>) -> Self {
        Self {
            dataset,
            status: SyncStatus::NoUpdate(reason),
            issues,
        }
    }

    /// Whether rows were appended and persisted.
    pub fn updated(&self) -> bool {
        matches!(self.status, SyncStatus::Updated { .. })
    }

    pub fn rows_added(&self) -> usize {
        match self.status {
            SyncStatus::Updated { rows_added } => rows_added,
            SyncStatus::NoUpdate(_) => 0,
        }
    }

    /// `(dataset, was_updated)`.
    pub fn into_parts(self) -> (Dataset, bool) {
        let updated = self.updated();
        (self.dataset, updated)
    }
}
