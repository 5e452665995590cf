//! Gap window and the up-to-date/stale decision.

use chrono::NaiveDate;
use std::fmt;

/// Inclusive date range `[start, end]` with no rows in the dataset.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GapWindow {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl GapWindow {
    /// Window from the day after `last_date` through the day before `today`,
    /// or `None` when `last_date` already covers yesterday.
    pub fn after(last_date: NaiveDate, today: NaiveDate) -> Option<Self> {
        let start = last_date.succ_opt()?;
        let end = today.pred_opt()?;
        (start <= end).then_some(Self { start, end })
    }

    /// Number of calendar days in the window.
    pub fn days(&self) -> i64 {
        (self.end - self.start).num_days() + 1
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        date >= self.start && date <= self.end
    }
}

impl fmt::Display for GapWindow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}..={}", self.start, self.end)
    }
}

/// Freshness of the dataset relative to a given day.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncState {
    UpToDate,
    Stale { gap: GapWindow },
}

impl SyncState {
    pub fn assess(last_date: NaiveDate, today: NaiveDate) -> Self {
        match GapWindow::after(last_date, today) {
            Some(gap) => SyncState::Stale { gap },
            None => SyncState::UpToDate,
        }
    }

    pub fn is_stale(&self) -> bool {
        matches!(self, SyncState::Stale { .. })
    }
}

impl fmt::Display for SyncState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SyncState::UpToDate => f.write_str("up to date"),
            SyncState::Stale { gap } => write!(f, "stale ({} day(s) missing: {gap})", gap.days()),
        }
    }
}
