//! Incremental dataset synchronization.
//!
//! One call brings the persisted dataset up to yesterday:
//! 1. Load the dataset and find the gap after its last date
//! 2. Fetch the primary series for the gap (nothing fetched → no update)
//! 3. Fetch auxiliary series, derive computed columns, fetch scalars
//! 4. Reconcile new rows against the schema, dropping incomplete ones
//! 5. Append, persist atomically, record the sync time
//!
//! Source failures degrade to "no update" or to carried-forward values.
//! Only a missing or unreadable dataset, or a failed dataset write, is an
//! error. A failed timestamp write after the rows are persisted is an issue.

mod derive;
mod gap;
mod outcome;
mod reconcile;
mod stamp;

pub use gap::{GapWindow, SyncState};
pub use outcome::{NoUpdateReason, SyncIssue, SyncOutcome, SyncStatus};
pub use reconcile::{reconcile, ColumnRule, DroppedRow, FillPolicy, PendingRows, Reconciled};
pub use stamp::{LastUpdate, StampFile};

use crate::config::{SeriesFeed, SyncConfig};
use crate::data::{DataError, DataProvider, HttpScalarSource, RawBar, ScalarSource, YahooProvider};
use crate::dataset::{Dataset, DatasetError, Value};
use chrono::{NaiveDate, NaiveDateTime};
use std::path::PathBuf;
use thiserror::Error;
use tracing::{debug, info, warn};

#[derive(Debug, Error)]
pub enum SyncError {
    #[error("dataset not found at {}; nothing to synchronize", path.display())]
    DataUnavailable { path: PathBuf },

    #[error(transparent)]
    Dataset(#[from] DatasetError),

    #[error("source setup failed: {0}")]
    Source(#[from] DataError),
}

/// A scalar source bound to the column it feeds.
struct ScalarBinding {
    column: String,
    source: Box<dyn ScalarSource>,
}

/// Owns read-modify-write access to the dataset file and its timestamp.
pub struct Synchronizer {
    config: SyncConfig,
    series: Box<dyn DataProvider>,
    scalars: Vec<ScalarBinding>,
    stamp: StampFile,
}

impl Synchronizer {
    /// Synchronizer with a time-series provider and no scalar sources.
    pub fn new(config: SyncConfig, series: Box<dyn DataProvider>) -> Self {
        let stamp = StampFile::new(config.storage.stamp_path());
        Self {
            config,
            series,
            scalars: Vec::new(),
            stamp,
        }
    }

    /// Production wiring: Yahoo Finance plus one HTTP source per configured scalar.
    pub fn from_config(config: SyncConfig) -> Result<Self, SyncError> {
        let scalars: Vec<(String, HttpScalarSource)> = config
            .scalars
            .iter()
            .map(|s| {
                HttpScalarSource::new(s.column.clone(), s.url.clone(), s.format, s.scale)
                    .map(|src| (s.column.clone(), src))
            })
            .collect::<Result<_, _>>()?;

        let mut sync = Self::new(config, Box::new(YahooProvider::new()?));
        for (column, source) in scalars {
            sync = sync.with_scalar(column, Box::new(source));
        }
        Ok(sync)
    }

    /// Feed `column` from `source`, fetched once per run.
    pub fn with_scalar(mut self, column: impl Into<String>, source: Box<dyn ScalarSource>) -> Self {
        self.scalars.push(ScalarBinding {
            column: column.into(),
            source,
        });
        self
    }

    pub fn config(&self) -> &SyncConfig {
        &self.config
    }

    pub fn dataset_path(&self) -> PathBuf {
        self.config.storage.dataset_path()
    }

    /// Load the persisted dataset. A missing file is `DataUnavailable`.
    pub fn load(&self) -> Result<Dataset, SyncError> {
        let path = self.dataset_path();
        if !path.is_file() {
            return Err(SyncError::DataUnavailable { path });
        }
        Ok(Dataset::read_csv(&path, &self.config.storage.date_column)?)
    }

    /// Freshness of the persisted dataset as of the local date.
    pub fn state(&self) -> Result<SyncState, SyncError> {
        self.state_at(chrono::Local::now().date_naive())
    }

    /// Freshness of the persisted dataset as of `today`.
    pub fn state_at(&self, today: NaiveDate) -> Result<SyncState, SyncError> {
        let dataset = self.load()?;
        let last_date = dataset.last_date().ok_or(DatasetError::NoRows)?;
        Ok(SyncState::assess(last_date, today))
    }

    /// Persisted last-updated time, or `Never`.
    pub fn last_update_time(&self) -> LastUpdate {
        self.stamp.read()
    }

    /// Bring the dataset up to yesterday, using the local clock.
    pub fn synchronize(&self) -> Result<SyncOutcome, SyncError> {
        self.synchronize_at(chrono::Local::now().naive_local())
    }

    /// Bring the dataset up to the day before `now`, stamping `now` on success.
    pub fn synchronize_at(&self, now: NaiveDateTime) -> Result<SyncOutcome, SyncError> {
        let mut dataset = self.load()?;
        let last_date = dataset.last_date().ok_or(DatasetError::NoRows)?;

        let gap = match SyncState::assess(last_date, now.date()) {
            SyncState::UpToDate => {
                info!(%last_date, "dataset already up to date");
                return Ok(SyncOutcome::unchanged(
                    dataset,
                    NoUpdateReason::UpToDate,
                    Vec::new(),
                ));
            }
            SyncState::Stale { gap } => gap,
        };
        info!(start = %gap.start, end = %gap.end, "fetching new data");

        let mut issues = Vec::new();

        let primary = &self.config.primary;
        let primary_bars = self.fetch_series(primary, gap, &mut issues);
        if primary_bars.is_empty() {
            info!(symbol = %primary.symbol, "no new primary data available");
            return Ok(SyncOutcome::unchanged(
                dataset,
                NoUpdateReason::PrimaryUnavailable,
                issues,
            ));
        }

        let mut pending = PendingRows::for_dates(primary_bars.iter().map(|b| b.date));
        fill_series(&mut pending, primary, &primary_bars);

        for feed in &self.config.auxiliary {
            let bars = self.fetch_series(feed, gap, &mut issues);
            fill_series(&mut pending, feed, &bars);
        }

        for spec in &self.config.derived {
            let anchor = dataset.last_known(&spec.source).and_then(Value::as_f64);
            derive::apply(&mut pending, spec, anchor);
        }

        for binding in &self.scalars {
            match binding.source.fetch_latest() {
                Ok(value) => pending.set_all(&binding.column, Value::Number(value)),
                Err(e) => {
                    warn!(column = %binding.column, error = %e, "scalar source failed, using last known value");
                    issues.push(SyncIssue::SourceFetchFailed {
                        source: binding.source.name().to_string(),
                        reason: e.to_string(),
                    });
                }
            }
        }

        let policy = self.fill_policy();
        let reconciled = reconcile(&dataset, pending, &policy);
        for dropped in reconciled.dropped {
            warn!(date = %dropped.date, missing = ?dropped.missing, "dropping incomplete row");
            issues.push(SyncIssue::IncompleteRow {
                date: dropped.date,
                missing: dropped.missing,
            });
        }

        if reconciled.rows.is_empty() {
            return Ok(SyncOutcome::unchanged(
                dataset,
                NoUpdateReason::AllRowsIncomplete,
                issues,
            ));
        }

        let rows_added = dataset.append(reconciled.rows)?;
        dataset.write_csv(&self.dataset_path())?;
        // Rows are already persisted; a stamp failure is reported, not raised
        if let Err(e) = self.stamp.record(now) {
            warn!(path = %self.stamp.path().display(), error = %e, "could not record sync time");
            issues.push(SyncIssue::StampNotRecorded {
                path: self.stamp.path().to_path_buf(),
                reason: e.to_string(),
            });
        }

        info!(rows_added, total = dataset.len(), "dataset updated");
        Ok(SyncOutcome {
            dataset,
            status: SyncStatus::Updated { rows_added },
            issues,
        })
    }

    /// Scalar columns always carry forward, so a failed endpoint falls back
    /// to the last known value instead of dropping the row.
    fn fill_policy(&self) -> FillPolicy {
        let produced = self.config.produced_columns();
        let carry = self
            .config
            .carry_forward
            .iter()
            .map(String::as_str)
            .chain(self.config.scalars.iter().map(|s| s.column.as_str()))
            .chain(self.scalars.iter().map(|b| b.column.as_str()));
        FillPolicy::new(
            produced.into_iter().chain(self.scalars.iter().map(|b| b.column.as_str())),
            carry,
        )
    }

    /// Fetch one series for the gap. Failures are recorded and read as empty.
    fn fetch_series(&self, feed: &SeriesFeed, gap: GapWindow, issues: &mut Vec<SyncIssue>) -> Vec<RawBar> {
        match self.series.fetch(&feed.symbol, gap.start, gap.end) {
            Ok(result) => {
                let bars = result.bars_within(gap.start, gap.end);
                debug!(symbol = %feed.symbol, rows = bars.len(), "fetched series");
                bars
            }
            Err(e) => {
                warn!(symbol = %feed.symbol, error = %e, "series fetch failed");
                issues.push(SyncIssue::SourceFetchFailed {
                    source: format!("{} ({})", self.series.name(), feed.symbol),
                    reason: e.to_string(),
                });
                Vec::new()
            }
        }
    }
}

fn fill_series(pending: &mut PendingRows, feed: &SeriesFeed, bars: &[RawBar]) {
    for bar in bars {
        if let Some(column) = &feed.close {
            pending.set(bar.date, column, bar.close.and_then(Value::number));
        }
        if let Some(column) = &feed.volume {
            pending.set(bar.date, column, bar.volume.and_then(|v| Value::number(v as f64)));
        }
    }
}
