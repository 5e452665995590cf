//! Source traits and structured error types.
//!
//! `DataProvider` abstracts over daily time-series sources (Yahoo Finance in
//! production, static fixtures in tests). `ScalarSource` abstracts over the
//! "current value only" endpoints. The synchronizer only sees these traits.

use chrono::NaiveDate;
use thiserror::Error;

/// Raw daily bar from a time-series source.
///
/// Only the fields the dataset stores are kept. A field the source did not
/// report for that day is `None`, never a placeholder.
#[derive(Debug, Clone, PartialEq)]
pub struct RawBar {
    pub date: NaiveDate,
    pub close: Option<f64>,
    pub volume: Option<u64>,
}

impl RawBar {
    /// Bar with both close and volume reported.
    pub fn new(date: NaiveDate, close: f64, volume: u64) -> Self {
        Self {
            date,
            close: Some(close),
            volume: Some(volume),
        }
    }
}

/// Structured error types for source operations.
#[derive(Debug, Error)]
pub enum DataError {
    #[error("network unreachable: {0}")]
    NetworkUnreachable(String),

    #[error("HTTP {status} from {source_name}")]
    HttpStatus { source_name: String, status: u16 },

    #[error("response format changed: {0}")]
    ResponseFormatChanged(String),

    #[error("symbol not found: {symbol}")]
    SymbolNotFound { symbol: String },

    #[error("data error: {0}")]
    Other(String),
}

/// Result of a successful time-series fetch for a single symbol.
#[derive(Debug, Clone)]
pub struct FetchResult {
    pub symbol: String,
    pub bars: Vec<RawBar>,
}

impl FetchResult {
    /// Bars falling inside `[start, end]`, in date order, one per date.
    pub fn bars_within(&self, start: NaiveDate, end: NaiveDate) -> Vec<RawBar> {
        let mut bars: Vec<RawBar> = self
            .bars
            .iter()
            .filter(|b| b.date >= start && b.date <= end)
            .cloned()
            .collect();
        bars.sort_by_key(|b| b.date);
        bars.dedup_by_key(|b| b.date);
        bars
    }
}

/// A daily time-series source.
///
/// Implementations handle the specifics of a particular vendor. Providers
/// don't know about the dataset file; the synchronizer sits above them.
pub trait DataProvider: Send + Sync {
    /// Human-readable name of this provider.
    fn name(&self) -> &str;

    /// Fetch daily bars for a symbol over the inclusive range `[start, end]`.
    ///
    /// An empty `bars` vector is a valid answer ("nothing published yet").
    fn fetch(&self, symbol: &str, start: NaiveDate, end: NaiveDate)
        -> Result<FetchResult, DataError>;
}

/// A non-time-indexed source returning one current value.
pub trait ScalarSource: Send + Sync {
    fn name(&self) -> &str;

    fn fetch_latest(&self) -> Result<f64, DataError>;
}
