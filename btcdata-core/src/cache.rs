//! In-process dataset cache with a time-to-live.
//!
//! Long-running callers (the `watch` loop, an embedding service) keep one
//! `DatasetCache` and read through it. The refresh closure runs only when
//! the entry is absent, expired, or explicitly invalidated.

use crate::dataset::Dataset;
use std::time::{Duration, Instant};

#[derive(Debug, Clone)]
struct CachedDataset {
    stored_at: Instant,
    dataset: Dataset,
}

#[derive(Debug, Clone)]
pub struct DatasetCache {
    ttl: Duration,
    entry: Option<CachedDataset>,
}

impl DatasetCache {
    pub fn new(ttl: Duration) -> Self {
        Self { ttl, entry: None }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Cached dataset if still fresh, otherwise the result of `refresh`.
    pub fn get_or_refresh<E, F>(&mut self, refresh: F) -> Result<&Dataset, E>
    where
        F: FnOnce() -> Result<Dataset, E>,
    {
        self.get_or_refresh_at(Instant::now(), refresh)
    }

    /// Same as [`get_or_refresh`](Self::get_or_refresh) with an explicit clock.
    ///
    /// A failed refresh keeps the previous (stale) entry in place.
    pub fn get_or_refresh_at<E, F>(&mut self, now: Instant, refresh: F) -> Result<&Dataset, E>
    where
        F: FnOnce() -> Result<Dataset, E>,
    {
        let fresh = self.is_fresh_at(now);
        let entry = match self.entry.take() {
            Some(entry) if fresh => entry,
            stale => match refresh() {
                Ok(dataset) => CachedDataset {
                    stored_at: now,
                    dataset,
                },
                Err(e) => {
                    self.entry = stale;
                    return Err(e);
                }
            },
        };
        Ok(&self.entry.insert(entry).dataset)
    }

    /// Cached dataset regardless of age.
    pub fn peek(&self) -> Option<&Dataset> {
        self.entry.as_ref().map(|e| &e.dataset)
    }

    pub fn is_fresh(&self) -> bool {
        self.is_fresh_at(Instant::now())
    }

    pub fn is_fresh_at(&self, now: Instant) -> bool {
        self.age_at(now).is_some_and(|age| age < self.ttl)
    }

    pub fn age(&self) -> Option<Duration> {
        self.age_at(Instant::now())
    }

    pub fn age_at(&self, now: Instant) -> Option<Duration> {
        self.entry
            .as_ref()
            .map(|e| now.saturating_duration_since(e.stored_at))
    }

    /// Drop the cached entry; the next read refreshes.
    pub fn invalidate(&mut self) {
        self.entry = None;
    }
}
