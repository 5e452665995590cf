//! Shared fixtures: in-memory sources and a reference dataset on disk.

#![allow(dead_code)]

use btcdata_core::data::{DataError, DataProvider, FetchResult, RawBar, ScalarSource};
use btcdata_core::SyncConfig;
use chrono::{Datelike, NaiveDate, NaiveDateTime, Weekday};
use std::collections::{HashMap, HashSet};
use std::path::Path;
use std::sync::{Arc, Mutex};

pub const HEADER: &str = "date,close_btc,volume_btc,btc_change,close_WTI,volume,close_VIX,\
close_qqq,volume_qqq,close_int,close_cpi,difficulty,hash_rate,value_fear_greed,signal";

pub type CallLog = Arc<Mutex<Vec<(String, NaiveDate, NaiveDate)>>>;

/// Time-series provider serving fixed bars, clipped to the requested window.
#[derive(Default)]
pub struct StaticProvider {
    series: HashMap<String, Vec<RawBar>>,
    failing: HashSet<String>,
    calls: CallLog,
}

impl StaticProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_series(mut self, symbol: &str, bars: Vec<RawBar>) -> Self {
        self.series.insert(symbol.to_string(), bars);
        self
    }

    pub fn failing(mut self, symbol: &str) -> Self {
        self.failing.insert(symbol.to_string());
        self
    }

    /// Every default feed symbol with a bar on every calendar day in range.
    pub fn full_market(start: NaiveDate, end: NaiveDate) -> Self {
        Self::new()
            .with_series("BTC-USD", daily_bars(start, end, 60_000.0, false))
            .with_series("CL=F", daily_bars(start, end, 80.0, false))
            .with_series("^VIX", daily_bars(start, end, 13.0, false))
            .with_series("QQQ", daily_bars(start, end, 450.0, false))
            .with_series("^IRX", daily_bars(start, end, 5.0, false))
    }

    pub fn call_log(&self) -> CallLog {
        Arc::clone(&self.calls)
    }
}

impl DataProvider for StaticProvider {
    fn name(&self) -> &str {
        "static"
    }

    fn fetch(
        &self,
        symbol: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<FetchResult, DataError> {
        self.calls
            .lock()
            .unwrap()
            .push((symbol.to_string(), start, end));

        if self.failing.contains(symbol) {
            return Err(DataError::NetworkUnreachable("connection refused".into()));
        }

        let bars = self
            .series
            .get(symbol)
            .map(|bars| {
                bars.iter()
                    .filter(|b| b.date >= start && b.date <= end)
                    .cloned()
                    .collect()
            })
            .unwrap_or_default();

        Ok(FetchResult {
            symbol: symbol.to_string(),
            bars,
        })
    }
}

/// Scalar source answering a fixed value, or failing.
pub struct FixedScalar {
    name: String,
    value: Option<f64>,
}

impl FixedScalar {
    pub fn ok(name: &str, value: f64) -> Box<Self> {
        Box::new(Self {
            name: name.into(),
            value: Some(value),
        })
    }

    pub fn down(name: &str) -> Box<Self> {
        Box::new(Self {
            name: name.into(),
            value: None,
        })
    }
}

impl ScalarSource for FixedScalar {
    fn name(&self) -> &str {
        &self.name
    }

    fn fetch_latest(&self) -> Result<f64, DataError> {
        self.value
            .ok_or_else(|| DataError::HttpStatus {
                source_name: self.name.clone(),
                status: 503,
            })
    }
}

pub fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

pub fn noon(day: NaiveDate) -> NaiveDateTime {
    day.and_hms_opt(12, 0, 0).unwrap()
}

/// One bar per day in `[start, end]`; close rises by 1.0 per day from `base`.
pub fn daily_bars(start: NaiveDate, end: NaiveDate, base: f64, weekdays_only: bool) -> Vec<RawBar> {
    start
        .iter_days()
        .take_while(|d| *d <= end)
        .enumerate()
        .filter(|(_, d)| !weekdays_only || !matches!(d.weekday(), Weekday::Sat | Weekday::Sun))
        .map(|(i, d)| RawBar::new(d, base + i as f64, 1_000 + i as u64))
        .collect()
}

/// Write a reference dataset with `days` consecutive rows ending on `last`.
pub fn write_dataset(dir: &Path, last: NaiveDate, days: u32) {
    let mut text = String::from(HEADER);
    text.push('\n');
    for back in (0..days).rev() {
        let d = last - chrono::Duration::days(back as i64);
        let i = days - back;
        text.push_str(&format!(
            "{d},{},{},0.5,78.1,200000,14.2,440.5,30000000,5.2,310.3,{},{},{},{}\n",
            59_000 + i,
            900 + i,
            8.0e13 + i as f64,
            600_000 + i,
            40 + i,
            i % 2,
        ));
    }
    std::fs::create_dir_all(dir).unwrap();
    std::fs::write(dir.join("merged_data.csv"), text).unwrap();
}

/// Default feed configuration rooted at `dir`.
pub fn config_in(dir: &Path) -> SyncConfig {
    let mut config = SyncConfig::default();
    config.storage.data_dir = dir.to_path_buf();
    config
}

/// Working scalar sources for the three default indicator columns.
pub fn healthy_scalars() -> Vec<(&'static str, Box<dyn ScalarSource>)> {
    vec![
        ("difficulty", FixedScalar::ok("difficulty", 9.1e13) as Box<dyn ScalarSource>),
        ("hash_rate", FixedScalar::ok("hash_rate", 650_000.0)),
        ("value_fear_greed", FixedScalar::ok("fear_greed", 72.0)),
    ]
}
