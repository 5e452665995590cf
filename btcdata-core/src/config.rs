//! Feed configuration: which sources populate which dataset columns.
//!
//! Stored as TOML. `SyncConfig::default()` reproduces the reference Bitcoin
//! feature set, so a config file is only needed to deviate from it.

use crate::data::ScalarFormat;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("read config file {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("parse config TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("serialize config: {0}")]
    Serialize(#[from] toml::ser::Error),

    #[error("invalid config: {0}")]
    Invalid(String),
}

/// Where the dataset and its sync timestamp live.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    pub data_dir: PathBuf,
    pub dataset_file: String,
    pub stamp_file: String,
    pub date_column: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("data"),
            dataset_file: "merged_data.csv".into(),
            stamp_file: "last_updated.txt".into(),
            date_column: "date".into(),
        }
    }
}

impl StorageConfig {
    pub fn dataset_path(&self) -> PathBuf {
        self.data_dir.join(&self.dataset_file)
    }

    pub fn stamp_path(&self) -> PathBuf {
        self.data_dir.join(&self.stamp_file)
    }
}

/// A daily time series and the dataset columns its fields land in.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SeriesFeed {
    pub symbol: String,
    /// Column receiving the daily close.
    pub close: Option<String>,
    /// Column receiving the daily volume.
    #[serde(default)]
    pub volume: Option<String>,
}

impl SeriesFeed {
    pub fn new(symbol: &str, close: &str, volume: Option<&str>) -> Self {
        Self {
            symbol: symbol.into(),
            close: Some(close.into()),
            volume: volume.map(String::from),
        }
    }

    /// Columns this feed writes.
    pub fn columns(&self) -> impl Iterator<Item = &str> {
        self.close.iter().chain(self.volume.iter()).map(String::as_str)
    }
}

/// How a derived column is computed from a fetched one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DerivedKind {
    /// `(x_t - x_{t-1}) / x_{t-1} * 100`
    PercentChange,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DerivedColumn {
    pub column: String,
    pub source: String,
    pub kind: DerivedKind,
}

/// A "current value only" endpoint feeding one column.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScalarFeed {
    pub column: String,
    pub url: String,
    pub format: ScalarFormat,
    #[serde(default = "unit_scale")]
    pub scale: f64,
}

fn unit_scale() -> f64 {
    1.0
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    pub ttl_secs: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self { ttl_secs: 3600 }
    }
}

impl CacheConfig {
    pub fn ttl(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.ttl_secs)
    }
}

/// Complete synchronizer configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SyncConfig {
    /// Extra columns whose missing cells on new rows are filled with the
    /// most recent known value instead of dropping the row.
    #[serde(default)]
    pub carry_forward: Vec<String>,
    #[serde(default)]
    pub storage: StorageConfig,
    pub primary: SeriesFeed,
    #[serde(default)]
    pub auxiliary: Vec<SeriesFeed>,
    #[serde(default)]
    pub derived: Vec<DerivedColumn>,
    #[serde(default)]
    pub scalars: Vec<ScalarFeed>,
    #[serde(default)]
    pub cache: CacheConfig,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            carry_forward: Vec::new(),
            storage: StorageConfig::default(),
            primary: SeriesFeed::new("BTC-USD", "close_btc", Some("volume_btc")),
            auxiliary: vec![
                SeriesFeed::new("CL=F", "close_WTI", Some("volume")),
                SeriesFeed::new("^VIX", "close_VIX", None),
                SeriesFeed::new("QQQ", "close_qqq", Some("volume_qqq")),
                SeriesFeed::new("^IRX", "close_int", None),
            ],
            derived: vec![DerivedColumn {
                column: "btc_change".into(),
                source: "close_btc".into(),
                kind: DerivedKind::PercentChange,
            }],
            scalars: vec![
                ScalarFeed {
                    column: "difficulty".into(),
                    url: "https://blockchain.info/q/difficulty".into(),
                    format: ScalarFormat::Plain,
                    scale: 1.0,
                },
                ScalarFeed {
                    column: "hash_rate".into(),
                    url: "https://blockchain.info/q/hashrate".into(),
                    format: ScalarFormat::Plain,
                    scale: 0.001,
                },
                ScalarFeed {
                    column: "value_fear_greed".into(),
                    url: "https://api.alternative.me/fng/?limit=1".into(),
                    format: ScalarFormat::FearGreed,
                    scale: 1.0,
                },
            ],
            cache: CacheConfig::default(),
        }
    }
}

impl SyncConfig {
    /// Load and validate a config from a TOML file.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml(&content)
    }

    /// Parse and validate a config from a TOML string.
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_toml(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Columns written by time-series feeds, primary first.
    pub fn series_columns(&self) -> Vec<&str> {
        std::iter::once(&self.primary)
            .chain(&self.auxiliary)
            .flat_map(|feed| feed.columns())
            .collect()
    }

    /// Every column some feed produces.
    pub fn produced_columns(&self) -> Vec<&str> {
        let mut cols = self.series_columns();
        cols.extend(self.derived.iter().map(|d| d.column.as_str()));
        cols.extend(self.scalars.iter().map(|s| s.column.as_str()));
        cols
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let invalid = |msg: String| Err(ConfigError::Invalid(msg));

        if self.storage.date_column.trim().is_empty() {
            return invalid("storage.date_column is empty".into());
        }
        if self.primary.close.is_none() {
            return invalid("primary feed must set a close column".into());
        }
        for feed in std::iter::once(&self.primary).chain(&self.auxiliary) {
            if feed.symbol.trim().is_empty() {
                return invalid("series feed with empty symbol".into());
            }
        }

        let mut seen = HashSet::new();
        for col in self.produced_columns() {
            if col.trim().is_empty() {
                return invalid("empty column name".into());
            }
            if col == self.storage.date_column {
                return invalid(format!("column '{col}' collides with the date column"));
            }
            if !seen.insert(col) {
                return invalid(format!("column '{col}' is produced by more than one feed"));
            }
        }

        let series = self.series_columns();
        for d in &self.derived {
            if !series.contains(&d.source.as_str()) {
                return invalid(format!(
                    "derived column '{}' reads '{}', which no series feed produces",
                    d.column, d.source
                ));
            }
        }

        for s in &self.scalars {
            if !s.scale.is_finite() || s.scale == 0.0 {
                return invalid(format!("scalar '{}' has invalid scale {}", s.column, s.scale));
            }
        }

        Ok(())
    }
}
