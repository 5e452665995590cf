//! External sources: daily time series and scalar indicators

pub mod provider;
pub mod scalar;
pub mod yahoo;

pub use provider::{DataError, DataProvider, FetchResult, RawBar, ScalarSource};
pub use scalar::{HttpScalarSource, ScalarFormat};
pub use yahoo::YahooProvider;
