//! HTTP scalar-indicator sources.
//!
//! Each endpoint answers with a single "current" value and carries no date.
//! Two payload shapes are supported: a bare number in the body
//! (blockchain.info `/q/` endpoints) and the alternative.me Fear & Greed JSON.

use super::provider::{DataError, ScalarSource};
use serde::{Deserialize, Serialize};

/// Payload shape of a scalar endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScalarFormat {
    /// Body is a bare decimal number.
    Plain,
    /// `{"data":[{"value":"54", ...}]}`
    FearGreed,
}

#[derive(Debug, Deserialize)]
struct FearGreedResponse {
    data: Vec<FearGreedEntry>,
}

#[derive(Debug, Deserialize)]
struct FearGreedEntry {
    value: serde_json::Value,
}

/// Scalar source backed by one HTTP GET.
pub struct HttpScalarSource {
    name: String,
    url: String,
    format: ScalarFormat,
    scale: f64,
    client: reqwest::blocking::Client,
}

impl HttpScalarSource {
    pub fn new(
        name: impl Into<String>,
        url: impl Into<String>,
        format: ScalarFormat,
        scale: f64,
    ) -> Result<Self, DataError> {
        let client = reqwest::blocking::Client::builder()
            .build()
            .map_err(|e| DataError::Other(format!("failed to build HTTP client: {e}")))?;
        Ok(Self {
            name: name.into(),
            url: url.into(),
            format,
            scale,
            client,
        })
    }
}

/// Decode a response body according to `format`, then apply `scale`.
pub fn parse_scalar(body: &str, format: ScalarFormat, scale: f64) -> Result<f64, DataError> {
    let raw = match format {
        ScalarFormat::Plain => body.trim().parse::<f64>().map_err(|e| {
            DataError::ResponseFormatChanged(format!("expected a number, got {body:?}: {e}"))
        })?,
        ScalarFormat::FearGreed => {
            let resp: FearGreedResponse = serde_json::from_str(body).map_err(|e| {
                DataError::ResponseFormatChanged(format!("fear & greed payload: {e}"))
            })?;
            let entry = resp.data.into_iter().next().ok_or_else(|| {
                DataError::ResponseFormatChanged("fear & greed payload has no data".into())
            })?;
            // The index is published as a string; accept a bare number too
            match entry.value {
                serde_json::Value::String(s) => s.trim().parse::<f64>().map_err(|e| {
                    DataError::ResponseFormatChanged(format!("fear & greed value {s:?}: {e}"))
                })?,
                serde_json::Value::Number(n) => n.as_f64().ok_or_else(|| {
                    DataError::ResponseFormatChanged(format!("fear & greed value {n}"))
                })?,
                other => {
                    return Err(DataError::ResponseFormatChanged(format!(
                        "fear & greed value {other}"
                    )))
                }
            }
        }
    };

    let value = raw * scale;
    if !value.is_finite() {
        return Err(DataError::ResponseFormatChanged(format!(
            "non-finite value {value}"
        )));
    }
    Ok(value)
}

impl ScalarSource for HttpScalarSource {
    fn name(&self) -> &str {
        &self.name
    }

    fn fetch_latest(&self) -> Result<f64, DataError> {
        let resp = self
            .client
            .get(&self.url)
            .send()
            .map_err(|e| DataError::NetworkUnreachable(e.to_string()))?;

        let status = resp.status();
        if !status.is_success() {
            return Err(DataError::HttpStatus {
                source_name: self.name.clone(),
                status: status.as_u16(),
            });
        }

        let body = resp
            .text()
            .map_err(|e| DataError::NetworkUnreachable(e.to_string()))?;
        parse_scalar(&body, self.format, self.scale)
    }
}
