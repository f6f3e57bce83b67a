//! Metrics backend seam: range-query trait plus the Prometheus HTTP client.
//!
//! The query engine only depends on [`RangeBackend`]; the HTTP implementation
//! talks to the Prometheus `/api/v1/query_range` endpoint with a blocking
//! `reqwest` client so it can run directly inside a scheduler task body.

#![allow(missing_docs)]

use std::collections::BTreeMap;
use std::time::Duration;

use chrono::{DateTime, Utc};
use reqwest::Url;
use reqwest::blocking::Client;
use serde::Deserialize;

use crate::core::errors::{DashError, Result};

/// Overall budget for one range query, connection setup included.
pub const OVERALL_TIMEOUT: Duration = Duration::from_secs(10);
/// Server-side evaluation budget passed along with each query.
pub const PER_CALL_TIMEOUT: Duration = Duration::from_secs(5);

// ──────────────────── wire-independent types ────────────────────

/// Parameters of a range query: `[start, end]` at fixed `step`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QueryRange {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub step: Duration,
}

/// A single `(timestamp, value)` sample as returned by the backend.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Sample {
    /// Milliseconds since the Unix epoch (UTC).
    pub timestamp_ms: i64,
    pub value: f64,
}

/// One logical series: label set plus ordered samples (may be sparse).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SampleStream {
    pub labels: BTreeMap<String, String>,
    pub samples: Vec<Sample>,
}

/// Decoded query result, tagged by the shape the backend reported.
#[derive(Debug, Clone, PartialEq)]
pub enum QueryData {
    Matrix(Vec<SampleStream>),
    Vector { series: usize },
    Scalar,
    String,
}

impl QueryData {
    #[must_use]
    pub const fn shape(&self) -> &'static str {
        match self {
            Self::Matrix(_) => "matrix",
            Self::Vector { .. } => "vector",
            Self::Scalar => "scalar",
            Self::String => "string",
        }
    }
}

/// Anything that can answer a range query for an endpoint.
///
/// Implementations must return [`DashError::InvalidEndpoint`] when the endpoint
/// cannot be turned into a client (fatal), and [`DashError::Backend`] for
/// transport, timeout and API failures (recoverable).
pub trait RangeBackend: Send + Sync {
    fn query_range(&self, endpoint: &str, query: &str, range: &QueryRange) -> Result<QueryData>;
}

// ──────────────────── prometheus http client ────────────────────

/// Blocking Prometheus HTTP API client.
pub struct PrometheusBackend {
    client: Client,
    query_timeout: Duration,
}

impl PrometheusBackend {
    /// Build the shared HTTP client with the default timeouts.
    pub fn new() -> Result<Self> {
        Self::with_timeouts(OVERALL_TIMEOUT, PER_CALL_TIMEOUT)
    }

    pub fn with_timeouts(overall: Duration, per_call: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(overall)
            .user_agent(concat!("dashclock/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| DashError::Runtime {
                details: format!("failed to build HTTP client: {e}"),
            })?;
        Ok(Self {
            client,
            query_timeout: per_call,
        })
    }
}

impl RangeBackend for PrometheusBackend {
    fn query_range(&self, endpoint: &str, query: &str, range: &QueryRange) -> Result<QueryData> {
        let url = query_range_url(endpoint)?;
        let params = [
            ("query", query.to_string()),
            ("start", unix_seconds(range.start)),
            ("end", unix_seconds(range.end)),
            ("step", format!("{}", range.step.as_secs().max(1))),
            ("timeout", format!("{}s", self.query_timeout.as_secs().max(1))),
        ];

        let response = self
            .client
            .get(url)
            .query(&params)
            .send()
            .map_err(|e| transport_error(endpoint, &e))?;
        let status = response.status();
        let body: ApiResponse = response.json().map_err(|e| DashError::Backend {
            endpoint: endpoint.to_string(),
            details: format!("HTTP {status}: undecodable response body: {e}"),
        })?;
        decode_response(endpoint, body)
    }
}

/// Validate the endpoint and build the `query_range` URL under it.
pub fn query_range_url(endpoint: &str) -> Result<Url> {
    let invalid = |details: String| DashError::InvalidEndpoint {
        endpoint: endpoint.to_string(),
        details,
    };
    let base = Url::parse(endpoint.trim()).map_err(|e| invalid(e.to_string()))?;
    if !matches!(base.scheme(), "http" | "https") {
        return Err(invalid(format!("unsupported scheme {:?}", base.scheme())));
    }
    if base.host_str().is_none() {
        return Err(invalid("missing host".to_string()));
    }
    let joined = format!(
        "{}/api/v1/query_range",
        base.as_str().trim_end_matches('/')
    );
    Url::parse(&joined).map_err(|e| invalid(e.to_string()))
}

fn transport_error(endpoint: &str, err: &reqwest::Error) -> DashError {
    let details = if err.is_timeout() {
        format!("timed out after {}s", OVERALL_TIMEOUT.as_secs())
    } else if err.is_connect() {
        format!("connection failed: {err}")
    } else {
        err.to_string()
    };
    DashError::Backend {
        endpoint: endpoint.to_string(),
        details,
    }
}

#[allow(clippy::cast_precision_loss)]
fn unix_seconds(at: DateTime<Utc>) -> String {
    format!("{:.3}", at.timestamp_millis() as f64 / 1000.0)
}

// ──────────────────── response decoding ────────────────────

#[derive(Debug, Deserialize)]
pub struct ApiResponse {
    status: String,
    #[serde(default)]
    data: Option<ApiData>,
    #[serde(rename = "errorType", default)]
    error_type: Option<String>,
    #[serde(default)]
    error: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ApiData {
    result_type: String,
    #[serde(default)]
    result: serde_json::Value,
}

#[derive(Debug, Deserialize)]
struct MatrixEntry {
    #[serde(default)]
    metric: BTreeMap<String, String>,
    #[serde(default)]
    values: Vec<(f64, String)>,
}

/// Turn a decoded API envelope into [`QueryData`].
pub fn decode_response(endpoint: &str, body: ApiResponse) -> Result<QueryData> {
    let backend = |details: String| DashError::Backend {
        endpoint: endpoint.to_string(),
        details,
    };

    if body.status != "success" {
        return Err(backend(format!(
            "{}: {}",
            body.error_type.as_deref().unwrap_or("error"),
            body.error.as_deref().unwrap_or("unknown backend error")
        )));
    }
    let data = body
        .data
        .ok_or_else(|| backend("success response without data".to_string()))?;

    match data.result_type.as_str() {
        "matrix" => {
            let entries: Vec<MatrixEntry> = serde_json::from_value(data.result)
                .map_err(|e| backend(format!("malformed matrix: {e}")))?;
            let streams = entries
                .into_iter()
                .map(|entry| SampleStream {
                    labels: entry.metric,
                    samples: entry
                        .values
                        .into_iter()
                        .filter_map(|(ts, raw)| {
                            raw.parse::<f64>().ok().map(|value| Sample {
                                timestamp_ms: seconds_to_millis(ts),
                                value,
                            })
                        })
                        .collect(),
                })
                .collect();
            Ok(QueryData::Matrix(streams))
        }
        "vector" => Ok(QueryData::Vector {
            series: data.result.as_array().map_or(0, Vec::len),
        }),
        "scalar" => Ok(QueryData::Scalar),
        "string" => Ok(QueryData::String),
        other => Err(backend(format!("unknown result type {other:?}"))),
    }
}

#[allow(clippy::cast_possible_truncation)]
fn seconds_to_millis(ts: f64) -> i64 {
    (ts * 1000.0).round() as i64
}
