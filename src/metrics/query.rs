//! Range-query construction and fixed-grid alignment.
//!
//! [`QueryEngine::fetch_range`] asks the backend for `window_len` steps ending
//! at "now" (rounded to the second) and maps the answer onto a grid of exactly
//! `window_len + 1` points, oldest first. Grid points without a sample at the
//! exact timestamp carry [`SENTINEL`].

#![allow(missing_docs)]

use std::collections::HashMap;
use std::time::Duration;

use chrono::{DateTime, SubsecRound, TimeDelta, Utc};
use chrono_tz::Tz;

use crate::core::errors::{DashError, Result};
use crate::metrics::backend::{QueryData, QueryRange, RangeBackend, SampleStream};

/// Marker for "no sample at this grid point". Outside any plausible metric domain.
pub const SENTINEL: f64 = -999.0;

/// True when a grid value is the missing-data marker.
#[must_use]
pub fn is_sentinel(value: f64) -> bool {
    value == SENTINEL
}

// ──────────────────── aligned series ────────────────────

/// One grid point: value (or [`SENTINEL`]) and its `HH:MM` display label.
#[derive(Debug, Clone, PartialEq)]
pub struct AlignedPoint {
    pub value: f64,
    pub label: String,
}

/// Fixed-length, oldest-first series. Empty means the fetch failed.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AlignedSeries {
    points: Vec<AlignedPoint>,
}

impl AlignedSeries {
    /// The empty series signalling a failed fetch.
    #[must_use]
    pub fn empty() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn from_points(points: Vec<AlignedPoint>) -> Self {
        Self { points }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.points.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    #[must_use]
    pub fn points(&self) -> &[AlignedPoint] {
        &self.points
    }

    pub fn values(&self) -> impl Iterator<Item = f64> + '_ {
        self.points.iter().map(|p| p.value)
    }

    pub fn labels(&self) -> impl Iterator<Item = &str> + '_ {
        self.points.iter().map(|p| p.label.as_str())
    }

    /// Most recent value (may be [`SENTINEL`]).
    #[must_use]
    pub fn last_value(&self) -> Option<f64> {
        self.points.last().map(|p| p.value)
    }

    #[must_use]
    pub fn missing_count(&self) -> usize {
        self.points.iter().filter(|p| is_sentinel(p.value)).count()
    }
}

// ──────────────────── range construction ────────────────────

/// Build `[end - window_len*step, end]` with `end = round(now, 1s)`.
///
/// Spans beyond what chrono can represent saturate at the earliest instant.
#[must_use]
pub fn build_range(now: DateTime<Utc>, window_len: usize, step_secs: u64) -> QueryRange {
    let end = now.round_subsecs(0);
    let start = grid_offset(step_delta(step_secs), window_len)
        .and_then(|span| end.checked_sub_signed(span))
        .unwrap_or(DateTime::<Utc>::MIN_UTC);
    QueryRange {
        start,
        end,
        step: Duration::from_secs(step_secs),
    }
}

fn step_delta(step_secs: u64) -> TimeDelta {
    i64::try_from(step_secs)
        .ok()
        .and_then(TimeDelta::try_seconds)
        .unwrap_or(TimeDelta::MAX)
}

/// `step * steps`, or `None` on overflow.
fn grid_offset(step: TimeDelta, steps: usize) -> Option<TimeDelta> {
    i32::try_from(steps).ok().and_then(|n| step.checked_mul(n))
}

/// Map one series onto the grid ending at `range.end`.
///
/// Samples are indexed by timestamp first so alignment stays linear in
/// `window_len + samples`.
#[must_use]
pub fn align(stream: Option<&SampleStream>, range: &QueryRange, window_len: usize, tz: Tz) -> AlignedSeries {
    let by_timestamp: HashMap<i64, f64> = stream
        .map(|s| {
            s.samples
                .iter()
                .map(|sample| (sample.timestamp_ms, sample.value))
                .collect()
        })
        .unwrap_or_default();

    let step = TimeDelta::from_std(range.step).unwrap_or(TimeDelta::zero());
    let points = (0..=window_len)
        .rev()
        .map(|i| {
            let at = grid_offset(step, i)
                .and_then(|offset| range.end.checked_sub_signed(offset))
                .unwrap_or(range.start);
            let value = by_timestamp
                .get(&at.timestamp_millis())
                .copied()
                .unwrap_or(SENTINEL);
            AlignedPoint {
                value,
                label: at.with_timezone(&tz).format("%H:%M").to_string(),
            }
        })
        .collect();
    AlignedSeries { points }
}

// ──────────────────── engine ────────────────────

/// Result of a range fetch that distinguishes recoverable failure.
#[derive(Debug)]
pub enum RangeFetch {
    Aligned(AlignedSeries),
    /// Transport/API/timeout failure; render an error state and retry later.
    Unavailable(DashError),
}

impl RangeFetch {
    /// Collapse to the series, using the empty series for failures.
    #[must_use]
    pub fn into_series(self) -> AlignedSeries {
        match self {
            Self::Aligned(series) => series,
            Self::Unavailable(_) => AlignedSeries::empty(),
        }
    }
}

/// Builds range queries, calls the backend and aligns the answer.
pub struct QueryEngine {
    backend: Box<dyn RangeBackend>,
}

impl QueryEngine {
    #[must_use]
    pub fn new(backend: Box<dyn RangeBackend>) -> Self {
        Self { backend }
    }

    /// Fetch and align; recoverable failures yield an empty series.
    ///
    /// # Errors
    /// Fatal conditions only: the endpoint cannot be turned into a client, or
    /// the query returned anything other than a single-series matrix.
    pub fn fetch_range(
        &self,
        endpoint: &str,
        query: &str,
        window_len: usize,
        step_secs: u64,
        now: DateTime<Utc>,
        tz: Tz,
    ) -> Result<AlignedSeries> {
        self.fetch_range_detailed(endpoint, query, window_len, step_secs, now, tz)
            .map(RangeFetch::into_series)
    }

    /// Like [`Self::fetch_range`] but keeps the reason for a recoverable failure.
    pub fn fetch_range_detailed(
        &self,
        endpoint: &str,
        query: &str,
        window_len: usize,
        step_secs: u64,
        now: DateTime<Utc>,
        tz: Tz,
    ) -> Result<RangeFetch> {
        let range = build_range(now, window_len, step_secs);
        let data = match self.backend.query_range(endpoint, query, &range) {
            Ok(data) => data,
            Err(err) if err.is_fatal() => return Err(err),
            Err(err) => return Ok(RangeFetch::Unavailable(err)),
        };

        match data {
            QueryData::Matrix(streams) if streams.len() <= 1 => Ok(RangeFetch::Aligned(align(
                streams.first(),
                &range,
                window_len,
                tz,
            ))),
            QueryData::Matrix(streams) => Err(DashError::UnsupportedResultShape {
                query: query.to_string(),
                shape: format!("matrix with {} series", streams.len()),
            }),
            other => Err(DashError::UnsupportedResultShape {
                query: query.to_string(),
                shape: other.shape().to_string(),
            }),
        }
    }
}
