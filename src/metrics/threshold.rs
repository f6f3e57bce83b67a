//! Threshold-driven severity classification of an aligned series.
//!
//! Produces the chart line severity (scan over the whole window) and the
//! status level of the most recent value. An empty series means the fetch
//! failed and is reported as a source error instead.

#![allow(missing_docs)]

use std::str::FromStr;

use crate::core::config::DatasourceDescriptor;
use crate::core::errors::DashError;
use crate::metrics::query::{AlignedSeries, is_sentinel};

/// Line classification, ordered by strength.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Severity {
    #[default]
    Neutral,
    Warn,
    Error,
    Missing,
}

impl Severity {
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Neutral => "neutral",
            Self::Warn => "warn",
            Self::Error => "error",
            Self::Missing => "missing",
        }
    }
}

/// Classification of the most recent value.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum StatusLevel {
    #[default]
    Neutral,
    Warn,
    Error,
}

/// How the line severity is accumulated across the window.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ColorPolicy {
    /// Strongest classification anywhere in the window wins
    /// (missing > error > warn > neutral).
    #[default]
    WorstInWindow,
    /// Order-dependent single pass kept for parity with older deployments:
    /// a warn point only escalates a still-neutral line, while missing and
    /// error points overwrite whatever was recorded before them.
    Historical,
}

impl FromStr for ColorPolicy {
    type Err = DashError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "worst" | "worst-in-window" => Ok(Self::WorstInWindow),
            "historical" | "legacy" => Ok(Self::Historical),
            other => Err(DashError::InvalidConfig {
                details: format!("unknown color policy {other:?} (expected worst|historical)"),
            }),
        }
    }
}

/// Warn/error levels for one source; disabled when `warn <= 0`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Thresholds {
    pub warn: f64,
    pub error: f64,
}

impl Thresholds {
    #[must_use]
    pub const fn new(warn: f64, error: f64) -> Self {
        Self { warn, error }
    }

    #[must_use]
    pub fn from_descriptor(descriptor: &DatasourceDescriptor) -> Self {
        Self::new(descriptor.warn_threshold, descriptor.error_threshold)
    }

    #[must_use]
    pub fn enabled(self) -> bool {
        self.warn > 0.0
    }
}

/// Outcome handed to the renderer for the datasource panel.
#[derive(Debug, Clone, PartialEq)]
pub enum PanelStatus {
    Colored {
        line: Severity,
        status: StatusLevel,
        latest: f64,
    },
    SourceError {
        title: String,
        endpoint: String,
    },
}

/// Line severity for a window of values.
#[must_use]
pub fn line_severity<I>(values: I, thresholds: Thresholds, policy: ColorPolicy) -> Severity
where
    I: IntoIterator<Item = f64>,
{
    if !thresholds.enabled() {
        return Severity::Neutral;
    }
    match policy {
        ColorPolicy::WorstInWindow => values
            .into_iter()
            .map(|v| point_severity(v, thresholds))
            .max()
            .unwrap_or_default(),
        ColorPolicy::Historical => {
            let mut line = Severity::Neutral;
            for v in values {
                if v > thresholds.warn && line == Severity::Neutral {
                    line = Severity::Warn;
                } else if is_sentinel(v) {
                    line = Severity::Missing;
                } else if v > thresholds.error {
                    line = Severity::Error;
                }
            }
            line
        }
    }
}

fn point_severity(value: f64, thresholds: Thresholds) -> Severity {
    if is_sentinel(value) {
        Severity::Missing
    } else if value > thresholds.error {
        Severity::Error
    } else if value > thresholds.warn {
        Severity::Warn
    } else {
        Severity::Neutral
    }
}

/// Status level of the last value. Negative values count as errors.
#[must_use]
pub fn status_level(last: f64, thresholds: Thresholds) -> StatusLevel {
    if !thresholds.enabled() {
        return StatusLevel::Neutral;
    }
    if last > thresholds.error || last < 0.0 {
        StatusLevel::Error
    } else if last > thresholds.warn {
        StatusLevel::Warn
    } else {
        StatusLevel::Neutral
    }
}

/// Classify a fetched series for display.
#[must_use]
pub fn classify(
    series: &AlignedSeries,
    descriptor: &DatasourceDescriptor,
    policy: ColorPolicy,
) -> PanelStatus {
    let Some(latest) = series.last_value() else {
        return PanelStatus::SourceError {
            title: descriptor.title.clone(),
            endpoint: descriptor.endpoint.clone(),
        };
    };
    let thresholds = Thresholds::from_descriptor(descriptor);
    PanelStatus::Colored {
        line: line_severity(series.values(), thresholds, policy),
        status: status_level(latest, thresholds),
        latest,
    }
}
