//! Configuration: JSON datasource list + CLI/env resolved dashboard settings.

#![allow(missing_docs)]

use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use chrono_tz::Tz;
use serde::{Deserialize, Serialize};

use crate::core::errors::{DashError, Result};
use crate::metrics::threshold::ColorPolicy;

/// Default datasource file, resolved relative to the working directory.
pub const DEFAULT_CONFIG_FILE: &str = "dashclock.json";
/// Default data-sync period in seconds.
pub const DEFAULT_REFRESH_SECS: u64 = 15;
/// Default display timezone.
pub const DEFAULT_TIMEZONE: &str = "Asia/Singapore";
/// Default number of grid steps in the chart window.
pub const DEFAULT_WINDOW_LEN: usize = 60;
/// Default grid step in seconds (one point per minute).
pub const DEFAULT_STEP_SECS: u64 = 60;
/// Upper bound for refresh and step: one day.
pub const MAX_PERIOD_SECS: u64 = 86_400;
/// Upper bound for the chart window; Prometheus caps a range query at 11000 points.
pub const MAX_WINDOW_LEN: usize = 10_000;

// ──────────────────── datasources ────────────────────

/// One metric source as configured in the JSON file.
///
/// Field names follow the on-disk format: `Query` and `prom` are mapped to
/// `query` and `endpoint`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DatasourceDescriptor {
    pub title: String,
    #[serde(rename = "Query")]
    pub query: String,
    #[serde(rename = "prom")]
    pub endpoint: String,
    #[serde(default)]
    pub unit: String,
    #[serde(rename = "warn", default)]
    pub warn_threshold: f64,
    #[serde(rename = "error", default)]
    pub error_threshold: f64,
}

impl DatasourceDescriptor {
    /// Thresholds apply only when a positive warn level is configured.
    #[must_use]
    pub fn thresholds_enabled(&self) -> bool {
        self.warn_threshold > 0.0
    }
}

/// Immutable, load-once ordered list of datasources.
///
/// Order defines the cycling order and the digit-key jump targets.
#[derive(Debug, Clone, PartialEq)]
pub struct DatasourceRegistry {
    sources: Vec<DatasourceDescriptor>,
}

impl DatasourceRegistry {
    /// Load and validate the datasource list from a JSON file.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(DashError::MissingConfig {
                path: path.to_path_buf(),
            });
        }
        let raw = fs::read_to_string(path).map_err(|source| DashError::io(path, source))?;
        let sources: Vec<DatasourceDescriptor> =
            serde_json::from_str(&raw).map_err(|e| DashError::ConfigParse {
                context: "datasource json",
                details: e.to_string(),
            })?;
        if sources.is_empty() {
            return Err(DashError::EmptyDatasources {
                path: path.to_path_buf(),
            });
        }
        Self::from_descriptors(sources)
    }

    /// Build a registry from already-parsed descriptors.
    pub fn from_descriptors(sources: Vec<DatasourceDescriptor>) -> Result<Self> {
        if sources.is_empty() {
            return Err(DashError::InvalidConfig {
                details: "datasource list is empty".to_string(),
            });
        }
        for (index, source) in sources.iter().enumerate() {
            if source.query.trim().is_empty() {
                return Err(DashError::InvalidConfig {
                    details: format!("datasource {index} ({:?}) has an empty Query", source.title),
                });
            }
            if source.endpoint.trim().is_empty() {
                return Err(DashError::InvalidConfig {
                    details: format!("datasource {index} ({:?}) has an empty prom", source.title),
                });
            }
        }
        Ok(Self { sources })
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.sources.len()
    }

    /// Always false for a successfully constructed registry.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.sources.is_empty()
    }

    #[must_use]
    pub fn get(&self, index: usize) -> Option<&DatasourceDescriptor> {
        self.sources.get(index)
    }

    pub fn iter(&self) -> impl Iterator<Item = &DatasourceDescriptor> {
        self.sources.iter()
    }

    /// Map any index onto `[0, len)`.
    #[must_use]
    pub fn wrap_index(&self, index: usize) -> usize {
        index % self.sources.len()
    }
}

// ──────────────────── settings ────────────────────

/// Number of grid steps drawn in the chart.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WindowLength {
    /// A fixed number of steps.
    Fixed(usize),
    /// Derive from the chart width (one point per column, minus axis gutter).
    Auto,
}

impl WindowLength {
    /// Gutter reserved for the y-axis when the window follows the chart width.
    pub const AUTO_GUTTER: usize = 8;

    /// Resolve against the terminal width.
    #[must_use]
    pub fn resolve(self, terminal_cols: u16) -> usize {
        match self {
            Self::Fixed(n) => n,
            Self::Auto => usize::from(terminal_cols)
                .saturating_sub(Self::AUTO_GUTTER)
                .clamp(1, MAX_WINDOW_LEN),
        }
    }
}

impl FromStr for WindowLength {
    type Err = DashError;

    fn from_str(raw: &str) -> Result<Self> {
        let raw = raw.trim();
        if raw.eq_ignore_ascii_case("auto") {
            return Ok(Self::Auto);
        }
        match raw.parse::<usize>() {
            Ok(0) | Err(_) => Err(DashError::InvalidConfig {
                details: format!("window must be a positive integer or 'auto', got {raw:?}"),
            }),
            Ok(n) => Ok(Self::Fixed(n)),
        }
    }
}

/// Raw, unvalidated settings as supplied on the command line.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SettingsInput {
    pub file: Option<PathBuf>,
    pub refresh_secs: Option<u64>,
    pub timezone: Option<String>,
    pub window: Option<String>,
    pub step_secs: Option<u64>,
    pub color_policy: Option<String>,
    pub log_file: Option<PathBuf>,
    pub test_mode: bool,
}

/// Fully resolved dashboard settings.
#[derive(Debug, Clone, PartialEq)]
pub struct DashboardSettings {
    pub file: PathBuf,
    pub refresh: Duration,
    pub timezone: Tz,
    pub window: WindowLength,
    pub step_secs: u64,
    pub color_policy: ColorPolicy,
    pub log_file: PathBuf,
    pub test_mode: bool,
}

impl DashboardSettings {
    /// Resolve settings with precedence CLI flag > environment > default.
    pub fn resolve(input: &SettingsInput) -> Result<Self> {
        Self::resolve_with(input, env_var)
    }

    /// Same as [`Self::resolve`] with an injectable environment lookup.
    pub fn resolve_with<F>(input: &SettingsInput, mut lookup: F) -> Result<Self>
    where
        F: FnMut(&str) -> Option<String>,
    {
        let file = input
            .file
            .clone()
            .or_else(|| lookup("DASHCLOCK_FILE").map(PathBuf::from))
            .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_FILE));

        let refresh_secs = match input.refresh_secs {
            Some(v) => v,
            None => match lookup("DASHCLOCK_REFRESH") {
                Some(raw) => parse_env_u64("DASHCLOCK_REFRESH", &raw)?,
                None => DEFAULT_REFRESH_SECS,
            },
        };

        let tz_name = input
            .timezone
            .clone()
            .or_else(|| lookup("DASHCLOCK_TIMEZONE"))
            .unwrap_or_else(|| DEFAULT_TIMEZONE.to_string());
        let timezone = parse_timezone(&tz_name)?;

        let window = match input
            .window
            .clone()
            .or_else(|| lookup("DASHCLOCK_WINDOW"))
        {
            Some(raw) => raw.parse::<WindowLength>()?,
            None => WindowLength::Fixed(DEFAULT_WINDOW_LEN),
        };

        let step_secs = match input.step_secs {
            Some(v) => v,
            None => match lookup("DASHCLOCK_STEP") {
                Some(raw) => parse_env_u64("DASHCLOCK_STEP", &raw)?,
                None => DEFAULT_STEP_SECS,
            },
        };

        let color_policy = match input.color_policy.as_deref() {
            Some(raw) => raw.parse::<ColorPolicy>()?,
            None => ColorPolicy::default(),
        };

        let log_file = input
            .log_file
            .clone()
            .or_else(|| lookup("DASHCLOCK_LOG_FILE").map(PathBuf::from))
            .unwrap_or_else(default_log_path);

        let settings = Self {
            file,
            refresh: Duration::from_secs(refresh_secs),
            timezone,
            window,
            step_secs,
            color_policy,
            log_file,
            test_mode: input.test_mode,
        };
        settings.validate()?;
        Ok(settings)
    }

    fn validate(&self) -> Result<()> {
        if self.refresh < Duration::from_secs(1) {
            return Err(DashError::InvalidConfig {
                details: "refresh must be at least 1 second".to_string(),
            });
        }
        if self.refresh > Duration::from_secs(MAX_PERIOD_SECS) {
            return Err(DashError::InvalidConfig {
                details: format!("refresh must be at most {MAX_PERIOD_SECS} seconds"),
            });
        }
        if self.step_secs == 0 {
            return Err(DashError::InvalidConfig {
                details: "step must be at least 1 second".to_string(),
            });
        }
        if self.step_secs > MAX_PERIOD_SECS {
            return Err(DashError::InvalidConfig {
                details: format!("step must be at most {MAX_PERIOD_SECS} seconds"),
            });
        }
        match self.window {
            WindowLength::Fixed(0) => Err(DashError::InvalidConfig {
                details: "window must contain at least one step".to_string(),
            }),
            WindowLength::Fixed(n) if n > MAX_WINDOW_LEN => Err(DashError::InvalidConfig {
                details: format!("window must be at most {MAX_WINDOW_LEN} steps, got {n}"),
            }),
            _ => Ok(()),
        }
    }
}

/// Parse an IANA timezone name.
pub fn parse_timezone(name: &str) -> Result<Tz> {
    name.parse::<Tz>()
        .map_err(|e| DashError::InvalidTimezone {
            name: name.to_string(),
            details: e.to_string(),
        })
}

fn default_log_path() -> PathBuf {
    env::temp_dir().join("dashclock.jsonl")
}

fn env_var(name: &str) -> Option<String> {
    env::var(name).ok().filter(|v| !v.trim().is_empty())
}

fn parse_env_u64(name: &str, raw: &str) -> Result<u64> {
    raw.trim().parse::<u64>().map_err(|e| DashError::InvalidConfig {
        details: format!("{name}={raw:?} is not a valid unsigned integer: {e}"),
    })
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::io::Write;

    use super::*;

    fn vars(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect()
    }

    fn write_config(contents: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        file
    }

    #[test]
    fn loads_descriptors_with_original_field_names() {
        let file = write_config(
            r#"[
                {"title": "CPU", "Query": "avg(rate(cpu[1m]))", "prom": "http://prom:9090",
                 "unit": "%", "warn": 70, "error": 90},
                {"title": "Temp", "Query": "temp_c", "prom": "http://prom:9090"}
            ]"#,
        );
        let registry = DatasourceRegistry::load(file.path()).unwrap();
        assert_eq!(registry.len(), 2);
        let cpu = registry.get(0).unwrap();
        assert_eq!(cpu.query, "avg(rate(cpu[1m]))");
        assert_eq!(cpu.endpoint, "http://prom:9090");
        assert!((cpu.warn_threshold - 70.0).abs() < f64::EPSILON);
        assert!((cpu.error_threshold - 90.0).abs() < f64::EPSILON);
        assert!(cpu.thresholds_enabled());

        let temp = registry.get(1).unwrap();
        assert_eq!(temp.unit, "");
        assert!(!temp.thresholds_enabled());
    }

    #[test]
    fn missing_file_is_reported() {
        let err = DatasourceRegistry::load(Path::new("/nonexistent/dashclock.json")).unwrap_err();
        assert_eq!(err.code(), "DCK-1002");
    }

    #[test]
    fn empty_array_is_rejected() {
        let file = write_config("[]");
        let err = DatasourceRegistry::load(file.path()).unwrap_err();
        assert_eq!(err.code(), "DCK-1004");
        assert!(err.is_fatal());
    }

    #[test]
    fn malformed_json_is_rejected() {
        let file = write_config(r#"[{"title": "x""#);
        let err = DatasourceRegistry::load(file.path()).unwrap_err();
        assert_eq!(err.code(), "DCK-1003");
    }

    #[test]
    fn empty_endpoint_is_rejected() {
        let file = write_config(r#"[{"title": "x", "Query": "up", "prom": " "}]"#);
        let err = DatasourceRegistry::load(file.path()).unwrap_err();
        assert_eq!(err.code(), "DCK-1001");
    }

    #[test]
    fn wrap_index_cycles() {
        let file = write_config(
            r#"[{"title": "a", "Query": "a", "prom": "http://p"},
                {"title": "b", "Query": "b", "prom": "http://p"},
                {"title": "c", "Query": "c", "prom": "http://p"}]"#,
        );
        let registry = DatasourceRegistry::load(file.path()).unwrap();
        assert_eq!(registry.wrap_index(3), 0);
        assert_eq!(registry.wrap_index(7), 1);
        assert_eq!(registry.iter().count(), 3);
    }

    #[test]
    fn defaults_resolve_without_flags_or_env() {
        let settings = DashboardSettings::resolve_with(&SettingsInput::default(), |_| None).unwrap();
        assert_eq!(settings.file, PathBuf::from(DEFAULT_CONFIG_FILE));
        assert_eq!(settings.refresh, Duration::from_secs(15));
        assert_eq!(settings.timezone, chrono_tz::Asia::Singapore);
        assert_eq!(settings.window, WindowLength::Fixed(60));
        assert_eq!(settings.step_secs, 60);
        assert_eq!(settings.color_policy, ColorPolicy::WorstInWindow);
        assert!(!settings.test_mode);
    }

    #[test]
    fn env_overrides_defaults_and_flags_override_env() {
        let env = vars(&[
            ("DASHCLOCK_REFRESH", "30"),
            ("DASHCLOCK_TIMEZONE", "Europe/Berlin"),
            ("DASHCLOCK_WINDOW", "auto"),
        ]);
        let input = SettingsInput {
            refresh_secs: Some(5),
            ..SettingsInput::default()
        };
        let settings = DashboardSettings::resolve_with(&input, |k| env.get(k).cloned()).unwrap();
        assert_eq!(settings.refresh, Duration::from_secs(5));
        assert_eq!(settings.timezone, chrono_tz::Europe::Berlin);
        assert_eq!(settings.window, WindowLength::Auto);
    }

    #[test]
    fn invalid_timezone_is_fatal() {
        let input = SettingsInput {
            timezone: Some("Mars/Olympus_Mons".to_string()),
            ..SettingsInput::default()
        };
        let err = DashboardSettings::resolve_with(&input, |_| None).unwrap_err();
        assert_eq!(err.code(), "DCK-1005");
        assert!(err.is_fatal());
    }

    #[test]
    fn zero_refresh_rejected() {
        let input = SettingsInput {
            refresh_secs: Some(0),
            ..SettingsInput::default()
        };
        assert!(DashboardSettings::resolve_with(&input, |_| None).is_err());
    }

    #[test]
    fn out_of_range_periods_and_window_rejected() {
        let cases = [
            SettingsInput {
                refresh_secs: Some(u64::MAX),
                ..SettingsInput::default()
            },
            SettingsInput {
                step_secs: Some(10_000_000_000_000_000),
                ..SettingsInput::default()
            },
            SettingsInput {
                window: Some("10001".to_string()),
                ..SettingsInput::default()
            },
        ];
        for input in &cases {
            let err = DashboardSettings::resolve_with(input, |_| None).unwrap_err();
            assert_eq!(err.code(), "DCK-1001", "{input:?}");
        }

        let edge = SettingsInput {
            refresh_secs: Some(MAX_PERIOD_SECS),
            step_secs: Some(MAX_PERIOD_SECS),
            window: Some(MAX_WINDOW_LEN.to_string()),
            ..SettingsInput::default()
        };
        assert!(DashboardSettings::resolve_with(&edge, |_| None).is_ok());
    }

    #[test]
    fn invalid_env_integer_rejected() {
        let env = vars(&[("DASHCLOCK_STEP", "soon")]);
        let err =
            DashboardSettings::resolve_with(&SettingsInput::default(), |k| env.get(k).cloned())
                .unwrap_err();
        assert!(err.to_string().contains("DASHCLOCK_STEP"));
    }

    #[test]
    fn window_length_parsing() {
        assert_eq!("auto".parse::<WindowLength>().unwrap(), WindowLength::Auto);
        assert_eq!("AUTO".parse::<WindowLength>().unwrap(), WindowLength::Auto);
        assert_eq!(
            "120".parse::<WindowLength>().unwrap(),
            WindowLength::Fixed(120)
        );
        assert!("0".parse::<WindowLength>().is_err());
        assert!("-3".parse::<WindowLength>().is_err());
    }

    #[test]
    fn auto_window_follows_terminal_width() {
        assert_eq!(WindowLength::Auto.resolve(240), 232);
        assert_eq!(WindowLength::Auto.resolve(4), 1);
        assert_eq!(WindowLength::Auto.resolve(u16::MAX), MAX_WINDOW_LEN);
        assert_eq!(WindowLength::Fixed(60).resolve(240), 60);
    }
}
