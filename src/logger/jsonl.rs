//! Line-delimited JSON activity log.
//!
//! One object per line, serialized up front and appended with one
//! `write_all`. When the active file cannot be written the writer moves down
//! [`SinkStage`]s (primary, fallback, optional stderr, discard) and never
//! reports an error to the caller.

#![allow(missing_docs)]

use std::fs::{self, File, OpenOptions};
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};

use crate::core::errors::{DashError, Result};

/// Severity level for log events.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Info,
    Warning,
    Critical,
}

/// Log event types emitted by the dashboard.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventType {
    DashboardStart,
    DashboardStop,
    LayoutChange,
    SourceFetch,
    SourceError,
    SchedulerFault,
    Error,
}

/// A single JSONL log entry. All fields are optional except `ts`, `event`, `severity`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogEntry {
    /// ISO 8601 UTC timestamp.
    pub ts: String,
    pub event: EventType,
    pub severity: Severity,
    /// Datasource position in the configured list.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source_index: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub endpoint: Option<String>,
    /// Number of grid points produced by the fetch.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub points: Option<usize>,
    /// Number of grid points filled with the missing-data marker.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub missing: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration_ms: Option<u64>,
    /// Layout profile label.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub profile: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cols: Option<u16>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rows: Option<u16>,
    /// DCK error code if the action failed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_code: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

impl LogEntry {
    /// Create a new entry stamped with the current UTC time.
    pub fn new(event: EventType, severity: Severity) -> Self {
        Self {
            ts: format_utc_now(),
            event,
            severity,
            source_index: None,
            title: None,
            endpoint: None,
            points: None,
            missing: None,
            duration_ms: None,
            profile: None,
            cols: None,
            rows: None,
            error_code: None,
            error_message: None,
            details: None,
        }
    }
}

/// Where log lines currently land, in degradation order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum SinkStage {
    Primary,
    Fallback,
    Stderr,
    Discard,
}

impl SinkStage {
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Primary => "normal",
            Self::Fallback => "fallback",
            Self::Stderr => "stderr",
            Self::Discard => "discard",
        }
    }
}

/// Configuration for the JSONL writer.
#[derive(Debug, Clone)]
pub struct JsonlConfig {
    pub path: PathBuf,
    pub fallback_path: Option<PathBuf>,
    /// Size at which the active file is rotated (bytes).
    pub max_size_bytes: u64,
    pub max_rotated_files: u32,
    pub fsync_interval_secs: u64,
    /// Allow stderr as the last stage before discarding. Must stay off while
    /// the dashboard owns the terminal.
    pub stderr_fallback: bool,
}

impl Default for JsonlConfig {
    fn default() -> Self {
        Self {
            path: std::env::temp_dir().join("dashclock.jsonl"),
            fallback_path: None,
            max_size_bytes: 4 * 1024 * 1024,
            max_rotated_files: 2,
            fsync_interval_secs: 30,
            stderr_fallback: false,
        }
    }
}

impl JsonlConfig {
    fn file_for(&self, stage: SinkStage) -> Option<&Path> {
        match stage {
            SinkStage::Primary => Some(&self.path),
            SinkStage::Fallback => self.fallback_path.as_deref(),
            SinkStage::Stderr | SinkStage::Discard => None,
        }
    }
}

struct OpenFile {
    path: PathBuf,
    out: BufWriter<File>,
    len: u64,
}

enum Sink {
    File(SinkStage, OpenFile),
    Stderr,
    Discard,
}

/// Append-only JSONL writer that rotates by size and degrades instead of failing.
pub struct JsonlWriter {
    config: JsonlConfig,
    sink: Sink,
    synced_at: Instant,
}

impl JsonlWriter {
    /// Open the first usable stage, starting at the primary path.
    pub fn open(config: JsonlConfig) -> Self {
        let sink = open_from(&config, SinkStage::Primary);
        Self {
            config,
            sink,
            synced_at: Instant::now(),
        }
    }

    /// Serialize `entry` and append it as one line.
    pub fn write_entry(&mut self, entry: &LogEntry) {
        if let Ok(mut line) = serde_json::to_string(entry) {
            line.push('\n');
            self.append(line.as_bytes());
        }
    }

    pub fn flush(&mut self) {
        if let Sink::File(_, file) = &mut self.sink {
            let _ = file.out.flush();
        }
    }

    /// Flush and `sync_data` the active file.
    pub fn fsync(&mut self) {
        if let Sink::File(_, file) = &mut self.sink {
            let _ = file.out.flush();
            let _ = file.out.get_ref().sync_data();
        }
        self.synced_at = Instant::now();
    }

    #[must_use]
    pub const fn stage(&self) -> SinkStage {
        match &self.sink {
            Sink::File(stage, _) => *stage,
            Sink::Stderr => SinkStage::Stderr,
            Sink::Discard => SinkStage::Discard,
        }
    }

    /// Label of the current stage: "normal", "fallback", "stderr" or "discard".
    #[must_use]
    pub const fn state(&self) -> &'static str {
        self.stage().label()
    }

    fn append(&mut self, line: &[u8]) {
        let size = line.len() as u64;
        loop {
            match &mut self.sink {
                Sink::File(stage, file) => {
                    if file.len > 0 && file.len + size > self.config.max_size_bytes {
                        let stage = *stage;
                        self.rotate(stage);
                        continue;
                    }
                    if file.out.write_all(line).is_ok() {
                        file.len += size;
                        break;
                    }
                    let next = next_stage(*stage);
                    self.sink = open_from(&self.config, next);
                }
                Sink::Stderr => {
                    let mut err = io::stderr().lock();
                    let _ = err.write_all(b"[DCK-JSONL] ");
                    let _ = err.write_all(line);
                    break;
                }
                Sink::Discard => break,
            }
        }
        if self.synced_at.elapsed() >= Duration::from_secs(self.config.fsync_interval_secs) {
            self.fsync();
        }
    }

    /// Shift `path.1..` up by one, move the active file to `path.1` and reopen.
    fn rotate(&mut self, stage: SinkStage) {
        let Sink::File(_, mut file) = std::mem::replace(&mut self.sink, Sink::Discard) else {
            return;
        };
        let _ = file.out.flush();
        let base = file.path;
        drop(file.out);

        let keep = self.config.max_rotated_files.max(1);
        let _ = fs::remove_file(rotated_name(&base, keep));
        for i in (1..keep).rev() {
            let _ = fs::rename(rotated_name(&base, i), rotated_name(&base, i + 1));
        }
        let _ = fs::rename(&base, rotated_name(&base, 1));

        self.sink = match open_append(&base) {
            Ok(file) => Sink::File(stage, file),
            Err(_) => open_from(&self.config, next_stage(stage)),
        };
    }
}

const fn next_stage(stage: SinkStage) -> SinkStage {
    match stage {
        SinkStage::Primary => SinkStage::Fallback,
        SinkStage::Fallback => SinkStage::Stderr,
        SinkStage::Stderr | SinkStage::Discard => SinkStage::Discard,
    }
}

/// First stage at or after `from` that can actually take writes.
fn open_from(config: &JsonlConfig, from: SinkStage) -> Sink {
    for stage in [SinkStage::Primary, SinkStage::Fallback] {
        if stage < from {
            continue;
        }
        if let Some(path) = config.file_for(stage)
            && let Ok(file) = open_append(path)
        {
            return Sink::File(stage, file);
        }
    }
    if config.stderr_fallback && from <= SinkStage::Stderr {
        Sink::Stderr
    } else {
        Sink::Discard
    }
}

// ──────────────────────── helpers ────────────────────────

fn open_append(path: &Path) -> Result<OpenFile> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(|source| DashError::io(parent, source))?;
    }
    let handle = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .map_err(|source| DashError::io(path, source))?;
    let len = handle.metadata().map_or(0, |m| m.len());
    Ok(OpenFile {
        path: path.to_path_buf(),
        out: BufWriter::new(handle),
        len,
    })
}

/// `dashclock.jsonl` -> `dashclock.jsonl.2`.
fn rotated_name(base: &Path, index: u32) -> PathBuf {
    let mut name = base.as_os_str().to_owned();
    name.push(format!(".{index}"));
    PathBuf::from(name)
}

fn format_utc_now() -> String {
    chrono::Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Millis, true)
}
