//! Activity logger thread: owns the `JsonlWriter`, fed by a bounded channel.
//!
//! The render loop and the scheduler worker send `ActivityEvent` through
//! `try_send()`, so neither is ever blocked by logging back-pressure.

#![allow(missing_docs)]

use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::thread;

use crossbeam_channel::{Receiver, Sender, TrySendError, bounded};

use crate::core::errors::{DashError, Result};
use crate::logger::jsonl::{EventType, JsonlConfig, JsonlWriter, LogEntry, Severity};

const CHANNEL_CAPACITY: usize = 256;

/// Events emitted by the dashboard.
#[derive(Debug, Clone)]
pub enum ActivityEvent {
    DashboardStarted {
        version: String,
        sources: usize,
        refresh_secs: u64,
    },
    DashboardStopped {
        reason: String,
        uptime_secs: u64,
    },
    LayoutChanged {
        profile: String,
        cols: u16,
        rows: u16,
    },
    SourceFetched {
        index: usize,
        title: String,
        points: usize,
        missing: usize,
        duration_ms: u64,
    },
    SourceFailed {
        index: usize,
        title: String,
        endpoint: String,
        error_code: String,
        error_message: String,
    },
    SchedulerFault {
        task: String,
        error_code: String,
        error_message: String,
    },
    Error {
        code: String,
        message: String,
    },
    /// Sentinel to request graceful shutdown of the logger thread.
    Shutdown,
}

/// Cheaply-cloneable handle for sending log events.
#[derive(Clone)]
pub struct ActivityLoggerHandle {
    tx: Sender<ActivityEvent>,
    dropped_events: Arc<AtomicU64>,
}

impl ActivityLoggerHandle {
    /// Send an event to the logger thread. Non-blocking; drops on a full channel.
    pub fn send(&self, event: ActivityEvent) {
        if let Err(TrySendError::Full(_)) = self.tx.try_send(event) {
            self.dropped_events.fetch_add(1, Ordering::Relaxed);
        }
        // Disconnected is fine during shutdown.
    }

    /// Number of events dropped due to channel back-pressure.
    pub fn dropped_events(&self) -> u64 {
        self.dropped_events.load(Ordering::Relaxed)
    }

    /// Ask the logger thread to flush and exit.
    pub fn shutdown(&self) {
        let _ = self.tx.send(ActivityEvent::Shutdown);
    }

    /// A handle with no thread behind it; every event is discarded.
    ///
    /// Used by tests and by callers that run pieces of the pipeline standalone.
    pub fn detached() -> Self {
        let (tx, _rx) = bounded(1);
        Self {
            tx,
            dropped_events: Arc::new(AtomicU64::new(0)),
        }
    }

    /// A handle whose events land in the returned receiver.
    #[cfg(test)]
    pub(crate) fn capturing(capacity: usize) -> (Self, Receiver<ActivityEvent>) {
        let (tx, rx) = bounded(capacity);
        let handle = Self {
            tx,
            dropped_events: Arc::new(AtomicU64::new(0)),
        };
        (handle, rx)
    }
}

/// Options for the logger thread.
pub struct LoggerConfig {
    pub jsonl_config: JsonlConfig,
    pub channel_capacity: usize,
}

impl LoggerConfig {
    /// Log to `path`, rotating alongside it, never falling back to stderr.
    pub fn for_path(path: PathBuf) -> Self {
        Self {
            jsonl_config: JsonlConfig {
                path,
                ..JsonlConfig::default()
            },
            channel_capacity: CHANNEL_CAPACITY,
        }
    }
}

impl Default for LoggerConfig {
    fn default() -> Self {
        Self {
            jsonl_config: JsonlConfig::default(),
            channel_capacity: CHANNEL_CAPACITY,
        }
    }
}

/// Spawn the logger thread and return a handle plus its join handle.
///
/// The thread runs until `handle.shutdown()` is called or all senders are dropped.
pub fn spawn_logger(config: LoggerConfig) -> Result<(ActivityLoggerHandle, thread::JoinHandle<()>)> {
    let (tx, rx) = bounded::<ActivityEvent>(config.channel_capacity.max(1));
    let dropped = Arc::new(AtomicU64::new(0));
    let dropped_clone = Arc::clone(&dropped);

    let handle = ActivityLoggerHandle {
        tx,
        dropped_events: dropped,
    };

    let join = thread::Builder::new()
        .name("dashclock-logger".to_string())
        .spawn(move || logger_thread_main(&rx, config.jsonl_config, &dropped_clone))
        .map_err(|e| DashError::Runtime {
            details: format!("failed to spawn logger thread: {e}"),
        })?;

    Ok((handle, join))
}

fn logger_thread_main(rx: &Receiver<ActivityEvent>, jsonl_config: JsonlConfig, dropped: &AtomicU64) {
    let mut jsonl = JsonlWriter::open(jsonl_config);

    while let Ok(event) = rx.recv() {
        let d = dropped.swap(0, Ordering::Relaxed);
        if d > 0 {
            let mut warn = LogEntry::new(EventType::Error, Severity::Warning);
            warn.details = Some(format!("{d} log events dropped due to back-pressure"));
            jsonl.write_entry(&warn);
        }

        if matches!(event, ActivityEvent::Shutdown) {
            break;
        }
        jsonl.write_entry(&event_to_log_entry(&event));
        // The dashboard logs rarely; flushing per event keeps `tail -f` useful.
        jsonl.flush();
    }

    jsonl.flush();
    jsonl.fsync();
}

/// Map an activity event to its JSONL representation.
pub fn event_to_log_entry(event: &ActivityEvent) -> LogEntry {
    match event {
        ActivityEvent::DashboardStarted {
            version,
            sources,
            refresh_secs,
        } => {
            let mut e = LogEntry::new(EventType::DashboardStart, Severity::Info);
            e.details = Some(format!(
                "version={version} sources={sources} refresh={refresh_secs}s"
            ));
            e
        }
        ActivityEvent::DashboardStopped {
            reason,
            uptime_secs,
        } => {
            let mut e = LogEntry::new(EventType::DashboardStop, Severity::Info);
            e.details = Some(format!("reason={reason} uptime={uptime_secs}s"));
            e
        }
        ActivityEvent::LayoutChanged {
            profile,
            cols,
            rows,
        } => {
            let mut e = LogEntry::new(EventType::LayoutChange, Severity::Info);
            e.profile = Some(profile.clone());
            e.cols = Some(*cols);
            e.rows = Some(*rows);
            e
        }
        ActivityEvent::SourceFetched {
            index,
            title,
            points,
            missing,
            duration_ms,
        } => {
            let mut e = LogEntry::new(EventType::SourceFetch, Severity::Info);
            e.source_index = Some(*index);
            e.title = Some(title.clone());
            e.points = Some(*points);
            e.missing = Some(*missing);
            e.duration_ms = Some(*duration_ms);
            e
        }
        ActivityEvent::SourceFailed {
            index,
            title,
            endpoint,
            error_code,
            error_message,
        } => {
            let mut e = LogEntry::new(EventType::SourceError, Severity::Warning);
            e.source_index = Some(*index);
            e.title = Some(title.clone());
            e.endpoint = Some(endpoint.clone());
            e.error_code = Some(error_code.clone());
            e.error_message = Some(error_message.clone());
            e
        }
        ActivityEvent::SchedulerFault {
            task,
            error_code,
            error_message,
        } => {
            let mut e = LogEntry::new(EventType::SchedulerFault, Severity::Critical);
            e.details = Some(format!("task={task}"));
            e.error_code = Some(error_code.clone());
            e.error_message = Some(error_message.clone());
            e
        }
        ActivityEvent::Error { code, message } => {
            let mut e = LogEntry::new(EventType::Error, Severity::Warning);
            e.error_code = Some(code.clone());
            e.error_message = Some(message.clone());
            e
        }
        ActivityEvent::Shutdown => LogEntry::new(EventType::DashboardStop, Severity::Info),
    }
}

#[cfg(test)]
mod tests {
    use std::fs;

    use super::*;

    fn logger_in(dir: &tempfile::TempDir) -> (ActivityLoggerHandle, thread::JoinHandle<()>, PathBuf) {
        let path = dir.path().join("activity.jsonl");
        let (handle, join) = spawn_logger(LoggerConfig::for_path(path.clone())).unwrap();
        (handle, join, path)
    }

    #[test]
    fn spawn_and_shutdown() {
        let dir = tempfile::tempdir().unwrap();
        let (handle, join, path) = logger_in(&dir);
        handle.send(ActivityEvent::DashboardStarted {
            version: "0.0.0".to_string(),
            sources: 3,
            refresh_secs: 15,
        });
        handle.shutdown();
        join.join().unwrap();

        let contents = fs::read_to_string(path).unwrap();
        assert!(contents.contains("dashboard_start"));
        assert!(contents.contains("sources=3"));
    }

    #[test]
    fn source_failure_carries_error_code() {
        let dir = tempfile::tempdir().unwrap();
        let (handle, join, path) = logger_in(&dir);
        handle.send(ActivityEvent::SourceFailed {
            index: 1,
            title: "Load".to_string(),
            endpoint: "http://prom:9090".to_string(),
            error_code: "DCK-2003".to_string(),
            error_message: "connection refused".to_string(),
        });
        handle.shutdown();
        join.join().unwrap();

        let line = fs::read_to_string(path).unwrap();
        let parsed: serde_json::Value = serde_json::from_str(line.trim()).unwrap();
        assert_eq!(parsed["event"], "source_error");
        assert_eq!(parsed["source_index"], 1);
        assert_eq!(parsed["error_code"], "DCK-2003");
    }

    #[test]
    fn detached_handle_discards_silently() {
        let handle = ActivityLoggerHandle::detached();
        handle.send(ActivityEvent::Error {
            code: "DCK-3900".to_string(),
            message: "nobody listening".to_string(),
        });
        handle.shutdown();
        assert_eq!(handle.dropped_events(), 0);
    }

    #[test]
    fn layout_event_maps_dimensions() {
        let entry = event_to_log_entry(&ActivityEvent::LayoutChanged {
            profile: "wide".to_string(),
            cols: 200,
            rows: 50,
        });
        assert_eq!(entry.event, EventType::LayoutChange);
        assert_eq!(entry.cols, Some(200));
        assert_eq!(entry.profile.as_deref(), Some("wide"));
    }
}
