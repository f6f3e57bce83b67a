//! The "data-sync" task body.
//!
//! Runs on the scheduler worker: picks the next datasource, fetches and
//! aligns its window, and posts a [`SyncReport`] to the foreground loop. The
//! round-robin position lives here; the foreground steers it with
//! [`SyncRequest::Show`] before triggering a manual run.

#![allow(missing_docs)]

use std::sync::Arc;
use std::time::Instant;

use chrono::Utc;
use chrono_tz::Tz;
use crossbeam_channel::{Receiver, Sender};

use crate::core::config::{DatasourceDescriptor, DatasourceRegistry};
use crate::core::errors::{DashError, Result};
use crate::daemon::scheduler::Trigger;
use crate::logger::activity::{ActivityEvent, ActivityLoggerHandle};
use crate::metrics::query::{AlignedSeries, QueryEngine, RangeFetch};
use crate::tui::model::{DashboardMsg, SyncReport, SyncRequest};

/// Static parameters of the job.
#[derive(Debug, Clone, Copy)]
pub struct SyncParams {
    pub window_len: usize,
    pub step_secs: u64,
    pub timezone: Tz,
}

pub struct DataSyncJob {
    registry: Arc<DatasourceRegistry>,
    engine: QueryEngine,
    requests: Receiver<SyncRequest>,
    reports: Sender<DashboardMsg>,
    logger: ActivityLoggerHandle,
    params: SyncParams,
    /// Next source to show on a timer run.
    rotation: usize,
    paused: bool,
}

impl DataSyncJob {
    pub fn new(
        registry: Arc<DatasourceRegistry>,
        engine: QueryEngine,
        requests: Receiver<SyncRequest>,
        reports: Sender<DashboardMsg>,
        logger: ActivityLoggerHandle,
        params: SyncParams,
    ) -> Self {
        Self {
            registry,
            engine,
            requests,
            reports,
            logger,
            params,
            rotation: 0,
            paused: false,
        }
    }

    /// Index the next run will show, before pending requests are applied.
    #[must_use]
    pub const fn rotation(&self) -> usize {
        self.rotation
    }

    /// One task execution.
    ///
    /// # Errors
    /// Only fatal conditions: an endpoint that cannot be turned into a client,
    /// an unsupported result shape, or a closed report channel.
    pub fn run(&mut self, _trigger: Trigger) -> Result<()> {
        self.apply_requests();

        let index = self.registry.wrap_index(self.rotation);
        let source = self
            .registry
            .get(index)
            .ok_or_else(|| DashError::Runtime {
                details: format!("datasource {index} vanished from the registry"),
            })?;

        let series = if self.paused {
            None
        } else {
            Some(self.fetch(index, source)?)
        };
        self.rotation = index + 1;

        self.reports
            .send(DashboardMsg::SyncReport(SyncReport {
                index,
                series,
                fetched_at: Utc::now(),
            }))
            .map_err(|_| DashError::ChannelClosed {
                component: "render-loop",
            })
    }

    fn apply_requests(&mut self) {
        while let Ok(request) = self.requests.try_recv() {
            match request {
                SyncRequest::Show(index) => self.rotation = index,
                SyncRequest::Window(len) => self.params.window_len = len.max(1),
                SyncRequest::Pause(paused) => self.paused = paused,
            }
        }
    }

    fn fetch(&self, index: usize, source: &DatasourceDescriptor) -> Result<AlignedSeries> {
        let started = Instant::now();
        let fetched = self.engine.fetch_range_detailed(
            &source.endpoint,
            &source.query,
            self.params.window_len,
            self.params.step_secs,
            Utc::now(),
            self.params.timezone,
        )?;
        let duration_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX);

        match fetched {
            RangeFetch::Aligned(series) => {
                self.logger.send(ActivityEvent::SourceFetched {
                    index,
                    title: source.title.clone(),
                    points: series.len(),
                    missing: series.missing_count(),
                    duration_ms,
                });
                Ok(series)
            }
            RangeFetch::Unavailable(err) => {
                self.logger.send(ActivityEvent::SourceFailed {
                    index,
                    title: source.title.clone(),
                    endpoint: source.endpoint.clone(),
                    error_code: err.code().to_string(),
                    error_message: err.to_string(),
                });
                Ok(AlignedSeries::empty())
            }
        }
    }
}
