//! Convenience re-exports for library consumers.
//!
//! ```rust,no_run
//! use dashclock::prelude::*;
//! ```

// Core
pub use crate::core::config::{
    DashboardSettings, DatasourceDescriptor, DatasourceRegistry, SettingsInput, WindowLength,
};
pub use crate::core::errors::{DashError, Result};

// Metrics
pub use crate::metrics::backend::{PrometheusBackend, QueryData, QueryRange, RangeBackend};
pub use crate::metrics::query::{AlignedPoint, AlignedSeries, QueryEngine, SENTINEL};
pub use crate::metrics::threshold::{ColorPolicy, PanelStatus, Severity, StatusLevel, classify};

// Scheduling
pub use crate::daemon::scheduler::{
    DATA_SYNC, LAYOUT_REFRESH, Scheduler, SchedulerHandle, SchedulerStats, Trigger,
};

// Logging
pub use crate::logger::activity::{ActivityEvent, ActivityLoggerHandle, LoggerConfig, spawn_logger};

// Dashboard
pub use crate::tui::glyphs::{GlyphRenderer, PixelGlyphs};
pub use crate::tui::layout::{LayoutDescriptor, LayoutProfile, layout};
pub use crate::tui::model::{DashboardMsg, RenderState};
pub use crate::tui::render::{Canvas, FrameContext, compose};
pub use crate::tui::update::update;
#[cfg(feature = "tui")]
pub use crate::tui::run_dashboard;
