#![forbid(unsafe_code)]

//! dashclock: full-screen terminal wall clock with a rotating metric chart.
//!
//! The screen shows a large clock, a date block and one Prometheus panel that
//! cycles through a configured list of datasources:
//! 1. **Layout**: pure mapping from terminal size to geometry and fonts
//! 2. **Metrics**: range queries aligned onto a fixed grid, gaps marked with a sentinel
//! 3. **Scheduler**: one worker thread running the layout and data-sync tasks
//!
//! # Library usage
//!
//! Use the [`prelude`] for convenient access to the most common types:
//!
//! ```rust,no_run
//! use dashclock::prelude::*;
//! ```
//!
//! Individual modules can also be imported directly:
//!
//! ```rust,no_run
//! use dashclock::core::config::DatasourceRegistry;
//! use dashclock::tui::layout::{LayoutProfile, layout};
//! ```

pub mod prelude;

pub mod core;
pub mod daemon;
pub mod logger;
pub mod metrics;
pub mod tui;
