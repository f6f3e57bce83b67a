//! Render state and the messages/commands exchanged with the runtime.
//!
//! [`RenderState`] is owned by the foreground loop and only changed by
//! [`crate::tui::update::update`]. Results from the scheduler worker arrive
//! as [`DashboardMsg::SyncReport`]; nothing else writes to the state.

#![allow(missing_docs)]

use chrono::{DateTime, Utc};

use crate::core::config::WindowLength;
use crate::core::errors::DashError;
use crate::metrics::query::AlignedSeries;
use crate::tui::input::InputAction;
use crate::tui::layout::{LayoutDescriptor, layout};

/// What the data-sync job produced for one source.
#[derive(Debug, Clone, PartialEq)]
pub struct SyncReport {
    pub index: usize,
    /// `None` when the fetch was skipped (layout unsupported). An empty series
    /// means the backend could not be reached.
    pub series: Option<AlignedSeries>,
    pub fetched_at: DateTime<Utc>,
}

/// Instructions for the data-sync job, applied before its next run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncRequest {
    /// Render this source on the next run instead of the round-robin one.
    Show(usize),
    /// Number of steps per fetch.
    Window(usize),
    /// Skip network fetches while the layout is unsupported.
    Pause(bool),
}

#[derive(Debug)]
pub enum DashboardMsg {
    Input(InputAction),
    Resize { cols: u16, rows: u16 },
    /// The hourly layout task fired.
    LayoutTick,
    SyncReport(SyncReport),
    /// A scheduler task failed fatally.
    Fault(DashError),
}

#[derive(Debug)]
pub enum DashboardCmd {
    None,
    Quit,
    /// Hand a request to the data-sync job.
    Request(SyncRequest),
    /// `run_now("data-sync")`.
    RunDataSync,
    /// The layout was recomputed; clear the screen and log it.
    LayoutChanged(LayoutDescriptor),
    /// Compose and flush a frame from the current state.
    Draw,
    Exit(DashError),
    Batch(Vec<DashboardCmd>),
}

/// The most recent datasource result.
#[derive(Debug, Clone, PartialEq)]
pub struct PanelView {
    pub index: usize,
    pub series: Option<AlignedSeries>,
    pub fetched_at: DateTime<Utc>,
}

/// Foreground-owned dashboard state.
#[derive(Debug, Clone, PartialEq)]
pub struct RenderState {
    pub source_count: usize,
    /// Index of the datasource currently shown, in `[0, source_count)`.
    pub cursor_index: usize,
    pub layout_dirty: bool,
    pub current_layout: LayoutDescriptor,
    pub terminal_size: (u16, u16),
    pub window: WindowLength,
    pub panel: Option<PanelView>,
    pub quit: bool,
    pub frames: u64,
}

impl RenderState {
    /// Fresh state; the layout is computed on the first render.
    #[must_use]
    pub fn new(source_count: usize, terminal_size: (u16, u16), window: WindowLength) -> Self {
        Self {
            source_count: source_count.max(1),
            cursor_index: 0,
            layout_dirty: true,
            current_layout: layout(terminal_size.0, terminal_size.1),
            terminal_size,
            window,
            panel: None,
            quit: false,
            frames: 0,
        }
    }

    #[must_use]
    pub const fn prev_index(&self) -> usize {
        (self.cursor_index + self.source_count - 1) % self.source_count
    }

    #[must_use]
    pub const fn next_index(&self) -> usize {
        (self.cursor_index + 1) % self.source_count
    }

    /// Window length for the current terminal width.
    #[must_use]
    pub fn window_len(&self) -> usize {
        self.window.resolve(self.terminal_size.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wraparound_in_both_directions() {
        let mut state = RenderState::new(3, (80, 24), WindowLength::Fixed(60));
        assert_eq!(state.prev_index(), 2);
        state.cursor_index = 2;
        assert_eq!(state.next_index(), 0);
    }

    #[test]
    fn single_source_stays_put() {
        let state = RenderState::new(1, (80, 24), WindowLength::Fixed(60));
        assert_eq!(state.prev_index(), 0);
        assert_eq!(state.next_index(), 0);
    }

    #[test]
    fn starts_with_dirty_layout() {
        let state = RenderState::new(2, (240, 30), WindowLength::Auto);
        assert!(state.layout_dirty);
        assert_eq!(state.window_len(), 232);
    }
}
