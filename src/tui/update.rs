//! Pure transition function for the dashboard.
//!
//! `update()` applies one message to the [`RenderState`] and returns the
//! effects the runtime must carry out. No I/O happens here.

use super::input::InputAction;
use super::layout::layout;
use super::model::{DashboardCmd, DashboardMsg, PanelView, RenderState, SyncRequest};

/// Apply a message to the state and return the next command for the runtime.
pub fn update(state: &mut RenderState, msg: DashboardMsg) -> DashboardCmd {
    match msg {
        DashboardMsg::Input(action) => apply_input_action(state, action),

        DashboardMsg::Resize { cols, rows } => {
            state.terminal_size = (cols, rows);
            state.layout_dirty = true;
            reshow(state)
        }

        DashboardMsg::LayoutTick => {
            state.layout_dirty = true;
            DashboardCmd::None
        }

        DashboardMsg::SyncReport(report) => {
            state.cursor_index = report.index % state.source_count;
            state.panel = Some(PanelView {
                index: state.cursor_index,
                series: report.series,
                fetched_at: report.fetched_at,
            });
            render_step(state)
        }

        DashboardMsg::Fault(err) => {
            state.quit = true;
            DashboardCmd::Exit(err)
        }
    }
}

fn apply_input_action(state: &mut RenderState, action: InputAction) -> DashboardCmd {
    match action {
        InputAction::Quit => {
            state.quit = true;
            DashboardCmd::Quit
        }
        InputAction::Jump(index) if index < state.source_count => {
            state.cursor_index = index;
            show(index)
        }
        InputAction::Jump(_) => DashboardCmd::None,
        InputAction::Prev => {
            state.cursor_index = state.prev_index();
            show(state.cursor_index)
        }
        InputAction::Next => {
            state.cursor_index = state.next_index();
            show(state.cursor_index)
        }
        InputAction::ForceRefresh => {
            state.layout_dirty = true;
            reshow(state)
        }
    }
}

fn show(index: usize) -> DashboardCmd {
    DashboardCmd::Batch(vec![
        DashboardCmd::Request(SyncRequest::Show(index)),
        DashboardCmd::RunDataSync,
    ])
}

/// Show the current source again at the current size. The pause flag goes
/// out first so the triggered run already sees it.
fn reshow(state: &RenderState) -> DashboardCmd {
    let (cols, rows) = state.terminal_size;
    let supported = layout(cols, rows).is_supported();
    DashboardCmd::Batch(vec![
        DashboardCmd::Request(SyncRequest::Pause(!supported)),
        DashboardCmd::Request(SyncRequest::Show(state.cursor_index)),
        DashboardCmd::RunDataSync,
    ])
}

/// Recompute the layout if needed, then draw.
fn render_step(state: &mut RenderState) -> DashboardCmd {
    state.frames = state.frames.wrapping_add(1);
    if !state.layout_dirty {
        return DashboardCmd::Draw;
    }
    let (cols, rows) = state.terminal_size;
    let next = layout(cols, rows);
    state.current_layout = next;
    state.layout_dirty = false;
    DashboardCmd::Batch(vec![
        DashboardCmd::LayoutChanged(next),
        DashboardCmd::Request(SyncRequest::Window(state.window_len())),
        DashboardCmd::Request(SyncRequest::Pause(!next.is_supported())),
        DashboardCmd::Draw,
    ])
}

#[cfg(test)]
mod tests {
    use chrono::Utc;

    use super::*;
    use crate::core::config::WindowLength;
    use crate::core::errors::DashError;
    use crate::metrics::query::AlignedSeries;
    use crate::tui::layout::LayoutProfile;
    use crate::tui::model::SyncReport;

    fn state(n: usize) -> RenderState {
        RenderState::new(n, (120, 40), WindowLength::Fixed(60))
    }

    fn requested_show(cmd: &DashboardCmd) -> Option<usize> {
        match cmd {
            DashboardCmd::Batch(cmds) => cmds.iter().find_map(|c| match c {
                DashboardCmd::Request(SyncRequest::Show(i)) => Some(*i),
                _ => None,
            }),
            _ => None,
        }
    }

    fn has_run(cmd: &DashboardCmd) -> bool {
        matches!(cmd, DashboardCmd::Batch(cmds) if cmds.iter().any(|c| matches!(c, DashboardCmd::RunDataSync)))
    }

    fn report(index: usize) -> DashboardMsg {
        DashboardMsg::SyncReport(SyncReport {
            index,
            series: Some(AlignedSeries::empty()),
            fetched_at: Utc::now(),
        })
    }

    #[test]
    fn prev_from_zero_wraps_to_last() {
        let mut s = state(3);
        let cmd = update(&mut s, DashboardMsg::Input(InputAction::Prev));
        assert_eq!(s.cursor_index, 2);
        assert_eq!(requested_show(&cmd), Some(2));
        assert!(has_run(&cmd));
    }

    #[test]
    fn next_from_last_wraps_to_zero() {
        let mut s = state(3);
        s.cursor_index = 2;
        let cmd = update(&mut s, DashboardMsg::Input(InputAction::Next));
        assert_eq!(s.cursor_index, 0);
        assert_eq!(requested_show(&cmd), Some(0));
    }

    #[test]
    fn jump_in_range_moves_cursor() {
        let mut s = state(4);
        let cmd = update(&mut s, DashboardMsg::Input(InputAction::Jump(3)));
        assert_eq!(s.cursor_index, 3);
        assert_eq!(requested_show(&cmd), Some(3));
    }

    #[test]
    fn jump_out_of_range_is_ignored() {
        let mut s = state(2);
        let cmd = update(&mut s, DashboardMsg::Input(InputAction::Jump(5)));
        assert_eq!(s.cursor_index, 0);
        assert!(matches!(cmd, DashboardCmd::None));
    }

    #[test]
    fn force_refresh_marks_layout_dirty_and_reshows_current() {
        let mut s = state(3);
        s.cursor_index = 1;
        s.layout_dirty = false;
        let cmd = update(&mut s, DashboardMsg::Input(InputAction::ForceRefresh));
        assert!(s.layout_dirty);
        assert_eq!(requested_show(&cmd), Some(1));
    }

    #[test]
    fn resize_updates_size_and_triggers_sync() {
        let mut s = state(3);
        s.layout_dirty = false;
        let cmd = update(&mut s, DashboardMsg::Resize { cols: 240, rows: 30 });
        assert_eq!(s.terminal_size, (240, 30));
        assert!(s.layout_dirty);
        assert!(has_run(&cmd));
    }

    #[test]
    fn resize_sets_pause_before_the_run() {
        let mut s = state(3);
        s.cursor_index = 1;
        let DashboardCmd::Batch(tiny) = update(&mut s, DashboardMsg::Resize { cols: 30, rows: 10 }) else {
            panic!("expected batch");
        };
        assert!(matches!(tiny[0], DashboardCmd::Request(SyncRequest::Pause(true))));
        assert!(matches!(tiny.last(), Some(DashboardCmd::RunDataSync)));

        let DashboardCmd::Batch(back) = update(&mut s, DashboardMsg::Resize { cols: 120, rows: 40 }) else {
            panic!("expected batch");
        };
        assert!(matches!(back[0], DashboardCmd::Request(SyncRequest::Pause(false))));
        assert!(back.iter().any(|c| matches!(c, DashboardCmd::Request(SyncRequest::Show(1)))));
        assert!(matches!(back.last(), Some(DashboardCmd::RunDataSync)));
    }

    #[test]
    fn layout_tick_only_marks_dirty() {
        let mut s = state(3);
        s.layout_dirty = false;
        let cmd = update(&mut s, DashboardMsg::LayoutTick);
        assert!(s.layout_dirty);
        assert!(matches!(cmd, DashboardCmd::None));
    }

    #[test]
    fn report_recomputes_dirty_layout_once() {
        let mut s = state(3);
        s.terminal_size = (30, 10);
        let cmd = update(&mut s, report(1));
        assert_eq!(s.cursor_index, 1);
        assert!(!s.layout_dirty);
        assert_eq!(s.current_layout.profile(), LayoutProfile::Unsupported);
        let DashboardCmd::Batch(cmds) = cmd else {
            panic!("expected batch");
        };
        assert!(cmds.iter().any(|c| matches!(c, DashboardCmd::Request(SyncRequest::Pause(true)))));
        assert!(matches!(cmds.last(), Some(DashboardCmd::Draw)));

        let again = update(&mut s, report(2));
        assert!(matches!(again, DashboardCmd::Draw));
        assert_eq!(s.frames, 2);
    }

    #[test]
    fn report_index_is_kept_in_range() {
        let mut s = state(3);
        let _ = update(&mut s, report(4));
        assert_eq!(s.cursor_index, 1);
    }

    #[test]
    fn quit_and_fault_stop_the_loop() {
        let mut s = state(1);
        assert!(matches!(update(&mut s, DashboardMsg::Input(InputAction::Quit)), DashboardCmd::Quit));
        assert!(s.quit);

        let mut s = state(1);
        let cmd = update(
            &mut s,
            DashboardMsg::Fault(DashError::Runtime {
                details: "boom".to_string(),
            }),
        );
        assert!(matches!(cmd, DashboardCmd::Exit(_)));
        assert!(s.quit);
    }
}
