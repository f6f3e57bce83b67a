//! Property-based tests for the pure dashboard pieces.
//!
//! Layout selection, window alignment, the transition function and frame
//! composition must hold their invariants for arbitrary terminal sizes and
//! arbitrary message sequences.

use chrono::{TimeZone, Utc};
use proptest::prelude::*;

use super::glyphs::PixelGlyphs;
use super::input::InputAction;
use super::layout::{LayoutProfile, layout};
use super::model::{DashboardCmd, DashboardMsg, RenderState, SyncReport};
use super::render::{FrameContext, compose};
use super::theme::ThemePalette;
use super::update::update;
use crate::core::config::{DatasourceDescriptor, DatasourceRegistry, WindowLength};
use crate::metrics::backend::{Sample, SampleStream};
use crate::metrics::query::{AlignedPoint, AlignedSeries, SENTINEL, align, build_range};
use crate::metrics::threshold::ColorPolicy;

// ──────────────────── strategies ────────────────────

fn arb_size() -> impl Strategy<Value = (u16, u16)> {
    prop_oneof![
        Just((240u16, 30u16)),
        (0u16..300, 0u16..80),
        (38u16..=42, 14u16..=18),
        (66u16..=70, 18u16..=22),
        (129u16..=133, 28u16..=32),
    ]
}

fn arb_action() -> impl Strategy<Value = InputAction> {
    prop_oneof![
        Just(InputAction::Quit),
        (0usize..12).prop_map(InputAction::Jump),
        Just(InputAction::Prev),
        Just(InputAction::Next),
        Just(InputAction::ForceRefresh),
    ]
}

fn arb_series() -> impl Strategy<Value = Option<AlignedSeries>> {
    prop_oneof![
        Just(None),
        Just(Some(AlignedSeries::empty())),
        prop::collection::vec(prop_oneof![Just(SENTINEL), 0.0f64..500.0], 1..80).prop_map(
            |values| {
                Some(AlignedSeries::from_points(
                    values
                        .into_iter()
                        .enumerate()
                        .map(|(i, value)| AlignedPoint {
                            value,
                            label: format!("{:02}:{:02}", (i / 60) % 24, i % 60),
                        })
                        .collect(),
                ))
            }
        ),
    ]
}

/// Everything except faults, which end the session.
fn arb_msg() -> impl Strategy<Value = DashboardMsg> {
    prop_oneof![
        arb_action().prop_map(DashboardMsg::Input),
        arb_size().prop_map(|(cols, rows)| DashboardMsg::Resize { cols, rows }),
        Just(()).prop_map(|()| DashboardMsg::LayoutTick),
        (0usize..20, arb_series()).prop_map(|(index, series)| {
            DashboardMsg::SyncReport(SyncReport {
                index,
                series,
                fetched_at: Utc.with_ymd_and_hms(2026, 3, 28, 12, 0, 0).unwrap(),
            })
        }),
    ]
}

fn registry(n: usize) -> DatasourceRegistry {
    DatasourceRegistry::from_descriptors(
        (0..n)
            .map(|i| DatasourceDescriptor {
                title: format!("Source {i}"),
                query: "up".to_string(),
                endpoint: format!("http://prom-{i}:9090"),
                unit: "%".to_string(),
                warn_threshold: if i % 2 == 0 { 80.0 } else { 0.0 },
                error_threshold: 90.0,
            })
            .collect(),
    )
    .unwrap()
}

fn frame() -> FrameContext {
    FrameContext {
        now: Utc.with_ymd_and_hms(2026, 3, 28, 12, 0, 0).unwrap(),
        timezone: chrono_tz::UTC,
        test_mode: true,
        color_policy: ColorPolicy::WorstInWindow,
        palette: ThemePalette::standard(),
    }
}

// ──────────────────── properties ────────────────────

proptest! {
    #![proptest_config(ProptestConfig::with_cases(200))]

    /// Same size in, same descriptor out, and the profile follows the breakpoints.
    #[test]
    fn layout_is_pure_and_total((cols, rows) in arb_size()) {
        let first = layout(cols, rows);
        prop_assert_eq!(first, layout(cols, rows));
        prop_assert_eq!((first.cols, first.rows), (cols, rows));

        let expected = if (cols, rows) == (240, 30) {
            LayoutProfile::WidePanel
        } else if cols >= 131 && rows >= 30 {
            LayoutProfile::Wide
        } else if cols >= 68 && rows >= 20 {
            LayoutProfile::Medium
        } else if cols >= 40 && rows >= 16 {
            LayoutProfile::Compact
        } else {
            LayoutProfile::Unsupported
        };
        prop_assert_eq!(first.profile(), expected);
        prop_assert_eq!(first.is_supported(), expected != LayoutProfile::Unsupported);
    }

    /// Alignment always yields `window_len + 1` points, filled or sentinel.
    #[test]
    fn alignment_has_fixed_length(
        window_len in 1usize..200,
        step_secs in 1u64..600,
        keep in prop::collection::vec(any::<bool>(), 0..200),
    ) {
        let now = Utc.with_ymd_and_hms(2026, 3, 28, 12, 0, 0).unwrap();
        let range = build_range(now, window_len, step_secs);
        let step_ms = i64::try_from(step_secs).unwrap() * 1000;
        let samples: Vec<Sample> = keep
            .iter()
            .enumerate()
            .filter(|(_, keep)| **keep)
            .map(|(i, _)| Sample {
                timestamp_ms: range.start.timestamp_millis() + i64::try_from(i).unwrap() * step_ms,
                value: 1.0,
            })
            .collect();
        let stream = SampleStream { labels: Default::default(), samples };

        let series = align(Some(&stream), &range, window_len, chrono_tz::UTC);
        prop_assert_eq!(series.len(), window_len + 1);
        for value in series.values() {
            prop_assert!(value == 1.0 || value == SENTINEL);
        }
        let present = keep.iter().take(window_len + 1).filter(|k| **k).count();
        prop_assert_eq!(series.len() - series.missing_count(), present);
    }

    /// The cursor stays in range, quit is sticky and frames only grow.
    #[test]
    fn transitions_keep_state_invariants(
        n in 1usize..12,
        msgs in prop::collection::vec(arb_msg(), 1..60),
    ) {
        let mut state = RenderState::new(n, (80, 24), WindowLength::Auto);
        let mut frames = 0;
        for msg in msgs {
            let was_quit = state.quit;
            let _ = update(&mut state, msg);
            prop_assert!(state.cursor_index < n);
            prop_assert!(state.frames >= frames);
            frames = state.frames;
            if was_quit {
                prop_assert!(state.quit);
            }
        }
    }

    /// Next then prev (and prev then next) lands where it started.
    #[test]
    fn cursor_wraps_symmetrically(n in 1usize..12, start in 0usize..12) {
        let mut state = RenderState::new(n, (80, 24), WindowLength::Auto);
        state.cursor_index = start % n;
        let _ = update(&mut state, DashboardMsg::Input(InputAction::Next));
        let _ = update(&mut state, DashboardMsg::Input(InputAction::Prev));
        prop_assert_eq!(state.cursor_index, start % n);
        let _ = update(&mut state, DashboardMsg::Input(InputAction::Prev));
        let _ = update(&mut state, DashboardMsg::Input(InputAction::Next));
        prop_assert_eq!(state.cursor_index, start % n);
    }

    /// A sync report always ends in a draw.
    #[test]
    fn sync_report_always_draws(
        (cols, rows) in arb_size(),
        dirty in any::<bool>(),
        series in arb_series(),
    ) {
        let mut state = RenderState::new(3, (cols, rows), WindowLength::Fixed(60));
        state.layout_dirty = dirty;
        let cmd = update(&mut state, DashboardMsg::SyncReport(SyncReport {
            index: 4,
            series,
            fetched_at: Utc::now(),
        }));
        let draws = match cmd {
            DashboardCmd::Draw => true,
            DashboardCmd::Batch(cmds) => matches!(cmds.last(), Some(DashboardCmd::Draw)),
            _ => false,
        };
        prop_assert!(draws);
        prop_assert!(!state.layout_dirty);
        prop_assert_eq!(state.cursor_index, 1);
    }

    /// Composition never panics and always fills exactly the terminal.
    #[test]
    fn compose_fits_any_terminal(
        (cols, rows) in arb_size(),
        index in 0usize..4,
        series in arb_series(),
    ) {
        let reg = registry(4);
        let mut state = RenderState::new(reg.len(), (cols, rows), WindowLength::Auto);
        let _ = update(&mut state, DashboardMsg::SyncReport(SyncReport {
            index,
            series,
            fetched_at: Utc::now(),
        }));
        let canvas = compose(&state, &reg, &PixelGlyphs, &frame());
        prop_assert_eq!(canvas.size(), (cols, rows));
        prop_assert_eq!(canvas.text().len(), usize::from(rows));
        for line in canvas.text() {
            prop_assert!(line.chars().count() <= usize::from(cols));
        }
    }
}
