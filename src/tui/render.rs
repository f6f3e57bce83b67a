//! Frame composition: state to a cell buffer, and the buffer to the terminal.
//!
//! [`compose`] is pure so frames can be asserted on in tests; only [`flush`]
//! touches the terminal.

#![allow(missing_docs)]

use chrono::{DateTime, Utc};
use chrono_tz::Tz;

use crate::core::config::{DatasourceDescriptor, DatasourceRegistry};
use crate::metrics::query::{AlignedSeries, is_sentinel};
use crate::metrics::threshold::{ColorPolicy, PanelStatus, classify};
use crate::tui::glyphs::{GlyphRenderer, right_align};
use crate::tui::layout::{Rect, Support, SupportedLayout, unsupported_message};
use crate::tui::model::RenderState;
use crate::tui::theme::{ThemePalette, Tone};

/// Fixed display values used by `--test` for glyph alignment work.
pub const TEST_CLOCK: &str = "23:59";
pub const TEST_DAY: &str = "28";
pub const TEST_MONTH: &str = "Mar";
pub const TEST_WEEKDAY: &str = "Wed";

const PLOT_DOT: char = '•';

// ──────────────────── canvas ────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Cell {
    pub ch: char,
    pub tone: Tone,
}

impl Default for Cell {
    fn default() -> Self {
        Self {
            ch: ' ',
            tone: Tone::Default,
        }
    }
}

/// Screen-sized cell buffer. All writes clip to the screen.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Canvas {
    cols: u16,
    rows: u16,
    cells: Vec<Cell>,
}

impl Canvas {
    #[must_use]
    pub fn new(cols: u16, rows: u16) -> Self {
        Self {
            cols,
            rows,
            cells: vec![Cell::default(); usize::from(cols) * usize::from(rows)],
        }
    }

    #[must_use]
    pub const fn size(&self) -> (u16, u16) {
        (self.cols, self.rows)
    }

    fn index(&self, x: i32, y: i32) -> Option<usize> {
        let x = usize::try_from(x).ok()?;
        let y = usize::try_from(y).ok()?;
        (x < usize::from(self.cols) && y < usize::from(self.rows))
            .then(|| y * usize::from(self.cols) + x)
    }

    pub fn put_char(&mut self, x: i32, y: i32, ch: char, tone: Tone) {
        if let Some(i) = self.index(x, y) {
            self.cells[i] = Cell { ch, tone };
        }
    }

    /// Write `text` starting at `(x, y)`; characters off screen are dropped.
    pub fn put_str(&mut self, x: i32, y: i32, text: &str, tone: Tone) {
        for (dx, ch) in (0..).zip(text.chars()) {
            self.put_char(x + dx, y, ch, tone);
        }
    }

    /// Write lines from `(x, y)` downward, clipped to `clip` as well as the screen.
    /// Spaces are written too, so a shorter frame erases a longer one.
    pub fn put_lines(&mut self, x: i32, y: i32, lines: &[String], tone: Tone, clip: Rect) {
        for (dy, line) in (0..).zip(lines) {
            let row = y + dy;
            if row < clip.y0 || row >= clip.y1 {
                continue;
            }
            for (dx, ch) in (0..).zip(line.chars()) {
                let col = x + dx;
                if col >= clip.x0 && col < clip.x1 {
                    self.put_char(col, row, ch, tone);
                }
            }
        }
    }

    #[must_use]
    pub fn cell(&self, x: u16, y: u16) -> Option<Cell> {
        self.index(i32::from(x), i32::from(y)).map(|i| self.cells[i])
    }

    /// Row contents with trailing blanks trimmed.
    #[must_use]
    pub fn row_text(&self, y: u16) -> String {
        if y >= self.rows {
            return String::new();
        }
        let start = usize::from(y) * usize::from(self.cols);
        let row: String = self.cells[start..start + usize::from(self.cols)]
            .iter()
            .map(|c| c.ch)
            .collect();
        row.trim_end().to_string()
    }

    #[must_use]
    pub fn text(&self) -> Vec<String> {
        (0..self.rows).map(|y| self.row_text(y)).collect()
    }

    fn rows(&self) -> impl Iterator<Item = &[Cell]> {
        self.cells.chunks(usize::from(self.cols).max(1))
    }
}

// ──────────────────── composition ────────────────────

/// Per-frame inputs that do not live in [`RenderState`].
#[derive(Debug, Clone, Copy)]
pub struct FrameContext {
    pub now: DateTime<Utc>,
    pub timezone: Tz,
    pub test_mode: bool,
    pub color_policy: ColorPolicy,
    pub palette: ThemePalette,
}

/// Build the full frame for the current state.
#[must_use]
pub fn compose(
    state: &RenderState,
    registry: &DatasourceRegistry,
    glyphs: &dyn GlyphRenderer,
    ctx: &FrameContext,
) -> Canvas {
    let (cols, rows) = state.terminal_size;
    let mut canvas = Canvas::new(cols, rows);

    match &state.current_layout.support {
        Support::Unsupported { cols, rows } => {
            let lines = unsupported_message(*cols, *rows);
            canvas.put_str(0, 0, &lines[0], ctx.palette.advisory);
            canvas.put_str(0, 1, &lines[1], ctx.palette.advisory);
        }
        Support::Supported(layout) => {
            draw_clock(&mut canvas, layout, glyphs, ctx);
            draw_date(&mut canvas, layout, glyphs, ctx);
            if let Some(panel) = &state.panel
                && let (Some(series), Some(source)) = (&panel.series, registry.get(panel.index))
            {
                draw_panel(&mut canvas, layout, source, series, glyphs, ctx);
            }
        }
    }
    canvas
}

/// Origin of a border-less widget: one cell in, never above the screen.
fn origin(rect: Rect) -> (i32, i32) {
    (rect.x0 + 1, (rect.y0 + 1).max(0))
}

fn clock_text(ctx: &FrameContext) -> String {
    if ctx.test_mode {
        TEST_CLOCK.to_string()
    } else {
        ctx.now.with_timezone(&ctx.timezone).format("%H:%M").to_string()
    }
}

/// `(weekday, day of month, month)`.
fn date_parts(ctx: &FrameContext) -> [String; 3] {
    if ctx.test_mode {
        return [
            TEST_WEEKDAY.to_string(),
            TEST_DAY.to_string(),
            TEST_MONTH.to_string(),
        ];
    }
    let local = ctx.now.with_timezone(&ctx.timezone);
    [
        local.format("%a").to_string(),
        local.format("%d").to_string(),
        local.format("%b").to_string(),
    ]
}

fn draw_clock(canvas: &mut Canvas, layout: &SupportedLayout, glyphs: &dyn GlyphRenderer, ctx: &FrameContext) {
    let lines = right_align(
        glyphs.render(&clock_text(ctx), layout.clock_font),
        layout.clock_display_width,
    );
    let (x, y) = origin(layout.clock_rect);
    canvas.put_lines(x, y, &lines, ctx.palette.clock, layout.clock_rect);
}

fn draw_date(canvas: &mut Canvas, layout: &SupportedLayout, glyphs: &dyn GlyphRenderer, ctx: &FrameContext) {
    let lines: Vec<String> = date_parts(ctx)
        .iter()
        .flat_map(|part| {
            right_align(
                glyphs.render(part, layout.date_font),
                layout.date_display_width,
            )
        })
        .collect();
    let (x, y) = origin(layout.date_rect);
    canvas.put_lines(x, y, &lines, ctx.palette.date, layout.date_rect);
}

fn draw_panel(
    canvas: &mut Canvas,
    layout: &SupportedLayout,
    source: &DatasourceDescriptor,
    series: &AlignedSeries,
    glyphs: &dyn GlyphRenderer,
    ctx: &FrameContext,
) {
    let palette = ctx.palette;
    let status = classify(series, source, ctx.color_policy);
    let (title, title_tone, value, value_tone, line_tone) = match &status {
        PanelStatus::Colored {
            line,
            status,
            latest,
        } => (
            format!("{} {latest:.0}{}", source.title, source.unit),
            palette.for_status(*status),
            format!("{latest:.0}{}", source.unit),
            palette.for_status(*status),
            palette.for_line(*line),
        ),
        PanelStatus::SourceError { title, endpoint } => (
            format!("{title} PROM ERROR {endpoint}"),
            palette.status_error,
            "PROM ERROR".to_string(),
            palette.status_error,
            palette.status_error,
        ),
    };

    let chart = layout.chart_rect;
    match layout.label_font {
        Some(font) => {
            // Big-glyph label panel; the chart carries no title.
            let name_tone = if matches!(status, PanelStatus::SourceError { .. }) {
                palette.status_error
            } else {
                palette.title
            };
            let name_lines = glyphs.render(&source.title, font);
            let value_lines = glyphs.render(&value, font);
            let (x, y) = origin(layout.metric_rect);
            let below = y + i32::try_from(name_lines.len()).unwrap_or(0);
            canvas.put_lines(x, y, &name_lines, name_tone, layout.metric_rect);
            canvas.put_lines(x, below, &value_lines, value_tone, layout.metric_rect);
        }
        None => {
            canvas.put_str(chart.x0 + 1, chart.y0, &title, title_tone);
        }
    }

    if !series.is_empty() {
        draw_chart(canvas, chart, series, line_tone, palette.axis);
    }
}

/// Dotted line plot with min/max y labels and HH:MM x labels.
fn draw_chart(canvas: &mut Canvas, rect: Rect, series: &AlignedSeries, line: Tone, axis: Tone) {
    let (screen_cols, screen_rows) = canvas.size();
    let right = rect.x1.min(i32::from(screen_cols)) - 1;
    let bottom = rect.y1.min(i32::from(screen_rows)) - 1;
    // Title row on top, x labels on the bottom row.
    let plot_top = rect.y0 + 1;
    let plot_bottom = bottom - 1;
    if plot_bottom < plot_top {
        return;
    }

    let present: Vec<f64> = series.values().filter(|v| !is_sentinel(*v)).collect();
    let min = present.iter().copied().fold(f64::INFINITY, f64::min);
    let max = present.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let (max_label, min_label) = if present.is_empty() {
        (String::new(), String::new())
    } else {
        (format!("{max:.0}"), format!("{min:.0}"))
    };
    let gutter = i32::try_from(max_label.chars().count().max(min_label.chars().count()))
        .unwrap_or(0)
        + 1;
    canvas.put_str(rect.x0 + 1, plot_top, &max_label, axis);
    canvas.put_str(rect.x0 + 1, plot_bottom, &min_label, axis);

    let plot_left = rect.x0 + 1 + gutter;
    let plot_width = right - plot_left + 1;
    if plot_width < 1 {
        return;
    }
    let n = series.len();
    let height = f64::from(plot_bottom - plot_top);
    let column = |i: usize| -> i32 {
        if n <= 1 {
            return plot_left;
        }
        let span = i64::from(plot_width - 1);
        let offset = i64::try_from(i).unwrap_or(0) * span / i64::try_from(n - 1).unwrap_or(1);
        plot_left + i32::try_from(offset).unwrap_or(0)
    };

    for (i, point) in series.points().iter().enumerate() {
        if is_sentinel(point.value) {
            continue;
        }
        let frac = if max > min {
            (point.value - min) / (max - min)
        } else {
            0.5
        };
        #[allow(clippy::cast_possible_truncation)]
        let lift = (frac * height).round() as i32;
        canvas.put_char(column(i), plot_bottom - lift, PLOT_DOT, line);
    }

    // First, middle and last time labels along the bottom row.
    let labels: Vec<&str> = series.labels().collect();
    if let (Some(first), Some(last)) = (labels.first(), labels.last()) {
        canvas.put_str(plot_left, bottom, first, axis);
        if n > 2 {
            let mid = n / 2;
            let mid_x = column(mid) - 2;
            canvas.put_str(mid_x, bottom, labels[mid], axis);
        }
        let last_x = right + 1 - i32::try_from(last.chars().count()).unwrap_or(0);
        canvas.put_str(last_x, bottom, last, axis);
    }
}

// ──────────────────── terminal output ────────────────────

/// Write the whole canvas to the terminal, changing color only when needed.
#[cfg(feature = "tui")]
pub fn flush<W: std::io::Write>(canvas: &Canvas, out: &mut W) -> crate::core::errors::Result<()> {
    use crossterm::cursor::MoveTo;
    use crossterm::queue;
    use crossterm::style::{Print, ResetColor, SetForegroundColor};

    use crate::core::errors::DashError;

    let draw = |out: &mut W| -> std::io::Result<()> {
        for (y, row) in (0u16..).zip(canvas.rows()) {
            queue!(out, MoveTo(0, y), ResetColor)?;
            let mut current = Tone::Default;
            let mut run = String::new();
            for cell in row {
                if cell.tone != current {
                    if !run.is_empty() {
                        queue!(out, Print(std::mem::take(&mut run)))?;
                    }
                    match cell.tone.to_crossterm() {
                        Some(color) => queue!(out, SetForegroundColor(color))?,
                        None => queue!(out, ResetColor)?,
                    }
                    current = cell.tone;
                }
                run.push(cell.ch);
            }
            if !run.is_empty() {
                queue!(out, Print(run))?;
            }
        }
        queue!(out, ResetColor)?;
        out.flush()
    };
    draw(out).map_err(|e| DashError::terminal("draw", e))
}
