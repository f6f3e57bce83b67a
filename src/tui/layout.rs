//! Breakpoint-driven layout: terminal geometry to widget rectangles and fonts.
//!
//! [`layout`] is pure and total. Rules are evaluated in order and the first
//! match wins; the exact 240x30 panel rule is strictly narrower than the
//! general wide rule that follows it.

#![allow(missing_docs)]

/// Half-open rectangle in terminal cells. Coordinates may be negative or run
/// past the screen edge; drawing clips to the screen.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Rect {
    pub x0: i32,
    pub y0: i32,
    pub x1: i32,
    pub y1: i32,
}

impl Rect {
    #[must_use]
    pub const fn new(x0: i32, y0: i32, x1: i32, y1: i32) -> Self {
        Self { x0, y0, x1, y1 }
    }

    #[must_use]
    pub const fn width(self) -> i32 {
        self.x1 - self.x0
    }

    #[must_use]
    pub const fn height(self) -> i32 {
        self.y1 - self.y0
    }

    /// Interior area once a one-cell border is removed.
    #[must_use]
    pub const fn inner(self) -> Self {
        Self::new(self.x0 + 1, self.y0 + 1, self.x1 - 1, self.y1 - 1)
    }
}

/// Glyph sizes, largest first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GlyphFont {
    LargeImpact,
    Block,
    Standard,
    Small,
    Tiny,
}

impl GlyphFont {
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::LargeImpact => "large-impact",
            Self::Block => "block",
            Self::Standard => "standard",
            Self::Small => "small",
            Self::Tiny => "tiny",
        }
    }
}

/// Which breakpoint rule matched.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LayoutProfile {
    /// Exactly 240x30: fixed panel with a big-glyph metric label.
    WidePanel,
    Wide,
    Medium,
    Compact,
    Unsupported,
}

impl LayoutProfile {
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::WidePanel => "wide-panel",
            Self::Wide => "wide",
            Self::Medium => "medium",
            Self::Compact => "compact",
            Self::Unsupported => "unsupported",
        }
    }
}

/// Geometry and fonts for a supported terminal size.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SupportedLayout {
    pub profile: LayoutProfile,
    pub clock_rect: Rect,
    pub date_rect: Rect,
    pub chart_rect: Rect,
    pub metric_rect: Rect,
    pub clock_font: GlyphFont,
    pub date_font: GlyphFont,
    /// `None`: the chart carries the title; `Some`: a big-glyph metric panel does.
    pub label_font: Option<GlyphFont>,
    /// Pad width keeping the clock glyph block right-anchored.
    pub clock_display_width: usize,
    pub date_display_width: usize,
}

/// Whether anything beyond the advisory can be drawn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Support {
    Supported(SupportedLayout),
    Unsupported { cols: u16, rows: u16 },
}

/// Result of [`layout`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct LayoutDescriptor {
    pub cols: u16,
    pub rows: u16,
    pub support: Support,
}

impl LayoutDescriptor {
    #[must_use]
    pub const fn is_supported(&self) -> bool {
        matches!(self.support, Support::Supported(_))
    }

    #[must_use]
    pub const fn supported(&self) -> Option<&SupportedLayout> {
        match &self.support {
            Support::Supported(layout) => Some(layout),
            Support::Unsupported { .. } => None,
        }
    }

    #[must_use]
    pub const fn profile(&self) -> LayoutProfile {
        match &self.support {
            Support::Supported(layout) => layout.profile,
            Support::Unsupported { .. } => LayoutProfile::Unsupported,
        }
    }
}

/// Map terminal size to a layout.
#[must_use]
pub fn layout(cols: u16, rows: u16) -> LayoutDescriptor {
    let w = i32::from(cols);
    let h = i32::from(rows);
    let support = match (cols, rows) {
        (240, 30) => Support::Supported(SupportedLayout {
            profile: LayoutProfile::WidePanel,
            clock_rect: Rect::new(100, -3, w - 28, 17),
            date_rect: Rect::new(w - 30, -1, w + 1, 17),
            chart_rect: Rect::new(0, 16, w + 1, h + 1),
            metric_rect: Rect::new(0, 4, w - 140, 17),
            clock_font: GlyphFont::LargeImpact,
            date_font: GlyphFont::Standard,
            label_font: Some(GlyphFont::Standard),
            clock_display_width: 109,
            date_display_width: 29,
        }),
        (c, r) if c >= 131 && r >= 30 => Support::Supported(SupportedLayout {
            profile: LayoutProfile::Wide,
            clock_rect: Rect::new(0, -3, w - 28, 17),
            date_rect: Rect::new(w - 30, -1, w + 1, 17),
            chart_rect: Rect::new(0, 17, w + 1, h + 1),
            metric_rect: Rect::new(0, 4, w - 140, 17),
            clock_font: GlyphFont::LargeImpact,
            date_font: GlyphFont::Standard,
            label_font: None,
            clock_display_width: usize::from(c) - 32,
            date_display_width: 29,
        }),
        (c, r) if c >= 68 && r >= 20 => Support::Supported(SupportedLayout {
            profile: LayoutProfile::Medium,
            clock_rect: Rect::new(0, 0, w - 16, 11),
            date_rect: Rect::new(w - 18, -1, w + 1, 11),
            chart_rect: Rect::new(0, 11, w + 1, h + 1),
            metric_rect: Rect::new(0, 4, w - 140, 11),
            clock_font: GlyphFont::Block,
            date_font: GlyphFont::Small,
            label_font: None,
            clock_display_width: usize::from(c) - 20,
            date_display_width: 17,
        }),
        (c, r) if c >= 40 && r >= 16 => Support::Supported(SupportedLayout {
            profile: LayoutProfile::Compact,
            clock_rect: Rect::new(-2, -1, w - 4, 6),
            date_rect: Rect::new(w - 5, 1, w + 1, 6),
            chart_rect: Rect::new(0, 6, w + 1, h + 1),
            metric_rect: Rect::new(0, 4, w - 140, 6),
            clock_font: GlyphFont::Standard,
            date_font: GlyphFont::Tiny,
            label_font: None,
            clock_display_width: usize::from(c) - 8,
            date_display_width: 4,
        }),
        _ => Support::Unsupported { cols, rows },
    };
    LayoutDescriptor {
        cols,
        rows,
        support,
    }
}

/// Advisory text shown instead of the dashboard on a too-small terminal.
#[must_use]
pub fn unsupported_message(cols: u16, rows: u16) -> [String; 2] {
    [
        format!("Unsupported terminal size of {cols} x {rows}"),
        "Resize or (q)uit".to_string(),
    ]
}
