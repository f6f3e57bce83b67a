//! Semantic palette and `NO_COLOR` handling for dashboard rendering.

#![allow(missing_docs)]

use std::env;

use crate::metrics::threshold::{Severity, StatusLevel};

/// Color output mode for compatibility with `NO_COLOR`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColorMode {
    Enabled,
    Disabled,
}

/// Accessibility knobs consumed by the palette.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AccessibilityProfile {
    pub color: ColorMode,
}

impl Default for AccessibilityProfile {
    fn default() -> Self {
        Self {
            color: ColorMode::Enabled,
        }
    }
}

impl AccessibilityProfile {
    #[must_use]
    pub const fn from_no_color_flag(no_color: bool) -> Self {
        Self {
            color: if no_color {
                ColorMode::Disabled
            } else {
                ColorMode::Enabled
            },
        }
    }

    #[must_use]
    pub fn from_environment() -> Self {
        Self::from_no_color_flag(env::var_os("NO_COLOR").is_some())
    }

    #[must_use]
    pub const fn no_color(self) -> bool {
        matches!(self.color, ColorMode::Disabled)
    }
}

/// Terminal-independent foreground color.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum Tone {
    /// Whatever the terminal's default foreground is.
    #[default]
    Default,
    White,
    Yellow,
    Green,
    Red,
    Magenta,
    DarkGrey,
}

#[cfg(feature = "tui")]
impl Tone {
    #[must_use]
    pub const fn to_crossterm(self) -> Option<crossterm::style::Color> {
        use crossterm::style::Color;
        match self {
            Self::Default => None,
            Self::White => Some(Color::White),
            Self::Yellow => Some(Color::Yellow),
            Self::Green => Some(Color::Green),
            Self::Red => Some(Color::Red),
            Self::Magenta => Some(Color::Magenta),
            Self::DarkGrey => Some(Color::DarkGrey),
        }
    }
}

/// Role-to-tone mapping for every dashboard surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ThemePalette {
    pub clock: Tone,
    pub date: Tone,
    pub title: Tone,
    pub axis: Tone,
    pub advisory: Tone,
    pub line_neutral: Tone,
    pub line_warn: Tone,
    pub line_error: Tone,
    pub line_missing: Tone,
    pub status_neutral: Tone,
    pub status_warn: Tone,
    pub status_error: Tone,
}

impl ThemePalette {
    #[must_use]
    pub const fn standard() -> Self {
        Self {
            clock: Tone::Yellow,
            date: Tone::White,
            title: Tone::White,
            axis: Tone::DarkGrey,
            advisory: Tone::Red,
            line_neutral: Tone::Green,
            line_warn: Tone::Yellow,
            line_error: Tone::Red,
            line_missing: Tone::Magenta,
            status_neutral: Tone::White,
            status_warn: Tone::Yellow,
            status_error: Tone::Red,
        }
    }

    /// Every role falls back to the terminal default.
    #[must_use]
    pub const fn monochrome() -> Self {
        Self {
            clock: Tone::Default,
            date: Tone::Default,
            title: Tone::Default,
            axis: Tone::Default,
            advisory: Tone::Default,
            line_neutral: Tone::Default,
            line_warn: Tone::Default,
            line_error: Tone::Default,
            line_missing: Tone::Default,
            status_neutral: Tone::Default,
            status_warn: Tone::Default,
            status_error: Tone::Default,
        }
    }

    #[must_use]
    pub const fn for_profile(profile: AccessibilityProfile) -> Self {
        if profile.no_color() {
            Self::monochrome()
        } else {
            Self::standard()
        }
    }

    #[must_use]
    pub const fn for_line(self, severity: Severity) -> Tone {
        match severity {
            Severity::Neutral => self.line_neutral,
            Severity::Warn => self.line_warn,
            Severity::Error => self.line_error,
            Severity::Missing => self.line_missing,
        }
    }

    #[must_use]
    pub const fn for_status(self, status: StatusLevel) -> Tone {
        match status {
            StatusLevel::Neutral => self.status_neutral,
            StatusLevel::Warn => self.status_warn,
            StatusLevel::Error => self.status_error,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn no_color_profile_disables_color_mode() {
        let profile = AccessibilityProfile::from_no_color_flag(true);
        assert!(profile.no_color());
        let palette = ThemePalette::for_profile(profile);
        assert_eq!(palette.for_line(Severity::Error), Tone::Default);
        assert_eq!(palette.clock, Tone::Default);
    }

    #[test]
    fn severities_map_to_distinct_line_tones() {
        let p = ThemePalette::standard();
        assert_eq!(p.for_line(Severity::Neutral), Tone::Green);
        assert_eq!(p.for_line(Severity::Warn), Tone::Yellow);
        assert_eq!(p.for_line(Severity::Error), Tone::Red);
        assert_eq!(p.for_line(Severity::Missing), Tone::Magenta);
    }

    #[test]
    fn status_levels_map_to_tones() {
        let p = ThemePalette::standard();
        assert_eq!(p.for_status(StatusLevel::Neutral), Tone::White);
        assert_eq!(p.for_status(StatusLevel::Error), Tone::Red);
    }
}
