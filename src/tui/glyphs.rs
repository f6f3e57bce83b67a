//! Block-letter text rendering for the clock, date and metric label.
//!
//! [`PixelGlyphs`] draws from a 5-row pixel font scaled per [`GlyphFont`].
//! Letters are upper-cased; characters without a bitmap render as `?`.

#![allow(missing_docs)]

use crate::tui::layout::GlyphFont;

/// Turns a string into rows of block-letter text.
pub trait GlyphRenderer: Send + Sync {
    fn render(&self, text: &str, font: GlyphFont) -> Vec<String>;
}

const PIXEL_ROWS: usize = 5;

type Bitmap = [&'static str; PIXEL_ROWS];

/// Horizontal scale, vertical scale, half-block packing, gap between glyphs.
#[derive(Debug, Clone, Copy)]
struct Scale {
    sx: usize,
    sy: usize,
    half_block: bool,
    gap: usize,
}

const fn scale_for(font: GlyphFont) -> Option<Scale> {
    match font {
        GlyphFont::LargeImpact => Some(Scale {
            sx: 3,
            sy: 3,
            half_block: false,
            gap: 3,
        }),
        GlyphFont::Block => Some(Scale {
            sx: 2,
            sy: 3,
            half_block: true,
            gap: 1,
        }),
        GlyphFont::Standard => Some(Scale {
            sx: 2,
            sy: 1,
            half_block: false,
            gap: 1,
        }),
        GlyphFont::Small => Some(Scale {
            sx: 1,
            sy: 1,
            half_block: true,
            gap: 1,
        }),
        GlyphFont::Tiny => None,
    }
}

/// Built-in 3x5 pixel font.
#[derive(Debug, Clone, Copy, Default)]
pub struct PixelGlyphs;

impl GlyphRenderer for PixelGlyphs {
    fn render(&self, text: &str, font: GlyphFont) -> Vec<String> {
        let Some(scale) = scale_for(font) else {
            return vec![text.to_string()];
        };
        if text.is_empty() {
            return Vec::new();
        }

        // Expanded pixel grid, one Vec<bool> per scaled pixel row.
        let mut grid: Vec<Vec<bool>> = vec![Vec::new(); PIXEL_ROWS * scale.sy];
        for (i, ch) in text.chars().enumerate() {
            let bitmap = bitmap(ch.to_ascii_uppercase());
            for (py, row) in bitmap.iter().enumerate() {
                for sub in 0..scale.sy {
                    let line = &mut grid[py * scale.sy + sub];
                    if i > 0 {
                        line.extend(std::iter::repeat_n(false, scale.gap));
                    }
                    for px in row.bytes() {
                        line.extend(std::iter::repeat_n(px == b'#', scale.sx));
                    }
                }
            }
        }

        if scale.half_block {
            grid.chunks(2)
                .map(|pair| {
                    let top = &pair[0];
                    let bottom = pair.get(1);
                    top.iter()
                        .enumerate()
                        .map(|(x, &t)| {
                            let b = bottom.is_some_and(|row| row[x]);
                            match (t, b) {
                                (true, true) => '█',
                                (true, false) => '▀',
                                (false, true) => '▄',
                                (false, false) => ' ',
                            }
                        })
                        .collect::<String>()
                })
                .collect()
        } else {
            grid.iter()
                .map(|row| {
                    row.iter()
                        .map(|&on| if on { '█' } else { ' ' })
                        .collect::<String>()
                })
                .collect()
        }
    }
}

/// Left-pad every line by the same amount so the longest line ends at `width`.
/// Lines already wider than `width` are returned unchanged.
#[must_use]
pub fn right_align(lines: Vec<String>, width: usize) -> Vec<String> {
    let longest = lines.iter().map(|l| l.chars().count()).max().unwrap_or(0);
    if longest >= width {
        return lines;
    }
    let pad = " ".repeat(width - longest);
    lines.into_iter().map(|l| format!("{pad}{l}")).collect()
}

#[rustfmt::skip]
fn bitmap(ch: char) -> Bitmap {
    match ch {
        '0' => ["###", "#.#", "#.#", "#.#", "###"],
        '1' => [".#.", "##.", ".#.", ".#.", "###"],
        '2' => ["###", "..#", "###", "#..", "###"],
        '3' => ["###", "..#", "###", "..#", "###"],
        '4' => ["#.#", "#.#", "###", "..#", "..#"],
        '5' => ["###", "#..", "###", "..#", "###"],
        '6' => ["###", "#..", "###", "#.#", "###"],
        '7' => ["###", "..#", "..#", "..#", "..#"],
        '8' => ["###", "#.#", "###", "#.#", "###"],
        '9' => ["###", "#.#", "###", "..#", "###"],
        ':' => [".", "#", ".", "#", "."],
        ' ' => ["..", "..", "..", "..", ".."],
        '.' => [".", ".", ".", ".", "#"],
        '-' => ["...", "...", "###", "...", "..."],
        '_' => ["...", "...", "...", "...", "###"],
        '/' => ["..#", "..#", ".#.", "#..", "#.."],
        '%' => ["#.#", "..#", ".#.", "#..", "#.#"],
        'A' => [".#.", "#.#", "###", "#.#", "#.#"],
        'B' => ["##.", "#.#", "##.", "#.#", "##."],
        'C' => [".##", "#..", "#..", "#..", ".##"],
        'D' => ["##.", "#.#", "#.#", "#.#", "##."],
        'E' => ["###", "#..", "##.", "#..", "###"],
        'F' => ["###", "#..", "##.", "#..", "#.."],
        'G' => [".##", "#..", "#.#", "#.#", ".##"],
        'H' => ["#.#", "#.#", "###", "#.#", "#.#"],
        'I' => ["###", ".#.", ".#.", ".#.", "###"],
        'J' => ["..#", "..#", "..#", "#.#", ".#."],
        'K' => ["#.#", "#.#", "##.", "#.#", "#.#"],
        'L' => ["#..", "#..", "#..", "#..", "###"],
        'M' => ["#...#", "##.##", "#.#.#", "#...#", "#...#"],
        'N' => ["#..#", "##.#", "#.##", "#..#", "#..#"],
        'O' => [".#.", "#.#", "#.#", "#.#", ".#."],
        'P' => ["##.", "#.#", "##.", "#..", "#.."],
        'Q' => [".#.", "#.#", "#.#", "##.", ".##"],
        'R' => ["##.", "#.#", "##.", "#.#", "#.#"],
        'S' => [".##", "#..", ".#.", "..#", "##."],
        'T' => ["###", ".#.", ".#.", ".#.", ".#."],
        'U' => ["#.#", "#.#", "#.#", "#.#", "###"],
        'V' => ["#.#", "#.#", "#.#", "#.#", ".#."],
        'W' => ["#...#", "#...#", "#.#.#", "##.##", "#...#"],
        'X' => ["#.#", "#.#", ".#.", "#.#", "#.#"],
        'Y' => ["#.#", "#.#", ".#.", ".#.", ".#."],
        'Z' => ["###", "..#", ".#.", "#..", "###"],
        _ => ["###", "..#", ".##", "...", ".#."],
    }
}
