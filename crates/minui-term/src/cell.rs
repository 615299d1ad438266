// SPDX-License-Identifier: MIT
//
// Screen cells and the drawing style they carry.
//
// Every drawing primitive takes one explicit `Style` (foreground,
// background, effect); callers wanting the screen defaults build one via
// `Screen::default_style`. A `Cell` is never "empty": the grid is
// fully initialized at resize and every cell always holds a drawable
// glyph plus a complete style.

use crate::color::{Color, Effect};

// ─── Style ──────────────────────────────────────────────────────────────────

/// Complete rendering configuration for a run of text: colors plus effect.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Style {
    pub fg: Color,
    pub bg: Color,
    pub effect: Effect,
}

impl Style {
    /// Build a style from explicit colors with no effect.
    #[inline]
    #[must_use]
    pub const fn new(fg: Color, bg: Color) -> Self {
        Self {
            fg,
            bg,
            effect: Effect::empty(),
        }
    }

    /// Same colors with the given effect.
    #[inline]
    #[must_use]
    pub const fn with_effect(mut self, effect: Effect) -> Self {
        self.effect = effect;
        self
    }
}

// ─── Cell ───────────────────────────────────────────────────────────────────

/// One screen position's complete rendering state.
///
/// The glyph is stored as a raw `u32` codepoint rather than `char` so the
/// grid and the formatted-text pipeline share one representation (formatted
/// text carries out-of-Unicode marker values that `char` cannot hold; they
/// are stripped before reaching a cell, but the arithmetic stays in `u32`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Cell {
    pub glyph: u32,
    pub style: Style,
}

impl Cell {
    /// Reset to a space glyph, no effect, and the given colors.
    #[inline]
    pub const fn reset(&mut self, fg: Color, bg: Color) {
        self.glyph = ' ' as u32;
        self.style = Style::new(fg, bg);
    }

    /// A space cell with the given colors.
    #[inline]
    #[must_use]
    pub const fn blank(fg: Color, bg: Color) -> Self {
        Self {
            glyph: ' ' as u32,
            style: Style::new(fg, bg),
        }
    }
}

// ─── Tests ───────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn reset_restores_space_and_colors() {
        let mut cell = Cell {
            glyph: 'x' as u32,
            style: Style::new(Color::from_rgb(1, 2, 3), Color::from_palette(4))
                .with_effect(Effect::BOLD),
        };
        cell.reset(Color::from_palette(7), Color::from_palette(0));
        assert_eq!(cell.glyph, ' ' as u32);
        assert_eq!(cell.style.effect, Effect::empty());
        assert_eq!(cell.style.fg, Color::from_palette(7));
        assert_eq!(cell.style.bg, Color::from_palette(0));
    }

    #[test]
    fn blank_equals_reset() {
        let mut cell = Cell::blank(Color::from_palette(1), Color::from_palette(2));
        let blank = cell;
        cell.reset(Color::from_palette(1), Color::from_palette(2));
        assert_eq!(cell, blank);
    }

    #[test]
    fn style_default_has_no_effect() {
        assert_eq!(Style::default().effect, Effect::empty());
    }
}
