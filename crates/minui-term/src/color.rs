// SPDX-License-Identifier: MIT
//
// Colors and text effects.
//
// A `Color` is either an index into the terminal's 256-entry palette or a
// 24-bit RGB triple, packed into one `u32` with a tag bit. The default
// value is all-ones: an RGB white that doubles as the publisher's
// "nothing emitted yet" sentinel, guaranteeing the first cell of a frame
// always triggers a full graphic command.
//
// `Effect` bits sit at their SGR code positions (bold is SGR 1, italic
// SGR 3, ...), so emission is a walk over set bits writing the bit index.

use bitflags::bitflags;

// ─── Color ──────────────────────────────────────────────────────────────────

/// A palette or RGB color, packed into a `u32`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Color(u32);

impl Color {
    /// Set on RGB-encoded values; clear on palette indices.
    pub const RGB_MASK: u32 = 0x0100_0000;

    /// Build a color from a palette index.
    #[inline]
    #[must_use]
    pub const fn from_palette(palette_index: u8) -> Self {
        Self(palette_index as u32)
    }

    /// Build a color from RGB components.
    #[inline]
    #[must_use]
    pub const fn from_rgb(red: u8, green: u8, blue: u8) -> Self {
        Self(Self::RGB_MASK | (red as u32) << 16 | (green as u32) << 8 | blue as u32)
    }

    /// Build a color from an HSV description, encoded as RGB.
    ///
    /// `hue` in degrees `[0, 360]`, `saturation` and `value` in `[0, 1]`.
    #[must_use]
    pub fn from_hsv(hue: f32, saturation: f32, value: f32) -> Self {
        let chroma = saturation * value;
        let minimum = value - chroma;
        let col_full = to_component(value);
        let col_low = to_component(minimum);
        let col_inter = to_component(minimum + chroma * (1.0 - ((hue / 60.0) % 2.0 - 1.0).abs()));
        if hue <= 60.0 {
            Self::from_rgb(col_full, col_inter, col_low)
        } else if hue <= 120.0 {
            Self::from_rgb(col_inter, col_full, col_low)
        } else if hue <= 180.0 {
            Self::from_rgb(col_low, col_full, col_inter)
        } else if hue <= 240.0 {
            Self::from_rgb(col_low, col_inter, col_full)
        } else if hue <= 300.0 {
            Self::from_rgb(col_inter, col_low, col_full)
        } else {
            Self::from_rgb(col_full, col_low, col_inter)
        }
    }

    /// Rebuild a color from a raw packed value.
    #[inline]
    #[must_use]
    pub const fn from_raw(value: u32) -> Self {
        Self(value)
    }

    /// Whether this color is a palette index.
    #[inline]
    #[must_use]
    pub const fn is_palette(self) -> bool {
        self.0 & Self::RGB_MASK == 0
    }

    /// Whether this color is an RGB triple.
    #[inline]
    #[must_use]
    pub const fn is_rgb(self) -> bool {
        !self.is_palette()
    }

    /// Palette index. Only meaningful when [`is_palette`](Self::is_palette).
    #[inline]
    #[must_use]
    pub const fn palette_index(self) -> u8 {
        self.0 as u8
    }

    /// Red component. Only meaningful when [`is_rgb`](Self::is_rgb).
    #[inline]
    #[must_use]
    pub const fn red(self) -> u8 {
        (self.0 >> 16) as u8
    }

    /// Green component. Only meaningful when [`is_rgb`](Self::is_rgb).
    #[inline]
    #[must_use]
    pub const fn green(self) -> u8 {
        (self.0 >> 8) as u8
    }

    /// Blue component. Only meaningful when [`is_rgb`](Self::is_rgb).
    #[inline]
    #[must_use]
    pub const fn blue(self) -> u8 {
        self.0 as u8
    }

    /// The raw packed value.
    #[inline]
    #[must_use]
    pub const fn raw(self) -> u32 {
        self.0
    }
}

impl Default for Color {
    /// All-ones: an RGB white, distinct from every palette color.
    fn default() -> Self {
        Self(u32::MAX)
    }
}

#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn to_component(ratio: f32) -> u8 {
    (255.0 * ratio).round() as u8
}

// ─── Effect ─────────────────────────────────────────────────────────────────

bitflags! {
    /// Text attributes, with each bit at its SGR code position.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Hash)]
    pub struct Effect: u32 {
        const BOLD        = 1 << 1;
        const ITALIC      = 1 << 3;
        const UNDERLINE   = 1 << 4;
        const BLINK       = 1 << 5;
        const REVERSE     = 1 << 7;
        const CONCEAL     = 1 << 8;
        const CROSSED_OUT = 1 << 9;
    }
}

impl Effect {
    /// Lowest SGR code an effect bit can sit at.
    pub const FIRST_BIT: u32 = 1;
    /// Highest SGR code an effect bit can sit at.
    pub const LAST_BIT: u32 = 9;
}

// ─── Tests ───────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn palette_and_rgb_are_mutually_exclusive() {
        for idx in 0..=u8::MAX {
            let c = Color::from_palette(idx);
            assert!(c.is_palette());
            assert!(!c.is_rgb());
            assert_eq!(c.palette_index(), idx);
        }
        let c = Color::from_rgb(1, 2, 3);
        assert!(c.is_rgb());
        assert!(!c.is_palette());
    }

    #[test]
    fn rgb_components_round_trip() {
        let c = Color::from_rgb(0xab, 0xcd, 0xef);
        assert_eq!(c.red(), 0xab);
        assert_eq!(c.green(), 0xcd);
        assert_eq!(c.blue(), 0xef);
    }

    #[test]
    fn default_color_is_rgb_white() {
        let c = Color::default();
        assert!(c.is_rgb());
        assert_eq!((c.red(), c.green(), c.blue()), (255, 255, 255));
    }

    #[test]
    fn default_differs_from_every_palette_color() {
        for idx in 0..=u8::MAX {
            assert_ne!(Color::default(), Color::from_palette(idx));
        }
    }

    #[test]
    fn hsv_zero_saturation_is_grey() {
        let c = Color::from_hsv(123.0, 0.0, 0.5);
        assert!(c.is_rgb());
        assert_eq!(c.red(), c.green());
        assert_eq!(c.green(), c.blue());
    }

    #[test]
    fn hsv_primary_corners() {
        assert_eq!(Color::from_hsv(0.0, 1.0, 1.0), Color::from_rgb(255, 0, 0));
        assert_eq!(Color::from_hsv(120.0, 1.0, 1.0), Color::from_rgb(0, 255, 0));
        assert_eq!(Color::from_hsv(240.0, 1.0, 1.0), Color::from_rgb(0, 0, 255));
    }

    #[test]
    fn hsv_full_value_no_saturation_is_white() {
        assert_eq!(Color::from_hsv(300.0, 0.0, 1.0), Color::from_rgb(255, 255, 255));
    }

    #[test]
    fn effect_bits_sit_at_sgr_codes() {
        assert_eq!(Effect::BOLD.bits(), 1 << 1);
        assert_eq!(Effect::ITALIC.bits(), 1 << 3);
        assert_eq!(Effect::UNDERLINE.bits(), 1 << 4);
        assert_eq!(Effect::BLINK.bits(), 1 << 5);
        assert_eq!(Effect::REVERSE.bits(), 1 << 7);
        assert_eq!(Effect::CONCEAL.bits(), 1 << 8);
        assert_eq!(Effect::CROSSED_OUT.bits(), 1 << 9);
    }

    #[test]
    fn effects_combine_and_toggle() {
        let mut e = Effect::BOLD | Effect::ITALIC;
        e ^= Effect::ITALIC;
        assert_eq!(e, Effect::BOLD);
        e ^= Effect::ITALIC;
        assert_eq!(e, Effect::BOLD | Effect::ITALIC);
    }
}
