// SPDX-License-Identifier: MIT
//
// Formatted text: UTF-32 with inline style-switch markers.
//
// A `FormattedText` is a sequence of `u32` values mixing real codepoints
// with marker values that sit outside the Unicode range (bit 31 set, which
// no scalar value can carry). A marker switches the active effect,
// foreground, or background for every glyph that follows it, until the
// next marker of the same kind or the end of the string. `Screen::put_fstring`
// is the consumer.
//
// `from_markdown` builds formatted lines from a lightweight notation:
// doubled `**` `//` `__` `--` toggle bold / italic / underline /
// crossed-out by XOR on a running effect.

use crate::color::{Color, Effect};

// ─── Markers ────────────────────────────────────────────────────────────────

/// Set on every marker; makes the value an invalid Unicode codepoint.
const MARKER_MASK: u32 = 0x8000_0000;
const EFFECT_MASK: u32 = 0x4000_0000;
const FG_MASK: u32 = 0x2000_0000;
const BG_MASK: u32 = 0x1000_0000;
const PAYLOAD_MASK: u32 = 0x0FFF_FFFF;

/// A decoded style-switch marker.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Marker {
    Effect(Effect),
    Fg(Color),
    Bg(Color),
}

/// Whether a formatted-text value is a marker rather than a codepoint.
#[inline]
#[must_use]
pub const fn is_marker(value: u32) -> bool {
    value & MARKER_MASK != 0
}

/// Decode a marker value. Returns `None` for plain codepoints.
#[must_use]
pub fn decode_marker(value: u32) -> Option<Marker> {
    if !is_marker(value) {
        return None;
    }
    let payload = value & PAYLOAD_MASK;
    if value & EFFECT_MASK != 0 {
        Some(Marker::Effect(Effect::from_bits_truncate(payload)))
    } else if value & FG_MASK != 0 {
        Some(Marker::Fg(Color::from_raw(payload)))
    } else if value & BG_MASK != 0 {
        Some(Marker::Bg(Color::from_raw(payload)))
    } else {
        None
    }
}

/// Encode an effect-switch marker.
#[inline]
#[must_use]
pub const fn effect_marker(effect: Effect) -> u32 {
    MARKER_MASK | EFFECT_MASK | effect.bits()
}

/// Encode a foreground-switch marker.
#[inline]
#[must_use]
pub const fn fg_marker(color: Color) -> u32 {
    MARKER_MASK | FG_MASK | (color.raw() & PAYLOAD_MASK)
}

/// Encode a background-switch marker.
#[inline]
#[must_use]
pub const fn bg_marker(color: Color) -> u32 {
    MARKER_MASK | BG_MASK | (color.raw() & PAYLOAD_MASK)
}

// ─── FormattedText ──────────────────────────────────────────────────────────

/// A formatted string: codepoints interleaved with style-switch markers.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FormattedText(Vec<u32>);

impl FormattedText {
    #[must_use]
    pub const fn new() -> Self {
        Self(Vec::new())
    }

    /// Append plain text.
    pub fn push_str(&mut self, text: &str) -> &mut Self {
        self.0.extend(text.chars().map(|c| c as u32));
        self
    }

    /// Append an effect switch affecting all following glyphs.
    pub fn push_effect(&mut self, effect: Effect) -> &mut Self {
        self.0.push(effect_marker(effect));
        self
    }

    /// Append a foreground-color switch.
    pub fn push_fg(&mut self, color: Color) -> &mut Self {
        self.0.push(fg_marker(color));
        self
    }

    /// Append a background-color switch.
    pub fn push_bg(&mut self, color: Color) -> &mut Self {
        self.0.push(bg_marker(color));
        self
    }

    /// The raw value sequence, markers included.
    #[must_use]
    pub fn as_slice(&self) -> &[u32] {
        &self.0
    }

    /// Number of visible glyphs (markers excluded).
    #[must_use]
    pub fn glyph_count(&self) -> usize {
        self.0.iter().filter(|&&v| !is_marker(v)).count()
    }
}

impl From<&str> for FormattedText {
    fn from(text: &str) -> Self {
        let mut out = Self::new();
        out.push_str(text);
        out
    }
}

// ─── Markdown-lite ──────────────────────────────────────────────────────────

/// Effect toggled by a doubled marker character, if it is one.
const fn toggle_for(c: char) -> Option<Effect> {
    match c {
        '*' => Some(Effect::BOLD),
        '/' => Some(Effect::ITALIC),
        '_' => Some(Effect::UNDERLINE),
        '-' => Some(Effect::CROSSED_OUT),
        _ => None,
    }
}

/// Convert markdown-lite notation into formatted lines.
///
/// `**bold**`, `//italic//`, `__underline__` and `--crossed--` toggle their
/// effect by XOR on a running state; every doubled marker character is a
/// toggle, single occurrences are literal. Lines are split on `\n` and each
/// starts with a fresh empty effect; an unpaired toggle stays in effect
/// until its line ends.
#[must_use]
pub fn from_markdown(text: &str) -> Vec<FormattedText> {
    text.split('\n').map(markdown_line).collect()
}

fn markdown_line(line: &str) -> FormattedText {
    let mut out = FormattedText::new();
    let mut effect = Effect::empty();
    let mut chars = line.chars().peekable();

    while let Some(c) = chars.next() {
        match toggle_for(c) {
            Some(toggled) if chars.peek() == Some(&c) => {
                chars.next();
                effect ^= toggled;
                out.push_effect(effect);
            }
            _ => {
                out.0.push(c as u32);
            }
        }
    }
    out
}

// ─── Tests ───────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn markers_are_not_codepoints() {
        assert!(is_marker(effect_marker(Effect::BOLD)));
        assert!(is_marker(fg_marker(Color::from_palette(3))));
        assert!(is_marker(bg_marker(Color::from_rgb(1, 2, 3))));
        assert!(!is_marker('é' as u32));
        assert!(!is_marker(0x10_FFFF));
    }

    #[test]
    fn marker_round_trip() {
        let e = Effect::BOLD | Effect::CROSSED_OUT;
        assert_eq!(decode_marker(effect_marker(e)), Some(Marker::Effect(e)));

        let fg = Color::from_rgb(10, 20, 30);
        assert_eq!(decode_marker(fg_marker(fg)), Some(Marker::Fg(fg)));

        let bg = Color::from_palette(42);
        assert_eq!(decode_marker(bg_marker(bg)), Some(Marker::Bg(bg)));

        assert_eq!(decode_marker('a' as u32), None);
    }

    #[test]
    fn builder_interleaves_text_and_markers() {
        let mut ft = FormattedText::new();
        ft.push_str("a").push_effect(Effect::ITALIC).push_str("b");
        assert_eq!(
            ft.as_slice(),
            &['a' as u32, effect_marker(Effect::ITALIC), 'b' as u32]
        );
        assert_eq!(ft.glyph_count(), 2);
    }

    #[test]
    fn markdown_bold_toggles_on_and_off() {
        let lines = from_markdown("**a**");
        assert_eq!(lines.len(), 1);
        assert_eq!(
            lines[0].as_slice(),
            &[
                effect_marker(Effect::BOLD),
                'a' as u32,
                effect_marker(Effect::empty()),
            ]
        );
    }

    #[test]
    fn markdown_single_marker_chars_are_literal() {
        let lines = from_markdown("a*b/c_d-e");
        assert_eq!(lines[0], FormattedText::from("a*b/c_d-e"));
    }

    #[test]
    fn markdown_effects_nest_by_xor() {
        let lines = from_markdown("**a//b//**");
        assert_eq!(
            lines[0].as_slice(),
            &[
                effect_marker(Effect::BOLD),
                'a' as u32,
                effect_marker(Effect::BOLD | Effect::ITALIC),
                'b' as u32,
                effect_marker(Effect::BOLD),
                effect_marker(Effect::empty()),
            ]
        );
    }

    #[test]
    fn markdown_state_resets_per_line() {
        let lines = from_markdown("**a\nb");
        assert_eq!(lines.len(), 2);
        assert_eq!(
            lines[0].as_slice(),
            &[effect_marker(Effect::BOLD), 'a' as u32]
        );
        assert_eq!(lines[1], FormattedText::from("b"));
    }

    #[test]
    fn markdown_all_four_toggles() {
        let lines = from_markdown("__u__--s--");
        assert_eq!(
            lines[0].as_slice(),
            &[
                effect_marker(Effect::UNDERLINE),
                'u' as u32,
                effect_marker(Effect::empty()),
                effect_marker(Effect::CROSSED_OUT),
                's' as u32,
                effect_marker(Effect::empty()),
            ]
        );
    }
}
