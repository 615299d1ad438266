// SPDX-License-Identifier: MIT
//
// Key and signal events, packed into a single value.
//
// An `Event` is one decoded keyboard action or one out-of-band signal.
// Everything lives in a single `u32`: the low 21 bits hold a Unicode
// codepoint (or a small special-key code), the high bits classify it.
// Exactly one of {plain codepoint, special key, signal, invalid} is
// active per value, and modifier bits stack on top of special keys.
//
// Packing keeps comparison trivial: an application matches decoded input
// against the named constants below with plain `==`, no destructuring.
// The terminal reports some keys ambiguously (Ctrl+I is Tab, Ctrl+M is
// Enter); the constants reflect the wire reality instead of hiding it.

// ─── Event ──────────────────────────────────────────────────────────────────

/// One decoded keyboard action or OS signal, packed into a `u32`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Event(u32);

impl Event {
    /// Set on values that carry no event at all.
    pub const INVALID_MASK: u32 = 0x8000_0000;
    /// Set on events delivered by a signal, with the signal number as value.
    pub const SIGNAL_MASK: u32 = 0x4000_0000;
    /// Ctrl modifier.
    pub const CTRL_MASK: u32 = 0x2000_0000;
    /// Alt modifier (special keys only).
    pub const ALT_MASK: u32 = 0x1000_0000;
    /// Shift modifier (special keys only).
    pub const SHIFT_MASK: u32 = 0x0800_0000;
    /// Set on non-printable special keys (arrows, function keys, ...).
    pub const SPECIAL_MASK: u32 = 0x0400_0000;
    /// Unicode codepoint on 21 bits.
    pub const VALUE_MASK: u32 = 0x001F_FFFF;

    /// The "no event" value.
    pub const INVALID: Self = Self(Self::INVALID_MASK);

    #[cfg(unix)]
    pub const SIG_INT: Self = Self::from_signal(libc::SIGINT);
    #[cfg(unix)]
    pub const SIG_TERM: Self = Self::from_signal(libc::SIGTERM);
    /// Terminal window size changed.
    #[cfg(unix)]
    pub const RESIZE: Self = Self::from_signal(libc::SIGWINCH);

    pub const CTRL_C: Self = Self(Self::CTRL_MASK | 'C' as u32);
    pub const BACKSPACE: Self = Self(0x7f);
    /// Tab arrives as Ctrl+I; both compare equal by construction.
    pub const TAB: Self = Self(Self::CTRL_MASK | 'I' as u32);
    /// Enter arrives as Ctrl+M; both compare equal by construction.
    pub const ENTER: Self = Self(Self::CTRL_MASK | 'M' as u32);
    pub const ESCAPE: Self = Self(27);

    pub const ARROW_UP: Self = Self(Self::SPECIAL_MASK | 0x1);
    pub const ARROW_DOWN: Self = Self(Self::SPECIAL_MASK | 0x2);
    pub const ARROW_RIGHT: Self = Self(Self::SPECIAL_MASK | 0x3);
    pub const ARROW_LEFT: Self = Self(Self::SPECIAL_MASK | 0x4);
    pub const INSERT: Self = Self(Self::SPECIAL_MASK | 0x5);
    pub const DELETE: Self = Self(Self::SPECIAL_MASK | 0x6);
    pub const END: Self = Self(Self::SPECIAL_MASK | 0x7);
    pub const HOME: Self = Self(Self::SPECIAL_MASK | 0x8);
    pub const PAGE_UP: Self = Self(Self::SPECIAL_MASK | 0x9);
    pub const PAGE_DOWN: Self = Self(Self::SPECIAL_MASK | 0xa);
    pub const KEYPAD_CENTER: Self = Self(Self::SPECIAL_MASK | 0xb);

    pub const F1: Self = Self(Self::SPECIAL_MASK | 0x101);
    pub const F2: Self = Self(Self::SPECIAL_MASK | 0x102);
    pub const F3: Self = Self(Self::SPECIAL_MASK | 0x103);
    pub const F4: Self = Self(Self::SPECIAL_MASK | 0x104);
    pub const F5: Self = Self(Self::SPECIAL_MASK | 0x105);
    pub const F6: Self = Self(Self::SPECIAL_MASK | 0x106);
    pub const F7: Self = Self(Self::SPECIAL_MASK | 0x107);
    pub const F8: Self = Self(Self::SPECIAL_MASK | 0x108);
    pub const F9: Self = Self(Self::SPECIAL_MASK | 0x109);
    pub const F10: Self = Self(Self::SPECIAL_MASK | 0x10a);
    pub const F11: Self = Self(Self::SPECIAL_MASK | 0x10b);
    pub const F12: Self = Self(Self::SPECIAL_MASK | 0x10c);

    pub const SHIFT_ARROW_UP: Self = Self(Self::SHIFT_MASK | Self::ARROW_UP.0);
    pub const SHIFT_ARROW_DOWN: Self = Self(Self::SHIFT_MASK | Self::ARROW_DOWN.0);
    pub const SHIFT_ARROW_RIGHT: Self = Self(Self::SHIFT_MASK | Self::ARROW_RIGHT.0);
    pub const SHIFT_ARROW_LEFT: Self = Self(Self::SHIFT_MASK | Self::ARROW_LEFT.0);
    pub const SHIFT_DELETE: Self = Self(Self::SHIFT_MASK | Self::DELETE.0);
    pub const SHIFT_END: Self = Self(Self::SHIFT_MASK | Self::END.0);
    pub const SHIFT_HOME: Self = Self(Self::SHIFT_MASK | Self::HOME.0);
    pub const SHIFT_ENTER: Self = Self(Self::SHIFT_MASK | 0xfe);
    pub const SHIFT_TAB: Self = Self(Self::SHIFT_MASK | 0xff);

    pub const ALT_ARROW_UP: Self = Self(Self::ALT_MASK | Self::ARROW_UP.0);
    pub const ALT_ARROW_DOWN: Self = Self(Self::ALT_MASK | Self::ARROW_DOWN.0);
    pub const ALT_ARROW_RIGHT: Self = Self(Self::ALT_MASK | Self::ARROW_RIGHT.0);
    pub const ALT_ARROW_LEFT: Self = Self(Self::ALT_MASK | Self::ARROW_LEFT.0);
    pub const ALT_INSERT: Self = Self(Self::ALT_MASK | Self::INSERT.0);
    pub const ALT_DELETE: Self = Self(Self::ALT_MASK | Self::DELETE.0);
    pub const ALT_END: Self = Self(Self::ALT_MASK | Self::END.0);
    pub const ALT_HOME: Self = Self(Self::ALT_MASK | Self::HOME.0);
    pub const ALT_PAGE_UP: Self = Self(Self::ALT_MASK | Self::PAGE_UP.0);
    pub const ALT_PAGE_DOWN: Self = Self(Self::ALT_MASK | Self::PAGE_DOWN.0);

    pub const CTRL_ARROW_UP: Self = Self(Self::CTRL_MASK | Self::ARROW_UP.0);
    pub const CTRL_ARROW_DOWN: Self = Self(Self::CTRL_MASK | Self::ARROW_DOWN.0);
    pub const CTRL_ARROW_RIGHT: Self = Self(Self::CTRL_MASK | Self::ARROW_RIGHT.0);
    pub const CTRL_ARROW_LEFT: Self = Self(Self::CTRL_MASK | Self::ARROW_LEFT.0);
    pub const CTRL_INSERT: Self = Self(Self::CTRL_MASK | Self::INSERT.0);
    pub const CTRL_DELETE: Self = Self(Self::CTRL_MASK | Self::DELETE.0);
    pub const CTRL_END: Self = Self(Self::CTRL_MASK | Self::END.0);
    pub const CTRL_HOME: Self = Self(Self::CTRL_MASK | Self::HOME.0);
    pub const CTRL_PAGE_UP: Self = Self(Self::CTRL_MASK | Self::PAGE_UP.0);
    pub const CTRL_PAGE_DOWN: Self = Self(Self::CTRL_MASK | Self::PAGE_DOWN.0);

    /// Build an event from a raw packed value.
    #[inline]
    #[must_use]
    pub const fn from_raw(value: u32) -> Self {
        Self(value)
    }

    /// Build a plain-codepoint event.
    #[inline]
    #[must_use]
    pub const fn from_char(c: char) -> Self {
        Self(c as u32)
    }

    /// Build an event for a delivered OS signal.
    #[inline]
    #[must_use]
    pub const fn from_signal(signum: i32) -> Self {
        Self(Self::SIGNAL_MASK | signum as u32)
    }

    /// Build a Ctrl+letter event from a 0-based letter offset
    /// (0 is Ctrl+A, 25 is Ctrl+Z).
    #[inline]
    #[must_use]
    pub const fn from_ctrl(letter_offset: u32) -> Self {
        Self(Self::CTRL_MASK | ('A' as u32 + letter_offset))
    }

    /// Whether this value carries an event at all.
    #[inline]
    #[must_use]
    pub const fn is_valid(self) -> bool {
        self.0 & Self::INVALID_MASK == 0
    }

    /// Whether this event was delivered by a signal.
    #[inline]
    #[must_use]
    pub const fn is_signal(self) -> bool {
        self.0 & Self::SIGNAL_MASK != 0
    }

    /// Whether this event is a special (non-printable) key.
    #[inline]
    #[must_use]
    pub const fn is_special(self) -> bool {
        self.0 & Self::SPECIAL_MASK != 0
    }

    /// The raw packed value.
    #[inline]
    #[must_use]
    pub const fn raw(self) -> u32 {
        self.0
    }

    /// The 21-bit payload: a codepoint, special-key code, or signal number.
    #[inline]
    #[must_use]
    pub const fn value(self) -> u32 {
        self.0 & Self::VALUE_MASK
    }

    /// The plain codepoint, if this event is one.
    ///
    /// `None` for signals, special keys, modified keys, and invalid values.
    #[must_use]
    pub fn codepoint(self) -> Option<char> {
        if self.0 & !Self::VALUE_MASK == 0 {
            char::from_u32(self.0)
        } else {
            None
        }
    }

    /// Human-readable description, for diagnostics and demo UIs.
    #[must_use]
    pub fn describe(self) -> String {
        if !self.is_valid() {
            return "none".to_string();
        }
        if self.is_signal() {
            return format!("signal {}", self.value());
        }

        let mut out = String::new();
        if self.0 & Self::CTRL_MASK != 0 {
            out.push_str("Ctrl+");
        }
        if self.0 & Self::ALT_MASK != 0 {
            out.push_str("Alt+");
        }
        if self.0 & Self::SHIFT_MASK != 0 {
            out.push_str("Shift+");
        }

        if self.is_special() {
            out.push_str(special_name(self.value()));
        } else {
            match self.value() {
                0x7f => out.push_str("Backspace"),
                27 => out.push_str("Escape"),
                // 0xfe/0xff are key codes only under Shift; as plain
                // values they are the codepoints þ and ÿ.
                0xfe if self.0 & Self::SHIFT_MASK != 0 => out.push_str("Enter"),
                0xff if self.0 & Self::SHIFT_MASK != 0 => out.push_str("Tab"),
                v => match char::from_u32(v) {
                    Some(c) if self.0 & Self::CTRL_MASK != 0 => out.push(c),
                    Some(c) => out.push_str(&format!("'{c}'")),
                    None => out.push_str(&format!("U+{v:X}")),
                },
            }
        }
        out
    }
}

impl Default for Event {
    fn default() -> Self {
        Self::INVALID
    }
}

/// Name of a special-key code (the 21-bit payload of a special event).
fn special_name(code: u32) -> &'static str {
    match code {
        0x1 => "ArrowUp",
        0x2 => "ArrowDown",
        0x3 => "ArrowRight",
        0x4 => "ArrowLeft",
        0x5 => "Insert",
        0x6 => "Delete",
        0x7 => "End",
        0x8 => "Home",
        0x9 => "PageUp",
        0xa => "PageDown",
        0xb => "KeypadCenter",
        0x101 => "F1",
        0x102 => "F2",
        0x103 => "F3",
        0x104 => "F4",
        0x105 => "F5",
        0x106 => "F6",
        0x107 => "F7",
        0x108 => "F8",
        0x109 => "F9",
        0x10a => "F10",
        0x10b => "F11",
        0x10c => "F12",
        _ => "?",
    }
}

// ─── Tests ───────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn invalid_is_not_valid() {
        assert!(!Event::INVALID.is_valid());
        assert!(!Event::default().is_valid());
    }

    #[test]
    fn plain_codepoint_round_trips() {
        let e = Event::from_char('é');
        assert!(e.is_valid());
        assert_eq!(e.codepoint(), Some('é'));
    }

    #[test]
    fn ctrl_constructor_matches_constant() {
        // Byte 0x03 on the wire is Ctrl+C: offset 2 from 'A'.
        assert_eq!(Event::from_ctrl(2), Event::CTRL_C);
    }

    #[test]
    fn tab_and_enter_alias_their_ctrl_keys() {
        assert_eq!(Event::TAB, Event::from_ctrl('I' as u32 - 'A' as u32));
        assert_eq!(Event::ENTER, Event::from_ctrl('M' as u32 - 'A' as u32));
    }

    #[cfg(unix)]
    #[test]
    fn signal_events_carry_the_signal_number() {
        assert!(Event::SIG_INT.is_signal());
        assert_eq!(Event::SIG_INT.value(), libc::SIGINT as u32);
        assert_eq!(Event::from_signal(libc::SIGWINCH), Event::RESIZE);
    }

    #[test]
    fn special_keys_have_no_codepoint() {
        assert_eq!(Event::ARROW_UP.codepoint(), None);
        assert_eq!(Event::F12.codepoint(), None);
        assert_eq!(Event::CTRL_HOME.codepoint(), None);
    }

    #[test]
    fn exactly_one_category_active() {
        assert!(Event::ARROW_UP.is_special());
        assert!(!Event::ARROW_UP.is_signal());
        assert!(!Event::from_char('a').is_special());
        assert!(!Event::from_char('a').is_signal());
    }

    #[test]
    fn modifier_variants_differ_from_base() {
        assert_ne!(Event::ARROW_UP, Event::SHIFT_ARROW_UP);
        assert_ne!(Event::SHIFT_ARROW_UP, Event::ALT_ARROW_UP);
        assert_ne!(Event::ALT_ARROW_UP, Event::CTRL_ARROW_UP);
    }

    #[test]
    fn describe_names_keys() {
        assert_eq!(Event::from_char('a').describe(), "'a'");
        assert_eq!(Event::CTRL_C.describe(), "Ctrl+C");
        assert_eq!(Event::ARROW_LEFT.describe(), "ArrowLeft");
        assert_eq!(Event::SHIFT_TAB.describe(), "Shift+Tab");
        assert_eq!(Event::CTRL_PAGE_DOWN.describe(), "Ctrl+PageDown");
        assert_eq!(Event::INVALID.describe(), "none");
    }

    #[test]
    fn describe_keeps_high_latin1_chars_plain() {
        // U+00FE and U+00FF share their values with the Shift+Enter and
        // Shift+Tab key codes; without Shift they are ordinary glyphs.
        assert_eq!(Event::from_char('þ').describe(), "'þ'");
        assert_eq!(Event::from_char('ÿ').describe(), "'ÿ'");
        assert_eq!(Event::SHIFT_ENTER.describe(), "Shift+Enter");
        assert_eq!(Event::SHIFT_TAB.describe(), "Shift+Tab");
    }
}
