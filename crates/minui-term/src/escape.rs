// SPDX-License-Identifier: MIT
//
// Input escape-sequence recognition.
//
// After an ESC byte, terminals send short fixed sequences for the
// non-printable keys: SS3 (`O` + final) for arrows, Home/End and F1–F4,
// CSI (`[` + parameters + final) for the rest, with `;2` / `;1` / `;5`
// parameter infixes encoding Shift / Alt / Ctrl. This module holds the
// exact supported sequence set and matches the already-buffered bytes
// against it.
//
// The matcher runs on every input cycle, so it branches per byte: Rust
// slice patterns compile to the same decision tree a hand-generated
// switch cascade would. Matching is exact; lookahead is bounded by the
// longest entry (5 bytes). Bytes not forming a known sequence match
// nothing, and the caller reports a bare Escape instead.

use crate::event::Event;

/// Match the start of `data` (the bytes following an ESC) against the
/// sequence table.
///
/// Returns the decoded event and the number of bytes the sequence used,
/// or `None` when no known sequence starts here.
#[must_use]
pub fn identify(data: &[u8]) -> Option<(Event, usize)> {
    let (event, consumed) = match data {
        // SS3 sequences.
        [b'O', b'A', ..] => (Event::ARROW_UP, 2),
        [b'O', b'B', ..] => (Event::ARROW_DOWN, 2),
        [b'O', b'C', ..] => (Event::ARROW_RIGHT, 2),
        [b'O', b'D', ..] => (Event::ARROW_LEFT, 2),
        [b'O', b'F', ..] => (Event::END, 2),
        [b'O', b'H', ..] => (Event::HOME, 2),
        [b'O', b'P', ..] => (Event::F1, 2),
        [b'O', b'Q', ..] => (Event::F2, 2),
        [b'O', b'R', ..] => (Event::F3, 2),
        [b'O', b'S', ..] => (Event::F4, 2),
        [b'O', b'M', ..] => (Event::SHIFT_ENTER, 2),

        // CSI, tilde-terminated.
        [b'[', b'2', b'~', ..] => (Event::INSERT, 3),
        [b'[', b'3', b'~', ..] => (Event::DELETE, 3),
        [b'[', b'5', b'~', ..] => (Event::PAGE_UP, 3),
        [b'[', b'6', b'~', ..] => (Event::PAGE_DOWN, 3),
        [b'[', b'1', b'5', b'~', ..] => (Event::F5, 4),
        [b'[', b'1', b'7', b'~', ..] => (Event::F6, 4),
        [b'[', b'1', b'8', b'~', ..] => (Event::F7, 4),
        [b'[', b'1', b'9', b'~', ..] => (Event::F8, 4),
        [b'[', b'2', b'0', b'~', ..] => (Event::F9, 4),
        [b'[', b'2', b'1', b'~', ..] => (Event::F10, 4),
        [b'[', b'2', b'3', b'~', ..] => (Event::F11, 4),
        [b'[', b'2', b'4', b'~', ..] => (Event::F12, 4),

        // CSI, single final byte.
        [b'[', b'E', ..] => (Event::KEYPAD_CENTER, 2),
        [b'[', b'Z', ..] => (Event::SHIFT_TAB, 2),

        // Shift variants.
        [b'[', b'1', b';', b'2', b'A', ..] => (Event::SHIFT_ARROW_UP, 5),
        [b'[', b'1', b';', b'2', b'B', ..] => (Event::SHIFT_ARROW_DOWN, 5),
        [b'[', b'1', b';', b'2', b'C', ..] => (Event::SHIFT_ARROW_RIGHT, 5),
        [b'[', b'1', b';', b'2', b'D', ..] => (Event::SHIFT_ARROW_LEFT, 5),
        [b'[', b'1', b';', b'2', b'F', ..] => (Event::SHIFT_END, 5),
        [b'[', b'1', b';', b'2', b'H', ..] => (Event::SHIFT_HOME, 5),
        [b'[', b'3', b';', b'2', b'~', ..] => (Event::SHIFT_DELETE, 5),

        // Alt variants.
        [b'[', b'1', b';', b'1', b'A', ..] => (Event::ALT_ARROW_UP, 5),
        [b'[', b'1', b';', b'1', b'B', ..] => (Event::ALT_ARROW_DOWN, 5),
        [b'[', b'1', b';', b'1', b'C', ..] => (Event::ALT_ARROW_RIGHT, 5),
        [b'[', b'1', b';', b'1', b'D', ..] => (Event::ALT_ARROW_LEFT, 5),
        [b'[', b'1', b';', b'1', b'F', ..] => (Event::ALT_END, 5),
        [b'[', b'1', b';', b'1', b'H', ..] => (Event::ALT_HOME, 5),
        [b'[', b'2', b';', b'1', b'~', ..] => (Event::ALT_INSERT, 5),
        [b'[', b'3', b';', b'1', b'~', ..] => (Event::ALT_DELETE, 5),
        [b'[', b'5', b';', b'1', b'~', ..] => (Event::ALT_PAGE_UP, 5),
        [b'[', b'6', b';', b'1', b'~', ..] => (Event::ALT_PAGE_DOWN, 5),

        // Ctrl variants.
        [b'[', b'1', b';', b'5', b'A', ..] => (Event::CTRL_ARROW_UP, 5),
        [b'[', b'1', b';', b'5', b'B', ..] => (Event::CTRL_ARROW_DOWN, 5),
        [b'[', b'1', b';', b'5', b'C', ..] => (Event::CTRL_ARROW_RIGHT, 5),
        [b'[', b'1', b';', b'5', b'D', ..] => (Event::CTRL_ARROW_LEFT, 5),
        [b'[', b'1', b';', b'5', b'F', ..] => (Event::CTRL_END, 5),
        [b'[', b'1', b';', b'5', b'H', ..] => (Event::CTRL_HOME, 5),
        [b'[', b'2', b';', b'5', b'~', ..] => (Event::CTRL_INSERT, 5),
        [b'[', b'3', b';', b'5', b'~', ..] => (Event::CTRL_DELETE, 5),
        [b'[', b'5', b';', b'5', b'~', ..] => (Event::CTRL_PAGE_UP, 5),
        [b'[', b'6', b';', b'5', b'~', ..] => (Event::CTRL_PAGE_DOWN, 5),

        _ => return None,
    };
    Some((event, consumed))
}

// ─── Tests ───────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    /// Every table entry, as (sequence, event) pairs.
    const TABLE: &[(&[u8], Event)] = &[
        (b"OA", Event::ARROW_UP),
        (b"OB", Event::ARROW_DOWN),
        (b"OC", Event::ARROW_RIGHT),
        (b"OD", Event::ARROW_LEFT),
        (b"OF", Event::END),
        (b"OH", Event::HOME),
        (b"OP", Event::F1),
        (b"OQ", Event::F2),
        (b"OR", Event::F3),
        (b"OS", Event::F4),
        (b"OM", Event::SHIFT_ENTER),
        (b"[2~", Event::INSERT),
        (b"[3~", Event::DELETE),
        (b"[5~", Event::PAGE_UP),
        (b"[6~", Event::PAGE_DOWN),
        (b"[E", Event::KEYPAD_CENTER),
        (b"[Z", Event::SHIFT_TAB),
        (b"[15~", Event::F5),
        (b"[17~", Event::F6),
        (b"[18~", Event::F7),
        (b"[19~", Event::F8),
        (b"[20~", Event::F9),
        (b"[21~", Event::F10),
        (b"[23~", Event::F11),
        (b"[24~", Event::F12),
        (b"[1;2A", Event::SHIFT_ARROW_UP),
        (b"[1;2B", Event::SHIFT_ARROW_DOWN),
        (b"[1;2C", Event::SHIFT_ARROW_RIGHT),
        (b"[1;2D", Event::SHIFT_ARROW_LEFT),
        (b"[1;2F", Event::SHIFT_END),
        (b"[1;2H", Event::SHIFT_HOME),
        (b"[3;2~", Event::SHIFT_DELETE),
        (b"[1;1A", Event::ALT_ARROW_UP),
        (b"[1;1B", Event::ALT_ARROW_DOWN),
        (b"[1;1C", Event::ALT_ARROW_RIGHT),
        (b"[1;1D", Event::ALT_ARROW_LEFT),
        (b"[1;1F", Event::ALT_END),
        (b"[1;1H", Event::ALT_HOME),
        (b"[2;1~", Event::ALT_INSERT),
        (b"[3;1~", Event::ALT_DELETE),
        (b"[5;1~", Event::ALT_PAGE_UP),
        (b"[6;1~", Event::ALT_PAGE_DOWN),
        (b"[1;5A", Event::CTRL_ARROW_UP),
        (b"[1;5B", Event::CTRL_ARROW_DOWN),
        (b"[1;5C", Event::CTRL_ARROW_RIGHT),
        (b"[1;5D", Event::CTRL_ARROW_LEFT),
        (b"[1;5F", Event::CTRL_END),
        (b"[1;5H", Event::CTRL_HOME),
        (b"[2;5~", Event::CTRL_INSERT),
        (b"[3;5~", Event::CTRL_DELETE),
        (b"[5;5~", Event::CTRL_PAGE_UP),
        (b"[6;5~", Event::CTRL_PAGE_DOWN),
    ];

    #[test]
    fn every_entry_decodes_to_its_event() {
        for &(seq, event) in TABLE {
            assert_eq!(identify(seq), Some((event, seq.len())), "seq {seq:?}");
        }
    }

    #[test]
    fn trailing_bytes_do_not_change_the_match() {
        assert_eq!(identify(b"OAxyz"), Some((Event::ARROW_UP, 2)));
        assert_eq!(identify(b"[1;5Dq"), Some((Event::CTRL_ARROW_LEFT, 5)));
    }

    #[test]
    fn unknown_sequences_match_nothing() {
        assert!(identify(b"").is_none());
        assert!(identify(b"OX").is_none());
        assert!(identify(b"[A").is_none());
        assert!(identify(b"[9~").is_none());
        assert!(identify(b"x").is_none());
    }

    #[test]
    fn prefixes_of_longer_sequences_match_nothing() {
        // Incomplete input must not be half-consumed.
        assert!(identify(b"O").is_none());
        assert!(identify(b"[").is_none());
        assert!(identify(b"[1;5").is_none());
        assert!(identify(b"[15").is_none());
    }

    #[test]
    fn no_entry_is_a_prefix_of_another() {
        for &(a, _) in TABLE {
            for &(b, _) in TABLE {
                if a != b {
                    assert!(!b.starts_with(a), "{a:?} prefixes {b:?}");
                }
            }
        }
    }
}
