// SPDX-License-Identifier: MIT
//
// The screen: cell grid, drawing primitives, and the publisher.
//
// Safety: the event-wait path uses `unsafe` for epoll, signalfd and
// sigprocmask — the signal-to-descriptor conversion has no safe wrapper.
// Each unsafe block is minimal.
#![allow(unsafe_code)]
//
// `Screen` is the engine's top type. It owns the tty channel, a frame
// buffer sized to the terminal, and the descriptors `wait_for_event`
// multiplexes over. Drawing calls only mutate the grid and set a dirty
// flag; nothing reaches the terminal until `publish` (called implicitly
// by `wait_for_event`) rewrites the whole screen in one buffered burst.
//
// The publisher does not diff frames: it always re-emits every cell.
// What it minimizes is graphic commands — consecutive cells sharing a
// style produce a single SGR command. An effect change starts from a full
// reset, and a reset clears the terminal's colors too, so colors are
// re-emitted even when they did not change themselves.
//
// Signals (resize, interrupt, terminate) are blocked and converted to a
// descriptor: they arrive as readable data in the same epoll wait as the
// tty, never as asynchronous handler execution.

#[cfg(unix)]
use std::io;

use crate::cell::{Cell, Style};
use crate::color::{Color, Effect};
#[cfg(unix)]
use crate::event::Event;
#[cfg(unix)]
use crate::format::{self, FormattedText, Marker};
use crate::tty::{Size, TxBuffer};
#[cfg(unix)]
use crate::tty::BufferedTty;

// ─── Terminal commands ──────────────────────────────────────────────────────

/// Enter the alternate screen.
const SMCUP: &str = "\x1b[?1049h\x1b[22;0;0t";
/// Leave the alternate screen.
const RMCUP: &str = "\x1b[?1049l\x1b[23;0;0t";
/// Home the cursor and clear the screen.
const CLEAR: &str = "\x1b[H\x1b[2J";
/// Enter keypad-transmit mode (arrows arrive as SS3 sequences).
const SMKX: &str = "\x1b[?1h\x1b=";
/// Leave keypad-transmit mode.
const RMKX: &str = "\x1b[?1l\x1b>";
/// Hide the cursor.
const CIVIS: &str = "\x1b[?25l";
/// Restore the cursor to its normal visible state.
const CNORM: &str = "\x1b[?12l\x1b[?25h";

/// Glyph marking clipped text.
const ELLIPSIS: u32 = '…' as u32;
const SPACE: u32 = ' ' as u32;

// ─── Text layout ────────────────────────────────────────────────────────────

/// Horizontal placement of a string inside a fixed width.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Alignment {
    #[default]
    Left,
    Right,
    Centered,
}

/// Which end to cut when a string exceeds its width.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Clip {
    /// Cut the end: `too long t…`
    #[default]
    End,
    /// Cut the start: `…ong text`
    Start,
}

/// Reduce `glyphs` to exactly `wanted` codepoints, ellipsis at the cut end.
///
/// Callers guarantee `glyphs.len() > wanted`.
fn clip_glyphs(glyphs: &mut Vec<u32>, wanted: usize, clip: Clip) {
    match (wanted, clip) {
        (0, _) => glyphs.clear(),
        (_, Clip::Start) => {
            let keep = glyphs.len() - (wanted - 1);
            glyphs.drain(..keep);
            glyphs.insert(0, ELLIPSIS);
        }
        (_, Clip::End) => {
            glyphs.truncate(wanted - 1);
            glyphs.push(ELLIPSIS);
        }
    }
}

/// Lay a string out in exactly `width` codepoints.
///
/// Equal length passes through; longer clips per `clip`; shorter pads
/// with spaces per `align`, centered putting the extra space on the right
/// when the deficit is odd.
fn layout_fixed(text: &str, width: usize, align: Alignment, clip: Clip) -> Vec<u32> {
    let mut glyphs: Vec<u32> = text.chars().map(|c| c as u32).collect();
    if glyphs.len() > width {
        clip_glyphs(&mut glyphs, width, clip);
    } else if glyphs.len() < width {
        match align {
            Alignment::Left => glyphs.resize(width, SPACE),
            Alignment::Right => {
                let pad = width - glyphs.len();
                glyphs.splice(..0, std::iter::repeat_n(SPACE, pad));
            }
            Alignment::Centered => {
                let pad = (width - glyphs.len()) / 2;
                glyphs.splice(..0, std::iter::repeat_n(SPACE, pad));
                glyphs.resize(width, SPACE);
            }
        }
    }
    glyphs
}

/// Lay three strings out left/middle/right in exactly `width` codepoints.
///
/// When fields would overlap they are pushed apart and clipped against
/// thirds-of-width boundaries, resolved left-vs-middle, then
/// middle-vs-right, then left-vs-right.
#[allow(clippy::cast_possible_wrap, clippy::cast_sign_loss)]
fn layout_three(left: &str, middle: &str, right: &str, width: usize) -> Vec<u32> {
    let mut l: Vec<u32> = left.chars().map(|c| c as u32).collect();
    let mut m: Vec<u32> = middle.chars().map(|c| c as u32).collect();
    let mut r: Vec<u32> = right.chars().map(|c| c as u32).collect();
    let w = width as isize;

    let mut end_left = l.len() as isize;
    let mut start_middle = if m.is_empty() {
        w
    } else {
        w / 2 - (m.len() as isize + 1) / 2
    };
    if end_left >= start_middle - 1 {
        end_left = end_left.min(w / 3 - 1);
        start_middle = start_middle.max(w / 3 + 1);
    }
    let mut end_middle = if m.is_empty() {
        0
    } else {
        start_middle + m.len() as isize
    };
    let mut start_right = w - r.len() as isize;
    if end_middle >= start_right - 1 {
        end_middle = end_middle.min(2 * w / 3 - 1);
        start_right = start_right.max(2 * w / 3 + 1);
    }
    if end_left >= start_right - 1 {
        end_left = end_left.min(w / 2 - 1);
        start_right = start_right.max(w / 2 + 1);
    }

    let end_left = end_left.max(0) as usize;
    let slot_middle = (end_middle - start_middle).max(0) as usize;
    let start_middle = start_middle.max(0) as usize;
    let start_right = start_right.max(0) as usize;
    if l.len() > end_left {
        clip_glyphs(&mut l, end_left, Clip::End);
    }
    if m.len() > slot_middle {
        clip_glyphs(&mut m, slot_middle, Clip::End);
    }
    if r.len() > width.saturating_sub(start_right) {
        clip_glyphs(&mut r, width.saturating_sub(start_right), Clip::End);
    }

    let mut out = l;
    if !m.is_empty() {
        out.resize(start_middle, SPACE);
        out.extend_from_slice(&m);
    }
    out.resize(start_right, SPACE);
    out.extend_from_slice(&r);
    out
}

// ─── Graphic state ──────────────────────────────────────────────────────────

/// Last-emitted style, driving SGR minimization during a publish walk.
///
/// Starts from the sentinel colors (`Color::default`, not constructible
/// through any factory) so the first cell of a frame always emits a full
/// graphic command.
#[derive(Debug)]
struct GraphicState {
    effect: Effect,
    fg: Color,
    bg: Color,
}

impl GraphicState {
    const fn new() -> Self {
        Self {
            effect: Effect::empty(),
            fg: Color::from_raw(u32::MAX),
            bg: Color::from_raw(u32::MAX),
        }
    }

    /// Emit one combined SGR command when `wanted` differs from the
    /// last-emitted state; nothing otherwise.
    ///
    /// An effect change starts with a full reset (`0`), which also wipes
    /// the terminal's colors, so both colors are then re-emitted even if
    /// they match the tracked state.
    fn emit(&mut self, tx: &mut TxBuffer, wanted: Style) {
        if wanted.effect == self.effect && wanted.fg == self.fg && wanted.bg == self.bg {
            return;
        }
        let mut need_separator = false;
        let mut force_colors = false;
        tx.push_str("\x1b[");

        if wanted.effect != self.effect {
            tx.push_byte(b'0');
            force_colors = true;
            for bit in Effect::FIRST_BIT..=Effect::LAST_BIT {
                if wanted.effect.bits() & (1 << bit) != 0 {
                    tx.push_byte(b';');
                    tx.push_number(bit);
                }
            }
            self.effect = wanted.effect;
            need_separator = true;
        }

        if force_colors || wanted.fg != self.fg {
            if need_separator {
                tx.push_byte(b';');
            }
            color_code(tx, wanted.fg, true);
            self.fg = wanted.fg;
            need_separator = true;
        }

        if force_colors || wanted.bg != self.bg {
            if need_separator {
                tx.push_byte(b';');
            }
            color_code(tx, wanted.bg, false);
            self.bg = wanted.bg;
        }

        tx.push_byte(b'm');
    }
}

/// Append the SGR parameter selecting `color` (no CSI framing).
///
/// Palette indices below 8 use the compact offset form (`30+i`/`40+i`),
/// the rest the indexed form (`38;5;N`/`48;5;N`), RGB the 24-bit form.
fn color_code(tx: &mut TxBuffer, color: Color, is_fg: bool) {
    if color.is_palette() {
        let idx = color.palette_index();
        if idx < 8 {
            tx.push_number(u32::from(idx) + if is_fg { 30 } else { 40 });
        } else {
            tx.push_str(if is_fg { "38;5;" } else { "48;5;" });
            tx.push_number(u32::from(idx));
        }
    } else {
        tx.push_str(if is_fg { "38;2;" } else { "48;2;" });
        tx.push_number(u32::from(color.red()));
        tx.push_byte(b';');
        tx.push_number(u32::from(color.green()));
        tx.push_byte(b';');
        tx.push_number(u32::from(color.blue()));
    }
}

/// Emit the full frame: clear, every cell row-major with SGR
/// minimization, an explicit cursor move at each row boundary, and a
/// trailing reset.
///
/// The explicit per-row moves keep a mid-publish terminal resize from
/// accumulating cursor drift across the rest of the frame.
fn render_frame(tx: &mut TxBuffer, cells: &[Cell], cols: usize) {
    tx.push_str(CLEAR);
    let mut state = GraphicState::new();
    let mut x = 0;
    let mut y = 0;
    for cell in cells {
        state.emit(tx, cell.style);
        tx.push_codepoint(cell.glyph);
        x += 1;
        if x >= cols {
            y += 1;
            tx.push_str("\x1b[");
            tx.push_number(y + 1);
            tx.push_byte(b'H');
            x = 0;
        }
    }
    tx.push_str("\x1b[0m");
}

// ─── Frame ──────────────────────────────────────────────────────────────────

/// The pending screen content: cell grid plus dirty flag.
///
/// Pure data, no descriptor attached. `Screen` owns one and feeds it the
/// terminal's dimensions; everything the grid does is observable through
/// the cells and the bytes emitted into a [`TxBuffer`].
#[derive(Debug)]
struct Frame {
    cells: Vec<Cell>,
    cols: u16,
    rows: u16,
    dirty: bool,
}

impl Frame {
    const fn new() -> Self {
        Self {
            cells: Vec::new(),
            cols: 0,
            rows: 0,
            dirty: false,
        }
    }

    /// Rebuild the grid for `size`, every cell blanked to the defaults.
    fn rebuild(&mut self, size: Size, fg: Color, bg: Color) {
        self.cols = size.cols;
        self.rows = size.rows;
        self.cells.clear();
        self.cells.resize(size.area() as usize, Cell::blank(fg, bg));
        self.dirty = true;
    }

    fn cell_index(&self, y: i32, x: i32) -> Option<usize> {
        let (cols, rows) = (i32::from(self.cols), i32::from(self.rows));
        if x >= 0 && x < cols && y >= 0 && y < rows {
            #[allow(clippy::cast_sign_loss)]
            Some((y * cols + x) as usize)
        } else {
            None
        }
    }

    /// Write one cell. Out-of-grid coordinates are silently ignored.
    fn put(&mut self, y: i32, x: i32, glyph: u32, style: Style) {
        if let Some(idx) = self.cell_index(y, x) {
            self.cells[idx] = Cell { glyph, style };
            self.dirty = true;
        }
    }

    /// Recolor a cell range without touching glyphs or effects.
    fn recolor(&mut self, y: i32, x: i32, width: usize, fg: Color, bg: Color) {
        for i in 0..width {
            #[allow(clippy::cast_possible_wrap, clippy::cast_possible_truncation)]
            if let Some(idx) = self.cell_index(y, x + i as i32) {
                self.cells[idx].style.fg = fg;
                self.cells[idx].style.bg = bg;
                self.dirty = true;
            }
        }
    }

    /// Emit the whole frame into `tx` when dirty, clearing the flag.
    /// A clean frame appends nothing and reports `false`.
    fn publish_into(&mut self, tx: &mut TxBuffer) -> bool {
        if !self.dirty {
            return false;
        }
        render_frame(tx, &self.cells, usize::from(self.cols));
        self.dirty = false;
        true
    }
}

// ─── Screen ─────────────────────────────────────────────────────────────────

/// Multiplexer slot identifying the readiness source.
#[cfg(unix)]
const SLOT_SIGNAL: u64 = 0;
#[cfg(unix)]
const SLOT_TTY: u64 = 1;

/// The terminal as a stateful character-cell display plus event source.
///
/// Draw with the `put_*` primitives, then call
/// [`wait_for_event`](Self::wait_for_event); it publishes pending changes
/// and blocks for input. Construction switches the terminal to the
/// alternate screen in raw mode; drop restores everything.
///
/// One instance at a time: the constructor blocks process-wide signals.
#[cfg(unix)]
pub struct Screen {
    tty: BufferedTty,
    signal_fd: libc::c_int,
    epoll_fd: libc::c_int,
    original_sigmask: libc::sigset_t,
    frame: Frame,
    default_fg: Color,
    default_bg: Color,
}

#[cfg(unix)]
impl Screen {
    /// Open the terminal, arm signal conversion, and show an empty screen.
    ///
    /// # Errors
    ///
    /// Fails when the terminal cannot be opened or any descriptor setup
    /// syscall fails.
    pub fn new() -> io::Result<Self> {
        let tty = BufferedTty::open()?;
        let (signal_fd, original_sigmask) =
            signal_descriptor(&[libc::SIGWINCH, libc::SIGINT, libc::SIGTERM])?;

        let epoll_fd = unsafe { libc::epoll_create1(libc::EPOLL_CLOEXEC) };
        if epoll_fd < 0 {
            let err = os_error("epoll_create1");
            unsafe {
                libc::close(signal_fd);
                libc::sigprocmask(libc::SIG_SETMASK, &original_sigmask, std::ptr::null_mut());
            }
            return Err(err);
        }

        let mut screen = Self {
            tty,
            signal_fd,
            epoll_fd,
            original_sigmask,
            frame: Frame::new(),
            default_fg: Color::from_palette(7),
            default_bg: Color::from_palette(0),
        };

        screen.epoll_register(screen.signal_fd, SLOT_SIGNAL)?;
        screen.epoll_register(screen.tty.raw_fd(), SLOT_TTY)?;

        let tx = screen.tty.tx();
        tx.push_str(SMCUP);
        tx.push_str(SMKX);
        tx.push_str(CIVIS);
        tx.push_str(CLEAR);
        screen.reset();
        screen.publish()?;
        Ok(screen)
    }

    fn epoll_register(&self, fd: libc::c_int, slot: u64) -> io::Result<()> {
        let mut ev = libc::epoll_event {
            events: libc::EPOLLIN as u32,
            u64: slot,
        };
        if unsafe { libc::epoll_ctl(self.epoll_fd, libc::EPOLL_CTL_ADD, fd, &mut ev) } < 0 {
            return Err(os_error("epoll_ctl(EPOLL_CTL_ADD)"));
        }
        Ok(())
    }

    /// Grid width in columns (the terminal width at the last `reset`).
    #[inline]
    #[must_use]
    pub const fn width(&self) -> u16 {
        self.frame.cols
    }

    /// Grid height in rows (the terminal height at the last `reset`).
    #[inline]
    #[must_use]
    pub const fn height(&self) -> u16 {
        self.frame.rows
    }

    /// Default colors applied by `reset` and the default-style wrappers.
    pub const fn set_default_colors(&mut self, fg: Color, bg: Color) {
        self.default_fg = fg;
        self.default_bg = bg;
    }

    /// The default style: default colors, no effect.
    #[inline]
    #[must_use]
    pub const fn default_style(&self) -> Style {
        Style::new(self.default_fg, self.default_bg)
    }

    /// Re-query the terminal size and blank the grid to the default
    /// colors. Call after a [`RESIZE`](Event::RESIZE) event.
    pub fn reset(&mut self) {
        // A failed size query keeps the previous dimensions; the grid is
        // still blanked so the next publish shows a consistent frame.
        let _ = self.tty.refresh_size();
        self.frame
            .rebuild(self.tty.size(), self.default_fg, self.default_bg);
    }

    fn put_u32(&mut self, y: i32, x: i32, glyph: u32, style: Style) {
        self.frame.put(y, x, glyph, style);
    }

    /// Put one glyph. Out-of-grid coordinates are silently ignored.
    pub fn put_glyph(&mut self, y: i32, x: i32, glyph: char, style: Style) {
        self.put_u32(y, x, glyph as u32, style);
    }

    /// Put a string, one cell per codepoint, growing to the right.
    pub fn put_str(&mut self, y: i32, x: i32, text: &str, style: Style) {
        for (i, c) in text.chars().enumerate() {
            #[allow(clippy::cast_possible_wrap, clippy::cast_possible_truncation)]
            self.put_u32(y, x + i as i32, c as u32, style);
        }
    }

    /// Put a string in exactly `width` cells, aligned and clipped.
    pub fn put_str_n(
        &mut self,
        y: i32,
        x: i32,
        text: &str,
        width: usize,
        align: Alignment,
        clip: Clip,
        style: Style,
    ) {
        self.put_glyphs(y, x, &layout_fixed(text, width, align, clip), style);
    }

    /// Put three strings left/middle/right within `width` cells,
    /// space-padded apart and clipped against overlap.
    pub fn put_str_3(
        &mut self,
        y: i32,
        x: i32,
        left: &str,
        middle: &str,
        right: &str,
        width: usize,
        style: Style,
    ) {
        self.put_glyphs(y, x, &layout_three(left, middle, right, width), style);
    }

    fn put_glyphs(&mut self, y: i32, x: i32, glyphs: &[u32], style: Style) {
        for (i, &glyph) in glyphs.iter().enumerate() {
            #[allow(clippy::cast_possible_wrap, clippy::cast_possible_truncation)]
            self.put_u32(y, x + i as i32, glyph, style);
        }
    }

    /// Put formatted text in exactly `width` cells.
    ///
    /// Starts from the default style; markers switch the running
    /// effect/colors for the glyphs that follow. Leftover cells are
    /// space-filled with the final running style.
    pub fn put_fstring(&mut self, y: i32, x: i32, text: &FormattedText, width: usize) {
        let mut style = self.default_style();
        let mut x = x;
        let mut remaining = width;
        for &value in text.as_slice() {
            if remaining == 0 {
                break;
            }
            if let Some(marker) = format::decode_marker(value) {
                match marker {
                    Marker::Effect(e) => style.effect = e,
                    Marker::Fg(c) => style.fg = c,
                    Marker::Bg(c) => style.bg = c,
                }
            } else {
                self.put_u32(y, x, value, style);
                x += 1;
                remaining -= 1;
            }
        }
        while remaining > 0 {
            self.put_u32(y, x, SPACE, style);
            x += 1;
            remaining -= 1;
        }
    }

    /// Recolor `width` cells starting at `(y, x)` without touching their
    /// glyphs or effects.
    pub fn set_colors(&mut self, y: i32, x: i32, width: usize, fg: Color, bg: Color) {
        self.frame.recolor(y, x, width, fg, bg);
    }

    /// Push the frame buffer to the terminal. No-op when nothing changed
    /// since the last publish.
    ///
    /// # Errors
    ///
    /// Fails when flushing to the terminal fails.
    pub fn publish(&mut self) -> io::Result<()> {
        if self.frame.publish_into(self.tty.tx()) {
            self.tty.flush_tx()?;
        }
        Ok(())
    }

    /// Publish pending changes, then wait for one event.
    ///
    /// `timeout_ms` of `-1` waits forever; `0` polls. Returns
    /// [`Event::INVALID`] when the timeout elapses with nothing to report.
    ///
    /// # Errors
    ///
    /// Fails on publish failure or on any syscall failure other than
    /// "interrupted"/"would block".
    pub fn wait_for_event(&mut self, timeout_ms: i32) -> io::Result<Event> {
        self.publish()?;

        // Drain input buffered during the previous cycle first.
        self.tty.fill_rx()?;
        if let Some(event) = self.tty.next_event() {
            return Ok(event);
        }

        let mut ev = libc::epoll_event { events: 0, u64: 0 };
        let n = unsafe { libc::epoll_wait(self.epoll_fd, &mut ev, 1, timeout_ms) };
        if n < 0 {
            let err = io::Error::last_os_error();
            return match err.raw_os_error() {
                Some(libc::EINTR | libc::EAGAIN) => Ok(Event::INVALID),
                _ => Err(os_error("epoll_wait")),
            };
        }
        if n == 0 {
            return Ok(Event::INVALID);
        }

        match ev.u64 {
            SLOT_SIGNAL => self.read_signal(),
            SLOT_TTY => {
                self.tty.fill_rx()?;
                Ok(self.tty.next_event().unwrap_or(Event::INVALID))
            }
            _ => Err(io::Error::new(
                io::ErrorKind::InvalidData,
                "epoll_wait: unknown slot",
            )),
        }
    }

    /// Consume one signal notification from the signal descriptor.
    fn read_signal(&mut self) -> io::Result<Event> {
        let mut info: libc::signalfd_siginfo = unsafe { std::mem::zeroed() };
        let n = unsafe {
            libc::read(
                self.signal_fd,
                std::ptr::from_mut(&mut info).cast::<libc::c_void>(),
                std::mem::size_of::<libc::signalfd_siginfo>(),
            )
        };
        if n < 0 {
            let err = io::Error::last_os_error();
            return match err.raw_os_error() {
                Some(libc::EINTR | libc::EAGAIN) => Ok(Event::INVALID),
                _ => Err(os_error("read signalfd")),
            };
        }
        #[allow(clippy::cast_sign_loss)]
        if (n as usize) != std::mem::size_of::<libc::signalfd_siginfo>() {
            return Err(io::Error::new(
                io::ErrorKind::InvalidData,
                "read signalfd: truncated siginfo",
            ));
        }
        #[allow(clippy::cast_possible_wrap)]
        Ok(Event::from_signal(info.ssi_signo as i32))
    }
}

#[cfg(unix)]
impl Drop for Screen {
    fn drop(&mut self) {
        let tx = self.tty.tx();
        tx.push_str(CLEAR);
        tx.push_str(CNORM);
        tx.push_str(RMKX);
        tx.push_str(RMCUP);
        let _ = self.tty.flush_tx();
        unsafe {
            let _ = libc::close(self.epoll_fd);
            let _ = libc::close(self.signal_fd);
            let _ = libc::sigprocmask(
                libc::SIG_SETMASK,
                &self.original_sigmask,
                std::ptr::null_mut(),
            );
        }
    }
}

/// Block `signals` process-wide and return a descriptor their delivery
/// becomes readable on, plus the previous signal mask for restoration.
#[cfg(unix)]
fn signal_descriptor(signals: &[libc::c_int]) -> io::Result<(libc::c_int, libc::sigset_t)> {
    let mut mask: libc::sigset_t = unsafe { std::mem::zeroed() };
    let mut previous: libc::sigset_t = unsafe { std::mem::zeroed() };
    unsafe {
        libc::sigemptyset(&mut mask);
        for &sig in signals {
            libc::sigaddset(&mut mask, sig);
        }
        if libc::sigprocmask(libc::SIG_BLOCK, &mask, &mut previous) < 0 {
            return Err(os_error("sigprocmask"));
        }
        let fd = libc::signalfd(-1, &mask, libc::SFD_NONBLOCK | libc::SFD_CLOEXEC);
        if fd < 0 {
            let err = os_error("signalfd");
            libc::sigprocmask(libc::SIG_SETMASK, &previous, std::ptr::null_mut());
            return Err(err);
        }
        Ok((fd, previous))
    }
}

#[cfg(unix)]
fn os_error(operation: &str) -> io::Error {
    let err = io::Error::last_os_error();
    io::Error::new(err.kind(), format!("{operation}: {err}"))
}

// ─── Tests ───────────────────────────────────────────────────────────────────
