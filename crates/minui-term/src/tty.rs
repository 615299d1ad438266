// SPDX-License-Identifier: MIT
//
// The terminal channel — raw mode, buffered Unicode-aware I/O, RAII cleanup.
//
// Safety: This module necessarily uses `unsafe` for termios (tcgetattr,
// tcsetattr, cfmakeraw), ioctl (TIOCGWINSZ), open/read/write/close on the
// controlling terminal. These are the standard POSIX interfaces for
// terminal control — there is no safe alternative. Each unsafe block is
// minimal.
#![allow(unsafe_code)]
//
// `BufferedTty` owns `/dev/tty` exclusively: construction saves the
// original termios and installs raw mode with VMIN=0/VTIME=0 so reads
// never block; drop restores the original mode unconditionally. Between
// the two sit an 8-byte receive buffer (large enough for the longest
// escape sequence plus slack) and a growable transmit buffer that all
// drawing output funnels through.
//
// The panic hook mirrors the drop path: a panic in raw mode would
// otherwise leave the user's shell without echo or line editing and
// stranded on the alternate screen. The hook writes a pre-built restore
// sequence straight to fd 1 (no stdout lock — it may be held mid-frame)
// and restores termios from a process-wide backup before the default
// handler prints its message.

use std::io;
use std::sync::{Mutex, Once};

#[cfg(unix)]
use crate::input::{self, Decoded};

// ─── Size ───────────────────────────────────────────────────────────────────

/// Terminal dimensions in character cells.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Size {
    /// Number of columns (width in character cells).
    pub cols: u16,
    /// Number of rows (height in character cells).
    pub rows: u16,
}

impl Size {
    /// Total number of cells (`cols × rows`).
    #[inline]
    #[must_use]
    pub const fn area(self) -> u32 {
        self.cols as u32 * self.rows as u32
    }
}

// ─── Receive buffer ─────────────────────────────────────────────────────────

/// Fixed capacity of the receive buffer.
///
/// Covers the longest escape sequence the decoder knows (ESC + 5 bytes)
/// with room to spare; anything larger is drained over several cycles.
pub const RX_CAPACITY: usize = 8;

/// Small fixed buffer holding not-yet-decoded input bytes.
#[derive(Debug, Clone, Copy)]
pub struct RxBuffer {
    bytes: [u8; RX_CAPACITY],
    filled: usize,
}

impl RxBuffer {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            bytes: [0; RX_CAPACITY],
            filled: 0,
        }
    }

    /// The buffered, not-yet-consumed bytes.
    #[inline]
    #[must_use]
    pub fn as_slice(&self) -> &[u8] {
        &self.bytes[..self.filled]
    }

    /// Unused capacity, the target of the next read.
    #[inline]
    fn spare_mut(&mut self) -> &mut [u8] {
        &mut self.bytes[self.filled..]
    }

    /// Record that a read deposited `n` bytes into the spare capacity.
    #[inline]
    fn commit(&mut self, n: usize) {
        debug_assert!(self.filled + n <= RX_CAPACITY);
        self.filled += n;
    }

    /// Discard `n` bytes from the front, keeping the rest in order.
    pub fn consume(&mut self, n: usize) {
        debug_assert!(n <= self.filled);
        self.bytes.copy_within(n..self.filled, 0);
        self.filled -= n;
    }

    /// Test/bench seeding: fill from a byte slice.
    #[cfg(test)]
    fn seed(data: &[u8]) -> Self {
        let mut rx = Self::new();
        rx.bytes[..data.len()].copy_from_slice(data);
        rx.filled = data.len();
        rx
    }
}

impl Default for RxBuffer {
    fn default() -> Self {
        Self::new()
    }
}

// ─── Transmit buffer ────────────────────────────────────────────────────────

/// Growable buffer collecting output bytes until the next flush.
///
/// Appenders never fail; flushing happens through [`BufferedTty::flush_tx`].
#[derive(Debug, Default)]
pub struct TxBuffer {
    bytes: Vec<u8>,
}

impl TxBuffer {
    /// Initial capacity — a full SGR-heavy frame usually fits.
    const INITIAL_CAPACITY: usize = 4096;

    #[must_use]
    pub fn new() -> Self {
        Self {
            bytes: Vec::with_capacity(Self::INITIAL_CAPACITY),
        }
    }

    /// Append raw bytes.
    #[inline]
    pub fn push_bytes(&mut self, data: &[u8]) {
        self.bytes.extend_from_slice(data);
    }

    /// Append a string.
    #[inline]
    pub fn push_str(&mut self, data: &str) {
        self.bytes.extend_from_slice(data.as_bytes());
    }

    /// Append one byte.
    #[inline]
    pub fn push_byte(&mut self, byte: u8) {
        self.bytes.push(byte);
    }

    /// Append one codepoint: ASCII directly, everything else UTF-8
    /// encoded. Values that are not scalar values become `?` so a bug
    /// upstream renders visibly instead of corrupting the stream.
    pub fn push_codepoint(&mut self, codepoint: u32) {
        if codepoint < 0x80 {
            self.bytes.push(codepoint as u8);
        } else {
            match char::from_u32(codepoint) {
                Some(c) => {
                    let mut utf8 = [0u8; 4];
                    self.push_str(c.encode_utf8(&mut utf8));
                }
                None => self.bytes.push(b'?'),
            }
        }
    }

    /// Append a number as decimal ASCII, no padding.
    pub fn push_number(&mut self, value: u32) {
        self.push_str(&value.to_string());
    }

    /// Pending output.
    #[inline]
    #[must_use]
    pub fn as_slice(&self) -> &[u8] {
        &self.bytes
    }

    #[inline]
    pub fn clear(&mut self) {
        self.bytes.clear();
    }

    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

// ─── Panic-safe restore ─────────────────────────────────────────────────────

/// Global backup of the original termios for panic recovery.
///
/// [`BufferedTty`] owns its own copy, but the panic hook can't reach it.
#[cfg(unix)]
static TERMIOS_BACKUP: Mutex<Option<libc::termios>> = Mutex::new(None);

/// Restore termios from the global backup. Best-effort, ignores errors.
#[cfg(unix)]
fn restore_termios_from_backup() {
    if let Ok(guard) = TERMIOS_BACKUP.lock() {
        if let Some(ref original) = *guard {
            unsafe {
                let _ = libc::tcsetattr(libc::STDIN_FILENO, libc::TCSANOW, original);
            }
        }
    }
}

/// Screen restore sequence for emergency use: clear, cursor back to
/// normal, keypad mode off, alternate screen off (last, so the restored
/// shell content appears without TUI artifacts).
const EMERGENCY_RESTORE: &[u8] =
    b"\x1b[H\x1b[2J\x1b[?12l\x1b[?25h\x1b[?1l\x1b>\x1b[?1049l\x1b[23;0;0t";

/// Panic hook guard — installed at most once per process.
static PANIC_HOOK_INSTALLED: Once = Once::new();

fn install_panic_hook() {
    PANIC_HOOK_INSTALLED.call_once(|| {
        let original = std::panic::take_hook();
        std::panic::set_hook(Box::new(move |info| {
            emergency_restore();

            #[cfg(unix)]
            restore_termios_from_backup();

            original(info);
        }));
    });
}

/// Write the restore sequence directly to fd 1, bypassing the stdout lock.
fn emergency_restore() {
    #[cfg(unix)]
    unsafe {
        let _ = libc::write(
            libc::STDOUT_FILENO,
            EMERGENCY_RESTORE.as_ptr().cast::<libc::c_void>(),
            EMERGENCY_RESTORE.len(),
        );
    }

    #[cfg(not(unix))]
    {
        use std::io::Write;
        let _ = io::stdout().write_all(EMERGENCY_RESTORE);
        let _ = io::stdout().flush();
    }
}

/// Wrap the current OS error with the failing operation's name.
#[cfg(unix)]
fn os_error(operation: &str) -> io::Error {
    let err = io::Error::last_os_error();
    io::Error::new(err.kind(), format!("{operation}: {err}"))
}

// ─── BufferedTty ────────────────────────────────────────────────────────────

/// Exclusive handle on the controlling terminal, in raw mode, with
/// receive/transmit buffering.
///
/// Construction opens `/dev/tty`, saves the original termios and installs
/// raw mode with `VMIN=0`/`VTIME=0` — reads never block, they only drain
/// already-available bytes. Drop restores the original mode and closes
/// the descriptor, on error paths included.
#[cfg(unix)]
pub struct BufferedTty {
    fd: libc::c_int,
    original_termios: libc::termios,
    size: Size,
    rx: RxBuffer,
    tx: TxBuffer,
}

#[cfg(unix)]
impl BufferedTty {
    /// Open the controlling terminal and enter raw mode.
    ///
    /// # Errors
    ///
    /// Fails when the process has no controlling terminal or when any of
    /// the termios/ioctl calls fail; nothing is retried.
    pub fn open() -> io::Result<Self> {
        install_panic_hook();

        let fd = unsafe {
            libc::open(c"/dev/tty".as_ptr(), libc::O_RDWR | libc::O_CLOEXEC)
        };
        if fd < 0 {
            return Err(os_error("open /dev/tty"));
        }

        let mut original: libc::termios = unsafe { std::mem::zeroed() };
        if unsafe { libc::tcgetattr(fd, &mut original) } != 0 {
            let err = os_error("tcgetattr");
            unsafe { libc::close(fd) };
            return Err(err);
        }

        if let Ok(mut guard) = TERMIOS_BACKUP.lock() {
            *guard = Some(original);
        }

        let mut raw = original;
        unsafe { libc::cfmakeraw(&mut raw) };
        // Zero minimum read count and zero inter-byte timeout: read()
        // returns immediately with whatever is available.
        raw.c_cc[libc::VMIN] = 0;
        raw.c_cc[libc::VTIME] = 0;
        if unsafe { libc::tcsetattr(fd, libc::TCSAFLUSH, &raw) } != 0 {
            let err = os_error("tcsetattr");
            unsafe { libc::close(fd) };
            return Err(err);
        }

        let mut tty = Self {
            fd,
            original_termios: original,
            size: Size { cols: 0, rows: 0 },
            rx: RxBuffer::new(),
            tx: TxBuffer::new(),
        };
        tty.refresh_size()?;
        Ok(tty)
    }

    /// The underlying descriptor, for readiness registration.
    #[inline]
    #[must_use]
    pub const fn raw_fd(&self) -> libc::c_int {
        self.fd
    }

    /// Last queried terminal dimensions.
    #[inline]
    #[must_use]
    pub const fn size(&self) -> Size {
        self.size
    }

    /// Re-query the terminal dimensions via `ioctl(TIOCGWINSZ)`.
    ///
    /// # Errors
    ///
    /// Fails when the ioctl fails or reports a degenerate size.
    pub fn refresh_size(&mut self) -> io::Result<Size> {
        let mut ws: libc::winsize = unsafe { std::mem::zeroed() };
        let result = unsafe { libc::ioctl(self.fd, libc::TIOCGWINSZ, &mut ws) };
        if result != 0 || ws.ws_col == 0 || ws.ws_row == 0 {
            return Err(os_error("ioctl(TIOCGWINSZ)"));
        }
        self.size = Size {
            cols: ws.ws_col,
            rows: ws.ws_row,
        };
        Ok(self.size)
    }

    /// One non-blocking read into the receive buffer's spare capacity.
    ///
    /// Returns the number of bytes added; "interrupted" and "would block"
    /// count as zero, they are not errors.
    ///
    /// # Errors
    ///
    /// Any other read failure is fatal to the session.
    pub fn fill_rx(&mut self) -> io::Result<usize> {
        let spare = self.rx.spare_mut();
        if spare.is_empty() {
            return Ok(0);
        }
        let n = unsafe {
            libc::read(self.fd, spare.as_mut_ptr().cast::<libc::c_void>(), spare.len())
        };
        if n < 0 {
            let err = io::Error::last_os_error();
            return match err.raw_os_error() {
                Some(libc::EINTR | libc::EAGAIN) => Ok(0),
                _ => Err(os_error("read /dev/tty")),
            };
        }
        #[allow(clippy::cast_sign_loss)]
        let n = n as usize;
        self.rx.commit(n);
        Ok(n)
    }

    /// Decode one event from the already-buffered input.
    ///
    /// Invalid bytes are dropped one at a time and decoding retried, so a
    /// burst of garbage cannot wedge the stream. Returns `None` when the
    /// buffer holds no complete event.
    pub fn next_event(&mut self) -> Option<crate::event::Event> {
        loop {
            match input::decode(self.rx.as_slice()) {
                Decoded::Pending => return None,
                Decoded::Skip(n) => self.rx.consume(n),
                Decoded::Event(event, n) => {
                    self.rx.consume(n);
                    return Some(event);
                }
            }
        }
    }

    /// Pending-output appenders; see [`TxBuffer`].
    #[inline]
    pub fn tx(&mut self) -> &mut TxBuffer {
        &mut self.tx
    }

    /// Write the whole transmit buffer to the terminal, then clear it.
    ///
    /// Loops on partial writes; "interrupted"/"would block" mean zero
    /// progress and retry.
    ///
    /// # Errors
    ///
    /// Any other write failure is fatal to the session.
    pub fn flush_tx(&mut self) -> io::Result<()> {
        let data = self.tx.as_slice();
        let mut sent = 0;
        while sent < data.len() {
            let n = unsafe {
                libc::write(
                    self.fd,
                    data[sent..].as_ptr().cast::<libc::c_void>(),
                    data.len() - sent,
                )
            };
            if n < 0 {
                let err = io::Error::last_os_error();
                match err.raw_os_error() {
                    Some(libc::EINTR | libc::EAGAIN) => continue,
                    _ => return Err(os_error("write /dev/tty")),
                }
            }
            #[allow(clippy::cast_sign_loss)]
            {
                sent += n as usize;
            }
        }
        self.tx.clear();
        Ok(())
    }
}

#[cfg(unix)]
impl Drop for BufferedTty {
    fn drop(&mut self) {
        // Original mode back, unconditionally, then release the handle.
        unsafe {
            let _ = libc::tcsetattr(self.fd, libc::TCSAFLUSH, &self.original_termios);
            let _ = libc::close(self.fd);
        }
        if let Ok(mut guard) = TERMIOS_BACKUP.lock() {
            *guard = None;
        }
    }
}

// ─── Tests ───────────────────────────────────────────────────────────────────
