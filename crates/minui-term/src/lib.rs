// SPDX-License-Identifier: MIT
//
// minui-term — Minimal terminal-control engine.
//
// Direct terminal control for small interactive programs: raw-mode tty
// with buffered transfers, a key/signal event model in one word-sized
// value, a character-cell frame buffer with clipping text layout, and an
// epoll-driven wait that folds signals into the input stream.
//
// This crate intentionally avoids external TUI frameworks (ratatui,
// crossterm) in favor of direct terminal control via ANSI escape
// sequences and raw termios. The publisher rewrites the whole frame and
// spends its effort where it pays: one combined SGR command per style
// run, one buffered write per frame.

pub mod cell;
pub mod color;
pub mod escape;
pub mod event;
pub mod format;
pub mod input;
pub mod poll;
pub mod screen;
pub mod tty;
