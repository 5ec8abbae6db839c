// SPDX-License-Identifier: MIT
//
// ANSI escape sequence generation.
//
// Pure functions that write escape sequences to any `impl Write`. No state,
// no decisions about when to emit — the renderer's cursor shadow makes those
// calls. This module only knows the byte-level encoding of every terminal
// command the engine uses.
//
// Cursor positions are 0-indexed in the API and converted to the terminal's
// 1-indexed form on output.
//
// All functions return `io::Result` propagated from the underlying writer.
// In practice they never fail when writing to `FrameBatch` (backed by a Vec).

use std::io::{self, Write};

use crate::cell::Style;
use crate::color::Color;

// ─── Cursor ──────────────────────────────────────────────────────────────────

/// Move the cursor to `(x, y)` with CUP (absolute positioning).
#[inline]
pub fn cursor_to(w: &mut impl Write, x: u16, y: u16) -> io::Result<()> {
    write!(w, "\x1b[{};{}H", y + 1, x + 1)
}

/// Move the cursor up `n` rows (CUU).
#[inline]
pub fn cursor_up(w: &mut impl Write, n: u16) -> io::Result<()> {
    write!(w, "\x1b[{n}A")
}

/// Move the cursor down `n` rows (CUD).
#[inline]
pub fn cursor_down(w: &mut impl Write, n: u16) -> io::Result<()> {
    write!(w, "\x1b[{n}B")
}

/// Move the cursor right `n` columns (CUF).
#[inline]
pub fn cursor_forward(w: &mut impl Write, n: u16) -> io::Result<()> {
    write!(w, "\x1b[{n}C")
}

/// Move the cursor left `n` columns (CUB).
#[inline]
pub fn cursor_back(w: &mut impl Write, n: u16) -> io::Result<()> {
    write!(w, "\x1b[{n}D")
}

/// Hide the cursor (DECTCEM reset).
#[inline]
pub fn cursor_hide(w: &mut impl Write) -> io::Result<()> {
    w.write_all(b"\x1b[?25l")
}

/// Show the cursor (DECTCEM set).
#[inline]
pub fn cursor_show(w: &mut impl Write) -> io::Result<()> {
    w.write_all(b"\x1b[?25h")
}

// ─── Screen ──────────────────────────────────────────────────────────────────

/// Clear the entire screen (ED 2). Does not move the cursor.
#[inline]
pub fn clear_screen(w: &mut impl Write) -> io::Result<()> {
    w.write_all(b"\x1b[2J")
}

/// Reset all SGR attributes to terminal defaults (SGR 0).
///
/// Clears everything: intensity, italic, colours, underline. Any tracked
/// colour/style state is stale after this.
#[inline]
pub fn reset(w: &mut impl Write) -> io::Result<()> {
    w.write_all(b"\x1b[0m")
}

/// Enter the alternate screen buffer (DEC private mode 1049).
#[inline]
pub fn enter_alt_screen(w: &mut impl Write) -> io::Result<()> {
    w.write_all(b"\x1b[?1049h")
}

/// Exit the alternate screen buffer, restoring the user's prior content.
#[inline]
pub fn exit_alt_screen(w: &mut impl Write) -> io::Result<()> {
    w.write_all(b"\x1b[?1049l")
}

// ─── Colours ─────────────────────────────────────────────────────────────────

/// Set the foreground colour: SGR 39 for the default, `38;2;r;g;b` for RGB.
///
/// The `Unchanged` sentinel must be filtered out by the caller; it reaches
/// here only through a bug and is emitted as the default colour.
pub fn fg(w: &mut impl Write, color: Color) -> io::Result<()> {
    match color {
        Color::Default | Color::Unchanged => w.write_all(b"\x1b[39m"),
        Color::Rgb(r, g, b) => write!(w, "\x1b[38;2;{r};{g};{b}m"),
    }
}

/// Set the background colour: SGR 49 for the default, `48;2;r;g;b` for RGB.
pub fn bg(w: &mut impl Write, color: Color) -> io::Result<()> {
    match color {
        Color::Default | Color::Unchanged => w.write_all(b"\x1b[49m"),
        Color::Rgb(r, g, b) => write!(w, "\x1b[48;2;{r};{g};{b}m"),
    }
}

// ─── Style transitions ───────────────────────────────────────────────────────

/// Emit the minimal SGR sequence taking the terminal from style `from` to `to`.
///
/// For each style bit: the set code when newly on, the clear code when newly
/// off (intensity 22, italic 23, underline 24, overstrike 29). Bold and dim
/// share the intensity attribute: bold wins when both are requested, and a
/// single 22 clears either. Emits nothing when no bit changes.
pub fn style_transition(w: &mut impl Write, from: Style, to: Style) -> io::Result<()> {
    let mut codes: Vec<&str> = Vec::with_capacity(4);

    let from_bold = from.contains(Style::BOLD);
    let from_dim = !from_bold && from.contains(Style::DIM);
    // Bold takes precedence over dim when both bits are set.
    let to_bold = to.contains(Style::BOLD);
    let to_dim = !to_bold && to.contains(Style::DIM);

    if to_bold && !from_bold {
        codes.push("1");
    } else if to_dim && !from_dim {
        codes.push("2");
    } else if !to_bold && !to_dim && (from_bold || from_dim) {
        codes.push("22");
    }

    if to.contains(Style::ITALIC) && !from.contains(Style::ITALIC) {
        codes.push("3");
    } else if !to.contains(Style::ITALIC) && from.contains(Style::ITALIC) {
        codes.push("23");
    }

    if to.contains(Style::UNDERLINE) && !from.contains(Style::UNDERLINE) {
        codes.push("4");
    } else if !to.contains(Style::UNDERLINE) && from.contains(Style::UNDERLINE) {
        codes.push("24");
    }

    if to.contains(Style::OVERSTRIKE) && !from.contains(Style::OVERSTRIKE) {
        codes.push("9");
    } else if !to.contains(Style::OVERSTRIKE) && from.contains(Style::OVERSTRIKE) {
        codes.push("29");
    }

    if codes.is_empty() {
        return Ok(());
    }
    write!(w, "\x1b[{}m", codes.join(";"))
}

// ─── Mouse reporting ─────────────────────────────────────────────────────────

/// Enable mouse button reporting: cell-motion tracking (1002), urxvt
/// extended coordinates (1015) and SGR extended format (1006).
#[inline]
pub fn mouse_buttons_on(w: &mut impl Write) -> io::Result<()> {
    w.write_all(b"\x1b[?1002h\x1b[?1015h\x1b[?1006h")
}

/// Disable mouse button reporting.
#[inline]
pub fn mouse_buttons_off(w: &mut impl Write) -> io::Result<()> {
    w.write_all(b"\x1b[?1002l\x1b[?1015l\x1b[?1006l")
}

/// Enable all-motion mouse reporting (1003).
#[inline]
pub fn mouse_motion_on(w: &mut impl Write) -> io::Result<()> {
    w.write_all(b"\x1b[?1003h")
}

/// Disable all-motion mouse reporting.
#[inline]
pub fn mouse_motion_off(w: &mut impl Write) -> io::Result<()> {
    w.write_all(b"\x1b[?1003l")
}

// ─── Tests ───────────────────────────────────────────────────────────────────
