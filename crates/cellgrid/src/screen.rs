// SPDX-License-Identifier: MIT
//
// Screen — the double-buffered diff renderer.
//
// Application code writes cells into the back buffer; the front buffer is
// the renderer's model of what the terminal currently shows. `update()`
// walks both grids, emits escape sequences only for cells that differ,
// and flushes the whole batch in a single write. Afterwards the front
// buffer equals the back buffer — that is the module's one invariant.
//
// The cursor shadow tracks what the terminal's cursor state must be after
// the bytes emitted so far: position, current foreground, background and
// style. Every emission site updates it; nothing else may touch it. Any
// divergence from the real terminal is a correctness bug, which is why
// cursor motion, colour changes and style changes are all routed through
// this one struct.

use std::io::{self, Write};

use unicode_width::UnicodeWidthChar;

use crate::ansi;
use crate::buffer::{Pos, ScreenBuffer, Size};
use crate::cell::Style;
use crate::color::Color;
use crate::output::FrameBatch;

// ─── Cursor shadow ───────────────────────────────────────────────────────────

/// The renderer's model of the terminal's cursor state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct CursorShadow {
    pos: Pos,
    fg: Color,
    bg: Color,
    style: Style,
}

impl Default for CursorShadow {
    fn default() -> Self {
        Self {
            pos: Pos::new(0, 0),
            fg: Color::Default,
            bg: Color::Default,
            style: Style::empty(),
        }
    }
}

// ─── UpdateStats ─────────────────────────────────────────────────────────────

/// Counters from one `update()` pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct UpdateStats {
    /// Cells that differed and were drawn.
    pub cells_drawn: usize,
    /// Bytes flushed to the terminal (including queued motion from
    /// earlier `clear`/`set_size` calls).
    pub bytes_flushed: usize,
}

// ─── Screen ──────────────────────────────────────────────────────────────────

/// The double-buffered screen renderer.
///
/// # Examples
///
/// ```
/// use cellgrid::buffer::{Pos, Size};
/// use cellgrid::cell::Style;
/// use cellgrid::color::Color;
/// use cellgrid::screen::Screen;
///
/// let mut screen = Screen::new(Size::new(80, 24));
/// screen.print(Pos::new(2, 1), "hello", Color::GREEN, Color::Unchanged, Style::BOLD);
///
/// let mut sink = Vec::new();
/// let stats = screen.update_into(&mut sink).unwrap();
/// assert_eq!(stats.cells_drawn, 5);
/// ```
pub struct Screen {
    back: ScreenBuffer,
    front: ScreenBuffer,
    cursor: CursorShadow,
    out: FrameBatch,
}

impl Screen {
    /// Create a renderer for a grid of the given size.
    #[must_use]
    pub fn new(size: Size) -> Self {
        Self {
            back: ScreenBuffer::new(size),
            front: ScreenBuffer::new(size),
            cursor: CursorShadow::default(),
            out: FrameBatch::sized_for(size.area() as usize),
        }
    }

    // ─── Accessors ───────────────────────────────────────────────────────

    #[inline]
    #[must_use]
    pub const fn size(&self) -> Size {
        self.back.size()
    }

    /// The back buffer — what the application has drawn so far.
    #[must_use]
    pub fn back(&self) -> &ScreenBuffer {
        &self.back
    }

    /// The front buffer — the renderer's model of the terminal.
    #[must_use]
    pub fn front(&self) -> &ScreenBuffer {
        &self.front
    }

    /// Where the renderer believes the terminal cursor is.
    #[must_use]
    pub const fn cursor_pos(&self) -> Pos {
        self.cursor.pos
    }

    // ─── Back-buffer writes ──────────────────────────────────────────────

    /// Write `text` starting at `pos`, advancing by each glyph's display
    /// width and stopping at the right edge.
    ///
    /// Control characters occupy one cell (they render as spaces);
    /// zero-width combining characters are skipped. A double-width glyph
    /// gets a continuation cell after it; one that would cross the right
    /// edge is replaced by a single space.
    pub fn print(&mut self, pos: Pos, text: &str, fg: Color, bg: Color, style: Style) {
        let size = self.back.size();
        if pos.y >= size.height {
            return;
        }

        let mut x = pos.x;
        for ch in text.chars() {
            if x >= size.width {
                break;
            }

            let width = if (ch as u32) < 0x20 {
                1
            } else {
                ch.width().unwrap_or(0)
            };
            if width == 0 {
                continue;
            }

            if width == 2 && x + 1 >= size.width {
                self.back
                    .set_cell(Pos::new(x, pos.y), u32::from(' '), 1, fg, bg, style);
                break;
            }

            #[allow(clippy::cast_possible_truncation)] // width is 1 or 2
            self.back
                .set_cell(Pos::new(x, pos.y), ch as u32, width as u8, fg, bg, style);
            if width == 2 {
                self.back
                    .set_cell(Pos::new(x + 1, pos.y), 0, 0, fg, bg, style);
            }

            #[allow(clippy::cast_possible_truncation)]
            let advance = width as u16;
            x += advance;
        }
    }

    /// Clear the back buffer to empty cells with the given colours and
    /// park the cursor at the origin. Output is deferred to `update()`.
    pub fn clear(&mut self, fg: Color, bg: Color) {
        self.back.clear_with(fg, bg);
        self.move_cursor(Pos::new(0, 0));
    }

    /// Write one cell into the back buffer, honouring the `Unchanged`
    /// sentinels (see [`ScreenBuffer::set_cell`]).
    pub fn set_cell(&mut self, pos: Pos, ch: u32, width: u8, fg: Color, bg: Color, style: Style) {
        self.back.set_cell(pos, ch, width, fg, bg, style);
    }

    /// Resize both buffers, preserving the overlapping back-buffer
    /// content.
    ///
    /// The terminal's content is unknown after a real resize, so the
    /// front buffer is dropped to a cleared state and a clear-screen plus
    /// home motion is queued; the next `update()` repaints everything the
    /// back buffer preserved.
    pub fn set_size(&mut self, size: Size) {
        if size == self.back.size() {
            return;
        }
        self.back.resize(size);
        self.front.resize(size);
        self.front.clear();
        self.out.resize_for(size.area() as usize);

        ansi::clear_screen(&mut self.out).ok();
        ansi::cursor_to(&mut self.out, 0, 0).ok();
        self.cursor.pos = Pos::new(0, 0);
    }

    // ─── Update ──────────────────────────────────────────────────────────

    /// Diff the back buffer against the front buffer, write the escape
    /// bytes to stdout in one call, and make `front == back`.
    ///
    /// # Errors
    ///
    /// Returns an error if the write to stdout fails.
    pub fn update(&mut self) -> io::Result<UpdateStats> {
        let stdout = io::stdout();
        let mut lock = stdout.lock();
        self.update_into(&mut lock)
    }

    /// `update()` against an arbitrary writer. Tests inspect the emitted
    /// bytes through this.
    ///
    /// # Errors
    ///
    /// Returns an error if writing to `w` fails.
    pub fn update_into(&mut self, w: &mut impl Write) -> io::Result<UpdateStats> {
        let size = self.back.size();
        let start = self.cursor.pos;
        let mut drawn = 0usize;

        for y in 0..size.height {
            let mut x = 0u16;
            while x < size.width {
                let cell = *self.back.cell(x, y);
                let advance = u16::from(cell.width.max(1));

                if cell == *self.front.cell(x, y) {
                    x += advance;
                    continue;
                }

                self.move_cursor(Pos::new(x, y));

                if cell.fg != self.cursor.fg {
                    ansi::fg(&mut self.out, cell.fg).ok();
                    self.cursor.fg = cell.fg;
                }
                if cell.bg != self.cursor.bg {
                    ansi::bg(&mut self.out, cell.bg).ok();
                    self.cursor.bg = cell.bg;
                }
                if cell.style != self.cursor.style {
                    ansi::style_transition(&mut self.out, self.cursor.style, cell.style).ok();
                    self.cursor.style = cell.style;
                }

                // Empty and control cells render as a space, as does a
                // double-width glyph that cannot fit at the right edge.
                if cell.ch < 0x20 || (cell.width == 2 && x == size.width - 1) {
                    self.out.put_glyph(u32::from(' '));
                    self.cursor.pos.x += 1;
                } else {
                    self.out.put_glyph(cell.ch);
                    self.cursor.pos.x += advance;
                }

                drawn += 1;
                x += advance;
            }
        }

        if drawn > 0 {
            self.move_cursor(start);
        }

        // Drain even when nothing was drawn: motion queued by clear() or
        // set_size() must still reach the terminal.
        let bytes_flushed = self.out.drain_to(w)?;

        if drawn > 0 {
            // The terminal now matches the back buffer. clone_from reuses
            // the front buffer's row allocations.
            self.front.clone_from(&self.back);
        }

        Ok(UpdateStats {
            cells_drawn: drawn,
            bytes_flushed,
        })
    }

    /// Move the terminal cursor to `pos` with the shortest sequence:
    /// nothing if already there, horizontal or vertical relative motion
    /// when one axis matches, absolute positioning otherwise.
    fn move_cursor(&mut self, pos: Pos) {
        let cur = self.cursor.pos;
        if pos == cur {
            return;
        }

        // A glyph written in the last column leaves the terminal in its
        // pending-wrap state; relative motion from there is unreliable.
        let past_edge = cur.x >= self.back.width();

        if past_edge || (pos.x != cur.x && pos.y != cur.y) {
            ansi::cursor_to(&mut self.out, pos.x, pos.y).ok();
        } else if pos.y == cur.y {
            if pos.x > cur.x {
                ansi::cursor_forward(&mut self.out, pos.x - cur.x).ok();
            } else {
                ansi::cursor_back(&mut self.out, cur.x - pos.x).ok();
            }
        } else if pos.y > cur.y {
            ansi::cursor_down(&mut self.out, pos.y - cur.y).ok();
        } else {
            ansi::cursor_up(&mut self.out, cur.y - pos.y).ok();
        }

        self.cursor.pos = pos;
    }
}

// ─── Tests ───────────────────────────────────────────────────────────────────
