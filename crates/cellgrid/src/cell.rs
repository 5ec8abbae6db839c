// SPDX-License-Identifier: MIT
//
// Cell — the atomic unit of the screen grid.
//
// Every addressable position holds one of these: a Unicode codepoint, its
// display width, foreground and background colours, and a style bitmask.
// The whole engine exists to produce, diff and emit cells.
//
// Wide characters (CJK, some emoji) occupy two columns: the first cell
// carries the codepoint with width 2, the next cell is a width-0
// continuation the renderer never draws itself.

use crate::color::Color;

// ─── Style ───────────────────────────────────────────────────────────────────

bitflags::bitflags! {
    /// Text style bits, mapping one-to-one onto SGR parameters.
    ///
    /// `BOLD` and `DIM` share the terminal's intensity attribute and are
    /// mutually exclusive; when both are requested the renderer emits bold.
    ///
    /// ```
    /// use cellgrid::cell::Style;
    ///
    /// let s = Style::BOLD | Style::UNDERLINE;
    /// assert!(s.contains(Style::BOLD));
    /// assert!(!s.contains(Style::ITALIC));
    /// ```
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Hash)]
    pub struct Style: u8 {
        /// SGR 1 — increased intensity.
        const BOLD       = 1 << 0;
        /// SGR 2 — decreased intensity.
        const DIM        = 1 << 1;
        /// SGR 3 — italic.
        const ITALIC     = 1 << 2;
        /// SGR 4 — underline.
        const UNDERLINE  = 1 << 3;
        /// SGR 9 — crossed-out.
        const OVERSTRIKE = 1 << 4;

        /// Write-API sentinel: keep the cell's existing style.
        /// Never stored in a cell.
        const UNCHANGED  = 0xFF;
    }
}

impl Style {
    /// Alias for [`BOLD`](Self::BOLD) (the intensity bit, set direction).
    pub const INTENSE: Self = Self::BOLD;
    /// Alias for [`DIM`](Self::DIM).
    pub const FAINT: Self = Self::DIM;

    /// Whether this is the write-API "keep" sentinel.
    #[inline]
    #[must_use]
    pub fn is_unchanged(self) -> bool {
        self == Self::UNCHANGED
    }
}

// ─── Cell ────────────────────────────────────────────────────────────────────

/// Glyph sentinel for write APIs: keep the cell's existing codepoint
/// (and display width). Never stored in a cell.
pub const CH_UNCHANGED: u32 = u32::MAX;

/// A single grid position.
///
/// `ch == 0` marks an empty cell (rendered as a space) and, in the column
/// after a width-2 glyph, the continuation cell.
///
/// Two cells are equal iff codepoint, colours and style all match — this
/// equality is what the diff renderer walks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Cell {
    /// Unicode codepoint; 0 = empty / continuation.
    pub ch: u32,
    /// Display width in columns: 0 (continuation), 1 or 2.
    pub width: u8,
    /// Foreground colour.
    pub fg: Color,
    /// Background colour.
    pub bg: Color,
    /// Style bits.
    pub style: Style,
}

impl Cell {
    /// An empty cell: no glyph, default colours, no style.
    pub const EMPTY: Self = Self {
        ch: 0,
        width: 1,
        fg: Color::Default,
        bg: Color::Default,
        style: Style::empty(),
    };

    /// Whether this cell is the trailing column of a wide glyph.
    #[inline]
    #[must_use]
    pub const fn is_continuation(self) -> bool {
        self.width == 0
    }

    /// The codepoint as a `char`, or `None` for empty/continuation cells
    /// and invalid scalar values.
    #[inline]
    #[must_use]
    pub const fn character(self) -> Option<char> {
        if self.ch == 0 {
            return None;
        }
        char::from_u32(self.ch)
    }

    /// Reset to [`EMPTY`](Self::EMPTY).
    #[inline]
    pub const fn reset(&mut self) {
        *self = Self::EMPTY;
    }
}

impl Default for Cell {
    #[inline]
    fn default() -> Self {
        Self::EMPTY
    }
}

// ─── Tests ───────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use std::mem;

    // ── Layout ──────────────────────────────────────────────────────────

    #[test]
    fn cell_is_compact() {
        // u32 + u8 + two 4-byte colours + u8 style, padded.
        assert!(mem::size_of::<Cell>() <= 16);
    }

    #[test]
    fn style_is_1_byte() {
        assert_eq!(mem::size_of::<Style>(), 1);
    }

    #[test]
    fn cell_is_copy() {
        let a = Cell::EMPTY;
        let b = a;
        assert_eq!(a, b);
    }

    // ── Style bits ──────────────────────────────────────────────────────

    #[test]
    fn style_bit_values_match_sgr_mapping() {
        assert_eq!(Style::BOLD.bits(), 1);
        assert_eq!(Style::DIM.bits(), 2);
        assert_eq!(Style::ITALIC.bits(), 4);
        assert_eq!(Style::UNDERLINE.bits(), 8);
        assert_eq!(Style::OVERSTRIKE.bits(), 16);
    }

    #[test]
    fn intensity_aliases() {
        assert_eq!(Style::INTENSE, Style::BOLD);
        assert_eq!(Style::FAINT, Style::DIM);
    }

    #[test]
    fn style_combines_with_or() {
        let s = Style::BOLD | Style::ITALIC | Style::OVERSTRIKE;
        assert!(s.contains(Style::BOLD));
        assert!(s.contains(Style::OVERSTRIKE));
        assert!(!s.contains(Style::UNDERLINE));
    }

    #[test]
    fn unchanged_sentinel_detected() {
        assert!(Style::UNCHANGED.is_unchanged());
        assert!(!Style::BOLD.is_unchanged());
        assert!(!(Style::BOLD | Style::DIM).is_unchanged());
    }

    #[test]
    fn default_style_is_empty() {
        assert!(Style::default().is_empty());
    }

    // ── Cell ────────────────────────────────────────────────────────────

    #[test]
    fn empty_cell_has_no_character() {
        assert_eq!(Cell::EMPTY.character(), None);
        assert_eq!(Cell::EMPTY.ch, 0);
        assert_eq!(Cell::EMPTY.fg, Color::Default);
        assert_eq!(Cell::EMPTY.bg, Color::Default);
        assert!(Cell::EMPTY.style.is_empty());
    }

    #[test]
    fn default_cell_is_empty() {
        assert_eq!(Cell::default(), Cell::EMPTY);
    }

    #[test]
    fn character_round_trips() {
        let cell = Cell { ch: '日' as u32, width: 2, ..Cell::EMPTY };
        assert_eq!(cell.character(), Some('日'));
    }

    #[test]
    fn continuation_is_width_zero() {
        let cont = Cell { ch: 0, width: 0, ..Cell::EMPTY };
        assert!(cont.is_continuation());
        assert!(!Cell::EMPTY.is_continuation());
    }

    #[test]
    fn invalid_scalar_yields_none() {
        let cell = Cell { ch: 0xD800, width: 1, ..Cell::EMPTY };
        assert_eq!(cell.character(), None);
    }

    #[test]
    fn reset_restores_empty() {
        let mut cell = Cell {
            ch: 'x' as u32,
            width: 1,
            fg: Color::RED,
            bg: Color::BLUE,
            style: Style::BOLD,
        };
        cell.reset();
        assert_eq!(cell, Cell::EMPTY);
    }

    #[test]
    fn equality_is_field_wise() {
        let a = Cell { ch: 'a' as u32, width: 1, ..Cell::EMPTY };
        let b = Cell { ch: 'b' as u32, width: 1, ..Cell::EMPTY };
        assert_ne!(a, b);

        let styled = Cell { style: Style::DIM, ..a };
        assert_ne!(a, styled);
    }

    #[test]
    fn ch_unchanged_is_not_a_valid_scalar() {
        assert!(char::from_u32(CH_UNCHANGED).is_none());
    }
}
