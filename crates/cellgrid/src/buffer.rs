// SPDX-License-Identifier: MIT
//
// ScreenBuffer — the 2D cell grid.
//
// Two of these live inside the renderer: the back buffer (target of all
// writes) and the front buffer (the renderer's model of what the terminal
// currently shows). Rows are stored as vectors of cells so the structural
// invariant is visible in the representation: after any resize,
// `rows.len() == height` and every row's length equals `width`.
//
// Resizing preserves the overlapping region and fills newly exposed area
// with empty cells. Writes honour the three `Unchanged` sentinels (glyph,
// colour, style) so callers can touch a subset of a cell's attributes.

use crate::cell::{CH_UNCHANGED, Cell, Style};
use crate::color::Color;

// ─── Geometry ────────────────────────────────────────────────────────────────

/// A grid position, 0-based, `x` growing right and `y` growing down.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Pos {
    pub x: u16,
    pub y: u16,
}

impl Pos {
    #[inline]
    #[must_use]
    pub const fn new(x: u16, y: u16) -> Self {
        Self { x, y }
    }
}

/// Grid dimensions in character cells.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Size {
    pub width: u16,
    pub height: u16,
}

impl Size {
    #[inline]
    #[must_use]
    pub const fn new(width: u16, height: u16) -> Self {
        Self { width, height }
    }

    /// Total number of cells (`width × height`).
    #[inline]
    #[must_use]
    pub const fn area(self) -> u32 {
        self.width as u32 * self.height as u32
    }

    /// Whether either dimension is zero.
    #[inline]
    #[must_use]
    pub const fn is_empty(self) -> bool {
        self.width == 0 || self.height == 0
    }
}

// ─── ScreenBuffer ────────────────────────────────────────────────────────────

/// A grid of cells addressed by `(x, y)` with `x < width`, `y < height`.
///
/// # Examples
///
/// ```
/// use cellgrid::buffer::{Pos, ScreenBuffer, Size};
/// use cellgrid::cell::Style;
/// use cellgrid::color::Color;
///
/// let mut buf = ScreenBuffer::new(Size::new(80, 24));
/// buf.set_cell(Pos::new(5, 3), 'X' as u32, 1, Color::RED, Color::Unchanged, Style::BOLD);
/// assert_eq!(buf.cell(5, 3).character(), Some('X'));
/// assert_eq!(buf.cell(5, 3).bg, Color::Default); // Unchanged kept the old value
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScreenBuffer {
    rows: Vec<Vec<Cell>>,
    size: Size,
}

impl ScreenBuffer {
    /// Create a buffer filled with empty cells.
    #[must_use]
    pub fn new(size: Size) -> Self {
        let rows = vec![vec![Cell::EMPTY; usize::from(size.width)]; usize::from(size.height)];
        Self { rows, size }
    }

    // ─── Accessors ───────────────────────────────────────────────────────

    #[inline]
    #[must_use]
    pub const fn size(&self) -> Size {
        self.size
    }

    #[inline]
    #[must_use]
    pub const fn width(&self) -> u16 {
        self.size.width
    }

    #[inline]
    #[must_use]
    pub const fn height(&self) -> u16 {
        self.size.height
    }

    /// Whether `(x, y)` is within the grid.
    #[inline]
    #[must_use]
    pub const fn in_bounds(&self, x: u16, y: u16) -> bool {
        x < self.size.width && y < self.size.height
    }

    /// The cell at `(x, y)`.
    ///
    /// # Panics
    ///
    /// Panics if `(x, y)` is out of bounds.
    #[inline]
    #[must_use]
    pub fn cell(&self, x: u16, y: u16) -> &Cell {
        &self.rows[usize::from(y)][usize::from(x)]
    }

    /// The cell at `(x, y)`, or `None` when out of bounds.
    #[inline]
    #[must_use]
    pub fn get(&self, x: u16, y: u16) -> Option<&Cell> {
        self.rows
            .get(usize::from(y))
            .and_then(|row| row.get(usize::from(x)))
    }

    /// A whole row as a slice, or `None` when `y` is out of bounds.
    #[inline]
    #[must_use]
    pub fn row(&self, y: u16) -> Option<&[Cell]> {
        self.rows.get(usize::from(y)).map(Vec::as_slice)
    }

    /// Iterate cells with their `(x, y)` coordinates, row-major.
    pub fn iter(&self) -> impl Iterator<Item = (u16, u16, &Cell)> {
        self.rows.iter().enumerate().flat_map(|(y, row)| {
            row.iter().enumerate().map(move |(x, cell)| {
                // Row/column counts come from u16 dimensions.
                #[allow(clippy::cast_possible_truncation)]
                (x as u16, y as u16, cell)
            })
        })
    }

    // ─── Clear & resize ──────────────────────────────────────────────────

    /// Reset every cell to empty defaults.
    pub fn clear(&mut self) {
        for row in &mut self.rows {
            row.fill(Cell::EMPTY);
        }
    }

    /// Reset every cell to empty with the given colours.
    ///
    /// `Unchanged` sentinels fall back to the terminal default — a cleared
    /// cell has no previous value worth keeping.
    pub fn clear_with(&mut self, fg: Color, bg: Color) {
        let fg = if fg == Color::Unchanged { Color::Default } else { fg };
        let bg = if bg == Color::Unchanged { Color::Default } else { bg };
        let cell = Cell { fg, bg, ..Cell::EMPTY };
        for row in &mut self.rows {
            row.fill(cell);
        }
    }

    /// Resize to `new_size`, preserving the overlapping region and filling
    /// newly exposed cells with empty defaults.
    pub fn resize(&mut self, new_size: Size) {
        self.rows
            .resize(usize::from(new_size.height), vec![Cell::EMPTY; usize::from(new_size.width)]);
        for row in &mut self.rows {
            row.resize(usize::from(new_size.width), Cell::EMPTY);
        }
        self.size = new_size;
    }

    // ─── Writes ──────────────────────────────────────────────────────────

    /// Write a cell, honouring the `Unchanged` sentinels.
    ///
    /// - `ch == CH_UNCHANGED` keeps the existing glyph *and* its width.
    /// - `fg` / `bg` equal to [`Color::Unchanged`] keep the existing colour.
    /// - `style == Style::UNCHANGED` keeps the existing style.
    ///
    /// Out-of-bounds positions and widths above 2 are programming errors;
    /// they trip a debug assertion and are ignored in release builds.
    pub fn set_cell(&mut self, pos: Pos, ch: u32, width: u8, fg: Color, bg: Color, style: Style) {
        debug_assert!(self.in_bounds(pos.x, pos.y), "set_cell out of bounds: {pos:?}");
        debug_assert!(width <= 2, "cell width {width} > 2");
        if !self.in_bounds(pos.x, pos.y) || width > 2 {
            return;
        }

        let cell = &mut self.rows[usize::from(pos.y)][usize::from(pos.x)];
        if ch != CH_UNCHANGED {
            cell.ch = ch;
            cell.width = width;
        }
        if fg != Color::Unchanged {
            cell.fg = fg;
        }
        if bg != Color::Unchanged {
            cell.bg = bg;
        }
        if !style.is_unchanged() {
            cell.style = style;
        }
    }
}

// ─── Tests ───────────────────────────────────────────────────────────────────
