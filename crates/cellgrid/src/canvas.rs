// SPDX-License-Identifier: MIT
//
// Canvas — rectangle fills over the back buffer.
//
// A thin drawing layer: clip a rectangle to the screen, walk its cells,
// ask a sampler for each cell's colour, and write it as the background
// through the glyph/fg/style sentinels so whatever text is already there
// survives the fill.

use crate::buffer::{Pos, Size};
use crate::cell::{CH_UNCHANGED, Style};
use crate::color::Color;
use crate::sampler::{Constant, Sampler};
use crate::screen::Screen;

// ─── Rect ────────────────────────────────────────────────────────────────────

/// An axis-aligned rectangle in grid coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rect {
    pub pos: Pos,
    pub size: Size,
}

impl Rect {
    #[inline]
    #[must_use]
    pub const fn new(x: u16, y: u16, width: u16, height: u16) -> Self {
        Self {
            pos: Pos::new(x, y),
            size: Size::new(width, height),
        }
    }

    /// Clip to a screen of the given size. `None` when nothing overlaps.
    #[must_use]
    pub fn clipped_to(self, bounds: Size) -> Option<Self> {
        if self.pos.x >= bounds.width || self.pos.y >= bounds.height {
            return None;
        }
        let width = self.size.width.min(bounds.width - self.pos.x);
        let height = self.size.height.min(bounds.height - self.pos.y);
        if width == 0 || height == 0 {
            return None;
        }
        Some(Self {
            pos: self.pos,
            size: Size::new(width, height),
        })
    }
}

// ─── Canvas ──────────────────────────────────────────────────────────────────

/// Fills rectangles of a [`Screen`]'s back buffer with sampled colour.
///
/// ```
/// use cellgrid::buffer::Size;
/// use cellgrid::canvas::{Canvas, Rect};
/// use cellgrid::color::Color;
/// use cellgrid::sampler::LinearGradient;
/// use cellgrid::screen::Screen;
///
/// let mut screen = Screen::new(Size::new(80, 24));
/// let mut canvas = Canvas::new(&mut screen);
/// canvas.fill(Rect::new(0, 0, 80, 24), Color::BLUE);
/// canvas.fill_with(
///     Rect::new(10, 5, 20, 10),
///     &LinearGradient::new([Color::CYAN, Color::YELLOW]),
///     45.0,
/// );
/// ```
pub struct Canvas<'a> {
    screen: &'a mut Screen,
}

impl<'a> Canvas<'a> {
    #[must_use]
    pub fn new(screen: &'a mut Screen) -> Self {
        Self { screen }
    }

    /// Fill `rect` with a single background colour.
    pub fn fill(&mut self, rect: Rect, color: Color) {
        self.fill_with(rect, &Constant::new(color), 0.0);
    }

    /// Fill `rect` with a sampler, rotated by `angle` degrees.
    ///
    /// Cell `(i, j)` inside the rectangle samples at the normalized
    /// coordinates `((i+1)/w, (j+1)/h)`, so samples cover `(0, 1]` on both
    /// axes. Only backgrounds are written: glyphs, foregrounds and styles
    /// stay untouched.
    pub fn fill_with(&mut self, rect: Rect, sampler: &dyn Sampler, angle: f32) {
        let Some(rect) = rect.clipped_to(self.screen.size()) else {
            return;
        };

        let w = f32::from(rect.size.width);
        let h = f32::from(rect.size.height);

        for j in 0..rect.size.height {
            let v = f32::from(j + 1) / h;
            for i in 0..rect.size.width {
                let u = f32::from(i + 1) / w;
                let color = sampler.sample(u, v, angle);
                self.screen.set_cell(
                    Pos::new(rect.pos.x + i, rect.pos.y + j),
                    CH_UNCHANGED,
                    0,
                    Color::Unchanged,
                    color,
                    Style::UNCHANGED,
                );
            }
        }
    }
}

// ─── Tests ───────────────────────────────────────────────────────────────────
