// SPDX-License-Identifier: MIT
//
// Frame batching.
//
// One update produces many small pieces of output: cursor motion, colour
// and style changes, glyphs. Handing them to the terminal piecemeal
// tears frames and multiplies syscalls, so the renderer collects the
// whole frame here and drains it in a single write.
//
// The batch is sized in grid cells, not bytes: a cell that changes costs
// a few escape bytes plus its glyph, so capacity for the worst realistic
// frame is a small multiple of the cell count. Sizing happens when the
// screen does — at construction and on resize — which keeps steady-state
// updates allocation-free.

use std::io::{self, Write};

/// Escape-plus-glyph byte budget per cell when sizing for a grid.
const BYTES_PER_CELL: usize = 4;

/// The escape bytes of one frame, collected for a single write.
pub struct FrameBatch {
    bytes: Vec<u8>,
}

impl FrameBatch {
    /// A batch with room for a full repaint of `cells` grid cells.
    #[must_use]
    pub fn sized_for(cells: usize) -> Self {
        Self {
            bytes: Vec::with_capacity(cells * BYTES_PER_CELL),
        }
    }

    /// Adopt a new grid size, growing the allocation if the current one
    /// could not hold a full repaint.
    pub fn resize_for(&mut self, cells: usize) {
        let want = cells * BYTES_PER_CELL;
        if want > self.bytes.capacity() {
            self.bytes.reserve(want - self.bytes.len());
        }
    }

    /// Append one glyph as UTF-8.
    ///
    /// Codepoint 0 is the empty-cell marker and paints as a space, as
    /// does anything that is not a Unicode scalar — neither names a
    /// printable glyph.
    pub fn put_glyph(&mut self, cp: u32) {
        match char::from_u32(cp) {
            Some(ch) if cp != 0 => {
                let mut enc = [0u8; 4];
                self.bytes
                    .extend_from_slice(ch.encode_utf8(&mut enc).as_bytes());
            }
            _ => self.bytes.push(b' '),
        }
    }

    /// Hand the whole frame to `w` in one write, flush it, and start the
    /// next frame empty. An empty batch writes nothing.
    ///
    /// Returns the number of bytes that went out.
    ///
    /// # Errors
    ///
    /// Returns an error if writing to `w` fails; the batch is kept so a
    /// retry sees the same frame.
    pub fn drain_to(&mut self, w: &mut impl Write) -> io::Result<usize> {
        let n = self.bytes.len();
        if n > 0 {
            w.write_all(&self.bytes)?;
            w.flush()?;
            self.bytes.clear();
        }
        Ok(n)
    }

    /// Bytes queued for the current frame, not yet drained.
    #[must_use]
    pub fn pending(&self) -> &[u8] {
        &self.bytes
    }
}

/// The escape emitters in [`ansi`](crate::ansi) target `impl Write`;
/// pointing them at the batch queues their bytes instead of sending
/// them. `flush` is a no-op on purpose — only `drain_to` performs I/O.
impl Write for FrameBatch {
    #[inline]
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.bytes.extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

// ─── Tests ───────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ansi;

    // ── Composition with the escape emitters ────────────────────────────

    #[test]
    fn escape_emitters_queue_into_the_batch() {
        let mut batch = FrameBatch::sized_for(4);
        ansi::cursor_to(&mut batch, 2, 1).unwrap();
        batch.put_glyph(u32::from('x'));
        ansi::cursor_back(&mut batch, 1).unwrap();

        assert_eq!(batch.pending(), b"\x1b[2;3Hx\x1b[1D");
    }

    #[test]
    fn write_macro_composes_too() {
        let mut batch = FrameBatch::sized_for(1);
        write!(batch, "\x1b[{}m", 39).unwrap();
        assert_eq!(batch.pending(), b"\x1b[39m");
    }

    // ── Glyph policy ────────────────────────────────────────────────────

    #[test]
    fn glyphs_encode_at_every_utf8_width() {
        let mut batch = FrameBatch::sized_for(4);
        batch.put_glyph(u32::from('A'));
        batch.put_glyph(u32::from('é'));
        batch.put_glyph(u32::from('中'));
        batch.put_glyph(u32::from('🦀'));
        assert_eq!(batch.pending(), "Aé中🦀".as_bytes());
    }

    #[test]
    fn empty_cell_marker_paints_a_space() {
        let mut batch = FrameBatch::sized_for(1);
        batch.put_glyph(0);
        assert_eq!(batch.pending(), b" ");
    }

    #[test]
    fn non_scalar_codepoints_paint_a_space() {
        let mut batch = FrameBatch::sized_for(1);
        batch.put_glyph(0xD800); // surrogate
        batch.put_glyph(0x110000); // past the last plane
        assert_eq!(batch.pending(), b"  ");
    }

    // ── Drain ───────────────────────────────────────────────────────────

    #[test]
    fn drain_is_one_frame_one_write() {
        let mut batch = FrameBatch::sized_for(8);
        ansi::clear_screen(&mut batch).unwrap();
        batch.put_glyph(u32::from('z'));

        let mut wire = Vec::new();
        let sent = batch.drain_to(&mut wire).unwrap();

        assert_eq!(wire, b"\x1b[2Jz");
        assert_eq!(sent, wire.len());
        assert!(batch.pending().is_empty());
    }

    #[test]
    fn empty_drain_touches_nothing() {
        let mut batch = FrameBatch::sized_for(8);
        let mut wire = Vec::new();
        assert_eq!(batch.drain_to(&mut wire).unwrap(), 0);
        assert!(wire.is_empty());
    }

    #[test]
    fn consecutive_frames_reuse_the_batch() {
        let mut batch = FrameBatch::sized_for(16);
        let cap = batch.bytes.capacity();

        for frame in 0..3u32 {
            batch.put_glyph(u32::from('0') + frame);
            let mut wire = Vec::new();
            batch.drain_to(&mut wire).unwrap();
            assert_eq!(wire.len(), 1);
        }

        assert_eq!(batch.bytes.capacity(), cap);
    }

    // ── Sizing ──────────────────────────────────────────────────────────

    #[test]
    fn sized_for_budgets_per_cell() {
        let batch = FrameBatch::sized_for(80 * 24);
        assert!(batch.bytes.capacity() >= 80 * 24 * BYTES_PER_CELL);
    }

    #[test]
    fn resize_for_grows_for_a_larger_grid() {
        let mut batch = FrameBatch::sized_for(10);
        batch.resize_for(200 * 50);
        assert!(batch.bytes.capacity() >= 200 * 50 * BYTES_PER_CELL);
    }

    #[test]
    fn resize_for_keeps_a_sufficient_allocation() {
        let mut batch = FrameBatch::sized_for(200 * 50);
        let cap = batch.bytes.capacity();
        batch.resize_for(10);
        assert_eq!(batch.bytes.capacity(), cap);
    }

    #[test]
    fn pending_frame_survives_a_resize() {
        let mut batch = FrameBatch::sized_for(4);
        batch.put_glyph(u32::from('k'));
        batch.resize_for(500);
        assert_eq!(batch.pending(), b"k");
    }
}
