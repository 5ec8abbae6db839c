// SPDX-License-Identifier: MIT
//
// Event — what the input decoder produces and the loop dispatches.
//
// A tagged union with one variant per kind of thing that can happen, each
// carrying exactly the fields it needs. Handlers match exhaustively; no
// flat struct with fields that only sometimes mean something.

use crate::buffer::Size;
use crate::keymap::{Key, Modifiers};

// ─── Payloads ────────────────────────────────────────────────────────────────

/// A named key press (arrows, function keys, bound letter chords).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeyEvent {
    pub key: Key,
    pub modifiers: Modifiers,
}

/// A single Unicode scalar typed by the user — printable text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InputEvent {
    pub codepoint: char,
}

/// A mouse button press or release.
///
/// Button numbering follows the low bits of the SGR report: 0 = left,
/// 1 = middle, 2 = right; buttons past the wheel report as 5 + low bits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MouseButtonEvent {
    pub button: u8,
    pub pressed: bool,
    pub x: u16,
    pub y: u16,
    pub modifiers: Modifiers,
}

/// A scroll wheel step: `delta` is +1 (up) or -1 (down).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MouseWheelEvent {
    pub delta: i8,
    pub x: u16,
    pub y: u16,
    pub modifiers: Modifiers,
}

/// The pointer moved. The loop suppresses consecutive moves that report
/// the same position, so handlers only see distinct coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MouseMoveEvent {
    pub x: u16,
    pub y: u16,
    pub modifiers: Modifiers,
}

/// The terminal was resized (or the synthetic initial resize).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResizeEvent {
    /// The new size.
    pub size: Size,
    /// The size before the change; `(0, 0)` for the initial event.
    pub old: Size,
}

// ─── Event ───────────────────────────────────────────────────────────────────

/// Anything the engine can report to the application.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Event {
    Key(KeyEvent),
    Input(InputEvent),
    MouseButton(MouseButtonEvent),
    MouseWheel(MouseWheelEvent),
    MouseMove(MouseMoveEvent),
    Resize(ResizeEvent),
}

// ─── Tests ───────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn events_are_comparable() {
        let a = Event::Input(InputEvent { codepoint: 'x' });
        let b = Event::Input(InputEvent { codepoint: 'x' });
        assert_eq!(a, b);

        let key = Event::Key(KeyEvent {
            key: Key::Up,
            modifiers: Modifiers::empty(),
        });
        assert_ne!(a, key);
    }

    #[test]
    fn resize_carries_old_size() {
        let ev = ResizeEvent {
            size: Size::new(120, 40),
            old: Size::new(80, 24),
        };
        assert_eq!(ev.size.width, 120);
        assert_eq!(ev.old.height, 24);
    }

    #[test]
    fn events_are_copy() {
        let ev = Event::MouseWheel(MouseWheelEvent {
            delta: 1,
            x: 3,
            y: 4,
            modifiers: Modifiers::CTRL,
        });
        let copy = ev;
        assert_eq!(ev, copy);
    }
}
