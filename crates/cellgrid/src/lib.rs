// SPDX-License-Identifier: MIT
//
// cellgrid — a terminal user-interface engine.
//
// Turns a VT-style terminal into an addressable grid of styled cells:
// a double-buffered screen with a diffing renderer that emits only the
// escape bytes a frame actually needs, a byte-stream input decoder for
// keys, SGR mouse reports and UTF-8 text, a raw-mode lifecycle controller
// that restores the terminal on every exit path (fatal signals included),
// and a cooperative event loop with typed handler dispatch.
//
// This crate intentionally avoids terminal frameworks in favor of direct
// escape-sequence control over raw termios. Every byte sent to the
// terminal is accounted for; every frame is diffed.

pub mod ansi;
pub mod app;
pub mod buffer;
pub mod canvas;
pub mod cell;
pub mod color;
pub mod error;
pub mod event;
pub mod input;
pub mod keymap;
pub mod output;
pub mod sampler;
pub mod screen;
pub mod terminal;

pub use app::{Action, App, Handler};
pub use buffer::{Pos, ScreenBuffer, Size};
pub use canvas::{Canvas, Rect};
pub use cell::{Cell, Style};
pub use color::Color;
pub use error::{Error, Result};
pub use event::Event;
pub use keymap::{Key, Keymap, Modifiers};
pub use sampler::{Constant, LinearGradient, Sampler};
pub use screen::Screen;
pub use terminal::{Options, Terminal};
