// SPDX-License-Identifier: MIT
//
// cellgrid demo — a gradient canvas plus a live event echo.
//
// Proves the whole pipeline: terminal acquisition, gradient fill through
// the canvas, diff rendering, and decoded events painted back onto the
// screen as they arrive. Press keys, click, scroll, move the mouse,
// resize the window. `q` (or Escape, with a keys.json providing the
// binding) quits.
//
// Diagnostics go to demo.log in the working directory; the terminal
// itself belongs to the UI.
//
// Usage:
//   cargo run -p cellgrid --example demo

use std::fs::File;
use std::sync::Mutex;

use cellgrid::app::{Action, App, Handler};
use cellgrid::buffer::Pos;
use cellgrid::canvas::{Canvas, Rect};
use cellgrid::cell::Style;
use cellgrid::color::Color;
use cellgrid::event::{
    InputEvent, KeyEvent, MouseButtonEvent, MouseMoveEvent, MouseWheelEvent, ResizeEvent,
};
use cellgrid::keymap::{Key, key_with_modifiers};
use cellgrid::screen::Screen;
use cellgrid::terminal::Options;

/// Rows reserved at the top for the banner.
const HEADER_ROWS: u16 = 2;

struct Demo {
    events_seen: u64,
}

impl Demo {
    fn new() -> Self {
        Self { events_seen: 0 }
    }

    /// Repaint the backdrop and banner; called on every resize.
    fn paint_chrome(screen: &mut Screen) {
        let size = screen.size();
        if size.is_empty() {
            return;
        }

        let gradient = cellgrid::sampler::LinearGradient::new([
            Color::Rgb(20, 16, 48),
            Color::Rgb(8, 56, 72),
            Color::Rgb(16, 24, 32),
        ]);
        Canvas::new(screen).fill_with(
            Rect::new(0, 0, size.width, size.height),
            &gradient,
            45.0,
        );

        screen.print(
            Pos::new(1, 0),
            &format!("cellgrid demo — {}x{} — q quits", size.width, size.height),
            Color::Rgb(240, 240, 240),
            Color::Rgb(40, 40, 96),
            Style::BOLD,
        );
    }

    /// Echo one line of text into the scrolling area below the banner.
    fn echo(&mut self, screen: &mut Screen, text: &str) {
        self.events_seen += 1;
        let size = screen.size();
        if size.height <= HEADER_ROWS {
            return;
        }
        let rows = u64::from(size.height - HEADER_ROWS);
        #[allow(clippy::cast_possible_truncation)] // bounded by screen height
        let y = HEADER_ROWS + ((self.events_seen - 1) % rows) as u16;

        // Blank the row before writing so older, longer lines don't
        // shine through.
        let blank = " ".repeat(usize::from(size.width));
        screen.print(Pos::new(0, y), &blank, Color::Unchanged, Color::Unchanged, Style::UNCHANGED);
        screen.print(
            Pos::new(1, y),
            &format!("{:>6}  {}", self.events_seen, text),
            Color::Rgb(220, 220, 220),
            Color::Unchanged,
            Style::empty(),
        );
    }
}

impl Handler for Demo {
    fn on_key(&mut self, screen: &mut Screen, event: KeyEvent) -> Action {
        if event.key == Key::Escape && event.modifiers.is_empty() {
            return Action::Quit;
        }
        let name = key_with_modifiers(event.key, event.modifiers);
        self.echo(screen, &format!("key    {name}"));
        Action::Continue
    }

    fn on_input(&mut self, screen: &mut Screen, event: InputEvent) -> Action {
        if event.codepoint == 'q' {
            return Action::Quit;
        }
        let cp = u32::from(event.codepoint);
        let shown = if event.codepoint.is_control() {
            format!("U+{cp:04X}")
        } else {
            format!("'{}' (U+{cp:04X})", event.codepoint)
        };
        self.echo(screen, &format!("input  {shown}"));
        Action::Continue
    }

    fn on_mouse_button(&mut self, screen: &mut Screen, event: MouseButtonEvent) -> Action {
        let state = if event.pressed { "pressed" } else { "released" };
        let line = format!(
            "button {} {state} at {},{}",
            event.button, event.x, event.y
        );
        self.echo(screen, &line);
        Action::Continue
    }

    fn on_mouse_wheel(&mut self, screen: &mut Screen, event: MouseWheelEvent) -> Action {
        let line = format!("wheel  {:+} at {},{}", event.delta, event.x, event.y);
        self.echo(screen, &line);
        Action::Continue
    }

    fn on_mouse_move(&mut self, screen: &mut Screen, event: MouseMoveEvent) -> Action {
        // Overwrite in place instead of scrolling; motion is chatty.
        let size = screen.size();
        if size.height > 1 {
            let line = format!("mouse  {},{}    ", event.x, event.y);
            screen.print(
                Pos::new(1, 1),
                &line,
                Color::Rgb(160, 220, 160),
                Color::Unchanged,
                Style::empty(),
            );
        }
        Action::Continue
    }

    fn on_resize(&mut self, screen: &mut Screen, event: ResizeEvent) -> Action {
        Demo::paint_chrome(screen);
        let line = format!(
            "resize {}x{} (was {}x{})",
            event.size.width, event.size.height, event.old.width, event.old.height
        );
        self.echo(screen, &line);
        Action::Continue
    }
}

fn main() -> cellgrid::error::Result<()> {
    let log = File::create("demo.log")?;
    tracing_subscriber::fmt()
        .with_writer(Mutex::new(log))
        .with_ansi(false)
        .init();

    let mut app = App::new(
        Options::FULLSCREEN | Options::HIDE_CURSOR | Options::MOUSE_EVENTS,
    )?;
    app.run(&mut Demo::new())
}
