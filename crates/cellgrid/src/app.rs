// SPDX-License-Identifier: MIT
//
// Application loop — dispatch of decoded events to typed handlers.
//
// The loop owns the three moving parts (terminal controller, input
// decoder, screen renderer) and runs the cooperative cycle: apply any
// pending resize, drain internally queued events, push the frame diff
// out, block on input, dispatch. Single-threaded; the only thing that
// happens outside this cycle is the SIGWINCH handler setting its flag.
//
// Handlers are trait methods, one per event variant, each receiving the
// screen to draw on. They cannot fail back into the loop — they either
// mutate state or return `Action::Quit`.

use tracing::debug;

use crate::buffer::Size;
use crate::error::Result;
use crate::event::{
    Event, InputEvent, KeyEvent, MouseButtonEvent, MouseMoveEvent, MouseWheelEvent, ResizeEvent,
};
use crate::input::Input;
use crate::keymap;
use crate::screen::Screen;
use crate::terminal::{self, Options, Terminal};

// ─── Action ──────────────────────────────────────────────────────────────────

/// What a handler tells the loop to do next.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    /// Keep running.
    Continue,
    /// Leave the loop after the current iteration.
    Quit,
}

// ─── Handler ─────────────────────────────────────────────────────────────────

/// Typed handler slots, one per event variant.
///
/// Every method has a default that does nothing and continues, so an
/// application implements only what it cares about. Each handler gets
/// the screen; writes land in the back buffer and reach the terminal on
/// the loop's next `update`.
pub trait Handler {
    /// A named key (arrows, function keys, bound chords).
    fn on_key(&mut self, _screen: &mut Screen, _event: KeyEvent) -> Action {
        Action::Continue
    }

    /// Printable text input, one scalar at a time.
    fn on_input(&mut self, _screen: &mut Screen, _event: InputEvent) -> Action {
        Action::Continue
    }

    /// Mouse button press or release.
    fn on_mouse_button(&mut self, _screen: &mut Screen, _event: MouseButtonEvent) -> Action {
        Action::Continue
    }

    /// Scroll wheel step.
    fn on_mouse_wheel(&mut self, _screen: &mut Screen, _event: MouseWheelEvent) -> Action {
        Action::Continue
    }

    /// Pointer motion (already deduplicated by position).
    fn on_mouse_move(&mut self, _screen: &mut Screen, _event: MouseMoveEvent) -> Action {
        Action::Continue
    }

    /// Terminal size changed. The screen has already been resized when
    /// this runs; `event.old` is `(0, 0)` for the synthetic initial one.
    fn on_resize(&mut self, _screen: &mut Screen, _event: ResizeEvent) -> Action {
        Action::Continue
    }
}

/// Route one event to its typed handler slot.
fn dispatch_event(screen: &mut Screen, handler: &mut impl Handler, event: Event) -> Action {
    match event {
        Event::Key(ev) => handler.on_key(screen, ev),
        Event::Input(ev) => handler.on_input(screen, ev),
        Event::MouseButton(ev) => handler.on_mouse_button(screen, ev),
        Event::MouseWheel(ev) => handler.on_mouse_wheel(screen, ev),
        Event::MouseMove(ev) => handler.on_mouse_move(screen, ev),
        Event::Resize(ev) => handler.on_resize(screen, ev),
    }
}

/// Consecutive `MouseMove` events reporting the same position are noise.
/// Returns true when `event` is such a repeat; updates the tracked
/// position otherwise.
fn is_duplicate_move(last_move: &mut Option<(u16, u16)>, event: &Event) -> bool {
    if let Event::MouseMove(mv) = event {
        if *last_move == Some((mv.x, mv.y)) {
            return true;
        }
        *last_move = Some((mv.x, mv.y));
    }
    false
}

// ─── App ─────────────────────────────────────────────────────────────────────

/// The engine's top-level object: terminal + decoder + renderer + loop.
///
/// # Example
///
/// ```no_run
/// use cellgrid::app::{Action, App, Handler};
/// use cellgrid::event::KeyEvent;
/// use cellgrid::keymap::Key;
/// use cellgrid::screen::Screen;
/// use cellgrid::terminal::Options;
///
/// struct Quitter;
///
/// impl Handler for Quitter {
///     fn on_key(&mut self, _screen: &mut Screen, event: KeyEvent) -> Action {
///         if event.key == Key::Escape { Action::Quit } else { Action::Continue }
///     }
/// }
///
/// let mut app = App::new(Options::FULLSCREEN | Options::MOUSE_EVENTS)?;
/// app.run(&mut Quitter)?;
/// # Ok::<(), cellgrid::error::Error>(())
/// ```
pub struct App {
    terminal: Terminal,
    input: Input,
    screen: Screen,
    queued: Vec<Event>,
    emit_resize: bool,
    last_move: Option<(u16, u16)>,
    should_quit: bool,
}

impl App {
    /// Acquire the terminal and load `keys.json` from the working
    /// directory (missing file degrades to an empty keymap).
    ///
    /// The screen starts at 0×0; the first loop iteration delivers the
    /// synthetic resize that gives it the real size.
    ///
    /// # Errors
    ///
    /// Terminal acquisition errors (`NotATty`, `AlreadyActive`, termios)
    /// and keymap parse errors propagate.
    pub fn new(options: Options) -> Result<Self> {
        let keymap = keymap::load_default()?;
        let terminal = Terminal::init(options)?;
        Ok(Self {
            terminal,
            input: Input::new(keymap),
            screen: Screen::new(Size::new(0, 0)),
            queued: Vec::new(),
            emit_resize: true,
            last_move: None,
            should_quit: false,
        })
    }

    /// The screen, for drawing outside handler callbacks.
    pub fn screen(&mut self) -> &mut Screen {
        &mut self.screen
    }

    /// The terminal controller.
    #[must_use]
    pub const fn terminal(&self) -> &Terminal {
        &self.terminal
    }

    /// Stop the loop after the current iteration.
    pub fn quit(&mut self) {
        self.should_quit = true;
    }

    /// Run until a handler quits or stdin closes.
    ///
    /// Each iteration: pending resize → queued events → renderer update →
    /// wait for input → dispatch.
    ///
    /// # Errors
    ///
    /// I/O failures from the renderer flush or the input wait propagate;
    /// the terminal is restored by `App`'s drop in every case.
    pub fn run(&mut self, handler: &mut impl Handler) -> Result<()> {
        self.emit_resize = true;

        while !self.should_quit {
            if self.emit_resize || terminal::take_resize_pending() {
                self.emit_resize = false;
                self.apply_resize();
            }

            // Internally queued events go out before anything external.
            for event in std::mem::take(&mut self.queued) {
                if dispatch_event(&mut self.screen, handler, event) == Action::Quit {
                    self.should_quit = true;
                }
            }
            if self.should_quit {
                break;
            }

            self.screen.update()?;

            match self.input.wait()? {
                Some(event) => {
                    if is_duplicate_move(&mut self.last_move, &event) {
                        continue;
                    }
                    if dispatch_event(&mut self.screen, handler, event) == Action::Quit {
                        self.should_quit = true;
                    }
                }
                None => {
                    if self.input.is_eof() {
                        debug!("stdin closed, leaving the loop");
                        break;
                    }
                }
            }
        }

        debug!("event loop exiting");
        Ok(())
    }

    /// Query the real terminal size, queue the `Resize` event and resize
    /// the renderer.
    fn apply_resize(&mut self) {
        let old = self.screen.size();
        let new = self.terminal.refresh_size();
        self.queued.push(Event::Resize(ResizeEvent { size: new, old }));
        self.screen.set_size(new);
    }
}

// ─── Tests ───────────────────────────────────────────────────────────────────
