// SPDX-License-Identifier: MIT
//
// Terminal controller — raw mode, alternate screen, and guaranteed restore.
//
// Safety: this module necessarily uses `unsafe` for termios (tcgetattr,
// tcsetattr), ioctl (TIOCGWINSZ), isatty, sigaction, atexit and raw fd
// writes. These are the POSIX interfaces for terminal control — there is
// no safe alternative. Each unsafe block is minimal.
#![allow(unsafe_code)]
//
// The controller owns the terminal's raw state for the whole process:
// exactly one may be active at a time, because restoration has to work
// from contexts that cannot carry a `self` — the atexit hook and the
// fatal-signal handlers. Those paths read a process-wide backup of the
// saved termios and write a fixed, pre-built disable sequence straight to
// fd 1, bypassing Rust's stdout lock (a signal may land mid-flush while
// the lock is held).
//
// Restore runs at most once per init, no matter how many of the four
// paths fire: explicit call, Drop, atexit, fatal signal. An atomic flag
// gates it.
//
// SIGWINCH does none of that: it only sets an atomic the event loop
// polls. It is installed without SA_RESTART on purpose — the input
// decoder's ppoll has to come back with EINTR for the loop to notice the
// flag.

use std::io::{self, Write};
use std::sync::Once;
use std::sync::atomic::{AtomicBool, Ordering};
#[cfg(unix)]
use std::sync::Mutex;

use tracing::debug;

use crate::ansi;
use crate::buffer::Size;
use crate::error::{Error, Result};

// ─── Options ─────────────────────────────────────────────────────────────────

bitflags::bitflags! {
    /// What to acquire from the terminal at init time.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct Options: u8 {
        /// Switch to the alternate screen and track window-size changes.
        const FULLSCREEN          = 1 << 0;
        /// Hide the text cursor while running.
        const HIDE_CURSOR         = 1 << 1;
        /// Report mouse button presses and releases (SGR extended).
        const MOUSE_BUTTON_EVENTS = 1 << 2;
        /// Report all mouse motion.
        const MOUSE_MOVE_EVENTS   = 1 << 3;
        /// Deliver Ctrl-C, Ctrl-Z etc. as input bytes instead of signals.
        const NO_SIGNAL_DECODE    = 1 << 4;

        /// Buttons and motion together.
        const MOUSE_EVENTS = Self::MOUSE_BUTTON_EVENTS.bits() | Self::MOUSE_MOVE_EVENTS.bits();
    }
}

// ─── Process-wide restore state ──────────────────────────────────────────────

/// Whether a controller currently owns the terminal. Gates restore so it
/// runs exactly once per successful init.
static ACTIVE: AtomicBool = AtomicBool::new(false);

/// Set by the SIGWINCH handler, consumed by the event loop.
static RESIZE_PENDING: AtomicBool = AtomicBool::new(false);

/// Termios captured at init, for restore paths that have no `self`.
#[cfg(unix)]
static TERMIOS_BACKUP: Mutex<Option<libc::termios>> = Mutex::new(None);

/// The atexit hook is registered at most once per process.
static ATEXIT_INSTALLED: Once = Once::new();

/// Everything off, in the reverse of enable order: mouse motion, mouse
/// buttons (SGR trio), attributes, alternate screen, cursor back on.
/// Written unconditionally on restore — disabling a mode that was never
/// on is harmless, and the fatal-signal path cannot consult options.
const RESTORE_SEQUENCE: &[u8] =
    b"\x1b[?1003l\x1b[?1002l\x1b[?1015l\x1b[?1006l\x1b[0m\x1b[?1049l\x1b[?25h";

/// Write the disable sequence directly to fd 1, bypassing the stdout
/// lock; a fatal signal may have interrupted a frame flush that holds it.
fn emergency_write(bytes: &[u8]) {
    #[cfg(unix)]
    unsafe {
        let _ = libc::write(libc::STDOUT_FILENO, bytes.as_ptr().cast::<libc::c_void>(), bytes.len());
    }
    #[cfg(not(unix))]
    {
        let _ = io::stdout().write_all(bytes);
        let _ = io::stdout().flush();
    }
}

/// Re-apply the termios captured at init. Best effort: `try_lock` so a
/// signal landing inside init/restore cannot deadlock the handler.
#[cfg(unix)]
fn restore_termios_from_backup() {
    if let Ok(guard) = TERMIOS_BACKUP.try_lock() {
        if let Some(ref original) = *guard {
            unsafe {
                let _ = libc::tcsetattr(libc::STDIN_FILENO, libc::TCSANOW, original);
            }
        }
    }
}

/// The one restore implementation behind all four exit paths.
/// Idempotent: only the first caller after an init does anything.
fn restore_now() {
    if !ACTIVE.swap(false, Ordering::SeqCst) {
        return;
    }
    emergency_write(RESTORE_SEQUENCE);
    #[cfg(unix)]
    restore_termios_from_backup();
}

extern "C" fn restore_at_exit() {
    restore_now();
}

// ─── Signal handlers ─────────────────────────────────────────────────────────

#[cfg(unix)]
extern "C" fn fatal_signal_handler(sig: libc::c_int) {
    restore_now();
    // Re-raise with the default disposition so the process dies with the
    // right status and a debuggable core where applicable.
    unsafe {
        libc::signal(sig, libc::SIG_DFL);
        libc::raise(sig);
    }
}

#[cfg(unix)]
extern "C" fn sigwinch_handler(_sig: libc::c_int) {
    RESIZE_PENDING.store(true, Ordering::Relaxed);
}

/// Install a handler without SA_RESTART so blocking syscalls see EINTR.
#[cfg(unix)]
fn install_handler(sig: libc::c_int, handler: extern "C" fn(libc::c_int)) {
    unsafe {
        let mut sa: libc::sigaction = std::mem::zeroed();
        sa.sa_sigaction = handler as *const () as usize;
        sa.sa_flags = 0;
        libc::sigemptyset(&raw mut sa.sa_mask);
        libc::sigaction(sig, &raw const sa, std::ptr::null_mut());
    }
}

#[cfg(unix)]
fn install_signal_handlers(options: Options) {
    for sig in [libc::SIGINT, libc::SIGTERM, libc::SIGABRT, libc::SIGFPE] {
        install_handler(sig, fatal_signal_handler);
    }
    if options.contains(Options::FULLSCREEN) {
        install_handler(libc::SIGWINCH, sigwinch_handler);
    }
}

#[cfg(not(unix))]
fn install_signal_handlers(_options: Options) {}

/// Consume the pending-resize flag. True at most once per SIGWINCH burst.
pub fn take_resize_pending() -> bool {
    RESIZE_PENDING.swap(false, Ordering::Relaxed)
}

// ─── Terminal queries ────────────────────────────────────────────────────────

/// Whether standard input is a terminal.
#[cfg(unix)]
#[must_use]
pub fn is_tty() -> bool {
    unsafe { libc::isatty(libc::STDIN_FILENO) != 0 }
}

#[cfg(not(unix))]
#[must_use]
pub fn is_tty() -> bool {
    false
}

/// The terminal size via `ioctl(TIOCGWINSZ)`, or `None` off-terminal.
#[cfg(unix)]
#[must_use]
pub fn probe_size() -> Option<Size> {
    let mut ws: libc::winsize = unsafe { std::mem::zeroed() };
    let rc = unsafe { libc::ioctl(libc::STDOUT_FILENO, libc::TIOCGWINSZ, &raw mut ws) };
    if rc == 0 && ws.ws_col > 0 && ws.ws_row > 0 {
        Some(Size::new(ws.ws_col, ws.ws_row))
    } else {
        None
    }
}

#[cfg(not(unix))]
#[must_use]
pub fn probe_size() -> Option<Size> {
    None
}

// ─── Raw mode ────────────────────────────────────────────────────────────────

#[cfg(unix)]
fn enter_raw_mode(options: Options) -> Result<()> {
    unsafe {
        let mut termios: libc::termios = std::mem::zeroed();
        if libc::tcgetattr(libc::STDIN_FILENO, &raw mut termios) != 0 {
            return Err(Error::Termios(io::Error::last_os_error()));
        }

        if let Ok(mut guard) = TERMIOS_BACKUP.lock() {
            *guard = Some(termios);
        }

        // Local echo and line buffering off, always.
        termios.c_lflag &= !(libc::ECHO | libc::ICANON);
        // Optionally deliver INTR/SUSP characters as bytes.
        if options.contains(Options::NO_SIGNAL_DECODE) {
            termios.c_lflag &= !libc::ISIG;
        }

        if libc::tcsetattr(libc::STDIN_FILENO, libc::TCSANOW, &raw const termios) != 0 {
            return Err(Error::Termios(io::Error::last_os_error()));
        }
    }
    Ok(())
}

#[cfg(not(unix))]
fn enter_raw_mode(_options: Options) -> Result<()> {
    Ok(())
}

/// Emit the enable sequences the options ask for, in init order.
fn write_enables(options: Options) -> io::Result<()> {
    let stdout = io::stdout();
    let mut lock = stdout.lock();
    if options.contains(Options::FULLSCREEN) {
        ansi::enter_alt_screen(&mut lock)?;
    }
    if options.contains(Options::HIDE_CURSOR) {
        ansi::cursor_hide(&mut lock)?;
    }
    if options.contains(Options::MOUSE_BUTTON_EVENTS) {
        ansi::mouse_buttons_on(&mut lock)?;
    }
    if options.contains(Options::MOUSE_MOVE_EVENTS) {
        ansi::mouse_motion_on(&mut lock)?;
    }
    lock.flush()
}

// ─── Terminal ────────────────────────────────────────────────────────────────

/// Exclusive fullscreen-style ownership of the controlling terminal.
///
/// `init` acquires (raw mode, enable sequences, handlers); `restore`
/// releases. Dropping the handle restores too, as do process exit and
/// fatal signals — whichever comes first wins, the rest are no-ops.
///
/// # Example
///
/// ```no_run
/// use cellgrid::terminal::{Options, Terminal};
///
/// let term = Terminal::init(Options::FULLSCREEN | Options::HIDE_CURSOR)?;
/// // ... run the application ...
/// drop(term); // terminal restored
/// # Ok::<(), cellgrid::error::Error>(())
/// ```
#[derive(Debug)]
pub struct Terminal {
    options: Options,
    size: Size,
}

impl Terminal {
    /// Acquire the terminal.
    ///
    /// # Errors
    ///
    /// [`Error::NotATty`] when stdin is not a terminal,
    /// [`Error::AlreadyActive`] when another controller owns the process's
    /// terminal, [`Error::Termios`] / [`Error::Io`] when acquiring raw
    /// mode or writing the enable sequences fails. Partial state is
    /// rolled back before returning.
    pub fn init(options: Options) -> Result<Self> {
        if !is_tty() {
            return Err(Error::NotATty);
        }
        if ACTIVE.swap(true, Ordering::SeqCst) {
            return Err(Error::AlreadyActive);
        }

        if let Err(err) = enter_raw_mode(options) {
            // tcsetattr may have partially applied; put things back.
            restore_now();
            return Err(err);
        }
        if let Err(err) = write_enables(options) {
            restore_now();
            return Err(err.into());
        }

        install_signal_handlers(options);
        ATEXIT_INSTALLED.call_once(|| {
            #[cfg(unix)]
            unsafe {
                libc::atexit(restore_at_exit);
            }
            #[cfg(not(unix))]
            let _ = restore_at_exit;
        });

        let size = probe_size().unwrap_or(Size::new(80, 24));
        debug!(?options, width = size.width, height = size.height, "terminal acquired");

        Ok(Self { options, size })
    }

    /// The options the terminal was acquired with.
    #[inline]
    #[must_use]
    pub const fn options(&self) -> Options {
        self.options
    }

    /// The size measured at init or by the last `refresh_size`.
    #[inline]
    #[must_use]
    pub const fn size(&self) -> Size {
        self.size
    }

    /// Re-query the terminal size. Call after a window-change.
    pub fn refresh_size(&mut self) -> Size {
        if let Some(size) = probe_size() {
            self.size = size;
        }
        self.size
    }

    /// Release the terminal: disable sequences out, saved termios back.
    /// Idempotent across all exit paths.
    pub fn restore(&mut self) {
        debug!("terminal restored");
        restore_now();
    }
}

impl Drop for Terminal {
    fn drop(&mut self) {
        restore_now();
    }
}

// ─── Tests ───────────────────────────────────────────────────────────────────
