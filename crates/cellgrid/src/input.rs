// SPDX-License-Identifier: MIT
#![allow(unsafe_code)]
//
// Input decoder — raw stdin bytes in, typed events out.
//
// The terminal delivers bytes in arbitrary chunks: a mouse report may
// arrive whole, a UTF-8 character may arrive split, two keypresses may
// arrive glued together. The decoder owns a pending byte queue and a pure
// `decode` function over it; whatever a parse consumes is drained, and the
// unconsumed remainder stays queued, in order, for the next call.
//
// `wait()` adds the blocking part: a signal-interruptible `ppoll` on
// stdin, then a single `read(2)` of whatever is available. A signal
// arriving mid-wait returns "no event" so the caller can look at its
// flags (pending resize, quit) before trying again.
//
// Parse precedence per chunk: SGR mouse report, then the keymap table
// (longest sequence first), then one UTF-8 scalar. A recognizable prefix
// of any of these keeps its bytes queued; bytes nothing can ever parse
// are logged and dropped. A complete keymap binding always beats a
// speculative wait: a lone ESC with an ESCAPE binding resolves now, it
// does not stall on the chance of becoming a mouse report.

use tracing::warn;

use crate::error::Result;
use crate::event::{
    Event, InputEvent, KeyEvent, MouseButtonEvent, MouseMoveEvent, MouseWheelEvent,
};
use crate::keymap::{Keymap, Modifiers};

/// `ESC [ <` — the SGR 1006 mouse report introducer.
const MOUSE_PREFIX: &[u8] = b"\x1b[<";

/// Shortest complete mouse report: `ESC [ < b ; c ; r M`.
const MOUSE_MIN_LEN: usize = 9;

/// Longest parameter run we accept after the mouse prefix before giving up.
const MOUSE_MAX_PARAMS: usize = 16;

/// One `read(2)` worth of input. A keypress is 1-6 bytes; this leaves
/// plenty of headroom for bursts.
const READ_BUF_SIZE: usize = 4096;

// ─── Decode result ───────────────────────────────────────────────────────────

/// Outcome of one decode attempt over the pending bytes.
#[derive(Debug, PartialEq, Eq)]
pub enum Decoded {
    /// A complete event, consuming the given number of leading bytes.
    Event(Event, usize),
    /// A recognizable prefix; more bytes may complete it. Nothing consumed.
    Incomplete,
    /// The leading bytes can never parse. The caller drops the buffer.
    Failed,
}

// ─── Pure decoding ───────────────────────────────────────────────────────────

/// Try to decode one event from the front of `buf`.
///
/// Pure: no I/O, no state. `wait()` wraps this with the byte queue; tests
/// drive it directly with crafted chunks.
#[must_use]
pub fn decode(buf: &[u8], keymap: &Keymap) -> Decoded {
    if buf.is_empty() {
        return Decoded::Incomplete;
    }

    // ── SGR mouse report ────────────────────────────────────────────
    if buf.starts_with(MOUSE_PREFIX) {
        if buf.len() < MOUSE_MIN_LEN {
            return Decoded::Incomplete;
        }
        return decode_mouse(buf);
    }

    // ── Keymap sequences, longest first ─────────────────────────────
    if let Some(seq) = keymap.lookup(buf) {
        let event = Event::Key(KeyEvent {
            key: seq.key,
            modifiers: seq.modifiers,
        });
        return Decoded::Event(event, seq.bytes.len());
    }

    // No complete binding decides these bytes. A strict prefix of the
    // mouse introducer might still become a report, and a strict prefix
    // of a longer binding might still complete; both wait for more.
    if buf.len() < MOUSE_PREFIX.len() && MOUSE_PREFIX.starts_with(buf) {
        return Decoded::Incomplete;
    }
    if keymap.is_partial_match(buf) {
        return Decoded::Incomplete;
    }

    // ── One UTF-8 scalar ────────────────────────────────────────────
    decode_utf8(buf)
}

/// Decode `ESC [ < b ; c ; r (M|m)`.
///
/// `b` carries the button index in its low bits plus modifier, motion,
/// wheel and high-button flags; `c`/`r` are 1-based column and row. The
/// terminator distinguishes press (`M`) from release (`m`).
fn decode_mouse(buf: &[u8]) -> Decoded {
    let params = &buf[MOUSE_PREFIX.len()..];

    // Scan for the terminator; only digits and ';' may precede it.
    let mut end = 0;
    loop {
        if end >= params.len() {
            return if end > MOUSE_MAX_PARAMS {
                Decoded::Failed
            } else {
                Decoded::Incomplete
            };
        }
        let b = params[end];
        if b == b'M' || b == b'm' {
            break;
        }
        if !b.is_ascii_digit() && b != b';' || end > MOUSE_MAX_PARAMS {
            return Decoded::Failed;
        }
        end += 1;
    }

    let pressed = params[end] == b'M';
    let consumed = MOUSE_PREFIX.len() + end + 1;

    let mut fields = params[..end].split(|&b| b == b';');
    let (Some(cb), Some(col), Some(row)) = (
        fields.next().and_then(parse_u16),
        fields.next().and_then(parse_u16),
        fields.next().and_then(parse_u16),
    ) else {
        return Decoded::Failed;
    };
    if fields.next().is_some() {
        return Decoded::Failed;
    }

    // Coordinates on the wire are 1-based.
    let x = col.saturating_sub(1);
    let y = row.saturating_sub(1);

    let mut modifiers = Modifiers::empty();
    if cb & 0x04 != 0 {
        modifiers |= Modifiers::SHIFT;
    }
    if cb & 0x08 != 0 {
        modifiers |= Modifiers::ALT;
    }
    if cb & 0x10 != 0 {
        modifiers |= Modifiers::CTRL;
    }

    let event = if cb & 0x20 != 0 {
        // Motion: no button state change.
        Event::MouseMove(MouseMoveEvent { x, y, modifiers })
    } else if cb & 0x80 != 0 {
        // High buttons: low bits add to 5.
        #[allow(clippy::cast_possible_truncation)]
        let button = (cb & 0x03) as u8 + 5;
        Event::MouseButton(MouseButtonEvent { button, pressed, x, y, modifiers })
    } else if cb & 0x40 != 0 {
        // Wheel: low bit picks the direction.
        let delta = if cb & 0x01 == 0 { 1 } else { -1 };
        Event::MouseWheel(MouseWheelEvent { delta, x, y, modifiers })
    } else {
        #[allow(clippy::cast_possible_truncation)]
        let button = (cb & 0x03) as u8;
        Event::MouseButton(MouseButtonEvent { button, pressed, x, y, modifiers })
    };

    Decoded::Event(event, consumed)
}

/// Decode one UTF-8 scalar from the front of `buf`.
fn decode_utf8(buf: &[u8]) -> Decoded {
    let len = utf8_len(buf[0]);
    if len == 0 {
        // Continuation byte in lead position, or 0xF8..0xFF.
        return Decoded::Failed;
    }
    if buf.len() < len {
        return Decoded::Incomplete;
    }

    match std::str::from_utf8(&buf[..len]) {
        Ok(s) => {
            let Some(codepoint) = s.chars().next() else {
                return Decoded::Failed;
            };
            Decoded::Event(Event::Input(InputEvent { codepoint }), len)
        }
        Err(_) => Decoded::Failed,
    }
}

/// Expected byte length of a UTF-8 character from its lead byte.
/// Returns 0 for invalid lead bytes.
const fn utf8_len(lead: u8) -> usize {
    match lead {
        0x00..=0x7F => 1,
        0xC0..=0xDF => 2,
        0xE0..=0xEF => 3,
        0xF0..=0xF7 => 4,
        _ => 0,
    }
}

/// Parse an unsigned decimal field, rejecting empty and non-digit input.
fn parse_u16(field: &[u8]) -> Option<u16> {
    if field.is_empty() {
        return None;
    }
    let mut val: u16 = 0;
    for &b in field {
        if !b.is_ascii_digit() {
            return None;
        }
        val = val.saturating_mul(10).saturating_add(u16::from(b - b'0'));
    }
    Some(val)
}

// ─── Input ───────────────────────────────────────────────────────────────────

/// The blocking decoder over standard input.
///
/// Owns the pending byte queue and the keymap table. `wait()` blocks until
/// stdin is readable (or a signal interrupts), reads one chunk, and decodes
/// at most one event per call.
pub struct Input {
    keymap: Keymap,
    pending: Vec<u8>,
    eof: bool,
}

impl Input {
    #[must_use]
    pub fn new(keymap: Keymap) -> Self {
        Self {
            keymap,
            pending: Vec::with_capacity(64),
            eof: false,
        }
    }

    /// The binding table in use.
    #[must_use]
    pub fn keymap(&self) -> &Keymap {
        &self.keymap
    }

    /// Whether stdin has reached end of file. Once set it stays set; the
    /// event loop exits when it sees this.
    #[inline]
    #[must_use]
    pub const fn is_eof(&self) -> bool {
        self.eof
    }

    /// Append bytes to the pending queue as if they had been read from the
    /// terminal. Exists for tests and for hosts that multiplex stdin.
    pub fn push_bytes(&mut self, bytes: &[u8]) {
        self.pending.extend_from_slice(bytes);
    }

    /// Bytes queued but not yet consumed by a parse.
    #[must_use]
    pub fn pending(&self) -> &[u8] {
        &self.pending
    }

    /// Block until an event can be produced, a signal interrupts the wait,
    /// or stdin hits EOF. Returns `Ok(None)` for the latter two so the
    /// loop can observe its flags.
    ///
    /// # Errors
    ///
    /// Returns an error when polling or reading stdin fails for a reason
    /// other than signal interruption.
    pub fn wait(&mut self) -> Result<Option<Event>> {
        // Whatever is already queued may hold a complete event.
        if let Some(event) = self.poll_event() {
            return Ok(Some(event));
        }

        // Nothing complete buffered: wait for readability, interruptibly.
        if !poll_readable()? {
            return Ok(None);
        }
        if !self.fill()? {
            return Ok(None);
        }

        Ok(self.poll_event())
    }

    /// Run one decode over the queue without touching stdin, draining
    /// whatever the parse consumed. Undecodable leading bytes are logged
    /// and dropped. This is `wait()` minus the blocking part.
    pub fn poll_event(&mut self) -> Option<Event> {
        match decode(&self.pending, &self.keymap) {
            Decoded::Event(event, consumed) => {
                self.pending.drain(..consumed);
                Some(event)
            }
            Decoded::Incomplete => None,
            Decoded::Failed => {
                warn!(buffer = %printable(&self.pending), "undecodable input dropped");
                self.pending.clear();
                None
            }
        }
    }

    /// One `read(2)` of whatever stdin has. Returns false on EOF or
    /// signal interruption.
    #[cfg(unix)]
    fn fill(&mut self) -> Result<bool> {
        let mut buf = [0u8; READ_BUF_SIZE];
        let n = unsafe {
            libc::read(libc::STDIN_FILENO, buf.as_mut_ptr().cast(), buf.len())
        };
        if n < 0 {
            let err = std::io::Error::last_os_error();
            if err.raw_os_error() == Some(libc::EINTR) {
                return Ok(false);
            }
            return Err(err.into());
        }
        if n == 0 {
            self.eof = true;
            return Ok(false);
        }
        #[allow(clippy::cast_sign_loss)] // n > 0 checked above.
        self.pending.extend_from_slice(&buf[..n as usize]);
        Ok(true)
    }

    #[cfg(not(unix))]
    fn fill(&mut self) -> Result<bool> {
        use std::io::Read;
        let mut buf = [0u8; READ_BUF_SIZE];
        let n = std::io::stdin().lock().read(&mut buf)?;
        if n == 0 {
            self.eof = true;
            return Ok(false);
        }
        self.pending.extend_from_slice(&buf[..n]);
        Ok(true)
    }
}

/// Wait for stdin to become readable with no timeout, letting any signal
/// interrupt the wait. Returns false when interrupted.
#[cfg(unix)]
fn poll_readable() -> std::io::Result<bool> {
    let mut pfd = libc::pollfd {
        fd: libc::STDIN_FILENO,
        events: libc::POLLIN,
        revents: 0,
    };
    // An empty signal mask: every signal may interrupt the wait. The
    // resize flag depends on this.
    let mut sigs: libc::sigset_t = unsafe { std::mem::zeroed() };
    unsafe {
        libc::sigemptyset(&raw mut sigs);
    }

    let rc = unsafe { libc::ppoll(&raw mut pfd, 1, std::ptr::null(), &raw const sigs) };
    if rc < 0 {
        let err = std::io::Error::last_os_error();
        if err.raw_os_error() == Some(libc::EINTR) {
            return Ok(false);
        }
        return Err(err);
    }
    Ok(rc > 0)
}

#[cfg(not(unix))]
fn poll_readable() -> std::io::Result<bool> {
    Ok(true)
}

/// Escape-visible rendering of a byte buffer for the diagnostic channel.
fn printable(bytes: &[u8]) -> String {
    let mut out = String::with_capacity(bytes.len() * 2);
    for &b in bytes {
        match b {
            0x1b => out.push_str("\\e"),
            b'\n' => out.push_str("\\n"),
            b'\r' => out.push_str("\\r"),
            0x20..=0x7E => out.push(b as char),
            _ => out.push_str(&format!("\\x{b:02x}")),
        }
    }
    out
}

// ─── Tests ───────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::keymap::Key;

    fn arrows() -> Keymap {
        Keymap::from_slice(
            br#"[
                { "seq": "|x1b[A", "key": "UP" },
                { "seq": "|x1b[B", "key": "DOWN" },
                { "seq": "|x1b[1;5C", "key": "RIGHT", "mods": ["CTRL"] },
                { "seq": "|x1b", "key": "ESCAPE" }
            ]"#,
        )
        .unwrap()
    }

    fn decode_one(buf: &[u8]) -> (Event, usize) {
        match decode(buf, &arrows()) {
            Decoded::Event(ev, n) => (ev, n),
            other => panic!("expected event for {buf:?}, got {other:?}"),
        }
    }

    // ── Plain input ─────────────────────────────────────────────────────

    #[test]
    fn ascii_byte_is_input() {
        let (ev, n) = decode_one(b"\x41");
        assert_eq!(ev, Event::Input(InputEvent { codepoint: 'A' }));
        assert_eq!(n, 1);
    }

    #[test]
    fn snowman_is_one_scalar() {
        let (ev, n) = decode_one(&[0xE2, 0x98, 0x83]);
        assert_eq!(ev, Event::Input(InputEvent { codepoint: '\u{2603}' }));
        assert_eq!(n, 3);
    }

    #[test]
    fn four_byte_scalar() {
        let (ev, n) = decode_one("🦀".as_bytes());
        assert_eq!(ev, Event::Input(InputEvent { codepoint: '🦀' }));
        assert_eq!(n, 4);
    }

    #[test]
    fn split_utf8_waits_for_more() {
        assert_eq!(decode(&[0xE2], &arrows()), Decoded::Incomplete);
        assert_eq!(decode(&[0xE2, 0x98], &arrows()), Decoded::Incomplete);
    }

    #[test]
    fn bare_continuation_byte_fails() {
        assert_eq!(decode(&[0x98], &arrows()), Decoded::Failed);
    }

    #[test]
    fn truncated_overlong_lead_fails() {
        assert_eq!(decode(&[0xFF], &arrows()), Decoded::Failed);
        // Lead byte promises 3 bytes, continuations are invalid.
        assert_eq!(decode(&[0xE2, 0x41, 0x41], &arrows()), Decoded::Failed);
    }

    #[test]
    fn empty_buffer_is_incomplete() {
        assert_eq!(decode(b"", &arrows()), Decoded::Incomplete);
    }

    // ── Keymap sequences ────────────────────────────────────────────────

    #[test]
    fn arrow_up_decodes_as_key() {
        let (ev, n) = decode_one(b"\x1b[A");
        assert_eq!(
            ev,
            Event::Key(KeyEvent { key: Key::Up, modifiers: Modifiers::empty() })
        );
        assert_eq!(n, 3);
    }

    #[test]
    fn modified_sequence_carries_modifiers() {
        let (ev, n) = decode_one(b"\x1b[1;5C");
        assert_eq!(
            ev,
            Event::Key(KeyEvent { key: Key::Right, modifiers: Modifiers::CTRL })
        );
        assert_eq!(n, 6);
    }

    #[test]
    fn longest_match_beats_escape_binding() {
        // "\x1b" is bound (ESCAPE) and is a prefix of "\x1b[A" (UP).
        // The longest-first table picks UP.
        let (ev, _) = decode_one(b"\x1b[A");
        assert_eq!(
            ev,
            Event::Key(KeyEvent { key: Key::Up, modifiers: Modifiers::empty() })
        );
    }

    #[test]
    fn lone_escape_still_resolves() {
        let (ev, n) = decode_one(b"\x1b");
        assert_eq!(
            ev,
            Event::Key(KeyEvent { key: Key::Escape, modifiers: Modifiers::empty() })
        );
        assert_eq!(n, 1);
    }

    #[test]
    fn escape_binding_beats_mouse_prefix_wait() {
        // "\x1b[" is a strict prefix of the mouse introducer, but the
        // ESCAPE binding is a complete match and must win; the '[' stays
        // queued as ordinary input.
        let (ev, n) = decode_one(b"\x1b[");
        assert_eq!(
            ev,
            Event::Key(KeyEvent { key: Key::Escape, modifiers: Modifiers::empty() })
        );
        assert_eq!(n, 1);
    }

    #[test]
    fn partial_sequence_waits_without_escape_binding() {
        // No one-byte ESC binding here, so "\x1b[" can only be a prefix.
        let map = Keymap::from_slice(br#"[ { "seq": "|x1b[A", "key": "UP" } ]"#).unwrap();
        assert_eq!(decode(b"\x1b[", &map), Decoded::Incomplete);
    }

    #[test]
    fn trailing_bytes_are_not_consumed() {
        let (_, n) = decode_one(b"\x1b[Axyz");
        assert_eq!(n, 3); // "xyz" stays for the next decode
    }

    // ── Mouse reports ───────────────────────────────────────────────────

    #[test]
    fn left_button_press() {
        let (ev, n) = decode_one(b"\x1b[<0;10;5M");
        assert_eq!(
            ev,
            Event::MouseButton(MouseButtonEvent {
                button: 0,
                pressed: true,
                x: 9,
                y: 4,
                modifiers: Modifiers::empty(),
            })
        );
        assert_eq!(n, 10);
    }

    #[test]
    fn left_button_release() {
        let (ev, _) = decode_one(b"\x1b[<0;10;5m");
        assert_eq!(
            ev,
            Event::MouseButton(MouseButtonEvent {
                button: 0,
                pressed: false,
                x: 9,
                y: 4,
                modifiers: Modifiers::empty(),
            })
        );
    }

    #[test]
    fn middle_and_right_buttons() {
        let (ev, _) = decode_one(b"\x1b[<1;1;1M");
        assert!(matches!(ev, Event::MouseButton(MouseButtonEvent { button: 1, .. })));
        let (ev, _) = decode_one(b"\x1b[<2;1;1M");
        assert!(matches!(ev, Event::MouseButton(MouseButtonEvent { button: 2, .. })));
    }

    #[test]
    fn wheel_up_and_down() {
        let (ev, _) = decode_one(b"\x1b[<64;10;5M");
        assert_eq!(
            ev,
            Event::MouseWheel(MouseWheelEvent {
                delta: 1,
                x: 9,
                y: 4,
                modifiers: Modifiers::empty(),
            })
        );

        let (ev, _) = decode_one(b"\x1b[<65;10;5M");
        assert!(matches!(ev, Event::MouseWheel(MouseWheelEvent { delta: -1, .. })));
    }

    #[test]
    fn motion_is_a_move_event() {
        let (ev, _) = decode_one(b"\x1b[<35;15;25M");
        assert_eq!(
            ev,
            Event::MouseMove(MouseMoveEvent { x: 14, y: 24, modifiers: Modifiers::empty() })
        );
    }

    #[test]
    fn high_buttons_add_to_five() {
        let (ev, _) = decode_one(b"\x1b[<128;1;1M");
        assert!(matches!(ev, Event::MouseButton(MouseButtonEvent { button: 5, .. })));
        let (ev, _) = decode_one(b"\x1b[<130;1;1M");
        assert!(matches!(ev, Event::MouseButton(MouseButtonEvent { button: 7, .. })));
    }

    #[test]
    fn mouse_modifier_bits() {
        let (ev, _) = decode_one(b"\x1b[<4;2;2M");
        assert!(matches!(
            ev,
            Event::MouseButton(MouseButtonEvent { modifiers, .. }) if modifiers == Modifiers::SHIFT
        ));
        let (ev, _) = decode_one(b"\x1b[<24;2;2M");
        assert!(matches!(
            ev,
            Event::MouseButton(MouseButtonEvent { modifiers, .. })
                if modifiers == Modifiers::ALT | Modifiers::CTRL
        ));
    }

    #[test]
    fn large_coordinates() {
        let (ev, _) = decode_one(b"\x1b[<0;300;150M");
        assert!(matches!(
            ev,
            Event::MouseButton(MouseButtonEvent { x: 299, y: 149, .. })
        ));
    }

    #[test]
    fn short_mouse_chunk_waits() {
        assert_eq!(decode(b"\x1b[<0;1", &arrows()), Decoded::Incomplete);
        assert_eq!(decode(b"\x1b[<", &arrows()), Decoded::Incomplete);
    }

    #[test]
    fn garbage_in_mouse_params_fails() {
        assert_eq!(decode(b"\x1b[<0;x;10M", &arrows()), Decoded::Failed);
    }

    #[test]
    fn missing_mouse_field_fails() {
        assert_eq!(decode(b"\x1b[<0;10000M", &arrows()), Decoded::Failed);
    }

    #[test]
    fn runaway_mouse_params_fail() {
        assert_eq!(
            decode(b"\x1b[<111111111111111111;1;1M", &arrows()),
            Decoded::Failed
        );
    }

    // ── Byte conservation through Input ─────────────────────────────────

    #[test]
    fn unconsumed_bytes_stay_in_order() {
        let mut input = Input::new(arrows());
        input.push_bytes(b"\x1b[Aab");

        assert!(matches!(input.poll_event(), Some(Event::Key(_))));
        assert_eq!(input.pending(), b"ab");

        assert_eq!(
            input.poll_event(),
            Some(Event::Input(InputEvent { codepoint: 'a' }))
        );
        assert_eq!(
            input.poll_event(),
            Some(Event::Input(InputEvent { codepoint: 'b' }))
        );
        assert_eq!(input.poll_event(), None);
    }

    #[test]
    fn failed_decode_drops_buffer() {
        let mut input = Input::new(arrows());
        input.push_bytes(&[0x90, 0x91]);
        assert_eq!(input.poll_event(), None);
        assert!(input.pending().is_empty());
    }

    #[test]
    fn split_sequence_reassembles() {
        let mut input = Input::new(arrows());
        input.push_bytes(&[0xE2]);
        assert_eq!(input.poll_event(), None);
        assert_eq!(input.pending(), &[0xE2]);

        input.push_bytes(&[0x98, 0x83]);
        assert_eq!(
            input.poll_event(),
            Some(Event::Input(InputEvent { codepoint: '\u{2603}' }))
        );
    }

    #[test]
    fn eof_starts_false() {
        let input = Input::new(Keymap::empty());
        assert!(!input.is_eof());
    }

    // ── Diagnostics ─────────────────────────────────────────────────────

    #[test]
    fn printable_escapes_control_bytes() {
        assert_eq!(printable(b"\x1b[A"), "\\e[A");
        assert_eq!(printable(b"ab\ncd"), "ab\\ncd");
        assert_eq!(printable(&[0x01]), "\\x01");
    }
}
