// SPDX-License-Identifier: MIT
//
// Keymap — the declarative byte-sequence → key table.
//
// Terminals encode special keys as site-specific escape sequences, so the
// engine does not hardcode them: it consumes a `keys.json` file, a JSON
// array of `{ "seq": ..., "key": ..., "mods": [...] }` records. Inside
// `seq`, the substring `|xNN` (two hex digits) denotes a single raw byte;
// everything else is literal.
//
// The loaded table is sorted by descending sequence length, which makes
// the decoder's first-prefix-match scan a longest-match lookup.
//
// Record validation is tolerant the way the rest of the pipeline is:
// malformed records trip a debug assertion during development and are
// skipped with a warning in release; duplicate sequences keep the first
// binding.

use std::fmt;
use std::fs;
use std::path::Path;

use serde::Deserialize;
use tracing::warn;

use crate::error::{Error, Result};

// ─── Key ─────────────────────────────────────────────────────────────────────

bitflags::bitflags! {
    /// Modifier keys attached to key and mouse events.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Hash)]
    pub struct Modifiers: u8 {
        const SHIFT = 1 << 0;
        const ALT   = 1 << 1;
        const CTRL  = 1 << 2;
    }
}

impl Modifiers {
    /// Parse a list of modifier names (`"SHIFT" | "ALT" | "CTRL"`).
    ///
    /// Unknown names are ignored with a warning.
    #[must_use]
    pub fn from_names<S: AsRef<str>>(names: &[S]) -> Self {
        let mut mods = Self::empty();
        for name in names {
            match name.as_ref() {
                "SHIFT" => mods |= Self::SHIFT,
                "ALT" => mods |= Self::ALT,
                "CTRL" => mods |= Self::CTRL,
                other => warn!(modifier = other, "unknown modifier name"),
            }
        }
        mods
    }
}

impl fmt::Display for Modifiers {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for (name, flag) in [
            ("SHIFT", Self::SHIFT),
            ("ALT", Self::ALT),
            ("CTRL", Self::CTRL),
        ] {
            if self.contains(flag) {
                if !first {
                    write!(f, "+")?;
                }
                write!(f, "{name}")?;
                first = false;
            }
        }
        Ok(())
    }
}

/// A named key. Printable text does not pass through here — it arrives as
/// `Input` events — but letter chords (e.g. Alt+A from a bound sequence)
/// do, which is what the `Letter` carrier is for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Key {
    Backspace,
    Tab,
    Enter,
    Up,
    Down,
    Right,
    Left,
    Home,
    Insert,
    Delete,
    End,
    PageUp,
    PageDown,
    Escape,
    Numpad5,
    /// F1 through F12.
    F(u8),
    /// A letter key, `'A'..='Z'`.
    Letter(char),
}

impl Key {
    /// Resolve a key name from the `keys.json` table
    /// (`BACKSPACE`, `UP`, `F1`..`F12`, `A`..`Z`, ...).
    #[must_use]
    pub fn from_name(name: &str) -> Option<Self> {
        if let Some(n) = name.strip_prefix('F') {
            if let Ok(n) = n.parse::<u8>() {
                if (1..=12).contains(&n) {
                    return Some(Self::F(n));
                }
            }
        }
        let mut chars = name.chars();
        if let (Some(c @ 'A'..='Z'), None) = (chars.next(), chars.next()) {
            // Single capital letter — but only if it isn't a key word
            // (none of the named keys is one letter long, so this is safe).
            return Some(Self::Letter(c));
        }
        match name {
            "BACKSPACE" => Some(Self::Backspace),
            "TAB" => Some(Self::Tab),
            "ENTER" => Some(Self::Enter),
            "UP" => Some(Self::Up),
            "DOWN" => Some(Self::Down),
            "RIGHT" => Some(Self::Right),
            "LEFT" => Some(Self::Left),
            "HOME" => Some(Self::Home),
            "INSERT" => Some(Self::Insert),
            "DELETE" => Some(Self::Delete),
            "END" => Some(Self::End),
            "PAGE_UP" => Some(Self::PageUp),
            "PAGE_DOWN" => Some(Self::PageDown),
            "ESCAPE" => Some(Self::Escape),
            "NUMPAD_5" => Some(Self::Numpad5),
            _ => None,
        }
    }
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Backspace => write!(f, "BACKSPACE"),
            Self::Tab => write!(f, "TAB"),
            Self::Enter => write!(f, "ENTER"),
            Self::Up => write!(f, "UP"),
            Self::Down => write!(f, "DOWN"),
            Self::Right => write!(f, "RIGHT"),
            Self::Left => write!(f, "LEFT"),
            Self::Home => write!(f, "HOME"),
            Self::Insert => write!(f, "INSERT"),
            Self::Delete => write!(f, "DELETE"),
            Self::End => write!(f, "END"),
            Self::PageUp => write!(f, "PAGE_UP"),
            Self::PageDown => write!(f, "PAGE_DOWN"),
            Self::Escape => write!(f, "ESCAPE"),
            Self::Numpad5 => write!(f, "NUMPAD_5"),
            Self::F(n) => write!(f, "F{n}"),
            Self::Letter(c) => write!(f, "{c}"),
        }
    }
}

/// Render a key with its modifiers as `CTRL+SHIFT+NAME`.
#[must_use]
pub fn key_with_modifiers(key: Key, mods: Modifiers) -> String {
    if mods.is_empty() {
        key.to_string()
    } else {
        format!("{mods}+{key}")
    }
}

// ─── KeySequence & Keymap ────────────────────────────────────────────────────

/// One binding: the raw byte sequence a terminal sends, and the key plus
/// modifiers it means.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeySequence {
    pub bytes: Vec<u8>,
    pub modifiers: Modifiers,
    pub key: Key,
}

/// Raw `keys.json` record shape, before validation.
#[derive(Debug, Deserialize)]
struct RawBinding {
    seq: String,
    key: String,
    #[serde(default)]
    mods: Vec<String>,
}

/// The loaded binding table, sorted longest sequence first.
#[derive(Debug, Clone, Default)]
pub struct Keymap {
    sequences: Vec<KeySequence>,
}

impl Keymap {
    /// An empty keymap. The decoder still handles mouse reports and UTF-8
    /// input; only named-key decoding needs bindings.
    #[must_use]
    pub fn empty() -> Self {
        Self::default()
    }

    /// Load a keymap from a `keys.json` file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read, is not valid JSON, or
    /// is not a JSON array. Individual malformed records are skipped with
    /// a warning, not an error.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let bytes = fs::read(path)?;
        Self::from_slice(&bytes)
    }

    /// Parse a keymap from raw JSON bytes.
    ///
    /// # Errors
    ///
    /// Returns an error if the input is not a JSON array.
    pub fn from_slice(bytes: &[u8]) -> Result<Self> {
        let records: Vec<serde_json::Value> = serde_json::from_slice(bytes)?;
        Ok(Self::from_records(records))
    }

    fn from_records(records: Vec<serde_json::Value>) -> Self {
        let mut sequences: Vec<KeySequence> = Vec::with_capacity(records.len());

        for record in records {
            let raw: RawBinding = match serde_json::from_value(record) {
                Ok(raw) => raw,
                Err(err) => {
                    debug_assert!(false, "malformed keymap record: {err}");
                    warn!(%err, "skipping malformed keymap record");
                    continue;
                }
            };

            let Some(key) = Key::from_name(&raw.key) else {
                debug_assert!(false, "unknown key name: {}", raw.key);
                warn!(key = %raw.key, "skipping binding with unknown key name");
                continue;
            };

            let Some(bytes) = decode_sequence(&raw.seq).filter(|b| !b.is_empty()) else {
                debug_assert!(false, "bad escape in sequence: {}", raw.seq);
                warn!(seq = %raw.seq, "skipping binding with empty or malformed sequence");
                continue;
            };

            if sequences.iter().any(|s| s.bytes == bytes) {
                warn!(seq = %raw.seq, "sequence already mapped, keeping first binding");
                continue;
            }

            sequences.push(KeySequence {
                bytes,
                modifiers: Modifiers::from_names(&raw.mods),
                key,
            });
        }

        // Longest first, so the decoder's first prefix match is the longest
        // match. The sort is stable: equal lengths keep file order.
        sequences.sort_by(|a, b| b.bytes.len().cmp(&a.bytes.len()));

        Self { sequences }
    }

    /// Number of bindings.
    #[must_use]
    pub fn len(&self) -> usize {
        self.sequences.len()
    }

    /// Whether the table has no bindings.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.sequences.is_empty()
    }

    /// The bindings, longest sequence first.
    #[must_use]
    pub fn sequences(&self) -> &[KeySequence] {
        &self.sequences
    }

    /// The first binding whose byte sequence is a prefix of `input`.
    ///
    /// Longest-first ordering makes this the longest match.
    #[must_use]
    pub fn lookup(&self, input: &[u8]) -> Option<&KeySequence> {
        self.sequences.iter().find(|s| input.starts_with(&s.bytes))
    }

    /// Whether `input` is a proper prefix of some binding — i.e. more bytes
    /// could still complete a match.
    #[must_use]
    pub fn is_partial_match(&self, input: &[u8]) -> bool {
        !input.is_empty()
            && self
                .sequences
                .iter()
                .any(|s| s.bytes.len() > input.len() && s.bytes.starts_with(input))
    }
}

/// Decode a `seq` string: every `|xHH` becomes the byte `0xHH`, everything
/// else is copied through. Returns `None` on a truncated or non-hex escape.
fn decode_sequence(seq: &str) -> Option<Vec<u8>> {
    let mut out = Vec::with_capacity(seq.len());
    let bytes = seq.as_bytes();
    let mut i = 0;

    while i < bytes.len() {
        if bytes[i] == b'|' && bytes.get(i + 1) == Some(&b'x') {
            let hi = bytes.get(i + 2).copied()?;
            let lo = bytes.get(i + 3).copied()?;
            let hex = [hi, lo];
            let hex = std::str::from_utf8(&hex).ok()?;
            out.push(u8::from_str_radix(hex, 16).ok()?);
            i += 4;
        } else {
            out.push(bytes[i]);
            i += 1;
        }
    }

    Some(out)
}

/// Convenience: load `keys.json` from the working directory, degrading to
/// an empty keymap (with a warning) when the file does not exist.
///
/// # Errors
///
/// Returns an error when the file exists but cannot be parsed.
pub fn load_default() -> Result<Keymap> {
    match Keymap::load("keys.json") {
        Ok(map) => Ok(map),
        Err(Error::Io(err)) if err.kind() == std::io::ErrorKind::NotFound => {
            warn!("keys.json not found, named keys will not decode");
            Ok(Keymap::empty())
        }
        Err(err) => Err(err),
    }
}

// ─── Tests ───────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    // ── Key names ───────────────────────────────────────────────────────

    #[test]
    fn named_keys_resolve() {
        assert_eq!(Key::from_name("BACKSPACE"), Some(Key::Backspace));
        assert_eq!(Key::from_name("PAGE_UP"), Some(Key::PageUp));
        assert_eq!(Key::from_name("NUMPAD_5"), Some(Key::Numpad5));
        assert_eq!(Key::from_name("ESCAPE"), Some(Key::Escape));
    }

    #[test]
    fn function_keys_resolve() {
        assert_eq!(Key::from_name("F1"), Some(Key::F(1)));
        assert_eq!(Key::from_name("F9"), Some(Key::F(9)));
        assert_eq!(Key::from_name("F12"), Some(Key::F(12)));
        assert_eq!(Key::from_name("F13"), None);
        assert_eq!(Key::from_name("F0"), None);
    }

    #[test]
    fn letters_resolve() {
        assert_eq!(Key::from_name("A"), Some(Key::Letter('A')));
        assert_eq!(Key::from_name("Z"), Some(Key::Letter('Z')));
        assert_eq!(Key::from_name("a"), None);
        assert_eq!(Key::from_name("AB"), None);
    }

    #[test]
    fn unknown_names_fail() {
        assert_eq!(Key::from_name("HYPER"), None);
        assert_eq!(Key::from_name(""), None);
    }

    #[test]
    fn display_round_trips_names() {
        for name in ["BACKSPACE", "TAB", "ENTER", "UP", "END", "PAGE_DOWN", "F7", "Q"] {
            let key = Key::from_name(name).unwrap();
            assert_eq!(key.to_string(), name);
        }
    }

    // ── Modifiers ───────────────────────────────────────────────────────

    #[test]
    fn modifiers_from_names() {
        let mods = Modifiers::from_names(&["SHIFT", "CTRL"]);
        assert!(mods.contains(Modifiers::SHIFT));
        assert!(mods.contains(Modifiers::CTRL));
        assert!(!mods.contains(Modifiers::ALT));
    }

    #[test]
    fn unknown_modifier_is_ignored() {
        let mods = Modifiers::from_names(&["SHIFT", "HYPER"]);
        assert_eq!(mods, Modifiers::SHIFT);
    }

    #[test]
    fn modifier_display_order() {
        let mods = Modifiers::CTRL | Modifiers::SHIFT;
        assert_eq!(mods.to_string(), "SHIFT+CTRL");
    }

    #[test]
    fn key_with_modifiers_rendering() {
        assert_eq!(key_with_modifiers(Key::Up, Modifiers::empty()), "UP");
        assert_eq!(
            key_with_modifiers(Key::Letter('C'), Modifiers::CTRL),
            "CTRL+C"
        );
    }

    // ── Escape decoding ─────────────────────────────────────────────────

    #[test]
    fn decode_plain_literal() {
        assert_eq!(decode_sequence("abc"), Some(b"abc".to_vec()));
    }

    #[test]
    fn decode_hex_escape() {
        assert_eq!(decode_sequence("|x1b[A"), Some(b"\x1b[A".to_vec()));
    }

    #[test]
    fn decode_multiple_escapes() {
        assert_eq!(decode_sequence("|x1b|x5b|x41"), Some(b"\x1b[A".to_vec()));
    }

    #[test]
    fn decode_escape_mid_string() {
        assert_eq!(decode_sequence("a|x00b"), Some(b"a\x00b".to_vec()));
    }

    #[test]
    fn decode_truncated_escape_fails() {
        assert_eq!(decode_sequence("|x1"), None);
        assert_eq!(decode_sequence("abc|x"), None);
    }

    #[test]
    fn decode_non_hex_escape_fails() {
        assert_eq!(decode_sequence("|xzz"), None);
    }

    #[test]
    fn decode_lone_pipe_is_literal() {
        assert_eq!(decode_sequence("a|b"), Some(b"a|b".to_vec()));
    }

    // ── Loading ─────────────────────────────────────────────────────────

    fn keymap(json: &str) -> Keymap {
        Keymap::from_slice(json.as_bytes()).unwrap()
    }

    #[test]
    fn load_simple_table() {
        let map = keymap(
            r#"[
                { "seq": "|x1b[A", "key": "UP" },
                { "seq": "|x1b[B", "key": "DOWN" },
                { "seq": "|x1b[1;5C", "key": "RIGHT", "mods": ["CTRL"] }
            ]"#,
        );
        assert_eq!(map.len(), 3);

        let up = map.lookup(b"\x1b[A").unwrap();
        assert_eq!(up.key, Key::Up);
        assert!(up.modifiers.is_empty());

        let ctrl_right = map.lookup(b"\x1b[1;5C").unwrap();
        assert_eq!(ctrl_right.key, Key::Right);
        assert_eq!(ctrl_right.modifiers, Modifiers::CTRL);
    }

    #[test]
    fn table_is_sorted_longest_first() {
        let map = keymap(
            r#"[
                { "seq": "|x1b", "key": "ESCAPE" },
                { "seq": "|x1b[1;5C", "key": "RIGHT", "mods": ["CTRL"] },
                { "seq": "|x1b[C", "key": "RIGHT" }
            ]"#,
        );
        let lengths: Vec<usize> = map.sequences().iter().map(|s| s.bytes.len()).collect();
        assert_eq!(lengths, vec![7, 3, 1]);
    }

    #[test]
    fn longest_match_wins() {
        let map = keymap(
            r#"[
                { "seq": "|x1b", "key": "ESCAPE" },
                { "seq": "|x1b[C", "key": "RIGHT" }
            ]"#,
        );
        // Both sequences are prefixes of this input; the longer one wins.
        let hit = map.lookup(b"\x1b[Cxyz").unwrap();
        assert_eq!(hit.key, Key::Right);

        // A lone ESC still resolves to ESCAPE.
        let esc = map.lookup(b"\x1b").unwrap();
        assert_eq!(esc.key, Key::Escape);
    }

    #[test]
    fn duplicate_sequence_keeps_first() {
        let map = keymap(
            r#"[
                { "seq": "|x1b[A", "key": "UP" },
                { "seq": "|x1b[A", "key": "DOWN" }
            ]"#,
        );
        assert_eq!(map.len(), 1);
        assert_eq!(map.lookup(b"\x1b[A").unwrap().key, Key::Up);
    }

    #[test]
    #[cfg_attr(debug_assertions, should_panic(expected = "malformed keymap record"))]
    fn missing_field_is_rejected() {
        // Release builds skip the record; debug builds assert.
        let map = keymap(r#"[ { "key": "UP" } ]"#);
        assert!(map.is_empty());
    }

    #[test]
    #[cfg_attr(debug_assertions, should_panic(expected = "unknown key name"))]
    fn unknown_key_name_is_rejected() {
        let map = keymap(r#"[ { "seq": "x", "key": "WHAT" } ]"#);
        assert!(map.is_empty());
    }

    #[test]
    fn not_an_array_is_an_error() {
        assert!(Keymap::from_slice(b"{}").is_err());
        assert!(Keymap::from_slice(b"not json").is_err());
    }

    // ── Prefix queries ──────────────────────────────────────────────────

    #[test]
    fn partial_match_detection() {
        let map = keymap(r#"[ { "seq": "|x1b[A", "key": "UP" } ]"#);
        assert!(map.is_partial_match(b"\x1b"));
        assert!(map.is_partial_match(b"\x1b["));
        assert!(!map.is_partial_match(b"\x1b[A")); // complete, not partial
        assert!(!map.is_partial_match(b"q"));
        assert!(!map.is_partial_match(b""));
    }

    #[test]
    fn lookup_misses_cleanly() {
        let map = keymap(r#"[ { "seq": "|x1b[A", "key": "UP" } ]"#);
        assert!(map.lookup(b"\x1b[B").is_none());
        assert!(map.lookup(b"").is_none());
    }
}
