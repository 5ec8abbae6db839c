// SPDX-License-Identifier: MIT
//
// Crate error type.

use std::io;

/// Everything that can go wrong while acquiring the terminal or loading
/// configuration. Decode problems are not errors — the decoder logs and
/// drops, per the input contract.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Standard input is not a terminal; the engine refuses to start.
    #[error("standard input is not a TTY")]
    NotATty,

    /// Another controller already owns the terminal in this process.
    #[error("a terminal controller is already active in this process")]
    AlreadyActive,

    /// Reading or applying termios attributes failed.
    #[error("terminal attributes: {0}")]
    Termios(#[source] io::Error),

    /// Keymap file is not a well-formed JSON array.
    #[error("keymap: {0}")]
    Keymap(#[from] serde_json::Error),

    #[error(transparent)]
    Io(#[from] io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;

// ─── Tests ───────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn io_errors_convert() {
        let err: Error = io::Error::new(io::ErrorKind::NotFound, "gone").into();
        assert!(matches!(err, Error::Io(_)));
    }

    #[test]
    fn messages_are_human_readable() {
        assert_eq!(Error::NotATty.to_string(), "standard input is not a TTY");
        assert!(Error::AlreadyActive.to_string().contains("already active"));
    }
}
