//! MI parse error type.

use thiserror::Error;

/// Longest excerpt of the offending input kept in a [`ParseError`].
const FRAGMENT_LEN: usize = 32;

/// A malformed MI value or line.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message} at offset {offset}: `{fragment}`")]
pub struct ParseError {
    /// What the parser expected or found.
    pub message: String,
    /// Byte offset into the parsed line.
    pub offset: usize,
    /// The input starting at `offset`, truncated.
    pub fragment: String,
}

impl ParseError {
    /// Build an error for `input` at byte `offset`.
    pub fn new(message: impl Into<String>, input: &str, offset: usize) -> Self {
        let rest = input.get(offset..).unwrap_or_default();
        Self {
            message: message.into(),
            offset,
            fragment: rest.chars().take(FRAGMENT_LEN).collect(),
        }
    }
}
