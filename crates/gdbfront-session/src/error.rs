//! Session error types.

use gdbfront_mi::Token;
use thiserror::Error;

/// Errors from session operations.
///
/// A command that reaches GDB and fails there is not an error value: its
/// handler receives a [`Response`](crate::Response) with an error status.
#[derive(Debug, Error)]
pub enum SessionError {
    /// The debugger process has not been started or has already exited.
    #[error("debugger is not running")]
    NotRunning,

    /// The session has ended; no further commands are accepted.
    #[error("session terminated")]
    SessionTerminated,

    /// The debugger binary could not be launched.
    #[error("failed to start debugger: {0}")]
    ProcessSpawnFailure(#[source] std::io::Error),

    /// A local or remote launch was already issued in this session.
    #[error("session already launched")]
    AlreadyLaunched,

    /// Only one untokened tracked command may be outstanding.
    #[error("an untokened tracked command is already pending")]
    UntokenedBusy,

    /// A fixed token was registered while a command with it is pending.
    #[error("token {0} is already pending")]
    TokenInUse(Token),

    /// A fixed token outside the reserved range below the token base.
    #[error("token {token} is not below the token base {base}")]
    InvalidToken {
        /// The rejected token.
        token: Token,
        /// First token handed out by the counter.
        base: Token,
    },

    /// Communication with the debugger process failed.
    #[error("transport error: {0}")]
    Transport(String),

    /// An I/O error outside process spawning.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
