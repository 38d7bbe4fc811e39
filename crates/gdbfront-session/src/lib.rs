//! gdbfront-session — running a GDB/MI session.
//!
//! The [`Session`] state machine consumes debugger output lines and keeps
//! the breakpoint, thread and frame model. [`DebugManager`] owns a
//! [`Session`] and a [`DebuggerProcess`] on a background task and
//! publishes [`DebugEvent`]s to subscribers.

pub mod correlator;
pub mod error;
pub mod event;
pub mod manager;
pub mod session;
pub mod transport;

pub use correlator::{Correlator, Pending, Retention};
pub use error::SessionError;
pub use event::{DebugEvent, Response, ResponseHandler, ResponseStatus};
pub use manager::DebugManager;
pub use session::{ExecCommand, Session, SessionSnapshot, SessionState};
pub use transport::{DebuggerProcess, LineBuffer, TransportEvent};
