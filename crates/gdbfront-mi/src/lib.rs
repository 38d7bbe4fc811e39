//! gdbfront-mi — GDB Machine Interface output model.
//!
//! This crate parses MI output lines into classified records, decodes
//! their payloads into a generic [`Value`] tree, and projects values into
//! typed debugger objects (frames, breakpoints, threads, variables).

pub mod error;
pub mod record;
pub mod types;
pub mod value;

// Re-export key types for convenience.
pub use error::ParseError;
pub use record::{parse_line, AsyncClass, Record, ResultClass, Token};
pub use types::{Breakpoint, BreakpointLocation, Disposition, Frame, Thread, ThreadState, Variable};
pub use value::{parse_results, parse_value, unescape_c_string, Tuple, Value};
