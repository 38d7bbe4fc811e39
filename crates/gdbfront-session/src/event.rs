//! Events published by a session and responses handed to command handlers.

use gdbfront_mi::{Breakpoint, Frame, ResultClass, Thread, Token, Value, Variable};

/// Outcome of a tracked command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResponseStatus {
    Done,
    Running,
    Connected,
    Error,
    Exit,
    /// The session ended before GDB answered.
    SessionTerminated,
}

impl From<ResultClass> for ResponseStatus {
    fn from(class: ResultClass) -> Self {
        match class {
            ResultClass::Done => Self::Done,
            ResultClass::Running => Self::Running,
            ResultClass::Connected => Self::Connected,
            ResultClass::Error => Self::Error,
            ResultClass::Exit => Self::Exit,
        }
    }
}

/// A result record delivered to the handler that requested it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Response {
    pub token: Option<Token>,
    pub status: ResponseStatus,
    pub payload: Value,
}

impl Response {
    pub(crate) fn terminated(token: Option<Token>) -> Self {
        Self {
            token,
            status: ResponseStatus::SessionTerminated,
            payload: Value::empty_tuple(),
        }
    }

    /// Whether GDB accepted the command.
    pub fn is_success(&self) -> bool {
        matches!(
            self.status,
            ResponseStatus::Done | ResponseStatus::Running | ResponseStatus::Connected
        )
    }

    /// The `msg` field of an `^error` result.
    pub fn error_message(&self) -> Option<&str> {
        match self.status {
            ResponseStatus::Error => Some(self.payload.get_str("msg").unwrap_or_default()),
            _ => None,
        }
    }
}

/// Callback invoked on the session task with the matching result.
pub type ResponseHandler = Box<dyn FnMut(&Response) + Send>;

/// Everything a session publishes, in the order it happened.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DebugEvent {
    ProcessStarted,
    ProcessTerminated {
        code: Option<i32>,
    },
    /// The debuggee started running for the first time.
    SessionStarted,
    SessionTerminated,
    GdbPrompt,
    RemoteConnected,
    Error(String),
    /// `all` or a thread id.
    Running {
        thread_id: String,
    },
    /// A stop, with the frame, thread and core applied in the same pass.
    Stopped {
        reason: String,
        frame: Frame,
        thread_id: i32,
        core: i32,
    },
    Threads {
        current: i32,
        threads: Vec<Thread>,
    },
    CurrentFrame(Frame),
    StackFrames(Vec<Frame>),
    LocalVariables(Vec<Variable>),
    BreakpointInserted(Breakpoint),
    BreakpointModified(Breakpoint),
    BreakpointRemoved(Breakpoint),
    /// Every result record, tracked or not.
    Result {
        token: Option<Token>,
        status: ResponseStatus,
        payload: Value,
    },
    Console(String),
    Target(String),
    Log(String),
    /// Parse errors, debugger stderr and echoed outgoing commands.
    Internal(String),
}

#[cfg(test)]
mod tests {
    use super::*;
    use gdbfront_mi::parse_value;

    #[test]
    fn error_message_only_for_errors() {
        let payload = parse_value(r#"{msg="No symbol \"x\" in current context."}"#).unwrap();
        let mut resp = Response {
            token: Some(4),
            status: ResponseStatus::Error,
            payload,
        };
        assert_eq!(resp.error_message(), Some("No symbol \"x\" in current context."));
        assert!(!resp.is_success());

        resp.status = ResponseStatus::Done;
        assert_eq!(resp.error_message(), None);
        assert!(resp.is_success());
    }

    #[test]
    fn terminated_response_is_empty() {
        let resp = Response::terminated(None);
        assert_eq!(resp.status, ResponseStatus::SessionTerminated);
        assert_eq!(resp.payload, Value::empty_tuple());
        assert!(!resp.is_success());
    }

    #[test]
    fn status_from_result_class() {
        assert_eq!(ResponseStatus::from(ResultClass::Connected), ResponseStatus::Connected);
        assert_eq!(ResponseStatus::from(ResultClass::Exit), ResponseStatus::Exit);
    }
}
