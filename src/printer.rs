//! Terminal rendering of session events.

use gdbfront_mi::{Breakpoint, Frame, Thread, ThreadState, Variable};
use gdbfront_session::{DebugEvent, ResponseStatus, SessionSnapshot};

/// Render an event for the terminal, or `None` when it is not shown.
///
/// Prompts and command echoes only go to the log.
pub fn format_event(event: &DebugEvent) -> Option<String> {
    let text = match event {
        DebugEvent::ProcessStarted => "[debugger started]".to_string(),
        DebugEvent::ProcessTerminated { code: Some(code) } => format!("[debugger exited with {code}]"),
        DebugEvent::ProcessTerminated { code: None } => "[debugger killed]".to_string(),
        DebugEvent::SessionStarted => "[program started]".to_string(),
        DebugEvent::SessionTerminated => "[session ended]".to_string(),
        DebugEvent::RemoteConnected => "[connected to remote target]".to_string(),
        DebugEvent::Error(msg) => format!("error: {msg}"),
        DebugEvent::Running { thread_id } => format!("[running: thread {thread_id}]"),
        DebugEvent::Stopped { reason, frame, thread_id, .. } => {
            format!("[stopped: {reason}, thread {thread_id}] {}", frame_line(frame))
        }
        DebugEvent::Threads { current, threads } => threads
            .iter()
            .map(|t| thread_line(t, *current))
            .collect::<Vec<_>>()
            .join("\n"),
        DebugEvent::StackFrames(frames) => frames.iter().map(frame_line).collect::<Vec<_>>().join("\n"),
        DebugEvent::LocalVariables(vars) => vars.iter().map(variable_line).collect::<Vec<_>>().join("\n"),
        DebugEvent::BreakpointInserted(bp) => format!("breakpoint set: {}", breakpoint_line(bp)),
        DebugEvent::BreakpointModified(bp) => format!("breakpoint changed: {}", breakpoint_line(bp)),
        DebugEvent::BreakpointRemoved(bp) => format!("breakpoint removed: {}", bp.number),
        DebugEvent::Result { token, status: ResponseStatus::Done, payload } => {
            if payload.as_tuple().map_or(true, |t| t.is_empty()) {
                return None;
            }
            match token {
                Some(token) => format!("{token}: {payload}"),
                None => payload.to_string(),
            }
        }
        DebugEvent::Console(text) | DebugEvent::Target(text) | DebugEvent::Log(text) => {
            text.trim_end_matches('\n').to_string()
        }
        DebugEvent::GdbPrompt
        | DebugEvent::CurrentFrame(_)
        | DebugEvent::Result { .. }
        | DebugEvent::Internal(_) => return None,
    };
    Some(text)
}

/// Multi-line summary for the `info` command.
pub fn format_snapshot(snap: &SessionSnapshot) -> String {
    let mut out = format!("state: {:?}", snap.state);
    if snap.is_remote {
        out.push_str(" (remote)");
    }
    out.push_str(&format!("\npending commands: {}", snap.pending_commands));
    if snap.current_thread > 0 {
        out.push_str(&format!(
            "\nthread {} at {}",
            snap.current_thread,
            frame_line(&snap.current_frame)
        ));
    }
    for bp in &snap.breakpoints {
        out.push_str(&format!("\nbreakpoint {}", breakpoint_line(bp)));
    }
    out
}

fn frame_line(frame: &Frame) -> String {
    let args = frame
        .params
        .iter()
        .map(|(name, value)| format!("{name}={value}"))
        .collect::<Vec<_>>()
        .join(", ");
    let mut line = format!("#{} {}({})", frame.level, frame.function, args);
    if !frame.file.is_empty() {
        line.push_str(&format!(" at {}:{}", frame.file, frame.line));
    } else if frame.address != 0 {
        line.push_str(&format!(" at {:#x}", frame.address));
    }
    line
}

fn thread_line(thread: &Thread, current: i32) -> String {
    let marker = if thread.id == current { '*' } else { ' ' };
    let state = match thread.state {
        ThreadState::Stopped => "stopped",
        ThreadState::Running => "running",
        ThreadState::Unknown => "unknown",
    };
    format!("{marker} {} {} [{state}] {}", thread.id, thread.target_id, frame_line(&thread.frame))
}

fn variable_line(var: &Variable) -> String {
    if var.type_name.is_empty() {
        format!("{} = {}", var.name, var.value)
    } else {
        format!("{} {} = {}", var.type_name, var.name, var.value)
    }
}

fn breakpoint_line(bp: &Breakpoint) -> String {
    let enabled = if bp.enabled { "" } else { " (disabled)" };
    let place = if !bp.locations.is_empty() {
        format!("{} locations", bp.locations.len())
    } else if bp.file.is_empty() {
        bp.original_location.clone()
    } else {
        format!("{}:{}", bp.file, bp.line)
    };
    format!("{} in {} at {}, hits {}{enabled}", bp.number, bp.function, place, bp.hit_count)
}

#[cfg(test)]
mod tests {
    use super::*;
    use gdbfront_mi::{parse_value, Value};

    fn frame() -> Frame {
        Frame {
            level: 0,
            function: "main".into(),
            file: "a.c".into(),
            line: 10,
            ..Default::default()
        }
    }

    #[test]
    fn stop_shows_reason_and_location() {
        let ev = DebugEvent::Stopped {
            reason: "breakpoint-hit".into(),
            frame: frame(),
            thread_id: 1,
            core: 0,
        };
        assert_eq!(
            format_event(&ev).unwrap(),
            "[stopped: breakpoint-hit, thread 1] #0 main() at a.c:10"
        );
    }

    #[test]
    fn quiet_events_are_hidden() {
        assert_eq!(format_event(&DebugEvent::GdbPrompt), None);
        assert_eq!(format_event(&DebugEvent::Internal("-> 100-exec-run".into())), None);
        let empty_done = DebugEvent::Result {
            token: Some(100),
            status: ResponseStatus::Done,
            payload: Value::empty_tuple(),
        };
        assert_eq!(format_event(&empty_done), None);
    }

    #[test]
    fn done_result_prints_payload() {
        let ev = DebugEvent::Result {
            token: Some(104),
            status: ResponseStatus::Done,
            payload: parse_value(r#"{value="42"}"#).unwrap(),
        };
        assert_eq!(format_event(&ev).unwrap(), "104: {value=\"42\"}");
    }

    #[test]
    fn stream_text_drops_trailing_newline() {
        assert_eq!(
            format_event(&DebugEvent::Console("hello\n".into())).unwrap(),
            "hello"
        );
    }

    #[test]
    fn locals_include_type_when_known() {
        let vars = vec![
            Variable { name: "x".into(), type_name: "int".into(), value: "5".into() },
            Variable { name: "y".into(), type_name: String::new(), value: "7".into() },
        ];
        assert_eq!(
            format_event(&DebugEvent::LocalVariables(vars)).unwrap(),
            "int x = 5\ny = 7"
        );
    }
}
