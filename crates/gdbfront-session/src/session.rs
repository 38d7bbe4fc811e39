//! Sans-IO GDB/MI session state machine.
//!
//! [`Session`] consumes debugger output lines and process lifecycle
//! notifications, and queues outgoing command lines and [`DebugEvent`]s.
//! Whoever owns it performs the actual I/O: write
//! [`take_outgoing`](Session::take_outgoing) to the debugger and publish
//! [`take_events`](Session::take_events).
use std::collections::{BTreeMap, HashMap, VecDeque};
use std::path::Path;

use gdbfront_config::SessionConfig;
use gdbfront_mi::{
    parse_line, AsyncClass, Breakpoint, Frame, Record, Thread, ThreadState, Token, Value, Variable,
};

use crate::correlator::{Correlator, Retention};
use crate::error::SessionError;
use crate::event::{DebugEvent, Response, ResponseHandler, ResponseStatus};

/// Lifecycle of a debug session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// Debugger may be running; nothing launched yet.
    Idle,
    /// `-exec-run` or `-target-select` issued, no confirmation yet.
    Launching,
    /// The debuggee is executing.
    Running,
    /// The debuggee is stopped.
    Stopped,
    /// The debugger exited or `quit` was requested.
    Terminated,
}

/// Run-control commands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExecCommand {
    Continue,
    Next,
    Step,
    Finish,
}

impl ExecCommand {
    pub fn as_mi(self) -> &'static str {
        match self {
            ExecCommand::Continue => "-exec-continue",
            ExecCommand::Next => "-exec-next",
            ExecCommand::Step => "-exec-step",
            ExecCommand::Finish => "-exec-finish",
        }
    }
}

/// What to do with a result record once it arrives.
enum Tracked {
    Callback(ResponseHandler),
    BreakInsert(Option<ResponseHandler>),
    BreakRemove(i32, Option<ResponseHandler>),
    StackListFrames(Option<ResponseHandler>),
    StackListLocals(Option<ResponseHandler>),
    ThreadInfo(Option<ResponseHandler>),
    Exec {
        previous: SessionState,
        then: Option<ResponseHandler>,
    },
    Launch,
}

/// Owned copy of the session model.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionSnapshot {
    pub state: SessionState,
    pub is_remote: bool,
    /// Ordered by breakpoint number.
    pub breakpoints: Vec<Breakpoint>,
    /// Ordered by thread id.
    pub threads: Vec<Thread>,
    /// `-1` when no thread is selected.
    pub current_thread: i32,
    pub current_frame: Frame,
    pub frames: Vec<Frame>,
    pub locals: Vec<Variable>,
    pub pending_commands: usize,
}

impl SessionSnapshot {
    pub fn is_executing(&self) -> bool {
        self.state == SessionState::Running
    }

    pub fn breakpoint_by_id(&self, number: i32) -> Option<&Breakpoint> {
        self.breakpoints.iter().find(|b| b.number == number)
    }

    pub fn breakpoints_for_file(&self, path: &str) -> Vec<&Breakpoint> {
        self.breakpoints
            .iter()
            .filter(|b| b.in_file(path))
            .collect()
    }

    pub fn breakpoint_at(&self, path: &str, line: i32) -> Option<&Breakpoint> {
        self.breakpoints.iter().find(|b| b.is_at(path, line))
    }
}

/// GDB/MI session state, independent of any process or runtime.
pub struct Session {
    config: SessionConfig,
    state: SessionState,
    correlator: Correlator<Tracked>,
    breakpoints: BTreeMap<i32, Breakpoint>,
    threads: BTreeMap<i32, Thread>,
    /// Thread group id -> member thread ids.
    thread_groups: HashMap<String, Vec<i32>>,
    current_thread: i32,
    current_frame: Frame,
    frames: Vec<Frame>,
    locals: Vec<Variable>,
    remote: bool,
    process_running: bool,
    started_published: bool,
    outgoing: VecDeque<String>,
    events: Vec<DebugEvent>,
}

impl Session {
    pub fn new(config: SessionConfig) -> Self {
        Self {
            correlator: Correlator::new(config.token_base),
            config,
            state: SessionState::Idle,
            breakpoints: BTreeMap::new(),
            threads: BTreeMap::new(),
            thread_groups: HashMap::new(),
            current_thread: -1,
            current_frame: Frame::default(),
            frames: Vec::new(),
            locals: Vec::new(),
            remote: false,
            process_running: false,
            started_published: false,
            outgoing: VecDeque::new(),
            events: Vec::new(),
        }
    }

    // -- lifecycle ---------------------------------------------------------

    /// The debugger process is up and accepting commands.
    pub fn process_started(&mut self, pid: Option<u32>) {
        if self.state == SessionState::Terminated {
            return;
        }
        tracing::info!("debugger process started (pid {pid:?})");
        self.process_running = true;
        self.events.push(DebugEvent::ProcessStarted);
    }

    /// The debugger could not be launched. The session is over.
    pub fn spawn_failed(&mut self, error: &SessionError) {
        tracing::warn!("debugger spawn failed: {error}");
        self.events.push(DebugEvent::Error(error.to_string()));
        self.terminate();
    }

    /// The debugger process exited.
    pub fn process_exited(&mut self, code: Option<i32>) {
        tracing::info!("debugger process exited ({code:?})");
        self.process_running = false;
        self.events.push(DebugEvent::ProcessTerminated { code });
        self.terminate();
    }

    /// Send `-gdb-exit` if the debugger is up and end the session.
    ///
    /// # Errors
    ///
    /// `SessionTerminated` when the session already ended.
    pub fn quit(&mut self) -> Result<(), SessionError> {
        if self.state == SessionState::Terminated {
            return Err(SessionError::SessionTerminated);
        }
        if self.process_running {
            self.send_line("-gdb-exit".to_string());
        }
        self.terminate();
        Ok(())
    }

    fn terminate(&mut self) {
        if self.state == SessionState::Terminated {
            return;
        }
        self.state = SessionState::Terminated;
        for mut pending in self.correlator.drain() {
            let response = Response::terminated(pending.token);
            self.dispatch(&mut pending.handler, &response);
        }
        tracing::info!("session terminated");
        self.events.push(DebugEvent::SessionTerminated);
    }

    // -- input -------------------------------------------------------------

    /// Feed one line of debugger stdout.
    pub fn handle_line(&mut self, line: &str) {
        tracing::trace!("<- {line}");
        match parse_line(line) {
            Ok(record) => self.apply(record),
            Err(e) => {
                tracing::warn!("malformed MI line: {e}");
                self.events.push(DebugEvent::Internal(format!("parse error: {e}")));
            }
        }
    }

    /// Feed one line of debugger stderr.
    pub fn handle_stderr(&mut self, line: &str) {
        self.events.push(DebugEvent::Internal(line.to_string()));
    }

    fn apply(&mut self, record: Record) {
        match record {
            Record::Result {
                token,
                class,
                payload,
            } => self.on_result(Response {
                token,
                status: class.into(),
                payload,
            }),
            Record::AsyncExec {
                class: AsyncClass::Running,
                payload,
                ..
            } => self.on_running(&payload),
            Record::AsyncExec {
                class: AsyncClass::Stopped,
                payload,
                ..
            } => self.on_stopped(&payload),
            Record::AsyncNotify { class, payload } => self.on_notify(&class, &payload),
            Record::ConsoleStream(text) => self.events.push(DebugEvent::Console(text)),
            Record::TargetStream(text) => self.events.push(DebugEvent::Target(text)),
            Record::LogStream(text) => self.events.push(DebugEvent::Log(text)),
            Record::GdbPrompt => self.events.push(DebugEvent::GdbPrompt),
        }
    }

    fn on_result(&mut self, response: Response) {
        self.events.push(DebugEvent::Result {
            token: response.token,
            status: response.status,
            payload: response.payload.clone(),
        });
        if let Some(msg) = response.error_message() {
            self.events.push(DebugEvent::Error(msg.to_string()));
        }
        match self.correlator.take(response.token) {
            Some(mut pending) => {
                self.dispatch(&mut pending.handler, &response);
                self.correlator.restore(pending);
            }
            None => match response.token {
                Some(t) => tracing::warn!("result for unknown token {t}"),
                None => tracing::debug!("untracked result {:?}", response.status),
            },
        }
    }

    fn dispatch(&mut self, tracked: &mut Tracked, response: &Response) {
        let done = response.status == ResponseStatus::Done;
        let then = match tracked {
            Tracked::Callback(handler) => Some(handler),
            Tracked::BreakInsert(then) => {
                if done {
                    let bp = response
                        .payload
                        .get("bkpt")
                        .map(Breakpoint::from_value)
                        .unwrap_or_default();
                    if bp.is_valid() {
                        self.breakpoints.insert(bp.number, bp.clone());
                        self.events.push(DebugEvent::BreakpointInserted(bp));
                    }
                }
                then.as_mut()
            }
            Tracked::BreakRemove(number, then) => {
                if done {
                    self.remove_breakpoint(*number);
                }
                then.as_mut()
            }
            Tracked::StackListFrames(then) => {
                if done {
                    self.frames = response
                        .payload
                        .items("stack")
                        .iter()
                        .map(|f| Frame::from_value(f.named("frame")))
                        .filter(Frame::is_valid)
                        .collect();
                    self.events.push(DebugEvent::StackFrames(self.frames.clone()));
                }
                then.as_mut()
            }
            Tracked::StackListLocals(then) => {
                if done {
                    self.locals = response
                        .payload
                        .items("locals")
                        .iter()
                        .map(|v| Variable::from_value(v.named("local")))
                        .filter(Variable::is_valid)
                        .collect();
                    self.events.push(DebugEvent::LocalVariables(self.locals.clone()));
                }
                then.as_mut()
            }
            Tracked::ThreadInfo(then) => {
                if done {
                    self.apply_thread_info(&response.payload);
                }
                then.as_mut()
            }
            Tracked::Exec { previous, then } => {
                if response.status == ResponseStatus::Error && self.state == SessionState::Running {
                    tracing::debug!("exec command failed; back to {previous:?}");
                    self.state = *previous;
                }
                then.as_mut()
            }
            Tracked::Launch => {
                match response.status {
                    ResponseStatus::Running | ResponseStatus::Done => self.mark_started(),
                    ResponseStatus::Connected => {
                        self.events.push(DebugEvent::RemoteConnected);
                        self.mark_started();
                    }
                    ResponseStatus::Error => {
                        if self.state == SessionState::Launching {
                            self.state = SessionState::Idle;
                            self.remote = false;
                        }
                    }
                    ResponseStatus::Exit | ResponseStatus::SessionTerminated => {}
                }
                None
            }
        };
        if let Some(handler) = then {
            handler(response);
        }
    }

    fn mark_started(&mut self) {
        if matches!(self.state, SessionState::Idle | SessionState::Launching) {
            self.state = SessionState::Running;
        }
        if !self.started_published {
            self.started_published = true;
            tracing::info!("debuggee started");
            self.events.push(DebugEvent::SessionStarted);
        }
    }

    fn on_running(&mut self, payload: &Value) {
        if self.state == SessionState::Terminated {
            return;
        }
        self.mark_started();
        self.state = SessionState::Running;
        let thread_id = payload.get_str("thread-id").unwrap_or("all").to_string();
        if thread_id == "all" {
            for t in self.threads.values_mut() {
                t.state = ThreadState::Running;
            }
        } else if let Some(t) = thread_id.parse().ok().and_then(|id: i32| self.threads.get_mut(&id)) {
            t.state = ThreadState::Running;
        }
        self.events.push(DebugEvent::Running { thread_id });
    }

    fn on_stopped(&mut self, payload: &Value) {
        if self.state == SessionState::Terminated {
            return;
        }
        let reason = payload.get_str("reason").unwrap_or_default().to_string();
        let thread_id = parse_int(payload.get_str("thread-id"));
        let core = parse_int(payload.get_str("core"));
        let frame = payload.get("frame").map(Frame::from_value).unwrap_or_default();

        if thread_id != -1 {
            self.current_thread = thread_id;
            let thread = self.threads.entry(thread_id).or_insert_with(|| Thread {
                id: thread_id,
                ..Thread::default()
            });
            thread.state = ThreadState::Stopped;
            if frame.is_valid() {
                thread.frame = frame.clone();
            }
            if core != -1 {
                thread.core = core;
            }
        }
        match payload.get("stopped-threads") {
            Some(Value::String(s)) if s == "all" => {
                for t in self.threads.values_mut() {
                    t.state = ThreadState::Stopped;
                }
            }
            Some(Value::List(ids)) => {
                for id in ids.iter().map(|v| parse_int(v.as_str())) {
                    if let Some(t) = self.threads.get_mut(&id) {
                        t.state = ThreadState::Stopped;
                    }
                }
            }
            _ => {}
        }
        if reason.starts_with("exited") {
            self.current_frame = Frame::default();
            self.frames.clear();
            self.locals.clear();
        } else if thread_id == -1 {
            // The frame cannot be tied to a thread.
            self.current_frame = Frame::default();
        } else {
            self.current_frame = frame.clone();
        }
        if !self.started_published {
            self.mark_started();
        }
        self.state = SessionState::Stopped;

        self.events.push(DebugEvent::Stopped {
            reason,
            frame,
            thread_id,
            core,
        });
        self.events.push(DebugEvent::CurrentFrame(self.current_frame.clone()));
        self.publish_threads();

        if self.config.refresh_on_stop && self.current_frame.is_valid() {
            self.refresh();
        }
    }

    fn refresh(&mut self) {
        let queued = self
            .thread_info(None)
            .and_then(|_| self.stack_list_frames(None))
            .and_then(|_| self.stack_list_locals(None));
        if let Err(e) = queued {
            tracing::warn!("refresh after stop failed: {e}");
        }
    }

    fn on_notify(&mut self, class: &str, payload: &Value) {
        match class {
            "breakpoint-created" | "breakpoint-modified" => {
                let bp = payload
                    .get("bkpt")
                    .map(Breakpoint::from_value)
                    .unwrap_or_default();
                if !bp.is_valid() {
                    tracing::warn!("{class} without a breakpoint number");
                    return;
                }
                self.breakpoints.insert(bp.number, bp.clone());
                self.events.push(if class == "breakpoint-created" {
                    DebugEvent::BreakpointInserted(bp)
                } else {
                    DebugEvent::BreakpointModified(bp)
                });
            }
            "breakpoint-deleted" => self.remove_breakpoint(parse_int(payload.get_str("id"))),
            "thread-group-added" | "thread-group-started" => {
                if let Some(id) = payload.get_str("id") {
                    self.thread_groups.entry(id.to_string()).or_default();
                }
            }
            "thread-group-exited" => {
                let members = payload
                    .get_str("id")
                    .and_then(|id| self.thread_groups.get_mut(id))
                    .map(std::mem::take)
                    .unwrap_or_default();
                for id in members {
                    self.forget_thread(id);
                }
                self.publish_threads();
            }
            "thread-created" => {
                let id = parse_int(payload.get_str("id"));
                if id == -1 {
                    return;
                }
                self.threads.entry(id).or_insert_with(|| Thread {
                    id,
                    ..Thread::default()
                });
                if let Some(group) = payload.get_str("group-id") {
                    let members = self.thread_groups.entry(group.to_string()).or_default();
                    if !members.contains(&id) {
                        members.push(id);
                    }
                }
                self.publish_threads();
            }
            "thread-exited" => {
                let id = parse_int(payload.get_str("id"));
                if let Some(members) = payload
                    .get_str("group-id")
                    .and_then(|g| self.thread_groups.get_mut(g))
                {
                    members.retain(|&m| m != id);
                }
                self.forget_thread(id);
                self.publish_threads();
            }
            "thread-selected" => {
                let id = parse_int(payload.get_str("id"));
                if id == -1 {
                    return;
                }
                self.current_thread = id;
                self.threads.entry(id).or_insert_with(|| Thread {
                    id,
                    ..Thread::default()
                });
                if let Some(frame) = payload.get("frame").map(Frame::from_value) {
                    if frame.is_valid() {
                        self.current_frame = frame;
                        self.events.push(DebugEvent::CurrentFrame(self.current_frame.clone()));
                    }
                }
                self.publish_threads();
            }
            other => tracing::debug!("ignoring notification {other}"),
        }
    }

    fn apply_thread_info(&mut self, payload: &Value) {
        self.threads = payload
            .items("threads")
            .iter()
            .map(Thread::from_value)
            .filter(Thread::is_valid)
            .map(|t| (t.id, t))
            .collect();
        let threads = &self.threads;
        for members in self.thread_groups.values_mut() {
            members.retain(|id| threads.contains_key(id));
        }
        if let Some(current) = payload.get_str("current-thread-id") {
            self.current_thread = parse_int(Some(current));
        }
        if !self.threads.contains_key(&self.current_thread) {
            self.current_thread = -1;
            self.current_frame = Frame::default();
        }
        self.publish_threads();
    }

    fn forget_thread(&mut self, id: i32) {
        self.threads.remove(&id);
        if self.current_thread == id {
            self.current_thread = -1;
            self.current_frame = Frame::default();
        }
    }

    fn remove_breakpoint(&mut self, number: i32) {
        match self.breakpoints.remove(&number) {
            Some(bp) => self.events.push(DebugEvent::BreakpointRemoved(bp)),
            None => tracing::debug!("breakpoint {number} already gone"),
        }
    }

    fn publish_threads(&mut self) {
        self.events.push(DebugEvent::Threads {
            current: self.current_thread,
            threads: self.threads.values().cloned().collect(),
        });
    }

    // -- commands ----------------------------------------------------------

    fn require_ready(&self) -> Result<(), SessionError> {
        if self.state == SessionState::Terminated {
            return Err(SessionError::SessionTerminated);
        }
        if !self.process_running {
            return Err(SessionError::NotRunning);
        }
        Ok(())
    }

    fn send_line(&mut self, line: String) {
        tracing::debug!("-> {line}");
        self.events.push(DebugEvent::Internal(format!("-> {line}")));
        self.outgoing.push_back(line);
    }

    fn track(
        &mut self,
        command: &str,
        tracked: Tracked,
        retention: Retention,
    ) -> Result<Token, SessionError> {
        self.require_ready()?;
        let (token, line) = self.correlator.register(command, tracked, retention);
        self.send_line(line);
        Ok(token)
    }

    /// Send `text` as-is without tracking its result.
    pub fn command(&mut self, text: &str) -> Result<(), SessionError> {
        self.require_ready()?;
        self.send_line(text.to_string());
        Ok(())
    }

    /// Send `text` under a fresh token; `handler` receives its result.
    pub fn command_and_response(
        &mut self,
        text: &str,
        handler: ResponseHandler,
        retention: Retention,
    ) -> Result<Token, SessionError> {
        self.track(text, Tracked::Callback(handler), retention)
    }

    /// Send `text` under a reserved token below the token base.
    pub fn command_with_token(
        &mut self,
        token: Token,
        text: &str,
        handler: ResponseHandler,
        retention: Retention,
    ) -> Result<(), SessionError> {
        self.require_ready()?;
        let line = self
            .correlator
            .register_fixed(token, text, Tracked::Callback(handler), retention)?;
        self.send_line(line);
        Ok(())
    }

    /// Send `text` without a token; `handler` receives the next token-less
    /// result.
    pub fn command_untokened(
        &mut self,
        text: &str,
        handler: ResponseHandler,
        retention: Retention,
    ) -> Result<(), SessionError> {
        self.require_ready()?;
        self.correlator
            .register_untokened(Tracked::Callback(handler), retention)?;
        self.send_line(text.to_string());
        Ok(())
    }

    /// Load the program to debug.
    pub fn load_executable(&mut self, path: &Path) -> Result<(), SessionError> {
        let path = path.to_string_lossy();
        self.command(&format!("-file-exec-and-symbols {}", quote(&path)))
    }

    /// Start the loaded program under the debugger.
    pub fn launch_local(&mut self) -> Result<Token, SessionError> {
        self.begin_launch("-exec-run".to_string(), false)
    }

    /// Connect to a remote target such as `localhost:1234`.
    pub fn launch_remote(&mut self, target: &str) -> Result<Token, SessionError> {
        self.begin_launch(format!("-target-select remote {target}"), true)
    }

    fn begin_launch(&mut self, command: String, remote: bool) -> Result<Token, SessionError> {
        self.require_ready()?;
        if self.state != SessionState::Idle {
            return Err(SessionError::AlreadyLaunched);
        }
        let token = self.track(&command, Tracked::Launch, Retention::Temporal)?;
        self.state = SessionState::Launching;
        self.remote = remote;
        Ok(token)
    }

    /// Issue a run-control command. A stopped session is considered running
    /// right away; a rejected command puts it back.
    pub fn exec(
        &mut self,
        command: ExecCommand,
        then: Option<ResponseHandler>,
    ) -> Result<Token, SessionError> {
        let previous = self.state;
        let token = self.track(command.as_mi(), Tracked::Exec { previous, then }, Retention::Temporal)?;
        if previous == SessionState::Stopped {
            self.state = SessionState::Running;
        }
        Ok(token)
    }

    pub fn command_continue(&mut self) -> Result<Token, SessionError> {
        self.exec(ExecCommand::Continue, None)
    }

    pub fn command_next(&mut self) -> Result<Token, SessionError> {
        self.exec(ExecCommand::Next, None)
    }

    pub fn command_step(&mut self) -> Result<Token, SessionError> {
        self.exec(ExecCommand::Step, None)
    }

    pub fn command_finish(&mut self) -> Result<Token, SessionError> {
        self.exec(ExecCommand::Finish, None)
    }

    /// Request an interrupt through MI, for when no signal can be sent.
    pub fn command_interrupt(&mut self) -> Result<(), SessionError> {
        self.command("-exec-interrupt")
    }

    pub fn break_insert(
        &mut self,
        location: &str,
        then: Option<ResponseHandler>,
    ) -> Result<Token, SessionError> {
        self.track(
            &format!("-break-insert {location}"),
            Tracked::BreakInsert(then),
            Retention::Temporal,
        )
    }

    pub fn break_remove(
        &mut self,
        number: i32,
        then: Option<ResponseHandler>,
    ) -> Result<Token, SessionError> {
        self.track(
            &format!("-break-delete {number}"),
            Tracked::BreakRemove(number, then),
            Retention::Temporal,
        )
    }

    pub fn stack_list_frames(&mut self, then: Option<ResponseHandler>) -> Result<Token, SessionError> {
        self.track("-stack-list-frames", Tracked::StackListFrames(then), Retention::Temporal)
    }

    pub fn stack_list_locals(&mut self, then: Option<ResponseHandler>) -> Result<Token, SessionError> {
        self.track(
            "-stack-list-locals --all-values",
            Tracked::StackListLocals(then),
            Retention::Temporal,
        )
    }

    pub fn thread_info(&mut self, then: Option<ResponseHandler>) -> Result<Token, SessionError> {
        self.track("-thread-info", Tracked::ThreadInfo(then), Retention::Temporal)
    }

    // -- output ------------------------------------------------------------

    /// Wire lines to write, oldest first.
    pub fn take_outgoing(&mut self) -> Vec<String> {
        self.outgoing.drain(..).collect()
    }

    /// Events to publish, oldest first.
    pub fn take_events(&mut self) -> Vec<DebugEvent> {
        std::mem::take(&mut self.events)
    }

    // -- accessors ---------------------------------------------------------

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn is_remote(&self) -> bool {
        self.remote
    }

    pub fn is_executing(&self) -> bool {
        self.state == SessionState::Running
    }

    pub fn is_process_running(&self) -> bool {
        self.process_running
    }

    pub fn breakpoints(&self) -> Vec<Breakpoint> {
        self.breakpoints.values().cloned().collect()
    }

    pub fn breakpoints_for_file(&self, path: &str) -> Vec<Breakpoint> {
        self.breakpoints
            .values()
            .filter(|b| b.in_file(path))
            .cloned()
            .collect()
    }

    pub fn breakpoint_by_id(&self, number: i32) -> Option<Breakpoint> {
        self.breakpoints.get(&number).cloned()
    }

    pub fn breakpoint_at(&self, path: &str, line: i32) -> Option<Breakpoint> {
        self.breakpoints.values().find(|b| b.is_at(path, line)).cloned()
    }

    pub fn threads(&self) -> Vec<Thread> {
        self.threads.values().cloned().collect()
    }

    pub fn current_thread_id(&self) -> i32 {
        self.current_thread
    }

    pub fn current_frame(&self) -> Frame {
        self.current_frame.clone()
    }

    pub fn stack_frames(&self) -> Vec<Frame> {
        self.frames.clone()
    }

    pub fn locals(&self) -> Vec<Variable> {
        self.locals.clone()
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            state: self.state,
            is_remote: self.remote,
            breakpoints: self.breakpoints(),
            threads: self.threads(),
            current_thread: self.current_thread,
            current_frame: self.current_frame(),
            frames: self.stack_frames(),
            locals: self.locals(),
            pending_commands: self.correlator.pending_count(),
        }
    }
}

fn parse_int(s: Option<&str>) -> i32 {
    s.and_then(|s| s.parse().ok()).unwrap_or(-1)
}

/// Quote an MI command argument when it needs it.
fn quote(arg: &str) -> String {
    if !arg.is_empty() && !arg.contains(|c: char| c.is_whitespace() || c == '"' || c == '\\') {
        return arg.to_string();
    }
    let escaped = arg.replace('\\', "\\\\").replace('"', "\\\"");
    format!("\"{escaped}\"")
}
