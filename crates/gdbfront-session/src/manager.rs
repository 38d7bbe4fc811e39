//! Async driver that owns a [`Session`] and its debugger process.
//!
//! [`DebugManager`] is a cheap, cloneable handle. Requests travel over an
//! mpsc channel to a single task, which also reads the debugger's output,
//! so every handler and state update runs on that one task. Events fan out
//! to any number of subscribers through a broadcast channel.
use std::path::PathBuf;

use gdbfront_config::Config;
use gdbfront_mi::Token;
use tokio::sync::{broadcast, mpsc, oneshot};
use tokio::time::{Duration, Instant};

use crate::correlator::Retention;
use crate::error::SessionError;
use crate::event::{DebugEvent, ResponseHandler};
use crate::session::{ExecCommand, Session, SessionSnapshot};
use crate::transport::{DebuggerProcess, TransportEvent};

const REQUEST_CHANNEL_CAPACITY: usize = 64;
const EVENT_CHANNEL_CAPACITY: usize = 1024;

type Reply<T> = oneshot::Sender<Result<T, SessionError>>;

/// Requests sent from a [`DebugManager`] handle to the driver task.
enum Request {
    Start(Reply<()>),
    LoadExecutable(PathBuf, Reply<()>),
    LaunchLocal(Reply<Token>),
    LaunchRemote(String, Reply<Token>),
    Command(String, Reply<()>),
    CommandAndResponse {
        text: String,
        handler: ResponseHandler,
        retention: Retention,
        reply: Reply<Token>,
    },
    CommandWithToken {
        token: Token,
        text: String,
        handler: ResponseHandler,
        retention: Retention,
        reply: Reply<()>,
    },
    CommandUntokened {
        text: String,
        handler: ResponseHandler,
        retention: Retention,
        reply: Reply<()>,
    },
    Exec(ExecCommand, Reply<Token>),
    Interrupt(Reply<()>),
    BreakInsert(String, Reply<Token>),
    BreakRemove(i32, Reply<Token>),
    StackListFrames(Reply<Token>),
    StackListLocals(Reply<Token>),
    ThreadInfo(Reply<Token>),
    Snapshot(Reply<SessionSnapshot>),
    Quit(Reply<()>),
}

/// Handle to a debug session running on a background task.
#[derive(Clone)]
pub struct DebugManager {
    requests: mpsc::Sender<Request>,
    events: broadcast::Sender<DebugEvent>,
}

impl DebugManager {
    /// Spawn the driver task. Must be called inside a tokio runtime.
    ///
    /// The debugger is not started until [`start`](Self::start) or a launch
    /// request. Subscribe first to observe `ProcessStarted`.
    pub fn new(config: Config) -> Self {
        let (requests, request_rx) = mpsc::channel(REQUEST_CHANNEL_CAPACITY);
        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        let driver = Driver::new(config, events.clone());
        tokio::spawn(driver.run(request_rx));
        Self { requests, events }
    }

    /// A receiver for every event published from now on.
    pub fn subscribe(&self) -> broadcast::Receiver<DebugEvent> {
        self.events.subscribe()
    }

    async fn request<T>(&self, make: impl FnOnce(Reply<T>) -> Request) -> Result<T, SessionError> {
        let (tx, rx) = oneshot::channel();
        self.requests
            .send(make(tx))
            .await
            .map_err(|_| SessionError::SessionTerminated)?;
        rx.await.map_err(|_| SessionError::SessionTerminated)?
    }

    /// Spawn the debugger, run the init script and load the executable.
    /// Does nothing if the debugger is already running.
    pub async fn start(&self) -> Result<(), SessionError> {
        self.request(Request::Start).await
    }

    pub async fn load_executable(&self, path: impl Into<PathBuf>) -> Result<(), SessionError> {
        let path = path.into();
        self.request(|reply| Request::LoadExecutable(path, reply)).await
    }

    /// Run the loaded program, starting the debugger first if needed.
    pub async fn launch_local(&self) -> Result<Token, SessionError> {
        self.request(Request::LaunchLocal).await
    }

    /// Connect to a remote target, starting the debugger first if needed.
    pub async fn launch_remote(&self, target: impl Into<String>) -> Result<Token, SessionError> {
        let target = target.into();
        self.request(|reply| Request::LaunchRemote(target, reply)).await
    }

    /// Send raw text without tracking its result.
    pub async fn command(&self, text: impl Into<String>) -> Result<(), SessionError> {
        let text = text.into();
        self.request(|reply| Request::Command(text, reply)).await
    }

    /// Send `text` under a fresh token. `handler` runs on the driver task
    /// when the result arrives.
    pub async fn command_and_response(
        &self,
        text: impl Into<String>,
        handler: ResponseHandler,
        retention: Retention,
    ) -> Result<Token, SessionError> {
        let text = text.into();
        self.request(|reply| Request::CommandAndResponse {
            text,
            handler,
            retention,
            reply,
        })
        .await
    }

    /// Send `text` under a reserved token below `session.token_base`.
    /// With [`Retention::Permanent`] the handler stays registered and runs
    /// for every result carrying that token.
    pub async fn command_with_token(
        &self,
        token: Token,
        text: impl Into<String>,
        handler: ResponseHandler,
        retention: Retention,
    ) -> Result<(), SessionError> {
        let text = text.into();
        self.request(|reply| Request::CommandWithToken {
            token,
            text,
            handler,
            retention,
            reply,
        })
        .await
    }

    /// Send `text` without a token; `handler` receives the next token-less
    /// result. Only one such command may be pending.
    pub async fn command_untokened(
        &self,
        text: impl Into<String>,
        handler: ResponseHandler,
        retention: Retention,
    ) -> Result<(), SessionError> {
        let text = text.into();
        self.request(|reply| Request::CommandUntokened {
            text,
            handler,
            retention,
            reply,
        })
        .await
    }

    pub async fn command_continue(&self) -> Result<Token, SessionError> {
        self.request(|reply| Request::Exec(ExecCommand::Continue, reply)).await
    }

    pub async fn command_next(&self) -> Result<Token, SessionError> {
        self.request(|reply| Request::Exec(ExecCommand::Next, reply)).await
    }

    pub async fn command_step(&self) -> Result<Token, SessionError> {
        self.request(|reply| Request::Exec(ExecCommand::Step, reply)).await
    }

    pub async fn command_finish(&self) -> Result<Token, SessionError> {
        self.request(|reply| Request::Exec(ExecCommand::Finish, reply)).await
    }

    /// Interrupt the running debuggee.
    pub async fn command_interrupt(&self) -> Result<(), SessionError> {
        self.request(Request::Interrupt).await
    }

    pub async fn break_insert(&self, location: impl Into<String>) -> Result<Token, SessionError> {
        let location = location.into();
        self.request(|reply| Request::BreakInsert(location, reply)).await
    }

    pub async fn break_remove(&self, number: i32) -> Result<Token, SessionError> {
        self.request(|reply| Request::BreakRemove(number, reply)).await
    }

    pub async fn stack_list_frames(&self) -> Result<Token, SessionError> {
        self.request(Request::StackListFrames).await
    }

    pub async fn stack_list_locals(&self) -> Result<Token, SessionError> {
        self.request(Request::StackListLocals).await
    }

    pub async fn thread_info(&self) -> Result<Token, SessionError> {
        self.request(Request::ThreadInfo).await
    }

    /// An owned copy of the current session model.
    pub async fn snapshot(&self) -> Result<SessionSnapshot, SessionError> {
        self.request(Request::Snapshot).await
    }

    /// Ask the debugger to exit and end the session. The process is killed
    /// if it is still alive after the configured grace period.
    pub async fn quit(&self) -> Result<(), SessionError> {
        self.request(Request::Quit).await
    }
}

/// What woke the driver loop.
enum Wakeup {
    Request(Option<Request>),
    Transport(Option<TransportEvent>),
    QuitDeadline,
}

struct Driver {
    config: Config,
    session: Session,
    process: Option<DebuggerProcess>,
    transport: Option<mpsc::Receiver<TransportEvent>>,
    events: broadcast::Sender<DebugEvent>,
    quit_deadline: Option<Instant>,
}

impl Driver {
    fn new(config: Config, events: broadcast::Sender<DebugEvent>) -> Self {
        Self {
            session: Session::new(config.session.clone()),
            config,
            process: None,
            transport: None,
            events,
            quit_deadline: None,
        }
    }

    async fn run(mut self, mut requests: mpsc::Receiver<Request>) {
        loop {
            let deadline = self.quit_deadline;
            let wakeup = tokio::select! {
                req = requests.recv() => Wakeup::Request(req),
                ev = recv_transport(&mut self.transport) => Wakeup::Transport(ev),
                _ = sleep_until(deadline) => Wakeup::QuitDeadline,
            };
            match wakeup {
                Wakeup::Request(Some(req)) => self.handle_request(req).await,
                Wakeup::Request(None) => {
                    tracing::debug!("all session handles dropped");
                    break;
                }
                Wakeup::Transport(Some(ev)) => self.handle_transport(ev),
                Wakeup::Transport(None) => self.transport = None,
                Wakeup::QuitDeadline => {
                    self.quit_deadline = None;
                    if let Some(process) = &mut self.process {
                        tracing::warn!("debugger did not exit in time; killing it");
                        process.kill();
                    }
                }
            }
            self.flush().await;
        }
    }

    async fn handle_request(&mut self, req: Request) {
        match req {
            Request::Start(reply) => {
                let res = self.start().await;
                let _ = reply.send(res);
            }
            Request::LoadExecutable(path, reply) => {
                let _ = reply.send(self.session.load_executable(&path));
            }
            Request::LaunchLocal(reply) => {
                let res = match self.start().await {
                    Ok(()) => self.session.launch_local(),
                    Err(e) => Err(e),
                };
                let _ = reply.send(res);
            }
            Request::LaunchRemote(target, reply) => {
                let res = match self.start().await {
                    Ok(()) => self.session.launch_remote(&target),
                    Err(e) => Err(e),
                };
                let _ = reply.send(res);
            }
            Request::Command(text, reply) => {
                let _ = reply.send(self.session.command(&text));
            }
            Request::CommandAndResponse {
                text,
                handler,
                retention,
                reply,
            } => {
                let _ = reply.send(self.session.command_and_response(&text, handler, retention));
            }
            Request::CommandWithToken {
                token,
                text,
                handler,
                retention,
                reply,
            } => {
                let res = self.session.command_with_token(token, &text, handler, retention);
                let _ = reply.send(res);
            }
            Request::CommandUntokened {
                text,
                handler,
                retention,
                reply,
            } => {
                let _ = reply.send(self.session.command_untokened(&text, handler, retention));
            }
            Request::Exec(command, reply) => {
                let _ = reply.send(self.session.exec(command, None));
            }
            Request::Interrupt(reply) => {
                let _ = reply.send(self.interrupt());
            }
            Request::BreakInsert(location, reply) => {
                let _ = reply.send(self.session.break_insert(&location, None));
            }
            Request::BreakRemove(number, reply) => {
                let _ = reply.send(self.session.break_remove(number, None));
            }
            Request::StackListFrames(reply) => {
                let _ = reply.send(self.session.stack_list_frames(None));
            }
            Request::StackListLocals(reply) => {
                let _ = reply.send(self.session.stack_list_locals(None));
            }
            Request::ThreadInfo(reply) => {
                let _ = reply.send(self.session.thread_info(None));
            }
            Request::Snapshot(reply) => {
                let _ = reply.send(Ok(self.session.snapshot()));
            }
            Request::Quit(reply) => {
                let res = self.session.quit();
                if res.is_ok() && self.process.is_some() {
                    let grace = Duration::from_millis(self.config.session.quit_grace_ms);
                    self.quit_deadline = Some(Instant::now() + grace);
                }
                let _ = reply.send(res);
            }
        }
    }

    /// Spawn the debugger unless it is already up, then queue the init
    /// script and the executable.
    async fn start(&mut self) -> Result<(), SessionError> {
        if self.process.is_some() {
            return Ok(());
        }
        if self.session.state() == crate::session::SessionState::Terminated {
            return Err(SessionError::SessionTerminated);
        }

        let debugger = &self.config.debugger;
        let spawned = DebuggerProcess::spawn(
            &debugger.command,
            &debugger.args,
            debugger.interrupt_helper.clone(),
        )
        .await;
        let (process, mut transport) = match spawned {
            Ok(spawned) => spawned,
            Err(e) => {
                self.session.spawn_failed(&e);
                return Err(e);
            }
        };
        match transport.recv().await {
            Some(TransportEvent::Started { pid }) => self.session.process_started(pid),
            other => {
                return Err(SessionError::Transport(format!(
                    "unexpected first transport event: {other:?}"
                )))
            }
        }
        self.process = Some(process);
        self.transport = Some(transport);

        let launch = &self.config.launch;
        for line in launch.init_commands() {
            self.session.command(line)?;
        }
        if let Some(exe) = &launch.executable {
            self.session.load_executable(exe)?;
        }
        Ok(())
    }

    fn interrupt(&mut self) -> Result<(), SessionError> {
        let Some(process) = &self.process else {
            return Err(SessionError::NotRunning);
        };
        match process.interrupt() {
            Ok(()) => Ok(()),
            Err(e) => {
                tracing::warn!("signal interrupt failed ({e}); using -exec-interrupt");
                self.session.command_interrupt()
            }
        }
    }

    fn handle_transport(&mut self, ev: TransportEvent) {
        match ev {
            TransportEvent::Started { pid } => tracing::debug!("late start event (pid {pid:?})"),
            TransportEvent::Stdout(line) => self.session.handle_line(&line),
            TransportEvent::Stderr(line) => self.session.handle_stderr(&line),
            TransportEvent::InterruptFailed(reason) => {
                tracing::warn!("interrupt helper failed ({reason}); using -exec-interrupt");
                if let Err(e) = self.session.command_interrupt() {
                    tracing::warn!("cannot send -exec-interrupt: {e}");
                }
            }
            TransportEvent::Exited { code } => {
                self.process = None;
                self.quit_deadline = None;
                self.session.process_exited(code);
            }
        }
    }

    /// Write queued command lines and publish queued events.
    async fn flush(&mut self) {
        for line in self.session.take_outgoing() {
            match &self.process {
                Some(process) => {
                    if let Err(e) = process.send(&line).await {
                        tracing::warn!("dropping command {line:?}: {e}");
                    }
                }
                None => tracing::warn!("no debugger process for {line:?}"),
            }
        }
        for ev in self.session.take_events() {
            // No subscribers is fine.
            let _ = self.events.send(ev);
        }
    }
}

async fn recv_transport(rx: &mut Option<mpsc::Receiver<TransportEvent>>) -> Option<TransportEvent> {
    match rx {
        Some(rx) => rx.recv().await,
        None => std::future::pending().await,
    }
}

async fn sleep_until(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => tokio::time::sleep_until(deadline).await,
        None => std::future::pending().await,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config_with(command: &str) -> Config {
        let mut config = Config::default();
        config.debugger.command = command.to_string();
        config
    }

    #[tokio::test]
    async fn commands_before_start_fail() {
        let manager = DebugManager::new(Config::default());
        assert!(matches!(
            manager.command("-gdb-version").await,
            Err(SessionError::NotRunning)
        ));
        assert!(matches!(
            manager.command_interrupt().await,
            Err(SessionError::NotRunning)
        ));
        let snap = manager.snapshot().await.unwrap();
        assert_eq!(snap.state, crate::session::SessionState::Idle);
    }

    #[tokio::test]
    async fn spawn_failure_terminates_session() {
        let manager = DebugManager::new(config_with("/nonexistent/gdbfront-test-gdb"));
        let mut events = manager.subscribe();

        let err = manager.launch_local().await.unwrap_err();
        assert!(matches!(err, SessionError::ProcessSpawnFailure(_)));

        assert!(matches!(events.recv().await.unwrap(), DebugEvent::Error(_)));
        assert_eq!(events.recv().await.unwrap(), DebugEvent::SessionTerminated);

        assert!(matches!(
            manager.command("info").await,
            Err(SessionError::SessionTerminated)
        ));
        assert!(matches!(manager.start().await, Err(SessionError::SessionTerminated)));
    }

    #[tokio::test]
    async fn quit_without_process_terminates() {
        let manager = DebugManager::new(Config::default());
        let mut events = manager.subscribe();
        manager.quit().await.unwrap();
        assert_eq!(events.recv().await.unwrap(), DebugEvent::SessionTerminated);
        assert!(matches!(manager.quit().await, Err(SessionError::SessionTerminated)));
    }
}
