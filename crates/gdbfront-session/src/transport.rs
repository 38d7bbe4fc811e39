//! Debugger subprocess with line-oriented stdout/stderr.
//!
//! Each stream is read by its own task and reassembled into lines; a
//! writer task owns stdin. All output arrives on one event channel, ending
//! with a single `Exited` after both streams are drained.
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tokio::io::{AsyncRead, AsyncReadExt, AsyncWriteExt};
use tokio::process::Command as TokioCommand;
use tokio::sync::{mpsc, oneshot};

use crate::error::SessionError;

const EVENT_CHANNEL_CAPACITY: usize = 256;
const READ_CHUNK: usize = 4096;

/// Longest unterminated line held back before it is emitted as is.
pub const MAX_PENDING_LINE: usize = 1 << 20;

/// Reassembles byte chunks into complete lines.
#[derive(Debug)]
pub struct LineBuffer {
    buf: Vec<u8>,
    /// `buf[..scanned]` holds no terminator.
    scanned: usize,
    limit: usize,
}

impl Default for LineBuffer {
    fn default() -> Self {
        Self::with_limit(MAX_PENDING_LINE)
    }
}

impl LineBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// A buffer that splits unterminated input every `limit` bytes.
    pub fn with_limit(limit: usize) -> Self {
        Self {
            buf: Vec::new(),
            scanned: 0,
            limit: limit.max(1),
        }
    }

    /// Append `chunk` and return every line it completed, terminators
    /// (`\n` or `\r\n`) removed. Pending input longer than the limit is
    /// returned in limit-sized pieces.
    pub fn push(&mut self, chunk: &[u8]) -> Vec<String> {
        self.buf.extend_from_slice(chunk);
        let mut lines = Vec::new();
        let mut start = 0;
        while let Some(offset) = self.buf[self.scanned..].iter().position(|&b| b == b'\n') {
            let end = self.scanned + offset;
            lines.push(decode(&self.buf[start..end]));
            start = end + 1;
            self.scanned = start;
        }
        self.buf.drain(..start);

        if self.buf.len() > self.limit {
            tracing::warn!("splitting {} bytes of output without a newline", self.buf.len());
            while self.buf.len() > self.limit {
                let piece: Vec<u8> = self.buf.drain(..self.limit).collect();
                lines.push(String::from_utf8_lossy(&piece).into_owned());
            }
        }
        self.scanned = self.buf.len();
        lines
    }

    /// The unterminated tail left at end of stream, if any.
    pub fn finish(&mut self) -> Option<String> {
        self.scanned = 0;
        if self.buf.is_empty() {
            return None;
        }
        let raw = std::mem::take(&mut self.buf);
        Some(decode(&raw))
    }

    /// Bytes held back waiting for a terminator.
    pub fn pending_len(&self) -> usize {
        self.buf.len()
    }
}

fn decode(raw: &[u8]) -> String {
    let raw = raw.strip_suffix(b"\r").unwrap_or(raw);
    String::from_utf8_lossy(raw).into_owned()
}

/// Lifecycle and output of a [`DebuggerProcess`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportEvent {
    /// Always the first event.
    Started { pid: Option<u32> },
    Stdout(String),
    Stderr(String),
    /// The interrupt helper ran but reported failure.
    InterruptFailed(String),
    /// Always the last event. `code` is `None` when killed by a signal.
    Exited { code: Option<i32> },
}

/// A running debugger child process.
pub struct DebuggerProcess {
    writer_tx: mpsc::Sender<String>,
    events: mpsc::WeakSender<TransportEvent>,
    kill_tx: Option<oneshot::Sender<()>>,
    pid: Option<u32>,
    interrupt_helper: Option<String>,
    running: Arc<AtomicBool>,
}

impl DebuggerProcess {
    /// Spawn `command args..` with piped stdio.
    ///
    /// The returned receiver yields `Started` first. Dropping the process
    /// handle kills the child.
    ///
    /// # Errors
    ///
    /// `ProcessSpawnFailure` when the binary cannot be started.
    pub async fn spawn(
        command: &str,
        args: &[String],
        interrupt_helper: Option<String>,
    ) -> Result<(Self, mpsc::Receiver<TransportEvent>), SessionError> {
        let mut child = TokioCommand::new(command)
            .args(args)
            .stdin(std::process::Stdio::piped())
            .stdout(std::process::Stdio::piped())
            .stderr(std::process::Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(SessionError::ProcessSpawnFailure)?;

        let missing = |what: &str| {
            SessionError::ProcessSpawnFailure(std::io::Error::new(
                std::io::ErrorKind::BrokenPipe,
                format!("could not capture {what}"),
            ))
        };
        let stdin = child.stdin.take().ok_or_else(|| missing("stdin"))?;
        let stdout = child.stdout.take().ok_or_else(|| missing("stdout"))?;
        let stderr = child.stderr.take().ok_or_else(|| missing("stderr"))?;
        let pid = child.id();
        tracing::info!("spawned {command} (pid {pid:?})");

        let (events_tx, events_rx) = mpsc::channel(EVENT_CHANNEL_CAPACITY);
        let weak_events = events_tx.downgrade();
        // The channel is empty, so this cannot wait.
        let _ = events_tx.send(TransportEvent::Started { pid }).await;

        let (writer_tx, mut writer_rx) = mpsc::channel::<String>(64);
        tokio::spawn(async move {
            let mut stdin = stdin;
            while let Some(line) = writer_rx.recv().await {
                if stdin.write_all(line.as_bytes()).await.is_err() {
                    break;
                }
                if stdin.flush().await.is_err() {
                    break;
                }
            }
        });

        let stdout_task = tokio::spawn(pump(stdout, events_tx.clone(), TransportEvent::Stdout));
        let stderr_task = tokio::spawn(pump(stderr, events_tx.clone(), TransportEvent::Stderr));

        let running = Arc::new(AtomicBool::new(true));
        let (kill_tx, kill_rx) = oneshot::channel::<()>();
        let exit_flag = running.clone();
        tokio::spawn(async move {
            let status = tokio::select! {
                status = child.wait() => status,
                _ = kill_rx => {
                    if let Err(e) = child.start_kill() {
                        tracing::warn!("failed to kill debugger: {e}");
                    }
                    child.wait().await
                }
            };
            let _ = stdout_task.await;
            let _ = stderr_task.await;
            exit_flag.store(false, Ordering::SeqCst);
            let code = match status {
                Ok(status) => status.code(),
                Err(e) => {
                    tracing::warn!("waiting for debugger failed: {e}");
                    None
                }
            };
            tracing::info!("debugger exited with {code:?}");
            let _ = events_tx.send(TransportEvent::Exited { code }).await;
        });

        Ok((
            Self {
                writer_tx,
                events: weak_events,
                kill_tx: Some(kill_tx),
                pid,
                interrupt_helper,
                running,
            },
            events_rx,
        ))
    }

    pub fn pid(&self) -> Option<u32> {
        self.pid
    }

    /// `false` once the child has exited and its output was drained.
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// Write `text` followed by a newline.
    ///
    /// # Errors
    ///
    /// `NotRunning` once the process has exited.
    pub async fn send(&self, text: &str) -> Result<(), SessionError> {
        if !self.is_running() {
            return Err(SessionError::NotRunning);
        }
        self.writer_tx
            .send(format!("{text}\n"))
            .await
            .map_err(|_| SessionError::NotRunning)
    }

    /// Ask the debugger to interrupt the inferior.
    ///
    /// Starts the configured interrupt helper with the child pid when there
    /// is one, and sends `SIGINT` otherwise. The helper runs in the
    /// background; a failing helper is reported as `InterruptFailed`.
    ///
    /// # Errors
    ///
    /// `NotRunning` when the process has exited, `Transport` when the
    /// interrupt could not be delivered.
    pub fn interrupt(&self) -> Result<(), SessionError> {
        if !self.is_running() {
            return Err(SessionError::NotRunning);
        }
        let pid = self.pid.ok_or(SessionError::NotRunning)?;
        match &self.interrupt_helper {
            Some(helper) => self.run_interrupt_helper(helper, pid),
            None => send_sigint(pid),
        }
    }

    fn run_interrupt_helper(&self, helper: &str, pid: u32) -> Result<(), SessionError> {
        let mut child = TokioCommand::new(helper)
            .arg(pid.to_string())
            .stdin(std::process::Stdio::null())
            .stdout(std::process::Stdio::null())
            .spawn()
            .map_err(|e| SessionError::Transport(format!("{helper}: {e}")))?;

        let helper = helper.to_string();
        let events = self.events.clone();
        let running = self.running.clone();
        tokio::spawn(async move {
            let failure = match child.wait().await {
                Ok(status) if status.success() => return,
                Ok(status) => format!("{helper} exited with {status}"),
                Err(e) => format!("{helper}: {e}"),
            };
            tracing::warn!("interrupt helper failed: {failure}");
            if !running.load(Ordering::SeqCst) {
                return;
            }
            if let Some(tx) = events.upgrade() {
                let _ = tx.send(TransportEvent::InterruptFailed(failure)).await;
            }
        });
        Ok(())
    }

    /// Force the child to terminate. `Exited` still follows.
    pub fn kill(&mut self) {
        if let Some(tx) = self.kill_tx.take() {
            let _ = tx.send(());
        }
    }
}

#[cfg(unix)]
fn send_sigint(pid: u32) -> Result<(), SessionError> {
    use nix::sys::signal::{kill, Signal};
    use nix::unistd::Pid;

    let raw = i32::try_from(pid).map_err(|_| SessionError::Transport(format!("bad pid {pid}")))?;
    kill(Pid::from_raw(raw), Signal::SIGINT).map_err(|e| SessionError::Transport(e.to_string()))
}

#[cfg(not(unix))]
fn send_sigint(_pid: u32) -> Result<(), SessionError> {
    Err(SessionError::Transport(
        "no interrupt helper configured".to_string(),
    ))
}

async fn pump<R>(mut reader: R, tx: mpsc::Sender<TransportEvent>, wrap: fn(String) -> TransportEvent)
where
    R: AsyncRead + Unpin,
{
    let mut lines = LineBuffer::new();
    let mut chunk = vec![0u8; READ_CHUNK];
    loop {
        match reader.read(&mut chunk).await {
            Ok(0) => break,
            Ok(n) => {
                for line in lines.push(&chunk[..n]) {
                    if tx.send(wrap(line)).await.is_err() {
                        return;
                    }
                }
            }
            Err(e) => {
                tracing::warn!("debugger output read failed: {e}");
                break;
            }
        }
    }
    if let Some(tail) = lines.finish() {
        let _ = tx.send(wrap(tail)).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn line_buffer_splits_complete_lines() {
        let mut buf = LineBuffer::new();
        let lines = buf.push(b"^done\n(gdb) \n");
        assert_eq!(lines, vec!["^done", "(gdb) "]);
        assert_eq!(buf.pending_len(), 0);
    }

    #[test]
    fn line_buffer_holds_partial_line() {
        let mut buf = LineBuffer::new();
        assert!(buf.push(b"~\"Hello ").is_empty());
        assert_eq!(buf.pending_len(), 8);
        assert_eq!(buf.push(b"world\\n\"\r\n=x"), vec!["~\"Hello world\\n\""]);
        assert_eq!(buf.finish().as_deref(), Some("=x"));
        assert!(buf.finish().is_none());
    }

    #[test]
    fn line_buffer_reassembles_any_split() {
        let text = b"12^done,bkpt={number=\"1\"}\r\n*stopped,reason=\"end-stepping-range\"\n";
        for split in 0..text.len() {
            let mut buf = LineBuffer::new();
            let mut lines = buf.push(&text[..split]);
            lines.extend(buf.push(&text[split..]));
            assert_eq!(
                lines,
                vec![
                    "12^done,bkpt={number=\"1\"}",
                    "*stopped,reason=\"end-stepping-range\""
                ],
                "split at {split}"
            );
        }
    }

    #[test]
    fn line_buffer_keeps_utf8_split_across_chunks() {
        let mut buf = LineBuffer::new();
        let text = "~\"é\"\n".as_bytes();
        assert!(buf.push(&text[..3]).is_empty());
        assert_eq!(buf.push(&text[3..]), vec!["~\"é\""]);
    }

    #[test]
    fn line_buffer_replaces_invalid_utf8() {
        let mut buf = LineBuffer::new();
        assert_eq!(buf.push(b"a\xffb\n"), vec!["a\u{fffd}b"]);
    }

    #[test]
    fn line_buffer_long_line_in_small_pushes() {
        let mut buf = LineBuffer::new();
        for _ in 0..10_000 {
            assert!(buf.push(b"x").is_empty());
        }
        assert_eq!(buf.pending_len(), 10_000);
        let lines = buf.push(b"\r\nnext");
        assert_eq!(lines, vec!["x".repeat(10_000)]);
        assert_eq!(buf.pending_len(), 4);
    }

    #[test]
    fn line_buffer_splits_at_limit() {
        let mut buf = LineBuffer::with_limit(4);
        assert_eq!(buf.push(b"abcdefghij"), vec!["abcd", "efgh"]);
        assert_eq!(buf.pending_len(), 2);
        assert_eq!(buf.push(b"k\nlonger line\n"), vec!["ijk", "longer line"]);
        assert_eq!(buf.pending_len(), 0);
    }

    #[test]
    fn line_buffer_empty_lines() {
        let mut buf = LineBuffer::new();
        assert_eq!(buf.push(b"\n\r\n"), vec!["", ""]);
    }

    #[tokio::test]
    async fn spawn_missing_binary_fails() {
        let result = DebuggerProcess::spawn("/nonexistent/gdbfront-gdb", &[], None).await;
        assert!(matches!(result, Err(SessionError::ProcessSpawnFailure(_))));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn echo_process_lifecycle() {
        let args = vec!["-c".to_string(), "read line; echo \"got $line\"; echo oops >&2".to_string()];
        let (process, mut rx) = DebuggerProcess::spawn("sh", &args, None).await.unwrap();
        assert!(matches!(rx.recv().await, Some(TransportEvent::Started { pid: Some(_) })));
        process.send("-gdb-version").await.unwrap();

        let mut stdout = Vec::new();
        let mut stderr = Vec::new();
        let code = loop {
            match rx.recv().await {
                Some(TransportEvent::Stdout(l)) => stdout.push(l),
                Some(TransportEvent::Stderr(l)) => stderr.push(l),
                Some(TransportEvent::Exited { code }) => break code,
                Some(TransportEvent::Started { .. }) => panic!("started twice"),
                Some(TransportEvent::InterruptFailed(r)) => panic!("unexpected interrupt failure: {r}"),
                None => panic!("channel closed before exit"),
            }
        };
        assert_eq!(stdout, vec!["got -gdb-version"]);
        assert_eq!(stderr, vec!["oops"]);
        assert_eq!(code, Some(0));
        assert!(rx.recv().await.is_none());
        assert!(!process.is_running());
        assert!(matches!(process.send("x").await, Err(SessionError::NotRunning)));
        assert!(matches!(process.interrupt(), Err(SessionError::NotRunning)));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn kill_terminates_child() {
        let args = vec!["-c".to_string(), "exec sleep 30".to_string()];
        let (mut process, mut rx) = DebuggerProcess::spawn("sh", &args, None).await.unwrap();
        assert!(matches!(rx.recv().await, Some(TransportEvent::Started { .. })));
        process.kill();
        let exited = tokio::time::timeout(std::time::Duration::from_secs(5), async {
            loop {
                if let Some(TransportEvent::Exited { code }) = rx.recv().await {
                    return code;
                }
            }
        })
        .await
        .unwrap();
        assert_eq!(exited, None);
    }

    #[cfg(unix)]
    const TRAP_SCRIPT: &str =
        "trap 'echo interrupted; exit 3' INT; echo ready; while :; do sleep 0.05; done";

    #[cfg(unix)]
    #[tokio::test]
    async fn interrupt_helper_receives_pid() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::TempDir::new().unwrap();
        let helper = dir.path().join("send-int");
        std::fs::write(&helper, "#!/bin/sh\nkill -INT \"$1\"\n").unwrap();
        std::fs::set_permissions(&helper, std::fs::Permissions::from_mode(0o755)).unwrap();

        let args = vec!["-c".to_string(), TRAP_SCRIPT.to_string()];
        let helper = Some(helper.to_string_lossy().into_owned());
        let (process, mut rx) = DebuggerProcess::spawn("sh", &args, helper).await.unwrap();
        assert!(matches!(rx.recv().await, Some(TransportEvent::Started { .. })));
        assert_eq!(rx.recv().await, Some(TransportEvent::Stdout("ready".into())));

        // A freshly written script can be briefly busy while other tests fork.
        let mut attempts = 0;
        while let Err(e) = process.interrupt() {
            attempts += 1;
            assert!(attempts < 20, "helper never started: {e}");
            tokio::time::sleep(std::time::Duration::from_millis(50)).await;
        }
        let mut events = Vec::new();
        tokio::time::timeout(std::time::Duration::from_secs(5), async {
            while let Some(ev) = rx.recv().await {
                let last = matches!(ev, TransportEvent::Exited { .. });
                events.push(ev);
                if last {
                    break;
                }
            }
        })
        .await
        .unwrap();
        assert!(events.contains(&TransportEvent::Stdout("interrupted".into())));
        assert_eq!(events.last(), Some(&TransportEvent::Exited { code: Some(3) }));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn failing_interrupt_helper_is_reported() {
        let args = vec!["-c".to_string(), "echo ready; exec sleep 30".to_string()];
        let (mut process, mut rx) = DebuggerProcess::spawn("sh", &args, Some("false".into()))
            .await
            .unwrap();
        assert!(matches!(rx.recv().await, Some(TransportEvent::Started { .. })));
        assert_eq!(rx.recv().await, Some(TransportEvent::Stdout("ready".into())));

        // Returns before the helper has finished.
        process.interrupt().unwrap();
        let failed = tokio::time::timeout(std::time::Duration::from_secs(5), rx.recv())
            .await
            .unwrap();
        match failed {
            Some(TransportEvent::InterruptFailed(reason)) => assert!(reason.starts_with("false exited")),
            other => panic!("expected InterruptFailed, got {other:?}"),
        }
        assert!(process.is_running());
        process.kill();
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn missing_interrupt_helper_is_an_error() {
        let args = vec!["-c".to_string(), "exec sleep 30".to_string()];
        let helper = Some("/nonexistent/gdbfront-interrupt".to_string());
        let (mut process, mut rx) = DebuggerProcess::spawn("sh", &args, helper).await.unwrap();
        assert!(matches!(rx.recv().await, Some(TransportEvent::Started { .. })));
        assert!(matches!(process.interrupt(), Err(SessionError::Transport(_))));
        process.kill();
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn interrupt_delivers_sigint() {
        let args = vec!["-c".to_string(), TRAP_SCRIPT.to_string()];
        let (process, mut rx) = DebuggerProcess::spawn("sh", &args, None).await.unwrap();
        assert!(matches!(rx.recv().await, Some(TransportEvent::Started { .. })));
        assert_eq!(rx.recv().await, Some(TransportEvent::Stdout("ready".into())));
        process.interrupt().unwrap();
        let events = tokio::time::timeout(std::time::Duration::from_secs(5), async {
            let mut events = Vec::new();
            while let Some(ev) = rx.recv().await {
                events.push(ev);
            }
            events
        })
        .await
        .unwrap();
        assert!(events.contains(&TransportEvent::Stdout("interrupted".into())));
        assert_eq!(events.last(), Some(&TransportEvent::Exited { code: Some(3) }));
    }
}
