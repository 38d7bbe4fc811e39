use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Log verbosity level.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogLevel {
    /// Most verbose; includes every MI line.
    Trace,
    Debug,
    /// Informational messages (default).
    #[default]
    Info,
    Warn,
    Error,
}

impl LogLevel {
    /// The matching `tracing` filter directive.
    pub fn as_filter(self) -> &'static str {
        match self {
            LogLevel::Trace => "trace",
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Warn => "warn",
            LogLevel::Error => "error",
        }
    }
}

/// How to start the debugger process.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DebuggerConfig {
    /// Debugger executable, looked up on `PATH` when not absolute.
    #[serde(default = "default_command")]
    pub command: String,
    /// Arguments passed to the debugger. Must select an MI interpreter.
    #[serde(default = "default_args")]
    pub args: Vec<String>,
    /// Command run with the debugger pid as its only argument to deliver an
    /// interrupt on platforms without POSIX signals.
    #[serde(default)]
    pub interrupt_helper: Option<String>,
}

fn default_command() -> String {
    "gdb".to_string()
}

fn default_args() -> Vec<String> {
    vec!["--interpreter=mi2".to_string(), "-q".to_string()]
}

impl Default for DebuggerConfig {
    fn default() -> Self {
        Self {
            command: default_command(),
            args: default_args(),
            interrupt_helper: None,
        }
    }
}

/// What to debug.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LaunchConfig {
    /// Program loaded with `-file-exec-and-symbols`.
    #[serde(default)]
    pub executable: Option<PathBuf>,
    /// Debugger commands sent once after startup, one per line.
    #[serde(default)]
    pub init_script: String,
    /// `host:port` (or any `target remote` argument) for remote sessions.
    #[serde(default)]
    pub remote_target: Option<String>,
}

impl LaunchConfig {
    /// Init-script lines worth sending: non-blank and not `#` comments.
    pub fn init_commands(&self) -> impl Iterator<Item = &str> {
        self.init_script
            .lines()
            .map(str::trim)
            .filter(|l| !l.is_empty() && !l.starts_with('#'))
    }
}

/// Session behaviour.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionConfig {
    /// First token handed out to tracked commands. Tokens below it are
    /// reserved for fixed tokens.
    #[serde(default = "default_token_base")]
    pub token_base: u64,
    /// Refresh threads, stack and locals after every stop.
    #[serde(default = "default_true")]
    pub refresh_on_stop: bool,
    /// How long `quit` waits for the debugger to exit before killing it.
    #[serde(default = "default_quit_grace_ms")]
    pub quit_grace_ms: u64,
}

fn default_token_base() -> u64 {
    100
}

fn default_true() -> bool {
    true
}

fn default_quit_grace_ms() -> u64 {
    2000
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            token_base: default_token_base(),
            refresh_on_stop: true,
            quit_grace_ms: default_quit_grace_ms(),
        }
    }
}

/// Logging configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LogConfig {
    /// Log verbosity level.
    #[serde(default)]
    pub level: LogLevel,
    /// Optional path to a log file.
    pub file: Option<PathBuf>,
}

/// Top-level gdbfront configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub debugger: DebuggerConfig,
    #[serde(default)]
    pub launch: LaunchConfig,
    #[serde(default)]
    pub session: SessionConfig,
    #[serde(default)]
    pub log: LogConfig,
}
