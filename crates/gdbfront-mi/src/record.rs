//! MI output line classification.

use crate::error::ParseError;
use crate::value::{c_string_from, parse_results_from, Value};

/// Caller-chosen integer echoed back on a result record.
pub type Token = u64;

/// The prompt GDB prints once it is ready for the next command.
const PROMPT: &str = "(gdb)";

/// Status of a `^` result record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResultClass {
    Done,
    Running,
    Connected,
    Error,
    Exit,
}

impl ResultClass {
    /// Map an MI class name (`done`, `error`, ...) to its variant.
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "done" => Some(Self::Done),
            "running" => Some(Self::Running),
            "connected" => Some(Self::Connected),
            "error" => Some(Self::Error),
            "exit" => Some(Self::Exit),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Done => "done",
            Self::Running => "running",
            Self::Connected => "connected",
            Self::Error => "error",
            Self::Exit => "exit",
        }
    }
}

/// Class of an `*` exec-async record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AsyncClass {
    Running,
    Stopped,
}

impl AsyncClass {
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "running" => Some(Self::Running),
            "stopped" => Some(Self::Stopped),
            _ => None,
        }
    }
}

/// One classified line of MI output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Record {
    /// `[token]^class[,results]`
    Result {
        token: Option<Token>,
        class: ResultClass,
        payload: Value,
    },
    /// `[token]*class[,results]`
    AsyncExec {
        token: Option<Token>,
        class: AsyncClass,
        payload: Value,
    },
    /// `=class[,results]`
    AsyncNotify { class: String, payload: Value },
    /// `~"text"`
    ConsoleStream(String),
    /// `@"text"`
    TargetStream(String),
    /// `&"text"`
    LogStream(String),
    /// `(gdb)`
    GdbPrompt,
}

/// Parse one line of debugger output (line terminator already removed).
///
/// Lines that do not start like any MI record are returned as
/// [`Record::ConsoleStream`] holding the raw text. Lines that start like a
/// record but are malformed yield a [`ParseError`].
pub fn parse_line(line: &str) -> Result<Record, ParseError> {
    let line = line.strip_suffix('\r').unwrap_or(line);
    if line.trim_end() == PROMPT {
        return Ok(Record::GdbPrompt);
    }

    let digits = line.bytes().take_while(u8::is_ascii_digit).count();
    let token = if digits > 0 {
        match line[..digits].parse::<Token>() {
            Ok(t) => Some(t),
            Err(_) => return Ok(raw(line)),
        }
    } else {
        None
    };

    let Some(marker) = line.as_bytes().get(digits).copied() else {
        return Ok(raw(line));
    };
    let body = digits + 1;

    match marker {
        b'^' => {
            let (name, payload) = class_and_payload(line, body)?;
            let class = ResultClass::from_name(name).ok_or_else(|| {
                ParseError::new(format!("unknown result class `{name}`"), line, body)
            })?;
            Ok(Record::Result {
                token,
                class,
                payload,
            })
        }
        b'*' => {
            let (name, payload) = class_and_payload(line, body)?;
            let class = AsyncClass::from_name(name).ok_or_else(|| {
                ParseError::new(format!("unknown async class `{name}`"), line, body)
            })?;
            Ok(Record::AsyncExec {
                token,
                class,
                payload,
            })
        }
        b'=' => {
            let (name, payload) = class_and_payload(line, body)?;
            if name.is_empty() {
                return Err(ParseError::new("missing notification class", line, body));
            }
            Ok(Record::AsyncNotify {
                class: name.to_string(),
                payload,
            })
        }
        b'~' if token.is_none() => Ok(Record::ConsoleStream(c_string_from(line, body)?)),
        b'@' if token.is_none() => Ok(Record::TargetStream(c_string_from(line, body)?)),
        b'&' if token.is_none() => Ok(Record::LogStream(c_string_from(line, body)?)),
        _ => Ok(raw(line)),
    }
}

fn raw(line: &str) -> Record {
    Record::ConsoleStream(line.to_string())
}

/// Split `class[,results]` starting at byte `start`.
fn class_and_payload(line: &str, start: usize) -> Result<(&str, Value), ParseError> {
    let rest = &line[start..];
    match rest.find(',') {
        Some(comma) => {
            let name = &rest[..comma];
            let results = parse_results_from(line, start + comma + 1)?;
            Ok((name, Value::Tuple(results)))
        }
        None => Ok((rest, Value::empty_tuple())),
    }
}
