//! Typed projections of MI values.
//!
//! Every projection is a pure function of a [`Value`]. Missing fields take
//! defaults; a value without the identity field produces an instance whose
//! `is_valid()` returns `false`.

use indexmap::IndexMap;

use crate::value::{Tuple, Value};

fn text(v: &Value, key: &str) -> String {
    v.get_str(key).unwrap_or_default().to_string()
}

fn int(v: &Value, key: &str) -> i32 {
    v.get_str(key)
        .and_then(|s| s.trim().parse().ok())
        .unwrap_or(-1)
}

fn count(v: &Value, key: &str) -> u32 {
    v.get_str(key)
        .and_then(|s| s.trim().parse().ok())
        .unwrap_or(0)
}

/// Parse `0x…` (or plain hex) addresses; `<PENDING>` and friends map to 0.
fn address(v: &Value, key: &str) -> u64 {
    let Some(s) = v.get_str(key) else {
        return 0;
    };
    let s = s.trim();
    let hex = s
        .strip_prefix("0x")
        .or_else(|| s.strip_prefix("0X"))
        .unwrap_or(s);
    u64::from_str_radix(hex, 16).unwrap_or(0)
}

/// Builder for `to_value` output that skips default fields.
#[derive(Default)]
struct TupleBuilder(Tuple);

impl TupleBuilder {
    fn text(mut self, key: &str, value: &str) -> Self {
        if !value.is_empty() {
            self.0.insert(key.to_string(), Value::from(value));
        }
        self
    }

    fn int(mut self, key: &str, value: i32) -> Self {
        if value != -1 {
            self.0.insert(key.to_string(), Value::from(value.to_string()));
        }
        self
    }

    fn raw(mut self, key: &str, value: Value) -> Self {
        self.0.insert(key.to_string(), value);
        self
    }

    fn build(self) -> Value {
        Value::Tuple(self.0)
    }
}

/// A local variable or argument.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Variable {
    pub name: String,
    /// C type, present only when GDB was asked for types.
    pub type_name: String,
    pub value: String,
}

impl Variable {
    pub fn is_valid(&self) -> bool {
        !self.name.is_empty() && !self.value.is_empty()
    }

    /// Project a `{name=,type=,value=}` tuple.
    pub fn from_value(v: &Value) -> Self {
        Self {
            name: text(v, "name"),
            type_name: text(v, "type"),
            value: text(v, "value"),
        }
    }

    pub fn to_value(&self) -> Value {
        TupleBuilder::default()
            .text("name", &self.name)
            .text("type", &self.type_name)
            .text("value", &self.value)
            .build()
    }
}

/// One stack frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    /// Depth from the innermost frame; `-1` when not parsed.
    pub level: i32,
    pub function: String,
    pub address: u64,
    /// Argument name → value, in declaration order.
    pub params: IndexMap<String, String>,
    pub file: String,
    pub fullpath: String,
    pub line: i32,
}

impl Default for Frame {
    fn default() -> Self {
        Self {
            level: -1,
            function: String::new(),
            address: 0,
            params: IndexMap::new(),
            file: String::new(),
            fullpath: String::new(),
            line: -1,
        }
    }
}

impl Frame {
    pub fn is_valid(&self) -> bool {
        self.level != -1
    }

    /// Project a frame tuple as found in `*stopped` and `-stack-list-frames`.
    pub fn from_value(v: &Value) -> Self {
        let params = v
            .items("args")
            .iter()
            .map(|arg| arg.named("arg"))
            .filter_map(|arg| Some((arg.get_str("name")?.to_string(), text(arg, "value"))))
            .collect();
        Self {
            level: int(v, "level"),
            function: text(v, "func"),
            address: address(v, "addr"),
            params,
            file: text(v, "file"),
            fullpath: text(v, "fullname"),
            line: int(v, "line"),
        }
    }

    pub fn to_value(&self) -> Value {
        let args = self
            .params
            .iter()
            .map(|(name, value)| {
                Value::from_iter([
                    ("name".to_string(), Value::from(name.as_str())),
                    ("value".to_string(), Value::from(value.as_str())),
                ])
            })
            .collect::<Vec<_>>();
        let mut b = TupleBuilder::default().int("level", self.level);
        if self.address != 0 {
            b = b.text("addr", &format!("{:#x}", self.address));
        }
        b = b.text("func", &self.function);
        if !args.is_empty() {
            b = b.raw("args", Value::List(args));
        }
        b.text("file", &self.file)
            .text("fullname", &self.fullpath)
            .int("line", self.line)
            .build()
    }
}

/// What happens to a breakpoint after it is hit.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Disposition {
    #[default]
    Keep,
    /// Temporary breakpoint, deleted on hit (`disp="del"`).
    Delete,
}

impl Disposition {
    pub fn from_name(name: &str) -> Self {
        match name {
            "del" => Self::Delete,
            _ => Self::Keep,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Keep => "keep",
            Self::Delete => "del",
        }
    }
}

/// A breakpoint as reported by `-break-insert` or `=breakpoint-*`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Breakpoint {
    /// GDB breakpoint number; `-1` when not parsed.
    pub number: i32,
    /// `breakpoint`, `hw breakpoint`, `watchpoint`, ...
    pub kind: String,
    pub disposition: Disposition,
    pub enabled: bool,
    pub address: u64,
    pub function: String,
    pub file: String,
    pub fullname: String,
    pub line: i32,
    pub thread_groups: Vec<String>,
    pub hit_count: u32,
    pub original_location: String,
    /// Resolved locations of a multi-location breakpoint (`addr="<MULTIPLE>"`).
    pub locations: Vec<BreakpointLocation>,
}

impl Default for Breakpoint {
    fn default() -> Self {
        Self {
            number: -1,
            kind: String::new(),
            disposition: Disposition::Keep,
            enabled: false,
            address: 0,
            function: String::new(),
            file: String::new(),
            fullname: String::new(),
            line: -1,
            thread_groups: Vec::new(),
            hit_count: 0,
            original_location: String::new(),
            locations: Vec::new(),
        }
    }
}

impl Breakpoint {
    pub fn is_valid(&self) -> bool {
        self.number != -1
    }

    /// Whether this breakpoint sits at `path:line`, matching either the
    /// resolved full name or the file name GDB reported.
    pub fn is_at(&self, path: &str, line: i32) -> bool {
        (self.line == line && (self.fullname == path || self.file == path))
            || self.locations.iter().any(|l| l.is_at(path, line))
    }

    /// Whether this breakpoint, or any of its locations, is in `path`.
    pub fn in_file(&self, path: &str) -> bool {
        self.fullname == path
            || self.file == path
            || self.locations.iter().any(|l| l.fullname == path || l.file == path)
    }

    /// Project a `bkpt={...}` tuple.
    pub fn from_value(v: &Value) -> Self {
        Self {
            number: int(v, "number"),
            kind: text(v, "type"),
            disposition: Disposition::from_name(v.get_str("disp").unwrap_or_default()),
            enabled: v.get_str("enabled") == Some("y"),
            address: address(v, "addr"),
            function: text(v, "func"),
            file: text(v, "file"),
            fullname: text(v, "fullname"),
            line: int(v, "line"),
            thread_groups: v
                .items("thread-groups")
                .iter()
                .filter_map(|g| g.as_str().map(str::to_string))
                .collect(),
            hit_count: count(v, "times"),
            original_location: text(v, "original-location"),
            locations: v
                .items("locations")
                .iter()
                .map(BreakpointLocation::from_value)
                .collect(),
        }
    }

    pub fn to_value(&self) -> Value {
        let mut b = TupleBuilder::default()
            .int("number", self.number)
            .text("type", &self.kind)
            .text("disp", self.disposition.as_str())
            .text("enabled", if self.enabled { "y" } else { "n" });
        if self.address != 0 {
            b = b.text("addr", &format!("{:#x}", self.address));
        }
        let groups = self
            .thread_groups
            .iter()
            .map(|g| Value::from(g.as_str()))
            .collect::<Vec<_>>();
        b = b
            .text("func", &self.function)
            .text("file", &self.file)
            .text("fullname", &self.fullname)
            .int("line", self.line)
            .raw("thread-groups", Value::List(groups))
            .text("times", &self.hit_count.to_string())
            .text("original-location", &self.original_location);
        if !self.locations.is_empty() {
            let locations = self.locations.iter().map(BreakpointLocation::to_value).collect();
            b = b.raw("locations", Value::List(locations));
        }
        b.build()
    }
}

/// One resolved location of a multi-location breakpoint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BreakpointLocation {
    /// `<breakpoint>.<location>`, e.g. `1.2`.
    pub number: String,
    pub enabled: bool,
    pub address: u64,
    pub function: String,
    pub file: String,
    pub fullname: String,
    pub line: i32,
    pub thread_groups: Vec<String>,
}

impl BreakpointLocation {
    pub fn is_at(&self, path: &str, line: i32) -> bool {
        self.line == line && (self.fullname == path || self.file == path)
    }

    pub fn from_value(v: &Value) -> Self {
        Self {
            number: text(v, "number"),
            enabled: v.get_str("enabled") == Some("y"),
            address: address(v, "addr"),
            function: text(v, "func"),
            file: text(v, "file"),
            fullname: text(v, "fullname"),
            line: int(v, "line"),
            thread_groups: v
                .items("thread-groups")
                .iter()
                .filter_map(|g| g.as_str().map(str::to_string))
                .collect(),
        }
    }

    pub fn to_value(&self) -> Value {
        let mut b = TupleBuilder::default()
            .text("number", &self.number)
            .text("enabled", if self.enabled { "y" } else { "n" });
        if self.address != 0 {
            b = b.text("addr", &format!("{:#x}", self.address));
        }
        let groups = self
            .thread_groups
            .iter()
            .map(|g| Value::from(g.as_str()))
            .collect::<Vec<_>>();
        b.text("func", &self.function)
            .text("file", &self.file)
            .text("fullname", &self.fullname)
            .int("line", self.line)
            .raw("thread-groups", Value::List(groups))
            .build()
    }
}

/// Run state of a single thread.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ThreadState {
    #[default]
    Unknown,
    Stopped,
    Running,
}

impl ThreadState {
    pub fn from_name(name: &str) -> Self {
        match name {
            "stopped" => Self::Stopped,
            "running" => Self::Running,
            _ => Self::Unknown,
        }
    }
}

/// A thread of the debuggee.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Thread {
    /// GDB global thread id; `-1` when not parsed.
    pub id: i32,
    pub target_id: String,
    pub details: String,
    pub name: String,
    pub state: ThreadState,
    pub frame: Frame,
    pub core: i32,
}

impl Default for Thread {
    fn default() -> Self {
        Self {
            id: -1,
            target_id: String::new(),
            details: String::new(),
            name: String::new(),
            state: ThreadState::Unknown,
            frame: Frame::default(),
            core: -1,
        }
    }
}

impl Thread {
    pub fn is_valid(&self) -> bool {
        self.id != -1
    }

    /// Project an element of `-thread-info`'s `threads=[...]`.
    pub fn from_value(v: &Value) -> Self {
        Self {
            id: int(v, "id"),
            target_id: text(v, "target-id"),
            details: text(v, "details"),
            name: text(v, "name"),
            state: ThreadState::from_name(v.get_str("state").unwrap_or_default()),
            frame: v.get("frame").map(Frame::from_value).unwrap_or_default(),
            core: int(v, "core"),
        }
    }

    pub fn to_value(&self) -> Value {
        let state = match self.state {
            ThreadState::Unknown => "",
            ThreadState::Stopped => "stopped",
            ThreadState::Running => "running",
        };
        let mut b = TupleBuilder::default()
            .int("id", self.id)
            .text("target-id", &self.target_id)
            .text("details", &self.details)
            .text("name", &self.name);
        if self.frame.is_valid() {
            b = b.raw("frame", self.frame.to_value());
        }
        b.text("state", state).int("core", self.core).build()
    }
}
