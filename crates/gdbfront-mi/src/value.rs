//! MI value grammar: C-strings, `{...}` tuples and `[...]` lists.
//!
//! ```text
//! value   → c-string | tuple | list
//! tuple   → "{}" | "{" result ( "," result )* "}"
//! list    → "[]" | "[" item ( "," item )* "]"
//! item    → value | result
//! result  → name "=" value
//! ```
//!
//! A bare `result` inside a list is stored as a single-entry tuple so that
//! mixed lists stay representable.

use std::fmt;

use indexmap::IndexMap;

use crate::error::ParseError;

/// Ordered `name → value` mapping. Inserting an existing name replaces its
/// value in place.
pub type Tuple = IndexMap<String, Value>;

/// A decoded MI value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Value {
    /// A (unescaped) C-string.
    String(String),
    /// An ordered list.
    List(Vec<Value>),
    /// A `name=value` mapping.
    Tuple(Tuple),
}

impl Value {
    /// An empty tuple, the payload of records that carry no results.
    pub fn empty_tuple() -> Self {
        Value::Tuple(Tuple::new())
    }

    /// Look up `key` when this value is a tuple.
    pub fn get(&self, key: &str) -> Option<&Value> {
        match self {
            Value::Tuple(t) => t.get(key),
            _ => None,
        }
    }

    /// Look up `key` and return it when it is a string.
    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.get(key).and_then(Value::as_str)
    }

    /// The list stored under `key`, or an empty slice.
    pub fn items(&self, key: &str) -> &[Value] {
        self.get(key).and_then(Value::as_list).unwrap_or_default()
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s.as_str()),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[Value]> {
        match self {
            Value::List(items) => Some(items.as_slice()),
            _ => None,
        }
    }

    pub fn as_tuple(&self) -> Option<&Tuple> {
        match self {
            Value::Tuple(t) => Some(t),
            _ => None,
        }
    }

    /// Unwrap a list item written as `name=value`.
    ///
    /// Returns the inner value when `self` is a single-entry tuple keyed
    /// by `name`, and `self` otherwise.
    pub fn named(&self, name: &str) -> &Value {
        match self {
            Value::Tuple(t) if t.len() == 1 => t.get(name).unwrap_or(self),
            _ => self,
        }
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(s)
    }
}

impl From<Vec<Value>> for Value {
    fn from(items: Vec<Value>) -> Self {
        Value::List(items)
    }
}

impl From<Tuple> for Value {
    fn from(t: Tuple) -> Self {
        Value::Tuple(t)
    }
}

impl FromIterator<(String, Value)> for Value {
    fn from_iter<I: IntoIterator<Item = (String, Value)>>(iter: I) -> Self {
        Value::Tuple(iter.into_iter().collect())
    }
}

/// Renders the value back in MI syntax.
impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::String(s) => write_c_string(f, s),
            Value::List(items) => {
                f.write_str("[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        f.write_str(",")?;
                    }
                    write!(f, "{item}")?;
                }
                f.write_str("]")
            }
            Value::Tuple(t) => {
                f.write_str("{")?;
                for (i, (name, value)) in t.iter().enumerate() {
                    if i > 0 {
                        f.write_str(",")?;
                    }
                    write!(f, "{name}={value}")?;
                }
                f.write_str("}")
            }
        }
    }
}

fn write_c_string(f: &mut fmt::Formatter<'_>, s: &str) -> fmt::Result {
    f.write_str("\"")?;
    for c in s.chars() {
        match c {
            '"' => f.write_str("\\\"")?,
            '\\' => f.write_str("\\\\")?,
            '\n' => f.write_str("\\n")?,
            '\t' => f.write_str("\\t")?,
            '\r' => f.write_str("\\r")?,
            c if c.is_ascii_control() => write!(f, "\\{:03o}", c as u32)?,
            c => write!(f, "{c}")?,
        }
    }
    f.write_str("\"")
}

/// Parse a single MI value spanning all of `input`.
pub fn parse_value(input: &str) -> Result<Value, ParseError> {
    let mut parser = Parser::new(input, 0);
    let value = parser.value()?;
    parser.finish()?;
    Ok(value)
}

/// Parse a comma separated `name=value` list spanning all of `input`.
///
/// An empty input yields an empty tuple.
pub fn parse_results(input: &str) -> Result<Tuple, ParseError> {
    parse_results_from(input, 0)
}

/// Decode a quoted C-string spanning all of `input`.
pub fn unescape_c_string(input: &str) -> Result<String, ParseError> {
    c_string_from(input, 0)
}

pub(crate) fn parse_results_from(input: &str, start: usize) -> Result<Tuple, ParseError> {
    Parser::new(input, start).results_until(None)
}

pub(crate) fn c_string_from(input: &str, start: usize) -> Result<String, ParseError> {
    let mut parser = Parser::new(input, start);
    let s = parser.c_string()?;
    parser.finish()?;
    Ok(s)
}

/// Fold a nameless tuple into the result before it: a tuple gains (or
/// extends) a `locations` list, any other value becomes a list.
fn attach_location(previous: &mut Value, location: Value) {
    match previous {
        Value::Tuple(parent) => {
            let entry = parent
                .entry("locations".to_string())
                .or_insert_with(|| Value::List(Vec::new()));
            push_item(entry, location);
        }
        other => push_item(other, location),
    }
}

fn push_item(target: &mut Value, item: Value) {
    match target {
        Value::List(items) => items.push(item),
        other => {
            let first = std::mem::replace(other, Value::List(Vec::new()));
            *other = Value::List(vec![first, item]);
        }
    }
}

/// Recursive-descent parser over the bytes of one line.
struct Parser<'a> {
    input: &'a str,
    bytes: &'a [u8],
    pos: usize,
}

impl<'a> Parser<'a> {
    fn new(input: &'a str, pos: usize) -> Self {
        Self {
            input,
            bytes: input.as_bytes(),
            pos,
        }
    }

    fn peek(&self) -> Option<u8> {
        self.bytes.get(self.pos).copied()
    }

    fn error(&self, message: &str) -> ParseError {
        ParseError::new(message, self.input, self.pos)
    }

    fn expect(&mut self, byte: u8) -> Result<(), ParseError> {
        match self.peek() {
            Some(b) if b == byte => {
                self.pos += 1;
                Ok(())
            }
            Some(_) => Err(self.error(&format!("expected `{}`", byte as char))),
            None => Err(self.error("unexpected end of input")),
        }
    }

    fn finish(&self) -> Result<(), ParseError> {
        if self.pos < self.bytes.len() {
            return Err(self.error("trailing characters"));
        }
        Ok(())
    }

    /// Parse results until `end` (or end of input when `end` is `None`).
    /// The terminator itself is not consumed.
    fn results_until(&mut self, end: Option<u8>) -> Result<Tuple, ParseError> {
        let mut tuple = Tuple::new();
        if self.peek() == end {
            return Ok(tuple);
        }
        let mut last: Option<String> = None;
        loop {
            if self.peek() == Some(b'{') && last.is_some() {
                // MI2 writes extra breakpoint locations as bare tuples
                // after `bkpt={...}`.
                let location = self.value()?;
                if let Some(previous) = last.as_deref().and_then(|k| tuple.get_mut(k)) {
                    attach_location(previous, location);
                }
            } else {
                let (name, value) = self.result()?;
                last = Some(name.clone());
                tuple.insert(name, value);
            }
            match self.peek() {
                Some(b',') => self.pos += 1,
                next if next == end => return Ok(tuple),
                Some(_) => return Err(self.error("expected `,`")),
                None => return Err(self.error("unexpected end of input")),
            }
        }
    }

    fn result(&mut self) -> Result<(String, Value), ParseError> {
        let name = self.name()?;
        self.expect(b'=')?;
        let value = self.value()?;
        Ok((name, value))
    }

    fn name(&mut self) -> Result<String, ParseError> {
        let start = self.pos;
        while let Some(b) = self.peek() {
            if b.is_ascii_alphanumeric() || b == b'-' || b == b'_' {
                self.pos += 1;
            } else {
                break;
            }
        }
        if self.pos == start {
            return Err(self.error("expected a name"));
        }
        Ok(self.input[start..self.pos].to_string())
    }

    fn value(&mut self) -> Result<Value, ParseError> {
        match self.peek() {
            Some(b'"') => Ok(Value::String(self.c_string()?)),
            Some(b'{') => {
                self.pos += 1;
                let tuple = self.results_until(Some(b'}'))?;
                self.expect(b'}')?;
                Ok(Value::Tuple(tuple))
            }
            Some(b'[') => self.list(),
            Some(_) => Err(self.error("expected a value")),
            None => Err(self.error("unexpected end of input")),
        }
    }

    fn list(&mut self) -> Result<Value, ParseError> {
        self.expect(b'[')?;
        let mut items = Vec::new();
        if self.peek() == Some(b']') {
            self.pos += 1;
            return Ok(Value::List(items));
        }
        loop {
            let item = match self.peek() {
                Some(b'"' | b'{' | b'[') => self.value()?,
                _ => {
                    let (name, value) = self.result()?;
                    let mut single = Tuple::new();
                    single.insert(name, value);
                    Value::Tuple(single)
                }
            };
            items.push(item);
            match self.peek() {
                Some(b',') => self.pos += 1,
                Some(b']') => {
                    self.pos += 1;
                    return Ok(Value::List(items));
                }
                Some(_) => return Err(self.error("expected `,` or `]`")),
                None => return Err(self.error("unexpected end of input")),
            }
        }
    }

    fn c_string(&mut self) -> Result<String, ParseError> {
        let start = self.pos;
        self.expect(b'"')?;
        let mut out = Vec::new();
        loop {
            match self.peek() {
                None => return Err(ParseError::new("unterminated string", self.input, start)),
                Some(b'"') => {
                    self.pos += 1;
                    break;
                }
                Some(b'\\') => {
                    self.pos += 1;
                    self.escape(&mut out, start)?;
                }
                Some(b) => {
                    out.push(b);
                    self.pos += 1;
                }
            }
        }
        Ok(String::from_utf8_lossy(&out).into_owned())
    }

    fn escape(&mut self, out: &mut Vec<u8>, start: usize) -> Result<(), ParseError> {
        let Some(b) = self.peek() else {
            return Err(ParseError::new("unterminated string", self.input, start));
        };
        self.pos += 1;
        match b {
            b'n' => out.push(b'\n'),
            b't' => out.push(b'\t'),
            b'r' => out.push(b'\r'),
            b'e' => out.push(0x1b),
            b'a' => out.push(0x07),
            b'b' => out.push(0x08),
            b'f' => out.push(0x0c),
            b'v' => out.push(0x0b),
            b'0'..=b'7' => {
                // GDB writes non-ASCII bytes as three octal digits.
                let mut code = u32::from(b - b'0');
                for _ in 0..2 {
                    match self.peek() {
                        Some(d @ b'0'..=b'7') => {
                            code = code * 8 + u32::from(d - b'0');
                            self.pos += 1;
                        }
                        _ => break,
                    }
                }
                out.push((code & 0xff) as u8);
            }
            other => out.push(other),
        }
        Ok(())
    }
}
