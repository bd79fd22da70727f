//! Values produced by rules and actions, and the three-way match outcome.

use std::fmt::{self, Write as _};

use indexmap::IndexMap;
use serde::ser::{SerializeMap, SerializeSeq};
use serde::{Serialize, Serializer};

use scrivener_core::{Colors, escape};

use crate::rule::Rule;

/// A parse value.
///
/// `Empty` marks a match that produced no textual value (zero-width rules,
/// lookarounds). It is a real value: it can be bound, compared and returned,
/// but repetitions drop it from their collected lists.
#[derive(Clone, Debug, Default, PartialEq)]
pub enum Value {
    Empty,
    #[default]
    None,
    Bool(bool),
    Int(i64),
    Str(String),
    List(Vec<Value>),
    Map(IndexMap<String, Value>),
    /// A rule built by a grammar action (bootstrap output).
    Rule(Rule),
}

/// Result of evaluating a rule at a position.
#[derive(Clone, Debug, PartialEq)]
pub enum Outcome {
    /// Matched, yielding a value and the position after the match.
    Match(Value, usize),
    /// Did not match here; the caller backtracks.
    Miss,
    /// A stop token matched inside interleaved text: abort the enclosing `Mixed`.
    Failure,
}

impl Outcome {
    #[inline]
    pub fn is_miss(&self) -> bool {
        matches!(self, Outcome::Miss)
    }

    #[inline]
    pub fn is_match(&self) -> bool {
        matches!(self, Outcome::Match(..))
    }
}

impl Value {
    pub fn str(s: impl Into<String>) -> Self {
        Value::Str(s.into())
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Empty => "Empty",
            Value::None => "None",
            Value::Bool(_) => "bool",
            Value::Int(_) => "int",
            Value::Str(_) => "str",
            Value::List(_) => "list",
            Value::Map(_) => "dict",
            Value::Rule(_) => "rule",
        }
    }

    pub fn is_truthy(&self) -> bool {
        match self {
            Value::Empty | Value::None => false,
            Value::Bool(b) => *b,
            Value::Int(n) => *n != 0,
            Value::Str(s) => !s.is_empty(),
            Value::List(items) => !items.is_empty(),
            Value::Map(map) => !map.is_empty(),
            Value::Rule(_) => true,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Str(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            Value::Int(n) => Some(*n),
            Value::Bool(b) => Some(i64::from(*b)),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[Value]> {
        match self {
            Value::List(items) => Some(items),
            _ => None,
        }
    }

    pub fn as_rule(&self) -> Option<&Rule> {
        match self {
            Value::Rule(rule) => Some(rule),
            _ => None,
        }
    }

    /// Source text that the expression language evaluates back to `self`.
    ///
    /// `Empty` and rules have no literal form.
    pub fn to_literal(&self) -> Option<String> {
        let mut out = String::new();
        write_literal(&mut out, self).then_some(out)
    }

    /// Text form used by `str()` and string concatenation in actions.
    pub fn to_text(&self) -> String {
        match self {
            Value::Str(s) => s.clone(),
            Value::Empty => String::new(),
            Value::Rule(rule) => format!("{rule:?}"),
            other => other.to_literal().unwrap_or_default(),
        }
    }

    /// Format as (optionally colored) JSON-like text for terminals.
    pub fn format(&self, pretty: bool, colors: Colors) -> String {
        let mut out = String::new();
        format_value(&mut out, self, &colors, pretty, 0);
        out
    }
}

fn write_literal(out: &mut String, value: &Value) -> bool {
    match value {
        Value::Empty | Value::Rule(_) => return false,
        Value::None => out.push_str("None"),
        Value::Bool(true) => out.push_str("True"),
        Value::Bool(false) => out.push_str("False"),
        Value::Int(n) => {
            let _ = write!(out, "{n}");
        }
        Value::Str(s) => out.push_str(&escape::quote(s)),
        Value::List(items) => {
            out.push('[');
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    out.push_str(", ");
                }
                if !write_literal(out, item) {
                    return false;
                }
            }
            out.push(']');
        }
        Value::Map(map) => {
            out.push('{');
            for (i, (key, item)) in map.iter().enumerate() {
                if i > 0 {
                    out.push_str(", ");
                }
                out.push_str(&escape::quote(key));
                out.push_str(": ");
                if !write_literal(out, item) {
                    return false;
                }
            }
            out.push('}');
        }
    }
    true
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Empty => f.write_str("Empty"),
            Value::Rule(rule) => write!(f, "{rule:?}"),
            other => f.write_str(&other.to_literal().unwrap_or_default()),
        }
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Str(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Str(s)
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Value::Int(n)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<Vec<Value>> for Value {
    fn from(items: Vec<Value>) -> Self {
        Value::List(items)
    }
}

impl From<Rule> for Value {
    fn from(rule: Rule) -> Self {
        Value::Rule(rule)
    }
}

impl Serialize for Value {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match self {
            Value::Empty | Value::None => serializer.serialize_none(),
            Value::Bool(b) => serializer.serialize_bool(*b),
            Value::Int(n) => serializer.serialize_i64(*n),
            Value::Str(s) => serializer.serialize_str(s),
            Value::List(items) => {
                let mut seq = serializer.serialize_seq(Some(items.len()))?;
                for item in items {
                    seq.serialize_element(item)?;
                }
                seq.end()
            }
            Value::Map(map) => {
                let mut ser = serializer.serialize_map(Some(map.len()))?;
                for (key, value) in map {
                    ser.serialize_entry(key, value)?;
                }
                ser.end()
            }
            Value::Rule(rule) => serializer.serialize_str(&format!("{rule:?}")),
        }
    }
}

fn push_colored(out: &mut String, color: &str, text: &str, reset: &str) {
    out.push_str(color);
    out.push_str(text);
    out.push_str(reset);
}

fn newline_indent(out: &mut String, pretty: bool, indent: usize) {
    if pretty {
        out.push('\n');
        out.push_str(&" ".repeat(indent));
    }
}

fn format_value(out: &mut String, value: &Value, c: &Colors, pretty: bool, indent: usize) {
    match value {
        Value::Empty | Value::None => push_colored(out, c.dim, "null", c.reset),
        Value::Bool(b) => out.push_str(if *b { "true" } else { "false" }),
        Value::Int(n) => {
            let _ = write!(out, "{n}");
        }
        Value::Str(s) => push_colored(out, c.green, &json_string(s), c.reset),
        Value::Rule(rule) => push_colored(out, c.green, &json_string(&format!("{rule:?}")), c.reset),
        Value::List(items) => {
            push_colored(out, c.dim, "[", c.reset);
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    push_colored(out, c.dim, ",", c.reset);
                    if !pretty {
                        out.push(' ');
                    }
                }
                newline_indent(out, pretty, indent + 2);
                format_value(out, item, c, pretty, indent + 2);
            }
            if !items.is_empty() {
                newline_indent(out, pretty, indent);
            }
            push_colored(out, c.dim, "]", c.reset);
        }
        Value::Map(map) => {
            push_colored(out, c.dim, "{", c.reset);
            for (i, (key, item)) in map.iter().enumerate() {
                if i > 0 {
                    push_colored(out, c.dim, ",", c.reset);
                    if !pretty {
                        out.push(' ');
                    }
                }
                newline_indent(out, pretty, indent + 2);
                push_colored(out, c.blue, &json_string(key), c.reset);
                push_colored(out, c.dim, ":", c.reset);
                out.push(' ');
                format_value(out, item, c, pretty, indent + 2);
            }
            if !map.is_empty() {
                newline_indent(out, pretty, indent);
            }
            push_colored(out, c.dim, "}", c.reset);
        }
    }
}

fn json_string(s: &str) -> String {
    let mut out = String::with_capacity(s.len() + 2);
    out.push('"');
    for c in s.chars() {
        match c {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            c if c.is_control() => {
                let _ = write!(out, "\\u{:04x}", c as u32);
            }
            c => out.push(c),
        }
    }
    out.push('"');
    out
}
