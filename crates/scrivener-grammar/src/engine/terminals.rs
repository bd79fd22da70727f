//! Terminal evaluation shared by the interpreter and the VM.
//!
//! Each function evaluates one terminal at `pos` and returns its outcome.
//! Keeping them in one place makes the consumed length, the produced value
//! and the context effects identical across backends.

use scrivener_core::{CharSet, Stream, scan};

use super::error::ParseResult;
use crate::context::ParserContext;
use crate::rule::Pattern;
use crate::value::{Outcome, Value};

#[inline]
fn char_value(c: char) -> Value {
    Value::Str(c.to_string())
}

pub fn any(stream: &Stream, pos: usize) -> Outcome {
    match stream.char_at(pos) {
        Some(c) if !stream.at_end(pos) => Outcome::Match(char_value(c), pos + 1),
        _ => Outcome::Miss,
    }
}

pub fn alphanum(stream: &Stream, pos: usize) -> Outcome {
    match stream.char_at(pos) {
        Some(c) if c.is_alphanumeric() => Outcome::Match(char_value(c), pos + 1),
        _ => Outcome::Miss,
    }
}

pub fn stream_start(pos: usize) -> Outcome {
    if pos == 0 {
        Outcome::Match(Value::Empty, pos)
    } else {
        Outcome::Miss
    }
}

pub fn line_start(stream: &Stream, pos: usize) -> Outcome {
    let at_line_start = pos == 0 || stream.char_at(pos - 1) == Some('\n');
    if pos < stream.len() && at_line_start {
        Outcome::Match(Value::Empty, pos)
    } else {
        Outcome::Miss
    }
}

pub fn line_end(stream: &Stream, pos: usize) -> Outcome {
    if stream.at_end(pos) {
        Outcome::Match(Value::Empty, pos)
    } else if stream.char_at(pos) == Some('\n') {
        Outcome::Match(Value::str("\n"), pos + 1)
    } else {
        Outcome::Miss
    }
}

pub fn stream_end(stream: &Stream, pos: usize) -> Outcome {
    if stream.at_end(pos) {
        Outcome::Match(Value::Empty, pos)
    } else {
        Outcome::Miss
    }
}

/// Block break against the `indent` and `bwidth` context integers.
pub fn block_break(stream: &Stream, pos: usize, ctx: &ParserContext) -> Outcome {
    let int = |name: &str| ctx.get(name).and_then(Value::as_int).unwrap_or(0);
    let indent = int("indent").saturating_add(int("bwidth"));
    match scan::block_break(stream, pos, indent) {
        Some((text, _)) if text.is_empty() => Outcome::Match(Value::Empty, pos),
        Some((text, end)) => Outcome::Match(Value::Str(text), end),
        None => Outcome::Miss,
    }
}

pub fn literal(stream: &Stream, pos: usize, text: &str) -> Outcome {
    if stream.starts_with_at(pos, text) {
        Outcome::Match(Value::str(text), pos + text.chars().count())
    } else {
        Outcome::Miss
    }
}

pub fn among(stream: &Stream, pos: usize, set: &CharSet) -> Outcome {
    match stream.char_at(pos) {
        Some(c) if set.contains(c) => Outcome::Match(char_value(c), pos + 1),
        _ => Outcome::Miss,
    }
}

/// Regex match; named groups bind into the innermost scope.
pub fn regex(stream: &Stream, pos: usize, pattern: &Pattern, ctx: &mut ParserContext) -> Outcome {
    match pattern.match_at(stream, pos) {
        Some(m) => {
            ctx.update(m.groups);
            Outcome::Match(Value::Str(m.text), m.end)
        }
        None => Outcome::Miss,
    }
}

pub fn put(pos: usize, name: &str, value: &Value, ctx: &mut ParserContext) -> Outcome {
    ctx.set(name, value.clone());
    Outcome::Match(Value::Empty, pos)
}

pub fn get(pos: usize, name: &str, default: &Value, ctx: &ParserContext) -> Outcome {
    Outcome::Match(ctx.get_or(name, default), pos)
}

pub fn code(stream: &Stream, pos: usize, ends: &str) -> ParseResult<Outcome> {
    Ok(match scan::take_code(stream, pos, ends)? {
        Some((text, end)) => Outcome::Match(Value::Str(text), end),
        None => Outcome::Miss,
    })
}

pub fn args(stream: &Stream, pos: usize) -> ParseResult<Outcome> {
    Ok(match scan::take_args(stream, pos)? {
        Some((items, end)) => {
            let items = items.into_iter().map(Value::Str).collect();
            Outcome::Match(Value::List(items), end)
        }
        None => Outcome::Miss,
    })
}

/// Wrap a value as the output of a `Mixed` text chunk.
pub fn text_chunk(stream: &Stream, start: usize, end: usize) -> Value {
    Value::str(stream.slice(start, end))
}

/// Record `[start, end]` under `extent` in a dict output.
pub fn with_extent(value: Value, start: usize, end: usize) -> Result<Value, &'static str> {
    match value {
        Value::Map(mut map) => {
            map.insert(
                "extent".to_string(),
                Value::List(vec![to_int(start), to_int(end)]),
            );
            Ok(Value::Map(map))
        }
        other => Err(other.type_name()),
    }
}

pub(crate) fn to_int(n: usize) -> Value {
    Value::Int(i64::try_from(n).unwrap_or(i64::MAX))
}
