//! Hand-written scanners behind the specialised terminals.
//!
//! Both execution backends call these, so a terminal's consumed length and
//! value never depend on which backend runs it. `Ok(None)` means "no match
//! here"; `Err` is reserved for text that can never be valid.

use crate::Stream;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ScanError {
    #[error("unmatched `{open}` at {row}:{col}")]
    Unmatched { open: char, row: usize, col: usize },
    #[error("empty expression at {row}:{col}")]
    EmptyExpression { row: usize, col: usize },
    #[error("unexpected character {found:?} in argument list at {row}:{col}")]
    UnexpectedChar { found: char, row: usize, col: usize },
}

/// Block separation policy for markup documents.
///
/// Matches zero-width at the end of text, a lone final newline, a newline
/// followed by blank lines, or a newline whose following indentation differs
/// from `indent`. In the last case the yielded text covers the indentation
/// but only the newline is consumed.
pub fn block_break(stream: &Stream, pos: usize, indent: i64) -> Option<(String, usize)> {
    let length = stream.content_len();
    if stream.at_end(pos) || pos >= length {
        return Some((String::new(), pos));
    }
    if stream.char_at(pos) != Some('\n') {
        return None;
    }
    if pos + 1 == stream.len() {
        return Some(("\n".to_string(), pos + 1));
    }

    if let Some(end) = blank_lines_end(stream, pos) {
        return Some((stream.slice(pos, end).to_string(), end));
    }

    let mut end = pos + 1;
    while stream.char_at(end) == Some(' ') {
        end += 1;
    }
    let run = stream.slice(pos, end).to_string();
    if end == length {
        return Some((run, end));
    }
    let next_indent = (end - pos - 1) as i64;
    if next_indent != indent {
        return Some((run, pos + 1));
    }
    None
}

/// End of `\n([ \t]*\n)+` starting at `pos`, if it matches.
fn blank_lines_end(stream: &Stream, pos: usize) -> Option<usize> {
    let mut matched = None;
    let mut line = pos + 1;
    loop {
        let mut cursor = line;
        while matches!(stream.char_at(cursor), Some(' ' | '\t')) {
            cursor += 1;
        }
        if stream.char_at(cursor) != Some('\n') {
            return matched;
        }
        line = cursor + 1;
        matched = Some(line);
    }
}

fn closer(open: char) -> Option<char> {
    match open {
        '(' => Some(')'),
        '[' => Some(']'),
        '{' => Some('}'),
        _ => None,
    }
}

/// Take an expression's text, stopping before any of `ends` at depth zero.
///
/// Brackets must balance and quoted strings are skipped whole. A stray
/// closing bracket or an unterminated string is no match.
pub fn take_code(
    stream: &Stream,
    pos: usize,
    ends: &str,
) -> Result<Option<(String, usize)>, ScanError> {
    let length = stream.content_len();
    let start = pos;
    let mut stack: Vec<(char, usize)> = Vec::new();
    let mut i = pos;

    while i < length {
        let Some(c) = stream.char_at(i) else { break };
        if stack.is_empty() && ends.contains(c) {
            break;
        }

        if let Some(close) = closer(c) {
            stack.push((close, i));
        } else if stack.last().is_some_and(|&(close, _)| close == c) {
            stack.pop();
        } else if matches!(c, ')' | ']' | '}') {
            return Ok(None);
        }

        if c == '"' || c == '\'' {
            let mut terminated = false;
            while i < length - 1 {
                i += 1;
                match stream.char_at(i) {
                    Some('\\') => i += 1,
                    Some(inner) if inner == c => {
                        terminated = true;
                        break;
                    }
                    _ => {}
                }
            }
            if !terminated || i >= length {
                return Ok(None);
            }
        }
        i += 1;
    }

    if let Some(&(_, open_pos)) = stack.last() {
        let (row, col) = stream.row_col(open_pos);
        let open = stream.char_at(open_pos).unwrap_or('(');
        return Err(ScanError::Unmatched { open, row, col });
    }
    if i == start {
        let (row, col) = stream.row_col(start);
        return Err(ScanError::EmptyExpression { row, col });
    }
    Ok(Some((stream.slice(start, i).to_string(), i)))
}

/// Take a space-separated argument list ending before `)`.
///
/// An immediately closing `)` yields an empty list.
pub fn take_args(stream: &Stream, pos: usize) -> Result<Option<(Vec<String>, usize)>, ScanError> {
    let length = stream.content_len();
    let mut args = Vec::new();
    let mut i = pos;
    if stream.char_at(i) == Some(')') {
        return Ok(Some((args, i)));
    }

    while i < length {
        let Some((arg, next)) = take_code(stream, i, ") ")? else {
            return Ok(None);
        };
        args.push(arg);
        i = next;
        match stream.char_at(i) {
            Some(')') => break,
            Some(' ') => i += 1,
            Some(found) if i < length => {
                let (row, col) = stream.row_col(i);
                return Err(ScanError::UnexpectedChar { found, row, col });
            }
            _ => break,
        }
    }
    Ok(Some((args, i)))
}
