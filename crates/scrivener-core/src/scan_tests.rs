use crate::Stream;
use crate::scan::{ScanError, block_break, take_args, take_code};

#[test]
fn block_break_at_end_is_zero_width() {
    let stream = Stream::new("a");
    assert_eq!(block_break(&stream, 1, 0), Some((String::new(), 1)));
    assert_eq!(block_break(&stream, 0, 0), None);
}

#[test]
fn block_break_takes_blank_lines() {
    let stream = Stream::new("a\n  \nb");
    assert_eq!(block_break(&stream, 1, 0), Some(("\n  \n".to_string(), 5)));
}

#[test]
fn block_break_on_indent_change_consumes_only_newline() {
    let stream = Stream::new("a\n  b");
    assert_eq!(block_break(&stream, 1, 0), Some(("\n  ".to_string(), 2)));
    assert_eq!(block_break(&stream, 1, 2), None);
}

#[test]
fn block_break_on_trailing_newline() {
    let stream = Stream::new("a\n");
    assert_eq!(block_break(&stream, 1, 0), Some(("\n".to_string(), 2)));
}

#[test]
fn take_code_balances_brackets() {
    let stream = Stream::new("f(a, b) rest");
    assert_eq!(
        take_code(&stream, 0, " "),
        Ok(Some(("f(a, b)".to_string(), 7)))
    );
}

#[test]
fn take_code_skips_quoted_text() {
    let stream = Stream::new("'a)b')");
    assert_eq!(
        take_code(&stream, 0, ")"),
        Ok(Some(("'a)b'".to_string(), 5)))
    );
}

#[test]
fn take_code_misses_on_stray_closer() {
    let stream = Stream::new("a]");
    assert_eq!(take_code(&stream, 0, ")"), Ok(None));
}

#[test]
fn take_code_rejects_unbalanced_and_empty() {
    let stream = Stream::new("(ab");
    assert_eq!(
        take_code(&stream, 0, ")"),
        Err(ScanError::Unmatched {
            open: '(',
            row: 1,
            col: 1
        })
    );

    let stream = Stream::new(")");
    assert_eq!(
        take_code(&stream, 0, ")"),
        Err(ScanError::EmptyExpression { row: 1, col: 1 })
    );
}

#[test]
fn take_args_splits_on_spaces() {
    let stream = Stream::new("(a b 'c d')");
    let expected = vec!["a".to_string(), "b".to_string(), "'c d'".to_string()];
    assert_eq!(take_args(&stream, 1), Ok(Some((expected, 10))));
}

#[test]
fn take_args_allows_empty_list() {
    let stream = Stream::new("()");
    assert_eq!(take_args(&stream, 1), Ok(Some((Vec::new(), 1))));
}
