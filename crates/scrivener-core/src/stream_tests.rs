use crate::{END_OF_TEXT, Stream, condition};

#[test]
fn condition_normalizes_text() {
    let conditioned = condition("\u{feff}a\r\nb\rc\td");
    assert_eq!(conditioned, "a\nb\nc        d\x03");
}

#[test]
fn condition_keeps_existing_sentinel() {
    assert_eq!(condition("x\x03"), "x\x03");
    assert_eq!(condition(""), "\x03");
}

#[test]
fn positions_are_characters_not_bytes() {
    let stream = Stream::new("é€x");

    assert_eq!(stream.len(), 4);
    assert_eq!(stream.content_len(), 3);
    assert_eq!(stream.char_at(1), Some('€'));
    assert_eq!(stream.char_at(3), Some(END_OF_TEXT));
    assert_eq!(stream.slice(1, 3), "€x");
    assert_eq!(stream.byte_offset(2), 5);
    assert_eq!(stream.char_pos(5), 2);
    assert!(stream.starts_with_at(1, "€x"));
    assert!(!stream.starts_with_at(2, "€"));
}

#[test]
fn end_of_text_covers_sentinel_and_beyond() {
    let stream = Stream::new("a");

    assert!(!stream.at_end(0));
    assert!(stream.at_end(1));
    assert!(stream.at_end(5));
}

#[test]
fn row_col_is_one_based() {
    let stream = Stream::new("ab\ncd");

    assert_eq!(stream.row_col(0), (1, 1));
    assert_eq!(stream.row_col(1), (1, 2));
    assert_eq!(stream.row_col(3), (2, 1));
    assert_eq!(stream.row_col(4), (2, 2));
}

#[test]
fn snippet_excludes_sentinel() {
    let stream = Stream::new("hello world");

    assert_eq!(stream.snippet(6, 20), "world");
    assert_eq!(stream.snippet(0, 5), "hello");
    assert_eq!(stream.snippet(40, 5), "");
}
