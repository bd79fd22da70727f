use scrivener_core::Stream;

use crate::diagnostics::{RenderOptions, render_parse_error};
use crate::engine::ParseError;

#[test]
fn positioned_errors_render_an_excerpt() {
    let stream = Stream::new("key = (value\n");
    let error = ParseError::wall("paren", "\")\"", &stream, 12);
    let rendered = render_parse_error(&stream, &error, Some("input.txt"), RenderOptions::plain());
    assert!(rendered.starts_with("error: "));
    assert!(rendered.contains("input.txt"));
    assert!(rendered.contains("key = (value"));
    assert!(rendered.contains("\")\""));
}

#[test]
fn unpositioned_errors_render_one_line() {
    let stream = Stream::new("x");
    let error = ParseError::UnknownRule("main".to_string());
    assert_eq!(
        render_parse_error(&stream, &error, None, RenderOptions::plain()),
        "error: no rule named `main`"
    );
}
