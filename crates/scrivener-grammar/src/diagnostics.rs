//! Rendering of parse errors as annotated source excerpts.

use annotate_snippets::{AnnotationKind, Group, Level, Renderer, Snippet};

use scrivener_core::Stream;

use crate::engine::ParseError;

/// Options for rendering diagnostics.
#[derive(Clone, Copy, Debug, Default)]
pub struct RenderOptions {
    /// Use ANSI colors in output.
    pub colored: bool,
}

impl RenderOptions {
    pub fn plain() -> Self {
        Self { colored: false }
    }

    pub fn colored() -> Self {
        Self { colored: true }
    }
}

/// Render `error` against the text it was raised on.
///
/// Errors that point at a position get a source excerpt with the position
/// underlined; the rest render as a single `error:` line.
pub fn render_parse_error(
    stream: &Stream,
    error: &ParseError,
    path: Option<&str>,
    options: RenderOptions,
) -> String {
    let message = error.to_string();
    let Some(pos) = error.position() else {
        return format!("error: {message}");
    };

    let source = stream.slice(0, stream.content_len());
    let start = stream.byte_offset(pos).min(source.len());
    let end = stream.byte_offset(pos + 1).min(source.len()).max(start);

    let renderer = if options.colored {
        Renderer::styled()
    } else {
        Renderer::plain()
    };

    let mut snippet = Snippet::source(source)
        .line_start(1)
        .annotation(AnnotationKind::Primary.span(start..end).label(label(error)));
    if let Some(p) = path {
        snippet = snippet.path(p);
    }

    let report: Vec<Group> = vec![Level::ERROR.primary_title(&message).element(snippet)];
    renderer.render(&report).to_string()
}

fn label(error: &ParseError) -> &str {
    match error {
        ParseError::Wall { rule, .. } => rule,
        ParseError::NoMatch { .. } => "no match here",
        ParseError::ZeroWidthRepeat { .. } | ParseError::ZeroWidthContent { .. } => {
            "matched without consuming input"
        }
        _ => "",
    }
}
