//! Errors raised while running a grammar over a stream.

use scrivener_core::Stream;
use scrivener_core::scan::ScanError;

use crate::expr::EvalError;

/// Width of the input excerpt carried by wall errors.
pub const SNIPPET_WIDTH: usize = 20;

/// A parse error. Ordinary misses never surface as errors except through
/// [`ParseError::NoMatch`] at the top of a parse.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ParseError {
    #[error("`{rule}` did not match at {row}:{col}")]
    NoMatch {
        rule: String,
        pos: usize,
        row: usize,
        col: usize,
    },

    #[error("`{rule}` hit a stop token at the top level")]
    Failure { rule: String },

    #[error("{rule} did not match after {wall} at {row}:{col}: {snippet:?}")]
    Wall {
        wall: String,
        rule: String,
        pos: usize,
        row: usize,
        col: usize,
        snippet: String,
    },

    #[error("action `{code}` failed: {error}")]
    Action { code: String, error: EvalError },

    #[error("repetition `{rule}` matched empty text at {row}:{col}")]
    ZeroWidthRepeat {
        rule: String,
        pos: usize,
        row: usize,
        col: usize,
    },

    #[error("content rule `{rule}` matched empty text at {row}:{col}")]
    ZeroWidthContent {
        rule: String,
        pos: usize,
        row: usize,
        col: usize,
    },

    #[error("`{rule}` must produce a dict to record its extent, got {found}")]
    ExtentNotMap { rule: String, found: &'static str },

    #[error(transparent)]
    Scan(#[from] ScanError),

    #[error("no rule named `{0}`")]
    UnknownRule(String),

    #[error("recursion limit of {limit} exceeded")]
    RecursionLimitExceeded { limit: u32 },
}

impl ParseError {
    /// A miss after a committed wall.
    pub fn wall(wall: &str, rule: impl Into<String>, stream: &Stream, pos: usize) -> Self {
        let (row, col) = stream.row_col(pos);
        ParseError::Wall {
            wall: wall.to_string(),
            rule: rule.into(),
            pos,
            row,
            col,
            snippet: stream.snippet(pos, SNIPPET_WIDTH).to_string(),
        }
    }

    pub fn no_match(rule: impl Into<String>, stream: &Stream, pos: usize) -> Self {
        let (row, col) = stream.row_col(pos);
        ParseError::NoMatch {
            rule: rule.into(),
            pos,
            row,
            col,
        }
    }

    pub fn zero_width_repeat(rule: impl Into<String>, stream: &Stream, pos: usize) -> Self {
        let (row, col) = stream.row_col(pos);
        ParseError::ZeroWidthRepeat {
            rule: rule.into(),
            pos,
            row,
            col,
        }
    }

    pub fn zero_width_content(rule: impl Into<String>, stream: &Stream, pos: usize) -> Self {
        let (row, col) = stream.row_col(pos);
        ParseError::ZeroWidthContent {
            rule: rule.into(),
            pos,
            row,
            col,
        }
    }

    /// Character position the error points at, when it has one.
    pub fn position(&self) -> Option<usize> {
        match self {
            ParseError::Wall { pos, .. }
            | ParseError::NoMatch { pos, .. }
            | ParseError::ZeroWidthRepeat { pos, .. }
            | ParseError::ZeroWidthContent { pos, .. } => Some(*pos),
            _ => None,
        }
    }
}

pub type ParseResult<T> = Result<T, ParseError>;
