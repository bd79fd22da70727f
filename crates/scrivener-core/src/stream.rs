//! Conditioned input text.
//!
//! Parsing never looks at raw caller text. [`condition`] normalizes line
//! endings, expands tabs and appends the end-of-text sentinel so that
//! terminals can test "at end of text" by looking at a character.
//!
//! Positions are character indices, not byte offsets. The stream keeps a
//! char table for O(1) indexing and a byte-offset table for handing spans to
//! the regex engine and for slicing.

/// Sentinel appended to every conditioned stream.
pub const END_OF_TEXT: char = '\x03';

const TAB_WIDTH: usize = 8;

/// Normalize `text` the way every parse expects it.
///
/// Strips a leading byte-order mark, converts `\r\n` and lone `\r` to `\n`,
/// expands tabs to eight spaces and appends [`END_OF_TEXT`] unless the text
/// already ends with it.
pub fn condition(text: &str) -> String {
    let text = text.strip_prefix('\u{feff}').unwrap_or(text);
    let mut out = String::with_capacity(text.len() + 1);
    let mut chars = text.chars().peekable();
    while let Some(c) = chars.next() {
        match c {
            '\r' => {
                if chars.peek() == Some(&'\n') {
                    chars.next();
                }
                out.push('\n');
            }
            '\t' => out.extend(std::iter::repeat_n(' ', TAB_WIDTH)),
            c => out.push(c),
        }
    }
    if !out.ends_with(END_OF_TEXT) {
        out.push(END_OF_TEXT);
    }
    out
}

/// A conditioned document, indexable by character position.
#[derive(Debug, Clone)]
pub struct Stream {
    text: String,
    chars: Vec<char>,
    /// Byte offset of each char, plus one trailing entry for `text.len()`.
    offsets: Vec<usize>,
}

impl Stream {
    /// Condition `raw` and index it.
    pub fn new(raw: &str) -> Self {
        Self::from_conditioned(condition(raw))
    }

    /// Index text that is already conditioned (or deliberately is not).
    pub fn from_conditioned(text: String) -> Self {
        let mut chars = Vec::with_capacity(text.len());
        let mut offsets = Vec::with_capacity(text.len() + 1);
        for (offset, c) in text.char_indices() {
            chars.push(c);
            offsets.push(offset);
        }
        offsets.push(text.len());
        Self {
            text,
            chars,
            offsets,
        }
    }

    #[inline]
    pub fn as_str(&self) -> &str {
        &self.text
    }

    /// Number of characters, sentinel included.
    #[inline]
    pub fn len(&self) -> usize {
        self.chars.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.chars.is_empty()
    }

    /// Number of characters, sentinel excluded.
    pub fn content_len(&self) -> usize {
        match self.chars.last() {
            Some(&END_OF_TEXT) => self.chars.len() - 1,
            _ => self.chars.len(),
        }
    }

    #[inline]
    pub fn char_at(&self, pos: usize) -> Option<char> {
        self.chars.get(pos).copied()
    }

    /// True at the sentinel or past the last character.
    #[inline]
    pub fn at_end(&self, pos: usize) -> bool {
        match self.chars.get(pos) {
            None | Some(&END_OF_TEXT) => true,
            Some(_) => false,
        }
    }

    /// Byte offset of a character position, clamped to the text length.
    #[inline]
    pub fn byte_offset(&self, pos: usize) -> usize {
        self.offsets
            .get(pos)
            .copied()
            .unwrap_or(self.text.len())
    }

    /// Character position of a byte offset that falls on a char boundary.
    pub fn char_pos(&self, byte: usize) -> usize {
        match self.offsets.binary_search(&byte) {
            Ok(pos) => pos,
            Err(pos) => pos,
        }
    }

    /// Text between two character positions.
    pub fn slice(&self, start: usize, end: usize) -> &str {
        let end = end.max(start);
        &self.text[self.byte_offset(start)..self.byte_offset(end)]
    }

    /// Whether `literal` occurs at `pos`.
    pub fn starts_with_at(&self, pos: usize, literal: &str) -> bool {
        pos <= self.chars.len() && self.text[self.byte_offset(pos)..].starts_with(literal)
    }

    /// 1-based row and column of a character position.
    pub fn row_col(&self, pos: usize) -> (usize, usize) {
        let pos = pos.min(self.chars.len());
        let before = &self.chars[..pos];
        let row = 1 + before.iter().filter(|&&c| c == '\n').count();
        let col = match before.iter().rposition(|&c| c == '\n') {
            Some(newline) => pos - newline,
            None => pos + 1,
        };
        (row, col)
    }

    /// Up to `width` characters starting at `pos`, sentinel excluded.
    pub fn snippet(&self, pos: usize, width: usize) -> &str {
        let start = pos.min(self.content_len());
        let end = (start + width).min(self.content_len());
        self.slice(start, end)
    }
}
