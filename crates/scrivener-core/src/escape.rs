//! String literal quoting shared by the expression language and module sources.
//!
//! Escapes: `\\`, `\"`, `\'`, `\n`, `\r`, `\t`, `\0`, `\xHH` and `\u{H…}`.
//! [`quote`] only produces those forms, so `unescape(escape_body(s))` is `s`.

use std::fmt::Write as _;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum EscapeError {
    #[error("dangling backslash at end of literal")]
    Dangling,
    #[error("unknown escape `\\{0}`")]
    Unknown(char),
    #[error("malformed escape `{0}`")]
    Malformed(String),
}

/// Escape `s` for use between `quote_char` delimiters.
pub fn escape_body(s: &str, quote_char: char) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            '\0' => out.push_str("\\0"),
            c if c == quote_char => {
                out.push('\\');
                out.push(c);
            }
            c if c.is_control() => {
                let _ = write!(out, "\\u{{{:x}}}", c as u32);
            }
            c => out.push(c),
        }
    }
    out
}

/// Double-quoted literal for `s`.
pub fn quote(s: &str) -> String {
    format!("\"{}\"", escape_body(s, '"'))
}

/// Decode the body of a quoted literal (delimiters already removed).
pub fn unescape(body: &str) -> Result<String, EscapeError> {
    let mut out = String::with_capacity(body.len());
    let mut chars = body.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        let Some(e) = chars.next() else {
            return Err(EscapeError::Dangling);
        };
        match e {
            '\\' | '"' | '\'' => out.push(e),
            'n' => out.push('\n'),
            'r' => out.push('\r'),
            't' => out.push('\t'),
            '0' => out.push('\0'),
            'x' => {
                let hex: String = chars.by_ref().take(2).collect();
                out.push(decode_hex(&hex, "\\x")?);
            }
            'u' => {
                if chars.next() != Some('{') {
                    return Err(EscapeError::Malformed("\\u".to_string()));
                }
                let mut hex = String::new();
                loop {
                    match chars.next() {
                        Some('}') => break,
                        Some(h) => hex.push(h),
                        None => return Err(EscapeError::Malformed(format!("\\u{{{hex}"))),
                    }
                }
                out.push(decode_hex(&hex, "\\u")?);
            }
            other => return Err(EscapeError::Unknown(other)),
        }
    }
    Ok(out)
}

fn decode_hex(hex: &str, prefix: &str) -> Result<char, EscapeError> {
    u32::from_str_radix(hex, 16)
        .ok()
        .filter(|_| !hex.is_empty())
        .and_then(char::from_u32)
        .ok_or_else(|| EscapeError::Malformed(format!("{prefix}{hex}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quote_escapes_controls_and_delimiter() {
        insta::assert_snapshot!(quote("a\"b\\c\n\x03"), @r#""a\"b\\c\n\u{3}""#);
    }

    #[test]
    fn unescape_reverses_escape_body() {
        let original = "tab\there 'q' \"dq\" \u{7f} \x03 end\\";
        let body = escape_body(original, '"');
        assert_eq!(unescape(&body).unwrap(), original);
    }

    #[test]
    fn unescape_hex_forms() {
        assert_eq!(unescape(r"\x41\u{1F600}").unwrap(), "A\u{1F600}");
    }

    #[test]
    fn unescape_rejects_unknown() {
        assert_eq!(unescape(r"\q"), Err(EscapeError::Unknown('q')));
        assert_eq!(unescape("abc\\"), Err(EscapeError::Dangling));
    }
}
