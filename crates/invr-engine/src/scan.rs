//! Text scanning helpers shared by the preprocessors
//!
//! All scanners skip quoted string literals and work on byte offsets. The
//! delimiters they look for are ASCII, so every offset they return is a
//! valid char boundary.

use crate::expression::EvalError;

pub(crate) fn is_ident_byte(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b == b'_' || b >= 0x80
}

pub(crate) fn is_ident_start(b: u8) -> bool {
    b.is_ascii_alphabetic() || b == b'_'
}

/// Offset just past the string literal whose opening quote is at `start`
pub(crate) fn skip_string(text: &str, start: usize) -> Result<usize, EvalError> {
    let bytes = text.as_bytes();
    let quote = bytes[start];
    let mut i = start + 1;
    while i < bytes.len() {
        match bytes[i] {
            b'\\' => i += 2,
            b if b == quote => return Ok(i + 1),
            _ => i += 1,
        }
    }
    Err(EvalError::syntax("unterminated string literal", start))
}

/// Offset of the bracket closing the one at `open`
///
/// Tracks `()`, `[]` and `{}` nesting and ignores brackets inside strings.
pub(crate) fn find_closing(text: &str, open: usize) -> Result<usize, EvalError> {
    let bytes = text.as_bytes();
    let mut depth = 0usize;
    let mut i = open;
    while i < bytes.len() {
        match bytes[i] {
            b'\'' | b'"' => {
                i = skip_string(text, i)?;
                continue;
            }
            b'(' | b'[' | b'{' => depth += 1,
            b')' | b']' | b'}' => {
                depth = depth.saturating_sub(1);
                if depth == 0 {
                    return Ok(i);
                }
            }
            _ => {}
        }
        i += 1;
    }
    Err(EvalError::syntax(
        format!("unclosed '{}'", char::from(bytes[open])),
        open,
    ))
}

/// Split on `separator` where it appears outside strings and brackets
pub(crate) fn split_top_level(text: &str, separator: u8) -> Result<Vec<&str>, EvalError> {
    let bytes = text.as_bytes();
    let mut parts = Vec::new();
    let mut depth = 0usize;
    let mut start = 0;
    let mut i = 0;
    while i < bytes.len() {
        match bytes[i] {
            b'\'' | b'"' => {
                i = skip_string(text, i)?;
                continue;
            }
            b'(' | b'[' | b'{' => depth += 1,
            b')' | b']' | b'}' => depth = depth.saturating_sub(1),
            b if b == separator && depth == 0 => {
                parts.push(&text[start..i]);
                start = i + 1;
            }
            _ => {}
        }
        i += 1;
    }
    parts.push(&text[start..]);
    Ok(parts)
}

/// Identifier starting at `start`, returned with the offset just past it
pub(crate) fn ident_at(text: &str, start: usize) -> Option<(&str, usize)> {
    let bytes = text.as_bytes();
    if start >= bytes.len() || !is_ident_start(bytes[start]) {
        return None;
    }
    let mut end = start + 1;
    while end < bytes.len() && (bytes[end].is_ascii_alphanumeric() || bytes[end] == b'_') {
        end += 1;
    }
    Some((&text[start..end], end))
}

/// Whether `start` begins a new identifier (not the tail of a name or member access)
pub(crate) fn at_word_boundary(text: &str, start: usize) -> bool {
    start == 0 || {
        let prev = text.as_bytes()[start - 1];
        !is_ident_byte(prev) && prev != b'.' && prev != b'$'
    }
}

/// Case-insensitive keyword match at the start of `text`, followed by a non-identifier byte
pub(crate) fn starts_with_keyword(text: &str, keyword: &str) -> bool {
    text.len() >= keyword.len()
        && text.as_bytes()[..keyword.len()].eq_ignore_ascii_case(keyword.as_bytes())
        && text
            .as_bytes()
            .get(keyword.len())
            .is_none_or(|b| !is_ident_byte(*b))
}
