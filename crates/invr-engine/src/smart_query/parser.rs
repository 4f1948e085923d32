//! Locating and parsing `db.table.field[conditions]` references

use crate::expression::lexer::{Token, tokenize};
use crate::expression::{EvalError, EvalResult};
use crate::scan::{
    at_word_boundary, find_closing, ident_at, is_ident_byte, skip_string, split_top_level,
    starts_with_keyword,
};
use invr_domain::value::{Value, parse_decimal};
use invr_domain::value_objects::QueryOperator;
use std::fmt;
use std::ops::Range;

/// Parsed smart query
#[derive(Debug, Clone, PartialEq)]
pub struct SmartQuery {
    pub table: String,
    /// Projected column; `None` returns the whole row
    pub field: Option<String>,
    pub conditions: Vec<ConditionSpec>,
}

impl fmt::Display for SmartQuery {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "db.{}", self.table)?;
        if let Some(field) = &self.field {
            write!(f, ".{field}")?;
        }
        write!(f, "[{} condition(s)]", self.conditions.len())
    }
}

/// One condition before its values are resolved against a scope
#[derive(Debug, Clone, PartialEq)]
pub struct ConditionSpec {
    pub field: String,
    pub operator: QueryOperator,
    pub operand: Operand,
}

/// Right-hand side of a condition
#[derive(Debug, Clone, PartialEq)]
pub enum Operand {
    Single(ValueRef),
    List(Vec<ValueRef>),
    Range(ValueRef, ValueRef),
}

/// A condition value as written
#[derive(Debug, Clone, PartialEq)]
pub enum ValueRef {
    /// Quoted string, number, boolean or null
    Literal(Value),
    /// `$name` or `$name.path`; variables first, then the record scope
    Variable(Vec<String>),
    /// Dotted path into the record scope (`supplier.name`)
    Path(Vec<String>),
    /// Bare word; a scope name when one exists, otherwise the word itself
    Word(String),
}

/// A smart query found in expression text
#[derive(Debug, Clone, PartialEq)]
pub struct Located {
    /// Byte span of the whole reference, brackets included
    pub span: Range<usize>,
    /// Source text of the reference
    pub source: String,
    pub table: String,
    pub field: Option<String>,
    /// Parsed query, or the reason its conditions could not be parsed
    pub query: EvalResult<SmartQuery>,
}

/// Find every smart query reference in `text`, left to right
///
/// `db.` only starts a reference at an identifier boundary and outside string
/// literals. A reference whose `[` is never closed is a syntax error.
pub fn find_queries(text: &str) -> EvalResult<Vec<Located>> {
    let bytes = text.as_bytes();
    let mut found = Vec::new();
    let mut i = 0;
    while i < bytes.len() {
        match bytes[i] {
            b'\'' | b'"' => {
                i = skip_string(text, i)?;
                continue;
            }
            b'd' if text[i..].starts_with("db.") && at_word_boundary(text, i) => {
                if let Some(located) = query_at(text, i)? {
                    i = located.span.end;
                    found.push(located);
                    continue;
                }
            }
            _ => {}
        }
        i += 1;
    }
    Ok(found)
}

fn query_at(text: &str, start: usize) -> EvalResult<Option<Located>> {
    let Some((table, mut pos)) = ident_at(text, start + 3) else {
        return Ok(None);
    };
    let mut field = None;
    if text.as_bytes().get(pos) == Some(&b'.') {
        let Some((name, end)) = ident_at(text, pos + 1) else {
            return Ok(None);
        };
        field = Some(name.to_string());
        pos = end;
    }
    if text.as_bytes().get(pos) != Some(&b'[') {
        return Ok(None);
    }
    let close = find_closing(text, pos).map_err(|_| {
        EvalError::syntax(
            format!("unterminated smart query '{}'", &text[start..pos]),
            pos,
        )
    })?;
    let body = &text[pos + 1..close];
    let query = parse_conditions(body).map(|conditions| SmartQuery {
        table: table.to_string(),
        field: field.clone(),
        conditions,
    });
    Ok(Some(Located {
        span: start..close + 1,
        source: text[start..=close].to_string(),
        table: table.to_string(),
        field,
        query,
    }))
}

/// Parse the comma-separated condition list between the brackets
pub fn parse_conditions(body: &str) -> EvalResult<Vec<ConditionSpec>> {
    split_top_level(body, b',')?
        .into_iter()
        .map(str::trim)
        .filter(|part| !part.is_empty())
        .map(parse_condition)
        .collect()
}

/// Parse one `field op value` condition
///
/// Word operators (`NOT IN`, `BETWEEN`, `LIKE`, `ILIKE`, `IN`) are matched
/// case-insensitively before symbolic ones; among symbols two-character
/// operators win, so `field>=10` reads as `>=`.
pub fn parse_condition(text: &str) -> EvalResult<ConditionSpec> {
    let (field, after) = ident_at(text, 0).ok_or_else(|| {
        EvalError::syntax(format!("condition must start with a field: '{text}'"), 0)
    })?;
    let rest = text[after..].trim_start();
    let (operator, value_text) = split_operator(rest).ok_or_else(|| {
        EvalError::syntax(format!("missing operator in condition '{text}'"), after)
    })?;
    let value_text = value_text.trim();
    if value_text.is_empty() {
        return Err(EvalError::syntax(
            format!("missing value in condition '{text}'"),
            text.len(),
        ));
    }

    let operand = match operator {
        QueryOperator::Between => {
            let (low, high) = split_range(value_text)?;
            Operand::Range(parse_value(low)?, parse_value(high)?)
        }
        QueryOperator::In | QueryOperator::NotIn => match list_items(value_text)? {
            Some(items) => Operand::List(
                items
                    .into_iter()
                    .map(parse_value)
                    .collect::<EvalResult<_>>()?,
            ),
            None => Operand::Single(parse_value(value_text)?),
        },
        _ => Operand::Single(parse_value(value_text)?),
    };

    Ok(ConditionSpec {
        field: field.to_string(),
        operator,
        operand,
    })
}

fn split_operator(rest: &str) -> Option<(QueryOperator, &str)> {
    if starts_with_keyword(rest, "NOT") {
        let tail = rest[3..].trim_start();
        return starts_with_keyword(tail, "IN").then(|| (QueryOperator::NotIn, &tail[2..]));
    }
    for (keyword, op) in [
        ("BETWEEN", QueryOperator::Between),
        ("ILIKE", QueryOperator::Like),
        ("LIKE", QueryOperator::Like),
        ("IN", QueryOperator::In),
    ] {
        if starts_with_keyword(rest, keyword) {
            return Some((op, &rest[keyword.len()..]));
        }
    }
    for (symbol, op) in [
        (">=", QueryOperator::Ge),
        ("<=", QueryOperator::Le),
        ("!=", QueryOperator::Ne),
        ("<>", QueryOperator::Ne),
        ("==", QueryOperator::Eq),
        ("=", QueryOperator::Eq),
        (">", QueryOperator::Gt),
        ("<", QueryOperator::Lt),
    ] {
        if let Some(tail) = rest.strip_prefix(symbol) {
            return Some((op, tail));
        }
    }
    None
}

/// Split `low AND high` at the first top-level `AND`
fn split_range(text: &str) -> EvalResult<(&str, &str)> {
    let bytes = text.as_bytes();
    let mut i = 0;
    while i < bytes.len() {
        match bytes[i] {
            b'\'' | b'"' => {
                i = skip_string(text, i)?;
                continue;
            }
            b'a' | b'A'
                if (i == 0 || !is_ident_byte(bytes[i - 1]))
                    && starts_with_keyword(&text[i..], "AND") =>
            {
                let (low, high) = (text[..i].trim(), text[i + 3..].trim());
                if low.is_empty() || high.is_empty() {
                    break;
                }
                return Ok((low, high));
            }
            _ => {}
        }
        i += 1;
    }
    Err(EvalError::syntax(
        format!("BETWEEN expects 'low AND high', found '{text}'"),
        0,
    ))
}

/// Items of a bracketed `[a, b]` or parenthesized `(a, b)` list
fn list_items(text: &str) -> EvalResult<Option<Vec<&str>>> {
    let open = text.as_bytes()[0];
    if open != b'[' && open != b'(' {
        return Ok(None);
    }
    let close = find_closing(text, 0)?;
    if close != text.len() - 1 {
        return Ok(None);
    }
    Ok(Some(
        split_top_level(&text[1..close], b',')?
            .into_iter()
            .map(str::trim)
            .filter(|item| !item.is_empty())
            .collect(),
    ))
}

/// Classify a single condition value
pub fn parse_value(text: &str) -> EvalResult<ValueRef> {
    let text = text.trim();
    if let Some(literal) = literal(text) {
        return Ok(ValueRef::Literal(literal));
    }
    if let Some(path) = text.strip_prefix('$') {
        return dotted(path)
            .map(ValueRef::Variable)
            .ok_or_else(|| EvalError::syntax(format!("invalid variable reference '{text}'"), 0));
    }
    match dotted(text) {
        Some(segments) if segments.len() == 1 => Ok(ValueRef::Word(text.to_string())),
        Some(segments) => Ok(ValueRef::Path(segments)),
        None => Err(EvalError::syntax(
            format!("unsupported condition value '{text}'"),
            0,
        )),
    }
}

fn literal(text: &str) -> Option<Value> {
    if text.eq_ignore_ascii_case("null") || text.eq_ignore_ascii_case("none") {
        return Some(Value::Null);
    }
    if text.eq_ignore_ascii_case("true") {
        return Some(Value::Bool(true));
    }
    if text.eq_ignore_ascii_case("false") {
        return Some(Value::Bool(false));
    }
    let first = *text.as_bytes().first()?;
    if first == b'\'' || first == b'"' {
        let tokens = tokenize(text).ok()?;
        return match tokens.as_slice() {
            [string, eof] if eof.token == Token::Eof => match &string.token {
                Token::Str(s) => Some(Value::String(s.clone())),
                _ => None,
            },
            _ => None,
        };
    }
    if first.is_ascii_digit() || first == b'-' || first == b'+' {
        return parse_decimal(text).map(Value::Number);
    }
    None
}

fn dotted(text: &str) -> Option<Vec<String>> {
    let segments: Vec<String> = text.split('.').map(str::to_string).collect();
    segments
        .iter()
        .all(|s| ident_at(s, 0).is_some_and(|(_, end)| end == s.len()))
        .then_some(segments)
}
